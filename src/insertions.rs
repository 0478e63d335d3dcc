/*
ENSnano, a 3d graphical application for DNA nanostructures.
    Copyright (C) 2021  Nicolas Levy <nicolaspierrelevy@gmail.com> and Nicolas Schabanel <nicolas.schabanel@ens-lyon.fr>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
//! Loops (inserted bases) and skips (deleted bases) annotated on a track.
use std::collections::BTreeMap;
use std::ops::RangeBounds;

/// Sparse map from base index to a non-zero count: positive for a loop of that many extra bases,
/// negative for skipped bases.
///
/// A count of zero is never stored, the entry is removed instead. Zero counts of a loaded
/// archive are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<usize, i32>", into = "BTreeMap<usize, i32>")]
pub struct LoopSkipLedger(BTreeMap<usize, i32>);

impl LoopSkipLedger {
    pub fn get(&self, index: usize) -> Option<i32> {
        self.0.get(&index).cloned()
    }

    /// Entries in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.0.iter().map(|(i, c)| (*i, *c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of the counts whose index is in `range`.
    pub fn total_in<R: RangeBounds<usize>>(&self, range: R) -> i32 {
        self.0.range(range).map(|(_, c)| *c).sum()
    }

    /// Set the count at `index` and return the previous one. `None` or `Some(0)` remove the
    /// entry.
    pub(crate) fn set(&mut self, index: usize, count: Option<i32>) -> Option<i32> {
        match count {
            Some(c) if c != 0 => self.0.insert(index, c),
            _ => self.0.remove(&index),
        }
    }

    pub(crate) fn first_index_at_or_past(&self, len: usize) -> Option<usize> {
        self.0.range(len..).next().map(|(i, _)| *i)
    }
}

impl From<BTreeMap<usize, i32>> for LoopSkipLedger {
    fn from(map: BTreeMap<usize, i32>) -> Self {
        map.into_iter().collect()
    }
}

impl From<LoopSkipLedger> for BTreeMap<usize, i32> {
    fn from(ledger: LoopSkipLedger) -> Self {
        ledger.0
    }
}

impl std::iter::FromIterator<(usize, i32)> for LoopSkipLedger {
    fn from_iter<T: IntoIterator<Item = (usize, i32)>>(iter: T) -> Self {
        Self(iter.into_iter().filter(|(_, c)| *c != 0).collect())
    }
}
