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
//! Base slots and the tracks they form.
//!
//! A slot stores at most one link on each of its sides. The state of a base (empty, 5' end,
//! 3' end or connected) is not stored: it is read from which of the 5' and 3' sides are linked,
//! and which physical side is the 5' side depends on the direction of the track.
use super::{BaseAddress, LoopSkipLedger, StrandType};
use std::ops::RangeInclusive;

mod formating;
pub(crate) use formating::{decode_track, encode_track};

/// Direction in which the 5' -> 3' orientation of a track runs along the indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    LowToHigh,
    HighToLow,
}

impl Direction {
    pub fn runs_five_to_three(self) -> bool {
        self == Self::LowToHigh
    }

    /// The side of a slot that faces its 3' neighbour.
    pub fn prime3_side(self) -> Side {
        match self {
            Self::LowToHigh => Side::High,
            Self::HighToLow => Side::Low,
        }
    }

    /// The side of a slot that faces its 5' neighbour.
    pub fn prime5_side(self) -> Side {
        self.prime3_side().opposite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Low,
    High,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }

    /// Index offset of the natural neighbour on that side.
    pub fn step(self) -> isize {
        match self {
            Self::Low => -1,
            Self::High => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Link {
    /// Link to the adjacent slot of the same track.
    Natural,
    /// Link to an arbitrary slot, on this helix or on another one.
    Crossover(BaseAddress),
}

impl Link {
    pub fn crossover_target(&self) -> Option<BaseAddress> {
        match self {
            Self::Natural => None,
            Self::Crossover(address) => Some(*address),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BaseSlot {
    low: Option<Link>,
    high: Option<Link>,
}

impl BaseSlot {
    pub(crate) fn new(low: Option<Link>, high: Option<Link>) -> Self {
        Self { low, high }
    }

    pub fn link(&self, side: Side) -> Option<Link> {
        match side {
            Side::Low => self.low,
            Side::High => self.high,
        }
    }

    pub(crate) fn set_link(&mut self, side: Side, link: Option<Link>) {
        match side {
            Side::Low => self.low = link,
            Side::High => self.high = link,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }

    pub fn state(&self, direction: Direction) -> BaseState {
        let linked_5 = self.link(direction.prime5_side()).is_some();
        let linked_3 = self.link(direction.prime3_side()).is_some();
        match (linked_5, linked_3) {
            (false, false) => BaseState::Empty,
            (false, true) => BaseState::End5Prime,
            (true, false) => BaseState::End3Prime,
            (true, true) => BaseState::Connected,
        }
    }

    /// The side of this slot holding a crossover to `target`.
    pub(crate) fn side_linked_to(&self, target: BaseAddress) -> Option<Side> {
        if self.low == Some(Link::Crossover(target)) {
            Some(Side::Low)
        } else if self.high == Some(Link::Crossover(target)) {
            Some(Side::High)
        } else {
            None
        }
    }

    pub(crate) fn crossovers(&self) -> impl Iterator<Item = (Side, BaseAddress)> {
        let low = self
            .low
            .and_then(|l| l.crossover_target())
            .map(|a| (Side::Low, a));
        let high = self
            .high
            .and_then(|l| l.crossover_target())
            .map(|a| (Side::High, a));
        low.into_iter().chain(high)
    }

    pub(crate) fn map_crossovers<F: Fn(BaseAddress) -> BaseAddress>(&mut self, f: F) {
        for link in [&mut self.low, &mut self.high].iter_mut() {
            if let Some(Link::Crossover(address)) = link {
                *address = f(*address)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseState {
    Empty,
    Connected,
    End5Prime,
    End3Prime,
}

impl BaseState {
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    pub fn is_end(self) -> bool {
        matches!(self, Self::End5Prime | Self::End3Prime)
    }
}

/// A maximal segment of consecutive bases joined by natural links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Run {
    low: usize,
    high: usize,
    direction: Direction,
}

impl Run {
    pub fn low(&self) -> usize {
        self.low
    }

    pub fn high(&self) -> usize {
        self.high
    }

    pub fn five_prime(&self) -> usize {
        if self.direction.runs_five_to_three() {
            self.low
        } else {
            self.high
        }
    }

    pub fn three_prime(&self) -> usize {
        if self.direction.runs_five_to_three() {
            self.high
        } else {
            self.low
        }
    }

    pub fn len(&self) -> usize {
        self.high - self.low + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.low <= index && index <= self.high
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.low..=self.high
    }
}

/// What lies at one position of a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Base {
    pub index: usize,
    pub state: BaseState,
    pub loop_skip: Option<i32>,
    /// The run the base belongs to, `None` if the base is empty.
    pub run: Option<Run>,
    /// Target of the crossover leaving the 5' side of the base.
    pub prime5_crossover: Option<BaseAddress>,
    /// Target of the crossover leaving the 3' side of the base.
    pub prime3_crossover: Option<BaseAddress>,
}

/// The slots of one strand type along a helix, with their loop/skip annotations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrandTrack {
    strand: StrandType,
    direction: Direction,
    slots: Vec<BaseSlot>,
    loops: LoopSkipLedger,
}

impl StrandTrack {
    pub(crate) fn new(strand: StrandType, direction: Direction, num_bases: usize) -> Self {
        Self {
            strand,
            direction,
            slots: vec![BaseSlot::default(); num_bases],
            loops: Default::default(),
        }
    }

    pub(crate) fn from_parts(
        strand: StrandType,
        direction: Direction,
        slots: Vec<BaseSlot>,
        loops: LoopSkipLedger,
    ) -> Self {
        Self {
            strand,
            direction,
            slots,
            loops,
        }
    }

    pub fn strand_type(&self) -> StrandType {
        self.strand
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn num_bases(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[BaseSlot] {
        self.slots.as_slice()
    }

    pub fn slot(&self, index: usize) -> Option<&BaseSlot> {
        self.slots.get(index)
    }

    pub fn loops(&self) -> &LoopSkipLedger {
        &self.loops
    }

    /// `index` as a position of this track, if it is in range.
    pub fn checked_index(&self, index: isize) -> Option<usize> {
        if index >= 0 && (index as usize) < self.slots.len() {
            Some(index as usize)
        } else {
            None
        }
    }

    pub fn state_at(&self, index: isize) -> Option<BaseState> {
        let index = self.checked_index(index)?;
        Some(self.slots[index].state(self.direction))
    }

    /// True if the slot at `index` is not empty. Out of range indices have no base.
    pub fn has_base_at(&self, index: isize) -> bool {
        matches!(self.state_at(index), Some(s) if !s.is_empty())
    }

    pub fn has_end_at(&self, index: isize) -> bool {
        matches!(self.state_at(index), Some(s) if s.is_end())
    }

    pub fn has_crossover_at(&self, index: isize) -> bool {
        self.checked_index(index)
            .map(|i| self.slots[i].crossovers().next().is_some())
            .unwrap_or(false)
    }

    pub fn prime5_link(&self, index: usize) -> Option<Link> {
        self.slots
            .get(index)
            .and_then(|s| s.link(self.direction.prime5_side()))
    }

    pub fn prime3_link(&self, index: usize) -> Option<Link> {
        self.slots
            .get(index)
            .and_then(|s| s.link(self.direction.prime3_side()))
    }

    /// Indices of the 5' ends, in increasing order.
    pub fn five_prime_ends(&self) -> Ends<'_> {
        Ends {
            track: self,
            wanted: BaseState::End5Prime,
            next: 0,
        }
    }

    /// Indices of the 3' ends, in increasing order.
    pub fn three_prime_ends(&self) -> Ends<'_> {
        Ends {
            track: self,
            wanted: BaseState::End3Prime,
            next: 0,
        }
    }

    /// The runs of the track, in increasing order.
    pub fn runs(&self) -> Runs<'_> {
        Runs {
            track: self,
            next: 0,
        }
    }

    /// The run containing `index`.
    ///
    /// Runs are visited in increasing order and the walk stops at the first run starting past
    /// `index`.
    pub fn run_containing(&self, index: usize) -> Option<Run> {
        self.runs()
            .take_while(|r| r.low <= index)
            .find(|r| r.contains(index))
    }

    /// The base at `index`, `None` if `index` is out of range.
    pub fn base_at(&self, index: isize) -> Option<Base> {
        let index = self.checked_index(index)?;
        let slot = &self.slots[index];
        let crossover = |side: Side| slot.link(side).and_then(|l| l.crossover_target());
        Some(Base {
            index,
            state: slot.state(self.direction),
            loop_skip: self.loops.get(index),
            run: self.run_containing(index),
            prime5_crossover: crossover(self.direction.prime5_side()),
            prime3_crossover: crossover(self.direction.prime3_side()),
        })
    }

    /// Number of bases of `run` once its loops and skips are taken into account.
    pub fn effective_length(&self, run: &Run) -> isize {
        run.len() as isize + self.loops.total_in(run.indices()) as isize
    }

    /// The crossovers leaving this track, by index and side.
    pub fn crossovers(&self) -> impl Iterator<Item = (usize, Side, BaseAddress)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .flat_map(|(i, s)| s.crossovers().map(move |(side, a)| (i, side, a)))
    }

    /// The crossovers whose 3' side is on this track, as `(index, target)` pairs.
    pub fn prime3_crossovers(&self) -> impl Iterator<Item = (usize, BaseAddress)> + '_ {
        let side = self.direction.prime3_side();
        self.crossovers()
            .filter(move |(_, s, _)| *s == side)
            .map(|(i, _, a)| (i, a))
    }

    pub fn rightmost_nonempty_base(&self) -> Option<usize> {
        self.slots.iter().rposition(|s| !s.is_empty())
    }

    /// How far the end at `index` can be moved outward before reaching a non-empty base or the
    /// edge of the track. `None` if there is no end at `index`.
    pub fn drag_bound(&self, index: isize) -> Option<usize> {
        let index = self.checked_index(index)?;
        let outward = match self.slots[index].state(self.direction) {
            BaseState::End5Prime => self.direction.prime5_side(),
            BaseState::End3Prime => self.direction.prime3_side(),
            _ => return None,
        };
        let mut bound = index;
        while let Some(next) = self.checked_index(bound as isize + outward.step()) {
            if !self.slots[next].is_empty() {
                break;
            }
            bound = next;
        }
        Some(bound)
    }

    /// True if the track has no link and no loop/skip.
    pub fn is_blank(&self) -> bool {
        self.loops.is_empty() && self.slots.iter().all(BaseSlot::is_empty)
    }

    /// The first index at or past `len` holding a link or a loop/skip.
    pub(crate) fn first_content_at_or_past(&self, len: usize) -> Option<usize> {
        let slot = self
            .slots
            .iter()
            .enumerate()
            .skip(len)
            .find(|(_, s)| !s.is_empty())
            .map(|(i, _)| i);
        match (slot, self.loops.first_index_at_or_past(len)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut BaseSlot> {
        self.slots.get_mut(index)
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [BaseSlot] {
        self.slots.as_mut_slice()
    }

    pub(crate) fn loops_mut(&mut self) -> &mut LoopSkipLedger {
        &mut self.loops
    }

    pub(crate) fn resize(&mut self, num_bases: usize) {
        self.slots.resize(num_bases, BaseSlot::default())
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction
    }
}

/// Lazy iterator over the ends of one kind of a track.
///
/// It reads the slots as it goes, clone it to restart from the current position.
#[derive(Clone)]
pub struct Ends<'a> {
    track: &'a StrandTrack,
    wanted: BaseState,
    next: usize,
}

impl<'a> Iterator for Ends<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let direction = self.track.direction;
        while let Some(slot) = self.track.slots.get(self.next) {
            let index = self.next;
            self.next += 1;
            if slot.state(direction) == self.wanted {
                return Some(index);
            }
        }
        None
    }
}

/// Lazy iterator over the runs of a track.
#[derive(Clone)]
pub struct Runs<'a> {
    track: &'a StrandTrack,
    next: usize,
}

impl<'a> Iterator for Runs<'a> {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        let slots = &self.track.slots;
        let low = (self.next..slots.len()).find(|i| !slots[*i].is_empty())?;
        let mut high = low;
        while slots[high].link(Side::High) == Some(Link::Natural) && high + 1 < slots.len() {
            high += 1;
        }
        self.next = high + 1;
        Some(Run {
            low,
            high,
            direction: self.track.direction,
        })
    }
}
