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
//! Strand connectivity model of virtual helices.
//!
//! A [`VirtualHelix`] carries one [`StrandTrack`] per [`StrandType`]. Tracks are mutated only by
//! the commands of [`design_operations`], pushed on a [`History`] through a [`Session`]. Helices
//! live either in a [`Part`], which gives them lattice coordinates and a shared history, or on
//! their own as a [`DetachedHelix`].
use std::fmt;

#[macro_use]
extern crate serde_derive;
extern crate serde;

pub use ensnano_history::{
    Command, History, HistoryError, Label, Macro, Observers, SubscriptionId,
};

mod collection;
pub mod consts;
mod design;
pub mod design_operations;
mod error;
mod helices;
mod insertions;
pub mod palette;
mod part;
mod session;
mod standalone;
mod strands;

pub use collection::{Collection, HasMap, Helices};
pub use design::*;
pub use error::*;
pub use helices::*;
pub use insertions::LoopSkipLedger;
pub use part::*;
pub use session::Session;
pub use standalone::DetachedHelix;
pub use strands::*;

#[cfg(test)]
mod tests;

/// Number identifying a helix.
pub type HelixId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrandType {
    Scaffold,
    Staple,
}

impl StrandType {
    pub const ALL: [StrandType; 2] = [StrandType::Scaffold, StrandType::Staple];

    pub fn complement(self) -> Self {
        match self {
            Self::Scaffold => Self::Staple,
            Self::Staple => Self::Scaffold,
        }
    }
}

impl fmt::Display for StrandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scaffold => write!(f, "scaffold"),
            Self::Staple => write!(f, "staple"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    /// Parity of the lattice position `(row, col)`.
    pub fn from_coord(coord: HelixCoord) -> Self {
        if (coord.row.rem_euclid(2)) ^ (coord.col.rem_euclid(2)) == 0 {
            Self::Even
        } else {
            Self::Odd
        }
    }

    /// Parity carried by a helix number.
    pub fn from_number(number: HelixId) -> Self {
        if number % 2 == 0 {
            Self::Even
        } else {
            Self::Odd
        }
    }

    pub fn is_even(self) -> bool {
        self == Self::Even
    }
}

/// Position of a helix on the honeycomb lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HelixCoord {
    pub row: isize,
    pub col: isize,
}

impl HelixCoord {
    pub fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for HelixCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Identifies a base slot: a helix, one of its tracks, and a position on that track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BaseAddress {
    pub helix: HelixId,
    pub strand: StrandType,
    pub index: usize,
}

impl BaseAddress {
    pub fn new(helix: HelixId, strand: StrandType, index: usize) -> Self {
        Self {
            helix,
            strand,
            index,
        }
    }

    /// The address on the same track `delta` positions away, if it is not negative.
    pub fn shifted(&self, delta: isize) -> Option<Self> {
        let index = self.index as isize + delta;
        if index < 0 {
            None
        } else {
            Some(Self {
                index: index as usize,
                ..*self
            })
        }
    }
}

impl fmt::Display for BaseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[H{} {} {}]", self.helix, self.strand, self.index)
    }
}

/// Events emitted to the subscribers of a design once a unit of work is committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelEvent {
    /// Connectivity or loop/skip content of the helix changed.
    BasesModified(HelixId),
    /// The number of bases of the helix changed, or the helix was added to the design.
    DimensionsModified(HelixId),
}

impl ModelEvent {
    pub fn helix(&self) -> HelixId {
        match self {
            Self::BasesModified(h) | Self::DimensionsModified(h) => *h,
        }
    }
}
