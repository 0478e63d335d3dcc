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
use super::strands::{decode_track, encode_track};
use super::*;

/// Direction of the `strand` track on a helix of parity `parity`: scaffold on even helices and
/// staple on odd helices run 5' -> 3' with increasing indices.
pub fn direction_of(parity: Parity, strand: StrandType) -> Direction {
    if parity.is_even() == (strand == StrandType::Scaffold) {
        Direction::LowToHigh
    } else {
        Direction::HighToLow
    }
}

/// A helix axis of the design, carrying a scaffold and a staple track of the same length.
///
/// The identity of a helix (number, position and parity) can only be changed by the part that
/// owns it, its tracks only by the commands of `design_operations`.
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualHelix {
    id: HelixId,
    coord: Option<HelixCoord>,
    parity: Parity,
    scaffold: StrandTrack,
    staple: StrandTrack,
}

impl VirtualHelix {
    /// A helix with empty tracks whose parity is the one of its number.
    pub(crate) fn new(id: HelixId, num_bases: usize) -> Self {
        let parity = Parity::from_number(id);
        Self {
            id,
            coord: None,
            parity,
            scaffold: StrandTrack::new(
                StrandType::Scaffold,
                direction_of(parity, StrandType::Scaffold),
                num_bases,
            ),
            staple: StrandTrack::new(
                StrandType::Staple,
                direction_of(parity, StrandType::Staple),
                num_bases,
            ),
        }
    }

    pub fn id(&self) -> HelixId {
        self.id
    }

    /// Position on the lattice, `None` for a detached helix.
    pub fn coord(&self) -> Option<HelixCoord> {
        self.coord
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn num_bases(&self) -> usize {
        self.scaffold.num_bases()
    }

    pub fn track(&self, strand: StrandType) -> &StrandTrack {
        match strand {
            StrandType::Scaffold => &self.scaffold,
            StrandType::Staple => &self.staple,
        }
    }

    pub(crate) fn track_mut(&mut self, strand: StrandType) -> &mut StrandTrack {
        match strand {
            StrandType::Scaffold => &mut self.scaffold,
            StrandType::Staple => &mut self.staple,
        }
    }

    pub fn direction(&self, strand: StrandType) -> Direction {
        self.track(strand).direction()
    }

    /// True if increasing indices go from 5' to 3' on the `strand` track.
    pub fn runs_five_to_three(&self, strand: StrandType) -> bool {
        direction_of(self.parity, strand).runs_five_to_three()
    }

    pub fn address(&self, strand: StrandType, index: usize) -> BaseAddress {
        BaseAddress::new(self.id, strand, index)
    }

    /// True if one of the tracks has a link or a loop/skip.
    pub fn has_content(&self) -> bool {
        !(self.scaffold.is_blank() && self.staple.is_blank())
    }

    pub fn rightmost_nonempty_base(&self) -> Option<usize> {
        self.scaffold
            .rightmost_nonempty_base()
            .max(self.staple.rightmost_nonempty_base())
    }

    /// Crossovers between this helix and other helices, as `(local end, remote end)` pairs.
    pub fn external_crossovers(&self) -> Vec<(BaseAddress, BaseAddress)> {
        let mut ret = Vec::new();
        for strand in StrandType::ALL.iter() {
            for (i, _, target) in self.track(*strand).crossovers() {
                if target.helix != self.id {
                    ret.push((self.address(*strand, i), target))
                }
            }
        }
        ret
    }

    pub(crate) fn first_content_at_or_past(&self, len: usize) -> Option<usize> {
        match (
            self.scaffold.first_content_at_or_past(len),
            self.staple.first_content_at_or_past(len),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub(crate) fn resize(&mut self, num_bases: usize) {
        self.scaffold.resize(num_bases);
        self.staple.resize(num_bases);
    }

    /// Give the helix a new number, position and parity.
    ///
    /// Crossovers from the helix to itself follow the new number.
    pub(crate) fn set_identity(&mut self, id: HelixId, coord: Option<HelixCoord>, parity: Parity) {
        let old_id = self.id;
        self.id = id;
        self.coord = coord;
        self.parity = parity;
        for strand in StrandType::ALL.iter() {
            self.track_mut(*strand)
                .set_direction(direction_of(parity, *strand));
        }
        if old_id != id {
            self.retarget_crossovers(old_id, id);
        }
    }

    /// Make the crossovers pointing to helix `from` point to helix `to`.
    pub(crate) fn retarget_crossovers(&mut self, from: HelixId, to: HelixId) {
        for strand in StrandType::ALL.iter() {
            for slot in self.track_mut(*strand).slots_mut() {
                slot.map_crossovers(|a| {
                    if a.helix == from {
                        BaseAddress { helix: to, ..a }
                    } else {
                        a
                    }
                })
            }
        }
    }

    pub fn to_archive(&self) -> ArchivedHelix {
        ArchivedHelix {
            number: self.id,
            coord: self.coord,
            scaffold: encode_track(&self.scaffold),
            staple: encode_track(&self.staple),
            scaffold_loops: self.scaffold.loops().clone(),
            staple_loops: self.staple.loops().clone(),
        }
    }

    /// Rebuild a helix from its archive. The number of bases is the number of encoded slots.
    ///
    /// Crossover targets are not checked here since they may point to helices that are not
    /// loaded yet.
    pub(crate) fn from_archive(archive: &ArchivedHelix) -> Result<Self, ModelError> {
        let parity = archive
            .coord
            .map(Parity::from_coord)
            .unwrap_or_else(|| Parity::from_number(archive.number));
        let mut tracks = Vec::with_capacity(2);
        for (strand, encoded, loops) in [
            (
                StrandType::Scaffold,
                &archive.scaffold,
                &archive.scaffold_loops,
            ),
            (StrandType::Staple, &archive.staple, &archive.staple_loops),
        ]
        .iter()
        {
            let (direction, slots) = decode_track(*strand, encoded)?;
            if direction != direction_of(parity, *strand) {
                return Err(ModelError::Format(format!(
                    "helix {}: {} track direction does not match its parity",
                    archive.number, strand
                )));
            }
            if let Some((index, _)) = loops.iter().find(|(i, _)| *i >= slots.len()) {
                return Err(ModelError::Format(format!(
                    "helix {}: loop/skip at {} past the {} bases of the track",
                    archive.number,
                    index,
                    slots.len()
                )));
            }
            tracks.push(StrandTrack::from_parts(
                *strand,
                direction,
                slots,
                LoopSkipLedger::clone(loops),
            ));
        }
        let staple = tracks.pop();
        let scaffold = tracks.pop();
        match (scaffold, staple) {
            (Some(scaffold), Some(staple)) if scaffold.num_bases() == staple.num_bases() => {
                Ok(Self {
                    id: archive.number,
                    coord: archive.coord,
                    parity,
                    scaffold,
                    staple,
                })
            }
            _ => Err(ModelError::Format(format!(
                "helix {}: scaffold and staple tracks have different lengths",
                archive.number
            ))),
        }
    }
}

/// Serialized form of a virtual helix.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ArchivedHelix {
    pub number: HelixId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coord: Option<HelixCoord>,
    pub scaffold: String,
    pub staple: String,
    #[serde(default, skip_serializing_if = "LoopSkipLedger::is_empty")]
    pub scaffold_loops: LoopSkipLedger,
    #[serde(default, skip_serializing_if = "LoopSkipLedger::is_empty")]
    pub staple_loops: LoopSkipLedger,
}
