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
use super::consts::ALLOW_SINGLE_BASE_XOVERS_VAR;
use super::*;
use ensnano_history::Document;
use std::collections::{BTreeMap, BTreeSet};

/// Rules enforced on top of the connectivity invariants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopologyPolicy {
    /// Refuse crossovers that would leave a base with a crossover on both sides.
    pub prohibit_single_base_crossovers: bool,
}

impl Default for TopologyPolicy {
    fn default() -> Self {
        Self {
            prohibit_single_base_crossovers: true,
        }
    }
}

impl TopologyPolicy {
    /// The default policy, overridden by the `ENSNANO_ALLOW_SINGLE_BASE_XOVERS` variable.
    pub fn from_env() -> Self {
        match std::env::var(ALLOW_SINGLE_BASE_XOVERS_VAR) {
            Ok(value) if value == "1" || value.eq_ignore_ascii_case("true") => {
                log::info!("Single base crossovers are allowed");
                Self {
                    prohibit_single_base_crossovers: false,
                }
            }
            _ => Self::default(),
        }
    }
}

#[derive(Default, Debug)]
struct PendingChanges {
    bases: BTreeSet<HelixId>,
    dimensions: BTreeSet<HelixId>,
}

/// A strand going through a base, from its 5' end to its 3' end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Oligo {
    /// For a cyclic oligo, the cycle starts at its smallest address.
    pub bases: Vec<BaseAddress>,
    pub cyclic: bool,
}

/// The helices mutated by a history, with the subscribers to their changes.
///
/// Changes made by commands are accumulated and notified once per helix and per kind when the
/// history commits.
#[derive(Debug)]
pub struct Design {
    helices: Helices,
    coords: BTreeMap<HelixCoord, HelixId>,
    /// Number of bases every helix must have, `None` if each helix chooses.
    num_bases: Option<usize>,
    policy: TopologyPolicy,
    pending: PendingChanges,
    observers: Observers<ModelEvent>,
}

impl Document for Design {
    type Error = ModelError;
    type Key = HelixId;

    fn commit(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for h_id in pending.dimensions {
            self.observers
                .notify(&ModelEvent::DimensionsModified(h_id))
        }
        for h_id in pending.bases {
            self.observers.notify(&ModelEvent::BasesModified(h_id))
        }
    }
}

impl Design {
    pub(crate) fn new(num_bases: Option<usize>, policy: TopologyPolicy) -> Self {
        Self {
            helices: Default::default(),
            coords: Default::default(),
            num_bases,
            policy,
            pending: Default::default(),
            observers: Default::default(),
        }
    }

    pub fn helices(&self) -> &Helices {
        &self.helices
    }

    pub fn helix(&self, id: HelixId) -> Option<&VirtualHelix> {
        self.helices.get(&id)
    }

    /// The number of the helix placed at `coord`.
    pub fn id_at(&self, coord: HelixCoord) -> Option<HelixId> {
        self.coords.get(&coord).cloned()
    }

    pub fn try_get_helix(&self, id: HelixId) -> Result<&VirtualHelix, ModelError> {
        self.helix(id).ok_or(ModelError::NoSuchHelix(id))
    }

    pub fn track(&self, helix: HelixId, strand: StrandType) -> Result<&StrandTrack, ModelError> {
        self.try_get_helix(helix).map(|h| h.track(strand))
    }

    pub fn slot(&self, address: BaseAddress) -> Option<&BaseSlot> {
        self.helix(address.helix)
            .and_then(|h| h.track(address.strand).slot(address.index))
    }

    pub fn canonical_num_bases(&self) -> Option<usize> {
        self.num_bases
    }

    pub(crate) fn set_canonical_num_bases(&mut self, num_bases: Option<usize>) {
        self.num_bases = num_bases
    }

    pub fn policy(&self) -> TopologyPolicy {
        self.policy
    }

    pub(crate) fn set_policy(&mut self, policy: TopologyPolicy) {
        self.policy = policy
    }

    pub(crate) fn helix_mut(&mut self, id: HelixId) -> Option<&mut VirtualHelix> {
        self.helices.get_mut(&id)
    }

    pub(crate) fn insert_helix(&mut self, helix: VirtualHelix) {
        self.mark_dimensions_modified(helix.id());
        self.mark_bases_modified(helix.id());
        if let Some(coord) = helix.coord() {
            self.coords.insert(coord, helix.id());
        }
        self.helices.insert(helix)
    }

    pub(crate) fn remove_helix(&mut self, id: HelixId) -> Option<VirtualHelix> {
        self.pending.bases.remove(&id);
        self.pending.dimensions.remove(&id);
        let helix = self.helices.remove(&id)?;
        if let Some(coord) = helix.coord() {
            if self.coords.get(&coord) == Some(&id) {
                self.coords.remove(&coord);
            }
        }
        Some(helix)
    }

    /// Give helix `from` the number `to`, and update the crossovers pointing to it.
    pub(crate) fn renumber_helix(&mut self, from: HelixId, to: HelixId) {
        let mut helix = match self.remove_helix(from) {
            Some(helix) => helix,
            None => {
                log::error!("Renumbering missing helix {}", from);
                return;
            }
        };
        let (coord, parity) = (helix.coord(), helix.parity());
        helix.set_identity(to, coord, parity);
        self.insert_helix(helix);
        let ids: Vec<HelixId> = self.helices.keys().cloned().collect();
        for id in ids {
            let points_to_from = self.helix(id).map_or(false, |h| {
                h.external_crossovers().iter().any(|(_, t)| t.helix == from)
            });
            if points_to_from {
                if let Some(h) = self.helix_mut(id) {
                    h.retarget_crossovers(from, to);
                }
                self.mark_bases_modified(id);
            }
        }
        self.mark_dimensions_modified(from);
        log::debug!("Helix {} renumbered {}", from, to);
    }

    pub(crate) fn mark_bases_modified(&mut self, id: HelixId) {
        self.pending.bases.insert(id);
    }

    pub(crate) fn mark_dimensions_modified(&mut self, id: HelixId) {
        self.pending.dimensions.insert(id);
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ModelEvent) + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn neighbour(&self, address: BaseAddress, prime5: bool) -> Option<BaseAddress> {
        let track = self.helix(address.helix)?.track(address.strand);
        let side = if prime5 {
            track.direction().prime5_side()
        } else {
            track.direction().prime3_side()
        };
        match track.slot(address.index)?.link(side)? {
            Link::Natural => address.shifted(side.step()),
            Link::Crossover(target) => Some(target),
        }
    }

    /// The base following `address` in the 5' direction.
    pub fn prime5_neighbour(&self, address: BaseAddress) -> Option<BaseAddress> {
        self.neighbour(address, true)
    }

    /// The base following `address` in the 3' direction.
    pub fn prime3_neighbour(&self, address: BaseAddress) -> Option<BaseAddress> {
        self.neighbour(address, false)
    }

    fn total_slots(&self) -> usize {
        self.helices.values().map(|h| 2 * h.num_bases()).sum()
    }

    /// The strand going through `address`, following natural links and crossovers. `None` if
    /// the base is empty.
    pub fn oligo_through(&self, address: BaseAddress) -> Option<Oligo> {
        if self.slot(address)?.is_empty() {
            return None;
        }
        let limit = self.total_slots();
        let mut first = address;
        let mut cyclic = false;
        let mut steps = 0;
        while let Some(prev) = self.prime5_neighbour(first) {
            if prev == address {
                cyclic = true;
                break;
            }
            first = prev;
            steps += 1;
            if steps > limit {
                log::error!("Endless strand through {}", address);
                return None;
            }
        }

        let mut bases = vec![first];
        let mut current = first;
        while let Some(next) = self.prime3_neighbour(current) {
            if next == first || bases.len() > limit {
                break;
            }
            bases.push(next);
            current = next;
        }
        if cyclic {
            if let Some(min_pos) = bases
                .iter()
                .enumerate()
                .min_by_key(|(_, a)| **a)
                .map(|(i, _)| i)
            {
                bases.rotate_left(min_pos);
            }
        }
        Some(Oligo { bases, cyclic })
    }

    /// The 5' end of the strand going through `address`. For a cyclic strand, the smallest
    /// address of the cycle.
    pub fn five_prime_end_of(&self, address: BaseAddress) -> Option<BaseAddress> {
        self.oligo_through(address).map(|o| o.bases[0])
    }

    /// Check that every crossover is linked back by its target.
    pub(crate) fn check_crossovers(&self) -> Result<(), ModelError> {
        for helix in self.helices.values() {
            for strand in StrandType::ALL.iter() {
                for (index, _, target) in helix.track(*strand).crossovers() {
                    let from = helix.address(*strand, index);
                    let linked_back = self
                        .slot(target)
                        .and_then(|s| s.side_linked_to(from))
                        .is_some();
                    if !linked_back {
                        return Err(ModelError::consistency(
                            ConsistencyViolation::DanglingCrossover { from, to: target },
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
