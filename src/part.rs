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
use super::consts::DEFAULT_NUM_BASES;
use super::design_operations::{
    change_num_bases_label, drag_all_ends, drag_all_ends_label, resize_commands, RenumberHelix,
    SetCanonicalNumBases,
};
use super::*;
use ensnano_history::Document;
use std::collections::{BTreeMap, BTreeSet};

/// Error returned by [`Part::attach`]. The helix that could not be attached is given back.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct AttachError {
    pub error: ModelError,
    pub helix: DetachedHelix,
}

impl From<AttachError> for ModelError {
    fn from(e: AttachError) -> Self {
        e.error
    }
}

/// The set of selected helices of a part.
///
/// It is modified through the part, which checks that the selected helices exist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection(BTreeSet<HelixId>);

impl Selection {
    pub fn contains(&self, id: HelixId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = HelixId> + '_ {
        self.0.iter().cloned()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Serialized form of a part. The number of bases is the one of its helices.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ArchivedPart {
    pub helices: Vec<ArchivedHelix>,
}

/// A set of helices placed on a honeycomb lattice.
///
/// All the helices of a part have the same number of bases, and their changes are recorded in
/// a history shared by the whole part unless they are sandboxed.
///
/// Histories never overwrite each other silently: an entry whose bases were modified since it
/// was recorded, for instance by a sandbox that was then dropped, refuses to be undone with a
/// [`ConsistencyViolation::StaleEntry`] error and stays in place.
#[derive(Debug)]
pub struct Part {
    design: Design,
    shared: History<Design>,
    sandboxes: BTreeMap<HelixId, History<Design>>,
    selection: Selection,
}

impl Default for Part {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_BASES)
    }
}

impl Part {
    /// An empty part, with the topology policy read from the environment.
    pub fn new(num_bases: usize) -> Self {
        Self::with_policy(num_bases, TopologyPolicy::from_env())
    }

    pub fn with_policy(num_bases: usize, policy: TopologyPolicy) -> Self {
        Self {
            design: Design::new(Some(num_bases), policy),
            shared: History::new(),
            sandboxes: Default::default(),
            selection: Default::default(),
        }
    }

    pub fn num_bases(&self) -> usize {
        self.design.canonical_num_bases().unwrap_or(0)
    }

    pub fn design(&self) -> &Design {
        &self.design
    }

    pub fn policy(&self) -> TopologyPolicy {
        self.design.policy()
    }

    pub fn set_policy(&mut self, policy: TopologyPolicy) {
        self.design.set_policy(policy)
    }

    // Collection methods
    // ===========================================================================
    pub fn helix(&self, id: HelixId) -> Option<&VirtualHelix> {
        self.design.helix(id)
    }

    pub fn helix_at(&self, coord: HelixCoord) -> Option<&VirtualHelix> {
        self.design.id_at(coord).and_then(|id| self.design.helix(id))
    }

    pub fn helix_ids(&self) -> impl Iterator<Item = HelixId> + '_ {
        self.design.helices().keys().cloned()
    }

    pub fn len(&self) -> usize {
        self.design.helices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    // ===========================================================================

    /// The helices at the three honeycomb positions next to helix `id`.
    pub fn neighbors(&self, id: HelixId) -> Result<[Option<HelixId>; 3], ModelError> {
        let helix = self.design.try_get_helix(id)?;
        let HelixCoord { row, col } = helix.coord().ok_or(ModelError::NoSuchHelix(id))?;
        let candidates = if helix.parity().is_even() {
            [(row, col + 1), (row - 1, col), (row, col - 1)]
        } else {
            [(row, col - 1), (row + 1, col), (row, col + 1)]
        };
        let mut ret = [None; 3];
        for (neighbor, (r, c)) in ret.iter_mut().zip(candidates.iter()) {
            *neighbor = self.design.id_at(HelixCoord::new(*r, *c));
        }
        Ok(ret)
    }

    /// The smallest unused helix number of the given parity.
    pub fn free_number(&self, parity: Parity) -> HelixId {
        let mut number = if parity.is_even() { 0 } else { 1 };
        while self.design.helix(number).is_some() {
            number += 2;
        }
        number
    }

    /// Create an empty helix at `coord`.
    pub fn add_helix(&mut self, coord: HelixCoord) -> Result<HelixId, ModelError> {
        let number = self.free_number(Parity::from_coord(coord));
        let helix = DetachedHelix::with_policy(number, self.num_bases(), self.policy());
        Ok(self.attach(coord, helix, Some(number))?)
    }

    /// Place `helix` at `coord`.
    ///
    /// The helix gets the number `number`, or the smallest free one with the parity of
    /// `coord`. Its number of bases is set to the one of the part, which fails if that would
    /// drop some content. A helix with content cannot change parity. The histories of the
    /// helix are dropped, its next changes are recorded in the shared history.
    pub fn attach(
        &mut self,
        coord: HelixCoord,
        mut helix: DetachedHelix,
        number: Option<HelixId>,
    ) -> Result<HelixId, AttachError> {
        let number = match self.check_attach(coord, &helix, number) {
            Ok(number) => number,
            Err(error) => return Err(AttachError { error, helix }),
        };
        let mut virtual_helix = match helix.take_helix() {
            Some(h) => h,
            None => {
                return Err(AttachError {
                    error: ModelError::NoSuchHelix(helix.id()),
                    helix,
                })
            }
        };
        virtual_helix.resize(self.num_bases());
        virtual_helix.set_identity(number, Some(coord), Parity::from_coord(coord));
        self.design.insert_helix(virtual_helix);
        self.design.commit();
        log::debug!("Attached helix {} at {}", number, coord);
        Ok(number)
    }

    fn check_attach(
        &self,
        coord: HelixCoord,
        helix: &DetachedHelix,
        number: Option<HelixId>,
    ) -> Result<HelixId, ModelError> {
        if self.design.id_at(coord).is_some() {
            return Err(ModelError::consistency(
                ConsistencyViolation::CoordinateInUse(coord),
            ));
        }
        let parity = Parity::from_coord(coord);
        let virtual_helix = helix.helix().ok_or(ModelError::NoSuchHelix(helix.id()))?;
        if virtual_helix.has_content() && virtual_helix.parity() != parity {
            return Err(ModelError::consistency(
                ConsistencyViolation::ParityMismatch {
                    helix: virtual_helix.id(),
                    coord,
                },
            ));
        }
        let num_bases = self.num_bases();
        if virtual_helix.first_content_at_or_past(num_bases).is_some() {
            return Err(ModelError::consistency(
                ConsistencyViolation::BaseCountMismatch {
                    expected: num_bases,
                    found: virtual_helix.num_bases(),
                },
            ));
        }
        match number {
            Some(n) if Parity::from_number(n) != parity => Err(ModelError::consistency(
                ConsistencyViolation::NumberParityMismatch { number: n, coord },
            )),
            Some(n) if self.design.helix(n).is_some() => Err(ModelError::consistency(
                ConsistencyViolation::NumberInUse(n),
            )),
            Some(n) => Ok(n),
            None => Ok(self.free_number(parity)),
        }
    }

    /// Remove helix `id` from the part.
    ///
    /// The helix must not have crossovers to other helices. The entries of the shared history
    /// that modify the helix are forgotten, the others can still be undone.
    pub fn detach(&mut self, id: HelixId) -> Result<DetachedHelix, ModelError> {
        let helix = self.design.try_get_helix(id)?;
        if let Some((from, _)) = helix.external_crossovers().first() {
            return Err(ModelError::consistency(
                ConsistencyViolation::ExternalCrossovers {
                    helix: id,
                    strand: from.strand,
                },
            ));
        }
        if let Some(open) = self.shared.open_macro_label() {
            return Err(HistoryError::MacroOpen { open: open.clone() }.into());
        }
        let mut virtual_helix = self
            .design
            .remove_helix(id)
            .ok_or(ModelError::NoSuchHelix(id))?;
        self.sandboxes.remove(&id);
        self.selection.0.remove(&id);
        let forgotten = self.shared.forget(&id);
        if forgotten > 0 {
            log::info!(
                "Helix {} left the part, forgot {} entries of the shared history",
                id,
                forgotten
            );
        }
        let parity = virtual_helix.parity();
        virtual_helix.set_identity(id, None, parity);
        self.design.mark_dimensions_modified(id);
        self.design.commit();
        Ok(DetachedHelix::from_virtual_helix(
            virtual_helix,
            self.design.policy(),
        ))
    }

    /// Mutable access to helix `id`, through its sandbox if it has one or through the shared
    /// history.
    pub fn session(&mut self, id: HelixId) -> Result<Session<'_>, ModelError> {
        let history = match self.sandboxes.get_mut(&id) {
            Some(sandbox) => sandbox,
            None => &mut self.shared,
        };
        Session::new(id, &mut self.design, history)
    }

    pub fn shared_history(&self) -> &History<Design> {
        &self.shared
    }

    /// The history recording the changes of helix `id`.
    pub fn history_of(&self, id: HelixId) -> Option<&History<Design>> {
        self.design.helix(id)?;
        Some(self.sandboxes.get(&id).unwrap_or(&self.shared))
    }

    /// Undo the last entry of the shared history.
    pub fn undo(&mut self) -> Result<bool, ModelError> {
        let ret = self.shared.undo(&mut self.design);
        self.drop_missing_helices();
        ret
    }

    /// Redo the next entry of the shared history.
    pub fn redo(&mut self) -> Result<bool, ModelError> {
        let ret = self.shared.redo(&mut self.design);
        self.drop_missing_helices();
        ret
    }

    /// Forget the sandboxes and selection of the numbers that no helix carries since an undo
    /// or redo renumbered it.
    fn drop_missing_helices(&mut self) {
        let design = &self.design;
        self.sandboxes.retain(|id, sandbox| {
            let exists = design.helix(*id).is_some();
            if !exists {
                log::info!("Dropping sandbox of helix {} ({} entries)", id, sandbox.len());
            }
            exists
        });
        self.selection.0.retain(|id| design.helix(*id).is_some());
    }

    pub fn is_sandboxed(&self, id: HelixId) -> bool {
        self.sandboxes.contains_key(&id)
    }

    /// Give helix `id` its own empty history, or drop it and go back to the shared history.
    ///
    /// The entries of the shared history stay there while the helix is sandboxed, and the
    /// entries of a dropped sandbox are lost, their effects stay applied. Shared entries that
    /// wrote bases the sandbox modified can no longer be undone.
    pub fn set_sandboxed(&mut self, id: HelixId, enabled: bool) -> Result<(), ModelError> {
        self.design.try_get_helix(id)?;
        if enabled {
            if self.sandboxes.contains_key(&id) {
                return Err(ModelError::consistency(
                    ConsistencyViolation::AlreadySandboxed(id),
                ));
            }
            log::debug!("Sandboxing helix {}", id);
            self.sandboxes.insert(id, History::new());
        } else if let Some(sandbox) = self.sandboxes.remove(&id) {
            log::debug!(
                "Dropping sandbox of helix {} ({} entries)",
                id,
                sandbox.len()
            );
        }
        Ok(())
    }

    /// Change the number of bases of the part and of all its helices, as a single entry of
    /// the shared history.
    pub fn set_num_bases(&mut self, num_bases: usize) -> Result<(), ModelError> {
        if num_bases == self.num_bases() {
            return Ok(());
        }
        let ids: Vec<HelixId> = self.helix_ids().collect();
        let Part { design, shared, .. } = self;
        shared.atomic(design, change_num_bases_label(), |history, design| {
            history.execute(design, Box::new(SetCanonicalNumBases::new(num_bases)))?;
            for id in ids {
                for command in resize_commands(&*design, id, num_bases)? {
                    history.execute(design, command)?;
                }
            }
            Ok(())
        })
    }

    /// Give helix `id` the free number `number` of the same parity, as an entry of the shared
    /// history. The crossovers pointing to the helix and its selection follow it.
    pub fn renumber_helix(&mut self, id: HelixId, number: HelixId) -> Result<(), ModelError> {
        if self.sandboxes.contains_key(&id) {
            return Err(ModelError::consistency(ConsistencyViolation::Sandboxed(id)));
        }
        self.shared
            .execute(&mut self.design, Box::new(RenumberHelix::new(id, number)))?;
        if self.selection.0.remove(&id) {
            self.selection.0.insert(number);
        }
        Ok(())
    }

    /// Extend every end of the `strand` tracks of the part as far as it can go, as a single
    /// entry of the shared history. Sandboxed helices are left as is.
    pub fn drag_all_to_boundaries(&mut self, strand: StrandType) -> Result<(), ModelError> {
        let ids: Vec<HelixId> = self
            .helix_ids()
            .filter(|id| !self.sandboxes.contains_key(id))
            .collect();
        let Part { design, shared, .. } = self;
        shared.atomic(design, drag_all_ends_label(), |history, design| {
            for id in ids {
                drag_all_ends(history, design, id, strand)?;
            }
            Ok(())
        })
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ModelEvent) + 'static,
    {
        self.design.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.design.unsubscribe(id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_selected(&self, id: HelixId) -> bool {
        self.selection.contains(id)
    }

    /// Add helix `id` to the selection. Return false if it was already selected.
    pub fn select(&mut self, id: HelixId) -> Result<bool, ModelError> {
        self.design.try_get_helix(id)?;
        Ok(self.selection.0.insert(id))
    }

    /// Remove helix `id` from the selection. Return false if it was not selected.
    pub fn deselect(&mut self, id: HelixId) -> bool {
        self.selection.0.remove(&id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.0.clear()
    }

    pub fn to_archive(&self) -> ArchivedPart {
        ArchivedPart {
            helices: self.design.helices().values().map(|h| h.to_archive()).collect(),
        }
    }

    /// Load a part. Its number of bases is the one of its helices, which must all be placed
    /// on the lattice and agree on it.
    pub fn from_archive(archive: &ArchivedPart) -> Result<Self, ModelError> {
        let mut helices = Vec::with_capacity(archive.helices.len());
        for archived in archive.helices.iter() {
            let coord = archived.coord.ok_or_else(|| {
                ModelError::Format(format!("helix {} has no position", archived.number))
            })?;
            if Parity::from_number(archived.number) != Parity::from_coord(coord) {
                return Err(ModelError::consistency(
                    ConsistencyViolation::NumberParityMismatch {
                        number: archived.number,
                        coord,
                    },
                ));
            }
            helices.push(VirtualHelix::from_archive(archived)?);
        }
        let num_bases = helices
            .first()
            .map(|h| h.num_bases())
            .unwrap_or(DEFAULT_NUM_BASES);
        let mut ret = Self::new(num_bases);
        for helix in helices {
            if helix.num_bases() != num_bases {
                return Err(ModelError::consistency(
                    ConsistencyViolation::BaseCountMismatch {
                        expected: num_bases,
                        found: helix.num_bases(),
                    },
                ));
            }
            if ret.design.helix(helix.id()).is_some() {
                return Err(ModelError::consistency(
                    ConsistencyViolation::NumberInUse(helix.id()),
                ));
            }
            if let Some(coord) = helix.coord() {
                if ret.design.id_at(coord).is_some() {
                    return Err(ModelError::consistency(
                        ConsistencyViolation::CoordinateInUse(coord),
                    ));
                }
            }
            ret.design.insert_helix(helix);
        }
        ret.design.check_crossovers()?;
        ret.design.commit();
        Ok(ret)
    }
}
