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
use super::*;
use ensnano_history::Document;

/// A helix that does not belong to a part.
///
/// It chooses its own number of bases and records its changes in its own history.
#[derive(Debug)]
pub struct DetachedHelix {
    id: HelixId,
    design: Design,
    history: History<Design>,
    sandbox: Option<History<Design>>,
}

impl DetachedHelix {
    /// An empty helix, with the topology policy read from the environment.
    pub fn new(number: HelixId, num_bases: usize) -> Self {
        Self::with_policy(number, num_bases, TopologyPolicy::from_env())
    }

    pub fn with_policy(number: HelixId, num_bases: usize, policy: TopologyPolicy) -> Self {
        Self::from_virtual_helix(VirtualHelix::new(number, num_bases), policy)
    }

    pub(crate) fn from_virtual_helix(helix: VirtualHelix, policy: TopologyPolicy) -> Self {
        let id = helix.id();
        let mut design = Design::new(None, policy);
        design.insert_helix(helix);
        // nobody is subscribed yet, this only resets the pending changes
        design.commit();
        Self {
            id,
            design,
            history: History::new(),
            sandbox: None,
        }
    }

    /// Take the helix out, dropping the histories.
    pub(crate) fn take_helix(&mut self) -> Option<VirtualHelix> {
        self.history.clear();
        self.sandbox = None;
        self.design.remove_helix(self.id)
    }

    pub fn id(&self) -> HelixId {
        self.id
    }

    pub fn helix(&self) -> Option<&VirtualHelix> {
        self.design.helix(self.id)
    }

    pub fn track(&self, strand: StrandType) -> Result<&StrandTrack, ModelError> {
        self.design.track(self.id, strand)
    }

    pub fn num_bases(&self) -> usize {
        self.helix().map(|h| h.num_bases()).unwrap_or(0)
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

    /// The history commands are currently recorded in.
    pub fn history(&self) -> &History<Design> {
        self.sandbox.as_ref().unwrap_or(&self.history)
    }

    pub fn session(&mut self) -> Result<Session<'_>, ModelError> {
        let history = match self.sandbox.as_mut() {
            Some(sandbox) => sandbox,
            None => &mut self.history,
        };
        Session::new(self.id, &mut self.design, history)
    }

    pub fn is_sandboxed(&self) -> bool {
        self.sandbox.is_some()
    }

    /// Record the next commands in a new, empty history, or drop that history and go back to
    /// the regular one. Commands of a dropped sandbox stay applied, and the entries of the
    /// regular history that wrote the bases they modified refuse to be undone.
    pub fn set_sandboxed(&mut self, enabled: bool) -> Result<(), ModelError> {
        match (enabled, self.sandbox.take()) {
            (true, Some(sandbox)) => {
                self.sandbox = Some(sandbox);
                Err(ModelError::consistency(
                    ConsistencyViolation::AlreadySandboxed(self.id),
                ))
            }
            (true, None) => {
                log::debug!("Sandboxing detached helix {}", self.id);
                self.sandbox = Some(History::new());
                Ok(())
            }
            (false, Some(sandbox)) => {
                log::debug!(
                    "Dropping sandbox of detached helix {} ({} entries)",
                    self.id,
                    sandbox.len()
                );
                Ok(())
            }
            (false, None) => Ok(()),
        }
    }

    pub fn undo(&mut self) -> Result<bool, ModelError> {
        self.session()?.undo()
    }

    pub fn redo(&mut self) -> Result<bool, ModelError> {
        self.session()?.redo()
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

    pub fn to_archive(&self) -> Option<ArchivedHelix> {
        self.helix().map(VirtualHelix::to_archive)
    }

    /// Load a helix from its archive. Its crossovers must link it to itself.
    pub fn from_archive(archive: &ArchivedHelix) -> Result<Self, ModelError> {
        let mut helix = VirtualHelix::from_archive(archive)?;
        if let Some((from, _)) = helix.external_crossovers().first() {
            return Err(ModelError::consistency(
                ConsistencyViolation::ExternalCrossovers {
                    helix: helix.id(),
                    strand: from.strand,
                },
            ));
        }
        let parity = helix.parity();
        helix.set_identity(archive.number, None, parity);
        let ret = Self::from_virtual_helix(helix, TopologyPolicy::from_env());
        ret.design.check_crossovers()?;
        Ok(ret)
    }
}
