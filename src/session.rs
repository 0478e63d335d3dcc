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
use super::design_operations::*;
use super::*;
use std::convert::TryFrom;

/// Mutable access to one helix of a design through the history that records its changes.
///
/// A session is obtained from the [`Part`] owning the helix, or from a [`DetachedHelix`]. The
/// history is the sandbox of the helix if it has one.
pub struct Session<'a> {
    helix: HelixId,
    design: &'a mut Design,
    history: &'a mut History<Design>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        helix: HelixId,
        design: &'a mut Design,
        history: &'a mut History<Design>,
    ) -> Result<Self, ModelError> {
        design.try_get_helix(helix)?;
        Ok(Self {
            helix,
            design,
            history,
        })
    }

    pub fn helix_id(&self) -> HelixId {
        self.helix
    }

    pub fn helix(&self) -> Option<&VirtualHelix> {
        self.design.helix(self.helix)
    }

    pub fn track(&self, strand: StrandType) -> Result<&StrandTrack, ModelError> {
        self.design.track(self.helix, strand)
    }

    pub fn design(&self) -> &Design {
        &*self.design
    }

    pub fn history(&self) -> &History<Design> {
        &*self.history
    }

    /// Execute any command on the history of the session.
    pub fn execute<C>(&mut self, command: C) -> Result<(), ModelError>
    where
        C: Command<Design> + 'static,
    {
        self.history.execute(self.design, Box::new(command))
    }

    pub fn connect(&mut self, strand: StrandType, from: isize, to: isize) -> Result<(), ModelError> {
        self.execute(ConnectStrand::new(self.helix, strand, from, to))
    }

    pub fn clear(&mut self, strand: StrandType, from: f64, to: f64) -> Result<(), ModelError> {
        self.execute(ClearStrand::new(self.helix, strand, from, to))
    }

    pub fn set_loop_or_skip(
        &mut self,
        strand: StrandType,
        index: isize,
        count: i32,
    ) -> Result<(), ModelError> {
        self.execute(SetLoopOrSkip::new(self.helix, strand, index, count))
    }

    /// Install a crossover between `from_index` on this helix and `to` on the same strand type.
    pub fn install_crossover(
        &mut self,
        strand: StrandType,
        from_index: isize,
        to: (HelixId, isize),
        direction: CrossoverDirection,
    ) -> Result<(), ModelError> {
        self.execute(InstallCrossover::new(
            strand,
            (self.helix, from_index),
            to,
            direction,
        ))
    }

    /// Whether [`Self::install_crossover`] would succeed, without modifying anything.
    pub fn can_install_crossover(
        &self,
        strand: StrandType,
        from_index: isize,
        to: (HelixId, isize),
        direction: CrossoverDirection,
    ) -> Result<(), ModelError> {
        InstallCrossover::new(strand, (self.helix, from_index), to, direction)
            .check(&*self.design)
    }

    /// Remove the crossover whose 3' end is at `index`.
    pub fn remove_crossover(&mut self, strand: StrandType, index: isize) -> Result<(), ModelError> {
        self.execute(RemoveCrossover::new(self.helix, strand, index))
    }

    /// Extend the run ending at `index` as far as it can go without reaching another run. Does
    /// nothing if the end cannot move.
    pub fn drag_to_boundary(&mut self, strand: StrandType, index: isize) -> Result<(), ModelError> {
        let bound = self.track(strand)?.drag_bound(index);
        if bound.is_some() && bound == usize::try_from(index).ok() {
            return Ok(());
        }
        self.execute(DragToBoundary::new(self.helix, strand, index))
    }

    /// Drag every end of a track to its boundary, as a single history entry.
    pub fn drag_all_to_boundaries(&mut self, strand: StrandType) -> Result<(), ModelError> {
        let helix = self.helix;
        self.history
            .atomic(self.design, drag_all_ends_label(), |history, design| {
                drag_all_ends(history, design, helix, strand)
            })
    }

    /// Empty every base of the strand going through `index`, including the bases it reaches
    /// on other helices.
    pub fn remove_strand(&mut self, strand: StrandType, index: isize) -> Result<(), ModelError> {
        self.execute(RemoveStrand::new(self.helix, strand, index))
    }

    /// Link each base of the helix whose only link is a crossover to its free neighbour.
    pub fn repair_single_base_crossovers(&mut self) -> Result<(), ModelError> {
        self.execute(RepairSingleBaseCrossovers::new(self.helix))
    }

    /// Change the number of bases of the helix.
    ///
    /// Shrinking clears the removed bases first. All the commands are grouped in one macro
    /// so that a single undo restores both the length and the content.
    pub fn set_num_bases(&mut self, num_bases: usize) -> Result<(), ModelError> {
        let mut commands = resize_commands(&*self.design, self.helix, num_bases)?;
        if commands.len() <= 1 {
            return match commands.pop() {
                Some(command) => self.history.execute(self.design, command),
                None => Ok(()),
            };
        }
        self.history
            .atomic(self.design, change_num_bases_label(), |history, design| {
                for command in commands {
                    history.execute(design, command)?;
                }
                Ok(())
            })
    }

    pub fn begin_macro<L: Into<Label>>(&mut self, label: L) -> Result<(), ModelError> {
        Ok(self.history.begin_macro(label)?)
    }

    pub fn end_macro(&mut self) -> Result<(), ModelError> {
        Ok(self.history.end_macro(self.design)?)
    }

    pub fn abort_macro(&mut self) -> Result<(), ModelError> {
        Ok(self.history.abort_macro(self.design)?)
    }

    /// Run `f` in a macro labeled `label`. If `f` fails, what it did is reverted.
    pub fn atomic<T, L, F>(&mut self, label: L, f: F) -> Result<T, ModelError>
    where
        L: Into<Label>,
        F: FnOnce(&mut Self) -> Result<T, ModelError>,
    {
        self.begin_macro(label)?;
        match f(self) {
            Ok(ret) => {
                self.end_macro()?;
                Ok(ret)
            }
            Err(e) => {
                self.abort_macro()?;
                Err(e)
            }
        }
    }

    pub fn undo(&mut self) -> Result<bool, ModelError> {
        self.history.undo(self.design)
    }

    pub fn redo(&mut self) -> Result<bool, ModelError> {
        self.history.redo(self.design)
    }
}
