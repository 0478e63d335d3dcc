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
//! Reversible commands and the undo/redo log they are recorded in.
//!
//! A [`History`] mutates a [`Document`] only through [`Command`]s. Each command knows how to
//! apply itself and how to revert what it did, so undoing is replaying `revert` on the entries
//! before the cursor and redoing is replaying `apply` on the entries after it.
//!
//! Commands executed between [`History::begin_macro`] and [`History::end_macro`] are grouped
//! into a single [`Macro`] entry. Macros cannot be nested. Leaving a macro open forever is a
//! contract violation: while a macro is open, undo and redo are refused and nothing is
//! committed to the document's observers.
//!
//! A command may refuse to revert when the document no longer holds what it wrote, for example
//! because another history modified the same data since. The refused entry then stays before
//! the cursor.

use std::fmt;

mod label;
mod observers;

pub use label::Label;
pub use observers::{Observers, SubscriptionId};

/// The state mutated by the commands of a [`History`].
pub trait Document {
    type Error: From<HistoryError>;
    /// Identifies a part of the document, see [`Command::touches`].
    type Key;

    /// Called once after each outermost unit of work (a command executed outside of a macro, a
    /// closed or aborted macro, an undo or a redo) has completed.
    fn commit(&mut self) {}
}

/// A reversible unit of mutation.
pub trait Command<D: Document + ?Sized> {
    /// Perform the forward effect.
    ///
    /// Implementors must check every precondition before writing anything, so that an `Err`
    /// leaves `doc` exactly as it was.
    fn apply(&mut self, doc: &mut D) -> Result<(), D::Error>;

    /// Undo the effect of the last successful call to `apply`.
    ///
    /// Implementors must check that `doc` still holds what `apply` wrote before writing
    /// anything, so that an `Err` leaves `doc` exactly as it was.
    fn revert(&mut self, doc: &mut D) -> Result<(), D::Error>;

    fn label(&self) -> Label;

    /// Whether the command modifies the part of the document identified by `key`. Commands
    /// that cannot tell must answer `true`.
    fn touches(&self, _key: &D::Key) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("cannot open macro \"{requested}\", macro \"{open}\" is still open")]
    MacroAlreadyOpen { open: Label, requested: Label },
    #[error("no macro is open")]
    NoOpenMacro,
    #[error("cannot move in history while macro \"{open}\" is open")]
    MacroOpen { open: Label },
}

/// An ordered, named sequence of commands that is applied and reverted as a whole.
pub struct Macro<D: Document + ?Sized> {
    label: Label,
    children: Vec<Box<dyn Command<D>>>,
}

impl<D: Document + ?Sized> Macro<D> {
    pub fn new<L: Into<Label>>(label: L) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The labels of the children, in execution order.
    pub fn child_labels(&self) -> Vec<Label> {
        self.children.iter().map(|c| c.label()).collect()
    }

    /// Revert the children in reverse order. If one of them refuses, the children reverted
    /// before it are applied again.
    fn revert_children(&mut self, doc: &mut D) -> Result<(), D::Error> {
        for i in (0..self.children.len()).rev() {
            if let Err(e) = self.children[i].revert(doc) {
                log::debug!(
                    "Child {} of macro \"{}\" cannot be reverted, restoring the others",
                    i,
                    self.label
                );
                for child in self.children[i + 1..].iter_mut() {
                    if child.apply(doc).is_err() {
                        log::error!(
                            "Could not apply \"{}\" again in macro \"{}\"",
                            child.label(),
                            self.label
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<D: Document + ?Sized> Command<D> for Macro<D> {
    fn apply(&mut self, doc: &mut D) -> Result<(), D::Error> {
        for i in 0..self.children.len() {
            if let Err(e) = self.children[i].apply(doc) {
                log::debug!(
                    "Child {} of macro \"{}\" failed, rolling back",
                    i,
                    self.label
                );
                for child in self.children[..i].iter_mut().rev() {
                    if child.revert(doc).is_err() {
                        log::error!(
                            "Could not roll back \"{}\" in macro \"{}\"",
                            child.label(),
                            self.label
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn revert(&mut self, doc: &mut D) -> Result<(), D::Error> {
        self.revert_children(doc)
    }

    fn label(&self) -> Label {
        self.label.clone()
    }

    fn touches(&self, key: &D::Key) -> bool {
        self.children.iter().any(|c| c.touches(key))
    }
}

impl<D: Document + ?Sized> fmt::Debug for Macro<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Macro")
            .field("label", &self.label)
            .field("children", &self.child_labels())
            .finish()
    }
}

/// A list of commands with a cursor separating the applied entries from the reverted ones.
pub struct History<D: Document + ?Sized> {
    entries: Vec<Box<dyn Command<D>>>,
    /// Number of applied entries. `entries[..cursor]` are applied, `entries[cursor..]` can be
    /// redone.
    cursor: usize,
    recording: Option<Macro<D>>,
}

impl<D: Document + ?Sized> Default for History<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            recording: None,
        }
    }
}

impl<D: Document + ?Sized + 'static> History<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `command` and record it.
    ///
    /// If a macro is open the command becomes one of its children, otherwise it becomes a new
    /// entry and every entry after the cursor is discarded. If `apply` fails, nothing is
    /// recorded and the error is returned.
    pub fn execute(
        &mut self,
        doc: &mut D,
        mut command: Box<dyn Command<D>>,
    ) -> Result<(), D::Error> {
        command.apply(doc)?;
        log::trace!("Executed \"{}\"", command.label());
        if let Some(recording) = self.recording.as_mut() {
            recording.children.push(command);
        } else {
            self.record(command);
            doc.commit();
        }
        Ok(())
    }

    fn record(&mut self, command: Box<dyn Command<D>>) {
        if self.cursor < self.entries.len() {
            log::debug!(
                "Discarding {} redoable entries",
                self.entries.len() - self.cursor
            );
            self.entries.truncate(self.cursor);
        }
        self.entries.push(command);
        self.cursor = self.entries.len();
    }

    pub fn begin_macro<L: Into<Label>>(&mut self, label: L) -> Result<(), HistoryError> {
        let label = label.into();
        if let Some(open) = self.recording.as_ref() {
            log::error!(
                "Attempt to open macro \"{}\" inside macro \"{}\"",
                label,
                open.label
            );
            return Err(HistoryError::MacroAlreadyOpen {
                open: open.label.clone(),
                requested: label,
            });
        }
        log::trace!("Opening macro \"{}\"", label);
        self.recording = Some(Macro::new(label));
        Ok(())
    }

    /// Close the open macro and record it as a single entry. A macro with no children is
    /// dropped.
    pub fn end_macro(&mut self, doc: &mut D) -> Result<(), HistoryError> {
        let finished = self.recording.take().ok_or(HistoryError::NoOpenMacro)?;
        if finished.is_empty() {
            log::debug!("Dropping empty macro \"{}\"", finished.label);
        } else {
            log::trace!(
                "Closing macro \"{}\" with {} children",
                finished.label,
                finished.len()
            );
            self.record(Box::new(finished));
        }
        doc.commit();
        Ok(())
    }

    /// Revert every command of the open macro and discard it.
    pub fn abort_macro(&mut self, doc: &mut D) -> Result<(), HistoryError> {
        let mut aborted = self.recording.take().ok_or(HistoryError::NoOpenMacro)?;
        log::debug!(
            "Aborting macro \"{}\" ({} children)",
            aborted.label,
            aborted.len()
        );
        if aborted.revert_children(doc).is_err() {
            log::error!("Macro \"{}\" could not be fully reverted", aborted.label);
        }
        doc.commit();
        Ok(())
    }

    /// Run `f` inside a macro labeled `label`.
    ///
    /// If `f` succeeds the macro is closed and recorded. If it fails, the commands it already
    /// executed are reverted before the error is returned.
    pub fn atomic<T, L, F>(&mut self, doc: &mut D, label: L, f: F) -> Result<T, D::Error>
    where
        L: Into<Label>,
        F: FnOnce(&mut Self, &mut D) -> Result<T, D::Error>,
    {
        self.begin_macro(label)?;
        match f(self, doc) {
            Ok(ret) => {
                self.end_macro(doc)?;
                Ok(ret)
            }
            Err(e) => {
                self.abort_macro(doc)?;
                Err(e)
            }
        }
    }

    fn check_not_recording(&self) -> Result<(), HistoryError> {
        if let Some(open) = self.recording.as_ref() {
            log::error!("Cannot undo or redo while macro \"{}\" is open", open.label);
            Err(HistoryError::MacroOpen {
                open: open.label.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Revert the entry before the cursor. Return `Ok(false)` if there was nothing to undo.
    ///
    /// If the entry refuses to revert, the cursor does not move and the error is returned.
    pub fn undo(&mut self, doc: &mut D) -> Result<bool, D::Error> {
        self.check_not_recording()?;
        if self.cursor == 0 {
            return Ok(false);
        }
        let entry = &mut self.entries[self.cursor - 1];
        log::debug!("Undo \"{}\"", entry.label());
        if let Err(e) = entry.revert(doc) {
            log::warn!("\"{}\" could not be undone", entry.label());
            return Err(e);
        }
        self.cursor -= 1;
        doc.commit();
        Ok(true)
    }

    /// Apply again the entry after the cursor. Return `Ok(false)` if there was nothing to redo.
    pub fn redo(&mut self, doc: &mut D) -> Result<bool, D::Error> {
        self.check_not_recording()?;
        if self.cursor == self.entries.len() {
            return Ok(false);
        }
        let entry = &mut self.entries[self.cursor];
        log::debug!("Redo \"{}\"", entry.label());
        entry.apply(doc)?;
        self.cursor += 1;
        doc.commit();
        Ok(true)
    }

    /// Forget the entries that touch `key`, applied or not. Return the number of forgotten
    /// entries. An open macro is left as is.
    pub fn forget(&mut self, key: &D::Key) -> usize {
        let before = self.entries.len();
        let mut kept = Vec::with_capacity(before);
        let mut cursor = self.cursor;
        for (i, entry) in self.entries.drain(..).enumerate() {
            if entry.touches(key) {
                log::debug!("Forgetting \"{}\"", entry.label());
                if i < self.cursor {
                    cursor -= 1;
                }
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        self.cursor = cursor;
        before - self.entries.len()
    }

    /// Forget every entry. An open macro is forgotten too, its commands stay applied.
    pub fn clear(&mut self) {
        if let Some(open) = self.recording.take() {
            log::warn!("Clearing history while macro \"{}\" is open", open.label);
        }
        self.entries.clear();
        self.cursor = 0;
    }
}

impl<D: Document + ?Sized> History<D> {
    pub fn can_undo(&self) -> bool {
        self.recording.is_none() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.recording.is_none() && self.cursor < self.entries.len()
    }

    pub fn undo_label(&self) -> Option<Label> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|e| e.label())
    }

    pub fn redo_label(&self) -> Option<Label> {
        self.entries.get(self.cursor).map(|e| e.label())
    }

    /// Labels of all entries, applied ones first.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.entries.iter().map(|e| e.label())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_recording_macro(&self) -> bool {
        self.recording.is_some()
    }

    pub fn open_macro_label(&self) -> Option<&Label> {
        self.recording.as_ref().map(|m| &m.label)
    }
}

impl<D: Document + ?Sized> fmt::Debug for History<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.labels().collect::<Vec<_>>())
            .field("cursor", &self.cursor)
            .field("open_macro", &self.open_macro_label())
            .finish()
    }
}
