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
use super::{HelixId, VirtualHelix};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read access to a keyed collection of items.
pub trait Collection {
    type Key;
    type Item;
    fn get(&self, id: &Self::Key) -> Option<&Self::Item>;
    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a Self::Key, &'a Self::Item)> + 'a>;
    fn keys<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Self::Key> + 'a>;
    fn values<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Self::Item> + 'a>;
    fn len(&self) -> usize;
    fn contains_key(&self, id: &Self::Key) -> bool;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collections backed by a map of shared items.
pub trait HasMap {
    type Key: Ord + Eq;
    type Item;
    fn get_map(&self) -> &BTreeMap<Self::Key, Arc<Self::Item>>;
}

impl<T> Collection for T
where
    T: HasMap,
{
    type Key = <T as HasMap>::Key;
    type Item = <T as HasMap>::Item;

    fn get(&self, id: &T::Key) -> Option<&Self::Item> {
        self.get_map().get(id).map(|arc| arc.as_ref())
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a Self::Key, &'a Self::Item)> + 'a> {
        Box::new(self.get_map().iter().map(|(id, arc)| (id, arc.as_ref())))
    }

    fn keys<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Self::Key> + 'a> {
        Box::new(self.get_map().keys())
    }

    fn values<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Self::Item> + 'a> {
        Box::new(self.get_map().values().map(|arc| arc.as_ref()))
    }

    fn len(&self) -> usize {
        self.get_map().len()
    }

    fn contains_key(&self, id: &Self::Key) -> bool {
        self.get_map().contains_key(id)
    }
}

/// The virtual helices of a design, by number.
///
/// Cloning is cheap: helices are shared until one of the copies is modified, so a clone is a
/// snapshot of the connectivity of the design.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Helices(Arc<BTreeMap<HelixId, Arc<VirtualHelix>>>);

impl HasMap for Helices {
    type Key = HelixId;
    type Item = VirtualHelix;
    fn get_map(&self) -> &BTreeMap<HelixId, Arc<VirtualHelix>> {
        self.0.as_ref()
    }
}

impl Helices {
    pub(crate) fn get_mut(&mut self, id: &HelixId) -> Option<&mut VirtualHelix> {
        Arc::make_mut(&mut self.0).get_mut(id).map(Arc::make_mut)
    }

    pub(crate) fn insert(&mut self, helix: VirtualHelix) {
        Arc::make_mut(&mut self.0).insert(helix.id(), Arc::new(helix));
    }

    pub(crate) fn remove(&mut self, id: &HelixId) -> Option<VirtualHelix> {
        Arc::make_mut(&mut self.0)
            .remove(id)
            .map(|arc| Arc::try_unwrap(arc).unwrap_or_else(|arc| VirtualHelix::clone(&arc)))
    }
}
