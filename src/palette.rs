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
//! Colors of the strands of a design.
//!
//! [`OligoColors`] gives a color to each strand it is asked about, taking the colors of a
//! [`Palette`] in turn.
use ahash::RandomState;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::hash::Hash;

/// An RGB color, `0xRRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color(pub u32);

/// Kelly's colors of maximum contrast.
const KELLY: [u32; 19] = [
    0xF3C300, 0x875692, // 0xF38400, // Orange, too close to others
    0xA1CAF1, 0xBE0032, 0xC2B280, 0x848482, 0x008856, 0xE68FAC, 0x0067A5, 0xF99379, 0x604E97,
    0xF6A600, 0xB3446C, 0xDCD300, 0x882D17, 0x8DB600, 0x654522, 0xE25822, 0x2B3D26,
];

pub trait Palette {
    fn colors(&self) -> &[Color];
    /// Change the order of the colors.
    fn shuffle(&mut self);
}

#[derive(Clone, Debug)]
pub struct DefaultPalette {
    colors: Vec<Color>,
}

impl Default for DefaultPalette {
    fn default() -> Self {
        Self {
            colors: KELLY.iter().map(|c| Color(*c)).collect(),
        }
    }
}

impl DefaultPalette {
    /// `None` if `colors` is empty.
    pub fn with_colors(colors: Vec<Color>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors })
        }
    }
}

impl Palette for DefaultPalette {
    fn colors(&self) -> &[Color] {
        self.colors.as_slice()
    }

    fn shuffle(&mut self) {
        self.colors.shuffle(&mut rand::thread_rng())
    }
}

/// Assigns colors to strands identified by keys of type `K`, typically the address of their
/// 5' end.
pub struct OligoColors<K: Hash + Eq, P: Palette = DefaultPalette> {
    palette: P,
    assigned: HashMap<K, Color, RandomState>,
    next: usize,
}

impl<K: Hash + Eq> Default for OligoColors<K, DefaultPalette> {
    fn default() -> Self {
        Self::new(DefaultPalette::default())
    }
}

impl<K: Hash + Eq, P: Palette> OligoColors<K, P> {
    pub fn new(palette: P) -> Self {
        Self {
            palette,
            assigned: HashMap::with_hasher(RandomState::new()),
            next: 0,
        }
    }

    /// The color of `key`. A key seen for the first time gets the next color of the palette,
    /// and the palette is shuffled each time all of its colors have been handed out.
    pub fn color_of(&mut self, key: K) -> Color {
        if let Some(color) = self.assigned.get(&key) {
            return *color;
        }
        let color = self.next_color();
        self.assigned.insert(key, color);
        color
    }

    fn next_color(&mut self) -> Color {
        let len = self.palette.colors().len();
        if len == 0 {
            log::warn!("Empty palette");
            return Color::default();
        }
        if self.next >= len {
            self.palette.shuffle();
            self.next = 0;
        }
        let color = self.palette.colors()[self.next];
        self.next += 1;
        color
    }

    pub fn get(&self, key: &K) -> Option<Color> {
        self.assigned.get(key).cloned()
    }

    /// Give `key` a color of the caller's choice.
    pub fn set_color(&mut self, key: K, color: Color) {
        self.assigned.insert(key, color);
    }

    pub fn forget(&mut self, key: &K) -> Option<Color> {
        self.assigned.remove(key)
    }

    /// Forget all the assigned colors.
    pub fn clear(&mut self) {
        self.assigned.clear();
        self.next = 0;
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    pub fn palette(&self) -> &P {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut P {
        &mut self.palette
    }
}
