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
//! This modules defines the commands that modify the tracks of a design.
//!
//! A command does not modify the design until all of its preconditions are checked: it first
//! computes a [`Patch`] of the slots and loop/skip entries it is going to write, using only a
//! shared reference to the design, then writes it. Writing a patch returns the patch of the
//! overwritten values, which is what the command keeps to revert itself. A command refuses to
//! revert if the design no longer holds the values it wrote.

use super::consts::{CHANGE_NUM_BASES_LABEL, DRAG_ALL_ENDS_LABEL};
use super::*;
use std::collections::BTreeMap;

/// Values to write in the slots and loop/skip ledgers of a design.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Patch {
    slots: BTreeMap<BaseAddress, BaseSlot>,
    loops: BTreeMap<BaseAddress, Option<i32>>,
}

impl Patch {
    /// Write the patch in `design` and return the patch restoring the overwritten values.
    fn apply(&self, design: &mut Design) -> Patch {
        let mut inverse = Patch::default();
        for (address, slot) in self.slots.iter() {
            match design
                .helix_mut(address.helix)
                .and_then(|h| h.track_mut(address.strand).slot_mut(address.index))
            {
                Some(target) => {
                    inverse
                        .slots
                        .insert(*address, std::mem::replace(target, *slot));
                }
                None => log::error!("Patch writes to missing slot {}", address),
            }
            design.mark_bases_modified(address.helix);
        }
        for (address, count) in self.loops.iter() {
            match design.helix_mut(address.helix) {
                Some(helix) => {
                    let previous = helix
                        .track_mut(address.strand)
                        .loops_mut()
                        .set(address.index, *count);
                    inverse.loops.insert(*address, previous);
                }
                None => log::error!("Patch writes loop/skip of missing helix {}", address),
            }
            design.mark_bases_modified(address.helix);
        }
        inverse
    }

    /// Check that `design` still holds the values of the patch.
    fn check_written(&self, design: &Design) -> Result<(), ModelError> {
        for (address, slot) in self.slots.iter() {
            if design.slot(*address) != Some(slot) {
                return Err(ModelError::consistency(ConsistencyViolation::StaleEntry(
                    *address,
                )));
            }
        }
        for (address, count) in self.loops.iter() {
            let current = design
                .track(address.helix, address.strand)
                .map(|t| t.loops().get(address.index));
            if current != Ok(*count) {
                return Err(ModelError::consistency(ConsistencyViolation::StaleEntry(
                    *address,
                )));
            }
        }
        Ok(())
    }

    fn touches(&self, helix: HelixId) -> bool {
        self.slots
            .keys()
            .chain(self.loops.keys())
            .any(|a| a.helix == helix)
    }
}

/// The last patch written by a command, and the values it overwrote while it is applied.
#[derive(Clone, Debug, Default)]
struct PatchRecord {
    written: Patch,
    overwritten: Option<Patch>,
}

impl PatchRecord {
    fn write(&mut self, design: &mut Design, patch: Patch) {
        self.overwritten = Some(patch.apply(design));
        self.written = patch;
    }

    fn revert(&mut self, design: &mut Design, label: &str) -> Result<(), ModelError> {
        match self.overwritten.take() {
            Some(overwritten) => {
                if let Err(e) = self.written.check_written(design) {
                    self.overwritten = Some(overwritten);
                    return Err(e);
                }
                overwritten.apply(design);
            }
            None => log::error!("\"{}\" reverted but never applied", label),
        }
        Ok(())
    }
}

/// Builds a patch, reading the current values from the staged writes first and from the design
/// otherwise.
struct PatchBuilder<'a> {
    design: &'a Design,
    patch: Patch,
}

impl<'a> PatchBuilder<'a> {
    fn new(design: &'a Design) -> Self {
        Self {
            design,
            patch: Default::default(),
        }
    }

    fn finish(self) -> Patch {
        self.patch
    }

    fn direction(&self, address: BaseAddress) -> Result<Direction, ModelError> {
        Ok(self
            .design
            .track(address.helix, address.strand)?
            .direction())
    }

    fn slot(&self, address: BaseAddress) -> Result<BaseSlot, ModelError> {
        if let Some(slot) = self.patch.slots.get(&address) {
            return Ok(*slot);
        }
        let track = self.design.track(address.helix, address.strand)?;
        track.slot(address.index).cloned().ok_or_else(|| {
            ModelError::Range(RangeViolation::Index {
                index: address.index as isize,
                num_bases: track.num_bases(),
            })
        })
    }

    fn set_link(
        &mut self,
        address: BaseAddress,
        side: Side,
        link: Option<Link>,
    ) -> Result<(), ModelError> {
        let mut slot = self.slot(address)?;
        slot.set_link(side, link);
        self.patch.slots.insert(address, slot);
        Ok(())
    }

    fn loop_at(&self, address: BaseAddress) -> Result<Option<i32>, ModelError> {
        if let Some(count) = self.patch.loops.get(&address) {
            return Ok(*count);
        }
        Ok(self
            .design
            .track(address.helix, address.strand)?
            .loops()
            .get(address.index))
    }

    fn set_loop(&mut self, address: BaseAddress, count: i32) {
        let count = if count == 0 { None } else { Some(count) };
        self.patch.loops.insert(address, count);
    }

    /// Join `low` and the base right above it by a natural link.
    fn link_natural(&mut self, low: BaseAddress) -> Result<(), ModelError> {
        let high = BaseAddress {
            index: low.index + 1,
            ..low
        };
        for (address, side) in [(low, Side::High), (high, Side::Low)].iter() {
            if let Some(Link::Crossover(_)) = self.slot(*address)?.link(*side) {
                return Err(ModelError::topology(
                    *address,
                    TopologyViolation::ThroughCrossover,
                ));
            }
        }
        self.set_link(low, Side::High, Some(Link::Natural))?;
        self.set_link(high, Side::Low, Some(Link::Natural))
    }

    /// Remove the natural link between `low` and the base right above it, if there is one.
    fn cut_natural(&mut self, low: BaseAddress) -> Result<(), ModelError> {
        if self.slot(low)?.link(Side::High) == Some(Link::Natural) {
            let high = BaseAddress {
                index: low.index + 1,
                ..low
            };
            self.set_link(low, Side::High, None)?;
            self.set_link(high, Side::Low, None)?;
        }
        Ok(())
    }

    /// Remove every link of the base at `address`, on both ends of each link, and its
    /// loop/skip.
    fn empty_base(&mut self, address: BaseAddress) -> Result<(), ModelError> {
        let slot = self.slot(address)?;
        for side in [Side::Low, Side::High].iter() {
            match slot.link(*side) {
                None => (),
                Some(Link::Natural) => {
                    if let Some(neighbour) = address.shifted(side.step()) {
                        self.set_link(neighbour, side.opposite(), None)?;
                    }
                }
                Some(Link::Crossover(target)) => {
                    // the target may already have been emptied by this patch
                    if let Some(target_side) = self.slot(target)?.side_linked_to(address) {
                        self.set_link(target, target_side, None)?;
                    }
                }
            }
        }
        self.patch.slots.insert(address, BaseSlot::default());
        if self.loop_at(address)?.is_some() {
            self.set_loop(address, 0);
        }
        Ok(())
    }

    /// The addresses of the slots written so far.
    fn written_addresses(&self) -> Vec<BaseAddress> {
        self.patch.slots.keys().cloned().collect()
    }

    /// Link each base of `candidates` whose only link is a crossover to its neighbour on its
    /// free side, so that no run is reduced to a single base hanging on a crossover.
    ///
    /// A base whose neighbour is past the edge of the track, or has a crossover facing it, is
    /// left as is.
    fn extend_lone_crossover_bases(
        &mut self,
        candidates: Vec<BaseAddress>,
    ) -> Result<(), ModelError> {
        for address in candidates {
            let slot = self.slot(address)?;
            let free_side = match (slot.link(Side::Low), slot.link(Side::High)) {
                (Some(Link::Crossover(_)), None) => Side::High,
                (None, Some(Link::Crossover(_))) => Side::Low,
                _ => continue,
            };
            let neighbour = match address.shifted(free_side.step()) {
                Some(neighbour) => neighbour,
                None => continue,
            };
            match self.slot(neighbour) {
                Ok(facing) if facing.link(free_side.opposite()).is_none() => (),
                _ => {
                    log::debug!("Cannot extend the single base crossover at {}", address);
                    continue;
                }
            }
            log::trace!("Extending the single base crossover at {}", address);
            let low = if free_side == Side::High {
                address
            } else {
                neighbour
            };
            self.link_natural(low)?;
        }
        Ok(())
    }
}

/// The address of `index` on a track of the design, checking that it is in range.
fn checked_address(
    design: &Design,
    helix: HelixId,
    strand: StrandType,
    index: isize,
) -> Result<BaseAddress, ModelError> {
    let track = design.track(helix, strand)?;
    let index = track.checked_index(index).ok_or_else(|| {
        ModelError::Range(RangeViolation::Index {
            index,
            num_bases: track.num_bases(),
        })
    })?;
    Ok(BaseAddress::new(helix, strand, index))
}

macro_rules! impl_patch_command {
    ($command:ty, $label:expr) => {
        impl Command<Design> for $command {
            fn apply(&mut self, design: &mut Design) -> Result<(), ModelError> {
                let patch = self.plan(design)?;
                self.record.write(design, patch);
                Ok(())
            }

            fn revert(&mut self, design: &mut Design) -> Result<(), ModelError> {
                self.record.revert(design, $label)
            }

            fn label(&self) -> Label {
                $label.into()
            }

            fn touches(&self, helix: &HelixId) -> bool {
                self.record.written.touches(*helix)
            }
        }
    };
}

/// Connect the bases `from` to `to` of a track by natural links.
///
/// Requires `0 <= from < to < num_bases`. Runs overlapping the span are merged with it.
#[derive(Debug, Clone)]
pub struct ConnectStrand {
    helix: HelixId,
    strand: StrandType,
    from: isize,
    to: isize,
    record: PatchRecord,
}

impl ConnectStrand {
    pub fn new(helix: HelixId, strand: StrandType, from: isize, to: isize) -> Self {
        Self {
            helix,
            strand,
            from,
            to,
            record: Default::default(),
        }
    }

    fn plan(&self, design: &Design) -> Result<Patch, ModelError> {
        let num_bases = design.track(self.helix, self.strand)?.num_bases();
        if self.from < 0 || self.to >= num_bases as isize || self.from >= self.to {
            return Err(ModelError::Range(RangeViolation::Span {
                from: self.from,
                to: self.to,
                num_bases,
            }));
        }
        let mut builder = PatchBuilder::new(design);
        for i in self.from..self.to {
            builder.link_natural(BaseAddress::new(self.helix, self.strand, i as usize))?;
        }
        Ok(builder.finish())
    }
}

impl_patch_command!(ConnectStrand, "Connect strand");

/// Empty the bases between two bounds of a track.
///
/// The bounds are rounded half up to the nearest multiple of one half, ordered, and clamped to
/// the track. An integer bound `k` empties base `k`, a bound `k + 0.5` only cuts the link
/// between `k` and `k + 1`. So `clear(i - 0.5, j + 0.5)` empties `i..=j` and detaches the run
/// from its neighbours, while `clear(3.5, 4.5)` empties base 4 only.
///
/// When the design prohibits single base crossovers, a base left with a crossover as its only
/// link is linked back to its neighbour on the other side.
#[derive(Debug, Clone)]
pub struct ClearStrand {
    helix: HelixId,
    strand: StrandType,
    from: f64,
    to: f64,
    repair: bool,
    record: PatchRecord,
}

impl ClearStrand {
    pub fn new(helix: HelixId, strand: StrandType, from: f64, to: f64) -> Self {
        Self {
            helix,
            strand,
            from,
            to,
            repair: true,
            record: Default::default(),
        }
    }

    /// Never link back the bases left with a crossover as their only link.
    pub fn without_repair(mut self) -> Self {
        self.repair = false;
        self
    }

    fn plan(&self, design: &Design) -> Result<Patch, ModelError> {
        for bound in [self.from, self.to].iter() {
            if !bound.is_finite() {
                return Err(ModelError::Range(RangeViolation::NonFiniteBound(*bound)));
            }
        }
        let num_bases = design.track(self.helix, self.strand)?.num_bases() as i64;
        // positions in half bases: even values are bases, odd values are links
        let half_round = |x: f64| (2. * x + 0.5).floor() as i64;
        let (from, to) = (half_round(self.from), half_round(self.to));
        let low = from.min(to).max(-1);
        let high = from.max(to).min(2 * num_bases - 1);

        let mut builder = PatchBuilder::new(design);
        let address = |i: i64| BaseAddress::new(self.helix, self.strand, i as usize);
        for pos in low..=high {
            if pos.rem_euclid(2) == 0 {
                builder.empty_base(address(pos / 2))?;
            } else {
                let below = (pos - 1) / 2;
                if below >= 0 && below + 1 < num_bases {
                    builder.cut_natural(address(below))?;
                }
            }
        }
        if self.repair && design.policy().prohibit_single_base_crossovers {
            let written = builder.written_addresses();
            builder.extend_lone_crossover_bases(written)?;
        }
        Ok(builder.finish())
    }
}

impl_patch_command!(ClearStrand, "Clear strand");

/// Set the loop (positive) or skip (negative) count of a base. A count of zero removes the
/// entry.
#[derive(Debug, Clone)]
pub struct SetLoopOrSkip {
    helix: HelixId,
    strand: StrandType,
    index: isize,
    count: i32,
    record: PatchRecord,
}

impl SetLoopOrSkip {
    pub fn new(helix: HelixId, strand: StrandType, index: isize, count: i32) -> Self {
        Self {
            helix,
            strand,
            index,
            count,
            record: Default::default(),
        }
    }

    fn plan(&self, design: &Design) -> Result<Patch, ModelError> {
        let address = checked_address(design, self.helix, self.strand, self.index)?;
        let mut builder = PatchBuilder::new(design);
        builder.set_loop(address, self.count);
        Ok(builder.finish())
    }
}

impl_patch_command!(SetLoopOrSkip, "Set loop or skip");

/// Which end of a crossover the `from` base is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrossoverDirection {
    /// The strand leaves `from` by its 3' side and enters `to` by its 5' side.
    ThreeToFive,
    /// The strand leaves `to` by its 3' side and enters `from` by its 5' side.
    FiveToThree,
}

/// Link the 3' end of a run to the 5' end of another run of the same strand type.
///
/// The 3' participant must be a 3' end and the 5' participant a 5' end. Both slots are written
/// by the same command, so the crossover is installed and removed as a whole.
#[derive(Debug, Clone)]
pub struct InstallCrossover {
    strand: StrandType,
    from: (HelixId, isize),
    to: (HelixId, isize),
    direction: CrossoverDirection,
    record: PatchRecord,
}

impl InstallCrossover {
    pub fn new(
        strand: StrandType,
        from: (HelixId, isize),
        to: (HelixId, isize),
        direction: CrossoverDirection,
    ) -> Self {
        Self {
            strand,
            from,
            to,
            direction,
            record: Default::default(),
        }
    }

    /// Check whether the crossover could be installed in `design` without modifying it.
    pub fn check(&self, design: &Design) -> Result<(), ModelError> {
        self.plan(design).map(|_| ())
    }

    fn plan(&self, design: &Design) -> Result<Patch, ModelError> {
        let from = checked_address(design, self.from.0, self.strand, self.from.1)?;
        let to = checked_address(design, self.to.0, self.strand, self.to.1)?;
        let (prime3, prime5) = match self.direction {
            CrossoverDirection::ThreeToFive => (from, to),
            CrossoverDirection::FiveToThree => (to, from),
        };
        if prime3 == prime5 {
            return Err(ModelError::topology(prime3, TopologyViolation::SameBase));
        }

        let mut builder = PatchBuilder::new(design);
        let policy = design.policy();
        let direction3 = builder.direction(prime3)?;
        let direction5 = builder.direction(prime5)?;
        check_crossover_end(
            &builder.slot(prime3)?,
            prime3,
            direction3,
            BaseState::End3Prime,
            policy,
        )?;
        check_crossover_end(
            &builder.slot(prime5)?,
            prime5,
            direction5,
            BaseState::End5Prime,
            policy,
        )?;

        builder.set_link(
            prime3,
            direction3.prime3_side(),
            Some(Link::Crossover(prime5)),
        )?;
        builder.set_link(
            prime5,
            direction5.prime5_side(),
            Some(Link::Crossover(prime3)),
        )?;
        Ok(builder.finish())
    }
}

impl_patch_command!(InstallCrossover, "Install crossover");

/// Check that `slot` can receive a crossover as an end of kind `wanted`.
fn check_crossover_end(
    slot: &BaseSlot,
    address: BaseAddress,
    direction: Direction,
    wanted: BaseState,
    policy: TopologyPolicy,
) -> Result<(), ModelError> {
    let (free_side, linked_side) = if wanted == BaseState::End3Prime {
        (direction.prime3_side(), direction.prime5_side())
    } else {
        (direction.prime5_side(), direction.prime3_side())
    };
    let violation = match slot.state(direction) {
        state if state == wanted => {
            if policy.prohibit_single_base_crossovers
                && matches!(slot.link(linked_side), Some(Link::Crossover(_)))
            {
                Some(TopologyViolation::SingleBaseCrossover)
            } else {
                None
            }
        }
        BaseState::Empty => Some(TopologyViolation::EmptyBase),
        BaseState::Connected => {
            if matches!(slot.link(free_side), Some(Link::Crossover(_))) {
                Some(TopologyViolation::CrossoverAlreadyPresent)
            } else {
                Some(TopologyViolation::InteriorOfRun)
            }
        }
        _ if wanted == BaseState::End3Prime => Some(TopologyViolation::Expected3PrimeEnd),
        _ => Some(TopologyViolation::Expected5PrimeEnd),
    };
    match violation {
        Some(violation) => Err(ModelError::topology(address, violation)),
        None => Ok(()),
    }
}

/// Remove the crossover leaving the 3' side of a base.
#[derive(Debug, Clone)]
pub struct RemoveCrossover {
    helix: HelixId,
    strand: StrandType,
    index: isize,
    record: PatchRecord,
}

impl RemoveCrossover {
    /// `index` is the 3' end of the crossover.
    pub fn new(helix: HelixId, strand: StrandType, index: isize) -> Self {
        Self {
            helix,
            strand,
            index,
            record: Default::default(),
        }
    }

    fn plan(&self, design: &Design) -> Result<Patch, ModelError> {
        let prime3 = checked_address(design, self.helix, self.strand, self.index)?;
        let mut builder = PatchBuilder::new(design);
        let side = builder.direction(prime3)?.prime3_side();
        let prime5 = match builder.slot(prime3)?.link(side) {
            Some(Link::Crossover(target)) => target,
            _ => return Err(ModelError::topology(prime3, TopologyViolation::NoCrossover)),
        };
        builder.set_link(prime3, side, None)?;
        if let Some(target_side) = builder.slot(prime5)?.side_linked_to(prime3) {
            builder.set_link(prime5, target_side, None)?;
        }
        if design.policy().prohibit_single_base_crossovers {
            let written = builder.written_addresses();
            builder.extend_lone_crossover_bases(written)?;
        }
        Ok(builder.finish())
    }
}

impl_patch_command!(RemoveCrossover, "Remove crossover");

/// Extend the run ending at `index` outward, up to the last empty base before the next
/// non-empty one or to the edge of the track.
#[derive(Debug, Clone)]
pub struct DragToBoundary {
    helix: HelixId,
    strand: StrandType,
    index: isize,
    record: PatchRecord,
}

impl DragToBoundary {
    /// `index` is a 5' or a 3' end.
    pub fn new(helix: HelixId, strand: StrandType, index: isize) -> Self {
        Self {
            helix,
            strand,
            index,
            record: Default::default(),
        }
    }

    fn plan(&self, design: &Design) -> Result<Patch, ModelError> {
        let address = checked_address(design, self.helix, self.strand, self.index)?;
        let bound = design
            .track(self.helix, self.strand)?
            .drag_bound(self.index)
            .ok_or_else(|| ModelError::topology(address, TopologyViolation::NotAnEnd))?;
        let mut builder = PatchBuilder::new(design);
        for i in address.index.min(bound)..address.index.max(bound) {
            builder.link_natural(BaseAddress::new(self.helix, self.strand, i))?;
        }
        Ok(builder.finish())
    }
}

impl_patch_command!(DragToBoundary, "Drag to boundary");

/// Drag every end of a track that can move to its boundary, in increasing index order.
///
/// Each end is dragged by its own command, planned after the previous ones were applied.
pub(crate) fn drag_all_ends(
    history: &mut History<Design>,
    design: &mut Design,
    helix: HelixId,
    strand: StrandType,
) -> Result<(), ModelError> {
    let track = design.track(helix, strand)?;
    let mut ends: Vec<usize> = track
        .five_prime_ends()
        .chain(track.three_prime_ends())
        .collect();
    ends.sort_unstable();
    ends.dedup();
    for index in ends {
        let bound = design.track(helix, strand)?.drag_bound(index as isize);
        if bound.map_or(false, |b| b != index) {
            history.execute(
                design,
                Box::new(DragToBoundary::new(helix, strand, index as isize)),
            )?;
        }
    }
    Ok(())
}

/// Label of the macro dragging all the ends of one or several tracks.
pub fn drag_all_ends_label() -> Label {
    DRAG_ALL_ENDS_LABEL.into()
}

/// Empty every base of the strand going through a base, across crossovers.
#[derive(Debug, Clone)]
pub struct RemoveStrand {
    helix: HelixId,
    strand: StrandType,
    index: isize,
    record: PatchRecord,
}

impl RemoveStrand {
    pub fn new(helix: HelixId, strand: StrandType, index: isize) -> Self {
        Self {
            helix,
            strand,
            index,
            record: Default::default(),
        }
    }

    fn plan(&self, design: &Design) -> Result<Patch, ModelError> {
        let address = checked_address(design, self.helix, self.strand, self.index)?;
        let oligo = design
            .oligo_through(address)
            .ok_or_else(|| ModelError::topology(address, TopologyViolation::EmptyBase))?;
        let mut builder = PatchBuilder::new(design);
        for base in oligo.bases {
            builder.empty_base(base)?;
        }
        Ok(builder.finish())
    }
}

impl_patch_command!(RemoveStrand, "Remove strand");

/// Link every base of a helix whose only link is a crossover to its neighbour on the other
/// side.
#[derive(Debug, Clone)]
pub struct RepairSingleBaseCrossovers {
    helix: HelixId,
    record: PatchRecord,
}

impl RepairSingleBaseCrossovers {
    pub fn new(helix: HelixId) -> Self {
        Self {
            helix,
            record: Default::default(),
        }
    }

    fn plan(&self, design: &Design) -> Result<Patch, ModelError> {
        let helix = design.try_get_helix(self.helix)?;
        let candidates = StrandType::ALL
            .iter()
            .flat_map(|strand| (0..helix.num_bases()).map(move |i| helix.address(*strand, i)))
            .collect();
        let mut builder = PatchBuilder::new(design);
        builder.extend_lone_crossover_bases(candidates)?;
        Ok(builder.finish())
    }
}

impl_patch_command!(RepairSingleBaseCrossovers, "Repair single base crossovers");

/// Give a helix a free number of the same parity. The crossovers pointing to the helix follow
/// it.
#[derive(Debug, Clone)]
pub struct RenumberHelix {
    from: HelixId,
    to: HelixId,
}

impl RenumberHelix {
    pub fn new(from: HelixId, to: HelixId) -> Self {
        Self { from, to }
    }

    fn check(design: &Design, from: HelixId, to: HelixId) -> Result<(), ModelError> {
        let helix = design.try_get_helix(from)?;
        if design.helix(to).is_some() {
            return Err(ModelError::consistency(
                ConsistencyViolation::NumberInUse(to),
            ));
        }
        if Parity::from_number(to) != helix.parity() {
            return Err(ModelError::consistency(
                ConsistencyViolation::ParityChange {
                    helix: from,
                    number: to,
                },
            ));
        }
        Ok(())
    }
}

impl Command<Design> for RenumberHelix {
    fn apply(&mut self, design: &mut Design) -> Result<(), ModelError> {
        Self::check(design, self.from, self.to)?;
        design.renumber_helix(self.from, self.to);
        Ok(())
    }

    fn revert(&mut self, design: &mut Design) -> Result<(), ModelError> {
        Self::check(design, self.to, self.from)?;
        design.renumber_helix(self.to, self.from);
        Ok(())
    }

    fn label(&self) -> Label {
        "Renumber helix".into()
    }

    fn touches(&self, helix: &HelixId) -> bool {
        *helix == self.from || *helix == self.to
    }
}

/// Change the number of bases of a helix.
///
/// Growing appends empty slots. Shrinking requires the removed slots to be empty and without
/// loop/skip, use [`resize_commands`] to clear them first. When the design has a canonical
/// number of bases, the new number must be equal to it.
#[derive(Debug, Clone)]
pub struct SetNumBases {
    helix: HelixId,
    num_bases: usize,
    previous: Option<usize>,
}

impl SetNumBases {
    pub fn new(helix: HelixId, num_bases: usize) -> Self {
        Self {
            helix,
            num_bases,
            previous: None,
        }
    }
}

impl Command<Design> for SetNumBases {
    fn apply(&mut self, design: &mut Design) -> Result<(), ModelError> {
        let helix = design.try_get_helix(self.helix)?;
        if let Some(expected) = design.canonical_num_bases() {
            if expected != self.num_bases {
                return Err(ModelError::consistency(
                    ConsistencyViolation::BaseCountMismatch {
                        expected,
                        found: self.num_bases,
                    },
                ));
            }
        }
        let previous = helix.num_bases();
        if self.num_bases < previous {
            if let Some(index) = helix.first_content_at_or_past(self.num_bases) {
                return Err(ModelError::topology(
                    helix.address(StrandType::Scaffold, index),
                    TopologyViolation::NonEmptyTail,
                ));
            }
        }
        self.previous = Some(previous);
        self.resize(design, self.num_bases);
        Ok(())
    }

    fn revert(&mut self, design: &mut Design) -> Result<(), ModelError> {
        let previous = match self.previous {
            Some(previous) => previous,
            None => {
                log::error!("\"Set number of bases\" reverted but never applied");
                return Ok(());
            }
        };
        let helix = design.try_get_helix(self.helix)?;
        if helix.num_bases() != self.num_bases {
            return Err(ModelError::consistency(
                ConsistencyViolation::BaseCountMismatch {
                    expected: self.num_bases,
                    found: helix.num_bases(),
                },
            ));
        }
        if let Some(index) = helix.first_content_at_or_past(previous) {
            return Err(ModelError::topology(
                helix.address(StrandType::Scaffold, index),
                TopologyViolation::NonEmptyTail,
            ));
        }
        self.previous = None;
        self.resize(design, previous);
        Ok(())
    }

    fn label(&self) -> Label {
        "Set number of bases".into()
    }

    fn touches(&self, helix: &HelixId) -> bool {
        self.helix == *helix
    }
}

impl SetNumBases {
    fn resize(&self, design: &mut Design, num_bases: usize) {
        if let Some(helix) = design.helix_mut(self.helix) {
            helix.resize(num_bases);
        }
        design.mark_dimensions_modified(self.helix);
        design.mark_bases_modified(self.helix);
    }
}

/// Change the number of bases that every helix of the design must have.
#[derive(Debug, Clone)]
pub(crate) struct SetCanonicalNumBases {
    num_bases: usize,
    previous: Option<Option<usize>>,
}

impl SetCanonicalNumBases {
    pub(crate) fn new(num_bases: usize) -> Self {
        Self {
            num_bases,
            previous: None,
        }
    }
}

impl Command<Design> for SetCanonicalNumBases {
    fn apply(&mut self, design: &mut Design) -> Result<(), ModelError> {
        self.previous = Some(design.canonical_num_bases());
        design.set_canonical_num_bases(Some(self.num_bases));
        Ok(())
    }

    fn revert(&mut self, design: &mut Design) -> Result<(), ModelError> {
        let current = design.canonical_num_bases();
        if self.previous.is_some() && current != Some(self.num_bases) {
            return Err(ModelError::consistency(
                ConsistencyViolation::BaseCountMismatch {
                    expected: self.num_bases,
                    found: current.unwrap_or(0),
                },
            ));
        }
        if let Some(previous) = self.previous.take() {
            design.set_canonical_num_bases(previous)
        }
        Ok(())
    }

    fn label(&self) -> Label {
        "Set canonical number of bases".into()
    }

    fn touches(&self, _: &HelixId) -> bool {
        false
    }
}

/// The commands bringing `helix` to `num_bases` bases, to be executed in a macro labeled
/// [`CHANGE_NUM_BASES_LABEL`] when there are several of them.
///
/// Shrinking clears both tracks past the new length before truncating them.
pub fn resize_commands(
    design: &Design,
    helix: HelixId,
    num_bases: usize,
) -> Result<Vec<Box<dyn Command<Design>>>, ModelError> {
    let previous = design.try_get_helix(helix)?.num_bases();
    let mut ret: Vec<Box<dyn Command<Design>>> = Vec::new();
    if num_bases < previous {
        for strand in StrandType::ALL.iter() {
            ret.push(Box::new(
                ClearStrand::new(helix, *strand, num_bases as f64, (previous - 1) as f64)
                    .without_repair(),
            ));
        }
    }
    if num_bases != previous {
        ret.push(Box::new(SetNumBases::new(helix, num_bases)));
    }
    Ok(ret)
}

/// Label of the macro changing the number of bases of one or several helices.
pub fn change_num_bases_label() -> Label {
    CHANGE_NUM_BASES_LABEL.into()
}
