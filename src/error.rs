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
use super::{BaseAddress, HelixCoord, HelixId, HistoryError, StrandType};

/// Error returned by the operations on the design.
///
/// Every operation that returns an error has left the design unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("out of range: {0}")]
    Range(RangeViolation),
    #[error("invalid topology at {address}: {violation}")]
    InvalidTopology {
        address: BaseAddress,
        violation: TopologyViolation,
    },
    #[error("inconsistent state: {0}")]
    Consistency(ConsistencyViolation),
    #[error(transparent)]
    MacroNesting(#[from] HistoryError),
    #[error("helix {0} does not exist")]
    NoSuchHelix(HelixId),
    #[error("malformed archive: {0}")]
    Format(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeViolation {
    #[error("index {index} is not in [0, {num_bases})")]
    Index { index: isize, num_bases: usize },
    #[error("span [{from}, {to}] is not an increasing span of [0, {num_bases})")]
    Span {
        from: isize,
        to: isize,
        num_bases: usize,
    },
    #[error("bound {0} is not a finite number")]
    NonFiniteBound(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TopologyViolation {
    #[error("the base is empty")]
    EmptyBase,
    #[error("the base is inside a connected run")]
    InteriorOfRun,
    #[error("the base is a 5' end where a 3' end is needed")]
    Expected3PrimeEnd,
    #[error("the base is a 3' end where a 5' end is needed")]
    Expected5PrimeEnd,
    #[error("a crossover is already installed on that side")]
    CrossoverAlreadyPresent,
    #[error("the base would be a single base between two crossovers")]
    SingleBaseCrossover,
    #[error("a crossover cannot link a base to itself")]
    SameBase,
    #[error("a connection cannot go through a crossover")]
    ThroughCrossover,
    #[error("there is no crossover on the 3' side of the base")]
    NoCrossover,
    #[error("the bases past the new length are not empty")]
    NonEmptyTail,
    #[error("the base is not the end of a run")]
    NotAnEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyViolation {
    #[error("expected {expected} bases, got {found}")]
    BaseCountMismatch { expected: usize, found: usize },
    #[error("helix {helix} has content and its parity does not match position {coord}")]
    ParityMismatch { helix: HelixId, coord: HelixCoord },
    #[error("helix number {number} does not have the parity of position {coord}")]
    NumberParityMismatch { number: HelixId, coord: HelixCoord },
    #[error("position {0} is already occupied")]
    CoordinateInUse(HelixCoord),
    #[error("helix number {0} is already used")]
    NumberInUse(HelixId),
    #[error("helix {0} is already sandboxed")]
    AlreadySandboxed(HelixId),
    #[error("helix {0} is sandboxed")]
    Sandboxed(HelixId),
    #[error("helix {helix} cannot take number {number} of the other parity")]
    ParityChange { helix: HelixId, number: HelixId },
    #[error("the design was modified at {0} since the history entry was recorded")]
    StaleEntry(BaseAddress),
    #[error("helix {helix} has crossovers to other helices on its {strand} track")]
    ExternalCrossovers { helix: HelixId, strand: StrandType },
    #[error("crossover from {from} to {to} has no matching link")]
    DanglingCrossover { from: BaseAddress, to: BaseAddress },
}

impl ModelError {
    pub(crate) fn topology(address: BaseAddress, violation: TopologyViolation) -> Self {
        Self::InvalidTopology { address, violation }
    }

    /// Build a consistency error. Those errors denote a misuse by the caller and are logged.
    pub(crate) fn consistency(violation: ConsistencyViolation) -> Self {
        log::error!("Consistency error: {}", violation);
        Self::Consistency(violation)
    }
}
