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
use crate::consts::{HIGH_TO_LOW_HEADER, LOW_TO_HIGH_HEADER};
use crate::ModelError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fmt::Write;

static SEPARATOR: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\s+"));
static TOKEN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^(?P<low>_|-|\d+:\d+),(?P<high>_|-|\d+:\d+)$"));

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction.runs_five_to_three() {
            write!(f, "[{} -> {}]", self.low, self.high)
        } else {
            write!(f, "[{} <- {}]", self.low, self.high)
        }
    }
}

impl fmt::Display for BaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Connected => write!(f, "connected"),
            Self::End5Prime => write!(f, "5' end"),
            Self::End3Prime => write!(f, "3' end"),
        }
    }
}

fn side_token(link: Option<Link>) -> String {
    match link {
        None => String::from("_"),
        Some(Link::Natural) => String::from("-"),
        Some(Link::Crossover(address)) => format!("{}:{}", address.helix, address.index),
    }
}

/// Encode a track as its direction header followed by one `low,high` token per base.
pub(crate) fn encode_track(track: &StrandTrack) -> String {
    let mut ret = String::from(if track.direction().runs_five_to_three() {
        LOW_TO_HIGH_HEADER
    } else {
        HIGH_TO_LOW_HEADER
    });
    for slot in track.slots() {
        write!(
            &mut ret,
            " {},{}",
            side_token(slot.link(Side::Low)),
            side_token(slot.link(Side::High))
        )
        .unwrap_or_default();
    }
    ret
}

fn format_error<E: fmt::Display>(e: E) -> ModelError {
    ModelError::Format(e.to_string())
}

fn parse_side(strand: StrandType, token: &str) -> Result<Option<Link>, ModelError> {
    match token {
        "_" => Ok(None),
        "-" => Ok(Some(Link::Natural)),
        _ => {
            let (helix, index) = token
                .split_once(':')
                .ok_or_else(|| format_error(format!("bad link \"{}\"", token)))?;
            let helix = helix.parse().map_err(format_error)?;
            let index = index.parse().map_err(format_error)?;
            Ok(Some(Link::Crossover(BaseAddress {
                helix,
                strand,
                index,
            })))
        }
    }
}

/// Decode a track encoded by `encode_track`.
///
/// The number of bases is the number of tokens after the header. Natural links must be
/// present on both of the slots they join.
pub(crate) fn decode_track(
    strand: StrandType,
    encoded: &str,
) -> Result<(Direction, Vec<BaseSlot>), ModelError> {
    let separator = SEPARATOR.as_ref().map_err(format_error)?;
    let token_re = TOKEN.as_ref().map_err(format_error)?;

    let mut tokens = separator.split(encoded.trim()).filter(|t| !t.is_empty());
    let direction = match tokens.next() {
        Some(LOW_TO_HIGH_HEADER) => Direction::LowToHigh,
        Some(HIGH_TO_LOW_HEADER) => Direction::HighToLow,
        Some(header) => return Err(format_error(format!("bad header \"{}\"", header))),
        None => return Err(format_error("empty track")),
    };

    let mut slots = Vec::new();
    for token in tokens {
        let captures = token_re
            .captures(token)
            .ok_or_else(|| format_error(format!("bad token \"{}\"", token)))?;
        let low = parse_side(strand, &captures["low"])?;
        let high = parse_side(strand, &captures["high"])?;
        slots.push(BaseSlot::new(low, high));
    }

    for (i, slot) in slots.iter().enumerate() {
        let low_natural = slot.link(Side::Low) == Some(Link::Natural);
        let left_natural = i > 0 && slots[i - 1].link(Side::High) == Some(Link::Natural);
        if low_natural != left_natural {
            return Err(format_error(format!(
                "{} track: unmatched natural link between {} and {}",
                strand,
                i as isize - 1,
                i
            )));
        }
    }
    if slots.last().and_then(|s| s.link(Side::High)) == Some(Link::Natural) {
        return Err(format_error(format!(
            "{} track: natural link past the last base",
            strand
        )));
    }
    Ok((direction, slots))
}
