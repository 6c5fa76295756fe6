// Copyright 2014-2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Data types for strand information on annotations.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Strand information for annotations that require a strand.
///
/// Transcripts in a gene table always carry a strand, and every
/// location derived from them inherits it: the strand decides which
/// end of a location is 5' and which is 3'.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Ord, PartialOrd, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReqStrand {
    Forward,
    Reverse,
}

impl ReqStrand {
    /// Returns a `ReqStrand` enum representing the given char.
    ///
    /// The mapping is as follows:
    ///     * '+', 'f', or 'F' becomes `ReqStrand::Forward`
    ///     * '-', 'r', or 'R' becomes `ReqStrand::Reverse`
    ///     * Any other inputs will return an `Err(StrandError::InvalidChar)`
    pub fn from_char(strand_char: &char) -> Result<ReqStrand, StrandError> {
        match *strand_char {
            '+' | 'f' | 'F' => Ok(ReqStrand::Forward),
            '-' | 'r' | 'R' => Ok(ReqStrand::Reverse),
            invalid => Err(StrandError::InvalidChar(invalid)),
        }
    }

    pub fn is_forward(&self) -> bool {
        *self == ReqStrand::Forward
    }

    /// Symbol denoting the strand. By convention, in BED and GFF
    /// files, the forward strand is `+` and the reverse strand is `-`.
    pub fn strand_symbol(&self) -> &'static str {
        match *self {
            ReqStrand::Forward => "+",
            ReqStrand::Reverse => "-",
        }
    }
}

impl Display for ReqStrand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "({})", self.strand_symbol())
    }
}

impl FromStr for ReqStrand {
    type Err = StrandError;

    /// Accepts the bare symbols used in gene tables (`+`, `-`) as well as
    /// the parenthesised form used in location display strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start_matches('(').trim_end_matches(')');
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => ReqStrand::from_char(&c),
            _ => Err(StrandError::InvalidString(s.to_owned())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrandError {
    #[error("character {0:?} can not be converted to a strand")]
    InvalidChar(char),
    #[error("string {0:?} can not be converted to a strand")]
    InvalidString(String),
}
