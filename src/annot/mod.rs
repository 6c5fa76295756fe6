// Copyright 2017 Nicholas Ingolia
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Data types for regions on named sequences (e.g. chromosomes),
//! useful for reasoning about the structure of annotated genes.
//!
//! This module provides a half-open integer [`Interval`] and a
//! [`PieceWiseLocation`]: a strand-tagged set of disjoint intervals on
//! one chromosome. Locations support set union and difference,
//! clipping, and extension in the upstream or downstream direction of
//! their strand, which is all the algebra needed to carve regulatory
//! regions out of a gene annotation.
//!
//! ```
//! # use cisreg::annot::ParseAnnotError;
//! # fn try_main() -> Result<(), ParseAnnotError> {
//! use cisreg::annot::interval::Interval;
//! use cisreg::annot::piecewise::PieceWiseLocation;
//! let tx = "chr1:100-200;300-400(+)".parse::<PieceWiseLocation>()?;
//! let cds = "chr1:150-350(+)".parse::<PieceWiseLocation>()?;
//! let utrs = tx - cds;
//! assert_eq!(utrs.intervals(), &[Interval::new(100, 150), Interval::new(350, 400)]);
//! # Ok(())
//! # }
//! # fn main() { try_main().unwrap(); }
//! ```
//!
//! [`Interval`]: interval/struct.Interval.html
//! [`PieceWiseLocation`]: piecewise/struct.PieceWiseLocation.html

use thiserror::Error;

use crate::strand::{ReqStrand, StrandError};

pub mod interval;
pub mod piecewise;

/// Errors that arise in parsing annotations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAnnotError {
    #[error("malformed location string {0:?}")]
    BadAnnot(String),
    #[error("integer parsing error: {0}")]
    ParseInt(#[from] ::std::num::ParseIntError),
    #[error("strand parsing error: {0}")]
    ParseStrand(#[from] StrandError),
    #[error("ending position < starting position")]
    EndBeforeStart,
}

/// Errors that arise in manipulating annotations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotError {
    #[error("bases must be positive, got {0}")]
    NonPositiveExtension(isize),
    #[error("no length known for chromosome {0}")]
    UnknownChromosome(String),
    #[error("cannot combine {left_refid}{left_strand} with {right_refid}{right_strand}")]
    Mismatch {
        left_refid: String,
        left_strand: ReqStrand,
        right_refid: String,
        right_strand: ReqStrand,
    },
}
