//! Derivation of candidate cis-regulatory regions from a transcript
//! annotation, plus the conversions that build the annotation database
//! from GTF and GFF3 files.

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate lazy_static;

pub mod annot;
pub mod bed;
pub mod cli;
pub mod convert;
pub mod genedb;
pub mod genome;
pub mod regulatory;
pub mod strand;
pub mod transcript;
