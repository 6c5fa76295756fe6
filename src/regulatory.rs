//! Derivation of candidate cis-regulatory regions from a gene database.
//!
//! Per gene id, the unique transcript is resolved and a mode-dependent
//! intragenic location is taken from it. Coding exons of overlapping
//! transcripts are removed, and the flanks upstream of the TSS and
//! downstream of the TES are added, each cut back at the nearest
//! neighbouring gene. Locations are then merged per gene name and
//! written out one BED row per interval.

use std::collections::BTreeMap;
use std::str::FromStr;

use log::{debug, info, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use crate::annot::interval::Interval;
use crate::annot::piecewise::PieceWiseLocation;
use crate::annot::AnnotError;
use crate::bed::RegulatoryRegion;
use crate::genedb::{ClassRule, GeneDbError, TranscriptSource};
use crate::genome::{ChromSizes, ChromosomeSet, Position};
use crate::strand::ReqStrand;
use crate::transcript::Transcript;

/// Which part of the transcript itself counts as regulatory.
///
/// ```rust
/// use cisreg::regulatory::Mode;
///
/// let mode = "5utrIntron1".parse::<Mode>().unwrap();
/// assert_eq!(mode, Mode::Utr5Intron1);
/// assert_eq!(mode.to_string(), "5utrIntron1");
/// assert_eq!(Mode::NoTranscript.as_ref(), "NoTx");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// The whole transcript span.
    #[strum(serialize = "FullTx")]
    #[cfg_attr(feature = "serde", serde(rename = "FullTx"))]
    FullTranscript,
    /// Every intron within the CDS.
    #[strum(serialize = "AllIntrons")]
    #[cfg_attr(feature = "serde", serde(rename = "AllIntrons"))]
    AllIntrons,
    /// The 5'UTR and the CDS intron closest to the TSS.
    #[strum(serialize = "5utrIntron1")]
    #[cfg_attr(feature = "serde", serde(rename = "5utrIntron1"))]
    Utr5Intron1,
    /// Nothing; only the flanks.
    #[strum(serialize = "NoTx")]
    #[cfg_attr(feature = "serde", serde(rename = "NoTx"))]
    NoTranscript,
    /// The 5'UTR.
    #[strum(serialize = "5utr")]
    #[cfg_attr(feature = "serde", serde(rename = "5utr"))]
    Utr5,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::FullTranscript,
        Mode::AllIntrons,
        Mode::Utr5Intron1,
        Mode::NoTranscript,
        Mode::Utr5,
    ];
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is an unknown mode")]
pub struct UnknownModeError(pub String);

impl FromStr for Mode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .iter()
            .find(|mode| mode.to_string() == s)
            .copied()
            .ok_or_else(|| UnknownModeError(s.to_owned()))
    }
}

/// Parameters of one derivation run. Extensions of 0 disable the
/// respective step.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct RegulatoryConfig {
    pub upstream: Position,
    pub downstream: Position,
    pub intronic: Position,
    pub mode: Mode,
    pub class_rule: ClassRule,
}

#[derive(Error, Debug)]
pub enum RegulatoryError {
    #[error("{gene_id}: no unique transcript ({count} candidates)")]
    NoUniqueTranscript { gene_id: String, count: usize },
    #[error("{gene_name}: cannot combine regulatory regions: {source}")]
    Unmergeable {
        gene_name: String,
        source: AnnotError,
    },
    #[error("{gene_name}: no regulatory region remains")]
    EmptyRegion { gene_name: String },
    #[error("{gene_id}: {source}")]
    Annot { gene_id: String, source: AnnotError },
    #[error(transparent)]
    Db(#[from] GeneDbError),
}

impl RegulatoryError {
    pub fn is_fatal(&self) -> bool {
        match self {
            RegulatoryError::Db(err) => err.is_fatal(),
            _ => false,
        }
    }
}

fn annot_error(tx: &Transcript, source: AnnotError) -> RegulatoryError {
    RegulatoryError::Annot {
        gene_id: tx.gene_id().to_owned(),
        source,
    }
}

/// The single transcript on a permitted chromosome, if there is exactly
/// one.
pub fn find_unique_transcript(
    gene_id: &str,
    transcripts: Vec<Transcript>,
    chromosomes: &ChromosomeSet,
) -> Result<Transcript, RegulatoryError> {
    let mut permitted: Vec<Transcript> = transcripts
        .into_iter()
        .filter(|tx| chromosomes.contains(tx.chromosome()))
        .collect();
    if permitted.len() == 1 {
        Ok(permitted.remove(0))
    } else {
        Err(RegulatoryError::NoUniqueTranscript {
            gene_id: gene_id.to_owned(),
            count: permitted.len(),
        })
    }
}

/// The part of `tx` itself considered under `mode`. May be empty, in
/// which case it is anchored at the TSS.
pub fn intragenic_location(tx: &Transcript, mode: Mode) -> PieceWiseLocation {
    match mode {
        Mode::FullTranscript => tx.transcript(),
        Mode::AllIntrons => {
            let introns = tx.introns_in_cds();
            if introns.is_empty() {
                tx.empty_interval()
            } else {
                introns
            }
        }
        Mode::Utr5Intron1 => {
            let utr = tx.five_prime_utr();
            let introns = tx.introns_in_cds();
            let first_intron = match tx.strand() {
                ReqStrand::Forward => introns.location(0),
                ReqStrand::Reverse => introns
                    .len()
                    .checked_sub(1)
                    .and_then(|last| introns.location(last)),
            };
            match first_intron {
                Some(intron) => utr + intron,
                None => utr,
            }
        }
        Mode::Utr5 => tx.five_prime_utr(),
        Mode::NoTranscript => tx.empty_interval(),
    }
}

/// The `bases` positions starting at the TSS and running in the
/// direction of transcription.
pub fn intronic_window(tx: &Transcript, bases: Position) -> Interval {
    let tss = tx.tss_pos();
    match tx.strand() {
        ReqStrand::Forward => Interval::new(tss, tss.saturating_add(bases)),
        ReqStrand::Reverse => Interval::new(tss.saturating_sub(bases) + 1, tss + 1),
    }
}

// Cut a flank back at neighbouring transcripts. A transcript containing
// `boundary` (the TSS or TES of the gene) only loses its coding exons,
// any other transcript is removed whole. Only the piece still holding
// `anchor` survives.
fn trim_flank<S>(
    source: &S,
    tx: &Transcript,
    flank: PieceWiseLocation,
    boundary: Position,
    anchor: Position,
    class: Option<&str>,
) -> Result<PieceWiseLocation, RegulatoryError>
where
    S: TranscriptSource + ?Sized,
{
    let span = match flank.span() {
        Some(span) => span,
        None => return Ok(flank),
    };
    let mut flank = flank;
    for other in source.load_by_location(tx.chromosome(), &span, None, class)? {
        let blocked = if other.span().contains(boundary) {
            other.coding_exons()
        } else {
            other.transcript()
        };
        flank = flank
            .difference(&blocked)
            .map_err(|source| annot_error(tx, source))?;
    }
    Ok(flank.filter(anchor))
}

/// Regulatory location of a single transcript.
pub fn regulatory_location<S>(
    source: &S,
    tx: &Transcript,
    sizes: &ChromSizes,
    config: &RegulatoryConfig,
) -> Result<PieceWiseLocation, RegulatoryError>
where
    S: TranscriptSource + ?Sized,
{
    let class = config.class_rule.class_of(tx.gene_id());

    let mut intragenic = intragenic_location(tx, config.mode);
    if config.intronic > 0 && !intragenic.is_empty() {
        intragenic = intragenic.interval_limit(&intronic_window(tx, config.intronic));
    }
    if let Some(span) = intragenic.span() {
        for other in source.load_by_location(tx.chromosome(), &span, None, class)? {
            intragenic = intragenic
                .difference(&other.coding_exons())
                .map_err(|source| annot_error(tx, source))?;
        }
    }
    let mut regulatory = intragenic;

    if config.upstream > 0 {
        let upstream = tx
            .tss_shifted_1bp_upstream()
            .extend_upstream(config.upstream, sizes)
            .map_err(|source| annot_error(tx, source))?;
        let upstream = trim_flank(
            source,
            tx,
            upstream,
            tx.tss_pos(),
            tx.tss_shifted_1bp_upstream_pos(),
            class,
        )?;
        regulatory = regulatory
            .union(&upstream)
            .map_err(|source| annot_error(tx, source))?;
    }

    if config.downstream > 0 {
        let downstream = tx
            .tes_shifted_1bp_downstream()
            .extend_downstream(config.downstream, sizes)
            .map_err(|source| annot_error(tx, source))?;
        let downstream = trim_flank(
            source,
            tx,
            downstream,
            tx.tes_pos(),
            tx.tes_shifted_1bp_downstream_pos(),
            class,
        )?;
        regulatory = regulatory
            .union(&downstream)
            .map_err(|source| annot_error(tx, source))?;
    }

    debug!("{}: {}", tx.gene_id(), regulatory);
    Ok(regulatory)
}

/// Union of the regulatory locations gathered under one gene name. They
/// must share chromosome and strand and may not all be empty.
pub fn combine(
    gene_name: &str,
    locations: Vec<PieceWiseLocation>,
) -> Result<PieceWiseLocation, RegulatoryError> {
    let mut locations = locations.into_iter();
    let first = locations.next().ok_or_else(|| RegulatoryError::EmptyRegion {
        gene_name: gene_name.to_owned(),
    })?;
    let combined = locations
        .try_fold(first, |acc, location| acc.union(&location))
        .map_err(|source| RegulatoryError::Unmergeable {
            gene_name: gene_name.to_owned(),
            source,
        })?;
    if combined.is_empty() {
        Err(RegulatoryError::EmptyRegion {
            gene_name: gene_name.to_owned(),
        })
    } else {
        Ok(combined)
    }
}

fn gene_location<S>(
    source: &S,
    gene_id: &str,
    chromosomes: &ChromosomeSet,
    sizes: &ChromSizes,
    config: &RegulatoryConfig,
) -> Result<(String, PieceWiseLocation), RegulatoryError>
where
    S: TranscriptSource + ?Sized,
{
    let tx = find_unique_transcript(gene_id, source.load_by_gene_id(gene_id)?, chromosomes)?;
    let location = regulatory_location(source, &tx, sizes, config)?;
    Ok((tx.gene_name().to_owned(), location))
}

/// Derive the regulatory regions of every gene in `source`, sorted by
/// gene name.
///
/// Genes and gene names that cannot be resolved are logged and skipped;
/// only storage failures abort the run.
pub fn regulatory_regions<S>(
    source: &S,
    chromosomes: &ChromosomeSet,
    sizes: &ChromSizes,
    config: &RegulatoryConfig,
) -> Result<Vec<RegulatoryRegion>, GeneDbError>
where
    S: TranscriptSource + ?Sized,
{
    let mut by_name: BTreeMap<String, Vec<PieceWiseLocation>> = BTreeMap::new();
    let mut skipped_genes = 0;
    for gene_id in source.gene_ids()? {
        match gene_location(source, &gene_id, chromosomes, sizes, config) {
            Ok((gene_name, location)) => by_name
                .entry(gene_name)
                .or_insert_with(Vec::new)
                .push(location),
            Err(RegulatoryError::Db(err)) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("Skipped {}", err);
                skipped_genes += 1;
            }
        }
    }

    let mut regions = Vec::new();
    let mut skipped_names = 0;
    for (gene_name, locations) in by_name {
        match combine(&gene_name, locations) {
            Ok(location) => regions.extend(RegulatoryRegion::from_location(&gene_name, &location)),
            Err(err) => {
                warn!("Skipped {}", err);
                skipped_names += 1;
            }
        }
    }
    info!(
        "{} regulatory regions ({} gene ids and {} gene names skipped)",
        regions.len(),
        skipped_genes,
        skipped_names
    );
    Ok(regions)
}
