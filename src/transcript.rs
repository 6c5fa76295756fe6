// Copyright 2017 Nicholas Ingolia
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Annotated transcripts, as stored one per row in a gene table, and
//! the named sub-locations (UTRs, CDS, exons, introns, anchor points)
//! derived from them.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::annot::interval::Interval;
use crate::annot::piecewise::PieceWiseLocation;
use crate::genome::Position;
use crate::strand::{ReqStrand, StrandError};

/// Delimiter of the exon start and end lists in gene tables.
pub const EXON_SEPARATOR: char = ',';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("{gene_id}: bad strand: {source}")]
    Strand {
        gene_id: String,
        source: StrandError,
    },
    #[error("{gene_id}: cannot parse exon list {list:?}")]
    ExonList { gene_id: String, list: String },
    #[error("{gene_id}: exon count {count} does not match {starts} starts and {ends} ends")]
    ExonCount {
        gene_id: String,
        count: usize,
        starts: usize,
        ends: usize,
    },
    #[error("{gene_id}: exons are not ascending, non-empty intervals")]
    ExonOrder { gene_id: String },
    #[error("{gene_id}: expected txStart <= cdsStart <= cdsEnd <= txEnd")]
    Bounds { gene_id: String },
}

/// Parse a delimiter-joined list of coordinates, e.g. `"1,5,9,"`. The
/// trailing delimiter is optional.
pub fn parse_coords(list: &str) -> Option<Vec<Position>> {
    list.split(EXON_SEPARATOR)
        .filter(|field| !field.trim().is_empty())
        .map(|field| field.trim().parse::<Position>().ok())
        .collect()
}

/// Join coordinates with a trailing delimiter, e.g. `"1,5,9,"`.
pub fn format_coords(coords: &[Position]) -> String {
    let mut joined = String::new();
    for coord in coords {
        joined.push_str(&coord.to_string());
        joined.push(EXON_SEPARATOR);
    }
    joined
}

/// A single annotated transcript.
///
/// Coordinates are 0-based and half-open. Exon starts and ends are
/// given from the lowest to the highest coordinate regardless of
/// strand. Non-coding transcripts have `cds_start == cds_end`.
///
/// ```
/// # use cisreg::transcript::TranscriptError;
/// # fn try_main() -> Result<(), TranscriptError> {
/// use cisreg::annot::interval::Interval;
/// use cisreg::strand::ReqStrand;
/// use cisreg::transcript::Transcript;
/// let tx = Transcript::new(
///     "NM_000001".to_owned(), "GENE1".to_owned(), "chr1".to_owned(), ReqStrand::Forward,
///     100, 500, 150, 450, vec![100, 300], vec![200, 500],
/// )?;
/// assert_eq!(tx.five_prime_utr().intervals(), &[Interval::new(100, 150)]);
/// assert_eq!(tx.introns().intervals(), &[Interval::new(200, 300)]);
/// assert_eq!(tx.tss_pos(), 100);
/// # Ok(())
/// # }
/// # fn main() { try_main().unwrap(); }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    gene_id: String,
    gene_name: String,
    chromosome: String,
    strand: ReqStrand,
    tx_start: Position,
    tx_end: Position,
    cds_start: Position,
    cds_end: Position,
    exon_starts: Vec<Position>,
    exon_ends: Vec<Position>,
}

impl Transcript {
    /// Construct a transcript, checking that the exons are ascending,
    /// non-empty intervals and that the CDS lies within the transcript.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gene_id: String,
        gene_name: String,
        chromosome: String,
        strand: ReqStrand,
        tx_start: Position,
        tx_end: Position,
        cds_start: Position,
        cds_end: Position,
        exon_starts: Vec<Position>,
        exon_ends: Vec<Position>,
    ) -> Result<Self, TranscriptError> {
        if exon_starts.len() != exon_ends.len() {
            return Err(TranscriptError::ExonCount {
                gene_id,
                count: exon_starts.len(),
                starts: exon_starts.len(),
                ends: exon_ends.len(),
            });
        }
        let ascending = exon_starts
            .iter()
            .zip(exon_ends.iter())
            .all(|(start, end)| start < end)
            && exon_ends
                .iter()
                .zip(exon_starts.iter().skip(1))
                .all(|(end, next_start)| end <= next_start);
        if !ascending {
            return Err(TranscriptError::ExonOrder { gene_id });
        }
        if !(tx_start <= cds_start && cds_start <= cds_end && cds_end <= tx_end) {
            return Err(TranscriptError::Bounds { gene_id });
        }

        Ok(Transcript {
            gene_id,
            gene_name,
            chromosome,
            strand,
            tx_start,
            tx_end,
            cds_start,
            cds_end,
            exon_starts,
            exon_ends,
        })
    }

    /// Construct a transcript from the raw column values of a gene table
    /// row: strand as `+`/`-` and exon lists as delimiter-joined strings.
    #[allow(clippy::too_many_arguments)]
    pub fn from_columns(
        gene_id: &str,
        gene_name: &str,
        chromosome: &str,
        strand: &str,
        tx_start: Position,
        tx_end: Position,
        cds_start: Position,
        cds_end: Position,
        exon_count: usize,
        exon_starts: &str,
        exon_ends: &str,
    ) -> Result<Self, TranscriptError> {
        let strand = strand
            .parse::<ReqStrand>()
            .map_err(|source| TranscriptError::Strand {
                gene_id: gene_id.to_owned(),
                source,
            })?;
        let parse = |list: &str| {
            parse_coords(list).ok_or_else(|| TranscriptError::ExonList {
                gene_id: gene_id.to_owned(),
                list: list.to_owned(),
            })
        };
        let starts = parse(exon_starts)?;
        let ends = parse(exon_ends)?;
        if starts.len() != exon_count || ends.len() != exon_count {
            return Err(TranscriptError::ExonCount {
                gene_id: gene_id.to_owned(),
                count: exon_count,
                starts: starts.len(),
                ends: ends.len(),
            });
        }

        Transcript::new(
            gene_id.to_owned(),
            gene_name.to_owned(),
            chromosome.to_owned(),
            strand,
            tx_start,
            tx_end,
            cds_start,
            cds_end,
            starts,
            ends,
        )
    }

    pub fn gene_id(&self) -> &str {
        &self.gene_id
    }

    pub fn gene_name(&self) -> &str {
        &self.gene_name
    }

    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn strand(&self) -> ReqStrand {
        self.strand
    }

    pub fn tx_start(&self) -> Position {
        self.tx_start
    }

    pub fn tx_end(&self) -> Position {
        self.tx_end
    }

    pub fn cds_start(&self) -> Position {
        self.cds_start
    }

    pub fn cds_end(&self) -> Position {
        self.cds_end
    }

    pub fn exon_count(&self) -> usize {
        self.exon_starts.len()
    }

    pub fn exon_starts(&self) -> &[Position] {
        &self.exon_starts
    }

    pub fn exon_ends(&self) -> &[Position] {
        &self.exon_ends
    }

    pub fn on_forward_strand(&self) -> bool {
        self.strand.is_forward()
    }

    pub fn is_coding(&self) -> bool {
        self.cds_start < self.cds_end
    }

    /// Transcript span as a plain interval.
    pub fn span(&self) -> Interval {
        Interval::new(self.tx_start, self.tx_end)
    }

    fn location<I>(&self, intervals: I) -> PieceWiseLocation
    where
        I: IntoIterator<Item = Interval>,
    {
        PieceWiseLocation::new(self.chromosome.clone(), self.strand, intervals)
    }

    fn singleton(&self, start: Position, end: Position) -> PieceWiseLocation {
        PieceWiseLocation::singleton(self.chromosome.clone(), self.strand, start, end)
    }

    fn single_base(&self, pos: Position) -> PieceWiseLocation {
        self.singleton(pos, pos + 1)
    }

    /// Transcription start site (5'-most base on the annotated strand).
    pub fn tss_pos(&self) -> Position {
        match self.strand {
            ReqStrand::Forward => self.tx_start,
            ReqStrand::Reverse => self.tx_end - 1,
        }
    }

    /// Transcription end site (3'-most base on the annotated strand).
    pub fn tes_pos(&self) -> Position {
        match self.strand {
            ReqStrand::Forward => self.tx_end - 1,
            ReqStrand::Reverse => self.tx_start,
        }
    }

    /// The base immediately upstream of the transcription start site.
    pub fn tss_shifted_1bp_upstream_pos(&self) -> Position {
        match self.strand {
            ReqStrand::Forward => self.tx_start - 1,
            ReqStrand::Reverse => self.tx_end,
        }
    }

    /// The base immediately downstream of the transcription end site.
    pub fn tes_shifted_1bp_downstream_pos(&self) -> Position {
        match self.strand {
            ReqStrand::Forward => self.tx_end,
            ReqStrand::Reverse => self.tx_start - 1,
        }
    }

    /// First base of the coding sequence on the annotated strand.
    pub fn cds_start_pos(&self) -> Position {
        match self.strand {
            ReqStrand::Forward => self.cds_start,
            ReqStrand::Reverse => self.cds_end - 1,
        }
    }

    pub fn tss(&self) -> PieceWiseLocation {
        self.single_base(self.tss_pos())
    }

    pub fn tes(&self) -> PieceWiseLocation {
        self.single_base(self.tes_pos())
    }

    pub fn tss_shifted_1bp_upstream(&self) -> PieceWiseLocation {
        self.single_base(self.tss_shifted_1bp_upstream_pos())
    }

    pub fn tes_shifted_1bp_downstream(&self) -> PieceWiseLocation {
        self.single_base(self.tes_shifted_1bp_downstream_pos())
    }

    pub fn cds_start_site(&self) -> PieceWiseLocation {
        self.single_base(self.cds_start_pos())
    }

    pub fn cds_start_shifted_1bp_upstream(&self) -> PieceWiseLocation {
        match self.strand {
            ReqStrand::Forward => self.single_base(self.cds_start - 1),
            ReqStrand::Reverse => self.single_base(self.cds_end),
        }
    }

    /// Zero-length location anchored at the transcription start site.
    /// It carries chromosome and strand, so it can take part in location
    /// algebra where "no location" is meant.
    pub fn empty_interval(&self) -> PieceWiseLocation {
        let pos = self.tss_pos();
        self.singleton(pos, pos)
    }

    pub fn transcript(&self) -> PieceWiseLocation {
        self.singleton(self.tx_start, self.tx_end)
    }

    pub fn five_prime_utr(&self) -> PieceWiseLocation {
        match self.strand {
            ReqStrand::Forward => self.singleton(self.tx_start, self.cds_start),
            ReqStrand::Reverse => self.singleton(self.cds_end, self.tx_end),
        }
    }

    pub fn three_prime_utr(&self) -> PieceWiseLocation {
        match self.strand {
            ReqStrand::Forward => self.singleton(self.cds_end, self.tx_end),
            ReqStrand::Reverse => self.singleton(self.tx_start, self.cds_start),
        }
    }

    pub fn coding_sequence(&self) -> PieceWiseLocation {
        self.singleton(self.cds_start, self.cds_end)
    }

    fn exon_intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        self.exon_starts
            .iter()
            .zip(self.exon_ends.iter())
            .map(|(&start, &end)| Interval::new(start, end))
    }

    fn intron_intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        self.exon_ends
            .iter()
            .zip(self.exon_starts.iter().skip(1))
            .map(|(&end, &next_start)| Interval::new(end, next_start))
    }

    fn cds_interval(&self) -> Interval {
        Interval::new(self.cds_start, self.cds_end)
    }

    pub fn exons(&self) -> PieceWiseLocation {
        self.location(self.exon_intervals())
    }

    /// Exons clipped to the coding sequence; exons outside the CDS are
    /// dropped.
    pub fn coding_exons(&self) -> PieceWiseLocation {
        let cds = self.cds_interval();
        self.location(
            self.exon_intervals()
                .filter(|exon| exon.overlaps(&cds))
                .map(|exon| exon.clip(&cds))
                .collect::<Vec<_>>(),
        )
    }

    pub fn introns(&self) -> PieceWiseLocation {
        self.location(self.intron_intervals())
    }

    /// Introns clipped to the coding sequence; introns outside the CDS
    /// are dropped.
    pub fn introns_in_cds(&self) -> PieceWiseLocation {
        let cds = self.cds_interval();
        self.location(
            self.intron_intervals()
                .filter(|intron| intron.overlaps(&cds))
                .map(|intron| intron.clip(&cds))
                .collect::<Vec<_>>(),
        )
    }
}

impl Display for Transcript {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.chromosome,
            self.tx_start,
            self.tx_end,
            self.gene_id,
            self.strand.strand_symbol()
        )
    }
}
