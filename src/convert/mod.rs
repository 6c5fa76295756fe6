//! Conversion of third-party annotation files into the 16-column gene
//! table that feeds the gene database.
//!
//! The table has one row per transcript:
//!
//! ```text
//! #bin name chrom strand txStart txEnd cdsStart cdsEnd exonCount exonStarts exonEnds score name2 cdsStartStat cdsEndStat exonFrames
//! ```
//!
//! `name` is the transcript identifier and `name2` the gene it belongs
//! to. Columns without a counterpart in the source file are written as
//! `NA`.

use std::fmt::{self, Display, Formatter};
use std::io::{self, BufRead, Write};
use std::num::ParseIntError;

use thiserror::Error;

use crate::genome::Position;
use crate::strand::{ReqStrand, StrandError};
use crate::transcript::{format_coords, parse_coords, Transcript, TranscriptError};

pub mod gff;
pub mod gtf;

/// Header line of the gene table.
pub const TABLE_HEADER: &str = "#bin\tname\tchrom\tstrand\ttxStart\ttxEnd\tcdsStart\tcdsEnd\t\
                                exonCount\texonStarts\texonEnds\tscore\tname2\t\
                                cdsStartStat\tcdsEndStat\texonFrames";

const MISSING: &str = "NA";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: &'static str,
        found: usize,
    },
    #[error("line {line}: bad {column} value: {source}")]
    Int {
        line: usize,
        column: &'static str,
        source: ParseIntError,
    },
    #[error("line {line}: {source}")]
    Strand { line: usize, source: StrandError },
    #[error("line {line}: cannot parse exon list {list:?}")]
    ExonList { line: usize, list: String },
    #[error("line {line}: {feature} feature has no {attribute} attribute")]
    MissingAttribute {
        line: usize,
        feature: String,
        attribute: &'static str,
    },
    #[error("line {line}: {feature} feature {id} cannot be associated with a gene id")]
    NoGeneId {
        line: usize,
        feature: String,
        id: String,
    },
}

/// One row of the gene table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenePredRow {
    pub name: String,
    pub chrom: String,
    pub strand: ReqStrand,
    pub tx_start: Position,
    pub tx_end: Position,
    pub cds_start: Position,
    pub cds_end: Position,
    pub exon_starts: Vec<Position>,
    pub exon_ends: Vec<Position>,
    pub name2: String,
}

impl GenePredRow {
    pub fn exon_count(&self) -> usize {
        self.exon_starts.len()
    }

    /// Validate the row as a transcript with gene id `name` and gene
    /// name `name2`.
    pub fn to_transcript(&self) -> Result<Transcript, TranscriptError> {
        Transcript::new(
            self.name.clone(),
            self.name2.clone(),
            self.chrom.clone(),
            self.strand,
            self.tx_start,
            self.tx_end,
            self.cds_start,
            self.cds_end,
            self.exon_starts.clone(),
            self.exon_ends.clone(),
        )
    }

    // Accepts the full 16 columns or 15 without the leading bin.
    fn parse_line(line: &str, line_no: usize) -> Result<Self, ConvertError> {
        let columns: Vec<&str> = line.split('\t').collect();
        let columns = match columns.len() {
            16 => &columns[1..],
            15 => &columns[..],
            found => {
                return Err(ConvertError::ColumnCount {
                    line: line_no,
                    expected: "15 or 16",
                    found,
                })
            }
        };
        let int = |idx: usize, column: &'static str| {
            columns[idx]
                .trim()
                .parse::<Position>()
                .map_err(|source| ConvertError::Int {
                    line: line_no,
                    column,
                    source,
                })
        };
        let coords = |idx: usize| {
            parse_coords(columns[idx]).ok_or_else(|| ConvertError::ExonList {
                line: line_no,
                list: columns[idx].to_owned(),
            })
        };
        let strand = columns[2]
            .parse::<ReqStrand>()
            .map_err(|source| ConvertError::Strand {
                line: line_no,
                source,
            })?;

        Ok(GenePredRow {
            name: columns[0].to_owned(),
            chrom: columns[1].to_owned(),
            strand,
            tx_start: int(3, "txStart")?,
            tx_end: int(4, "txEnd")?,
            cds_start: int(5, "cdsStart")?,
            cds_end: int(6, "cdsEnd")?,
            exon_starts: coords(8)?,
            exon_ends: coords(9)?,
            name2: columns[11].to_owned(),
        })
    }
}

impl Display for GenePredRow {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{na}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{na}\t{}\t{na}\t{na}\t{na}",
            self.name,
            self.chrom,
            self.strand.strand_symbol(),
            self.tx_start,
            self.tx_end,
            self.cds_start,
            self.cds_end,
            self.exon_count(),
            format_coords(&self.exon_starts),
            format_coords(&self.exon_ends),
            self.name2,
            na = MISSING,
        )
    }
}

/// Write the header line followed by one line per row.
pub fn write_table<W: Write>(mut out: W, rows: &[GenePredRow]) -> io::Result<()> {
    writeln!(out, "{}", TABLE_HEADER)?;
    for row in rows {
        writeln!(out, "{}", row)?;
    }
    out.flush()
}

/// Read a gene table. Blank lines and `#` lines are skipped; the
/// `exonCount` column is not checked here but by `to_transcript`.
pub fn read_table<R: BufRead>(reader: R) -> Result<Vec<GenePredRow>, ConvertError> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        rows.push(GenePredRow::parse_line(line, idx + 1)?);
    }
    Ok(rows)
}

// Split a GFF/GTF feature line into its 9 columns.
fn feature_columns(line: &str, line_no: usize) -> Result<Vec<&str>, ConvertError> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != 9 {
        return Err(ConvertError::ColumnCount {
            line: line_no,
            expected: "9",
            found: columns.len(),
        });
    }
    Ok(columns)
}

// 1-based closed GFF/GTF coordinates to a 0-based half-open pair.
fn feature_span(columns: &[&str], line_no: usize) -> Result<(Position, Position), ConvertError> {
    let parse = |idx: usize, column: &'static str| {
        columns[idx]
            .parse::<Position>()
            .map_err(|source| ConvertError::Int {
                line: line_no,
                column,
                source,
            })
    };
    Ok((parse(3, "start")? - 1, parse(4, "end")?))
}

fn feature_strand(columns: &[&str], line_no: usize) -> Result<ReqStrand, ConvertError> {
    columns[6]
        .parse::<ReqStrand>()
        .map_err(|source| ConvertError::Strand {
            line: line_no,
            source,
        })
}

// Exon starts and ends, each sorted on its own.
fn sorted_exon_bounds(exons: &[(Position, Position)]) -> (Vec<Position>, Vec<Position>) {
    let mut starts: Vec<Position> = exons.iter().map(|exon| exon.0).collect();
    let mut ends: Vec<Position> = exons.iter().map(|exon| exon.1).collect();
    starts.sort_unstable();
    ends.sort_unstable();
    (starts, ends)
}
