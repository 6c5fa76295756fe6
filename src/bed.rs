//! BED rows of regulatory regions and the gene-to-region table derived
//! from them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::annot::piecewise::PieceWiseLocation;
use crate::genome::Position;
use crate::strand::ReqStrand;

/// Separates the gene name from the region index in BED names, as in
/// `GATA1#2`.
pub const REGION_SEPARATOR: char = '#';

#[derive(Error, Debug)]
pub enum BedError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected at least 4 columns")]
    MissingColumns { line: usize },
    #[error("line {line}: region name {name:?} lacks a '{}' separator", REGION_SEPARATOR)]
    MissingSeparator { line: usize, name: String },
}

/// One interval of a gene's regulatory region, written as a 6-column
/// BED row `chrom start end gene#n 0 strand`.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct RegulatoryRegion {
    pub chromosome: String,
    pub start: Position,
    pub end: Position,
    pub name: String,
    pub strand: ReqStrand,
}

impl RegulatoryRegion {
    /// One region per interval of `location`, named `gene_name#1`,
    /// `gene_name#2`, ... from the lowest coordinate up.
    pub fn from_location(gene_name: &str, location: &PieceWiseLocation) -> Vec<Self> {
        location
            .iter()
            .enumerate()
            .map(|(idx, interval)| {
                RegulatoryRegion::new(
                    location.refid().to_owned(),
                    interval.start(),
                    interval.end(),
                    format!("{}{}{}", gene_name, REGION_SEPARATOR, idx + 1),
                    location.strand(),
                )
            })
            .collect()
    }
}

impl Display for RegulatoryRegion {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t0\t{}",
            self.chromosome,
            self.start,
            self.end,
            self.name,
            self.strand.strand_symbol()
        )
    }
}

/// Write regions as BED rows.
pub fn write_regions<W: Write>(mut out: W, regions: &[RegulatoryRegion]) -> io::Result<()> {
    for region in regions {
        writeln!(out, "{}", region)?;
    }
    out.flush()
}

/// Region names per gene name, both sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneRegionTable {
    regions: BTreeMap<String, BTreeSet<String>>,
}

impl GeneRegionTable {
    /// Collect the region names of a regulatory BED file. Blank lines and
    /// `#`/`track`/`browser` header lines are skipped.
    pub fn from_bed<R: BufRead>(reader: R) -> Result<Self, BedError> {
        let mut regions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }
            let name = line
                .split('\t')
                .nth(3)
                .ok_or(BedError::MissingColumns { line: idx + 1 })?;
            let gene = match name.find(REGION_SEPARATOR) {
                Some(pos) => &name[..pos],
                None => {
                    return Err(BedError::MissingSeparator {
                        line: idx + 1,
                        name: name.to_owned(),
                    })
                }
            };
            regions
                .entry(gene.to_owned())
                .or_insert_with(BTreeSet::new)
                .insert(name.to_owned());
        }
        Ok(GeneRegionTable { regions })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self, gene_name: &str) -> Option<impl Iterator<Item = &str>> {
        self.regions
            .get(gene_name)
            .map(|names| names.iter().map(String::as_str))
    }

    /// One line per gene: `gene<TAB>region_1<TAB>region_2...`.
    pub fn write<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (gene, names) in &self.regions {
            write!(out, "{}", gene)?;
            for name in names {
                write!(out, "\t{}", name)?;
            }
            writeln!(out)?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annot::interval::Interval;
    use std::io::Cursor;

    #[test]
    fn rows_from_location() {
        let location = PieceWiseLocation::new(
            "chr3".to_owned(),
            ReqStrand::Reverse,
            vec![Interval::new(500, 700), Interval::new(100, 200)],
        );
        let regions = RegulatoryRegion::from_location("SOX2", &location);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].to_string(), "chr3\t100\t200\tSOX2#1\t0\t-");
        assert_eq!(regions[1].to_string(), "chr3\t500\t700\tSOX2#2\t0\t-");

        let mut out = Vec::new();
        write_regions(&mut out, &regions).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr3\t100\t200\tSOX2#1\t0\t-\nchr3\t500\t700\tSOX2#2\t0\t-\n"
        );
    }

    #[test]
    fn region_table() {
        let bed = "track name=reg\n\
                   chr1\t10\t20\tTP53#2\t0\t-\n\
                   chr1\t0\t5\tTP53#1\t0\t-\n\
                   chr2\t7\t9\tAKT1#1\t0\t+\n\
                   chr1\t0\t5\tTP53#1\t0\t-\n";
        let table = GeneRegionTable::from_bed(Cursor::new(bed)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.regions("TP53").unwrap().collect::<Vec<_>>(),
            vec!["TP53#1", "TP53#2"]
        );

        let mut out = Vec::new();
        table.write(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "AKT1\tAKT1#1\nTP53\tTP53#1\tTP53#2\n"
        );
    }

    #[test]
    fn malformed_bed() {
        let err = GeneRegionTable::from_bed(Cursor::new("chr1\t0\t5\n")).unwrap_err();
        assert!(matches!(err, BedError::MissingColumns { line: 1 }));
        let err = GeneRegionTable::from_bed(Cursor::new("chr1\t0\t5\tTP53\t0\t+\n")).unwrap_err();
        assert!(matches!(err, BedError::MissingSeparator { line: 1, .. }));
    }
}
