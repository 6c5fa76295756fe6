//! GTF to gene table conversion.

use std::collections::HashMap;
use std::io::BufRead;

use log::{info, warn};
use regex::Regex;

use crate::convert::{
    feature_columns, feature_span, feature_strand, sorted_exon_bounds, ConvertError, GenePredRow,
};
use crate::genome::Position;
use crate::strand::ReqStrand;

/// Source column value kept by default.
pub const DEFAULT_SOURCE: &str = "protein_coding";

lazy_static! {
    static ref ATTRIBUTE_RE: Regex =
        Regex::new(r#"^\W*([A-Za-z_]+)\W+"([A-Za-z_0-9\.]+)"\W*$"#).unwrap();
}

/// `key "value"` pairs of a GTF attribute column; elements of any
/// other shape are ignored.
fn parse_attributes(column: &str) -> HashMap<&str, &str> {
    column
        .split(';')
        .filter_map(|element| ATTRIBUTE_RE.captures(element))
        .filter_map(|cap| match (cap.get(1), cap.get(2)) {
            (Some(key), Some(value)) => Some((key.as_str(), value.as_str())),
            _ => None,
        })
        .collect()
}

struct GtfTranscript {
    transcript_id: String,
    gene_id: String,
    chrom: String,
    strand: ReqStrand,
    exons: Vec<(Position, Position)>,
    cds: Vec<(Position, Position)>,
}

impl GtfTranscript {
    // Transcript span is the exon extent. Without CDS features the CDS
    // is pinned at the transcript start.
    fn into_row(self) -> Option<GenePredRow> {
        let tx_start = self.exons.iter().map(|exon| exon.0).min()?;
        let tx_end = self.exons.iter().map(|exon| exon.1).max()?;
        let (cds_start, cds_end) = match (
            self.cds.iter().map(|cds| cds.0).min(),
            self.cds.iter().map(|cds| cds.1).max(),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => (tx_start, tx_start),
        };
        let (exon_starts, exon_ends) = sorted_exon_bounds(&self.exons);
        Some(GenePredRow {
            name: self.transcript_id,
            chrom: self.chrom,
            strand: self.strand,
            tx_start,
            tx_end,
            cds_start,
            cds_end,
            exon_starts,
            exon_ends,
            name2: self.gene_id,
        })
    }
}

/// Convert GTF records into gene table rows, one per `transcript_id`,
/// in order of first appearance.
///
/// Only lines whose source column equals `source` are used, unless it is
/// `None`. Transcripts without exon features are skipped.
pub fn convert<R: BufRead>(reader: R, source: Option<&str>) -> Result<Vec<GenePredRow>, ConvertError> {
    let mut transcripts: Vec<GtfTranscript> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let columns = feature_columns(line.trim_end(), line_no)?;
        if let Some(source) = source {
            if columns[1] != source {
                continue;
            }
        }
        let attributes = parse_attributes(columns[8]);
        let attribute = |name: &'static str| {
            attributes
                .get(name)
                .map(|value| value.to_string())
                .ok_or_else(|| ConvertError::MissingAttribute {
                    line: line_no,
                    feature: columns[2].to_owned(),
                    attribute: name,
                })
        };
        let transcript_id = attribute("transcript_id")?;

        let pos = match index.get(&transcript_id) {
            Some(&pos) => pos,
            None => {
                transcripts.push(GtfTranscript {
                    transcript_id: transcript_id.clone(),
                    gene_id: attribute("gene_id")?,
                    chrom: columns[0].to_owned(),
                    strand: feature_strand(&columns, line_no)?,
                    exons: Vec::new(),
                    cds: Vec::new(),
                });
                index.insert(transcript_id, transcripts.len() - 1);
                transcripts.len() - 1
            }
        };
        match columns[2] {
            "exon" => transcripts[pos].exons.push(feature_span(&columns, line_no)?),
            "CDS" => transcripts[pos].cds.push(feature_span(&columns, line_no)?),
            _ => (),
        }
    }

    info!("{} transcripts in GTF", transcripts.len());
    let mut rows = Vec::with_capacity(transcripts.len());
    for transcript in transcripts {
        let transcript_id = transcript.transcript_id.clone();
        match transcript.into_row() {
            Some(row) => rows.push(row),
            None => warn!("{} is an empty transcript", transcript_id),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const GTF: &str = "\
#!genome-build GRCh37
chr1\tprotein_coding\texon\t1001\t1200\t.\t+\t.\tgene_id \"G1\"; transcript_id \"NM_1\";
chr1\tprotein_coding\tCDS\t1101\t1200\t.\t+\t0\tgene_id \"G1\"; transcript_id \"NM_1\";
chr1\tprotein_coding\texon\t1301\t1500\t.\t+\t.\tgene_id \"G1\"; transcript_id \"NM_1\";
chr1\tprotein_coding\tCDS\t1301\t1400\t.\t+\t2\tgene_id \"G1\"; transcript_id \"NM_1\";
chr2\tprotein_coding\texon\t501\t600\t.\t-\t.\tgene_id \"G2\"; transcript_id \"NR_2\";
chr2\tprotein_coding\tstart_codon\t501\t503\t.\t-\t.\tgene_id \"G3\"; transcript_id \"NM_3\";
chr2\tpseudogene\texon\t901\t1000\t.\t-\t.\tgene_id \"G4\"; transcript_id \"NR_4\";
";

    #[test]
    fn attributes() {
        let attributes = parse_attributes("gene_id \"ENSG1\"; transcript_id \"ENST1.2\"; tag basic;");
        assert_eq!(attributes.get("gene_id"), Some(&"ENSG1"));
        assert_eq!(attributes.get("transcript_id"), Some(&"ENST1.2"));
        assert_eq!(attributes.get("tag"), None);
    }

    #[test]
    fn protein_coding_only() {
        let rows = convert(Cursor::new(GTF), Some(DEFAULT_SOURCE)).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(
            rows[0].to_string(),
            "NA\tNM_1\tchr1\t+\t1000\t1500\t1100\t1400\t2\t1000,1300,\t1200,1500,\tNA\tG1\tNA\tNA\tNA"
        );
        // non-coding: CDS pinned at the transcript start
        assert_eq!(rows[1].name, "NR_2");
        assert_eq!((rows[1].cds_start, rows[1].cds_end), (500, 500));
        assert!(rows[1].to_transcript().is_ok());
    }

    #[test]
    fn all_sources() {
        let rows = convert(Cursor::new(GTF), None).unwrap();
        let names: Vec<_> = rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["NM_1", "NR_2", "NR_4"]);
    }

    #[test]
    fn missing_transcript_id() {
        let gtf = "chr1\tprotein_coding\texon\t1\t10\t.\t+\t.\tgene_id \"G1\";\n";
        let err = convert(Cursor::new(gtf), None).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::MissingAttribute { line: 1, attribute: "transcript_id", .. }
        ));
    }
}
