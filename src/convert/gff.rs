//! GFF3 to gene table conversion.

use std::collections::HashMap;
use std::io::BufRead;

use log::{info, warn};

use crate::convert::{
    feature_columns, feature_span, feature_strand, sorted_exon_bounds, ConvertError, GenePredRow,
};
use crate::genome::Position;
use crate::strand::ReqStrand;

/// Feature types taken from the GFF body; everything else is ignored.
pub const FEATURE_TYPES: [&str; 9] = [
    "mRNA", "miRNA", "ncRNA", "tRNA", "rRNA", "snRNA", "snoRNA", "CDS", "exon",
];

#[derive(Debug, Default)]
struct Attributes {
    id: Option<String>,
    name: Option<String>,
    parents: Vec<String>,
}

impl Attributes {
    fn parse(column: &str) -> Self {
        let mut attributes = Attributes::default();
        for element in column.split(';') {
            let mut pair = element.trim().splitn(2, '=');
            match (pair.next(), pair.next()) {
                (Some("ID"), Some(value)) => attributes.id = Some(value.to_owned()),
                (Some("Name"), Some(value)) => attributes.name = Some(value.to_owned()),
                (Some("Parent"), Some(value)) => {
                    attributes.parents = value.split(',').map(str::to_owned).collect()
                }
                _ => (),
            }
        }
        attributes
    }
}

// An RNA feature with its exons and CDS parts. Children may precede
// their parent, so everything but the id is filled in lazily.
#[derive(Debug)]
struct Entry {
    feature_id: String,
    gene_id: String,
    chrom: String,
    strand: Option<ReqStrand>,
    span: Option<(Position, Position)>,
    exons: Vec<(Position, Position)>,
    cds: Vec<(Position, Position)>,
}

impl Entry {
    fn new(feature_id: String) -> Self {
        Entry {
            feature_id,
            gene_id: String::new(),
            chrom: String::new(),
            strand: None,
            span: None,
            exons: Vec::new(),
            cds: Vec::new(),
        }
    }

    // Without exons the whole span is one exon; without CDS parts the
    // CDS is pinned at the transcript end.
    fn into_row(mut self) -> Option<GenePredRow> {
        let (tx_start, tx_end) = self.span?;
        let strand = self.strand?;
        if self.exons.is_empty() {
            self.exons.push((tx_start, tx_end));
        }
        let (cds_start, cds_end) = match (
            self.cds.iter().map(|cds| cds.0).min(),
            self.cds.iter().map(|cds| cds.1).max(),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => (tx_end, tx_end),
        };
        let (exon_starts, exon_ends) = sorted_exon_bounds(&self.exons);
        Some(GenePredRow {
            name: self.feature_id,
            chrom: self.chrom,
            strand,
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

#[derive(Default)]
struct Entries {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Entries {
    fn get_or_insert(&mut self, feature_id: &str) -> &mut Entry {
        let pos = match self.index.get(feature_id) {
            Some(&pos) => pos,
            None => {
                self.entries.push(Entry::new(feature_id.to_owned()));
                self.index
                    .insert(feature_id.to_owned(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos]
    }
}

/// Convert the body of a GFF3 file into gene table rows, one per RNA
/// feature, in order of first appearance.
///
/// Reading stops at the first `###` or `##FASTA` directive. RNA features
/// must carry an `ID` and either a single `Parent` or a `Name`, which
/// becomes the gene id. Exon and CDS features must carry a `Parent` and
/// are attached to every parent listed.
pub fn convert<R: BufRead>(reader: R) -> Result<Vec<GenePredRow>, ConvertError> {
    let mut entries = Entries::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.starts_with("###") || line.starts_with("##FASTA") {
            break;
        }
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let columns = feature_columns(line.trim_end(), line_no)?;
        let feature = columns[2];
        if !FEATURE_TYPES.contains(&feature) {
            continue;
        }
        let attributes = Attributes::parse(columns[8]);
        let span = feature_span(&columns, line_no)?;
        let missing = |attribute: &'static str| ConvertError::MissingAttribute {
            line: line_no,
            feature: feature.to_owned(),
            attribute,
        };

        if feature.ends_with("RNA") {
            let feature_id = attributes.id.clone().ok_or_else(|| missing("ID"))?;
            let gene_id = match (attributes.parents.as_slice(), attributes.name) {
                ([parent], _) => parent.clone(),
                (_, Some(name)) => name,
                _ => {
                    return Err(ConvertError::NoGeneId {
                        line: line_no,
                        feature: feature.to_owned(),
                        id: feature_id,
                    })
                }
            };
            let strand = feature_strand(&columns, line_no)?;
            let entry = entries.get_or_insert(&feature_id);
            entry.gene_id = gene_id;
            entry.chrom = columns[0].to_owned();
            entry.strand = Some(strand);
            entry.span = Some(span);
        } else {
            if attributes.parents.is_empty() {
                return Err(missing("Parent"));
            }
            for parent in &attributes.parents {
                let entry = entries.get_or_insert(parent);
                if feature == "exon" {
                    entry.exons.push(span);
                } else {
                    entry.cds.push(span);
                }
            }
        }
    }

    info!("{} entries in GFF", entries.entries.len());
    let mut rows = Vec::with_capacity(entries.entries.len());
    for entry in entries.entries {
        let feature_id = entry.feature_id.clone();
        match entry.into_row() {
            Some(row) => rows.push(row),
            None => warn!("{} is an empty entry", feature_id),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const GFF: &str = "\
##gff-version 3
chr1\tRefSeq\tgene\t1001\t1500\t.\t+\t.\tID=gene0;Name=GENE1
chr1\tRefSeq\texon\t1001\t1200\t.\t+\t.\tParent=rna0
chr1\tRefSeq\tmRNA\t1001\t1500\t.\t+\t.\tID=rna0;Parent=gene0;Name=NM_1
chr1\tRefSeq\texon\t1301\t1500\t.\t+\t.\tParent=rna0
chr1\tRefSeq\tCDS\t1101\t1200\t.\t+\t0\tID=cds0;Parent=rna0
chr1\tRefSeq\tCDS\t1301\t1400\t.\t+\t2\tID=cds0;Parent=rna0
chr2\tRefSeq\tmiRNA\t501\t522\t.\t-\t.\tID=rna1;Name=MIR1
chr2\tRefSeq\texon\t901\t1000\t.\t-\t.\tParent=rna9
###
chr3\tRefSeq\tmRNA\t1\t10\t.\t+\t.\tID=rna2;Name=LATE
";

    #[test]
    fn rna_features() {
        let rows = convert(Cursor::new(GFF)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].to_string(),
            "NA\trna0\tchr1\t+\t1000\t1500\t1100\t1400\t2\t1000,1300,\t1200,1500,\tNA\tgene0\tNA\tNA\tNA"
        );

        // no exons: one exon over the span; no CDS: pinned at the end
        let mirna = &rows[1];
        assert_eq!(mirna.name, "rna1");
        assert_eq!(mirna.name2, "MIR1");
        assert_eq!((mirna.exon_starts.clone(), mirna.exon_ends.clone()), (vec![500], vec![522]));
        assert_eq!((mirna.cds_start, mirna.cds_end), (522, 522));
    }

    #[test]
    fn shared_exons() {
        let gff = "chr1\t.\tmRNA\t1\t100\t.\t-\t.\tID=a;Name=A\n\
                   chr1\t.\tmRNA\t1\t100\t.\t-\t.\tID=b;Name=B\n\
                   chr1\t.\texon\t1\t100\t.\t-\t.\tParent=a,b\n";
        let rows = convert(Cursor::new(gff)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.exon_count() == 1));
    }

    #[test]
    fn missing_attributes() {
        let gff = "chr1\t.\tmRNA\t1\t100\t.\t+\t.\tName=A\n";
        let err = convert(Cursor::new(gff)).unwrap_err();
        assert!(matches!(err, ConvertError::MissingAttribute { attribute: "ID", .. }));

        let gff = "chr1\t.\tmRNA\t1\t100\t.\t+\t.\tID=a;Parent=g1,g2\n";
        let err = convert(Cursor::new(gff)).unwrap_err();
        assert!(matches!(err, ConvertError::NoGeneId { line: 1, .. }));

        let gff = "chr1\t.\texon\t1\t100\t.\t+\t.\tID=e1\n";
        let err = convert(Cursor::new(gff)).unwrap_err();
        assert!(matches!(err, ConvertError::MissingAttribute { attribute: "Parent", .. }));
    }
}
