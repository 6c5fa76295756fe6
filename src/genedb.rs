//! Gene database: an SQLite store with one row per transcript in a
//! `genes` table and chromosome lengths in a `chromosomes` table.

use std::path::Path;

use log::{debug, warn};
use rusqlite::{params, Connection, OpenFlags, Row};
use thiserror::Error;

use crate::annot::interval::Interval;
use crate::genome::ChromSizes;
use crate::strand::ReqStrand;
use crate::transcript::{format_coords, Transcript, TranscriptError};

const CREATE_SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS genes (
        geneID TEXT NOT NULL,
        chromosome TEXT NOT NULL,
        strand TEXT NOT NULL,
        txStart INTEGER NOT NULL,
        txEnd INTEGER NOT NULL,
        cdsStart INTEGER NOT NULL,
        cdsEnd INTEGER NOT NULL,
        exonCount INTEGER NOT NULL,
        exonStarts TEXT NOT NULL,
        exonEnds TEXT NOT NULL,
        geneName TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS genes_gene_id ON genes (geneID);
    CREATE INDEX IF NOT EXISTS genes_location ON genes (chromosome, txStart, txEnd);
    CREATE TABLE IF NOT EXISTS chromosomes (
        name TEXT NOT NULL PRIMARY KEY,
        length INTEGER NOT NULL
    );
";

const GENE_COLUMNS: &str = "geneID, chromosome, strand, txStart, txEnd, cdsStart, cdsEnd, \
                            exonCount, exonStarts, exonEnds, geneName";

const INSERT_GENE_STATEMENT: &str = r"
    INSERT INTO genes (geneID, chromosome, strand, txStart, txEnd, cdsStart, cdsEnd,
                       exonCount, exonStarts, exonEnds, geneName)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);
";

const INSERT_CHROMOSOME_STATEMENT: &str =
    "INSERT OR REPLACE INTO chromosomes (name, length) VALUES (?1, ?2);";

const LOAD_GENE_IDS_STATEMENT: &str = "SELECT DISTINCT geneID FROM genes ORDER BY geneID;";

const GET_CHROMOSOME_LENGTHS_STATEMENT: &str = "SELECT name, length FROM chromosomes;";

#[derive(Error, Debug)]
pub enum GeneDbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed transcript row: {0}")]
    Transcript(#[from] TranscriptError),
}

impl GeneDbError {
    /// Storage failures abort a run; a malformed row only spoils the
    /// gene it belongs to.
    pub fn is_fatal(&self) -> bool {
        match self {
            GeneDbError::Sqlite(_) => true,
            GeneDbError::Transcript(_) => false,
        }
    }
}

/// Transcript class predicate for overlap queries.
///
/// A gene id starting with one of the prefixes belongs to that class,
/// and only transcripts of the same class may suppress its regulatory
/// region. Gene ids matching no prefix are unrestricted, as is every
/// gene when the prefix list is empty.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct ClassRule {
    prefixes: Vec<String>,
}

impl ClassRule {
    /// A rule that never restricts overlap queries.
    pub fn unrestricted() -> Self {
        ClassRule::new(Vec::new())
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// The class prefix of `gene_id`, if any.
    pub fn class_of(&self, gene_id: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|prefix| gene_id.starts_with(prefix.as_str()))
            .map(String::as_str)
    }
}

impl Default for ClassRule {
    fn default() -> Self {
        ClassRule::new(vec!["NM_".to_owned()])
    }
}

/// Anything that can look up transcripts by gene identifier and by
/// genomic overlap.
pub trait TranscriptSource {
    /// All distinct gene identifiers, sorted.
    fn gene_ids(&self) -> Result<Vec<String>, GeneDbError>;

    /// Every transcript stored under `gene_id`.
    fn load_by_gene_id(&self, gene_id: &str) -> Result<Vec<Transcript>, GeneDbError>;

    /// Transcripts on `chromosome` whose span overlaps `interval`,
    /// optionally restricted to one strand and to gene identifiers
    /// starting with `class_prefix`. Rows that fail validation are left
    /// out.
    fn load_by_location(
        &self,
        chromosome: &str,
        interval: &Interval,
        strand: Option<ReqStrand>,
        class_prefix: Option<&str>,
    ) -> Result<Vec<Transcript>, GeneDbError>;

    /// Chromosome length table.
    fn chromosome_lengths(&self) -> Result<ChromSizes, GeneDbError>;
}

// Raw column values of one `genes` row; validated into a `Transcript`
// outside of the rusqlite row callback.
struct GeneRow {
    gene_id: String,
    chromosome: String,
    strand: String,
    tx_start: i64,
    tx_end: i64,
    cds_start: i64,
    cds_end: i64,
    exon_count: i64,
    exon_starts: String,
    exon_ends: String,
    gene_name: String,
}

impl GeneRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(GeneRow {
            gene_id: row.get(0)?,
            chromosome: row.get(1)?,
            strand: row.get(2)?,
            tx_start: row.get(3)?,
            tx_end: row.get(4)?,
            cds_start: row.get(5)?,
            cds_end: row.get(6)?,
            exon_count: row.get(7)?,
            exon_starts: row.get(8)?,
            exon_ends: row.get(9)?,
            gene_name: row.get(10)?,
        })
    }

    fn into_transcript(self) -> Result<Transcript, TranscriptError> {
        Transcript::from_columns(
            &self.gene_id,
            &self.gene_name,
            &self.chromosome,
            &self.strand,
            self.tx_start as isize,
            self.tx_end as isize,
            self.cds_start as isize,
            self.cds_end as isize,
            self.exon_count.max(0) as usize,
            &self.exon_starts,
            &self.exon_ends,
        )
    }
}

/// SQLite-backed gene database. The connection is closed when the
/// value is dropped.
pub struct GeneDb {
    connection: Connection,
}

impl GeneDb {
    /// Open an existing database for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GeneDbError> {
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(GeneDb { connection })
    }

    /// Create (or open for writing) a database and make sure the schema
    /// exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, GeneDbError> {
        let connection = Connection::open(path)?;
        connection.execute_batch(CREATE_SCHEMA)?;
        Ok(GeneDb { connection })
    }

    pub fn open_in_memory() -> Result<Self, GeneDbError> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(CREATE_SCHEMA)?;
        Ok(GeneDb { connection })
    }

    pub fn insert_transcript(&self, tx: &Transcript) -> Result<(), GeneDbError> {
        insert_transcript_into(&self.connection, tx)
    }

    pub fn insert_chromosome(&self, name: &str, length: isize) -> Result<(), GeneDbError> {
        self.connection
            .execute(INSERT_CHROMOSOME_STATEMENT, params![name, length as i64])?;
        Ok(())
    }

    /// Insert transcripts and chromosome lengths in one transaction.
    pub fn load_tables(
        &mut self,
        transcripts: &[Transcript],
        sizes: &ChromSizes,
    ) -> Result<(), GeneDbError> {
        let transaction = self.connection.transaction()?;
        for tx in transcripts {
            insert_transcript_into(&transaction, tx)?;
        }
        for (name, length) in sizes.iter() {
            transaction.execute(INSERT_CHROMOSOME_STATEMENT, params![name, length as i64])?;
        }
        transaction.commit()?;
        Ok(())
    }

    fn query_rows<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<GeneRow>, GeneDbError> {
        let mut statement = self.connection.prepare_cached(sql)?;
        let rows = statement
            .query_map(params, GeneRow::from_row)?
            .collect::<rusqlite::Result<Vec<GeneRow>>>()?;
        Ok(rows)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }
}

fn insert_transcript_into(connection: &Connection, tx: &Transcript) -> Result<(), GeneDbError> {
    connection.execute(
        INSERT_GENE_STATEMENT,
        params![
            tx.gene_id(),
            tx.chromosome(),
            tx.strand().strand_symbol(),
            tx.tx_start() as i64,
            tx.tx_end() as i64,
            tx.cds_start() as i64,
            tx.cds_end() as i64,
            tx.exon_count() as i64,
            format_coords(tx.exon_starts()),
            format_coords(tx.exon_ends()),
            tx.gene_name(),
        ],
    )?;
    Ok(())
}

impl TranscriptSource for GeneDb {
    fn gene_ids(&self) -> Result<Vec<String>, GeneDbError> {
        let mut statement = self.connection.prepare(LOAD_GENE_IDS_STATEMENT)?;
        let ids = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    fn load_by_gene_id(&self, gene_id: &str) -> Result<Vec<Transcript>, GeneDbError> {
        let sql = format!("SELECT {} FROM genes WHERE geneID = ?1;", GENE_COLUMNS);
        let mut transcripts = Vec::new();
        for row in self.query_rows(&sql, params![gene_id])? {
            transcripts.push(row.into_transcript()?);
        }
        Ok(transcripts)
    }

    fn load_by_location(
        &self,
        chromosome: &str,
        interval: &Interval,
        strand: Option<ReqStrand>,
        class_prefix: Option<&str>,
    ) -> Result<Vec<Transcript>, GeneDbError> {
        // A NULL strand or prefix disables the respective restriction.
        let sql = format!(
            "SELECT {} FROM genes \
             WHERE chromosome = ?1 AND txStart < ?2 AND txEnd > ?3 \
             AND (?4 IS NULL OR strand = ?4) \
             AND (?5 IS NULL OR substr(geneID, 1, length(?5)) = ?5) \
             ORDER BY geneID;",
            GENE_COLUMNS
        );
        debug!(
            "overlap query {}:{} strand={:?} class={:?}",
            chromosome, interval, strand, class_prefix
        );
        let rows = self.query_rows(
            &sql,
            params![
                chromosome,
                interval.end() as i64,
                interval.start() as i64,
                strand.map(|s| s.strand_symbol()),
                class_prefix,
            ],
        )?;
        // Malformed rows only spoil their own gene.
        let mut transcripts = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_transcript() {
                Ok(tx) => transcripts.push(tx),
                Err(err) => warn!("Ignored overlapping row: {}", err),
            }
        }
        Ok(transcripts)
    }

    fn chromosome_lengths(&self) -> Result<ChromSizes, GeneDbError> {
        let mut statement = self.connection.prepare(GET_CHROMOSOME_LENGTHS_STATEMENT)?;
        let rows = statement
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;
        let mut sizes = ChromSizes::new();
        for (name, length) in rows {
            sizes.insert(name, length as isize);
        }
        Ok(sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(gene_id: &str, chrom: &str, strand: ReqStrand, start: isize, end: isize) -> Transcript {
        Transcript::new(
            gene_id.to_owned(),
            format!("{}_name", gene_id),
            chrom.to_owned(),
            strand,
            start,
            end,
            start,
            end,
            vec![start],
            vec![end],
        )
        .unwrap()
    }

    fn populated() -> GeneDb {
        let mut db = GeneDb::open_in_memory().unwrap();
        let mut sizes = ChromSizes::new();
        sizes.insert("chr1".to_owned(), 10000);
        sizes.insert("chr2".to_owned(), 5000);
        db.load_tables(
            &[
                tx("NM_1", "chr1", ReqStrand::Forward, 100, 200),
                tx("NR_2", "chr1", ReqStrand::Reverse, 150, 300),
                tx("NM_3", "chr1", ReqStrand::Reverse, 400, 500),
                tx("NM_4", "chr2", ReqStrand::Forward, 100, 200),
            ],
            &sizes,
        )
        .unwrap();
        db
    }

    fn ids(transcripts: &[Transcript]) -> Vec<&str> {
        transcripts.iter().map(Transcript::gene_id).collect()
    }

    #[test]
    fn round_trip_rows() {
        let db = populated();
        assert_eq!(db.gene_ids().unwrap(), vec!["NM_1", "NM_3", "NM_4", "NR_2"]);

        let loaded = db.load_by_gene_id("NR_2").unwrap();
        assert_eq!(loaded, vec![tx("NR_2", "chr1", ReqStrand::Reverse, 150, 300)]);
        assert!(db.load_by_gene_id("NM_404").unwrap().is_empty());

        let sizes = db.chromosome_lengths().unwrap();
        assert_eq!(sizes.get("chr2"), Some(5000));
    }

    #[test]
    fn overlap_queries() {
        let db = populated();
        let window = Interval::new(190, 450);
        let all = db.load_by_location("chr1", &window, None, None).unwrap();
        assert_eq!(ids(&all), vec!["NM_1", "NM_3", "NR_2"]);

        let reverse = db
            .load_by_location("chr1", &window, Some(ReqStrand::Reverse), None)
            .unwrap();
        assert_eq!(ids(&reverse), vec!["NM_3", "NR_2"]);

        let nm_only = db.load_by_location("chr1", &window, None, Some("NM_")).unwrap();
        assert_eq!(ids(&nm_only), vec!["NM_1", "NM_3"]);

        // touching is not overlapping
        let touching = db
            .load_by_location("chr1", &Interval::new(300, 400), None, None)
            .unwrap();
        assert!(touching.is_empty());
    }

    #[test]
    fn class_rule() {
        let rule = ClassRule::default();
        assert_eq!(rule.class_of("NM_000014"), Some("NM_"));
        assert_eq!(rule.class_of("NR_024540"), None);

        let rule = ClassRule::new(vec!["NM_".to_owned(), "NR_".to_owned()]);
        assert_eq!(rule.class_of("NR_024540"), Some("NR_"));
        assert_eq!(ClassRule::unrestricted().class_of("NM_000014"), None);
    }

    #[test]
    fn malformed_rows_are_not_fatal() {
        let db = GeneDb::open_in_memory().unwrap();
        db.connection
            .execute(
                INSERT_GENE_STATEMENT,
                params!["NM_9", "chr1", ".", 0, 10, 0, 10, 1, "0,", "10,", "BAD"],
            )
            .unwrap();
        let err = db.load_by_gene_id("NM_9").unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn malformed_overlapping_rows_are_ignored() {
        let db = populated();
        db.connection
            .execute(
                INSERT_GENE_STATEMENT,
                params!["NM_9", "chr1", "+", 180, 260, 180, 260, 2, "240,180,", "260,200,", "BAD"],
            )
            .unwrap();
        let found = db
            .load_by_location("chr1", &Interval::new(190, 250), None, None)
            .unwrap();
        assert_eq!(ids(&found), vec!["NM_1", "NR_2"]);
        assert!(db.load_by_gene_id("NM_9").is_err());
    }
}
