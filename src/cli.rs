//! Command line surface of the `cisreg` binary.

use std::convert::TryFrom;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{info, warn, Level};

use crate::bed::{write_regions, GeneRegionTable};
use crate::convert::{self, gff, gtf};
use crate::genedb::{ClassRule, GeneDb, TranscriptSource};
use crate::genome::{ChromSizes, ChromosomeSet, Position};
use crate::regulatory::{regulatory_regions, Mode, RegulatoryConfig};

#[derive(Parser, Debug)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Logging verbosity level
    #[arg(short = 'L', long, default_value = "info", global = true)]
    pub level: Level,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Derive regulatory regions from a gene database as BED
    Regions {
        /// SQLite gene database
        #[arg(short = 'd', long)]
        database: PathBuf,

        /// Chromosome allow-list (first column of each line)
        #[arg(short = 'c', long)]
        chromosomes: PathBuf,

        /// Bases to extend upstream of the TSS
        #[arg(short = 'u', long)]
        upstream: usize,

        /// Bases to extend downstream of the TES
        #[arg(short = 'w', long)]
        downstream: usize,

        /// Limit the intragenic part to this many bases from the TSS (0: no limit)
        #[arg(short = 'i', long)]
        intronic: usize,

        /// One of FullTx, AllIntrons, 5utrIntron1, NoTx, 5utr
        #[arg(short = 'm', long)]
        mode: String,

        /// Gene id prefixes defining transcript classes
        #[arg(short = 'p', long, value_delimiter = ',', default_value = "NM_")]
        class_prefixes: Vec<String>,

        /// Drop chromosomes ending in _alt or random from the allow-list
        #[arg(short = 'x', long, default_value = "false", action = ArgAction::SetTrue)]
        exclude_alt: bool,

        /// Output BED file [default: stdout]
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Convert GTF to a gene table
    Gtf2tbl {
        /// Input GTF file
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Source column value to keep
        #[arg(short = 's', long, default_value = gtf::DEFAULT_SOURCE, conflicts_with = "all_sources")]
        source: String,

        /// Keep features of every source
        #[arg(short = 'A', long, default_value = "false", action = ArgAction::SetTrue)]
        all_sources: bool,

        /// Output table [default: stdout]
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Convert GFF3 to a gene table
    Gff2tbl {
        /// Input GFF3 file
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Output table [default: stdout]
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Build a gene database from a gene table and chromosome sizes
    BuildDb {
        /// Gene table (16 or 15 columns)
        #[arg(short = 't', long)]
        table: PathBuf,

        /// Chromosome sizes (name<TAB>length)
        #[arg(short = 'c', long)]
        chrom_sizes: PathBuf,

        /// SQLite database to write
        #[arg(short = 'd', long)]
        database: PathBuf,
    },
    /// List region names per gene from a regulatory BED file
    RegionTable {
        /// Regulatory regions BED
        #[arg(short = 'b', long)]
        bed: PathBuf,

        /// Output table [default: stdout]
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

fn output_display(output: &Option<PathBuf>) -> String {
    output
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "-".to_owned())
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.command {
            Command::Regions {
                database,
                chromosomes,
                upstream,
                downstream,
                intronic,
                mode,
                class_prefixes,
                exclude_alt,
                output,
            } => write!(
                f,
                "command=regions, database={}, chromosomes={}, upstream={}, downstream={}, intronic={}, mode={}, class_prefixes={}, exclude_alt={}, output={}",
                database.display(),
                chromosomes.display(),
                upstream,
                downstream,
                intronic,
                mode,
                class_prefixes.join(","),
                exclude_alt,
                output_display(output),
            )?,
            Command::Gtf2tbl {
                input,
                source,
                all_sources,
                output,
            } => write!(
                f,
                "command=gtf2tbl, input={}, source={}, all_sources={}, output={}",
                input.display(),
                source,
                all_sources,
                output_display(output),
            )?,
            Command::Gff2tbl { input, output } => write!(
                f,
                "command=gff2tbl, input={}, output={}",
                input.display(),
                output_display(output),
            )?,
            Command::BuildDb {
                table,
                chrom_sizes,
                database,
            } => write!(
                f,
                "command=build-db, table={}, chrom_sizes={}, database={}",
                table.display(),
                chrom_sizes.display(),
                database.display(),
            )?,
            Command::RegionTable { bed, output } => write!(
                f,
                "command=region-table, bed={}, output={}",
                bed.display(),
                output_display(output),
            )?,
        }
        write!(f, ", level={}", self.level)
    }
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    if !path.is_file() {
        bail!("{} doesn't exist", path.display());
    }
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn open_output(output: &Option<PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn extension(bases: usize, name: &str) -> Result<Position> {
    Position::try_from(bases).with_context(|| format!("--{} {} is out of range", name, bases))
}

/// Run the selected subcommand.
pub fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Regions {
            database,
            chromosomes,
            upstream,
            downstream,
            intronic,
            mode,
            class_prefixes,
            exclude_alt,
            output,
        } => {
            if !database.is_file() {
                bail!("database file {} doesn't exist", database.display());
            }
            let chromosomes = ChromosomeSet::from_reader(open_input(chromosomes)?, *exclude_alt)
                .with_context(|| format!("cannot read {}", chromosomes.display()))?;
            let mode = mode.parse::<Mode>()?;
            let class_rule = ClassRule::new(
                class_prefixes
                    .iter()
                    .filter(|prefix| !prefix.is_empty())
                    .cloned()
                    .collect(),
            );
            let config = RegulatoryConfig::new(
                extension(*upstream, "upstream")?,
                extension(*downstream, "downstream")?,
                extension(*intronic, "intronic")?,
                mode,
                class_rule,
            );

            let db = GeneDb::open(database)
                .with_context(|| format!("cannot open database {}", database.display()))?;
            let sizes = db.chromosome_lengths()?;
            info!(
                "{} permitted chromosomes, {} chromosome lengths",
                chromosomes.len(),
                sizes.len()
            );
            let regions = regulatory_regions(&db, &chromosomes, &sizes, &config)?;
            write_regions(open_output(output)?, &regions)?;
        }
        Command::Gtf2tbl {
            input,
            source,
            all_sources,
            output,
        } => {
            let source = if *all_sources {
                None
            } else {
                Some(source.as_str())
            };
            let rows = gtf::convert(open_input(input)?, source)
                .with_context(|| format!("cannot convert {}", input.display()))?;
            convert::write_table(open_output(output)?, &rows)?;
            info!("{} transcripts written", rows.len());
        }
        Command::Gff2tbl { input, output } => {
            let rows = gff::convert(open_input(input)?)
                .with_context(|| format!("cannot convert {}", input.display()))?;
            convert::write_table(open_output(output)?, &rows)?;
            info!("{} transcripts written", rows.len());
        }
        Command::BuildDb {
            table,
            chrom_sizes,
            database,
        } => {
            let rows = convert::read_table(open_input(table)?)
                .with_context(|| format!("cannot read {}", table.display()))?;
            let sizes = ChromSizes::from_reader(open_input(chrom_sizes)?)
                .with_context(|| format!("cannot read {}", chrom_sizes.display()))?;
            let mut transcripts = Vec::with_capacity(rows.len());
            for row in &rows {
                match row.to_transcript() {
                    Ok(tx) => transcripts.push(tx),
                    Err(err) => warn!("Skipped {}", err),
                }
            }
            let mut db = GeneDb::create(database)
                .with_context(|| format!("cannot create database {}", database.display()))?;
            db.load_tables(&transcripts, &sizes)?;
            info!(
                "{} of {} transcripts and {} chromosomes loaded into {}",
                transcripts.len(),
                rows.len(),
                sizes.len(),
                database.display()
            );
        }
        Command::RegionTable { bed, output } => {
            let table = GeneRegionTable::from_bed(open_input(bed)?)
                .with_context(|| format!("cannot read {}", bed.display()))?;
            table.write(open_output(output)?)?;
            info!("{} genes", table.len());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_regions() {
        let args = Args::try_parse_from(&[
            "cisreg", "regions", "-d", "genes.db", "-c", "chroms.txt", "-u", "5000", "-w", "1000",
            "-i", "0", "-m", "5utr", "-p", "NM_,NR_",
        ])
        .unwrap();
        match &args.command {
            Command::Regions {
                upstream,
                mode,
                class_prefixes,
                exclude_alt,
                output,
                ..
            } => {
                assert_eq!(*upstream, 5000);
                assert_eq!(mode, "5utr");
                assert_eq!(class_prefixes, &vec!["NM_".to_owned(), "NR_".to_owned()]);
                assert!(!exclude_alt);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.level, Level::Info);
        assert!(args.to_string().starts_with("command=regions, database=genes.db"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Args::try_parse_from(&["cisreg", "regions", "-d", "genes.db"]).is_err());
        assert!(Args::try_parse_from(&[
            "cisreg", "regions", "-d", "g.db", "-c", "c.txt", "-u", "-5", "-w", "0", "-i", "0",
            "-m", "NoTx",
        ])
        .is_err());
        assert!(Args::try_parse_from(&[
            "cisreg", "gtf2tbl", "-i", "a.gtf", "-s", "lncRNA", "--all-sources",
        ])
        .is_err());
    }

    #[test]
    fn extension_out_of_range() {
        assert_eq!(extension(5000, "upstream").unwrap(), 5000);
        let err = extension(usize::MAX, "downstream").unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("--downstream {} is out of range", usize::MAX)
        );
    }

    #[test]
    fn unknown_mode_fails_run() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("genes.db");
        GeneDb::create(&db).unwrap();
        let chroms = dir.path().join("chroms.txt");
        std::fs::write(&chroms, "chr1\n").unwrap();
        let args = Args::try_parse_from(&[
            "cisreg",
            "regions",
            "-d",
            db.to_str().unwrap(),
            "-c",
            chroms.to_str().unwrap(),
            "-u",
            "0",
            "-w",
            "0",
            "-i",
            "0",
            "-m",
            "FullTranscript",
        ])
        .unwrap();
        let err = run(&args).unwrap_err();
        assert_eq!(err.to_string(), "'FullTranscript' is an unknown mode");
    }
}
