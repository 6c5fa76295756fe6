//! Genome-wide lookup tables: chromosome lengths and the set of
//! chromosomes a run is allowed to touch.

use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead};

use thiserror::Error;

pub type Position = isize;
pub type Length = isize;

#[derive(Error, Debug)]
pub enum GenomeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected `name<TAB>length`, got {content:?}")]
    BadSizesLine { line: usize, content: String },
}

/// Chromosome name to length table, used to cap extensions at the
/// chromosome end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromSizes {
    lengths: HashMap<String, Length>,
}

impl ChromSizes {
    pub fn new() -> Self {
        ChromSizes::default()
    }

    pub fn insert(&mut self, name: String, length: Length) {
        self.lengths.insert(name, length);
    }

    pub fn get(&self, name: &str) -> Option<Length> {
        self.lengths.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Length)> {
        self.lengths.iter().map(|(name, length)| (name.as_str(), *length))
    }

    /// Read a two-column `name<TAB>length` sizes file. Blank lines and
    /// lines starting with `#` are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, GenomeError> {
        let mut sizes = ChromSizes::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut fields = trimmed.split_whitespace();
            let parsed = match (fields.next(), fields.next()) {
                (Some(name), Some(length)) => length
                    .parse::<Length>()
                    .ok()
                    .map(|length| (name.to_owned(), length)),
                _ => None,
            };
            match parsed {
                Some((name, length)) => sizes.insert(name, length),
                None => {
                    return Err(GenomeError::BadSizesLine {
                        line: idx + 1,
                        content: line.clone(),
                    })
                }
            }
        }
        Ok(sizes)
    }
}

/// Allow-list of chromosome names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChromosomeSet {
    names: HashSet<String>,
}

impl ChromosomeSet {
    /// Read an allow-list: the first whitespace-delimited column of each
    /// line names a chromosome, lines starting with `#` are comments.
    /// With `exclude_alt`, names ending in `_alt` or `random` are dropped.
    pub fn from_reader<R: BufRead>(reader: R, exclude_alt: bool) -> Result<Self, GenomeError> {
        let mut names = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') {
                continue;
            }
            let name = match line.split_whitespace().next() {
                Some(name) => name,
                None => continue,
            };
            if exclude_alt && (name.ends_with("_alt") || name.ends_with("random")) {
                continue;
            }
            names.insert(name.to_owned());
        }
        Ok(ChromosomeSet { names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> std::iter::FromIterator<S> for ChromosomeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ChromosomeSet {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
