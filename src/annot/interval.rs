// Copyright 2017 Nicholas Ingolia
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Half-open integer interval, e.g. 334,412-334,916 on some sequence.

use std::cmp::{max, min};
use std::fmt::{self, Display, Formatter};
use std::iter;
use std::str::FromStr;

use regex::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::annot::ParseAnnotError;

/// Half-open, 0-based interval `[start, end)`, like the Rust `Range`
/// and the BED format.
///
/// An interval constructed with `start >= end` is normalized to the
/// empty interval `[start, start)`. Intervals order lexicographically
/// on `(start, end)`.
///
/// ```
/// use cisreg::annot::interval::Interval;
/// let exon = Interval::new(334412, 334916);
/// assert!(exon.contains(334412));
/// assert!(!exon.contains(334916));
/// assert!(Interval::new(10, 3).is_empty());
/// assert_eq!(Interval::new(10, 3), Interval::new(10, 10));
/// ```
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    start: isize,
    end: isize,
}

impl Interval {
    pub fn new(start: isize, end: isize) -> Self {
        Interval {
            start,
            end: if start < end { end } else { start },
        }
    }

    /// Empty interval anchored at `pos`.
    pub fn empty_at(pos: isize) -> Self {
        Interval {
            start: pos,
            end: pos,
        }
    }

    /// Starting (lowest) position, inclusive.
    pub fn start(&self) -> isize {
        self.start
    }

    /// Ending (highest) position, exclusive.
    pub fn end(&self) -> isize {
        self.end
    }

    pub fn length(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, pos: isize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// True when the two intervals share at least one position;
    /// intervals that merely touch do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Clip the interval to `limit`. The result may be empty.
    pub fn clip(&self, limit: &Interval) -> Interval {
        Interval::new(max(limit.start, self.start), min(limit.end, self.end))
    }

    /// Positions of `self` not covered by `other`: up to two non-empty
    /// fragments, left of and right of `other`.
    pub fn difference(&self, other: &Interval) -> impl Iterator<Item = Interval> {
        let (left, right) = if self.overlaps(other) {
            (
                Interval::new(self.start, other.start),
                Interval::new(other.end, self.end),
            )
        } else {
            (*self, Interval::empty_at(self.end))
        };
        iter::once(left)
            .chain(iter::once(right))
            .filter(|fragment| !fragment.is_empty())
    }

    /// Merge intervals into the minimal sorted sequence of disjoint,
    /// non-empty intervals covering the same positions. Touching
    /// intervals are coalesced.
    ///
    /// ```
    /// use cisreg::annot::interval::Interval;
    /// let merged = Interval::merge(vec![
    ///     Interval::new(9, 10),
    ///     Interval::new(1, 3),
    ///     Interval::new(10, 11),
    ///     Interval::new(2, 5),
    /// ]);
    /// assert_eq!(merged, vec![Interval::new(1, 5), Interval::new(9, 11)]);
    /// ```
    pub fn merge<I>(intervals: I) -> Vec<Interval>
    where
        I: IntoIterator<Item = Interval>,
    {
        let mut sorted: Vec<Interval> = intervals.into_iter().collect();
        sorted.sort();

        let mut merged = Vec::with_capacity(sorted.len());
        let mut rest = sorted.into_iter();
        let mut current = match rest.next() {
            Some(first) => first,
            None => return merged,
        };

        for interval in rest {
            if interval.is_empty() {
                continue;
            }
            if interval.start <= current.end {
                current.end = max(current.end, interval.end);
            } else {
                if !current.is_empty() {
                    merged.push(current);
                }
                current = interval;
            }
        }
        if !current.is_empty() {
            merged.push(current);
        }

        merged
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for Interval {
    type Err = ParseAnnotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref INTERVAL_RE: Regex = Regex::new(r"^(-?\d+)-(-?\d+)$").unwrap();
        }

        let cap = INTERVAL_RE
            .captures(s)
            .ok_or_else(|| ParseAnnotError::BadAnnot(s.to_owned()))?;

        let start = cap[1].parse::<isize>()?;
        let end = cap[2].parse::<isize>()?;

        if start <= end {
            Ok(Interval::new(start, end))
        } else {
            Err(ParseAnnotError::EndBeforeStart)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains() {
        assert!(Interval::new(1, 3).contains(1));
        assert!(Interval::new(1, 3).contains(2));
        assert!(!Interval::new(1, 3).contains(3));
        assert!(!Interval::new(1, 3).contains(0));
    }

    #[test]
    fn equality() {
        assert_eq!(Interval::new(1, 3), Interval::new(1, 3));
        assert_ne!(Interval::new(1, 2), Interval::new(1, 3));
        assert_ne!(Interval::new(2, 3), Interval::new(1, 3));
        assert_ne!(Interval::new(1, 3), Interval::new(4, 5));
    }

    #[test]
    fn emptiness() {
        assert!(Interval::new(1, 1).is_empty());
        assert!(Interval::new(2, 1).is_empty());
        assert!(!Interval::new(1, 2).is_empty());
        assert!(!Interval::new(1, 5).is_empty());
        for a in -3..4 {
            for b in -3..4 {
                assert_eq!(Interval::new(a, b).is_empty(), a >= b);
            }
        }
    }

    #[test]
    fn overlaps() {
        assert!(Interval::new(1, 3).overlaps(&Interval::new(2, 4)));
        assert!(Interval::new(1, 5).overlaps(&Interval::new(2, 4)));
        assert!(Interval::new(1, 5).overlaps(&Interval::new(1, 2)));
        assert!(Interval::new(1, 5).overlaps(&Interval::new(4, 5)));
        assert!(!Interval::new(1, 5).overlaps(&Interval::new(1, 1)));
        assert!(!Interval::new(1, 5).overlaps(&Interval::new(7, 7)));
        assert!(!Interval::new(1, 3).overlaps(&Interval::new(3, 5)));
    }

    #[test]
    fn ordering() {
        assert!(Interval::new(1, 2) < Interval::new(2, 5));
        assert!(Interval::new(1, 5) < Interval::new(1, 7));
        assert!(Interval::new(1, 5) <= Interval::new(1, 5));
        assert!(!(Interval::new(1, 5) < Interval::new(1, 5)));
    }

    #[test]
    fn merge() {
        let intervals = vec![
            Interval::new(1, 3),
            Interval::new(23, 23),
            Interval::new(2, 5),
            Interval::new(4, 7),
            Interval::new(9, 10),
            Interval::new(10, 11),
            Interval::new(13, 16),
            Interval::new(15, 17),
        ];
        let merged = Interval::merge(intervals.iter().rev().cloned());
        assert_eq!(
            merged,
            vec![
                Interval::new(1, 7),
                Interval::new(9, 11),
                Interval::new(13, 17)
            ]
        );
        assert_eq!(Interval::merge(intervals.clone()), merged);
        assert_eq!(Interval::merge(merged.clone()), merged);

        assert_eq!(
            Interval::merge(vec![Interval::new(1, 2)]),
            vec![Interval::new(1, 2)]
        );
        assert!(Interval::merge(Vec::new()).is_empty());
        assert!(Interval::merge(vec![Interval::new(4, 4)]).is_empty());
        assert_eq!(
            Interval::merge(vec![Interval::new(4, 4), Interval::new(6, 8)]),
            vec![Interval::new(6, 8)]
        );
    }

    #[test]
    fn difference() {
        let iv = Interval::new(10, 20);
        let frags: Vec<_> = iv.difference(&Interval::new(12, 15)).collect();
        assert_eq!(frags, vec![Interval::new(10, 12), Interval::new(15, 20)]);
        let frags: Vec<_> = iv.difference(&Interval::new(5, 15)).collect();
        assert_eq!(frags, vec![Interval::new(15, 20)]);
        let frags: Vec<_> = iv.difference(&Interval::new(5, 25)).collect();
        assert!(frags.is_empty());
        let frags: Vec<_> = iv.difference(&Interval::new(20, 25)).collect();
        assert_eq!(frags, vec![iv]);
    }

    #[test]
    fn clip_and_parse() {
        assert_eq!(
            Interval::new(10, 20).clip(&Interval::new(15, 30)),
            Interval::new(15, 20)
        );
        assert!(Interval::new(10, 20).clip(&Interval::new(25, 30)).is_empty());
        assert_eq!("-1-0".parse::<Interval>().unwrap(), Interval::new(-1, 0));
        assert_eq!(Interval::new(3, 8).to_string(), "3-8");
        assert!("8-3".parse::<Interval>().is_err());
        assert!("8..3".parse::<Interval>().is_err());
    }
}
