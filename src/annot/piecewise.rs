// Copyright 2017 Nicholas Ingolia
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Piece-wise region on a named sequence, e.g., the reverse strand of
//! chromosome V, 166,236 through 166,771 and 166,874 through 166,885.

use std::fmt::{self, Display, Formatter};
use std::ops::{Add, Index, Sub};
use std::slice::Iter;
use std::str::FromStr;

use regex::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::annot::interval::Interval;
use crate::annot::*;
use crate::genome::ChromSizes;
use crate::strand::ReqStrand;

/// Ordered set of disjoint intervals on one named sequence (e.g. a
/// chromosome), tagged with a strand.
///
/// The intervals are always kept in merge-normalized form: sorted from
/// the lowest to the highest coordinate regardless of strand, with
/// overlapping or touching intervals coalesced and empty intervals
/// dropped. The strand only decides which end of the location is 5'
/// (upstream) and which is 3' (downstream).
///
/// Every operation returns a new location. Union requires both
/// operands to lie on the same chromosome and strand; difference only
/// requires the same chromosome.
///
/// The display format for a `PieceWiseLocation` is
/// _chr:start_0-end_0;start_1-end_1;...;start_N-end_N(+/-)_.
///
/// ```
/// # use cisreg::annot::ParseAnnotError;
/// # fn try_main() -> Result<(), ParseAnnotError> {
/// use cisreg::annot::interval::Interval;
/// use cisreg::annot::piecewise::PieceWiseLocation;
/// use cisreg::strand::ReqStrand;
/// let znf354a = PieceWiseLocation::new(
///     "chr5".to_owned(),
///     ReqStrand::Reverse,
///     vec![Interval::new(178152376, 178152472), Interval::new(178138521, 178140622)],
/// );
/// assert_eq!(znf354a.to_string(), "chr5:178138521-178140622;178152376-178152472(-)");
/// assert_eq!(znf354a, znf354a.to_string().parse::<PieceWiseLocation>()?);
/// # Ok(())
/// # }
/// # fn main() { try_main().unwrap(); }
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PieceWiseLocation {
    refid: String,
    strand: ReqStrand,
    intervals: Vec<Interval>,
}

impl PieceWiseLocation {
    /// Construct a new location; `intervals` may be given in any order
    /// and may overlap.
    pub fn new<I>(refid: String, strand: ReqStrand, intervals: I) -> Self
    where
        I: IntoIterator<Item = Interval>,
    {
        PieceWiseLocation {
            refid,
            strand,
            intervals: Interval::merge(intervals),
        }
    }

    /// Construct a location covering the single interval `[start, end)`.
    pub fn singleton(refid: String, strand: ReqStrand, start: isize, end: isize) -> Self {
        Self::new(refid, strand, vec![Interval::new(start, end)])
    }

    /// Name of the reference sequence (chromosome name, etc.)
    pub fn refid(&self) -> &str {
        &self.refid
    }

    pub fn strand(&self) -> ReqStrand {
        self.strand
    }

    /// Normalized intervals, lowest coordinate first.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn iter(&self) -> Iter<Interval> {
        self.intervals.iter()
    }

    /// Number of disjoint intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn get(&self, index: usize) -> Option<&Interval> {
        self.intervals.get(index)
    }

    /// Empty when there are no intervals or every interval is empty.
    pub fn is_empty(&self) -> bool {
        self.intervals.iter().all(Interval::is_empty)
    }

    /// Bounding interval from the lowest start to the highest end.
    /// This is not necessarily covered contiguously.
    pub fn span(&self) -> Option<Interval> {
        match (self.intervals.first(), self.intervals.last()) {
            (Some(first), Some(last)) => Some(Interval::new(first.start(), last.end())),
            _ => None,
        }
    }

    /// Location made of the `index`-th interval alone.
    pub fn location(&self, index: usize) -> Option<Self> {
        self.intervals
            .get(index)
            .map(|interval| self.with_intervals(vec![*interval]))
    }

    /// True when any interval contains `pos`.
    pub fn contains(&self, pos: isize) -> bool {
        self.intervals.iter().any(|interval| interval.contains(pos))
    }

    /// Keep only the intervals containing `pos`.
    pub fn filter(&self, pos: isize) -> Self {
        self.with_intervals(
            self.intervals
                .iter()
                .filter(|interval| interval.contains(pos))
                .cloned()
                .collect(),
        )
    }

    /// Clip every interval to `limit`, dropping intervals that fall
    /// outside of it entirely.
    pub fn interval_limit(&self, limit: &Interval) -> Self {
        self.with_intervals(
            self.intervals
                .iter()
                .map(|interval| interval.clip(limit))
                .collect(),
        )
    }

    /// Set union of two locations on the same chromosome and strand.
    pub fn union(&self, other: &PieceWiseLocation) -> Result<Self, AnnotError> {
        if self.refid != other.refid || self.strand != other.strand {
            return Err(self.mismatch(other));
        }
        Ok(self.union_unchecked(other))
    }

    /// Positions of `self` not covered by `other`. The strand of
    /// `other` is ignored: coverage is removed on either strand.
    pub fn difference(&self, other: &PieceWiseLocation) -> Result<Self, AnnotError> {
        if self.refid != other.refid {
            return Err(self.mismatch(other));
        }
        Ok(self.difference_unchecked(other))
    }

    /// Extend the location by `bases` in the upstream direction on the
    /// annotated strand.
    ///
    /// The lowest interval is extended towards lower coordinates (never
    /// below 0) for forward-strand locations, while the highest interval
    /// is extended towards higher coordinates (never past the end of the
    /// chromosome) for reverse-strand locations. All other intervals are
    /// left alone.
    ///
    /// ```
    /// # use cisreg::annot::AnnotError;
    /// # fn try_main() -> Result<(), AnnotError> {
    /// use cisreg::annot::piecewise::PieceWiseLocation;
    /// use cisreg::genome::ChromSizes;
    /// use cisreg::strand::ReqStrand;
    /// let mut sizes = ChromSizes::new();
    /// sizes.insert("chr1".to_owned(), 500);
    /// let fwd = PieceWiseLocation::singleton("chr1".to_owned(), ReqStrand::Forward, 100, 200);
    /// assert_eq!(fwd.extend_upstream(175, &sizes)?.to_string(), "chr1:0-200(+)");
    /// let rev = PieceWiseLocation::singleton("chr1".to_owned(), ReqStrand::Reverse, 100, 200);
    /// assert_eq!(rev.extend_upstream(75, &sizes)?.to_string(), "chr1:100-275(-)");
    /// # Ok(())
    /// # }
    /// # fn main() { try_main().unwrap(); }
    /// ```
    pub fn extend_upstream(&self, bases: isize, sizes: &ChromSizes) -> Result<Self, AnnotError> {
        match self.strand {
            ReqStrand::Forward => self.extend_low(bases),
            ReqStrand::Reverse => self.extend_high(bases, sizes),
        }
    }

    /// Extend the location by `bases` in the downstream direction on
    /// the annotated strand; the mirror image of `extend_upstream`.
    pub fn extend_downstream(&self, bases: isize, sizes: &ChromSizes) -> Result<Self, AnnotError> {
        match self.strand {
            ReqStrand::Forward => self.extend_high(bases, sizes),
            ReqStrand::Reverse => self.extend_low(bases),
        }
    }

    fn extend_low(&self, bases: isize) -> Result<Self, AnnotError> {
        if bases <= 0 {
            return Err(AnnotError::NonPositiveExtension(bases));
        }
        let mut intervals = self.intervals.clone();
        if let Some(first) = intervals.first_mut() {
            *first = Interval::new(first.start().saturating_sub(bases).max(0), first.end());
        }
        Ok(self.with_intervals(intervals))
    }

    fn extend_high(&self, bases: isize, sizes: &ChromSizes) -> Result<Self, AnnotError> {
        if bases <= 0 {
            return Err(AnnotError::NonPositiveExtension(bases));
        }
        let mut intervals = self.intervals.clone();
        if let Some(last) = intervals.last_mut() {
            let length = sizes
                .get(&self.refid)
                .ok_or_else(|| AnnotError::UnknownChromosome(self.refid.clone()))?;
            *last = Interval::new(last.start(), last.end().saturating_add(bases).min(length));
        }
        Ok(self.with_intervals(intervals))
    }

    fn union_unchecked(&self, other: &PieceWiseLocation) -> Self {
        self.with_intervals(
            self.intervals
                .iter()
                .chain(other.intervals.iter())
                .cloned()
                .collect(),
        )
    }

    // Each interval is chipped down by every subtrahend in turn; the
    // surviving fragments make up the result.
    fn difference_unchecked(&self, other: &PieceWiseLocation) -> Self {
        let mut remaining = Vec::with_capacity(self.intervals.len());
        for interval in self.intervals.iter() {
            let mut fragments = vec![*interval];
            for subtrahend in other.intervals.iter() {
                fragments = fragments
                    .into_iter()
                    .flat_map(|fragment| fragment.difference(subtrahend))
                    .collect();
            }
            remaining.extend(fragments);
        }
        self.with_intervals(remaining)
    }

    fn with_intervals(&self, intervals: Vec<Interval>) -> Self {
        Self::new(self.refid.clone(), self.strand, intervals)
    }

    fn mismatch(&self, other: &PieceWiseLocation) -> AnnotError {
        AnnotError::Mismatch {
            left_refid: self.refid.clone(),
            left_strand: self.strand,
            right_refid: other.refid.clone(),
            right_strand: other.strand,
        }
    }
}

impl Index<usize> for PieceWiseLocation {
    type Output = Interval;

    fn index(&self, index: usize) -> &Interval {
        &self.intervals[index]
    }
}

impl<'a> IntoIterator for &'a PieceWiseLocation {
    type Item = &'a Interval;
    type IntoIter = Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

/// Set union. Both operands must lie on the same chromosome and strand;
/// use [`PieceWiseLocation::union`] to check this at runtime.
impl<'a> Add<&'a PieceWiseLocation> for PieceWiseLocation {
    type Output = PieceWiseLocation;

    fn add(self, other: &'a PieceWiseLocation) -> PieceWiseLocation {
        debug_assert!(
            self.refid == other.refid && self.strand == other.strand,
            "{}",
            self.mismatch(other)
        );
        self.union_unchecked(other)
    }
}

impl Add for PieceWiseLocation {
    type Output = PieceWiseLocation;

    fn add(self, other: PieceWiseLocation) -> PieceWiseLocation {
        self + &other
    }
}

/// Set difference. Both operands must lie on the same chromosome; use
/// [`PieceWiseLocation::difference`] to check this at runtime.
impl<'a> Sub<&'a PieceWiseLocation> for PieceWiseLocation {
    type Output = PieceWiseLocation;

    fn sub(self, other: &'a PieceWiseLocation) -> PieceWiseLocation {
        debug_assert!(self.refid == other.refid, "{}", self.mismatch(other));
        self.difference_unchecked(other)
    }
}

impl Sub for PieceWiseLocation {
    type Output = PieceWiseLocation;

    fn sub(self, other: PieceWiseLocation) -> PieceWiseLocation {
        self - &other
    }
}

impl Display for PieceWiseLocation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:", self.refid)?;

        let mut sep = false;
        for interval in self.intervals.iter() {
            write!(f, "{}{}", if sep { ";" } else { "" }, interval)?;
            sep = true;
        }
        write!(f, "{}", self.strand)
    }
}

impl FromStr for PieceWiseLocation {
    type Err = ParseAnnotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref LOCATION_RE: Regex =
                Regex::new(r"^(.*):((?:-?\d+--?\d+)(?:;-?\d+--?\d+)*)?(\([+-]\))$").unwrap();
        }

        let cap = LOCATION_RE
            .captures(s)
            .ok_or_else(|| ParseAnnotError::BadAnnot(s.to_owned()))?;

        let strand = cap[3].parse::<ReqStrand>()?;
        let mut intervals = Vec::new();
        if let Some(body) = cap.get(2) {
            for part in body.as_str().split(';') {
                intervals.push(part.parse::<Interval>()?);
            }
        }

        Ok(PieceWiseLocation::new(cap[1].to_owned(), strand, intervals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(strand: ReqStrand, intervals: &[(isize, isize)]) -> PieceWiseLocation {
        PieceWiseLocation::new(
            "chr1".to_owned(),
            strand,
            intervals.iter().map(|&(s, e)| Interval::new(s, e)),
        )
    }

    fn fwd(intervals: &[(isize, isize)]) -> PieceWiseLocation {
        loc(ReqStrand::Forward, intervals)
    }

    fn ivs(intervals: &[(isize, isize)]) -> Vec<Interval> {
        intervals.iter().map(|&(s, e)| Interval::new(s, e)).collect()
    }

    fn sizes() -> ChromSizes {
        let mut sizes = ChromSizes::new();
        sizes.insert("chr1".to_owned(), 500);
        sizes
    }

    #[test]
    fn span() {
        let location = fwd(&[(23, 67), (14, 24), (1, 4)]);
        assert_eq!(location.span(), Some(Interval::new(1, 67)));
        assert_eq!(location.len(), 2);
        assert_eq!(fwd(&[]).span(), None);
    }

    #[test]
    fn add() {
        let result = fwd(&[(1, 5), (10, 24), (78, 100)]) + fwd(&[(5, 6), (26, 30)]);
        assert_eq!(result.len(), 4);
        assert_eq!(result[0], Interval::new(1, 6));
        assert_eq!(result[1], Interval::new(10, 24));
        assert_eq!(result[2], Interval::new(26, 30));
        assert_eq!(result[3], Interval::new(78, 100));
    }

    #[test]
    fn sub() {
        let result = fwd(&[(1, 4), (10, 24), (78, 100)]) - fwd(&[(4, 5), (26, 30)]);
        assert_eq!(result.intervals(), ivs(&[(1, 4), (10, 24), (78, 100)]).as_slice());

        let result = fwd(&[(1, 8), (10, 24), (78, 100)]) - fwd(&[(4, 5), (26, 30)]);
        assert_eq!(
            result.intervals(),
            ivs(&[(1, 4), (5, 8), (10, 24), (78, 100)]).as_slice()
        );

        let result = fwd(&[(1, 6), (10, 24), (78, 100)]) - fwd(&[(4, 13), (21, 79)]);
        assert_eq!(result.intervals(), ivs(&[(1, 4), (13, 21), (79, 100)]).as_slice());

        let result = fwd(&[(10, 30)]) - fwd(&[(12, 14), (16, 18), (0, 11), (29, 40)]);
        assert_eq!(
            result.intervals(),
            ivs(&[(11, 12), (14, 16), (18, 29)]).as_slice()
        );
    }

    #[test]
    fn union_then_difference_restores() {
        let x = fwd(&[(1, 8), (20, 30), (50, 60)]);
        let y = fwd(&[(5, 22), (40, 45), (58, 70)]);
        let round_trip = (x.clone() + &y) - &y;
        assert_eq!(round_trip, x.clone() - &y);
        assert_eq!(round_trip.intervals(), ivs(&[(1, 5), (22, 30), (50, 58)]).as_slice());

        let disjoint = fwd(&[(100, 110)]);
        assert_eq!((x.clone() + &disjoint) - &disjoint, x);
    }

    #[test]
    fn checked_algebra() {
        let plus = fwd(&[(1, 10)]);
        let minus = loc(ReqStrand::Reverse, &[(5, 6)]);
        let other_chrom = PieceWiseLocation::singleton("chr2".to_owned(), ReqStrand::Forward, 1, 3);

        assert!(plus.union(&minus).is_err());
        assert!(plus.union(&other_chrom).is_err());
        assert!(plus.difference(&other_chrom).is_err());
        assert_eq!(
            plus.difference(&minus).unwrap().intervals(),
            ivs(&[(1, 5), (6, 10)]).as_slice()
        );
        assert_eq!(
            plus.union(&fwd(&[(10, 12)])).unwrap().intervals(),
            ivs(&[(1, 12)]).as_slice()
        );
    }

    #[test]
    fn emptiness() {
        assert!(fwd(&[]).is_empty());
        assert!(fwd(&[(5, 5)]).is_empty());
        assert!(fwd(&[(5, 5), (7, 3)]).is_empty());
        assert!(!fwd(&[(5, 5), (7, 9)]).is_empty());
        assert_eq!(fwd(&[(5, 5), (7, 9)]).len(), 1);
    }

    #[test]
    fn extend_upstream() {
        let result = fwd(&[(100, 200), (300, 400)]).extend_upstream(75, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(25, 200), (300, 400)]).as_slice());

        let result = fwd(&[(100, 200), (300, 400)]).extend_upstream(175, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(0, 200), (300, 400)]).as_slice());

        let rev = loc(ReqStrand::Reverse, &[(100, 200), (300, 400)]);
        let result = rev.extend_upstream(75, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(100, 200), (300, 475)]).as_slice());
        let result = rev.extend_upstream(175, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(100, 200), (300, 500)]).as_slice());

        let result = fwd(&[(100, 200)]).extend_upstream(175, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(0, 200)]).as_slice());
        let result = loc(ReqStrand::Reverse, &[(100, 200)])
            .extend_upstream(75, &sizes())
            .unwrap();
        assert_eq!(result.intervals(), ivs(&[(100, 275)]).as_slice());
    }

    #[test]
    fn extend_downstream() {
        let result = fwd(&[(100, 200), (300, 400)]).extend_downstream(150, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(100, 200), (300, 500)]).as_slice());

        let rev = loc(ReqStrand::Reverse, &[(100, 200), (300, 400)]);
        let result = rev.extend_downstream(75, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(25, 200), (300, 400)]).as_slice());

        let result = fwd(&[(100, 200), (300, 400)]).extend_downstream(isize::MAX, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(100, 200), (300, 500)]).as_slice());
        let result = rev.extend_downstream(isize::MAX, &sizes()).unwrap();
        assert_eq!(result.intervals(), ivs(&[(0, 200), (300, 400)]).as_slice());
    }

    #[test]
    fn extend_both_ways_widens() {
        for &strand in &[ReqStrand::Forward, ReqStrand::Reverse] {
            for &n in &[1, 50, 150, 450] {
                let widened = loc(strand, &[(100, 200)])
                    .extend_upstream(n, &sizes())
                    .and_then(|l| l.extend_downstream(n, &sizes()))
                    .unwrap();
                let expected = Interval::new((100 - n).max(0), (200 + n).min(500));
                assert_eq!(widened.intervals(), &[expected]);
            }
        }
    }

    #[test]
    fn extend_errors() {
        assert_eq!(
            fwd(&[(1, 2)]).extend_upstream(0, &sizes()),
            Err(AnnotError::NonPositiveExtension(0))
        );
        assert_eq!(
            fwd(&[(1, 2)]).extend_downstream(-4, &sizes()),
            Err(AnnotError::NonPositiveExtension(-4))
        );
        let unknown = PieceWiseLocation::singleton("chrUn".to_owned(), ReqStrand::Forward, 1, 2);
        assert_eq!(
            unknown.extend_downstream(10, &sizes()),
            Err(AnnotError::UnknownChromosome("chrUn".to_owned()))
        );
        assert_eq!(unknown.extend_upstream(10, &sizes()).unwrap()[0], Interval::new(0, 2));
        assert!(fwd(&[]).extend_downstream(10, &sizes()).unwrap().is_empty());
    }

    #[test]
    fn anchors_outside_chromosome_vanish() {
        let before_start = fwd(&[(-1, 0)]);
        assert!(!before_start.is_empty());
        assert!(before_start.extend_upstream(100, &sizes()).unwrap().is_empty());

        let past_end = loc(ReqStrand::Reverse, &[(500, 501)]);
        assert!(past_end.extend_upstream(100, &sizes()).unwrap().is_empty());
    }

    #[test]
    fn filter_and_limit() {
        let location = fwd(&[(1, 5), (10, 24), (78, 100)]);
        assert_eq!(location.filter(12).intervals(), ivs(&[(10, 24)]).as_slice());
        assert!(location.filter(6).is_empty());
        assert!(location.contains(78));
        assert!(!location.contains(100));

        let limited = location.interval_limit(&Interval::new(3, 80));
        assert_eq!(limited.intervals(), ivs(&[(3, 5), (10, 24), (78, 80)]).as_slice());
        assert!(location.interval_limit(&Interval::new(30, 40)).is_empty());
        assert_eq!(location.location(1).unwrap().intervals(), ivs(&[(10, 24)]).as_slice());
        assert!(location.location(3).is_none());
    }

    #[test]
    fn display_and_parse() {
        let location = loc(ReqStrand::Reverse, &[(10, 24), (1, 5)]);
        assert_eq!(location.to_string(), "chr1:1-5;10-24(-)");
        assert_eq!("chr1:1-5;10-24(-)".parse::<PieceWiseLocation>().unwrap(), location);

        let empty = fwd(&[]);
        assert_eq!(empty.to_string(), "chr1:(+)");
        assert_eq!("chr1:(+)".parse::<PieceWiseLocation>().unwrap(), empty);

        assert!("chr1:1-5".parse::<PieceWiseLocation>().is_err());
        assert!("chr1:5-1(+)".parse::<PieceWiseLocation>().is_err());
    }
}
