//! Query regions: 1-based, inclusive chromosomal intervals.

use std::fmt;

use crate::error::Error;

/// A chromosomal interval used as a query target.
///
/// Coordinates are 1-based and inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicRegion {
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
}

impl GenomicRegion {
    pub fn new(chromosome: impl Into<String>, start: i32, end: i32) -> Result<Self, Error> {
        if start > end {
            return Err(Error::Validation(format!(
                "region start {start} is after end {end}"
            )));
        }
        Ok(Self {
            chromosome: chromosome.into(),
            start,
            end,
        })
    }

    /// Midpoint of the interval, rounded toward the start.
    #[must_use]
    pub fn midpoint(&self) -> i32 {
        ((i64::from(self.start) + i64::from(self.end)) / 2) as i32
    }

    /// Number of overlapping base pairs with `[start, end]`.
    ///
    /// Zero or negative when the intervals are disjoint.
    #[must_use]
    pub fn overlap_bp(&self, start: i32, end: i32) -> i32 {
        self.end.min(end) - self.start.max(start) + 1
    }

    /// Distance from this region's midpoint to the span `[start, end]`.
    ///
    /// Zero when the midpoint falls inside the span, otherwise the gap to
    /// the nearest span boundary.
    #[must_use]
    pub fn distance_to_span(&self, start: i32, end: i32) -> u32 {
        let mid = self.midpoint();
        if mid < start {
            start.abs_diff(mid)
        } else if mid > end {
            mid.abs_diff(end)
        } else {
            0
        }
    }
}

impl fmt::Display for GenomicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}
