//! Calendar-aligned range segmentation
//!
//! Splits a `[start, end]` interval into an ordered sequence of chunks whose
//! interior boundaries sit on UTC day, week (Monday-Sunday) or month
//! boundaries. The first chunk starts exactly at `start` and the last chunk
//! ends exactly at `end`; everything in between is a full calendar unit.

pub mod resolution;

pub use resolution::{ParseResolutionError, Resolution};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Segmentation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("Range would produce {chunks} chunks, more than the limit of {max}")]
    TooManyChunks { chunks: u64, max: u64 },
    #[error("No calendar unit follows {0}")]
    OutOfRange(DateTime<Utc>),
}

/// A contiguous sub-interval of a segmented range. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeChunk {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeChunk {
    /// Whether `instant` lies within `[start, end]`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Number of chunks [`segment`] produces for `[start, end]`, without
/// building them.
pub fn chunk_count(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    resolution: Resolution,
) -> Result<u64, SegmentError> {
    if start > end {
        return Err(SegmentError::InvalidRange { start, end });
    }
    Ok((resolution.unit_index(end) - resolution.unit_index(start)) as u64 + 1)
}

/// Split `[start, end]` into calendar-aligned chunks at the given resolution.
///
/// A range contained in a single unit comes back verbatim as one chunk.
/// Otherwise the result is a clipped first chunk, zero or more full units and
/// a clipped last chunk.
pub fn segment(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    resolution: Resolution,
) -> Result<Vec<TimeChunk>, SegmentError> {
    if start > end {
        return Err(SegmentError::InvalidRange { start, end });
    }

    if resolution.same_unit(start, end) {
        return Ok(vec![TimeChunk { start, end }]);
    }

    let last_unit_start = resolution.start_of_unit(end);
    let unit_end = |at: DateTime<Utc>| {
        resolution
            .end_of_unit(at)
            .ok_or(SegmentError::OutOfRange(at))
    };
    let next_start = |at: DateTime<Utc>| {
        resolution
            .next_unit_start(at)
            .ok_or(SegmentError::OutOfRange(at))
    };

    let mut chunks = vec![TimeChunk {
        start,
        end: unit_end(start)?,
    }];

    let mut unit_start = next_start(start)?;
    while unit_start < last_unit_start {
        chunks.push(TimeChunk {
            start: unit_start,
            end: unit_end(unit_start)?,
        });
        unit_start = next_start(unit_start)?;
    }

    chunks.push(TimeChunk {
        start: last_unit_start,
        end,
    });

    Ok(chunks)
}

/// [`segment`], refusing ranges that would yield more than `max_chunks` chunks
pub fn segment_with_limit(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    resolution: Resolution,
    max_chunks: u64,
) -> Result<Vec<TimeChunk>, SegmentError> {
    let chunks = chunk_count(start, end, resolution)?;
    if chunks > max_chunks {
        return Err(SegmentError::TooManyChunks {
            chunks,
            max: max_chunks,
        });
    }
    segment(start, end, resolution)
}

/// Index of the chunk owning `instant` in a [`segment`] result.
///
/// Chunk ends are millisecond-precise while instants may carry finer
/// fractions, so ownership runs from one chunk's start up to the next
/// chunk's start.
pub fn locate_chunk(chunks: &[TimeChunk], instant: DateTime<Utc>) -> Option<usize> {
    let last = chunks.last()?;
    if instant > last.end {
        return None;
    }
    chunks
        .partition_point(|chunk| chunk.start <= instant)
        .checked_sub(1)
}
