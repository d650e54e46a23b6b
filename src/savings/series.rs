use super::SavingsTotal;
use crate::data::{DeviceId, DeviceSavingRecord};
use crate::segmentation::{TimeChunk, locate_chunk};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Records of `device_id` whose timestamp lies in `[start, end]`, in input order.
pub fn filter_records(
    records: &[DeviceSavingRecord],
    device_id: DeviceId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<DeviceSavingRecord> {
    records
        .iter()
        .filter(|r| r.device_id == device_id && start <= r.timestamp && r.timestamp <= end)
        .cloned()
        .collect()
}

/// Sum carbon and fuel over any set of records. An empty set sums to zero.
pub fn sum_records<'a>(records: impl IntoIterator<Item = &'a DeviceSavingRecord>) -> SavingsTotal {
    records
        .into_iter()
        .fold(SavingsTotal::default(), |acc, record| SavingsTotal {
            total_carbon: acc.total_carbon + record.carbon_saved,
            total_diesel: acc.total_diesel + record.fuel_saved,
        })
}

/// Totals for one chunk of a segmented range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkTotal {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub carbon: f64,
    pub diesel: f64,
    pub count: usize,
}

impl From<TimeChunk> for ChunkTotal {
    fn from(chunk: TimeChunk) -> Self {
        Self {
            start: chunk.start,
            end: chunk.end,
            carbon: 0.0,
            diesel: 0.0,
            count: 0,
        }
    }
}

/// Assign each record to the chunk owning its timestamp and total per chunk.
///
/// `chunks` must be ordered and contiguous, as returned by
/// [`crate::segmentation::segment`]. A timestamp between a chunk's
/// millisecond end and the next chunk's start belongs to the earlier chunk.
/// Records outside the segmented range are ignored. The result has one entry
/// per chunk, including empty ones.
pub fn bucket_by_chunks(records: &[DeviceSavingRecord], chunks: &[TimeChunk]) -> Vec<ChunkTotal> {
    let mut totals: Vec<ChunkTotal> = chunks.iter().copied().map(ChunkTotal::from).collect();

    for record in records {
        let Some(index) = locate_chunk(chunks, record.timestamp) else {
            continue;
        };
        let bucket = &mut totals[index];
        bucket.carbon += record.carbon_saved;
        bucket.diesel += record.fuel_saved;
        bucket.count += 1;
    }

    totals
}
