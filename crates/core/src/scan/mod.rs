//! Brute-force enumeration of candidate tables.
//!
//! The scanner slides over every byte offset of the image and, at each, tries
//! every column count from 2 up to the configured maximum. A `(offset, cols)`
//! pair is accepted when every adjacent pair of its first `min_rows` rows
//! correlates strongly; accepted pairs get an axis sniff and a coarse
//! classification and become `DetectedMap` candidates.
//!
//! Work is partitioned into per-worker byte ranges. Each non-final worker
//! scans a bounded overlap past its cut so a candidate whose start sits just
//! before the cut is still examined; the redundancy this creates is removed
//! by the key-based deduplication after the fan-in barrier.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::analysis::{classify, sniff_axes};
use crate::hints::DisassemblerHints;
use crate::image::ByteImage;
use crate::model::{dedupe_maps, DetectedMap, ELEMENT_SIZE};
use crate::stats;

/// Acceptance threshold on |Pearson| between adjacent rows.
const ROW_CORRELATION_MIN: f64 = 0.85;

/// Growth threshold: appended rows must stay this correlated.
const GROW_CORRELATION_MIN: f64 = 0.7;

/// Score credit per row appended past `min_rows`.
const GROW_SCORE_STEP: f64 = 0.1;

/// Upper bound on the per-worker overlap in bytes.
const OVERLAP_MAX: usize = 4096;

/// Offset-visits between progress reports.
const PROGRESS_INTERVAL: usize = 10_000;

/// Label every brute-scan candidate starts with.
const CANDIDATE_NAME: &str = "AutoDetect";

/// Tuning knobs for one scan run.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Row count every candidate is tested (and emitted) with.
    pub min_rows: usize,
    /// Largest column count tried at each offset.
    pub max_cols: usize,
    /// Worker count; `None` means one per CPU core.
    pub workers: Option<usize>,
    /// Grow accepted candidates past `min_rows` while rows stay correlated.
    pub grow_rows: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { min_rows: 3, max_cols: 128, workers: None, grow_rows: false }
    }
}

/// Observer for advisory progress reports.
///
/// Called from worker threads; implementations must not gate correctness on
/// the counter values they see.
pub trait ScanProgress: Sync {
    fn on_progress(&self, scanned: usize, limit: usize);
}

/// Byte range of start offsets owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerRange {
    pub start: usize,
    /// Exclusive end, including any overlap past the cut.
    pub end: usize,
}

/// Partition `[0, limit)` into `workers` ranges of start offsets.
///
/// Every non-final range extends `overlap` bytes past its cut; the final
/// range always ends at `limit`. Ranges that would be empty are dropped, so
/// the result may hold fewer entries than `workers`.
pub fn partition(limit: usize, workers: usize, overlap: usize) -> Vec<WorkerRange> {
    let workers = workers.max(1);
    let chunk = (limit / workers).max(1);

    let mut ranges = Vec::with_capacity(workers);
    for index in 0..workers {
        let start = index * chunk;
        let end = if index == workers - 1 {
            limit
        } else {
            (start + chunk + overlap).min(limit)
        };
        if end > start {
            ranges.push(WorkerRange { start, end });
        }
    }
    ranges
}

/// Scan the image for candidate maps.
///
/// Always returns (a possibly empty) result; errors inside the hot loop are
/// recovered locally by skipping the offending offset.
pub fn scan(
    image: &ByteImage,
    options: &ScanOptions,
    hints: Option<&DisassemblerHints>,
) -> Vec<DetectedMap> {
    scan_with_progress(image, options, hints, None)
}

/// `scan` with an optional progress observer.
pub fn scan_with_progress(
    image: &ByteImage,
    options: &ScanOptions,
    hints: Option<&DisassemblerHints>,
    progress: Option<&dyn ScanProgress>,
) -> Vec<DetectedMap> {
    let options = ScanOptions { min_rows: options.min_rows.max(1), ..options.clone() };
    let options = &options;

    let size = image.size();
    if size <= ELEMENT_SIZE * options.min_rows {
        return Vec::new();
    }
    let limit = size - ELEMENT_SIZE * options.min_rows;
    if limit == 0 {
        return Vec::new();
    }

    let workers = options.workers.unwrap_or_else(default_worker_count).max(1);
    let overlap = (options.max_cols * options.min_rows * ELEMENT_SIZE).min(OVERLAP_MAX);
    let ranges = partition(limit, workers, overlap);

    let scanned = AtomicUsize::new(0);
    let run = || {
        ranges
            .par_iter()
            .map(|range| scan_range(image, options, hints, *range, limit, &scanned, progress))
            .collect::<Vec<_>>()
    };

    // A dedicated pool sized to the requested worker count; if the pool
    // cannot be built, fall back to the global one.
    let batches = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(run),
        Err(_) => run(),
    };

    dedupe_maps(batches.into_iter().flatten().collect())
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Scan one worker's range of start offsets into a local result list.
fn scan_range(
    image: &ByteImage,
    options: &ScanOptions,
    hints: Option<&DisassemblerHints>,
    range: WorkerRange,
    limit: usize,
    scanned: &AtomicUsize,
    progress: Option<&dyn ScanProgress>,
) -> Vec<DetectedMap> {
    let mut local = Vec::new();

    for offset in range.start..range.end {
        for cols in 2..=options.max_cols {
            let body = cols * options.min_rows * ELEMENT_SIZE;
            if offset + body > image.size() {
                // No larger cols will fit either.
                break;
            }
            let Ok(raw) = image.read_u16_le_array(offset, cols * options.min_rows) else {
                continue;
            };
            let reals: Vec<f64> = raw.iter().map(|&value| f64::from(value)).collect();
            if !rows_correlate(&reals, options.min_rows, cols) {
                continue;
            }
            local.push(build_candidate(image, options, hints, offset, cols, raw));
        }

        let visited = scanned.fetch_add(1, Ordering::Relaxed) + 1;
        if visited % PROGRESS_INTERVAL == 0 {
            if let Some(progress) = progress {
                progress.on_progress(visited, limit);
            }
        }
    }

    local
}

/// True when every adjacent row pair correlates at |Pearson| >= 0.85.
fn rows_correlate(values: &[f64], rows: usize, cols: usize) -> bool {
    for row in 0..rows.saturating_sub(1) {
        let a = &values[row * cols..(row + 1) * cols];
        let b = &values[(row + 1) * cols..(row + 2) * cols];
        if stats::pearson(a, b).abs() < ROW_CORRELATION_MIN {
            return false;
        }
    }
    true
}

/// Assemble a candidate for an accepted `(offset, cols)` pair.
fn build_candidate(
    image: &ByteImage,
    options: &ScanOptions,
    hints: Option<&DisassemblerHints>,
    offset: usize,
    cols: usize,
    raw: Vec<u16>,
) -> DetectedMap {
    let mut rows = options.min_rows;
    let mut values = raw;
    let mut score = 1.0;

    if options.grow_rows {
        loop {
            let next_offset = offset + rows * cols * ELEMENT_SIZE;
            let Ok(next) = image.read_u16_le_array(next_offset, cols) else {
                break;
            };
            let last: Vec<f64> =
                values[(rows - 1) * cols..].iter().map(|&value| f64::from(value)).collect();
            let grown: Vec<f64> = next.iter().map(|&value| f64::from(value)).collect();
            if stats::pearson(&last, &grown).abs() < GROW_CORRELATION_MIN {
                break;
            }
            values.extend(next);
            rows += 1;
            score += GROW_SCORE_STEP;
        }
    }

    let (axis_x, axis_y) = sniff_axes(image, offset, rows, cols);
    let map_type = classify(&values, axis_x.as_deref(), hints, offset);

    let mut map = DetectedMap::new(CANDIDATE_NAME, offset, rows, cols, values);
    map.axis_x = axis_x;
    map.axis_y = axis_y;
    map.score = score;
    map.map_type = map_type;
    map
}
