//! Axis sniffing around accepted candidates.
//!
//! Calibration tables conventionally store the X-axis breakpoints immediately
//! after the table body and the Y-axis breakpoints immediately before it.
//! Monotonicity is the only structural invariant a breakpoint vector must
//! satisfy, so that is the whole test: probe the conventional locations and
//! take the first monotonic vector per axis.

use crate::image::ByteImage;

/// True when adjacent elements never decrease, or never increase.
///
/// Runs of equal values count toward both directions; vectors shorter than
/// two elements are vacuously monotonic.
pub fn is_monotonic(values: &[f64]) -> bool {
    if values.len() < 2 {
        return true;
    }
    let pairs = values.len() - 1;
    let mut non_decreasing = 0;
    let mut non_increasing = 0;
    for window in values.windows(2) {
        if window[1] >= window[0] {
            non_decreasing += 1;
        }
        if window[1] <= window[0] {
            non_increasing += 1;
        }
    }
    non_decreasing >= pairs || non_increasing >= pairs
}

/// Probe the conventional axis locations for a candidate at `offset` with
/// the given dimensions.
///
/// Each axis is independently optional: an out-of-bounds trial is simply no
/// hit, and the first monotonic vector per axis wins.
pub fn sniff_axes(
    image: &ByteImage,
    offset: usize,
    rows: usize,
    cols: usize,
) -> (Option<Vec<f64>>, Option<Vec<f64>>) {
    let body = rows * cols * crate::model::ELEMENT_SIZE;

    let x_trials = [offset + body, offset + body + cols * 2];
    let axis_x = x_trials
        .iter()
        .find_map(|&trial| read_axis(image, trial, cols).filter(|axis| is_monotonic(axis)));

    // The primary Y trial clamps stepwise at zero, which lands on odd offsets
    // for small candidates. Known weak heuristic; the secondary trial is the
    // conventional location.
    let before = offset.saturating_sub(rows * 2);
    let y_trials = [before.saturating_sub(rows * 2), before];
    let axis_y = y_trials
        .iter()
        .find_map(|&trial| read_axis(image, trial, rows).filter(|axis| is_monotonic(axis)));

    (axis_x, axis_y)
}

/// Decode a would-be axis vector: `length` u16 values mapped to reals.
fn read_axis(image: &ByteImage, offset: usize, length: usize) -> Option<Vec<f64>> {
    let raw = image.read_u16_le_array(offset, length).ok()?;
    Some(raw.into_iter().map(f64::from).collect())
}
