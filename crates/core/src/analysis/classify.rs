//! Rule-based map classification.
//!
//! The rules are deliberately coarse: value statistics first, then the axis
//! range, then disassembler hints as a negative signal. First match wins, and
//! downstream tooling is free to override the label.

use crate::hints::DisassemblerHints;
use crate::model::MapType;
use crate::stats;

/// Values above this only occur in ignition-timing encodings.
const IGNITION_MAX: f64 = 15_000.0;

/// Fueling maps sit low: small mean, bounded peak.
const FUEL_MEAN: f64 = 50.0;
const FUEL_MAX: f64 = 3_000.0;

/// MAF breakpoint tables start well above idle airflow.
const MAF_AXIS_START: f64 = 1_000.0;

/// Classify a candidate from its values, optional axes, and optional
/// disassembler hints. Pure: the same inputs always yield the same label.
pub fn classify(
    values: &[u16],
    axis_x: Option<&[f64]>,
    hints: Option<&DisassemblerHints>,
    offset: usize,
) -> MapType {
    if values.is_empty() {
        return MapType::Unknown;
    }
    let reals: Vec<f64> = values.iter().map(|&value| f64::from(value)).collect();
    let Some((_, max)) = stats::min_max(&reals) else {
        return MapType::Unknown;
    };

    if max > IGNITION_MAX {
        return MapType::Ignition;
    }
    if stats::mean(&reals) < FUEL_MEAN && max < FUEL_MAX {
        return MapType::Fuel;
    }
    if axis_x.is_some_and(|axis| axis.first().is_some_and(|&first| first > MAF_AXIS_START)) {
        return MapType::Maf;
    }
    if hints.is_some_and(|hints| hints.covers_offset(offset)) {
        // Code- or label-adjacent: refuse to guess.
        return MapType::Unknown;
    }

    MapType::Unknown
}
