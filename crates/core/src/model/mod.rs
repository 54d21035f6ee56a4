//! Core data model for detected calibration maps.
//!
//! `DetectedMap` is the candidate record every producer emits and every
//! consumer (CLI, XDF export, viewers) reads. Equality between candidates is
//! defined by `MapKey`; the identifier is assigned fresh at construction and
//! carries no meaning beyond reference identity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bytes per table element in the brute-scan path (little-endian u16).
pub const ELEMENT_SIZE: usize = 2;

/// Coarse physical interpretation of a detected map.
///
/// Assigned heuristically; downstream tooling may override it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    #[default]
    Unknown,
    Fuel,
    Ignition,
    Boost,
    Maf,
    Injector,
}

/// A candidate calibration table located in the image.
///
/// Inside the detector this is an immutable snapshot; only `name` and
/// `accepted` are user-owned and may be mutated downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedMap {
    /// Fresh unique identifier assigned at creation.
    pub id: Uuid,
    /// Human-visible label, initialized by the producer.
    pub name: String,
    /// Byte offset of element [0, 0] in the image.
    pub offset: usize,
    pub rows: usize,
    pub cols: usize,
    /// Bytes per element; fixed at 2 for brute-scan candidates.
    pub element_size: usize,
    /// Row-major flattened elements, `rows * cols` long.
    pub values: Vec<u16>,
    /// X-axis breakpoints (`cols` long) when the sniffer found them.
    pub axis_x: Option<Vec<f64>>,
    /// Y-axis breakpoints (`rows` long) when the sniffer found them.
    pub axis_y: Option<Vec<f64>>,
    /// Plausibility score; higher is more plausible.
    pub score: f64,
    #[serde(rename = "type")]
    pub map_type: MapType,
    /// User acceptance flag; never set by the detector.
    pub accepted: bool,
    /// Element datatype from an attached template.
    pub datatype: Option<String>,
    /// Display precision from an attached template.
    pub decimal_places: Option<u32>,
    /// Engineering units from an attached template.
    pub units: Option<String>,
    /// The address-rewritten XDF fragment of an attached template.
    pub raw_embedded_xml: Option<String>,
}

impl DetectedMap {
    /// Construct a candidate with a fresh id and default detector fields.
    pub fn new(
        name: impl Into<String>,
        offset: usize,
        rows: usize,
        cols: usize,
        values: Vec<u16>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            offset,
            rows,
            cols,
            element_size: ELEMENT_SIZE,
            values,
            axis_x: None,
            axis_y: None,
            score: 1.0,
            map_type: MapType::Unknown,
            accepted: false,
            datatype: None,
            decimal_places: None,
            units: None,
            raw_embedded_xml: None,
        }
    }

    /// The deduplication key for this candidate.
    pub fn key(&self) -> MapKey {
        MapKey { offset: self.offset, rows: self.rows, cols: self.cols }
    }

    /// Size of the table body in bytes.
    pub fn body_len(&self) -> usize {
        self.rows * self.cols * self.element_size
    }
}

/// Deduplication key: two candidates with the same key are the same
/// detection regardless of their identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapKey {
    pub offset: usize,
    pub rows: usize,
    pub cols: usize,
}

/// Drop duplicate detections, keeping the first candidate seen for each key.
///
/// Order-stable: survivors keep their relative positions.
pub fn dedupe_maps(maps: Vec<DetectedMap>) -> Vec<DetectedMap> {
    let mut seen = HashSet::new();
    maps.into_iter().filter(|map| seen.insert(map.key())).collect()
}

/// Canonical output ordering: score descending, then offset, rows, and cols
/// ascending so equal-scored candidates serialize deterministically.
pub fn sort_for_output(maps: &mut [DetectedMap]) {
    maps.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.offset.cmp(&b.offset))
            .then(a.rows.cmp(&b.rows))
            .then(a.cols.cmp(&b.cols))
    });
}
