//! Template-guided rescanning of known maps.
//!
//! XDF catalogs record where a map lived in some earlier firmware revision.
//! When a new image has drifted, the map body usually survives intact a short
//! distance from the recorded address. For each template the rescanner sweeps
//! a window around that address for a byte region that still satisfies a
//! cheap plausibility test at the template's dimensions, then rewrites the
//! address references inside the template's XDF fragment to the new location.
//!
//! Attribute extraction is regex-based. The catalog fragments are small and
//! uniform, so matching on the `EMBEDDEDDATA` tags directly is robust enough;
//! any template that fails to parse is skipped and never aborts the rescan.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::image::ByteImage;
use crate::stats;

/// Sweep window default, in bytes each side of the recorded address.
const SEARCH_RANGE_DEFAULT: usize = 4096;

/// Sweep step default, in bytes.
const STRIDE_DEFAULT: usize = 2;

/// Regions whose mean magnitude exceeds this are garbage such as pointer
/// tables, not calibration data.
const MEAN_MAGNITUDE_MAX: f64 = 1_000_000.0;

/// Signedness of a template's stored elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateDatatype {
    #[default]
    Unsigned,
    Signed,
}

impl TemplateDatatype {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateDatatype::Unsigned => "unsigned",
            TemplateDatatype::Signed => "signed",
        }
    }
}

/// A curated map definition harvested from a prior XDF.
///
/// Only `raw_xml` drives the rescan; the remaining fields are metadata for
/// downstream consumers. The catalog stores dimensions as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub title: Option<String>,
    /// Address recorded when the template was harvested.
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub rows: Option<String>,
    #[serde(default)]
    pub cols: Option<String>,
    #[serde(default)]
    pub element_size_bits: Option<u32>,
    #[serde(default)]
    pub datatype: Option<TemplateDatatype>,
    #[serde(default)]
    pub decimal_places: Option<u32>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub raw_xml: String,
}

/// One parsed `EMBEDDEDDATA` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedData {
    /// Recorded storage address.
    pub address: usize,
    pub rows: usize,
    pub cols: usize,
    /// Element width in bytes (1, 2, or 4).
    pub element_bytes: usize,
}

impl EmbeddedData {
    /// Size of the described storage region in bytes.
    pub fn bytes_needed(&self) -> usize {
        self.rows * self.cols * self.element_bytes
    }
}

/// Extract every `EMBEDDEDDATA` element from an XDF fragment.
///
/// Returns `None` when the fragment holds no element or any element is
/// malformed: missing attributes, an unparseable address, non-positive
/// dimensions, or an element width outside 8/16/32 bits.
pub fn parse_embedded_data(raw_xml: &str) -> Option<Vec<EmbeddedData>> {
    let tag_pattern = Regex::new(r"(?is)<EMBEDDEDDATA\b[^>]*>").ok()?;

    let mut elements = Vec::new();
    for tag in tag_pattern.find_iter(raw_xml) {
        let tag = tag.as_str();
        let address = parse_address(&attr_value(tag, &["mmedaddress"])?)?;
        let cols = parse_dimension(&attr_value(tag, &["colcount", "mmedcolcount"])?)?;
        let rows = parse_dimension(&attr_value(tag, &["rowcount", "mmedrowcount"])?)?;
        let bits = parse_dimension(&attr_value(tag, &["mmedelementsizebits", "mmedelementsize"])?)?;
        let element_bytes = match bits {
            8 => 1,
            16 => 2,
            32 => 4,
            _ => return None,
        };
        elements.push(EmbeddedData { address, rows, cols, element_bytes });
    }

    if elements.is_empty() {
        None
    } else {
        Some(elements)
    }
}

/// Find one attribute value in a tag, trying each accepted spelling in turn.
///
/// Attribute names match case-insensitively; values may be single- or
/// double-quoted.
fn attr_value(tag: &str, names: &[&str]) -> Option<String> {
    for name in names {
        let pattern =
            Regex::new(&format!(r#"(?i)\b{name}\s*=\s*(?:"([^"]*)"|'([^']*)')"#)).ok()?;
        if let Some(captures) = pattern.captures(tag) {
            let value = captures.get(1).or_else(|| captures.get(2))?;
            return Some(value.as_str().to_string());
        }
    }
    None
}

/// Parse a decimal or `0x`-prefixed hex address.
fn parse_address(text: &str) -> Option<usize> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

/// Parse a strictly positive integer dimension.
fn parse_dimension(text: &str) -> Option<usize> {
    text.trim().parse().ok().filter(|&value| value > 0)
}

/// Sweeps drifted templates back onto the image.
#[derive(Debug, Clone)]
pub struct TemplateRescanner {
    search_range: usize,
    stride: usize,
}

impl Default for TemplateRescanner {
    fn default() -> Self {
        Self::new(SEARCH_RANGE_DEFAULT, STRIDE_DEFAULT)
    }
}

/// A template relocated to a new offset.
#[derive(Debug, Clone)]
pub struct TemplateHit<'a> {
    pub template: &'a Template,
    pub new_offset: usize,
    /// The template's fragment with every address reference rewritten.
    pub rewritten_xml: String,
}

impl TemplateRescanner {
    pub fn new(search_range: usize, stride: usize) -> Self {
        Self { search_range, stride: stride.max(1) }
    }

    /// Sweep every template and return address-rewritten fragments keyed by
    /// the offset where the map was found. First hit wins per template.
    pub fn rescan(
        &self,
        image: &ByteImage,
        templates: &[Template],
        known_by_offset: &BTreeMap<usize, String>,
    ) -> BTreeMap<usize, String> {
        self.rescan_detailed(image, templates, known_by_offset)
            .into_iter()
            .map(|hit| (hit.new_offset, hit.rewritten_xml))
            .collect()
    }

    /// `rescan`, keeping the source template attached to each hit so callers
    /// can enrich matching candidates with its metadata.
    pub fn rescan_detailed<'a>(
        &self,
        image: &ByteImage,
        templates: &'a [Template],
        known_by_offset: &BTreeMap<usize, String>,
    ) -> Vec<TemplateHit<'a>> {
        let mut hits = Vec::new();

        for template in templates {
            let Some(elements) = parse_embedded_data(&template.raw_xml) else {
                continue;
            };
            let signed = template.datatype == Some(TemplateDatatype::Signed);

            for element in &elements {
                if let Some(hit) = self.sweep(image, template, element, signed, known_by_offset) {
                    hits.push(hit);
                    break;
                }
            }
        }

        hits
    }

    /// Sweep the window around one element's recorded address for the first
    /// plausible, unclaimed region of the right size.
    fn sweep<'a>(
        &self,
        image: &ByteImage,
        template: &'a Template,
        element: &EmbeddedData,
        signed: bool,
        known_by_offset: &BTreeMap<usize, String>,
    ) -> Option<TemplateHit<'a>> {
        let bytes_needed = element.bytes_needed();
        if bytes_needed == 0 || bytes_needed > image.size() {
            return None;
        }

        let low = element.address.saturating_sub(self.search_range);
        let high = element
            .address
            .saturating_add(self.search_range)
            .min(image.size() - bytes_needed);

        let mut offset = low;
        while offset <= high {
            if known_by_offset.contains_key(&offset)
                || overlaps_known(offset, bytes_needed, known_by_offset)
            {
                offset += self.stride;
                continue;
            }
            let Some(values) = read_elements(image, offset, element, signed) else {
                offset += self.stride;
                continue;
            };
            if is_plausible(&values) {
                let rewritten_xml =
                    rewrite_addresses(&template.raw_xml, element.address, offset)?;
                return Some(TemplateHit { template, new_offset: offset, rewritten_xml });
            }
            offset += self.stride;
        }

        None
    }
}

/// Decode the region at `offset` per the element's width and signedness.
fn read_elements(
    image: &ByteImage,
    offset: usize,
    element: &EmbeddedData,
    signed: bool,
) -> Option<Vec<i64>> {
    let count = element.rows * element.cols;
    let bytes = image.slice(offset, count * element.element_bytes).ok()?;

    let mut values = Vec::with_capacity(count);
    for chunk in bytes.chunks_exact(element.element_bytes) {
        let value = match (element.element_bytes, signed) {
            (1, false) => i64::from(chunk[0]),
            (1, true) => i64::from(chunk[0] as i8),
            (2, false) => i64::from(u16::from_le_bytes([chunk[0], chunk[1]])),
            (2, true) => i64::from(i16::from_le_bytes([chunk[0], chunk[1]])),
            (4, false) => i64::from(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
            (4, true) => i64::from(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
            _ => return None,
        };
        values.push(value);
    }
    Some(values)
}

/// Cheap structural test: the region must vary and keep a sane magnitude.
fn is_plausible(values: &[i64]) -> bool {
    if values.is_empty() {
        return false;
    }
    let reals: Vec<f64> = values.iter().map(|&value| value as f64).collect();
    let Some((min, max)) = stats::min_max(&reals) else {
        return false;
    };
    max - min > 0.0 && stats::mean(&reals).abs() <= MEAN_MAGNITUDE_MAX
}

/// True when `[offset, offset + len)` intersects any claimed region.
///
/// Claimed regions are measured with the current template's length; the true
/// length of a pinned region is not recorded in the input.
fn overlaps_known(offset: usize, len: usize, known_by_offset: &BTreeMap<usize, String>) -> bool {
    known_by_offset
        .keys()
        .any(|&known| offset < known + len && known < offset + len)
}

/// Rewrite every reference to `original` in the fragment so it points at
/// `new_offset`.
///
/// Hex references (with any zero padding) become zero-padded six-digit
/// uppercase hex; decimal references stay decimal. Word-bounded so dimension
/// attributes that merely contain the address digits are left alone.
fn rewrite_addresses(raw_xml: &str, original: usize, new_offset: usize) -> Option<String> {
    let hex_pattern = Regex::new(&format!(r"(?i)\b0x0*{original:X}\b")).ok()?;
    let rewritten = hex_pattern.replace_all(raw_xml, format!("0x{new_offset:06X}"));

    let decimal_pattern = Regex::new(&format!(r"\b{original}\b")).ok()?;
    Some(decimal_pattern.replace_all(&rewritten, new_offset.to_string()).into_owned())
}
