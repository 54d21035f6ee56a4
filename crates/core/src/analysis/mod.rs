//! Candidate qualification: axis sniffing and coarse classification.

pub mod axes;
pub mod classify;

pub use axes::{is_monotonic, sniff_axes};
pub use classify::classify;
