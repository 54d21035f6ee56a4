pub mod export;
pub mod scan;

pub use export::*;
pub use scan::*;
