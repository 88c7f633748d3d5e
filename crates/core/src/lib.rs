// crates/core/src/lib.rs
pub mod extractor;
pub mod media;
pub mod policy;
pub mod scan;

pub use extractor::*;
pub use media::*;
pub use policy::*;
pub use scan::*;
