//! Data models for the webtoon client.
//!
//! Catalog records are converted into these shapes by the catalog adapter; remote
//! store rows are converted into the relation records through serde.

mod chapter;
mod filter;
mod relations;
mod work;

pub use chapter::*;
pub use filter::*;
pub use relations::*;
pub use work::*;

#[cfg(test)]
pub(crate) use work::sample_summary;
