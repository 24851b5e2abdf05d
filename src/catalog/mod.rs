//! Offer catalog
//!
//! Packs, add-on options and the prospect problem/goal lists. Everything
//! here is immutable reference data, looked up by id.

mod options;
mod packs;
mod problems;

pub use options::*;
pub use packs::*;
pub use problems::*;
