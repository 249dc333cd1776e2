//! Set-algebra engine over posting containers
//!
//! Conjunction (AND), exclusion (NOT) and their multi-way forms, with
//! the per-pair algorithm chosen by a step-count cost model.

mod cost;
mod exclude;
mod join;

pub use cost::*;
pub use exclude::*;
pub use join::*;
