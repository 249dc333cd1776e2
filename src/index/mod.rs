//! Inverted-index posting container
//!
//! - `RowSchema`: fixed-width binary row layout with a total key order
//! - `ReferenceEntry`: one posting, encoded as one row
//! - `ReferenceContainer`: sorted unique row store for one term

mod container;
mod entry;
mod schema;

pub use container::*;
pub use entry::*;
pub use schema::*;
