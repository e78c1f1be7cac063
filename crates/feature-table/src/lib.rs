//! Feature Tables and Sample Metadata
//!
//! Tab-separated I/O for sample-by-feature tables and the metadata that
//! carries per-sample ages, plus the id filtering used to join the two.

mod error;
mod metadata;
mod table;

pub use error::TableError;
pub use metadata::{parse_metadata, read_metadata, NumericColumn, SampleMetadata};
pub use table::{
    format_feature_table, parse_feature_table, read_feature_table, write_feature_table,
    Orientation,
};
