//! Scalar range index
//!
//! Secondary index over the numeric and text fields of a document table. Each
//! registered field owns one namespace of the shared sorted store; rows are
//! keyed so that plain byte order equals value order, which turns range and
//! term filters into seek-and-scan.
//!
//! # Design Principles
//!
//! - Derived state: the table is the source of truth for values
//! - One row per (value, document); text fields one row per token
//! - Results carry polarity so negation never materializes all ids
//!
//! # Invariants
//!
//! - A row's value equals the document id suffix of its key
//! - `delete` builds exactly the keys `add_doc` built for the same value
//! - Every filter field is checked before any scan starts

mod codec;
mod errors;
mod field;
mod filter;
mod manager;
mod result;

pub use codec::{
    parse_doc_id, prefix_key, range_end_key, row_key, row_keys, row_value, tokens, KEY_SEPARATOR,
};
pub use errors::{display_key, IndexError, IndexResult};
pub use field::{DataType, FieldDescriptor, ValueCategory, DEFAULT_DELIMITER};
pub use filter::{FilterInfo, FilterOperator};
pub use manager::{FieldStats, MultiFieldRangeIndex, SearchOutcome};
pub use result::{MultiRangeQueryResults, RangeQueryResult};
