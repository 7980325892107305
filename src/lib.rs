//! scalar-index - order-preserving scalar range index for filtered vector search
//!
//! Numeric and text fields of a document table are indexed into a sorted
//! key-value store so that range, term-list and negation filters reduce to
//! ordered scans. Search results are document-id sets with a polarity flag,
//! ready to be combined with vector similarity results by the caller.

pub mod cli;
pub mod config;
pub mod index;
pub mod storage;
pub mod table;

pub use config::{ConfigError, IndexConfig};
pub use index::{
    DataType, FilterInfo, FilterOperator, IndexError, IndexResult, MultiFieldRangeIndex,
    MultiRangeQueryResults, RangeQueryResult, SearchOutcome,
};
pub use storage::{LogStorage, MemoryStorage, StorageManager};
pub use table::{DocId, FieldId, MemoryTable, Table};
