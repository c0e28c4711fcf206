//! Type-directed, batched, transactional loading into the destination table.

pub mod batch;
pub mod coerce;

pub use batch::{DEFAULT_BATCH_SIZE, LoadOptions, LoadStats, insert_data, insert_sql};
pub use coerce::{CoercionError, coerce_text, parse_timestamp};
