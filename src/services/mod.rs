//! Services layer - Business logic
//!
//! - `listing`: paginated, filtered, soft-delete aware list queries
//! - `records`: single-row reads and validated writes
//! - `serializer`: 64-bit integer safe JSON conversion
//! - `id_generator`: snowflake identifiers

pub mod id_generator;
pub mod listing;
pub mod records;
pub mod serializer;

pub use id_generator::{IdError, IdGenerator, IdPoll};
pub use listing::ListService;
pub use records::{RecordService, RecordServiceError};
pub use serializer::{serialize_bigint_as_number, serialize_bigint_safe, SerializeError};
