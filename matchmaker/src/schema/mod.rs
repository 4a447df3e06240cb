//! Schema-adaptive query building.
//!
//! Collections drift between deployments: the same concept lives under
//! different column names, or the column is missing altogether. The detector
//! samples one row per collection to learn which columns exist, and the
//! builder maps each [`QueryIntent`] onto the first candidate column present.

mod builder;
mod detector;
mod intent;

pub use builder::{Adapted, BuiltQuery, QueryBuilder, QueryPlan};
pub use detector::{
    CollectionStatus, SchemaDetector, SchemaDescriptor, DetectedSchema, SchemaReportEntry,
};
pub use intent::QueryIntent;
