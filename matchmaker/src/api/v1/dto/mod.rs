//! v1 API Data Transfer Objects.
//!
//! These types define the wire format for the v1 REST API. They are separate
//! from the domain models in `src/models/` and convert from them.

pub mod admin;
pub mod matches;
pub mod metrics;

pub use admin::*;
pub use matches::*;
pub use metrics::*;
