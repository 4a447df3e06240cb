pub mod admin;
pub(crate) mod health;
pub mod matches;
pub mod metrics;

pub use health::health_check;
