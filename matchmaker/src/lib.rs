//! Member matching and dashboard metrics over a structured-data backend
//! whose schema is not known up front.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod schema;
pub mod scoring;
pub mod services;
pub mod signals;
