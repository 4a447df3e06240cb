pub mod libsql;
pub mod memory;
pub mod rest;
