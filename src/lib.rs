//! Varsity Shifts: the data side of a transfer-portal dashboard.
//!
//! Raw tables are coerced into typed records, aggregated by group and time,
//! and turned into era-partitioned series (pre/post NIL policy) that a
//! renderer consumes.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod state;
pub mod stoplight;
