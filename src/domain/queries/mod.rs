//! Database query functions, grouped by entity
//!
//! All query functions take a generic `Executor` so they work against both
//! `&PgPool` and open transactions; routes and the dispatcher own the
//! transaction boundaries.

pub mod analytics;
pub mod campaigns;
pub mod metrics;
pub mod tweets;
pub mod users;
