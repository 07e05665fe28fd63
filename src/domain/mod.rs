//! Domain layer - models and database queries

pub mod models;
pub mod queries;
