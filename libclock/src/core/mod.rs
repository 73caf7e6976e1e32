//! Core infrastructure for managing and accessing the attendance database.
pub mod database;
pub mod error;
pub mod loadable;
pub mod query;
