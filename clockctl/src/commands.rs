//! Handlers for the clockctl subcommands
pub(crate) mod database;
pub(crate) mod employees;
pub(crate) mod harness;
pub(crate) mod punch;
pub(crate) mod shifts;
pub(crate) mod stores;
