//! This is a library that keeps track of employee attendance. Employees clock
//! in and out of a store by scanning a badge, and the resulting shifts are
//! stored in a database.

pub mod attendance;
pub mod core;
pub mod employee;
pub mod geo;
pub mod shift;
pub mod store;

pub use crate::core::database::Database;
pub use crate::core::error::Error;
pub use crate::core::error::Result;
