//! Objects related to reporting errors from this library

/// A list of error types that can occur within this library
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("can't update the object, no id was specified")]
    InvalidUpdateObjectNotFound,

    #[error("can't insert the object, it already exists in the database with id = {}", .0)]
    InvalidInsertObjectAlreadyExists(i64),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid badge '{0}'")]
    EmployeeNotFound(String),

    #[error("Invalid store QR '{0}'")]
    StoreNotFound(String),

    #[error("Store {0} not found")]
    StoreIdNotFound(i64),

    #[error("Shift {0} not found")]
    ShiftNotFound(i64),

    #[error("You already have an open shift.")]
    AlreadyClockedIn(String),

    #[error("You do not have an open shift.")]
    NotClockedIn(String),

    #[error("Shift {0} is already closed")]
    ShiftClosed(i64),

    #[error("You are not at the store location.")]
    OutsideGeofence {
        store: String,
        distance: f64,
        radius: u32,
    },

    #[error("There is no store near this location.")]
    NoStoreNearby,

    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    DatabaseMigrationError(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    /// Returns true if this error was caused by violating a UNIQUE constraint
    /// in the database
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::DatabaseError(e) => e
                .as_database_error()
                .is_some_and(|dberr| dberr.is_unique_violation()),
            _ => false,
        }
    }
}

/// A convenience type alias for a [Result] with [Error] as its error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
