use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error(transparent)]
    Libclock(#[from] libclock::Error),
    #[error("The request body was rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn to_client_status(&self) -> (StatusCode, String) {
        match self {
            Error::Libclock(e) => libclock_status(e),
            Error::JsonRejection(JsonRejection::MissingJsonContentType(_)) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Expected a JSON request body".to_string(),
            ),
            Error::JsonRejection(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            Error::Other(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        }
    }
}

fn libclock_status(err: &libclock::Error) -> (StatusCode, String) {
    use libclock::Error as E;
    let status = match err {
        E::InvalidCoordinates(_) => StatusCode::UNPROCESSABLE_ENTITY,
        E::EmployeeNotFound(_)
        | E::StoreNotFound(_)
        | E::StoreIdNotFound(_)
        | E::ShiftNotFound(_) => StatusCode::NOT_FOUND,
        E::OutsideGeofence { .. } | E::NoStoreNearby => StatusCode::FORBIDDEN,
        E::AlreadyClockedIn(_) | E::NotClockedIn(_) | E::ShiftClosed(_) => StatusCode::CONFLICT,
        E::DatabaseError(_) | E::DatabaseMigrationError(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            );
        }
        _ => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            );
        }
    };
    (status, err.to_string())
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        warn!("Got error for response: {self:?}");
        let (status, message) = self.to_client_status();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
