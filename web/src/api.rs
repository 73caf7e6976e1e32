use crate::state::AppState;
use axum::{Router, routing::get};

mod attendance;


pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .merge(attendance::router())
}

async fn root() -> &'static str {
    "Clock-in system running."
}
