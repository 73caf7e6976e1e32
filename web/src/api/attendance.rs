use crate::{error::Error, state::AppState};
use axum::{Json, Router, extract::State, routing::post};
use axum_extra::extract::WithRejection;
use libclock::{
    attendance::{self, ClockInReceipt, ClockOutReceipt, ClockRequest},
    geo::Coordinates,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clock-in", post(clock_in))
        .route("/clock-out", post(clock_out))
        .route("/location-ping", post(location_ping))
}

async fn clock_in(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ClockRequest>, Error>,
) -> Result<Json<ClockInReceipt>, Error> {
    let receipt = attendance::clock_in(&state.db, &request, state.policy()).await?;
    Ok(Json(receipt))
}

async fn clock_out(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ClockRequest>, Error>,
) -> Result<Json<ClockOutReceipt>, Error> {
    let receipt = attendance::clock_out(&state.db, &request, state.policy()).await?;
    Ok(Json(receipt))
}

#[derive(Deserialize)]
struct PingRequest {
    shift_id: i64,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lng")]
    longitude: f64,
}

async fn location_ping(
    State(state): State<AppState>,
    WithRejection(Json(ping), _): WithRejection<Json<PingRequest>, Error>,
) -> Result<Json<Value>, Error> {
    attendance::record_ping(
        &state.db,
        ping.shift_id,
        Coordinates::new(ping.latitude, ping.longitude),
    )
    .await?;
    Ok(Json(json!({ "status": "ok" })))
}
