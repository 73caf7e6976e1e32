//! Clock employees in and out directly against the database, without a
//! running server
use crate::{
    cli::PositionArgs,
    output::rows::{format_duration, format_time},
};
use anyhow::Result;
use libclock::{
    Database,
    attendance::{self, ClockRequest, GeofencePolicy},
    geo::Coordinates,
};
use time::Duration;

fn request(qr_code: String, position: &PositionArgs, store_token: Option<String>) -> ClockRequest {
    let mut req = ClockRequest::new(
        qr_code,
        Coordinates::new(position.latitude, position.longitude),
    );
    req.store_token = store_token;
    req
}

fn policy(no_geofence: bool) -> GeofencePolicy {
    match no_geofence {
        true => GeofencePolicy::permissive(),
        false => GeofencePolicy::default(),
    }
}

pub(crate) async fn clock_in(
    qr_code: String,
    position: PositionArgs,
    store_token: Option<String>,
    no_geofence: bool,
    db: &Database,
) -> Result<()> {
    let req = request(qr_code, &position, store_token);
    let receipt = attendance::clock_in(db, &req, policy(no_geofence)).await?;
    println!(
        "Clocked in {} at {} (shift {}, {})",
        receipt.employee_name,
        receipt.store_name.as_deref().unwrap_or("no store"),
        receipt.shift_id,
        format_time(&receipt.clock_in_time)
    );
    Ok(())
}

pub(crate) async fn clock_out(
    qr_code: String,
    position: PositionArgs,
    no_geofence: bool,
    db: &Database,
) -> Result<()> {
    let req = request(qr_code, &position, None);
    let receipt = attendance::clock_out(db, &req, policy(no_geofence)).await?;
    println!(
        "Clocked out {} from {} (shift {}, worked {})",
        receipt.employee_name,
        receipt.store_name.as_deref().unwrap_or("no store"),
        receipt.shift_id,
        format_duration(&Duration::seconds(receipt.duration_seconds))
    );
    Ok(())
}
