use libclock::{
    employee::Employee,
    shift::{LocationPing, Shift},
    store::Store,
};
use serde::Serialize;
use tabled::Tabled;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

pub(crate) fn format_time(t: &OffsetDateTime) -> String {
    t.format(&Rfc3339).unwrap_or_else(|_| t.to_string())
}

pub(crate) fn format_duration(d: &Duration) -> String {
    let minutes = d.whole_minutes();
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct EmployeeRow {
    id: i64,
    name: String,
    #[tabled(rename = "QR Code")]
    qr_code: String,
}

impl EmployeeRow {
    pub(crate) fn new(employee: &Employee) -> Self {
        Self {
            id: employee.id,
            name: employee.name.clone(),
            qr_code: employee.qr_code.clone(),
        }
    }
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct StoreRow {
    id: i64,
    name: String,
    token: String,
    latitude: f64,
    longitude: f64,
    #[tabled(rename = "Radius (m)")]
    radius: u32,
}

impl StoreRow {
    pub(crate) fn new(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            token: store.token.clone(),
            latitude: store.latitude,
            longitude: store.longitude,
            radius: store.radius_meters,
        }
    }
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct ShiftRow {
    id: i64,
    employee: String,
    #[tabled(display("tabled::derive::display::option", ""))]
    store: Option<String>,
    #[tabled(rename = "Clock In")]
    clock_in: String,
    #[tabled(rename = "Clock Out", display("tabled::derive::display::option", ""))]
    clock_out: Option<String>,
    #[tabled(display("tabled::derive::display::option", ""))]
    duration: Option<String>,
    status: String,
}

impl ShiftRow {
    pub(crate) fn new(shift: &Shift) -> Self {
        Self {
            id: shift.id,
            employee: shift.employee_name.clone(),
            store: shift.store_name.clone(),
            clock_in: format_time(&shift.clock_in_time),
            clock_out: shift.clock_out_time.as_ref().map(format_time),
            duration: shift.duration().as_ref().map(format_duration),
            status: shift.status.to_string(),
        }
    }
}

fn format_position(lat: f64, lng: f64) -> String {
    format!("{lat:.6}, {lng:.6}")
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct ShiftRowDetails {
    id: i64,
    #[tabled(rename = "Employee ID")]
    employee_id: i64,
    employee: String,
    #[tabled(rename = "Store ID", display("tabled::derive::display::option", ""))]
    store_id: Option<i64>,
    #[tabled(display("tabled::derive::display::option", ""))]
    store: Option<String>,
    #[tabled(rename = "Clock In")]
    clock_in: String,
    #[tabled(rename = "Clock In Position")]
    clock_in_position: String,
    #[tabled(rename = "Clock Out", display("tabled::derive::display::option", ""))]
    clock_out: Option<String>,
    #[tabled(
        rename = "Clock Out Position",
        display("tabled::derive::display::option", "")
    )]
    clock_out_position: Option<String>,
    #[tabled(display("tabled::derive::display::option", ""))]
    duration: Option<String>,
    status: String,
    #[tabled(rename = "Location Pings")]
    pings: usize,
}

impl ShiftRowDetails {
    pub(crate) fn new(shift: &Shift, pings: &[LocationPing]) -> Self {
        Self {
            id: shift.id,
            employee_id: shift.employee_id,
            employee: shift.employee_name.clone(),
            store_id: shift.store_id,
            store: shift.store_name.clone(),
            clock_in: format_time(&shift.clock_in_time),
            clock_in_position: format_position(shift.clock_in_latitude, shift.clock_in_longitude),
            clock_out: shift.clock_out_time.as_ref().map(format_time),
            clock_out_position: shift
                .clock_out_position()
                .map(|p| format_position(p.latitude, p.longitude)),
            duration: shift.duration().as_ref().map(format_duration),
            status: shift.status.to_string(),
            pings: pings.len(),
        }
    }
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct PingRow {
    id: i64,
    timestamp: String,
    latitude: f64,
    longitude: f64,
}

impl PingRow {
    pub(crate) fn new(ping: &LocationPing) -> Self {
        Self {
            id: ping.id,
            timestamp: format_time(&ping.timestamp),
            latitude: ping.latitude,
            longitude: ping.longitude,
        }
    }
}
