//! The rules for clocking employees in and out of their shifts
use crate::{
    core::{
        database::Database,
        error::{Error, Result},
        loadable::Loadable,
    },
    employee::Employee,
    geo::Coordinates,
    shift::{LocationPing, Shift},
    store::Store,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// The payload submitted by a scanning client for a clock event
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ClockRequest {
    pub qr_code: String,

    #[serde(alias = "lat")]
    pub latitude: f64,

    #[serde(alias = "lng")]
    pub longitude: f64,

    /// The token from the QR code posted at the store. When it is missing, the
    /// store closest to the reported position is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_token: Option<String>,
}

impl ClockRequest {
    pub fn new(qr_code: impl Into<String>, position: Coordinates) -> Self {
        Self {
            qr_code: qr_code.into(),
            latitude: position.latitude,
            longitude: position.longitude,
            store_token: None,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Controls how strictly a clock event's position is checked against the
/// store's geofence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeofencePolicy {
    pub enforce: bool,
}

impl Default for GeofencePolicy {
    fn default() -> Self {
        Self { enforce: true }
    }
}

impl GeofencePolicy {
    pub fn permissive() -> Self {
        Self { enforce: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockInReceipt {
    pub shift_id: i64,
    pub employee_name: String,
    pub store_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub clock_in_time: OffsetDateTime,
}

impl From<&Shift> for ClockInReceipt {
    fn from(shift: &Shift) -> Self {
        Self {
            shift_id: shift.id,
            employee_name: shift.employee_name.clone(),
            store_name: shift.store_name.clone(),
            clock_in_time: shift.clock_in_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockOutReceipt {
    pub shift_id: i64,
    pub employee_name: String,
    pub store_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub clock_in_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub clock_out_time: OffsetDateTime,
    pub duration_seconds: i64,
}

impl ClockOutReceipt {
    fn from_closed(shift: &Shift) -> Result<Self> {
        let clock_out_time = shift
            .clock_out_time
            .ok_or_else(|| {
                Error::InvalidOperation(format!("shift {} has no clock-out time", shift.id))
            })?;
        Ok(Self {
            shift_id: shift.id,
            employee_name: shift.employee_name.clone(),
            store_name: shift.store_name.clone(),
            clock_in_time: shift.clock_in_time,
            clock_out_time,
            duration_seconds: (clock_out_time - shift.clock_in_time).whole_seconds(),
        })
    }
}

/// Decide which store a clock-in belongs to
async fn resolve_store(
    request: &ClockRequest,
    position: &Coordinates,
    policy: GeofencePolicy,
    db: &Database,
) -> Result<Option<Store>> {
    let (store, distance) = match &request.store_token {
        Some(token) => {
            let store = Store::load_by_token(token, db).await?;
            let distance = store.coordinates().distance_to(position);
            (store, distance)
        }
        None => {
            if let Some((store, _)) = Store::nearest_containing(position, db).await? {
                return Ok(Some(store));
            }
            // outside every geofence, the nearest store is only used for reporting
            match Store::nearest(position, db).await? {
                Some(found) => found,
                None if policy.enforce => return Err(Error::NoStoreNearby),
                None => return Ok(None),
            }
        }
    };

    if distance <= f64::from(store.radius_meters) {
        return Ok(Some(store));
    }
    if policy.enforce {
        return Err(Error::OutsideGeofence {
            store: store.name,
            distance,
            radius: store.radius_meters,
        });
    }
    warn!(
        store = %store.name,
        distance,
        radius = store.radius_meters,
        "Clock event outside of geofence accepted"
    );
    // an explicitly scanned store is kept even when the position is off
    match request.store_token {
        Some(_) => Ok(Some(store)),
        None => Ok(None),
    }
}

/// Start a new shift for the employee identified by the request
pub async fn clock_in(
    db: &Database,
    request: &ClockRequest,
    policy: GeofencePolicy,
) -> Result<ClockInReceipt> {
    clock_in_at(db, request, policy, OffsetDateTime::now_utc()).await
}

pub async fn clock_in_at(
    db: &Database,
    request: &ClockRequest,
    policy: GeofencePolicy,
    time: OffsetDateTime,
) -> Result<ClockInReceipt> {
    let position = request.coordinates();
    position.validate()?;
    let employee = Employee::load_by_qr_code(&request.qr_code, db).await?;
    if let Some(shift) = Shift::load_open_for_employee(employee.id, db).await? {
        debug!(shift = shift.id, "Employee already has an open shift");
        return Err(Error::AlreadyClockedIn(request.qr_code.clone()));
    }
    let store = resolve_store(request, &position, policy, db).await?;

    let mut shift = Shift::start(&employee, store.as_ref(), position, time);
    insert_shift(&mut shift, &request.qr_code, db).await?;
    info!(
        shift = shift.id,
        employee = %employee.name,
        store = ?shift.store_name,
        "Clocked in"
    );
    Ok(ClockInReceipt::from(&shift))
}

/// Insert a freshly started shift. The employee may have clocked in from
/// another request since the open shift check.
async fn insert_shift(shift: &mut Shift, qr_code: &str, db: &Database) -> Result<()> {
    match shift.insert(db).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_unique_violation() => Err(Error::AlreadyClockedIn(qr_code.to_string())),
        Err(e) => Err(e),
    }
}

/// Close the open shift of the employee identified by the request
pub async fn clock_out(
    db: &Database,
    request: &ClockRequest,
    policy: GeofencePolicy,
) -> Result<ClockOutReceipt> {
    clock_out_at(db, request, policy, OffsetDateTime::now_utc()).await
}

pub async fn clock_out_at(
    db: &Database,
    request: &ClockRequest,
    policy: GeofencePolicy,
    time: OffsetDateTime,
) -> Result<ClockOutReceipt> {
    let position = request.coordinates();
    position.validate()?;
    let employee = Employee::load_by_qr_code(&request.qr_code, db).await?;
    let mut shift = Shift::load_open_for_employee(employee.id, db)
        .await?
        .ok_or_else(|| Error::NotClockedIn(request.qr_code.clone()))?;

    if policy.enforce {
        if let Some(store_id) = shift.store_id {
            let store = Store::load(store_id, db).await?;
            let fence = store.geofence();
            let distance = fence.distance_from_center(&position);
            if !fence.contains(&position) {
                return Err(Error::OutsideGeofence {
                    store: store.name,
                    distance,
                    radius: store.radius_meters,
                });
            }
        }
    }

    match shift.finish(position, time, db).await {
        Ok(()) => (),
        // closed by a concurrent clock-out
        Err(Error::ShiftClosed(_)) => return Err(Error::NotClockedIn(request.qr_code.clone())),
        Err(e) => return Err(e),
    }
    info!(shift = shift.id, employee = %employee.name, "Clocked out");
    ClockOutReceipt::from_closed(&shift)
}

/// Append a location ping to an open shift
pub async fn record_ping(
    db: &Database,
    shift_id: i64,
    position: Coordinates,
) -> Result<LocationPing> {
    position.validate()?;
    let shift = Shift::load(shift_id, db).await?;
    let ping = shift
        .add_ping(position, OffsetDateTime::now_utc(), db)
        .await?;
    debug!(shift = shift_id, ping = ping.id, "Recorded location ping");
    Ok(ping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shift::ShiftStatus;
    use sqlx::{Pool, Sqlite};
    use test_log::test;
    use time::macros::datetime;

    // a few meters from "Test Store"
    const NEAR_STORE: Coordinates = Coordinates {
        latitude: 36.1541,
        longitude: -95.9929,
    };

    const FAR_AWAY: Coordinates = Coordinates {
        latitude: 40.0,
        longitude: -100.0,
    };

    #[test]
    fn test_request_aliases() {
        let req: ClockRequest =
            serde_json::from_str(r#"{"qr_code": "ALICE123", "lat": 1.5, "lng": -2.5}"#).unwrap();
        assert_eq!(req.coordinates(), Coordinates::new(1.5, -2.5));
        assert_eq!(req.store_token, None);

        let req: ClockRequest = serde_json::from_str(
            r#"{"qr_code": "ALICE123", "latitude": 1.5, "longitude": -2.5, "store_token": "office_hq"}"#,
        )
        .unwrap();
        assert_eq!(req.store_token.as_deref(), Some("office_hq"));

        assert!(serde_json::from_str::<ClockRequest>(r#"{"qr_code": "ALICE123"}"#).is_err());
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_clock_in_and_out(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let req = ClockRequest::new("ALICE123", NEAR_STORE);
        let receipt = clock_in_at(
            &db,
            &req,
            GeofencePolicy::default(),
            datetime!(2025-01-07 08:00 UTC),
        )
        .await
        .expect("clock-in failed");
        assert_eq!(receipt.employee_name, "Alice Test");
        assert_eq!(receipt.store_name.as_deref(), Some("Test Store"));

        let dup = clock_in(&db, &req, GeofencePolicy::default()).await;
        assert!(matches!(dup, Err(Error::AlreadyClockedIn(code)) if code == "ALICE123"));

        let out = clock_out_at(
            &db,
            &req,
            GeofencePolicy::default(),
            datetime!(2025-01-07 12:30 UTC),
        )
        .await
        .expect("clock-out failed");
        assert_eq!(out.shift_id, receipt.shift_id);
        assert_eq!(out.duration_seconds, 4 * 3600 + 1800);

        let shift = Shift::load(receipt.shift_id, &db).await.unwrap();
        assert_eq!(shift.status, ShiftStatus::Closed);

        let again = clock_out(&db, &req, GeofencePolicy::default()).await;
        assert!(matches!(again, Err(Error::NotClockedIn(_))));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_rejected_requests(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let policy = GeofencePolicy::default();

        let unknown = clock_in(&db, &ClockRequest::new("NOBODY", NEAR_STORE), policy).await;
        assert!(matches!(unknown, Err(Error::EmployeeNotFound(_))));

        let bad = clock_in(
            &db,
            &ClockRequest::new("ALICE123", Coordinates::new(91.0, 0.0)),
            policy,
        )
        .await;
        assert!(matches!(bad, Err(Error::InvalidCoordinates(_))));

        let far = clock_in(&db, &ClockRequest::new("ALICE123", FAR_AWAY), policy).await;
        assert!(matches!(far, Err(Error::OutsideGeofence { radius: 200, .. })));

        // Bob's fixture shift is still open
        let bob = clock_in(&db, &ClockRequest::new("BOB123", NEAR_STORE), policy).await;
        assert!(matches!(bob, Err(Error::AlreadyClockedIn(_))));

        let mut with_token = ClockRequest::new("ALICE123", NEAR_STORE);
        with_token.store_token = Some("no_such_store".into());
        let res = clock_in(&db, &with_token, policy).await;
        assert!(matches!(res, Err(Error::StoreNotFound(_))));

        // scanning the office QR code while standing at the other store
        with_token.store_token = Some("office_hq".into());
        let res = clock_in(&db, &with_token, policy).await;
        assert!(matches!(res, Err(Error::OutsideGeofence { store, .. }) if store == "Office"));

        let carol = clock_out(&db, &ClockRequest::new("CAROL123", NEAR_STORE), policy).await;
        assert!(matches!(carol, Err(Error::NotClockedIn(_))));

        // nothing was recorded for Alice
        let alice = Employee::load(1, &db).await.unwrap();
        assert!(
            Shift::load_open_for_employee(alice.id, &db)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_permissive_policy(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let req = ClockRequest::new("ALICE123", FAR_AWAY);
        let receipt = clock_in(&db, &req, GeofencePolicy::permissive())
            .await
            .expect("permissive clock-in failed");
        assert_eq!(receipt.store_name, None);

        // the store geofence is checked on the way out when enforced
        let bob = ClockRequest::new("BOB123", FAR_AWAY);
        let res = clock_out(&db, &bob, GeofencePolicy::default()).await;
        assert!(matches!(res, Err(Error::OutsideGeofence { .. })));
        clock_out(&db, &bob, GeofencePolicy::permissive())
            .await
            .expect("permissive clock-out failed");

        // Alice's shift has no store so there is nothing to enforce
        clock_out(&db, &req, GeofencePolicy::default())
            .await
            .expect("clock-out without store failed");
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_concurrent_clock_in(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let req = ClockRequest::new("ALICE123", NEAR_STORE);
        let policy = GeofencePolicy::default();
        let (a, b) = tokio::join!(clock_in(&db, &req, policy), clock_in(&db, &req, policy));
        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(Error::AlreadyClockedIn(code)) if code == "ALICE123"))
        );
        let open = Shift::load_all(
            Some(crate::shift::Filter::Status(ShiftStatus::Open).into()),
            None,
            None,
            &db,
        )
        .await
        .unwrap();
        assert_eq!(open.iter().filter(|s| s.employee_id == 1).count(), 1);
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_insert_after_concurrent_clock_in(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        // Bob's fixture shift was opened after this request checked for one
        let bob = Employee::load_by_qr_code("BOB123", &db).await.unwrap();
        let store = Store::load(1, &db).await.unwrap();
        let mut shift = Shift::start(&bob, Some(&store), NEAR_STORE, OffsetDateTime::now_utc());
        let res = insert_shift(&mut shift, "BOB123", &db).await;
        assert!(matches!(res, Err(Error::AlreadyClockedIn(code)) if code == "BOB123"));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_clock_in_overlapping_fences(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let here = Coordinates::new(36.0, -96.0);
        let mut kiosk = Store::new("Kiosk".into(), "kiosk".into(), 36.00045, -96.0, Some(10));
        kiosk.insert(&db).await.unwrap();
        let mut mall = Store::new("Mall".into(), "mall".into(), 35.9991, -96.0, Some(1000));
        mall.insert(&db).await.unwrap();

        let receipt = clock_in(
            &db,
            &ClockRequest::new("ALICE123", here),
            GeofencePolicy::default(),
        )
        .await
        .expect("clock-in inside the mall was rejected");
        assert_eq!(receipt.store_name.as_deref(), Some("Mall"));

        // outside of every fence the error names the nearest store
        let res = clock_in(
            &db,
            &ClockRequest::new("CAROL123", Coordinates::new(36.02, -96.0)),
            GeofencePolicy::default(),
        )
        .await;
        assert!(matches!(res, Err(Error::OutsideGeofence { store, .. }) if store == "Kiosk"));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("employees"))
    ))]
    async fn test_no_stores(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let req = ClockRequest::new("ALICE123", NEAR_STORE);
        let res = clock_in(&db, &req, GeofencePolicy::default()).await;
        assert!(matches!(res, Err(Error::NoStoreNearby)));
        let receipt = clock_in(&db, &req, GeofencePolicy::permissive())
            .await
            .unwrap();
        assert_eq!(receipt.store_name, None);
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_record_ping(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let ping = record_ping(&db, 1, NEAR_STORE).await.expect("ping failed");
        assert_eq!(ping.shift_id, 1);
        assert_eq!(LocationPing::load_all_for_shift(1, &db).await.unwrap().len(), 3);

        assert!(matches!(
            record_ping(&db, 2, NEAR_STORE).await,
            Err(Error::ShiftClosed(2))
        ));
        assert!(matches!(
            record_ping(&db, 99, NEAR_STORE).await,
            Err(Error::ShiftNotFound(99))
        ));
        assert!(matches!(
            record_ping(&db, 1, Coordinates::new(0.0, 200.0)).await,
            Err(Error::InvalidCoordinates(_))
        ));
    }
}
