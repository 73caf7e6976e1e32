//! Shifts are the work sessions between clocking in and clocking out
use crate::{
    core::{
        database::Database,
        error::{Error, Result},
        loadable::Loadable,
        query::{DynFilterPart, LimitSpec, SortOrder, ToSql, filter::FilterPart},
    },
    employee::Employee,
    geo::Coordinates,
    store::Store,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, sqlite::SqliteQueryResult};
use strum_macros::{Display, EnumString};
use time::{Duration, OffsetDateTime};
use tracing::debug;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    Display,
    EnumString,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShiftStatus {
    Open,
    Closed,
}

#[derive(Clone)]
pub enum Filter {
    Id(i64),
    EmployeeId(i64),
    StoreId(i64),
    Status(ShiftStatus),
}

impl FilterPart for Filter {
    fn add_to_query(&self, builder: &mut QueryBuilder<Sqlite>) {
        match self {
            Self::Id(id) => _ = builder.push(" S.shiftid = ").push_bind(*id),
            Self::EmployeeId(id) => _ = builder.push(" S.empid = ").push_bind(*id),
            Self::StoreId(id) => _ = builder.push(" S.storeid = ").push_bind(*id),
            Self::Status(status) => _ = builder.push(" S.status = ").push_bind(*status),
        }
    }
}

/// A work session of a single employee. A shift is opened when the employee
/// clocks in and closed when they clock out.
#[derive(Debug, sqlx::FromRow, Deserialize, Serialize, PartialEq, Clone)]
pub struct Shift {
    #[sqlx(rename = "shiftid")]
    pub id: i64,

    #[sqlx(rename = "empid")]
    pub employee_id: i64,

    #[sqlx(rename = "empname")]
    pub employee_name: String,

    /// The store the shift was worked at. This is only empty when the shift
    /// was recorded without geofence enforcement and no store was nearby, or
    /// if the store has since been removed.
    #[sqlx(rename = "storeid")]
    pub store_id: Option<i64>,

    #[sqlx(rename = "storename")]
    pub store_name: Option<String>,

    #[sqlx(rename = "clockin_time")]
    #[serde(with = "time::serde::rfc3339")]
    pub clock_in_time: OffsetDateTime,

    #[sqlx(rename = "clockin_lat")]
    pub clock_in_latitude: f64,

    #[sqlx(rename = "clockin_lng")]
    pub clock_in_longitude: f64,

    #[sqlx(rename = "clockout_time")]
    #[serde(with = "time::serde::rfc3339::option")]
    pub clock_out_time: Option<OffsetDateTime>,

    #[sqlx(rename = "clockout_lat")]
    pub clock_out_latitude: Option<f64>,

    #[sqlx(rename = "clockout_lng")]
    pub clock_out_longitude: Option<f64>,

    pub status: ShiftStatus,
}

#[async_trait]
impl Loadable for Shift {
    type Id = i64;

    fn invalid_id() -> Self::Id {
        -1
    }

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id
    }

    async fn load(id: Self::Id, db: &Database) -> Result<Self> {
        Self::build_query(Some(Filter::Id(id).into()), SortOrder::default(), None)
            .build_query_as()
            .fetch_optional(db.pool())
            .await?
            .ok_or(Error::ShiftNotFound(id))
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult> {
        sqlx::query("DELETE FROM ct_shifts WHERE shiftid=?")
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}

impl Shift {
    fn build_query(
        filter: Option<DynFilterPart>,
        order: SortOrder,
        limit: Option<LimitSpec>,
    ) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(
            r#"SELECT S.shiftid, S.empid, E.empname, S.storeid, T.storename,
            S.clockin_time, S.clockin_lat, S.clockin_lng,
            S.clockout_time, S.clockout_lat, S.clockout_lng, S.status
            FROM ct_shifts S
            INNER JOIN ct_employees E ON E.empid=S.empid
            LEFT JOIN ct_stores T ON T.storeid=S.storeid"#,
        );
        if let Some(f) = filter {
            qb.push(" WHERE ");
            f.add_to_query(&mut qb);
        }
        qb.push(format!(" ORDER BY S.shiftid {}", order.to_sql()));
        if let Some(l) = limit {
            qb.push(" ");
            qb.push(l.to_sql());
        }
        qb
    }

    /// Loads all matching shifts from the database. By default the most
    /// recent shifts are returned first.
    pub async fn load_all(
        filter: Option<DynFilterPart>,
        order: Option<SortOrder>,
        limit: Option<LimitSpec>,
        db: &Database,
    ) -> Result<Vec<Shift>> {
        Self::build_query(filter, order.unwrap_or_default(), limit)
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Returns the currently open shift for the given employee, if any
    pub async fn load_open_for_employee(employee_id: i64, db: &Database) -> Result<Option<Shift>> {
        let filter = crate::core::query::filter::and()
            .push(Filter::EmployeeId(employee_id))
            .push(Filter::Status(ShiftStatus::Open))
            .build();
        Self::build_query(Some(filter), SortOrder::default(), None)
            .build_query_as()
            .fetch_optional(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Creates a new open shift for the given employee. It will initially have
    /// an invalid ID until it is inserted into the database
    pub fn start(
        employee: &Employee,
        store: Option<&Store>,
        position: Coordinates,
        time: OffsetDateTime,
    ) -> Self {
        Self {
            id: Self::invalid_id(),
            employee_id: employee.id,
            employee_name: employee.name.clone(),
            store_id: store.map(|s| s.id),
            store_name: store.map(|s| s.name.clone()),
            clock_in_time: time,
            clock_in_latitude: position.latitude,
            clock_in_longitude: position.longitude,
            clock_out_time: None,
            clock_out_latitude: None,
            clock_out_longitude: None,
            status: ShiftStatus::Open,
        }
    }

    /// Add this shift to the database. Fails with a unique constraint
    /// violation if the employee already has an open shift.
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id != Self::invalid_id() {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }

        sqlx::query(
            r#"INSERT INTO ct_shifts
          (empid, storeid, clockin_time, clockin_lat, clockin_lng,
           clockout_time, clockout_lat, clockout_lng, status)
          VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(self.employee_id)
        .bind(self.store_id)
        .bind(self.clock_in_time)
        .bind(self.clock_in_latitude)
        .bind(self.clock_in_longitude)
        .bind(self.clock_out_time)
        .bind(self.clock_out_latitude)
        .bind(self.clock_out_longitude)
        .bind(self.status)
        .execute(db.pool())
        .await
        .inspect(|r| self.id = r.last_insert_rowid())
        .map_err(|e| e.into())
    }

    /// Close this shift. A clock-out time earlier than the clock-in time
    /// (e.g. from a skewed clock) is recorded as the clock-in time.
    pub async fn finish(
        &mut self,
        position: Coordinates,
        time: OffsetDateTime,
        db: &Database,
    ) -> Result<()> {
        if self.id < 0 {
            return Err(Error::InvalidUpdateObjectNotFound);
        }
        if self.status == ShiftStatus::Closed {
            return Err(Error::ShiftClosed(self.id));
        }
        let time = time.max(self.clock_in_time);
        let res = sqlx::query(
            r#"UPDATE ct_shifts SET clockout_time=?, clockout_lat=?, clockout_lng=?, status=?
            WHERE shiftid=? AND status=?"#,
        )
        .bind(time)
        .bind(position.latitude)
        .bind(position.longitude)
        .bind(ShiftStatus::Closed)
        .bind(self.id)
        .bind(ShiftStatus::Open)
        .execute(db.pool())
        .await?;
        // somebody else closed the shift since we loaded it
        if res.rows_affected() == 0 {
            return Err(Error::ShiftClosed(self.id));
        }
        debug!(shift = self.id, "Closed shift");
        self.clock_out_time = Some(time);
        self.clock_out_latitude = Some(position.latitude);
        self.clock_out_longitude = Some(position.longitude);
        self.status = ShiftStatus::Closed;
        Ok(())
    }

    /// The length of the shift, or `None` if it is still open
    pub fn duration(&self) -> Option<Duration> {
        self.clock_out_time.map(|out| out - self.clock_in_time)
    }

    pub fn clock_in_position(&self) -> Coordinates {
        Coordinates::new(self.clock_in_latitude, self.clock_in_longitude)
    }

    pub fn clock_out_position(&self) -> Option<Coordinates> {
        match (self.clock_out_latitude, self.clock_out_longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    /// Record the position of the employee during this shift
    pub async fn add_ping(
        &self,
        position: Coordinates,
        time: OffsetDateTime,
        db: &Database,
    ) -> Result<LocationPing> {
        if self.status == ShiftStatus::Closed {
            return Err(Error::ShiftClosed(self.id));
        }
        let mut ping = LocationPing {
            id: LocationPing::invalid_id(),
            shift_id: self.id,
            timestamp: time,
            latitude: position.latitude,
            longitude: position.longitude,
        };
        ping.insert(db).await?;
        Ok(ping)
    }

    pub async fn pings(&self, db: &Database) -> Result<Vec<LocationPing>> {
        LocationPing::load_all_for_shift(self.id, db).await
    }
}

/// A position reported by the employee's device while a shift is open
#[derive(Debug, sqlx::FromRow, Deserialize, Serialize, PartialEq, Clone)]
pub struct LocationPing {
    #[sqlx(rename = "pingid")]
    pub id: i64,

    #[sqlx(rename = "shiftid")]
    pub shift_id: i64,

    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,

    pub latitude: f64,

    pub longitude: f64,
}

#[async_trait]
impl Loadable for LocationPing {
    type Id = i64;

    fn invalid_id() -> Self::Id {
        -1
    }

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id
    }

    async fn load(id: Self::Id, db: &Database) -> Result<Self> {
        sqlx::query_as(
            "SELECT pingid, shiftid, timestamp, latitude, longitude FROM ct_pings WHERE pingid=?",
        )
        .bind(id)
        .fetch_one(db.pool())
        .await
        .map_err(|e| e.into())
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult> {
        sqlx::query("DELETE FROM ct_pings WHERE pingid=?")
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}

impl LocationPing {
    pub async fn load_all_for_shift(shift_id: i64, db: &Database) -> Result<Vec<LocationPing>> {
        sqlx::query_as(
            r#"SELECT pingid, shiftid, timestamp, latitude, longitude FROM ct_pings
            WHERE shiftid=? ORDER BY pingid ASC"#,
        )
        .bind(shift_id)
        .fetch_all(db.pool())
        .await
        .map_err(|e| e.into())
    }

    async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        sqlx::query(
            "INSERT INTO ct_pings (shiftid, timestamp, latitude, longitude) VALUES (?, ?, ?, ?)",
        )
        .bind(self.shift_id)
        .bind(self.timestamp)
        .bind(self.latitude)
        .bind(self.longitude)
        .execute(db.pool())
        .await
        .inspect(|r| self.id = r.last_insert_rowid())
        .map_err(|e| e.into())
    }

    pub fn position(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::filter::and;
    use sqlx::Pool;
    use test_log::test;
    use time::macros::datetime;

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_load_fixture_shifts(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let open = Shift::load(1, &db).await.expect("failed to load shift");
        assert_eq!(open.employee_name, "Bob Test");
        assert_eq!(open.store_name.as_deref(), Some("Test Store"));
        assert_eq!(open.status, ShiftStatus::Open);
        assert_eq!(open.clock_in_time, datetime!(2025-01-06 08:00 UTC));
        assert_eq!(open.duration(), None);
        assert_eq!(open.pings(&db).await.unwrap().len(), 2);

        let closed = Shift::load(2, &db).await.unwrap();
        assert_eq!(closed.duration(), Some(Duration::minutes(8 * 60 + 30)));
        assert!(closed.clock_out_position().is_some());

        assert!(matches!(
            Shift::load(42, &db).await,
            Err(Error::ShiftNotFound(42))
        ));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_list_filters(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let all = Shift::load_all(None, None, None, &db).await.unwrap();
        // newest first
        assert_eq!(all.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 1]);

        let open = Shift::load_all(
            Some(Filter::Status(ShiftStatus::Open).into()),
            None,
            None,
            &db,
        )
        .await
        .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].employee_id, 2);

        let none = and()
            .push(Filter::StoreId(2))
            .push(Filter::Status(ShiftStatus::Open))
            .build();
        assert!(
            Shift::load_all(Some(none), None, None, &db)
                .await
                .unwrap()
                .is_empty()
        );

        let limited = Shift::load_all(
            None,
            Some(SortOrder::Ascending),
            Some(LimitSpec::from(1)),
            &db,
        )
        .await
        .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, 1);
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_start_and_finish(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let alice = Employee::load(1, &db).await.unwrap();
        let store = Store::load(1, &db).await.unwrap();
        let mut shift = Shift::start(
            &alice,
            Some(&store),
            store.coordinates(),
            datetime!(2025-01-07 08:00 UTC),
        );
        shift.insert(&db).await.expect("failed to insert shift");
        let open = Shift::load_open_for_employee(alice.id, &db)
            .await
            .unwrap()
            .expect("no open shift");
        assert_eq!(open, shift);

        // the database refuses a second open shift for the same employee
        let mut second = Shift::start(&alice, None, store.coordinates(), datetime!(2025-01-07 09:00 UTC));
        let err = second.insert(&db).await.expect_err("second open shift inserted");
        assert!(err.is_unique_violation());

        shift
            .finish(store.coordinates(), datetime!(2025-01-07 16:15 UTC), &db)
            .await
            .expect("failed to finish shift");
        assert_eq!(shift.duration(), Some(Duration::minutes(8 * 60 + 15)));
        assert_eq!(Shift::load(shift.id, &db).await.unwrap(), shift);
        assert!(
            Shift::load_open_for_employee(alice.id, &db)
                .await
                .unwrap()
                .is_none()
        );

        assert!(matches!(
            shift
                .finish(store.coordinates(), datetime!(2025-01-07 17:00 UTC), &db)
                .await,
            Err(Error::ShiftClosed(_))
        ));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_finish_before_start(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let mut shift = Shift::load(1, &db).await.unwrap();
        let position = shift.clock_in_position();
        shift
            .finish(position, datetime!(2025-01-06 07:00 UTC), &db)
            .await
            .unwrap();
        assert_eq!(shift.clock_out_time, Some(shift.clock_in_time));
        assert_eq!(shift.duration(), Some(Duration::ZERO));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(
            path = "../../db/fixtures",
            scripts("employees", "stores", "shifts")
        )
    ))]
    async fn test_pings(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let open = Shift::load(1, &db).await.unwrap();
        let ping = open
            .add_ping(
                Coordinates::new(36.154, -95.9928),
                datetime!(2025-01-06 11:00 UTC),
                &db,
            )
            .await
            .expect("failed to add ping");
        assert_eq!(LocationPing::load(ping.id, &db).await.unwrap(), ping);
        assert_eq!(open.pings(&db).await.unwrap().len(), 3);

        let closed = Shift::load(2, &db).await.unwrap();
        assert!(matches!(
            closed
                .add_ping(closed.clock_in_position(), datetime!(2025-01-06 18:00 UTC), &db)
                .await,
            Err(Error::ShiftClosed(2))
        ));
    }
}
