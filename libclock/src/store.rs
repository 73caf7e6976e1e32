//! Objects to manage the stores that employees clock in at
use crate::{
    core::{
        database::Database,
        error::{Error, Result},
        loadable::Loadable,
        query::{
            DynFilterPart,
            filter::{Cmp, FilterPart},
        },
    },
    geo::{Coordinates, Geofence},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, sqlite::SqliteQueryResult};
use tracing::debug;

/// Geofence radius used for stores when none is given
pub const DEFAULT_RADIUS_METERS: u32 = 200;

#[derive(Clone)]
pub enum Filter {
    Id(i64),
    Token(String),
    Name(Cmp, String),
}

impl FilterPart for Filter {
    fn add_to_query(&self, builder: &mut QueryBuilder<Sqlite>) {
        match self {
            Self::Id(id) => _ = builder.push(" T.storeid = ").push_bind(*id),
            Self::Token(token) => _ = builder.push(" T.token = ").push_bind(token.clone()),
            Self::Name(cmp, frag) => {
                builder
                    .push(" T.storename ")
                    .push(cmp)
                    .push_bind(cmp.pattern(frag));
            }
        }
    }
}

/// A physical location where employees work. Clock events are only accepted
/// within `radius_meters` of the store's position.
#[derive(Debug, sqlx::FromRow, Deserialize, Serialize, PartialEq, Clone)]
pub struct Store {
    #[sqlx(rename = "storeid")]
    pub id: i64,

    #[sqlx(rename = "storename")]
    pub name: String,

    /// The token encoded in the QR code posted at the store
    pub token: String,

    pub latitude: f64,

    pub longitude: f64,

    #[sqlx(rename = "radius")]
    pub radius_meters: u32,
}

#[async_trait]
impl Loadable for Store {
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
        Self::build_query(Some(Filter::Id(id).into()))
            .build_query_as()
            .fetch_optional(db.pool())
            .await?
            .ok_or(Error::StoreIdNotFound(id))
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult> {
        sqlx::query("DELETE FROM ct_stores WHERE storeid=?")
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}

impl Store {
    fn build_query(filter: Option<DynFilterPart>) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(
            r#"SELECT T.storeid, T.storename, T.token, T.latitude, T.longitude, T.radius
            FROM ct_stores T"#,
        );
        if let Some(f) = filter {
            qb.push(" WHERE ");
            f.add_to_query(&mut qb);
        }
        qb.push(" ORDER BY T.storeid ASC");
        qb
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn geofence(&self) -> Geofence {
        Geofence::new(self.coordinates(), self.radius_meters)
    }

    /// Loads all matching stores from the database
    pub async fn load_all(filter: Option<DynFilterPart>, db: &Database) -> Result<Vec<Store>> {
        Self::build_query(filter)
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Look up a store by the token from its QR code
    pub async fn load_by_token(token: &str, db: &Database) -> Result<Store> {
        Self::build_query(Some(Filter::Token(token.to_string()).into()))
            .build_query_as()
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| Error::StoreNotFound(token.to_string()))
    }

    /// Find the store closest to the given position, along with its distance
    /// in meters. Returns `None` if there are no stores at all.
    pub async fn nearest(point: &Coordinates, db: &Database) -> Result<Option<(Store, f64)>> {
        let nearest = Self::by_distance(point, db).await?.into_iter().next();
        if let Some((store, distance)) = &nearest {
            debug!(store = %store.name, distance, "Found nearest store");
        }
        Ok(nearest)
    }

    /// Find the closest store whose geofence contains the given position.
    /// Geofences may overlap, so this is not necessarily the store returned
    /// by [Store::nearest].
    pub async fn nearest_containing(
        point: &Coordinates,
        db: &Database,
    ) -> Result<Option<(Store, f64)>> {
        let found = Self::by_distance(point, db)
            .await?
            .into_iter()
            .find(|(store, distance)| *distance <= f64::from(store.radius_meters));
        if let Some((store, distance)) = &found {
            debug!(store = %store.name, distance, "Found store containing position");
        }
        Ok(found)
    }

    async fn by_distance(point: &Coordinates, db: &Database) -> Result<Vec<(Store, f64)>> {
        let mut stores: Vec<_> = Self::load_all(None, db)
            .await?
            .into_iter()
            .map(|store| {
                let distance = store.coordinates().distance_to(point);
                (store, distance)
            })
            .collect();
        stores.sort_by(|(_, a), (_, b)| a.total_cmp(b));
        Ok(stores)
    }

    /// Add this store to the database. If this call completes successfully,
    /// the id of this object will be updated to the ID of the inserted row
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id != Self::invalid_id() {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }
        self.coordinates().validate()?;

        sqlx::query(
            r#"INSERT INTO ct_stores
          (storename, token, latitude, longitude, radius)
          VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&self.name)
        .bind(&self.token)
        .bind(self.latitude)
        .bind(self.longitude)
        .bind(self.radius_meters)
        .execute(db.pool())
        .await
        .inspect(|r| self.id = r.last_insert_rowid())
        .map_err(|e| e.into())
    }

    /// Update the store in the database such that it matches this object
    pub async fn update(&self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id < 0 {
            return Err(Error::InvalidUpdateObjectNotFound);
        }
        self.coordinates().validate()?;

        sqlx::query(
            "UPDATE ct_stores SET storename=?, token=?, latitude=?, longitude=?, radius=? WHERE storeid=?",
        )
        .bind(&self.name)
        .bind(&self.token)
        .bind(self.latitude)
        .bind(self.longitude)
        .bind(self.radius_meters)
        .bind(self.id)
        .execute(db.pool())
        .await
        .map_err(|e| e.into())
    }

    /// Replace the QR token of the store with the given id. Old QR codes
    /// posted at the store stop working immediately.
    pub async fn rotate_token(id: i64, token: &str, db: &Database) -> Result<()> {
        let res = sqlx::query("UPDATE ct_stores SET token=? WHERE storeid=?")
            .bind(token)
            .bind(id)
            .execute(db.pool())
            .await?;
        match res.rows_affected() {
            0 => Err(Error::StoreIdNotFound(id)),
            _ => Ok(()),
        }
    }

    /// Creates a new store object. It will initially have an invalid ID until
    /// it is inserted into the database
    pub fn new(
        name: String,
        token: String,
        latitude: f64,
        longitude: f64,
        radius_meters: Option<u32>,
    ) -> Self {
        Self {
            id: Self::invalid_id(),
            name,
            token,
            latitude,
            longitude,
            radius_meters: radius_meters.unwrap_or(DEFAULT_RADIUS_METERS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Pool;
    use test_log::test;

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("stores"))
    ))]
    async fn test_nearest(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let near_office = Coordinates::new(36.0540, -95.8123);
        let (store, distance) = Store::nearest(&near_office, &db)
            .await
            .expect("query failed")
            .expect("no store found");
        assert_eq!(store.token, "office_hq");
        assert!(distance < 50.0, "distance was {distance}");
        assert!(store.geofence().contains(&near_office));

        let far_away = Coordinates::new(40.0, -100.0);
        let (_, distance) = Store::nearest(&far_away, &db).await.unwrap().unwrap();
        assert!(distance > 100_000.0);
    }

    #[test(sqlx::test(migrations = "../db/migrations/"))]
    async fn test_nearest_containing_overlapping_fences(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let here = Coordinates::new(36.0, -96.0);
        // the kiosk is closer but its fence is too small to cover the position
        let mut kiosk = Store::new("Kiosk".into(), "kiosk".into(), 36.00045, -96.0, Some(10));
        kiosk.insert(&db).await.unwrap();
        let mut mall = Store::new("Mall".into(), "mall".into(), 35.9991, -96.0, Some(1000));
        mall.insert(&db).await.unwrap();

        let (nearest, _) = Store::nearest(&here, &db).await.unwrap().unwrap();
        assert_eq!(nearest.name, "Kiosk");
        let (containing, distance) = Store::nearest_containing(&here, &db)
            .await
            .unwrap()
            .expect("position is inside the mall");
        assert_eq!(containing.name, "Mall");
        assert!(distance > 90.0 && distance < 110.0, "distance was {distance}");

        let outside_all = Coordinates::new(36.5, -96.0);
        assert!(matches!(
            Store::nearest_containing(&outside_all, &db).await,
            Ok(None)
        ));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("stores"))
    ))]
    async fn test_load_missing(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let store = Store::load(2, &db).await.unwrap();
        assert_eq!(store.token, "office_hq");
        assert!(matches!(
            Store::load(999, &db).await,
            Err(Error::StoreIdNotFound(999))
        ));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("stores"))
    ))]
    async fn test_filter_by_name(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let like = Store::load_all(Some(Filter::Name(Cmp::Like, "store".into()).into()), &db)
            .await
            .unwrap();
        assert_eq!(like.len(), 1);
        assert_eq!(like[0].name, "Test Store");

        let exact = Store::load_all(Some(Filter::Name(Cmp::Equal, "Office".into()).into()), &db)
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        let partial = Store::load_all(Some(Filter::Name(Cmp::Equal, "Off".into()).into()), &db)
            .await
            .unwrap();
        assert!(partial.is_empty());
    }

    #[test(sqlx::test(migrations = "../db/migrations/"))]
    async fn test_nearest_without_stores(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let res = Store::nearest(&Coordinates::new(0.0, 0.0), &db).await;
        assert!(matches!(res, Ok(None)));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("stores"))
    ))]
    async fn test_insert_and_rotate_token(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let mut store = Store::new("Annex".into(), "annex_1".into(), 36.1, -95.9, None);
        store.insert(&db).await.expect("failed to insert");
        assert_eq!(store.radius_meters, DEFAULT_RADIUS_METERS);

        Store::rotate_token(store.id, "annex_2", &db)
            .await
            .expect("failed to rotate token");
        assert!(matches!(
            Store::load_by_token("annex_1", &db).await,
            Err(Error::StoreNotFound(_))
        ));
        let loaded = Store::load_by_token("annex_2", &db).await.unwrap();
        assert_eq!(loaded.id, store.id);

        assert!(matches!(
            Store::rotate_token(999, "nope", &db).await,
            Err(Error::StoreIdNotFound(999))
        ));

        let mut bad = Store::new("Nowhere".into(), "x".into(), 95.0, 0.0, Some(10));
        assert!(matches!(
            bad.insert(&db).await,
            Err(Error::InvalidCoordinates(_))
        ));
    }
}
