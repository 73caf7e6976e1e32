//! Objects to manage the employees whose attendance is tracked
use crate::core::{
    database::Database,
    error::{Error, Result},
    loadable::Loadable,
    query::{
        DynFilterPart,
        filter::{Cmp, FilterPart},
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, sqlite::SqliteQueryResult};

/// A type for specifying fields that can be used for filtering a database query
/// for employees
#[derive(Clone)]
pub enum Filter {
    /// Match the ID of the employee to the given value
    Id(i64),

    /// Match the badge identifier exactly
    QrCode(String),

    /// Compare the name of the employee to the given value
    Name(Cmp, String),
}

impl FilterPart for Filter {
    fn add_to_query(&self, builder: &mut QueryBuilder<Sqlite>) {
        match self {
            Self::Id(id) => _ = builder.push(" E.empid = ").push_bind(*id),
            Self::QrCode(code) => _ = builder.push(" E.qrcode = ").push_bind(code.clone()),
            Self::Name(cmp, frag) => {
                builder.push(" E.empname ").push(cmp).push_bind(cmp.pattern(frag));
            }
        }
    }
}

/// A person who clocks in and out by scanning a badge
#[derive(Debug, sqlx::FromRow, Deserialize, Serialize, PartialEq, Clone)]
pub struct Employee {
    #[sqlx(rename = "empid")]
    pub id: i64,

    #[sqlx(rename = "empname")]
    pub name: String,

    /// The opaque identifier encoded in the employee's badge
    #[sqlx(rename = "qrcode")]
    pub qr_code: String,
}

#[async_trait]
impl Loadable for Employee {
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
            .fetch_one(db.pool())
            .await
            .map_err(|e| e.into())
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult> {
        sqlx::query("DELETE FROM ct_employees WHERE empid=?")
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }
}

impl Employee {
    fn build_query(filter: Option<DynFilterPart>) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT E.empid, E.empname, E.qrcode FROM ct_employees E");
        if let Some(f) = filter {
            qb.push(" WHERE ");
            f.add_to_query(&mut qb);
        }
        qb.push(" ORDER BY E.empname ASC, E.empid ASC");
        qb
    }

    /// Loads all matching employees from the database
    pub async fn load_all(filter: Option<DynFilterPart>, db: &Database) -> Result<Vec<Employee>> {
        Self::build_query(filter)
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Look up the employee that owns the given badge
    pub async fn load_by_qr_code(qr_code: &str, db: &Database) -> Result<Employee> {
        Self::build_query(Some(Filter::QrCode(qr_code.to_string()).into()))
            .build_query_as()
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| Error::EmployeeNotFound(qr_code.to_string()))
    }

    /// Add this employee to the database. If this call completes successfully,
    /// the id of this object will be updated to the ID of the inserted row
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id != Self::invalid_id() {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }
        if self.qr_code.trim().is_empty() {
            return Err(Error::InvalidOperation(
                "an employee requires a non-empty badge".to_string(),
            ));
        }

        sqlx::query("INSERT INTO ct_employees (empname, qrcode) VALUES (?, ?)")
            .bind(&self.name)
            .bind(&self.qr_code)
            .execute(db.pool())
            .await
            .inspect(|r| self.id = r.last_insert_rowid())
            .map_err(|e| e.into())
    }

    /// Update the employee in the database such that it matches this object
    pub async fn update(&self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id < 0 {
            return Err(Error::InvalidUpdateObjectNotFound);
        }

        sqlx::query("UPDATE ct_employees SET empname=?, qrcode=? WHERE empid=?")
            .bind(&self.name)
            .bind(&self.qr_code)
            .bind(self.id)
            .execute(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Creates a new employee object. It will initially have an invalid ID
    /// until it is inserted into the database
    pub fn new(name: String, qr_code: String) -> Self {
        Self {
            id: Self::invalid_id(),
            name,
            qr_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::filter::or;
    use sqlx::Pool;
    use test_log::test;

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("employees"))
    ))]
    async fn test_lookup_by_badge(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let bob = Employee::load_by_qr_code("BOB123", &db)
            .await
            .expect("Failed to find employee by badge");
        assert_eq!(bob.id, 2);
        assert_eq!(bob.name, "Bob Test");

        // badges are matched exactly
        let res = Employee::load_by_qr_code("bob123", &db).await;
        assert!(matches!(res, Err(Error::EmployeeNotFound(code)) if code == "bob123"));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("employees"))
    ))]
    async fn test_insert_and_modify(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let mut emp = Employee::new("Dana Test".into(), "DANA123".into());
        let res = emp.insert(&db).await.expect("failed to insert");
        assert_eq!(res.rows_affected(), 1);
        assert_eq!(emp.id, res.last_insert_rowid());

        // inserting the same object twice is a programming error
        assert!(matches!(
            emp.insert(&db).await,
            Err(Error::InvalidInsertObjectAlreadyExists(_))
        ));

        emp.name = "Dana Renamed".into();
        emp.update(&db).await.expect("failed to update");
        let loaded = Employee::load(emp.id, &db).await.expect("failed to load");
        assert_eq!(loaded, emp);

        // another employee can't use an existing badge
        let mut dup = Employee::new("Imposter".into(), "ALICE123".into());
        let err = dup.insert(&db).await.expect_err("duplicate badge inserted");
        assert!(err.is_unique_violation());

        let mut blank = Employee::new("Nobody".into(), "  ".into());
        assert!(matches!(
            blank.insert(&db).await,
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test(sqlx::test(
        migrations = "../db/migrations/",
        fixtures(path = "../../db/fixtures", scripts("employees"))
    ))]
    async fn test_filter_and_delete(pool: Pool<Sqlite>) {
        let db = Database::from(pool);
        let filter = or()
            .push(Filter::Name(Cmp::Like, "alice".into()))
            .push(Filter::QrCode("CAROL123".into()))
            .build();
        let found = Employee::load_all(Some(filter), &db).await.unwrap();
        let names: Vec<_> = found.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alice Test", "Carol Test"]);

        let mut alice = Employee::load(1, &db).await.unwrap();
        alice.delete(&db).await.expect("failed to delete");
        assert_eq!(alice.id, Employee::invalid_id());
        assert!(Employee::load(1, &db).await.is_err());
    }
}
