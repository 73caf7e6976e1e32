//! A trait for objects that can be loaded from the database by their id
use crate::core::{database::Database, error::Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteQueryResult;

#[async_trait]
pub trait Loadable: Sized + Send + Sync {
    type Id: Send + Sync;

    /// The id of an object that has not been inserted into the database yet
    fn invalid_id() -> Self::Id;

    fn id(&self) -> Self::Id;

    fn set_id(&mut self, id: Self::Id);

    /// Load the object with the given id from the database
    async fn load(id: Self::Id, db: &Database) -> Result<Self>;

    /// Delete the object with the given id from the database
    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult>;

    /// Delete this object from the database. On success the object's id is
    /// reset to [Loadable::invalid_id()]
    async fn delete(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        let id = self.id();
        let res = Self::delete_id(&id, db).await?;
        self.set_id(Self::invalid_id());
        Ok(res)
    }
}
