//! Interface for database-level operations.
use auth::Authenticator;

use {Client, Result};
use coll::Collection;
use common::WriteConcern;
use std::sync::{Arc, Mutex};

/// Interfaces with a database in a document store.
pub struct DatabaseInner {
    pub name: String,
    pub client: Client,
    pub write_concern: WriteConcern,
    // The user authenticated on this handle, if any.
    session: Mutex<Option<String>>,
}

pub type Database = Arc<DatabaseInner>;

pub trait ThreadedDatabase {
    /// Creates a database representation with an optional write control.
    fn open(client: Client, name: &str, write_concern: Option<WriteConcern>) -> Database;
    /// Logs in a user using the SCRAM-SHA-1 mechanism and records the session.
    fn auth(&self, user: &str, password: &str) -> Result<()>;
    /// Releases the authenticated session, if any. Idempotent.
    fn logout(&self) -> Result<()>;
    /// Whether a user is currently authenticated on this handle.
    fn is_authenticated(&self) -> Result<bool>;
    fn collection(&self, coll_name: &str) -> Collection;
    fn collection_with_concern(&self, coll_name: &str, write_concern: WriteConcern) -> Collection;
    fn create_user(&self, name: &str, password: &str) -> Result<()>;
    fn drop_user(&self, name: &str) -> Result<()>;
    fn drop_all_users(&self) -> Result<i32>;
    fn drop_collection(&self, name: &str) -> Result<()>;
}

impl ThreadedDatabase for Database {
    fn open(client: Client, name: &str, write_concern: Option<WriteConcern>) -> Database {
        let wc = write_concern.unwrap_or_else(|| client.write_concern.to_owned());

        Arc::new(DatabaseInner {
            name: name.to_owned(),
            client: client,
            write_concern: wc,
            session: Mutex::new(None),
        })
    }

    fn auth(&self, user: &str, password: &str) -> Result<()> {
        Authenticator::auth(self, user, password)?;
        *self.session.lock()? = Some(user.to_owned());
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        self.session.lock()?.take();
        self.client.store.logout(&self.name)
    }

    fn is_authenticated(&self) -> Result<bool> {
        Ok(self.session.lock()?.is_some())
    }

    /// Creates a collection representation with the inherited write control.
    fn collection(&self, coll_name: &str) -> Collection {
        Collection::new(self.clone(), coll_name, None)
    }

    /// Creates a collection representation with a custom write control.
    fn collection_with_concern(&self, coll_name: &str, write_concern: WriteConcern) -> Collection {
        Collection::new(self.clone(), coll_name, Some(write_concern))
    }

    /// Provisions a user on this database.
    fn create_user(&self, name: &str, password: &str) -> Result<()> {
        self.client.store.create_user(&self.name, name, password)
    }

    /// Permanently deletes the user from the database.
    fn drop_user(&self, name: &str) -> Result<()> {
        self.client.store.drop_user(&self.name, name)
    }

    /// Permanently deletes all users from the database, returning how many.
    fn drop_all_users(&self) -> Result<i32> {
        self.client.store.drop_all_users(&self.name)
    }

    /// Permanently deletes the collection from the database.
    fn drop_collection(&self, name: &str) -> Result<()> {
        self.client.store.drop_collection(&self.name, name)
    }
}
