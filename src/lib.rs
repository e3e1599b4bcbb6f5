//! A document mapper for MongoDB-style document stores.
//!
//! Document types are declared with a `ModelDecl`: a target database name, a
//! collection name, an optional username/password pair, and a template of
//! default fields. Instances authenticate lazily — the first `save` on a
//! credentialed document runs a SCRAM-SHA-1 conversation against the store
//! before anything is written, and bad credentials surface as
//! `Error::AuthenticationError` with no write performed.
//!
//! ```
//! #[macro_use(bson, doc)]
//! extern crate bson;
//! extern crate mongomap;
//!
//! use mongomap::{Client, ThreadedClient};
//! use mongomap::db::ThreadedDatabase;
//! use mongomap::model::ModelDecl;
//! use mongomap::store::MemoryStore;
//! use std::sync::Arc;
//!
//! fn main() {
//!     let client = Client::open(Arc::new(MemoryStore::new()));
//!     client.db("test").create_user("foo", "bar").unwrap();
//!
//!     let my_doc = ModelDecl::new("MyDoc", "test", "docs")
//!         .with_auth("foo", "bar")
//!         .with_structure(doc! { "bla" => { "foo" => "", "bar" => 0 } });
//!
//!     let mut doc = my_doc.document(client);
//!     doc.set("bla.foo", "bar").unwrap();
//!     doc.set("bla.bar", 42).unwrap();
//!
//!     let id = doc.save(None).unwrap();
//!     match id {
//!         bson::Bson::ObjectId(_) => {}
//!         other => panic!("expected an object id, got {}", other),
//!     }
//!
//!     doc.logout().unwrap();
//! }
//! ```
#[macro_use(bson, doc)]
extern crate bson;
extern crate data_encoding;
extern crate hex;
extern crate hmac;
#[macro_use]
extern crate log;
extern crate md5;
extern crate pbkdf2;
extern crate rand;
#[macro_use]
extern crate scan_fmt;
extern crate sha1;
extern crate textnonce;

pub mod auth;
pub mod coll;
pub mod common;
pub mod cursor;
pub mod db;
pub mod error;
pub mod model;
pub mod store;

pub use auth::Authenticator;
pub use error::{Error, MaliciousServerErrorType, Result};

use common::WriteConcern;
use db::{Database, ThreadedDatabase};
use std::sync::Arc;
use store::Store;

/// Interfaces with a document store.
pub struct ClientInner {
    /// The store this client speaks to.
    pub store: Arc<dyn Store>,
    pub write_concern: WriteConcern,
}

pub type Client = Arc<ClientInner>;

pub trait ThreadedClient: Sized {
    /// Creates a client over the given store with a default write control.
    fn open(store: Arc<dyn Store>) -> Client;
    /// `open` with a custom write control.
    fn open_with_concern(store: Arc<dyn Store>, write_concern: WriteConcern) -> Client;
    /// Creates a database representation with inherited write controls.
    fn db(&self, db_name: &str) -> Database;
    /// Creates a database representation with a custom write control.
    fn db_with_concern(&self, db_name: &str, write_concern: WriteConcern) -> Database;
}

impl ThreadedClient for Client {
    fn open(store: Arc<dyn Store>) -> Client {
        Client::open_with_concern(store, WriteConcern::new())
    }

    fn open_with_concern(store: Arc<dyn Store>, write_concern: WriteConcern) -> Client {
        Arc::new(ClientInner {
            store: store,
            write_concern: write_concern,
        })
    }

    fn db(&self, db_name: &str) -> Database {
        Database::open(self.clone(), db_name, None)
    }

    fn db_with_concern(&self, db_name: &str, write_concern: WriteConcern) -> Database {
        Database::open(self.clone(), db_name, Some(write_concern))
    }
}
