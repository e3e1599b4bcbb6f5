//! Interface for collection-level operations.
pub mod results;

use bson::{self, Bson, oid};

use self::results::InsertOneResult;

use common::WriteConcern;
use cursor::Cursor;
use db::Database;

use Result;

/// Interfaces with a collection in a document store.
pub struct Collection {
    /// A reference to the database that spawned this collection.
    pub db: Database,
    /// The namespace of this collection, formatted as db_name.coll_name.
    pub namespace: String,
    write_concern: WriteConcern,
}

impl Collection {
    /// Creates a collection representation with an optional write control.
    pub fn new(db: Database, name: &str, write_concern: Option<WriteConcern>) -> Collection {
        let wc = write_concern.unwrap_or_else(|| db.write_concern.to_owned());

        Collection {
            namespace: format!("{}.{}", db.name, name),
            db: db,
            write_concern: wc,
        }
    }

    /// Extracts the collection name from the namespace.
    /// If the namespace is invalid, this method will panic.
    pub fn name(&self) -> String {
        match self.namespace.find('.') {
            Some(idx) => String::from(&self.namespace[idx + 1..]),
            None => {
                // '.' is inserted in Collection::new, so this should only panic due to user error.
                panic!("Invalid namespace specified: '{}'.", self.namespace);
            }
        }
    }

    /// Permanently deletes the collection from the database.
    pub fn drop(&self) -> Result<()> {
        self.db.client.store.drop_collection(&self.db.name, &self.name())
    }

    /// Gets the number of documents matching the filter.
    pub fn count(&self, filter: Option<bson::Document>) -> Result<i64> {
        let docs = self.db.client.store.find(&self.db.name, &self.name(), filter, None)?;
        Ok(docs.len() as i64)
    }

    /// Returns a cursor over the documents within the collection that match the filter.
    pub fn find(&self, filter: Option<bson::Document>, limit: Option<i64>) -> Result<Cursor> {
        let docs = self.db.client.store.find(&self.db.name, &self.name(), filter, limit)?;
        Ok(Cursor::new(docs))
    }

    /// Returns the first document within the collection that matches the filter, or None.
    pub fn find_one(&self, filter: Option<bson::Document>) -> Result<Option<bson::Document>> {
        let mut cursor = self.find(filter, Some(1))?;

        match cursor.next() {
            Some(Ok(doc)) => Ok(Some(doc)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    /// Inserts the provided document. If the document is missing an identifier,
    /// one is generated for it.
    pub fn insert_one(&self,
                      doc: bson::Document,
                      write_concern: Option<WriteConcern>)
                      -> Result<InsertOneResult> {
        let wc = write_concern.unwrap_or_else(|| self.write_concern.to_owned());

        let mut converted = doc;
        let id = match converted.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(oid::ObjectId::new()?);
                converted.insert("_id", id.clone());
                id
            }
        };

        self.db.client.store.insert(&self.db.name, &self.name(), converted, &wc)?;
        Ok(InsertOneResult::new(Some(id)))
    }
}
