//! The seam between the mapper and the document store backing it.
pub mod memory;

use bson;
use common::WriteConcern;
use Result;

pub use self::memory::MemoryStore;

/// One leg of a SASL authentication conversation.
#[derive(Debug, Clone)]
pub struct SaslResponse {
    /// Identifies the conversation across continuation calls.
    pub conversation_id: i32,
    /// The server's challenge or verification payload.
    pub payload: Vec<u8>,
    /// Whether the conversation has concluded.
    pub done: bool,
}

/// The operations a document store must expose to back the mapper.
///
/// This is the external-database boundary: authentication is spoken as a
/// SASL challenge/response, writes are upserts keyed on `_id`, and the
/// user-management calls mirror the administrative commands a live server
/// would accept.
pub trait Store: Send + Sync {
    /// Opens a SASL conversation against the named database.
    fn sasl_start(&self, db: &str, payload: &[u8]) -> Result<SaslResponse>;

    /// Continues a previously opened SASL conversation.
    fn sasl_continue(&self, db: &str, conversation_id: i32, payload: &[u8]) -> Result<SaslResponse>;

    /// Releases any authenticated session on the named database. Idempotent.
    fn logout(&self, db: &str) -> Result<()>;

    /// Writes a document to the named collection, replacing any stored
    /// document with the same `_id`.
    fn insert(&self,
              db: &str,
              coll: &str,
              doc: bson::Document,
              write_concern: &WriteConcern)
              -> Result<()>;

    /// Returns documents matching the filter, up to `limit` if given.
    /// Filter keys may use dotted paths into nested documents.
    fn find(&self,
            db: &str,
            coll: &str,
            filter: Option<bson::Document>,
            limit: Option<i64>)
            -> Result<Vec<bson::Document>>;

    /// Provisions a user on the named database.
    fn create_user(&self, db: &str, name: &str, password: &str) -> Result<()>;

    /// Removes a user from the named database.
    fn drop_user(&self, db: &str, name: &str) -> Result<()>;

    /// Removes every user from the named database, returning how many.
    fn drop_all_users(&self, db: &str) -> Result<i32>;

    /// Deletes the named collection and its documents.
    fn drop_collection(&self, db: &str, coll: &str) -> Result<()>;
}
