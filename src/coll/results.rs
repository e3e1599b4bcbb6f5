//! Results for collection-level operations.
use bson::Bson;

/// The result of an acknowledged write.
#[derive(Debug, Clone)]
pub struct InsertOneResult {
    /// The identifier of the inserted document.
    pub inserted_id: Option<Bson>,
}

impl InsertOneResult {
    pub fn new(inserted_id: Option<Bson>) -> InsertOneResult {
        InsertOneResult { inserted_id: inserted_id }
    }
}
