//! Iterable results for queries against the store.
use bson;
use std::collections::VecDeque;

use Result;

pub const DEFAULT_BATCH_SIZE: i32 = 20;

/// Provides iteration over the documents returned for a query.
pub struct Cursor {
    buffer: VecDeque<bson::Document>,
    batch_size: i32,
}

impl Cursor {
    pub fn new(docs: Vec<bson::Document>) -> Cursor {
        Cursor::with_batch_size(docs, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(docs: Vec<bson::Document>, batch_size: i32) -> Cursor {
        Cursor {
            buffer: docs.into_iter().collect(),
            batch_size: batch_size,
        }
    }

    /// Whether the cursor has any documents left to yield.
    pub fn has_next(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Yields up to `batch_size` documents at once.
    pub fn next_batch(&mut self) -> Vec<bson::Document> {
        let mut batch = Vec::new();

        for _ in 0..self.batch_size {
            match self.buffer.pop_front() {
                Some(doc) => batch.push(doc),
                None => break,
            }
        }

        batch
    }
}

impl Iterator for Cursor {
    type Item = Result<bson::Document>;

    fn next(&mut self) -> Option<Result<bson::Document>> {
        self.buffer.pop_front().map(Ok)
    }
}
