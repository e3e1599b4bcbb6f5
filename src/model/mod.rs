//! Documents that declare their own collection, database, and credentials.
//!
//! A `ModelDecl` plays the role of a document-class declaration: it names the
//! target database and collection, optionally carries a username/password
//! pair, and provides a `structure` template of default fields. Instances are
//! `MappedDocument`s; saving one authenticates the owning database handle on
//! demand before any write reaches the store.
use bson::{self, Bson, oid};

use {Client, Result};
use common::WriteConcern;
use db::{Database, ThreadedDatabase};
use error::Error::ArgumentError;
use hex;
use rand::{self, Rng};
use std::fmt;

/// A username/password pair scoped to one database.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }
}

// Keeps passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Credentials {{ username: {:?}, password: \"***\" }}", self.username)
    }
}

/// A per-document-type declaration of where and how instances persist.
#[derive(Debug, Clone)]
pub struct ModelDecl {
    /// The declared type name; prefixes textual identifiers.
    pub type_name: String,
    pub db_name: String,
    pub collection_name: String,
    pub credentials: Option<Credentials>,
    /// Default fields cloned into each new instance.
    pub structure: bson::Document,
}

impl ModelDecl {
    pub fn new(type_name: &str, db_name: &str, collection_name: &str) -> ModelDecl {
        ModelDecl {
            type_name: type_name.to_owned(),
            db_name: db_name.to_owned(),
            collection_name: collection_name.to_owned(),
            credentials: None,
            structure: bson::Document::new(),
        }
    }

    /// Declares the credentials instances authenticate with before saving.
    pub fn with_auth(mut self, username: &str, password: &str) -> ModelDecl {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Declares the default field layout of instances.
    pub fn with_structure(mut self, structure: bson::Document) -> ModelDecl {
        self.structure = structure;
        self
    }

    /// Creates a new in-memory instance of this declaration, bound to a fresh
    /// database handle from `client`.
    pub fn document(&self, client: Client) -> MappedDocument {
        let db = Database::open(client, &self.db_name, None);

        MappedDocument {
            decl: self.clone(),
            db: db,
            fields: self.structure.clone(),
        }
    }
}

/// Options for saving a mapped document.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// When true (the default), missing identifiers are driver-generated
    /// object ids; otherwise a textual id prefixed by the type name is used.
    pub object_id: bool,
    pub write_concern: Option<WriteConcern>,
}

impl SaveOptions {
    pub fn new() -> SaveOptions {
        SaveOptions {
            object_id: true,
            write_concern: None,
        }
    }
}

impl Default for SaveOptions {
    fn default() -> SaveOptions {
        SaveOptions::new()
    }
}

/// An instance of a declared document type.
#[derive(Clone)]
pub struct MappedDocument {
    decl: ModelDecl,
    db: Database,
    fields: bson::Document,
}

impl MappedDocument {
    /// The current field values.
    pub fn fields(&self) -> &bson::Document {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut bson::Document {
        &mut self.fields
    }

    /// Reads the value at a dotted path into the nested fields, if present.
    pub fn get(&self, path: &str) -> Option<&Bson> {
        let mut current = &self.fields;
        let mut parts = path.split('.').peekable();

        while let Some(part) = parts.next() {
            let value = match current.get(part) {
                Some(value) => value,
                None => return None,
            };

            if parts.peek().is_none() {
                return Some(value);
            }

            match *value {
                Bson::Document(ref inner) => current = inner,
                _ => return None,
            }
        }

        None
    }

    /// Writes `value` at a dotted path into the nested fields.
    ///
    /// Every intermediate segment must already be a document, as declared by
    /// the structure template.
    pub fn set<V: Into<Bson>>(&mut self, path: &str, value: V) -> Result<()> {
        let mut current = &mut self.fields;
        let mut parts = path.split('.').peekable();

        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                current.insert(part, value);
                return Ok(());
            }

            match current.get_mut(part) {
                Some(&mut Bson::Document(ref mut inner)) => current = inner,
                Some(_) => {
                    return Err(ArgumentError(format!("Field '{}' in path '{}' is not a \
                                                      document.",
                                                     part,
                                                     path)))
                }
                None => {
                    return Err(ArgumentError(format!("Field '{}' in path '{}' does not exist.",
                                                     part,
                                                     path)))
                }
            }
        }

        Err(ArgumentError(format!("Empty field path '{}'.", path)))
    }

    /// Authenticates if the declaration carries credentials, then writes the
    /// current fields to the declared collection and returns the identifier.
    ///
    /// On an authentication failure the error is returned as-is and nothing
    /// is written. Authentication happens at most once per database handle;
    /// subsequent saves reuse the session until `logout`.
    pub fn save(&mut self, options: Option<SaveOptions>) -> Result<Bson> {
        let opts = options.unwrap_or_default();

        if let Some(ref credentials) = self.decl.credentials {
            if !self.db.is_authenticated()? {
                self.db.auth(&credentials.username, &credentials.password)?;
            }
        }

        let id = match self.fields.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = if opts.object_id {
                    Bson::ObjectId(oid::ObjectId::new()?)
                } else {
                    Bson::String(self.textual_id())
                };
                self.fields.insert("_id", id.clone());
                id
            }
        };

        let coll = self.db.collection(&self.decl.collection_name);
        coll.insert_one(self.fields.clone(), opts.write_concern)?;

        debug!("saved {} instance as {} in '{}'",
               self.decl.type_name,
               id,
               coll.namespace);
        Ok(id)
    }

    /// Terminates the authenticated session on this document's database
    /// handle. A no-op if nothing is authenticated.
    pub fn logout(&self) -> Result<()> {
        self.db.logout()
    }

    // "{type_name}-{random hex}", as readable as an object id is opaque.
    fn textual_id(&self) -> String {
        let mut nonce = [0u8; 12];
        rand::thread_rng().fill(&mut nonce[..]);
        format!("{}-{}", self.decl.type_name, hex::encode(&nonce[..]))
    }
}
