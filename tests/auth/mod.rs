use bson::{self, Bson};
use env_logger;
use mongomap::{Client, Error, MaliciousServerErrorType, Result, ThreadedClient};
use mongomap::common::WriteConcern;
use mongomap::db::ThreadedDatabase;
use mongomap::model::{ModelDecl, SaveOptions};
use mongomap::store::{MemoryStore, SaslResponse, Store};
use std::sync::Arc;

fn client_with_user(user: &str, password: &str) -> Client {
    let _ = env_logger::try_init();

    let client = Client::open(Arc::new(MemoryStore::new()));
    let db = client.db("test");
    let _ = db.drop_all_users().unwrap();
    db.create_user(user, password).unwrap();
    client
}

fn my_doc() -> ModelDecl {
    ModelDecl::new("MyDoc", "test", "mongomap_auth").with_structure(doc! {
        "bla" => {
            "foo" => "",
            "bar" => 0
        },
        "spam" => []
    })
}

#[test]
fn auth() {
    let client = client_with_user("foo", "bar");
    let decl = my_doc().with_auth("foo", "bar");

    let mut doc = decl.document(client.clone());
    doc.set("bla.foo", "bar").unwrap();
    doc.set("bla.bar", 42).unwrap();

    let id = doc.save(None).unwrap();
    match id {
        Bson::ObjectId(_) => {}
        other => panic!("expected an opaque id, got {}", other),
    }

    let collection = client.db("test").collection("mongomap_auth");
    let saved = collection.find_one(Some(doc! { "bla.bar" => 42 })).unwrap().unwrap();
    for (key, value) in doc.fields().iter() {
        assert_eq!(saved.get(key), Some(value));
    }

    let mut doc = decl.document(client.clone());
    doc.set("bla.foo", "bar").unwrap();
    doc.set("bla.bar", 43).unwrap();

    let options = SaveOptions { object_id: false, ..SaveOptions::new() };
    let id = doc.save(Some(options)).unwrap();
    match id {
        Bson::String(ref s) => assert!(s.starts_with("MyDoc"), "unexpected id {}", s),
        ref other => panic!("expected a textual id, got {}", other),
    }

    let saved = collection.find_one(Some(doc! { "bla.bar" => 43 })).unwrap().unwrap();
    for (key, value) in doc.fields().iter() {
        assert_eq!(saved.get(key), Some(value));
    }

    doc.logout().unwrap();
}

#[test]
fn bad_auth() {
    let client = client_with_user("foo", "bar");
    let decl = my_doc().with_auth("foo", "spam");

    let mut doc = decl.document(client.clone());
    doc.set("bla.foo", "bar").unwrap();
    doc.set("bla.bar", 42).unwrap();

    match doc.save(None) {
        Err(Error::AuthenticationError(_)) => {}
        other => panic!("expected AuthenticationError, got {:?}", other.map(|id| id.to_string())),
    }

    // Nothing may be written when authentication fails.
    let collection = client.db("test").collection("mongomap_auth");
    assert_eq!(collection.count(None).unwrap(), 0);

    doc.logout().unwrap();
}

#[test]
fn auth_without_user() {
    let client = client_with_user("foo", "bar");
    let db = client.db("test");
    db.drop_user("foo").unwrap();

    let decl = my_doc().with_auth("foo", "bar");
    let mut doc = decl.document(client);
    doc.set("bla.bar", 42).unwrap();

    match doc.save(None) {
        Err(Error::AuthenticationError(_)) => {}
        other => panic!("expected AuthenticationError, got {:?}", other.map(|id| id.to_string())),
    }
}

#[test]
fn auth_is_lazy_and_once_per_handle() {
    let client = client_with_user("foo", "bar");
    let decl = my_doc().with_auth("foo", "bar");

    let mut doc = decl.document(client.clone());
    doc.set("bla.bar", 1).unwrap();
    let id = doc.save(None).unwrap();

    // Dropping the user afterwards must not affect an authenticated handle.
    client.db("test").drop_user("foo").unwrap();
    doc.set("bla.bar", 2).unwrap();
    assert_eq!(doc.save(None).unwrap(), id);

    // After logout the next save has to authenticate again, which now fails.
    doc.logout().unwrap();
    match doc.save(None) {
        Err(Error::AuthenticationError(_)) => {}
        other => panic!("expected AuthenticationError, got {:?}", other.map(|id| id.to_string())),
    }
}

enum Tamper {
    NonExtendingRnonce,
    BadServerSignature,
    MissingServerSignature,
}

// Wraps the in-memory store and corrupts one leg of the SASL conversation.
struct TamperingStore {
    inner: MemoryStore,
    tamper: Tamper,
}

impl Store for TamperingStore {
    fn sasl_start(&self, db: &str, payload: &[u8]) -> Result<SaslResponse> {
        let res = self.inner.sasl_start(db, payload)?;
        match self.tamper {
            Tamper::NonExtendingRnonce => {
                Ok(SaslResponse { payload: b"r=unrelated,s=AAAA,i=4096".to_vec(), ..res })
            }
            _ => Ok(res),
        }
    }

    fn sasl_continue(&self, db: &str, conversation_id: i32, payload: &[u8]) -> Result<SaslResponse> {
        let res = self.inner.sasl_continue(db, conversation_id, payload)?;
        if res.done {
            return Ok(res);
        }
        match self.tamper {
            Tamper::BadServerSignature => {
                Ok(SaslResponse { payload: b"v=AAAA".to_vec(), ..res })
            }
            Tamper::MissingServerSignature => {
                Ok(SaslResponse { payload: b"welcome".to_vec(), ..res })
            }
            _ => Ok(res),
        }
    }

    fn logout(&self, db: &str) -> Result<()> {
        self.inner.logout(db)
    }

    fn insert(&self,
              _db: &str,
              _coll: &str,
              _doc: bson::Document,
              _write_concern: &WriteConcern)
              -> Result<()> {
        panic!("no write may reach the store when the handshake fails");
    }

    fn find(&self,
            db: &str,
            coll: &str,
            filter: Option<bson::Document>,
            limit: Option<i64>)
            -> Result<Vec<bson::Document>> {
        self.inner.find(db, coll, filter, limit)
    }

    fn create_user(&self, db: &str, name: &str, password: &str) -> Result<()> {
        self.inner.create_user(db, name, password)
    }

    fn drop_user(&self, db: &str, name: &str) -> Result<()> {
        self.inner.drop_user(db, name)
    }

    fn drop_all_users(&self, db: &str) -> Result<i32> {
        self.inner.drop_all_users(db)
    }

    fn drop_collection(&self, db: &str, coll: &str) -> Result<()> {
        self.inner.drop_collection(db, coll)
    }
}

fn tampering_client(tamper: Tamper) -> Client {
    let _ = env_logger::try_init();

    let client = Client::open(Arc::new(TamperingStore {
        inner: MemoryStore::new(),
        tamper: tamper,
    }));
    client.db("test").create_user("foo", "bar").unwrap();
    client
}

#[test]
fn non_extending_rnonce_blocks_save() {
    let client = tampering_client(Tamper::NonExtendingRnonce);
    let mut doc = my_doc().with_auth("foo", "bar").document(client.clone());
    doc.set("bla.bar", 42).unwrap();

    match doc.save(None) {
        Err(Error::MaliciousServerError(MaliciousServerErrorType::InvalidRnonce)) => {}
        other => {
            panic!("expected MaliciousServerError, got {:?}",
                   other.map(|id| id.to_string()))
        }
    }

    let collection = client.db("test").collection("mongomap_auth");
    assert_eq!(collection.count(None).unwrap(), 0);
}

#[test]
fn bad_server_signature_blocks_save() {
    let client = tampering_client(Tamper::BadServerSignature);
    let mut doc = my_doc().with_auth("foo", "bar").document(client.clone());
    doc.set("bla.bar", 42).unwrap();

    match doc.save(None) {
        Err(Error::MaliciousServerError(MaliciousServerErrorType::InvalidServerSignature)) => {}
        other => {
            panic!("expected MaliciousServerError, got {:?}",
                   other.map(|id| id.to_string()))
        }
    }

    let collection = client.db("test").collection("mongomap_auth");
    assert_eq!(collection.count(None).unwrap(), 0);
}

#[test]
fn missing_server_signature_blocks_save() {
    let client = tampering_client(Tamper::MissingServerSignature);
    let mut doc = my_doc().with_auth("foo", "bar").document(client.clone());
    doc.set("bla.bar", 42).unwrap();

    match doc.save(None) {
        Err(Error::MaliciousServerError(MaliciousServerErrorType::NoServerSignature)) => {}
        other => {
            panic!("expected MaliciousServerError, got {:?}",
                   other.map(|id| id.to_string()))
        }
    }

    let collection = client.db("test").collection("mongomap_auth");
    assert_eq!(collection.count(None).unwrap(), 0);
}

#[test]
fn logout_is_idempotent() {
    let client = client_with_user("foo", "bar");
    let decl = my_doc().with_auth("foo", "bar");

    let doc = decl.document(client);
    doc.logout().unwrap();
    doc.logout().unwrap();
}
