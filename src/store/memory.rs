//! A single-node, in-memory document store.
use auth::{hashed_password, hmac_sha1, salted_password, sha1_digest};
use bson::{self, Bson};
use common::WriteConcern;
use data_encoding::BASE64;
use error::Error::{AuthenticationError, DefaultError, OperationError, ResponseError};
use error::Result;
use rand::{self, Rng};
use std::collections::HashMap;
use std::sync::Mutex;
use textnonce::TextNonce;

use super::{SaslResponse, Store};

const SCRAM_ITERATIONS: usize = 4096;

// SCRAM-SHA-1 verifier; the plaintext password is never retained.
struct ScramCredential {
    salt: Vec<u8>,
    iterations: usize,
    stored_key: Vec<u8>,
    server_key: Vec<u8>,
}

struct Conversation {
    user: String,
    client_first_bare: String,
    server_first: String,
    rnonce: String,
    // Proof verified; awaiting the empty final round.
    verified: bool,
}

#[derive(Default)]
struct DatabaseState {
    users: HashMap<String, ScramCredential>,
    // Documents are held as encoded BSON, decoded on the way out.
    collections: HashMap<String, Vec<Vec<u8>>>,
    conversations: HashMap<i32, Conversation>,
    session: Option<String>,
}

#[derive(Default)]
struct StoreState {
    databases: HashMap<String, DatabaseState>,
    next_conversation_id: i32,
}

/// An in-memory `Store` holding per-database users, sessions, and collections
/// of BSON-encoded documents. Authentication is a full SCRAM-SHA-1 verifier
/// over credentials provisioned with `create_user`.
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore { state: Mutex::new(StoreState::default()) }
    }
}

impl Default for MemoryStore {
    fn default() -> MemoryStore {
        MemoryStore::new()
    }
}

fn lookup<'a>(doc: &'a bson::Document, path: &str) -> Option<&'a Bson> {
    let mut current = doc;
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

fn matches_filter(doc: &bson::Document, filter: &bson::Document) -> bool {
    filter.iter().all(|(path, expected)| lookup(doc, path) == Some(expected))
}

fn encode(doc: &bson::Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    bson::encode_document(&mut buf, doc)?;
    Ok(buf)
}

fn decode(mut bytes: &[u8]) -> Result<bson::Document> {
    Ok(bson::decode_document(&mut bytes)?)
}

fn verify_client_proof(db_state: &mut DatabaseState,
                       db: &str,
                       conversation_id: i32,
                       payload: &[u8])
                       -> Result<SaslResponse> {
    let conversation = match db_state.conversations.get_mut(&conversation_id) {
        Some(conversation) => conversation,
        None => {
            return Err(OperationError(format!("No SASL conversation {} on database '{}'.",
                                              conversation_id,
                                              db)))
        }
    };

    let text = String::from_utf8(payload.to_vec())
        .map_err(|_| ResponseError("Invalid UTF-8 SASL payload".to_owned()))?;

    let (_, rnonce_opt, proof_opt) = scan_fmt!(&text[..], "c={},r={},p={}", String, String, String);
    let rnonce =
        rnonce_opt.ok_or_else(|| ResponseError("Missing nonce in SASL payload".to_owned()))?;
    let proof_b64 =
        proof_opt.ok_or_else(|| ResponseError("Missing proof in SASL payload".to_owned()))?;

    let failure = || AuthenticationError(format!("Authentication failed for user '{}' on \
                                                  database '{}'.",
                                                 conversation.user,
                                                 db));

    if rnonce != conversation.rnonce {
        return Err(failure());
    }

    let credential = db_state.users
        .get(&conversation.user)
        .ok_or_else(&failure)?;

    let proof = BASE64.decode(proof_b64.as_bytes()).map_err(|_| failure())?;

    let without_proof = format!("c=biws,r={}", conversation.rnonce);
    let auth_message = format!("{},{},{}",
                               conversation.client_first_bare,
                               conversation.server_first,
                               without_proof);

    let client_signature = hmac_sha1(&credential.stored_key, auth_message.as_bytes())?;

    if proof.len() != client_signature.len() {
        return Err(failure());
    }

    let client_key: Vec<u8> = proof.iter()
        .zip(client_signature.iter())
        .map(|(p, sig)| p ^ sig)
        .collect();

    if sha1_digest(&client_key) != credential.stored_key {
        debug!("db '{}': bad proof for user '{}'", db, conversation.user);
        return Err(failure());
    }

    let server_signature = hmac_sha1(&credential.server_key, auth_message.as_bytes())?;
    conversation.verified = true;

    Ok(SaslResponse {
        conversation_id: conversation_id,
        payload: format!("v={}", BASE64.encode(&server_signature)).into_bytes(),
        done: false,
    })
}

impl Store for MemoryStore {
    fn sasl_start(&self, db: &str, payload: &[u8]) -> Result<SaslResponse> {
        let mut state = self.state.lock()?;

        let text = String::from_utf8(payload.to_vec())
            .map_err(|_| ResponseError("Invalid UTF-8 SASL payload".to_owned()))?;

        if !text.starts_with("n,,") {
            return Err(ResponseError("Missing gs2 header in SASL payload".to_owned()));
        }

        let client_first_bare = text[3..].to_owned();
        let (user_opt, cnonce_opt) = scan_fmt!(&client_first_bare[..], "n={},r={}", String, String);
        let user = user_opt.ok_or_else(|| ResponseError("Missing user in SASL payload".to_owned()))?;
        let cnonce =
            cnonce_opt.ok_or_else(|| ResponseError("Missing nonce in SASL payload".to_owned()))?;

        let conversation_id = state.next_conversation_id;
        state.next_conversation_id += 1;

        let db_state = state.databases.entry(db.to_owned()).or_insert_with(Default::default);

        let (server_first, rnonce) = {
            let credential = match db_state.users.get(&user) {
                Some(credential) => credential,
                None => {
                    debug!("db '{}': SASL start for unknown user '{}'", db, user);
                    return Err(AuthenticationError(format!("No user '{}' on database '{}'.",
                                                           user,
                                                           db)));
                }
            };

            let extension = TextNonce::sized(24).map_err(DefaultError)?;
            let rnonce = format!("{}{}", cnonce, extension);
            let server_first = format!("r={},s={},i={}",
                                       rnonce,
                                       BASE64.encode(&credential.salt),
                                       credential.iterations);
            (server_first, rnonce)
        };

        // A fresh handshake supersedes any unfinished one for the same user.
        db_state.conversations.retain(|_, conversation| conversation.user != user);

        db_state.conversations.insert(conversation_id,
                                      Conversation {
                                          user: user,
                                          client_first_bare: client_first_bare,
                                          server_first: server_first.clone(),
                                          rnonce: rnonce,
                                          verified: false,
                                      });

        Ok(SaslResponse {
            conversation_id: conversation_id,
            payload: server_first.into_bytes(),
            done: false,
        })
    }

    fn sasl_continue(&self, db: &str, conversation_id: i32, payload: &[u8]) -> Result<SaslResponse> {
        let mut state = self.state.lock()?;
        let db_state = state.databases.entry(db.to_owned()).or_insert_with(Default::default);

        let verified = match db_state.conversations.get(&conversation_id) {
            Some(conversation) => conversation.verified,
            None => {
                return Err(OperationError(format!("No SASL conversation {} on database '{}'.",
                                                  conversation_id,
                                                  db)))
            }
        };

        if verified {
            // The final empty round; the session becomes authenticated.
            if let Some(conversation) = db_state.conversations.remove(&conversation_id) {
                info!("db '{}': user '{}' logged in", db, conversation.user);
                db_state.session = Some(conversation.user);
            }

            return Ok(SaslResponse {
                conversation_id: conversation_id,
                payload: Vec::new(),
                done: true,
            });
        }

        match verify_client_proof(db_state, db, conversation_id, payload) {
            Ok(response) => Ok(response),
            Err(err) => {
                // Failed handshakes must not linger in the conversation table.
                db_state.conversations.remove(&conversation_id);
                Err(err)
            }
        }
    }

    fn logout(&self, db: &str) -> Result<()> {
        let mut state = self.state.lock()?;

        if let Some(db_state) = state.databases.get_mut(db) {
            if let Some(user) = db_state.session.take() {
                info!("db '{}': user '{}' logged out", db, user);
            }
        }

        Ok(())
    }

    fn insert(&self,
              db: &str,
              coll: &str,
              doc: bson::Document,
              write_concern: &WriteConcern)
              -> Result<()> {
        if write_concern.w > 1 {
            return Err(OperationError(format!("Cannot satisfy write concern w={} on a \
                                               single-node store.",
                                              write_concern.w)));
        }

        let encoded = encode(&doc)?;
        let id = doc.get("_id").cloned();

        let mut state = self.state.lock()?;
        let db_state = state.databases.entry(db.to_owned()).or_insert_with(Default::default);
        let docs = db_state.collections.entry(coll.to_owned()).or_insert_with(Vec::new);

        if let Some(ref id) = id {
            for stored in docs.iter_mut() {
                if decode(stored)?.get("_id") == Some(id) {
                    *stored = encoded;
                    debug!("db '{}.{}': replaced document {}", db, coll, id);
                    return Ok(());
                }
            }
        }

        debug!("db '{}.{}': inserted document", db, coll);
        docs.push(encoded);
        Ok(())
    }

    fn find(&self,
            db: &str,
            coll: &str,
            filter: Option<bson::Document>,
            limit: Option<i64>)
            -> Result<Vec<bson::Document>> {
        let state = self.state.lock()?;

        let docs = state.databases
            .get(db)
            .and_then(|db_state| db_state.collections.get(coll));

        let stored = match docs {
            Some(stored) => stored,
            None => return Ok(Vec::new()),
        };

        let mut results = Vec::new();
        for bytes in stored {
            let doc = decode(bytes)?;

            let matched = match filter {
                Some(ref filter) => matches_filter(&doc, filter),
                None => true,
            };

            if matched {
                results.push(doc);
                if let Some(limit) = limit {
                    if results.len() as i64 >= limit {
                        break;
                    }
                }
            }
        }

        Ok(results)
    }

    fn create_user(&self, db: &str, name: &str, password: &str) -> Result<()> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill(&mut salt[..]);

        let salted = salted_password(&hashed_password(name, password), &salt, SCRAM_ITERATIONS);
        let client_key = hmac_sha1(&salted, b"Client Key")?;
        let credential = ScramCredential {
            salt: salt.to_vec(),
            iterations: SCRAM_ITERATIONS,
            stored_key: sha1_digest(&client_key),
            server_key: hmac_sha1(&salted, b"Server Key")?,
        };

        let mut state = self.state.lock()?;
        let db_state = state.databases.entry(db.to_owned()).or_insert_with(Default::default);
        db_state.users.insert(name.to_owned(), credential);
        info!("db '{}': created user '{}'", db, name);
        Ok(())
    }

    fn drop_user(&self, db: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        let db_state = state.databases.entry(db.to_owned()).or_insert_with(Default::default);

        match db_state.users.remove(name) {
            Some(_) => Ok(()),
            None => Err(OperationError(format!("No user '{}' on database '{}'.", name, db))),
        }
    }

    fn drop_all_users(&self, db: &str) -> Result<i32> {
        let mut state = self.state.lock()?;
        let db_state = state.databases.entry(db.to_owned()).or_insert_with(Default::default);

        let count = db_state.users.len() as i32;
        db_state.users.clear();
        Ok(count)
    }

    fn drop_collection(&self, db: &str, coll: &str) -> Result<()> {
        let mut state = self.state.lock()?;

        if let Some(db_state) = state.databases.get_mut(db) {
            db_state.collections.remove(coll);
        }

        Ok(())
    }
}
