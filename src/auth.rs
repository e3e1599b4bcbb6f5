//! SCRAM-SHA-1 authentication against a document store.
use data_encoding::BASE64;
use db::Database;
use error::Error::{DefaultError, MaliciousServerError, ResponseError};
use error::MaliciousServerErrorType;
use error::Result;
use hex;
use hmac::{Hmac, Mac};
use md5::Md5;
use pbkdf2::pbkdf2;
use sha1::{Digest, Sha1};
use textnonce::TextNonce;

/// Handles SCRAM-SHA-1 authentication logic.
pub trait Authenticator {
    fn auth(&self, user: &str, password: &str) -> Result<()>;
}

/// Computes the inner credential hash, `md5(user:mongo:password)` in hex.
pub(crate) fn hashed_password(user: &str, password: &str) -> String {
    let full_password = format!("{}:mongo:{}", user, password);
    hex::encode(Md5::digest(full_password.as_bytes()).as_slice())
}

/// Stretches the hashed credential with PBKDF2-HMAC-SHA-1.
pub(crate) fn salted_password(hashed_password: &str, salt: &[u8], iterations: usize) -> Vec<u8> {
    let mut salted = vec![0u8; 20];
    pbkdf2::<Hmac<Sha1>>(hashed_password.as_bytes(), salt, iterations, &mut salted);
    salted
}

pub(crate) fn hmac_sha1(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut hmac = Hmac::<Sha1>::new_varkey(key)
        .map_err(|_| DefaultError("Invalid HMAC key length".to_owned()))?;
    hmac.input(data);
    Ok(hmac.result().code().as_slice().to_vec())
}

pub(crate) fn sha1_digest(data: &[u8]) -> Vec<u8> {
    Sha1::digest(data).as_slice().to_vec()
}

fn start(db: &Database, user: &str) -> Result<(String, String, String, i32)> {
    let text_nonce = TextNonce::sized(64).map_err(DefaultError)?;

    let nonce = format!("{}", text_nonce);
    let client_first_bare = format!("n={},r={}", user, nonce);
    let payload = format!("n,,{}", client_first_bare);

    debug!("db '{}': starting SASL conversation for user '{}'", db.name, user);
    let res = db.client.store.sasl_start(&db.name, payload.as_bytes())?;

    let server_first = String::from_utf8(res.payload)
        .map_err(|_| ResponseError("Invalid UTF-8 payload returned".to_owned()))?;

    Ok((client_first_bare, server_first, nonce, res.conversation_id))
}

fn finish(db: &Database,
          user: &str,
          password: &str,
          client_first_bare: &str,
          server_first: &str,
          nonce: &str,
          conversation_id: i32)
          -> Result<()> {
    let (rnonce_opt, salt_opt, i_opt) =
        scan_fmt!(server_first, "r={},s={},i={}", String, String, u32);

    let rnonce = rnonce_opt.ok_or_else(|| ResponseError("Invalid rnonce returned".to_owned()))?;

    if !rnonce.starts_with(nonce) {
        return Err(MaliciousServerError(MaliciousServerErrorType::InvalidRnonce));
    }

    let salt_b64 = salt_opt.ok_or_else(|| ResponseError("Invalid salt returned".to_owned()))?;
    let salt = BASE64.decode(salt_b64.as_bytes())
        .map_err(|_| ResponseError("Invalid base64 salt returned".to_owned()))?;

    let iterations = i_opt
        .ok_or_else(|| ResponseError("Invalid iteration count returned".to_owned()))? as
        usize;

    let salted = salted_password(&hashed_password(user, password), &salt, iterations);
    let client_key = hmac_sha1(&salted, b"Client Key")?;
    let server_key = hmac_sha1(&salted, b"Server Key")?;
    let stored_key = sha1_digest(&client_key);

    let without_proof = format!("c=biws,r={}", rnonce);
    let auth_message = format!("{},{},{}", client_first_bare, server_first, without_proof);
    let signature = hmac_sha1(&stored_key, auth_message.as_bytes())?;

    if client_key.len() != signature.len() {
        return Err(DefaultError("Generated client key is invalid".to_owned()));
    }

    let proof: Vec<u8> = client_key.iter()
        .zip(signature.iter())
        .map(|(key, sig)| key ^ sig)
        .collect();

    let client_final = format!("{},p={}", without_proof, BASE64.encode(&proof));

    let mut res = db.client.store.sasl_continue(&db.name,
                                                conversation_id,
                                                client_final.as_bytes())?;

    let server_signature = hmac_sha1(&server_key, auth_message.as_bytes())?;

    loop {
        if res.done {
            break;
        }

        let payload_str = String::from_utf8_lossy(&res.payload).into_owned();
        let verifier = scan_fmt!(&payload_str[..], "v={}", String)
            .ok_or(MaliciousServerError(MaliciousServerErrorType::NoServerSignature))?;

        if verifier.ne(&BASE64.encode(&server_signature)[..]) {
            return Err(MaliciousServerError(MaliciousServerErrorType::InvalidServerSignature));
        }

        res = db.client.store.sasl_continue(&db.name, conversation_id, &[])?;
    }

    debug!("db '{}': user '{}' authenticated", db.name, user);
    Ok(())
}

impl Authenticator for Database {
    fn auth(&self, user: &str, password: &str) -> Result<()> {
        let (client_first_bare, server_first, nonce, conversation_id) = start(self, user)?;
        finish(self,
               user,
               password,
               &client_first_bare,
               &server_first,
               &nonce,
               conversation_id)
    }
}
