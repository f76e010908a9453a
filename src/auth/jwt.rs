//! HS256 JSON Web Tokens for the fixed key/secret scheme.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::error::ZoomError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize)]
struct Header<'a> {
    alg: &'a str,
    typ: &'a str,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    exp: i64,
}

/// Signs a token issued by `api_key` that expires at `expires_at`.
pub fn sign(api_key: &str, api_secret: &str, expires_at: DateTime<Utc>) -> Result<String, ZoomError> {
    let header = Header {
        alg: "HS256",
        typ: "JWT",
    };
    let claims = Claims {
        iss: api_key,
        exp: expires_at.timestamp(),
    };
    // Both structs only hold strings and integers.
    let header = serde_json::to_vec(&header).unwrap_or_default();
    let claims = serde_json::to_vec(&claims).unwrap_or_default();

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(claims)
    );
    let signature = hmac_sha256(api_secret.as_bytes(), signing_input.as_bytes())?;
    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, ZoomError> {
    let mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ZoomError::Config(format!("unusable API secret: {e}")))?;
    Ok(mac.chain_update(message).finalize().into_bytes().to_vec())
}
