//! Short, collision-free identifiers for agreement components.
//!
//! Every emitted component gets an id derived from its [`UnificationKey`]:
//! the SHA-224 digest of the key's underscore-joined form, base32 encoded
//! and prefixed with `_`. The shortest prefix (from [`MIN_IDENTIFIER_LEN`]
//! characters) not already held by another key is used.

use crate::error::{Result, UnifyError};
use crate::key::UnificationKey;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha224};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Shortest identifier handed out, including the leading underscore.
pub const MIN_IDENTIFIER_LEN: usize = 5;
/// Upper bound (exclusive) on identifier length.
pub const MAX_IDENTIFIER_LEN: usize = 50;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// RFC 4648 base32 with `=` padding.
pub fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    for chunk in data.chunks(5) {
        let mut buf = [0u8; 5];
        buf[..chunk.len()].copy_from_slice(chunk);
        let bits = buf.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        let symbols = (chunk.len() * 8).div_ceil(5);
        for i in 0..8 {
            if i < symbols {
                let index = ((bits >> (35 - i * 5)) & 0x1f) as usize;
                out.push(BASE32_ALPHABET[index] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

fn key_digest(key: &UnificationKey) -> Vec<u8> {
    Sha224::digest(key.digest_input().as_bytes()).to_vec()
}

/// The full-length identifier a key's prefixes are drawn from.
pub fn full_identifier(key: &UnificationKey) -> String {
    format!("_{}", base32_encode(&key_digest(key)))
}

/// Deterministic username for a component pair: the leading characters of
/// the base64-encoded SHA-224 digest of the key.
pub fn username(key: &UnificationKey, len: usize) -> String {
    STANDARD.encode(key_digest(key)).chars().take(len).collect()
}

/// Random alphanumeric password.
pub fn password<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Assigns identifiers for the duration of one unification run.
#[derive(Debug, Default)]
pub struct IdentifierGenerator {
    assigned: HashMap<UnificationKey, String>,
    taken: HashMap<String, UnificationKey>,
}

impl IdentifierGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier for `key`, assigning one on first use.
    pub fn identifier(&mut self, key: &UnificationKey) -> Result<String> {
        if let Some(id) = self.assigned.get(key) {
            return Ok(id.clone());
        }
        let full = full_identifier(key);
        let longest = full.len().min(MAX_IDENTIFIER_LEN - 1);
        for len in MIN_IDENTIFIER_LEN..=longest {
            let candidate = &full[..len];
            match self.taken.get(candidate) {
                None => {
                    debug!(key = %key, id = candidate, "Assigned identifier");
                    self.taken.insert(candidate.to_string(), key.clone());
                    self.assigned.insert(key.clone(), candidate.to_string());
                    return Ok(candidate.to_string());
                }
                Some(holder) => {
                    warn!(key = %key, prefix = candidate, holder = %holder, "Identifier collision");
                }
            }
        }
        Err(UnifyError::IdentifierExhausted { key: key.clone() })
    }

    pub fn get(&self, key: &UnificationKey) -> Option<&str> {
        self.assigned.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
