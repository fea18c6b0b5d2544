//! Authenticated, optionally encrypted cookie values
//!
//! A token is `base64url(timestamp|payload|mac)` where `payload` is the
//! base64url of the (possibly AES-GCM encrypted) value and `mac` is
//! HMAC-SHA256 over `name|timestamp|payload`. Binding the cookie name into
//! the MAC stops a token minted for one cookie from being replayed as another.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// Longest token accepted or produced, in bytes
pub const MAX_TOKEN_LENGTH: usize = 4096;

/// Default lifetime of a token: 30 days
pub const DEFAULT_MAX_AGE: i64 = 86400 * 30;

/// Tolerated clock skew for timestamps from the future
const MAX_FUTURE_SKEW: i64 = 60;

const NONCE_LEN: usize = 12;

/// Authentication key and optional encryption key for one codec
#[derive(Clone)]
pub struct KeyPair {
    /// HMAC key, any non-empty length
    pub auth_key: Vec<u8>,
    /// AES key, 16 or 32 bytes. `None` leaves values signed but readable.
    pub encryption_key: Option<Vec<u8>>,
}

impl KeyPair {
    /// A pair that only signs values
    pub fn signed(auth_key: impl Into<Vec<u8>>) -> Self {
        Self {
            auth_key: auth_key.into(),
            encryption_key: None,
        }
    }

    /// A pair that signs and encrypts values
    pub fn encrypted(auth_key: impl Into<Vec<u8>>, encryption_key: impl Into<Vec<u8>>) -> Self {
        Self {
            auth_key: auth_key.into(),
            encryption_key: Some(encryption_key.into()),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("auth_key", &"<redacted>")
            .field("encrypted", &self.encryption_key.is_some())
            .finish()
    }
}

enum Cipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    fn new(key: &[u8]) -> Result<Self, SessionError> {
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key)
                .map(Cipher::Aes128)
                .map_err(|e| SessionError::Config(e.to_string())),
            32 => Aes256Gcm::new_from_slice(key)
                .map(Cipher::Aes256)
                .map_err(|e| SessionError::Config(e.to_string())),
            n => Err(SessionError::Config(format!(
                "encryption key must be 16 or 32 bytes, got {}",
                n
            ))),
        }
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Cipher::Aes128(c) => seal(c, plaintext),
            Cipher::Aes256(c) => seal(c, plaintext),
        }
    }

    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Cipher::Aes128(c) => open(c, sealed),
            Cipher::Aes256(c) => open(c, sealed),
        }
    }
}

/// Encrypt with a fresh random nonce, returned as `nonce || ciphertext`
fn seal<C>(cipher: &C, plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error>
where
    C: Aead + AeadCore<NonceSize = U12>,
{
    let nonce = C::generate_nonce(&mut OsRng);
    let ciphertext = cipher.encrypt(&nonce, plaintext)?;
    let mut sealed = nonce.to_vec();
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open<C>(cipher: &C, sealed: &[u8]) -> Result<Vec<u8>, aes_gcm::Error>
where
    C: Aead + AeadCore<NonceSize = U12>,
{
    if sealed.len() < NONCE_LEN {
        return Err(aes_gcm::Error);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher.decrypt(Nonce::from_slice(nonce), ciphertext)
}

/// One signing (and optionally encrypting) codec
pub struct SecureCookie {
    auth_key: Vec<u8>,
    cipher: Option<Cipher>,
    max_age: i64,
}

impl SecureCookie {
    /// Build a codec from a key pair
    pub fn new(pair: &KeyPair) -> Result<Self, SessionError> {
        if pair.auth_key.is_empty() {
            return Err(SessionError::Config(
                "authentication key must not be empty".to_string(),
            ));
        }
        let cipher = pair.encryption_key.as_deref().map(Cipher::new).transpose()?;
        Ok(Self {
            auth_key: pair.auth_key.clone(),
            cipher,
            max_age: DEFAULT_MAX_AGE,
        })
    }

    /// Set how long tokens stay valid, in seconds. `0` disables the check.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    fn mac(&self, name: &str, timestamp: &[u8], payload: &[u8]) -> Result<HmacSha256, SessionError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.auth_key)
            .map_err(|e| SessionError::Config(e.to_string()))?;
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(timestamp);
        mac.update(b"|");
        mac.update(payload);
        Ok(mac)
    }

    /// Encode `value` for the cookie `name`, stamped with `now`
    pub fn encode(&self, name: &str, value: &str, now: i64) -> Result<String, SessionError> {
        let plaintext = value.as_bytes();
        let payload = match &self.cipher {
            Some(cipher) => cipher
                .encrypt(plaintext)
                .map_err(|e| SessionError::CookieEncode(format!("encryption failed: {}", e)))?,
            None => plaintext.to_vec(),
        };
        let payload = URL_SAFE_NO_PAD.encode(payload);
        let timestamp = now.to_string();

        let tag = self
            .mac(name, timestamp.as_bytes(), payload.as_bytes())?
            .finalize()
            .into_bytes();

        let mut token = Vec::with_capacity(timestamp.len() + payload.len() + tag.len() + 2);
        token.extend_from_slice(timestamp.as_bytes());
        token.push(b'|');
        token.extend_from_slice(payload.as_bytes());
        token.push(b'|');
        token.extend_from_slice(&tag);

        let encoded = URL_SAFE_NO_PAD.encode(token);
        if encoded.len() > MAX_TOKEN_LENGTH {
            return Err(SessionError::CookieEncode(format!(
                "token exceeds {} bytes",
                MAX_TOKEN_LENGTH
            )));
        }
        Ok(encoded)
    }

    /// Verify and decode a token issued for the cookie `name`
    pub fn decode(&self, name: &str, token: &str, now: i64) -> Result<String, SessionError> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(SessionError::CookieDecode("token too long".to_string()));
        }
        let raw = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|e| SessionError::CookieDecode(e.to_string()))?;

        let mut parts = raw.splitn(3, |b| *b == b'|');
        let (timestamp, payload, tag) = match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(p), Some(m)) => (t, p, m),
            _ => return Err(SessionError::CookieDecode("invalid token layout".to_string())),
        };

        self.mac(name, timestamp, payload)?
            .verify_slice(tag)
            .map_err(|_| SessionError::CookieDecode("invalid signature".to_string()))?;

        let issued: i64 = std::str::from_utf8(timestamp)
            .ok()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| SessionError::CookieDecode("invalid timestamp".to_string()))?;
        if issued > now + MAX_FUTURE_SKEW {
            return Err(SessionError::CookieDecode("timestamp from the future".to_string()));
        }
        if self.max_age > 0 && issued < now.saturating_sub(self.max_age) {
            return Err(SessionError::CookieDecode("token expired".to_string()));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| SessionError::CookieDecode(e.to_string()))?;
        let plaintext = match &self.cipher {
            Some(cipher) => cipher
                .decrypt(&payload)
                .map_err(|_| SessionError::CookieDecode("decryption failed".to_string()))?,
            None => payload,
        };

        String::from_utf8(plaintext).map_err(|e| SessionError::CookieDecode(e.to_string()))
    }
}

/// Build one codec per key pair, newest first
pub fn codecs_from_pairs(pairs: &[KeyPair]) -> Result<Vec<SecureCookie>, SessionError> {
    if pairs.is_empty() {
        return Err(SessionError::Config(
            "at least one key pair is required".to_string(),
        ));
    }
    pairs.iter().map(SecureCookie::new).collect()
}

/// Encode with the first codec in the chain
pub fn encode_multi(
    name: &str,
    value: &str,
    codecs: &[SecureCookie],
    now: i64,
) -> Result<String, SessionError> {
    let codec = codecs
        .first()
        .ok_or_else(|| SessionError::CookieEncode("no codecs configured".to_string()))?;
    codec.encode(name, value, now)
}

/// Try each codec in order (for key rotation), first success wins
pub fn decode_multi(
    name: &str,
    token: &str,
    codecs: &[SecureCookie],
    now: i64,
) -> Result<String, SessionError> {
    let mut last_error = SessionError::CookieDecode("no codecs configured".to_string());
    for codec in codecs {
        match codec.decode(name, token, now) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}
