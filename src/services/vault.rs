// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token vault for encrypting/decrypting OAuth tokens at rest.
//!
//! AES-256-GCM with a fresh random nonce per call. The stored form is a JSON
//! object `{"encrypted", "iv", "authTag"}` with hex-encoded fields. Any
//! authentication failure surfaces as [`AppError::Integrity`]; corrupted data is
//! never returned.

use crate::error::AppError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// One sealed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedToken {
    /// Hex ciphertext
    pub encrypted: String,
    /// Hex nonce
    pub iv: String,
    /// Hex GCM tag
    #[serde(rename = "authTag")]
    pub auth_tag: String,
}

/// Symmetric token encryption service.
#[derive(Clone)]
pub struct TokenVault {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

impl TokenVault {
    /// Create a vault from a raw 256-bit key.
    pub fn new(key: &[u8]) -> Result<Self, AppError> {
        let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| {
            AppError::Configuration(format!(
                "token encryption key must be 32 bytes, got {}",
                key.len()
            ))
        })?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt plaintext with a fresh nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedToken, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        let tag = self
            .key
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| AppError::Internal(anyhow::anyhow!("AES-GCM seal failed")))?;

        Ok(EncryptedToken {
            encrypted: hex::encode(&in_out),
            iv: hex::encode(nonce_bytes),
            auth_tag: hex::encode(tag.as_ref()),
        })
    }

    /// Decrypt and authenticate a sealed token.
    pub fn decrypt(&self, data: &EncryptedToken) -> Result<String, AppError> {
        let ciphertext = decode_hex(&data.encrypted, "ciphertext")?;
        let iv = decode_hex(&data.iv, "iv")?;
        let tag = decode_hex(&data.auth_tag, "auth tag")?;

        let nonce_bytes: [u8; NONCE_LEN] = iv.try_into().map_err(|iv: Vec<u8>| {
            AppError::Integrity(format!("iv must be {} bytes, got {}", NONCE_LEN, iv.len()))
        })?;
        if tag.len() != TAG_LEN {
            return Err(AppError::Integrity(format!(
                "auth tag must be {} bytes, got {}",
                TAG_LEN,
                tag.len()
            )));
        }

        // ring expects ciphertext || tag
        let mut in_out = ciphertext;
        in_out.extend_from_slice(&tag);

        let plaintext = self
            .key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| {
                AppError::Integrity(
                    "authentication tag mismatch (corrupt data or rotated key)".to_string(),
                )
            })?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| AppError::Integrity("decrypted token is not UTF-8".to_string()))
    }

    /// Encrypt a token into a single storable string.
    pub fn serialize_token(&self, token: &str) -> Result<String, AppError> {
        let sealed = self.encrypt(token)?;
        serde_json::to_string(&sealed)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize token: {}", e)))
    }

    /// Parse and decrypt a stored token string.
    pub fn deserialize_token(&self, serialized: &str) -> Result<String, AppError> {
        let sealed: EncryptedToken = serde_json::from_str(serialized)
            .map_err(|e| AppError::Integrity(format!("malformed sealed token: {}", e)))?;
        self.decrypt(&sealed)
    }
}

fn decode_hex(value: &str, field: &str) -> Result<Vec<u8>, AppError> {
    hex::decode(value).map_err(|_| AppError::Integrity(format!("{} is not valid hex", field)))
}

/// Helper to encrypt an OAuth token pair before storing.
pub fn encrypt_tokens(
    vault: &TokenVault,
    access_token: &str,
    refresh_token: Option<&str>,
) -> Result<(String, Option<String>), AppError> {
    let encrypted_access = vault.serialize_token(access_token)?;
    let encrypted_refresh = refresh_token
        .map(|t| vault.serialize_token(t))
        .transpose()?;
    Ok((encrypted_access, encrypted_refresh))
}

/// Helper to decrypt an OAuth token pair after retrieval.
pub fn decrypt_tokens(
    vault: &TokenVault,
    encrypted_access: &str,
    encrypted_refresh: Option<&str>,
) -> Result<(String, Option<String>), AppError> {
    let access_token = vault.deserialize_token(encrypted_access)?;
    let refresh_token = encrypted_refresh
        .map(|t| vault.deserialize_token(t))
        .transpose()?;
    Ok((access_token, refresh_token))
}
