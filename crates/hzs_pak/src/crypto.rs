//! AES-256-ECB decryption of index blocks and encrypted payloads.

use std::{fmt, str::FromStr};

use aes::cipher::{BlockDecrypt, KeyInit};
use aes::{Aes256, Block};
use tracing::trace;

use crate::error::Error;

/// Size of a cipher block in bytes
pub const BLOCK_SIZE: usize = 16;

/// The single key the game ships its paks with
pub const DEFAULT_KEY: AesKey = AesKey([
    0x32, 0x11, 0x66, 0xCA, 0xCD, 0x1E, 0x2B, 0xBE, 0xAC, 0x97, 0x94, 0xAA, 0xF4, 0x68, 0xDE, 0x27,
    0x70, 0x01, 0xD2, 0xEF, 0x8F, 0x74, 0xA8, 0xD6, 0xB3, 0xCC, 0x6E, 0xDF, 0xE8, 0x79, 0x45, 0xCA,
]);

/// A 256-bit AES key
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AesKey(pub [u8; 32]);

impl Default for AesKey {
    fn default() -> Self {
        DEFAULT_KEY
    }
}

// Keys are never printed in full.
impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AesKey({:02X}{:02X}..)", self.0[0], self.0[1])
    }
}

impl FromStr for AesKey {
    type Err = Error;

    /// Parses a key from 64 hex characters, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let mut key = [0u8; 32];
        hex::decode_to_slice(digits, &mut key)
            .map_err(|e| Error::CustomError(format!("invalid aes key: {e}")))?;
        Ok(AesKey(key))
    }
}

/// Decrypts buffers with a fixed key in electronic-codebook mode
#[derive(Clone)]
pub struct Decryptor {
    cipher: Aes256,
}

impl fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Decryptor")
    }
}

impl Decryptor {
    /// Create a decryptor for the given key
    pub fn new(key: &AesKey) -> Self {
        Self {
            cipher: Aes256::new(&key.0.into()),
        }
    }

    /// Decrypt `data` in place.
    ///
    /// The buffer is zero-padded up to the next block boundary for the
    /// duration of the decryption and truncated back afterwards, so the
    /// returned length always equals the input length.
    pub fn decrypt(&self, mut data: Vec<u8>) -> Vec<u8> {
        let len = data.len();
        data.resize(len.next_multiple_of(BLOCK_SIZE), 0);

        for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.decrypt_block(Block::from_mut_slice(chunk));
        }

        data.truncate(len);
        trace!(len, "decrypted buffer");
        data
    }

    /// Decrypt `data` only when `encrypted` is set, passing it through otherwise.
    pub fn decrypt_if(&self, encrypted: bool, data: Vec<u8>) -> Vec<u8> {
        if encrypted {
            self.decrypt(data)
        } else {
            data
        }
    }
}
