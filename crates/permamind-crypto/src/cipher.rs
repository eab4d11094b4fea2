use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use permamind_core::constants::{NONCE_LEN, TAG_LEN};
use permamind_core::error::MemoryError;

/// Encrypts `plaintext` under `key`, returning `nonce || ciphertext || tag`
/// (§4.2). A fresh random nonce is drawn on every call.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .expect("chacha20poly1305 encryption does not fail");

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypts a `nonce || ciphertext || tag` blob produced by [`encrypt`]. Any
/// nonce/key mismatch or tag failure returns `CipherTampered` — decryption
/// never silently returns garbage (§4.2).
pub fn decrypt(key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>, MemoryError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(MemoryError::CipherTampered);
    }
    let (nonce_bytes, rest) = blob.split_at(NONCE_LEN);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), rest)
        .map_err(|_| MemoryError::CipherTampered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [7u8; 32];
        let msg = b"the quick brown fox";
        let blob = encrypt(&key, msg);
        assert_eq!(decrypt(&key, &blob).unwrap(), msg);
    }

    #[test]
    fn fresh_nonce_each_call() {
        let key = [3u8; 32];
        let a = encrypt(&key, b"same message");
        let b = encrypt(&key, b"same message");
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = [9u8; 32];
        let mut blob = encrypt(&key, b"integrity matters");
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(matches!(decrypt(&key, &blob), Err(MemoryError::CipherTampered)));
    }

    #[test]
    fn wrong_key_fails() {
        let blob = encrypt(&[1u8; 32], b"secret");
        assert!(matches!(
            decrypt(&[2u8; 32], &blob),
            Err(MemoryError::CipherTampered)
        ));
    }

    #[test]
    fn overhead_is_constant_28_bytes() {
        let key = [0u8; 32];
        let blob = encrypt(&key, b"abc");
        assert_eq!(blob.len(), 3 + 28);
    }
}
