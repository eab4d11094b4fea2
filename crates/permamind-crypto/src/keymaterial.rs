use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use permamind_core::config::PasswordHashParams;
use permamind_core::constants::{IDENTITY_HKDF_INFO, IDENTITY_HKDF_SALT, PRIVATE_KEY_LEN, WALLET_ID_LEN};
use permamind_core::error::MemoryError;
use permamind_core::types::WalletId;

use crate::phrase::normalize_phrase;

/// `last_20_bytes(keccak256(pubkey.x || pubkey.y))` (§4.1).
pub fn wallet_id_from_verifying_key(key: &VerifyingKey) -> WalletId {
    let uncompressed = key.to_encoded_point(false);
    let xy = &uncompressed.as_bytes()[1..]; // strip the 0x04 SEC1 prefix
    let digest = Keccak256::digest(xy);
    let mut bytes = [0u8; WALLET_ID_LEN];
    bytes.copy_from_slice(&digest[digest.len() - WALLET_ID_LEN..]);
    WalletId::from_bytes(bytes)
}

/// Derives the 32-byte secp256k1 private key scalar from a normalized
/// recovery phrase via extract-then-expand HKDF with fixed salt/info (§4.1).
fn derive_private_key_bytes(normalized_phrase: &str) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(Some(IDENTITY_HKDF_SALT.as_bytes()), normalized_phrase.as_bytes());
    let mut okm = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    hk.expand(IDENTITY_HKDF_INFO.as_bytes(), &mut *okm)
        .expect("HKDF-SHA256 expand of 32 bytes never fails");
    okm
}

/// A derived signing identity: the secp256k1 keypair and its wallet
/// identifier. The private key scalar never leaves this type except through
/// [`sign`](crate::signatures::sign), which takes `&KeyMaterial` directly.
pub struct KeyMaterial {
    signing_key: SigningKey,
    wallet_id: WalletId,
}

impl KeyMaterial {
    /// Deterministically derives the keypair from a recovery phrase (§4.1).
    pub fn derive(phrase: &str) -> Result<Self, MemoryError> {
        let normalized = normalize_phrase(phrase);
        let sk_bytes = derive_private_key_bytes(&normalized);
        let signing_key = SigningKey::from_bytes((&*sk_bytes).into())
            .map_err(|e| MemoryError::Other(format!("invalid derived private key: {e}")))?;
        let wallet_id = wallet_id_from_verifying_key(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            wallet_id,
        })
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Compressed SEC1 public key bytes (33 bytes).
    pub fn public_key_compressed(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    /// Raw private key scalar, for the one caller allowed to see it: the
    /// recovery-time comparison against a decrypted identity record (§4.8.5
    /// step 3). Wrapped in `Zeroizing` so the copy scrubs itself on drop.
    pub fn private_key_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LEN]> {
        let mut bytes = [0u8; PRIVATE_KEY_LEN];
        bytes.copy_from_slice(&self.signing_key.to_bytes());
        Zeroizing::new(bytes)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial(wallet={})", self.wallet_id)
    }
}

/// Derives the symmetric data-encryption key from the lowercased,
/// space-joined phrase and a random salt via a memory-hard password hash
/// (§4.1). The salt is generated once at initialization and persisted
/// alongside the encrypted identity (never derived — it is pure randomness).
pub fn derive_symmetric_key(
    phrase: &str,
    salt: &[u8],
    params: &PasswordHashParams,
) -> Result<Zeroizing<[u8; 32]>, MemoryError> {
    let normalized = normalize_phrase(phrase);
    let argon_params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.parallelism,
        Some(params.output_len),
    )
    .map_err(|e| MemoryError::Other(format!("invalid KDF params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut out = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(normalized.as_bytes(), salt, &mut *out)
        .map_err(|e| MemoryError::Other(format!("password hashing failed: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn derivation_is_deterministic() {
        let a = KeyMaterial::derive(PHRASE).unwrap();
        let b = KeyMaterial::derive(PHRASE).unwrap();
        assert_eq!(a.wallet_id(), b.wallet_id());
        assert_eq!(*a.private_key_bytes(), *b.private_key_bytes());
    }

    #[test]
    fn different_phrases_derive_different_wallets() {
        let a = KeyMaterial::derive(PHRASE).unwrap();
        let b = KeyMaterial::derive("zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong").unwrap();
        assert_ne!(a.wallet_id(), b.wallet_id());
    }

    #[test]
    fn wallet_id_hex_format() {
        let a = KeyMaterial::derive(PHRASE).unwrap();
        let hex = a.wallet_id().to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 42);
        assert_eq!(hex, hex.to_lowercase());
    }

    #[test]
    fn symmetric_key_deterministic_for_same_salt() {
        let params = PasswordHashParams::default();
        let salt = [1u8; 16];
        let k1 = derive_symmetric_key(PHRASE, &salt, &params).unwrap();
        let k2 = derive_symmetric_key(PHRASE, &salt, &params).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn symmetric_key_differs_for_different_salt() {
        let params = PasswordHashParams::default();
        let k1 = derive_symmetric_key(PHRASE, &[1u8; 16], &params).unwrap();
        let k2 = derive_symmetric_key(PHRASE, &[2u8; 16], &params).unwrap();
        assert_ne!(*k1, *k2);
    }
}
