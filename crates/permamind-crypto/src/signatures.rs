use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use permamind_core::error::MemoryError;
use permamind_core::types::{RecoverableSignature, WalletId};

use crate::keymaterial::{wallet_id_from_verifying_key, KeyMaterial};

/// 32-byte content hash signed in place of the raw payload (§4.3).
pub fn content_hash(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Signs `data` with the derived keypair, producing a 65-byte recoverable
/// signature (§4.3).
pub fn sign(material: &KeyMaterial, data: &[u8]) -> Result<RecoverableSignature, MemoryError> {
    let hash = content_hash(data);
    let (sig, recovery_id) = material
        .signing_key()
        .sign_prehash_recoverable(&hash)
        .map_err(|e| MemoryError::Other(format!("signing failed: {e}")))?;

    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(&sig.to_bytes());
    bytes[64] = recovery_id.to_byte();
    Ok(RecoverableSignature(bytes))
}

/// Recovers the signer's public key from `signature` and the recomputed
/// content hash of `data`, derives its wallet identifier, and compares it
/// case-insensitively against `expected`. Any parse error or recovery failure
/// returns `false` rather than propagating (§4.3) — callers never decrypt
/// before this check passes (§7: "signature-check comes first").
pub fn verify(data: &[u8], signature: &RecoverableSignature, expected: &WalletId) -> bool {
    try_verify(data, signature, expected).unwrap_or(false)
}

fn try_verify(data: &[u8], signature: &RecoverableSignature, expected: &WalletId) -> Option<bool> {
    let hash = content_hash(data);
    let sig = Signature::from_slice(&signature.0[..64]).ok()?;
    let recovery_id = RecoveryId::from_byte(signature.0[64])?;
    let recovered = VerifyingKey::recover_from_prehash(&hash, &sig, recovery_id).ok()?;
    let wallet = wallet_id_from_verifying_key(&recovered);
    Some(wallet.eq_ignore_case(expected))
}
