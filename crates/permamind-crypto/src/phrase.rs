use bip39::Language;
use rand::RngCore;
use sha3::{Digest, Keccak256};

use permamind_core::constants::{PHRASE_ENTROPY_BITS, PHRASE_WORD_COUNT};
use permamind_core::error::MemoryError;

const ENTROPY_BYTES: usize = PHRASE_ENTROPY_BITS / 8;

/// Lowercases and collapses whitespace so that `"  Foo   Bar"` and `"foo bar"`
/// derive the same key material (§4.1, §4.4).
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Top 4 bits of `Keccak256(entropy)`, used as the phrase checksum (§4.4). A
/// deliberate, documented divergence from standard BIP-39 (which uses
/// SHA-256) — see SPEC_FULL §4.4.
fn checksum_nibble(entropy: &[u8]) -> u8 {
    let digest = Keccak256::digest(entropy);
    digest[0] >> 4
}

/// Draws 128 bits of entropy and encodes a fresh 12-word phrase (§4.4).
pub fn generate_phrase() -> String {
    let mut entropy = [0u8; ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut entropy);
    encode_phrase(&entropy)
}

fn encode_phrase(entropy: &[u8; ENTROPY_BYTES]) -> String {
    let checksum = checksum_nibble(entropy);
    let wordlist = Language::English.word_list();

    let mut bits = Vec::with_capacity(PHRASE_ENTROPY_BITS + 4);
    for byte in entropy {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1);
        }
    }
    for i in (0..4).rev() {
        bits.push((checksum >> i) & 1);
    }

    bits.chunks(11)
        .map(|chunk| {
            let idx = chunk.iter().fold(0usize, |acc, b| (acc << 1) | (*b as usize));
            wordlist[idx]
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reverses [`generate_phrase`], rejecting unknown words and checksum
/// mismatches with distinct error messages (§4.4).
pub fn validate_phrase(phrase: &str) -> Result<(), MemoryError> {
    let normalized = normalize_phrase(phrase);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    if words.len() != PHRASE_WORD_COUNT {
        return Err(MemoryError::BadPhrase(format!(
            "expected {PHRASE_WORD_COUNT} words, got {}",
            words.len()
        )));
    }

    let wordlist = Language::English.word_list();
    let mut bits = Vec::with_capacity(PHRASE_ENTROPY_BITS + 4);
    for word in &words {
        let idx = wordlist
            .iter()
            .position(|w| w == word)
            .ok_or_else(|| MemoryError::BadPhrase(format!("unknown word: {word}")))?;
        for i in (0..11).rev() {
            bits.push(((idx >> i) & 1) as u8);
        }
    }

    let (entropy_bits, checksum_bits) = bits.split_at(PHRASE_ENTROPY_BITS);
    let mut entropy = [0u8; ENTROPY_BYTES];
    for (i, chunk) in entropy_bits.chunks(8).enumerate() {
        entropy[i] = chunk.iter().fold(0u8, |acc, b| (acc << 1) | b);
    }

    let expected = checksum_nibble(&entropy);
    let got = checksum_bits.iter().fold(0u8, |acc, b| (acc << 1) | b);
    if expected != got {
        return Err(MemoryError::BadPhrase("checksum mismatch".to_string()));
    }
    Ok(())
}
