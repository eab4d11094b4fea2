pub mod cipher;
pub mod keymaterial;
pub mod phrase;
pub mod signatures;

pub use cipher::{decrypt, encrypt};
pub use keymaterial::{derive_symmetric_key, wallet_id_from_verifying_key, KeyMaterial};
pub use phrase::{generate_phrase, normalize_phrase, validate_phrase};
pub use signatures::{content_hash, sign, verify};
