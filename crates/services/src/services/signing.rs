//! Ed25519 signatures over canonical JSON.
//!
//! The signed message is the canonical (sorted-key, compact) rendering of the
//! request object with its `signature` field removed. Public keys and
//! signatures travel as hex strings.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde_json::Value;
use utils::canonical;

pub const SIGNATURE_FIELD: &str = "signature";
pub const PUBLIC_KEY_FIELD: &str = "publicKey";

/// Verification seam used by the registry services.
pub trait SignatureVerifier: Send + Sync {
    /// Check the signature of `payload` against the hex key in `key_field`.
    fn verify(&self, payload: &Value, key_field: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, payload: &Value, key_field: &str) -> bool {
        validate_signable_with_key(payload, key_field)
    }
}

/// Bytes that get signed for `payload`.
pub fn signable_message(payload: &Value) -> String {
    canonical::stringify_without(payload, SIGNATURE_FIELD)
}

pub fn validate_signable(payload: &Value) -> bool {
    validate_signable_with_key(payload, PUBLIC_KEY_FIELD)
}

pub fn validate_signable_with_key(payload: &Value, key_field: &str) -> bool {
    let Some(public_key) = payload.get(key_field).and_then(Value::as_str) else {
        return false;
    };
    let Some(signature) = payload.get(SIGNATURE_FIELD).and_then(Value::as_str) else {
        return false;
    };

    let Some(verifying_key) = decode_public_key(public_key) else {
        return false;
    };
    let Some(signature) = decode_signature(signature) else {
        return false;
    };

    verifying_key
        .verify(signable_message(payload).as_bytes(), &signature)
        .is_ok()
}

/// Hex signature of `payload` (any existing `signature` key is ignored).
pub fn sign_value(signing_key: &SigningKey, payload: &Value) -> String {
    let signature = signing_key.sign(signable_message(payload).as_bytes());
    hex::encode(signature.to_bytes())
}

pub fn public_key_hex(signing_key: &SigningKey) -> String {
    hex::encode(signing_key.verifying_key().to_bytes())
}

fn strip_hex_prefix(value: &str) -> &str {
    value.strip_prefix("0x").unwrap_or(value)
}

fn decode_public_key(value: &str) -> Option<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(strip_hex_prefix(value)).ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

fn decode_signature(value: &str) -> Option<Signature> {
    let bytes: [u8; 64] = hex::decode(strip_hex_prefix(value)).ok()?.try_into().ok()?;
    Some(Signature::from_bytes(&bytes))
}
