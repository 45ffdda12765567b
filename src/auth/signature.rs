// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Recovery of the signing wallet from a `personal_sign` signature.
//!
//! Signatures are 65 bytes `r ‖ s ‖ v` over the EIP-191 personal-message
//! digest `keccak256("\x19Ethereum Signed Message:\n" ‖ len ‖ message)`.
//! Wallets emit `v` as 27/28; it is mapped to the 0/1 recovery id before
//! secp256k1 public key recovery.

use alloy::primitives::{eip191_hash_message, keccak256, Address};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use super::{claim::AuthClaim, AuthError};

/// Length of an `r ‖ s ‖ v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Offset of the `v` byte.
const RECOVERY_ID_OFFSET: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),
}

/// EIP-191 digest of `message` as signed by `personal_sign`.
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    eip191_hash_message(message.as_bytes()).0
}

/// Map the yellow-paper `v` (27/28) to a recovery id (0/1).
///
/// Other values pass through unchanged and are rejected by the caller.
pub fn normalize_recovery_byte(v: u8) -> u8 {
    match v {
        27 | 28 => v - 27,
        other => other,
    }
}

/// Derive the account address of a secp256k1 public key.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag; the address is the low 20 bytes.
    let digest = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

fn decode_signature(signature_hex: &str) -> Result<[u8; SIGNATURE_LEN], VerifyError> {
    let bytes = alloy::primitives::hex::decode(signature_hex)
        .map_err(|e| VerifyError::MalformedSignature(format!("invalid hex: {e}")))?;
    <[u8; SIGNATURE_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        VerifyError::MalformedSignature(format!(
            "expected {SIGNATURE_LEN} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Recover the EIP-55 checksummed address that signed `message` with
/// `signature_hex`.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<String, VerifyError> {
    let bytes = decode_signature(signature_hex)?;

    let raw_v = bytes[RECOVERY_ID_OFFSET];
    let v = normalize_recovery_byte(raw_v);
    if v > 1 {
        return Err(VerifyError::RecoveryFailed(format!(
            "invalid recovery byte {raw_v}"
        )));
    }
    let mut recovery_id = RecoveryId::new(v == 1, false);

    let mut signature = Signature::from_slice(&bytes[..RECOVERY_ID_OFFSET])
        .map_err(|e| VerifyError::RecoveryFailed(format!("invalid r/s: {e}")))?;
    // k256 only recovers low-s signatures; negating s flips the parity of R.
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = personal_message_hash(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| VerifyError::RecoveryFailed(e.to_string()))?;

    Ok(address_from_verifying_key(&key).to_checksum(None))
}

/// Check that `claim.signature` was made by `claim.address` over its own
/// address string. Returns the checksummed address on success.
pub fn verify_claim(claim: &AuthClaim) -> Result<String, AuthError> {
    let recovered = recover_address(&claim.address, &claim.signature)?;

    if recovered != claim.address {
        tracing::warn!(
            claimed = %claim.address,
            recovered = %recovered,
            "Signature does not match requesting address (possible spoofing attempt)"
        );
        return Err(AuthError::AddressMismatch {
            claimed: claim.address.clone(),
            recovered,
        });
    }

    Ok(recovered)
}
