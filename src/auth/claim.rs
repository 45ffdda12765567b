// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login claim carried inside the encrypted token.

use serde::{Deserialize, Serialize};

/// `{address, signature}` as produced by the wallet login page.
///
/// `signature` is the wallet's `personal_sign` over the `address` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaim {
    pub address: String,
    pub signature: String,
}

#[derive(Debug, thiserror::Error)]
#[error("malformed claim: {0}")]
pub struct ParseError(#[from] serde_json::Error);

impl AuthClaim {
    /// Parse decrypted plaintext. Both fields are required strings.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_claim() {
        let claim = AuthClaim::parse(
            br#"{"address":"0x2c7536E3605D9C16a7a3D7b1898e529396a65c23","signature":"0xabcd","nonce":1}"#,
        )
        .unwrap();
        assert_eq!(claim.address, "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
        assert_eq!(claim.signature, "0xabcd");
    }

    #[test]
    fn rejects_incomplete_or_mistyped_claims() {
        let cases: [&[u8]; 7] = [
            b"",
            b"not json",
            br#"{"address":"0xabc"}"#,
            br#"{"signature":"0xabc"}"#,
            br#"{"address":42,"signature":"0xabc"}"#,
            br#"{"address":"0xabc","signature":null}"#,
            br#"{"address":"0xabc","signature":["0xdef"]}"#,
        ];
        for bytes in cases {
            assert!(
                AuthClaim::parse(bytes).is_err(),
                "{:?} should not parse",
                String::from_utf8_lossy(bytes)
            );
        }
    }
}
