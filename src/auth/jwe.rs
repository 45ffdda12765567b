// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Compact JWE decryption of login payloads (RFC 7516).
//!
//! The browser wraps its signed login claim for the server with
//! `RSA-OAEP-256` key encryption and AES-GCM content encryption:
//!
//! ```text
//! BASE64URL(header) . BASE64URL(encrypted CEK) . BASE64URL(IV) . BASE64URL(ciphertext) . BASE64URL(tag)
//! ```
//!
//! Callers get one of two outcomes on failure, [`DecryptError::MalformedToken`]
//! or [`DecryptError::DecryptionFailed`]. The reason strings inside are for
//! server logs only.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// The only key-encryption algorithm accepted.
pub const ALG_RSA_OAEP_256: &str = "RSA-OAEP-256";

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// AES-GCM content-encryption variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncryption {
    A128Gcm,
    A256Gcm,
}

impl ContentEncryption {
    pub fn from_header(enc: &str) -> Option<Self> {
        match enc {
            "A128GCM" => Some(Self::A128Gcm),
            "A256GCM" => Some(Self::A256Gcm),
            _ => None,
        }
    }

    pub fn header_name(self) -> &'static str {
        match self {
            Self::A128Gcm => "A128GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// Content-encryption key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A256Gcm => 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecryptError {
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),

    #[error("decryption failed: {0}")]
    DecryptionFailed(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    #[error("content key wrap failed: {0}")]
    KeyWrap(#[from] rsa::Error),

    #[error("content encryption failed")]
    Content,

    #[error("header serialization failed: {0}")]
    Header(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    enc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crit: Option<Vec<String>>,
}

/// The five decoded segments of a compact JWE.
struct CompactJwe<'a> {
    /// Raw first segment; its ASCII bytes are the AEAD associated data.
    encoded_header: &'a str,
    enc: ContentEncryption,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

impl<'a> CompactJwe<'a> {
    fn parse(token: &'a str) -> Result<Self, DecryptError> {
        if token.is_empty() {
            return Err(DecryptError::MalformedToken("empty token"));
        }

        let segments: Vec<&str> = token.split('.').collect();
        let [encoded_header, encrypted_key, iv, ciphertext, tag] = segments[..] else {
            return Err(DecryptError::MalformedToken("expected five segments"));
        };

        let decode = |segment: &str| {
            Base64UrlUnpadded::decode_vec(segment)
                .map_err(|_| DecryptError::MalformedToken("invalid base64url segment"))
        };

        let header: ProtectedHeader = serde_json::from_slice(&decode(encoded_header)?)
            .map_err(|_| DecryptError::MalformedToken("invalid protected header"))?;
        if header.alg != ALG_RSA_OAEP_256 {
            return Err(DecryptError::MalformedToken("unsupported alg"));
        }
        let enc = ContentEncryption::from_header(&header.enc)
            .ok_or(DecryptError::MalformedToken("unsupported enc"))?;
        if header.zip.is_some() {
            return Err(DecryptError::MalformedToken("compressed payloads are not accepted"));
        }
        if header.crit.is_some() {
            return Err(DecryptError::MalformedToken("critical header extensions are not supported"));
        }

        let encrypted_key = decode(encrypted_key)?;
        if encrypted_key.is_empty() {
            return Err(DecryptError::MalformedToken("missing encrypted key"));
        }
        let iv = decode(iv)?;
        if iv.len() != IV_LEN {
            return Err(DecryptError::MalformedToken("IV must be 96 bits"));
        }
        let ciphertext = decode(ciphertext)?;
        let tag = decode(tag)?;
        if tag.len() != TAG_LEN {
            return Err(DecryptError::MalformedToken("tag must be 128 bits"));
        }

        Ok(Self {
            encoded_header,
            enc,
            encrypted_key,
            iv,
            ciphertext,
            tag,
        })
    }
}

/// Holds the server's RSA key and opens login tokens with it.
pub struct JweDecryptor {
    key: RsaPrivateKey,
}

impl JweDecryptor {
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Public half of the key, for whoever produces tokens.
    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }

    /// Decrypt a compact JWE, returning the plaintext bytes.
    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>, DecryptError> {
        let jwe = CompactJwe::parse(token)?;

        let cek = self
            .key
            .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), &jwe.encrypted_key)
            .map_err(|_| DecryptError::DecryptionFailed("content key unwrap"))?;
        if cek.len() != jwe.enc.key_len() {
            return Err(DecryptError::DecryptionFailed("content key length"));
        }

        let mut sealed = Vec::with_capacity(jwe.ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(&jwe.ciphertext);
        sealed.extend_from_slice(&jwe.tag);

        let nonce = Nonce::from_slice(&jwe.iv);
        let payload = Payload {
            msg: &sealed,
            aad: jwe.encoded_header.as_bytes(),
        };
        let opened = match jwe.enc {
            ContentEncryption::A128Gcm => Aes128Gcm::new_from_slice(&cek)
                .map_err(|_| DecryptError::DecryptionFailed("content key length"))?
                .decrypt(nonce, payload),
            ContentEncryption::A256Gcm => Aes256Gcm::new_from_slice(&cek)
                .map_err(|_| DecryptError::DecryptionFailed("content key length"))?
                .decrypt(nonce, payload),
        };

        opened.map_err(|_| DecryptError::DecryptionFailed("content authentication"))
    }
}

/// Encrypt `plaintext` for the holder of `public_key` as a compact JWE.
///
/// A fresh content key and IV are drawn for every call.
pub fn encrypt(
    public_key: &RsaPublicKey,
    plaintext: &[u8],
    enc: ContentEncryption,
) -> Result<String, EncryptError> {
    let header = ProtectedHeader {
        alg: ALG_RSA_OAEP_256.to_string(),
        enc: enc.header_name().to_string(),
        zip: None,
        crit: None,
    };
    let encoded_header = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header)?);

    let mut cek = vec![0u8; enc.key_len()];
    OsRng.fill_bytes(&mut cek);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let encrypted_key = public_key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), &cek)?;

    let nonce = Nonce::from_slice(&iv);
    let payload = Payload {
        msg: plaintext,
        aad: encoded_header.as_bytes(),
    };
    let mut sealed = match enc {
        ContentEncryption::A128Gcm => Aes128Gcm::new_from_slice(&cek)
            .map_err(|_| EncryptError::Content)?
            .encrypt(nonce, payload),
        ContentEncryption::A256Gcm => Aes256Gcm::new_from_slice(&cek)
            .map_err(|_| EncryptError::Content)?
            .encrypt(nonce, payload),
    }
    .map_err(|_| EncryptError::Content)?;

    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok([
        encoded_header,
        Base64UrlUnpadded::encode_string(&encrypted_key),
        Base64UrlUnpadded::encode_string(&iv),
        Base64UrlUnpadded::encode_string(&sealed),
        Base64UrlUnpadded::encode_string(&tag),
    ]
    .join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{claim::AuthClaim, signature::verify_claim};
    use crate::test_support::{other_rsa_key, sign_personal, test_rsa_key, wallet, WALLET_ADDRESS};

    const PLAINTEXT: &[u8] = br#"{"address":"0x2c7536E3605D9C16a7a3D7b1898e529396a65c23","signature":"0x00"}"#;

    fn decryptor() -> JweDecryptor {
        JweDecryptor::new(test_rsa_key().clone())
    }

    fn segments(token: &str) -> Vec<Vec<u8>> {
        token
            .split('.')
            .map(|s| Base64UrlUnpadded::decode_vec(s).unwrap())
            .collect()
    }

    fn reassemble(segments: &[Vec<u8>]) -> String {
        segments
            .iter()
            .map(|s| Base64UrlUnpadded::encode_string(s))
            .collect::<Vec<_>>()
            .join(".")
    }

    #[test]
    fn round_trips_both_content_encryptions() {
        let decryptor = decryptor();
        for enc in [ContentEncryption::A128Gcm, ContentEncryption::A256Gcm] {
            let token = encrypt(&decryptor.public_key(), PLAINTEXT, enc).unwrap();
            assert_eq!(token.split('.').count(), 5);
            assert_eq!(decryptor.decrypt(&token).unwrap(), PLAINTEXT);
        }
    }

    #[test]
    fn signed_claim_survives_encrypt_decrypt_parse() {
        let decryptor = decryptor();
        let claim = AuthClaim {
            address: WALLET_ADDRESS.to_string(),
            signature: sign_personal(&wallet(), WALLET_ADDRESS, true),
        };
        let token = encrypt(
            &decryptor.public_key(),
            &serde_json::to_vec(&claim).unwrap(),
            ContentEncryption::A256Gcm,
        )
        .unwrap();

        let opened = AuthClaim::parse(&decryptor.decrypt(&token).unwrap()).unwrap();
        assert_eq!(opened, claim);
        assert_eq!(verify_claim(&opened).unwrap(), WALLET_ADDRESS);
    }

    #[test]
    fn tokens_are_randomised() {
        let decryptor = decryptor();
        let a = encrypt(&decryptor.public_key(), PLAINTEXT, ContentEncryption::A256Gcm).unwrap();
        let b = encrypt(&decryptor.public_key(), PLAINTEXT, ContentEncryption::A256Gcm).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn flipping_any_ciphertext_or_tag_bit_fails_decryption() {
        let decryptor = decryptor();
        let token = encrypt(&decryptor.public_key(), PLAINTEXT, ContentEncryption::A256Gcm).unwrap();
        let original = segments(&token);

        for segment in [3, 4] {
            for byte in 0..original[segment].len() {
                for bit in 0..8 {
                    let mut tampered = original.clone();
                    tampered[segment][byte] ^= 1 << bit;
                    assert_eq!(
                        decryptor.decrypt(&reassemble(&tampered)),
                        Err(DecryptError::DecryptionFailed("content authentication")),
                        "segment {segment} byte {byte} bit {bit}"
                    );
                }
            }
        }
    }

    #[test]
    fn tampered_iv_or_wrapped_key_never_decrypts() {
        let decryptor = decryptor();
        let token = encrypt(&decryptor.public_key(), PLAINTEXT, ContentEncryption::A128Gcm).unwrap();
        let original = segments(&token);

        for segment in [1, 2] {
            for byte in [0, original[segment].len() / 2, original[segment].len() - 1] {
                let mut tampered = original.clone();
                tampered[segment][byte] ^= 0x01;
                assert!(
                    matches!(
                        decryptor.decrypt(&reassemble(&tampered)),
                        Err(DecryptError::DecryptionFailed(_))
                    ),
                    "segment {segment} byte {byte}"
                );
            }
        }
    }

    #[test]
    fn header_is_authenticated() {
        let decryptor = decryptor();
        let token = encrypt(&decryptor.public_key(), PLAINTEXT, ContentEncryption::A256Gcm).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[0] = Base64UrlUnpadded::encode_string(br#"{"enc":"A256GCM","alg":"RSA-OAEP-256"}"#);

        assert_eq!(
            decryptor.decrypt(&parts.join(".")),
            Err(DecryptError::DecryptionFailed("content authentication"))
        );
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let token = encrypt(
            &other_rsa_key().to_public_key(),
            PLAINTEXT,
            ContentEncryption::A256Gcm,
        )
        .unwrap();
        assert_eq!(
            decryptor().decrypt(&token),
            Err(DecryptError::DecryptionFailed("content key unwrap"))
        );
    }

    #[test]
    fn structural_problems_are_malformed() {
        let decryptor = decryptor();
        let valid = encrypt(&decryptor.public_key(), PLAINTEXT, ContentEncryption::A256Gcm).unwrap();
        let parts: Vec<&str> = valid.split('.').collect();
        let with_header = |header: &[u8]| {
            let mut p: Vec<String> = parts.iter().map(|s| s.to_string()).collect();
            p[0] = Base64UrlUnpadded::encode_string(header);
            p.join(".")
        };

        let cases = vec![
            String::new(),
            "not-a-jwe".to_string(),
            parts[..4].join("."),
            format!("{valid}.extra"),
            format!("{}.!!!.{}.{}.{}", parts[0], parts[2], parts[3], parts[4]),
            with_header(b"not json"),
            with_header(br#"{"alg":"RSA1_5","enc":"A256GCM"}"#),
            with_header(br#"{"alg":"RSA-OAEP-256","enc":"A256CBC-HS512"}"#),
            with_header(br#"{"alg":"RSA-OAEP-256","enc":"A256GCM","zip":"DEF"}"#),
            with_header(br#"{"alg":"RSA-OAEP-256","enc":"A256GCM","crit":["exp"]}"#),
            format!("{}.{}.{}.{}.{}", parts[0], parts[1], Base64UrlUnpadded::encode_string(&[0u8; 8]), parts[3], parts[4]),
            format!("{}.{}.{}.{}.{}", parts[0], parts[1], parts[2], parts[3], Base64UrlUnpadded::encode_string(&[0u8; 12])),
            format!("{}..{}.{}.{}", parts[0], parts[2], parts[3], parts[4]),
        ];

        for token in cases {
            assert!(
                matches!(decryptor.decrypt(&token), Err(DecryptError::MalformedToken(_))),
                "{token:?} should be malformed"
            );
        }
    }
}
