// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All configuration is read from the environment once at startup and
//! collected into an [`AppConfig`], which is handed to the components that
//! need it. Loading fails fast with a [`ConfigError`] when a required value
//! is absent or unparseable.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PRIVATE_KEY_PATH` | PEM RSA private key used to decrypt login tokens | Required |
//! | `SESSION_SECRET` | HMAC key for the session cookie (at least 32 bytes) | Required |
//! | `REDIRECT_URI` | Where to send the browser after login; also the CORS origin | Required |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `1323` |
//! | `SESSION_COOKIE_NAME` | Name of the client-visible session id cookie | `WALLET_SESSION_ID` |
//! | `SESSION_DB_PATH` | redb file for persistent sessions (in-memory if unset) | unset |
//! | `SESSION_SWEEP_INTERVAL_SECS` | Expired session purge period | `300` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | Serve HTTPS when both are set | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use rsa::{pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, RsaPrivateKey};
use url::Url;

use crate::logging::LogFormat;

pub const PRIVATE_KEY_PATH_ENV: &str = "PRIVATE_KEY_PATH";
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
pub const REDIRECT_URI_ENV: &str = "REDIRECT_URI";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SESSION_COOKIE_NAME_ENV: &str = "SESSION_COOKIE_NAME";
pub const SESSION_DB_PATH_ENV: &str = "SESSION_DB_PATH";
pub const SESSION_SWEEP_INTERVAL_ENV: &str = "SESSION_SWEEP_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 1323;

/// Client-visible cookie carrying only the opaque session id.
pub const DEFAULT_SESSION_ID_COOKIE: &str = "WALLET_SESSION_ID";

/// HttpOnly cookie carrying the signed session reference.
pub const SESSION_COOKIE: &str = "WALLET_SESSION";

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Shortest accepted `SESSION_SECRET`, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} env var is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("unable to read private key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse private key: {0}")]
    Key(String),
}

/// Certificate and key locations for HTTPS serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Process configuration, constructed once in `main`.
#[derive(Clone)]
pub struct AppConfig {
    pub private_key: RsaPrivateKey,
    pub session_secret: Vec<u8>,
    pub redirect_uri: Url,
    /// Apex domain the session cookies are scoped to (`www.` stripped).
    pub cookie_domain: String,
    /// Origin of `redirect_uri`, the only origin allowed by CORS.
    pub allowed_origin: String,
    pub bind_addr: SocketAddr,
    pub session_id_cookie: String,
    pub session_db_path: Option<PathBuf>,
    pub sweep_interval: Duration,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("cookie_domain", &self.cookie_domain)
            .field("bind_addr", &self.bind_addr)
            .field("session_id_cookie", &self.session_id_cookie)
            .field("session_db_path", &self.session_db_path)
            .field("sweep_interval", &self.sweep_interval)
            .field("tls", &self.tls)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Build a configuration from the three required values, with every
    /// optional setting at its default.
    pub fn new(
        private_key: RsaPrivateKey,
        session_secret: impl Into<Vec<u8>>,
        redirect_uri: &str,
    ) -> Result<Self, ConfigError> {
        let session_secret = session_secret.into();
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: SESSION_SECRET_ENV,
                reason: format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
            });
        }

        let redirect_uri = Url::parse(redirect_uri).map_err(|e| ConfigError::Invalid {
            var: REDIRECT_URI_ENV,
            reason: e.to_string(),
        })?;
        let host = redirect_uri
            .host_str()
            .ok_or_else(|| ConfigError::Invalid {
                var: REDIRECT_URI_ENV,
                reason: "URL has no host".to_string(),
            })?;
        let cookie_domain = apex_domain(host);
        let allowed_origin = redirect_uri.origin().ascii_serialization();

        Ok(Self {
            private_key,
            session_secret,
            redirect_uri,
            cookie_domain,
            allowed_origin,
            bind_addr: SocketAddr::new(DEFAULT_HOST, DEFAULT_PORT),
            session_id_cookie: DEFAULT_SESSION_ID_COOKIE.to_string(),
            session_db_path: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            tls: None,
            log_format: LogFormat::Pretty,
        })
    }

    /// Load the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let key_path = PathBuf::from(required(PRIVATE_KEY_PATH_ENV)?);
        let private_key = load_private_key(&key_path)?;
        let session_secret = required(SESSION_SECRET_ENV)?;
        let redirect_uri = required(REDIRECT_URI_ENV)?;

        let mut config = Self::new(private_key, session_secret, &redirect_uri)?;

        let host: IpAddr = match lookup(HOST_ENV) {
            Some(h) => h.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: HOST_ENV,
                reason: e.to_string(),
            })?,
            None => config.bind_addr.ip(),
        };
        let port: u16 = match lookup(PORT_ENV) {
            Some(p) => p.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        config.bind_addr = SocketAddr::new(host, port);

        if let Some(name) = lookup(SESSION_COOKIE_NAME_ENV).filter(|n| !n.is_empty()) {
            if name == SESSION_COOKIE || !is_cookie_token(&name) {
                return Err(ConfigError::Invalid {
                    var: SESSION_COOKIE_NAME_ENV,
                    reason: format!("`{name}` is not a usable cookie name"),
                });
            }
            config.session_id_cookie = name;
        }

        config.session_db_path = lookup(SESSION_DB_PATH_ENV)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        if let Some(secs) = lookup(SESSION_SWEEP_INTERVAL_ENV) {
            let secs: u64 = secs.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    var: SESSION_SWEEP_INTERVAL_ENV,
                    reason: e.to_string(),
                }
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: SESSION_SWEEP_INTERVAL_ENV,
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.sweep_interval = Duration::from_secs(secs);
        }

        config.tls = match (lookup(TLS_CERT_PATH_ENV), lookup(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.log_format = format.parse().map_err(|reason| ConfigError::Invalid {
                var: LOG_FORMAT_ENV,
                reason,
            })?;
        }

        Ok(config)
    }
}

/// Strip a leading `www.` so cookies cover the apex domain.
pub fn apex_domain(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Read and parse the RSA private key at `path`.
pub fn load_private_key(path: &std::path::Path) -> Result<RsaPrivateKey, ConfigError> {
    let contents = std::fs::read(path).map_err(|source| ConfigError::KeyFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_private_key_pem(&contents)
}

/// Parse a PEM RSA private key, PKCS#8 first and PKCS#1 as a fallback.
pub fn parse_private_key_pem(pem_bytes: &[u8]) -> Result<RsaPrivateKey, ConfigError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| ConfigError::Key(format!("Invalid UTF-8: {e}")))?;

    let pem = pem::parse(pem_str).map_err(|e| ConfigError::Key(format!("Invalid PEM: {e}")))?;

    match pem.tag() {
        "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_der(pem.contents())
            .map_err(|e| ConfigError::Key(format!("Invalid PKCS#8 key: {e}"))),
        "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(pem.contents())
            .map_err(|e| ConfigError::Key(format!("Invalid PKCS#1 key: {e}"))),
        other => Err(ConfigError::Key(format!("unexpected PEM block `{other}`"))),
    }
}

/// RFC 6265 cookie-name token characters.
fn is_cookie_token(name: &str) -> bool {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={} \t";
    name.bytes()
        .all(|b| b.is_ascii_graphic() && !SEPARATORS.contains(&b))
}
