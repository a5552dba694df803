//! Google OAuth2 access tokens for the Sheets and Drive APIs.
//!
//! ## Token sources
//!
//! Checked in order:
//! 1. `MAPS_HARVEST_ACCESS_TOKEN` env → used verbatim as a bearer token
//! 2. Service-account key file → an RS256-signed JWT assertion is exchanged
//!    at the key's `token_uri` for a one-hour access token

use std::path::Path;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SheetsError;

/// Scopes requested for the upload: spreadsheet edits plus title lookup.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account JSON key that signing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Load a key downloaded from the Cloud console.
    pub fn from_file(path: &Path) -> Result<Self, SheetsError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SheetsError::Key(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, SheetsError> {
        serde_json::from_str(raw).map_err(|e| SheetsError::Key(e.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Build the signed assertion for the JWT-bearer grant.
pub fn signed_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String, SheetsError> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: SCOPES.join(" "),
        aud: key.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + TOKEN_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SheetsError::Key(format!("private key is not valid RSA PEM: {e}")))?;

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| SheetsError::Key(format!("failed to sign assertion: {e}")))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Where bearer tokens come from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    Static(String),
    ServiceAccount(ServiceAccountKey),
}

impl TokenSource {
    /// `MAPS_HARVEST_ACCESS_TOKEN` if set, else the key at `credentials_path`.
    pub fn resolve(credentials_path: &Path) -> Result<Self, SheetsError> {
        if let Ok(token) = std::env::var("MAPS_HARVEST_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                debug!("using access token from MAPS_HARVEST_ACCESS_TOKEN");
                return Ok(Self::Static(token.trim().to_string()));
            }
        }
        Ok(Self::ServiceAccount(ServiceAccountKey::from_file(
            credentials_path,
        )?))
    }

    /// Obtain a bearer token, exchanging the assertion when needed.
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String, SheetsError> {
        let key = match self {
            Self::Static(token) => return Ok(token.clone()),
            Self::ServiceAccount(key) => key,
        };

        let assertion = signed_assertion(key, chrono::Utc::now().timestamp())?;
        let resp = http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {desc}", e.error),
                    None => e.error,
                })
                .unwrap_or(body);
            return Err(SheetsError::Auth(format!("token endpoint returned {status}: {message}")));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| SheetsError::Auth(format!("unexpected token response: {e}")))?;
        debug!(
            "obtained access token for {} (expires in {:?}s)",
            key.client_email, token.expires_in
        );
        Ok(token.access_token)
    }
}
