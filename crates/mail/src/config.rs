//! OAuth client configuration
//!
//! Supports loading the OAuth client from (in order of priority):
//! 1. Compile-time embedded values (for production builds)
//! 2. JSON file (Google Cloud Console format)
//! 3. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::gmail::auth::DEFAULT_SCOPES;

/// Credentials filename in the Postbox config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Origin the app is served from when nothing else says otherwise
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:8080";

/// Route the provider redirects to after authorization
pub const CALLBACK_PATH: &str = "/auth/callback";

/// OAuth client used by the implicit-grant login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Scheme, host and port of the app, e.g. `http://localhost:8080`
    pub app_origin: String,
    pub scopes: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    #[serde(default)]
    javascript_origins: Vec<String>,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>, app_origin: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            app_origin: app_origin.into().trim_end_matches('/').to_string(),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }

    /// Load the client using the following priority:
    /// 1. Compile-time embedded values
    /// 2. JSON file (~/.config/postbox/google-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(config) = Self::from_compile_time() {
            return Ok(config);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Build with: GOOGLE_CLIENT_ID=xxx POSTBOX_APP_ORIGIN=https://mail.example.com cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID").filter(|id| !id.is_empty())?;
        let origin = option_env!("POSTBOX_APP_ORIGIN")
            .filter(|o| !o.is_empty())
            .unwrap_or(DEFAULT_APP_ORIGIN);
        Some(Self::new(client_id, origin))
    }

    /// Load the client from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Browser clients are "web"; desktop clients are "installed"
        let section = creds
            .web
            .or(creds.installed)
            .context("Credentials file missing 'web' or 'installed' section")?;

        let origin = section
            .javascript_origins
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_APP_ORIGIN.to_string());
        Ok(Self::new(section.client_id, origin))
    }

    /// Parse the client from a JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load the client from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let origin =
            std::env::var("POSTBOX_APP_ORIGIN").unwrap_or_else(|_| DEFAULT_APP_ORIGIN.to_string());
        Ok(Self::new(client_id, origin))
    }

    /// Where the provider sends the browser after authorization
    pub fn redirect_uri(&self) -> String {
        format!("{}{}", self.app_origin, CALLBACK_PATH)
    }

    /// Default credentials file path (~/.config/postbox/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    /// Check if a client is configured (compile-time, file, or env vars)
    pub fn is_available() -> bool {
        Self::from_compile_time().is_some()
            || config::config_exists(CREDENTIALS_FILE)
            || std::env::var("GMAIL_CLIENT_ID").is_ok()
    }
}
