// Authentication helpers: exchange credentials for a long lived token and
// keep it in the user's data directory so later runs can reuse it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;

const APP_DIR: &str = "zeg";
const TOKEN_FILE: &str = ".auth";

/// Login request payload.
#[derive(Serialize, Debug)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
    pub noexpire: bool,
}

/// Expected response from the token endpoint.
#[derive(Deserialize, Debug)]
pub struct AuthResponse {
    pub token: String,
}

/// Location of the stored token: `<data dir>/zeg/.auth`.
pub fn token_path() -> PathBuf {
    let dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(APP_DIR).join(TOKEN_FILE)
}

/// Persist token into `path`, creating parent directories as needed.
pub fn persist_token(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, token).with_context(|| format!("Failed to write {}", path.display()))?;

    // The token grants full API access.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Load a token from `path`, if one was saved there.
pub fn load_token(path: &Path) -> Option<String> {
    let data = std::fs::read_to_string(path).ok()?;
    let token = data.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// The token to use for this run: the explicit one if given, otherwise the
/// stored one.
pub fn resolve_token(explicit: Option<String>) -> Option<String> {
    explicit.or_else(|| load_token(&token_path()))
}

/// Authenticate and store a long lived token. Returns where it was saved.
pub fn login(api: &ApiClient, username: String, password: String) -> Result<PathBuf> {
    let url = format!("{}/oauth/token/", api.base_url());
    let req = AuthRequest {
        username,
        password,
        noexpire: true,
    };
    let res = api.post_json(&url, &req).context("Failed to send auth request")?;
    let resp: AuthResponse = serde_json::from_value(res).context("Parsing auth response json")?;

    let path = token_path();
    persist_token(&path, &resp.token)?;
    Ok(path)
}
