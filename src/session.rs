use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::utils::ensure_dir;

/// Name of the durable storage entry.
pub const SESSION_FILE: &str = "cms_session.json";
pub const DEFAULT_ROLE: &str = "staff";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub username: String,
    pub campus: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// File-backed store for the single `cms_session` entry.
pub struct SessionStore {
    path: PathBuf,
    remember_token: bool,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>, remember_token: bool) -> Self {
        Self {
            path: path.into(),
            remember_token,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.session_path(), config.remember_token)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            ensure_dir(dir)?;
        }
        let mut stored = session.clone();
        if !self.remember_token {
            stored.token = None;
        }
        let json = serde_json::to_string_pretty(&stored).context("Failed to serialize session")?;
        write_private(&self.path, &json)
            .with_context(|| format!("Failed to write session to {:?}", self.path))
    }

    /// Read the stored entry. Missing, unreadable or malformed data is `None`;
    /// so is a campus that is no longer configured.
    pub fn load(&self, config: &AppConfig) -> Option<Session> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let mut session: Session = serde_json::from_str(&contents).ok()?;
        if session.username.trim().is_empty() {
            return None;
        }
        session.campus = config.resolve_campus(&session.campus)?;
        if !self.remember_token {
            session.token = None;
        }
        Some(session)
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", self.path)),
        }
    }
}

/// Write `contents` readable by the owner only; the entry may hold a bearer token.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // `mode` only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        Session {
            token: Some("tok-123".to_string()),
            username: "alice".to_string(),
            campus: "MC".to_string(),
            role: "admin".to_string(),
        }
    }

    fn store_in(dir: &str, remember_token: bool) -> SessionStore {
        let _ = fs::remove_dir_all(dir);
        SessionStore::new(PathBuf::from(dir).join(SESSION_FILE), remember_token)
    }

    #[test]
    fn test_is_authenticated() {
        let mut session = sample();
        assert!(session.is_authenticated());
        session.token = Some(String::new());
        assert!(!session.is_authenticated());
        session.token = None;
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_role_defaults_to_staff() {
        let session: Session =
            serde_json::from_str(r#"{"token":"t","username":"bob","campus":"YC"}"#).unwrap();
        assert_eq!(session.role, "staff");
    }

    #[test]
    fn test_save_then_load_in_fresh_store() {
        let dir = "test_session_roundtrip";
        store_in(dir, true).save(&sample()).unwrap();

        let fresh = SessionStore::new(PathBuf::from(dir).join(SESSION_FILE), true);
        assert_eq!(fresh.load(&AppConfig::default()), Some(sample()));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_token_not_persisted_when_disabled() {
        let dir = "test_session_no_token";
        let store = store_in(dir, false);
        store.save(&sample()).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("tok-123"));

        let restored = store.load(&AppConfig::default()).unwrap();
        assert_eq!(restored.token, None);
        assert_eq!(restored.campus, "MC");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_malformed_entry_is_absent() {
        let dir = "test_session_malformed";
        let store = store_in(dir, true);
        fs::create_dir_all(dir).unwrap();

        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(&AppConfig::default()), None);

        fs::write(store.path(), r#"{"token":"t","username":"bob","campus":"ZZ"}"#).unwrap();
        assert_eq!(store.load(&AppConfig::default()), None);

        fs::write(store.path(), r#"{"token":"t","username":"  ","campus":"YC"}"#).unwrap();
        assert_eq!(store.load(&AppConfig::default()), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_entry_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = "test_session_permissions";
        let store = store_in(dir, true);
        fs::create_dir_all(dir).unwrap();
        fs::write(store.path(), "{}").unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.save(&sample()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load(&AppConfig::default()), Some(sample()));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = "test_session_clear";
        let store = store_in(dir, true);
        store.save(&sample()).unwrap();

        assert!(store.clear().is_ok());
        assert!(store.clear().is_ok());
        assert_eq!(store.load(&AppConfig::default()), None);

        let _ = fs::remove_dir_all(dir);
    }
}
