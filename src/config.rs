use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "https://school-policy-worker-v2.shokbhl.workers.dev/api";
const DEFAULT_AUTH_URL: &str = "https://school-policy-worker-v2.shokbhl.workers.dev/auth";

/// Application configuration, loaded from `cmschat.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Query endpoint of the policy worker.
    pub api_url: String,
    /// Dedicated login endpoint. When unset, logins are posted to `api_url`
    /// with `mode = "login"`.
    pub auth_url: Option<String>,
    pub campuses: Vec<String>,
    /// Persist the session token so the next start skips the login screen.
    pub remember_token: bool,
    /// Directory holding the `cms_session` entry. Empty means the platform data dir.
    pub session_dir: String,
    pub log_dir: String,
    pub enable_logging: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: Some(DEFAULT_AUTH_URL.to_string()),
            campuses: ["YC", "MC", "TC", "SC", "WC"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            remember_token: true,
            session_dir: String::new(),
            log_dir: "logs".to_string(),
            enable_logging: true,
        }
    }
}

impl AppConfig {
    /// Load configuration with the chain: `./cmschat.toml` -> `~/cmschat.toml` -> defaults,
    /// then apply `CMS_API_URL` / `CMS_AUTH_URL` from the environment.
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_env();
        config
    }

    fn load_file() -> Self {
        for path in &Self::config_paths() {
            if let Ok(contents) = fs::read_to_string(path) {
                match toml::from_str::<AppConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CMS_API_URL") {
            if !url.trim().is_empty() {
                self.api_url = url.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("CMS_AUTH_URL") {
            // An empty value switches to the single-endpoint login
            let url = url.trim();
            self.auth_url = (!url.is_empty()).then(|| url.to_string());
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("cmschat.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("cmschat.toml"));
        }
        paths
    }

    /// Normalize a campus code and check it against the configured list.
    pub fn resolve_campus(&self, campus: &str) -> Option<String> {
        let code = campus.trim().to_uppercase();
        self.campuses
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&code))
            .then_some(code)
    }

    pub fn session_path(&self) -> PathBuf {
        let dir = if self.session_dir.trim().is_empty() {
            dirs::data_dir()
                .map(|d| d.join("cms-policy-chat"))
                .unwrap_or_else(|| PathBuf::from(".cms-policy-chat"))
        } else {
            PathBuf::from(&self.session_dir)
        };
        dir.join(crate::session::SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.auth_url.as_deref(), Some(DEFAULT_AUTH_URL));
        assert_eq!(cfg.campuses, vec!["YC", "MC", "TC", "SC", "WC"]);
        assert!(cfg.remember_token);
        assert!(cfg.session_dir.is_empty());
        assert_eq!(cfg.log_dir, "logs");
        assert!(cfg.enable_logging);
    }

    #[test]
    fn test_partial_toml_deserialize() {
        let toml_str = r#"
            api_url = "http://localhost:8787/api"
            remember_token = false
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.api_url, "http://localhost:8787/api");
        assert!(!cfg.remember_token);
        // Other fields should be defaults
        assert_eq!(cfg.auth_url.as_deref(), Some(DEFAULT_AUTH_URL));
        assert_eq!(cfg.campuses.len(), 5);
    }

    #[test]
    fn test_full_toml_deserialize() {
        let toml_str = r#"
            api_url = "https://example.com/api"
            auth_url = "https://example.com/auth"
            campuses = ["AA", "BB"]
            remember_token = false
            session_dir = "state"
            log_dir = "my_logs"
            enable_logging = false
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.api_url, "https://example.com/api");
        assert_eq!(cfg.auth_url.as_deref(), Some("https://example.com/auth"));
        assert_eq!(cfg.campuses, vec!["AA", "BB"]);
        assert!(!cfg.remember_token);
        assert_eq!(cfg.session_dir, "state");
        assert_eq!(cfg.log_dir, "my_logs");
        assert!(!cfg.enable_logging);
        assert_eq!(cfg.session_path(), PathBuf::from("state").join("cms_session.json"));
    }

    #[test]
    fn test_resolve_campus() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.resolve_campus("yc").as_deref(), Some("YC"));
        assert_eq!(cfg.resolve_campus(" MC ").as_deref(), Some("MC"));
        assert_eq!(cfg.resolve_campus("ZZ"), None);
        assert_eq!(cfg.resolve_campus(""), None);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        // When no config file exists, load() returns defaults
        let cfg = AppConfig::load();
        assert_eq!(cfg.campuses, AppConfig::default().campuses);
    }
}
