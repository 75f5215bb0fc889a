use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf};
use tracing::debug;

pub const URL_ENV: &str = "SUPABASE_URL";
pub const ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

// Keeps the key out of debug logs.
impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "dealboard", "dealboard")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Loads the file and applies `SUPABASE_URL`/`SUPABASE_ANON_KEY`.
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let mut config = Self::read_file(path.as_ref())?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Loads the file exactly as written, ignoring the environment.
    pub fn load_without_env<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config = Self::read_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &std::path::Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Replaces backend settings with values found through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(URL_ENV).filter(|v| !v.is_empty()) {
            debug!("Using {} from environment", URL_ENV);
            self.supabase.url = url;
        }
        if let Some(key) = lookup(ANON_KEY_ENV).filter(|v| !v.is_empty()) {
            debug!("Using {} from environment", ANON_KEY_ENV);
            self.supabase.anon_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.supabase.url.trim().is_empty() {
            bail!("Missing supabase.url (or {} environment variable)", URL_ENV);
        }
        if self.supabase.anon_key.trim().is_empty() {
            bail!(
                "Missing supabase.anon_key (or {} environment variable)",
                ANON_KEY_ENV
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
supabase:
  url: "https://abc.supabase.co"
  anon_key: "public-anon-key"
currency: "EUR"
data_path: "/tmp/dealboard"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.supabase.url, "https://abc.supabase.co");
        assert_eq!(config.supabase.anon_key, "public-anon-key");
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/dealboard"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_and_validation() {
        let config: AppConfig = serde_yaml::from_str("data_path: null\n").unwrap();
        assert_eq!(config.currency, "USD");
        assert!(config.supabase.url.is_empty());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("supabase.url"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config: AppConfig = serde_yaml::from_str(
            r#"
supabase:
  url: "https://file.supabase.co"
  anon_key: "file-key"
"#,
        )
        .unwrap();

        config.apply_env_overrides(|key| match key {
            URL_ENV => Some("http://localhost:54321".to_string()),
            ANON_KEY_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.supabase.url, "http://localhost:54321");
        assert_eq!(config.supabase.anon_key, "file-key");
    }

    #[test]
    fn test_load_without_env_reads_file_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "supabase:\n  url: \"http://127.0.0.1:54321\"\n  anon_key: \"file-key\"\n",
        )
        .unwrap();

        let config = AppConfig::load_without_env(&path).unwrap();
        assert_eq!(config.supabase.url, "http://127.0.0.1:54321");
        assert_eq!(config.supabase.anon_key, "file-key");

        fs::write(&path, "currency: \"EUR\"\n").unwrap();
        assert!(AppConfig::load_without_env(&path).is_err());
    }

    #[test]
    fn test_debug_output_hides_anon_key() {
        let config: AppConfig = serde_yaml::from_str(
            r#"
supabase:
  url: "https://abc.supabase.co"
  anon_key: "secret-anon-key"
"#,
        )
        .unwrap();

        let printed = format!("{config:#?}");
        assert!(printed.contains("https://abc.supabase.co"));
        assert!(!printed.contains("secret-anon-key"));
        assert!(printed.contains("<redacted>"));
    }
}
