use std::path::{Path, PathBuf};
use std::{env, fs};

use directories::ProjectDirs;
use lazy_static::lazy_static;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/send-email";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    /// Where snapshots are POSTed.
    pub endpoint: String,
    /// Schema file replacing the embedded one.
    #[serde(default)]
    pub schema: Option<PathBuf>,
    pub tick_rate: f64,
    pub frame_rate: f64,
    pub request_timeout_secs: u64,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(&get_config_dir(), &get_data_dir())
    }

    /// Defaults, then `config.json5` / `config.toml` in `config_dir`, then
    /// `INTAKE_WIZARD__*` environment variables.
    pub fn load(config_dir: &Path, data_dir: &Path) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("tick_rate", 4.0)?
            .set_default("frame_rate", 30.0)?
            .set_default("request_timeout_secs", 15)?;

        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.toml", config::FileFormat::Toml),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
            if config_dir.join(file).exists() {
                found_config = true
            }
        }
        if !found_config {
            debug!(dir = %config_dir.display(), "no configuration file found, using defaults");
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&PROJECT_NAME)
                .prefix_separator("__")
                .separator("__"),
        );

        let cfg: Self = builder.build()?.try_deserialize()?;
        for (key, rate) in [("tick_rate", cfg.tick_rate), ("frame_rate", cfg.frame_rate)] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(config::ConfigError::Message(format!(
                    "{key} must be a positive number, got {rate}"
                )));
            }
        }
        Ok(cfg)
    }
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "intake", env!("CARGO_PKG_NAME"))
}

pub fn ensure_data_and_config_dirs_exist() -> std::io::Result<()> {
    let data_dir = get_data_dir();
    let config_dir = get_config_dir();

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_apply_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path(), dir.path()).unwrap();
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.request_timeout_secs, 15);
        assert!(cfg.schema.is_none());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "endpoint = \"http://example.test/api/send-email\"\nframe_rate = 10.0\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path(), dir.path()).unwrap();
        assert_eq!(cfg.endpoint, "http://example.test/api/send-email");
        assert_eq!(cfg.frame_rate, 10.0);
        assert_eq!(cfg.tick_rate, 4.0);
    }

    #[test]
    fn zero_rates_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "tick_rate = 0.0\n").unwrap();
        let err = Config::load(dir.path(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("tick_rate"), "{err}");

        fs::write(dir.path().join("config.toml"), "frame_rate = -5.0\n").unwrap();
        assert!(Config::load(dir.path(), dir.path()).is_err());
    }
}
