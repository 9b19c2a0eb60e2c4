use std::env;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_RECIPIENT_PATH: &str = "requestorInfo.email";

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailerKind {
    #[default]
    Outbox,
    Log,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DispatchConfig {
    pub bind: String,
    /// Receives every request and is cc'd on the submitter copy.
    pub operator_address: String,
    pub from_address: String,
    /// Dotted path into the snapshot holding the submitter's address.
    pub recipient_path: String,
    pub mailer: MailerKind,
    pub outbox_dir: PathBuf,
}

impl DispatchConfig {
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(&get_config_dir(), &get_data_dir())
    }

    /// Defaults, then `config.json5` / `config.toml` in `config_dir`, then
    /// `DISPATCH__*` environment variables.
    pub fn load(config_dir: &Path, data_dir: &Path) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("bind", DEFAULT_BIND)?
            .set_default("operator_address", "operator@localhost")?
            .set_default("from_address", "intake@localhost")?
            .set_default("recipient_path", DEFAULT_RECIPIENT_PATH)?
            .set_default("mailer", "outbox")?
            .set_default(
                "outbox_dir",
                data_dir.join("outbox").to_string_lossy().to_string(),
            )?;

        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.toml", config::FileFormat::Toml),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            builder = builder.add_source(
                config::File::from(config_dir.join(file))
                    .format(*format)
                    .required(false),
            );
            if config_dir.join(file).exists() {
                found_config = true;
            }
        }
        if !found_config {
            debug!(dir = %config_dir.display(), "no configuration file found, using defaults");
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DISPATCH")
                .prefix_separator("__")
                .separator("__"),
        );
        builder.build()?.try_deserialize()
    }
}

pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("DISPATCH_DATA") {
        PathBuf::from(dir)
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = env::var("DISPATCH_CONFIG") {
        PathBuf::from(dir)
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "intake", env!("CARGO_PKG_NAME"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_point_the_outbox_into_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DispatchConfig::load(dir.path(), dir.path()).unwrap();
        assert_eq!(cfg.bind, DEFAULT_BIND);
        assert_eq!(cfg.recipient_path, DEFAULT_RECIPIENT_PATH);
        assert_eq!(cfg.mailer, MailerKind::Outbox);
        assert_eq!(cfg.outbox_dir, dir.path().join("outbox"));
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "operator_address = \"desk@example.org\"\nmailer = \"log\"\n",
        )
        .unwrap();
        let cfg = DispatchConfig::load(dir.path(), dir.path()).unwrap();
        assert_eq!(cfg.operator_address, "desk@example.org");
        assert_eq!(cfg.mailer, MailerKind::Log);
    }
}
