use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::{
    fs::{File, create_dir_all, read_to_string},
    io::AsyncWriteExt,
};
use tracing::debug;

pub(crate) const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "timeclock", "clockctl")
        .ok_or_else(|| anyhow!("Cannot find the home directory of the current user"))
}

/// The location of the clockctl configuration file
pub(crate) fn config_file() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}

/// The database used when none is configured
pub(crate) fn default_database() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("timeclock.sqlite"))
}

#[derive(Deserialize, Serialize, Default, Debug, PartialEq)]
pub struct Config {
    pub database: Option<PathBuf>,
    pub server: Option<String>,
}

impl Config {
    fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).with_context(|| "Couldn't parse json string")
    }

    fn format(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "Couldn't convert config to json")
    }

    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        debug!(?p, "Trying to load config");
        let contents = read_to_string(p).await?;
        Self::parse(&contents)
    }

    /// Loads the config file, falling back to an empty configuration if it
    /// doesn't exist yet
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load_from_file(&path).await {
            Ok(cfg) => Ok(cfg),
            Err(e) => match e.downcast_ref::<std::io::Error>() {
                Some(ioerr) if ioerr.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
                _ => Err(e),
            },
        }
    }

    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        debug!(?path, "Saving config");
        if let Some(parent) = path.parent() {
            create_dir_all(parent).await?;
        }
        let mut file = File::create(path).await?;
        let serialized = self.format()?;
        file.write_all(serialized.as_bytes())
            .await
            .with_context(|| "Failed to write config file")?;
        Ok(())
    }

    /// The database to use, preferring the one given on the command line
    pub fn database(&self, arg: Option<PathBuf>) -> Result<PathBuf> {
        match arg.or_else(|| self.database.clone()) {
            Some(db) => Ok(db),
            None => default_database(),
        }
    }

    /// The server to use, preferring the one given on the command line
    pub fn server(&self, arg: Option<String>) -> String {
        arg.or_else(|| self.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
    }
}
