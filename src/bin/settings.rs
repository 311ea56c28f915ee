// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::args::WalletArgs;
use super::config::Config;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(clap::ValueEnum, Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
    Coloured,
}

#[derive(clap::ValueEnum, Debug, Clone)]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,
    /// Designates lower priority information.
    Debug,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warn,
    /// Designates very serious errors.
    Error,
}

#[derive(Debug)]
pub struct Logging {
    /// Max log level
    pub level: LogLevel,
    /// Log format
    pub format: LogFormat,
}

impl Logging {
    /// Installs the global subscriber. Events go to stderr, `RUST_LOG`
    /// takes precedence over the configured level.
    pub fn init(&self) -> anyhow::Result<()> {
        let filter = EnvFilter::builder()
            .with_default_directive(
                LevelFilter::from_level((&self.level).into()).into(),
            )
            .from_env_lossy();

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        match self.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Plain => builder.with_ansi(false).try_init(),
            LogFormat::Coloured => builder.try_init(),
        }
        .map_err(|e| anyhow!("Cannot install the logger: {}", e))
    }
}

#[derive(Debug)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub node: Url,
    pub database: PathBuf,
    pub logging: Logging,
}

pub struct SettingsBuilder {
    data_dir: PathBuf,
    pub args: WalletArgs,
}

impl SettingsBuilder {
    /// Directory holding the profile configuration and the database
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Merges the parsed arguments over the loaded configuration
    pub fn config(self, config: Config) -> Settings {
        let args = self.args;

        let interactive = args
            .command
            .as_ref()
            .map_or(true, |cmd| cmd.is_interactive());
        let level = args.log_level.unwrap_or(if interactive {
            LogLevel::Warn
        } else {
            LogLevel::Info
        });
        let logging = Logging {
            level,
            format: args.log_type,
        };

        let node = args.rpc_url.unwrap_or(config.node.url);
        let database = args.database.unwrap_or(config.database.path);
        let database = if database.is_relative() {
            self.data_dir.join(database)
        } else {
            database
        };

        Settings {
            data_dir: self.data_dir,
            node,
            database,
            logging,
        }
    }
}

impl Settings {
    pub fn args(args: WalletArgs) -> anyhow::Result<SettingsBuilder> {
        let data_dir = match &args.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .map(|home| home.join(".ethsim"))
                .ok_or_else(|| anyhow!("Cannot find the home directory, please use --data-dir"))?,
        };
        Ok(SettingsBuilder { data_dir, args })
    }
}

impl From<&LogLevel> for Level {
    fn from(level: &LogLevel) -> Level {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Json => "json",
                Self::Plain => "plain",
                Self::Coloured => "coloured",
            }
        )
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Trace => "trace",
                Self::Debug => "debug",
                Self::Info => "info",
                Self::Warn => "warn",
                Self::Error => "error",
            }
        )
    }
}

impl fmt::Display for Logging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Logging: [{}] ({})", self.level, self.format)
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "─".repeat(14);
        writeln!(f, "{separator}")?;
        writeln!(f, "Settings")?;
        writeln!(f, "{separator}")?;
        writeln!(f, "Data directory: {}", self.data_dir.display())?;
        writeln!(f, "Node: {}", self.node)?;
        writeln!(f, "Database: {}", self.database.display())?;
        writeln!(f, "{separator}")?;
        writeln!(f, "{}", self.logging)
    }
}
