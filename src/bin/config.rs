// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use std::{fs, io};

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct Node {
    pub(crate) url: Url,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct Database {
    pub(crate) path: PathBuf,
}

/// Config holds the settings for the simulator
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Node to talk to
    pub(crate) node: Node,
    /// Where accounts and transactions are kept
    pub(crate) database: Database,
}

fn read_to_string<P: AsRef<Path>>(path: P) -> io::Result<Option<String>> {
    fs::read_to_string(&path)
        .map(Some)
        .or_else(|e| match e.kind() {
            io::ErrorKind::NotFound => Ok(None),
            _ => Err(e),
        })
}

impl Config {
    /// Attempt to load configuration from file, falling back to the user
    /// wide configuration and then to the embedded defaults
    pub fn load(profile: &Path) -> anyhow::Result<Config> {
        let profile = profile.join("config.toml");

        let global_config = dirs::home_dir().map(|mut path| {
            path.push(".config");
            path.push(env!("CARGO_BIN_NAME"));
            path.push("config.toml");
            path
        });

        let mut contents = read_to_string(&profile)?;
        if contents.is_none() {
            if let Some(global) = &global_config {
                contents = read_to_string(global)?;
            }
        }
        let contents = contents.unwrap_or_else(|| {
            include_str!("../../default.config.toml").to_string()
        });

        Ok(toml::from_str(&contents)?)
    }
}
