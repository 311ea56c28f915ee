// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use super::command::Command;
use super::settings::{LogFormat, LogLevel};
use clap::Parser;
use url::Url;

#[derive(Parser, Debug)]
#[clap(version)]
#[clap(name = "Ethereum Wallet Simulator")]
#[clap(about = "Simulate a small Ethereum wallet network on a local test node", long_about = None)]
pub(crate) struct WalletArgs {
    /// Directory to store user data [default: `$HOME/.ethsim`]
    #[clap(short, long)]
    pub data_dir: Option<PathBuf>,

    /// JSON-RPC endpoint of the node
    #[clap(short, long, env = "ETHSIM_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// SQLite database file, relative paths resolve against the data
    /// directory
    #[clap(long)]
    pub database: Option<PathBuf>,

    /// Output log level [default: info, warn in interactive mode]
    #[clap(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Logging output type
    #[clap(long, value_enum, default_value_t = LogFormat::Coloured)]
    pub log_type: LogFormat,

    /// Command
    #[clap(subcommand)]
    pub command: Option<Command>,
}
