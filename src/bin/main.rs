// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

mod args;
mod command;
mod config;
mod interactive;
mod io;
mod menu;
mod settings;

pub(crate) use command::{Command, RunResult};
pub(crate) use menu::Menu;

use std::fs;

use clap::Parser;
use tracing::info;

use eth_wallet_sim::{HttpClient, Simulator, Store};

use crate::args::WalletArgs;
use crate::config::Config;
use crate::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = exec().await {
        // display the error message (if any)
        println!("{}", err);
        // give cursor back to the user
        io::prompt::show_cursor()?;
    }
    Ok(())
}

async fn exec() -> anyhow::Result<()> {
    // parse user args
    let args = WalletArgs::parse();
    let cmd = args.command.clone().unwrap_or(Command::Interactive);

    // data directory needs to be clear from the start
    let settings_builder = Settings::args(args)?;
    let data_dir = settings_builder.data_dir();
    fs::create_dir_all(data_dir)?;

    // load configuration (or use default) and merge the args over it
    let cfg = Config::load(data_dir)?;
    let settings = settings_builder.config(cfg);

    settings.logging.init()?;
    info!(node = %settings.node, database = %settings.database.display(), "starting");

    let store = Store::open(&settings.database).await?;
    let client = HttpClient::new(settings.node.clone());
    let mut sim = Simulator::new(client, store);

    match cmd {
        Command::Interactive => {
            interactive::run_loop(&mut sim, &settings).await?
        }
        cmd => {
            let result = cmd.run(&mut sim, io::status::headless).await?;
            println!("{}", result);
        }
    }

    Ok(())
}
