// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tracing::warn;

use eth_wallet_sim::{ChainClient, Clock, Simulator};

use crate::io::{self, prompt};
use crate::settings::Settings;
use crate::Menu;
use crate::{Command, RunResult};

#[derive(PartialEq, Eq, Hash, Clone, Debug)]
enum MainMenuItem {
    Create,
    Send,
    Accounts,
    Transactions,
    Search,
    Blocks,
    Delete,
    Exit,
}

/// Run the interactive UX loop until the user exits
pub(crate) async fn run_loop<C, K>(
    sim: &mut Simulator<C, K>,
    settings: &Settings,
) -> anyhow::Result<()>
where
    C: ChainClient,
    K: Clock,
{
    println!("{}", settings);

    loop {
        let item = match menu_main(sim.pending(), sim.threshold()) {
            Ok(item) => item,
            Err(err) if interrupted(&err) => MainMenuItem::Exit,
            Err(err) => return Err(err),
        };
        let result = match item {
            MainMenuItem::Exit => {
                if confirm_exit(sim.pending()) {
                    break;
                }
                continue;
            }
            MainMenuItem::Send => send(sim).await,
            item => match command(item) {
                Ok(cmd) => {
                    prompt::hide_cursor()?;
                    let result = cmd.run(sim, io::status::interactive).await;
                    prompt::show_cursor()?;
                    result.map_err(anyhow::Error::from)
                }
                Err(err) => Err(err),
            },
        };

        match result {
            Ok(res) => println!("\r{}", res),
            Err(err) if interrupted(&err) => {
                if confirm_exit(sim.pending()) {
                    break;
                }
            }
            Err(err) => println!("\r> Error: {}", err),
        }
    }

    Ok(())
}

fn menu_main(pending: usize, threshold: usize) -> anyhow::Result<MainMenuItem> {
    let menu = Menu::new()
        .add(MainMenuItem::Create, "Create Account")
        .add(MainMenuItem::Send, "Send ETH")
        .separator()
        .add(MainMenuItem::Accounts, "View Accounts")
        .add(MainMenuItem::Transactions, "View Transactions")
        .add(MainMenuItem::Search, "Search Transactions")
        .add(MainMenuItem::Blocks, "View Blockchain")
        .separator()
        .add(MainMenuItem::Delete, "Delete Account")
        .add(MainMenuItem::Exit, "Exit");

    menu.select(format!(
        "What would you like to do? (pending transfers: {}/{})",
        pending, threshold
    ))
}

/// Builds the command behind a menu entry, asking for its arguments
fn command(item: MainMenuItem) -> anyhow::Result<Command> {
    use MainMenuItem::*;
    Ok(match item {
        Create => Command::Create {
            name: prompt::request_name("Account name")?,
        },
        Accounts => Command::Accounts,
        Transactions => Command::Transactions,
        Search => Command::Search {
            name: prompt::request_name("Account name to search")?,
        },
        Blocks => Command::Blocks,
        Delete => Command::Delete {
            name: prompt::request_name("Account name to delete")?,
        },
        Send | Exit => Command::Interactive,
    })
}

async fn send<C, K>(sim: &mut Simulator<C, K>) -> anyhow::Result<RunResult>
where
    C: ChainClient,
    K: Clock,
{
    let sender = prompt::request_name("Sender name")?;
    let receiver = prompt::request_name("Receiver name")?;
    let amount = prompt::request_amount()?;

    if !prompt::ask_confirm(&format!(
        "Send {} ETH from {} to {}?",
        amount, sender, receiver
    )) {
        return Ok(RunResult::Empty);
    }

    prompt::hide_cursor()?;
    let result = sim.send(&sender, &receiver, amount).await;
    prompt::show_cursor()?;
    Ok(RunResult::Transfer(result?))
}

/// Pending transfers only live in memory, leaving drops them
fn confirm_exit(pending: usize) -> bool {
    if pending == 0 {
        return true;
    }
    warn!(pending, "exiting with unsettled transfers");
    prompt::ask_confirm(&format!(
        "{} submitted transfers are not settled yet and will not be recorded. Exit anyway?",
        pending
    ))
}

fn interrupted(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<requestty::ErrorKind>(),
        Some(requestty::ErrorKind::Interrupted | requestty::ErrorKind::Aborted)
    )
}
