// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Subcommand;
use std::fmt;

use chrono::{TimeZone, Utc};
use eth_wallet_sim::{
    Account, BlockSummary, ChainClient, Clock, Enqueued, Error, Simulator,
    StoredTransaction,
};

/// Commands that can be run against the simulator
#[derive(PartialEq, Eq, Hash, Clone, Subcommand, Debug)]
pub(crate) enum Command {
    /// Create a new account, funded by the node
    Create {
        /// Name of the account
        #[clap(short, long)]
        name: String,
    },

    /// List accounts and their balances
    Accounts,

    /// List every settled transaction
    Transactions,

    /// List the transactions sent or received by an account
    Search {
        /// Name of the account
        #[clap(short, long)]
        name: String,
    },

    /// Show every block of the chain
    Blocks,

    /// Delete an account
    Delete {
        /// Name of the account
        #[clap(short, long)]
        name: String,
    },

    /// Run in interactive mode (default)
    Interactive,
}

impl Command {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Runs the command against the provided simulator
    pub async fn run<C, K>(
        self,
        sim: &mut Simulator<C, K>,
        status: fn(&str),
    ) -> Result<RunResult, Error>
    where
        C: ChainClient,
        K: Clock,
    {
        match self {
            Command::Create { name } => {
                let account = sim.create_account(&name, status).await?;
                Ok(RunResult::Created(account))
            }
            Command::Accounts => Ok(RunResult::Accounts(sim.accounts().await?)),
            Command::Transactions => {
                Ok(RunResult::Transactions(sim.transactions().await?))
            }
            Command::Search { name } => {
                Ok(RunResult::Transactions(sim.search(&name).await?))
            }
            Command::Blocks => Ok(RunResult::Blocks(sim.blocks().await?)),
            Command::Delete { name } => {
                sim.delete_account(&name).await?;
                Ok(RunResult::Deleted(name))
            }
            Command::Interactive => Ok(RunResult::Empty),
        }
    }
}

/// Possible results of running a command
#[derive(Debug)]
pub enum RunResult {
    Created(Account),
    Transfer(Enqueued),
    Accounts(Vec<Account>),
    Transactions(Vec<StoredTransaction>),
    Blocks(Vec<BlockSummary>),
    Deleted(String),
    Empty,
}

/// Unknown parties are shown between brackets
fn party(value: &str, known: bool) -> String {
    if known {
        value.to_string()
    } else {
        format!("[{}]", value)
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RunResult::*;
        match self {
            Created(account) => {
                write!(
                    f,
                    "> Account '{}' created and funded\n> Address: {}",
                    account.name, account.address
                )
            }
            Transfer(Enqueued::Queued {
                tx_hash,
                pending,
                threshold,
            }) => {
                write!(
                    f,
                    "> Transaction sent: {}\n> Transaction queued. Pending {}/{}",
                    tx_hash, pending, threshold
                )
            }
            Transfer(Enqueued::Committed {
                tx_hash,
                block_number,
                count,
            }) => {
                write!(
                    f,
                    "> Transaction sent: {}\n> Block #{} mined with {} transactions",
                    tx_hash, block_number, count
                )
            }
            Accounts(accounts) if accounts.is_empty() => {
                write!(f, "> No accounts available")
            }
            Accounts(accounts) => {
                let lines = accounts
                    .iter()
                    .map(|a| format!("> {}: {:.4} ETH", a.name, a.balance))
                    .collect::<Vec<String>>()
                    .join("\n");
                write!(f, "{}", lines)
            }
            Transactions(txs) if txs.is_empty() => {
                write!(f, "> No transactions")
            }
            Transactions(txs) => {
                let separator = "-".repeat(50);
                for tx in txs {
                    writeln!(
                        f,
                        "From: {} ➡ To: {}",
                        party(&tx.sender, tx.sender_known),
                        party(&tx.receiver, tx.receiver_known)
                    )?;
                    writeln!(
                        f,
                        "Amount: {} ETH | Gas: {} | Block: {} | Time: {}",
                        tx.value,
                        tx.gas_used,
                        tx.block_number,
                        tx.timestamp.format("%Y-%m-%d %H:%M:%S")
                    )?;
                    writeln!(f, "{}", separator)?;
                }
                Ok(())
            }
            Blocks(blocks) if blocks.is_empty() => {
                write!(f, "> No blocks found")
            }
            Blocks(blocks) => {
                let separator = "-".repeat(50);
                for block in blocks {
                    let timestamp = Utc
                        .timestamp_opt(block.timestamp as i64, 0)
                        .single()
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| block.timestamp.to_string());
                    writeln!(f, "Block Number: {}", block.number)?;
                    writeln!(f, "Hash: {}", block.hash)?;
                    writeln!(f, "Previous Hash: {}", block.parent_hash)?;
                    writeln!(f, "Timestamp: {}", timestamp)?;
                    writeln!(f, "Transactions: {}", block.transaction_count)?;
                    writeln!(f, "{}", separator)?;
                }
                Ok(())
            }
            Deleted(name) => write!(f, "> Account '{}' deleted", name),
            Empty => Ok(()),
        }
    }
}
