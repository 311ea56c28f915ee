// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! # Ethereum Wallet Simulator
//!
//! The `eth_wallet_sim` library simulates a small wallet network on top of a
//! local Ethereum test node.
//!
//! Clients use [`Simulator`] to create funded accounts, send ETH between
//! them and browse the settled history. Transfers are signed locally and
//! settled in batches of [`BATCH_THRESHOLD`]: the node mines a block and the
//! whole batch is recorded in a SQLite [`Store`].

pub mod batch;
pub mod rpc;
pub mod store;

mod currency;
mod error;
mod key;
mod tx;
mod wallet;

use std::time::Duration;

pub use batch::{BatchQueue, Clock, Enqueued, SystemClock};
pub use currency::{Ether, Wei};
pub use error::{Error, ErrorKind};
pub use key::{keccak256, parse_address, Address, KeyPair};
pub use rpc::{BlockSummary, ChainClient, HttpClient};
pub use store::{Account, Store, StoredTransaction};
pub use tx::{parse_hash, value_transfer, SignedTransaction, TxHash};
pub use wallet::Simulator;

/// Amount every new account is funded with
pub const FUNDING_AMOUNT: Ether = Ether::new(50.0);
/// Number of transfers settled together
pub const BATCH_THRESHOLD: usize = 5;
/// Gas limit of a plain value transfer
pub const GAS_LIMIT: u64 = 21_000;
/// Gas price of every transaction, 50 gwei
pub const GAS_PRICE: Wei = 50_000_000_000;
/// How long to wait for the funding transaction to be confirmed
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);
