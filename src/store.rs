// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SQLite persistence for accounts and settled transactions.
//!
//! Every method is a single round trip on the shared connection. The only
//! multi-statement operation, [`Ledger::settle`], runs inside one database
//! transaction.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::currency::Ether;
use crate::key::{parse_address, Address, KeyPair};
use crate::tx::TxHash;
use crate::Error;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS accounts (
        account_name TEXT PRIMARY KEY NOT NULL,
        private_key TEXT NOT NULL,
        address TEXT UNIQUE NOT NULL,
        balance_eth REAL NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tx_hash TEXT UNIQUE NOT NULL,
        sender TEXT NOT NULL,
        receiver TEXT NOT NULL,
        value_eth REAL NOT NULL,
        gas_used INTEGER NOT NULL,
        block_number INTEGER NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_transactions_sender ON transactions(sender);
    CREATE INDEX IF NOT EXISTS idx_transactions_receiver ON transactions(receiver);
    CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp);
"#;

const SELECT_TRANSACTIONS: &str = r#"
    SELECT t.tx_hash, t.sender, t.receiver, t.value_eth, t.gas_used,
           t.block_number, t.timestamp,
           EXISTS(SELECT 1 FROM accounts a
                  WHERE a.account_name = t.sender OR a.address = t.sender),
           EXISTS(SELECT 1 FROM accounts a
                  WHERE a.account_name = t.receiver OR a.address = t.receiver)
    FROM transactions t
"#;

/// A named account and its cached balance
#[derive(Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub address: Address,
    /// `0x` prefixed secret key, stored in plaintext
    pub private_key: String,
    /// Cached balance, only updated when a batch settles
    pub balance: Ether,
}

impl Account {
    /// Creates an account record for a freshly generated key pair
    pub fn new<S: Into<String>>(name: S, keys: &KeyPair, balance: Ether) -> Self {
        Self {
            name: name.into(),
            address: keys.address(),
            private_key: keys.secret_hex(),
            balance,
        }
    }

    /// Restores the key pair used to sign this account's transfers
    pub fn key_pair(&self) -> Result<KeyPair, Error> {
        KeyPair::from_hex(&self.private_key)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("balance", &self.balance)
            .finish_non_exhaustive()
    }
}

/// A transfer settled in a mined block, ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub tx_hash: TxHash,
    pub sender: Address,
    pub receiver: Address,
    pub value: Ether,
    pub gas_used: u64,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
}

/// A persisted transaction as listed back to the user
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTransaction {
    pub tx_hash: String,
    /// Account name when it was known at settlement, raw address otherwise
    pub sender: String,
    pub receiver: String,
    /// Whether `sender` still matches an existing account
    pub sender_known: bool,
    pub receiver_known: bool,
    pub value: Ether,
    pub gas_used: u64,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
}

impl StoredTransaction {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            tx_hash: row.get(0)?,
            sender: row.get(1)?,
            receiver: row.get(2)?,
            value: Ether::new(row.get(3)?),
            gas_used: row.get::<_, i64>(4)? as u64,
            block_number: row.get::<_, i64>(5)? as u64,
            timestamp: row.get(6)?,
            sender_known: row.get(7)?,
            receiver_known: row.get(8)?,
        })
    }
}

/// Where settled batches are written to
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Persists the records and applies their balance deltas (debit the
    /// sender, credit the receiver), all or nothing
    async fn settle(&self, records: &[TransactionRecord]) -> Result<(), Error>;
}

// raw row, converted outside of the connection thread
struct AccountRow {
    name: String,
    private_key: String,
    address: String,
    balance: f64,
}

impl AccountRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            private_key: row.get(1)?,
            address: row.get(2)?,
            balance: row.get(3)?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = Error;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            name: row.name,
            address: parse_address(&row.address)?,
            private_key: row.private_key,
            balance: Ether::new(row.balance),
        })
    }
}

/// Checksum encoding of input that parses as an address, matching the way
/// addresses are stored
fn normalize(name_or_address: &str) -> Option<String> {
    parse_address(name_or_address).ok().map(|a| a.to_string())
}

fn name_of(
    conn: &rusqlite::Connection,
    address: &str,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT account_name FROM accounts WHERE address = ?1",
        params![address],
        |row| row.get(0),
    )
    .optional()
}

fn add_to_balance(
    conn: &rusqlite::Connection,
    address: &str,
    delta: f64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE accounts SET balance_eth = balance_eth + ?1 WHERE address = ?2",
        params![delta, address],
    )
}

/// SQLite backed account directory and transaction ledger
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the database at `path`
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let conn = Connection::open(path).await?;
        let store = Self { conn };
        store.create_schema().await?;
        Ok(store)
    }

    /// Opens a private in-memory database
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await?;
        let store = Self { conn };
        store.create_schema().await?;
        Ok(store)
    }

    async fn create_schema(&self) -> Result<(), Error> {
        self.conn
            .call(|conn| Ok(conn.execute_batch(SCHEMA)?))
            .await?;
        Ok(())
    }

    /// Looks an account up by name
    pub async fn account(&self, name: &str) -> Result<Option<Account>, Error> {
        let name = name.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT account_name, private_key, address, balance_eth
                         FROM accounts WHERE account_name = ?1",
                        params![name],
                        AccountRow::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;
        row.map(Account::try_from).transpose()
    }

    /// Name of the account owning `address`
    pub async fn account_name(
        &self,
        address: &Address,
    ) -> Result<Option<String>, Error> {
        let address = address.to_string();
        let name = self
            .conn
            .call(move |conn| Ok(name_of(conn, &address)?))
            .await?;
        Ok(name)
    }

    /// Whether any account has this name or this address. Only input that
    /// parses as an address is compared against addresses, names are
    /// matched verbatim.
    pub async fn exists(&self, name_or_address: &str) -> Result<bool, Error> {
        let name = name_or_address.to_string();
        let address = normalize(name_or_address);
        let found = self
            .conn
            .call(move |conn| {
                let found: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM accounts
                                   WHERE account_name = ?1 OR address = ?2)",
                    params![name, address],
                    |row| row.get(0),
                )?;
                Ok(found)
            })
            .await?;
        Ok(found)
    }

    /// Adds `delta` to the cached balance of `address`. Returns whether an
    /// account was updated.
    pub async fn apply_delta(
        &self,
        address: &Address,
        delta: Ether,
    ) -> Result<bool, Error> {
        let address = address.to_string();
        let delta = delta.as_f64();
        let updated = self
            .conn
            .call(move |conn| Ok(add_to_balance(conn, &address, delta)?))
            .await?;
        Ok(updated > 0)
    }

    /// Stores a new account
    pub async fn insert_account(&self, account: &Account) -> Result<(), Error> {
        let Account {
            name,
            address,
            private_key,
            balance,
        } = account.clone();
        let address = address.to_string();
        let balance = balance.as_f64();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO accounts
                     (account_name, private_key, address, balance_eth)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![name, private_key, address, balance],
                )?;
                Ok(())
            })
            .await?;
        debug!(name = %account.name, "account stored");
        Ok(())
    }

    /// Deletes an account by name. Returns whether a row was removed.
    pub async fn delete_account(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let deleted = self
            .conn
            .call(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM accounts WHERE account_name = ?1",
                    params![name],
                )?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted > 0)
    }

    /// All accounts, ordered by name
    pub async fn accounts(&self) -> Result<Vec<Account>, Error> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT account_name, private_key, address, balance_eth
                     FROM accounts ORDER BY account_name",
                )?;
                let rows = stmt
                    .query_map([], AccountRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(Account::try_from).collect()
    }

    /// Number of stored accounts
    pub async fn count_accounts(&self) -> Result<u64, Error> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM accounts",
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count as u64)
    }

    /// Every settled transaction, newest first
    pub async fn transactions(&self) -> Result<Vec<StoredTransaction>, Error> {
        let txs = self
            .conn
            .call(|conn| {
                let sql = format!(
                    "{} ORDER BY t.timestamp DESC, t.id DESC",
                    SELECT_TRANSACTIONS
                );
                let mut stmt = conn.prepare(&sql)?;
                let txs = stmt
                    .query_map([], StoredTransaction::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(txs)
            })
            .await?;
        Ok(txs)
    }

    /// Settled transactions where `name` is the sender or the receiver,
    /// newest first
    pub async fn transactions_for(
        &self,
        name: &str,
    ) -> Result<Vec<StoredTransaction>, Error> {
        let name = name.to_string();
        let txs = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "{} WHERE t.sender = ?1 OR t.receiver = ?1
                     ORDER BY t.timestamp DESC, t.id DESC",
                    SELECT_TRANSACTIONS
                );
                let mut stmt = conn.prepare(&sql)?;
                let txs = stmt
                    .query_map(params![name], StoredTransaction::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(txs)
            })
            .await?;
        Ok(txs)
    }
}

#[async_trait]
impl Ledger for Store {
    async fn settle(&self, records: &[TransactionRecord]) -> Result<(), Error> {
        let records = records.to_vec();
        let count = records.len();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for record in &records {
                    let sender = record.sender.to_string();
                    let receiver = record.receiver.to_string();
                    let value = record.value.as_f64();

                    // names are resolved at settlement, unknown parties
                    // keep their raw address
                    let sender_name = name_of(&tx, &sender)?
                        .unwrap_or_else(|| sender.clone());
                    let receiver_name = name_of(&tx, &receiver)?
                        .unwrap_or_else(|| receiver.clone());
                    tx.execute(
                        "INSERT INTO transactions
                         (tx_hash, sender, receiver, value_eth, gas_used,
                          block_number, timestamp)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            record.tx_hash.to_string(),
                            sender_name,
                            receiver_name,
                            value,
                            record.gas_used as i64,
                            record.block_number as i64,
                            record.timestamp,
                        ],
                    )?;
                    add_to_balance(&tx, &sender, -value)?;
                    add_to_balance(&tx, &receiver, value)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        debug!(count, "batch settled");
        Ok(())
    }
}
