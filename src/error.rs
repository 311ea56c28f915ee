// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::time::Duration;

/// Broad classification of an [`Error`], so the presentation layer can
/// decide how to show a failure without matching every variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user supplied something we refuse to act upon
    Validation,
    /// The referenced account does not exist
    NotFound,
    /// The node, the database or the signer failed
    External,
}

/// Errors returned by this library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Amount is missing, not a number or not positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// Account names cannot be blank
    #[error("Account name cannot be empty")]
    EmptyName,
    /// An account with this name or address is already registered
    #[error("Account '{0}' already exists")]
    AccountExists(String),
    /// No account is registered under this name
    #[error("Account '{0}' not found")]
    AccountNotFound(String),
    /// Either side of a transfer is unknown
    #[error("Sender or receiver not found")]
    SenderOrReceiverNotFound,
    /// None of the node accounts can cover the funding amount
    #[error("No node account has enough balance to fund a new account")]
    NoFunder,
    /// HTTP transport errors
    #[error("Couldn't reach the node: {0}")]
    Http(#[from] reqwest::Error),
    /// JSON serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The node answered with a JSON-RPC error object
    #[error("Node error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message reported by the node
        message: String,
    },
    /// The node answered without a result
    #[error("Empty response from the node for {0}")]
    EmptyResponse(&'static str),
    /// A hex quantity, hash or address could not be decoded
    #[error("Malformed hex value: {0}")]
    BadHex(String),
    /// Invalid address
    #[error("Invalid address: {0}")]
    BadAddress(String),
    /// Stored secret key is not a valid secp256k1 scalar
    #[error("Invalid private key: {0}")]
    BadKey(String),
    /// The signer refused the transaction
    #[error("Signing error: {0}")]
    Signing(#[from] alloy::signers::Error),
    /// Transaction was not confirmed in time
    #[error("Transaction {} not confirmed after {}s", .hash, .timeout.as_secs())]
    ReceiptTimeout {
        /// Hash of the transaction we were waiting for
        hash: String,
        /// How long we waited
        timeout: Duration,
    },
    /// A batched transaction has no receipt after mining
    #[error("No receipt found for transaction {0}")]
    MissingReceipt(String),
    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),
    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),
}

impl Error {
    /// Returns the broad category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            InvalidAmount(_) | EmptyName | AccountExists(_) | NoFunder => {
                ErrorKind::Validation
            }
            AccountNotFound(_) | SenderOrReceiverNotFound => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::External,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.into())
    }
}
