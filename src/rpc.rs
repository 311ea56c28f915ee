// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::debug;
use url::Url;

use crate::currency::Wei;
use crate::key::{parse_address, Address};
use crate::tx::{parse_hash, TxHash};
use crate::Error;

/// Interval between two receipt polls
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Block tag used for state queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    /// Includes transactions still waiting in the node's pool
    Pending,
}

impl BlockTag {
    fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Latest => "latest",
            BlockTag::Pending => "pending",
        }
    }
}

/// A transfer sent from a node-managed account, signed by the node itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: Wei,
    pub gas: u64,
    pub gas_price: Wei,
    pub nonce: u64,
}

/// Outcome of an included transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    /// `false` when the transaction reverted
    pub success: bool,
}

/// Header information of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    /// Seconds since the unix epoch
    pub timestamp: u64,
    pub transaction_count: usize,
}

/// The operations this wallet needs from a blockchain node
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Accounts managed (and unlocked) by the node
    async fn accounts(&self) -> Result<Vec<Address>, Error>;

    /// Balance of an address at the latest block
    async fn balance(&self, address: &Address) -> Result<Wei, Error>;

    /// Number of transactions sent from an address, i.e. its next nonce
    async fn transaction_count(
        &self,
        address: &Address,
        tag: BlockTag,
    ) -> Result<u64, Error>;

    /// Chain id used for replay protection
    async fn chain_id(&self) -> Result<u64, Error>;

    /// Submits a transaction the node signs with one of its own accounts
    async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TxHash, Error>;

    /// Submits an already signed transaction
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, Error>;

    /// Receipt of a transaction, `None` while it is not included
    async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<Receipt>, Error>;

    /// Number of the most recent block
    async fn block_number(&self) -> Result<u64, Error>;

    /// Block by number, `None` if it does not exist
    async fn block(&self, number: u64) -> Result<Option<BlockSummary>, Error>;

    /// Asks the node to produce a block right away
    async fn mine(&self) -> Result<(), Error>;
}

/// Polls the node until the receipt for `hash` is available or `timeout`
/// elapses. `status` is called with a progress message on every poll.
pub async fn wait_for_receipt<C>(
    client: &C,
    hash: &TxHash,
    timeout: Duration,
    status: fn(&str),
) -> Result<Receipt, Error>
where
    C: ChainClient + ?Sized,
{
    let started = Instant::now();
    loop {
        if let Some(receipt) = client.transaction_receipt(hash).await? {
            return Ok(receipt);
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(Error::ReceiptTimeout {
                hash: hash.to_string(),
                timeout,
            });
        }

        status(&format!(
            "Waiting for confirmation... ({}/{}s)",
            elapsed.as_secs(),
            timeout.as_secs()
        ));
        sleep(POLL_INTERVAL).await;
    }
}

/// Parses a JSON-RPC hex quantity such as `0x1b4`
pub fn parse_quantity(value: &str) -> Result<u128, Error> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() || digits.len() > 32 {
        return Err(Error::BadHex(value.to_string()));
    }
    u128::from_str_radix(digits, 16).map_err(|_| Error::BadHex(value.to_string()))
}

fn parse_u64(value: &str) -> Result<u64, Error> {
    u64::try_from(parse_quantity(value)?)
        .map_err(|_| Error::BadHex(value.to_string()))
}

fn quantity<T: Into<u128>>(value: T) -> String {
    format!("{:#x}", value.into())
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

// helper structs to deserialize node responses
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: String,
    gas_used: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    number: String,
    hash: String,
    parent_hash: String,
    timestamp: String,
    #[serde(default)]
    transactions: Vec<Value>,
}

impl TryFrom<RawReceipt> for Receipt {
    type Error = Error;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        let success = match raw.status.as_deref() {
            // pre-byzantium receipts carry no status
            None => true,
            Some(status) => parse_quantity(status)? == 1,
        };
        Ok(Receipt {
            transaction_hash: parse_hash(&raw.transaction_hash)?,
            block_number: parse_u64(&raw.block_number)?,
            gas_used: parse_u64(&raw.gas_used)?,
            success,
        })
    }
}

impl TryFrom<RawBlock> for BlockSummary {
    type Error = Error;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        Ok(BlockSummary {
            number: parse_u64(&raw.number)?,
            hash: raw.hash,
            parent_hash: raw.parent_hash,
            timestamp: parse_u64(&raw.timestamp)?,
            transaction_count: raw.transactions.len(),
        })
    }
}

/// JSON-RPC client talking to a node over HTTP
#[derive(Debug)]
pub struct HttpClient {
    url: Url,
    http: reqwest::Client,
    id: AtomicU64,
}

impl HttpClient {
    /// Creates a new client for the node at `url`
    pub fn new(url: Url) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
            id: AtomicU64::new(1),
        }
    }

    /// Node endpoint
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Performs a JSON-RPC call, returning the raw `result` member
    pub async fn call(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<Option<Value>, Error> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "rpc call");

        let response: RpcResponse = self
            .http
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(RpcError { code, message }) = response.error {
            return Err(Error::Rpc { code, message });
        }
        Ok(response.result.filter(|v| !v.is_null()))
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, Error> {
        let result = self
            .call(method, params)
            .await?
            .ok_or(Error::EmptyResponse(method))?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl ChainClient for HttpClient {
    async fn accounts(&self) -> Result<Vec<Address>, Error> {
        let accounts: Vec<String> =
            self.call_as("eth_accounts", json!([])).await?;
        accounts.iter().map(|a| parse_address(a)).collect()
    }

    async fn balance(&self, address: &Address) -> Result<Wei, Error> {
        let balance: String = self
            .call_as(
                "eth_getBalance",
                json!([address.to_string(), BlockTag::Latest.as_str()]),
            )
            .await?;
        parse_quantity(&balance)
    }

    async fn transaction_count(
        &self,
        address: &Address,
        tag: BlockTag,
    ) -> Result<u64, Error> {
        let count: String = self
            .call_as(
                "eth_getTransactionCount",
                json!([address.to_string(), tag.as_str()]),
            )
            .await?;
        parse_u64(&count)
    }

    async fn chain_id(&self) -> Result<u64, Error> {
        let id: String = self.call_as("eth_chainId", json!([])).await?;
        parse_u64(&id)
    }

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TxHash, Error> {
        let tx = json!({
            "from": request.from.to_string(),
            "to": request.to.to_string(),
            "value": quantity(request.value),
            "gas": quantity(request.gas),
            "gasPrice": quantity(request.gas_price),
            "nonce": quantity(request.nonce),
        });
        let hash: String =
            self.call_as("eth_sendTransaction", json!([tx])).await?;
        parse_hash(&hash)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, Error> {
        let raw = format!("0x{}", hex::encode(raw));
        let hash: String =
            self.call_as("eth_sendRawTransaction", json!([raw])).await?;
        parse_hash(&hash)
    }

    async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<Receipt>, Error> {
        let receipt = self
            .call("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        match receipt {
            Some(value) => {
                let raw: RawReceipt = serde_json::from_value(value)?;
                Ok(Some(raw.try_into()?))
            }
            None => Ok(None),
        }
    }

    async fn block_number(&self) -> Result<u64, Error> {
        let number: String =
            self.call_as("eth_blockNumber", json!([])).await?;
        parse_u64(&number)
    }

    async fn block(&self, number: u64) -> Result<Option<BlockSummary>, Error> {
        let block = self
            .call("eth_getBlockByNumber", json!([quantity(number), false]))
            .await?;
        match block {
            Some(value) => {
                let raw: RawBlock = serde_json::from_value(value)?;
                Ok(Some(raw.try_into()?))
            }
            None => Ok(None),
        }
    }

    async fn mine(&self) -> Result<(), Error> {
        self.call("evm_mine", json!([])).await?;
        Ok(())
    }
}
