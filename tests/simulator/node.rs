// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-process node with Ganache semantics: node-signed transactions are
//! mined right away, raw transactions wait in the pool until `evm_mine`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Decodable2718;
use async_trait::async_trait;
use tokio::sync::Mutex;

use eth_wallet_sim::rpc::{BlockTag, Receipt, TransactionRequest};
use eth_wallet_sim::{
    keccak256, Address, BlockSummary, ChainClient, Error, TxHash, Wei,
};

pub const CHAIN_ID: u64 = 1337;
pub const ETH: Wei = 1_000_000_000_000_000_000;
const GENESIS_TIME: u64 = 1_700_000_000;

struct Pooled {
    hash: TxHash,
    from: Address,
    to: Address,
    value: Wei,
    fee: Wei,
}

struct Block {
    hash: TxHash,
    parent: TxHash,
    transactions: Vec<TxHash>,
}

struct State {
    managed: Vec<Address>,
    balances: HashMap<Address, Wei>,
    nonces: HashMap<Address, u64>,
    pool: Vec<Pooled>,
    blocks: Vec<Block>,
    receipts: HashMap<TxHash, Receipt>,
    fail_mining: bool,
}

impl State {
    fn nonce(&self, address: &Address) -> u64 {
        *self.nonces.get(address).unwrap_or(&0)
    }

    fn balance(&self, address: &Address) -> Wei {
        *self.balances.get(address).unwrap_or(&0)
    }

    fn admit(&mut self, from: Address, nonce: u64, cost: Wei) -> Result<(), Error> {
        if nonce != self.nonce(&from) {
            return Err(rpc_error("nonce mismatch"));
        }
        if self.balance(&from) < cost {
            return Err(rpc_error("insufficient funds for gas * price + value"));
        }
        self.nonces.insert(from, nonce + 1);
        Ok(())
    }

    fn seal(&mut self, txs: Vec<Pooled>) {
        let number = self.blocks.len() as u64;
        let parent = self.blocks.last().map(|b| b.hash).unwrap_or(TxHash::ZERO);

        let mut hashes = vec![];
        for tx in txs {
            let from = self.balances.entry(tx.from).or_insert(0);
            *from = from.saturating_sub(tx.value + tx.fee);
            *self.balances.entry(tx.to).or_insert(0) += tx.value;
            self.receipts.insert(
                tx.hash,
                Receipt {
                    transaction_hash: tx.hash,
                    block_number: number,
                    gas_used: 21_000,
                    success: true,
                },
            );
            hashes.push(tx.hash);
        }

        let mut seed = parent.to_vec();
        seed.extend_from_slice(&number.to_be_bytes());
        self.blocks.push(Block {
            hash: keccak256(seed),
            parent,
            transactions: hashes,
        });
    }
}

fn rpc_error(message: &str) -> Error {
    Error::Rpc {
        code: -32000,
        message: message.to_string(),
    }
}

pub struct MockNode {
    state: Mutex<State>,
    calls: AtomicUsize,
    mines: AtomicUsize,
}

impl MockNode {
    /// A node managing accounts with the given balances, in ETH
    pub fn new(balances: &[u128]) -> Self {
        let mut managed = vec![];
        let mut funds = HashMap::new();
        for (i, eth) in balances.iter().enumerate() {
            let address = Address::repeat_byte(i as u8 + 1);
            managed.push(address);
            funds.insert(address, eth * ETH);
        }

        let mut state = State {
            managed,
            balances: funds,
            nonces: HashMap::new(),
            pool: vec![],
            blocks: vec![],
            receipts: HashMap::new(),
            fail_mining: false,
        };
        state.seal(vec![]);

        Self {
            state: Mutex::new(state),
            calls: AtomicUsize::new(0),
            mines: AtomicUsize::new(0),
        }
    }

    /// Number of requests served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `evm_mine` requests served so far
    pub fn mines(&self) -> usize {
        self.mines.load(Ordering::SeqCst)
    }

    pub async fn balance_of(&self, address: &Address) -> Wei {
        self.state.lock().await.balance(address)
    }

    pub async fn managed(&self, index: usize) -> Address {
        self.state.lock().await.managed[index]
    }

    pub async fn pool_size(&self) -> usize {
        self.state.lock().await.pool.len()
    }

    pub async fn fail_mining(&self, fail: bool) {
        self.state.lock().await.fail_mining = fail;
    }

    fn served(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Decodes a signed legacy transaction and recovers its sender
fn decode(raw: &[u8]) -> Option<(Address, TxLegacy)> {
    let envelope = TxEnvelope::decode_2718(&mut &raw[..]).ok()?;
    let signed = envelope.as_legacy()?;
    let tx = signed.tx();
    if tx.chain_id != Some(CHAIN_ID) {
        return None;
    }
    let from = signed
        .signature()
        .recover_address_from_prehash(&tx.signature_hash())
        .ok()?;
    Some((from, tx.clone()))
}

#[async_trait]
impl ChainClient for MockNode {
    async fn accounts(&self) -> Result<Vec<Address>, Error> {
        self.served();
        Ok(self.state.lock().await.managed.clone())
    }

    async fn balance(&self, address: &Address) -> Result<Wei, Error> {
        self.served();
        Ok(self.state.lock().await.balance(address))
    }

    async fn transaction_count(
        &self,
        address: &Address,
        _: BlockTag,
    ) -> Result<u64, Error> {
        self.served();
        Ok(self.state.lock().await.nonce(address))
    }

    async fn chain_id(&self) -> Result<u64, Error> {
        self.served();
        Ok(CHAIN_ID)
    }

    async fn send_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TxHash, Error> {
        self.served();
        let mut state = self.state.lock().await;
        if !state.managed.contains(&request.from) {
            return Err(rpc_error("sender account not recognized"));
        }

        let fee = request.gas as Wei * request.gas_price;
        state.admit(request.from, request.nonce, request.value + fee)?;

        let mut seed = request.from.to_vec();
        seed.extend_from_slice(&request.nonce.to_be_bytes());
        let hash = keccak256(seed);

        // node signed transactions are mined on arrival
        state.seal(vec![Pooled {
            hash,
            from: request.from,
            to: request.to,
            value: request.value,
            fee,
        }]);
        Ok(hash)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, Error> {
        self.served();
        let (from, tx) =
            decode(raw).ok_or_else(|| rpc_error("invalid raw transaction"))?;

        let to = *tx.to.to().ok_or_else(|| rpc_error("contract creation"))?;
        let value = u128::try_from(tx.value)
            .map_err(|_| rpc_error("value out of range"))?;

        let mut state = self.state.lock().await;
        let fee = tx.gas_limit as Wei * tx.gas_price;
        state.admit(from, tx.nonce, value + fee)?;

        let hash = keccak256(raw);
        state.pool.push(Pooled {
            hash,
            from,
            to,
            value,
            fee,
        });
        Ok(hash)
    }

    async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<Receipt>, Error> {
        self.served();
        Ok(self.state.lock().await.receipts.get(hash).cloned())
    }

    async fn block_number(&self) -> Result<u64, Error> {
        self.served();
        Ok(self.state.lock().await.blocks.len() as u64 - 1)
    }

    async fn block(&self, number: u64) -> Result<Option<BlockSummary>, Error> {
        self.served();
        let state = self.state.lock().await;
        Ok(state.blocks.get(number as usize).map(|block| BlockSummary {
            number,
            hash: block.hash.to_string(),
            parent_hash: block.parent.to_string(),
            timestamp: GENESIS_TIME + number,
            transaction_count: block.transactions.len(),
        }))
    }

    async fn mine(&self) -> Result<(), Error> {
        self.served();
        let mut state = self.state.lock().await;
        if state.fail_mining {
            return Err(rpc_error("mining is disabled"));
        }
        self.mines.fetch_add(1, Ordering::SeqCst);
        let pool = std::mem::take(&mut state.pool);
        state.seal(pool);
        Ok(())
    }
}
