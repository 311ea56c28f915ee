// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Batched settlement of transfers.
//!
//! Every transfer is signed and submitted to the node as soon as it is
//! enqueued. Bookkeeping is deferred: once the queue holds `threshold`
//! submissions the node is asked to mine a block and the whole batch is
//! written to the [`Ledger`] at once.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::currency::Ether;
use crate::key::Address;
use crate::rpc::{BlockTag, ChainClient};
use crate::store::{Account, Ledger, TransactionRecord};
use crate::tx::{value_transfer, SignedTransaction, TxHash};
use crate::{Error, BATCH_THRESHOLD};

/// Source of the timestamps attached to settled records
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A validated transfer between two known accounts
#[derive(Debug, Clone)]
pub struct Transfer {
    pub sender: Account,
    pub receiver: Account,
    pub amount: Ether,
}

/// A submitted transfer waiting for the batch to be committed
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransfer {
    pub tx_hash: TxHash,
    pub sender: Address,
    pub receiver: Address,
    pub amount: Ether,
}

/// What happened to an enqueued transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    /// Submitted, the batch is not full yet
    Queued {
        tx_hash: TxHash,
        pending: usize,
        threshold: usize,
    },
    /// Submitted, and the batch it completed was mined and settled
    Committed {
        tx_hash: TxHash,
        block_number: u64,
        count: usize,
    },
}

/// Pending transfers and the commit threshold
#[derive(Debug)]
pub struct BatchQueue<K = SystemClock> {
    pending: Vec<PendingTransfer>,
    threshold: usize,
    clock: K,
}

impl BatchQueue<SystemClock> {
    /// Creates an empty queue committing every [`BATCH_THRESHOLD`] transfers
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for BatchQueue<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> BatchQueue<K> {
    /// Creates an empty queue stamping records with `clock`
    pub fn with_clock(clock: K) -> Self {
        Self {
            pending: vec![],
            threshold: BATCH_THRESHOLD,
            clock,
        }
    }

    /// Overrides the number of transfers per batch
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    /// Number of submitted but unsettled transfers
    pub fn size(&self) -> usize {
        self.pending.len()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn pending(&self) -> &[PendingTransfer] {
        &self.pending
    }

    /// Removes and returns every pending transfer without settling them
    pub fn drain(&mut self) -> Vec<PendingTransfer> {
        std::mem::take(&mut self.pending)
    }

    /// Signs and submits `transfer`, then commits the batch if it is full.
    ///
    /// A transfer that fails to be submitted is not queued. When the commit
    /// fails the pending transfers are kept, and the commit is attempted
    /// again on the next call.
    pub async fn enqueue<C, L>(
        &mut self,
        chain: &C,
        ledger: &L,
        transfer: Transfer,
    ) -> Result<Enqueued, Error>
    where
        C: ChainClient + ?Sized,
        L: Ledger + ?Sized,
    {
        let Transfer {
            sender,
            receiver,
            amount,
        } = transfer;

        let value = amount.positive()?.to_wei()?;
        let key = sender.key_pair()?;
        let nonce = chain
            .transaction_count(&sender.address, BlockTag::Pending)
            .await?;
        let chain_id = chain.chain_id().await?;

        let tx = value_transfer(chain_id, nonce, receiver.address, value);
        let signed = SignedTransaction::sign(tx, &key)?;
        let tx_hash = chain.send_raw_transaction(signed.raw()).await?;
        if tx_hash != signed.hash() {
            warn!(expected = %signed.hash(), got = %tx_hash, "node reported a different hash");
        }

        info!(
            %tx_hash,
            from = %sender.name,
            to = %receiver.name,
            %amount,
            "transfer submitted"
        );
        self.pending.push(PendingTransfer {
            tx_hash,
            sender: sender.address,
            receiver: receiver.address,
            amount,
        });

        if self.pending.len() < self.threshold {
            return Ok(Enqueued::Queued {
                tx_hash,
                pending: self.pending.len(),
                threshold: self.threshold,
            });
        }

        let (block_number, count) = self.commit(chain, ledger).await?;
        Ok(Enqueued::Committed {
            tx_hash,
            block_number,
            count,
        })
    }

    /// Mines a block and settles every pending transfer. Returns the head
    /// block number and the number of settled transfers.
    ///
    /// Records carry the block their receipt reports, which is older than
    /// the head when a previous attempt mined them but failed to settle.
    pub async fn commit<C, L>(
        &mut self,
        chain: &C,
        ledger: &L,
    ) -> Result<(u64, usize), Error>
    where
        C: ChainClient + ?Sized,
        L: Ledger + ?Sized,
    {
        chain.mine().await?;
        let block_number = chain.block_number().await?;
        let timestamp = self.clock.now();

        let mut records = Vec::with_capacity(self.pending.len());
        for pending in &self.pending {
            let receipt = chain
                .transaction_receipt(&pending.tx_hash)
                .await?
                .ok_or_else(|| Error::MissingReceipt(pending.tx_hash.to_string()))?;
            if !receipt.success {
                warn!(tx_hash = %pending.tx_hash, "transaction reverted");
            }
            records.push(TransactionRecord {
                tx_hash: pending.tx_hash,
                sender: pending.sender,
                receiver: pending.receiver,
                value: pending.amount,
                gas_used: receipt.gas_used,
                block_number: receipt.block_number,
                timestamp,
            });
        }

        ledger.settle(&records).await?;
        self.pending.clear();

        info!(block_number, count = records.len(), "batch committed");
        Ok((block_number, records.len()))
    }
}
