// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tracing::info;

use crate::batch::{BatchQueue, Clock, Enqueued, SystemClock, Transfer};
use crate::currency::Ether;
use crate::key::{Address, KeyPair};
use crate::rpc::{
    wait_for_receipt, BlockSummary, BlockTag, ChainClient, TransactionRequest,
};
use crate::store::{Account, Store, StoredTransaction};
use crate::{Error, FUNDING_AMOUNT, GAS_LIMIT, GAS_PRICE, RECEIPT_TIMEOUT};

/// The simulated wallet network: a node, the account directory and the
/// pending batch of transfers.
///
/// The batch lives in memory only, transfers that are still pending when
/// the simulator is dropped are never settled in the database.
pub struct Simulator<C, K = SystemClock> {
    chain: C,
    store: Store,
    queue: BatchQueue<K>,
}

impl<C: ChainClient> Simulator<C, SystemClock> {
    /// Creates a simulator backed by `chain` and `store`
    pub fn new(chain: C, store: Store) -> Self {
        Self::with_queue(chain, store, BatchQueue::new())
    }
}

impl<C: ChainClient, K: Clock> Simulator<C, K> {
    /// Creates a simulator with a custom batch queue
    pub fn with_queue(chain: C, store: Store, queue: BatchQueue<K>) -> Self {
        Self {
            chain,
            store,
            queue,
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Number of submitted transfers not yet settled
    pub fn pending(&self) -> usize {
        self.queue.size()
    }

    /// Transfers per batch
    pub fn threshold(&self) -> usize {
        self.queue.threshold()
    }

    /// Creates a new account named `name` and funds it with
    /// [`FUNDING_AMOUNT`] from a node-managed account.
    ///
    /// `status` receives progress updates while the funding transaction is
    /// being confirmed.
    pub async fn create_account(
        &self,
        name: &str,
        status: fn(&str),
    ) -> Result<Account, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.store.exists(name).await? {
            return Err(Error::AccountExists(name.to_string()));
        }

        let keys = KeyPair::random();
        if self.store.exists(&keys.address().to_string()).await? {
            return Err(Error::AccountExists(keys.address().to_string()));
        }

        let funder = self.funder().await?;
        let nonce = self
            .chain
            .transaction_count(&funder, BlockTag::Pending)
            .await?;
        let request = TransactionRequest {
            from: funder,
            to: keys.address(),
            value: FUNDING_AMOUNT.to_wei()?,
            gas: GAS_LIMIT,
            gas_price: GAS_PRICE,
            nonce,
        };

        status("Funding account...");
        let hash = self.chain.send_transaction(&request).await?;
        let receipt =
            wait_for_receipt(&self.chain, &hash, RECEIPT_TIMEOUT, status)
                .await?;
        if !receipt.success {
            return Err(Error::Transaction(format!(
                "funding transaction {} reverted",
                hash
            )));
        }

        let account = Account::new(name, &keys, FUNDING_AMOUNT);
        self.store.insert_account(&account).await?;
        info!(
            name,
            address = %account.address,
            funder = %funder,
            "account created"
        );
        Ok(account)
    }

    /// First node-managed account holding strictly more than the funding
    /// amount
    async fn funder(&self) -> Result<Address, Error> {
        let needed = FUNDING_AMOUNT.to_wei()?;
        for address in self.chain.accounts().await? {
            if self.chain.balance(&address).await? > needed {
                return Ok(address);
            }
        }
        Err(Error::NoFunder)
    }

    /// Submits a transfer of `amount` between two registered accounts. The
    /// transfer joins the pending batch, committing it once it is full.
    pub async fn send(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: Ether,
    ) -> Result<Enqueued, Error> {
        let amount = amount.positive()?;
        let sender = self.store.account(sender.trim()).await?;
        let receiver = self.store.account(receiver.trim()).await?;

        let (sender, receiver) = match (sender, receiver) {
            (Some(sender), Some(receiver)) => (sender, receiver),
            _ => return Err(Error::SenderOrReceiverNotFound),
        };

        let transfer = Transfer {
            sender,
            receiver,
            amount,
        };
        self.queue.enqueue(&self.chain, &self.store, transfer).await
    }

    /// Every registered account with its cached balance
    pub async fn accounts(&self) -> Result<Vec<Account>, Error> {
        self.store.accounts().await
    }

    /// Every settled transaction, newest first
    pub async fn transactions(&self) -> Result<Vec<StoredTransaction>, Error> {
        self.store.transactions().await
    }

    /// Settled transactions involving `name`, newest first
    pub async fn search(
        &self,
        name: &str,
    ) -> Result<Vec<StoredTransaction>, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        self.store.transactions_for(name).await
    }

    /// Summaries of every block from genesis to the current head
    pub async fn blocks(&self) -> Result<Vec<BlockSummary>, Error> {
        let head = self.chain.block_number().await?;
        let mut blocks = vec![];
        for number in 0..=head {
            if let Some(block) = self.chain.block(number).await? {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    /// Removes the account named `name` from the directory. Its settled
    /// transactions are kept.
    pub async fn delete_account(&self, name: &str) -> Result<(), Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if !self.store.delete_account(name).await? {
            return Err(Error::AccountNotFound(name.to_string()));
        }
        info!(name, "account deleted");
        Ok(())
    }
}
