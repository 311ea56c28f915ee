// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{TxKind, U256};
use alloy::signers::SignerSync;

pub use alloy::primitives::TxHash;

use crate::currency::Wei;
use crate::key::{Address, KeyPair};
use crate::{Error, GAS_LIMIT, GAS_PRICE};

/// Parses a `0x` prefixed transaction hash
pub fn parse_hash(s: &str) -> Result<TxHash, Error> {
    s.trim().parse().map_err(|_| Error::BadHex(s.to_string()))
}

/// A plain value transfer: legacy (type 0), no calldata, replay protected
/// for `chain_id`
pub fn value_transfer(
    chain_id: u64,
    nonce: u64,
    to: Address,
    value: Wei,
) -> TxLegacy {
    TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price: GAS_PRICE,
        gas_limit: GAS_LIMIT,
        to: TxKind::Call(to),
        value: U256::from(value),
        ..Default::default()
    }
}

/// A signed transaction, encoded for `eth_sendRawTransaction`
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    raw: Vec<u8>,
    hash: TxHash,
}

impl SignedTransaction {
    /// Signs `tx` with `key`
    pub fn sign(tx: TxLegacy, key: &KeyPair) -> Result<Self, Error> {
        let signature = key.signer().sign_hash_sync(&tx.signature_hash())?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(Self {
            hash: *envelope.tx_hash(),
            raw: envelope.encoded_2718(),
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Hash the node will report for this transaction
    pub fn hash(&self) -> TxHash {
        self.hash
    }
}
