// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

use alloy::signers::local::PrivateKeySigner;

pub use alloy::primitives::{keccak256, Address};

use crate::Error;

/// Parses an address in any letter case, with or without the `0x` prefix
pub fn parse_address(s: &str) -> Result<Address, Error> {
    s.trim()
        .parse()
        .map_err(|_| Error::BadAddress(s.to_string()))
}

/// A secp256k1 key pair and the address it controls
#[derive(Clone)]
pub struct KeyPair {
    signer: PrivateKeySigner,
}

impl KeyPair {
    /// Generates a new random key pair
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// Restores a key pair from its hex encoded secret, with or without
    /// the `0x` prefix
    pub fn from_hex(secret: &str) -> Result<Self, Error> {
        let signer = secret
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| Error::BadKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// Address controlled by this key pair
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The secret as `0x` prefixed hex
    pub fn secret_hex(&self) -> String {
        self.signer.to_bytes().to_string()
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
