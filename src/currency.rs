// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use core::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The underlying unit of Ether
pub type Wei = u128;

const DECIMALS: usize = 18;
const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;

/// Denomination for ETH.
///
/// Amounts and cached balances are kept as floating point values, the same
/// way they are stored in the database. Only the conversion to [`Wei`] for
/// the wire is exact.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ether(f64);

impl Ether {
    /// Zero ETH
    pub const ZERO: Ether = Ether(0.0);

    /// Create Ether from f64
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get value as f64
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Converts into Wei using the shortest decimal representation of the
    /// value, so `0.1` becomes exactly `100_000_000_000_000_000`
    pub fn to_wei(&self) -> Result<Wei, Error> {
        if !self.0.is_finite() || self.0 < 0.0 {
            return Err(Error::InvalidAmount(self.0.to_string()));
        }

        let repr = self.0.to_string();
        let (int, frac) = repr.split_once('.').unwrap_or((&repr, ""));
        if frac.len() > DECIMALS {
            return Err(Error::InvalidAmount(format!(
                "{} has more than {} decimals",
                repr, DECIMALS
            )));
        }

        let overflow = || Error::InvalidAmount(format!("{} is too large", repr));
        let int: Wei = int.parse().map_err(|_| overflow())?;
        let frac: Wei = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS);
            padded.parse().map_err(|_| overflow())?
        };

        int.checked_mul(WEI_PER_ETHER)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(overflow)
    }

    /// Validates the value as a transfer amount: finite and strictly
    /// positive
    pub fn positive(self) -> Result<Self, Error> {
        if self.0.is_finite() && self.0 > 0.0 {
            Ok(self)
        } else {
            Err(Error::InvalidAmount(self.0.to_string()))
        }
    }
}

impl PartialEq for Ether {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialEq<f64> for Ether {
    fn eq(&self, other: &f64) -> bool {
        self.0 == *other
    }
}

impl PartialOrd for Ether {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl FromStr for Ether {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAmount("no amount given".into()));
        }
        let value: f64 = s
            .parse()
            .map_err(|_| Error::InvalidAmount(s.to_string()))?;
        Self(value).positive()
    }
}

impl fmt::Display for Ether {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.*}", p, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}
