use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::AccountError;

/// Bitcoin network an account's keys and addresses are encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    MainNet,
    TestNet,
}

impl Network {
    /// Version byte prefixed to a P2PKH address payload.
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::MainNet => 0x00,
            Network::TestNet => 0x6f,
        }
    }

    /// Version byte prefixed to a Wallet Import Format payload.
    pub fn wif_version(&self) -> u8 {
        match self {
            Network::MainNet => 0x80,
            Network::TestNet => 0xef,
        }
    }

    /// BIP32 version bytes for extended private keys (xprv / tprv).
    pub fn xprv_version(&self) -> [u8; 4] {
        match self {
            Network::MainNet => [0x04, 0x88, 0xAD, 0xE4],
            Network::TestNet => [0x04, 0x35, 0x83, 0x94],
        }
    }

    /// BIP32 version bytes for extended public keys (xpub / tpub).
    pub fn xpub_version(&self) -> [u8; 4] {
        match self {
            Network::MainNet => [0x04, 0x88, 0xB2, 0x1E],
            Network::TestNet => [0x04, 0x35, 0x87, 0xCF],
        }
    }

    pub fn from_testnet_flag(testnet: bool) -> Self {
        if testnet {
            Network::TestNet
        } else {
            Network::MainNet
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Network::MainNet => write!(f, "mainnet"),
            Network::TestNet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::MainNet),
            "testnet" | "test" => Ok(Network::TestNet),
            other => Err(AccountError::Validation(format!(
                "unknown network '{}'",
                other
            ))),
        }
    }
}
