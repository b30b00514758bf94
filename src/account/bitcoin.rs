use std::cell::OnceCell;
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

use super::{cached, display_account, non_empty, Account, Coin};
use crate::derivation::{DerivationError, ExtendedKey};
use crate::entropy;
use crate::error::AccountError;
use crate::keys::{deserialize_extended, export_wif, p2pkh_address, serialize_extended, KeyError};
use crate::network::Network;

/// Attempts before giving up on seeds that map outside the curve order.
const MAX_SEED_ATTEMPTS: usize = 8;

/// A BIP32 account: the hardened child `m/0'` of a random master key.
///
/// Keys are held as Base58Check extended-key strings.
pub struct BitcoinAccount {
    public_key: OnceCell<String>,
    private_key: Option<Zeroizing<String>>,
    address: OnceCell<String>,
    network: Network,
}

impl BitcoinAccount {
    /// Builds an account from serialized extended keys.
    ///
    /// The network is required and checked before anything is derived.
    pub fn new(
        public_key: Option<String>,
        private_key: Option<String>,
        address: Option<String>,
        network: Option<Network>,
    ) -> Result<Self, AccountError> {
        let network = network.ok_or_else(|| {
            AccountError::Validation("a valid network must be provided".to_string())
        })?;
        let public_key = non_empty(public_key);
        let private_key = non_empty(private_key);
        if public_key.is_none() && private_key.is_none() {
            return Err(AccountError::Validation(
                "a private or public key must be provided".to_string(),
            ));
        }

        Ok(BitcoinAccount {
            public_key: public_key.map(OnceCell::from).unwrap_or_default(),
            private_key: private_key.map(Zeroizing::new),
            address: non_empty(address).map(OnceCell::from).unwrap_or_default(),
            network,
        })
    }

    /// Creates a random master key and keeps its hardened child `0'`.
    ///
    /// `extra_entropy` is appended to the OS randomness before the master
    /// key is computed.
    pub fn generate(extra_entropy: Option<&[u8]>, testnet: bool) -> Result<Self, AccountError> {
        let network = Network::from_testnet_flag(testnet);
        let master = new_master_key(extra_entropy)?;
        let child = master.derive_hardened(0)?;

        debug!(%network, extra_entropy = extra_entropy.is_some(), "generated bitcoin account");

        let public_key = serialize_extended(&child, network, false)?;
        let private_key = serialize_extended(&child, network, true)?;
        Self::new(Some(public_key), Some(private_key), None, Some(network))
    }

    /// The stored extended private key (xprv/tprv), as opposed to the WIF
    /// export returned by [`Account::private_key`].
    pub fn extended_private_key(&self) -> Result<&str, AccountError> {
        self.private_key
            .as_deref()
            .map(String::as_str)
            .ok_or_else(AccountError::no_private_key)
    }

    /// Deserializes whichever key is present, preferring the private one.
    fn extended_key(&self) -> Result<ExtendedKey, AccountError> {
        let encoded = match (&self.private_key, self.public_key.get()) {
            (Some(private_key), _) => private_key.as_str(),
            (None, Some(public_key)) => public_key.as_str(),
            (None, None) => {
                return Err(AccountError::Derivation(
                    "no key material to derive from".to_string(),
                ))
            }
        };
        Ok(deserialize_extended(encoded, self.network)?)
    }
}

fn new_master_key(extra_entropy: Option<&[u8]>) -> Result<ExtendedKey, AccountError> {
    let mut last_error = DerivationError::KeyDerivationFailed;
    for _ in 0..MAX_SEED_ATTEMPTS {
        let seed = entropy::master_seed(extra_entropy);
        match ExtendedKey::from_seed(&seed) {
            Ok(master) => return Ok(master),
            Err(e) => last_error = e,
        }
    }
    Err(last_error.into())
}

impl Account for BitcoinAccount {
    fn coin(&self) -> Coin {
        Coin::Bitcoin
    }

    fn network(&self) -> Option<Network> {
        Some(self.network)
    }

    fn has_private_keys(&self) -> bool {
        self.private_key.is_some()
    }

    fn public_key(&self) -> Result<&str, AccountError> {
        cached(&self.public_key, || {
            let private_key = self.private_key.as_ref().ok_or_else(|| {
                AccountError::Derivation("no key material to derive a public key from".to_string())
            })?;
            let key = deserialize_extended(private_key, self.network)?;
            Ok(serialize_extended(&key.neuter(), self.network, false)?)
        })
    }

    fn private_key(&self) -> Result<String, AccountError> {
        let key = deserialize_extended(self.extended_private_key()?, self.network)?;
        let secret = key.private_key.ok_or(KeyError::NotPrivate)?;
        Ok(export_wif(&secret, self.network))
    }

    fn address(&self) -> Result<&str, AccountError> {
        cached(&self.address, || {
            let key = self.extended_key()?;
            Ok(p2pkh_address(&key.public_key, self.network))
        })
    }
}

impl fmt::Display for BitcoinAccount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        display_account(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::decode_p2pkh;

    const CHILD_XPRV: &str = "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7";
    const CHILD_XPUB: &str = "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw";

    fn from_strings(
        public_key: Option<&str>,
        private_key: Option<&str>,
        address: Option<&str>,
        network: Network,
    ) -> Result<BitcoinAccount, AccountError> {
        BitcoinAccount::new(
            public_key.map(str::to_string),
            private_key.map(str::to_string),
            address.map(str::to_string),
            Some(network),
        )
    }

    fn imported() -> BitcoinAccount {
        from_strings(None, Some(CHILD_XPRV), None, Network::MainNet).unwrap()
    }

    #[test]
    fn imported_private_key_derives_known_values() {
        let account = imported();
        assert_eq!(account.public_key().unwrap(), CHILD_XPUB);
        assert_eq!(account.address().unwrap(), "19Q2WoS5hSS6T8GjhK8KZLMgmWaq4neXrh");
        assert_eq!(
            account.private_key().unwrap(),
            "L5BmPijJjrKbiUfG4zbiFKNqkvuJ8usooJmzuD7Z8dkRoTThYnAT"
        );
        assert_eq!(account.extended_private_key().unwrap(), CHILD_XPRV);
    }

    #[test]
    fn mainnet_address_uses_mainnet_version() {
        let account = BitcoinAccount::generate(None, false).unwrap();
        let (version, _) = decode_p2pkh(account.address().unwrap()).unwrap();
        assert_eq!(version, 0x00);
        assert!(account.public_key().unwrap().starts_with("xpub"));
        assert!(account.extended_private_key().unwrap().starts_with("xprv"));
    }

    #[test]
    fn testnet_address_uses_testnet_version() {
        let account = BitcoinAccount::generate(None, true).unwrap();
        let (version, _) = decode_p2pkh(account.address().unwrap()).unwrap();
        assert_eq!(version, 0x6f);
        assert_eq!(account.network(), Some(Network::TestNet));
        assert!(account.public_key().unwrap().starts_with("tpub"));
    }

    #[test]
    fn generated_key_is_hardened_child_zero() {
        let account = BitcoinAccount::generate(Some(b"extra"), false).unwrap();
        let xprv = account.extended_private_key().unwrap();
        let key = deserialize_extended(xprv, Network::MainNet).unwrap();
        assert_eq!(key.depth, 1);
        assert_eq!(key.child_number, 0x80000000);
    }

    #[test]
    fn round_trip_through_extended_private_key() {
        let original = BitcoinAccount::generate(None, false).unwrap();
        let restored = BitcoinAccount::new(
            None,
            Some(original.extended_private_key().unwrap().to_string()),
            None,
            Some(Network::MainNet),
        )
        .unwrap();
        assert_eq!(restored.address().unwrap(), original.address().unwrap());
        assert_eq!(restored.public_key().unwrap(), original.public_key().unwrap());
        assert_eq!(restored.private_key().unwrap(), original.private_key().unwrap());
    }

    #[test]
    fn accessors_are_idempotent() {
        let account = imported();
        let first = account.address().unwrap().to_string();
        assert_eq!(account.address().unwrap(), first);
        let first = account.public_key().unwrap().to_string();
        assert_eq!(account.public_key().unwrap(), first);
    }

    #[test]
    fn watch_only_account() {
        let account = from_strings(Some(CHILD_XPUB), None, None, Network::MainNet).unwrap();
        assert!(!account.has_private_keys());
        assert!(matches!(account.private_key(), Err(AccountError::Access(_))));
        assert!(matches!(account.extended_private_key(), Err(AccountError::Access(_))));
        assert_eq!(account.address().unwrap(), "19Q2WoS5hSS6T8GjhK8KZLMgmWaq4neXrh");
        assert_eq!(
            account.format_text().unwrap(),
            format!("Public: {}\nAddress: 19Q2WoS5hSS6T8GjhK8KZLMgmWaq4neXrh", CHILD_XPUB)
        );
    }

    #[test]
    fn format_text_lists_wif_private_key() {
        let text = imported().format_text().unwrap();
        assert_eq!(
            text,
            format!(
                "Private: L5BmPijJjrKbiUfG4zbiFKNqkvuJ8usooJmzuD7Z8dkRoTThYnAT\nPublic: {}\nAddress: 19Q2WoS5hSS6T8GjhK8KZLMgmWaq4neXrh",
                CHILD_XPUB
            )
        );
    }

    #[test]
    fn missing_network_is_rejected_before_derivation() {
        let result = BitcoinAccount::new(None, Some("not even base58".to_string()), None, None);
        assert!(matches!(result, Err(AccountError::Validation(_))));
    }

    #[test]
    fn missing_keys_are_rejected() {
        let result = BitcoinAccount::new(None, None, None, Some(Network::MainNet));
        assert!(matches!(result, Err(AccountError::Validation(_))));
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let result = from_strings(Some(""), None, None, Network::MainNet);
        assert!(matches!(result, Err(AccountError::Validation(_))));
        let result = from_strings(None, Some(""), None, Network::MainNet);
        assert!(matches!(result, Err(AccountError::Validation(_))));

        let account = from_strings(None, Some(CHILD_XPRV), Some(""), Network::MainNet).unwrap();
        assert_eq!(account.address().unwrap(), "19Q2WoS5hSS6T8GjhK8KZLMgmWaq4neXrh");
    }

    #[test]
    fn public_key_is_neutered_private_key() {
        let account = imported();
        let xpub = deserialize_extended(account.public_key().unwrap(), Network::MainNet).unwrap();
        assert!(!xpub.has_private_key());
        assert_eq!(xpub.depth, 1);
        assert_eq!(xpub.child_number, 0x80000000);
    }

    #[test]
    fn key_from_other_network_fails_to_derive() {
        let account = from_strings(None, Some(CHILD_XPRV), None, Network::TestNet).unwrap();
        assert!(matches!(
            account.address(),
            Err(AccountError::Key(KeyError::WrongNetwork(Network::MainNet)))
        ));
    }

    #[test]
    fn public_key_where_private_expected_is_rejected() {
        let account = from_strings(None, Some(CHILD_XPUB), None, Network::MainNet).unwrap();
        assert!(matches!(
            account.private_key(),
            Err(AccountError::Key(KeyError::NotPrivate))
        ));
    }
}
