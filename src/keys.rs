use crate::derivation::{DerivationError, ExtendedKey};
use crate::network::Network;
use bitcoin_hashes::{hash160, Hash};
use secp256k1::{PublicKey, SecretKey};
use std::error::Error;
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

/// Length of a serialized BIP32 extended key before the checksum.
const EXTENDED_KEY_LEN: usize = 78;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    DerivationError(DerivationError),
    InvalidBase58,
    InvalidLength(usize),
    UnknownVersion([u8; 4]),
    WrongNetwork(Network),
    NotPrivate,
    InvalidCompressionFlag(u8),
    InvalidKeyData,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyError::DerivationError(e) => write!(f, "Derivation error: {}", e),
            KeyError::InvalidBase58 => write!(f, "Invalid Base58Check encoding"),
            KeyError::InvalidLength(len) => write!(f, "Unexpected payload length {}", len),
            KeyError::UnknownVersion(v) => write!(f, "Unknown version bytes {}", hex::encode(v)),
            KeyError::WrongNetwork(n) => write!(f, "Key is encoded for {}", n),
            KeyError::NotPrivate => write!(f, "Extended key has no private component"),
            KeyError::InvalidCompressionFlag(b) => {
                write!(f, "Unexpected compression flag 0x{:02x}", b)
            }
            KeyError::InvalidKeyData => write!(f, "Invalid key data"),
        }
    }
}

impl Error for KeyError {}

impl From<DerivationError> for KeyError {
    fn from(err: DerivationError) -> Self {
        KeyError::DerivationError(err)
    }
}

impl From<bs58::decode::Error> for KeyError {
    fn from(_: bs58::decode::Error) -> Self {
        KeyError::InvalidBase58
    }
}

impl From<secp256k1::Error> for KeyError {
    fn from(_: secp256k1::Error) -> Self {
        KeyError::InvalidKeyData
    }
}

/// Serializes an extended key as Base58Check (xprv/xpub, tprv/tpub).
///
/// Asking for the private form of a watch-only key fails with
/// `KeyError::NotPrivate`.
pub fn serialize_extended(
    key: &ExtendedKey,
    network: Network,
    private: bool,
) -> Result<String, KeyError> {
    let mut data = Vec::with_capacity(EXTENDED_KEY_LEN);

    if private {
        data.extend_from_slice(&network.xprv_version());
    } else {
        data.extend_from_slice(&network.xpub_version());
    }
    data.push(key.depth);
    data.extend_from_slice(&key.parent_fingerprint);
    data.extend_from_slice(&key.child_number.to_be_bytes());
    data.extend_from_slice(&key.chain_code);

    if private {
        let secret = key.private_key.ok_or(KeyError::NotPrivate)?;
        data.push(0x00);
        data.extend_from_slice(&secret.secret_bytes());
    } else {
        data.extend_from_slice(&key.public_key.serialize());
    }

    Ok(bs58::encode(&data).with_check().into_string())
}

/// Parses a Base58Check extended key, requiring it to be encoded for `network`.
pub fn deserialize_extended(encoded: &str, network: Network) -> Result<ExtendedKey, KeyError> {
    let data = bs58::decode(encoded.trim()).with_check(None).into_vec()?;
    if data.len() != EXTENDED_KEY_LEN {
        return Err(KeyError::InvalidLength(data.len()));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&data[0..4]);
    let depth = data[4];
    let mut parent_fingerprint = [0u8; 4];
    parent_fingerprint.copy_from_slice(&data[5..9]);
    let mut child_number = [0u8; 4];
    child_number.copy_from_slice(&data[9..13]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&data[13..45]);
    let key_bytes = &data[45..78];

    let secp = secp256k1::Secp256k1::new();
    let (private_key, public_key) = if version == network.xprv_version() {
        if key_bytes[0] != 0x00 {
            return Err(KeyError::InvalidKeyData);
        }
        let secret = SecretKey::from_slice(&key_bytes[1..])?;
        (Some(secret), PublicKey::from_secret_key(&secp, &secret))
    } else if version == network.xpub_version() {
        (None, PublicKey::from_slice(key_bytes)?)
    } else {
        return Err(version_mismatch(version, network));
    };

    Ok(ExtendedKey {
        private_key,
        public_key,
        chain_code,
        depth,
        parent_fingerprint,
        child_number: u32::from_be_bytes(child_number),
    })
}

fn version_mismatch(version: [u8; 4], network: Network) -> KeyError {
    let other = match network {
        Network::MainNet => Network::TestNet,
        Network::TestNet => Network::MainNet,
    };
    if version == other.xprv_version() || version == other.xpub_version() {
        KeyError::WrongNetwork(other)
    } else {
        KeyError::UnknownVersion(version)
    }
}

/// Exports a private key in Wallet Import Format, flagged as compressed.
pub fn export_wif(secret: &SecretKey, network: Network) -> String {
    let mut data = Vec::with_capacity(34);
    data.push(network.wif_version());
    data.extend_from_slice(&secret.secret_bytes());
    data.push(0x01);
    bs58::encode(&data).with_check().into_string()
}

/// Parses a compressed-key WIF string encoded for `network`.
pub fn import_wif(wif: &str, network: Network) -> Result<SecretKey, KeyError> {
    let data = bs58::decode(wif.trim())
        .with_check(Some(network.wif_version()))
        .into_vec()?;
    if data.len() != 34 {
        return Err(KeyError::InvalidLength(data.len()));
    }
    if data[33] != 0x01 {
        return Err(KeyError::InvalidCompressionFlag(data[33]));
    }
    Ok(SecretKey::from_slice(&data[1..33])?)
}

/// Legacy Pay-to-PubKey-Hash address of the compressed public key.
pub fn p2pkh_address(public_key: &PublicKey, network: Network) -> String {
    let pubkey_hash = hash160::Hash::hash(&public_key.serialize());

    let mut address_bytes = Vec::with_capacity(21);
    address_bytes.push(network.p2pkh_version());
    address_bytes.extend_from_slice(pubkey_hash.as_byte_array());

    bs58::encode(&address_bytes).with_check().into_string()
}

/// Splits a P2PKH address into its version byte and 20-byte key hash.
pub fn decode_p2pkh(address: &str) -> Result<(u8, [u8; 20]), KeyError> {
    let data = bs58::decode(address).with_check(None).into_vec()?;
    if data.len() != 21 {
        return Err(KeyError::InvalidLength(data.len()));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&data[1..]);
    Ok((data[0], hash))
}

/// Keccak-256 with the original padding (not NIST SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

/// The 64 X‖Y coordinate bytes of a public key, without the 0x04 tag.
pub fn uncompressed_coordinates(public_key: &PublicKey) -> [u8; 64] {
    let serialized = public_key.serialize_uncompressed();
    let mut coordinates = [0u8; 64];
    coordinates.copy_from_slice(&serialized[1..]);
    coordinates
}

/// Ethereum address: last 20 bytes of keccak256(X‖Y), lowercase hex with 0x.
pub fn eth_address(public_key: &PublicKey) -> String {
    let hash = keccak256(&uncompressed_coordinates(public_key));
    format!("0x{}", hex::encode(&hash[12..]))
}

/// EIP-55 mixed-case checksum rendering of a lowercase `0x` address.
pub fn eth_checksum_address(address: &str) -> String {
    let hex_addr = address.trim_start_matches("0x").to_ascii_lowercase();
    let hash = keccak256(hex_addr.as_bytes());

    let mut checksum = String::with_capacity(42);
    checksum.push_str("0x");
    for (i, c) in hex_addr.chars().enumerate() {
        let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksum.push(c.to_ascii_uppercase());
        } else {
            checksum.push(c);
        }
    }
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "000102030405060708090a0b0c0d0e0f";
    const CHILD_XPRV: &str = "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7";
    const CHILD_XPUB: &str = "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw";

    fn child() -> ExtendedKey {
        ExtendedKey::from_seed(&hex::decode(SEED).unwrap())
            .unwrap()
            .derive_hardened(0)
            .unwrap()
    }

    #[test]
    fn master_serialization_matches_test_vector() {
        let master = ExtendedKey::from_seed(&hex::decode(SEED).unwrap()).unwrap();
        assert_eq!(
            serialize_extended(&master, Network::MainNet, false).unwrap(),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
        assert_eq!(
            serialize_extended(&master, Network::MainNet, true).unwrap(),
            "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi"
        );
    }

    #[test]
    fn child_serialization_matches_test_vector() {
        let key = child();
        assert_eq!(serialize_extended(&key, Network::MainNet, true).unwrap(), CHILD_XPRV);
        assert_eq!(serialize_extended(&key, Network::MainNet, false).unwrap(), CHILD_XPUB);
    }

    #[test]
    fn testnet_serialization_uses_testnet_prefixes() {
        let key = child();
        let tprv = serialize_extended(&key, Network::TestNet, true).unwrap();
        let tpub = serialize_extended(&key, Network::TestNet, false).unwrap();
        assert!(tprv.starts_with("tprv"));
        assert!(tpub.starts_with("tpub"));
    }

    #[test]
    fn deserializes_private_and_public_forms() {
        let private = deserialize_extended(CHILD_XPRV, Network::MainNet).unwrap();
        assert!(private.has_private_key());
        assert_eq!(
            serialize_extended(&private, Network::MainNet, false).unwrap(),
            CHILD_XPUB
        );

        let public = deserialize_extended(CHILD_XPUB, Network::MainNet).unwrap();
        assert!(!public.has_private_key());
        assert_eq!(public.public_key, private.public_key);
        assert_eq!(
            serialize_extended(&public, Network::MainNet, true).unwrap_err(),
            KeyError::NotPrivate
        );
    }

    #[test]
    fn deserialize_rejects_other_network() {
        assert_eq!(
            deserialize_extended(CHILD_XPRV, Network::TestNet).unwrap_err(),
            KeyError::WrongNetwork(Network::MainNet)
        );
    }

    #[test]
    fn deserialize_rejects_corrupted_checksum() {
        let mut corrupted = CHILD_XPRV.to_string();
        corrupted.pop();
        corrupted.push('8');
        assert_eq!(
            deserialize_extended(&corrupted, Network::MainNet).unwrap_err(),
            KeyError::InvalidBase58
        );
    }

    #[test]
    fn wif_matches_known_encoding() {
        let key = child();
        let secret = key.private_key.unwrap();
        let wif = export_wif(&secret, Network::MainNet);
        assert_eq!(wif, "L5BmPijJjrKbiUfG4zbiFKNqkvuJ8usooJmzuD7Z8dkRoTThYnAT");
        assert_eq!(import_wif(&wif, Network::MainNet).unwrap(), secret);
        assert!(import_wif(&wif, Network::TestNet).is_err());

        let testnet_wif = export_wif(&secret, Network::TestNet);
        assert_eq!(testnet_wif, "cVYkrdjAAv1rsv8XTQQqcdsuPAChoMyVsLvU1da4dkQS4CYZvuwy");
    }

    #[test]
    fn wif_with_bad_compression_flag_is_rejected() {
        let secret = child().private_key.unwrap();
        let mut data = vec![Network::MainNet.wif_version()];
        data.extend_from_slice(&secret.secret_bytes());
        data.push(0x02);
        let wif = bs58::encode(&data).with_check().into_string();
        assert_eq!(
            import_wif(&wif, Network::MainNet).unwrap_err(),
            KeyError::InvalidCompressionFlag(0x02)
        );

        let uncompressed = bs58::encode(&data[..33]).with_check().into_string();
        assert_eq!(
            import_wif(&uncompressed, Network::MainNet).unwrap_err(),
            KeyError::InvalidLength(33)
        );
    }

    #[test]
    fn p2pkh_matches_known_addresses() {
        let key = child();
        assert_eq!(
            p2pkh_address(&key.public_key, Network::MainNet),
            "19Q2WoS5hSS6T8GjhK8KZLMgmWaq4neXrh"
        );
        assert_eq!(
            p2pkh_address(&key.public_key, Network::TestNet),
            "mouyorX4WTsMEEkMQt6hPFa1dWBXws2Yos"
        );
        let (version, hash) = decode_p2pkh("19Q2WoS5hSS6T8GjhK8KZLMgmWaq4neXrh").unwrap();
        assert_eq!(version, 0x00);
        assert_eq!(hex::encode(hash), "5c1bd648ed23aa5fd50ba52b2457c11e9e80a6a7");
    }

    #[test]
    fn keccak_is_not_nist_sha3() {
        // keccak256("") differs from sha3_256("") = a7ffc6f8...
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn eth_address_for_generator_point() {
        let secret = SecretKey::from_slice(&[
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
        ])
        .unwrap();
        let public = PublicKey::from_secret_key(&secp256k1::Secp256k1::new(), &secret);
        assert_eq!(eth_address(&public), "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn checksum_address_matches_eip55() {
        assert_eq!(
            eth_checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }
}
