use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

/// Bytes of OS randomness drawn for every new master seed.
pub const SEED_ENTROPY_BYTES: usize = 64;

/// Fills a buffer of `byte_length` bytes from the operating system CSPRNG.
pub fn generate_entropy(byte_length: usize) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(vec![0u8; byte_length]);
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Builds the secret fed to master key generation: fresh OS randomness
/// followed by whatever extra entropy the caller mixes in.
pub fn master_seed(extra_entropy: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
    let extra = extra_entropy.unwrap_or_default();
    let mut seed = Zeroizing::new(Vec::with_capacity(SEED_ENTROPY_BYTES + extra.len()));
    seed.extend_from_slice(&generate_entropy(SEED_ENTROPY_BYTES));
    seed.extend_from_slice(extra);
    seed
}
