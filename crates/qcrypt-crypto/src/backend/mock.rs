//! INSECURE mock KEM for tests and development machines without a real backend
//!
//! Keys and ciphertexts have the same byte sizes as the real ML-KEM variants,
//! so everything downstream (variant resolution, container layout) behaves
//! identically. The "shared secret" is a hash of the public key and the
//! ciphertext, both of which are public: anyone holding a container can
//! recover the plaintext. Never use outside tests.
//!
//! Layouts:
//! ```text
//! private key = seed (32) || public key || filler (up to the variant's private-key length)
//! ciphertext  = randomness (32) || filler (up to the variant's ciphertext length)
//! secret      = BLAKE3-derive-key("qcrypt insecure mock kem v1 secret", public key || ciphertext)
//! ```

use rand::RngCore;
use zeroize::Zeroizing;

use crate::variant::KemVariant;
use crate::SHARED_SECRET_SIZE;

const SEED_SIZE: usize = 32;

const PUBLIC_CONTEXT: &str = "qcrypt insecure mock kem v1 public key";
const PRIVATE_FILLER_CONTEXT: &str = "qcrypt insecure mock kem v1 private filler";
const CIPHERTEXT_FILLER_CONTEXT: &str = "qcrypt insecure mock kem v1 ciphertext filler";
const SECRET_CONTEXT: &str = "qcrypt insecure mock kem v1 secret";

/// Deterministic key generation from a 32-byte seed.
pub fn keygen_from_seed(
    variant: KemVariant,
    seed: &[u8; SEED_SIZE],
) -> (Vec<u8>, Zeroizing<Vec<u8>>) {
    let public_key = expand(PUBLIC_CONTEXT, seed, variant.public_key_len());

    let mut private_key = Zeroizing::new(Vec::with_capacity(variant.private_key_len()));
    private_key.extend_from_slice(seed);
    private_key.extend_from_slice(&public_key);
    let filler_len = variant.private_key_len() - private_key.len();
    private_key.extend_from_slice(&expand(PRIVATE_FILLER_CONTEXT, seed, filler_len));

    (public_key, private_key)
}

pub fn keygen(variant: KemVariant) -> (Vec<u8>, Zeroizing<Vec<u8>>) {
    let mut seed = Zeroizing::new([0u8; SEED_SIZE]);
    rand::thread_rng().fill_bytes(&mut seed[..]);
    keygen_from_seed(variant, &seed)
}

/// Deterministic encapsulation with caller-chosen randomness.
pub fn encapsulate_with_randomness(
    variant: KemVariant,
    public_key: &[u8],
    randomness: &[u8; SEED_SIZE],
) -> (Vec<u8>, Zeroizing<[u8; SHARED_SECRET_SIZE]>) {
    let mut ciphertext = Vec::with_capacity(variant.ciphertext_len());
    ciphertext.extend_from_slice(randomness);
    let filler_len = variant.ciphertext_len() - SEED_SIZE;
    ciphertext.extend_from_slice(&expand(CIPHERTEXT_FILLER_CONTEXT, randomness, filler_len));

    let secret = shared_secret(public_key, &ciphertext);
    (ciphertext, secret)
}

pub fn encapsulate(
    variant: KemVariant,
    public_key: &[u8],
) -> (Vec<u8>, Zeroizing<[u8; SHARED_SECRET_SIZE]>) {
    let mut randomness = [0u8; SEED_SIZE];
    rand::thread_rng().fill_bytes(&mut randomness);
    encapsulate_with_randomness(variant, public_key, &randomness)
}

/// Lengths are validated by the caller.
pub fn decapsulate(
    variant: KemVariant,
    private_key: &[u8],
    ciphertext: &[u8],
) -> Zeroizing<[u8; SHARED_SECRET_SIZE]> {
    let public_key = &private_key[SEED_SIZE..SEED_SIZE + variant.public_key_len()];
    shared_secret(public_key, ciphertext)
}

fn shared_secret(public_key: &[u8], ciphertext: &[u8]) -> Zeroizing<[u8; SHARED_SECRET_SIZE]> {
    let mut hasher = blake3::Hasher::new_derive_key(SECRET_CONTEXT);
    hasher.update(public_key);
    hasher.update(ciphertext);
    Zeroizing::new(*hasher.finalize().as_bytes())
}

fn expand(context: &str, input: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(input);
    hasher.finalize_xof().fill(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keygen_is_reproducible_from_seed() {
        let seed = [7u8; SEED_SIZE];
        let (pk1, sk1) = keygen_from_seed(KemVariant::Variant768, &seed);
        let (pk2, sk2) = keygen_from_seed(KemVariant::Variant768, &seed);
        assert_eq!(pk1, pk2);
        assert_eq!(*sk1, *sk2);

        let (pk3, _) = keygen_from_seed(KemVariant::Variant768, &[8u8; SEED_SIZE]);
        assert_ne!(pk1, pk3);
    }

    #[test]
    fn encapsulation_is_reproducible_from_randomness() {
        let (pk, sk) = keygen_from_seed(KemVariant::Variant512, &[1u8; SEED_SIZE]);
        let (ct1, ss1) = encapsulate_with_randomness(KemVariant::Variant512, &pk, &[2u8; 32]);
        let (ct2, ss2) = encapsulate_with_randomness(KemVariant::Variant512, &pk, &[2u8; 32]);
        assert_eq!(ct1, ct2);
        assert_eq!(*ss1, *ss2);

        let recovered = decapsulate(KemVariant::Variant512, &sk, &ct1);
        assert_eq!(*recovered, *ss1);
    }

    #[test]
    fn layouts_fill_variant_sizes() {
        for variant in KemVariant::ALL {
            let (pk, sk) = keygen(variant);
            assert_eq!(pk.len(), variant.public_key_len());
            assert_eq!(sk.len(), variant.private_key_len());
            let (ct, _) = encapsulate(variant, &pk);
            assert_eq!(ct.len(), variant.ciphertext_len());
        }
    }

    #[test]
    fn different_key_pair_gives_different_secret() {
        let (pk, _) = keygen(KemVariant::Variant1024);
        let (_, other_sk) = keygen(KemVariant::Variant1024);
        let (ct, ss) = encapsulate(KemVariant::Variant1024, &pk);
        assert_ne!(*decapsulate(KemVariant::Variant1024, &other_sk, &ct), *ss);
    }
}
