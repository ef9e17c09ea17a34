//! ML-KEM through the PQClean C implementation (`pqcrypto-mlkem`)

use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};
use zeroize::Zeroizing;

use super::{shared_secret_from_slice, KemFault};
use crate::variant::KemVariant;
use crate::SHARED_SECRET_SIZE;

macro_rules! with_param_set {
    ($variant:expr, $m:ident => $body:expr) => {
        match $variant {
            KemVariant::Variant512 => {
                use pqcrypto_mlkem::mlkem512 as $m;
                $body
            }
            KemVariant::Variant768 => {
                use pqcrypto_mlkem::mlkem768 as $m;
                $body
            }
            KemVariant::Variant1024 => {
                use pqcrypto_mlkem::mlkem1024 as $m;
                $body
            }
        }
    };
}

pub(super) fn keygen(variant: KemVariant) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), KemFault> {
    with_param_set!(variant, m => {
        let (pk, sk) = m::keypair();
        Ok((pk.as_bytes().to_vec(), Zeroizing::new(sk.as_bytes().to_vec())))
    })
}

pub(super) fn encapsulate(
    variant: KemVariant,
    public_key: &[u8],
) -> Result<(Vec<u8>, Zeroizing<[u8; SHARED_SECRET_SIZE]>), KemFault> {
    with_param_set!(variant, m => {
        let pk = m::PublicKey::from_bytes(public_key)
            .map_err(|e| KemFault::Rejected(format!("public key: {e:?}")))?;
        let (ss, ct) = m::encapsulate(&pk);
        Ok((ct.as_bytes().to_vec(), shared_secret_from_slice(ss.as_bytes())?))
    })
}

pub(super) fn decapsulate(
    variant: KemVariant,
    private_key: &[u8],
    kem_ciphertext: &[u8],
) -> Result<Zeroizing<[u8; SHARED_SECRET_SIZE]>, KemFault> {
    with_param_set!(variant, m => {
        let sk = m::SecretKey::from_bytes(private_key)
            .map_err(|e| KemFault::Rejected(format!("private key: {e:?}")))?;
        let ct = m::Ciphertext::from_bytes(kem_ciphertext)
            .map_err(|e| KemFault::Rejected(format!("ciphertext: {e:?}")))?;
        let ss = m::decapsulate(&ct, &sk);
        shared_secret_from_slice(ss.as_bytes())
    })
}
