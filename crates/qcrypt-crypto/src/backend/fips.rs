//! ML-KEM through the pure-Rust `fips203` crate

use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};
use rand::rngs::OsRng;
use zeroize::{Zeroize, Zeroizing};

use super::KemFault;
use crate::variant::KemVariant;
use crate::SHARED_SECRET_SIZE;

/// Bind `$m` to the fips203 module for `$variant` and evaluate `$body`.
macro_rules! with_param_set {
    ($variant:expr, $m:ident => $body:expr) => {
        match $variant {
            KemVariant::Variant512 => {
                use fips203::ml_kem_512 as $m;
                $body
            }
            KemVariant::Variant768 => {
                use fips203::ml_kem_768 as $m;
                $body
            }
            KemVariant::Variant1024 => {
                use fips203::ml_kem_1024 as $m;
                $body
            }
        }
    };
}

pub(super) fn keygen(variant: KemVariant) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), KemFault> {
    with_param_set!(variant, m => {
        let (ek, dk) = m::KG::try_keygen_with_rng(&mut OsRng)
            .map_err(|e| KemFault::Failed(format!("keygen: {e}")))?;
        let mut dk_bytes = dk.into_bytes();
        let private_key = Zeroizing::new(dk_bytes.to_vec());
        dk_bytes.zeroize();
        Ok((ek.into_bytes().to_vec(), private_key))
    })
}

pub(super) fn encapsulate(
    variant: KemVariant,
    public_key: &[u8],
) -> Result<(Vec<u8>, Zeroizing<[u8; SHARED_SECRET_SIZE]>), KemFault> {
    with_param_set!(variant, m => {
        let ek = m::EncapsKey::try_from_bytes(
            public_key
                .try_into()
                .map_err(|_| KemFault::Rejected("public key length".into()))?,
        )
        .map_err(|e| KemFault::Rejected(format!("public key: {e}")))?;

        let (ss, ct) = ek
            .try_encaps_with_rng(&mut OsRng)
            .map_err(|e| KemFault::Failed(format!("encapsulate: {e}")))?;

        Ok((ct.into_bytes().to_vec(), Zeroizing::new(ss.into_bytes())))
    })
}

pub(super) fn decapsulate(
    variant: KemVariant,
    private_key: &[u8],
    kem_ciphertext: &[u8],
) -> Result<Zeroizing<[u8; SHARED_SECRET_SIZE]>, KemFault> {
    with_param_set!(variant, m => {
        let dk = m::DecapsKey::try_from_bytes(
            private_key
                .try_into()
                .map_err(|_| KemFault::Rejected("private key length".into()))?,
        )
        .map_err(|e| KemFault::Rejected(format!("private key: {e}")))?;

        let ct = m::CipherText::try_from_bytes(
            kem_ciphertext
                .try_into()
                .map_err(|_| KemFault::Rejected("ciphertext length".into()))?,
        )
        .map_err(|e| KemFault::Rejected(format!("ciphertext: {e}")))?;

        let ss = dk
            .try_decaps(&ct)
            .map_err(|e| KemFault::Rejected(format!("decapsulate: {e}")))?;

        Ok(Zeroizing::new(ss.into_bytes()))
    })
}
