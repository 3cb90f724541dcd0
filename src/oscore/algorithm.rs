use aes::Aes128;
use ccm::{
    aead::{generic_array::GenericArray, Aead, NewAead, Payload},
    consts::{U13, U8},
    Ccm,
};
use hkdf::Hkdf;
use sha2::Sha256;

use super::Result;

/// The AEAD algorithms a security context can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    /// AES-CCM-16-64-128, COSE algorithm 10.
    AesCcm16_64_128,
}

impl AeadAlgorithm {
    /// The COSE algorithm identifier.
    pub fn cose_id(self) -> i32 {
        match self {
            AeadAlgorithm::AesCcm16_64_128 => 10,
        }
    }

    /// The key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            AeadAlgorithm::AesCcm16_64_128 => 16,
        }
    }

    /// The nonce length in bytes.
    pub fn nonce_len(self) -> usize {
        match self {
            AeadAlgorithm::AesCcm16_64_128 => 13,
        }
    }

    /// Encrypts and authenticates `plaintext`.
    ///
    /// DO NOT reuse the nonce with the same key.
    pub(crate) fn seal(
        self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        match self {
            AeadAlgorithm::AesCcm16_64_128 => {
                let ccm: Ccm<Aes128, U8, U13> =
                    Ccm::new(GenericArray::from_slice(key));
                Ok(ccm.encrypt(
                    GenericArray::from_slice(nonce),
                    Payload {
                        aad,
                        msg: plaintext,
                    },
                )?)
            }
        }
    }

    /// Verifies and decrypts `ciphertext`.
    pub(crate) fn open(
        self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        match self {
            AeadAlgorithm::AesCcm16_64_128 => {
                let ccm: Ccm<Aes128, U8, U13> =
                    Ccm::new(GenericArray::from_slice(key));
                Ok(ccm.decrypt(
                    GenericArray::from_slice(nonce),
                    Payload {
                        aad,
                        msg: ciphertext,
                    },
                )?)
            }
        }
    }
}

/// The hash functions used for HKDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFunction {
    Sha256,
}

impl HashFunction {
    /// Returns `l` bytes of output keying material derived with HKDF.
    pub(crate) fn hkdf(
        self,
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        l: usize,
    ) -> Result<Vec<u8>> {
        let mut okm = vec![0; l];
        match self {
            HashFunction::Sha256 => {
                Hkdf::<Sha256>::new(Some(salt), ikm).expand(info, &mut okm)?
            }
        }

        Ok(okm)
    }
}
