//! The signing credential of the harvesting account

use std::{fmt, str::FromStr};

use alloy::{
    consensus::{SignableTransaction, TxEnvelope},
    eips::eip2718::Encodable2718,
    network::TxSignerSync,
    signers::local::PrivateKeySigner,
};
use alloy_primitives::{Address, B256};

use crate::constants::{ACCOUNT_ADDRESS_ENV, ACCOUNT_PRIVATE_KEY_ENV};

use super::{
    common::string_to_address,
    error::{HarvesterError, HarvesterResult},
    transaction_builder::TransactionEnvelope,
};

/// Raw bytes ready for submission, and the hash the ledger will know them by
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: B256,
}

/// Address and private key authorizing every transaction.
/// Loaded once at startup and never mutated.
pub struct Credential {
    address: Address,
    signer: PrivateKeySigner,
}

impl Credential {
    /// Builds the credential from a hex encoded private key.
    /// When `expected_address` is given it must match the key.
    pub fn new(private_key: &str, expected_address: Option<&str>) -> HarvesterResult<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim()).map_err(|_| {
            // never echo the key
            HarvesterError::Config("The private key is not a valid secp256k1 key.".to_string())
        })?;
        let address = signer.address();

        if let Some(expected) = expected_address {
            let expected = string_to_address(expected)
                .map_err(|_| HarvesterError::Config(format!("`{}` is not an address", expected)))?;
            if expected != address {
                return Err(HarvesterError::Config(format!(
                    "The configured account {} does not match the private key's address {}",
                    expected, address
                )));
            }
        }

        Ok(Self { address, signer })
    }

    /// Reads `ACCOUNT_PRIVATE_KEY` and the optional `ACCOUNT_ADDRESS` from the environment
    pub fn from_env() -> HarvesterResult<Self> {
        let private_key = std::env::var(ACCOUNT_PRIVATE_KEY_ENV).map_err(|_| {
            HarvesterError::Config(format!("{} is not set", ACCOUNT_PRIVATE_KEY_ENV))
        })?;
        let expected_address = std::env::var(ACCOUNT_ADDRESS_ENV).ok();
        Self::new(&private_key, expected_address.as_deref())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs the envelope as an EIP-155 legacy transaction
    pub fn sign(&self, envelope: &TransactionEnvelope) -> HarvesterResult<SignedTransaction> {
        let mut tx = envelope.unsigned();
        let signature = TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
            .map_err(|err| HarvesterError::Signing(err.to_string()))?;
        let signed: TxEnvelope = tx.into_signed(signature).into();

        Ok(SignedTransaction {
            raw: signed.encoded_2718(),
            hash: *signed.tx_hash(),
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
