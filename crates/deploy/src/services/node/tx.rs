//! Local signing of legacy (EIP-155) transactions.

use std::fmt;

use alloy_core::{
    primitives::{Address, B256, Bytes, U256, keccak256},
    rlp::{EMPTY_STRING_CODE, Encodable, Header},
};
use k256::ecdsa::SigningKey;

use crate::errors::{BroadcastError, ConfigurationError};

/// A secp256k1 private key held in memory.
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalSigner {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self, ConfigurationError> {
        let bytes = hex::decode(key.trim().trim_start_matches("0x"))
            .map_err(|e| ConfigurationError::NoSigner(format!("signing key is not hex: {e}")))?;
        let key = SigningKey::from_slice(&bytes).map_err(|_| {
            ConfigurationError::NoSigner("signing key is not a valid secp256k1 key".to_string())
        })?;

        let point = key.verifying_key().to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let address = Address::from_slice(&hash[12..]);

        Ok(Self { key, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign `tx` for `chain_id` and return the raw RLP bytes ready for
    /// `eth_sendRawTransaction`.
    pub fn sign(&self, tx: &LegacyTransaction, chain_id: u64) -> Result<Bytes, BroadcastError> {
        let hash = tx.signing_hash(chain_id);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|e| BroadcastError::Signing(e.to_string()))?;

        let bytes = signature.to_bytes();
        let v = chain_id * 2 + 35 + u64::from(recovery_id.to_byte());
        let r = U256::from_be_slice(&bytes[..32]);
        let s = U256::from_be_slice(&bytes[32..]);

        Ok(tx.encode_with(|out| {
            v.encode(out);
            r.encode(out);
            s.encode(out);
        })
        .into())
    }
}

/// A pre-EIP-2718 transaction. `to == None` creates a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl LegacyTransaction {
    pub fn create(nonce: u64, gas_price: u128, gas_limit: u64, data: Bytes) -> Self {
        Self {
            nonce,
            gas_price,
            gas_limit,
            to: None,
            value: U256::ZERO,
            data,
        }
    }

    /// Hash signed under EIP-155 replay protection.
    pub fn signing_hash(&self, chain_id: u64) -> B256 {
        keccak256(self.encode_with(|out| {
            chain_id.encode(out);
            0u8.encode(out);
            0u8.encode(out);
        }))
    }

    /// RLP list of the six transaction fields followed by `trailer`.
    fn encode_with(&self, trailer: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
        let mut payload = Vec::new();
        self.nonce.encode(&mut payload);
        self.gas_price.encode(&mut payload);
        self.gas_limit.encode(&mut payload);
        match self.to {
            Some(to) => to.encode(&mut payload),
            None => payload.push(EMPTY_STRING_CODE),
        }
        self.value.encode(&mut payload);
        self.data.encode(&mut payload);
        trailer(&mut payload);

        let mut out = Vec::with_capacity(payload.len() + 9);
        Header {
            list: true,
            payload_length: payload.len(),
        }
        .encode(&mut out);
        out.extend_from_slice(&payload);
        out
    }
}
