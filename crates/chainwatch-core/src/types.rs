//! Shared types for the watch pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Address ─────────────────────────────────────────────────────────────────

/// A lowercase account address (`0x…`).
///
/// Every address entering or leaving the registry and the store goes through
/// [`Address::normalized`] exactly once, at the boundary where it is produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Lowercase `raw`. No format validation happens here.
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ─── BlockHash ───────────────────────────────────────────────────────────────

/// Block hash as announced by the header source (`0x…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(pub String);

impl BlockHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── BlockHeader ─────────────────────────────────────────────────────────────

/// Lightweight announcement of a newly produced block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub hash: BlockHash,
}

impl BlockHeader {
    pub fn new(height: u64, hash: impl Into<String>) -> Self {
        Self {
            height,
            hash: BlockHash::new(hash),
        }
    }
}

// ─── Block ───────────────────────────────────────────────────────────────────

/// A fully fetched block with its transactions in block order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub hash: BlockHash,
    pub number: u64,
    pub transactions: Vec<SignedTransaction>,
}

// ─── SignedTransaction ───────────────────────────────────────────────────────

/// A transaction as returned by the node, before its sender is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Transaction hash (`0x…`).
    pub hash: String,
    /// EIP-2718 envelope type (`0` for legacy).
    pub tx_type: u8,
    /// Chain id the transaction was signed for; `None` for pre-EIP-155 legacy.
    pub chain_id: Option<u64>,
    pub nonce: u64,
    /// Recipient, lowercase. `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value as a `0x` hex quantity (may exceed `u64`).
    pub value: String,
    /// Call data (`0x…`).
    pub input: String,
    pub gas: u64,
    pub transaction_index: u64,
    /// The full JSON-RPC transaction object: signature, fee fields, access
    /// list, blob hashes and authorization list live here.
    pub raw: serde_json::Value,
}

impl SignedTransaction {
    /// Build the stored record once the sender has been recovered.
    pub fn into_record(self, from: Address, block_hash: &BlockHash, block_number: u64) -> Transaction {
        Transaction {
            hash: self.hash,
            from,
            to: self.to,
            nonce: self.nonce,
            value: self.value,
            input: self.input,
            gas: self.gas,
            tx_type: self.tx_type,
            chain_id: self.chain_id,
            block_hash: block_hash.clone(),
            block_number,
            transaction_index: self.transaction_index,
        }
    }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// A matched transaction record, as stored and served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: String,
    pub input: String,
    pub gas: u64,
    #[serde(rename = "type")]
    pub tx_type: u8,
    pub chain_id: Option<u64>,
    pub block_hash: BlockHash,
    pub block_number: u64,
    pub transaction_index: u64,
}
