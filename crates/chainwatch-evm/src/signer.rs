//! `EvmSigner`: sender recovery for EVM transactions.
//!
//! The signing payload is rebuilt from the node's JSON transaction object:
//!
//! | type | payload hashed with Keccak-256                                        |
//! |------|-----------------------------------------------------------------------|
//! | 0    | `rlp([nonce, gasPrice, gas, to, value, data])` (+ `chainId, 0, 0`)    |
//! | 1    | `0x01 ‖ rlp([chainId, nonce, gasPrice, gas, to, value, data, al])`    |
//! | 2    | `0x02 ‖ rlp([chainId, nonce, tip, maxFee, gas, to, value, data, al])` |
//! | 3    | type 2 fields + `maxFeePerBlobGas, blobVersionedHashes`               |
//! | 4    | type 2 fields + `authorizationList`                                   |
//!
//! The secp256k1 public key is recovered from `(r, s, recovery id)` and the
//! address is the last 20 bytes of the Keccak-256 of its uncompressed form.

use chainwatch_core::{Address, SenderRecovery, SignedTransaction, WatchError};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use rlp::RlpStream;
use serde_json::Value;
use tiny_keccak::{Hasher, Keccak};

use crate::quantity::{parse_data, parse_fixed, parse_quantity, parse_u64, parse_word};

pub(crate) fn keccak256(parts: &[&[u8]]) -> [u8; 32] {
    let mut k = Keccak::v256();
    for part in parts {
        k.update(part);
    }
    let mut out = [0u8; 32];
    k.finalize(&mut out);
    out
}

/// Recovers transaction senders from their secp256k1 signatures.
///
/// Supports legacy (with and without EIP-155), EIP-2930, EIP-1559, EIP-4844
/// and EIP-7702 transactions. High-`s` signatures are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvmSigner;

impl EvmSigner {
    pub fn new() -> Self {
        Self
    }

    /// The Keccak-256 hash the sender signed.
    pub fn signing_hash(&self, tx: &SignedTransaction) -> Result<[u8; 32], WatchError> {
        let raw = &tx.raw;
        match tx.tx_type {
            0 => {
                let chain_id = legacy_v(tx)?.1;
                let mut s = RlpStream::new_list(if chain_id.is_some() { 9 } else { 6 });
                s.append(&quantity(raw, "nonce")?);
                s.append(&quantity(raw, "gasPrice")?);
                s.append(&quantity(raw, "gas")?);
                append_to(&mut s, raw)?;
                s.append(&quantity(raw, "value")?);
                s.append(&input(raw)?);
                if let Some(chain_id) = chain_id {
                    s.append(&chain_id);
                    s.append_empty_data();
                    s.append_empty_data();
                }
                Ok(keccak256(&[s.as_raw()]))
            }
            1 => {
                let mut s = RlpStream::new_list(8);
                s.append(&typed_chain_id(tx)?);
                s.append(&quantity(raw, "nonce")?);
                s.append(&quantity(raw, "gasPrice")?);
                s.append(&quantity(raw, "gas")?);
                append_to(&mut s, raw)?;
                s.append(&quantity(raw, "value")?);
                s.append(&input(raw)?);
                append_access_list(&mut s, raw)?;
                Ok(keccak256(&[&[0x01u8][..], s.as_raw()]))
            }
            2..=4 => {
                let extra = match tx.tx_type {
                    2 => 0,
                    3 => 2,
                    _ => 1,
                };
                let mut s = RlpStream::new_list(9 + extra);
                s.append(&typed_chain_id(tx)?);
                s.append(&quantity(raw, "nonce")?);
                s.append(&quantity(raw, "maxPriorityFeePerGas")?);
                s.append(&quantity(raw, "maxFeePerGas")?);
                s.append(&quantity(raw, "gas")?);
                append_to(&mut s, raw)?;
                s.append(&quantity(raw, "value")?);
                s.append(&input(raw)?);
                append_access_list(&mut s, raw)?;
                match tx.tx_type {
                    3 => {
                        s.append(&quantity(raw, "maxFeePerBlobGas")?);
                        append_blob_hashes(&mut s, raw)?;
                    }
                    4 => append_authorizations(&mut s, raw)?,
                    _ => {}
                }
                Ok(keccak256(&[&[tx.tx_type][..], s.as_raw()]))
            }
            other => Err(WatchError::UnsupportedTxType {
                tx_hash: tx.hash.clone(),
                tx_type: other,
            }),
        }
    }

    fn recover(&self, tx: &SignedTransaction) -> Result<Address, WatchError> {
        let recovery_id = match tx.tx_type {
            0 => legacy_v(tx)?.0,
            1..=4 => y_parity(&tx.raw)?,
            other => {
                return Err(WatchError::UnsupportedTxType {
                    tx_hash: tx.hash.clone(),
                    tx_type: other,
                })
            }
        };
        let signature = signature(&tx.raw)?;
        let prehash = self.signing_hash(tx)?;

        let recovery_id = RecoveryId::from_byte(recovery_id)
            .ok_or_else(|| WatchError::Decode(format!("invalid recovery id {recovery_id}")))?;
        let key = VerifyingKey::recover_from_prehash(&prehash, &signature, recovery_id)
            .map_err(|e| WatchError::Decode(format!("public key recovery failed: {e}")))?;

        let point = key.to_encoded_point(false);
        let hash = keccak256(&[&point.as_bytes()[1..]]);
        Ok(Address::normalized(&format!("0x{}", hex::encode(&hash[12..]))))
    }
}

impl SenderRecovery for EvmSigner {
    fn recover_sender(&self, tx: &SignedTransaction) -> Result<Address, WatchError> {
        self.recover(tx).map_err(|e| match e {
            WatchError::Decode(reason) => WatchError::SenderRecovery {
                tx_hash: tx.hash.clone(),
                reason,
            },
            other => other,
        })
    }
}

// ─── Field helpers ───────────────────────────────────────────────────────────

fn str_field<'a>(obj: &'a Value, field: &str) -> Result<&'a str, WatchError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| WatchError::Decode(format!("missing field `{field}`")))
}

fn quantity(obj: &Value, field: &str) -> Result<Vec<u8>, WatchError> {
    parse_quantity(field, str_field(obj, field)?)
}

fn input(raw: &Value) -> Result<Vec<u8>, WatchError> {
    let data = raw
        .get("input")
        .or_else(|| raw.get("data"))
        .and_then(Value::as_str)
        .unwrap_or("0x");
    parse_data("input", data)
}

fn append_to(s: &mut RlpStream, raw: &Value) -> Result<(), WatchError> {
    match raw.get("to").and_then(Value::as_str) {
        Some(to) => {
            s.append(&parse_fixed::<20>("to", to)?.to_vec());
        }
        None => {
            s.append_empty_data();
        }
    }
    Ok(())
}

fn append_access_list(s: &mut RlpStream, raw: &Value) -> Result<(), WatchError> {
    let entries = match raw.get("accessList") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(_) => return Err(WatchError::Decode("`accessList` is not an array".into())),
    };
    s.begin_list(entries.len());
    for entry in entries {
        let keys = match entry.get("storageKeys") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(keys)) => keys.as_slice(),
            Some(_) => return Err(WatchError::Decode("`storageKeys` is not an array".into())),
        };
        s.begin_list(2);
        s.append(&parse_fixed::<20>("accessList.address", str_field(entry, "address")?)?.to_vec());
        s.begin_list(keys.len());
        for key in keys {
            let key = key
                .as_str()
                .ok_or_else(|| WatchError::Decode("storage key is not a string".into()))?;
            s.append(&parse_fixed::<32>("accessList.storageKeys", key)?.to_vec());
        }
    }
    Ok(())
}

fn append_blob_hashes(s: &mut RlpStream, raw: &Value) -> Result<(), WatchError> {
    let hashes = raw
        .get("blobVersionedHashes")
        .and_then(Value::as_array)
        .ok_or_else(|| WatchError::Decode("missing field `blobVersionedHashes`".into()))?;
    s.begin_list(hashes.len());
    for h in hashes {
        let h = h
            .as_str()
            .ok_or_else(|| WatchError::Decode("blob hash is not a string".into()))?;
        s.append(&parse_fixed::<32>("blobVersionedHashes", h)?.to_vec());
    }
    Ok(())
}

fn append_authorizations(s: &mut RlpStream, raw: &Value) -> Result<(), WatchError> {
    let auths = raw
        .get("authorizationList")
        .and_then(Value::as_array)
        .ok_or_else(|| WatchError::Decode("missing field `authorizationList`".into()))?;
    s.begin_list(auths.len());
    for auth in auths {
        s.begin_list(6);
        s.append(&quantity(auth, "chainId")?);
        s.append(&parse_fixed::<20>("authorizationList.address", str_field(auth, "address")?)?.to_vec());
        s.append(&quantity(auth, "nonce")?);
        s.append(&quantity(auth, "yParity")?);
        s.append(&quantity(auth, "r")?);
        s.append(&quantity(auth, "s")?);
    }
    Ok(())
}

// ─── Signature helpers ───────────────────────────────────────────────────────

/// Recovery id and EIP-155 chain id of a legacy transaction's `v`.
fn legacy_v(tx: &SignedTransaction) -> Result<(u8, Option<u64>), WatchError> {
    let v = parse_u64("v", str_field(&tx.raw, "v")?)?;
    match v {
        27 | 28 => Ok(((v - 27) as u8, None)),
        v if v >= 35 => Ok((((v - 35) % 2) as u8, Some((v - 35) / 2))),
        v => Err(WatchError::Decode(format!("invalid legacy v {v}"))),
    }
}

fn typed_chain_id(tx: &SignedTransaction) -> Result<u64, WatchError> {
    tx.chain_id
        .ok_or_else(|| WatchError::Decode("typed transaction without chainId".into()))
}

fn y_parity(raw: &Value) -> Result<u8, WatchError> {
    let field = if raw.get("yParity").and_then(Value::as_str).is_some() {
        "yParity"
    } else {
        "v"
    };
    match parse_u64(field, str_field(raw, field)?)? {
        p @ (0 | 1) => Ok(p as u8),
        p => Err(WatchError::Decode(format!("invalid y parity {p}"))),
    }
}

fn signature(raw: &Value) -> Result<Signature, WatchError> {
    let r = parse_word("r", str_field(raw, "r")?)?;
    let s = parse_word("s", str_field(raw, "s")?)?;
    if r == [0u8; 32] || s == [0u8; 32] {
        return Err(WatchError::Decode("zero signature component".into()));
    }

    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(&r);
    bytes[32..].copy_from_slice(&s);
    let sig = Signature::from_slice(&bytes).map_err(|_| WatchError::Decode("malformed signature".into()))?;

    // EIP-2: only the lower half of the curve order is valid for `s`.
    if sig.normalize_s().is_some() {
        return Err(WatchError::Decode("non-canonical (high s) signature".into()));
    }
    Ok(sig)
}
