//! Conversion of JSON-RPC block, transaction and header objects into core
//! types.

use chainwatch_core::{Address, Block, BlockHash, BlockHeader, SignedTransaction, WatchError};
use serde_json::Value;

use crate::quantity::{parse_u64, parse_fixed};

fn str_field<'a>(obj: &'a Value, field: &str) -> Result<&'a str, WatchError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| WatchError::Decode(format!("missing or non-string field `{field}`")))
}

fn opt_str_field<'a>(obj: &'a Value, field: &str) -> Option<&'a str> {
    obj.get(field).and_then(Value::as_str)
}

/// Parse a `newHeads` notification result.
pub fn parse_header(value: &Value) -> Result<BlockHeader, WatchError> {
    let height = parse_u64("number", str_field(value, "number")?)?;
    let hash = str_field(value, "hash")?;
    Ok(BlockHeader::new(height, hash))
}

/// Parse the result of `eth_getBlockByHash(hash, true)`.
pub fn parse_block(value: &Value) -> Result<Block, WatchError> {
    let hash = str_field(value, "hash")?;
    let number = parse_u64("number", str_field(value, "number")?)?;

    let transactions = match value.get("transactions") {
        None | Some(Value::Null) => vec![],
        Some(Value::Array(items)) => items.iter().map(parse_transaction).collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(WatchError::Decode("`transactions` is not an array".into())),
    };

    Ok(Block {
        hash: BlockHash::new(hash),
        number,
        transactions,
    })
}

/// Parse a full transaction object.
///
/// A transaction hash in place of an object (a block fetched without full
/// transactions) is rejected.
pub fn parse_transaction(value: &Value) -> Result<SignedTransaction, WatchError> {
    if !value.is_object() {
        return Err(WatchError::Decode("expected a full transaction object".into()));
    }

    let hash = str_field(value, "hash")?.to_string();
    let tx_type = match opt_str_field(value, "type") {
        Some(t) => u8::try_from(parse_u64("type", t)?)
            .map_err(|_| WatchError::Decode(format!("tx {hash}: type {t} out of range")))?,
        None => 0,
    };

    let chain_id = if tx_type == 0 {
        legacy_chain_id(value)?
    } else {
        opt_str_field(value, "chainId")
            .map(|c| parse_u64("chainId", c))
            .transpose()?
    };

    let to = match opt_str_field(value, "to") {
        Some(to) => {
            parse_fixed::<20>("to", to)?;
            Some(Address::normalized(to))
        }
        None => None,
    };

    Ok(SignedTransaction {
        tx_type,
        chain_id,
        nonce: parse_u64("nonce", str_field(value, "nonce")?)?,
        to,
        value: str_field(value, "value")?.to_string(),
        input: opt_str_field(value, "input").unwrap_or("0x").to_string(),
        gas: parse_u64("gas", str_field(value, "gas")?)?,
        transaction_index: opt_str_field(value, "transactionIndex")
            .map(|i| parse_u64("transactionIndex", i))
            .transpose()?
            .unwrap_or_default(),
        raw: value.clone(),
        hash,
    })
}

/// EIP-155 chain id encoded in a legacy `v`, `None` for pre-EIP-155 `v`.
fn legacy_chain_id(value: &Value) -> Result<Option<u64>, WatchError> {
    let Some(v) = opt_str_field(value, "v") else {
        return Ok(None);
    };
    let v = parse_u64("v", v)?;
    Ok(if v >= 35 { Some((v - 35) / 2) } else { None })
}
