//! Golden fixture integration tests for block parsing and sender recovery.
//!
//! Each fixture under `fixtures/blocks/` holds an `eth_getBlockByHash(_, true)`
//! result and the senders its transactions must recover to.

use chainwatch_core::SenderRecovery;
use chainwatch_evm::block::parse_block;
use chainwatch_evm::EvmSigner;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn fixture_path(name: &str) -> std::path::PathBuf {
    let mut p = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures/blocks");
    p.push(name);
    p
}

fn load_fixture(name: &str) -> serde_json::Value {
    let content = std::fs::read_to_string(fixture_path(name)).expect("fixture not found");
    serde_json::from_str(&content).expect("invalid fixture JSON")
}

fn check_fixture(name: &str) {
    let f = load_fixture(name);
    let block = parse_block(&f["block"]).expect("block should parse");
    let expected: Vec<&str> = f["expectedSenders"]
        .as_array()
        .expect("missing expectedSenders")
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();

    let signer = EvmSigner::new();
    let senders: Vec<String> = block
        .transactions
        .iter()
        .map(|tx| signer.recover_sender(tx).expect("recovery failed").into_string())
        .collect();
    assert_eq!(senders, expected, "fixture {name}");

    if let Some(hashes) = f["expectedSigningHashes"].as_array() {
        assert_eq!(hashes.len(), block.transactions.len(), "fixture {name}");
        for (tx, want) in block.transactions.iter().zip(hashes) {
            let got = format!("0x{}", hex::encode(signer.signing_hash(tx).unwrap()));
            assert_eq!(got, want.as_str().unwrap(), "fixture {name}, tx type {}", tx.tx_type);
        }
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

#[test]
fn golden_eip155_transfer() {
    check_fixture("eip155-transfer.json");
}

#[test]
fn golden_empty_block() {
    let f = load_fixture("empty-block.json");
    let block = parse_block(&f["block"]).unwrap();
    assert_eq!(block.number, 1);
    assert!(block.transactions.is_empty());
    check_fixture("empty-block.json");
}

#[test]
fn golden_reported_from_matches_recovery() {
    let f = load_fixture("eip155-transfer.json");
    let block = parse_block(&f["block"]).unwrap();
    for tx in &block.transactions {
        let reported = tx.raw["from"].as_str().unwrap();
        assert_eq!(EvmSigner.recover_sender(tx).unwrap().as_str(), reported);
    }
}

#[test]
fn golden_typed_envelopes() {
    let f = load_fixture("typed-envelopes.json");
    let block = parse_block(&f["block"]).unwrap();
    let types: Vec<u8> = block.transactions.iter().map(|tx| tx.tx_type).collect();
    assert_eq!(types, vec![1, 2, 3, 4]);
    assert!(block.transactions[1].to.is_none(), "0x2 entry is a contract creation");
    assert_eq!(block.transactions[3].chain_id, Some(0x7a69));
    check_fixture("typed-envelopes.json");
}

#[test]
fn golden_typed_envelope_fields_are_signed() {
    let f = load_fixture("typed-envelopes.json");
    let expected = f["expectedSenders"][0].as_str().unwrap();

    let edits: [(usize, &str, serde_json::Value); 4] = [
        (
            0,
            "accessList",
            serde_json::json!([{ "address": "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae", "storageKeys": [] }]),
        ),
        (1, "input", serde_json::json!("0x6080604053")),
        (2, "maxFeePerBlobGas", serde_json::json!("0x3b9aca01")),
        (3, "authorizationList", serde_json::json!([])),
    ];
    for (index, field, value) in edits {
        let mut raw = f["block"]["transactions"][index].clone();
        raw[field] = value;
        let tx = chainwatch_evm::block::parse_transaction(&raw).unwrap();
        if let Ok(addr) = EvmSigner.recover_sender(&tx) {
            assert_ne!(addr.as_str(), expected, "editing {field} must change the sender");
        }
    }
}
