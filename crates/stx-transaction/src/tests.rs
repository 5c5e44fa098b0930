//! End-to-end tests exercising the full construction, signing, and
//! serialization pipeline.

use stx_primitives::ec::{PrivateKey, PublicKey};

use crate::address::{
    public_keys_to_address_hash, reconcile_key_order, AddressHashMode, StacksAddress,
};
use crate::auth::{
    MultisigHashMode, SinglesigHashMode, SpendingCondition, TransactionAuth,
    TransactionAuthField,
};
use crate::builder::{
    make_token_transfer, make_unsigned_multisig_token_transfer, sponsor_transaction, TxOptions,
};
use crate::clarity::{ClarityValue, Memo, PrincipalData};
use crate::payload::TransactionPayload;
use crate::post_condition::{FungibleConditionCode, PostCondition, PostConditionPrincipal};
use crate::signer::TransactionSigner;
use crate::transaction::{Network, PostConditionMode, StacksTransaction};
use crate::TransactionError;

const RECIPIENT: &str = "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159";

fn sender_key() -> PrivateKey {
    PrivateKey::from_hex("edf9aee84d9b7abc145504dde6726c64f369d37ee34ded868fabd876c26570bc01")
        .unwrap()
}

fn privk(seed: u8) -> PrivateKey {
    let mut scalar = [0u8; 32];
    scalar[31] = seed;
    let mut key = PrivateKey::from_bytes(&scalar).unwrap();
    key.set_compress_public(true);
    key
}

#[test]
fn test_token_transfer_wire_stability() {
    let key = sender_key();
    let recipient = PrincipalData::from_string(RECIPIENT).unwrap();
    let options = TxOptions {
        fee: Some(0),
        nonce: Some(0),
        ..TxOptions::testnet()
    };
    let tx = make_token_transfer(
        &recipient,
        2_500_000,
        Memo::from_string("memo (not included").unwrap(),
        &key,
        &options,
    )
    .unwrap();
    tx.verify().unwrap();

    // The envelope survives two serialize/deserialize round trips
    // byte for byte.
    let bytes = tx.serialize_to_vec();
    let parsed = StacksTransaction::from_bytes(&bytes).unwrap();
    assert_eq!(parsed, tx);
    assert_eq!(parsed.serialize_to_vec(), bytes);
    parsed.verify().unwrap();

    // Field-level checks on the parsed transaction.
    assert_eq!(parsed.tx_fee(), 0);
    assert_eq!(parsed.auth.origin().nonce(), 0);
    match &parsed.payload {
        TransactionPayload::TokenTransfer(principal, amount, memo) => {
            assert_eq!(principal.address().to_string_c32().unwrap(), RECIPIENT);
            assert_eq!(*amount, 2_500_000);
            assert_eq!(memo.to_string_lossy(), "memo (not included");
        }
        other => panic!("unexpected payload {other:?}"),
    }

    // The signed txid matches between the original and the parse.
    assert_eq!(parsed.txid(), tx.txid());
}

#[test]
fn test_sender_address_derivation() {
    let key = sender_key();
    let hash = public_keys_to_address_hash(
        AddressHashMode::SerializeP2PKH,
        1,
        &[key.public_key()],
    )
    .unwrap();
    let mainnet = StacksAddress::new(22, hash).to_string_c32().unwrap();
    let testnet = StacksAddress::new(26, hash).to_string_c32().unwrap();
    assert!(mainnet.starts_with("SP") || mainnet.starts_with("SM"));
    assert!(testnet.starts_with("ST") || testnet.starts_with("SN"));
    assert_eq!(StacksAddress::from_string(&mainnet).unwrap().hash, hash);
    assert_eq!(StacksAddress::from_string(&testnet).unwrap().hash, hash);
}

#[test]
fn test_multisig_two_of_three_full_ceremony() {
    let keys = vec![privk(11), privk(12), privk(13)];
    let pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public_key()).collect();
    let recipient = PrincipalData::from_string(RECIPIENT).unwrap();
    let options = TxOptions {
        fee: Some(300),
        nonce: Some(4),
        ..TxOptions::testnet()
    };
    let tx = make_unsigned_multisig_token_transfer(
        &recipient,
        10_000,
        Memo::empty(),
        MultisigHashMode::P2SH,
        2,
        &pubkeys,
        &options,
    )
    .unwrap();

    // Two signatures then the abstaining member's bare key, in
    // committee order.
    let mut signer = TransactionSigner::new(&tx).unwrap();
    signer.sign_origin(&keys[0]).unwrap();
    signer.sign_origin(&keys[1]).unwrap();
    signer.append_origin(&pubkeys[2]).unwrap();
    let finished = signer.get_tx().unwrap();
    finished.verify().unwrap();

    // Round trip preserves the field list and still verifies.
    let parsed = StacksTransaction::from_bytes(&finished.serialize_to_vec()).unwrap();
    assert_eq!(parsed, finished);
    parsed.verify().unwrap();

    // The decoded field list reads signature, signature, public key.
    match parsed.auth.origin() {
        SpendingCondition::Multisig(condition) => {
            assert_eq!(condition.fields.len(), 3);
            assert!(matches!(
                condition.fields[0],
                TransactionAuthField::Signature(..)
            ));
            assert!(matches!(
                condition.fields[1],
                TransactionAuthField::Signature(..)
            ));
            assert!(matches!(
                condition.fields[2],
                TransactionAuthField::PublicKey(_)
            ));
        }
        other => panic!("unexpected condition {other:?}"),
    }
}

#[test]
fn test_partially_signed_multisig_round_trips() {
    let keys = vec![privk(21), privk(22), privk(23)];
    let pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public_key()).collect();
    let recipient = PrincipalData::from_string(RECIPIENT).unwrap();
    let options = TxOptions {
        fee: Some(100),
        nonce: Some(0),
        ..TxOptions::testnet()
    };
    let tx = make_unsigned_multisig_token_transfer(
        &recipient,
        500,
        Memo::empty(),
        MultisigHashMode::P2SH,
        2,
        &pubkeys,
        &options,
    )
    .unwrap();

    let mut first = TransactionSigner::new(&tx).unwrap();
    first.sign_origin(&keys[0]).unwrap();
    let partial = first.get_tx_incomplete();

    // A partially signed transaction is accepted by the codec.
    let wire = partial.serialize_to_vec();
    let received = StacksTransaction::from_bytes(&wire).unwrap();
    assert_eq!(received, partial);

    // The missing signature count only surfaces at verification.
    assert!(received.verify().is_err());

    // A second cosigner can finish from the parsed copy.
    let mut second = TransactionSigner::new(&received).unwrap();
    second.sign_origin(&keys[1]).unwrap();
    second.append_origin(&pubkeys[2]).unwrap();
    second.get_tx().unwrap().verify().unwrap();
}

#[test]
fn test_non_sequential_multisig_signs_in_any_order() {
    let keys = vec![privk(31), privk(32), privk(33)];
    let pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public_key()).collect();
    let recipient = PrincipalData::from_string(RECIPIENT).unwrap();
    let options = TxOptions {
        fee: Some(100),
        nonce: Some(0),
        ..TxOptions::testnet()
    };
    let tx = make_unsigned_multisig_token_transfer(
        &recipient,
        500,
        Memo::empty(),
        MultisigHashMode::P2SHNonSequential,
        2,
        &pubkeys,
        &options,
    )
    .unwrap();

    // Field order follows committee order, but the third signer can
    // produce their signature before the first; both sign the same
    // initial hash.
    let initial = tx.sign_begin();
    let mut by_committee_order = tx.clone();
    by_committee_order
        .sign_next_origin(&initial, &keys[0])
        .unwrap();
    by_committee_order
        .append_next_origin(&initial, &pubkeys[1])
        .unwrap();
    by_committee_order
        .sign_next_origin(&initial, &keys[2])
        .unwrap();
    by_committee_order.verify().unwrap();
}

#[test]
fn test_reconcile_key_order_recovers_committee() {
    let keys = vec![privk(41), privk(42), privk(43)];
    let pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public_key()).collect();
    let target =
        public_keys_to_address_hash(AddressHashMode::SerializeP2SH, 2, &pubkeys).unwrap();

    // Supplied in the wrong order, reconciliation finds an order that
    // reproduces the target hash.
    let shuffled = vec![pubkeys[2].clone(), pubkeys[0].clone(), pubkeys[1].clone()];
    let ordered =
        reconcile_key_order(AddressHashMode::SerializeP2SH, 2, &shuffled, &target).unwrap();
    assert_eq!(
        public_keys_to_address_hash(AddressHashMode::SerializeP2SH, 2, &ordered).unwrap(),
        target
    );

    // A committee that cannot produce the hash is rejected.
    let wrong = vec![pubkeys[0].clone(), pubkeys[1].clone()];
    assert!(matches!(
        reconcile_key_order(AddressHashMode::SerializeP2SH, 2, &wrong, &target),
        Err(TransactionError::AddressMismatch(_))
    ));
}

#[test]
fn test_segwit_rejects_uncompressed_keys() {
    let mut key = privk(51);
    key.set_compress_public(false);
    assert!(matches!(
        SpendingCondition::new_singlesig(SinglesigHashMode::P2WPKH, &key.public_key()),
        Err(TransactionError::UncompressedKeyNotAllowed)
    ));
    let compressed = privk(52);
    assert!(matches!(
        SpendingCondition::new_multisig(
            MultisigHashMode::P2WSH,
            1,
            &[key.public_key(), compressed.public_key()],
        ),
        Err(TransactionError::UncompressedKeyNotAllowed)
    ));
}

#[test]
fn test_post_conditions_ride_the_envelope() {
    let key = privk(61);
    let recipient = PrincipalData::from_string(RECIPIENT).unwrap();
    let options = TxOptions {
        fee: Some(100),
        nonce: Some(0),
        post_condition_mode: PostConditionMode::Allow,
        post_conditions: vec![PostCondition::Stx(
            PostConditionPrincipal::Origin,
            FungibleConditionCode::SentLe,
            1000,
        )],
        ..TxOptions::testnet()
    };
    let tx = make_token_transfer(&recipient, 1000, Memo::empty(), &key, &options).unwrap();
    let parsed = StacksTransaction::from_bytes(&tx.serialize_to_vec()).unwrap();
    assert_eq!(parsed.post_condition_mode, PostConditionMode::Allow);
    assert_eq!(parsed.post_conditions.len(), 1);
    parsed.verify().unwrap();
}

#[test]
fn test_sponsored_transfer_fee_ownership() {
    let origin_key = privk(71);
    let sponsor_key = privk(72);
    let recipient = PrincipalData::from_string(RECIPIENT).unwrap();
    let options = TxOptions {
        nonce: Some(1),
        sponsored: true,
        ..TxOptions::testnet()
    };
    let unsigned = crate::builder::make_unsigned_token_transfer(
        &recipient,
        9_999,
        Memo::empty(),
        &origin_key.public_key(),
        &options,
    )
    .unwrap();

    let mut signer = TransactionSigner::new(&unsigned).unwrap();
    signer.sign_origin(&origin_key).unwrap();
    let origin_signed = signer.get_tx_incomplete();

    let finished = sponsor_transaction(&origin_signed, &sponsor_key, 600, 3).unwrap();
    finished.verify().unwrap();
    assert_eq!(finished.auth.origin().tx_fee(), 0);
    assert_eq!(finished.auth.sponsor().unwrap().tx_fee(), 600);
    assert_eq!(finished.tx_fee(), 600);

    // The sponsored envelope round trips and still verifies.
    let parsed = StacksTransaction::from_bytes(&finished.serialize_to_vec()).unwrap();
    assert_eq!(parsed, finished);
    parsed.verify().unwrap();
}

#[test]
fn test_origin_signature_covers_sponsor_substitution() {
    // The origin of a sponsored transaction signs with the sponsor
    // replaced by the sentinel, so the origin signature stays valid no
    // matter which sponsor later attaches.
    let origin_key = privk(81);
    let recipient = PrincipalData::from_string(RECIPIENT).unwrap();
    let options = TxOptions {
        nonce: Some(0),
        sponsored: true,
        ..TxOptions::testnet()
    };
    let unsigned = crate::builder::make_unsigned_token_transfer(
        &recipient,
        100,
        Memo::empty(),
        &origin_key.public_key(),
        &options,
    )
    .unwrap();
    let mut signer = TransactionSigner::new(&unsigned).unwrap();
    signer.sign_origin(&origin_key).unwrap();
    let origin_signed = signer.get_tx_incomplete();

    let finished_a = sponsor_transaction(&origin_signed, &privk(82), 100, 0).unwrap();
    let finished_b = sponsor_transaction(&origin_signed, &privk(83), 900, 5).unwrap();
    finished_a.verify().unwrap();
    finished_b.verify().unwrap();
    assert_eq!(
        finished_a.auth.origin(),
        finished_b.auth.origin()
    );
}

#[test]
fn test_contract_call_payload_end_to_end() {
    let key = privk(91);
    let contract =
        PrincipalData::from_string(&format!("{RECIPIENT}.kv-store")).unwrap();
    let options = TxOptions {
        fee: Some(250),
        nonce: Some(6),
        ..TxOptions::testnet()
    };
    let args = vec![
        ClarityValue::string_ascii("name"),
        ClarityValue::some(&ClarityValue::uint(100)),
    ];
    let tx =
        crate::builder::make_contract_call(&contract, "set-value", &args, &key, &options)
            .unwrap();
    let parsed = StacksTransaction::from_bytes(&tx.serialize_to_vec()).unwrap();
    assert_eq!(parsed, tx);
    parsed.verify().unwrap();
    match &parsed.payload {
        TransactionPayload::ContractCall { function_args, .. } => {
            assert_eq!(function_args, &args);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_standard_auth_has_no_sponsor() {
    let key = privk(95);
    let origin =
        SpendingCondition::new_singlesig(SinglesigHashMode::P2PKH, &key.public_key()).unwrap();
    let auth = TransactionAuth::Standard(origin);
    assert!(auth.sponsor().is_none());
    assert!(!auth.is_sponsored());
}

#[test]
fn test_corrupted_signature_fails_verification() {
    let key = privk(96);
    let recipient = PrincipalData::from_string(RECIPIENT).unwrap();
    let options = TxOptions {
        fee: Some(100),
        nonce: Some(0),
        ..TxOptions::testnet()
    };
    let tx = make_token_transfer(&recipient, 100, Memo::empty(), &key, &options).unwrap();
    let mut bytes = tx.serialize_to_vec();
    // Flip a bit inside the signature body (after version, chain id,
    // auth type, hash mode, signer, nonce, fee, and key encoding).
    let sig_start = 1 + 4 + 1 + 1 + 20 + 8 + 8 + 1;
    bytes[sig_start + 10] ^= 0x01;
    match StacksTransaction::from_bytes(&bytes) {
        Ok(corrupted) => assert!(corrupted.verify().is_err()),
        // A flipped bit can also make the signature unrecoverable.
        Err(_) => {}
    }
}

#[test]
fn test_network_address_versions_line_up() {
    let network = Network::mainnet();
    let key = privk(97);
    let condition =
        SpendingCondition::new_singlesig(SinglesigHashMode::P2PKH, &key.public_key()).unwrap();
    let address = condition.signer_address(&network);
    assert_eq!(address.version, 22);

    let testnet_address = condition.signer_address(&Network::testnet());
    assert_eq!(testnet_address.version, 26);
    assert_eq!(testnet_address.hash, address.hash);
}
