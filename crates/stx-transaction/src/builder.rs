//! High-level transaction builders.
//!
//! These wrap payload assembly, fee and nonce resolution, and the
//! signing ceremony into single calls for the common transaction kinds.

use stx_primitives::ec::{PrivateKey, PublicKey};

use crate::auth::{MultisigHashMode, SinglesigHashMode, SpendingCondition, TransactionAuth};
use crate::clarity::{ClarityName, ClarityValue, ContractName, Memo, PrincipalData};
use crate::payload::{ClarityVersion, TransactionPayload};
use crate::post_condition::PostCondition;
use crate::signer::TransactionSigner;
use crate::transaction::{AnchorMode, Network, PostConditionMode, StacksTransaction};
use crate::TransactionError;

/// Estimates a fee for a transaction of a given serialized size.
pub trait FeeEstimator {
    /// Estimate the fee in microunits.
    ///
    /// # Arguments
    /// * `tx_len` - The serialized length of the unsigned transaction.
    fn estimate_fee(&self, tx_len: usize) -> Result<u64, TransactionError>;
}

/// Resolves the next nonce for an account.
pub trait NonceProvider {
    /// The next unused nonce for the address.
    fn next_nonce(&self, address: &crate::StacksAddress) -> Result<u64, TransactionError>;
}

/// The shape of one function in a contract's interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSignature {
    /// The function's name.
    pub name: String,
    /// How many arguments the function takes.
    pub arg_count: usize,
}

/// Supplies contract interfaces for call validation.
pub trait AbiProvider {
    /// Look up a function in a deployed contract's interface.
    ///
    /// # Arguments
    /// * `contract` - The deployed contract.
    /// * `function_name` - The function being called.
    ///
    /// # Returns
    /// The function's signature, or `None` if the contract does not
    /// define it.
    fn function_signature(
        &self,
        contract: &PrincipalData,
        function_name: &str,
    ) -> Result<Option<FunctionSignature>, TransactionError>;
}

/// Options shared by all builders.
pub struct TxOptions<'a> {
    /// The fee in microunits, or `None` to consult the estimator.
    pub fee: Option<u64>,
    /// The origin nonce, or `None` to consult the nonce provider.
    pub nonce: Option<u64>,
    /// The network to stamp on the transaction.
    pub network: Network,
    /// Where the transaction may be mined.
    pub anchor_mode: AnchorMode,
    /// How post-conditions are enforced.
    pub post_condition_mode: PostConditionMode,
    /// Asset-movement constraints.
    pub post_conditions: Vec<PostCondition>,
    /// Build a sponsored authorization with a placeholder sponsor.
    pub sponsored: bool,
    /// Fee oracle used when `fee` is `None`.
    pub fee_estimator: Option<&'a dyn FeeEstimator>,
    /// Nonce oracle used when `nonce` is `None`.
    pub nonce_provider: Option<&'a dyn NonceProvider>,
}

impl Default for TxOptions<'_> {
    fn default() -> Self {
        TxOptions {
            fee: None,
            nonce: None,
            network: Network::mainnet(),
            anchor_mode: AnchorMode::Any,
            post_condition_mode: PostConditionMode::Deny,
            post_conditions: Vec::new(),
            sponsored: false,
            fee_estimator: None,
            nonce_provider: None,
        }
    }
}

impl TxOptions<'_> {
    /// Options for the testnet with everything else defaulted.
    pub fn testnet() -> Self {
        TxOptions {
            network: Network::testnet(),
            ..TxOptions::default()
        }
    }
}

fn build_unsigned(
    origin: SpendingCondition,
    payload: TransactionPayload,
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    let auth = if options.sponsored {
        TransactionAuth::Sponsored(origin, SpendingCondition::new_initial_sighash())
    } else {
        TransactionAuth::Standard(origin)
    };
    let mut tx = StacksTransaction::new(&options.network, auth, payload);
    tx.anchor_mode = options.anchor_mode;
    tx.post_condition_mode = options.post_condition_mode;
    tx.post_conditions = options.post_conditions.clone();

    let nonce = match options.nonce {
        Some(nonce) => nonce,
        None => match options.nonce_provider {
            Some(provider) => {
                let address = tx
                    .auth
                    .origin()
                    .signer_address(&options.network);
                provider.next_nonce(&address)?
            }
            None => 0,
        },
    };
    tx.set_origin_nonce(nonce);

    let fee = match options.fee {
        Some(fee) => fee,
        None => match options.fee_estimator {
            Some(estimator) => estimator.estimate_fee(tx.serialize_to_vec().len())?,
            None => 0,
        },
    };
    // A sponsored transaction's fee belongs to the eventual sponsor.
    if !options.sponsored {
        tx.set_tx_fee(fee);
    }
    Ok(tx)
}

fn sign_singlesig(
    mut tx: StacksTransaction,
    private_key: &PrivateKey,
) -> Result<StacksTransaction, TransactionError> {
    let mut signer = TransactionSigner::new(&tx)?;
    signer.sign_origin(private_key)?;
    tx = signer.get_tx().ok_or_else(|| {
        TransactionError::SigningError("transaction incomplete after signing".to_string())
    })?;
    Ok(tx)
}

/// Build an unsigned STX transfer.
///
/// # Arguments
/// * `recipient` - Who receives the tokens.
/// * `amount` - The amount in microSTX; must be nonzero.
/// * `memo` - An optional annotation carried on chain.
/// * `public_key` - The origin's public key.
/// * `options` - Fee, nonce, and network options.
///
/// # Returns
/// An unsigned transaction ready for a signing ceremony.
pub fn make_unsigned_token_transfer(
    recipient: &PrincipalData,
    amount: u64,
    memo: Memo,
    public_key: &PublicKey,
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    if amount == 0 {
        return Err(TransactionError::InvalidAmount(
            "transfer amount must be positive".to_string(),
        ));
    }
    let origin = SpendingCondition::new_singlesig(SinglesigHashMode::P2PKH, public_key)?;
    build_unsigned(
        origin,
        TransactionPayload::TokenTransfer(recipient.clone(), amount, memo),
        options,
    )
}

/// Build and sign an STX transfer with a single key.
pub fn make_token_transfer(
    recipient: &PrincipalData,
    amount: u64,
    memo: Memo,
    private_key: &PrivateKey,
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    let tx = make_unsigned_token_transfer(
        recipient,
        amount,
        memo,
        &private_key.public_key(),
        options,
    )?;
    sign_singlesig(tx, private_key)
}

/// Build an unsigned multisig STX transfer.
///
/// # Arguments
/// * `recipient` - Who receives the tokens.
/// * `amount` - The amount in microSTX; must be nonzero.
/// * `memo` - An optional annotation carried on chain.
/// * `hash_mode` - The multisig hashing and chaining rule.
/// * `signatures_required` - The threshold m.
/// * `public_keys` - The committee keys in redeem-script order.
/// * `options` - Fee, nonce, and network options.
pub fn make_unsigned_multisig_token_transfer(
    recipient: &PrincipalData,
    amount: u64,
    memo: Memo,
    hash_mode: MultisigHashMode,
    signatures_required: u16,
    public_keys: &[PublicKey],
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    if amount == 0 {
        return Err(TransactionError::InvalidAmount(
            "transfer amount must be positive".to_string(),
        ));
    }
    let origin = SpendingCondition::new_multisig(hash_mode, signatures_required, public_keys)?;
    build_unsigned(
        origin,
        TransactionPayload::TokenTransfer(recipient.clone(), amount, memo),
        options,
    )
}

/// Build and sign a multisig STX transfer.
///
/// Signs with each available private key and appends the remaining
/// committee members' bare public keys, in committee order. When a
/// target address is supplied the committee order is reconciled
/// against it first, so keys may arrive in any order.
///
/// # Arguments
/// * `recipient` - Who receives the tokens.
/// * `amount` - The amount in microSTX; must be nonzero.
/// * `memo` - An optional annotation carried on chain.
/// * `hash_mode` - The multisig hashing and chaining rule.
/// * `signatures_required` - The threshold m.
/// * `private_keys` - The keys of the signing members.
/// * `public_keys` - The full committee, including the signers.
/// * `address` - Reconcile the committee order against this address.
/// * `options` - Fee, nonce, and network options.
///
/// # Returns
/// A fully signed transaction, or an error if too few private keys
/// were supplied or the committee cannot reproduce the address.
#[allow(clippy::too_many_arguments)]
pub fn make_multisig_token_transfer(
    recipient: &PrincipalData,
    amount: u64,
    memo: Memo,
    hash_mode: MultisigHashMode,
    signatures_required: u16,
    private_keys: &[PrivateKey],
    public_keys: &[PublicKey],
    address: Option<&crate::StacksAddress>,
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    if private_keys.len() < signatures_required as usize {
        return Err(TransactionError::SigningError(format!(
            "{} signatures required but only {} private keys supplied",
            signatures_required,
            private_keys.len()
        )));
    }
    let committee = match address {
        Some(address) => crate::address::reconcile_key_order(
            hash_mode.to_address_hash_mode(),
            signatures_required as usize,
            public_keys,
            &address.hash,
        )?,
        None => public_keys.to_vec(),
    };
    let tx = make_unsigned_multisig_token_transfer(
        recipient,
        amount,
        memo,
        hash_mode,
        signatures_required,
        &committee,
        options,
    )?;

    let mut signer = TransactionSigner::new(&tx)?;
    let mut signatures = 0u16;
    for public_key in &committee {
        let private_key = private_keys
            .iter()
            .find(|k| k.public_key() == *public_key);
        match private_key {
            Some(key) if signatures < signatures_required => {
                signer.sign_origin(key)?;
                signatures += 1;
            }
            _ => signer.append_origin(public_key)?,
        }
    }
    signer.get_tx().ok_or_else(|| {
        TransactionError::SigningError("transaction incomplete after signing".to_string())
    })
}

/// Build an unsigned contract deploy.
///
/// # Arguments
/// * `contract_name` - The contract's on-chain name.
/// * `code_body` - The Clarity source text.
/// * `clarity_version` - Pin a Clarity version, or `None` for the
///   chain's current one.
/// * `public_key` - The origin's public key.
/// * `options` - Fee, nonce, and network options.
pub fn make_unsigned_contract_deploy(
    contract_name: &str,
    code_body: &str,
    clarity_version: Option<ClarityVersion>,
    public_key: &PublicKey,
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    let origin = SpendingCondition::new_singlesig(SinglesigHashMode::P2PKH, public_key)?;
    build_unsigned(
        origin,
        TransactionPayload::SmartContract {
            name: ContractName::new(contract_name)?,
            code_body: code_body.to_string(),
            clarity_version,
        },
        options,
    )
}

/// Build and sign a contract deploy with a single key.
pub fn make_contract_deploy(
    contract_name: &str,
    code_body: &str,
    clarity_version: Option<ClarityVersion>,
    private_key: &PrivateKey,
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    let tx = make_unsigned_contract_deploy(
        contract_name,
        code_body,
        clarity_version,
        &private_key.public_key(),
        options,
    )?;
    sign_singlesig(tx, private_key)
}

/// Build an unsigned contract call.
///
/// # Arguments
/// * `contract` - The deployed contract to call.
/// * `function_name` - The public function to invoke.
/// * `function_args` - Encoded arguments, in order.
/// * `public_key` - The origin's public key.
/// * `options` - Fee, nonce, and network options.
///
/// # Returns
/// An unsigned transaction, or an error if the contract principal is
/// not a contract.
pub fn make_unsigned_contract_call(
    contract: &PrincipalData,
    function_name: &str,
    function_args: &[ClarityValue],
    public_key: &PublicKey,
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    let (address, contract_name) = match contract {
        PrincipalData::Contract(address, name) => (*address, name.clone()),
        PrincipalData::Standard(_) => {
            return Err(TransactionError::InvalidTransaction(
                "contract call target must be a contract principal".to_string(),
            ))
        }
    };
    let origin = SpendingCondition::new_singlesig(SinglesigHashMode::P2PKH, public_key)?;
    build_unsigned(
        origin,
        TransactionPayload::ContractCall {
            address,
            contract_name,
            function_name: ClarityName::new(function_name)?,
            function_args: function_args.to_vec(),
        },
        options,
    )
}

/// Build and sign a contract call with a single key.
pub fn make_contract_call(
    contract: &PrincipalData,
    function_name: &str,
    function_args: &[ClarityValue],
    private_key: &PrivateKey,
    options: &TxOptions<'_>,
) -> Result<StacksTransaction, TransactionError> {
    let tx = make_unsigned_contract_call(
        contract,
        function_name,
        function_args,
        &private_key.public_key(),
        options,
    )?;
    sign_singlesig(tx, private_key)
}

/// Check a contract call payload against the contract's interface.
///
/// # Arguments
/// * `tx` - A transaction carrying a contract call payload.
/// * `abi` - The interface oracle.
///
/// # Returns
/// `Ok(())` if the function exists with a matching argument count, or
/// `AbiMismatch` otherwise.
pub fn validate_contract_call(
    tx: &StacksTransaction,
    abi: &dyn AbiProvider,
) -> Result<(), TransactionError> {
    let (address, contract_name, function_name, function_args) = match &tx.payload {
        TransactionPayload::ContractCall {
            address,
            contract_name,
            function_name,
            function_args,
        } => (address, contract_name, function_name, function_args),
        _ => {
            return Err(TransactionError::InvalidTransaction(
                "transaction is not a contract call".to_string(),
            ))
        }
    };
    let contract = PrincipalData::Contract(*address, contract_name.clone());
    let signature = abi
        .function_signature(&contract, function_name.as_str())?
        .ok_or_else(|| {
            TransactionError::AbiMismatch(format!(
                "contract {contract} has no function {}",
                function_name.as_str()
            ))
        })?;
    if signature.arg_count != function_args.len() {
        return Err(TransactionError::AbiMismatch(format!(
            "function {} takes {} arguments, {} supplied",
            function_name.as_str(),
            signature.arg_count,
            function_args.len()
        )));
    }
    Ok(())
}

/// Attach and sign the sponsor half of a sponsored transaction.
///
/// # Arguments
/// * `tx` - A transaction whose origin is fully signed.
/// * `sponsor_key` - The sponsor's private key.
/// * `fee` - The fee the sponsor pays.
/// * `sponsor_nonce` - The sponsor's account nonce.
///
/// # Returns
/// The fully signed transaction.
pub fn sponsor_transaction(
    tx: &StacksTransaction,
    sponsor_key: &PrivateKey,
    fee: u64,
    sponsor_nonce: u64,
) -> Result<StacksTransaction, TransactionError> {
    let mut sponsor_condition =
        SpendingCondition::new_singlesig(SinglesigHashMode::P2PKH, &sponsor_key.public_key())?;
    sponsor_condition.set_tx_fee(fee);
    sponsor_condition.set_nonce(sponsor_nonce);

    let mut signer = TransactionSigner::new_sponsor(tx, sponsor_condition)?;
    signer.sign_sponsor(sponsor_key)?;
    signer.get_tx().ok_or_else(|| {
        TransactionError::SigningError("transaction incomplete after sponsor signing".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StacksAddress;

    fn privk(seed: u8) -> PrivateKey {
        let mut scalar = [0u8; 32];
        scalar[31] = seed;
        let mut key = PrivateKey::from_bytes(&scalar).unwrap();
        key.set_compress_public(true);
        key
    }

    fn recipient() -> PrincipalData {
        PrincipalData::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap()
    }

    struct FlatFee(u64);
    impl FeeEstimator for FlatFee {
        fn estimate_fee(&self, _tx_len: usize) -> Result<u64, TransactionError> {
            Ok(self.0)
        }
    }

    struct FixedNonce(u64);
    impl NonceProvider for FixedNonce {
        fn next_nonce(&self, _address: &StacksAddress) -> Result<u64, TransactionError> {
            Ok(self.0)
        }
    }

    struct OneFunctionAbi;
    impl AbiProvider for OneFunctionAbi {
        fn function_signature(
            &self,
            _contract: &PrincipalData,
            function_name: &str,
        ) -> Result<Option<FunctionSignature>, TransactionError> {
            if function_name == "set-value" {
                Ok(Some(FunctionSignature {
                    name: "set-value".to_string(),
                    arg_count: 2,
                }))
            } else {
                Ok(None)
            }
        }
    }

    #[test]
    fn test_token_transfer_signed_and_valid() {
        let key = privk(1);
        let options = TxOptions {
            fee: Some(180),
            nonce: Some(3),
            ..TxOptions::testnet()
        };
        let tx = make_token_transfer(&recipient(), 2_500_000, Memo::empty(), &key, &options)
            .unwrap();
        tx.verify().unwrap();
        assert_eq!(tx.tx_fee(), 180);
        assert_eq!(tx.auth.origin().nonce(), 3);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let key = privk(1);
        let options = TxOptions::testnet();
        assert!(matches!(
            make_token_transfer(&recipient(), 0, Memo::empty(), &key, &options),
            Err(TransactionError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_fee_and_nonce_oracles_consulted() {
        let key = privk(2);
        let fee_estimator = FlatFee(777);
        let nonce_provider = FixedNonce(41);
        let options = TxOptions {
            fee_estimator: Some(&fee_estimator),
            nonce_provider: Some(&nonce_provider),
            ..TxOptions::testnet()
        };
        let tx = make_token_transfer(&recipient(), 100, Memo::empty(), &key, &options).unwrap();
        assert_eq!(tx.tx_fee(), 777);
        assert_eq!(tx.auth.origin().nonce(), 41);
        tx.verify().unwrap();
    }

    #[test]
    fn test_multisig_transfer_builder() {
        let keys = vec![privk(1), privk(2), privk(3)];
        let pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public_key()).collect();
        let options = TxOptions {
            fee: Some(300),
            nonce: Some(0),
            ..TxOptions::testnet()
        };
        let tx = make_unsigned_multisig_token_transfer(
            &recipient(),
            1000,
            Memo::empty(),
            MultisigHashMode::P2SH,
            2,
            &pubkeys,
            &options,
        )
        .unwrap();

        let mut signer = TransactionSigner::new(&tx).unwrap();
        signer.sign_origin(&keys[0]).unwrap();
        signer.sign_origin(&keys[1]).unwrap();
        signer.append_origin(&pubkeys[2]).unwrap();
        signer.get_tx().unwrap().verify().unwrap();
    }

    #[test]
    fn test_signed_multisig_builder_with_target_address() {
        let keys = vec![privk(11), privk(12), privk(13)];
        let mut pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public_key()).collect();

        // Derive the target from the sorted committee order, then hand
        // the builder the keys unsorted.
        pubkeys.sort_by_key(|k| k.to_compressed());
        let address = StacksAddress::from_public_keys(
            21,
            crate::address::AddressHashMode::SerializeP2SH,
            2,
            &pubkeys,
        )
        .unwrap();
        let shuffled = vec![pubkeys[2].clone(), pubkeys[0].clone(), pubkeys[1].clone()];

        let options = TxOptions {
            fee: Some(100),
            nonce: Some(0),
            ..TxOptions::testnet()
        };
        let tx = make_multisig_token_transfer(
            &recipient(),
            1000,
            Memo::empty(),
            MultisigHashMode::P2SH,
            2,
            &keys[..2],
            &shuffled,
            Some(&address),
            &options,
        )
        .unwrap();
        tx.verify().unwrap();
        assert_eq!(tx.auth.origin().signer(), &address.hash);

        // An address neither ordering can reproduce is rejected.
        let bogus = StacksAddress::new(21, [0x5a; 20]);
        assert!(matches!(
            make_multisig_token_transfer(
                &recipient(),
                1000,
                Memo::empty(),
                MultisigHashMode::P2SH,
                2,
                &keys[..2],
                &shuffled,
                Some(&bogus),
                &options,
            ),
            Err(TransactionError::AddressMismatch(_))
        ));
    }

    #[test]
    fn test_signed_multisig_builder_requires_enough_keys() {
        let keys = vec![privk(11), privk(12), privk(13)];
        let pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public_key()).collect();
        assert!(matches!(
            make_multisig_token_transfer(
                &recipient(),
                1000,
                Memo::empty(),
                MultisigHashMode::P2SH,
                2,
                &keys[..1],
                &pubkeys,
                None,
                &TxOptions::testnet(),
            ),
            Err(TransactionError::SigningError(_))
        ));
    }

    #[test]
    fn test_contract_deploy_builder() {
        let key = privk(4);
        let options = TxOptions {
            fee: Some(1000),
            nonce: Some(0),
            ..TxOptions::testnet()
        };
        let tx = make_contract_deploy(
            "kv-store",
            "(define-data-var value uint u0)",
            Some(ClarityVersion::Clarity2),
            &key,
            &options,
        )
        .unwrap();
        tx.verify().unwrap();
        match &tx.payload {
            TransactionPayload::SmartContract {
                name,
                clarity_version,
                ..
            } => {
                assert_eq!(name.as_str(), "kv-store");
                assert_eq!(*clarity_version, Some(ClarityVersion::Clarity2));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_contract_call_builder_and_abi_validation() {
        let key = privk(5);
        let contract = PrincipalData::from_string(
            "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159.kv-store",
        )
        .unwrap();
        let options = TxOptions {
            fee: Some(200),
            nonce: Some(1),
            ..TxOptions::testnet()
        };
        let args = vec![ClarityValue::buffer(b"key"), ClarityValue::uint(9)];
        let tx = make_contract_call(&contract, "set-value", &args, &key, &options).unwrap();
        tx.verify().unwrap();

        validate_contract_call(&tx, &OneFunctionAbi).unwrap();

        let short_args = vec![ClarityValue::uint(9)];
        let bad_arity =
            make_contract_call(&contract, "set-value", &short_args, &key, &options).unwrap();
        assert!(matches!(
            validate_contract_call(&bad_arity, &OneFunctionAbi),
            Err(TransactionError::AbiMismatch(_))
        ));

        let missing =
            make_contract_call(&contract, "delete-value", &args, &key, &options).unwrap();
        assert!(matches!(
            validate_contract_call(&missing, &OneFunctionAbi),
            Err(TransactionError::AbiMismatch(_))
        ));
    }

    #[test]
    fn test_contract_call_rejects_standard_principal() {
        let key = privk(5);
        assert!(matches!(
            make_unsigned_contract_call(
                &recipient(),
                "set-value",
                &[],
                &key.public_key(),
                &TxOptions::testnet(),
            ),
            Err(TransactionError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_sponsored_transfer_end_to_end() {
        let origin_key = privk(6);
        let sponsor_key = privk(7);
        let options = TxOptions {
            nonce: Some(2),
            sponsored: true,
            ..TxOptions::testnet()
        };
        let unsigned = make_unsigned_token_transfer(
            &recipient(),
            5000,
            Memo::empty(),
            &origin_key.public_key(),
            &options,
        )
        .unwrap();

        let mut signer = TransactionSigner::new(&unsigned).unwrap();
        signer.sign_origin(&origin_key).unwrap();
        let origin_signed = signer.get_tx_incomplete();

        let finished = sponsor_transaction(&origin_signed, &sponsor_key, 450, 8).unwrap();
        finished.verify().unwrap();
        assert_eq!(finished.tx_fee(), 450);
        assert_eq!(finished.auth.sponsor().unwrap().nonce(), 8);
        assert_eq!(finished.auth.origin().nonce(), 2);
    }
}
