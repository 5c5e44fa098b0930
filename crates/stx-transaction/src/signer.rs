//! A stateful wrapper that walks a transaction through its signing
//! ceremony, tracking the sighash chain between cosigners.

use stx_primitives::ec::{PrivateKey, PublicKey};

use crate::auth::{AuthType, SpendingCondition, TransactionAuth, TransactionAuthField};
use crate::transaction::StacksTransaction;
use crate::TransactionError;

/// Tracks the sighash chain across origin and sponsor signing.
///
/// A signer can be created on a fresh unsigned transaction or on a
/// partially signed one received from a cosigner; in the latter case
/// the chain is caught up by replaying the signatures already present.
#[derive(Clone, Debug)]
pub struct TransactionSigner {
    tx: StacksTransaction,
    sighash: [u8; 32],
    origin_done: bool,
    check_oversign: bool,
    check_overlap: bool,
}

impl TransactionSigner {
    /// Wrap a transaction for origin signing.
    ///
    /// Replays any signature fields already on the origin condition so
    /// a cosigner can pick up where the previous one left off.
    ///
    /// # Arguments
    /// * `tx` - The transaction to sign.
    ///
    /// # Returns
    /// `Ok(TransactionSigner)`, or an error if an existing signature
    /// does not recover.
    pub fn new(tx: &StacksTransaction) -> Result<Self, TransactionError> {
        let mut signer = TransactionSigner {
            tx: tx.clone(),
            sighash: tx.sign_begin(),
            origin_done: false,
            check_oversign: true,
            check_overlap: true,
        };
        if let SpendingCondition::Multisig(condition) = signer.tx.auth.origin() {
            if condition.hash_mode.is_sequential() {
                let mut cur = signer.sighash;
                for field in &condition.fields {
                    if let TransactionAuthField::Signature(encoding, signature) = field {
                        let (_, next) = crate::auth::next_verification(
                            &cur,
                            AuthType::Standard,
                            condition.tx_fee,
                            condition.nonce,
                            *encoding,
                            signature,
                        )?;
                        cur = next;
                    }
                }
                signer.sighash = cur;
            }
        }
        Ok(signer)
    }

    /// Wrap a transaction for sponsor signing.
    ///
    /// Verifies the origin, installs the given sponsor condition, and
    /// starts the chain from the origin's final sighash.
    ///
    /// # Arguments
    /// * `tx` - A transaction whose origin is fully signed.
    /// * `sponsor_condition` - The sponsor's spending condition, with
    ///   fee and nonce already set.
    ///
    /// # Returns
    /// `Ok(TransactionSigner)` positioned for sponsor signing, or
    /// `NotSponsored` if the authorization is standard.
    pub fn new_sponsor(
        tx: &StacksTransaction,
        sponsor_condition: SpendingCondition,
    ) -> Result<Self, TransactionError> {
        if !tx.auth.is_sponsored() {
            return Err(TransactionError::NotSponsored);
        }
        let origin_sighash = tx.verify_origin()?;
        let mut tx = tx.clone();
        tx.auth.set_sponsor(sponsor_condition)?;
        Ok(TransactionSigner {
            tx,
            sighash: origin_sighash,
            origin_done: true,
            check_oversign: true,
            check_overlap: true,
        })
    }

    /// Disable the oversign and overlap checks.
    ///
    /// Useful for building deliberately invalid transactions in tests.
    pub fn disable_checks(&mut self) {
        self.check_oversign = false;
        self.check_overlap = false;
    }

    /// The current sighash chain value.
    pub fn sighash(&self) -> &[u8; 32] {
        &self.sighash
    }

    /// Sign the next origin slot.
    ///
    /// # Arguments
    /// * `private_key` - The origin signer's key.
    pub fn sign_origin(&mut self, private_key: &PrivateKey) -> Result<(), TransactionError> {
        if self.check_overlap && self.origin_done {
            return Err(TransactionError::SigningError(
                "cannot sign origin after sponsor signing began".to_string(),
            ));
        }
        let origin = self.tx.auth.origin();
        if self.check_oversign && origin.num_signatures() >= origin.signatures_required() {
            return Err(TransactionError::SigningError(
                "origin would have too many signatures".to_string(),
            ));
        }
        self.sighash = self.tx.sign_next_origin(&self.sighash, private_key)?;
        Ok(())
    }

    /// Append a non-signing committee key to the origin.
    pub fn append_origin(&mut self, public_key: &PublicKey) -> Result<(), TransactionError> {
        if self.check_overlap && self.origin_done {
            return Err(TransactionError::SigningError(
                "cannot modify origin after sponsor signing began".to_string(),
            ));
        }
        self.sighash = self.tx.append_next_origin(&self.sighash, public_key)?;
        Ok(())
    }

    /// Sign the next sponsor slot.
    ///
    /// The first sponsor signature freezes the origin.
    pub fn sign_sponsor(&mut self, private_key: &PrivateKey) -> Result<(), TransactionError> {
        if let Some(sponsor) = self.tx.auth.sponsor() {
            if self.check_oversign && sponsor.num_signatures() >= sponsor.signatures_required()
            {
                return Err(TransactionError::SigningError(
                    "sponsor would have too many signatures".to_string(),
                ));
            }
        }
        self.sighash = self.tx.sign_next_sponsor(&self.sighash, private_key)?;
        self.origin_done = true;
        Ok(())
    }

    /// Append a non-signing committee key to the sponsor.
    pub fn append_sponsor(&mut self, public_key: &PublicKey) -> Result<(), TransactionError> {
        self.sighash = self.tx.append_next_sponsor(&self.sighash, public_key)?;
        self.origin_done = true;
        Ok(())
    }

    /// Whether every required signature slot has been filled.
    pub fn complete(&self) -> bool {
        let origin = self.tx.auth.origin();
        if origin.num_signatures() < origin.signatures_required() {
            return false;
        }
        match self.tx.auth.sponsor() {
            Some(sponsor) => sponsor.num_signatures() >= sponsor.signatures_required(),
            None => true,
        }
    }

    /// Take the finished transaction, if signing is complete.
    pub fn get_tx(&self) -> Option<StacksTransaction> {
        if self.complete() {
            Some(self.tx.clone())
        } else {
            None
        }
    }

    /// The transaction in its current state, complete or not.
    pub fn get_tx_incomplete(&self) -> StacksTransaction {
        self.tx.clone()
    }
}
