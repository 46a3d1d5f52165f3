//! Façade exposed to wallets, merchants and ledger adapters
//!
//! `ShadowPay` owns no ledger state. The accumulator snapshot, the accepted
//! root window and the note store are passed in by the caller on every
//! call, so one instance can serve many identities concurrently.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::CoreConfig;
use crate::crypto::keys::{EphemeralKeyPair, KeyTriplet, ReceiveAddress, ScanKey};
use crate::crypto::merkle::{MerkleHasher, MerkleTree, RootHistory, Sha256Hasher};
use crate::crypto::pedersen::PedersenGens;
use crate::crypto::range_proof::RangeProof;
use crate::crypto::stealth::{create_stealth_payment, PaymentOutput, StealthPayment};
use crate::error::{CoreError, Result};
use crate::note::{total_amount, PaymentNote};
use crate::proofs::{BalanceProof, PaymentBundle, PaymentProof, PaymentRecipient, ProofComposer};
use crate::scanner::{ScanOptions, ScanReport, TransactionCandidate, ViewTagScanner};

const WITHDRAWAL_ID_PREFIX: &str = "wd_";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub amount: u64,
    pub recipient: ReceiveAddress,
    /// Attach a range proof over `[0, u64::MAX]` to the output
    pub hide_amount: bool,
    /// Hand the ephemeral private key back for refunds or audits
    pub retain_ephemeral: bool,
}

impl PaymentIntent {
    pub fn new(amount: u64, recipient: ReceiveAddress) -> Self {
        Self { amount, recipient, hide_amount: false, retain_ephemeral: false }
    }
}

#[derive(Debug)]
pub struct PaymentResult {
    pub proof_id: String,
    pub output: PaymentOutput,
    pub range_proof: Option<RangeProof>,
    /// Present only when the intent asked to retain it
    pub ephemeral: Option<EphemeralKeyPair>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct BalanceResult {
    pub total_balance: u64,
    pub balance_proof: BalanceProof,
    pub note_count: usize,
}

#[derive(Debug)]
pub struct WithdrawalResult {
    pub withdrawal_id: String,
    pub amount: u64,
    pub bundle: PaymentBundle,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Entry point for every payment-core operation
///
/// `H` selects the accumulator hash. It must match the hasher the ledger
/// uses for its tree.
#[derive(Clone, Debug)]
pub struct ShadowPay<H: MerkleHasher = Sha256Hasher> {
    config: CoreConfig,
    composer: ProofComposer,
    _hasher: PhantomData<H>,
}

impl Default for ShadowPay<Sha256Hasher> {
    fn default() -> Self {
        Self::with_config(CoreConfig::default())
    }
}

impl<H: MerkleHasher> ShadowPay<H> {
    /// Validate `config` and build an orchestrator around it
    pub fn new(config: CoreConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: CoreConfig) -> Self {
        let composer = ProofComposer::new(PedersenGens::default(), config.balance_ceiling);
        Self { config, composer, _hasher: PhantomData }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn composer(&self) -> &ProofComposer {
        &self.composer
    }

    pub fn gens(&self) -> &PedersenGens {
        self.composer.gens()
    }

    /// Empty root window sized from the config
    pub fn root_history(&self) -> RootHistory {
        RootHistory::new(self.config.root_history_len)
    }

    fn new_id(prefix: &str) -> String {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        format!("{}{}", prefix, hex::encode(bytes))
    }

    // ------------------------------------------------------------------------
    // Keys and payments
    // ------------------------------------------------------------------------

    pub fn generate_receive_keys(&self) -> KeyTriplet {
        KeyTriplet::generate()
    }

    /// One-time output for `recipient` with its private opening
    pub fn create_stealth_address(&self, recipient: &ReceiveAddress, amount: u64) -> Result<StealthPayment> {
        create_stealth_payment(self.gens(), recipient, amount, &mut OsRng)
    }

    #[instrument(skip_all, fields(hide_amount = intent.hide_amount))]
    pub fn create_payment(&self, intent: &PaymentIntent) -> Result<PaymentResult> {
        let payment = self.create_stealth_address(&intent.recipient, intent.amount)?;

        let range_proof = if intent.hide_amount {
            Some(RangeProof::prove(self.gens(), payment.amount, &payment.blinding, 0, u64::MAX)?)
        } else {
            None
        };

        let StealthPayment { output, ephemeral, .. } = payment;
        let ephemeral = intent.retain_ephemeral.then_some(ephemeral);
        let proof_id = Self::new_id(&self.config.proof_id_prefix);

        info!(proof_id = %proof_id, "payment created");
        Ok(PaymentResult {
            proof_id,
            output,
            range_proof,
            ephemeral,
            timestamp: Utc::now(),
        })
    }

    // ------------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------------

    pub fn scan_for_payments(&self, key: &ScanKey, candidates: &[TransactionCandidate]) -> Vec<PaymentNote> {
        self.scan_for_payments_with(key, candidates, &ScanOptions::default(), &CancellationToken::new())
            .notes
    }

    /// Filtered, cancellable scan with full statistics
    pub fn scan_for_payments_with(
        &self,
        key: &ScanKey,
        candidates: &[TransactionCandidate],
        options: &ScanOptions,
        cancel: &CancellationToken,
    ) -> ScanReport {
        let mut scanner = ViewTagScanner::new(key, self.gens());
        if let Some(workers) = self.config.scan_workers {
            scanner = scanner.with_workers(workers);
        }
        scanner.scan(candidates, options, cancel)
    }

    // ------------------------------------------------------------------------
    // Balance
    // ------------------------------------------------------------------------

    /// Total of `notes` with a threshold-zero proof of ownership
    pub fn get_balance(
        &self,
        keys: &KeyTriplet,
        notes: &[PaymentNote],
        tree: &MerkleTree<H>,
    ) -> Result<BalanceResult> {
        let total_balance = total_amount(notes)?;
        let balance_proof = self.composer.generate_balance_proof(keys, notes, 0, tree)?;
        Ok(BalanceResult { total_balance, balance_proof, note_count: notes.len() })
    }

    pub fn prove_balance(
        &self,
        keys: &KeyTriplet,
        notes: &[PaymentNote],
        min_required: u64,
        tree: &MerkleTree<H>,
    ) -> Result<BalanceProof> {
        self.composer.generate_balance_proof(keys, notes, min_required, tree)
    }

    pub fn verify_balance_proof(&self, proof: &BalanceProof, min_required: u64, anchors: &RootHistory) -> bool {
        self.composer.verify_balance_proof::<H>(proof, min_required, anchors)
    }

    // ------------------------------------------------------------------------
    // Spending
    // ------------------------------------------------------------------------

    /// Spend `inputs` into `outputs`; leftover value returns to `change_to`
    ///
    /// `keys` must own every input. `fee` defaults to the configured fee.
    pub fn create_payment_with_change(
        &self,
        keys: &KeyTriplet,
        inputs: &[PaymentNote],
        outputs: &[PaymentRecipient],
        fee: Option<u64>,
        change_to: &ReceiveAddress,
        tree: &MerkleTree<H>,
    ) -> Result<PaymentBundle> {
        let fee = fee.unwrap_or(self.config.default_fee);
        self.composer
            .generate_payment_proof(keys, inputs, outputs, fee, change_to, tree, None)
    }

    pub fn verify_payment(&self, proof: &PaymentProof, anchors: &RootHistory) -> bool {
        self.composer.verify_payment_proof::<H>(proof, anchors)
    }

    /// Move `amount` (default: everything after the fee) to `target`
    pub fn withdraw(
        &self,
        keys: &KeyTriplet,
        notes: &[PaymentNote],
        target: &ReceiveAddress,
        amount: Option<u64>,
        change_to: &ReceiveAddress,
        tree: &MerkleTree<H>,
    ) -> Result<WithdrawalResult> {
        let fee = self.config.default_fee;
        let available = total_amount(notes)?;
        let amount = match amount {
            Some(amount) => amount,
            None => available.checked_sub(fee).ok_or(CoreError::InsufficientFunds {
                available,
                required: fee,
            })?,
        };
        debug!(notes = notes.len(), amount, fee, "withdrawal requested");

        let outputs = [PaymentRecipient { address: *target, amount }];
        let bundle = self.create_payment_with_change(keys, notes, &outputs, Some(fee), change_to, tree)?;

        Ok(WithdrawalResult {
            withdrawal_id: Self::new_id(WITHDRAWAL_ID_PREFIX),
            amount,
            bundle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_id_format() {
        let core: ShadowPay = ShadowPay::default();
        let recipient = core.generate_receive_keys();
        let result = core
            .create_payment(&PaymentIntent::new(42, recipient.receive_address()))
            .unwrap();

        assert!(result.proof_id.starts_with("sp_"));
        assert_eq!(result.proof_id.len(), 3 + 16);
        assert!(result.proof_id[3..].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(result.ephemeral.is_none());
        assert!(result.range_proof.is_none());
    }

    #[test]
    fn test_hidden_amount_and_retained_ephemeral() {
        let core: ShadowPay = ShadowPay::default();
        let recipient = core.generate_receive_keys();
        let intent = PaymentIntent {
            amount: 7,
            recipient: recipient.receive_address(),
            hide_amount: true,
            retain_ephemeral: true,
        };
        let result = core.create_payment(&intent).unwrap();

        let range = result.range_proof.unwrap();
        assert_eq!(range.commitment, result.output.stealth.commitment);
        assert!(range.verify(core.gens(), 0, u64::MAX));
        assert_eq!(
            result.ephemeral.unwrap().public_key,
            result.output.stealth.ephemeral_public
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CoreConfig { root_history_len: 0, ..CoreConfig::default() };
        assert!(ShadowPay::<Sha256Hasher>::new(config).is_err());
    }

    #[test]
    fn test_withdraw_everything_needs_fee() {
        let core: ShadowPay = ShadowPay::default();
        let keys = core.generate_receive_keys();
        let tree = MerkleTree::new();
        let err = core
            .withdraw(&keys, &[], &keys.receive_address(), None, &keys.receive_address(), &tree)
            .unwrap_err();
        assert_eq!(err, CoreError::InsufficientFunds { available: 0, required: 1_000 });
    }
}
