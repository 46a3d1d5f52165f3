//! Stealth address engine (DKSAP over Ristretto)
//!
//! Sender, knowing the recipient's (S, B, V):
//! 1. Fresh ephemeral pair (r, R = r·G)
//! 2. ss = SHA256(domain || r·S)
//! 3. P = B + H(ss)·G, view tag = ss[0]
//! 4. K = H'(ss)·V, the note's public nullifier key
//! 5. C = amount·G + H(ss || P)·H, amount sealed under a key derived from ss
//!
//! Recipient, knowing s:
//! 1. ss = SHA256(domain || s·R), compare ss[0] with the tag
//! 2. Recompute P, K and C and compare in constant time
//! 3. One-time private key p = b + H(ss), which needs the spend key
//!
//! The accumulator leaf of a note is SHA256(domain || P || K || C), so a
//! spend must name the exact address and nullifier key the payer created.
//!
//! Security features:
//! - Raw ECDH output is always hashed before use
//! - Constant-time comparison of every recomputed field
//! - Shared secrets zeroize on drop

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::hash::{
    hash_to_scalar, sha256, AMOUNT_KEY_DOMAIN, AMOUNT_NONCE_DOMAIN, BLINDING_DOMAIN,
    NOTE_LEAF_DOMAIN, NULLIFIER_KEY_DOMAIN, OFFSET_DOMAIN, SHARED_SECRET_DOMAIN,
};
use crate::crypto::keys::{EphemeralKeyPair, KeyTriplet, PublicKey, ReceiveAddress, SecretScalar};
use crate::crypto::merkle::Hash;
use crate::crypto::nullifier::derive_nullifier_public;
use crate::crypto::pedersen::{Blinding, Commitment, PedersenGens};
use crate::error::{CoreError, Result};

/// Ciphertext length: 8-byte amount plus 16-byte GCM tag
pub const ENCRYPTED_AMOUNT_LEN: usize = 24;

// ============================================================================
// Shared Secret
// ============================================================================

/// Hashed ECDH output shared by payer and recipient
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First byte of the shared secret
    pub fn view_tag(&self) -> u8 {
        self.0[0]
    }

    /// Additive tweak applied to the spend key
    pub fn offset(&self) -> Scalar {
        hash_to_scalar(OFFSET_DOMAIN, &[&self.0])
    }

    /// Multiplier applied to the view key for this note's nullifier key
    pub fn nullifier_factor(&self) -> Scalar {
        hash_to_scalar(NULLIFIER_KEY_DOMAIN, &[&self.0])
    }

    /// Commitment randomness for the output at `address`
    pub fn blinding(&self, address: &PublicKey) -> Blinding {
        Blinding::from_scalar(&hash_to_scalar(BLINDING_DOMAIN, &[&self.0, address.as_bytes()]))
    }

    fn cipher(&self) -> Result<(Aes256Gcm, [u8; 12])> {
        let mut key = sha256(AMOUNT_KEY_DOMAIN, &[&self.0]);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CoreError::EncryptionFailed);
        key.zeroize();

        let digest = sha256(AMOUNT_NONCE_DOMAIN, &[&self.0]);
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&digest[..12]);
        Ok((cipher?, nonce))
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Fresh ephemeral key pair from OS entropy
pub fn generate_ephemeral_keys() -> EphemeralKeyPair {
    EphemeralKeyPair::generate()
}

/// `SHA256(domain || compress(private·peer))`
///
/// Fails with `InvalidKey` when the peer key does not decode or is the identity.
pub fn derive_shared_secret(private: &Scalar, peer_public: &PublicKey) -> Result<SharedSecret> {
    let peer = peer_public.to_point()?;
    let mut point = (private * peer).compress().to_bytes();
    let secret = SharedSecret(sha256(SHARED_SECRET_DOMAIN, &[&point]));
    point.zeroize();
    Ok(secret)
}

// ============================================================================
// Stealth Address
// ============================================================================

/// One-time destination published with a payment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StealthAddress {
    /// One-time public key P = B + H(ss)·G
    pub address: PublicKey,
    pub view_tag: u8,
    pub ephemeral_public: PublicKey,
    /// Public nullifier key K = H'(ss)·V
    pub nullifier_public: PublicKey,
    pub commitment: Commitment,
}

impl StealthAddress {
    /// Accumulator leaf for this output
    pub fn leaf(&self) -> Hash {
        note_leaf(&self.address, &self.nullifier_public, &self.commitment)
    }
}

/// `SHA256(domain || P || K || C)`
pub fn note_leaf(address: &PublicKey, nullifier_public: &PublicKey, commitment: &Commitment) -> Hash {
    sha256(
        NOTE_LEAF_DOMAIN,
        &[address.as_bytes(), nullifier_public.as_bytes(), commitment.as_bytes()],
    )
}

fn one_time_point(shared: &SharedSecret, spend_public: &PublicKey) -> Result<RistrettoPoint> {
    Ok(spend_public.to_point()? + RistrettoPoint::mul_base(&shared.offset()))
}

/// Derive the one-time address, nullifier key and amount commitment for `shared`
pub fn derive_stealth_address(
    gens: &PedersenGens,
    shared: &SharedSecret,
    recipient: &ReceiveAddress,
    ephemeral_public: &PublicKey,
    amount: u64,
) -> Result<StealthAddress> {
    let address = PublicKey::from_point(&one_time_point(shared, &recipient.spend_public)?);
    let nullifier_public = derive_nullifier_public(&recipient.view_public, shared)?;
    let commitment = gens.commit(amount, &shared.blinding(&address));

    Ok(StealthAddress {
        address,
        view_tag: shared.view_tag(),
        ephemeral_public: *ephemeral_public,
        nullifier_public,
        commitment,
    })
}

fn stealth_fields_match(
    candidate: &StealthAddress,
    shared: &SharedSecret,
    recipient: &ReceiveAddress,
) -> Option<Choice> {
    let address = one_time_point(shared, &recipient.spend_public).ok()?;
    let nullifier_public = derive_nullifier_public(&recipient.view_public, shared).ok()?;

    let address_ok = address.compress().to_bytes().ct_eq(candidate.address.as_bytes());
    let tag_ok = shared.view_tag().ct_eq(&candidate.view_tag);
    let key_ok = nullifier_public.as_bytes().ct_eq(candidate.nullifier_public.as_bytes());
    Some(address_ok & tag_ok & key_ok)
}

/// Recompute address, tag and nullifier key from `shared` and compare
///
/// Every field is compared in constant time and the results combined
/// without branching. Never errors; malformed keys simply fail. The
/// commitment is not checked here since it needs the amount, see
/// [`verify_stealth_output`].
pub fn verify_stealth_address(
    candidate: &StealthAddress,
    shared: &SharedSecret,
    recipient: &ReceiveAddress,
) -> bool {
    stealth_fields_match(candidate, shared, recipient).is_some_and(bool::from)
}

/// [`verify_stealth_address`] plus the amount commitment
pub fn verify_stealth_output(
    gens: &PedersenGens,
    candidate: &StealthAddress,
    shared: &SharedSecret,
    recipient: &ReceiveAddress,
    amount: u64,
) -> bool {
    let Some(fields_ok) = stealth_fields_match(candidate, shared, recipient) else {
        return false;
    };
    let expected = gens.commit(amount, &shared.blinding(&candidate.address));
    let commitment_ok = expected.as_bytes().ct_eq(candidate.commitment.as_bytes());
    bool::from(fields_ok & commitment_ok)
}

/// Recover the one-time private key p = b + H(ss) for an owned address
pub fn recover_spending_key(keys: &KeyTriplet, candidate: &StealthAddress) -> Result<SecretScalar> {
    let shared = derive_shared_secret(&keys.scan_secret(), &candidate.ephemeral_public)?;
    if !verify_stealth_address(candidate, &shared, &keys.receive_address()) {
        return Err(CoreError::InvalidKey);
    }
    Ok(SecretScalar::from_scalar(&(keys.spend_secret() + shared.offset())))
}

/// One-time private key for a stored note, checked against its address
///
/// Fails with `InvalidKey` when `keys` do not own `address`.
pub fn recover_one_time_key(
    keys: &KeyTriplet,
    ephemeral_public: &PublicKey,
    address: &PublicKey,
) -> Result<SecretScalar> {
    let shared = derive_shared_secret(&keys.scan_secret(), ephemeral_public)?;
    let secret = SecretScalar::from_scalar(&(keys.spend_secret() + shared.offset()));
    let derived = RistrettoPoint::mul_base(&secret.to_scalar()).compress().to_bytes();
    if !bool::from(derived.ct_eq(address.as_bytes())) {
        return Err(CoreError::InvalidKey);
    }
    Ok(secret)
}

// ============================================================================
// Amount Encryption
// ============================================================================

/// AES-256-GCM sealed amount, keyed by the shared secret
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptedAmount(pub [u8; ENCRYPTED_AMOUNT_LEN]);

impl fmt::Debug for EncryptedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedAmount({})", hex::encode(self.0))
    }
}

/// Seal `amount` with the one-time address as associated data
///
/// Key and nonce are unique per shared secret, so the fixed nonce
/// derivation never repeats under one key.
pub fn encrypt_amount(shared: &SharedSecret, address: &PublicKey, amount: u64) -> Result<EncryptedAmount> {
    let (cipher, nonce) = shared.cipher()?;
    let sealed = cipher
        .encrypt(
            &Nonce::from(nonce),
            Payload { msg: &amount.to_le_bytes(), aad: address.as_bytes() },
        )
        .map_err(|_| CoreError::EncryptionFailed)?;
    let bytes: [u8; ENCRYPTED_AMOUNT_LEN] =
        sealed.try_into().map_err(|_| CoreError::EncryptionFailed)?;
    Ok(EncryptedAmount(bytes))
}

/// Open a sealed amount, `None` on authentication failure
pub fn decrypt_amount(shared: &SharedSecret, address: &PublicKey, sealed: &EncryptedAmount) -> Option<u64> {
    let (cipher, nonce) = shared.cipher().ok()?;
    let plain = cipher
        .decrypt(&Nonce::from(nonce), Payload { msg: &sealed.0, aad: address.as_bytes() })
        .ok()?;
    let bytes: [u8; 8] = plain.as_slice().try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

// ============================================================================
// Sender Side
// ============================================================================

/// Everything the network needs to deliver a payment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutput {
    pub stealth: StealthAddress,
    pub encrypted_amount: EncryptedAmount,
}

impl PaymentOutput {
    pub fn leaf(&self) -> Hash {
        self.stealth.leaf()
    }
}

/// Sender-side result: the public output plus the private opening
///
/// The opening lets the payer prove what was paid. It does not let the
/// payer spend the output, which needs the recipient's spend key.
pub struct StealthPayment {
    pub output: PaymentOutput,
    pub amount: u64,
    pub blinding: Blinding,
    pub ephemeral: EphemeralKeyPair,
}

impl fmt::Debug for StealthPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StealthPayment")
            .field("output", &self.output)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

/// Build a one-time output paying `amount` to `recipient`
pub fn create_stealth_payment<R: RngCore + CryptoRng>(
    gens: &PedersenGens,
    recipient: &ReceiveAddress,
    amount: u64,
    rng: &mut R,
) -> Result<StealthPayment> {
    let ephemeral = EphemeralKeyPair::generate_with(rng);
    let shared = derive_shared_secret(&ephemeral.private_scalar(), &recipient.scan_public)?;
    let stealth = derive_stealth_address(gens, &shared, recipient, &ephemeral.public_key, amount)?;
    let encrypted_amount = encrypt_amount(&shared, &stealth.address, amount)?;
    let blinding = shared.blinding(&stealth.address);

    Ok(StealthPayment {
        output: PaymentOutput { stealth, encrypted_amount },
        amount,
        blinding,
        ephemeral,
    })
}

/// `create_stealth_payment` with OS entropy
pub fn compute_stealth_payment(
    gens: &PedersenGens,
    recipient: &ReceiveAddress,
    amount: u64,
) -> Result<StealthPayment> {
    create_stealth_payment(gens, recipient, amount, &mut OsRng)
}
