//! Key material for the payment core
//!
//! Three long-lived roles per identity:
//! - spend key (b): authorizes spending, one-time private key is b + offset
//! - scan key (s): ECDH key payers target, detects payments and decrypts amounts
//! - view key (v): root of per-note nullifier keys, tracks spends without spending
//!
//! All points are compressed Ristretto encodings (32 bytes), all scalars are
//! canonical little-endian encodings (32 bytes).

use std::fmt;

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::IsIdentity,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::hash::sha256;
use crate::error::{CoreError, Result};

/// Prefix of the textual receive address
pub const ADDRESS_PREFIX: &str = "shadowpay:";

/// Prefix of the payment URI form of a receive address
pub const URI_PREFIX: &str = "shadowpay://";

const MNEMONIC_SPEND_DOMAIN: &[u8] = b"shadowpay/spend";
const MNEMONIC_VIEW_DOMAIN: &[u8] = b"shadowpay/view";
const MNEMONIC_SCAN_DOMAIN: &[u8] = b"shadowpay/scan";

// ============================================================================
// Zeroizing Scalar Wrapper
// ============================================================================

/// A scalar that zeroizes its contents on drop
#[derive(Clone)]
pub struct SecretScalar {
    bytes: [u8; 32],
}

impl SecretScalar {
    pub fn from_scalar(scalar: &Scalar) -> Self {
        Self { bytes: scalar.to_bytes() }
    }

    pub fn to_scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.bytes)
    }

    /// Raw bytes (use carefully)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    fn public(&self) -> PublicKey {
        PublicKey::from_point(&RistrettoPoint::mul_base(&self.to_scalar()))
    }
}

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretScalar(<redacted>)")
    }
}

// ============================================================================
// Public Keys
// ============================================================================

/// Compressed Ristretto public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn from_point(point: &RistrettoPoint) -> Self {
        Self(point.compress().to_bytes())
    }

    /// Parse and validate a public key from raw bytes
    ///
    /// Fails with `InvalidKey` on wrong length, on encodings that are not
    /// valid Ristretto points, and on the identity element.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidKey)?;
        let key = Self(bytes);
        key.to_point()?;
        Ok(key)
    }

    pub fn to_point(&self) -> Result<RistrettoPoint> {
        let point = CompressedRistretto(self.0)
            .decompress()
            .ok_or(CoreError::InvalidKey)?;
        if point.is_identity() {
            return Err(CoreError::InvalidKey);
        }
        Ok(point)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// Validate that 32 bytes are a usable public key
pub fn validate_public_key(bytes: &[u8; 32]) -> bool {
    PublicKey(*bytes).to_point().is_ok()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Generate a uniformly random scalar from 64 bytes of entropy
pub(crate) fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    let scalar = Scalar::from_bytes_mod_order_wide(&bytes);
    bytes.zeroize();
    scalar
}

fn nonzero_secret(bytes: &[u8; 32]) -> Result<SecretScalar> {
    let scalar = Scalar::from_bytes_mod_order(*bytes);
    if scalar == Scalar::ZERO {
        return Err(CoreError::InvalidKey);
    }
    Ok(SecretScalar::from_scalar(&scalar))
}

fn seed_scalar(domain: &[u8], seed: &[u8]) -> SecretScalar {
    let mut digest = sha256(domain, &[seed]);
    let scalar = Scalar::from_bytes_mod_order(digest);
    digest.zeroize();
    SecretScalar::from_scalar(&scalar)
}

// ============================================================================
// Ephemeral Keys
// ============================================================================

/// One-time key pair generated by the payer for a single payment
///
/// The private half zeroizes on drop; dropping the pair after building the
/// payment gives forward secrecy.
pub struct EphemeralKeyPair {
    private_key: SecretScalar,
    pub public_key: PublicKey,
}

impl EphemeralKeyPair {
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let scalar = random_scalar(rng);
        let private_key = SecretScalar::from_scalar(&scalar);
        let public_key = private_key.public();
        Self { private_key, public_key }
    }

    pub fn private_scalar(&self) -> Scalar {
        self.private_key.to_scalar()
    }

    /// Private key bytes, for refund or audit retention
    pub fn export_private(&self) -> [u8; 32] {
        *self.private_key.as_bytes()
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Receive Address
// ============================================================================

/// Encoded receive address length: S || B || V
pub const RECEIVE_ADDRESS_LEN: usize = 96;

/// Public half of a key triplet, shared with payers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiveAddress {
    /// Scan public key (S = s·G), the ECDH target
    pub scan_public: PublicKey,
    /// Spend public key (B = b·G), tweaked into one-time addresses
    pub spend_public: PublicKey,
    /// View public key (V = v·G), tweaked into per-note nullifier keys
    pub view_public: PublicKey,
}

impl ReceiveAddress {
    pub fn new(scan_public: PublicKey, spend_public: PublicKey, view_public: PublicKey) -> Result<Self> {
        scan_public.to_point()?;
        spend_public.to_point()?;
        view_public.to_point()?;
        Ok(Self { scan_public, spend_public, view_public })
    }

    fn payload(&self) -> String {
        let mut combined = [0u8; RECEIVE_ADDRESS_LEN];
        combined[..32].copy_from_slice(&self.scan_public.0);
        combined[32..64].copy_from_slice(&self.spend_public.0);
        combined[64..].copy_from_slice(&self.view_public.0);
        bs58::encode(&combined).into_string()
    }

    /// `shadowpay:<base58(S || B || V)>`
    pub fn encode(&self) -> String {
        format!("{}{}", ADDRESS_PREFIX, self.payload())
    }

    /// `shadowpay://<base58(S || B || V)>`
    pub fn to_uri(&self) -> String {
        format!("{}{}", URI_PREFIX, self.payload())
    }

    /// Parse either the address or the URI form
    pub fn parse(input: &str) -> Result<Self> {
        let encoded = input
            .strip_prefix(URI_PREFIX)
            .or_else(|| input.strip_prefix(ADDRESS_PREFIX))
            .unwrap_or(input);
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CoreError::InvalidAddress(e.to_string()))?;

        if bytes.len() != RECEIVE_ADDRESS_LEN {
            return Err(CoreError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                RECEIVE_ADDRESS_LEN,
                bytes.len()
            )));
        }

        Self::new(
            PublicKey::from_slice(&bytes[..32])?,
            PublicKey::from_slice(&bytes[32..64])?,
            PublicKey::from_slice(&bytes[64..])?,
        )
    }
}

impl fmt::Display for ReceiveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// ============================================================================
// Scan Key
// ============================================================================

/// Watch-only capability: detects payments and builds complete notes
///
/// Holds the scan and view secrets plus the spend public key. It derives
/// nullifiers, so it can tell when a note was spent, but it can never
/// produce a one-time spending key or authorize a spend.
pub struct ScanKey {
    scan_secret: SecretScalar,
    view_secret: SecretScalar,
    pub spend_public: PublicKey,
}

impl ScanKey {
    pub fn new(scan_secret: &[u8; 32], view_secret: &[u8; 32], spend_public: PublicKey) -> Result<Self> {
        spend_public.to_point()?;
        Ok(Self {
            scan_secret: nonzero_secret(scan_secret)?,
            view_secret: nonzero_secret(view_secret)?,
            spend_public,
        })
    }

    pub(crate) fn scan_scalar(&self) -> Scalar {
        self.scan_secret.to_scalar()
    }

    pub(crate) fn view_scalar(&self) -> Scalar {
        self.view_secret.to_scalar()
    }

    pub fn scan_public(&self) -> PublicKey {
        self.scan_secret.public()
    }

    pub fn view_public(&self) -> PublicKey {
        self.view_secret.public()
    }

    pub fn receive_address(&self) -> ReceiveAddress {
        ReceiveAddress {
            scan_public: self.scan_public(),
            spend_public: self.spend_public,
            view_public: self.view_public(),
        }
    }

    /// `hex(scan):hex(view):hex(spend_public)`
    pub fn export(&self) -> String {
        format!(
            "{}:{}:{}",
            hex::encode(self.scan_secret.as_bytes()),
            hex::encode(self.view_secret.as_bytes()),
            self.spend_public.to_hex()
        )
    }

    pub fn import(encoded: &str) -> Result<Self> {
        let mut parts = encoded.split(':');
        let mut next = || -> Result<[u8; 32]> {
            let part = parts.next().ok_or(CoreError::InvalidKey)?;
            let mut bytes = [0u8; 32];
            hex::decode_to_slice(part, &mut bytes).map_err(|_| CoreError::InvalidKey)?;
            Ok(bytes)
        };
        let mut scan = next()?;
        let mut view = next()?;
        let spend_public = PublicKey(next()?);
        let key = Self::new(&scan, &view, spend_public);
        scan.zeroize();
        view.zeroize();
        key
    }
}

impl fmt::Debug for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanKey")
            .field("spend_public", &self.spend_public)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Key Triplet
// ============================================================================

/// Complete key set for a recipient
///
/// Clone is not implemented so secrets are never duplicated by accident.
pub struct KeyTriplet {
    spend_key: SecretScalar,
    view_key: SecretScalar,
    scan_key: SecretScalar,
    pub spend_public: PublicKey,
    pub scan_public: PublicKey,
    pub view_public: PublicKey,
}

impl KeyTriplet {
    /// Generate new random keys from OS entropy
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let spend_key = SecretScalar::from_scalar(&random_scalar(rng));
        let view_key = SecretScalar::from_scalar(&random_scalar(rng));
        let scan_key = SecretScalar::from_scalar(&random_scalar(rng));
        Self::assemble(spend_key, view_key, scan_key)
    }

    /// Reconstruct keys from stored secrets, rejecting zero scalars
    pub fn from_secrets(spend: &[u8; 32], view: &[u8; 32], scan: &[u8; 32]) -> Result<Self> {
        Ok(Self::assemble(
            nonzero_secret(spend)?,
            nonzero_secret(view)?,
            nonzero_secret(scan)?,
        ))
    }

    /// Derive keys from a BIP-39 mnemonic
    ///
    /// Each role is SHA-256(role label || seed) reduced mod l.
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self> {
        let mnemonic: bip39::Mnemonic = phrase
            .parse()
            .map_err(|e: bip39::Error| CoreError::InvalidMnemonic(e.to_string()))?;
        let mut seed = mnemonic.to_seed(passphrase);

        let keys = Self::assemble(
            seed_scalar(MNEMONIC_SPEND_DOMAIN, &seed),
            seed_scalar(MNEMONIC_VIEW_DOMAIN, &seed),
            seed_scalar(MNEMONIC_SCAN_DOMAIN, &seed),
        );
        seed.zeroize();
        Ok(keys)
    }

    /// Generate a fresh 24-word mnemonic and the keys it derives
    pub fn generate_with_mnemonic() -> Result<(Self, String)> {
        let mut entropy = [0u8; 32];
        OsRng.fill_bytes(&mut entropy);
        let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
            .map_err(|e| CoreError::InvalidMnemonic(e.to_string()))?;
        entropy.zeroize();

        let phrase = mnemonic.to_string();
        let keys = Self::from_mnemonic(&phrase, "")?;
        Ok((keys, phrase))
    }

    fn assemble(spend_key: SecretScalar, view_key: SecretScalar, scan_key: SecretScalar) -> Self {
        let spend_public = spend_key.public();
        let scan_public = scan_key.public();
        let view_public = view_key.public();
        Self { spend_key, view_key, scan_key, spend_public, scan_public, view_public }
    }

    pub fn receive_address(&self) -> ReceiveAddress {
        ReceiveAddress {
            scan_public: self.scan_public,
            spend_public: self.spend_public,
            view_public: self.view_public,
        }
    }

    /// Watch-only key for delegated scanning
    pub fn scan_key(&self) -> ScanKey {
        ScanKey {
            scan_secret: self.scan_key.clone(),
            view_secret: self.view_key.clone(),
            spend_public: self.spend_public,
        }
    }

    /// Export secrets as (spend, view, scan) bytes
    ///
    /// WARNING: handle these bytes with extreme care.
    pub fn export_secrets(&self) -> ([u8; 32], [u8; 32], [u8; 32]) {
        (
            *self.spend_key.as_bytes(),
            *self.view_key.as_bytes(),
            *self.scan_key.as_bytes(),
        )
    }

    pub(crate) fn spend_secret(&self) -> Scalar {
        self.spend_key.to_scalar()
    }

    pub(crate) fn scan_secret(&self) -> Scalar {
        self.scan_key.to_scalar()
    }
}

impl fmt::Debug for KeyTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTriplet")
            .field("spend_public", &self.spend_public)
            .field("scan_public", &self.scan_public)
            .field("view_public", &self.view_public)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_public_key_rejects_identity_and_garbage() {
        assert_eq!(PublicKey::from_slice(&[0u8; 32]), Err(CoreError::InvalidKey));
        assert_eq!(PublicKey::from_slice(&[0xff; 32]), Err(CoreError::InvalidKey));
        assert_eq!(PublicKey::from_slice(&[1u8; 31]), Err(CoreError::InvalidKey));
    }

    #[test]
    fn test_public_key_accepts_valid_point() {
        let keys = KeyTriplet::generate();
        let parsed = PublicKey::from_slice(keys.spend_public.as_bytes()).unwrap();
        assert_eq!(parsed, keys.spend_public);
        assert!(validate_public_key(keys.scan_public.as_bytes()));
    }

    #[test]
    fn test_from_secrets_rejects_zero() {
        let one = Scalar::ONE.to_bytes();
        assert!(KeyTriplet::from_secrets(&[0u8; 32], &one, &one).is_err());
        assert!(KeyTriplet::from_secrets(&one, &one, &one).is_ok());
    }

    #[test]
    fn test_export_round_trip() {
        let keys = KeyTriplet::generate();
        let (spend, view, scan) = keys.export_secrets();
        let restored = KeyTriplet::from_secrets(&spend, &view, &scan).unwrap();
        assert_eq!(restored.receive_address(), keys.receive_address());
    }

    #[test]
    fn test_mnemonic_is_deterministic() {
        let a = KeyTriplet::from_mnemonic(TEST_MNEMONIC, "").unwrap();
        let b = KeyTriplet::from_mnemonic(TEST_MNEMONIC, "").unwrap();
        let c = KeyTriplet::from_mnemonic(TEST_MNEMONIC, "passphrase").unwrap();
        assert_eq!(a.receive_address(), b.receive_address());
        assert_ne!(a.receive_address(), c.receive_address());
        assert_ne!(a.spend_public, a.scan_public);
        assert_ne!(a.view_public, a.scan_public);
    }

    #[test]
    fn test_invalid_mnemonic() {
        assert!(matches!(
            KeyTriplet::from_mnemonic("not a real phrase", ""),
            Err(CoreError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_generate_with_mnemonic_restores() {
        let (keys, phrase) = KeyTriplet::generate_with_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
        let restored = KeyTriplet::from_mnemonic(&phrase, "").unwrap();
        assert_eq!(keys.receive_address(), restored.receive_address());
    }

    #[test]
    fn test_receive_address_encoding() {
        let keys = KeyTriplet::generate();
        let address = keys.receive_address();

        let encoded = address.encode();
        assert!(encoded.starts_with(ADDRESS_PREFIX));
        assert_eq!(ReceiveAddress::parse(&encoded).unwrap(), address);

        let uri = address.to_uri();
        assert!(uri.starts_with(URI_PREFIX));
        assert_eq!(ReceiveAddress::parse(&uri).unwrap(), address);
    }

    #[test]
    fn test_receive_address_rejects_bad_length() {
        let short = format!("{}{}", ADDRESS_PREFIX, bs58::encode([7u8; 40]).into_string());
        assert!(matches!(ReceiveAddress::parse(&short), Err(CoreError::InvalidAddress(_))));

        // Two-key payloads from before the view key was published
        let keys = KeyTriplet::generate();
        let mut legacy = [0u8; 64];
        legacy[..32].copy_from_slice(keys.scan_public.as_bytes());
        legacy[32..].copy_from_slice(keys.spend_public.as_bytes());
        let legacy = format!("{}{}", ADDRESS_PREFIX, bs58::encode(legacy).into_string());
        assert!(matches!(ReceiveAddress::parse(&legacy), Err(CoreError::InvalidAddress(_))));
    }

    #[test]
    fn test_scan_key_export_import() {
        let keys = KeyTriplet::generate();
        let scan_key = keys.scan_key();
        let imported = ScanKey::import(&scan_key.export()).unwrap();
        assert_eq!(imported.receive_address(), keys.receive_address());
        assert!(ScanKey::import("deadbeef").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let keys = KeyTriplet::generate();
        let (spend, _, _) = keys.export_secrets();
        let rendered = format!("{:?}", keys);
        assert!(!rendered.contains(&hex::encode(spend)));
    }
}
