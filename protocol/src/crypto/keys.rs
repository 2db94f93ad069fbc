//! # Key Management
//!
//! Ed25519 keypair generation and serialization for Arcade identities.
//!
//! Every participant — players, the off-chain authorizer, the factory owner —
//! is an Ed25519 keypair. The hex-encoded public key doubles as the account
//! identifier that appears in vault share ledgers and session records.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (thanks, ed25519-dalek).
//! - Key generation uses the OS RNG. If your OS RNG is broken, you have
//!   bigger problems than Arcade.
//! - Key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::config::{SIGNATURE_LENGTH, SIGNING_KEY_LENGTH, VERIFYING_KEY_LENGTH};

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed — leaking details about
/// key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An Arcade identity keypair wrapping an Ed25519 signing key.
///
/// The authorizer uses one of these to co-sign economic terms; players use
/// them to prove account ownership in tests and tooling.
///
/// `ArcadeKeypair` intentionally does NOT implement `Serialize` /
/// `Deserialize`. Serializing private keys should be a deliberate act, not
/// something that happens because a keypair ended up inside a JSON response.
pub struct ArcadeKeypair {
    signing_key: SigningKey,
}

/// The public half of an Arcade identity, safe to share with the world.
///
/// Its hex encoding is the canonical account identifier used across the
/// contracts: share ledgers, session records, and fee routing all key on it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcadePublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature over a message. 64 bytes, deterministic for a given
/// (key, message) pair.
///
/// Stored as `Vec<u8>` for serde compatibility, but always exactly 64 bytes.
/// A signature of any other length simply fails verification — no panics,
/// just a boolean `false`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcadeSignature {
    bytes: Vec<u8>,
}

impl ArcadeKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the 32-byte secret key *is* the seed. Useful for deriving
    /// stable test identities; with a weak seed you get a weak key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        if bytes.len() != SIGNING_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKey);
        }
        let mut arr = [0u8; SIGNING_KEY_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_seed(&arr))
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> ArcadePublicKey {
        ArcadePublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// The hex-encoded public key — the account identifier this keypair
    /// controls. Safe to share, log, tattoo on your arm, etc.
    pub fn account_id(&self) -> String {
        self.public_key().to_hex()
    }

    /// Sign a message and return an `ArcadeSignature`.
    ///
    /// Ed25519 signatures are deterministic — no nonce games, no randomness
    /// needed at signing time, no RNG-during-signing disasters.
    pub fn sign(&self, message: &[u8]) -> ArcadeSignature {
        let sig = self.signing_key.sign(message);
        ArcadeSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &ArcadeSignature) -> bool {
        self.public_key().verify(message, signature)
    }

    /// Exports the raw 32-byte secret key material.
    ///
    /// **Handle with extreme care.** This is the only secret standing between
    /// an attacker and the associated identity.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for ArcadeKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even partially.
        write!(f, "ArcadeKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// ArcadePublicKey
// ---------------------------------------------------------------------------

impl ArcadePublicKey {
    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Try to create a public key from a byte slice, validating that the
    /// bytes represent a real Ed25519 point. This catches low-order points
    /// and other degenerate cases.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != VERIFYING_KEY_LENGTH {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut bytes = [0u8; VERIFYING_KEY_LENGTH];
        bytes.copy_from_slice(slice);
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    ///
    /// Returns a plain boolean: the vast majority of callers want a yes/no
    /// answer, and handing out the specific failure mode is an error oracle
    /// we'd rather not build.
    pub fn verify(&self, message: &[u8], signature: &ArcadeSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig_bytes: [u8; SIGNATURE_LENGTH] = match signature.bytes.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let dalek_sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// Hex-encoded representation. 64 characters for 32 bytes. This string
    /// is the account identifier used throughout the contracts.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a hex-encoded public key string.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    /// Base58-encoded representation — more compact than hex, what users
    /// see as their "address" in wallet UIs.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.bytes).into_string()
    }
}

impl Hash for ArcadePublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for ArcadePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ArcadePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArcadePublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// ArcadeSignature
// ---------------------------------------------------------------------------

impl ArcadeSignature {
    /// Create a signature from its raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the raw signature bytes (64 bytes for any valid signature).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-encoded signature string. 128 characters for a valid signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parse a hex-encoded signature.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(hex::FromHexError::OddLength);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Debug for ArcadeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "ArcadeSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "ArcadeSignature({})", hex_str)
        }
    }
}
