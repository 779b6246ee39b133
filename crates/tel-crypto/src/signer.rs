use ed25519_dalek::{Signer, Verifier};

use crate::error::CryptoError;
use crate::provider::{algorithms, SignatureAlgorithm};

/// Raw key pair produced by a [`SignatureAlgorithm`].
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    public_key: Vec<u8>,
    secret_key: Vec<u8>,
}

impl KeyPair {
    pub fn new(public_key: Vec<u8>, secret_key: Vec<u8>) -> Self {
        Self {
            public_key,
            secret_key,
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn secret_key(&self) -> &[u8] {
        &self.secret_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "KeyPair(public={}, secret=<redacted>)",
            hex::encode(&self.public_key)
        )
    }
}

/// Ed25519 signatures (32-byte keys, 64-byte signatures).
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519;

impl Ed25519 {
    const PUBLIC_KEY_LEN: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;
    const SECRET_KEY_LEN: usize = ed25519_dalek::SECRET_KEY_LENGTH;
    const SIGNATURE_LEN: usize = ed25519_dalek::SIGNATURE_LENGTH;

    /// Deterministic key pair from a 32-byte seed.
    pub fn key_pair_from_seed(seed: [u8; 32]) -> KeyPair {
        let signing = ed25519_dalek::SigningKey::from_bytes(&seed);
        KeyPair::new(
            signing.verifying_key().to_bytes().to_vec(),
            signing.to_bytes().to_vec(),
        )
    }
}

impl SignatureAlgorithm for Ed25519 {
    fn name(&self) -> &str {
        algorithms::ED25519
    }

    fn public_key_len(&self) -> usize {
        Self::PUBLIC_KEY_LEN
    }

    fn secret_key_len(&self) -> usize {
        Self::SECRET_KEY_LEN
    }

    fn signature_len(&self) -> usize {
        Self::SIGNATURE_LEN
    }

    fn generate_key_pair(&self) -> KeyPair {
        let mut csprng = rand::thread_rng();
        let signing = ed25519_dalek::SigningKey::generate(&mut csprng);
        KeyPair::new(
            signing.verifying_key().to_bytes().to_vec(),
            signing.to_bytes().to_vec(),
        )
    }

    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let secret: [u8; ed25519_dalek::SECRET_KEY_LENGTH] =
            secret_key
                .try_into()
                .map_err(|_| CryptoError::InvalidLength {
                    what: "secret key",
                    expected: Self::SECRET_KEY_LEN,
                    actual: secret_key.len(),
                })?;
        let signing = ed25519_dalek::SigningKey::from_bytes(&secret);
        Ok(signing.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(public) = <[u8; ed25519_dalek::PUBLIC_KEY_LENGTH]>::try_from(public_key) else {
            return false;
        };
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&public) else {
            return false;
        };
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}
