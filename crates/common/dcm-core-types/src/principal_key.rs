use crate::principal::{Principal, PrincipalError};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignatureCheckError {
    #[error("Signer is not a valid key: {0}")]
    InvalidSigner(#[from] PrincipalError),
    #[error("Malformed signature bytes")]
    MalformedSignature,
    #[error("Signature does not recover to the expected principal")]
    Mismatch,
}

/// An Ed25519 keypair whose public half is a [`Principal`].
#[derive(Debug, Clone)]
pub struct PrincipalKey {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    principal: Principal,
}

impl PrincipalKey {
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self::from_signing_key(SigningKey::generate(&mut csprng))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let principal = Principal::from_verifying_key(&verifying_key);
        PrincipalKey { signing_key, verifying_key, principal }
    }

    /// Deterministic key from a 32-byte seed; used by tooling and fixtures.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    pub fn principal(&self) -> Principal {
        self.principal
    }

    /// The secret seed; `from_seed(key.seed())` rebuilds the same key.
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

/// Check that `signature` over `message` was produced by `signer`.
pub fn verify_message(signer: &Principal, message: &[u8], signature: &[u8]) -> Result<(), SignatureCheckError> {
    let key = signer.to_verifying_key()?;
    let signature = Signature::from_slice(signature).map_err(|_| SignatureCheckError::MalformedSignature)?;
    key.verify(message, &signature).map_err(|_| SignatureCheckError::Mismatch)
}
