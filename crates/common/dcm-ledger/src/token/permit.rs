//! Off-chain signed allowances.
//!
//! The signed payload is a SHA-256 digest over a fixed type tag, the token's
//! domain separator and every permit field, including the owner's current
//! nonce. Consuming a permit bumps that nonce, so the same signature can never
//! verify twice.

use chrono::{DateTime, Utc};
use dcm_core_types::units::amount_str;
use dcm_core_types::{Principal, PrincipalKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const PERMIT_TYPE: &[u8] = b"Permit(owner,spender,value,nonce,deadline)";
const DOMAIN_TYPE: &[u8] = b"Domain(name,version,verifyingContract)";
const DOMAIN_VERSION: &[u8] = b"1";

/// Binds signatures to one token deployment. Independent of the logic
/// version, so outstanding permits stay valid across upgrades.
pub fn domain_separator(name: &str, token_address: &Principal) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_TYPE);
    hasher.update(Sha256::digest(name.as_bytes()));
    hasher.update(Sha256::digest(DOMAIN_VERSION));
    hasher.update(token_address.as_bytes());
    hasher.finalize().into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitAuthorization {
    pub owner: Principal,
    pub spender: Principal,
    #[serde(with = "amount_str")]
    pub amount: u128,
    pub deadline: DateTime<Utc>,
    pub nonce: u64,
}

impl PermitAuthorization {
    pub fn digest(&self, domain_separator: &[u8; 32]) -> [u8; 32] {
        let mut fields = Sha256::new();
        fields.update(Sha256::digest(PERMIT_TYPE));
        fields.update(self.owner.as_bytes());
        fields.update(self.spender.as_bytes());
        fields.update(self.amount.to_be_bytes());
        fields.update(self.nonce.to_be_bytes());
        fields.update(self.deadline.timestamp().to_be_bytes());
        fields.update(self.deadline.timestamp_subsec_nanos().to_be_bytes());
        let struct_hash = fields.finalize();

        let mut hasher = Sha256::new();
        hasher.update([0x19, 0x01]);
        hasher.update(domain_separator);
        hasher.update(struct_hash);
        hasher.finalize().into()
    }

    /// Produce the owner's signature; done off-ledger by the owner's wallet.
    pub fn sign(&self, key: &PrincipalKey, domain_separator: &[u8; 32]) -> Vec<u8> {
        key.sign(&self.digest(domain_separator))
    }
}
