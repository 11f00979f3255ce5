//! participant identities
//!
//! three fixed roles sign for the lending lifecycle: the lender, the borrower
//! (who also owns the collateral collection) and the pool administrator.
//! key material is kept as raw bytes and only validated when signing, so a
//! misconfigured identity fails at dispatch time rather than at startup.

use crate::error::IdentityError;
use crate::ledger::{SignedTransaction, TransactionSignature, UnsignedTransaction};

use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// single-signer ed25519 authentication scheme byte
const ED25519_SCHEME: u8 = 0x00;

/// 32-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub const LENGTH: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// `0x1`
    pub const fn one() -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        Self(bytes)
    }

    /// `0x3`
    pub const fn three() -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = 3;
        Self(bytes)
    }

    /// parse hex with or without `0x`, short forms are left-padded
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > Self::LENGTH * 2 {
            return Err(IdentityError::InvalidAddress(s.to_string()));
        }

        let padded = format!("{:0>64}", digits);
        let bytes = hex::decode(&padded).map_err(|_| IdentityError::InvalidAddress(s.to_string()))?;

        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// address of a fresh account: sha3-256(public key || scheme)
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(public_key);
        hasher.update([ED25519_SCHEME]);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// long form `0x` + 64 hex chars
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex())
    }
}

impl FromStr for AccountAddress {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// protocol role an identity signs for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// deposits liquidity into a pool
    Lender,
    /// owns the collateral and draws the loan
    Borrower,
    /// creates pools
    Administrator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Lender, Role::Borrower, Role::Administrator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Lender => "lender",
            Role::Borrower => "borrower",
            Role::Administrator => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lender" => Ok(Role::Lender),
            "borrower" | "owner" => Ok(Role::Borrower),
            "admin" | "administrator" => Ok(Role::Administrator),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// an address plus the key material that signs for it
pub struct Identity {
    role: Role,
    address: AccountAddress,
    public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
}

impl Identity {
    /// wrap raw key material without validating it
    pub fn new(role: Role, address: AccountAddress, public_key: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self {
            role,
            address,
            public_key,
            private_key: Zeroizing::new(private_key),
        }
    }

    /// build from the hex triple an account export carries
    ///
    /// empty key strings are accepted and surface as signing errors later
    pub fn from_hex(
        role: Role,
        address: &str,
        public_key_hex: &str,
        private_key_hex: &str,
    ) -> Result<Self, IdentityError> {
        let address = AccountAddress::from_hex(address)?;
        let public_key = decode_key(public_key_hex).map_err(IdentityError::InvalidPublicKey)?;
        let private_key = decode_key(private_key_hex).map_err(IdentityError::InvalidPrivateKey)?;
        Ok(Self::new(role, address, public_key, private_key))
    }

    /// fresh random key with its derived address
    pub fn generate(role: Role) -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let public_key = signing_key.verifying_key().to_bytes();
        Self::new(
            role,
            AccountAddress::from_public_key(&public_key),
            public_key.to_vec(),
            signing_key.to_bytes().to_vec(),
        )
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.public_key))
    }

    /// private key as `0x` hex, for exporting generated keys
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.private_key.as_slice())))
    }

    /// validate key material and return the signing key
    ///
    /// accepts a 32-byte secret or a 64-byte secret||public keypair
    pub fn signing_key(&self) -> Result<SigningKey, IdentityError> {
        let signing_key = match self.private_key.len() {
            0 => return Err(IdentityError::MissingPrivateKey),
            SECRET_KEY_LENGTH => {
                let mut secret = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
                secret.copy_from_slice(&self.private_key);
                SigningKey::from_bytes(&secret)
            }
            64 => {
                let mut keypair = Zeroizing::new([0u8; 64]);
                keypair.copy_from_slice(&self.private_key);
                SigningKey::from_keypair_bytes(&keypair)
                    .map_err(|e| IdentityError::InvalidPrivateKey(e.to_string()))?
            }
            n => {
                return Err(IdentityError::InvalidPrivateKey(format!(
                    "expected 32 or 64 bytes, got {}",
                    n
                )))
            }
        };

        if !self.public_key.is_empty()
            && self.public_key.as_slice() != signing_key.verifying_key().as_bytes()
        {
            return Err(IdentityError::KeyMismatch);
        }

        Ok(signing_key)
    }

    /// sign an envelope over its ledger-provided signing message
    pub fn sign(&self, unsigned: &UnsignedTransaction) -> Result<SignedTransaction, IdentityError> {
        let signing_key = self.signing_key()?;
        let signature = signing_key.sign(&unsigned.signing_message);

        Ok(SignedTransaction {
            raw: unsigned.raw.clone(),
            signature: TransactionSignature {
                public_key: format!("0x{}", hex::encode(signing_key.verifying_key().as_bytes())),
                signature: format!("0x{}", hex::encode(signature.to_bytes())),
            },
        })
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("role", &self.role)
            .field("address", &self.address)
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

fn decode_key(s: &str) -> Result<Vec<u8>, String> {
    let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
    hex::decode(digits).map_err(|e| e.to_string())
}

/// the three identities of a run
#[derive(Debug)]
pub struct IdentityRegistry {
    pub lender: Identity,
    pub borrower: Identity,
    pub admin: Identity,
}

impl IdentityRegistry {
    pub fn new(lender: Identity, borrower: Identity, admin: Identity) -> Self {
        Self { lender, borrower, admin }
    }

    /// random keys for every role
    pub fn generate() -> Self {
        Self::new(
            Identity::generate(Role::Lender),
            Identity::generate(Role::Borrower),
            Identity::generate(Role::Administrator),
        )
    }

    pub fn get(&self, role: Role) -> &Identity {
        match role {
            Role::Lender => &self.lender,
            Role::Borrower => &self.borrower,
            Role::Administrator => &self.admin,
        }
    }
}
