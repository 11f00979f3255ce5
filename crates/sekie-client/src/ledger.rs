//! ledger client interface
//!
//! the orchestrator only needs account state, envelope construction,
//! submission, settlement polling and a balance query. `RestClient`
//! implements these against a fullnode; tests plug in simulated ledgers.

use crate::error::Result;
use crate::identity::AccountAddress;
use crate::payload::{EntryFunctionPayload, TypeTag};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// u64 fields travel as decimal strings
pub(crate) mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Num(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => s.parse().map_err(de::Error::custom),
            Repr::Num(n) => Ok(n),
        }
    }
}

/// on-chain account state needed to build an envelope
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AccountState {
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
    #[serde(default)]
    pub authentication_key: Option<String>,
}

/// transaction hash as reported by the node
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// gas and expiry parameters for new envelopes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOptions {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    /// seconds from now until the envelope expires
    pub expiration_secs: u64,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            max_gas_amount: 200_000,
            gas_unit_price: 100,
            expiration_secs: 20,
        }
    }
}

/// settlement wait parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// treat an on-chain abort as an error
    pub require_success: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
            require_success: false,
        }
    }
}

/// unsigned transaction envelope
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
    #[serde(with = "u64_string")]
    pub max_gas_amount: u64,
    #[serde(with = "u64_string")]
    pub gas_unit_price: u64,
    #[serde(with = "u64_string")]
    pub expiration_timestamp_secs: u64,
    pub payload: EntryFunctionPayload,
}

impl RawTransaction {
    pub fn new(
        sender: AccountAddress,
        sequence_number: u64,
        payload: EntryFunctionPayload,
        opts: &TxOptions,
    ) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            sender,
            sequence_number,
            max_gas_amount: opts.max_gas_amount,
            gas_unit_price: opts.gas_unit_price,
            expiration_timestamp_secs: now.saturating_add(opts.expiration_secs),
            payload,
        }
    }
}

/// envelope plus the exact bytes the sender must sign
#[derive(Clone, Debug)]
pub struct UnsignedTransaction {
    pub raw: RawTransaction,
    pub signing_message: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "ed25519_signature")]
pub struct TransactionSignature {
    pub public_key: String,
    pub signature: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub raw: RawTransaction,
    pub signature: TransactionSignature,
}

/// settled transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: TxHash,
    pub success: bool,
    pub vm_status: String,
    pub version: Option<u64>,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// current sequence number for `address`
    async fn account_state(&self, address: &AccountAddress) -> Result<AccountState>;

    /// envelope and signing message for `payload` sent from `sender`
    async fn build_transaction(
        &self,
        sender: &AccountAddress,
        state: &AccountState,
        payload: &EntryFunctionPayload,
        opts: &TxOptions,
    ) -> Result<UnsignedTransaction>;

    /// submit a signed envelope, returning its hash
    async fn submit(&self, signed: &SignedTransaction) -> Result<TxHash>;

    /// block until `hash` settles or `wait.timeout` elapses
    async fn await_confirmation(&self, hash: &TxHash, wait: &WaitOptions) -> Result<TxOutcome>;

    /// coin balance of `address`
    async fn query_balance(&self, address: &AccountAddress, coin: &TypeTag) -> Result<u64>;
}

#[async_trait]
impl<L: LedgerClient + ?Sized> LedgerClient for Arc<L> {
    async fn account_state(&self, address: &AccountAddress) -> Result<AccountState> {
        (**self).account_state(address).await
    }

    async fn build_transaction(
        &self,
        sender: &AccountAddress,
        state: &AccountState,
        payload: &EntryFunctionPayload,
        opts: &TxOptions,
    ) -> Result<UnsignedTransaction> {
        (**self).build_transaction(sender, state, payload, opts).await
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<TxHash> {
        (**self).submit(signed).await
    }

    async fn await_confirmation(&self, hash: &TxHash, wait: &WaitOptions) -> Result<TxOutcome> {
        (**self).await_confirmation(hash, wait).await
    }

    async fn query_balance(&self, address: &AccountAddress, coin: &TypeTag) -> Result<u64> {
        (**self).query_balance(address, coin).await
    }
}
