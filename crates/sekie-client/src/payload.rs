//! entry-call payloads for the lending lifecycle
//!
//! every phase maps to one entry function of the lending module with a fixed
//! argument order. building is pure: the same arguments always serialize to
//! the same bytes.

use crate::identity::{AccountAddress, Role};

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// `<address>::<module>`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleId {
    pub address: AccountAddress,
    pub name: String,
}

impl ModuleId {
    pub fn new(address: AccountAddress, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
        }
    }

    /// fully qualified function in this module
    pub fn function(&self, name: impl Into<String>) -> EntryFunctionId {
        EntryFunctionId {
            module: self.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.address, self.name)
    }
}

/// `<address>::<module>::<function>`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryFunctionId {
    pub module: ModuleId,
    pub name: String,
}

impl fmt::Display for EntryFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.name)
    }
}

impl Serialize for EntryFunctionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// move type tag such as `0x1::aptos_coin::AptosCoin`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag(String);

impl TypeTag {
    pub fn aptos_coin() -> Self {
        Self("0x1::aptos_coin::AptosCoin".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // generics may contain further `::`, only the outer struct path is checked
        let outer = s.split('<').next().unwrap_or_default();
        let parts: Vec<&str> = outer.split("::").collect();
        let valid = parts.len() == 3
            && AccountAddress::from_hex(parts[0]).is_ok()
            && parts[1..].iter().all(|p| !p.is_empty());

        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("invalid type tag: {}", s))
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// entry-function argument in its json wire form
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveValue {
    Bool(bool),
    U64(u64),
    Address(AccountAddress),
    String(String),
    Bytes(Vec<u8>),
    Vector(Vec<MoveValue>),
}

impl MoveValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MoveValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MoveValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&AccountAddress> {
        match self {
            MoveValue::Address(a) => Some(a),
            _ => None,
        }
    }
}

impl From<&str> for MoveValue {
    fn from(s: &str) -> Self {
        MoveValue::String(s.to_string())
    }
}

impl From<u64> for MoveValue {
    fn from(v: u64) -> Self {
        MoveValue::U64(v)
    }
}

impl From<AccountAddress> for MoveValue {
    fn from(a: AccountAddress) -> Self {
        MoveValue::Address(a)
    }
}

impl Serialize for MoveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MoveValue::Bool(b) => serializer.serialize_bool(*b),
            // u64 exceeds the safe json integer range, send as string
            MoveValue::U64(v) => serializer.collect_str(v),
            MoveValue::Address(a) => serializer.serialize_str(&a.to_hex()),
            MoveValue::String(s) => serializer.serialize_str(s),
            MoveValue::Bytes(b) => serializer.serialize_str(&format!("0x{}", hex::encode(b))),
            MoveValue::Vector(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// `entry_function_payload` request body
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "entry_function_payload")]
pub struct EntryFunctionPayload {
    pub function: EntryFunctionId,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<MoveValue>,
}

impl EntryFunctionPayload {
    pub fn new(function: EntryFunctionId, type_arguments: Vec<TypeTag>, arguments: Vec<MoveValue>) -> Self {
        Self {
            function,
            type_arguments,
            arguments,
        }
    }

    /// canonical json bytes
    pub fn to_json_bytes(&self) -> Vec<u8> {
        // no map keys or floats, serialization cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// lifecycle phase of one (pool, offer, position) triple
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    InitPool,
    LenderOffer,
    LenderRevoke,
    BorrowerSelect,
    BorrowerPayLoan,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::InitPool,
        Phase::LenderOffer,
        Phase::LenderRevoke,
        Phase::BorrowerSelect,
        Phase::BorrowerPayLoan,
    ];

    /// entry function the phase calls
    pub fn function_name(&self) -> &'static str {
        match self {
            Phase::InitPool => "init_collection_pool",
            Phase::LenderOffer => "lender_offer",
            Phase::LenderRevoke => "lender_revoke",
            Phase::BorrowerSelect => "borrow_select",
            Phase::BorrowerPayLoan => "borrower_pay_loan",
        }
    }

    /// role that must sign the phase
    pub fn signer(&self) -> Role {
        match self {
            Phase::InitPool => Role::Administrator,
            Phase::LenderOffer | Phase::LenderRevoke => Role::Lender,
            Phase::BorrowerSelect | Phase::BorrowerPayLoan => Role::Borrower,
        }
    }

    /// whether the call is generic over the base currency
    pub fn takes_coin_type(&self) -> bool {
        !matches!(self, Phase::InitPool)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::InitPool => "init_pool",
            Phase::LenderOffer => "lender_offer",
            Phase::LenderRevoke => "lender_revoke",
            Phase::BorrowerSelect => "borrower_select",
            Phase::BorrowerPayLoan => "borrower_pay_loan",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "init_pool" | "init" => Ok(Phase::InitPool),
            "lender_offer" | "offer" => Ok(Phase::LenderOffer),
            "lender_revoke" | "revoke" => Ok(Phase::LenderRevoke),
            "borrower_select" | "borrow_select" | "select" => Ok(Phase::BorrowerSelect),
            "borrower_pay_loan" | "pay_loan" | "repay" => Ok(Phase::BorrowerPayLoan),
            _ => Err(format!("unknown phase: {}", s)),
        }
    }
}

/// arguments of one phase, in entry-function parameter order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseArgs {
    InitPool {
        owner: AccountAddress,
        collection: String,
        duration: u64,
        fee: u64,
    },
    LenderOffer {
        collection: String,
        amount: u64,
    },
    LenderRevoke {
        collection: String,
    },
    BorrowerSelect {
        collection: String,
        token: String,
        token_index: u64,
        lender: AccountAddress,
    },
    BorrowerPayLoan,
}

impl PhaseArgs {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseArgs::InitPool { .. } => Phase::InitPool,
            PhaseArgs::LenderOffer { .. } => Phase::LenderOffer,
            PhaseArgs::LenderRevoke { .. } => Phase::LenderRevoke,
            PhaseArgs::BorrowerSelect { .. } => Phase::BorrowerSelect,
            PhaseArgs::BorrowerPayLoan => Phase::BorrowerPayLoan,
        }
    }

    fn into_arguments(self) -> Vec<MoveValue> {
        match self {
            PhaseArgs::InitPool {
                owner,
                collection,
                duration,
                fee,
            } => vec![
                owner.into(),
                MoveValue::String(collection),
                duration.into(),
                fee.into(),
            ],
            PhaseArgs::LenderOffer { collection, amount } => {
                vec![MoveValue::String(collection), amount.into()]
            }
            PhaseArgs::LenderRevoke { collection } => vec![MoveValue::String(collection)],
            PhaseArgs::BorrowerSelect {
                collection,
                token,
                token_index,
                lender,
            } => vec![
                MoveValue::String(collection),
                MoveValue::String(token),
                token_index.into(),
                lender.into(),
            ],
            PhaseArgs::BorrowerPayLoan => vec![],
        }
    }
}

/// builds lifecycle payloads against one deployed module
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadBuilder {
    module: ModuleId,
    coin_type: TypeTag,
}

impl PayloadBuilder {
    pub fn new(module: ModuleId, coin_type: TypeTag) -> Self {
        Self { module, coin_type }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn coin_type(&self) -> &TypeTag {
        &self.coin_type
    }

    pub fn build(&self, args: &PhaseArgs) -> EntryFunctionPayload {
        let phase = args.phase();
        let type_arguments = if phase.takes_coin_type() {
            vec![self.coin_type.clone()]
        } else {
            vec![]
        };

        EntryFunctionPayload::new(
            self.module.function(phase.function_name()),
            type_arguments,
            args.clone().into_arguments(),
        )
    }
}
