//! in-memory chain standing in for a fullnode running the lending module
#![allow(dead_code)]

use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sekie_client::{
    AccountAddress, AccountState, CollectionDescriptor, EntryFunctionPayload, IdentityRegistry,
    LedgerClient, LedgerError, LendingConfig, MoveValue, NetworkConfig, OfferParams, PoolParams,
    RawTransaction, SelectParams, SignedTransaction, TokenDescriptor, TxHash, TxOptions, TxOutcome,
    TypeTag, UnsignedTransaction, WaitOptions,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

type Result<T> = std::result::Result<T, LedgerError>;

pub const COLLECTION: &str = "Vinh Don Lua";
pub const TOKEN: &str = "Vinh Don Lua Token";

pub fn vinh_don_lua_config(identities: IdentityRegistry) -> LendingConfig {
    LendingConfig {
        network: NetworkConfig::local(),
        identities,
        collection: CollectionDescriptor {
            name: COLLECTION.into(),
            description: "Thich don lua vl".into(),
            uri: "https://gamefi.org/api/v1/boxes/9".into(),
        },
        token: TokenDescriptor {
            name: TOKEN.into(),
            description: "Thich don lua vl".into(),
            uri: "https://gamefi.org/api/v1/boxes/10".into(),
            supply: 1,
        },
        pool: PoolParams { duration: 180, fee: 7 },
        offer: OfferParams { amount: 80_000_000 },
        select: SelectParams::default(),
    }
}

/// one accepted submission
#[derive(Clone, Debug)]
pub struct Submitted {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: EntryFunctionPayload,
}

#[derive(Default)]
struct SimState {
    sequence: HashMap<AccountAddress, u64>,
    balances: HashMap<AccountAddress, u64>,
    settled: HashMap<String, TxOutcome>,
    next_version: u64,
    submitted: Vec<Submitted>,
    collections: HashSet<(AccountAddress, String)>,
    pools: HashSet<String>,
    offers: HashMap<(AccountAddress, String), u64>,
    loans: HashMap<AccountAddress, (AccountAddress, String, String)>,
}

#[derive(Default)]
pub struct SimLedger {
    state: Mutex<SimState>,
    /// account lookups fail
    pub unreachable: AtomicBool,
    /// submissions never settle
    pub stall: AtomicBool,
}

impl SimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&self, address: &AccountAddress, amount: u64) {
        let mut state = self.state.lock().unwrap();
        *state.balances.entry(*address).or_default() += amount;
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn submitted_functions(&self) -> Vec<String> {
        self.submitted()
            .into_iter()
            .map(|s| s.payload.function.name)
            .collect()
    }

    pub fn has_loan(&self, borrower: &AccountAddress) -> bool {
        self.state.lock().unwrap().loans.contains_key(borrower)
    }

    pub fn has_offer(&self, lender: &AccountAddress, collection: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .offers
            .contains_key(&(*lender, collection.to_string()))
    }

    fn signing_message(raw: &RawTransaction) -> Vec<u8> {
        let mut message = b"SIM::RawTransaction".to_vec();
        message.extend(serde_json::to_vec(raw).unwrap());
        message
    }

    fn verify(signed: &SignedTransaction) -> Result<()> {
        let invalid = |m: &str| LedgerError::Api {
            status: 400,
            message: m.to_string(),
            error_code: Some("invalid_signature".into()),
            vm_error_code: None,
        };

        let pk: [u8; 32] = hex::decode(signed.signature.public_key.trim_start_matches("0x"))
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| invalid("malformed public key"))?;
        let sig: [u8; 64] = hex::decode(signed.signature.signature.trim_start_matches("0x"))
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| invalid("malformed signature"))?;

        let vk = VerifyingKey::from_bytes(&pk).map_err(|_| invalid("bad public key"))?;
        vk.verify(&Self::signing_message(&signed.raw), &Signature::from_bytes(&sig))
            .map_err(|_| invalid("INVALID_SIGNATURE"))
    }
}

fn string_arg(args: &[MoveValue], i: usize) -> String {
    args.get(i).and_then(|a| a.as_str()).unwrap_or_default().to_string()
}

fn u64_arg(args: &[MoveValue], i: usize) -> u64 {
    args.get(i).and_then(|a| a.as_u64()).unwrap_or_default()
}

impl SimState {
    /// run the entry function, returning the abort code on failure
    fn execute(&mut self, sender: AccountAddress, payload: &EntryFunctionPayload) -> std::result::Result<(), &'static str> {
        let args = &payload.arguments;

        match payload.function.name.as_str() {
            "create_collection_script" => {
                if !self.collections.insert((sender, string_arg(args, 0))) {
                    return Err("ECOLLECTION_ALREADY_EXISTS");
                }
            }
            "create_token_script" => {
                if !self.collections.contains(&(sender, string_arg(args, 0))) {
                    return Err("ECOLLECTION_NOT_PUBLISHED");
                }
            }
            "init_collection_pool" => {
                if !self.pools.insert(string_arg(args, 1)) {
                    return Err("EPOOL_ALREADY_EXISTS");
                }
            }
            "lender_offer" => {
                let collection = string_arg(args, 0);
                let amount = u64_arg(args, 1);
                if !self.pools.contains(&collection) {
                    return Err("EPOOL_NOT_FOUND");
                }
                if self.offers.contains_key(&(sender, collection.clone())) {
                    return Err("EOFFER_ALREADY_EXISTS");
                }
                let balance = self.balances.entry(sender).or_default();
                if *balance < amount {
                    return Err("EINSUFFICIENT_BALANCE");
                }
                *balance -= amount;
                self.offers.insert((sender, collection), amount);
            }
            "lender_revoke" => {
                let amount = self
                    .offers
                    .remove(&(sender, string_arg(args, 0)))
                    .ok_or("ENO_OFFER")?;
                *self.balances.entry(sender).or_default() += amount;
            }
            "borrow_select" => {
                let collection = string_arg(args, 0);
                let token = string_arg(args, 1);
                let lender = args
                    .get(3)
                    .and_then(|a| a.as_address())
                    .copied()
                    .ok_or("EINVALID_ARGUMENT")?;
                if self.loans.contains_key(&sender) {
                    return Err("ELOAN_ALREADY_OPEN");
                }
                let amount = self
                    .offers
                    .remove(&(lender, collection.clone()))
                    .ok_or("ENO_OFFER")?;
                *self.balances.entry(sender).or_default() += amount;
                self.loans.insert(sender, (lender, collection, token));
            }
            "borrower_pay_loan" => {
                self.loans.remove(&sender).ok_or("ENO_LOAN")?;
            }
            _ => return Err("EFUNCTION_NOT_FOUND"),
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerClient for SimLedger {
    async fn account_state(&self, address: &AccountAddress) -> Result<AccountState> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Connection("connection refused".into()));
        }
        let state = self.state.lock().unwrap();
        Ok(AccountState {
            sequence_number: state.sequence.get(address).copied().unwrap_or_default(),
            authentication_key: None,
        })
    }

    async fn build_transaction(
        &self,
        sender: &AccountAddress,
        state: &AccountState,
        payload: &EntryFunctionPayload,
        opts: &TxOptions,
    ) -> Result<UnsignedTransaction> {
        let raw = RawTransaction::new(*sender, state.sequence_number, payload.clone(), opts);
        let signing_message = Self::signing_message(&raw);
        Ok(UnsignedTransaction { raw, signing_message })
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<TxHash> {
        Self::verify(signed)?;

        let mut state = self.state.lock().unwrap();
        let raw = &signed.raw;
        let expected = state.sequence.get(&raw.sender).copied().unwrap_or_default();
        if raw.sequence_number != expected {
            return Err(LedgerError::Api {
                status: 400,
                message: format!("SEQUENCE_NUMBER_TOO_OLD: expected {}", expected),
                error_code: Some("vm_error".into()),
                vm_error_code: Some(3),
            });
        }

        state.sequence.insert(raw.sender, expected + 1);
        state.submitted.push(Submitted {
            sender: raw.sender,
            sequence_number: raw.sequence_number,
            payload: raw.payload.clone(),
        });

        let version = state.next_version;
        state.next_version += 1;
        let hash = TxHash(format!("0x{:064x}", version + 1));

        let (success, vm_status) = match state.execute(raw.sender, &raw.payload) {
            Ok(()) => (true, "Executed successfully".to_string()),
            Err(code) => (
                false,
                format!("Move abort in {}: {}", raw.payload.function.module, code),
            ),
        };

        if !self.stall.load(Ordering::SeqCst) {
            state.settled.insert(
                hash.to_string(),
                TxOutcome {
                    hash: hash.clone(),
                    success,
                    vm_status,
                    version: Some(version),
                },
            );
        }

        Ok(hash)
    }

    async fn await_confirmation(&self, hash: &TxHash, wait: &WaitOptions) -> Result<TxOutcome> {
        let outcome = self
            .state
            .lock()
            .unwrap()
            .settled
            .get(hash.as_str())
            .cloned()
            .ok_or_else(|| LedgerError::Timeout(format!("transaction {}", hash)))?;

        if wait.require_success && !outcome.success {
            return Err(LedgerError::Aborted {
                hash: hash.to_string(),
                vm_status: outcome.vm_status,
            });
        }
        Ok(outcome)
    }

    async fn query_balance(&self, address: &AccountAddress, _coin: &TypeTag) -> Result<u64> {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(address)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(format!("CoinStore for {}", address)))
    }
}
