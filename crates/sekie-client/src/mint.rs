//! collateral minting through the `0x3::token` scripts
//!
//! run once during setup, before the lending lifecycle starts.

use crate::config::{CollectionDescriptor, TokenDescriptor};
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::identity::{AccountAddress, Identity};
use crate::ledger::{LedgerClient, TxHash};
use crate::payload::{EntryFunctionPayload, ModuleId, MoveValue};

/// collection and token maxima are left unbounded
const UNLIMITED: u64 = u64::MAX;

pub fn token_module() -> ModuleId {
    ModuleId::new(AccountAddress::three(), "token")
}

fn flags(n: usize) -> MoveValue {
    MoveValue::Vector(vec![MoveValue::Bool(false); n])
}

/// `create_collection_script(name, description, uri, maximum, mutate_setting)`
pub fn create_collection_payload(collection: &CollectionDescriptor) -> EntryFunctionPayload {
    EntryFunctionPayload::new(
        token_module().function("create_collection_script"),
        vec![],
        vec![
            collection.name.as_str().into(),
            collection.description.as_str().into(),
            collection.uri.as_str().into(),
            UNLIMITED.into(),
            flags(3),
        ],
    )
}

/// `create_token_script` with no royalty and no properties
pub fn create_token_payload(
    creator: &AccountAddress,
    collection_name: &str,
    token: &TokenDescriptor,
) -> EntryFunctionPayload {
    EntryFunctionPayload::new(
        token_module().function("create_token_script"),
        vec![],
        vec![
            collection_name.into(),
            token.name.as_str().into(),
            token.description.as_str().into(),
            token.supply.into(),
            UNLIMITED.into(),
            token.uri.as_str().into(),
            // royalty payee, denominator, numerator
            (*creator).into(),
            0u64.into(),
            0u64.into(),
            flags(5),
            MoveValue::Vector(vec![]),
            MoveValue::Vector(vec![]),
            MoveValue::Vector(vec![]),
        ],
    )
}

pub async fn create_collection<L: LedgerClient>(
    dispatcher: &Dispatcher<L>,
    creator: &Identity,
    collection: &CollectionDescriptor,
) -> Result<TxHash, DispatchError> {
    tracing::info!("creating collection {:?}", collection.name);
    dispatcher.dispatch(creator, &create_collection_payload(collection)).await
}

pub async fn create_token<L: LedgerClient>(
    dispatcher: &Dispatcher<L>,
    creator: &Identity,
    collection_name: &str,
    token: &TokenDescriptor,
) -> Result<TxHash, DispatchError> {
    tracing::info!("creating token {:?} in {:?}", token.name, collection_name);
    let payload = create_token_payload(creator.address(), collection_name, token);
    dispatcher.dispatch(creator, &payload).await
}
