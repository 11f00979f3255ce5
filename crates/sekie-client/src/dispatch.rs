//! transaction dispatcher
//!
//! one call = one transaction: fetch account state, build, sign, submit,
//! wait for settlement. every failure is returned as a `DispatchError` tagged
//! with the step that failed. there is no retry; a failed call must be
//! re-invoked by the caller.

use crate::error::DispatchError;
use crate::identity::Identity;
use crate::ledger::{LedgerClient, TxHash, TxOptions, WaitOptions};
use crate::payload::EntryFunctionPayload;

pub struct Dispatcher<L> {
    ledger: L,
    tx_options: TxOptions,
    wait: WaitOptions,
}

impl<L: LedgerClient> Dispatcher<L> {
    pub fn new(ledger: L) -> Self {
        Self::with_options(ledger, TxOptions::default(), WaitOptions::default())
    }

    pub fn with_options(ledger: L, tx_options: TxOptions, wait: WaitOptions) -> Self {
        Self {
            ledger,
            tx_options,
            wait,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// execute `payload` signed by `identity`, returning the settled hash
    pub async fn dispatch(
        &self,
        identity: &Identity,
        payload: &EntryFunctionPayload,
    ) -> Result<TxHash, DispatchError> {
        match self.execute(identity, payload).await {
            Ok(hash) => {
                tracing::info!(
                    role = %identity.role(),
                    function = %payload.function,
                    "hash: {}",
                    hash
                );
                Ok(hash)
            }
            Err(e) => {
                tracing::warn!(
                    role = %identity.role(),
                    function = %payload.function,
                    kind = %e.kind(),
                    "dispatch failed: {}",
                    e.message()
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        identity: &Identity,
        payload: &EntryFunctionPayload,
    ) -> Result<TxHash, DispatchError> {
        let sender = identity.address();

        let state = self
            .ledger
            .account_state(sender)
            .await
            .map_err(|e| DispatchError::Construction(e.to_string()))?;
        tracing::debug!("{} at sequence {}", sender, state.sequence_number);

        let unsigned = self
            .ledger
            .build_transaction(sender, &state, payload, &self.tx_options)
            .await
            .map_err(|e| DispatchError::Construction(e.to_string()))?;

        let signed = identity
            .sign(&unsigned)
            .map_err(|e| DispatchError::Signing(e.to_string()))?;

        let hash = self
            .ledger
            .submit(&signed)
            .await
            .map_err(|e| DispatchError::Submission(e.to_string()))?;
        tracing::debug!("awaiting {}", hash);

        let wait = WaitOptions {
            require_success: true,
            ..self.wait
        };
        let outcome = self
            .ledger
            .await_confirmation(&hash, &wait)
            .await
            .map_err(|e| DispatchError::Confirmation(e.to_string()))?;

        if !outcome.success {
            return Err(DispatchError::Confirmation(outcome.vm_status));
        }

        Ok(hash)
    }
}
