//! lending lifecycle orchestration
//!
//! ```text
//! NoPool -> PoolInitialized -> OfferOpen -> OfferRevoked
//!                                        -> LoanOpen -> LoanRepaid
//! ```
//!
//! each arrow is exactly one dispatched transaction. the orchestrator does not
//! track or enforce these states: an out-of-order call is still submitted and
//! the module's rejection comes back as a confirmation error.

use crate::config::LendingConfig;
use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, LedgerError};
use crate::identity::{Identity, Role};
use crate::ledger::{LedgerClient, TxHash};
use crate::mint;
use crate::payload::{EntryFunctionPayload, PayloadBuilder, Phase, PhaseArgs};

/// result of one phase attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub signer: Role,
    pub outcome: Result<TxHash, DispatchError>,
}

impl PhaseReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn hash(&self) -> Option<&TxHash> {
        self.outcome.as_ref().ok()
    }
}

pub struct LendingOrchestrator<L> {
    config: LendingConfig,
    builder: PayloadBuilder,
    dispatcher: Dispatcher<L>,
}

impl<L: LedgerClient> LendingOrchestrator<L> {
    pub fn new(config: LendingConfig, ledger: L) -> Self {
        let builder = PayloadBuilder::new(config.network.module(), config.network.coin_type.clone());
        let dispatcher = Dispatcher::with_options(
            ledger,
            config.network.tx_options(),
            config.network.wait_options(),
        );

        Self {
            config,
            builder,
            dispatcher,
        }
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher<L> {
        &self.dispatcher
    }

    pub fn identity(&self, role: Role) -> &Identity {
        self.config.identities.get(role)
    }

    /// identity bound to `phase`
    pub fn signer_for(&self, phase: Phase) -> &Identity {
        self.identity(phase.signer())
    }

    /// phase arguments resolved from the configuration
    pub fn args_for(&self, phase: Phase) -> PhaseArgs {
        let c = &self.config;
        let collection = c.collection.name.clone();

        match phase {
            // the pool is keyed to the collection creator, which is the borrower
            Phase::InitPool => PhaseArgs::InitPool {
                owner: *c.identities.borrower.address(),
                collection,
                duration: c.pool.duration,
                fee: c.pool.fee,
            },
            Phase::LenderOffer => PhaseArgs::LenderOffer {
                collection,
                amount: c.offer.amount,
            },
            Phase::LenderRevoke => PhaseArgs::LenderRevoke { collection },
            Phase::BorrowerSelect => PhaseArgs::BorrowerSelect {
                collection,
                token: c.token.name.clone(),
                token_index: c.select.token_index,
                lender: *c.identities.lender.address(),
            },
            Phase::BorrowerPayLoan => PhaseArgs::BorrowerPayLoan,
        }
    }

    pub fn payload_for(&self, phase: Phase) -> EntryFunctionPayload {
        self.builder.build(&self.args_for(phase))
    }

    /// dispatch explicit arguments with the identity their phase requires
    pub async fn execute(&self, args: &PhaseArgs) -> Result<TxHash, DispatchError> {
        let phase = args.phase();
        tracing::debug!("phase {} signed by {}", phase, phase.signer());
        self.dispatcher
            .dispatch(self.signer_for(phase), &self.builder.build(args))
            .await
    }

    pub async fn run_phase(&self, phase: Phase) -> PhaseReport {
        PhaseReport {
            phase,
            signer: phase.signer(),
            outcome: self.execute(&self.args_for(phase)).await,
        }
    }

    /// run phases in order, stopping after the first failure
    pub async fn run_sequence(&self, phases: &[Phase]) -> Vec<PhaseReport> {
        let mut reports = Vec::with_capacity(phases.len());

        for &phase in phases {
            let report = self.run_phase(phase).await;
            let failed = !report.is_success();
            reports.push(report);

            if failed {
                tracing::warn!("halting sequence at {}", phase);
                break;
            }
        }

        reports
    }

    pub async fn init_pool(&self) -> Result<TxHash, DispatchError> {
        self.run_phase(Phase::InitPool).await.outcome
    }

    pub async fn lender_offer(&self) -> Result<TxHash, DispatchError> {
        self.run_phase(Phase::LenderOffer).await.outcome
    }

    pub async fn lender_revoke(&self) -> Result<TxHash, DispatchError> {
        self.run_phase(Phase::LenderRevoke).await.outcome
    }

    pub async fn borrower_select(&self) -> Result<TxHash, DispatchError> {
        self.run_phase(Phase::BorrowerSelect).await.outcome
    }

    pub async fn borrower_pay_loan(&self) -> Result<TxHash, DispatchError> {
        self.run_phase(Phase::BorrowerPayLoan).await.outcome
    }

    /// mint the configured collection, owned by the borrower
    pub async fn create_collection(&self) -> Result<TxHash, DispatchError> {
        mint::create_collection(
            &self.dispatcher,
            self.identity(Role::Borrower),
            &self.config.collection,
        )
        .await
    }

    /// mint the configured token into the collection
    pub async fn create_token(&self) -> Result<TxHash, DispatchError> {
        mint::create_token(
            &self.dispatcher,
            self.identity(Role::Borrower),
            &self.config.collection.name,
            &self.config.token,
        )
        .await
    }

    /// base-currency balance of a participant
    pub async fn balance(&self, role: Role) -> Result<u64, LedgerError> {
        let address = self.identity(role).address();
        let balance = self
            .dispatcher
            .ledger()
            .query_balance(address, &self.config.network.coin_type)
            .await?;
        tracing::info!("{} {} has {} {}", role, address, balance, self.config.network.coin_type);
        Ok(balance)
    }
}
