//! sekie-client: drive the sekie nft-collateralized lending module
//!
//! a lender deposits coins into a per-collection pool, a borrower locks one
//! token of that collection to draw a loan and later repays it. three
//! identities sign the calls: administrator, lender and borrower.
//!
//! ## phases
//!
//! | phase | signer | entry function |
//! |---|---|---|
//! | init_pool | admin | `init_collection_pool` |
//! | lender_offer | lender | `lender_offer` |
//! | lender_revoke | lender | `lender_revoke` |
//! | borrower_select | borrower | `borrow_select` |
//! | borrower_pay_loan | borrower | `borrower_pay_loan` |
//!
//! ## usage
//!
//! ```rust,ignore
//! let config = LendingConfig::load("sekie.toml")?;
//! let ledger = RestClient::from_config(&config.network);
//! let lending = LendingOrchestrator::new(config, ledger);
//!
//! let reports = lending
//!     .run_sequence(&[Phase::InitPool, Phase::LenderOffer, Phase::BorrowerSelect])
//!     .await;
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod mint;
pub mod orchestrator;
pub mod payload;
pub mod rest;

pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use identity::*;
pub use ledger::*;
pub use orchestrator::*;
pub use payload::*;
pub use rest::*;
