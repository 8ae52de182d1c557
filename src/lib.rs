//! # Banking Core
//!
//! The ledger and transfer engine of a retail bank: atomic balance mutation,
//! double-entry transaction recording, and the approval workflow that turns
//! account applications into accounts.
//!
//! ## Features
//!
//! - **Atomic ledger**: every balance change commits together with the ledger records that explain it
//! - **Deadlock-free transfers**: per-account locks taken in ascending account number order
//! - **Bounded waits**: lock contention surfaces as a retryable error instead of blocking forever
//! - **Account applications**: a once-only PENDING → APPROVED/REJECTED state machine that opens the account on approval
//! - **Reconciliation**: balances checked against opening balance plus ledger credits and debits
//! - **Storage abstraction**: backend-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use banking_core::{utils::{MemoryStorage, NoopNotifier}, AccountType, Bank};
//! use bigdecimal::BigDecimal;
//! use uuid::Uuid;
//!
//! # tokio_test_block(async {
//! let bank = Bank::new(MemoryStorage::new(), NoopNotifier);
//! let owner = Uuid::new_v4();
//! let account = bank
//!     .open_account(owner, AccountType::Savings, &BigDecimal::from(100))
//!     .await
//!     .unwrap();
//! bank.withdraw(&account.account_number, &BigDecimal::from(30)).await.unwrap();
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f);
//! # }
//! ```

pub mod applications;
pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use applications::*;
pub use config::*;
pub use ledger::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
