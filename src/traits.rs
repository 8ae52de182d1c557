//! Traits for storage abstraction and external collaborators

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::*;

/// Balance changes and the ledger records that explain them
///
/// A storage backend must apply a commit as one unit: either every account
/// update and every record lands, or none of them do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerCommit {
    /// Updated accounts, replacing the stored versions
    pub accounts: Vec<Account>,
    /// Records appended to the ledger
    pub records: Vec<TransactionRecord>,
}

/// A decided application and the account it opened, committed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionCommit {
    /// The application in its terminal state
    pub application: AccountApplication,
    /// Account created by an approval; `None` for rejections
    pub opened_account: Option<Account>,
}

/// Storage abstraction for the banking core
///
/// This trait allows the core to work with any storage backend by
/// implementing these methods. Implementations are shared between the
/// account store, ledger engine and workflow, so every method takes `&self`.
#[async_trait]
pub trait BankStorage: Send + Sync {
    /// Insert a new account, failing with `DuplicateAccountNumber` if the
    /// number is already taken
    async fn insert_account(&self, account: &Account) -> BankResult<()>;

    /// Get an account by account number
    async fn get_account(&self, account_number: &str) -> BankResult<Option<Account>>;

    /// Get an account by internal id
    async fn get_account_by_id(&self, account_id: Uuid) -> BankResult<Option<Account>>;

    /// List accounts, optionally only those of one owner
    async fn list_accounts(&self, owner_id: Option<UserId>) -> BankResult<Vec<Account>>;

    /// Replace an existing account's non-balance attributes
    async fn update_account(&self, account: &Account) -> BankResult<()>;

    /// Apply balance changes and append their records atomically
    async fn commit_ledger(&self, commit: &LedgerCommit) -> BankResult<()>;

    /// Ledger records in append order, optionally only those of one account
    async fn list_records(&self, account_id: Option<Uuid>) -> BankResult<Vec<TransactionRecord>>;

    /// Number of records in the ledger
    async fn count_records(&self) -> BankResult<usize>;

    /// Save a newly submitted application
    async fn insert_application(&self, application: &AccountApplication) -> BankResult<()>;

    /// Get an application by id
    async fn get_application(&self, application_id: Uuid)
        -> BankResult<Option<AccountApplication>>;

    /// List applications, optionally filtered by status and applicant
    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        applicant_id: Option<UserId>,
    ) -> BankResult<Vec<AccountApplication>>;

    /// Store a decision and, for approvals, the opened account atomically
    ///
    /// Fails with `InvalidState` if the stored application is no longer
    /// pending and with `DuplicateAccountNumber` if the opened account's
    /// number is taken; nothing is written in either case.
    async fn commit_decision(&self, commit: &DecisionCommit) -> BankResult<()>;
}

/// Errors reported by a notification channel
#[derive(Debug, thiserror::Error)]
#[error("Notification to {user_id} failed: {reason}")]
pub struct NotifyError {
    pub user_id: UserId,
    pub reason: String,
}

/// Delivery channel for user-facing messages
///
/// Called only after a core operation has committed and with no lock held.
/// Delivery is best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: UserId, message: &str) -> Result<(), NotifyError>;
}
