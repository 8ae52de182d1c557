//! Core types and data structures for the banking system

use bigdecimal::BigDecimal;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a user (customer or employee) resolved by the request layer
pub type UserId = Uuid;

/// Number of fractional digits carried by every monetary amount
pub const MONEY_SCALE: i64 = 2;

/// Kinds of accounts a customer can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Interest-bearing savings account
    Savings,
    /// Everyday current account
    Current,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Savings => write!(f, "SAVINGS"),
            AccountType::Current => write!(f, "CURRENT"),
        }
    }
}

impl FromStr for AccountType {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAVINGS" => Ok(AccountType::Savings),
            "CURRENT" => Ok(AccountType::Current),
            other => Err(BankError::Validation(format!(
                "Unknown account type '{}'",
                other
            ))),
        }
    }
}

/// The side of a ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegType {
    /// Money leaving the account
    Debit,
    /// Money entering the account
    Credit,
}

impl fmt::Display for LegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegType::Debit => write!(f, "DEBIT"),
            LegType::Credit => write!(f, "CREDIT"),
        }
    }
}

impl FromStr for LegType {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBIT" => Ok(LegType::Debit),
            "CREDIT" => Ok(LegType::Credit),
            other => Err(BankError::Validation(format!("Unknown leg type '{}'", other))),
        }
    }
}

/// Lifecycle of an account opening request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "PENDING"),
            ApplicationStatus::Approved => write!(f, "APPROVED"),
            ApplicationStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// An employee's verdict on a pending application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// The terminal status this decision moves an application into
    pub fn status(self) -> ApplicationStatus {
        match self {
            Decision::Approved => ApplicationStatus::Approved,
            Decision::Rejected => ApplicationStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Ok(Decision::Approved),
            "REJECTED" => Ok(Decision::Rejected),
            other => Err(BankError::Validation(format!(
                "Decision must be APPROVED or REJECTED, got '{}'",
                other
            ))),
        }
    }
}

/// A customer account
///
/// Accounts never point back at their owner; the owner is referenced by id
/// only and resolved by the request layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Internal identifier
    pub id: Uuid,
    /// Public 10-digit account number, unique and never reassigned
    pub account_number: String,
    /// Owning user
    pub owner_id: UserId,
    /// Savings or current
    pub account_type: AccountType,
    /// Current balance, never negative
    pub balance: BigDecimal,
    /// Balance the account was opened with
    pub opening_balance: BigDecimal,
    /// Inactive accounts reject every balance mutation
    pub active: bool,
    /// When the account was opened
    pub created_at: NaiveDateTime,
    /// When the account was last changed
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new active account holding `initial_deposit`
    pub fn new(
        account_number: String,
        owner_id: UserId,
        account_type: AccountType,
        initial_deposit: BigDecimal,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            account_number,
            owner_id,
            account_type,
            balance: initial_deposit.clone(),
            opening_balance: initial_deposit,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Compute the account as it would be after applying `delta`
    ///
    /// This is the only place a balance is recomputed. Fails without touching
    /// `self` if the account is inactive, the result would be negative or
    /// would not fit in whole cents.
    pub fn with_delta(&self, delta: &BigDecimal) -> BankResult<Account> {
        if !self.active {
            return Err(BankError::Validation(format!(
                "Account {} is inactive",
                self.account_number
            )));
        }

        let balance = &self.balance + delta;
        if balance.with_scale(MONEY_SCALE) != balance {
            return Err(BankError::Validation(format!(
                "Delta {} on account {} has more than {} decimal places",
                delta, self.account_number, MONEY_SCALE
            )));
        }
        if balance < BigDecimal::from(0) {
            return Err(BankError::InsufficientFunds {
                account_number: self.account_number.clone(),
                balance: self.balance.clone(),
                requested: -delta.clone(),
            });
        }

        let mut updated = self.clone();
        updated.balance = balance.with_scale(MONEY_SCALE);
        updated.updated_at = Utc::now().naive_utc();
        Ok(updated)
    }

    /// Boundary view handed to the request layer
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            account_number: self.account_number.clone(),
            owner_id: self.owner_id,
            account_type: self.account_type,
            balance: self.balance.clone(),
            active: self.active,
        }
    }
}

/// Account as surfaced at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub account_number: String,
    pub owner_id: UserId,
    pub account_type: AccountType,
    pub balance: BigDecimal,
    pub active: bool,
}

/// One immutable ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique identifier of the record
    pub id: Uuid,
    /// Account the record belongs to
    pub account_id: Uuid,
    /// Number of the account the record belongs to
    pub account_number: String,
    /// Debit or credit
    pub leg_type: LegType,
    /// Strictly positive amount
    pub amount: BigDecimal,
    /// Other side of a transfer, absent for deposits and withdrawals
    pub counterparty_account_number: Option<String>,
    /// When the record was written
    pub timestamp: NaiveDateTime,
}

impl TransactionRecord {
    fn new(
        account: &Account,
        leg_type: LegType,
        amount: BigDecimal,
        counterparty_account_number: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: account.id,
            account_number: account.account_number.clone(),
            leg_type,
            amount,
            counterparty_account_number,
            timestamp: Utc::now().naive_utc(),
        }
    }

    /// Create a debit record against `account`
    pub fn debit(account: &Account, amount: BigDecimal, counterparty: Option<String>) -> Self {
        Self::new(account, LegType::Debit, amount, counterparty)
    }

    /// Create a credit record against `account`
    pub fn credit(account: &Account, amount: BigDecimal, counterparty: Option<String>) -> Self {
        Self::new(account, LegType::Credit, amount, counterparty)
    }

    /// Account the money came from, if known
    pub fn from_account(&self) -> Option<&str> {
        match self.leg_type {
            LegType::Debit => Some(&self.account_number),
            LegType::Credit => self.counterparty_account_number.as_deref(),
        }
    }

    /// Account the money went to, if known
    pub fn to_account(&self) -> Option<&str> {
        match self.leg_type {
            LegType::Debit => self.counterparty_account_number.as_deref(),
            LegType::Credit => Some(&self.account_number),
        }
    }

    /// Boundary view handed to the request layer
    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            id: self.id,
            account_id: self.account_id,
            leg_type: self.leg_type,
            amount: self.amount.clone(),
            from_account: self.from_account().map(str::to_string),
            to_account: self.to_account().map(str::to_string),
            timestamp: self.timestamp,
        }
    }
}

/// Transaction record as surfaced at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub account_id: Uuid,
    pub leg_type: LegType,
    pub amount: BigDecimal,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub timestamp: NaiveDateTime,
}

/// Both legs written by a single transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub debit: TransactionRecord,
    pub credit: TransactionRecord,
}

/// A request to open a new account, awaiting an employee decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountApplication {
    pub id: Uuid,
    pub applicant_id: UserId,
    pub account_type: AccountType,
    pub initial_deposit: BigDecimal,
    pub purpose: String,
    pub status: ApplicationStatus,
    pub decision_notes: Option<String>,
    pub approver_id: Option<UserId>,
    pub created_at: NaiveDateTime,
    pub decided_at: Option<NaiveDateTime>,
    /// Account opened by the approval, if any
    pub opened_account_number: Option<String>,
}

impl AccountApplication {
    /// Create a new pending application
    pub fn new(
        applicant_id: UserId,
        account_type: AccountType,
        initial_deposit: BigDecimal,
        purpose: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            applicant_id,
            account_type,
            initial_deposit,
            purpose,
            status: ApplicationStatus::Pending,
            decision_notes: None,
            approver_id: None,
            created_at: Utc::now().naive_utc(),
            decided_at: None,
            opened_account_number: None,
        }
    }

    /// Whether the application still awaits a decision
    pub fn is_pending(&self) -> bool {
        self.status == ApplicationStatus::Pending
    }

    /// The application as it would be after `decision`
    ///
    /// Decisions are final: anything but a pending application is rejected
    /// with `InvalidState`.
    pub fn decided(
        &self,
        approver_id: UserId,
        decision: Decision,
        notes: Option<String>,
    ) -> BankResult<AccountApplication> {
        if !self.is_pending() {
            return Err(BankError::InvalidState(format!(
                "Application {} has already been {}",
                self.id, self.status
            )));
        }

        let mut decided = self.clone();
        decided.status = decision.status();
        decided.approver_id = Some(approver_id);
        decided.decision_notes = notes;
        decided.decided_at = Some(Utc::now().naive_utc());
        Ok(decided)
    }

    /// Boundary view handed to the request layer
    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id,
            applicant_id: self.applicant_id,
            account_type: self.account_type,
            initial_deposit: self.initial_deposit.clone(),
            purpose: self.purpose.clone(),
            status: self.status,
            notes: self.decision_notes.clone(),
            approver_id: self.approver_id,
            created_at: self.created_at,
            decided_at: self.decided_at,
        }
    }
}

/// Account application as surfaced at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub applicant_id: UserId,
    pub account_type: AccountType,
    pub initial_deposit: BigDecimal,
    pub purpose: String,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub approver_id: Option<UserId>,
    pub created_at: NaiveDateTime,
    pub decided_at: Option<NaiveDateTime>,
}

/// Errors that can occur in the banking core
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Application not found: {0}")]
    ApplicationNotFound(Uuid),
    #[error("Insufficient funds in account {account_number}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_number: String,
        balance: BigDecimal,
        requested: BigDecimal,
    },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Concurrency conflict: {0}")]
    Concurrency(String),
    #[error("Account number already in use: {0}")]
    DuplicateAccountNumber(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BankError {
    /// Whether the caller may safely retry the failed call
    pub fn is_retryable(&self) -> bool {
        matches!(self, BankError::Concurrency(_))
    }

    /// Whether the error reports a missing account or application
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BankError::AccountNotFound(_) | BankError::ApplicationNotFound(_)
        )
    }
}

/// Result type for banking operations
pub type BankResult<T> = Result<T, BankError>;
