//! Main bank orchestrator that coordinates accounts, the ledger and applications

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applications::{ApplicationWorkflow, DecisionOutcome};
use crate::config::EngineConfig;
use crate::ledger::{AccountStore, AuditLog, LedgerEngine, StatementFilter};
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::traits::*;
use crate::types::*;

/// Snapshot of the whole bank for the employee dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemOverview {
    pub total_accounts: usize,
    pub active_accounts: usize,
    pub total_transactions: usize,
    pub total_balance: BigDecimal,
    pub pending_applications: usize,
}

/// Main banking system that orchestrates all core operations
///
/// Users are told about committed operations through the notifier. Delivery
/// happens after the commit with no lock held, and a failed delivery never
/// fails the operation.
pub struct Bank<S: BankStorage, N: Notifier> {
    accounts: AccountStore<S>,
    ledger: LedgerEngine<S>,
    audit: AuditLog<S>,
    applications: ApplicationWorkflow<S>,
    reconciliation: ReconciliationEngine<S>,
    notifier: N,
}

impl<S: BankStorage + Clone, N: Notifier> Bank<S, N> {
    /// Create a new bank with the given storage backend and notifier
    pub fn new(storage: S, notifier: N) -> Self {
        Self::with_config(storage, notifier, EngineConfig::default())
    }

    /// Create a new bank with explicit engine settings
    pub fn with_config(storage: S, notifier: N, config: EngineConfig) -> Self {
        let accounts = AccountStore::new(storage.clone(), config);
        let audit = AuditLog::new(storage.clone());
        Self {
            ledger: LedgerEngine::new(accounts.clone(), audit.clone()),
            applications: ApplicationWorkflow::new(accounts.clone()),
            reconciliation: ReconciliationEngine::new(storage),
            accounts,
            audit,
            notifier,
        }
    }
}

impl<S: BankStorage, N: Notifier> Bank<S, N> {
    pub fn accounts(&self) -> &AccountStore<S> {
        &self.accounts
    }

    pub fn ledger(&self) -> &LedgerEngine<S> {
        &self.ledger
    }

    pub fn audit(&self) -> &AuditLog<S> {
        &self.audit
    }

    pub fn applications(&self) -> &ApplicationWorkflow<S> {
        &self.applications
    }

    async fn notify(&self, user_id: UserId, message: String) {
        if let Err(error) = self.notifier.notify(user_id, &message).await {
            tracing::warn!(user_id = %user_id, error = %error, "notification not delivered");
        }
    }

    // Account operations
    /// Open an account directly (employee action)
    pub async fn open_account(
        &self,
        owner_id: UserId,
        account_type: AccountType,
        initial_deposit: &BigDecimal,
    ) -> BankResult<Account> {
        let account = self
            .accounts
            .open_account(owner_id, account_type, initial_deposit)
            .await?;
        self.notify(owner_id, format!("Account created: {}", account.account_number))
            .await;
        Ok(account)
    }

    /// Get an account by number
    pub async fn get_account(&self, account_number: &str) -> BankResult<Account> {
        self.accounts.get(account_number).await
    }

    /// Accounts held by one user
    pub async fn accounts_for_owner(&self, owner_id: UserId) -> BankResult<Vec<Account>> {
        self.accounts.accounts_for_owner(owner_id).await
    }

    // Ledger operations
    /// Deposit into an account and notify its owner
    pub async fn deposit(
        &self,
        account_number: &str,
        amount: &BigDecimal,
    ) -> BankResult<TransactionRecord> {
        let record = self.ledger.deposit(account_number, amount).await?;
        if let Some(owner) = self.owner_of(account_number).await {
            self.notify(
                owner,
                format!("Amount {} deposited to account {}", record.amount, account_number),
            )
            .await;
        }
        Ok(record)
    }

    /// Withdraw from an account and notify its owner
    pub async fn withdraw(
        &self,
        account_number: &str,
        amount: &BigDecimal,
    ) -> BankResult<TransactionRecord> {
        let record = self.ledger.withdraw(account_number, amount).await?;
        if let Some(owner) = self.owner_of(account_number).await {
            self.notify(
                owner,
                format!("Amount {} withdrawn from account {}", record.amount, account_number),
            )
            .await;
        }
        Ok(record)
    }

    /// Transfer between accounts and notify sender and receiver
    pub async fn transfer(
        &self,
        from_account_number: &str,
        to_account_number: &str,
        amount: &BigDecimal,
    ) -> BankResult<TransferReceipt> {
        let receipt = self
            .ledger
            .transfer(from_account_number, to_account_number, amount)
            .await?;
        let amount = &receipt.debit.amount;

        if let Some(sender) = self.owner_of(from_account_number).await {
            self.notify(
                sender,
                format!(
                    "Amount {} transferred from {} to {}",
                    amount, from_account_number, to_account_number
                ),
            )
            .await;
        }
        if let Some(receiver) = self.owner_of(to_account_number).await {
            self.notify(
                receiver,
                format!(
                    "Amount {} received in account {} from {}",
                    amount, to_account_number, from_account_number
                ),
            )
            .await;
        }
        Ok(receipt)
    }

    /// Statement of one account, newest first
    pub async fn statement(
        &self,
        account_number: &str,
        filter: &StatementFilter,
    ) -> BankResult<Vec<TransactionRecord>> {
        self.ledger.statement(account_number, filter).await
    }

    /// Search the whole ledger or one account (employee action)
    pub async fn search_transactions(
        &self,
        account_number: Option<&str>,
        filter: &StatementFilter,
    ) -> BankResult<Vec<TransactionRecord>> {
        self.audit.search(account_number, filter).await
    }

    // Application operations
    /// Submit an account application
    pub async fn submit_application(
        &self,
        applicant_id: UserId,
        account_type: AccountType,
        initial_deposit: &BigDecimal,
        purpose: &str,
    ) -> BankResult<AccountApplication> {
        self.applications
            .submit(applicant_id, account_type, initial_deposit, purpose)
            .await
    }

    /// Decide an application and notify the applicant
    pub async fn decide_application(
        &self,
        application_id: Uuid,
        approver_id: UserId,
        decision: Decision,
        notes: Option<&str>,
    ) -> BankResult<DecisionOutcome> {
        let outcome = self
            .applications
            .decide(application_id, approver_id, decision, notes)
            .await?;

        let applicant = outcome.application.applicant_id;
        let message = match &outcome.account {
            Some(account) => format!("Account created: {}", account.account_number),
            None => format!(
                "Your {} account application was rejected",
                outcome.application.account_type
            ),
        };
        self.notify(applicant, message).await;
        Ok(outcome)
    }

    // Reporting
    /// Counts and totals across the bank
    pub async fn overview(&self) -> BankResult<SystemOverview> {
        let accounts = self.accounts.list_accounts().await?;
        let total_balance: BigDecimal = accounts.iter().map(|a| &a.balance).sum();

        Ok(SystemOverview {
            total_accounts: accounts.len(),
            active_accounts: accounts.iter().filter(|a| a.active).count(),
            total_transactions: self.audit.count().await?,
            total_balance,
            pending_applications: self.applications.pending().await?.len(),
        })
    }

    /// Check one account's balance against its ledger records
    pub async fn reconcile_account(&self, account_number: &str) -> BankResult<ReconciliationReport> {
        self.reconciliation.reconcile_account(account_number).await
    }

    /// Check every account's balance against its ledger records
    pub async fn reconcile_all(&self) -> BankResult<Vec<ReconciliationReport>> {
        self.reconciliation.reconcile_all().await
    }

    async fn owner_of(&self, account_number: &str) -> Option<UserId> {
        match self.accounts.get(account_number).await {
            Ok(account) => Some(account.owner_id),
            Err(error) => {
                tracing::warn!(account_number, error = %error, "cannot resolve account owner");
                None
            }
        }
    }
}
