//! Account application workflow
//!
//! An application starts PENDING and is decided exactly once. Approval opens
//! the requested account in the same storage commit that records the
//! decision, so an approved application and its account always appear
//! together.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::AccountStore;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::*;

/// Result of deciding an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// The application in its terminal state
    pub application: AccountApplication,
    /// The account opened by an approval
    pub account: Option<Account>,
}

/// State machine turning account applications into accounts
pub struct ApplicationWorkflow<S: BankStorage> {
    accounts: AccountStore<S>,
}

impl<S: BankStorage + Clone> Clone for ApplicationWorkflow<S> {
    fn clone(&self) -> Self {
        Self {
            accounts: self.accounts.clone(),
        }
    }
}

fn lock_key(application_id: Uuid) -> String {
    format!("application:{}", application_id)
}

impl<S: BankStorage> ApplicationWorkflow<S> {
    /// Create a workflow that opens accounts through `accounts`
    pub fn new(accounts: AccountStore<S>) -> Self {
        Self { accounts }
    }

    /// Submit a new application in PENDING state
    pub async fn submit(
        &self,
        applicant_id: UserId,
        account_type: AccountType,
        initial_deposit: &BigDecimal,
        purpose: &str,
    ) -> BankResult<AccountApplication> {
        let initial_deposit = validate_initial_deposit(initial_deposit)?;
        validate_purpose(purpose)?;

        let application = AccountApplication::new(
            applicant_id,
            account_type,
            initial_deposit,
            purpose.to_string(),
        );
        self.accounts
            .storage()
            .insert_application(&application)
            .await?;

        tracing::info!(
            application_id = %application.id,
            applicant_id = %applicant_id,
            account_type = %account_type,
            "application submitted"
        );
        Ok(application)
    }

    /// Approve or reject a pending application
    ///
    /// Fails with `InvalidState` if the application was already decided; the
    /// earlier decision stays untouched.
    pub async fn decide(
        &self,
        application_id: Uuid,
        approver_id: UserId,
        decision: Decision,
        notes: Option<&str>,
    ) -> BankResult<DecisionOutcome> {
        validate_notes(notes)?;
        // Unknown ids never reach the lock table; the status is re-read under the lock.
        self.get(application_id).await?;
        let _guard = self.accounts.locks().acquire(&lock_key(application_id)).await?;

        let application = self.get(application_id).await?;
        let mut decided = application.decided(approver_id, decision, notes.map(str::to_string))?;

        let account = match decision {
            Decision::Rejected => {
                self.commit(&decided, None).await?;
                None
            }
            Decision::Approved => Some(self.approve(&mut decided).await?),
        };

        tracing::info!(
            application_id = %application_id,
            approver_id = %approver_id,
            status = %decided.status,
            account_number = decided.opened_account_number.as_deref().unwrap_or("-"),
            "application decided"
        );
        Ok(DecisionOutcome {
            application: decided,
            account,
        })
    }

    async fn approve(&self, decided: &mut AccountApplication) -> BankResult<Account> {
        let attempts = self.accounts.config().max_account_number_attempts;
        for _ in 0..attempts {
            let Some(account) = self
                .accounts
                .draft_account(
                    decided.applicant_id,
                    decided.account_type,
                    &decided.initial_deposit,
                )
                .await?
            else {
                continue;
            };
            decided.opened_account_number = Some(account.account_number.clone());

            match self.commit(decided, Some(account.clone())).await {
                Ok(()) => return Ok(account),
                Err(BankError::DuplicateAccountNumber(number)) => {
                    tracing::debug!(account_number = %number, "account number taken on approval");
                }
                Err(err) => return Err(err),
            }
        }

        Err(self.accounts.exhausted())
    }

    async fn commit(
        &self,
        application: &AccountApplication,
        opened_account: Option<Account>,
    ) -> BankResult<()> {
        let commit = DecisionCommit {
            application: application.clone(),
            opened_account,
        };
        self.accounts.storage().commit_decision(&commit).await
    }

    /// Get an application by id
    pub async fn get(&self, application_id: Uuid) -> BankResult<AccountApplication> {
        self.accounts
            .storage()
            .get_application(application_id)
            .await?
            .ok_or(BankError::ApplicationNotFound(application_id))
    }

    /// Every application, oldest first
    pub async fn all(&self) -> BankResult<Vec<AccountApplication>> {
        self.accounts.storage().list_applications(None, None).await
    }

    /// Applications awaiting a decision, oldest first
    pub async fn pending(&self) -> BankResult<Vec<AccountApplication>> {
        self.accounts
            .storage()
            .list_applications(Some(ApplicationStatus::Pending), None)
            .await
    }

    /// Applications submitted by one user, oldest first
    pub async fn for_applicant(&self, applicant_id: UserId) -> BankResult<Vec<AccountApplication>> {
        self.accounts
            .storage()
            .list_applications(None, Some(applicant_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::utils::memory_storage::MemoryStorage;

    fn workflow() -> (AccountStore<MemoryStorage>, ApplicationWorkflow<MemoryStorage>) {
        let store = AccountStore::new(MemoryStorage::new(), EngineConfig::default());
        let workflow = ApplicationWorkflow::new(store.clone());
        (store, workflow)
    }

    #[tokio::test]
    async fn test_submit_starts_pending() {
        let (_, workflow) = workflow();
        let applicant = Uuid::new_v4();
        let application = workflow
            .submit(applicant, AccountType::Savings, &BigDecimal::from(500), "Savings")
            .await
            .unwrap();

        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(application.approver_id, None);
        assert_eq!(workflow.pending().await.unwrap().len(), 1);
        assert_eq!(workflow.for_applicant(applicant).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_negative_deposit() {
        let (_, workflow) = workflow();
        assert!(matches!(
            workflow
                .submit(Uuid::new_v4(), AccountType::Savings, &BigDecimal::from(-1), "x")
                .await,
            Err(BankError::Validation(_))
        ));
        assert!(workflow.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approval_opens_account() {
        let (store, workflow) = workflow();
        let applicant = Uuid::new_v4();
        let approver = Uuid::new_v4();
        let application = workflow
            .submit(applicant, AccountType::Savings, &BigDecimal::from(500), "Savings")
            .await
            .unwrap();

        let outcome = workflow
            .decide(application.id, approver, Decision::Approved, Some("Verified"))
            .await
            .unwrap();

        let account = outcome.account.unwrap();
        assert_eq!(outcome.application.status, ApplicationStatus::Approved);
        assert_eq!(outcome.application.approver_id, Some(approver));
        assert_eq!(
            outcome.application.opened_account_number.as_deref(),
            Some(account.account_number.as_str())
        );
        assert_eq!(account.owner_id, applicant);
        assert_eq!(account.account_type, AccountType::Savings);
        assert_eq!(account.balance, BigDecimal::from(500));
        assert_eq!(store.accounts_for_owner(applicant).await.unwrap(), vec![account]);
        assert!(workflow.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_opens_nothing() {
        let (store, workflow) = workflow();
        let applicant = Uuid::new_v4();
        let application = workflow
            .submit(applicant, AccountType::Current, &BigDecimal::from(10), "Business")
            .await
            .unwrap();

        let outcome = workflow
            .decide(application.id, Uuid::new_v4(), Decision::Rejected, None)
            .await
            .unwrap();

        assert_eq!(outcome.application.status, ApplicationStatus::Rejected);
        assert!(outcome.account.is_none());
        assert!(store.accounts_for_owner(applicant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_decision_fails_and_keeps_first() {
        let (store, workflow) = workflow();
        let applicant = Uuid::new_v4();
        let first_approver = Uuid::new_v4();
        let application = workflow
            .submit(applicant, AccountType::Savings, &BigDecimal::from(1), "Savings")
            .await
            .unwrap();

        workflow
            .decide(application.id, first_approver, Decision::Approved, Some("ok"))
            .await
            .unwrap();
        let err = workflow
            .decide(application.id, Uuid::new_v4(), Decision::Rejected, Some("changed my mind"))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidState(_)));

        let stored = workflow.get(application.id).await.unwrap();
        assert_eq!(stored.status, ApplicationStatus::Approved);
        assert_eq!(stored.approver_id, Some(first_approver));
        assert_eq!(stored.decision_notes.as_deref(), Some("ok"));
        assert_eq!(store.accounts_for_owner(applicant).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decide_unknown_application() {
        let (_, workflow) = workflow();
        let err = workflow
            .decide(Uuid::new_v4(), Uuid::new_v4(), Decision::Approved, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_decisions_leave_no_locks_behind() {
        let (store, workflow) = workflow();
        for _ in 0..1000 {
            assert!(workflow
                .decide(Uuid::new_v4(), Uuid::new_v4(), Decision::Rejected, None)
                .await
                .is_err());
        }
        assert!(store.locks().is_empty());

        let application = workflow
            .submit(Uuid::new_v4(), AccountType::Current, &BigDecimal::from(5), "Payroll")
            .await
            .unwrap();
        workflow
            .decide(application.id, Uuid::new_v4(), Decision::Approved, None)
            .await
            .unwrap();
        assert!(store.locks().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_decisions_open_one_account() {
        let (store, workflow) = workflow();
        let applicant = Uuid::new_v4();
        let application = workflow
            .submit(applicant, AccountType::Savings, &BigDecimal::from(100), "Savings")
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            workflow.decide(application.id, Uuid::new_v4(), Decision::Approved, None),
            workflow.decide(application.id, Uuid::new_v4(), Decision::Approved, None),
        );

        assert!(first.is_ok() != second.is_ok());
        assert_eq!(store.accounts_for_owner(applicant).await.unwrap().len(), 1);
    }
}
