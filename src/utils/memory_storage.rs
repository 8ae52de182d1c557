//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
///
/// Multi-collection writes take the collection locks in a fixed order
/// (accounts, records, applications).
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    records: Arc<RwLock<Vec<TransactionRecord>>>,
    applications: Arc<RwLock<HashMap<Uuid, AccountApplication>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            records: Arc::new(RwLock::new(Vec::new())),
            applications: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> BankError {
    BankError::Storage("memory storage lock poisoned".to_string())
}

#[async_trait]
impl BankStorage for MemoryStorage {
    async fn insert_account(&self, account: &Account) -> BankResult<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        if accounts.contains_key(&account.account_number) {
            return Err(BankError::DuplicateAccountNumber(
                account.account_number.clone(),
            ));
        }
        accounts.insert(account.account_number.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, account_number: &str) -> BankResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .map_err(poisoned)?
            .get(account_number)
            .cloned())
    }

    async fn get_account_by_id(&self, account_id: Uuid) -> BankResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .map_err(poisoned)?
            .values()
            .find(|account| account.id == account_id)
            .cloned())
    }

    async fn list_accounts(&self, owner_id: Option<UserId>) -> BankResult<Vec<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        let mut filtered: Vec<Account> = accounts
            .values()
            .filter(|account| owner_id.is_none_or(|owner| account.owner_id == owner))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(filtered)
    }

    async fn update_account(&self, account: &Account) -> BankResult<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        match accounts.get_mut(&account.account_number) {
            Some(stored) if stored.id == account.id => {
                *stored = account.clone();
                Ok(())
            }
            _ => Err(BankError::AccountNotFound(account.account_number.clone())),
        }
    }

    async fn commit_ledger(&self, commit: &LedgerCommit) -> BankResult<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let mut records = self.records.write().map_err(poisoned)?;

        for account in &commit.accounts {
            if !accounts.contains_key(&account.account_number) {
                return Err(BankError::AccountNotFound(account.account_number.clone()));
            }
            if account.balance < BigDecimal::from(0) {
                return Err(BankError::Storage(format!(
                    "refusing negative balance for account {}",
                    account.account_number
                )));
            }
        }
        for record in &commit.records {
            if !accounts.contains_key(&record.account_number) {
                return Err(BankError::AccountNotFound(record.account_number.clone()));
            }
        }

        for account in &commit.accounts {
            accounts.insert(account.account_number.clone(), account.clone());
        }
        records.extend(commit.records.iter().cloned());
        Ok(())
    }

    async fn list_records(&self, account_id: Option<Uuid>) -> BankResult<Vec<TransactionRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .iter()
            .filter(|record| account_id.is_none_or(|id| record.account_id == id))
            .cloned()
            .collect())
    }

    async fn count_records(&self) -> BankResult<usize> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }

    async fn insert_application(&self, application: &AccountApplication) -> BankResult<()> {
        self.applications
            .write()
            .map_err(poisoned)?
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn get_application(
        &self,
        application_id: Uuid,
    ) -> BankResult<Option<AccountApplication>> {
        Ok(self
            .applications
            .read()
            .map_err(poisoned)?
            .get(&application_id)
            .cloned())
    }

    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        applicant_id: Option<UserId>,
    ) -> BankResult<Vec<AccountApplication>> {
        let applications = self.applications.read().map_err(poisoned)?;
        let mut filtered: Vec<AccountApplication> = applications
            .values()
            .filter(|application| {
                status.is_none_or(|s| application.status == s)
                    && applicant_id.is_none_or(|id| application.applicant_id == id)
            })
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(filtered)
    }

    async fn commit_decision(&self, commit: &DecisionCommit) -> BankResult<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let mut applications = self.applications.write().map_err(poisoned)?;

        let application = &commit.application;
        let stored = applications
            .get(&application.id)
            .ok_or(BankError::ApplicationNotFound(application.id))?;
        if !stored.is_pending() {
            return Err(BankError::InvalidState(format!(
                "Application {} has already been {}",
                application.id, stored.status
            )));
        }
        if let Some(account) = &commit.opened_account {
            if accounts.contains_key(&account.account_number) {
                return Err(BankError::DuplicateAccountNumber(
                    account.account_number.clone(),
                ));
            }
        }

        if let Some(account) = &commit.opened_account {
            accounts.insert(account.account_number.clone(), account.clone());
        }
        applications.insert(application.id, application.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(number: &str, balance: i64) -> Account {
        Account::new(
            number.to_string(),
            Uuid::new_v4(),
            AccountType::Savings,
            BigDecimal::from(balance),
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_number() {
        let storage = MemoryStorage::new();
        storage.insert_account(&account("1000000001", 0)).await.unwrap();

        let err = storage
            .insert_account(&account("1000000001", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::DuplicateAccountNumber(_)));
        assert_eq!(storage.list_accounts(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_ledger_is_all_or_nothing() {
        let storage = MemoryStorage::new();
        let existing = account("1000000001", 100);
        storage.insert_account(&existing).await.unwrap();

        let debited = existing.with_delta(&BigDecimal::from(-10)).unwrap();
        let ghost = account("1000000002", 10);
        let commit = LedgerCommit {
            accounts: vec![debited.clone(), ghost.clone()],
            records: vec![
                TransactionRecord::debit(&debited, BigDecimal::from(10), None),
                TransactionRecord::credit(&ghost, BigDecimal::from(10), None),
            ],
        };

        assert!(matches!(
            storage.commit_ledger(&commit).await,
            Err(BankError::AccountNotFound(_))
        ));
        let stored = storage.get_account("1000000001").await.unwrap().unwrap();
        assert_eq!(stored.balance, BigDecimal::from(100));
        assert_eq!(storage.count_records().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_records_by_account() {
        let storage = MemoryStorage::new();
        let first = account("1000000001", 0);
        let second = account("1000000002", 0);
        storage.insert_account(&first).await.unwrap();
        storage.insert_account(&second).await.unwrap();

        let commit = LedgerCommit {
            accounts: vec![],
            records: vec![
                TransactionRecord::credit(&first, BigDecimal::from(1), None),
                TransactionRecord::credit(&second, BigDecimal::from(2), None),
                TransactionRecord::credit(&first, BigDecimal::from(3), None),
            ],
        };
        storage.commit_ledger(&commit).await.unwrap();

        let records = storage.list_records(Some(first.id)).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].amount, BigDecimal::from(3));
        assert_eq!(storage.list_records(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_commit_decision_requires_pending() {
        let storage = MemoryStorage::new();
        let application = AccountApplication::new(
            Uuid::new_v4(),
            AccountType::Savings,
            BigDecimal::from(0),
            "Savings".to_string(),
        );
        storage.insert_application(&application).await.unwrap();

        let rejected = application
            .decided(Uuid::new_v4(), Decision::Rejected, None)
            .unwrap();
        let commit = DecisionCommit {
            application: rejected,
            opened_account: None,
        };
        storage.commit_decision(&commit).await.unwrap();

        assert!(matches!(
            storage.commit_decision(&commit).await,
            Err(BankError::InvalidState(_))
        ));
    }
}
