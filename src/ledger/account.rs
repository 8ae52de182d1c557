//! Account management functionality

use bigdecimal::BigDecimal;
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::ledger::locks::{LockGuard, LockTable};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::*;

const ACCOUNT_NUMBER_MIN: u64 = 1_000_000_000;
const ACCOUNT_NUMBER_MAX: u64 = 9_999_999_999;

/// Draw a random 10-digit account number
pub fn generate_account_number() -> String {
    rand::rng()
        .random_range(ACCOUNT_NUMBER_MIN..=ACCOUNT_NUMBER_MAX)
        .to_string()
}

/// Owner of account records and the only writer of balances
///
/// Each account is guarded by its own lock, keyed by account number. Account
/// numbers are all ten digits, so ascending string order is ascending numeric
/// order.
pub struct AccountStore<S: BankStorage> {
    storage: S,
    locks: Arc<LockTable>,
    config: EngineConfig,
}

impl<S: BankStorage + Clone> Clone for AccountStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            locks: Arc::clone(&self.locks),
            config: self.config,
        }
    }
}

impl<S: BankStorage> AccountStore<S> {
    /// Create a new account store
    pub fn new(storage: S, config: EngineConfig) -> Self {
        Self {
            storage,
            locks: Arc::new(LockTable::new(config.lock_timeout)),
            config,
        }
    }

    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }

    /// Per-account locks shared by every clone of this store
    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build an account around one freshly drawn number
    ///
    /// Returns `None` when the number is already in use. The number is only
    /// reserved once the account is stored; callers must also retry on
    /// `DuplicateAccountNumber`.
    pub(crate) async fn draft_account(
        &self,
        owner_id: UserId,
        account_type: AccountType,
        initial_deposit: &BigDecimal,
    ) -> BankResult<Option<Account>> {
        let account_number = generate_account_number();
        if self.storage.get_account(&account_number).await?.is_some() {
            tracing::debug!(account_number = %account_number, "account number collision");
            return Ok(None);
        }

        Ok(Some(Account::new(
            account_number,
            owner_id,
            account_type,
            initial_deposit.clone(),
        )))
    }

    pub(crate) fn exhausted(&self) -> BankError {
        BankError::Concurrency(format!(
            "no free account number after {} attempts",
            self.config.max_account_number_attempts
        ))
    }

    /// Open a new account holding `initial_deposit`
    ///
    /// At most `max_account_number_attempts` numbers are drawn.
    pub async fn open_account(
        &self,
        owner_id: UserId,
        account_type: AccountType,
        initial_deposit: &BigDecimal,
    ) -> BankResult<Account> {
        let initial_deposit = validate_initial_deposit(initial_deposit)?;

        for _ in 0..self.config.max_account_number_attempts {
            let Some(account) = self
                .draft_account(owner_id, account_type, &initial_deposit)
                .await?
            else {
                continue;
            };

            match self.storage.insert_account(&account).await {
                Ok(()) => {
                    tracing::info!(
                        account_number = %account.account_number,
                        owner_id = %owner_id,
                        account_type = %account_type,
                        balance = %account.balance,
                        "account opened"
                    );
                    return Ok(account);
                }
                Err(BankError::DuplicateAccountNumber(number)) => {
                    tracing::debug!(account_number = %number, "account number taken on insert");
                }
                Err(err) => return Err(err),
            }
        }

        Err(self.exhausted())
    }

    /// Get an account by number, reading under its lock
    pub async fn get(&self, account_number: &str) -> BankResult<Account> {
        let guard = self.lock(account_number).await?;
        self.load(&guard).await
    }

    /// Get an account by internal id
    pub async fn get_by_id(&self, account_id: Uuid) -> BankResult<Account> {
        self.storage
            .get_account_by_id(account_id)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(account_id.to_string()))
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> BankResult<Vec<Account>> {
        self.storage.list_accounts(None).await
    }

    /// List the accounts of one owner
    pub async fn accounts_for_owner(&self, owner_id: UserId) -> BankResult<Vec<Account>> {
        self.storage.list_accounts(Some(owner_id)).await
    }

    /// Activate or deactivate an account
    pub async fn set_active(&self, account_number: &str, active: bool) -> BankResult<Account> {
        let guard = self.lock(account_number).await?;
        let mut account = self.load(&guard).await?;
        account.active = active;
        account.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_account(&account).await?;

        tracing::info!(account_number, active, "account activity changed");
        Ok(account)
    }

    /// Atomically add `delta` to an account's balance
    ///
    /// Fails with `Validation` if `delta` is finer than a cent and with
    /// `InsufficientFunds` if the result would be negative; the stored
    /// balance is then unchanged.
    ///
    /// No ledger record is written. Callers that move money must append the
    /// paired record themselves or reconciliation will report drift; the
    /// ledger engine goes through `commit_deltas` instead.
    pub async fn apply_delta(&self, account_number: &str, delta: &BigDecimal) -> BankResult<Account> {
        let delta = validate_money(delta)?;
        let guard = self.lock(account_number).await?;
        let (mut accounts, _) = self
            .commit_deltas(&[(&guard, delta)], |_| Vec::new())
            .await?;
        Ok(accounts.remove(0))
    }

    /// Lock an existing account
    pub(crate) async fn lock(&self, account_number: &str) -> BankResult<LockGuard> {
        self.ensure_exists(account_number).await?;
        self.locks.acquire(account_number).await
    }

    /// Lock two existing accounts in ascending account number order
    ///
    /// Guards come back in argument order.
    pub(crate) async fn lock_pair(
        &self,
        first: &str,
        second: &str,
    ) -> BankResult<(LockGuard, LockGuard)> {
        self.ensure_exists(first).await?;
        self.ensure_exists(second).await?;
        self.locks.acquire_pair(first, second).await
    }

    async fn ensure_exists(&self, account_number: &str) -> BankResult<()> {
        match self.storage.get_account(account_number).await? {
            Some(_) => Ok(()),
            None => Err(BankError::AccountNotFound(account_number.to_string())),
        }
    }

    async fn load(&self, guard: &LockGuard) -> BankResult<Account> {
        self.storage
            .get_account(guard.key())
            .await?
            .ok_or_else(|| BankError::AccountNotFound(guard.key().to_string()))
    }

    /// Apply balance deltas to locked accounts and append the records built
    /// from the updated accounts, as one storage commit
    ///
    /// Every delta is checked before anything is written; on any failure no
    /// balance and no record changes.
    pub(crate) async fn commit_deltas<F>(
        &self,
        deltas: &[(&LockGuard, BigDecimal)],
        build_records: F,
    ) -> BankResult<(Vec<Account>, Vec<TransactionRecord>)>
    where
        F: FnOnce(&[Account]) -> Vec<TransactionRecord>,
    {
        let mut updated = Vec::with_capacity(deltas.len());
        for (guard, delta) in deltas {
            let account = self.load(guard).await?;
            updated.push(account.with_delta(delta)?);
        }

        let records = build_records(&updated);
        let commit = LedgerCommit {
            accounts: updated,
            records,
        };
        self.storage.commit_ledger(&commit).await?;

        Ok((commit.accounts, commit.records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use std::str::FromStr;

    fn store() -> AccountStore<MemoryStorage> {
        AccountStore::new(MemoryStorage::new(), EngineConfig::default())
    }

    #[test]
    fn test_generated_numbers_are_ten_digits() {
        for _ in 0..1000 {
            let number = generate_account_number();
            assert!(validate_account_number(&number).is_ok(), "{number}");
        }
    }

    #[tokio::test]
    async fn test_open_account() {
        let store = store();
        let owner = Uuid::new_v4();
        let account = store
            .open_account(owner, AccountType::Savings, &BigDecimal::from(500))
            .await
            .unwrap();

        assert_eq!(account.owner_id, owner);
        assert_eq!(account.balance, BigDecimal::from(500));
        assert!(account.active);
        assert_eq!(store.get(&account.account_number).await.unwrap(), account);
        assert_eq!(store.get_by_id(account.id).await.unwrap(), account);
    }

    #[tokio::test]
    async fn test_open_account_rejects_negative_deposit() {
        let store = store();
        let err = store
            .open_account(Uuid::new_v4(), AccountType::Current, &BigDecimal::from(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
        assert!(store.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_account_numbers_are_unique() {
        let store = store();
        let owner = Uuid::new_v4();
        let mut numbers = std::collections::HashSet::new();
        for _ in 0..200 {
            let account = store
                .open_account(owner, AccountType::Current, &BigDecimal::from(0))
                .await
                .unwrap();
            assert!(numbers.insert(account.account_number));
        }
        assert_eq!(store.accounts_for_owner(owner).await.unwrap().len(), 200);
    }

    #[tokio::test]
    async fn test_zero_attempts_is_concurrency_error() {
        let store = AccountStore::new(
            MemoryStorage::new(),
            EngineConfig::default().with_max_account_number_attempts(0),
        );
        let err = store
            .open_account(Uuid::new_v4(), AccountType::Savings, &BigDecimal::from(0))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_get_unknown_account() {
        let err = store().get("1234567890").await.unwrap_err();
        assert!(matches!(err, BankError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_delta() {
        let store = store();
        let account = store
            .open_account(Uuid::new_v4(), AccountType::Savings, &BigDecimal::from(100))
            .await
            .unwrap();

        let updated = store
            .apply_delta(&account.account_number, &BigDecimal::from_str("-25.50").unwrap())
            .await
            .unwrap();
        assert_eq!(updated.balance, BigDecimal::from_str("74.50").unwrap());

        let err = store
            .apply_delta(&account.account_number, &BigDecimal::from(-75))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert_eq!(
            store.get(&account.account_number).await.unwrap().balance,
            BigDecimal::from_str("74.50").unwrap()
        );
    }

    #[tokio::test]
    async fn test_apply_delta_rejects_sub_cent_delta() {
        let store = store();
        let account = store
            .open_account(
                Uuid::new_v4(),
                AccountType::Savings,
                &BigDecimal::from_str("0.01").unwrap(),
            )
            .await
            .unwrap();

        for delta in ["-0.005", "0.009"] {
            let err = store
                .apply_delta(&account.account_number, &BigDecimal::from_str(delta).unwrap())
                .await
                .unwrap_err();
            assert!(matches!(err, BankError::Validation(_)), "{delta}");
        }
        assert_eq!(
            store.get(&account.account_number).await.unwrap().balance,
            BigDecimal::from_str("0.01").unwrap()
        );
    }

    #[tokio::test]
    async fn test_deactivated_account_rejects_delta() {
        let store = store();
        let account = store
            .open_account(Uuid::new_v4(), AccountType::Savings, &BigDecimal::from(10))
            .await
            .unwrap();

        let deactivated = store.set_active(&account.account_number, false).await.unwrap();
        assert!(!deactivated.active);
        assert!(matches!(
            store.apply_delta(&account.account_number, &BigDecimal::from(1)).await,
            Err(BankError::Validation(_))
        ));

        store.set_active(&account.account_number, true).await.unwrap();
        assert!(store
            .apply_delta(&account.account_number, &BigDecimal::from(1))
            .await
            .is_ok());
    }
}
