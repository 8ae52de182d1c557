//! Deposits, withdrawals, transfers and statements

use bigdecimal::BigDecimal;

use crate::ledger::{AccountStore, AuditLog, StatementFilter};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

/// Moves money between accounts and records every movement in the ledger
///
/// Each operation changes balances and appends its records in a single
/// storage commit while holding the locks of every account it touches.
pub struct LedgerEngine<S: BankStorage> {
    accounts: AccountStore<S>,
    audit: AuditLog<S>,
}

impl<S: BankStorage + Clone> Clone for LedgerEngine<S> {
    fn clone(&self) -> Self {
        Self {
            accounts: self.accounts.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<S: BankStorage> LedgerEngine<S> {
    /// Create a ledger engine over an account store and its audit log
    pub fn new(accounts: AccountStore<S>, audit: AuditLog<S>) -> Self {
        Self { accounts, audit }
    }

    /// Credit `amount` to an account
    pub async fn deposit(
        &self,
        account_number: &str,
        amount: &BigDecimal,
    ) -> BankResult<TransactionRecord> {
        let amount = validate_positive_amount(amount)?;
        let guard = self.accounts.lock(account_number).await?;

        let (accounts, mut records) = self
            .accounts
            .commit_deltas(&[(&guard, amount.clone())], |updated| {
                vec![TransactionRecord::credit(&updated[0], amount.clone(), None)]
            })
            .await?;
        drop(guard);

        tracing::info!(
            account_number,
            amount = %amount,
            balance = %accounts[0].balance,
            "deposit committed"
        );
        Ok(records.remove(0))
    }

    /// Debit `amount` from an account
    pub async fn withdraw(
        &self,
        account_number: &str,
        amount: &BigDecimal,
    ) -> BankResult<TransactionRecord> {
        let amount = validate_positive_amount(amount)?;
        let guard = self.accounts.lock(account_number).await?;

        let (accounts, mut records) = self
            .accounts
            .commit_deltas(&[(&guard, -amount.clone())], |updated| {
                vec![TransactionRecord::debit(&updated[0], amount.clone(), None)]
            })
            .await?;
        drop(guard);

        tracing::info!(
            account_number,
            amount = %amount,
            balance = %accounts[0].balance,
            "withdrawal committed"
        );
        Ok(records.remove(0))
    }

    /// Move `amount` from one account to another
    ///
    /// Both accounts are locked in ascending account number order. The debit,
    /// the credit and both ledger legs commit together or not at all.
    pub async fn transfer(
        &self,
        from_account_number: &str,
        to_account_number: &str,
        amount: &BigDecimal,
    ) -> BankResult<TransferReceipt> {
        let amount = validate_positive_amount(amount)?;
        if from_account_number == to_account_number {
            return Err(BankError::Validation(
                "Cannot transfer to the same account".to_string(),
            ));
        }

        let (from_guard, to_guard) = self
            .accounts
            .lock_pair(from_account_number, to_account_number)
            .await?;

        let (_, mut records) = self
            .accounts
            .commit_deltas(
                &[(&from_guard, -amount.clone()), (&to_guard, amount.clone())],
                |updated| {
                    let (from, to) = (&updated[0], &updated[1]);
                    vec![
                        TransactionRecord::debit(
                            from,
                            amount.clone(),
                            Some(to.account_number.clone()),
                        ),
                        TransactionRecord::credit(
                            to,
                            amount.clone(),
                            Some(from.account_number.clone()),
                        ),
                    ]
                },
            )
            .await?;
        drop((from_guard, to_guard));

        tracing::info!(
            from = from_account_number,
            to = to_account_number,
            amount = %amount,
            "transfer committed"
        );
        let credit = records.remove(1);
        let debit = records.remove(0);
        Ok(TransferReceipt { debit, credit })
    }

    /// Records of one account, newest first
    pub async fn statement(
        &self,
        account_number: &str,
        filter: &StatementFilter,
    ) -> BankResult<Vec<TransactionRecord>> {
        let account = self.accounts.get(account_number).await?;
        self.audit.records_for_account(&account, filter).await
    }
}
