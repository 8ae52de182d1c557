//! Reconciliation of account balances against the ledger
//!
//! Every balance must equal its opening balance plus all credits minus all
//! debits recorded for the account.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::traits::*;
use crate::types::*;

/// Outcome of reconciling one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub account_number: String,
    pub opening_balance: BigDecimal,
    pub total_credits: BigDecimal,
    pub total_debits: BigDecimal,
    /// Opening balance plus credits minus debits
    pub expected_balance: BigDecimal,
    /// Balance held on the account record
    pub recorded_balance: BigDecimal,
    pub is_consistent: bool,
}

pub struct ReconciliationEngine<S: BankStorage> {
    storage: S,
}

impl<S: BankStorage> ReconciliationEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Reconcile a single account
    pub async fn reconcile_account(&self, account_number: &str) -> BankResult<ReconciliationReport> {
        let account = self
            .storage
            .get_account(account_number)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(account_number.to_string()))?;
        self.reconcile(&account).await
    }

    /// Reconcile every account
    pub async fn reconcile_all(&self) -> BankResult<Vec<ReconciliationReport>> {
        let mut reports = Vec::new();
        for account in self.storage.list_accounts(None).await? {
            reports.push(self.reconcile(&account).await?);
        }
        Ok(reports)
    }

    async fn reconcile(&self, account: &Account) -> BankResult<ReconciliationReport> {
        let records = self.storage.list_records(Some(account.id)).await?;

        let total_credits: BigDecimal = records
            .iter()
            .filter(|r| r.leg_type == LegType::Credit)
            .map(|r| &r.amount)
            .sum();
        let total_debits: BigDecimal = records
            .iter()
            .filter(|r| r.leg_type == LegType::Debit)
            .map(|r| &r.amount)
            .sum();
        let expected_balance = &account.opening_balance + &total_credits - &total_debits;
        let is_consistent = expected_balance == account.balance;

        if !is_consistent {
            tracing::warn!(
                account_number = %account.account_number,
                expected = %expected_balance,
                recorded = %account.balance,
                "ledger and balance disagree"
            );
        }

        Ok(ReconciliationReport {
            account_number: account.account_number.clone(),
            opening_balance: account.opening_balance.clone(),
            total_credits,
            total_debits,
            expected_balance,
            recorded_balance: account.balance.clone(),
            is_consistent,
        })
    }
}
