//! Query surface over the append-only ledger

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::traits::*;
use crate::types::*;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Leg type restriction of a [`StatementFilter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegFilter {
    /// Every leg
    #[default]
    Any,
    /// Only legs of one type
    Only(LegType),
    /// A leg type nobody recognised was requested; nothing matches
    Unknown,
}

/// Restrictions applied to a statement or ledger search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementFilter {
    pub leg_type: LegFilter,
    /// Inclusive lower bound on the record's date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the record's date
    pub end_date: Option<NaiveDate>,
}

impl StatementFilter {
    /// A filter that matches every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Only keep legs of `leg_type`
    pub fn leg_type(mut self, leg_type: LegType) -> Self {
        self.leg_type = LegFilter::Only(leg_type);
        self
    }

    /// Only keep records dated on or after `start`
    pub fn from_date(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self
    }

    /// Only keep records dated on or before `end`
    pub fn to_date(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    /// Build a filter from raw request parameters
    ///
    /// Blank values are ignored and so are dates that are not `YYYY-MM-DD`.
    /// An unrecognised leg type turns the filter into one that matches
    /// nothing.
    pub fn from_params(
        leg_type: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Self {
        let mut filter = Self::all();

        if let Some(raw) = non_blank(leg_type) {
            filter.leg_type = match raw.parse::<LegType>() {
                Ok(leg_type) => LegFilter::Only(leg_type),
                Err(_) => {
                    tracing::debug!(leg_type = raw, "unknown leg type filter");
                    LegFilter::Unknown
                }
            };
        }
        filter.start_date = parse_date(non_blank(start_date));
        filter.end_date = parse_date(non_blank(end_date));
        filter
    }

    /// Whether `record` passes the filter
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        let leg_matches = match self.leg_type {
            LegFilter::Any => true,
            LegFilter::Only(leg_type) => record.leg_type == leg_type,
            LegFilter::Unknown => false,
        };
        let date = record.timestamp.date();

        leg_matches
            && self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let raw = value?;
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(error) => {
            tracing::debug!(date = raw, error = %error, "ignoring unparseable date filter");
            None
        }
    }
}

/// Newest first; records sharing a timestamp keep newest-append first
fn newest_first(mut records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
    records.reverse();
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records
}

/// Read access to the ledger of transaction records
///
/// Records are only ever appended through a ledger commit; this type never
/// mutates them.
pub struct AuditLog<S: BankStorage> {
    storage: S,
}

impl<S: BankStorage + Clone> Clone for AuditLog<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<S: BankStorage> AuditLog<S> {
    /// Create an audit log over `storage`
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Records of one account matching `filter`, newest first
    pub async fn records_for_account(
        &self,
        account: &Account,
        filter: &StatementFilter,
    ) -> BankResult<Vec<TransactionRecord>> {
        let records = self.storage.list_records(Some(account.id)).await?;
        Ok(newest_first(
            records.into_iter().filter(|r| filter.matches(r)).collect(),
        ))
    }

    /// Search the ledger, optionally restricted to one account number
    pub async fn search(
        &self,
        account_number: Option<&str>,
        filter: &StatementFilter,
    ) -> BankResult<Vec<TransactionRecord>> {
        match non_blank(account_number) {
            Some(number) => {
                let account = self
                    .storage
                    .get_account(number)
                    .await?
                    .ok_or_else(|| BankError::AccountNotFound(number.to_string()))?;
                self.records_for_account(&account, filter).await
            }
            None => {
                let records = self.storage.list_records(None).await?;
                Ok(newest_first(
                    records.into_iter().filter(|r| filter.matches(r)).collect(),
                ))
            }
        }
    }

    /// Total number of records in the ledger
    pub async fn count(&self) -> BankResult<usize> {
        self.storage.count_records().await
    }
}
