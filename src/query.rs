use std::cmp::Ordering;

use thiserror::Error;

use crate::models::{AccountRecord, Health, LoadReport, PortfolioSummary, RiskBand};
use crate::risk::round_to;
use crate::store::AccountStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid risk band filter")]
    InvalidRiskBand(String),
    #[error("Account not found")]
    AccountNotFound(String),
}

#[derive(Debug, Clone)]
pub struct QueryService {
    store: AccountStore,
}

impl QueryService {
    pub fn new(store: AccountStore) -> Self {
        Self { store }
    }

    pub fn health(&self) -> Health {
        Health { status: "ok" }
    }

    pub fn load_report(&self) -> &LoadReport {
        self.store.load_report()
    }

    pub fn summary(&self) -> PortfolioSummary {
        let accounts = self.store.accounts();
        let count = |band: RiskBand| accounts.iter().filter(|a| a.risk_band == band).count();

        let avg_utilization_pct = if accounts.is_empty() {
            0.0
        } else {
            let total: f64 = accounts.iter().map(|a| a.utilization_pct).sum();
            round_to(total / accounts.len() as f64, 1)
        };

        PortfolioSummary {
            total_accounts: accounts.len(),
            critical_risk_accounts: count(RiskBand::Critical),
            high_risk_accounts: count(RiskBand::High),
            medium_risk_accounts: count(RiskBand::Medium),
            low_risk_accounts: count(RiskBand::Low),
            avg_utilization_pct,
        }
    }

    /// All accounts, or those in one band. An empty filter means no filter.
    pub fn list(&self, risk_band: Option<&str>) -> Result<Vec<&AccountRecord>, QueryError> {
        let accounts = self.store.accounts().iter();
        match risk_band.filter(|value| !value.is_empty()) {
            None => Ok(accounts.collect()),
            Some(value) => {
                let band = RiskBand::from_filter(value)
                    .ok_or_else(|| QueryError::InvalidRiskBand(value.to_string()))?;
                Ok(accounts.filter(|a| a.risk_band == band).collect())
            }
        }
    }

    pub fn detail(&self, customer_id: &str) -> Result<&AccountRecord, QueryError> {
        self.store
            .find(customer_id)
            .ok_or_else(|| QueryError::AccountNotFound(customer_id.to_string()))
    }

    /// Highest risk first; ties keep load order.
    pub fn riskiest(
        &self,
        risk_band: Option<&str>,
        limit: usize,
    ) -> Result<Vec<&AccountRecord>, QueryError> {
        let mut accounts = self.list(risk_band)?;
        accounts.sort_by(|a, b| {
            b.risk_score
                .partial_cmp(&a.risk_score)
                .unwrap_or(Ordering::Equal)
        });
        accounts.truncate(limit);
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoadStatus, RawRow};

    fn raw(id: &str, util: f64, ratio: f64, dpd: i64) -> RawRow {
        RawRow {
            customer_id: id.to_string(),
            utilization: util,
            avg_payment_ratio: ratio,
            min_due_freq: 50.0,
            cash_withdrawal: 20.0,
            dpd_next: dpd,
        }
    }

    fn service(rows: &[RawRow]) -> QueryService {
        let report = LoadReport {
            source: None,
            status: LoadStatus::Loaded,
            rows_read: rows.len(),
            rows_skipped: 0,
        };
        QueryService::new(AccountStore::from_rows(rows, report))
    }

    fn portfolio() -> QueryService {
        service(&[
            // 1.0 Critical
            raw("C1", 90.0, 10.0, 2),
            // 0.20 Low
            raw("C2", 10.0, 90.0, 0),
            // 0.43 Medium
            raw("C3", 40.0, 40.0, 0),
            // 0.68 High
            raw("C4", 90.0, 10.0, 0),
            // 0.38 Medium
            raw("C5", 40.0, 60.0, 0),
        ])
    }

    #[test]
    fn summary_counts_every_band() {
        let summary = portfolio().summary();
        assert_eq!(summary.total_accounts, 5);
        assert_eq!(summary.critical_risk_accounts, 1);
        assert_eq!(summary.high_risk_accounts, 1);
        assert_eq!(summary.medium_risk_accounts, 2);
        assert_eq!(summary.low_risk_accounts, 1);
        assert_eq!(summary.avg_utilization_pct, 54.0);

        let banded: usize = RiskBand::ALL.iter().map(|b| summary.band_count(*b)).sum();
        assert_eq!(banded, summary.total_accounts);
    }

    #[test]
    fn empty_summary_has_zero_average() {
        let summary = service(&[]).summary();
        assert_eq!(summary.total_accounts, 0);
        assert_eq!(summary.avg_utilization_pct, 0.0);
        let banded: usize = RiskBand::ALL.iter().map(|b| summary.band_count(*b)).sum();
        assert_eq!(banded, 0);
    }

    #[test]
    fn average_utilization_rounds_to_one_decimal() {
        let summary = service(&[raw("A", 33.0, 50.0, 0), raw("B", 34.0, 50.0, 0), raw("C", 34.0, 50.0, 0)])
            .summary();
        assert_eq!(summary.avg_utilization_pct, 33.7);
    }

    #[test]
    fn list_without_filter_returns_everything() {
        let service = portfolio();
        assert_eq!(service.list(None).unwrap().len(), 5);
        assert_eq!(service.list(Some("")).unwrap().len(), 5);
    }

    #[test]
    fn list_filter_ignores_case() {
        let service = portfolio();
        let medium: Vec<&str> = service
            .list(Some("mEDIUM"))
            .unwrap()
            .into_iter()
            .map(|a| a.customer_id.as_str())
            .collect();
        assert_eq!(medium, vec!["C3", "C5"]);
        assert_eq!(service.list(Some("critical")).unwrap().len(), 1);
    }

    #[test]
    fn list_rejects_unknown_band() {
        let err = portfolio().list(Some("severe")).unwrap_err();
        assert_eq!(err, QueryError::InvalidRiskBand("severe".into()));
    }

    #[test]
    fn detail_finds_existing_account() {
        let service = portfolio();
        let account = service.detail("C4").unwrap();
        assert_eq!(account.risk_band, RiskBand::High);
        assert!((account.risk_score - 0.68).abs() < 1e-9);
    }

    #[test]
    fn detail_reports_unknown_account() {
        let err = portfolio().detail("c4").unwrap_err();
        assert_eq!(err, QueryError::AccountNotFound("c4".into()));
    }

    #[test]
    fn riskiest_sorts_descending_and_limits() {
        let service = portfolio();
        let top: Vec<&str> = service
            .riskiest(None, 3)
            .unwrap()
            .into_iter()
            .map(|a| a.customer_id.as_str())
            .collect();
        assert_eq!(top, vec!["C1", "C4", "C3"]);
    }

    #[test]
    fn malformed_rows_do_not_reach_summary() {
        let csv = "Customer ID,Utilisation %,Avg Payment Ratio,Min Due Paid Frequency,Cash Withdrawal %,DPD Bucket Next Month\n\
                   C1,90,10,50,20,2\n\
                   C2,oops,10,50,20,2\n";
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        std::io::Write::write_all(&mut file, csv.as_bytes()).unwrap();

        let store = AccountStore::load(Some(file.path()), &crate::config::LoaderConfig::default());
        let service = QueryService::new(store);
        assert_eq!(service.summary().total_accounts, 1);
        assert_eq!(service.summary().avg_utilization_pct, 90.0);
        assert_eq!(service.load_report().rows_skipped, 1);
    }

    #[test]
    fn health_is_independent_of_data() {
        assert_eq!(service(&[]).health().status, "ok");
    }
}
