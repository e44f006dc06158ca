use std::path::Path;
use std::sync::Arc;

use crate::config::LoaderConfig;
use crate::loader;
use crate::models::{AccountRecord, LoadReport, RawRow};
use crate::risk;

/// Scored accounts in load order. Built once at startup and never mutated;
/// clones share the same backing slice.
#[derive(Debug, Clone)]
pub struct AccountStore {
    accounts: Arc<[AccountRecord]>,
    report: Arc<LoadReport>,
}

impl AccountStore {
    pub fn load(source: Option<&Path>, config: &LoaderConfig) -> Self {
        let (rows, report) = loader::load_rows(source, config);
        Self::from_rows(&rows, report)
    }

    pub fn from_rows(rows: &[RawRow], report: LoadReport) -> Self {
        Self {
            accounts: rows.iter().map(risk::score_row).collect(),
            report: Arc::new(report),
        }
    }

    pub fn accounts(&self) -> &[AccountRecord] {
        &self.accounts
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// First match in load order; ids are not required to be unique.
    pub fn find(&self, customer_id: &str) -> Option<&AccountRecord> {
        self.accounts
            .iter()
            .find(|account| account.customer_id == customer_id)
    }
}
