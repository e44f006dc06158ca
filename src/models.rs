use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub customer_id: String,
    pub utilization: f64,
    pub avg_payment_ratio: f64,
    pub min_due_freq: f64,
    pub cash_withdrawal: f64,
    pub dpd_next: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskBand {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBand {
    pub const ALL: [RiskBand; 4] = [
        RiskBand::Critical,
        RiskBand::High,
        RiskBand::Medium,
        RiskBand::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
            RiskBand::Critical => "Critical",
        }
    }

    // `hIGH` and `high` both normalize to `High`.
    pub fn from_filter(value: &str) -> Option<RiskBand> {
        let normalized = capitalize(value);
        RiskBand::ALL
            .into_iter()
            .find(|band| band.as_str() == normalized)
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRecord {
    pub customer_id: String,
    pub product: String,
    pub current_dpd: i64,
    pub utilization_pct: f64,
    pub avg_payment_ratio: f64,
    pub min_due_paid_freq: f64,
    pub cash_withdrawal_pct: f64,
    pub risk_score: f64,
    pub risk_band: RiskBand,
    pub predicted_roll_to_30_plus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_accounts: usize,
    pub critical_risk_accounts: usize,
    pub high_risk_accounts: usize,
    pub medium_risk_accounts: usize,
    pub low_risk_accounts: usize,
    pub avg_utilization_pct: f64,
}

impl PortfolioSummary {
    pub fn band_count(&self, band: RiskBand) -> usize {
        match band {
            RiskBand::Critical => self.critical_risk_accounts,
            RiskBand::High => self.high_risk_accounts,
            RiskBand::Medium => self.medium_risk_accounts,
            RiskBand::Low => self.low_risk_accounts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LoadStatus {
    Loaded,
    SourceUnavailable,
    SourceMalformed(String),
}

/// Outcome of the startup load, kept so callers can see why a dataset is
/// empty or short without reading logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub source: Option<PathBuf>,
    pub status: LoadStatus,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

impl LoadReport {
    pub fn unavailable(source: Option<PathBuf>) -> Self {
        Self {
            source,
            status: LoadStatus::SourceUnavailable,
            rows_read: 0,
            rows_skipped: 0,
        }
    }
}
