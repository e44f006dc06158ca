use crate::models::{AccountRecord, RawRow, RiskBand};

pub const PRODUCT_LABEL: &str = "HDFC Credit Card";

const UTILIZATION_WEIGHT: f64 = 0.35;
const PAYMENT_SHORTFALL_WEIGHT: f64 = 0.25;
const MIN_DUE_WEIGHT: f64 = 0.20;
const CASH_WITHDRAWAL_WEIGHT: f64 = 0.20;

pub fn score_row(row: &RawRow) -> AccountRecord {
    let base = base_score(row) + delinquency_bump(row.dpd_next);
    let risk_score = round_to(base.clamp(0.0, 1.0), 2);

    AccountRecord {
        customer_id: row.customer_id.clone(),
        product: PRODUCT_LABEL.to_string(),
        current_dpd: row.dpd_next,
        utilization_pct: row.utilization,
        avg_payment_ratio: row.avg_payment_ratio,
        min_due_paid_freq: row.min_due_freq,
        cash_withdrawal_pct: row.cash_withdrawal,
        risk_score,
        risk_band: band_for(risk_score),
        predicted_roll_to_30_plus: round_to(risk_score.clamp(0.0, 1.0), 2),
    }
}

pub fn base_score(row: &RawRow) -> f64 {
    UTILIZATION_WEIGHT * (row.utilization / 100.0)
        + PAYMENT_SHORTFALL_WEIGHT * (1.0 - row.avg_payment_ratio / 100.0)
        + MIN_DUE_WEIGHT * (row.min_due_freq / 100.0)
        + CASH_WITHDRAWAL_WEIGHT * (row.cash_withdrawal / 100.0)
}

/// Bucket codes outside 1..=3 carry no bump.
pub fn delinquency_bump(dpd_next: i64) -> f64 {
    match dpd_next {
        1 => 0.20,
        2 => 0.40,
        3 => 0.60,
        _ => 0.0,
    }
}

pub fn band_for(risk_score: f64) -> RiskBand {
    match risk_score {
        s if s >= 0.80 => RiskBand::Critical,
        s if s >= 0.60 => RiskBand::High,
        s if s >= 0.30 => RiskBand::Medium,
        _ => RiskBand::Low,
    }
}

/// Rounds half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
