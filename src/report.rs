use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{AccountRecord, LoadReport, LoadStatus, RiskBand};
use crate::query::QueryService;

const TOP_ACCOUNTS: usize = 10;

fn describe_load(report: &LoadReport) -> String {
    let source = report
        .source
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "no data file".to_string());

    match &report.status {
        LoadStatus::Loaded => format!(
            "Loaded {} accounts from {} ({} rows skipped)",
            report.rows_read, source, report.rows_skipped
        ),
        LoadStatus::SourceUnavailable => format!("Data source unavailable: {source}"),
        LoadStatus::SourceMalformed(reason) => {
            format!("Data source unreadable: {source} ({reason})")
        }
    }
}

fn account_line(account: &AccountRecord) -> String {
    format!(
        "{} ({}) score {:.2}, utilisation {:.1}%, DPD bucket {}, roll-to-30+ {:.0}%",
        account.customer_id,
        account.risk_band,
        account.risk_score,
        account.utilization_pct,
        account.current_dpd,
        account.predicted_roll_to_30_plus * 100.0
    )
}

pub fn build_report(service: &QueryService, generated_at: DateTime<Utc>) -> String {
    let summary = service.summary();
    let mut output = String::new();

    let _ = writeln!(output, "# Credit Card Delinquency Watch");
    let _ = writeln!(
        output,
        "Generated {}",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output, "{}", describe_load(service.load_report()));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Band Mix");

    if summary.total_accounts == 0 {
        let _ = writeln!(output, "No accounts loaded.");
    } else {
        for band in RiskBand::ALL {
            let count = summary.band_count(band);
            let share = count as f64 * 100.0 / summary.total_accounts as f64;
            let _ = writeln!(output, "- {band}: {count} accounts ({share:.1}%)");
        }
        let _ = writeln!(
            output,
            "- Average utilisation: {:.1}%",
            summary.avg_utilization_pct
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Accounts");

    // An unfiltered listing cannot be rejected.
    let riskiest = service.riskiest(None, TOP_ACCOUNTS).unwrap_or_default();
    if riskiest.is_empty() {
        let _ = writeln!(output, "No accounts loaded.");
    } else {
        for account in riskiest {
            let _ = writeln!(output, "- {}", account_line(account));
        }
    }

    let delinquent: Vec<&AccountRecord> = service
        .list(None)
        .unwrap_or_default()
        .into_iter()
        .filter(|account| account.current_dpd > 0)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Accounts Already Past Due");

    if delinquent.is_empty() {
        let _ = writeln!(output, "No accounts with a DPD bucket above zero.");
    } else {
        for account in delinquent {
            let _ = writeln!(output, "- {}", account_line(account));
        }
    }

    output
}
