use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_SHEET: &str = "Sample";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Probed in order, relative to the repository root.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "data/Credit Card Delinquency Watch.xlsx",
    "Credit Card Delinquency Watch.xlsx",
    "data/credit_card_delinquency_watch.xlsx",
    "data/credit_card_delinquency_watch.csv",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CustomerId,
    Utilization,
    AvgPaymentRatio,
    MinDueFreq,
    CashWithdrawal,
    DpdNext,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::CustomerId,
        Field::Utilization,
        Field::AvgPaymentRatio,
        Field::MinDueFreq,
        Field::CashWithdrawal,
        Field::DpdNext,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::CustomerId => "customer_id",
            Field::Utilization => "utilization",
            Field::AvgPaymentRatio => "avg_payment_ratio",
            Field::MinDueFreq => "min_due_freq",
            Field::CashWithdrawal => "cash_withdrawal",
            Field::DpdNext => "dpd_next",
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.key() == value)
            .ok_or_else(|| {
                let keys: Vec<&str> = Field::ALL.iter().map(|f| f.key()).collect();
                format!("unknown field '{value}', expected one of {}", keys.join(", "))
            })
    }
}

pub fn parse_alias(value: &str) -> Result<(Field, String), String> {
    let (field, header) = value
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=HEADER, got '{value}'"))?;
    let header = header.trim();
    if header.is_empty() {
        return Err(format!("empty header name in '{value}'"));
    }
    Ok((field.trim().parse()?, header.to_string()))
}

/// Accepted header names per field, first match wins.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    aliases: HashMap<Field, Vec<String>>,
}

impl ColumnMap {
    pub fn aliases(&self, field: Field) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn with_alias(mut self, field: Field, header: impl Into<String>) -> Self {
        self.aliases.entry(field).or_default().push(header.into());
        self
    }

    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> HashMap<Field, usize> {
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.as_ref().trim(), idx))
            .rev()
            .collect();

        Field::ALL
            .into_iter()
            .filter_map(|field| {
                self.aliases(field)
                    .iter()
                    .find_map(|alias| positions.get(alias.as_str()).copied())
                    .map(|idx| (field, idx))
            })
            .collect()
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        let aliases = [
            (Field::CustomerId, vec!["Customer ID"]),
            (Field::Utilization, vec!["Utilisation %"]),
            (
                Field::AvgPaymentRatio,
                vec!["Avg Payment Ratio", "Average Payment Ratio"],
            ),
            (Field::MinDueFreq, vec!["Min Due Paid Frequency"]),
            (Field::CashWithdrawal, vec!["Cash Withdrawal %"]),
            (Field::DpdNext, vec!["DPD Bucket Next Month"]),
        ]
        .into_iter()
        .map(|(field, names)| (field, names.into_iter().map(String::from).collect()))
        .collect();

        Self { aliases }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub sheet: String,
    pub columns: ColumnMap,
    pub candidates: Vec<PathBuf>,
}

impl LoaderConfig {
    /// Explicit path wins; otherwise the first existing candidate under `root`.
    pub fn resolve_source(&self, root: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_source(root, &self.candidates),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            sheet: DEFAULT_SHEET.to_string(),
            columns: ColumnMap::default(),
            candidates: DEFAULT_CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }
}

pub fn discover_source(root: &Path, candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_accepts_both_payment_ratio_spellings() {
        let columns = ColumnMap::default();
        let old = columns.resolve(&["Customer ID", "Average Payment Ratio"]);
        let new = columns.resolve(&["Customer ID", "Avg Payment Ratio"]);
        assert_eq!(old.get(&Field::AvgPaymentRatio), Some(&1));
        assert_eq!(new.get(&Field::AvgPaymentRatio), Some(&1));
    }

    #[test]
    fn resolve_trims_headers_and_skips_unknown_columns() {
        let columns = ColumnMap::default();
        let resolved = columns.resolve(&[" Utilisation % ", "Notes", "DPD Bucket Next Month"]);
        assert_eq!(resolved.get(&Field::Utilization), Some(&0));
        assert_eq!(resolved.get(&Field::DpdNext), Some(&2));
        assert!(!resolved.contains_key(&Field::CustomerId));
    }

    #[test]
    fn extra_alias_is_honoured() {
        let columns = ColumnMap::default().with_alias(Field::CustomerId, "Cust Ref");
        let resolved = columns.resolve(&["Cust Ref"]);
        assert_eq!(resolved.get(&Field::CustomerId), Some(&0));
    }

    #[test]
    fn alias_argument_parses() {
        assert_eq!(
            parse_alias("avg_payment_ratio=Avg. Pay Ratio"),
            Ok((Field::AvgPaymentRatio, "Avg. Pay Ratio".to_string()))
        );
        assert!(parse_alias("avg_payment_ratio").is_err());
        assert!(parse_alias("balance=Balance").is_err());
        assert!(parse_alias("dpd_next= ").is_err());
    }

    #[test]
    fn discovery_picks_first_existing_candidate() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("data")).unwrap();
        std::fs::write(root.path().join("data/second.csv"), "x").unwrap();
        std::fs::write(root.path().join("third.csv"), "x").unwrap();

        let candidates = vec![
            PathBuf::from("data/first.xlsx"),
            PathBuf::from("data/second.csv"),
            PathBuf::from("third.csv"),
        ];
        let found = discover_source(root.path(), &candidates);
        assert_eq!(found, Some(root.path().join("data/second.csv")));
    }

    #[test]
    fn discovery_without_matches_is_none() {
        let root = tempfile::tempdir().unwrap();
        let config = LoaderConfig::default();
        assert_eq!(config.resolve_source(root.path(), None), None);
    }

    #[test]
    fn explicit_path_bypasses_discovery() {
        let root = tempfile::tempdir().unwrap();
        let config = LoaderConfig::default();
        let explicit = Path::new("/nowhere/accounts.xlsx");
        assert_eq!(
            config.resolve_source(root.path(), Some(explicit)),
            Some(explicit.to_path_buf())
        );
    }
}
