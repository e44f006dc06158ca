use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod loader;
mod models;
mod query;
mod report;
mod risk;
mod store;

use config::{
    parse_alias, ColumnMap, Field, LoaderConfig, DEFAULT_BIND, DEFAULT_CORS_ORIGIN, DEFAULT_SHEET,
};
use query::QueryService;
use store::AccountStore;

#[derive(Parser)]
#[command(name = "delinquency-watch")]
#[command(about = "Credit card delinquency early-warning service", long_about = None)]
struct Cli {
    /// Spreadsheet or CSV to load; skips discovery when set
    #[arg(long, global = true, env = "WATCH_DATA_FILE")]
    data_file: Option<PathBuf>,
    /// Directory the discovery candidates are resolved against
    #[arg(long, global = true, env = "WATCH_ROOT", default_value = ".")]
    root: PathBuf,
    #[arg(long, global = true, env = "WATCH_SHEET", default_value = DEFAULT_SHEET)]
    sheet: String,
    /// Extra accepted header for a field, as FIELD=HEADER (repeatable)
    #[arg(long = "column-alias", global = true, value_parser = parse_alias)]
    column_aliases: Vec<(Field, String)>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the portfolio API over HTTP
    Serve {
        #[arg(long, env = "WATCH_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,
        #[arg(long, env = "WATCH_CORS_ORIGIN", default_value = DEFAULT_CORS_ORIGIN)]
        cors_origin: String,
    },
    /// Print the highest-risk accounts
    Score {
        #[arg(long)]
        risk_band: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown portfolio report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

impl Cli {
    fn load_service(&self) -> QueryService {
        let columns = self
            .column_aliases
            .iter()
            .fold(ColumnMap::default(), |columns, (field, header)| {
                columns.with_alias(*field, header.clone())
            });
        let config = LoaderConfig {
            sheet: self.sheet.clone(),
            columns,
            ..LoaderConfig::default()
        };
        let source = config.resolve_source(&self.root, self.data_file.as_deref());
        QueryService::new(AccountStore::load(source.as_deref(), &config))
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "delinquency_watch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let service = cli.load_service();

    match cli.command {
        Commands::Serve { bind, cors_origin } => {
            if cors_origin.trim() == "*" {
                anyhow::bail!("CORS origin must be a single origin, not '*'");
            }
            let origin = HeaderValue::from_str(&cors_origin)
                .with_context(|| format!("invalid CORS origin '{cors_origin}'"))?;
            let app = api::build_router(service, origin);

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            info!("listening on http://{bind}");
            axum::serve(listener, app).await?;
        }
        Commands::Score { risk_band, limit } => {
            let accounts = service.riskiest(risk_band.as_deref(), limit)?;

            if accounts.is_empty() {
                println!("No accounts loaded.");
                return Ok(());
            }

            println!("Top accounts by risk score:");
            for account in accounts {
                println!(
                    "- {} ({}) score {:.2}, roll-to-30+ {:.2}, DPD bucket {}",
                    account.customer_id,
                    account.risk_band,
                    account.risk_score,
                    account.predicted_roll_to_30_plus,
                    account.current_dpd
                );
            }
        }
        Commands::Report { out } => {
            let report = report::build_report(&service, chrono::Utc::now());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "delinquency-watch",
            "score",
            "--risk-band",
            "high",
            "--data-file",
            "accounts.csv",
            "--column-alias",
            "customer_id=Card Ref",
        ])
        .unwrap();
        assert_eq!(cli.data_file, Some(PathBuf::from("accounts.csv")));
        assert_eq!(cli.sheet, DEFAULT_SHEET);
        assert_eq!(
            cli.column_aliases,
            vec![(Field::CustomerId, "Card Ref".to_string())]
        );
        assert!(matches!(
            cli.command,
            Commands::Score { ref risk_band, limit: 10 } if risk_band.as_deref() == Some("high")
        ));
    }
}
