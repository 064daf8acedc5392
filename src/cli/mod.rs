//! Command-line interface

pub mod output;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::Tabled;

use crate::fleet::{LoadReport, TenantScope};
use crate::resolver::Resolution;

pub use output::{print_items, OutputMode};

#[derive(Parser, Debug)]
#[command(name = "trader-fleet")]
#[command(about = "Multi-tenant orchestrator for trading workers", long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and per-environment overrides
    #[arg(long, global = true, default_value = "config", env = "FLEET_CONFIG_DIR")]
    pub config_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load workers, restore the ones flagged to run, and serve until shutdown
    Run {
        /// Load only; do not restart flagged workers
        #[arg(long)]
        no_restore: bool,
    },
    /// Resolve persisted configuration and show what would load
    Check {
        /// Limit to one tenant instead of the persisted deployment mode
        #[arg(long)]
        tenant: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Explicit scope requested on the command line, if any
    pub fn scope(&self) -> Option<TenantScope> {
        match self {
            Commands::Check {
                tenant: Some(tenant),
                ..
            } => Some(TenantScope::tenant(tenant.clone())),
            _ => None,
        }
    }
}

/// One line of `check` output
#[derive(Debug, Serialize, Tabled)]
pub struct CheckRow {
    pub worker_id: String,
    pub tenant: String,
    pub model: String,
    pub exchange: String,
    pub balance: String,
    pub interval: String,
    pub status: String,
}

impl CheckRow {
    pub fn from_resolution(resolution: &Resolution) -> Vec<Self> {
        let mut rows: Vec<Self> = resolution
            .configs
            .iter()
            .map(|c| Self {
                worker_id: c.id.clone(),
                tenant: c.tenant_id.clone(),
                model: c.ai_model_label().to_string(),
                exchange: c.exchange_kind.to_string(),
                balance: format_balance(c.initial_balance),
                interval: format!("{}m", c.scan_interval.as_secs() / 60),
                status: "ready".to_string(),
            })
            .collect();

        rows.extend(resolution.skipped.iter().map(|s| Self {
            worker_id: s.worker_id.clone(),
            tenant: s.tenant_id.clone(),
            model: "-".to_string(),
            exchange: "-".to_string(),
            balance: "-".to_string(),
            interval: "-".to_string(),
            status: format!("skipped: {}", s.reason),
        }));
        rows
    }
}

fn format_balance(balance: Decimal) -> String {
    format!("${:.2}", balance)
}

/// One-line summary of a boot load
pub fn describe_load(report: &LoadReport) -> String {
    format!(
        "{} loaded, {} skipped, {} already loaded, {} failed",
        report.loaded.len(),
        report.skipped.len(),
        report.already_loaded.len(),
        report.failed.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SkippedDefinition;

    #[test]
    fn test_check_flags_parse() {
        let cli = Cli::parse_from(["trader-fleet", "check", "--tenant", "alice", "--json"]);
        match &cli.command {
            Commands::Check { tenant, json } => {
                assert_eq!(tenant.as_deref(), Some("alice"));
                assert!(*json);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.command.scope(), Some(TenantScope::tenant("alice")));
    }

    #[test]
    fn test_skipped_rows_carry_reason() {
        let resolution = Resolution {
            configs: Vec::new(),
            skipped: vec![SkippedDefinition {
                worker_id: "alice_w2".into(),
                tenant_id: "alice".into(),
                reason: "AI provider 'p2' is disabled".into(),
            }],
        };
        let rows = CheckRow::from_resolution(&resolution);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].status.starts_with("skipped: "));
    }
}
