use axum::{
    Router,
    extract::Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    Household, SimError, SimResult, SimulationResult, TaxConfig, WithdrawalStrategy, simulate,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliWithdrawalStrategy {
    Balanced,
    MinimizeIncome,
    CorporateOptimized,
    RrifFrontload,
}

impl From<CliWithdrawalStrategy> for WithdrawalStrategy {
    fn from(value: CliWithdrawalStrategy) -> Self {
        match value {
            CliWithdrawalStrategy::Balanced => WithdrawalStrategy::Balanced,
            CliWithdrawalStrategy::MinimizeIncome => WithdrawalStrategy::MinimizeIncome,
            CliWithdrawalStrategy::CorporateOptimized => WithdrawalStrategy::CorporateOptimized,
            CliWithdrawalStrategy::RrifFrontload => WithdrawalStrategy::RrifFrontload,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "canretire",
    about = "Year-by-year Canadian retirement cash-flow and tax simulator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Serve the JSON API")]
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    #[command(about = "Simulate a household JSON file and print the result")]
    Simulate(SimulateArgs),
}

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    #[arg(long, help = "Household JSON file")]
    pub household: PathBuf,
    #[arg(
        long,
        help = "Tax configuration JSON; defaults to the built-in 2025 tables"
    )]
    pub tax_config: Option<PathBuf>,
    #[arg(long, value_enum, help = "Override the household's withdrawal strategy")]
    pub strategy: Option<CliWithdrawalStrategy>,
    #[arg(long, help = "Override the household's province code")]
    pub province: Option<String>,
    #[arg(long, default_value_t = false, help = "Print only the summary block")]
    pub summary_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SimulatePayload {
    household: Household,
    #[serde(default)]
    tax_config: Option<TaxConfig>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn run_simulate_command(args: &SimulateArgs) -> SimResult<String> {
    let raw = std::fs::read_to_string(&args.household).map_err(|e| {
        SimError::validation(
            "household",
            format!("cannot read {}: {e}", args.household.display()),
        )
    })?;
    let mut household = parse_household(&raw)?;
    if let Some(strategy) = args.strategy {
        household.strategy = strategy.into();
    }
    if let Some(province) = &args.province {
        household.province = province.clone();
    }

    let config = match &args.tax_config {
        Some(path) => TaxConfig::from_path(path)?,
        None => TaxConfig::builtin()?,
    };
    let result = simulate(&household, &config)?;
    info!(
        years = result.summary.years_simulated,
        success_rate = result.summary.success_rate,
        "simulation finished"
    );

    let rendered = if args.summary_only {
        serde_json::to_string_pretty(&result.summary)
    } else {
        serde_json::to_string_pretty(&result)
    };
    rendered.map_err(SimError::from)
}

fn parse_household(raw: &str) -> SimResult<Household> {
    serde_json::from_str(raw).map_err(|e| SimError::validation("household", e.to_string()))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "canretire HTTP API listening");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/simulate", post(simulate_handler))
        .fallback(not_found_handler)
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(body: String) -> Response {
    let payload = match serde_json::from_str::<SimulatePayload>(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid API JSON payload: {e}"),
            );
        }
    };
    match run_payload(payload) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => {
            warn!(error = %err, "simulation rejected");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

fn run_payload(payload: SimulatePayload) -> SimResult<SimulationResult> {
    let config = match payload.tax_config {
        Some(config) => {
            config.check_sections()?;
            config
        }
        None => TaxConfig::builtin()?,
    };
    simulate(&payload.household, &config)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUSEHOLD_JSON: &str = r#"{
        "p1": {
            "name": "Alex",
            "startAge": 65,
            "rrif": 250000,
            "nonregBalance": 400000,
            "nonregAcb": 300000,
            "cppAnnualAt65": 10000,
            "oasAnnualAt65": 8000,
            "yields": { "investedTotalReturn": 0.05, "registeredGrowth": 0.04 }
        },
        "province": "AB",
        "endAge": 75,
        "strategy": "balanced",
        "spending": { "goGo": 50000, "slowGo": 45000, "noGo": 40000 }
    }"#;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[test]
    fn household_json_uses_camel_case_keys() {
        let household = parse_household(HOUSEHOLD_JSON).expect("valid household");
        assert_eq!(household.p1.name, "Alex");
        assert_eq!(household.end_age, 75);
        assert_eq!(household.spending.go_go, 50_000.0);
        assert_eq!(household.strategy, WithdrawalStrategy::Balanced);
    }

    #[test]
    fn household_json_rejects_unknown_fields() {
        let err = parse_household(r#"{ "p1": { "rrifBalance": 1 } }"#).unwrap_err();
        assert!(matches!(err, SimError::Validation { ref field, .. } if field == "household"));
        assert!(err.to_string().contains("rrifBalance"));
    }

    #[test]
    fn cli_parses_simulate_subcommand() {
        let cli = Cli::try_parse_from([
            "canretire",
            "simulate",
            "--household",
            "household.json",
            "--strategy",
            "rrif-frontload",
            "--summary-only",
        ])
        .expect("valid arguments");
        match cli.command {
            Command::Simulate(args) => {
                assert_eq!(args.household, PathBuf::from("household.json"));
                assert_eq!(args.strategy, Some(CliWithdrawalStrategy::RrifFrontload));
                assert!(args.summary_only);
                assert!(args.tax_config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_serve_defaults_port() {
        let cli = Cli::try_parse_from(["canretire", "serve"]).expect("valid arguments");
        assert!(matches!(cli.command, Command::Serve { port: 8080 }));
    }

    #[test]
    fn simulate_command_reads_file_and_applies_overrides() {
        let dir = std::env::temp_dir().join(format!("canretire-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("household.json");
        std::fs::write(&path, HOUSEHOLD_JSON).expect("write household");

        let args = SimulateArgs {
            household: path,
            tax_config: None,
            strategy: Some(CliWithdrawalStrategy::MinimizeIncome),
            province: Some("on".to_string()),
            summary_only: true,
        };
        let output = run_simulate_command(&args).expect("simulation runs");
        let summary: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(summary["yearsSimulated"], 11);
        assert!(summary.get("years").is_none());
    }

    #[test]
    fn simulate_command_reports_missing_file() {
        let args = SimulateArgs {
            household: PathBuf::from("/definitely/not/here.json"),
            tax_config: None,
            strategy: None,
            province: None,
            summary_only: false,
        };
        assert!(matches!(
            run_simulate_command(&args),
            Err(SimError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn simulate_endpoint_returns_years_and_summary() {
        let body = format!(r#"{{ "household": {HOUSEHOLD_JSON} }}"#);
        let response = simulate_handler(body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );
        let json = body_json(response).await;
        assert_eq!(json["years"].as_array().map(Vec::len), Some(11));
        assert_eq!(json["years"][0]["year"], 2025);
        assert!(json["summary"]["healthScore"].is_number());
    }

    #[tokio::test]
    async fn simulate_endpoint_maps_errors_to_400() {
        let body = r#"{ "household": { "province": "ZZ" } }"#.to_string();
        let response = simulate_handler(body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("Unsupported province"))
        );
    }

    #[tokio::test]
    async fn simulate_endpoint_rejects_malformed_json() {
        let response = simulate_handler("{ not json".to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|msg| msg.starts_with("Invalid API JSON payload"))
        );
    }

    #[test]
    fn custom_tax_config_with_bad_brackets_is_rejected() {
        let mut config = TaxConfig::builtin().expect("builtin");
        config.federal.brackets.clear();
        let payload = SimulatePayload {
            household: Household::default(),
            tax_config: Some(config),
        };
        assert!(matches!(
            run_payload(payload),
            Err(SimError::ConfigMissing(_))
        ));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = health_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }
}
