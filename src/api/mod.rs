use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    DistributionCatalog, DistributionRegistry, FlatTransfer, MeansTestedTransfer, PersonGroup,
    PersonMetric, ScenarioConfig, SimError, SimRng, SimulationController, SimulationResult,
    TransferRule, aggregate_by, load_catalog,
};

const DEFAULT_SEED: u64 = 42;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTransferRule {
    Flat,
    MeansTested,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPersonGroup {
    Sex,
    Education,
    Region,
    Age,
}

impl From<CliPersonGroup> for PersonGroup {
    fn from(value: CliPersonGroup) -> Self {
        match value {
            CliPersonGroup::Sex => PersonGroup::Sex,
            CliPersonGroup::Education => PersonGroup::Education,
            CliPersonGroup::Region => PersonGroup::Region,
            CliPersonGroup::Age => PersonGroup::Age,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPersonMetric {
    LaborIncome,
    CapitalIncome,
    Transfers,
    TotalIncome,
    Taxes,
    SocialContrib,
    NetIncome,
    NetWealth,
}

impl From<CliPersonMetric> for PersonMetric {
    fn from(value: CliPersonMetric) -> Self {
        match value {
            CliPersonMetric::LaborIncome => PersonMetric::LaborIncome,
            CliPersonMetric::CapitalIncome => PersonMetric::CapitalIncome,
            CliPersonMetric::Transfers => PersonMetric::Transfers,
            CliPersonMetric::TotalIncome => PersonMetric::TotalIncome,
            CliPersonMetric::Taxes => PersonMetric::Taxes,
            CliPersonMetric::SocialContrib => PersonMetric::SocialContrib,
            CliPersonMetric::NetIncome => PersonMetric::NetIncome,
            CliPersonMetric::NetWealth => PersonMetric::NetWealth,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum ApiTransferRule {
    Flat {
        amount: f64,
    },
    #[serde(alias = "means_tested", rename_all = "camelCase")]
    MeansTested {
        amount: f64,
        #[serde(alias = "income_threshold")]
        income_threshold: f64,
        #[serde(alias = "withdrawal_rate")]
        withdrawal_rate: f64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulatePayload {
    scenario: ScenarioConfig,
    distributions: DistributionCatalog,
    #[serde(default)]
    transfer: Option<ApiTransferRule>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default, alias = "group_by")]
    group_by: Option<PersonGroup>,
    #[serde(default)]
    metric: Option<PersonMetric>,
}

#[derive(Parser, Debug)]
#[command(
    name = "wealthsim",
    about = "Agent-based tax, transfer and wealth microsimulation"
)]
struct Cli {
    #[arg(long, help = "Scenario file (YAML or JSON)")]
    scenario: PathBuf,
    #[arg(long, help = "Distribution catalog file (YAML or JSON)")]
    distributions: PathBuf,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    #[arg(long, value_enum, default_value_t = CliTransferRule::Flat)]
    transfer_rule: CliTransferRule,
    #[arg(long, default_value_t = 0.0, help = "Transfer paid per person each year")]
    transfer_amount: f64,
    #[arg(long, help = "Gross income above which means-tested transfers are withdrawn")]
    income_threshold: Option<f64>,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Share of income above the threshold withdrawn from the transfer"
    )]
    withdrawal_rate: f64,
    #[arg(long, value_enum, help = "Report a per-group mean after the final year")]
    group_by: Option<CliPersonGroup>,
    #[arg(long, value_enum, default_value_t = CliPersonMetric::NetIncome)]
    metric: CliPersonMetric,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

struct RunRequest {
    scenario: ScenarioConfig,
    catalog: DistributionCatalog,
    transfer_rule: Option<Box<dyn TransferRule>>,
    seed: u64,
    grouping: Option<(PersonGroup, PersonMetric)>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupedReport {
    group_by: PersonGroup,
    metric: PersonMetric,
    values: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    seed: u64,
    #[serde(flatten)]
    result: SimulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    groups: Option<GroupedReport>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn build_transfer_rule(
    rule: CliTransferRule,
    amount: f64,
    income_threshold: Option<f64>,
    withdrawal_rate: f64,
) -> Result<Box<dyn TransferRule>, String> {
    if !amount.is_finite() || amount < 0.0 {
        return Err("--transfer-amount must be a non-negative number".to_string());
    }

    match rule {
        CliTransferRule::Flat => Ok(Box::new(FlatTransfer { amount })),
        CliTransferRule::MeansTested => {
            let income_threshold = income_threshold.ok_or_else(|| {
                "--income-threshold is required for a means-tested transfer".to_string()
            })?;
            if !income_threshold.is_finite() {
                return Err("--income-threshold must be finite".to_string());
            }
            if !(0.0..=1.0).contains(&withdrawal_rate) {
                return Err("--withdrawal-rate must be between 0 and 1".to_string());
            }
            Ok(Box::new(MeansTestedTransfer {
                amount,
                income_threshold,
                withdrawal_rate,
            }))
        }
    }
}

fn build_request(cli: Cli) -> Result<(RunRequest, OutputFormat), String> {
    let scenario = ScenarioConfig::from_file(&cli.scenario)
        .map_err(|e| format!("{}: {e}", cli.scenario.display()))?;
    let catalog = load_catalog(&cli.distributions)
        .map_err(|e| format!("{}: {e}", cli.distributions.display()))?;
    let transfer_rule = build_transfer_rule(
        cli.transfer_rule,
        cli.transfer_amount,
        cli.income_threshold,
        cli.withdrawal_rate,
    )?;

    let request = RunRequest {
        scenario,
        catalog,
        transfer_rule: Some(transfer_rule),
        seed: cli.seed,
        grouping: cli
            .group_by
            .map(|group| (group.into(), cli.metric.into())),
    };
    Ok((request, cli.format))
}

fn execute(request: RunRequest) -> Result<SimulateResponse, SimError> {
    info!(
        scenario = %request.scenario.name,
        seed = request.seed,
        distributions = request.catalog.len(),
        "preparing run"
    );
    let registry = DistributionRegistry::from_catalog(&request.catalog)?;
    let mut controller = SimulationController::new(
        request.scenario,
        Arc::new(registry),
        request.transfer_rule,
        SimRng::seed_from_u64(request.seed),
    )?;
    let result = controller.run()?;

    let groups = request.grouping.map(|(group_by, metric)| GroupedReport {
        group_by,
        metric,
        values: aggregate_by(controller.persons(), group_by, metric),
    });
    Ok(SimulateResponse {
        seed: request.seed,
        result,
        groups,
    })
}

fn render_table(response: &SimulateResponse) -> String {
    let result = &response.result;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "scenario {} ({} years from {}, seed {})",
        result.scenario_name, result.years, result.start_year, response.seed
    );
    if let Some(reference_year) = result.reference_year {
        let _ = writeln!(out, "reference year {reference_year}");
    }
    let _ = writeln!(
        out,
        "{:>6} {:>14} {:>14} {:>14} {:>12} {:>8} {:>14} {:>12} {:>14}",
        "year", "gross", "net", "taxes", "avg net", "gini", "revenue", "deficit", "debt"
    );
    for year in &result.yearly {
        let _ = writeln!(
            out,
            "{:>6} {:>14.2} {:>14.2} {:>14.2} {:>12.2} {:>8.4} {:>14.2} {:>12.2} {:>14.2}",
            year.year,
            year.total_gross_income,
            year.total_net_income,
            year.total_taxes,
            year.avg_net_income,
            year.gini_net_income,
            year.government_revenue,
            year.government_deficit,
            year.government_debt
        );
    }
    if let Some(groups) = &response.groups {
        let _ = writeln!(out, "\n{:?} by {:?}", groups.metric, groups.group_by);
        for (key, value) in &groups.values {
            let _ = writeln!(out, "{key:>10} {value:>14.2}");
        }
    }
    out
}

pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;
    let (request, format) = build_request(cli)?;
    let response = execute(request).map_err(|e| e.to_string())?;
    match format {
        OutputFormat::Table => Ok(render_table(&response)),
        OutputFormat::Json => serde_json::to_string_pretty(&response).map_err(|e| e.to_string()),
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/simulate", post(simulate_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "wealthsim HTTP API listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid API JSON payload: {rejection}"),
            );
        }
    };
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match execute(request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
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
fn request_from_json(json: &str) -> Result<RunRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    request_from_payload(payload)
}

fn request_from_payload(payload: SimulatePayload) -> Result<RunRequest, String> {
    payload.scenario.validate().map_err(|e| e.to_string())?;

    let transfer_rule = match payload.transfer {
        None => None,
        Some(ApiTransferRule::Flat { amount }) => Some(build_transfer_rule(
            CliTransferRule::Flat,
            amount,
            None,
            0.0,
        )?),
        Some(ApiTransferRule::MeansTested {
            amount,
            income_threshold,
            withdrawal_rate,
        }) => Some(build_transfer_rule(
            CliTransferRule::MeansTested,
            amount,
            Some(income_threshold),
            withdrawal_rate,
        )?),
    };

    let grouping = payload
        .group_by
        .map(|group| (group, payload.metric.unwrap_or(PersonMetric::NetIncome)));

    Ok(RunRequest {
        scenario: payload.scenario,
        catalog: payload.distributions,
        transfer_rule,
        seed: payload.seed.unwrap_or(DEFAULT_SEED),
        grouping,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    const SCENARIO_JSON: &str = r#"{
        "name": "api",
        "start_year": 2020,
        "years": 1,
        "tax": {"income_tax_rate": 0.1, "capital_gains_rate": 0.2, "social_contrib_rate": 0.05},
        "government": {
            "spending_shares": {"education": 0.5, "social_protection": 0.5},
            "deficit_limit": 0.1
        },
        "population": {"total_population": 100, "synthetic_n": 2},
        "macro": {"gdp_growth": 0.01, "inflation": 0.02}
    }"#;

    const CATALOG_JSON: &str = r#"{
        "labor_income": {"kind": "constant", "value": 100},
        "capital_income": {"kind": "constant", "value": 50},
        "savings_rate": {"kind": "constant", "value": 0.1},
        "labor_return": {"kind": "constant", "value": 0.01},
        "capital_return": {"kind": "constant", "value": 0.02}
    }"#;

    fn payload_json(extra: &str) -> String {
        format!(r#"{{"scenario": {SCENARIO_JSON}, "distributions": {CATALOG_JSON}{extra}}}"#)
    }

    fn sample_cli() -> Cli {
        Cli::try_parse_from([
            "wealthsim",
            "--scenario",
            "scenario.yaml",
            "--distributions",
            "distributions.yaml",
        ])
        .expect("minimal arguments parse")
    }

    #[test]
    fn cli_defaults() {
        let cli = sample_cli();

        assert_eq!(cli.seed, DEFAULT_SEED);
        assert_eq!(cli.transfer_rule, CliTransferRule::Flat);
        assert_eq!(cli.metric, CliPersonMetric::NetIncome);
        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.group_by.is_none());
    }

    #[test]
    fn cli_parses_means_tested_flags() {
        let cli = Cli::try_parse_from([
            "wealthsim",
            "--scenario",
            "s.yaml",
            "--distributions",
            "d.yaml",
            "--transfer-rule",
            "means-tested",
            "--transfer-amount",
            "1000",
            "--income-threshold",
            "20000",
            "--withdrawal-rate",
            "0.5",
            "--group-by",
            "region",
            "--metric",
            "net-wealth",
            "--format",
            "json",
        ])
        .expect("valid arguments");

        assert_eq!(cli.transfer_rule, CliTransferRule::MeansTested);
        assert_eq!(cli.income_threshold, Some(20_000.0));
        assert_eq!(cli.group_by, Some(CliPersonGroup::Region));
        assert_eq!(PersonMetric::from(cli.metric), PersonMetric::NetWealth);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn build_transfer_rule_requires_threshold_for_means_test() {
        let err = build_transfer_rule(CliTransferRule::MeansTested, 100.0, None, 0.2)
            .err()
            .expect("threshold is missing");
        assert!(err.contains("--income-threshold"));
    }

    #[test]
    fn build_transfer_rule_rejects_bad_parameters() {
        let err = build_transfer_rule(CliTransferRule::MeansTested, 100.0, Some(10.0), 1.5)
            .err()
            .expect("rate above one");
        assert!(err.contains("--withdrawal-rate"));

        let err = build_transfer_rule(CliTransferRule::Flat, -1.0, None, 0.0)
            .err()
            .expect("negative amount");
        assert!(err.contains("--transfer-amount"));
    }

    #[test]
    fn payload_runs_one_year() {
        let extra = r#", "transfer": {"kind": "flat", "amount": 10}, "seed": 7"#;
        let request = request_from_json(&payload_json(extra)).expect("valid payload");
        assert_eq!(request.seed, 7);

        let response = execute(request).expect("run succeeds");
        let year = &response.result.yearly[0];

        assert_eq!(year.year, 2020);
        assert_approx(year.population, 2.0);
        assert_approx(year.total_gross_income, 320.0);
        assert_approx(year.total_taxes, 55.0);
        assert_approx(year.total_net_income, 265.0);
        assert_approx(year.government_revenue, 55.0);
        assert_approx(year.government_deficit, 0.0);
        assert!(response.groups.is_none());
    }

    #[test]
    fn payload_accepts_means_tested_transfer_and_grouping() {
        let extra = concat!(
            r#", "transfer": {"kind": "means-tested", "amount": 40, "#,
            r#""incomeThreshold": 100, "withdrawalRate": 0.5}, "#,
            r#""groupBy": "sex", "metric": "transfers""#,
        );
        let request = request_from_json(&payload_json(extra)).expect("valid payload");

        let response = execute(request).expect("run succeeds");
        let groups = response.groups.expect("grouping requested");

        assert_eq!(groups.group_by, PersonGroup::Sex);
        assert_eq!(groups.values.len(), 2);
        // gross income 150 is 50 above the threshold
        assert_approx(groups.values["male"], 15.0);
        assert_approx(groups.values["female"], 15.0);
    }

    #[test]
    fn payload_without_transfer_rule_is_rejected() {
        let request = request_from_json(&payload_json("")).expect("payload parses");

        let err = execute(request).err().expect("transfer rule is required");
        assert!(matches!(err, SimError::MissingTransferRule));
    }

    #[test]
    fn payload_with_invalid_scenario_is_rejected() {
        let json =
            payload_json("").replace("\"income_tax_rate\": 0.1", "\"income_tax_rate\": 1.5");
        let err = request_from_json(&json).err().expect("rate out of range");
        assert!(err.contains("income_tax_rate"));
    }

    #[test]
    fn payload_with_unknown_scenario_key_is_rejected() {
        let json =
            payload_json("").replace("\"years\": 1,", "\"years\": 1, \"horizon\": 3,");
        let err = request_from_json(&json).err().expect("unknown key");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn missing_distribution_surfaces_as_lookup_error() {
        let json = payload_json(r#", "transfer": {"kind": "flat", "amount": 0}"#).replace(
            r#""capital_return": {"kind": "constant", "value": 0.02}"#,
            r#""other": {"kind": "constant", "value": 0}"#,
        );
        let request = request_from_json(&json).expect("valid payload");

        let err = execute(request).err().expect("capital_return is missing");
        assert_eq!(err.to_string(), "distribution 'capital_return' not registered");
    }

    #[test]
    fn response_serializes_camel_case() {
        let request =
            request_from_json(&payload_json(r#", "transfer": {"kind": "flat", "amount": 10}"#))
                .expect("valid payload");
        let response = execute(request).expect("run succeeds");

        let value = serde_json::to_value(&response).expect("serializable");

        assert_eq!(value["scenarioName"], "api");
        assert_eq!(value["seed"], DEFAULT_SEED);
        assert_eq!(value["yearly"][0]["totalGrossIncome"], 320.0);
        assert!(value.get("groups").is_none());
    }

    #[test]
    fn run_cli_reads_scenario_and_catalog_files() {
        let dir = std::env::temp_dir().join(format!("wealthsim-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let scenario_path = dir.join("scenario.json");
        let catalog_path = dir.join("distributions.json");
        fs::write(&scenario_path, SCENARIO_JSON).expect("write scenario");
        fs::write(&catalog_path, CATALOG_JSON).expect("write catalog");

        let output = run_cli([
            "wealthsim".to_string(),
            "--scenario".to_string(),
            scenario_path.display().to_string(),
            "--distributions".to_string(),
            catalog_path.display().to_string(),
            "--transfer-amount".to_string(),
            "10".to_string(),
            "--group-by".to_string(),
            "region".to_string(),
        ])
        .expect("cli run succeeds");
        fs::remove_dir_all(&dir).ok();

        assert!(output.contains("scenario api"));
        assert!(output.contains("2020"));
        assert!(output.contains("320.00"));
        assert!(output.contains("north"));
    }

    #[test]
    fn demo_scenario_runs_as_json() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
        let output = run_cli([
            "wealthsim".to_string(),
            "--scenario".to_string(),
            demos.join("baseline.yaml").display().to_string(),
            "--distributions".to_string(),
            demos.join("distributions.yaml").display().to_string(),
            "--transfer-rule".to_string(),
            "means-tested".to_string(),
            "--transfer-amount".to_string(),
            "2000".to_string(),
            "--income-threshold".to_string(),
            "25000".to_string(),
            "--withdrawal-rate".to_string(),
            "0.3".to_string(),
            "--format".to_string(),
            "json".to_string(),
        ])
        .expect("demo run succeeds");

        let value: serde_json::Value = serde_json::from_str(&output).expect("json output");
        assert_eq!(value["scenarioName"], "baseline");
        assert_eq!(value["referenceYear"], 2019);
        assert_eq!(value["yearly"].as_array().map(Vec::len), Some(5));
        assert_eq!(value["yearly"][4]["year"], 2024);
    }

    #[test]
    fn run_cli_reports_missing_files() {
        let err = run_cli([
            "wealthsim",
            "--scenario",
            "/nonexistent/scenario.yaml",
            "--distributions",
            "/nonexistent/distributions.yaml",
        ])
        .expect_err("files do not exist");
        assert!(err.contains("/nonexistent/scenario.yaml"));
    }
}
