use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::core::{
    AgeLookup, EstimateError, EstimateReport, FinancialProfile, ProfileParams, ReportOptions,
    build_report,
};

mod chart;
mod format;

pub use chart::{ChartConfig, render_line_chart};
pub use format::{format_age, format_compact_currency, format_currency};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const DEFAULT_WORKING_RETURN: f64 = 0.06;
const DEFAULT_RETIRED_RETURN: f64 = 0.04;
const DEFAULT_RETIRED_SALARY: f64 = 0.0;
const DEFAULT_CHART_END_AGE: f64 = 100.0;
const DEFAULT_CHART_WIDTH: usize = 72;
const DEFAULT_CHART_HEIGHT: usize = 20;
const DEFAULT_CURVE_SAMPLES: usize = 200;
const MAX_API_CURVE_SAMPLES: usize = 10_000;

const ABOUT: &str = "Estimates net worth over time from current net worth, income, spending, retirement age and investment returns";

const LONG_ABOUT: &str = "\
Estimates net worth over time from current net worth, income, spending,
retirement age and investment returns.

Output:
  - estimated net worth at retirement and on the target date (if given)
  - the break-even net worth, at which retirement spending is covered by returns alone
  - the estimated age at which the break-even worth and the target worth (if given) are reached
  - a chart of estimated net worth by age

Results are not a guarantee of future performance.

Assumptions:
  - Investment returns are constant; there is no market volatility. Choose rates accordingly.
  - Inflation is not modeled. Account for it in the return rates.
  - All money not spent is invested and earns the return rate.
  - Returns apply to total net worth, not gross assets. Heavy leverage makes this inaccurate.";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "worth_estimator",
    about = ABOUT,
    long_about = LONG_ABOUT
)]
struct Cli {
    #[arg(short = 'b', long, value_parser = parse_date, help = "Birth date, YYYY-MM-DD")]
    birthdate: NaiveDate,
    #[arg(short = 'w', long, allow_negative_numbers = true, help = "Current net worth")]
    net_worth: f64,
    #[arg(
        long,
        visible_alias = "wd",
        value_parser = parse_date,
        help = "Date of the current net worth, YYYY-MM-DD. Defaults to today"
    )]
    net_worth_date: Option<NaiveDate>,
    #[arg(
        long,
        visible_alias = "wi",
        allow_negative_numbers = true,
        help = "Average yearly working salary"
    )]
    working_salary: f64,
    #[arg(
        long,
        visible_alias = "wr",
        default_value_t = DEFAULT_WORKING_RETURN,
        allow_negative_numbers = true,
        help = "Yearly investment return during working years, e.g. 0.06"
    )]
    working_investment_return: f64,
    #[arg(
        long,
        visible_alias = "ws",
        allow_negative_numbers = true,
        help = "Average yearly working spending"
    )]
    working_spending: f64,
    #[arg(short = 'r', long, help = "Retirement age in years")]
    retirement_age: f64,
    #[arg(
        long,
        visible_alias = "ri",
        default_value_t = DEFAULT_RETIRED_SALARY,
        allow_negative_numbers = true,
        help = "Average yearly retirement income"
    )]
    retired_salary: f64,
    #[arg(
        long,
        visible_alias = "rr",
        default_value_t = DEFAULT_RETIRED_RETURN,
        allow_negative_numbers = true,
        help = "Yearly investment return during retirement, e.g. 0.04"
    )]
    retired_investment_return: f64,
    #[arg(
        long,
        visible_alias = "rs",
        allow_negative_numbers = true,
        help = "Average yearly retirement spending"
    )]
    retired_spending: f64,
    #[arg(
        long,
        visible_alias = "td",
        value_parser = parse_date,
        help = "Date to print the estimated net worth for, YYYY-MM-DD"
    )]
    target_date: Option<NaiveDate>,
    #[arg(
        long,
        visible_alias = "tw",
        allow_negative_numbers = true,
        help = "Net worth to print the estimated age and date for"
    )]
    target_worth: Option<f64>,
    #[arg(
        long,
        default_value_t = DEFAULT_CHART_END_AGE,
        help = "Last age shown on the chart"
    )]
    chart_end_age: f64,
    #[arg(long, default_value_t = DEFAULT_CHART_WIDTH, help = "Chart width in characters")]
    chart_width: usize,
    #[arg(long, default_value_t = DEFAULT_CHART_HEIGHT, help = "Chart height in lines")]
    chart_height: usize,
    #[arg(
        long,
        default_value_t = DEFAULT_CURVE_SAMPLES,
        help = "Number of ages sampled for the curve"
    )]
    curve_samples: usize,
    #[arg(long, help = "Skip the chart")]
    no_chart: bool,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EstimatePayload {
    birthdate: Option<String>,
    net_worth: Option<f64>,
    net_worth_date: Option<String>,
    working_salary: Option<f64>,
    working_investment_return: Option<f64>,
    working_spending: Option<f64>,
    retirement_age: Option<f64>,
    retired_salary: Option<f64>,
    retired_investment_return: Option<f64>,
    retired_spending: Option<f64>,
    target_date: Option<String>,
    target_worth: Option<f64>,
    chart_end_age: Option<f64>,
    curve_samples: Option<usize>,
}

#[derive(Debug)]
struct ApiRequest {
    profile: FinancialProfile,
    options: ReportOptions,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{value}', expected YYYY-MM-DD: {e}"))
}

fn build_profile(cli: &Cli, today: NaiveDate) -> Result<FinancialProfile, EstimateError> {
    FinancialProfile::new(ProfileParams {
        birth_date: cli.birthdate,
        reference_date: cli.net_worth_date.unwrap_or(today),
        reference_net_worth: cli.net_worth,
        working_salary: cli.working_salary,
        working_spending: cli.working_spending,
        working_return_rate: cli.working_investment_return,
        retirement_age: cli.retirement_age,
        retired_salary: cli.retired_salary,
        retired_spending: cli.retired_spending,
        retired_return_rate: cli.retired_investment_return,
    })
}

fn report_options(cli: &Cli) -> Result<ReportOptions, String> {
    if !cli.chart_end_age.is_finite() {
        return Err("--chart-end-age must be a finite number".to_string());
    }
    if cli.curve_samples < 2 {
        return Err("--curve-samples must be >= 2".to_string());
    }

    Ok(ReportOptions {
        target_date: cli.target_date,
        target_worth: cli.target_worth,
        curve_end_age: cli.chart_end_age,
        curve_samples: cli.curve_samples,
    })
}

fn render_estimate_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.to_string(),
        None => "date out of calendar range".to_string(),
    }
}

fn render_age_lookup(lookup: &AgeLookup) -> String {
    match lookup {
        AgeLookup::Reached(estimate) => {
            let suffix = if estimate.after_retirement {
                " (after retirement, if still working)"
            } else {
                ""
            };
            format!(
                "{} / {}{suffix}",
                format_age(estimate.age),
                render_estimate_date(estimate.date)
            )
        }
        AgeLookup::Unreachable { error } => format!("unreachable ({error})"),
    }
}

fn render_report(report: &EstimateReport) -> String {
    let mut lines = vec![format!(
        "Est worth at retirement: {}",
        format_currency(report.worth_at_retirement)
    )];
    if let Some(target) = &report.target_date {
        lines.push(format!(
            "Est worth on {}: {}",
            target.date,
            format_currency(target.worth)
        ));
    }
    lines.push(String::new());

    lines.push(format!(
        "Break-even amount: {}",
        format_currency(report.break_even_worth)
    ));
    lines.push(format!(
        "Est break-even age: {}",
        render_age_lookup(&report.break_even_age)
    ));
    if let Some(target) = &report.target_worth {
        let lookup = match &target.estimate {
            // "(if still working)" is already part of the label.
            AgeLookup::Reached(estimate) => {
                format!(
                    "{} / {}",
                    format_age(estimate.age),
                    render_estimate_date(estimate.date)
                )
            }
            other => render_age_lookup(other),
        };
        lines.push(format!(
            "Est age at {} (if still working): {lookup}",
            format_currency(target.worth)
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Parses the command line, prints the report and, unless disabled, the chart.
pub fn run_cli<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let today = Local::now().date_naive();
    let profile = build_profile(&cli, today).map_err(|e| e.to_string())?;
    let options = report_options(&cli)?;
    tracing::debug!(
        reference_age = profile.reference_age(),
        "profile constructed"
    );

    let report = build_report(&profile, &options);

    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("failed to serialize report: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    print!("{}", render_report(&report));
    if !cli.no_chart {
        let config = ChartConfig {
            width: cli.chart_width,
            height: cli.chart_height,
            marker_age: Some(report.retirement_age),
        };
        println!();
        print!("{}", render_line_chart(&report.curve, &config));
    }
    Ok(())
}

/// Installs the stderr subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "net worth estimator listening");
    println!("Net worth estimator listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app()).await
}

fn app() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/estimate",
            get(estimate_get_handler).post(estimate_post_handler),
        )
        .fallback(not_found_handler)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn estimate_get_handler(
    payload: Result<Query<EstimatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => estimate_handler_impl(payload),
        Err(rejection) => rejected_payload(&rejection.body_text()),
    }
}

async fn estimate_post_handler(
    payload: Result<Json<EstimatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => estimate_handler_impl(payload),
        Err(rejection) => rejected_payload(&rejection.body_text()),
    }
}

fn rejected_payload(msg: &str) -> Response {
    tracing::info!(error = %msg, "malformed estimate payload");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn estimate_handler_impl(payload: EstimatePayload) -> Response {
    let request = match api_request_from_payload(payload, Local::now().date_naive()) {
        Ok(request) => request,
        Err(msg) => {
            tracing::info!(error = %msg, "rejected estimate request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let report = build_report(&request.profile, &request.options);
    tracing::info!(
        reference_age = report.reference_age,
        retirement_age = report.retirement_age,
        points = report.curve.len(),
        "served estimate"
    );
    json_response(StatusCode::OK, report)
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
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
fn api_request_from_json(json: &str, today: NaiveDate) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<EstimatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload, today)
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("missing required field '{field}'"))
}

fn api_request_from_payload(
    payload: EstimatePayload,
    today: NaiveDate,
) -> Result<ApiRequest, String> {
    let cli = Cli {
        birthdate: parse_date(&required(payload.birthdate, "birthdate")?)?,
        net_worth: required(payload.net_worth, "netWorth")?,
        net_worth_date: payload.net_worth_date.as_deref().map(parse_date).transpose()?,
        working_salary: required(payload.working_salary, "workingSalary")?,
        working_investment_return: payload
            .working_investment_return
            .unwrap_or(DEFAULT_WORKING_RETURN),
        working_spending: required(payload.working_spending, "workingSpending")?,
        retirement_age: required(payload.retirement_age, "retirementAge")?,
        retired_salary: payload.retired_salary.unwrap_or(DEFAULT_RETIRED_SALARY),
        retired_investment_return: payload
            .retired_investment_return
            .unwrap_or(DEFAULT_RETIRED_RETURN),
        retired_spending: required(payload.retired_spending, "retiredSpending")?,
        target_date: payload.target_date.as_deref().map(parse_date).transpose()?,
        target_worth: payload.target_worth,
        chart_end_age: payload.chart_end_age.unwrap_or(DEFAULT_CHART_END_AGE),
        chart_width: DEFAULT_CHART_WIDTH,
        chart_height: DEFAULT_CHART_HEIGHT,
        curve_samples: payload
            .curve_samples
            .unwrap_or(DEFAULT_CURVE_SAMPLES)
            .min(MAX_API_CURVE_SAMPLES),
        no_chart: false,
        json: false,
    };

    let profile = build_profile(&cli, today).map_err(|e| e.to_string())?;
    let options = report_options(&cli)?;
    Ok(ApiRequest { profile, options })
}
