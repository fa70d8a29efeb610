use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Average calendar year length used for every age <-> date conversion.
pub const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("invalid input: {0}")]
    Input(String),
    /// The working-years trajectory never reaches `target`.
    #[error(
        "net worth {target:.0} is unreachable during working years (trajectory starts at {start:.0}, asymptote {floor:.0})"
    )]
    Domain { target: f64, start: f64, floor: f64 },
}

#[derive(Debug, Clone)]
pub struct ProfileParams {
    pub birth_date: NaiveDate,
    pub reference_date: NaiveDate,
    pub reference_net_worth: f64,
    pub working_salary: f64,
    pub working_spending: f64,
    pub working_return_rate: f64,
    pub retirement_age: f64,
    pub retired_salary: f64,
    pub retired_spending: f64,
    pub retired_return_rate: f64,
}

/// Validated, immutable parameter set the model evaluates against.
#[derive(Debug, Clone)]
pub struct FinancialProfile {
    params: ProfileParams,
    reference_age: f64,
}

impl FinancialProfile {
    pub fn new(params: ProfileParams) -> Result<Self, EstimateError> {
        for (name, value) in [
            ("net worth", params.reference_net_worth),
            ("working salary", params.working_salary),
            ("working spending", params.working_spending),
            ("retirement age", params.retirement_age),
            ("retired salary", params.retired_salary),
            ("retired spending", params.retired_spending),
        ] {
            if !value.is_finite() {
                return Err(EstimateError::Input(format!("{name} must be a finite number")));
            }
        }

        for (name, rate) in [
            ("working investment return", params.working_return_rate),
            ("retired investment return", params.retired_return_rate),
        ] {
            if !rate.is_finite() || rate == 0.0 {
                return Err(EstimateError::Input(format!(
                    "{name} must be a finite, non-zero rate"
                )));
            }
        }

        let reference_age = params
            .reference_date
            .signed_duration_since(params.birth_date)
            .num_days() as f64
            / DAYS_PER_YEAR;

        Ok(Self {
            params,
            reference_age,
        })
    }

    pub fn params(&self) -> &ProfileParams {
        &self.params
    }

    pub fn reference_age(&self) -> f64 {
        self.reference_age
    }

    pub fn retirement_age(&self) -> f64 {
        self.params.retirement_age
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.params.birth_date
    }

    pub fn working_net_flow(&self) -> f64 {
        self.params.working_salary - self.params.working_spending
    }

    pub fn retired_net_flow(&self) -> f64 {
        self.params.retired_salary - self.params.retired_spending
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub target_date: Option<NaiveDate>,
    pub target_worth: Option<f64>,
    pub curve_end_age: f64,
    pub curve_samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorthPoint {
    pub age: f64,
    pub worth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeEstimate {
    pub age: f64,
    /// `None` when the age maps outside the supported calendar range.
    pub date: Option<NaiveDate>,
    /// The inversion keeps the working trajectory, so ages past retirement
    /// only hold if the person keeps working.
    pub after_retirement: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgeLookup {
    Reached(AgeEstimate),
    Unreachable { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDateEstimate {
    pub date: NaiveDate,
    pub age: f64,
    pub worth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetWorthEstimate {
    pub worth: f64,
    pub estimate: AgeLookup,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateReport {
    pub birth_date: NaiveDate,
    pub reference_date: NaiveDate,
    pub reference_age: f64,
    pub retirement_age: f64,
    pub worth_at_retirement: f64,
    pub break_even_worth: f64,
    pub break_even_age: AgeLookup,
    pub target_date: Option<TargetDateEstimate>,
    pub target_worth: Option<TargetWorthEstimate>,
    pub curve: Vec<WorthPoint>,
}
