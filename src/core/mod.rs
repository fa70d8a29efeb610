mod engine;
mod types;

pub use engine::{
    age_at_worth, age_to_date, break_even_age, break_even_worth, build_report, date_to_age,
    retired_phase_worth, sample_worth_curve, working_phase_worth, worth_at_age,
};
pub use types::{
    AgeEstimate, AgeLookup, DAYS_PER_YEAR, EstimateError, EstimateReport, FinancialProfile,
    ProfileParams, ReportOptions, TargetDateEstimate, TargetWorthEstimate, WorthPoint,
};
