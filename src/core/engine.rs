use chrono::{Days, NaiveDate};

use super::types::{
    AgeEstimate, AgeLookup, DAYS_PER_YEAR, EstimateError, EstimateReport, FinancialProfile,
    ReportOptions, TargetDateEstimate, TargetWorthEstimate, WorthPoint,
};

/// Solution of `dW/dt = rate * W + net_flow` after `elapsed` years from
/// `start_worth`. `rate` is non-zero for every validated profile.
fn phase_worth(start_worth: f64, net_flow: f64, rate: f64, elapsed: f64) -> f64 {
    let offset = net_flow / rate;
    (start_worth + offset) * (rate * elapsed).exp() - offset
}

pub fn working_phase_worth(profile: &FinancialProfile, age: f64) -> f64 {
    let params = profile.params();
    phase_worth(
        params.reference_net_worth,
        profile.working_net_flow(),
        params.working_return_rate,
        age - profile.reference_age(),
    )
}

pub fn retired_phase_worth(profile: &FinancialProfile, age: f64) -> f64 {
    let params = profile.params();
    let retirement_age = profile.retirement_age();
    phase_worth(
        working_phase_worth(profile, retirement_age),
        profile.retired_net_flow(),
        params.retired_return_rate,
        age - retirement_age,
    )
}

/// Piecewise worth curve. Not floored at zero: below zero the debt compounds
/// at the return rate.
pub fn worth_at_age(profile: &FinancialProfile, age: f64) -> f64 {
    if age <= profile.retirement_age() {
        working_phase_worth(profile, age)
    } else {
        retired_phase_worth(profile, age)
    }
}

/// Age at which the working-years trajectory reaches `target`.
///
/// Only the working branch is inverted; the result may lie past retirement,
/// in which case it answers "if still working".
pub fn age_at_worth(profile: &FinancialProfile, target: f64) -> Result<f64, EstimateError> {
    let params = profile.params();
    let rate = params.working_return_rate;
    let offset = profile.working_net_flow() / rate;
    let ratio = (target + offset) / (params.reference_net_worth + offset);

    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(EstimateError::Domain {
            target,
            start: params.reference_net_worth,
            floor: -offset,
        });
    }

    Ok(ratio.ln() / rate + profile.reference_age())
}

/// Worth at which retirement returns exactly cover net retirement spending.
pub fn break_even_worth(profile: &FinancialProfile) -> f64 {
    -profile.retired_net_flow() / profile.params().retired_return_rate
}

pub fn break_even_age(profile: &FinancialProfile) -> Result<f64, EstimateError> {
    age_at_worth(profile, break_even_worth(profile))
}

pub fn age_to_date(profile: &FinancialProfile, age: f64) -> Result<NaiveDate, EstimateError> {
    let days = (age * DAYS_PER_YEAR).round();
    if !days.is_finite() {
        return Err(EstimateError::Input(format!("age {age} is not a finite number")));
    }

    let birth_date = profile.birth_date();
    let shifted = if days >= 0.0 {
        birth_date.checked_add_days(Days::new(days as u64))
    } else {
        birth_date.checked_sub_days(Days::new((-days) as u64))
    };
    shifted.ok_or_else(|| {
        EstimateError::Input(format!("age {age:.2} is outside the calendar range"))
    })
}

pub fn date_to_age(profile: &FinancialProfile, date: NaiveDate) -> f64 {
    date.signed_duration_since(profile.birth_date()).num_days() as f64 / DAYS_PER_YEAR
}

/// Evenly spaced samples over `[start_age, end_age]`, with the retirement age
/// added when it falls inside the range so the phase change is visible.
pub fn sample_worth_curve(
    profile: &FinancialProfile,
    start_age: f64,
    end_age: f64,
    samples: usize,
) -> Vec<WorthPoint> {
    let point = |age: f64| WorthPoint {
        age,
        worth: worth_at_age(profile, age),
    };

    if samples < 2 || end_age <= start_age || !(end_age - start_age).is_finite() {
        return vec![point(start_age)];
    }

    let step = (end_age - start_age) / (samples - 1) as f64;
    let mut ages: Vec<f64> = (0..samples)
        .map(|i| start_age + step * i as f64)
        .collect();
    ages[samples - 1] = end_age;

    let retirement_age = profile.retirement_age();
    if retirement_age > start_age
        && retirement_age < end_age
        && !ages.iter().any(|age| (age - retirement_age).abs() < 1e-9)
    {
        let idx = ages.partition_point(|age| *age < retirement_age);
        ages.insert(idx, retirement_age);
    }

    ages.into_iter().map(point).collect()
}

fn lookup_age(profile: &FinancialProfile, age: Result<f64, EstimateError>) -> AgeLookup {
    match age {
        Ok(age) => {
            let date = age_to_date(profile, age)
                .map_err(|err| tracing::debug!(error = %err, "age has no calendar date"))
                .ok();
            AgeLookup::Reached(AgeEstimate {
                age,
                date,
                after_retirement: age > profile.retirement_age(),
            })
        }
        Err(err) => {
            tracing::debug!(error = %err, "age lookup unreachable");
            AgeLookup::Unreachable {
                error: err.to_string(),
            }
        }
    }
}

/// Computes every reported figure. Lookups that fail are recorded in their
/// own field and never prevent the other figures.
pub fn build_report(profile: &FinancialProfile, options: &ReportOptions) -> EstimateReport {
    let params = profile.params();
    let reference_age = profile.reference_age();
    tracing::debug!(
        reference_age,
        retirement_age = profile.retirement_age(),
        "building net worth report"
    );

    let worth_at_retirement = worth_at_age(profile, profile.retirement_age());
    let break_even = break_even_worth(profile);
    let break_even_lookup = lookup_age(profile, break_even_age(profile));
    tracing::debug!(worth_at_retirement, break_even, "evaluated model");

    let target_date = options.target_date.map(|date| {
        let age = date_to_age(profile, date);
        TargetDateEstimate {
            date,
            age,
            worth: worth_at_age(profile, age),
        }
    });

    let target_worth = options.target_worth.map(|worth| TargetWorthEstimate {
        worth,
        estimate: lookup_age(profile, age_at_worth(profile, worth)),
    });

    EstimateReport {
        birth_date: params.birth_date,
        reference_date: params.reference_date,
        reference_age,
        retirement_age: profile.retirement_age(),
        worth_at_retirement,
        break_even_worth: break_even,
        break_even_age: break_even_lookup,
        target_date,
        target_worth,
        curve: sample_worth_curve(
            profile,
            reference_age,
            options.curve_end_age,
            options.curve_samples,
        ),
    }
}
