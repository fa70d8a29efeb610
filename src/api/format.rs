/// `$1,234,568` style, rounded to whole dollars. Negative values keep the
/// sign in front of the currency symbol.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }

    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(&digits))
}

/// Short axis label: `$1.5M`, `$250k`, `-$40k`, `$900`.
pub fn format_compact_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    let body = if magnitude >= 1e9 {
        format!("{:.1}B", magnitude / 1e9)
    } else if magnitude >= 1e6 {
        format!("{:.1}M", magnitude / 1e6)
    } else if magnitude >= 1e3 {
        format!("{:.0}k", magnitude / 1e3)
    } else {
        format!("{magnitude:.0}")
    };
    format!("{sign}${body}")
}

pub fn format_age(age: f64) -> String {
    format!("{age:.2}")
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
