use crate::core::WorthPoint;

use super::format::{format_age, format_compact_currency};

#[derive(Debug, Clone, Copy)]
pub struct ChartConfig {
    pub width: usize,
    pub height: usize,
    /// Age drawn as a dotted vertical line, typically the retirement age.
    pub marker_age: Option<f64>,
}

struct Scale {
    min: f64,
    max: f64,
    cells: usize,
}

impl Scale {
    fn new(min: f64, max: f64, cells: usize) -> Self {
        let max = if max > min { max } else { min + 1.0 };
        Self { min, max, cells }
    }

    fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn cell(&self, value: f64) -> usize {
        let frac = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        (frac * (self.cells - 1) as f64).round() as usize
    }
}

/// Plots the worth series as a text line chart. Worth zero is drawn as a
/// horizontal axis whenever it is inside the plotted range.
pub fn render_line_chart(series: &[WorthPoint], config: &ChartConfig) -> String {
    let points: Vec<WorthPoint> = series
        .iter()
        .copied()
        .filter(|p| p.age.is_finite() && p.worth.is_finite())
        .collect();
    if points.is_empty() {
        return "(no finite values to chart)\n".to_string();
    }

    let width = config.width.max(2);
    let height = config.height.max(2);

    let (age_min, age_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.age), hi.max(p.age))
        });
    let (worth_min, worth_max) = points
        .iter()
        .fold((0.0f64, 0.0f64), |(lo, hi), p| (lo.min(p.worth), hi.max(p.worth)));

    let x = Scale::new(age_min, age_max, width);
    let y = Scale::new(worth_min, worth_max, height);
    // Row 0 is the top of the chart.
    let row = |worth: f64| height - 1 - y.cell(worth);

    let mut grid = vec![vec![' '; width]; height];

    let zero_row = row(0.0);
    for cell in grid[zero_row].iter_mut() {
        *cell = '-';
    }

    let marker_col = config
        .marker_age
        .filter(|age| x.contains(*age))
        .map(|age| x.cell(age));
    if let Some(col) = marker_col {
        for line in grid.iter_mut() {
            line[col] = ':';
        }
    }

    let mut prev: Option<(usize, usize)> = None;
    for point in &points {
        let col = x.cell(point.age);
        let r = row(point.worth);
        match prev {
            Some((prev_col, prev_row)) if col > prev_col => {
                let span = (col - prev_col) as f64;
                let at = |c: usize| {
                    let t = (c - prev_col) as f64 / span;
                    (prev_row as f64 + (r as f64 - prev_row as f64) * t).round() as usize
                };
                // Fill the vertical run so steep segments stay connected.
                for c in prev_col + 1..=col {
                    let (from, to) = (at(c - 1), at(c));
                    let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
                    for line in grid.iter_mut().take(hi + 1).skip(lo) {
                        line[c] = '*';
                    }
                }
            }
            _ => grid[r][col] = '*',
        }
        prev = Some((col, r));
    }

    let top_label = format_compact_currency(y.max);
    let bottom_label = format_compact_currency(y.min);
    let zero_label = format_compact_currency(0.0);
    let gutter = top_label
        .len()
        .max(bottom_label.len())
        .max(zero_label.len());

    let mut out = String::from("Net worth by age\n");
    for (idx, line) in grid.iter().enumerate() {
        let label = if idx == 0 {
            top_label.as_str()
        } else if idx == height - 1 {
            bottom_label.as_str()
        } else if idx == zero_row {
            zero_label.as_str()
        } else {
            ""
        };
        let body: String = line.iter().collect();
        out.push_str(&format!("{label:>gutter$} |{body}\n"));
    }
    out.push_str(&format!("{:>gutter$} +{}\n", "", "-".repeat(width)));
    out.push_str(&format!(
        "{:>gutter$}  {}\n",
        "",
        age_axis_labels(&x, width, marker_col.zip(config.marker_age))
    ));
    out
}

fn age_axis_labels(x: &Scale, width: usize, marker: Option<(usize, f64)>) -> String {
    let mut axis = vec![' '; width];
    // Labels that would touch or overlap an earlier one are skipped.
    let place = |col: usize, text: &str, axis: &mut [char]| {
        let len = text.chars().count();
        if len > width {
            return;
        }
        let start = col.min(width - len);
        let left_gap = start == 0 || axis[start - 1] == ' ';
        let right_gap = start + len == width || axis[start + len] == ' ';
        if !left_gap || !right_gap || axis[start..start + len].iter().any(|c| *c != ' ') {
            return;
        }
        for (offset, ch) in text.chars().enumerate() {
            axis[start + offset] = ch;
        }
    };

    let start_label = format_age(x.min);
    let end_label = format_age(x.max);
    place(0, &start_label, &mut axis);
    place(width.saturating_sub(end_label.len()), &end_label, &mut axis);
    if let Some((col, age)) = marker {
        let label = format_age(age);
        place(col.saturating_sub(label.len() / 2), &label, &mut axis);
    }

    axis.into_iter().collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_series(start: f64, end: f64, from: f64, to: f64, n: usize) -> Vec<WorthPoint> {
        (0..n)
            .map(|i| {
                let t = i as f64 / (n - 1) as f64;
                WorthPoint {
                    age: start + (end - start) * t,
                    worth: from + (to - from) * t,
                }
            })
            .collect()
    }

    fn plot_rows(chart: &str, height: usize) -> Vec<&str> {
        chart.lines().skip(1).take(height).collect()
    }

    #[test]
    fn chart_has_requested_dimensions() {
        let series = linear_series(30.0, 100.0, 0.0, 1_000_000.0, 50);
        let config = ChartConfig {
            width: 40,
            height: 10,
            marker_age: None,
        };
        let chart = render_line_chart(&series, &config);
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines[0], "Net worth by age");
        // title + rows + axis + labels
        assert_eq!(lines.len(), 1 + 10 + 2);
        let rows = plot_rows(&chart, 10);
        let row_width = rows[0].chars().count();
        assert!(rows.iter().all(|r| r.chars().count() == row_width));
        assert!(rows[0].starts_with("$1.0M |"));
    }

    #[test]
    fn increasing_series_runs_from_bottom_left_to_top_right() {
        let series = linear_series(30.0, 100.0, 0.0, 1_000_000.0, 20);
        let config = ChartConfig {
            width: 30,
            height: 8,
            marker_age: None,
        };
        let chart = render_line_chart(&series, &config);
        let rows = plot_rows(&chart, 8);

        assert!(rows[0].ends_with('*'));
        let bottom_body = rows[7].split('|').nth(1).expect("body");
        assert!(bottom_body.starts_with('*'));
    }

    #[test]
    fn zero_axis_is_drawn_for_mixed_sign_series() {
        let series = linear_series(30.0, 100.0, -500_000.0, 500_000.0, 20);
        let config = ChartConfig {
            width: 30,
            height: 9,
            marker_age: None,
        };
        let chart = render_line_chart(&series, &config);
        let rows = plot_rows(&chart, 9);
        assert!(rows.iter().any(|r| r.trim_start().starts_with("$0 |") && r.contains('-')));
        assert!(rows[8].trim_start().starts_with("-$500k"));
    }

    #[test]
    fn marker_and_age_labels_are_drawn() {
        let series = linear_series(30.0, 100.0, 0.0, 2_000_000.0, 40);
        let config = ChartConfig {
            width: 60,
            height: 10,
            marker_age: Some(65.0),
        };
        let chart = render_line_chart(&series, &config);
        assert!(chart.contains(':'));
        let labels = chart.lines().last().expect("label line");
        assert!(labels.contains("30.00"));
        assert!(labels.contains("65.00"));
        assert!(labels.contains("100.00"));
    }

    #[test]
    fn empty_or_non_finite_series_renders_placeholder() {
        let config = ChartConfig {
            width: 20,
            height: 5,
            marker_age: None,
        };
        assert!(render_line_chart(&[], &config).contains("no finite values"));
        let series = [WorthPoint {
            age: 40.0,
            worth: f64::NAN,
        }];
        assert!(render_line_chart(&series, &config).contains("no finite values"));
    }
}
