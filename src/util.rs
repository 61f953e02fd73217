// Cell parsing, rounding and number formatting shared by the loader,
// the aggregations and the console reports.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Read a grid cell as a number. Thousands separators and padding are
/// tolerated; anything containing letters, or empty, is `None`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let cell = s?.trim();
    if cell.is_empty() || cell.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    cell.replace(',', "").parse().ok()
}

/// Sheet dates are `YYYY-MM-DD`; downloads from the grid use `DD-MM-YYYY`.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let cell = s?.trim();
    ["%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(cell, layout).ok())
}

/// Round to `decimals` places, halves away from zero.
pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

/// Arithmetic mean, 0 for an empty slice.
pub fn average(v: &[f64]) -> f64 {
    match v.len() {
        0 => 0.0,
        len => v.iter().sum::<f64>() / len as f64,
    }
}

/// Mean of the present values; `None` when there are none.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
    if present.is_empty() {
        None
    } else {
        Some(average(&present))
    }
}

/// Fixed decimals with `en` thousands separators: `1,234.50`.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (fixed.as_str(), None),
    };
    let mut out = whole
        .parse::<u64>()
        .unwrap_or(0)
        .to_formatted_string(&Locale::en);
    if let Some(f) = fraction {
        out.push('.');
        out.push_str(f);
    }
    // "-0.00" reads as noise on a report.
    if n < 0.0 && out.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.insert(0, '-');
    }
    out
}

/// Blank cells render as `---`, like the dashboard tables.
pub fn format_optional(n: Option<f64>, decimals: usize) -> String {
    match n {
        Some(v) => format_number(v, decimals),
        None => "---".to_string(),
    }
}

/// Plain cell text for CSV export: integers without a fraction, blanks empty.
pub fn format_cell(n: Option<f64>) -> String {
    match n {
        Some(v) if v.is_finite() && v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// Counts for console messages, e.g. `9,855 rows read`.
pub fn format_int<T: ToFormattedString>(n: T) -> String {
    n.to_formatted_string(&Locale::en)
}
