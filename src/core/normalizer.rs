//! Converts raw station fields into metric display values.

use crate::core::catalog::Rule;
use crate::core::error::Result;
use crate::core::payload::WeatherPayload;

/// Kilometres in one mile.
pub const KM_IN_MILE: f64 = 1.609_344;

/// Millimetres in one inch.
pub const MM_IN_INCH: f64 = 25.4;

/// Inches of mercury in one hectopascal.
pub const INHG_IN_HPA: f64 = 0.029_529_983_071_445;

/// Converted value with an optional human-readable annotation.
#[derive(Clone, PartialEq, Debug)]
pub struct Normalized {
    pub value: f64,
    pub annotation: Option<String>,
}

impl Normalized {
    fn plain(value: f64) -> Self {
        Self {
            value,
            annotation: None,
        }
    }
}

/// Converts the source field using the rule registered for it in the catalog.
pub fn normalize(source_field: &str, payload: &WeatherPayload) -> Result<Normalized> {
    apply(Rule::of(source_field), source_field, payload)
}

/// Converts the source field with the specified rule.
///
/// A missing or unparsable companion field only drops the annotation.
pub fn apply(rule: Rule, source_field: &str, payload: &WeatherPayload) -> Result<Normalized> {
    let value = payload.parse(source_field)?;

    Ok(match rule {
        Rule::Temperature => Normalized::plain(round_half_up(fahrenheit_to_celsius(value), 2)),
        Rule::UvIndex => Normalized {
            value,
            annotation: Some(uv_label(value).to_string()),
        },
        Rule::Pressure => Normalized::plain(round_half_up(inhg_to_hpa(value), 2)),
        Rule::WindSpeed => Normalized::plain(round_half_up(mph_to_kmh(value), 2)),
        Rule::WindGust { daily_max } => Normalized {
            value: round_half_up(mph_to_kmh(value), 2),
            annotation: payload
                .parse(daily_max)
                .ok()
                .map(|mph| format!("Max: {} km/u", format_decimal(round_half_up(mph_to_kmh(mph), 2)))),
        },
        Rule::Rainfall { monthly } => Normalized {
            value: inches_to_mm(value),
            annotation: payload
                .parse(monthly)
                .ok()
                .map(|inches| format!("Month: {:.1} mm", round_half_up(inches_to_mm(inches), 1))),
        },
        Rule::Passthrough => Normalized::plain(value),
    })
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Truncated to two decimals, the way the station console shows it.
pub fn inhg_to_hpa(inhg: f64) -> f64 {
    (inhg / INHG_IN_HPA * 100.0).floor() / 100.0
}

pub fn mph_to_kmh(mph: f64) -> f64 {
    mph * KM_IN_MILE
}

pub fn inches_to_mm(inches: f64) -> f64 {
    inches * MM_IN_INCH
}

/// Tier label of the UV index.
pub fn uv_label(index: f64) -> &'static str {
    match index {
        index if index <= 0.0 => "None",
        index if index <= 2.0 => "Very Low",
        index if index <= 4.0 => "Low",
        index if index <= 6.0 => "Moderate",
        index if index <= 8.0 => "High",
        _ => "Very High",
    }
}

/// Rounds half up: `floor(x * 10^n + 0.5) / 10^n`.
pub fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

/// Formats a number keeping at least one decimal, so that `13.0` is not shown as `13`.
fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
