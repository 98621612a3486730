//! Daily dose parsing for antibiotic prescriptions.
//!
//! Doctors write the dosage rule (`aturan pakai`) as free text. Three shapes are recognised,
//! tried in this order:
//!
//! - frequency × dose: `3x500mg`, `1 x 0,5 gr`
//! - dose every N hours: `330mg/8jam`, `1gr / 12 jam`
//! - one-off dose: `1gr ekstra`, `500mg extra`
//!
//! Anything else is passed through untouched.

use regex::Regex;
use std::sync::LazyLock;

static FREQUENCY_DOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*x\s*(\d+(?:[.,]\d+)?)\s*([a-z]+)")
        .expect("frequency pattern is valid")
});

static DOSE_INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*([a-z]+)\s*/\s*(\d+)\s*jam")
        .expect("interval pattern is valid")
});

static DOSE_EXTRA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*([a-z]+)\s*(?:ekstra|extra)")
        .expect("extra pattern is valid")
});

static ANY_DOSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+(?:[.,]\d+)?\s*x\s*\d+(?:[.,]\d+)?\s*[a-z]+|\d+(?:[.,]\d+)?\s*[a-z]+\s*/\s*\d+\s*jam|\d+(?:[.,]\d+)?\s*[a-z]+\s*(?:ekstra|extra))",
    )
    .expect("suggestion pattern is valid")
});

/// A parsed dosage rule.
#[derive(Clone, Debug, PartialEq)]
pub struct DosageRegimen {
    /// Administrations per day.
    pub frequency: f64,
    /// Amount per administration, in `unit`.
    pub dose: f64,
    /// Unit as written by the prescriber (`mg`, `gr`, `ml`, ...).
    pub unit: String,
}

/// Outcome of matching a dosage rule.
enum Match {
    Regimen(DosageRegimen),
    /// The interval shape matched but with a zero interval; the rule is shown as written.
    ZeroInterval,
    None,
}

impl DosageRegimen {
    /// Parses a dosage rule, returning `None` when no recognised shape is present.
    pub fn parse(input: &str) -> Option<Self> {
        match match_regimen(input.trim()) {
            Match::Regimen(regimen) => Some(regimen),
            Match::ZeroInterval | Match::None => None,
        }
    }

    /// Total amount per day, in `unit`.
    pub fn total(&self) -> f64 {
        self.frequency * self.dose
    }

    /// Total per day with mg/gr normalisation.
    ///
    /// Milligram totals of 1000 or more are shown in grams; gram totals below 1 are shown in
    /// milligrams. Other units are never converted.
    pub fn total_display(&self) -> String {
        let total = self.total();
        let unit = self.unit.to_lowercase();
        if unit == "mg" && total >= 1000.0 {
            format!("{} gr", format_number(total / 1000.0))
        } else if unit == "gr" && total < 1.0 {
            format!("{} mg", format_number(total * 1000.0))
        } else {
            format!("{} {}", format_number(total), self.unit)
        }
    }

    /// Three-line display: frequency, single dose, daily total.
    pub fn display(&self) -> String {
        format!(
            "{} x\n{} {} =\n{}",
            format_number(self.frequency),
            format_number(self.dose),
            self.unit,
            self.total_display()
        )
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok()
}

fn match_regimen(input: &str) -> Match {
    if let Some(caps) = FREQUENCY_DOSE.captures(input) {
        return match (parse_decimal(&caps[1]), parse_decimal(&caps[2])) {
            (Some(frequency), Some(dose)) => Match::Regimen(DosageRegimen {
                frequency,
                dose,
                unit: caps[3].to_string(),
            }),
            _ => Match::None,
        };
    }

    if let Some(caps) = DOSE_INTERVAL.captures(input) {
        let interval: u32 = caps[3].parse().unwrap_or(0);
        if interval == 0 {
            return Match::ZeroInterval;
        }
        return match parse_decimal(&caps[1]) {
            Some(dose) => Match::Regimen(DosageRegimen {
                frequency: 24.0 / f64::from(interval),
                dose,
                unit: caps[2].to_string(),
            }),
            None => Match::None,
        };
    }

    if let Some(caps) = DOSE_EXTRA.captures(input) {
        return match parse_decimal(&caps[1]) {
            Some(dose) => Match::Regimen(DosageRegimen {
                frequency: 1.0,
                dose,
                unit: caps[2].to_string(),
            }),
            None => Match::None,
        };
    }

    Match::None
}

/// Formats a dosage rule for display in reports.
///
/// Missing or blank rules render as `-`; unrecognised rules are returned unchanged.
pub fn format_daily_dose(input: Option<&str>) -> String {
    let Some(raw) = input.filter(|s| !s.trim().is_empty()) else {
        return "-".to_string();
    };
    match DosageRegimen::parse(raw) {
        Some(regimen) => regimen.display(),
        None => raw.to_string(),
    }
}

/// Finds the first dosage expression inside a line of free text.
pub fn extract_dosage_suggestion(line: &str) -> Option<String> {
    ANY_DOSAGE
        .captures(line)
        .map(|caps| caps[1].to_string())
}

/// Formats a number without a trailing `.0` and without binary floating-point noise.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1e10).round() / 1e10;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}
