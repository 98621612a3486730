//! Patient-facing display helpers: age and body weight as shown in PPRA messages and reports.

use chrono::{Datelike, Months, NaiveDate};

/// Parses a date column from the hospital database.
///
/// The legacy schema stores unknown dates as `0000-00-00`; these and blank values are treated
/// as missing. Datetime strings are accepted and truncated to their date part.
pub fn parse_khanza_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.starts_with("0000-00-00") {
        return None;
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Age split into whole years, remaining months and remaining days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Age {
    pub years: u32,
    pub months: u32,
    pub days: i64,
}

impl Age {
    /// Computes the age on `today` of someone born on `birth`.
    ///
    /// Returns `None` for birth dates in the future.
    pub fn between(birth: NaiveDate, today: NaiveDate) -> Option<Self> {
        if birth > today {
            return None;
        }

        let mut total_months = (today.year() - birth.year()) * 12 + today.month() as i32
            - birth.month() as i32;
        let mut anchor = birth.checked_add_months(Months::new(total_months.max(0) as u32))?;
        if anchor > today {
            total_months -= 1;
            anchor = birth.checked_add_months(Months::new(total_months.max(0) as u32))?;
        }
        let total_months = total_months.max(0) as u32;

        Some(Self {
            years: total_months / 12,
            months: total_months % 12,
            days: (today - anchor).num_days(),
        })
    }

    /// Indonesian description used in chairman approval messages.
    ///
    /// Shows the two most significant non-zero units: `2 tahun 3 bulan`, `5 bulan 12 hari`,
    /// `9 hari`.
    pub fn describe(&self) -> String {
        if self.years > 0 {
            let mut out = format!("{} tahun", self.years);
            if self.months > 0 {
                out.push_str(&format!(" {} bulan", self.months));
            }
            out
        } else if self.months > 0 {
            let mut out = format!("{} bulan", self.months);
            if self.days > 0 {
                out.push_str(&format!(" {} hari", self.days));
            }
            out
        } else {
            format!("{} hari", self.days)
        }
    }
}

/// Age description, or `-` when the birth date is missing.
pub fn age_description(birth: Option<NaiveDate>, today: NaiveDate) -> String {
    birth
        .and_then(|b| Age::between(b, today))
        .map(|age| age.describe())
        .unwrap_or_else(|| "-".to_string())
}

/// Whole years of age, `0` when unknown.
pub fn age_in_years(birth: Option<NaiveDate>, today: NaiveDate) -> u32 {
    birth
        .and_then(|b| Age::between(b, today))
        .map(|age| age.years)
        .unwrap_or(0)
}

/// Body weight with one decimal, or `-` when no positive weight was recorded.
pub fn weight_description(weight_kg: Option<f64>) -> String {
    match weight_kg {
        Some(w) if w > 0.0 => format!("{w:.1} kg"),
        _ => "-".to_string(),
    }
}
