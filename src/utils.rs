use crate::error::{BudgetError, Result};
use chrono::{Datelike, NaiveDate};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, written `YYYY-MM` on the wire and in history maps.
///
/// Ordering is chronological, which is what the rollover walk relies on when
/// comparing against the configured start month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(BudgetError::InvalidMonthKey(format!(
                "{:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month before this one, rolling January back to December.
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Number of calendar days in the month (28-31).
    pub fn days_in_month(&self) -> u32 {
        let next = self.next();
        match (
            NaiveDate::from_ymd_opt(self.year, self.month, 1),
            NaiveDate::from_ymd_opt(next.year, next.month, 1),
        ) {
            (Some(first), Some(following)) => following.signed_duration_since(first).num_days() as u32,
            _ => 31,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self> {
        parse_month_key(s)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = BudgetError;

    fn try_from(value: String) -> Result<Self> {
        parse_month_key(&value)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl JsonSchema for MonthKey {
    fn schema_name() -> String {
        "MonthKey".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <String as JsonSchema>::json_schema(gen)
    }
}

/// Parses a month key in the format "YYYY-MM".
pub fn parse_month_key(key: &str) -> Result<MonthKey> {
    let bytes = key.as_bytes();
    let digits_ok = |range: &[u8]| range.iter().all(u8::is_ascii_digit);
    if bytes.len() != 7 || bytes[4] != b'-' || !digits_ok(&bytes[..4]) || !digits_ok(&bytes[5..]) {
        return Err(BudgetError::InvalidMonthKey(key.to_string()));
    }

    let date = NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d")
        .map_err(|_| BudgetError::InvalidMonthKey(key.to_string()))?;

    Ok(MonthKey::from_date(date))
}

/// Signed number of months from `start` to `end`.
pub fn months_between(start: MonthKey, end: MonthKey) -> i32 {
    let year_diff = end.year - start.year;
    let month_diff = end.month as i32 - start.month as i32;
    year_diff * 12 + month_diff
}

pub fn validate_day_of_month(day: u32) -> bool {
    (1..=31).contains(&day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_key() {
        let key = parse_month_key("2024-03").unwrap();
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 3);
        assert_eq!(key.to_string(), "2024-03");

        assert!(parse_month_key("2024-13").is_err());
        assert!(parse_month_key("2024-3").is_err());
        assert!(parse_month_key("24-03").is_err());
        assert!(parse_month_key("2024/03").is_err());
        assert!(parse_month_key("").is_err());
    }

    #[test]
    fn test_parse_month_key_rejects_surrounding_whitespace() {
        assert!(parse_month_key(" 2024-03").is_err());
        assert!(parse_month_key("2024-03 ").is_err());
        assert!(parse_month_key(" 2024-03 ").is_err());
        assert!(parse_month_key("2024-03\n").is_err());
        assert!(parse_month_key("2024- 3").is_err());
        assert!(" 2024-03 ".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(MonthKey::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(MonthKey::new(2023, 2).unwrap().days_in_month(), 28);
        assert_eq!(MonthKey::new(2024, 4).unwrap().days_in_month(), 30);
        assert_eq!(MonthKey::new(2024, 12).unwrap().days_in_month(), 31);
    }

    #[test]
    fn test_prev_rolls_back_year() {
        let jan = MonthKey::new(2024, 1).unwrap();
        assert_eq!(jan.prev(), MonthKey::new(2023, 12).unwrap());

        let jun = MonthKey::new(2024, 6).unwrap();
        assert_eq!(jun.prev(), MonthKey::new(2024, 5).unwrap());
    }

    #[test]
    fn test_next_rolls_forward_year() {
        let dec = MonthKey::new(2023, 12).unwrap();
        assert_eq!(dec.next(), MonthKey::new(2024, 1).unwrap());
        assert_eq!(dec.next().prev(), dec);
    }

    #[test]
    fn test_ordering_is_chronological() {
        let a: MonthKey = "2023-12".parse().unwrap();
        let b: MonthKey = "2024-01".parse().unwrap();
        let c: MonthKey = "2024-10".parse().unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_months_between() {
        let start: MonthKey = "2023-11".parse().unwrap();
        let end: MonthKey = "2024-02".parse().unwrap();
        assert_eq!(months_between(start, end), 3);
        assert_eq!(months_between(end, start), -3);
        assert_eq!(months_between(start, start), 0);
    }

    #[test]
    fn test_serde_as_string() {
        let key: MonthKey = "2024-07".parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2024-07\"");

        let back: MonthKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        assert!(serde_json::from_str::<MonthKey>("\"July\"").is_err());
    }
}
