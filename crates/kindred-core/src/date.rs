//! Partial calendar dates.
//!
//! Historical records rarely carry full precision, so a date may stop at the
//! year (`1758`), the month (`1758-04`) or the day (`1758-04-09`).

use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Anchored pattern accepted for every date-like field.
pub const DATE_PATTERN: &str =
  r"^\d{4}(-(0[1-9]|1[0-2])(-(0[1-9]|[12]\d|3[01]))?)?$";

static DATE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(DATE_PATTERN).expect("valid date pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
  #[error("{0:?} does not match the partial date pattern")]
  Pattern(String),

  #[error("{0:?} is not a valid calendar date")]
  Calendar(String),
}

/// How much of a [`PartialDate`] is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precision {
  Year,
  Month,
  Day,
}

/// A date truncated to year, year-month or full year-month-day precision.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct PartialDate {
  year:  i32,
  month: Option<u8>,
  day:   Option<u8>,
}

impl PartialDate {
  pub fn year(&self) -> i32 { self.year }

  pub fn month(&self) -> Option<u8> { self.month }

  pub fn day(&self) -> Option<u8> { self.day }

  pub fn precision(&self) -> Precision {
    match (self.month, self.day) {
      (Some(_), Some(_)) => Precision::Day,
      (Some(_), None) => Precision::Month,
      _ => Precision::Year,
    }
  }

  /// The full calendar date, when known to the day.
  pub fn to_naive(&self) -> Option<NaiveDate> {
    let (month, day) = (self.month?, self.day?);
    NaiveDate::from_ymd_opt(self.year, month.into(), day.into())
  }
}

impl FromStr for PartialDate {
  type Err = DateError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if !DATE_RE.is_match(s) {
      return Err(DateError::Pattern(s.to_owned()));
    }

    // The pattern guarantees ASCII digits in every component.
    let mut parts = s.split('-');
    let year = parts
      .next()
      .and_then(|p| p.parse().ok())
      .ok_or_else(|| DateError::Pattern(s.to_owned()))?;
    let month = parts.next().and_then(|p| p.parse().ok());
    let day = parts.next().and_then(|p| p.parse().ok());

    let date = Self { year, month, day };
    if date.day.is_some() && date.to_naive().is_none() {
      return Err(DateError::Calendar(s.to_owned()));
    }
    Ok(date)
  }
}

impl TryFrom<String> for PartialDate {
  type Error = DateError;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<PartialDate> for String {
  fn from(d: PartialDate) -> Self { d.to_string() }
}

impl fmt::Display for PartialDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}", self.year)?;
    if let Some(month) = self.month {
      write!(f, "-{month:02}")?;
    }
    if let Some(day) = self.day {
      write!(f, "-{day:02}")?;
    }
    Ok(())
  }
}
