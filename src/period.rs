//! A calendar year-month token used to key budgets, e.g. "2024-06".

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::Error;

/// A calendar month in a specific year.
///
/// Budgets are stored against the string form (`YYYY-MM`), and budget progress
/// is calculated over the date window `[first_day, last_day]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    year: i32,
    month: Month,
}

impl Period {
    /// Create a period for `month` of `year`.
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    /// The period that `date` falls in.
    pub fn containing(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        // The first of the month is always a valid date.
        Date::from_calendar_date(self.year, self.month, 1).unwrap()
    }

    /// The last day of the month, accounting for month length and leap years.
    pub fn last_day(&self) -> Date {
        Date::from_calendar_date(self.year, self.month, self.month.length(self.year)).unwrap()
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, u8::from(self.month))
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (year, month) = value
            .split_once('-')
            .ok_or_else(|| Error::InvalidPeriod(value.to_owned()))?;

        let year: i32 = year
            .parse()
            .map_err(|_| Error::InvalidPeriod(value.to_owned()))?;
        let month: u8 = month
            .parse()
            .map_err(|_| Error::InvalidPeriod(value.to_owned()))?;
        let month = Month::try_from(month).map_err(|_| Error::InvalidPeriod(value.to_owned()))?;

        Ok(Self { year, month })
    }
}

impl Serialize for Period {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for Period {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Period {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}
