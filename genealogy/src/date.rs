//! Date Model
//!
//! Genealogical dates are often only known to the year. `PartialDate` keeps the
//! resolution explicit so ages, anniversaries and signs are only computed when
//! the data supports them.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Partial Date
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartialDate {
    #[default]
    Unknown,
    YearOnly(i32),
    Full(NaiveDate),
}

impl PartialDate {
    /// Parse `DD.MM.YYYY` or `YYYY`. Anything else degrades to `Unknown`.
    pub fn parse(text: &str) -> Self {
        let parts: Vec<&str> = text.trim().split('.').collect();
        let parsed = match parts.as_slice() {
            [year] => parse_year(year).map(PartialDate::YearOnly),
            [day, month, year] => parse_full(day, month, year).map(PartialDate::Full),
            _ => None,
        };
        parsed.unwrap_or(PartialDate::Unknown)
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            PartialDate::Unknown => None,
            PartialDate::YearOnly(year) => Some(*year),
            PartialDate::Full(date) => Some(date.year()),
        }
    }

    /// Month and day of a full date (the anchor of a recurring event)
    pub fn month_day(&self) -> Option<(u32, u32)> {
        self.as_full().map(|d| (d.month(), d.day()))
    }

    pub fn as_full(&self) -> Option<NaiveDate> {
        match self {
            PartialDate::Full(date) => Some(*date),
            _ => None,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, PartialDate::Full(_))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PartialDate::Unknown)
    }

    /// Strict ordering, only defined when both dates are full.
    pub fn precedes(&self, other: &PartialDate) -> Option<bool> {
        Some(self.as_full()? < other.as_full()?)
    }
}

impl From<NaiveDate> for PartialDate {
    fn from(date: NaiveDate) -> Self {
        PartialDate::Full(date)
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialDate::Unknown => Ok(()),
            PartialDate::YearOnly(year) => write!(f, "{:04}", year),
            PartialDate::Full(date) => write!(f, "{}", date.format("%d.%m.%Y")),
        }
    }
}

fn parse_digits(text: &str, max_len: usize) -> Option<u32> {
    if text.is_empty() || text.len() > max_len || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_year(text: &str) -> Option<i32> {
    if text.len() != 4 {
        return None;
    }
    parse_digits(text, 4).map(|year| year as i32)
}

fn parse_full(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let day = parse_digits(day, 2)?;
    let month = parse_digits(month, 2)?;
    let year = parse_year(year)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

// ============================================================================
// Ages and Anniversaries
// ============================================================================

/// Whole years between `birth` and `reference` (a death date or today).
///
/// Full dates use calendar subtraction: a birthday not yet reached in the
/// reference year does not count. If either side is only known to the year
/// the result is the plain year difference.
pub fn age(birth: &PartialDate, reference: &PartialDate) -> Option<u32> {
    match (birth, reference) {
        (PartialDate::Unknown, _) | (_, PartialDate::Unknown) => None,
        (PartialDate::Full(birth), PartialDate::Full(at)) => full_age(*birth, *at),
        _ => {
            let years = reference.year()? - birth.year()?;
            u32::try_from(years).ok()
        }
    }
}

fn full_age(birth: NaiveDate, at: NaiveDate) -> Option<u32> {
    if at < birth {
        return None;
    }
    let mut years = at.year() - birth.year();
    if (at.month(), at.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Next occurrence of a recurring month/day on or after `today`, with the
/// number of days until it (0 = today).
///
/// A February 29 anchor lands on February 28 in non-leap years.
pub fn next_occurrence(month: u32, day: u32, today: NaiveDate) -> Option<(NaiveDate, u32)> {
    let this_year = anchor_in_year(month, day, today.year())?;
    let next = if this_year >= today {
        this_year
    } else {
        anchor_in_year(month, day, today.year() + 1)?
    };
    let days_until = u32::try_from((next - today).num_days()).ok()?;
    Some((next, days_until))
}

fn anchor_in_year(month: u32, day: u32, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| {
        if month == 2 && day == 29 {
            NaiveDate::from_ymd_opt(year, 2, 28)
        } else {
            None
        }
    })
}

// ============================================================================
// Zodiac
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

/// First day of each sign in calendar order
const ZODIAC_STARTS: &[(u32, u32, ZodiacSign)] = &[
    (1, 20, ZodiacSign::Aquarius),
    (2, 19, ZodiacSign::Pisces),
    (3, 21, ZodiacSign::Aries),
    (4, 20, ZodiacSign::Taurus),
    (5, 21, ZodiacSign::Gemini),
    (6, 21, ZodiacSign::Cancer),
    (7, 23, ZodiacSign::Leo),
    (8, 23, ZodiacSign::Virgo),
    (9, 23, ZodiacSign::Libra),
    (10, 23, ZodiacSign::Scorpio),
    (11, 22, ZodiacSign::Sagittarius),
    (12, 22, ZodiacSign::Capricorn),
];

/// Sign for a full date. Year-only and unknown dates have no sign.
pub fn zodiac_sign(date: &PartialDate) -> Option<ZodiacSign> {
    let (month, day) = date.month_day()?;
    let sign = ZODIAC_STARTS
        .iter()
        .rev()
        .find(|(m, d, _)| (month, day) >= (*m, *d))
        .map(|(_, _, sign)| *sign)
        // Jan 1-19 belongs to the Capricorn that started in December
        .unwrap_or(ZodiacSign::Capricorn);
    Some(sign)
}
