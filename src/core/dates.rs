// Occurrence-date arithmetic for recurring billing.
//
// All scheduling operates on calendar dates (NaiveDate), never instants:
// a subscription due "2025-03-01" is due on that date in UTC regardless of
// the hour the batch trigger fires. Month-based frequencies use calendar
// month arithmetic with end-of-month clamping (Jan 31 + 1 month = Feb 28/29).

use chrono::{Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How often a subscription materializes a new invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "Weekly")]
    Weekly,

    #[serde(rename = "Every 2 weeks")]
    EveryTwoWeeks,

    #[serde(rename = "Every 4 weeks")]
    EveryFourWeeks,

    #[serde(rename = "Monthly")]
    Monthly,

    #[serde(rename = "Quarterly")]
    Quarterly,

    #[serde(rename = "Every 6 months")]
    EverySixMonths,

    #[serde(rename = "Yearly")]
    Yearly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Weekly => write!(f, "Weekly"),
            Frequency::EveryTwoWeeks => write!(f, "Every 2 weeks"),
            Frequency::EveryFourWeeks => write!(f, "Every 4 weeks"),
            Frequency::Monthly => write!(f, "Monthly"),
            Frequency::Quarterly => write!(f, "Quarterly"),
            Frequency::EverySixMonths => write!(f, "Every 6 months"),
            Frequency::Yearly => write!(f, "Yearly"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Weekly" => Ok(Frequency::Weekly),
            "Every 2 weeks" => Ok(Frequency::EveryTwoWeeks),
            "Every 4 weeks" => Ok(Frequency::EveryFourWeeks),
            "Monthly" => Ok(Frequency::Monthly),
            "Quarterly" => Ok(Frequency::Quarterly),
            "Every 6 months" => Ok(Frequency::EverySixMonths),
            "Yearly" => Ok(Frequency::Yearly),
            _ => Err(format!("Invalid frequency: {}", s)),
        }
    }
}

/// Compute the next occurrence date after `date` for the given frequency.
///
/// Week-based frequencies add exact day counts; month-based frequencies add
/// calendar months, clamping to the last day of shorter months. Deterministic
/// and timezone-agnostic.
pub fn next_occurrence(date: NaiveDate, frequency: Frequency) -> NaiveDate {
    let next = match frequency {
        Frequency::Weekly => date.checked_add_days(Days::new(7)),
        Frequency::EveryTwoWeeks => date.checked_add_days(Days::new(14)),
        Frequency::EveryFourWeeks => date.checked_add_days(Days::new(28)),
        Frequency::Monthly => date.checked_add_months(Months::new(1)),
        Frequency::Quarterly => date.checked_add_months(Months::new(3)),
        Frequency::EverySixMonths => date.checked_add_months(Months::new(6)),
        Frequency::Yearly => date.checked_add_months(Months::new(12)),
    };
    // Overflow is only reachable near chrono's representable maximum year.
    next.unwrap_or(NaiveDate::MAX)
}

/// The first occurrence on or after `today`, stepping from `start` by
/// `frequency`. Used when a subscription is (re)activated and its next
/// invoice date must be rebuilt from the schedule anchor.
pub fn first_occurrence_on_or_after(
    start: NaiveDate,
    frequency: Frequency,
    today: NaiveDate,
) -> NaiveDate {
    let mut candidate = start;
    while candidate < today {
        candidate = next_occurrence(candidate, frequency);
    }
    candidate
}

/// Current calendar date in UTC.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
