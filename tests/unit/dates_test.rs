// Schedule arithmetic across cycle boundaries: wire format, month-end
// clamping over successive steps, and catch-up behavior after a gap.

use billcycle::core::{first_occurrence_on_or_after, next_occurrence, Frequency};
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

const ALL_FREQUENCIES: [Frequency; 7] = [
    Frequency::Weekly,
    Frequency::EveryTwoWeeks,
    Frequency::EveryFourWeeks,
    Frequency::Monthly,
    Frequency::Quarterly,
    Frequency::EverySixMonths,
    Frequency::Yearly,
];

#[test]
fn test_frequency_wire_format_uses_display_strings() {
    let pairs = [
        (Frequency::Weekly, "\"Weekly\""),
        (Frequency::EveryTwoWeeks, "\"Every 2 weeks\""),
        (Frequency::EveryFourWeeks, "\"Every 4 weeks\""),
        (Frequency::Monthly, "\"Monthly\""),
        (Frequency::Quarterly, "\"Quarterly\""),
        (Frequency::EverySixMonths, "\"Every 6 months\""),
        (Frequency::Yearly, "\"Yearly\""),
    ];

    for (frequency, json) in pairs {
        assert_eq!(serde_json::to_string(&frequency).unwrap(), json);
        let parsed: Frequency = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, frequency);
    }
}

#[test]
fn test_frequency_wire_format_rejects_unknown_values() {
    assert!(serde_json::from_str::<Frequency>("\"Fortnightly\"").is_err());
    assert!(serde_json::from_str::<Frequency>("\"weekly\"").is_err());
}

#[test]
fn test_monthly_schedule_drifts_after_clamping() {
    // Stepping is anchored on the previous occurrence, not the original
    // start day, so a schedule clamped at a short month stays clamped.
    let feb = next_occurrence(d(2024, 1, 31), Frequency::Monthly);
    assert_eq!(feb, d(2024, 2, 29));

    let mar = next_occurrence(feb, Frequency::Monthly);
    assert_eq!(mar, d(2024, 3, 29));

    let apr = next_occurrence(mar, Frequency::Monthly);
    assert_eq!(apr, d(2024, 4, 29));
}

#[test]
fn test_quarterly_clamps_across_year_boundary() {
    assert_eq!(
        next_occurrence(d(2024, 11, 30), Frequency::Quarterly),
        d(2025, 2, 28)
    );
}

#[test]
fn test_every_frequency_moves_strictly_forward() {
    let start = d(2024, 6, 15);
    for frequency in ALL_FREQUENCIES {
        assert!(
            next_occurrence(start, frequency) > start,
            "{frequency} did not advance"
        );
    }
}

#[test]
fn test_first_occurrence_when_start_is_today() {
    assert_eq!(
        first_occurrence_on_or_after(d(2024, 4, 1), Frequency::Quarterly, d(2024, 4, 1)),
        d(2024, 4, 1)
    );
}

#[test]
fn test_weekly_catch_up_lands_on_the_cycle_grid() {
    let start = d(2023, 1, 2);
    let today = d(2024, 1, 20);

    let next = first_occurrence_on_or_after(start, Frequency::Weekly, today);

    assert!(next >= today);
    let elapsed = next.signed_duration_since(start).num_days();
    assert_eq!(elapsed % 7, 0, "{next} is not a whole number of weeks from {start}");
    // The previous grid point is before today, so this is the first one.
    assert!(next.signed_duration_since(today).num_days() < 7);
}

#[test]
fn test_catch_up_never_returns_a_past_date() {
    let start = d(2022, 3, 31);
    let today = d(2024, 8, 23);
    for frequency in ALL_FREQUENCIES {
        let next = first_occurrence_on_or_after(start, frequency, today);
        assert!(next >= today, "{frequency} produced {next} before {today}");
    }
}
