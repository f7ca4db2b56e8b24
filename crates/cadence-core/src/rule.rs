//! Recurrence rule grammar and occurrence expansion.
//!
//! Rules are persisted as semicolon-separated `KEY=VALUE` pairs
//! (`FREQ=WEEKLY;BYDAY=MO,WE,FR;UNTIL=20250601T235959Z`). The dialect covers
//! exactly what the product exercises: daily, weekly with a weekday set,
//! interval multipliers, monthly by day-of-month, and an inclusive end date.
//! Expansion is a pure calendar-day computation; no I/O, no timestamps.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::fmt;
use thiserror::Error;

use crate::models::ReconcileWindow;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("missing FREQ")]
    MissingFreq,
    #[error("unsupported FREQ: {0}")]
    UnsupportedFreq(String),
    #[error("invalid {key}: {value}")]
    InvalidField { key: String, value: String },
    #[error("{key} is only valid with FREQ={freq}")]
    FieldFreqMismatch { key: &'static str, freq: &'static str },
    #[error("malformed rule segment: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freq {
    Daily,
    Weekly,
    Monthly,
}

impl Freq {
    fn as_str(&self) -> &'static str {
        match self {
            Freq::Daily => "DAILY",
            Freq::Weekly => "WEEKLY",
            Freq::Monthly => "MONTHLY",
        }
    }
}

/// A parsed recurrence rule.
///
/// `Display` emits the canonical persisted form, and
/// `Rule::parse(rule.to_string())` round-trips. Parsing is strict so bad
/// grammar is rejected when a user writes a rule; during reconciliation use
/// [`expand_or_empty`], which treats unparseable rules as producing nothing
/// rather than failing the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub freq: Freq,
    /// Multiplier on the frequency's natural period, phase-locked to the
    /// anchor (every Nth day/week/month counted from the anchor).
    pub interval: u32,
    /// Weekday set for weekly rules; empty means "the anchor's weekday".
    pub by_day: Vec<Weekday>,
    /// Day-of-month for monthly rules; clamped to short months on expansion.
    pub by_month_day: Option<u32>,
    /// Inclusive end date; no occurrence after this is produced.
    pub until: Option<NaiveDate>,
}

impl Rule {
    /// Parses the persisted rule grammar.
    ///
    /// # Behavior
    /// - Pairs are order-independent; keys are case-insensitive
    /// - `FREQ` is required and must be DAILY, WEEKLY, or MONTHLY
    /// - `BYDAY` is rejected outside WEEKLY, `BYMONTHDAY` outside MONTHLY
    /// - `UNTIL` accepts an ISO date (`2025-06-01`) or ISO-basic
    ///   date-time-Z (`20250601T235959Z`); only the date part is kept
    pub fn parse(input: &str) -> Result<Self, RuleError> {
        let mut freq: Option<Result<Freq, String>> = None;
        let mut interval: u32 = 1;
        let mut by_day: Vec<Weekday> = Vec::new();
        let mut by_month_day: Option<u32> = None;
        let mut until: Option<NaiveDate> = None;

        for segment in input.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| RuleError::Malformed(segment.to_string()))?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();

            match key.as_str() {
                "FREQ" => {
                    freq = Some(match value.to_ascii_uppercase().as_str() {
                        "DAILY" => Ok(Freq::Daily),
                        "WEEKLY" => Ok(Freq::Weekly),
                        "MONTHLY" => Ok(Freq::Monthly),
                        other => Err(other.to_string()),
                    });
                }
                "INTERVAL" => {
                    interval = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n >= 1)
                        .ok_or_else(|| RuleError::InvalidField {
                            key,
                            value: value.to_string(),
                        })?;
                }
                "BYDAY" => {
                    for code in value.split(',') {
                        let day = weekday_from_code(code.trim()).ok_or_else(|| {
                            RuleError::InvalidField {
                                key: "BYDAY".to_string(),
                                value: code.to_string(),
                            }
                        })?;
                        if !by_day.contains(&day) {
                            by_day.push(day);
                        }
                    }
                }
                "BYMONTHDAY" => {
                    by_month_day = Some(
                        value
                            .parse::<u32>()
                            .ok()
                            .filter(|d| (1..=31).contains(d))
                            .ok_or_else(|| RuleError::InvalidField {
                                key,
                                value: value.to_string(),
                            })?,
                    );
                }
                "UNTIL" => {
                    until = Some(parse_until(value).ok_or_else(|| RuleError::InvalidField {
                        key,
                        value: value.to_string(),
                    })?);
                }
                _ => {
                    return Err(RuleError::InvalidField {
                        key,
                        value: value.to_string(),
                    })
                }
            }
        }

        let freq = match freq {
            None => return Err(RuleError::MissingFreq),
            Some(Err(other)) => return Err(RuleError::UnsupportedFreq(other)),
            Some(Ok(freq)) => freq,
        };

        let rule = Rule {
            freq,
            interval,
            by_day,
            by_month_day,
            until,
        };
        rule.validate()?;
        Ok(rule)
    }

    fn validate(&self) -> Result<(), RuleError> {
        if !self.by_day.is_empty() && self.freq != Freq::Weekly {
            return Err(RuleError::FieldFreqMismatch {
                key: "BYDAY",
                freq: "WEEKLY",
            });
        }
        if self.by_month_day.is_some() && self.freq != Freq::Monthly {
            return Err(RuleError::FieldFreqMismatch {
                key: "BYMONTHDAY",
                freq: "MONTHLY",
            });
        }
        Ok(())
    }

    /// Expands the rule into the ordered set of occurrence dates within the
    /// inclusive window, phase-anchored on `anchor`.
    ///
    /// # Behavior
    /// - Occurrences are ascending and duplicate-free
    /// - The window end is tightened to `UNTIL` when present (inclusive)
    /// - `BYMONTHDAY` beyond a short month resolves to that month's last
    ///   valid day rather than skipping the month
    /// - `INTERVAL` counts periods from the anchor, not emitted occurrences
    pub fn expand(&self, anchor: NaiveDate, window: ReconcileWindow) -> Vec<NaiveDate> {
        let end = match self.until {
            Some(until) => window.end.min(until),
            None => window.end,
        };
        if window.start > end {
            return Vec::new();
        }

        match self.freq {
            Freq::Daily => self.expand_daily(anchor, window.start, end),
            Freq::Weekly => self.expand_weekly(anchor, window.start, end),
            Freq::Monthly => self.expand_monthly(anchor, window.start, end),
        }
    }

    fn expand_daily(&self, anchor: NaiveDate, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let interval = self.interval as i64;
        let offset = (start - anchor).num_days().rem_euclid(interval);
        let mut current = if offset == 0 {
            start
        } else {
            start + Duration::days(interval - offset)
        };

        let mut occurrences = Vec::new();
        while current <= end {
            occurrences.push(current);
            current += Duration::days(interval);
        }
        occurrences
    }

    fn expand_weekly(&self, anchor: NaiveDate, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let interval = self.interval as i64;
        let anchor_week = week_start(anchor);
        let anchor_day = anchor.weekday();

        let matches_day = |day: Weekday| {
            if self.by_day.is_empty() {
                day == anchor_day
            } else {
                self.by_day.contains(&day)
            }
        };

        // Day-by-day walk: check weekday membership and whether the date's
        // week is interval-aligned with the anchor's week (Monday-based).
        let mut occurrences = Vec::new();
        let mut current = start;
        while current <= end {
            if matches_day(current.weekday()) {
                let weeks_from_anchor = (week_start(current) - anchor_week).num_days() / 7;
                if weeks_from_anchor.rem_euclid(interval) == 0 {
                    occurrences.push(current);
                }
            }
            current += Duration::days(1);
        }
        occurrences
    }

    fn expand_monthly(&self, anchor: NaiveDate, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let interval = self.interval as i64;
        let target_day = self.by_month_day.unwrap_or(anchor.day());
        let anchor_months = anchor.year() as i64 * 12 + anchor.month0() as i64;

        let mut occurrences = Vec::new();
        let mut months = start.year() as i64 * 12 + start.month0() as i64;
        let last_months = end.year() as i64 * 12 + end.month0() as i64;
        while months <= last_months {
            if (months - anchor_months).rem_euclid(interval) == 0 {
                let year = months.div_euclid(12) as i32;
                let month = months.rem_euclid(12) as u32 + 1;
                let day = target_day.min(days_in_month(year, month));
                // Clamped day always exists
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    if date >= start && date <= end {
                        occurrences.push(date);
                    }
                }
            }
            months += 1;
        }
        occurrences
    }
}

impl fmt::Display for Rule {
    /// Canonical persisted form: `FREQ` first, `INTERVAL` only when > 1,
    /// then `BYDAY`/`BYMONTHDAY`, then `UNTIL` as ISO-basic end-of-day Z.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.freq.as_str())?;
        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if !self.by_day.is_empty() {
            let codes: Vec<&str> = self.by_day.iter().map(|d| weekday_code(*d)).collect();
            write!(f, ";BYDAY={}", codes.join(","))?;
        }
        if let Some(day) = self.by_month_day {
            write!(f, ";BYMONTHDAY={}", day)?;
        }
        if let Some(until) = self.until {
            write!(f, ";UNTIL={}T235959Z", until.format("%Y%m%d"))?;
        }
        Ok(())
    }
}

/// Lenient expansion for reconciliation passes: an unparseable or
/// unsupported rule yields no occurrences instead of an error, so one
/// malformed series cannot abort a multi-root pass.
pub fn expand_or_empty(rule: &str, anchor: NaiveDate, window: ReconcileWindow) -> Vec<NaiveDate> {
    match Rule::parse(rule) {
        Ok(parsed) => parsed.expand(anchor, window),
        Err(err) => {
            tracing::warn!(rule, %err, "skipping unexpandable recurrence rule");
            Vec::new()
        }
    }
}

/// Fluent constructor for rule strings, used by UI-facing surfaces so the
/// persisted form stays byte-stable across builds of the same selection.
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    rule: Rule,
}

impl RuleBuilder {
    pub fn daily() -> Self {
        Self::with_freq(Freq::Daily)
    }

    pub fn weekly() -> Self {
        Self::with_freq(Freq::Weekly)
    }

    pub fn monthly() -> Self {
        Self::with_freq(Freq::Monthly)
    }

    fn with_freq(freq: Freq) -> Self {
        Self {
            rule: Rule {
                freq,
                interval: 1,
                by_day: Vec::new(),
                by_month_day: None,
                until: None,
            },
        }
    }

    /// Every Nth period instead of every period. Zero is treated as 1.
    pub fn every(mut self, interval: u32) -> Self {
        self.rule.interval = interval.max(1);
        self
    }

    pub fn on_weekdays(mut self, days: &[Weekday]) -> Self {
        for day in days {
            if !self.rule.by_day.contains(day) {
                self.rule.by_day.push(*day);
            }
        }
        self
    }

    pub fn on_month_day(mut self, day: u32) -> Self {
        self.rule.by_month_day = Some(day);
        self
    }

    pub fn until(mut self, date: NaiveDate) -> Self {
        self.rule.until = Some(date);
        self
    }

    pub fn build(self) -> Result<Rule, RuleError> {
        self.rule.validate()?;
        if let Some(day) = self.rule.by_month_day {
            if !(1..=31).contains(&day) {
                return Err(RuleError::InvalidField {
                    key: "BYMONTHDAY".to_string(),
                    value: day.to_string(),
                });
            }
        }
        Ok(self.rule)
    }
}

/// Maps a two-letter BYDAY code (case-insensitive) to a weekday.
pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code.to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn parse_until(value: &str) -> Option<NaiveDate> {
    // Accept `2025-06-01`, `20250601`, or `20250601T235959Z`
    let date_part = value.split('T').next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y%m%d"))
        .ok()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or(NaiveDate::MAX);
    (first_of_next - Duration::days(1)).day()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window(start: NaiveDate, end: NaiveDate) -> ReconcileWindow {
        ReconcileWindow::new(start, end)
    }

    #[test]
    fn daily_covers_every_day_in_window() {
        let rule = Rule::parse("FREQ=DAILY").unwrap();
        let anchor = date(2024, 1, 1);
        let got = rule.expand(anchor, window(date(2024, 1, 1), date(2024, 1, 5)));
        assert_eq!(
            got,
            vec![
                date(2024, 1, 1),
                date(2024, 1, 2),
                date(2024, 1, 3),
                date(2024, 1, 4),
                date(2024, 1, 5),
            ]
        );
    }

    #[test]
    fn daily_interval_keeps_anchor_phase() {
        let rule = Rule::parse("FREQ=DAILY;INTERVAL=3").unwrap();
        let anchor = date(2024, 1, 1);
        // Window starts off-phase; first hit is the next aligned day
        let got = rule.expand(anchor, window(date(2024, 1, 2), date(2024, 1, 11)));
        assert_eq!(got, vec![date(2024, 1, 4), date(2024, 1, 7), date(2024, 1, 10)]);
    }

    #[test]
    fn weekly_byday_emits_exactly_the_listed_days() {
        let rule = Rule::parse("FREQ=WEEKLY;BYDAY=MO,WE,FR").unwrap();
        // 2024-01-01 is a Monday
        let got = rule.expand(date(2024, 1, 1), window(date(2024, 1, 1), date(2024, 1, 7)));
        assert_eq!(got, vec![date(2024, 1, 1), date(2024, 1, 3), date(2024, 1, 5)]);
    }

    #[test]
    fn weekly_without_byday_uses_anchor_weekday() {
        // Anchor is a Thursday
        let rule = Rule::parse("FREQ=WEEKLY").unwrap();
        let got = rule.expand(date(2024, 1, 4), window(date(2024, 1, 1), date(2024, 1, 21)));
        assert_eq!(got, vec![date(2024, 1, 4), date(2024, 1, 11), date(2024, 1, 18)]);
    }

    #[test]
    fn biweekly_phase_locks_to_anchor_week() {
        let rule = Rule::parse("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO").unwrap();
        // Anchor Monday = week 0; only weeks 0, 2, 4 may emit
        let anchor = date(2024, 1, 1);
        let got = rule.expand(anchor, window(date(2024, 1, 1), date(2024, 2, 4)));
        assert_eq!(got, vec![date(2024, 1, 1), date(2024, 1, 15), date(2024, 1, 29)]);
    }

    #[test]
    fn biweekly_phase_holds_when_window_starts_mid_cycle() {
        let rule = Rule::parse("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO").unwrap();
        let anchor = date(2024, 1, 1);
        // Window opens during the off week; first emission is week 2
        let got = rule.expand(anchor, window(date(2024, 1, 9), date(2024, 1, 28)));
        assert_eq!(got, vec![date(2024, 1, 15)]);
    }

    #[rstest]
    #[case(date(2023, 1, 1), date(2023, 1, 31))]
    #[case(date(2023, 2, 1), date(2023, 2, 28))]
    #[case(date(2023, 3, 1), date(2023, 3, 31))]
    fn monthly_day_31_clamps_to_short_months(#[case] start: NaiveDate, #[case] expected: NaiveDate) {
        let rule = Rule::parse("FREQ=MONTHLY;BYMONTHDAY=31").unwrap();
        let got = rule.expand(date(2023, 1, 1), window(start, start + Duration::days(40)));
        assert_eq!(got.first().copied(), Some(expected));
    }

    #[test]
    fn monthly_clamp_does_not_skip_february() {
        let rule = Rule::parse("FREQ=MONTHLY;BYMONTHDAY=31").unwrap();
        let got = rule.expand(date(2023, 1, 1), window(date(2023, 1, 1), date(2023, 3, 31)));
        assert_eq!(
            got,
            vec![date(2023, 1, 31), date(2023, 2, 28), date(2023, 3, 31)]
        );
    }

    #[test]
    fn monthly_without_bymonthday_uses_anchor_day() {
        let rule = Rule::parse("FREQ=MONTHLY").unwrap();
        let got = rule.expand(date(2024, 1, 15), window(date(2024, 1, 1), date(2024, 3, 31)));
        assert_eq!(
            got,
            vec![date(2024, 1, 15), date(2024, 2, 15), date(2024, 3, 15)]
        );
    }

    #[test]
    fn monthly_interval_counts_months_from_anchor() {
        let rule = Rule::parse("FREQ=MONTHLY;INTERVAL=2;BYMONTHDAY=10").unwrap();
        let got = rule.expand(date(2024, 1, 10), window(date(2024, 1, 1), date(2024, 6, 30)));
        assert_eq!(
            got,
            vec![date(2024, 1, 10), date(2024, 3, 10), date(2024, 5, 10)]
        );
    }

    #[test]
    fn until_bound_is_inclusive() {
        let rule = Rule::parse("FREQ=DAILY;UNTIL=2024-01-03").unwrap();
        let got = rule.expand(date(2024, 1, 1), window(date(2024, 1, 1), date(2024, 1, 10)));
        assert_eq!(got, vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
    }

    #[test]
    fn until_accepts_iso_basic_datetime() {
        let rule = Rule::parse("FREQ=WEEKLY;BYDAY=MO,WE,FR;UNTIL=20250601T235959Z").unwrap();
        assert_eq!(rule.until, Some(date(2025, 6, 1)));
    }

    #[test]
    fn canonical_form_round_trips_byte_for_byte() {
        let canonical = "FREQ=WEEKLY;BYDAY=MO,WE,FR;UNTIL=20250601T235959Z";
        let rule = Rule::parse(canonical).unwrap();
        assert_eq!(rule.to_string(), canonical);
        // And the re-parsed rule expands identically
        let reparsed = Rule::parse(&rule.to_string()).unwrap();
        let w = window(date(2025, 5, 1), date(2025, 6, 30));
        assert_eq!(rule.expand(date(2025, 5, 5), w), reparsed.expand(date(2025, 5, 5), w));
    }

    #[test]
    fn builder_emits_canonical_string() {
        let rule = RuleBuilder::weekly()
            .on_weekdays(&[Weekday::Mon, Weekday::Wed, Weekday::Fri])
            .until(date(2025, 6, 1))
            .build()
            .unwrap();
        assert_eq!(rule.to_string(), "FREQ=WEEKLY;BYDAY=MO,WE,FR;UNTIL=20250601T235959Z");

        let biweekly = RuleBuilder::weekly()
            .every(2)
            .on_weekdays(&[Weekday::Tue])
            .build()
            .unwrap();
        assert_eq!(biweekly.to_string(), "FREQ=WEEKLY;INTERVAL=2;BYDAY=TU");
    }

    #[test]
    fn unknown_freq_is_unsupported_but_expands_to_nothing() {
        assert!(matches!(
            Rule::parse("FREQ=YEARLY"),
            Err(RuleError::UnsupportedFreq(_))
        ));
        let w = window(date(2024, 1, 1), date(2024, 12, 31));
        assert!(expand_or_empty("FREQ=YEARLY", date(2024, 1, 1), w).is_empty());
        assert!(expand_or_empty("total garbage", date(2024, 1, 1), w).is_empty());
    }

    #[test]
    fn byday_outside_weekly_is_rejected() {
        assert!(matches!(
            Rule::parse("FREQ=DAILY;BYDAY=MO"),
            Err(RuleError::FieldFreqMismatch { key: "BYDAY", .. })
        ));
        assert!(matches!(
            Rule::parse("FREQ=WEEKLY;BYMONTHDAY=5"),
            Err(RuleError::FieldFreqMismatch { key: "BYMONTHDAY", .. })
        ));
    }

    #[test]
    fn missing_freq_and_bad_fields_are_rejected() {
        assert_eq!(Rule::parse("INTERVAL=2"), Err(RuleError::MissingFreq));
        assert!(Rule::parse("FREQ=DAILY;INTERVAL=0").is_err());
        assert!(Rule::parse("FREQ=MONTHLY;BYMONTHDAY=32").is_err());
        assert!(Rule::parse("FREQ=WEEKLY;BYDAY=XX").is_err());
        assert!(Rule::parse("FREQ=DAILY;UNTIL=notadate").is_err());
    }

    proptest! {
        #[test]
        fn expansion_is_ordered_unique_and_in_window(
            freq in prop_oneof!["DAILY", "WEEKLY", "MONTHLY"],
            interval in 1u32..5,
            anchor_offset in 0i64..400,
            window_len in 0i64..90,
        ) {
            let anchor = date(2023, 1, 1) + Duration::days(anchor_offset);
            let start = date(2024, 1, 1);
            let end = start + Duration::days(window_len);
            let rule = Rule::parse(&format!("FREQ={};INTERVAL={}", freq, interval)).unwrap();
            let got = rule.expand(anchor, window(start, end));

            for pair in got.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for d in &got {
                prop_assert!(*d >= start && *d <= end);
            }
        }
    }
}
