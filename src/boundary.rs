//! Partition boundary arithmetic.
//!
//! Time boundaries are calendar-aligned: a value is truncated to the start
//! of its year, quarter, month, ISO week, day, hour, or sub-hour bucket,
//! and the partition covers `[lower, lower + interval)`. Serial boundaries
//! are plain integer floor: `lower = v - (v mod interval)`.
//!
//! Each granularity also owns the suffix format stamped into child table
//! names. The quarterly suffix (`2024q3`) cannot be produced by a plain
//! date format string and has its own formatting and parsing path.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

/// Partitioning strategy for a set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    TimeStatic,
    TimeDynamic,
    TimeCustom,
    IdStatic,
    IdDynamic,
}

impl PartitionKind {
    /// Parse the catalog text form (`time-static`, `id-dynamic`, ...)
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "time-static" => Some(Self::TimeStatic),
            "time-dynamic" => Some(Self::TimeDynamic),
            "time-custom" => Some(Self::TimeCustom),
            "id-static" => Some(Self::IdStatic),
            "id-dynamic" => Some(Self::IdDynamic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeStatic => "time-static",
            Self::TimeDynamic => "time-dynamic",
            Self::TimeCustom => "time-custom",
            Self::IdStatic => "id-static",
            Self::IdDynamic => "id-dynamic",
        }
    }

    pub fn is_time(&self) -> bool {
        matches!(self, Self::TimeStatic | Self::TimeDynamic | Self::TimeCustom)
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Self::IdStatic | Self::IdDynamic)
    }

    /// Static kinds precompute their routing ladder and must be
    /// re-synthesized whenever the set of children changes.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::TimeStatic | Self::IdStatic)
    }
}

/// Calendar granularity of a time-partitioned set
///
/// Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Granularity {
    QuarterHour,
    HalfHour,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    /// Resolve a configuration keyword (`daily`, `quarter-hour`, ...)
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "quarter-hour" => Some(Self::QuarterHour),
            "half-hour" => Some(Self::HalfHour),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Resolve the catalog text form, accepting both the stored interval
    /// (`1 day`) and the configuration keyword (`daily`)
    pub fn from_part_interval(s: &str) -> Option<Self> {
        match s {
            "15 mins" => Some(Self::QuarterHour),
            "30 mins" => Some(Self::HalfHour),
            "1 hour" => Some(Self::Hourly),
            "1 day" => Some(Self::Daily),
            "1 week" => Some(Self::Weekly),
            "1 month" => Some(Self::Monthly),
            "3 months" => Some(Self::Quarterly),
            "1 year" => Some(Self::Yearly),
            other => Self::from_keyword(other),
        }
    }

    /// Length in seconds, for the granularities whose buckets never
    /// vary (week and finer). Months and coarser have no fixed length.
    pub fn fixed_seconds(&self) -> Option<i64> {
        match self {
            Self::QuarterHour => Some(15 * 60),
            Self::HalfHour => Some(30 * 60),
            Self::Hourly => Some(3_600),
            Self::Daily => Some(86_400),
            Self::Weekly => Some(7 * 86_400),
            Self::Monthly | Self::Quarterly | Self::Yearly => None,
        }
    }

    /// Interval text stored in the catalog and usable as a SQL interval
    pub fn interval_sql(&self) -> &'static str {
        match self {
            Self::QuarterHour => "15 mins",
            Self::HalfHour => "30 mins",
            Self::Hourly => "1 hour",
            Self::Daily => "1 day",
            Self::Weekly => "1 week",
            Self::Monthly => "1 month",
            Self::Quarterly => "3 months",
            Self::Yearly => "1 year",
        }
    }

    /// `to_char` pattern describing this granularity's suffix shape
    pub fn suffix_pattern(&self) -> &'static str {
        match self {
            Self::Yearly => "YYYY",
            Self::Quarterly => "YYYY\"q\"Q",
            Self::Monthly => "YYYY_MM",
            Self::Weekly => "IYYY\"w\"IW",
            Self::Daily => "YYYY_MM_DD",
            Self::Hourly | Self::HalfHour | Self::QuarterHour => "YYYY_MM_DD_HH24MI",
        }
    }

    /// Truncate a timestamp to the start of its bucket
    pub fn truncate(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let d = ts.date();
        match self {
            Self::Yearly => at_midnight(ymd(d.year(), 1, 1)),
            Self::Quarterly => {
                let month = quarter_start_month(quarter_of(d.month()));
                at_midnight(ymd(d.year(), month, 1))
            }
            Self::Monthly => at_midnight(ymd(d.year(), d.month(), 1)),
            Self::Weekly => {
                let days_back = i64::from(d.weekday().num_days_from_monday());
                at_midnight(d - Duration::days(days_back))
            }
            Self::Daily => at_midnight(d),
            Self::Hourly => with_minute(ts, 0),
            Self::HalfHour => with_minute(ts, (ts.minute() / 30) * 30),
            Self::QuarterHour => with_minute(ts, (ts.minute() / 15) * 15),
        }
    }

    /// Step one interval forward, `None` on calendar overflow
    pub fn step(&self, ts: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Yearly => ts.checked_add_months(Months::new(12)),
            Self::Quarterly => ts.checked_add_months(Months::new(3)),
            Self::Monthly => ts.checked_add_months(Months::new(1)),
            Self::Weekly => ts.checked_add_signed(Duration::weeks(1)),
            Self::Daily => ts.checked_add_signed(Duration::days(1)),
            Self::Hourly => ts.checked_add_signed(Duration::hours(1)),
            Self::HalfHour => ts.checked_add_signed(Duration::minutes(30)),
            Self::QuarterHour => ts.checked_add_signed(Duration::minutes(15)),
        }
    }

    /// Step one interval backward, `None` on calendar underflow
    pub fn step_back(&self, ts: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Yearly => ts.checked_sub_months(Months::new(12)),
            Self::Quarterly => ts.checked_sub_months(Months::new(3)),
            Self::Monthly => ts.checked_sub_months(Months::new(1)),
            Self::Weekly => ts.checked_sub_signed(Duration::weeks(1)),
            Self::Daily => ts.checked_sub_signed(Duration::days(1)),
            Self::Hourly => ts.checked_sub_signed(Duration::hours(1)),
            Self::HalfHour => ts.checked_sub_signed(Duration::minutes(30)),
            Self::QuarterHour => ts.checked_sub_signed(Duration::minutes(15)),
        }
    }

    /// Render the child table suffix for a boundary
    pub fn format_suffix(&self, ts: NaiveDateTime) -> String {
        match self {
            Self::Yearly => ts.format("%Y").to_string(),
            Self::Quarterly => format!("{}q{}", ts.year(), quarter_of(ts.month())),
            Self::Monthly => ts.format("%Y_%m").to_string(),
            Self::Weekly => {
                let iso = ts.iso_week();
                format!("{}w{:02}", iso.year(), iso.week())
            }
            Self::Daily => ts.format("%Y_%m_%d").to_string(),
            Self::Hourly | Self::HalfHour | Self::QuarterHour => {
                ts.format("%Y_%m_%d_%H%M").to_string()
            }
        }
    }

    /// Parse a child table suffix back into its lower boundary
    ///
    /// Returns `None` for text that does not match this granularity's
    /// suffix shape.
    pub fn parse_suffix(&self, suffix: &str) -> Option<NaiveDateTime> {
        match self {
            Self::Yearly => {
                let year: i32 = suffix.parse().ok()?;
                NaiveDate::from_ymd_opt(year, 1, 1).map(at_midnight)
            }
            Self::Quarterly => {
                let (year, quarter) = suffix.split_once('q')?;
                let year: i32 = year.parse().ok()?;
                let quarter: u32 = quarter.parse().ok()?;
                if !(1..=4).contains(&quarter) {
                    return None;
                }
                NaiveDate::from_ymd_opt(year, quarter_start_month(quarter), 1).map(at_midnight)
            }
            Self::Monthly => {
                let (year, month) = suffix.split_once('_')?;
                NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
                    .map(at_midnight)
            }
            Self::Weekly => {
                let (year, week) = suffix.split_once('w')?;
                NaiveDate::from_isoywd_opt(year.parse().ok()?, week.parse().ok()?, Weekday::Mon)
                    .map(at_midnight)
            }
            Self::Daily => {
                let mut parts = suffix.splitn(3, '_');
                let year = parts.next()?.parse().ok()?;
                let month = parts.next()?.parse().ok()?;
                let day = parts.next()?.parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day).map(at_midnight)
            }
            Self::Hourly | Self::HalfHour | Self::QuarterHour => {
                let mut parts = suffix.splitn(4, '_');
                let year = parts.next()?.parse().ok()?;
                let month = parts.next()?.parse().ok()?;
                let day = parts.next()?.parse().ok()?;
                let hhmm = parts.next()?;
                if hhmm.len() != 4 {
                    return None;
                }
                let hour: u32 = hhmm[..2].parse().ok()?;
                let minute: u32 = hhmm[2..].parse().ok()?;
                let date = NaiveDate::from_ymd_opt(year, month, day)?;
                let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
                Some(NaiveDateTime::new(date, time))
            }
        }
    }

    /// Number of whole intervals between two boundaries
    ///
    /// Both arguments are expected to be truncated boundaries; the result
    /// is signed (`to` before `from` is negative).
    pub fn steps_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> i64 {
        match self {
            Self::Yearly => i64::from(to.year() - from.year()),
            Self::Quarterly => month_span(from, to) / 3,
            Self::Monthly => month_span(from, to),
            Self::Weekly => (to - from).num_weeks(),
            Self::Daily => (to - from).num_days(),
            Self::Hourly => (to - from).num_hours(),
            Self::HalfHour => (to - from).num_minutes() / 30,
            Self::QuarterHour => (to - from).num_minutes() / 15,
        }
    }
}

/// Lower boundary of the serial partition owning `v`
///
/// The interval must be greater than 1; the catalog rejects anything else
/// at write time.
pub fn id_lower(v: i64, interval: i64) -> i64 {
    v - (v % interval)
}

/// Boundary series for initial creation of a serial set
///
/// `premake` boundaries below the start (clamped at zero) and `premake`
/// above, inclusive of the start boundary itself. Ascending order.
pub fn id_series(start: i64, interval: i64, premake: i32) -> Vec<i64> {
    let base = id_lower(start, interval);
    let mut series = Vec::new();
    for i in (1..=i64::from(premake)).rev() {
        let lower = base - i * interval;
        if lower >= 0 {
            series.push(lower);
        }
    }
    for i in 0..=i64::from(premake) {
        series.push(base + i * interval);
    }
    series
}

/// Boundary series for initial creation of a time set
///
/// `premake` boundaries either side of the start boundary, ascending.
/// Boundaries lost to calendar overflow are dropped with a warning.
pub fn time_series(granularity: Granularity, start: NaiveDateTime, premake: i32) -> Vec<NaiveDateTime> {
    let base = granularity.truncate(start);
    let mut series = Vec::new();

    let mut below = Vec::new();
    let mut cursor = base;
    for _ in 0..premake {
        match granularity.step_back(cursor) {
            Some(prev) => {
                below.push(prev);
                cursor = prev;
            }
            None => {
                log::warn!("partition boundary before {} underflows the calendar", cursor);
                break;
            }
        }
    }
    below.reverse();
    series.extend(below);

    series.push(base);
    let mut cursor = base;
    for _ in 0..premake {
        match granularity.step(cursor) {
            Some(next) => {
                series.push(next);
                cursor = next;
            }
            None => {
                log::warn!("partition boundary after {} overflows the calendar", cursor);
                break;
            }
        }
    }
    series
}

/// Suffix pattern for arbitrary-interval sets, down to the second
pub const CUSTOM_DATETIME_STRING: &str = "YYYY_MM_DD_HH24MISS";

/// Parse a fixed-length interval (`90 mins`, `2 weeks`, `45 secs`) into
/// whole seconds
///
/// Only units whose length never varies are accepted; month-based
/// intervals belong to the calendar granularities. Returns `None` for
/// anything unparseable or shorter than one second.
pub fn parse_custom_interval(text: &str) -> Option<i64> {
    let (count, unit) = text.trim().split_once(' ')?;
    let count: i64 = count.parse().ok()?;
    let per_unit = match unit {
        "sec" | "secs" | "second" | "seconds" => 1,
        "min" | "mins" | "minute" | "minutes" => 60,
        "hour" | "hours" => 3_600,
        "day" | "days" => 86_400,
        "week" | "weeks" => 7 * 86_400,
        _ => return None,
    };
    let seconds = count.checked_mul(per_unit)?;
    if seconds < 1 {
        return None;
    }
    Some(seconds)
}

/// Render a seconds-precision child suffix
pub fn format_custom_suffix(ts: NaiveDateTime) -> String {
    ts.format("%Y_%m_%d_%H%M%S").to_string()
}

/// Parse a seconds-precision child suffix back into a timestamp
pub fn parse_custom_suffix(suffix: &str) -> Option<NaiveDateTime> {
    let mut parts = suffix.splitn(4, '_');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    let hms = parts.next()?;
    if hms.len() != 6 {
        return None;
    }
    let hour: u32 = hms[..2].parse().ok()?;
    let minute: u32 = hms[2..4].parse().ok()?;
    let second: u32 = hms[4..].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(NaiveDateTime::new(date, time))
}

/// Boundary series for initial creation of an arbitrary-interval set
///
/// The start is taken as the base boundary unchanged; custom ranges are
/// anchored wherever the set began, not on the calendar.
pub fn custom_series(start: NaiveDateTime, seconds: i64, premake: i32) -> Vec<NaiveDateTime> {
    let mut series = Vec::new();
    for i in (1..=i64::from(premake)).rev() {
        if let Some(lower) = start.checked_sub_signed(Duration::seconds(i * seconds)) {
            series.push(lower);
        }
    }
    for i in 0..=i64::from(premake) {
        match start.checked_add_signed(Duration::seconds(i * seconds)) {
            Some(upper) => series.push(upper),
            None => break,
        }
    }
    series
}

fn quarter_of(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

fn quarter_start_month(quarter: u32) -> u32 {
    (quarter - 1) * 3 + 1
}

fn month_span(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month() as i32 - from.month() as i32)
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // Arguments are always valid calendar components here
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn at_midnight(d: NaiveDate) -> NaiveDateTime {
    NaiveDateTime::new(d, NaiveTime::MIN)
}

fn with_minute(ts: NaiveDateTime, minute: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(ts.hour(), minute, 0).unwrap_or(NaiveTime::MIN);
    NaiveDateTime::new(ts.date(), time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_truncate_calendar_units() {
        let v = ts(2024, 8, 17, 14, 47);
        assert_eq!(Granularity::Yearly.truncate(v), ts(2024, 1, 1, 0, 0));
        assert_eq!(Granularity::Quarterly.truncate(v), ts(2024, 7, 1, 0, 0));
        assert_eq!(Granularity::Monthly.truncate(v), ts(2024, 8, 1, 0, 0));
        // 2024-08-17 is a Saturday; ISO week starts Monday the 12th
        assert_eq!(Granularity::Weekly.truncate(v), ts(2024, 8, 12, 0, 0));
        assert_eq!(Granularity::Daily.truncate(v), ts(2024, 8, 17, 0, 0));
        assert_eq!(Granularity::Hourly.truncate(v), ts(2024, 8, 17, 14, 0));
        assert_eq!(Granularity::HalfHour.truncate(v), ts(2024, 8, 17, 14, 30));
        assert_eq!(Granularity::QuarterHour.truncate(v), ts(2024, 8, 17, 14, 45));
    }

    #[test]
    fn test_suffix_round_trip() {
        let v = ts(2024, 8, 17, 14, 45);
        for g in [
            Granularity::Yearly,
            Granularity::Quarterly,
            Granularity::Monthly,
            Granularity::Weekly,
            Granularity::Daily,
            Granularity::Hourly,
            Granularity::HalfHour,
            Granularity::QuarterHour,
        ] {
            let lower = g.truncate(v);
            let suffix = g.format_suffix(lower);
            assert_eq!(g.parse_suffix(&suffix), Some(lower), "granularity {g:?}");
        }
    }

    #[test]
    fn test_quarterly_suffix_shape() {
        assert_eq!(Granularity::Quarterly.format_suffix(ts(2024, 7, 1, 0, 0)), "2024q3");
        assert_eq!(
            Granularity::Quarterly.parse_suffix("2024q1"),
            Some(ts(2024, 1, 1, 0, 0))
        );
        assert_eq!(
            Granularity::Quarterly.parse_suffix("2024q4"),
            Some(ts(2024, 10, 1, 0, 0))
        );
        assert_eq!(Granularity::Quarterly.parse_suffix("2024q5"), None);
        assert_eq!(Granularity::Quarterly.parse_suffix("2024_07"), None);
    }

    #[test]
    fn test_weekly_iso_year_boundary() {
        // 2024-12-30 is a Monday belonging to ISO week 2025w01
        let v = ts(2024, 12, 30, 10, 0);
        let lower = Granularity::Weekly.truncate(v);
        assert_eq!(lower, ts(2024, 12, 30, 0, 0));
        assert_eq!(Granularity::Weekly.format_suffix(lower), "2025w01");
        assert_eq!(Granularity::Weekly.parse_suffix("2025w01"), Some(lower));
    }

    #[test]
    fn test_step_contiguous() {
        // Stepping from a truncated boundary always lands on the next
        // truncated boundary: no gaps, no overlap
        let v = ts(2024, 1, 31, 23, 45);
        for g in [
            Granularity::Yearly,
            Granularity::Quarterly,
            Granularity::Monthly,
            Granularity::Weekly,
            Granularity::Daily,
            Granularity::Hourly,
            Granularity::HalfHour,
            Granularity::QuarterHour,
        ] {
            let lower = g.truncate(v);
            let next = g.step(lower).unwrap();
            assert!(next > lower);
            assert_eq!(g.truncate(next), next, "granularity {g:?}");
            assert_eq!(g.steps_between(lower, next), 1);
        }
    }

    #[test]
    fn test_id_lower_law() {
        assert_eq!(id_lower(0, 10000), 0);
        assert_eq!(id_lower(9999, 10000), 0);
        assert_eq!(id_lower(10000, 10000), 10000);
        assert_eq!(id_lower(123_456, 10000), 120_000);
        // Law: lower <= v < lower + interval, lower divisible by interval
        for v in [1i64, 999, 10_000, 54_321, 99_999] {
            let lower = id_lower(v, 10000);
            assert!(lower <= v && v < lower + 10000);
            assert_eq!(lower % 10000, 0);
        }
    }

    #[test]
    fn test_id_series_never_negative() {
        let series = id_series(15_000, 10_000, 4);
        assert_eq!(series, vec![0, 10_000, 20_000, 30_000, 40_000, 50_000]);

        let series = id_series(100_000, 10_000, 2);
        assert_eq!(series, vec![80_000, 90_000, 100_000, 110_000, 120_000]);
    }

    #[test]
    fn test_time_series_daily_premake_two() {
        let series = time_series(Granularity::Daily, ts(2024, 8, 17, 9, 30), 2);
        assert_eq!(
            series,
            vec![
                ts(2024, 8, 15, 0, 0),
                ts(2024, 8, 16, 0, 0),
                ts(2024, 8, 17, 0, 0),
                ts(2024, 8, 18, 0, 0),
                ts(2024, 8, 19, 0, 0),
            ]
        );
    }

    #[test]
    fn test_interval_text_round_trip() {
        for g in [
            Granularity::QuarterHour,
            Granularity::HalfHour,
            Granularity::Hourly,
            Granularity::Daily,
            Granularity::Weekly,
            Granularity::Monthly,
            Granularity::Quarterly,
            Granularity::Yearly,
        ] {
            assert_eq!(Granularity::from_part_interval(g.interval_sql()), Some(g));
        }
        assert_eq!(Granularity::from_part_interval("daily"), Some(Granularity::Daily));
        assert_eq!(Granularity::from_part_interval("2 days"), None);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(PartitionKind::from_str("time-static"), Some(PartitionKind::TimeStatic));
        assert_eq!(PartitionKind::from_str("id-dynamic"), Some(PartitionKind::IdDynamic));
        assert_eq!(PartitionKind::from_str("hash"), None);
        assert!(PartitionKind::TimeCustom.is_time());
        assert!(PartitionKind::IdStatic.is_static());
        assert!(!PartitionKind::TimeDynamic.is_static());
    }

    #[test]
    fn test_steps_between() {
        assert_eq!(
            Granularity::Monthly.steps_between(ts(2024, 1, 1, 0, 0), ts(2024, 7, 1, 0, 0)),
            6
        );
        assert_eq!(
            Granularity::Quarterly.steps_between(ts(2023, 10, 1, 0, 0), ts(2024, 7, 1, 0, 0)),
            3
        );
        assert_eq!(
            Granularity::Daily.steps_between(ts(2024, 8, 19, 0, 0), ts(2024, 8, 17, 0, 0)),
            -2
        );
    }

    #[test]
    fn test_parse_custom_interval() {
        assert_eq!(parse_custom_interval("90 mins"), Some(5_400));
        assert_eq!(parse_custom_interval("2 weeks"), Some(14 * 86_400));
        assert_eq!(parse_custom_interval("45 secs"), Some(45));
        assert_eq!(parse_custom_interval("0 secs"), None);
        assert_eq!(parse_custom_interval("2 months"), None);
        assert_eq!(parse_custom_interval("soon"), None);
    }

    #[test]
    fn test_custom_suffix_round_trip() {
        let t = ts(2024, 8, 17, 9, 30);
        let suffix = format_custom_suffix(t);
        assert_eq!(suffix, "2024_08_17_093000");
        assert_eq!(parse_custom_suffix(&suffix), Some(t));
        assert_eq!(parse_custom_suffix("2024_08_17_0930"), None);
    }

    #[test]
    fn test_custom_series_anchored_on_start() {
        // A 90-minute set starting off the calendar grid keeps its own
        // anchor
        let start = ts(2024, 8, 17, 9, 15);
        let series = custom_series(start, 5_400, 1);
        assert_eq!(
            series,
            vec![ts(2024, 8, 17, 7, 45), start, ts(2024, 8, 17, 10, 45)]
        );
    }
}
