use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::models::{MetricDelta, TrendLabel};

use super::TimeWindow;

/// Period-over-period change. `deltaPercent` is 100 when the previous value
/// was zero and the current one is not, 0 when both are zero, otherwise
/// `round(delta / previous × 100)`.
///
/// The trend label follows the sign of the raw delta, so a change too small
/// to move the rounded percent still reads as a trend. With
/// `lower_is_better` the label is flipped so that a decrease
/// reads as positive.
pub fn compute_delta(current: i64, previous: i64, lower_is_better: bool) -> MetricDelta {
    let delta = current - previous;
    let delta_percent = if previous == 0 {
        if current > 0 {
            100
        } else {
            0
        }
    } else {
        (delta as f64 / previous as f64 * 100.0).round() as i64
    };

    let direction = if lower_is_better {
        -delta.signum()
    } else {
        delta.signum()
    };
    let trend_label = match direction {
        1 => TrendLabel::Positive,
        -1 => TrendLabel::Negative,
        _ => TrendLabel::Neutral,
    };

    MetricDelta {
        delta,
        delta_percent,
        trend_label,
    }
}

/// Calendar month containing `now`, shifted by `offset` months.
pub fn month_window(now: DateTime<Utc>, offset: i32) -> TimeWindow {
    let months = now.year() * 12 + now.month0() as i32 + offset;
    let (year, month0) = (months.div_euclid(12), months.rem_euclid(12) as u32);
    let start = first_of_month(year, month0 + 1);
    let (next_year, next_month) = if month0 == 11 {
        (year + 1, 1)
    } else {
        (year, month0 + 2)
    };
    let end = first_of_month(next_year, next_month) - Duration::milliseconds(1);
    TimeWindow {
        from: start,
        to: end,
    }
}

/// UTC day containing `now`, shifted by `offset` days.
pub fn day_window(now: DateTime<Utc>, offset: i64) -> TimeWindow {
    let day = now.date_naive() + Duration::days(offset);
    let start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap_or_default());
    TimeWindow {
        from: start,
        to: start + Duration::days(1) - Duration::milliseconds(1),
    }
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}
