use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::data::dates::parse_date_or_today;

/// Width of the time windows a series is bucketed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Granularity {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Quarterly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Weekly => "Weekly",
            Granularity::Monthly => "Monthly",
            Granularity::Quarterly => "Quarterly",
        }
    }

    /// First day of the bucket containing `date` (weeks start on Monday).
    pub fn bucket_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Monthly => date.with_day(1).unwrap_or(date),
            Granularity::Quarterly => {
                let first_month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), first_month, 1).unwrap_or(date)
            }
        }
    }

    /// Axis label of the bucket starting at `start`.
    pub fn bucket_label(self, start: NaiveDate) -> String {
        match self {
            Granularity::Weekly => {
                let week = start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Granularity::Monthly => start.format("%Y-%m").to_string(),
            Granularity::Quarterly => format!("{}-Q{}", start.year(), start.month0() / 3 + 1),
        }
    }
}

/// One time window and its averaged value.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub start: NaiveDate,
    pub label: String,
    pub value: f64,
}

/// Average per-point values within each bucket, rounded to the nearest
/// integer.  Buckets come back in chronological order; non-finite values
/// count as zero.
pub fn bucket_average(points: &[(NaiveDate, f64)], granularity: Granularity) -> Vec<Bucket> {
    let mut acc: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for &(date, value) in points {
        let slot = acc.entry(granularity.bucket_start(date)).or_insert((0.0, 0));
        slot.0 += if value.is_finite() { value } else { 0.0 };
        slot.1 += 1;
    }
    acc.into_iter()
        .map(|(start, (sum, n))| Bucket {
            start,
            label: granularity.bucket_label(start),
            value: (sum / n as f64).round(),
        })
        .collect()
}

/// Several category series bucketed onto a shared time axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketedSeries {
    /// Bucket start dates and labels, chronological.
    pub buckets: Vec<(NaiveDate, String)>,
    /// Per category, one averaged value per bucket.
    pub values: BTreeMap<String, Vec<f64>>,
}

impl BucketedSeries {
    /// Largest value across all categories, zero when empty.
    pub fn max_value(&self) -> f64 {
        self.values
            .values()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Bucket parallel series sharing `time_labels`.
///
/// `series[category][i]` is the value at `time_labels[i]`.  Categories
/// missing from `series`, and series shorter than the label list, contribute
/// zeros.  Malformed labels fall back to today's date.
pub fn bucket_series(
    time_labels: &[String],
    series: &BTreeMap<String, Vec<f64>>,
    categories: &[String],
    granularity: Granularity,
) -> BucketedSeries {
    let dates: Vec<NaiveDate> = time_labels.iter().map(|l| parse_date_or_today(l)).collect();

    let mut values = BTreeMap::new();
    let mut buckets = Vec::new();
    for category in categories {
        let raw = series.get(category);
        let points: Vec<(NaiveDate, f64)> = dates
            .iter()
            .enumerate()
            .map(|(i, &d)| (d, raw.and_then(|v| v.get(i)).copied().unwrap_or(0.0)))
            .collect();
        let bucketed = bucket_average(&points, granularity);
        if buckets.is_empty() {
            buckets = bucketed.iter().map(|b| (b.start, b.label.clone())).collect();
        }
        let averages = bucketed.into_iter().map(|b| b.value).collect();
        values.insert(category.clone(), averages);
    }

    BucketedSeries { buckets, values }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_buckets_average_not_sum() {
        // 2024-03-04 is a Monday, 2024-03-05 the Tuesday after.
        let points = [(ymd(2024, 3, 4), 4.0), (ymd(2024, 3, 5), 6.0)];
        let buckets = bucket_average(&points, Granularity::Weekly);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].value, 5.0);
        assert_eq!(buckets[0].start, ymd(2024, 3, 4));
        assert_eq!(buckets[0].label, "2024-W10");
    }

    #[test]
    fn averages_are_rounded() {
        let points = [
            (ymd(2024, 1, 2), 1.0),
            (ymd(2024, 1, 9), 2.0),
            (ymd(2024, 1, 20), 2.0),
        ];
        let buckets = bucket_average(&points, Granularity::Monthly);
        assert_eq!(buckets[0].value, 2.0); // 5 / 3 = 1.67
        assert_eq!(buckets[0].label, "2024-01");
    }

    #[test]
    fn quarter_starts() {
        let g = Granularity::Quarterly;
        assert_eq!(g.bucket_start(ymd(2024, 5, 17)), ymd(2024, 4, 1));
        assert_eq!(g.bucket_start(ymd(2024, 12, 31)), ymd(2024, 10, 1));
        assert_eq!(g.bucket_label(ymd(2024, 10, 1)), "2024-Q4");
    }

    #[test]
    fn weeks_crossing_a_year_use_iso_numbering() {
        let g = Granularity::Weekly;
        let start = g.bucket_start(ymd(2025, 1, 1));
        assert_eq!(start, ymd(2024, 12, 30));
        assert_eq!(g.bucket_label(start), "2025-W01");
    }

    #[test]
    fn buckets_are_chronological() {
        let points = [
            (ymd(2024, 6, 1), 1.0),
            (ymd(2024, 2, 1), 1.0),
            (ymd(2024, 4, 1), 1.0),
        ];
        let starts: Vec<NaiveDate> = bucket_average(&points, Granularity::Monthly)
            .into_iter()
            .map(|b| b.start)
            .collect();
        assert_eq!(starts, vec![ymd(2024, 2, 1), ymd(2024, 4, 1), ymd(2024, 6, 1)]);
    }

    #[test]
    fn missing_categories_and_points_count_as_zero() {
        let labels: Vec<String> = ["2024-01-01", "2024-01-02", "2024-02-01"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut series = BTreeMap::new();
        series.insert("Retail".to_string(), vec![4.0, 6.0]);
        series.insert("Finance".to_string(), vec![f64::NAN, 2.0, 8.0]);
        let categories = vec!["Retail".to_string(), "Finance".to_string(), "Energy".to_string()];

        let out = bucket_series(&labels, &series, &categories, Granularity::Monthly);
        assert_eq!(out.buckets.len(), 2);
        assert_eq!(out.values["Retail"], vec![5.0, 0.0]);
        assert_eq!(out.values["Finance"], vec![1.0, 8.0]);
        assert_eq!(out.values["Energy"], vec![0.0, 0.0]);
        assert_eq!(out.max_value(), 8.0);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let retail = ["Retail".to_string()];
        let out = bucket_series(&[], &BTreeMap::new(), &retail, Granularity::Weekly);
        assert!(out.buckets.is_empty());
        assert!(bucket_average(&[], Granularity::Quarterly).is_empty());
    }
}
