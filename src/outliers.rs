use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::AnalysisError;
use crate::models::{
    DailyRecord, DataQualityIssue, IssueSeverity, Metric, Outlier, OutlierKind, OutlierReport,
    OutlierSeverity, ReportingArtifact, SeriesStatistics,
};
use crate::stats;

#[derive(Debug, Clone)]
pub struct OutlierConfig {
    /// Minimum valid points before any classification is attempted.
    pub min_points: usize,
    /// Z-score above which a point is flagged at all.
    pub z_threshold: f64,
    /// Severity cutoffs: medium above z_medium, high above z_high.
    pub z_medium: f64,
    pub z_high: f64,
    /// Sudden Jump fires when a value changes by this fraction day-over-day.
    pub jump_ratio: f64,
    /// Samples at each end of the series exempt from the Missing Data check.
    pub edge_margin: usize,
    /// Weekly artifact fires when the weekday-average spread exceeds this
    /// fraction of the overall mean.
    pub weekday_variation_ratio: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            min_points: 10,
            z_threshold: 2.5,
            z_medium: 3.0,
            z_high: 3.5,
            jump_ratio: 5.0,
            edge_margin: 30,
            weekday_variation_ratio: 0.5,
        }
    }
}

/// Classify z-score outliers, run pairwise data-quality checks, detect weekly
/// reporting artifacts, and grade the series with an aggregate quality score.
/// Nulls and negative values are dropped at the boundary; zeros are kept so
/// the Missing Data check has something to look at.
pub fn detect_outliers(records: &[DailyRecord], metric: Metric, cfg: &OutlierConfig) -> OutlierReport {
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    for record in records {
        if let Some(value) = metric.value(record) {
            if value >= 0.0 {
                dates.push(record.date);
                values.push(value);
            }
        }
    }

    if values.len() < cfg.min_points {
        let error = if values.is_empty() {
            AnalysisError::NoData.to_string()
        } else {
            AnalysisError::InsufficientData {
                needed: cfg.min_points,
                have: values.len(),
            }
            .to_string()
        };
        return OutlierReport {
            metric: metric.name().to_string(),
            outliers: Vec::new(),
            quality_issues: Vec::new(),
            artifacts: Vec::new(),
            statistics: SeriesStatistics {
                mean: 0.0,
                std_dev: 0.0,
                total_points: values.len(),
                outlier_count: 0,
                issue_count: 0,
                artifact_count: 0,
            },
            quality_score: 0.0,
            error: Some(error),
        };
    }

    let mean = stats::mean(&values);
    let std_dev = stats::population_std_dev(&values);

    let mut outliers = classify_outliers(&dates, &values, metric, mean, std_dev, cfg);
    outliers.sort_by(|a, b| {
        b.z_score
            .partial_cmp(&a.z_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let quality_issues = quality_checks(&dates, &values, metric, cfg);
    let artifacts = weekly_artifacts(&dates, &values, mean, cfg);

    let warning_count = quality_issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Warning)
        .count();
    let error_count = quality_issues.len() - warning_count;

    let mut score = 100.0;
    score -= (2.0 * outliers.len() as f64).min(30.0);
    score -= (5.0 * error_count as f64).min(20.0);
    score -= (2.0 * warning_count as f64).min(15.0);
    score -= (5.0 * artifacts.len() as f64).min(10.0);
    let quality_score = score.max(0.0) / 100.0;

    OutlierReport {
        metric: metric.name().to_string(),
        statistics: SeriesStatistics {
            mean,
            std_dev,
            total_points: values.len(),
            outlier_count: outliers.len(),
            issue_count: quality_issues.len(),
            artifact_count: artifacts.len(),
        },
        outliers,
        quality_issues,
        artifacts,
        quality_score,
        error: None,
    }
}

fn classify_outliers(
    dates: &[NaiveDate],
    values: &[f64],
    metric: Metric,
    mean: f64,
    std_dev: f64,
    cfg: &OutlierConfig,
) -> Vec<Outlier> {
    let mut outliers = Vec::new();
    for (i, &value) in values.iter().enumerate() {
        let z_score = if std_dev == 0.0 {
            0.0
        } else {
            (value - mean).abs() / std_dev
        };
        if z_score <= cfg.z_threshold {
            continue;
        }

        let severity = if z_score > cfg.z_high {
            OutlierSeverity::High
        } else if z_score > cfg.z_medium {
            OutlierSeverity::Medium
        } else {
            OutlierSeverity::Low
        };
        let (kind, direction) = if value > mean {
            (OutlierKind::Spike, "above")
        } else {
            (OutlierKind::Drop, "below")
        };

        outliers.push(Outlier {
            date: dates[i],
            value,
            metric: metric.name().to_string(),
            z_score,
            kind,
            severity,
            description: format!(
                "{} of {value:.0} is {z_score:.1} standard deviations {direction} the mean",
                metric.name()
            ),
        });
    }
    outliers
}

fn quality_checks(
    dates: &[NaiveDate],
    values: &[f64],
    metric: Metric,
    cfg: &OutlierConfig,
) -> Vec<DataQualityIssue> {
    let mut issues = Vec::new();
    let len = values.len();

    for i in 1..len {
        let prev = values[i - 1];
        let value = values[i];

        if prev > 0.0 && (value - prev).abs() / prev > cfg.jump_ratio {
            issues.push(DataQualityIssue {
                date: dates[i],
                issue: "Sudden Jump".to_string(),
                severity: IssueSeverity::Warning,
                description: format!(
                    "value changed {:.0}% in a single day ({prev:.0} to {value:.0})",
                    (value - prev).abs() / prev * 100.0
                ),
            });
        }

        if metric.is_cumulative() && value < prev {
            issues.push(DataQualityIssue {
                date: dates[i],
                issue: "Negative Growth".to_string(),
                severity: IssueSeverity::Error,
                description: format!("cumulative total fell from {prev:.0} to {value:.0}"),
            });
        }

        if value == 0.0 && i > cfg.edge_margin && i + cfg.edge_margin < len {
            issues.push(DataQualityIssue {
                date: dates[i],
                issue: "Missing Data".to_string(),
                severity: IssueSeverity::Warning,
                description: "zero reported inside the active period".to_string(),
            });
        }
    }

    issues
}

fn weekly_artifacts(
    dates: &[NaiveDate],
    values: &[f64],
    overall_mean: f64,
    cfg: &OutlierConfig,
) -> Vec<ReportingArtifact> {
    let mut sums = [0.0f64; 7];
    let mut counts = [0usize; 7];
    for (date, &value) in dates.iter().zip(values) {
        let day = date.weekday().num_days_from_monday() as usize;
        sums[day] += value;
        counts[day] += 1;
    }

    const WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    let mut day_averages: Vec<(Weekday, f64)> = Vec::new();
    for day in 0..7 {
        if counts[day] > 0 {
            day_averages.push((WEEK[day], sums[day] / counts[day] as f64));
        }
    }

    let mut artifacts = Vec::new();
    if overall_mean > 0.0 && !day_averages.is_empty() {
        let (max_day, max_avg) = day_averages
            .iter()
            .cloned()
            .fold((Weekday::Mon, f64::MIN), |acc, d| if d.1 > acc.1 { d } else { acc });
        let (min_day, min_avg) = day_averages
            .iter()
            .cloned()
            .fold((Weekday::Mon, f64::MAX), |acc, d| if d.1 < acc.1 { d } else { acc });

        let variation = (max_avg - min_avg) / overall_mean;
        if variation > cfg.weekday_variation_ratio {
            artifacts.push(ReportingArtifact {
                kind: "Weekly Reporting Pattern".to_string(),
                description: format!(
                    "reported counts peak on {} and dip on {}, a day-of-week collection \
                     pattern rather than an epidemiological signal",
                    weekday_name(max_day),
                    weekday_name(min_day)
                ),
                strength: (variation * 100.0).round(),
            });
        }
    }

    artifacts
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
