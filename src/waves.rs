use tracing::debug;

use crate::error::AnalysisError;
use crate::models::{DailyRecord, Metric, Wave, WaveReport};
use crate::smoothing;
use crate::stats;

/// Tunables for wave segmentation. The defaults were tuned empirically on
/// country-level COVID-19 case counts; whether they generalize to other
/// datasets is untested.
#[derive(Debug, Clone)]
pub struct WaveConfig {
    /// Moving-average radius applied to metrics that are not pre-smoothed.
    pub smoothing_radius: usize,
    /// Minimum valid points before any detection is attempted.
    pub min_points: usize,
    /// Minimum accepted wave length, and the point at which scanning stops.
    pub min_wave_days: usize,
    /// Dynamic threshold = max(median * median_factor, p75 * p75_factor).
    pub median_factor: f64,
    pub p75_factor: f64,
    /// A wave may start once the value exceeds threshold * start_ratio.
    pub start_ratio: f64,
    /// Growth-over-a-week signal: value[j + lookahead] > value[j] * growth_ratio.
    pub growth_ratio: f64,
    pub lookahead_days: usize,
    /// How far past the start the peak search extends.
    pub peak_scan_days: usize,
    /// Days past the running peak before a sustained decline ends the search.
    pub peak_patience_days: usize,
    /// Sustained decline means the value fell below peak * decline_ratio.
    pub decline_ratio: f64,
    /// How far past the peak the end search extends.
    pub end_scan_days: usize,
    /// A wave ends once the value falls to peak * end_ratio ...
    pub end_ratio: f64,
    /// ... and none of the following lookahead_days exceed peak * rebound_ratio.
    pub rebound_ratio: f64,
    /// End fallback when the decline never confirms: peak + end_fallback_days.
    pub end_fallback_days: usize,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            smoothing_radius: 3,
            min_points: 21,
            min_wave_days: 14,
            median_factor: 1.25,
            p75_factor: 0.5,
            start_ratio: 0.3,
            growth_ratio: 1.5,
            lookahead_days: 7,
            peak_scan_days: 90,
            peak_patience_days: 14,
            decline_ratio: 0.7,
            end_scan_days: 120,
            end_ratio: 0.3,
            rebound_ratio: 0.45,
            end_fallback_days: 90,
        }
    }
}

/// Segment one metric's series into discrete waves. Total function: data
/// problems surface in the report's `error` field, never as a panic or `Err`.
pub fn detect_waves(records: &[DailyRecord], metric: Metric, cfg: &WaveConfig) -> WaveReport {
    let mut dates = Vec::new();
    let mut raw = Vec::new();
    for record in records {
        if let Some(value) = metric.value(record) {
            if value > 0.0 {
                dates.push(record.date);
                raw.push(value);
            }
        }
    }

    if raw.is_empty() {
        return empty_report(metric, 0, Some(AnalysisError::NoData.to_string()));
    }
    if raw.len() < cfg.min_points {
        let err = AnalysisError::InsufficientData {
            needed: cfg.min_points,
            have: raw.len(),
        };
        return empty_report(metric, raw.len(), Some(err.to_string()));
    }

    let values = if metric.is_smoothed() {
        raw
    } else {
        smoothing::moving_average(&raw, cfg.smoothing_radius)
    };

    let threshold = dynamic_threshold(&values, cfg);
    debug!(metric = metric.name(), threshold, "computed dynamic wave threshold");

    let n = values.len();
    let mut waves: Vec<Wave> = Vec::new();
    let mut i = 0usize;

    while n - i >= cfg.min_wave_days {
        // Wave start: above the entry threshold and still growing 1.5x over
        // the following week. The scan stops a week short of the series end
        // so the growth signal always has data to look at.
        let mut found_start = None;
        for j in i..n.saturating_sub(cfg.lookahead_days) {
            if values[j] > threshold * cfg.start_ratio
                && values[j + cfg.lookahead_days] > values[j] * cfg.growth_ratio
            {
                found_start = Some(j);
                break;
            }
        }
        let Some(start) = found_start else { break };

        // Peak: running maximum over a bounded window, cut short once the
        // series has clearly rolled over.
        let mut peak = start;
        let mut peak_value = values[start];
        let peak_scan_end = (start + cfg.peak_scan_days).min(n - 1);
        for k in start..=peak_scan_end {
            if values[k] > peak_value {
                peak = k;
                peak_value = values[k];
            }
            if k > peak + cfg.peak_patience_days && values[k] < peak_value * cfg.decline_ratio {
                break;
            }
        }
        if peak_value < threshold {
            i = start + 1;
            continue;
        }

        // End: first sustained drop below end_ratio of the peak. A candidate
        // is rejected if any of the following week rebounds past
        // rebound_ratio of the peak.
        let mut found_end = None;
        let end_scan_limit = (peak + cfg.end_scan_days).min(n - 1);
        let mut m = peak + cfg.lookahead_days;
        while m <= end_scan_limit {
            if values[m] <= peak_value * cfg.end_ratio {
                let confirm_to = (m + cfg.lookahead_days).min(n - 1);
                let rebounds = values[m + 1..=confirm_to]
                    .iter()
                    .any(|&v| v > peak_value * cfg.rebound_ratio);
                if !rebounds {
                    found_end = Some(m);
                    break;
                }
            }
            m += 1;
        }
        let end = found_end.unwrap_or_else(|| (peak + cfg.end_fallback_days).min(n - 1));

        if end - start + 1 < cfg.min_wave_days {
            i = peak + 1;
            continue;
        }

        let total_cases: f64 = values[start..=end].iter().sum();
        let mut growth_terms = Vec::new();
        for k in start + 1..=end {
            let prev = values[k - 1];
            if prev != 0.0 {
                growth_terms.push((values[k] - prev) / prev);
            }
        }

        waves.push(Wave {
            id: waves.len() + 1,
            start_date: dates[start],
            peak_date: dates[peak],
            end_date: dates[end],
            peak_value,
            total_cases,
            duration_days: (dates[end] - dates[start]).num_days() + 1,
            avg_daily_growth: stats::mean(&growth_terms),
        });

        i = end + 1;
    }

    WaveReport {
        metric: metric.name().to_string(),
        threshold,
        total_points: n,
        waves,
        error: None,
    }
}

/// Detection cutoff derived from the series' own scale, so the same config
/// works for countries reporting tens or hundreds of thousands of cases.
fn dynamic_threshold(values: &[f64], cfg: &WaveConfig) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = stats::percentile(&sorted, 50.0);
    let p75 = stats::percentile(&sorted, 75.0);
    (median * cfg.median_factor).max(p75 * cfg.p75_factor)
}

fn empty_report(metric: Metric, total_points: usize, error: Option<String>) -> WaveReport {
    WaveReport {
        metric: metric.name().to_string(),
        threshold: 0.0,
        total_points,
        waves: Vec::new(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(values: &[f64]) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let mut record = DailyRecord::blank("DML", start + Duration::days(i as i64));
                record.new_cases_smoothed = if v > 0.0 { Some(v) } else { None };
                record
            })
            .collect()
    }

    fn triangular_ramp() -> Vec<f64> {
        // 60 days ramping 10 -> 1000 -> 43 around a single peak at day 30.
        (0..60)
            .map(|i| 1000.0 - 33.0 * (30 - i as i64).abs() as f64)
            .collect()
    }

    #[test]
    fn single_ramp_yields_one_wave_at_injected_peak() {
        let values = triangular_ramp();
        let records = series(&values);
        let report = detect_waves(&records, Metric::NewCasesSmoothed, &WaveConfig::default());

        assert!(report.error.is_none());
        assert_eq!(report.waves.len(), 1);
        let wave = &report.waves[0];
        assert_eq!(wave.id, 1);
        assert_eq!(wave.peak_value, 1000.0);
        assert_eq!(
            wave.peak_date,
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap() + Duration::days(30)
        );
        assert!(wave.duration_days >= 14);
        assert!(wave.avg_daily_growth > 0.0);
    }

    #[test]
    fn total_cases_matches_sum_over_wave_window() {
        let values = triangular_ramp();
        let records = series(&values);
        let report = detect_waves(&records, Metric::NewCasesSmoothed, &WaveConfig::default());

        let wave = &report.waves[0];
        let expected: f64 = records
            .iter()
            .filter(|r| r.date >= wave.start_date && r.date <= wave.end_date)
            .filter_map(|r| r.new_cases_smoothed)
            .sum();
        assert!((wave.total_cases - expected).abs() < 1e-9);
    }

    #[test]
    fn all_zero_series_yields_no_waves() {
        let records = series(&vec![0.0; 120]);
        let report = detect_waves(&records, Metric::NewCasesSmoothed, &WaveConfig::default());
        assert!(report.waves.is_empty());
    }

    #[test]
    fn short_series_reports_insufficient_data() {
        let records = series(&vec![50.0; 15]);
        let report = detect_waves(&records, Metric::NewCasesSmoothed, &WaveConfig::default());
        assert!(report.waves.is_empty());
        let error = report.error.expect("short series should carry an error");
        assert!(error.contains("insufficient"));
    }

    #[test]
    fn flat_series_has_no_growth_signal() {
        let records = series(&vec![100.0; 90]);
        let report = detect_waves(&records, Metric::NewCasesSmoothed, &WaveConfig::default());
        assert!(report.waves.is_empty());
        assert!(report.error.is_none());
    }
}
