use chrono::Datelike;

use crate::models::{DailyRecord, MonthlyPattern, PatternInsight, SeasonalReport};
use crate::stats;

#[derive(Debug, Clone)]
pub struct SeasonalConfig {
    /// Months (of 12) that must carry a non-zero case average before a
    /// seasonality strength is computed.
    pub min_months_with_data: usize,
    /// Winter Surge fires when Dec-Feb averages exceed this multiple of the
    /// overall monthly average.
    pub winter_surge_ratio: f64,
    /// Summer Low fires when Jun-Aug averages fall below this multiple.
    pub summer_low_ratio: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            min_months_with_data: 7,
            winter_surge_ratio: 1.3,
            summer_low_ratio: 0.7,
        }
    }
}

/// Pool the full history by calendar month across all years and derive
/// per-month averages, a seasonality strength, and qualitative insights.
/// Smoothed values are preferred, raw values are the fallback, and
/// non-positive values are excluded from pooling.
pub fn analyze_seasonality(records: &[DailyRecord], cfg: &SeasonalConfig) -> SeasonalReport {
    let mut monthly_cases: Vec<Vec<f64>> = vec![Vec::new(); 12];
    let mut monthly_deaths: Vec<Vec<f64>> = vec![Vec::new(); 12];

    for record in records {
        let month_idx = record.date.month0() as usize;
        if let Some(cases) = record
            .new_cases_smoothed
            .or(record.new_cases)
            .filter(|v| *v > 0.0)
        {
            monthly_cases[month_idx].push(cases);
        }
        if let Some(deaths) = record
            .new_deaths_smoothed
            .or(record.new_deaths)
            .filter(|v| *v > 0.0)
        {
            monthly_deaths[month_idx].push(deaths);
        }
    }

    let patterns: Vec<MonthlyPattern> = (0..12)
        .map(|m| MonthlyPattern {
            month: m as u32 + 1,
            average_cases: stats::mean(&monthly_cases[m]),
            average_deaths: stats::mean(&monthly_deaths[m]),
            case_variance: stats::sample_variance(&monthly_cases[m]),
            death_variance: stats::sample_variance(&monthly_deaths[m]),
        })
        .collect();

    let case_averages: Vec<f64> = patterns.iter().map(|p| p.average_cases).collect();
    let months_with_data = case_averages.iter().filter(|&&v| v > 0.0).count();
    let overall_average = stats::mean(&case_averages);

    let (seasonality_strength, peak_month, trough_month, error) =
        if months_with_data >= cfg.min_months_with_data {
            let max = case_averages.iter().cloned().fold(f64::MIN, f64::max);
            let min = case_averages.iter().cloned().fold(f64::MAX, f64::min);
            let strength = if overall_average > 0.0 {
                (max - min) / overall_average
            } else {
                0.0
            };
            let peak = argmax(&case_averages) as u32 + 1;
            let trough = argmin(&case_averages) as u32 + 1;
            (strength, peak, trough, None)
        } else {
            let error = format!(
                "insufficient data: seasonal signal in only {months_with_data} of 12 months, \
                 need {}",
                cfg.min_months_with_data
            );
            (0.0, 1, 1, Some(error))
        };

    SeasonalReport {
        seasonality_strength,
        peak_month,
        trough_month,
        insights: pattern_insights(&case_averages, overall_average, cfg),
        patterns,
        error,
    }
}

fn pattern_insights(
    case_averages: &[f64],
    overall_average: f64,
    cfg: &SeasonalConfig,
) -> Vec<PatternInsight> {
    let mut insights = Vec::new();
    if overall_average <= 0.0 {
        return insights;
    }

    // Month indices are zero-based here: Dec/Jan/Feb and Jun/Jul/Aug.
    let winter = (case_averages[11] + case_averages[0] + case_averages[1]) / 3.0;
    if winter > overall_average * cfg.winter_surge_ratio {
        let strength = ((winter / overall_average - 1.0) * 100.0).round();
        insights.push(PatternInsight {
            pattern: "Winter Surge".to_string(),
            description: format!(
                "December-February cases run {strength:.0}% above the monthly baseline"
            ),
            strength,
        });
    }

    let summer = (case_averages[5] + case_averages[6] + case_averages[7]) / 3.0;
    if summer < overall_average * cfg.summer_low_ratio {
        let strength = ((1.0 - summer / overall_average) * 100.0).round();
        insights.push(PatternInsight {
            pattern: "Summer Low".to_string(),
            description: format!(
                "June-August cases run {strength:.0}% below the monthly baseline"
            ),
            strength,
        });
    }

    insights
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};

    fn year_of_cases(value_for_month: impl Fn(u32) -> f64) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        (0..365)
            .map(|i| {
                let date = start + Duration::days(i);
                let mut record = DailyRecord::blank("DML", date);
                record.new_cases = Some(value_for_month(date.month()));
                record
            })
            .collect()
    }

    #[test]
    fn equal_months_have_zero_strength() {
        let records = year_of_cases(|_| 100.0);
        let report = analyze_seasonality(&records, &SeasonalConfig::default());

        assert!(report.error.is_none());
        assert_eq!(report.seasonality_strength, 0.0);
        assert_eq!(report.peak_month, 1);
        assert!(report.insights.is_empty());
        for pattern in &report.patterns {
            assert_abs_diff_eq!(pattern.average_cases, 100.0);
            assert_abs_diff_eq!(pattern.case_variance, 0.0);
        }
    }

    #[test]
    fn winter_heavy_year_emits_surge_and_low() {
        let records = year_of_cases(|month| match month {
            12 | 1 | 2 => 300.0,
            _ => 100.0,
        });
        let report = analyze_seasonality(&records, &SeasonalConfig::default());

        // Overall monthly average is 150; winter runs at 300, summer at 100.
        assert!(report.error.is_none());
        assert_abs_diff_eq!(report.seasonality_strength, 200.0 / 150.0, epsilon = 1e-12);
        assert_eq!(report.peak_month, 1);
        assert_eq!(report.trough_month, 3);

        let winter = report
            .insights
            .iter()
            .find(|i| i.pattern == "Winter Surge")
            .expect("winter surge expected");
        assert_abs_diff_eq!(winter.strength, 100.0);

        let summer = report
            .insights
            .iter()
            .find(|i| i.pattern == "Summer Low")
            .expect("summer low expected");
        assert_abs_diff_eq!(summer.strength, 33.0);
    }

    #[test]
    fn sparse_history_reports_insufficient_data() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let records: Vec<DailyRecord> = (0..60)
            .map(|i| {
                let mut record = DailyRecord::blank("DML", start + Duration::days(i));
                record.new_cases = Some(50.0);
                record
            })
            .collect();
        let report = analyze_seasonality(&records, &SeasonalConfig::default());

        assert_eq!(report.seasonality_strength, 0.0);
        assert_eq!(report.peak_month, 1);
        assert_eq!(report.trough_month, 1);
        let error = report.error.expect("sparse history should carry an error");
        assert!(error.contains("insufficient"));
    }

    #[test]
    fn deaths_fall_back_to_raw_values() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let records: Vec<DailyRecord> = (0..365)
            .map(|i| {
                let mut record = DailyRecord::blank("DML", start + Duration::days(i));
                record.new_cases_smoothed = Some(80.0);
                record.new_deaths = Some(4.0);
                record
            })
            .collect();
        let report = analyze_seasonality(&records, &SeasonalConfig::default());

        for pattern in &report.patterns {
            assert_abs_diff_eq!(pattern.average_cases, 80.0);
            assert_abs_diff_eq!(pattern.average_deaths, 4.0);
        }
    }
}
