use chrono::{Duration, NaiveDate};

use crate::models::{
    CoveragePoint, DailyRecord, Milestone, VaccinationEffectiveness, VaccinationReport,
};
use crate::stats;

/// Coverage thresholds the milestone tracker reports on, in percent.
pub const MILESTONE_THRESHOLDS: [f64; 5] = [10.0, 25.0, 50.0, 70.0, 80.0];

#[derive(Debug, Clone)]
pub struct VaccinationConfig {
    /// Analysis window: trailing days from the as-of date.
    pub window_days: i64,
    /// Pre-vaccination cohort: coverage strictly below this percentage.
    pub pre_coverage_max: f64,
    /// Post-vaccination cohort: coverage at or above this percentage.
    pub post_coverage_min: f64,
    /// Breakthrough proxy: post-cohort case rate divided by this, capped.
    pub breakthrough_divisor: f64,
    pub breakthrough_cap: f64,
}

impl Default for VaccinationConfig {
    fn default() -> Self {
        Self {
            window_days: 365,
            pre_coverage_max: 10.0,
            post_coverage_min: 50.0,
            breakthrough_divisor: 10.0,
            breakthrough_cap: 50.0,
        }
    }
}

/// Compare pre- and post-vaccination cohorts over the trailing year and track
/// coverage milestones. The effectiveness percentages are crude cohort
/// comparisons and `breakthrough_rate` in particular is a heuristic proxy
/// (post-cohort case rate / 10, capped at 50), not a clinical estimate.
pub fn estimate_effectiveness(
    records: &[DailyRecord],
    as_of: NaiveDate,
    cfg: &VaccinationConfig,
) -> VaccinationReport {
    let window_start = as_of - Duration::days(cfg.window_days);
    let window: Vec<&DailyRecord> = records
        .iter()
        .filter(|r| r.date >= window_start && r.date <= as_of)
        .collect();

    let timeline: Vec<CoveragePoint> = window
        .iter()
        .filter_map(|r| {
            r.people_vaccinated_per_hundred.map(|coverage| CoveragePoint {
                date: r.date,
                coverage,
                case_rate: r.new_cases_smoothed.unwrap_or(0.0),
                death_rate: r.new_deaths_smoothed.unwrap_or(0.0),
                hosp_rate: r.hosp_patients_per_million.unwrap_or(0.0),
            })
        })
        .collect();

    if timeline.is_empty() {
        return VaccinationReport {
            effectiveness: zero_effectiveness(),
            milestones: milestones(&timeline),
            timeline,
            current_coverage: 0.0,
            total_vaccinations: 0.0,
            daily_vaccinations: 0.0,
            total_points: 0,
            error: Some("no vaccination data in the trailing 12 months".to_string()),
        };
    }

    let milestones = milestones(&timeline);
    let current_coverage = timeline.last().map(|p| p.coverage).unwrap_or(0.0);
    let total_vaccinations = last_value(&window, |r| r.total_vaccinations);
    let daily_vaccinations = last_value(&window, |r| r.new_vaccinations);
    let total_points = timeline.len();

    let pre: Vec<&CoveragePoint> = timeline
        .iter()
        .filter(|p| p.coverage < cfg.pre_coverage_max)
        .collect();
    let post: Vec<&CoveragePoint> = timeline
        .iter()
        .filter(|p| p.coverage >= cfg.post_coverage_min)
        .collect();

    if pre.is_empty() || post.is_empty() {
        let pre_len = pre.len();
        let post_len = post.len();
        return VaccinationReport {
            effectiveness: zero_effectiveness(),
            timeline,
            milestones,
            current_coverage,
            total_vaccinations,
            daily_vaccinations,
            total_points,
            error: Some(format!(
                "cannot separate cohorts: {} pre-vaccination and {} post-vaccination points \
                 in the window",
                pre_len,
                post_len
            )),
        };
    }

    let pre_case = stats::mean(&pre.iter().map(|p| p.case_rate).collect::<Vec<_>>());
    let post_case = stats::mean(&post.iter().map(|p| p.case_rate).collect::<Vec<_>>());
    let pre_death = stats::mean(&pre.iter().map(|p| p.death_rate).collect::<Vec<_>>());
    let post_death = stats::mean(&post.iter().map(|p| p.death_rate).collect::<Vec<_>>());
    let pre_hosp = stats::mean(&pre.iter().map(|p| p.hosp_rate).collect::<Vec<_>>());
    let post_hosp = stats::mean(&post.iter().map(|p| p.hosp_rate).collect::<Vec<_>>());

    let effectiveness = VaccinationEffectiveness {
        overall: relative_reduction(pre_case, post_case),
        against_hospitalization: relative_reduction(pre_hosp, post_hosp),
        against_death: relative_reduction(pre_death, post_death),
        breakthrough_rate: (post_case / cfg.breakthrough_divisor).min(cfg.breakthrough_cap),
    };

    VaccinationReport {
        effectiveness,
        timeline,
        milestones,
        current_coverage,
        total_vaccinations,
        daily_vaccinations,
        total_points,
        error: None,
    }
}

/// Percentage reduction from the pre-cohort rate to the post-cohort rate,
/// clamped to 0..=100; 0 when there is no pre-cohort signal to compare.
fn relative_reduction(pre_rate: f64, post_rate: f64) -> f64 {
    if pre_rate <= 0.0 {
        return 0.0;
    }
    ((pre_rate - post_rate) / pre_rate * 100.0).clamp(0.0, 100.0)
}

fn milestones(timeline: &[CoveragePoint]) -> Vec<Milestone> {
    MILESTONE_THRESHOLDS
        .iter()
        .map(|&threshold| Milestone {
            threshold,
            label: format!("{threshold:.0}% of population vaccinated"),
            date_reached: timeline
                .iter()
                .find(|p| p.coverage >= threshold)
                .map(|p| p.date),
        })
        .collect()
}

fn last_value(window: &[&DailyRecord], field: impl Fn(&DailyRecord) -> Option<f64>) -> f64 {
    window
        .iter()
        .rev()
        .find_map(|r| field(r))
        .unwrap_or(0.0)
}

fn zero_effectiveness() -> VaccinationEffectiveness {
    VaccinationEffectiveness {
        overall: 0.0,
        against_hospitalization: 0.0,
        against_death: 0.0,
        breakthrough_rate: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn rollout(days: i64, coverage_per_day: f64) -> (Vec<DailyRecord>, NaiveDate) {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let records = (0..days)
            .map(|i| {
                let mut record = DailyRecord::blank("DML", start + Duration::days(i));
                record.people_vaccinated_per_hundred = Some(coverage_per_day * i as f64);
                record.new_cases_smoothed = Some(100.0 - 0.4 * i as f64);
                record.new_deaths_smoothed = Some(10.0 - 0.04 * i as f64);
                record.hosp_patients_per_million = Some(50.0 - 0.2 * i as f64);
                record.new_vaccinations = Some(40_000.0);
                record.total_vaccinations = Some(40_000.0 * (i + 1) as f64);
                record
            })
            .collect();
        (records, start + Duration::days(days - 1))
    }

    #[test]
    fn full_rollout_yields_positive_effectiveness() {
        let (records, as_of) = rollout(220, 0.4);
        let report = estimate_effectiveness(&records, as_of, &VaccinationConfig::default());

        assert!(report.error.is_none());
        assert!(report.effectiveness.overall > 0.0);
        assert!(report.effectiveness.overall <= 100.0);
        assert!(report.effectiveness.against_death > 0.0);
        assert!(report.effectiveness.against_hospitalization > 0.0);
        assert!(report.effectiveness.breakthrough_rate > 0.0);
        assert!(report.effectiveness.breakthrough_rate <= 50.0);
        assert_abs_diff_eq!(report.current_coverage, 0.4 * 219.0);
        assert_eq!(report.total_points, 220);
        assert_abs_diff_eq!(report.daily_vaccinations, 40_000.0);
        assert_abs_diff_eq!(report.total_vaccinations, 40_000.0 * 220.0);
    }

    #[test]
    fn milestone_dates_are_monotone_in_threshold_order() {
        let (records, as_of) = rollout(220, 0.4);
        let report = estimate_effectiveness(&records, as_of, &VaccinationConfig::default());

        let reached: Vec<NaiveDate> = report
            .milestones
            .iter()
            .filter_map(|m| m.date_reached)
            .collect();
        assert_eq!(reached.len(), MILESTONE_THRESHOLDS.len());
        assert!(reached.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn stalled_rollout_returns_zero_effectiveness_with_error() {
        // Coverage tops out near 40%, so the post cohort never exists.
        let (records, as_of) = rollout(200, 0.2);
        let report = estimate_effectiveness(&records, as_of, &VaccinationConfig::default());

        let error = report.error.expect("stalled rollout should carry an error");
        assert!(!error.is_empty());
        assert_eq!(report.effectiveness.overall, 0.0);
        assert_eq!(report.effectiveness.against_death, 0.0);
        assert_eq!(report.effectiveness.against_hospitalization, 0.0);
        assert_eq!(report.effectiveness.breakthrough_rate, 0.0);
        // Milestones below the stall point are still reported.
        assert!(report.milestones[0].date_reached.is_some());
        assert!(report.milestones[4].date_reached.is_none());
    }

    #[test]
    fn series_without_coverage_reports_no_data() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let records: Vec<DailyRecord> = (0..60)
            .map(|i| {
                let mut record = DailyRecord::blank("DML", start + Duration::days(i));
                record.new_cases_smoothed = Some(100.0);
                record
            })
            .collect();
        let report = estimate_effectiveness(
            &records,
            start + Duration::days(59),
            &VaccinationConfig::default(),
        );

        assert_eq!(report.total_points, 0);
        assert!(report.timeline.is_empty());
        assert!(report.error.is_some());
        assert!(report.milestones.iter().all(|m| m.date_reached.is_none()));
    }
}
