use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{DailyRecord, Metric};
use crate::outliers::{self, OutlierConfig};
use crate::seasonal::{self, SeasonalConfig};
use crate::vaccination::{self, VaccinationConfig};
use crate::waves::{self, WaveConfig};

pub fn build_report(country: &str, as_of: NaiveDate, records: &[DailyRecord]) -> String {
    let wave_report = waves::detect_waves(records, Metric::NewCasesSmoothed, &WaveConfig::default());
    let seasonal_report = seasonal::analyze_seasonality(records, &SeasonalConfig::default());
    let outlier_report =
        outliers::detect_outliers(records, Metric::NewCasesSmoothed, &OutlierConfig::default());
    let vaccination_report =
        vaccination::estimate_effectiveness(records, as_of, &VaccinationConfig::default());

    let mut output = String::new();

    let _ = writeln!(output, "# Epidemic Insight Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} daily records, as of {})",
        country,
        records.len(),
        as_of
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Case Waves");

    if let Some(error) = &wave_report.error {
        let _ = writeln!(output, "No waves detected: {error}.");
    } else if wave_report.waves.is_empty() {
        let _ = writeln!(output, "No waves detected in this series.");
    } else {
        for wave in &wave_report.waves {
            let _ = writeln!(
                output,
                "- Wave {}: {} to {}, peaked at {:.0} on {} ({} days, {:.0} total cases)",
                wave.id,
                wave.start_date,
                wave.end_date,
                wave.peak_value,
                wave.peak_date,
                wave.duration_days,
                wave.total_cases
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Seasonality");

    if let Some(error) = &seasonal_report.error {
        let _ = writeln!(output, "No seasonal profile: {error}.");
    } else {
        let _ = writeln!(
            output,
            "Seasonality strength {:.2}; cases peak in {} and bottom out in {}.",
            seasonal_report.seasonality_strength,
            month_name(seasonal_report.peak_month),
            month_name(seasonal_report.trough_month)
        );
        for insight in &seasonal_report.insights {
            let _ = writeln!(output, "- {}: {}", insight.pattern, insight.description);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Quality");

    if let Some(error) = &outlier_report.error {
        let _ = writeln!(output, "No quality assessment: {error}.");
    } else {
        let _ = writeln!(
            output,
            "Quality score {:.2} across {} points ({} outliers, {} issues, {} artifacts).",
            outlier_report.quality_score,
            outlier_report.statistics.total_points,
            outlier_report.statistics.outlier_count,
            outlier_report.statistics.issue_count,
            outlier_report.statistics.artifact_count
        );
        for outlier in outlier_report.outliers.iter().take(5) {
            let _ = writeln!(output, "- {}: {}", outlier.date, outlier.description);
        }
        for artifact in &outlier_report.artifacts {
            let _ = writeln!(output, "- {}: {}", artifact.kind, artifact.description);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Vaccination");

    if let Some(error) = &vaccination_report.error {
        let _ = writeln!(output, "No effectiveness estimate: {error}.");
    } else {
        let effectiveness = &vaccination_report.effectiveness;
        let _ = writeln!(
            output,
            "Estimated effectiveness: {:.0}% overall, {:.0}% against hospitalization, \
             {:.0}% against death (coverage {:.1}%).",
            effectiveness.overall,
            effectiveness.against_hospitalization,
            effectiveness.against_death,
            vaccination_report.current_coverage
        );
    }
    for milestone in &vaccination_report.milestones {
        match milestone.date_reached {
            Some(date) => {
                let _ = writeln!(output, "- {}: reached {}", milestone.label, date);
            }
            None => {
                let _ = writeln!(output, "- {}: not reached", milestone.label);
            }
        }
    }

    output
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}
