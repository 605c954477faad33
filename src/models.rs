use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AnalysisError;

/// Reserved country code for the world aggregate pseudo-country.
pub const WORLD_CODE: &str = "OWID_WRL";

/// One row of the daily dataset for a single country. Every metric is
/// independently nullable; null-filtering happens at the boundary of each
/// analysis, not here.
#[derive(Debug, Clone)]
pub struct DailyRecord {
    pub country_code: String,
    pub date: NaiveDate,
    pub new_cases: Option<f64>,
    pub total_cases: Option<f64>,
    pub new_deaths: Option<f64>,
    pub total_deaths: Option<f64>,
    pub new_cases_smoothed: Option<f64>,
    pub new_deaths_smoothed: Option<f64>,
    pub people_vaccinated_per_hundred: Option<f64>,
    pub total_vaccinations: Option<f64>,
    pub new_vaccinations: Option<f64>,
    pub hosp_patients_per_million: Option<f64>,
    pub icu_patients_per_million: Option<f64>,
    pub positive_rate: Option<f64>,
}

#[cfg(test)]
impl DailyRecord {
    /// All-null record for building synthetic series in module tests.
    pub fn blank(country_code: &str, date: NaiveDate) -> Self {
        Self {
            country_code: country_code.to_string(),
            date,
            new_cases: None,
            total_cases: None,
            new_deaths: None,
            total_deaths: None,
            new_cases_smoothed: None,
            new_deaths_smoothed: None,
            people_vaccinated_per_hundred: None,
            total_vaccinations: None,
            new_vaccinations: None,
            hosp_patients_per_million: None,
            icu_patients_per_million: None,
            positive_rate: None,
        }
    }
}

/// The closed set of analyzable numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    NewCases,
    TotalCases,
    NewDeaths,
    TotalDeaths,
    NewCasesSmoothed,
    NewDeathsSmoothed,
    HospPatientsPerMillion,
    IcuPatientsPerMillion,
    PositiveRate,
    NewVaccinations,
    TotalVaccinations,
    PeopleVaccinatedPerHundred,
}

impl Metric {
    pub fn parse(name: &str) -> Result<Metric, AnalysisError> {
        match name {
            "new_cases" => Ok(Metric::NewCases),
            "total_cases" => Ok(Metric::TotalCases),
            "new_deaths" => Ok(Metric::NewDeaths),
            "total_deaths" => Ok(Metric::TotalDeaths),
            "new_cases_smoothed" => Ok(Metric::NewCasesSmoothed),
            "new_deaths_smoothed" => Ok(Metric::NewDeathsSmoothed),
            "hosp_patients_per_million" => Ok(Metric::HospPatientsPerMillion),
            "icu_patients_per_million" => Ok(Metric::IcuPatientsPerMillion),
            "positive_rate" => Ok(Metric::PositiveRate),
            "new_vaccinations" => Ok(Metric::NewVaccinations),
            "total_vaccinations" => Ok(Metric::TotalVaccinations),
            "people_vaccinated_per_hundred" => Ok(Metric::PeopleVaccinatedPerHundred),
            other => Err(AnalysisError::InvalidMetric(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::NewCases => "new_cases",
            Metric::TotalCases => "total_cases",
            Metric::NewDeaths => "new_deaths",
            Metric::TotalDeaths => "total_deaths",
            Metric::NewCasesSmoothed => "new_cases_smoothed",
            Metric::NewDeathsSmoothed => "new_deaths_smoothed",
            Metric::HospPatientsPerMillion => "hosp_patients_per_million",
            Metric::IcuPatientsPerMillion => "icu_patients_per_million",
            Metric::PositiveRate => "positive_rate",
            Metric::NewVaccinations => "new_vaccinations",
            Metric::TotalVaccinations => "total_vaccinations",
            Metric::PeopleVaccinatedPerHundred => "people_vaccinated_per_hundred",
        }
    }

    pub fn value(&self, record: &DailyRecord) -> Option<f64> {
        match self {
            Metric::NewCases => record.new_cases,
            Metric::TotalCases => record.total_cases,
            Metric::NewDeaths => record.new_deaths,
            Metric::TotalDeaths => record.total_deaths,
            Metric::NewCasesSmoothed => record.new_cases_smoothed,
            Metric::NewDeathsSmoothed => record.new_deaths_smoothed,
            Metric::HospPatientsPerMillion => record.hosp_patients_per_million,
            Metric::IcuPatientsPerMillion => record.icu_patients_per_million,
            Metric::PositiveRate => record.positive_rate,
            Metric::NewVaccinations => record.new_vaccinations,
            Metric::TotalVaccinations => record.total_vaccinations,
            Metric::PeopleVaccinatedPerHundred => record.people_vaccinated_per_hundred,
        }
    }

    /// Pre-smoothed variants skip the wave detector's own moving average.
    pub fn is_smoothed(&self) -> bool {
        matches!(self, Metric::NewCasesSmoothed | Metric::NewDeathsSmoothed)
    }

    /// Cumulative totals are the only metrics the Negative Growth check
    /// applies to.
    pub fn is_cumulative(&self) -> bool {
        matches!(
            self,
            Metric::TotalCases | Metric::TotalDeaths | Metric::TotalVaccinations
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Wave {
    pub id: usize,
    pub start_date: NaiveDate,
    pub peak_date: NaiveDate,
    pub end_date: NaiveDate,
    pub peak_value: f64,
    pub total_cases: f64,
    pub duration_days: i64,
    pub avg_daily_growth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaveReport {
    pub metric: String,
    pub threshold: f64,
    pub total_points: usize,
    pub waves: Vec<Wave>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyPattern {
    pub month: u32,
    pub average_cases: f64,
    pub average_deaths: f64,
    pub case_variance: f64,
    pub death_variance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternInsight {
    pub pattern: String,
    pub description: String,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonalReport {
    pub seasonality_strength: f64,
    pub peak_month: u32,
    pub trough_month: u32,
    pub patterns: Vec<MonthlyPattern>,
    pub insights: Vec<PatternInsight>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierKind {
    Spike,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct Outlier {
    pub date: NaiveDate,
    pub value: f64,
    pub metric: String,
    pub z_score: f64,
    pub kind: OutlierKind,
    pub severity: OutlierSeverity,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataQualityIssue {
    pub date: NaiveDate,
    pub issue: String,
    pub severity: IssueSeverity,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportingArtifact {
    pub kind: String,
    pub description: String,
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub total_points: usize,
    pub outlier_count: usize,
    pub issue_count: usize,
    pub artifact_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    pub metric: String,
    pub outliers: Vec<Outlier>,
    pub quality_issues: Vec<DataQualityIssue>,
    pub artifacts: Vec<ReportingArtifact>,
    pub statistics: SeriesStatistics,
    pub quality_score: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VaccinationEffectiveness {
    pub overall: f64,
    pub against_hospitalization: f64,
    pub against_death: f64,
    /// Heuristic proxy (post-vaccination case rate / 10, capped at 50), not
    /// a clinical breakthrough-infection estimate.
    pub breakthrough_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoveragePoint {
    pub date: NaiveDate,
    pub coverage: f64,
    pub case_rate: f64,
    pub death_rate: f64,
    pub hosp_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub threshold: f64,
    pub label: String,
    pub date_reached: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VaccinationReport {
    pub effectiveness: VaccinationEffectiveness,
    pub timeline: Vec<CoveragePoint>,
    pub milestones: Vec<Milestone>,
    pub current_coverage: f64,
    pub total_vaccinations: f64,
    pub daily_vaccinations: f64,
    pub total_points: usize,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_round_trip() {
        for metric in [
            Metric::NewCases,
            Metric::TotalDeaths,
            Metric::NewCasesSmoothed,
            Metric::PeopleVaccinatedPerHundred,
        ] {
            assert_eq!(Metric::parse(metric.name()).unwrap(), metric);
        }
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let err = Metric::parse("reproduction_rate").unwrap_err();
        assert!(err.to_string().contains("reproduction_rate"));
    }

    #[test]
    fn smoothed_and_cumulative_flags() {
        assert!(Metric::NewCasesSmoothed.is_smoothed());
        assert!(!Metric::NewCases.is_smoothed());
        assert!(Metric::TotalCases.is_cumulative());
        assert!(!Metric::NewDeathsSmoothed.is_cumulative());
    }
}
