use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::DailyRecord;
use crate::smoothing;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Deterministic synthetic country with two case waves, a lagged death
/// signal, a vaccination ramp crossing every milestone, and a Sunday
/// reporting dip, so every analysis has material to chew on out of the box.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO epi_insights.countries (code, name)
        VALUES ($1, $2)
        ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind("DML")
    .bind("Demoland")
    .execute(pool)
    .await?;

    let start = NaiveDate::from_ymd_opt(2020, 3, 1).context("invalid seed start date")?;
    let days = 420usize;

    let mut new_cases = Vec::with_capacity(days);
    for i in 0..days {
        let date = start + Duration::days(i as i64);
        let t = i as f64;
        let wave1 = 800.0 * (-((t - 60.0) * (t - 60.0)) / (2.0 * 25.0 * 25.0)).exp();
        let wave2 = 1500.0 * (-((t - 240.0) * (t - 240.0)) / (2.0 * 30.0 * 30.0)).exp();
        let weekday_factor = if date.weekday() == Weekday::Sun { 0.65 } else { 1.0 };
        new_cases.push(((wave1 + wave2 + 20.0) * weekday_factor).round());
    }
    let cases_smoothed = smoothing::moving_average(&new_cases, 3);

    let mut total_cases = 0.0;
    let mut total_deaths = 0.0;
    let mut total_vaccinations = 0.0;
    let mut death_series = Vec::with_capacity(days);
    for i in 0..days {
        let lagged = if i >= 14 { new_cases[i - 14] } else { new_cases[i] };
        death_series.push((lagged * 0.015).round().max(0.0));
    }
    let deaths_smoothed = smoothing::moving_average(&death_series, 3);

    for i in 0..days {
        let date = start + Duration::days(i as i64);
        total_cases += new_cases[i];
        total_deaths += death_series[i];

        let (coverage, daily_vax) = if i >= 180 {
            let coverage = ((i as f64 - 180.0) * 0.4).min(85.0);
            (Some(coverage), Some(60_000.0))
        } else {
            (None, None)
        };
        if let Some(v) = daily_vax {
            total_vaccinations += v;
        }

        sqlx::query(
            r#"
            INSERT INTO epi_insights.daily_records
            (country_code, record_date, new_cases, total_cases, new_deaths, total_deaths,
             new_cases_smoothed, new_deaths_smoothed, people_vaccinated_per_hundred,
             total_vaccinations, new_vaccinations, hosp_patients_per_million,
             icu_patients_per_million, positive_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (country_code, record_date) DO NOTHING
            "#,
        )
        .bind("DML")
        .bind(date)
        .bind(new_cases[i])
        .bind(total_cases)
        .bind(death_series[i])
        .bind(total_deaths)
        .bind(cases_smoothed[i])
        .bind(deaths_smoothed[i])
        .bind(coverage)
        .bind(daily_vax.map(|_| total_vaccinations))
        .bind(daily_vax)
        .bind(cases_smoothed[i] * 0.08)
        .bind(cases_smoothed[i] * 0.02)
        .bind((new_cases[i] / 3000.0).min(0.35))
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_series(
    pool: &PgPool,
    country_code: &str,
    since: Option<NaiveDate>,
) -> anyhow::Result<Vec<DailyRecord>> {
    let mut query = String::from(
        "SELECT country_code, record_date, new_cases, total_cases, new_deaths, total_deaths, \
         new_cases_smoothed, new_deaths_smoothed, people_vaccinated_per_hundred, \
         total_vaccinations, new_vaccinations, hosp_patients_per_million, \
         icu_patients_per_million, positive_rate \
         FROM epi_insights.daily_records \
         WHERE country_code = $1",
    );

    if since.is_some() {
        query.push_str(" AND record_date >= $2");
    }
    query.push_str(" ORDER BY record_date ASC");

    let mut rows = sqlx::query(&query).bind(country_code);
    if let Some(value) = since {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut series = Vec::new();

    for row in records {
        series.push(DailyRecord {
            country_code: row.get("country_code"),
            date: row.get("record_date"),
            new_cases: row.get("new_cases"),
            total_cases: row.get("total_cases"),
            new_deaths: row.get("new_deaths"),
            total_deaths: row.get("total_deaths"),
            new_cases_smoothed: row.get("new_cases_smoothed"),
            new_deaths_smoothed: row.get("new_deaths_smoothed"),
            people_vaccinated_per_hundred: row.get("people_vaccinated_per_hundred"),
            total_vaccinations: row.get("total_vaccinations"),
            new_vaccinations: row.get("new_vaccinations"),
            hosp_patients_per_million: row.get("hosp_patients_per_million"),
            icu_patients_per_million: row.get("icu_patients_per_million"),
            positive_rate: row.get("positive_rate"),
        });
    }

    info!(
        country = %country_code,
        points = series.len(),
        "fetched daily series"
    );
    Ok(series)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        iso_code: String,
        location: String,
        date: NaiveDate,
        new_cases: Option<f64>,
        total_cases: Option<f64>,
        new_deaths: Option<f64>,
        total_deaths: Option<f64>,
        new_cases_smoothed: Option<f64>,
        new_deaths_smoothed: Option<f64>,
        people_vaccinated_per_hundred: Option<f64>,
        total_vaccinations: Option<f64>,
        new_vaccinations: Option<f64>,
        hosp_patients_per_million: Option<f64>,
        icu_patients_per_million: Option<f64>,
        positive_rate: Option<f64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        sqlx::query(
            r#"
            INSERT INTO epi_insights.countries (code, name)
            VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(&row.iso_code)
        .bind(&row.location)
        .execute(pool)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO epi_insights.daily_records
            (country_code, record_date, new_cases, total_cases, new_deaths, total_deaths,
             new_cases_smoothed, new_deaths_smoothed, people_vaccinated_per_hundred,
             total_vaccinations, new_vaccinations, hosp_patients_per_million,
             icu_patients_per_million, positive_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (country_code, record_date) DO NOTHING
            "#,
        )
        .bind(&row.iso_code)
        .bind(row.date)
        .bind(row.new_cases)
        .bind(row.total_cases)
        .bind(row.new_deaths)
        .bind(row.total_deaths)
        .bind(row.new_cases_smoothed)
        .bind(row.new_deaths_smoothed)
        .bind(row.people_vaccinated_per_hundred)
        .bind(row.total_vaccinations)
        .bind(row.new_vaccinations)
        .bind(row.hosp_patients_per_million)
        .bind(row.icu_patients_per_million)
        .bind(row.positive_rate)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
