//! Flattening raw listings into the shape the store persists.
//!
//! Raw listings nest most of their data under `job_information`,
//! `v5_processed_job_data` and `v5_processed_company_data`. The store wants
//! one flat camelCase object with absent optionals omitted, since it rejects
//! explicit nulls.

use jobtap_core::JobRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Descriptions are raw HTML and occasionally enormous.
pub const DESCRIPTION_LIMIT: usize = 10_000;

const UNTITLED: &str = "Untitled";
const UNKNOWN: &str = "Unknown";

/// A listing in persistence shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct NormalizedJob {
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub apply_url: String,
    pub source: String,
    pub location: String,
    pub workplace_type: String,
    pub countries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority_level: Option<String>,
    pub commitment: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_yoe: Option<f64>,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_frequency: Option<String>,
    pub is_compensation_transparent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<f64>,
    /// Unix milliseconds
    pub scraped_at: f64,
    pub is_expired: bool,
}

/// Current time in Unix milliseconds, as the store represents timestamps.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn now_millis() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Flatten a raw listing. Missing or mistyped fields become absent, never
/// an error.
#[must_use]
pub fn normalize(record: &JobRecord, scraped_at: f64) -> NormalizedJob {
    let fields = record.fields();
    let mut job = NormalizedJob {
        external_id: record
            .id()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default(),
        apply_url: text(fields, "apply_url").unwrap_or_default(),
        source: text(fields, "source").unwrap_or_default(),
        is_expired: flag(fields, "is_expired"),
        scraped_at,
        ..NormalizedJob::default()
    };

    if let Some(info) = record.get_object("job_information") {
        job.title = text(info, "title").unwrap_or_default();
        job.description = text(info, "description").map(truncate_description);
    }

    if let Some(data) = record.get_object("v5_processed_job_data") {
        if job.title.is_empty() {
            job.title = text(data, "core_job_title").unwrap_or_default();
        }
        job.company = text(data, "company_name").unwrap_or_default();
        job.location = text(data, "formatted_workplace_location").unwrap_or_default();
        job.workplace_type = text(data, "workplace_type").unwrap_or_default();
        job.seniority_level = text(data, "seniority_level");
        job.category = text(data, "job_category");
        job.role_type = text(data, "role_type");
        job.requirements = text(data, "requirements_summary");
        job.salary_currency = text(data, "listed_compensation_currency");
        job.salary_frequency = text(data, "listed_compensation_frequency");
        job.is_compensation_transparent = flag(data, "is_compensation_transparent");
        job.countries = strings(data, "workplace_countries");
        job.commitment = strings(data, "commitment");
        job.skills = strings(data, "technical_tools");
        job.min_yoe = number(data, "min_industry_and_role_yoe");
        job.salary_min = number(data, "yearly_min_compensation");
        job.salary_max = number(data, "yearly_max_compensation");
        job.published_at = number(data, "estimated_publish_date_millis");
        job.company_industry = text(data, "company_sector_and_industry");
        job.company_tagline = text(data, "company_tagline");
    }

    if let Some(company) = record.get_object("v5_processed_company_data") {
        if job.company.is_empty() {
            job.company = text(company, "name").unwrap_or_default();
        }
        job.company_logo = text(company, "image_url");
        job.company_website = text(company, "website");
        job.company_linkedin = text(company, "linkedin_url");
        job.company_size = number(company, "num_employees");
        if job.company_industry.is_none() {
            job.company_industry = strings(company, "industries").into_iter().next();
        }
        if job.company_tagline.is_none() {
            job.company_tagline = text(company, "tagline");
        }
    }

    if job.title.is_empty() {
        job.title = UNTITLED.to_string();
    }
    if job.company.is_empty() {
        job.company = UNKNOWN.to_string();
    }
    if job.workplace_type.is_empty() {
        job.workplace_type = UNKNOWN.to_string();
    }

    job
}

/// Normalize a batch with one shared timestamp.
#[must_use]
pub fn normalize_all(records: &[JobRecord], scraped_at: f64) -> Vec<NormalizedJob> {
    records.iter().map(|r| normalize(r, scraped_at)).collect()
}

fn truncate_description(description: String) -> String {
    match description.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => description[..cut].to_string(),
        None => description,
    }
}

// Empty strings count as absent.
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields.get(key).and_then(Value::as_f64)
}

fn flag(fields: &Map<String, Value>, key: &str) -> bool {
    fields.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn strings(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    fields
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
