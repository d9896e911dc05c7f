use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Normalized remote policy. Any string the extractor invents maps to `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemotePolicy {
    Remote,
    Hybrid,
    Onsite,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RemotePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemotePolicy::Remote => "Remote",
            RemotePolicy::Hybrid => "Hybrid",
            RemotePolicy::Onsite => "Onsite",
            RemotePolicy::Unknown => "Unknown",
        }
    }
}

/// Years of experience as stated in the posting. "5+ years" → min=5, max=None.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRange {
    #[serde(default, alias = "min_years")]
    pub min: Option<f64>,
    #[serde(default, alias = "max_years")]
    pub max: Option<f64>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryFrequency {
    Annual,
    Hourly,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub frequency: Option<SalaryFrequency>,
}

/// What the extractor returns for one posting. Fields it could not determine stay `None`
/// or empty rather than being guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredFields {
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remote_policy: RemotePolicy,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required_skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preferred_skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub years_of_experience: ExperienceRange,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clearance_required: bool,
    #[serde(default)]
    pub visa_sponsorship: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub salary_range: SalaryRange,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_3_responsibilities: Vec<String>,
    #[serde(default)]
    pub tech_stack_summary: Option<String>,
}

/// The extractor answers `null` for anything it cannot determine; treat that like a
/// missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl StructuredFields {
    /// An all-default payload (e.g. `{}`) carries nothing worth storing.
    pub fn is_empty(&self) -> bool {
        *self == StructuredFields::default()
    }
}

/// The structured record keyed 1:1 with a `RawPosting`.
///
/// `fit_score` is the only field the scoring stage may change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredJob {
    pub job_id: String,
    #[serde(flatten)]
    pub fields: StructuredFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_score: Option<f64>,
    pub analyzed_at: DateTime<Utc>,
}

impl StructuredJob {
    /// Builds the record the extraction stage persists. `fit_score` starts at 0 so range
    /// scans have a defined value before scoring runs.
    pub fn from_extraction(
        job_id: impl Into<String>,
        fields: StructuredFields,
        analyzed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            fields,
            fit_score: Some(0.0),
            analyzed_at,
        }
    }
}
