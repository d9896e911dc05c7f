//! Fit Scoring: weighted, deterministic score of a structured job against a profile.
//!
//! Pluggable via `FitScorer`; `WeightedFitScorer` is the only backend.
//!
//! Components (default weights):
//! - skills (50): share of the job's required skills the profile lists, case-insensitive
//! - location (20): remote-only profiles need a remote job; others need a preferred
//!   location inside the job's location string
//! - experience (20): full when the profile meets `min`, half within 2 years below it
//! - title (10): any target title inside the job title
//!
//! Total is capped at 100 and rounded to 2 decimals.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::UserProfile;

/// Years below the requirement that still earn half the experience weight.
const EXPERIENCE_GRACE_YEARS: f64 = 2.0;
const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skills: f64,
    pub location: f64,
    pub experience: f64,
    pub title: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skills: 50.0,
            location: 20.0,
            experience: 20.0,
            title: 10.0,
        }
    }
}

/// The subset of a structured record that scoring reads, coerced from a change image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringInput {
    pub job_id: String,
    pub job_title: String,
    pub location: String,
    pub remote_policy: String,
    pub required_skills: Vec<String>,
    pub min_years: Option<f64>,
}

impl ScoringInput {
    /// Coerces a loosely typed record image. Absent or null fields fall back to empty;
    /// values of the wrong shape (e.g. a skill list that is not a list of strings) are
    /// `MalformedRecord`.
    pub fn from_image(image: &Value) -> Result<Self, AppError> {
        let obj = image
            .as_object()
            .ok_or_else(|| malformed("record image is not an object"))?;

        let job_id = match obj.get("job_id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(malformed("job_id missing or not a string")),
        };

        Ok(Self {
            job_id,
            job_title: text_field(obj.get("job_title"), "job_title")?,
            location: text_field(obj.get("location"), "location")?,
            remote_policy: text_field(obj.get("remote_policy"), "remote_policy")?,
            required_skills: skill_list(obj.get("required_skills"))?,
            min_years: min_years(obj.get("years_of_experience"))?,
        })
    }
}

fn malformed(msg: &str) -> AppError {
    AppError::MalformedRecord(msg.to_string())
}

fn text_field(value: Option<&Value>, name: &str) -> Result<String, AppError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(AppError::MalformedRecord(format!(
            "{name} should be a string, got {other}"
        ))),
    }
}

fn skill_list(value: Option<&Value>) -> Result<Vec<String>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(AppError::MalformedRecord(format!(
                    "required_skills holds a non-string entry: {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(AppError::MalformedRecord(format!(
            "required_skills should be a list, got {other}"
        ))),
    }
}

/// Reads `years_of_experience.min` (or `min_years`). Numeric strings are accepted since
/// some stores serialize numbers as text.
fn min_years(value: Option<&Value>) -> Result<Option<f64>, AppError> {
    let obj = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(obj)) => obj,
        Some(other) => {
            return Err(AppError::MalformedRecord(format!(
                "years_of_experience should be an object, got {other}"
            )))
        }
    };

    match obj.get("min").or_else(|| obj.get("min_years")) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            AppError::MalformedRecord(format!("years_of_experience.min is not numeric: '{s}'"))
        }),
        Some(other) => Err(AppError::MalformedRecord(format!(
            "years_of_experience.min is not numeric: {other}"
        ))),
    }
}

/// Per-component contributions, kept for logging and the HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitBreakdown {
    pub skills: f64,
    pub location: f64,
    pub experience: f64,
    pub title: f64,
    pub total: f64,
}

pub trait FitScorer: Send + Sync {
    fn score(&self, job: &ScoringInput, profile: &UserProfile) -> FitBreakdown;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedFitScorer {
    pub weights: ScoringWeights,
}

impl FitScorer for WeightedFitScorer {
    fn score(&self, job: &ScoringInput, profile: &UserProfile) -> FitBreakdown {
        compute_fit(job, profile, &self.weights)
    }
}

/// Default-weight score of `job` for `profile`, in [0, 100].
#[cfg(test)]
pub fn calculate_fit_score(job: &ScoringInput, profile: &UserProfile) -> f64 {
    compute_fit(job, profile, &ScoringWeights::default()).total
}

fn compute_fit(job: &ScoringInput, profile: &UserProfile, weights: &ScoringWeights) -> FitBreakdown {
    let skills = skill_component(job, profile, weights.skills);
    let location = location_component(job, profile, weights.location);
    let experience = experience_component(job, profile, weights.experience);
    let title = title_component(job, profile, weights.title);

    let total = round2((skills + location + experience + title).min(MAX_SCORE));

    FitBreakdown {
        skills,
        location,
        experience,
        title,
        total,
    }
}

fn lowercase_set(items: &[String]) -> HashSet<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

fn skill_component(job: &ScoringInput, profile: &UserProfile, weight: f64) -> f64 {
    let job_skills = lowercase_set(&job.required_skills);
    if job_skills.is_empty() {
        return 0.0;
    }
    let profile_skills = lowercase_set(&profile.top_skills);
    let overlap = job_skills.intersection(&profile_skills).count();
    weight * overlap as f64 / job_skills.len() as f64
}

fn location_component(job: &ScoringInput, profile: &UserProfile, weight: f64) -> f64 {
    let hit = if profile.preferences.remote_only {
        job.remote_policy.to_lowercase().contains("remote")
    } else {
        let job_location = job.location.to_lowercase();
        profile
            .preferences
            .locations
            .iter()
            .any(|loc| job_location.contains(&loc.to_lowercase()))
    };
    if hit {
        weight
    } else {
        0.0
    }
}

fn experience_component(job: &ScoringInput, profile: &UserProfile, weight: f64) -> f64 {
    let Some(min_req) = job.min_years else {
        return 0.0;
    };
    let have = profile.years_of_experience;
    if have >= min_req {
        weight
    } else if have >= min_req - EXPERIENCE_GRACE_YEARS {
        weight * 0.5
    } else {
        0.0
    }
}

fn title_component(job: &ScoringInput, profile: &UserProfile, weight: f64) -> f64 {
    let title = job.job_title.to_lowercase();
    if profile
        .target_titles
        .iter()
        .any(|t| title.contains(&t.to_lowercase()))
    {
        weight
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
