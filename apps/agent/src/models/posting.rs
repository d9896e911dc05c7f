use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job posting exactly as the ingestion source produced it. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPosting {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub raw_description: String,
    pub scraped_at: DateTime<Utc>,
}
