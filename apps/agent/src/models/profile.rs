use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePreferences {
    #[serde(default)]
    pub remote_only: bool,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub min_salary: f64,
}

/// The candidate every job is scored against. Owned by profile management; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub top_skills: Vec<String>,
    #[serde(default)]
    pub years_of_experience: f64,
    #[serde(default)]
    pub target_titles: Vec<String>,
    #[serde(default)]
    pub preferences: ProfilePreferences,
}
