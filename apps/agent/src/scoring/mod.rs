// Scoring: weighted fit algorithm plus the self-triggering change handler.

pub mod fit_scoring;
pub mod stage;

pub use fit_scoring::WeightedFitScorer;
pub use stage::ScoringStage;
