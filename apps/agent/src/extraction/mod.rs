// Extraction: raw posting text → StructuredFields via the injected Extractor,
// and the stage that turns raw Insert events into structured records.

pub mod extractor;
pub mod prompts;
pub mod stage;

pub use extractor::LlmExtractor;
pub use stage::ExtractionStage;
