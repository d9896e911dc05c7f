// Digest: periodic scan of high-fit jobs, rendered to HTML and mailed.

pub mod render;
pub mod sender;
pub mod stage;

pub use sender::SmtpSender;
pub use stage::{sort_by_score_desc, DigestResult, DigestStage};
