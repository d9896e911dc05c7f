pub mod event;
pub mod job;
pub mod posting;
pub mod profile;

pub use event::{ChangeEvent, ChangeKind};
pub use job::{StructuredFields, StructuredJob};
pub use posting::RawPosting;
pub use profile::UserProfile;
