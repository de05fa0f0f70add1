//! paperscout-common: shared types, errors and the HTTP plumbing used by
//! every paperscout crate.

pub mod error;
pub mod paper;
pub mod retry;
pub mod sandbox;

// Re-export commonly used types
pub use error::{PaperscoutError, Result};
pub use paper::{PaperDraft, PaperRecord, RecordError, Source, UNKNOWN_AUTHOR};
pub use retry::RetryPolicy;
pub use sandbox::{HttpSession, SessionConfig};
