pub mod auth;
pub mod error;
pub mod keys;
pub mod metadata;
pub mod rating_index;
pub mod reconcile;
pub mod render;
pub mod sync;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{FreshToken, TokenManager, TokenStatus};
pub use error::{ErrorClass, SyncError};
pub use keys::CompositeKey;
pub use metadata::{MetadataResolver, ResolvedMetadata};
pub use rating_index::RatingIndex;
pub use reconcile::{apply_cutoff, build_tree, FilteredHistory, ReconcileStats};
pub use render::{render, DateFormat, RenderOptions};
pub use sync::{SyncOptions, SyncOrchestrator, SyncOutcome, SyncReport};
pub use writer::{NoteStatus, NoteWriter};
