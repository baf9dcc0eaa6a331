// src/lib.rs
// Public library surface for the digest pipeline (used by the runner binary
// and integration tests).

pub mod ai;
pub mod config;
pub mod email;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod profile;
pub mod rank;
pub mod sources;
pub mod store;

// ---- Re-exports for the common wiring path ----
pub use crate::model::{ContentItem, ContentKind, DigestRecord, RawItem, SecondaryStatus};
pub use crate::pipeline::{Pipeline, PipelineOptions, RunReport};
pub use crate::store::ContentStore;
