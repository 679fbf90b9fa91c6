//! Domain records shared by the pipeline, the store and the view layer.

pub mod association;
pub mod paper;
pub mod query;

pub use association::{Association, MAX_SCORE, MIN_SCORE};
pub use paper::{CandidatePaper, Paper, PaperLink};
pub use query::{QueryStatus, SearchQuery};
