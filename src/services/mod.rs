// Service exports
pub mod memory;
pub mod postgres;
pub mod reviews;
pub mod traits;
pub mod verification;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use reviews::{
    NewReview, ReviewError, ReviewOutcome, ReviewService, SentimentSummary, REVIEW_LIST_LIMIT,
};
pub use traits::{
    bounded, CandidateSource, EngagementSource, ProviderStore, ReviewStore, VerificationSource,
};
pub use verification::{VerificationError, VerificationOutcome, VerificationService};
