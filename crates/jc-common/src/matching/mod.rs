pub mod experience;
pub mod pipeline;
pub mod prefilter;
pub mod profile;
pub mod resolve;
pub mod role;
pub mod scoring;
pub mod similarity;
pub mod skills;
pub mod stop_words;
pub mod weights;

pub use pipeline::{CandidateMatch, JobMatch, MatchError, MatchLookup, Matcher};
pub use scoring::{
    MatchScore, ScoreBreakdown, ScoringConfig, ScoringEngine, ScoringError, calculate_match_score,
};
pub use weights::{DEFAULT_WEIGHTS, Weights};
