//! Candidate retrieval and similarity scoring
//!
//! The finder narrows each document collection to an amount- and date-bounded
//! candidate list; the scorer turns that list into ranked, explainable
//! suggestions.

pub mod finder;
pub mod scorer;

pub use finder::CandidateFinder;
pub use scorer::{name_similarity, Scorer};
