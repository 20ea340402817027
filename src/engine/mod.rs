//! Core engine: the event cache and the prediction requester.

pub mod cache;
pub mod predictor;

pub use cache::EventCache;
pub use predictor::Predictor;
