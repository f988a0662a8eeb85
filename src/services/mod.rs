pub mod accounts;
pub mod recommendation_engine;
pub mod recommendations;

pub use recommendation_engine::RecommendationEngine;
