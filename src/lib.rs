pub mod api;
pub mod classifier;
pub mod concurrent_fetcher;
pub mod data_collector;
pub mod models;
pub mod registry;
