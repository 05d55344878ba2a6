pub mod api;
pub mod downloader;
pub mod error;
pub mod orchestrator;
pub mod planner;
pub mod raw_store;
pub mod retry;
pub mod throttle;
