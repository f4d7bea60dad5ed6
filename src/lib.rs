pub mod apis;
pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod storage;
pub mod types;
