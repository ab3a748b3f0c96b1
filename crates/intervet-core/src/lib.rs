pub mod aggregate;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod providers;
pub mod report;
pub mod scorer;
pub mod storage;
