pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod window;
