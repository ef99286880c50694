pub mod api;
pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod functions;
pub mod inputs;
pub mod logger;
pub mod pipeline;
pub mod runner;
pub mod storage;
pub mod version;
pub mod workflow;
