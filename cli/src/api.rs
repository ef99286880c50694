// Wire model of the serverless functions API
pub mod client;
pub mod function;
pub mod operation;
pub mod version;
