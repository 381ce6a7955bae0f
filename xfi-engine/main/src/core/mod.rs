pub mod almanac;
pub mod analysis;
pub mod collector;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod exemptions;
pub mod facts;
pub mod loader;
pub mod location;
pub mod lock;
pub mod operators;
pub mod remote;
pub mod report;
pub mod runner;
pub mod sink;
pub mod telemetry;
