pub mod config;
pub mod errors;
pub mod hosting;
pub mod manifest;
pub mod naming;
pub mod orchestrator;
pub mod source;
pub mod throttle;
pub mod workcopy;
