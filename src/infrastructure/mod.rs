pub mod bootstrap;
pub mod config;
pub mod http;
pub mod logging;
pub mod output;
pub mod repositories;
