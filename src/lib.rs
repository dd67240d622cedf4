pub mod backend;
pub mod config;
pub mod context;
pub mod db;
pub mod monitoring;
pub mod routing;
pub mod server;
