pub mod api;
pub mod catalog;
pub mod config;
pub mod export;
pub mod gee;
pub mod query;
pub mod serialize;
