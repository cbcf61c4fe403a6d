pub mod attempts;
pub mod config;
pub mod db;
pub mod identity;
pub mod metrics;
pub mod movement;
pub mod product;
pub mod warehouse;

pub mod error;
pub mod logger;
pub mod time;
