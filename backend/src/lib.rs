pub mod auth;
pub mod bulk;
pub mod config;
pub mod ids;
pub mod metrics;
pub mod pairing;
pub mod scheduler;
pub mod tokens;

pub mod error;
pub mod logger;
pub mod time;
