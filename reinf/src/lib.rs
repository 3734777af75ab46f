pub mod api;
pub mod catalog;
pub mod config;
pub mod endpoint;
pub mod events;
pub mod identifiers;
pub mod logging;
pub mod persist;
pub mod prometheus;
pub mod record_key;
pub mod router;
pub mod server;
pub mod stores;
pub mod tenant;
