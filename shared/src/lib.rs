pub use reqwest::Client;

pub mod adapters;
pub mod configuration;
pub mod core;
pub mod notifier;
pub mod utils;
