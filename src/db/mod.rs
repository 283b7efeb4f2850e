mod analytics;
mod client;

pub use analytics::Analytics;
pub use client::Db;
