pub mod codes;
pub mod config;
pub mod error;
pub mod games;
pub mod global;
pub mod scraper;
pub mod store;
pub mod util;
