pub mod catalog;
pub mod collection;
pub mod config;
pub mod events;
pub mod identify;
pub mod parser;
pub mod run;
pub mod setlist;
pub mod store;

/// The tracked band. Collection names and local descriptions carry it.
pub const BAND: &str = "Phish";

/// The band formed in 1983; parsed or queried dates before this are rejected.
pub const FOUNDING_YEAR: i32 = 1983;

/// Application name for XDG paths
pub const APP_NAME: &str = "showrun";
