pub mod columns;
pub mod config;
pub mod corrections;
pub mod dataset;
pub mod export;
pub mod identity;
pub mod logging;
pub mod meet_file;
pub mod name_clean;
pub mod report;
pub mod store;
pub mod team_canon;
pub mod time_norm;
