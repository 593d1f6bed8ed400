pub mod capture;
pub mod common;
pub mod config;
pub mod daemon;
pub mod pair;
pub mod selectors;
pub mod status;
pub mod sync;
