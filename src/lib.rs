pub mod alarm;
pub mod challenge;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod puzzle;
pub mod utils;

pub use error::{NoozeError, Result};
