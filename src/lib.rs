//! Upload monthly financial amounts from `.xlsx` spreadsheets and read them back in calendar
//! order.

pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
pub mod ingest;
pub mod model;
mod server;
mod utils;


pub use config::Config;
pub use error::{Error, ErrorType, IntoResult, Result};
