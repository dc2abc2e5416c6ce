//! Football transfer likelihood estimation for the Premier League "big six".
//!
//! Synthetic season generation, a standardized feature pipeline, a random forest classifier,
//! an on-disk artifact bundle and the prediction service that serves it.

pub mod artifact;
pub mod clubs;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod forest;
pub mod http_client;
pub mod logging;
pub mod predict;
pub mod records;
pub mod request;
pub mod squad_fetch;
pub mod synthetic;
pub mod training;

pub use error::{Result, TransferError};
