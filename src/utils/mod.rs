// src/utils/mod.rs

pub mod progress;

use log::debug;

/// Load variables from a local .env file when one exists.
pub fn load_env() {
    if dotenv::dotenv().is_ok() {
        debug!("Loaded environment from .env file");
    }
}
