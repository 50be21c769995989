pub mod error;
pub mod config;
pub mod logging;

pub use error::{Error, Result};
pub use config::{load_file, load_str};
pub use logging::init_tracing;
