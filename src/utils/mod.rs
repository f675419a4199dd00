pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod logging;
pub mod progress;

pub use constants::*;
pub use coordinates::{format_decimal, format_latlon, parse_latlon};
pub use filename::{generate_default_download_filename, generate_default_map_filename};
pub use logging::init_logging;
pub use progress::ProgressReporter;
