pub mod acquisition;
pub mod climate_reader;

pub use acquisition::{AcquisitionRequest, Identifier, PowerClient, TempAverage};
pub use climate_reader::ClimateReader;
