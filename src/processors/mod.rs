pub mod enrichment_driver;
pub mod region_filter;

pub use enrichment_driver::{Enricher, EnrichmentReport};
pub use region_filter::{resolve_value_column, translate_column, RegionFilter};
