pub mod choropleth;

pub use choropleth::{scale_color, ChoroplethRenderer, Color, NO_DATA_COLOR};
