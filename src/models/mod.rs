pub mod address;
pub mod enriched;
pub mod grid;
pub mod table;

pub use address::AddressComponents;
pub use enriched::EnrichedRecord;
pub use grid::{BoundingBox, GridCell};
pub use table::{Cell, ClimateTable};
