use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{ProcessingError, Result};
use crate::utils::coordinates::format_latlon;
use crate::utils::constants::{
    DEFAULT_EAST_BOUND, DEFAULT_NORTH_BOUND, DEFAULT_SOUTH_BOUND, DEFAULT_WEST_BOUND,
};

/// Inclusive lat/lon rectangle in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_bounds_order"))]
pub struct BoundingBox {
    #[validate(range(min = -90.0, max = 90.0))]
    pub south: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub north: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub west: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub east: f64,
}

fn validate_bounds_order(bbox: &BoundingBox) -> std::result::Result<(), ValidationError> {
    if bbox.south > bbox.north || bbox.west > bbox.east {
        let mut err = ValidationError::new("bounds_order");
        err.message = Some("south must not exceed north and west must not exceed east".into());
        return Err(err);
    }
    Ok(())
}

impl BoundingBox {
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Result<Self> {
        let bbox = Self {
            south,
            north,
            west,
            east,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

impl Default for BoundingBox {
    /// Roughly the extent of Brazil.
    fn default() -> Self {
        Self {
            south: DEFAULT_SOUTH_BOUND,
            north: DEFAULT_NORTH_BOUND,
            west: DEFAULT_WEST_BOUND,
            east: DEFAULT_EAST_BOUND,
        }
    }
}

/// One climate measurement at a grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct GridCell {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,

    pub value: f64,
}

impl GridCell {
    pub fn new(lat: f64, lon: f64, value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Non-finite value {} at {},{}",
                value, lat, lon
            )));
        }
        let cell = Self { lat, lon, value };
        cell.validate()?;
        Ok(cell)
    }

    /// The `"lat,lon"` string used both as geocoder query and as join key.
    pub fn latlon(&self) -> String {
        format_latlon(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bbox_is_valid() {
        let bbox = BoundingBox::default();
        assert!(bbox.validate().is_ok());
        // Brasília
        assert!(bbox.contains(-15.79, -47.88));
        // Lisbon
        assert!(!bbox.contains(38.72, -9.14));
    }

    #[test]
    fn test_bbox_edges_are_inclusive() {
        let bbox = BoundingBox::new(-10.0, 10.0, -20.0, 20.0).unwrap();
        assert!(bbox.contains(-10.0, -20.0));
        assert!(bbox.contains(10.0, 20.0));
        assert!(!bbox.contains(10.0001, 0.0));
    }

    #[test]
    fn test_inverted_bbox_rejected() {
        assert!(BoundingBox::new(10.0, -10.0, 0.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 1.0, 5.0, -5.0).is_err());
        assert!(BoundingBox::new(-95.0, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_grid_cell_latlon() {
        let cell = GridCell::new(-10.0, -50.0, 5.2).unwrap();
        assert_eq!(cell.latlon(), "-10.0,-50.0");

        let cell = GridCell::new(-9.5, -49.75, 5.2).unwrap();
        assert_eq!(cell.latlon(), "-9.5,-49.75");
    }

    #[test]
    fn test_grid_cell_rejects_bad_values() {
        assert!(GridCell::new(91.0, 0.0, 1.0).is_err());
        assert!(GridCell::new(0.0, 0.0, f64::NAN).is_err());
    }
}
