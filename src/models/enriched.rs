use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::{AddressComponents, GridCell};
use crate::utils::coordinates::{format_decimal, parse_latlon};
use crate::utils::constants::OUTPUT_FIELD_COUNT;

/// The unit of durable output: one per processed grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub latlon: String,
    pub value: f64,
    pub address: AddressComponents,
}

impl EnrichedRecord {
    pub fn new(latlon: String, value: f64, address: AddressComponents) -> Self {
        Self {
            latlon,
            value,
            address,
        }
    }

    pub fn from_cell(cell: &GridCell, address: AddressComponents) -> Self {
        Self::new(cell.latlon(), cell.value, address)
    }

    /// Output fields in file order; absent address levels become empty strings.
    pub fn to_fields(&self) -> [String; OUTPUT_FIELD_COUNT] {
        let [country, county, neighbourhood, state, suburb, town] =
            self.address.fields().map(|f| f.unwrap_or_default().to_string());
        [
            self.latlon.clone(),
            format_decimal(self.value),
            country,
            county,
            neighbourhood,
            state,
            suburb,
            town,
        ]
    }

    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        if fields.len() != OUTPUT_FIELD_COUNT {
            return Err(ProcessingError::InvalidFormat(format!(
                "Expected {} fields, found {}",
                OUTPUT_FIELD_COUNT,
                fields.len()
            )));
        }

        let latlon = fields[0].trim();
        parse_latlon(latlon)?;

        let value = fields[1].trim().parse::<f64>().map_err(|_| {
            ProcessingError::InvalidFormat(format!("Invalid value: '{}'", fields[1]))
        })?;

        let address = AddressComponents::from_fields([
            fields[2], fields[3], fields[4], fields[5], fields[6], fields[7],
        ]);

        Ok(Self::new(latlon.to_string(), value, address))
    }

    pub fn has_address(&self) -> bool {
        !self.address.is_empty()
    }
}
