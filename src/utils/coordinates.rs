use crate::error::{ProcessingError, Result};

/// Format a decimal in shortest round-trip form, always with a fractional part
///
/// # Examples
/// ```
/// use solar_atlas::utils::coordinates::format_decimal;
///
/// assert_eq!(format_decimal(-10.0), "-10.0");
/// assert_eq!(format_decimal(5.2), "5.2");
/// ```
pub fn format_decimal(value: f64) -> String {
    format!("{:?}", value)
}

/// Build the `"lat,lon"` key for a coordinate
pub fn format_latlon(lat: f64, lon: f64) -> String {
    format!("{},{}", format_decimal(lat), format_decimal(lon))
}

/// Parse a `"lat,lon"` key back into decimal degrees
pub fn parse_latlon(latlon: &str) -> Result<(f64, f64)> {
    let (lat_str, lon_str) = latlon.split_once(',').ok_or_else(|| {
        ProcessingError::InvalidCoordinate(format!(
            "Invalid lat/lon pair: '{}'. Expected format: 'LAT,LON'",
            latlon
        ))
    })?;

    let lat = lat_str.trim().parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid latitude value: '{}'", lat_str))
    })?;
    let lon = lon_str.trim().parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid longitude value: '{}'", lon_str))
    })?;

    validate_coordinates(lat, lon)?;
    Ok((lat, lon))
}

/// Validate WGS84 coordinate ranges
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Latitude {} is outside [-90, 90]",
            latitude
        )));
    }

    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Longitude {} is outside [-180, 180]",
            longitude
        )));
    }

    Ok(())
}
