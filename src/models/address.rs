use serde::{Deserialize, Serialize};

/// Administrative labels returned by reverse geocoding for one coordinate.
///
/// Every level is optional: a provider that has no county for a point simply
/// omits it, and that is a complete answer rather than a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub country: Option<String>,
    pub county: Option<String>,
    pub neighbourhood: Option<String>,
    pub state: Option<String>,
    pub suburb: Option<String>,
    pub town: Option<String>,
}

impl AddressComponents {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(Option::is_none)
    }

    /// Field values in output order: country, county, neighbourhood, state, suburb, town.
    pub fn fields(&self) -> [Option<&str>; 6] {
        [
            self.country.as_deref(),
            self.county.as_deref(),
            self.neighbourhood.as_deref(),
            self.state.as_deref(),
            self.suburb.as_deref(),
            self.town.as_deref(),
        ]
    }

    /// Builds from output-order strings, mapping empty strings back to `None`.
    pub fn from_fields(fields: [&str; 6]) -> Self {
        let opt = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Self {
            country: opt(fields[0]),
            county: opt(fields[1]),
            neighbourhood: opt(fields[2]),
            state: opt(fields[3]),
            suburb: opt(fields[4]),
            town: opt(fields[5]),
        }
    }
}
