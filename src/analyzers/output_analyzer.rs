use crate::error::{ProcessingError, Result};
use crate::models::EnrichedRecord;
use crate::utils::coordinates::parse_latlon;
use crate::writers::read_records;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug)]
pub struct OutputStatistics {
    pub total_records: usize,
    pub unique_cells: usize,
    pub duplicate_records: usize,
    pub value_stats: ValueStats,
    pub address_coverage: AddressCoverage,
    pub geographic_bounds: GeographicBounds,
    /// Records per state, alphabetical.
    pub states: BTreeMap<String, usize>,
}

#[derive(Debug)]
pub struct ValueStats {
    pub min_value: f64,
    pub max_value: f64,
    pub avg_value: f64,
    pub min_value_location: String,
    pub max_value_location: String,
}

#[derive(Debug)]
pub struct AddressCoverage {
    pub total_records: usize,
    pub with_address: usize,
    pub with_state: usize,
    pub with_town: usize,
}

impl AddressCoverage {
    pub fn address_percentage(&self) -> f64 {
        (self.with_address as f64 / self.total_records as f64) * 100.0
    }

    pub fn empty_records(&self) -> usize {
        self.total_records - self.with_address
    }
}

#[derive(Debug)]
pub struct GeographicBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Summarises an accumulated enrichment output file.
pub struct OutputAnalyzer;

impl OutputAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_file(&self, path: &Path) -> Result<OutputStatistics> {
        self.analyze_file_with_limit(path, 0) // Default to all records
    }

    /// Analyze at most `limit` records from the start of the file; 0 means all.
    pub fn analyze_file_with_limit(&self, path: &Path, limit: usize) -> Result<OutputStatistics> {
        let mut records = read_records(path)?;
        if limit > 0 {
            records.truncate(limit);
        }
        self.calculate_statistics(&records)
    }

    pub fn calculate_statistics(&self, records: &[EnrichedRecord]) -> Result<OutputStatistics> {
        if records.is_empty() {
            return Err(ProcessingError::MissingData(
                "No records to analyze".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut duplicate_records = 0;
        let mut states = BTreeMap::new();

        let mut min_value = f64::INFINITY;
        let mut max_value = f64::NEG_INFINITY;
        let mut value_sum = 0.0;
        let mut min_value_location = String::new();
        let mut max_value_location = String::new();

        let mut with_address = 0;
        let mut with_state = 0;
        let mut with_town = 0;

        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        let mut min_lon = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;

        for record in records {
            if !seen.insert(record.latlon.as_str()) {
                duplicate_records += 1;
            }

            value_sum += record.value;
            if record.value < min_value {
                min_value = record.value;
                min_value_location = describe(record);
            }
            if record.value > max_value {
                max_value = record.value;
                max_value_location = describe(record);
            }

            if record.has_address() {
                with_address += 1;
            }
            if let Some(state) = &record.address.state {
                with_state += 1;
                *states.entry(state.clone()).or_insert(0) += 1;
            }
            if record.address.town.is_some() {
                with_town += 1;
            }

            // Keys were validated when the file was read
            if let Ok((lat, lon)) = parse_latlon(&record.latlon) {
                min_lat = min_lat.min(lat);
                max_lat = max_lat.max(lat);
                min_lon = min_lon.min(lon);
                max_lon = max_lon.max(lon);
            }
        }

        Ok(OutputStatistics {
            total_records: records.len(),
            unique_cells: seen.len(),
            duplicate_records,
            value_stats: ValueStats {
                min_value,
                max_value,
                avg_value: value_sum / records.len() as f64,
                min_value_location,
                max_value_location,
            },
            address_coverage: AddressCoverage {
                total_records: records.len(),
                with_address,
                with_state,
                with_town,
            },
            geographic_bounds: GeographicBounds {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            },
            states,
        })
    }
}

fn describe(record: &EnrichedRecord) -> String {
    match (&record.address.town, &record.address.state) {
        (Some(town), Some(state)) => format!("{}, {} ({})", town, state, record.latlon),
        (None, Some(state)) => format!("{} ({})", state, record.latlon),
        _ => record.latlon.clone(),
    }
}

impl OutputStatistics {
    pub fn summary(&self) -> String {
        format!(
            "Records: {} total, {} unique cells, {} duplicates\n\
            Addresses: {:.1}% with address, {} empty\n\
            Value Range: {:.2} to {:.2} (mean {:.2})\n\
            States: {}\n\
            Coverage: {:.1}° to {:.1}° lat, {:.1}° to {:.1}° lon",
            self.total_records,
            self.unique_cells,
            self.duplicate_records,
            self.address_coverage.address_percentage(),
            self.address_coverage.empty_records(),
            self.value_stats.min_value,
            self.value_stats.max_value,
            self.value_stats.avg_value,
            self.states.len(),
            self.geographic_bounds.min_lat,
            self.geographic_bounds.max_lat,
            self.geographic_bounds.min_lon,
            self.geographic_bounds.max_lon
        )
    }

    pub fn detailed_summary(&self) -> String {
        let mut states: Vec<_> = self.states.iter().collect();
        states.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top_states = states
            .iter()
            .take(10)
            .map(|(state, count)| format!("- {}: {}", state, count))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{}\n\n\
            Extreme Values:\n\
            - Lowest: {:.2} at {}\n\
            - Highest: {:.2} at {}\n\n\
            Address Levels:\n\
            - With state: {}/{}\n\
            - With town: {}/{}\n\n\
            Records per State (top 10):\n{}",
            self.summary(),
            self.value_stats.min_value,
            self.value_stats.min_value_location,
            self.value_stats.max_value,
            self.value_stats.max_value_location,
            self.address_coverage.with_state,
            self.total_records,
            self.address_coverage.with_town,
            self.total_records,
            if top_states.is_empty() {
                "- none".to_string()
            } else {
                top_states
            }
        )
    }
}

impl Default for OutputAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
