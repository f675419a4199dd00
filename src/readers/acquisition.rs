//! NASA POWER data-access client.
//!
//! The endpoint answers a parameterised GET with a JSON document whose
//! `outputs.csv` field points at the generated CSV. Failures here are fatal
//! to a run and are not retried: an operator re-runs the fetch.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::models::ClimateTable;
use crate::readers::ClimateReader;
use crate::settings::AcquisitionSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Spatial extent of a POWER request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Identifier {
    SinglePoint,
    Regional,
    Global,
}

impl Identifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Identifier::SinglePoint => "SinglePoint",
            Identifier::Regional => "Regional",
            Identifier::Global => "Global",
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temporal aggregation of a POWER request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum TempAverage {
    Daily,
    Interannual,
    Climatology,
}

impl TempAverage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TempAverage::Daily => "DAILY",
            TempAverage::Interannual => "INTERANNUAL",
            TempAverage::Climatology => "CLIMATOLOGY",
        }
    }
}

impl fmt::Display for TempAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionRequest {
    pub parameters: Vec<String>,
    pub identifier: Identifier,
    pub temp_average: TempAverage,
}

impl AcquisitionRequest {
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("parameters", self.parameters.join(",")),
            ("identifier", self.identifier.to_string()),
            ("tempAverage", self.temp_average.to_string()),
        ]
    }
}

impl From<&AcquisitionSettings> for AcquisitionRequest {
    fn from(settings: &AcquisitionSettings) -> Self {
        Self {
            parameters: settings.parameters.clone(),
            identifier: settings.identifier,
            temp_average: settings.temp_average,
        }
    }
}

pub struct PowerClient {
    client: reqwest::Client,
    endpoint: String,
    reader: ClimateReader,
}

impl PowerClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            reader: ClimateReader::new(),
        })
    }

    pub fn with_reader(mut self, reader: ClimateReader) -> Self {
        self.reader = reader;
        self
    }

    /// Resolve the CSV link and return its raw text
    pub async fn download_csv(&self, request: &AcquisitionRequest) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|e| acquisition_error(format!("Endpoint unreachable: {}", e)))?;

        info!(url = %response.url(), status = %response.status(), "POWER data-access response");

        if response.status() != reqwest::StatusCode::OK {
            return Err(acquisition_error(format!(
                "Data-access endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| acquisition_error(format!("Failed to read response body: {}", e)))?;
        let csv_url = csv_url_from_body(&body)?;
        debug!(csv_url = %csv_url, "Following outputs.csv");

        let csv_response = self
            .client
            .get(&csv_url)
            .send()
            .await
            .map_err(|e| acquisition_error(format!("CSV resource unreachable: {}", e)))?;

        if csv_response.status() != reqwest::StatusCode::OK {
            return Err(acquisition_error(format!(
                "CSV resource returned HTTP {}",
                csv_response.status()
            )));
        }

        csv_response
            .text()
            .await
            .map_err(|e| acquisition_error(format!("Failed to read CSV body: {}", e)))
    }

    /// Download and parse the climate table for `request`
    pub async fn fetch(&self, request: &AcquisitionRequest) -> Result<ClimateTable> {
        let content = self.download_csv(request).await?;
        let table = self.reader.read_str(&content)?;
        info!(rows = table.len(), columns = table.columns.len(), "Climate table acquired");
        Ok(table)
    }
}

/// Extract `outputs.csv` from the data-access JSON response
pub fn csv_url_from_body(body: &str) -> Result<String> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| acquisition_error(format!("Malformed JSON response: {}", e)))?;

    json.get("outputs")
        .and_then(|outputs| outputs.get("csv"))
        .and_then(|csv| csv.as_str())
        .map(String::from)
        .ok_or_else(|| acquisition_error("Response has no outputs.csv link".to_string()))
}

fn acquisition_error(message: String) -> ProcessingError {
    ProcessingError::Acquisition { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs() {
        let request = AcquisitionRequest {
            parameters: vec!["ALLSKY_SFC_SW_DWN".into(), "CLRSKY_SFC_SW_DWN".into()],
            identifier: Identifier::Global,
            temp_average: TempAverage::Climatology,
        };

        assert_eq!(
            request.query_pairs(),
            [
                ("parameters", "ALLSKY_SFC_SW_DWN,CLRSKY_SFC_SW_DWN".to_string()),
                ("identifier", "Global".to_string()),
                ("tempAverage", "CLIMATOLOGY".to_string()),
            ]
        );
    }

    #[test]
    fn test_csv_url_from_body() {
        let body = r#"{"outputs": {"csv": "https://power.larc.nasa.gov/downloads/POWER_Global_Climatology.csv", "json": null}}"#;
        assert_eq!(
            csv_url_from_body(body).unwrap(),
            "https://power.larc.nasa.gov/downloads/POWER_Global_Climatology.csv"
        );
    }

    #[test]
    fn test_malformed_body_is_acquisition_fault() {
        assert!(matches!(
            csv_url_from_body("<html>maintenance</html>"),
            Err(ProcessingError::Acquisition { .. })
        ));
        assert!(matches!(
            csv_url_from_body(r#"{"messages": ["bad parameter"]}"#),
            Err(ProcessingError::Acquisition { .. })
        ));
    }

    #[test]
    fn test_enum_serde_names() {
        let json = serde_json::to_string(&TempAverage::Interannual).unwrap();
        assert_eq!(json, "\"INTERANNUAL\"");
        let parsed: Identifier = serde_json::from_str("\"SinglePoint\"").unwrap();
        assert_eq!(parsed, Identifier::SinglePoint);
    }
}
