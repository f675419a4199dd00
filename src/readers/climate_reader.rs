use crate::error::{ProcessingError, Result};
use crate::models::{Cell, ClimateTable};
use crate::utils::constants::CSV_METADATA_ROWS;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Parses POWER CSV exports into a [`ClimateTable`].
pub struct ClimateReader {
    skip_rows: usize,
}

impl ClimateReader {
    pub fn new() -> Self {
        Self {
            skip_rows: CSV_METADATA_ROWS,
        }
    }

    pub fn with_skip_rows(skip_rows: usize) -> Self {
        Self { skip_rows }
    }

    /// Read a climate table from a CSV file on disk
    pub fn read_path(&self, path: &Path) -> Result<ClimateTable> {
        let file = File::open(path)?;
        self.read_from(file)
    }

    /// Read a climate table from CSV text (e.g. an HTTP response body)
    pub fn read_str(&self, content: &str) -> Result<ClimateTable> {
        self.read_from(content.as_bytes())
    }

    pub fn read_from<R: Read>(&self, source: R) -> Result<ClimateTable> {
        let mut reader = BufReader::new(source);

        // Skip the metadata preamble line by line; the header follows it
        let mut discarded = String::new();
        for skipped in 0..self.skip_rows {
            discarded.clear();
            if reader.read_line(&mut discarded)? == 0 {
                return Err(ProcessingError::InvalidFormat(format!(
                    "CSV ended after {} of {} metadata rows",
                    skipped, self.skip_rows
                )));
            }
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        if columns.iter().all(|c| c.is_empty()) {
            return Err(ProcessingError::InvalidFormat(
                "CSV header row is empty".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;

            // Skip blank trailing lines
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            // Short rows are padded so every row has one cell per column
            let mut row: Vec<Cell> = record.iter().map(Cell::parse).collect();
            row.resize(columns.len(), Cell::Empty);
            rows.push(row);
        }

        Ok(ClimateTable::new(columns, rows))
    }
}

impl Default for ClimateReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const POWER_SAMPLE: &str = "\
-BEGIN HEADER-
NASA/POWER SRB/FLASHFlux/MERRA2/GEOS 5.12.4 (FP-IT) 0.5 x 0.5 Degree Climatologies
22-year Additional Solar Parameter Monthly & Annual Climatologies (July 1983 - June 2005)
Location: Global
Value for missing model data cannot be computed or out of model availability range: -999
Parameter(s):
ALLSKY_SFC_SW_DWN SRB/FLASHFlux 1/2x1/2 All Sky Insolation Incident on a Horizontal Surface (kW-hr/m^2/day)
-END HEADER-
LAT,LON,PARAMETER,JAN,FEB,MAR,APR,MAY,JUN,JUL,AUG,SEP,OCT,NOV,DEC,ANN
-10.0,-50.0,ALLSKY_SFC_SW_DWN,5.1,5.2,5.0,5.3,5.4,5.5,5.6,5.8,5.9,5.4,5.1,5.0,5.2
-5.0,-40.0,ALLSKY_SFC_SW_DWN,-999,-999,-999,-999,-999,-999,-999,-999,-999,-999,-999,-999,-999
";

    #[test]
    fn test_read_power_sample() -> Result<()> {
        let table = ClimateReader::new().read_str(POWER_SAMPLE)?;

        assert_eq!(table.columns.len(), 16);
        assert_eq!(table.columns[0], "LAT");
        assert_eq!(table.columns[15], "ANN");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], Cell::Number(-10.0));
        assert_eq!(table.rows[0][2], Cell::Text("ALLSKY_SFC_SW_DWN".into()));
        assert_eq!(table.rows[1][15], Cell::Number(-999.0));
        Ok(())
    }

    #[test]
    fn test_truncated_preamble_is_an_error() {
        let result = ClimateReader::new().read_str("-BEGIN HEADER-\nonly two lines\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_short_rows_are_padded() -> Result<()> {
        let table = ClimateReader::with_skip_rows(0).read_str("LAT,LON,ANN\n-10.0,-50.0\n")?;
        assert_eq!(table.rows[0], vec![Cell::Number(-10.0), Cell::Number(-50.0), Cell::Empty]);
        Ok(())
    }

    #[test]
    fn test_read_file_without_preamble() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "LAT,LON,ANN")?;
        writeln!(temp_file, "-10.0,-50.0,5.2")?;
        writeln!(temp_file)?;

        let table = ClimateReader::with_skip_rows(0).read_path(temp_file.path())?;
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][2], Cell::Number(5.2));
        Ok(())
    }
}
