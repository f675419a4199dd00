use crate::error::{ProcessingError, Result};
use crate::models::GridCell;
use crate::utils::constants::{LAT_COLUMN, LON_COLUMN};

/// A single parsed CSV cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else if let Ok(number) = trimmed.parse::<f64>() {
            Cell::Number(number)
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// True for empty cells and for numbers equal to the missing-value sentinel.
    pub fn is_missing(&self, sentinel: f64) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(n) => (n - sentinel).abs() < f64::EPSILON * sentinel.abs().max(1.0),
            Cell::Text(_) => false,
        }
    }

    pub fn to_csv_field(&self) -> String {
        match self {
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

/// Tabular climate data as read from the acquisition CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClimateTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ClimateTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            ProcessingError::MissingData(format!(
                "Column '{}' not found (available: {})",
                name,
                self.columns.join(", ")
            ))
        })
    }

    /// Lazily yields one grid cell per row, reading `value_column` as the value.
    ///
    /// Rows whose coordinates or value are not numeric are skipped; a filtered
    /// table never contains such rows.
    pub fn grid_cells<'a>(
        &'a self,
        value_column: &str,
    ) -> Result<impl Iterator<Item = GridCell> + 'a> {
        let lat_idx = self.require_column(LAT_COLUMN)?;
        let lon_idx = self.require_column(LON_COLUMN)?;
        let value_idx = self.require_column(value_column)?;

        Ok(self.rows.iter().filter_map(move |row| {
            let lat = row.get(lat_idx)?.as_f64()?;
            let lon = row.get(lon_idx)?.as_f64()?;
            let value = row.get(value_idx)?.as_f64()?;
            GridCell::new(lat, lon, value).ok()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ClimateTable {
        ClimateTable::new(
            vec!["LAT".into(), "LON".into(), "ANN".into()],
            vec![
                vec![Cell::Number(-10.0), Cell::Number(-50.0), Cell::Number(5.2)],
                vec![Cell::Number(-5.0), Cell::Text("x".into()), Cell::Number(4.0)],
            ],
        )
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse(" 5.25 "), Cell::Number(5.25));
        assert_eq!(Cell::parse("SI_EF_TILTED_SURFACE"), Cell::Text("SI_EF_TILTED_SURFACE".into()));
        assert_eq!(Cell::parse("   "), Cell::Empty);
    }

    #[test]
    fn test_missing_sentinel() {
        assert!(Cell::Number(-999.0).is_missing(-999.0));
        assert!(Cell::Empty.is_missing(-999.0));
        assert!(!Cell::Number(-99.9).is_missing(-999.0));
        assert!(!Cell::Text("ANN".into()).is_missing(-999.0));
    }

    #[test]
    fn test_grid_cells_skips_non_numeric_rows() {
        let table = sample_table();
        let cells: Vec<GridCell> = table.grid_cells("ANN").unwrap().collect();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].latlon(), "-10.0,-50.0");
        assert_eq!(cells[0].value, 5.2);
    }

    #[test]
    fn test_grid_cells_requires_value_column() {
        let table = sample_table();
        assert!(table.grid_cells("Janeiro").is_err());
    }
}
