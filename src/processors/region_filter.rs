use crate::models::{BoundingBox, ClimateTable};
use crate::settings::FilterSettings;
use crate::utils::constants::{
    ANNUAL_COLUMN, LAT_COLUMN, LON_COLUMN, MISSING_SENTINEL, MONTH_TRANSLATIONS, PARAMETER_COLUMN,
};
use tracing::debug;

/// Translate a month abbreviation; unknown labels pass through unchanged.
pub fn translate_column(label: &str) -> &str {
    MONTH_TRANSLATIONS
        .iter()
        .find(|(abbr, _)| *abbr == label)
        .map_or(label, |(_, name)| *name)
}

/// Restricts a climate table to a bounding box and drops incomplete rows.
pub struct RegionFilter {
    bbox: BoundingBox,
    missing_sentinel: f64,
    drop_columns: Vec<String>,
}

impl RegionFilter {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            missing_sentinel: MISSING_SENTINEL,
            drop_columns: vec![PARAMETER_COLUMN.to_string()],
        }
    }

    pub fn from_settings(bbox: BoundingBox, settings: &FilterSettings) -> Self {
        Self::new(bbox)
            .with_missing_sentinel(settings.missing_sentinel)
            .with_drop_columns(settings.drop_columns.clone())
    }

    pub fn with_missing_sentinel(mut self, sentinel: f64) -> Self {
        self.missing_sentinel = sentinel;
        self
    }

    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Produce a new table holding only complete rows inside the box.
    ///
    /// Row order is preserved. A table without `LAT`/`LON` columns, or with no
    /// row inside the box, yields an empty table rather than an error.
    pub fn apply(&self, table: &ClimateTable) -> ClimateTable {
        let kept: Vec<usize> = (0..table.columns.len())
            .filter(|&i| {
                !self
                    .drop_columns
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(&table.columns[i]))
            })
            .collect();

        let columns: Vec<String> = kept
            .iter()
            .map(|&i| translate_column(&table.columns[i]).to_string())
            .collect();

        let (Some(lat_idx), Some(lon_idx)) = (
            table.column_index(LAT_COLUMN),
            table.column_index(LON_COLUMN),
        ) else {
            debug!("Table has no LAT/LON columns; nothing to filter");
            return ClimateTable::new(columns, Vec::new());
        };

        let rows: Vec<_> = table
            .rows
            .iter()
            .filter(|row| {
                let lat = row.get(lat_idx).and_then(|c| c.as_f64());
                let lon = row.get(lon_idx).and_then(|c| c.as_f64());
                match (lat, lon) {
                    (Some(lat), Some(lon)) => self.bbox.contains(lat, lon),
                    _ => false,
                }
            })
            .filter(|row| {
                !kept
                    .iter()
                    .any(|&i| row.get(i).map_or(true, |c| c.is_missing(self.missing_sentinel)))
            })
            .map(|row| kept.iter().map(|&i| row[i].clone()).collect())
            .collect();

        debug!(
            input_rows = table.len(),
            output_rows = rows.len(),
            "Region filter applied"
        );

        ClimateTable::new(columns, rows)
    }
}

/// Resolve a configured value column against translated headers.
pub fn resolve_value_column(value_column: &str) -> &str {
    if value_column.is_empty() {
        ANNUAL_COLUMN
    } else {
        translate_column(value_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use pretty_assertions::assert_eq;

    fn raw_table() -> ClimateTable {
        let columns = ["LAT", "LON", "PARAMETER", "JAN", "FEB", "ANN"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let row = |lat: f64, lon: f64, jan: f64, ann: f64| {
            vec![
                Cell::Number(lat),
                Cell::Number(lon),
                Cell::Text("ALLSKY_SFC_SW_DWN".into()),
                Cell::Number(jan),
                Cell::Number(5.0),
                Cell::Number(ann),
            ]
        };
        ClimateTable::new(
            columns,
            vec![
                row(-10.0, -50.0, 5.1, 5.2),
                row(40.0, -50.0, 3.0, 3.1),
                row(-5.0, -40.0, -999.0, -999.0),
                row(-20.0, -45.0, -999.0, 4.8),
                row(-30.0, -52.0, 4.4, 4.6),
            ],
        )
    }

    #[test]
    fn test_translate_column() {
        assert_eq!(translate_column("JAN"), "Janeiro");
        assert_eq!(translate_column("MAR"), "Março");
        assert_eq!(translate_column("DEC"), "Dezembro");
        assert_eq!(translate_column("ANN"), "ANN");
        assert_eq!(translate_column("LAT"), "LAT");
        // Keys are matched exactly
        assert_eq!(translate_column("jan"), "jan");
        assert_eq!(translate_column("Feb"), "Feb");
    }

    #[test]
    fn test_filter_drops_outside_and_missing_rows() {
        let filter = RegionFilter::new(BoundingBox::default());
        let filtered = filter.apply(&raw_table());

        assert_eq!(filtered.columns, vec!["LAT", "LON", "Janeiro", "Fevereiro", "ANN"]);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.rows[0][0], Cell::Number(-10.0));
        assert_eq!(filtered.rows[1][0], Cell::Number(-30.0));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = RegionFilter::new(BoundingBox::default());
        let once = filter.apply(&raw_table());
        let twice = filter.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_every_month_is_renamed() {
        let columns: Vec<String> = std::iter::once("LAT")
            .chain(std::iter::once("LON"))
            .chain(MONTH_TRANSLATIONS.iter().map(|(abbr, _)| *abbr))
            .chain(std::iter::once("EXTRA"))
            .map(String::from)
            .collect();
        let row = vec![Cell::Number(1.0); columns.len()];
        let table = ClimateTable::new(columns, vec![row]);

        let filtered = RegionFilter::new(BoundingBox::new(-5.0, 5.0, -5.0, 5.0).unwrap())
            .apply(&table);

        for (i, (_, name)) in MONTH_TRANSLATIONS.iter().enumerate() {
            assert_eq!(filtered.columns[i + 2], *name);
        }
        assert_eq!(filtered.columns.last().map(String::as_str), Some("EXTRA"));
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let filter = RegionFilter::new(BoundingBox::new(60.0, 70.0, 10.0, 20.0).unwrap());
        let filtered = filter.apply(&raw_table());
        assert!(filtered.is_empty());
        assert_eq!(filtered.grid_cells("ANN").unwrap().count(), 0);
    }

    #[test]
    fn test_table_without_coordinates_yields_nothing() {
        let table = ClimateTable::new(vec!["ANN".into()], vec![vec![Cell::Number(5.0)]]);
        let filtered = RegionFilter::new(BoundingBox::default()).apply(&table);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_resolve_value_column() {
        assert_eq!(resolve_value_column("ANN"), "ANN");
        assert_eq!(resolve_value_column("JUL"), "Julho");
        assert_eq!(resolve_value_column(""), "ANN");
    }
}
