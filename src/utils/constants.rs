/// Column names in the POWER climatology CSV
pub const LAT_COLUMN: &str = "LAT";
pub const LON_COLUMN: &str = "LON";
pub const PARAMETER_COLUMN: &str = "PARAMETER";
pub const ANNUAL_COLUMN: &str = "ANN";

/// Month abbreviation -> Brazilian Portuguese month name
pub const MONTH_TRANSLATIONS: [(&str, &str); 12] = [
    ("JAN", "Janeiro"),
    ("FEB", "Fevereiro"),
    ("MAR", "Março"),
    ("APR", "Abril"),
    ("MAY", "Maio"),
    ("JUN", "Junho"),
    ("JUL", "Julho"),
    ("AUG", "Agosto"),
    ("SEP", "Setembro"),
    ("OCT", "Outubro"),
    ("NOV", "Novembro"),
    ("DEC", "Dezembro"),
];

/// Missing-value marker used by POWER
pub const MISSING_SENTINEL: f64 = -999.0;

/// Metadata lines preceding the CSV header
pub const CSV_METADATA_ROWS: usize = 8;

/// Default bounding box (Brazil)
pub const DEFAULT_SOUTH_BOUND: f64 = -34.0;
pub const DEFAULT_NORTH_BOUND: f64 = 6.0;
pub const DEFAULT_WEST_BOUND: f64 = -74.0;
pub const DEFAULT_EAST_BOUND: f64 = -34.0;

/// Acquisition endpoint
pub const POWER_ENDPOINT: &str = "https://power.larc.nasa.gov/cgi-bin/v1/DataAccess.py?request=execute&userCommunity=SSE&outputList=CSV";
pub const DEFAULT_PARAMETERS: &str = "ALLSKY_SFC_SW_DWN";

/// Geocoding defaults
pub const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_USER_AGENT: &str = concat!("solar-atlas/", env!("CARGO_PKG_VERSION"));
pub const GEOCODE_MIN_INTERVAL_MS: u64 = 1_000;
pub const GEOCODE_MAX_ATTEMPTS: u32 = 300;
pub const GEOCODE_RETRY_DELAY_SECS: u64 = 30;
pub const GEOCODE_TIMEOUT_SECS: u64 = 300;

/// Durable output
pub const OUTPUT_DELIMITER: u8 = b';';
pub const OUTPUT_FIELD_COUNT: usize = 8;
pub const DEFAULT_OUTPUT_FILE: &str = "output/global.csv";

/// Relational load
pub const DEFAULT_DATABASE_FILE: &str = "output/solar_atlas.db";
pub const DEFAULT_TABLE: &str = "global";
pub const VALUE_DB_COLUMN: &str = "media";

/// Choropleth
pub const DEFAULT_KEY_PROPERTY: &str = "name";
pub const DEFAULT_GROUP_FIELD: &str = "state";
pub const MAP_WIDTH: u32 = 960;
pub const MAP_HEIGHT: u32 = 720;

/// Exit status on a forced quit (128 + SIGINT)
pub const INTERRUPTED_EXIT_CODE: i32 = 130;
