use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::readers::{Identifier, TempAverage};
use crate::utils::constants::{DEFAULT_GROUP_FIELD, DEFAULT_KEY_PROPERTY, VALUE_DB_COLUMN};

#[derive(Parser)]
#[command(name = "solar-atlas")]
#[command(about = "Reverse-geocode NASA POWER solar climatologies and map them by region")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Settings file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

/// Bounding-box overrides shared by commands that filter the grid.
#[derive(clap::Args, Debug, Default)]
pub struct BoundsArgs {
    #[arg(long, allow_hyphen_values = true, help = "Southern latitude bound")]
    pub south: Option<f64>,

    #[arg(long, allow_hyphen_values = true, help = "Northern latitude bound")]
    pub north: Option<f64>,

    #[arg(long, allow_hyphen_values = true, help = "Western longitude bound")]
    pub west: Option<f64>,

    #[arg(long, allow_hyphen_values = true, help = "Eastern longitude bound")]
    pub east: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the climatology CSV from the POWER data-access endpoint
    Fetch {
        #[arg(
            short,
            long,
            help = "Raw CSV output path [default: output/power-climatology-{YYMMDD}.csv]"
        )]
        output: Option<PathBuf>,

        #[arg(short, long, value_delimiter = ',', help = "POWER parameters, comma-separated")]
        parameters: Option<Vec<String>>,

        #[arg(long, value_enum)]
        identifier: Option<Identifier>,

        #[arg(long, value_enum)]
        temp_average: Option<TempAverage>,

        #[command(flatten)]
        bounds: BoundsArgs,
    },

    /// Filter the grid to a region and reverse-geocode every cell
    Enrich {
        #[arg(
            short,
            long,
            help = "Previously fetched CSV; downloads from the endpoint when omitted"
        )]
        input: Option<PathBuf>,

        #[arg(short, long, help = "Append-only output file [default: from settings]")]
        output: Option<PathBuf>,

        #[arg(long, help = "Skip cells already present in the output file")]
        resume: bool,

        #[arg(long, help = "Metadata lines before the CSV header")]
        skip_rows: Option<usize>,

        #[arg(long, help = "Value column, e.g. ANN or JAN")]
        value_column: Option<String>,

        #[arg(long, help = "Only flush (no fsync) after each record")]
        no_fsync: bool,

        #[command(flatten)]
        bounds: BoundsArgs,
    },

    /// Load the accumulated output file into SQLite, replacing the table
    Load {
        #[arg(short, long, help = "Enriched output file [default: from settings]")]
        input: Option<PathBuf>,

        #[arg(short, long, help = "SQLite database path [default: from settings]")]
        database: Option<PathBuf>,

        #[arg(short, long)]
        table: Option<String>,
    },

    /// Run `select <fields> from <table> [where <predicate>]`
    Query {
        #[arg(short, long, default_value = "*")]
        fields: String,

        #[arg(short, long)]
        table: Option<String>,

        #[arg(short = 'w', long = "where", help = "Predicate without the WHERE keyword")]
        predicate: Option<String>,

        #[arg(short, long)]
        database: Option<PathBuf>,

        #[arg(long, default_value = "50", help = "Rows to print (0 = all)")]
        limit: usize,
    },

    /// Render an HTML choropleth of the per-region mean
    Render {
        #[arg(short, long, help = "GeoJSON FeatureCollection of region boundaries")]
        boundaries: PathBuf,

        #[arg(short, long, default_value = DEFAULT_KEY_PROPERTY, help = "Feature property holding the region name")]
        key_property: String,

        #[arg(short, long, default_value = DEFAULT_GROUP_FIELD, help = "Column to group by")]
        group_by: String,

        #[arg(long, default_value = VALUE_DB_COLUMN, help = "Column to average")]
        value: String,

        #[arg(
            short,
            long,
            help = "HTML output path [default: output/solar-atlas-{YYMMDD}.html]"
        )]
        output: Option<PathBuf>,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        database: Option<PathBuf>,

        #[arg(short, long)]
        table: Option<String>,
    },

    /// Display information about an enriched output file
    Info {
        #[arg(short, long, help = "Enriched output file [default: from settings]")]
        file: Option<PathBuf>,

        #[arg(short, long, default_value = "10")]
        sample: usize,

        #[arg(
            long,
            default_value = "0",
            help = "Maximum records to analyze (0 = all records)"
        )]
        analysis_limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enrich_with_negative_bounds() {
        let cli = Cli::try_parse_from([
            "solar-atlas",
            "--verbose",
            "enrich",
            "--input",
            "power.csv",
            "--resume",
            "--south",
            "-20",
            "--east",
            "-40.5",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Enrich {
                input,
                resume,
                bounds,
                ..
            } => {
                assert_eq!(input, Some(PathBuf::from("power.csv")));
                assert!(resume);
                assert_eq!(bounds.south, Some(-20.0));
                assert_eq!(bounds.east, Some(-40.5));
                assert_eq!(bounds.north, None);
            }
            _ => panic!("expected enrich"),
        }
    }

    #[test]
    fn test_parse_query_where() {
        let cli = Cli::try_parse_from([
            "solar-atlas",
            "query",
            "--fields",
            "latlon, media",
            "--where",
            "state = 'Goiás'",
        ])
        .unwrap();

        match cli.command {
            Commands::Query {
                fields, predicate, ..
            } => {
                assert_eq!(fields, "latlon, media");
                assert_eq!(predicate.as_deref(), Some("state = 'Goiás'"));
            }
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn test_parse_fetch_parameters() {
        let cli = Cli::try_parse_from([
            "solar-atlas",
            "fetch",
            "--parameters",
            "ALLSKY_SFC_SW_DWN,CLRSKY_SFC_SW_DWN",
            "--identifier",
            "regional",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch {
                parameters,
                identifier,
                ..
            } => {
                assert_eq!(parameters.unwrap().len(), 2);
                assert_eq!(identifier, Some(Identifier::Regional));
            }
            _ => panic!("expected fetch"),
        }
    }
}
