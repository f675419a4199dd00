use chrono::{Datelike, Local};
use std::path::PathBuf;

/// Generate default choropleth filename with format: solar-atlas-{YYMMDD}.html
pub fn generate_default_map_filename() -> PathBuf {
    dated_filename("solar-atlas", "html")
}

/// Generate default raw download filename with format: power-climatology-{YYMMDD}.csv
pub fn generate_default_download_filename() -> PathBuf {
    dated_filename("power-climatology", "csv")
}

fn dated_filename(prefix: &str, extension: &str) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year

    let filename = format!(
        "{}-{:02}{:02}{:02}.{}",
        prefix,
        year,
        now.month(),
        now.day(),
        extension
    );
    PathBuf::from("output").join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_map_filename() {
        let filename = generate_default_map_filename();
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output/"));
        assert!(filename_str.ends_with(".html"));

        let file_part = filename.file_name().unwrap().to_string_lossy();
        assert!(file_part.starts_with("solar-atlas-"));
        // "solar-atlas-" + YYMMDD + ".html"
        assert_eq!(file_part.len(), "solar-atlas-".len() + 6 + ".html".len());
    }

    #[test]
    fn test_generate_default_download_filename() {
        let filename = generate_default_download_filename();
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.contains("power-climatology-"));
        assert!(filename_str.ends_with(".csv"));
        assert!(filename_str.starts_with("output/"));
    }
}
