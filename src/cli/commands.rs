use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analyzers::OutputAnalyzer;
use crate::cli::args::{BoundsArgs, Cli, Commands};
use crate::error::{ProcessingError, Result};
use crate::geocoding::{GeocodeClient, NominatimGeocoder};
use crate::models::{BoundingBox, ClimateTable};
use crate::processors::{resolve_value_column, Enricher, RegionFilter};
use crate::readers::{AcquisitionRequest, ClimateReader, PowerClient};
use crate::render::ChoroplethRenderer;
use crate::settings::Settings;
use crate::store::{format_value, Database};
use crate::utils::constants::INTERRUPTED_EXIT_CODE;
use crate::utils::filename::{generate_default_download_filename, generate_default_map_filename};
use crate::utils::progress::ProgressReporter;
use crate::writers::{completed_keys, read_records, IncrementalWriter, SyncMode};

pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch {
            output,
            parameters,
            identifier,
            temp_average,
            bounds,
        } => {
            if let Some(parameters) = parameters {
                settings.acquisition.parameters = parameters;
            }
            if let Some(identifier) = identifier {
                settings.acquisition.identifier = identifier;
            }
            if let Some(temp_average) = temp_average {
                settings.acquisition.temp_average = temp_average;
            }
            apply_bounds(&mut settings, &bounds)?;
            let output = output.unwrap_or_else(generate_default_download_filename);

            let request = AcquisitionRequest::from(&settings.acquisition);
            println!(
                "Requesting {} ({}, {})...",
                request.parameters.join(","),
                request.identifier,
                request.temp_average
            );

            let progress = ProgressReporter::new_spinner("Downloading climatology...", false);
            let client = PowerClient::new(&settings.acquisition.endpoint)?;
            let content = client.download_csv(&request).await?;
            progress.finish_with_message("Download complete");

            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output, &content)?;

            let table = ClimateReader::with_skip_rows(settings.filter.skip_rows).read_str(&content)?;
            let filtered = RegionFilter::from_settings(settings.bbox, &settings.filter).apply(&table);

            println!("Saved raw CSV to {}", output.display());
            println!(
                "{} grid cells, {} inside the region",
                table.len(),
                filtered.len()
            );
        }

        Commands::Enrich {
            input,
            output,
            resume,
            skip_rows,
            value_column,
            no_fsync,
            bounds,
        } => {
            if let Some(output) = output {
                settings.output.path = output;
            }
            if resume {
                settings.output.resume = true;
            }
            if no_fsync {
                settings.output.sync = SyncMode::Flush;
            }
            if let Some(skip_rows) = skip_rows {
                settings.filter.skip_rows = skip_rows;
            }
            if let Some(value_column) = value_column {
                settings.filter.value_column = value_column;
            }
            apply_bounds(&mut settings, &bounds)?;

            let table = load_climate_table(&settings, input.as_deref()).await?;
            enrich(&settings, &table).await?;
        }

        Commands::Load {
            input,
            database,
            table,
        } => {
            let input = input.unwrap_or_else(|| settings.output.path.clone());
            let database = database.unwrap_or_else(|| settings.database.path.clone());
            let table = table.unwrap_or_else(|| settings.database.table.clone());

            println!("Loading {} into {} ({})", input.display(), database.display(), table);
            let mut db = Database::open(&database)?;
            let loaded = db.load_file(&input, &table)?;
            println!("Table '{}' replaced with {} records", table, loaded);
        }

        Commands::Query {
            fields,
            table,
            predicate,
            database,
            limit,
        } => {
            let database = database.unwrap_or_else(|| settings.database.path.clone());
            let table = table.unwrap_or_else(|| settings.database.table.clone());

            let db = Database::open(&database)?;
            let result = db.select(&fields, &table, predicate.as_deref())?;

            println!("{}", result.columns.join("\t"));
            let shown = if limit == 0 { result.len() } else { limit.min(result.len()) };
            for row in result.rows.iter().take(shown) {
                let line: Vec<String> = row.iter().map(format_value).collect();
                println!("{}", line.join("\t"));
            }
            if shown < result.len() {
                println!("... {} more rows", result.len() - shown);
            }
            println!("\n{} rows", result.len());
        }

        Commands::Render {
            boundaries,
            key_property,
            group_by,
            value,
            output,
            title,
            database,
            table,
        } => {
            let database = database.unwrap_or_else(|| settings.database.path.clone());
            let table = table.unwrap_or_else(|| settings.database.table.clone());
            let output = output.unwrap_or_else(generate_default_map_filename);

            let db = Database::open(&database)?;
            let groups = db.aggregate(&table, &group_by, &value)?;
            if groups.is_empty() {
                warn!(table = %table, group = %group_by, "No groups to render");
            }

            let title = title.unwrap_or_else(|| format!("Mean {} by {}", value, group_by));
            let renderer = ChoroplethRenderer::from_path(&boundaries)?
                .with_key_property(&key_property)
                .with_title(&title);
            renderer.write(&groups, &output)?;

            println!(
                "Rendered {} groups over {} regions to {}",
                groups.len(),
                renderer.region_count(),
                output.display()
            );
        }

        Commands::Info {
            file,
            sample,
            analysis_limit,
        } => {
            let file = file.unwrap_or_else(|| settings.output.path.clone());
            println!("Analyzing output file: {}", file.display());

            let analyzer = OutputAnalyzer::new();
            let stats = analyzer.analyze_file_with_limit(&file, analysis_limit)?;
            println!("\n{}", stats.detailed_summary());

            if sample > 0 {
                println!("\nSample Records (showing {} records):", sample);
                match read_records(&file) {
                    Ok(records) => {
                        for (i, record) in records.iter().take(sample).enumerate() {
                            let fields = record.to_fields();
                            println!("{}. {}", i + 1, fields.join(";"));
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn apply_bounds(settings: &mut Settings, bounds: &BoundsArgs) -> Result<()> {
    let current = settings.bbox;
    settings.bbox = BoundingBox::new(
        bounds.south.unwrap_or(current.south),
        bounds.north.unwrap_or(current.north),
        bounds.west.unwrap_or(current.west),
        bounds.east.unwrap_or(current.east),
    )?;
    Ok(())
}

async fn load_climate_table(settings: &Settings, input: Option<&Path>) -> Result<ClimateTable> {
    let reader = ClimateReader::with_skip_rows(settings.filter.skip_rows);
    match input {
        Some(path) => {
            println!("Reading climatology from {}", path.display());
            reader.read_path(path)
        }
        None => {
            let request = AcquisitionRequest::from(&settings.acquisition);
            println!("Downloading climatology ({})...", request.parameters.join(","));
            let progress = ProgressReporter::new_spinner("Downloading climatology...", false);
            let table = PowerClient::new(&settings.acquisition.endpoint)?
                .with_reader(reader)
                .fetch(&request)
                .await?;
            progress.finish_with_message("Download complete");
            Ok(table)
        }
    }
}

/// Cancel `token` on the first Ctrl-C and exit on the second.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, &token).await {
            warn!("Second interrupt received, exiting");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });
}

/// Wait for interrupts from `next`. The first cancels `token`; returns
/// `true` when a second one asks for a forced quit.
async fn watch_interrupts<F, Fut>(mut next: F, token: &CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next().await.is_err() {
        return false;
    }
    warn!("Interrupt received, stopping; press Ctrl-C again to force quit");
    token.cancel();
    next().await.is_ok()
}

async fn enrich(settings: &Settings, table: &ClimateTable) -> Result<()> {
    let filtered = RegionFilter::from_settings(settings.bbox, &settings.filter).apply(table);
    let value_column = resolve_value_column(&settings.filter.value_column);
    let cells = filtered.grid_cells(value_column)?;

    let output: &PathBuf = &settings.output.path;
    let mut writer = IncrementalWriter::new(output).with_sync_mode(settings.output.sync);
    writer.prepare()?;

    let completed = if settings.output.resume {
        completed_keys(output)?
    } else {
        HashSet::new()
    };

    println!(
        "Enriching {} cells ({} already written) into {}",
        filtered.len(),
        completed.len(),
        output.display()
    );
    info!(
        cells = filtered.len(),
        bbox = ?settings.bbox,
        value_column,
        resume = settings.output.resume,
        "Starting enrichment"
    );

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let geocoder = NominatimGeocoder::new(&settings.geocoder)
        .map_err(|e| ProcessingError::Config(format!("Cannot build geocoder: {}", e)))?;
    let client = GeocodeClient::from_settings(geocoder, &settings.geocoder)
        .with_cancellation(cancel.clone());
    let enricher = Enricher::new(client)
        .with_completed(completed)
        .with_cancellation(cancel);

    let progress = ProgressReporter::new(filtered.len() as u64, "Geocoding cells...", false);
    match enricher.run(cells, &mut writer, Some(&progress)).await {
        Ok(report) => {
            progress.finish_with_message(&format!("Enriched {} cells", report.processed));
            println!("\n{}", report.summary());
            println!("Output: {}", output.display());
            Ok(())
        }
        Err(e) => {
            progress.finish_with_message("Enrichment stopped");
            println!(
                "{} records written to {} before stopping; rerun with --resume to continue",
                writer.appended(),
                output.display()
            );
            Err(e)
        }
    }
}
