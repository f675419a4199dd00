use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::geocoding::{GeocodeClient, GeocodeOutcome, NotFoundReason, ReverseGeocoder};
use crate::models::{EnrichedRecord, GridCell};
use crate::utils::progress::ProgressReporter;
use crate::writers::RecordSink;

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentReport {
    /// Cells geocoded and appended during this run.
    pub processed: usize,
    pub found: usize,
    pub provider_empty: usize,
    pub exhausted: usize,
    /// Cells already present in the destination.
    pub skipped: usize,
    pub elapsed: Duration,
}

impl EnrichmentReport {
    fn record(&mut self, outcome: &GeocodeOutcome) {
        self.processed += 1;
        match outcome {
            GeocodeOutcome::Found(_) => self.found += 1,
            GeocodeOutcome::NotFound(NotFoundReason::ProviderEmpty) => self.provider_empty += 1,
            GeocodeOutcome::NotFound(NotFoundReason::RetriesExhausted { .. }) => {
                self.exhausted += 1
            }
        }
    }

    pub fn without_address(&self) -> usize {
        self.provider_empty + self.exhausted
    }

    pub fn summary(&self) -> String {
        format!(
            "Enrichment Summary:\n\
            - Cells processed: {}\n\
            - With address: {}\n\
            - No address from provider: {}\n\
            - Gave up after retries: {}\n\
            - Skipped (already written): {}\n\
            - Elapsed: {:.1}s",
            self.processed,
            self.found,
            self.provider_empty,
            self.exhausted,
            self.skipped,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Geocodes grid cells one at a time and appends each result before the next.
pub struct Enricher<G> {
    client: GeocodeClient<G>,
    completed: HashSet<String>,
    cancel: CancellationToken,
}

impl<G: ReverseGeocoder> Enricher<G> {
    pub fn new(client: GeocodeClient<G>) -> Self {
        Self {
            client,
            completed: HashSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Coordinates to skip because a previous run already wrote them.
    pub fn with_completed(mut self, completed: HashSet<String>) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &GeocodeClient<G> {
        &self.client
    }

    /// Drive the whole batch.
    ///
    /// Input order is output order. A write fault or cancellation stops the
    /// run; everything appended before that point stays in the sink.
    pub async fn run<I, S>(
        &self,
        cells: I,
        sink: &mut S,
        progress: Option<&ProgressReporter>,
    ) -> Result<EnrichmentReport>
    where
        I: IntoIterator<Item = GridCell>,
        S: RecordSink + ?Sized,
    {
        let start = Instant::now();
        let mut report = EnrichmentReport::default();

        for cell in cells {
            if self.cancel.is_cancelled() {
                info!(processed = report.processed, "Enrichment cancelled");
                return Err(ProcessingError::Cancelled);
            }

            let coordinate = cell.latlon();

            if self.completed.contains(&coordinate) {
                debug!(coordinate = %coordinate, "Already written, skipping");
                report.skipped += 1;
                if let Some(p) = progress {
                    p.increment(1);
                }
                continue;
            }

            let outcome = self.client.reverse(&coordinate).await?;
            report.record(&outcome);

            let record = EnrichedRecord::from_cell(&cell, outcome.into_address());
            sink.append(&record)?;

            debug!(
                coordinate = %record.latlon,
                value = record.value,
                state = record.address.state.as_deref().unwrap_or(""),
                "Cell enriched"
            );

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        report.elapsed = start.elapsed();
        info!(
            processed = report.processed,
            found = report.found,
            empty = report.without_address(),
            skipped = report.skipped,
            "Enrichment finished"
        );

        Ok(report)
    }
}
