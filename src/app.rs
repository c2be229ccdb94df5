use std::collections::HashSet;

use rand::Rng;

use crate::delay::{Delay, Pacing};
use crate::domain::{Coordinate, FetchOutcome, StoreCode, StoreRecord};
use crate::error::BackupError;
use crate::locator::StoreLookup;
use crate::store::Snapshot;

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub smoke_test_code: String,
    pub coordinate: Coordinate,
    pub pacing: Pacing,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            smoke_test_code: crate::config::SMOKE_TEST_CODE.to_string(),
            coordinate: Coordinate::REFERENCE,
            pacing: Pacing::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub saved: usize,
    pub skipped: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started,
    SmokeTest { store_code: String },
    SmokeTestPassed,
    Resumed { existing: usize },
    Saved { sequence_number: u64, store_code: String },
    Skipped { store_code: String },
    Finished { total: usize },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct Backup<L: StoreLookup, D: Delay> {
    lookup: L,
    snapshot: Snapshot,
    delay: D,
    options: BackupOptions,
}

impl<L: StoreLookup, D: Delay> Backup<L, D> {
    pub fn new(lookup: L, snapshot: Snapshot, delay: D, options: BackupOptions) -> Self {
        Self {
            lookup,
            snapshot,
            delay,
            options,
        }
    }

    pub fn run(
        &self,
        codes: &[StoreCode],
        sink: &dyn ProgressSink,
    ) -> Result<BackupSummary, BackupError> {
        self.run_with_rng(codes, sink, &mut rand::rng())
    }

    pub fn run_with_rng<R: Rng>(
        &self,
        codes: &[StoreCode],
        sink: &dyn ProgressSink,
        rng: &mut R,
    ) -> Result<BackupSummary, BackupError> {
        sink.event(ProgressEvent::Started);

        let mut records = self.snapshot.load();
        let mut present: HashSet<String> = records
            .iter()
            .map(|record| StoreCode::new(&record.store_code).to_string())
            .collect();
        let mut next_number = records.len() as u64 + 1;

        sink.event(ProgressEvent::SmokeTest {
            store_code: self.options.smoke_test_code.clone(),
        });
        if self
            .lookup
            .fetch_store(&self.options.smoke_test_code, Some(self.options.coordinate))
            .is_fallback()
        {
            return Err(BackupError::SmokeTestFailed(
                self.options.smoke_test_code.clone(),
            ));
        }
        sink.event(ProgressEvent::SmokeTestPassed);
        sink.event(ProgressEvent::Resumed {
            existing: records.len(),
        });

        let mut summary = BackupSummary {
            saved: 0,
            skipped: 0,
            total: records.len(),
        };

        for code in codes {
            if present.contains(code.as_str()) {
                continue;
            }

            match self
                .lookup
                .fetch_store(code.as_str(), Some(self.options.coordinate))
            {
                FetchOutcome::Found(detail) if present.contains(&detail.store_code) => {
                    tracing::warn!(
                        store_code = %code,
                        returned = %detail.store_code,
                        "lookup returned a store that is already saved"
                    );
                    summary.skipped += 1;
                    sink.event(ProgressEvent::Skipped {
                        store_code: code.to_string(),
                    });
                }
                FetchOutcome::Found(detail) => {
                    let record = StoreRecord::from_detail(detail, next_number);
                    next_number += 1;
                    present.insert(code.to_string());
                    present.insert(record.store_code.clone());
                    let sequence_number = record.sequence_number;
                    records.push(record);
                    self.snapshot.save(&records)?;
                    tracing::info!(sequence_number, store_code = %code, "store saved");
                    summary.saved += 1;
                    sink.event(ProgressEvent::Saved {
                        sequence_number,
                        store_code: code.to_string(),
                    });
                }
                FetchOutcome::Fallback(fallback) => {
                    tracing::debug!(store_code = %code, reason = %fallback.reason, "store skipped");
                    summary.skipped += 1;
                    sink.event(ProgressEvent::Skipped {
                        store_code: code.to_string(),
                    });
                }
            }

            self.delay.sleep(self.options.pacing.next(rng));
        }

        summary.total = records.len();
        sink.event(ProgressEvent::Finished {
            total: summary.total,
        });
        Ok(summary)
    }
}
