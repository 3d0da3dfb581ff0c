// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch issuance. Files run one at a time; a failing file is recorded and
// the loop moves on. Cancellation is checked only between files.

use docseal_core::human_errors::{HumanError, humanize_error};
use docseal_core::types::FileStatus;
use docseal_core::{DocumentMetadata, UploadedFile};
use docseal_registry::SigningSession;
use tracing::{info, instrument, warn};

use super::issuance::{IssuedDocument, Issuer};

/// Receives per-file progress and decides whether the batch goes on.
pub trait BatchObserver {
    fn on_status(&mut self, index: usize, name: &str, status: FileStatus, error: Option<&HumanError>);

    /// Asked before each file; `false` stops the batch.
    fn should_continue(&mut self) -> bool {
        true
    }
}

/// Observer that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl BatchObserver for Silent {
    fn on_status(&mut self, _: usize, _: &str, _: FileStatus, _: Option<&HumanError>) {}
}

/// A file that did not make it through the pipeline.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub index: usize,
    pub name: String,
    pub error: HumanError,
    /// The underlying error text.
    pub detail: String,
}

/// Everything a batch produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub issued: Vec<IssuedDocument>,
    pub failures: Vec<BatchFailure>,
    /// Final status of every input, in input order.
    pub statuses: Vec<FileStatus>,
    /// Set when the observer stopped the batch early.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }
}

/// Issue every file in `files` under the same `metadata`.
#[instrument(skip_all, fields(files = files.len(), doc_type = %metadata.doc_type))]
pub async fn issue_batch<S, O>(
    issuer: &Issuer<S>,
    files: &[UploadedFile],
    metadata: &DocumentMetadata,
    observer: &mut O,
) -> BatchReport
where
    S: SigningSession,
    O: BatchObserver + ?Sized,
{
    let mut report = BatchReport {
        statuses: vec![FileStatus::Pending; files.len()],
        ..BatchReport::default()
    };
    for (index, file) in files.iter().enumerate() {
        observer.on_status(index, &file.name, FileStatus::Pending, None);
    }

    for (index, file) in files.iter().enumerate() {
        if !observer.should_continue() {
            info!(index, "batch cancelled");
            report.cancelled = true;
            break;
        }
        report.statuses[index] = FileStatus::Processing;
        observer.on_status(index, &file.name, FileStatus::Processing, None);

        match issuer.issue(file, metadata).await {
            Ok(issued) => {
                report.statuses[index] = FileStatus::Completed;
                observer.on_status(index, &file.name, FileStatus::Completed, None);
                report.issued.push(issued);
            }
            Err(err) => {
                warn!(index, name = %file.name, error = %err, "file failed");
                let human = humanize_error(&err);
                report.statuses[index] = FileStatus::Error;
                observer.on_status(index, &file.name, FileStatus::Error, Some(&human));
                report.failures.push(BatchFailure {
                    index,
                    name: file.name.clone(),
                    error: human,
                    detail: err.to_string(),
                });
            }
        }
    }

    info!(
        issued = report.issued.len(),
        failed = report.failures.len(),
        cancelled = report.cancelled,
        "batch finished"
    );
    report
}
