//! Certificate verification flow.
//!
//! [`VerificationFlow`] is the state machine behind the verify page:
//! `idle -> uploading -> processing -> verified | invalid`, with `error` reserved for a
//! backend that fails. Transitions are driven by whatever [`VerificationBackend`] is
//! plugged into the [`FlowRegistry`]; the shipped [`SimulatedBackend`] does no real
//! document analysis.

mod backend;
mod registry;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::toast::Toast;

pub use backend::{
    FlowSchedule, MAX_TIME_SCALE, OutcomeTemplate, ProcessingStage, ProgressSink, SimulatedBackend,
    VerificationBackend, invalid_template, verified_template,
};
pub use registry::{FlowError, FlowRegistry, MAX_FLOWS_PER_OWNER};

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const PROGRESS_UPLOADING: u8 = 10;
pub const PROGRESS_RECEIVED: u8 = 30;
pub const PROGRESS_ANALYZING: u8 = 70;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Pdf,
    Image,
}

impl MediaKind {
    /// Classifies a declared MIME type: any `image/*`, or any type whose subtype
    /// mentions `pdf`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let parsed: mime::Mime = content_type.trim().to_ascii_lowercase().parse().ok()?;
        if parsed.type_() == mime::IMAGE {
            Some(MediaKind::Image)
        } else if parsed.subtype() == mime::PDF || parsed.subtype().as_str().contains("pdf") {
            Some(MediaKind::Pdf)
        } else {
            None
        }
    }
}

/// A file as received, before admission.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub stored_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadCandidate {
    pub name: String,
    pub size: u64,
    pub media_kind: MediaKind,
    #[serde(skip)]
    pub stored_path: PathBuf,
}

impl UploadCandidate {
    /// Size is checked before type, so an oversized file of the wrong type reports
    /// its size.
    pub fn admit(file: SelectedFile) -> Result<Self, SelectionError> {
        if file.size > MAX_UPLOAD_BYTES {
            return Err(SelectionError::TooLarge { size: file.size });
        }
        let Some(media_kind) = MediaKind::from_content_type(&file.content_type) else {
            return Err(SelectionError::UnsupportedType {
                content_type: file.content_type,
            });
        };

        Ok(Self {
            name: file.name,
            size: file.size,
            media_kind,
            stored_path: file.stored_path,
        })
    }
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("file of {size} bytes exceeds the upload limit")]
    TooLarge { size: u64 },
    #[error("unsupported file type `{content_type}`")]
    UnsupportedType { content_type: String },
    #[error("no certificate file was provided")]
    Missing,
    #[error("failed to read upload: {0}")]
    Unreadable(String),
}

impl SelectionError {
    pub fn toast(&self) -> Toast {
        match self {
            SelectionError::TooLarge { .. } => {
                Toast::error("File too large", "Please select a file smaller than 10MB")
            }
            SelectionError::UnsupportedType { .. } => {
                Toast::error("Invalid file type", "Please select a PDF or image file")
            }
            SelectionError::Missing => {
                Toast::error("No file selected", "Please select a certificate to verify")
            }
            SelectionError::Unreadable(_) => {
                Toast::error("Upload failed", "The file could not be read, please try again")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedCertificate {
    pub student_name: String,
    pub roll_number: String,
    pub institution: String,
    pub degree: String,
    pub year: String,
    pub grade: String,
    pub certificate_id: String,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidCertificate {
    pub issues: Vec<String>,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified(VerifiedCertificate),
    Invalid(InvalidCertificate),
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("verification backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Idle,
    Uploading,
    Processing,
    Verified,
    Invalid,
    Error,
}

impl VerificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Verified | VerificationStatus::Invalid | VerificationStatus::Error
        )
    }

    pub fn headline(&self) -> &'static str {
        match self {
            VerificationStatus::Idle => "Ready to verify",
            VerificationStatus::Uploading => "Uploading document...",
            VerificationStatus::Processing => "Analyzing certificate...",
            VerificationStatus::Verified => "Certificate Verified",
            VerificationStatus::Invalid => "Certificate Invalid",
            VerificationStatus::Error => "Verification Error",
        }
    }
}

/// Current result, tagged by status. Only terminal states carry a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationResult {
    Idle,
    Uploading,
    Processing,
    Verified(VerifiedCertificate),
    Invalid(InvalidCertificate),
    Error { message: String },
}

impl VerificationResult {
    pub fn status(&self) -> VerificationStatus {
        match self {
            VerificationResult::Idle => VerificationStatus::Idle,
            VerificationResult::Uploading => VerificationStatus::Uploading,
            VerificationResult::Processing => VerificationStatus::Processing,
            VerificationResult::Verified(_) => VerificationStatus::Verified,
            VerificationResult::Invalid(_) => VerificationStatus::Invalid,
            VerificationResult::Error { .. } => VerificationStatus::Error,
        }
    }
}

/// Identifies one run of the flow. Reselecting a file or starting again supersedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket(u64);

#[derive(Debug, Clone)]
pub struct VerificationFlow {
    candidate: Option<UploadCandidate>,
    result: VerificationResult,
    progress: u8,
    run: u64,
    toast: Option<Toast>,
}

impl Default for VerificationFlow {
    fn default() -> Self {
        Self {
            candidate: None,
            result: VerificationResult::Idle,
            progress: 0,
            run: 0,
            toast: None,
        }
    }
}

impl VerificationFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate(&self) -> Option<&UploadCandidate> {
        self.candidate.as_ref()
    }

    pub fn result(&self) -> &VerificationResult {
        &self.result
    }

    pub fn status(&self) -> VerificationStatus {
        self.result.status()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.status(),
            VerificationStatus::Uploading | VerificationStatus::Processing
        )
    }

    /// Admits `file` as the new candidate and resets the result to idle. A rejected
    /// file leaves the flow untouched. Returns the candidate it replaced.
    pub fn select_file(
        &mut self,
        file: SelectedFile,
    ) -> Result<Option<UploadCandidate>, SelectionError> {
        let candidate = UploadCandidate::admit(file)?;
        let previous = self.candidate.replace(candidate);
        self.result = VerificationResult::Idle;
        self.progress = 0;
        self.toast = None;
        self.run += 1;
        Ok(previous)
    }

    /// Enters `uploading`. `None` when nothing is selected or a run is already going.
    pub fn begin(&mut self) -> Option<(RunTicket, UploadCandidate)> {
        if self.is_in_flight() {
            return None;
        }
        let candidate = self.candidate.clone()?;
        self.run += 1;
        self.result = VerificationResult::Uploading;
        self.progress = PROGRESS_UPLOADING;
        self.toast = None;
        Some((RunTicket(self.run), candidate))
    }

    pub fn advance(&mut self, ticket: RunTicket, stage: ProcessingStage) -> bool {
        if !self.owns(ticket) {
            return false;
        }
        self.result = VerificationResult::Processing;
        self.progress = match stage {
            ProcessingStage::Received => PROGRESS_RECEIVED,
            ProcessingStage::Analyzing => PROGRESS_ANALYZING,
        };
        true
    }

    pub fn finish(
        &mut self,
        ticket: RunTicket,
        outcome: Result<VerificationOutcome, VerificationError>,
    ) -> bool {
        if !self.owns(ticket) {
            return false;
        }
        self.progress = PROGRESS_DONE;
        let (result, toast) = match outcome {
            Ok(VerificationOutcome::Verified(certificate)) => (
                VerificationResult::Verified(certificate),
                Toast::info("Certificate Verified", "Document authentication successful"),
            ),
            Ok(VerificationOutcome::Invalid(report)) => (
                VerificationResult::Invalid(report),
                Toast::error("Verification Failed", "Document could not be authenticated"),
            ),
            Err(err) => (
                VerificationResult::Error {
                    message: err.to_string(),
                },
                Toast::error("Verification Error", "The certificate could not be processed"),
            ),
        };
        self.result = result;
        self.toast = Some(toast);
        true
    }

    fn owns(&self, ticket: RunTicket) -> bool {
        ticket.0 == self.run && self.is_in_flight()
    }

    pub fn snapshot(&self, flow_id: Uuid) -> FlowSnapshot {
        let status = self.status();
        let detail = match status {
            VerificationStatus::Uploading => Some("Uploading document..."),
            VerificationStatus::Processing => Some("Analyzing with AI..."),
            _ => None,
        };
        FlowSnapshot {
            flow_id,
            candidate: self.candidate.clone(),
            progress: self.progress,
            headline: status.headline(),
            detail,
            result: self.result.clone(),
            toast: self.toast.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub flow_id: Uuid,
    pub candidate: Option<UploadCandidate>,
    pub progress: u8,
    pub headline: &'static str,
    pub detail: Option<&'static str>,
    pub result: VerificationResult,
    pub toast: Option<Toast>,
}

#[cfg(test)]
impl FlowSnapshot {
    pub fn status(&self) -> VerificationStatus {
        self.result.status()
    }
}
