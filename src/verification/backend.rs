use std::time::Duration;

use async_trait::async_trait;
use rand_core::{OsRng, RngCore};
use tokio::time::sleep;

use super::{
    InvalidCertificate, UploadCandidate, VerificationError, VerificationOutcome,
    VerifiedCertificate,
};

/// Intermediate milestones a backend reports while it works on a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// The document has been handed over; analysis begins.
    Received,
    Analyzing,
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, stage: ProcessingStage);
}

/// Decides whether a candidate certificate is authentic.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    async fn verify(
        &self,
        candidate: &UploadCandidate,
        progress: &dyn ProgressSink,
    ) -> Result<VerificationOutcome, VerificationError>;
}

/// Offsets from the start of a run at which the simulated milestones fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSchedule {
    pub received_after: Duration,
    pub analyzing_after: Duration,
    pub completed_after: Duration,
}

impl Default for FlowSchedule {
    fn default() -> Self {
        Self {
            received_after: Duration::from_millis(1000),
            analyzing_after: Duration::from_millis(2000),
            completed_after: Duration::from_millis(3500),
        }
    }
}

/// Slowest supported stretch of the default schedule.
pub const MAX_TIME_SCALE: f64 = 100.0;

impl FlowSchedule {
    pub fn scaled(factor: f64) -> Self {
        let base = Self::default();
        let factor = if factor.is_finite() && factor >= 0.0 {
            factor.min(MAX_TIME_SCALE)
        } else {
            1.0
        };
        Self {
            received_after: base.received_after.mul_f64(factor),
            analyzing_after: base.analyzing_after.mul_f64(factor),
            completed_after: base.completed_after.mul_f64(factor),
        }
    }

    pub fn immediate() -> Self {
        Self::scaled(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeTemplate {
    Verified,
    Invalid,
}

impl OutcomeTemplate {
    pub fn build(&self) -> VerificationOutcome {
        match self {
            OutcomeTemplate::Verified => VerificationOutcome::Verified(verified_template()),
            OutcomeTemplate::Invalid => VerificationOutcome::Invalid(invalid_template()),
        }
    }
}

pub fn verified_template() -> VerifiedCertificate {
    VerifiedCertificate {
        student_name: "Rajesh Kumar Singh".to_string(),
        roll_number: "2019BCE001".to_string(),
        institution: "National Institute of Technology Jamshedpur".to_string(),
        degree: "Bachelor of Computer Engineering".to_string(),
        year: "2023".to_string(),
        grade: "First Class with Distinction".to_string(),
        certificate_id: "NIT-J-2023-BCE-001".to_string(),
        confidence: 98,
    }
}

pub fn invalid_template() -> InvalidCertificate {
    InvalidCertificate {
        issues: vec![
            "Certificate ID not found in institutional database".to_string(),
            "Signature verification failed".to_string(),
            "Document tampering detected in grade field".to_string(),
        ],
        confidence: 15,
    }
}

/// Placeholder backend. It never looks at the uploaded document: it waits out the
/// fixed schedule and returns one of two canned results. Not for production use;
/// replace with a backend that actually inspects the certificate.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    schedule: FlowSchedule,
    fixed: Option<OutcomeTemplate>,
}

impl SimulatedBackend {
    pub fn new(schedule: FlowSchedule) -> Self {
        Self {
            schedule,
            fixed: None,
        }
    }

    /// Always answers with `template` instead of picking at random.
    pub fn with_fixed_outcome(schedule: FlowSchedule, template: OutcomeTemplate) -> Self {
        Self {
            schedule,
            fixed: Some(template),
        }
    }

    fn pick(&self) -> OutcomeTemplate {
        if let Some(template) = self.fixed {
            return template;
        }
        if OsRng.next_u32() % 2 == 0 {
            OutcomeTemplate::Verified
        } else {
            OutcomeTemplate::Invalid
        }
    }
}

#[async_trait]
impl VerificationBackend for SimulatedBackend {
    async fn verify(
        &self,
        _candidate: &UploadCandidate,
        progress: &dyn ProgressSink,
    ) -> Result<VerificationOutcome, VerificationError> {
        let FlowSchedule {
            received_after,
            analyzing_after,
            completed_after,
        } = self.schedule;

        sleep(received_after).await;
        progress.report(ProcessingStage::Received).await;

        sleep(analyzing_after.saturating_sub(received_after)).await;
        progress.report(ProcessingStage::Analyzing).await;

        sleep(completed_after.saturating_sub(analyzing_after)).await;
        Ok(self.pick().build())
    }
}
