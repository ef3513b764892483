//! External collaborators the engine calls but does not implement.
//!
//! Document storage, notification delivery and certificate rendering live outside
//! the engine. Each is a small synchronous trait; implementations are injected into
//! [`super::KknEngine`].

use crate::{core::grading::CertificateData, errors::Error, models::RegistrationStatus};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Failure reported by a collaborator.
#[derive(Debug, Error)]
#[error("{service}: {message}")]
pub struct CollaboratorError {
    /// Which collaborator failed
    pub service: &'static str,
    /// What went wrong
    pub message: String,
}

impl CollaboratorError {
    /// Creates a collaborator error.
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

impl From<CollaboratorError> for Error {
    fn from(err: CollaboratorError) -> Self {
        Self::Collaborator {
            message: err.to_string(),
        }
    }
}

/// Stores uploaded bytes and hands back a stable reference.
pub trait DocumentStore: Send + Sync {
    /// Stores `bytes` under `namespace` and returns the reference to persist.
    fn store(
        &self,
        namespace: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, CollaboratorError>;
}

/// Something worth telling users about, sent after the change committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A registration was submitted
    RegistrationSubmitted {
        /// Registration id
        registration_id: i64,
    },
    /// A registration received a review decision
    RegistrationReviewed {
        /// Registration id
        registration_id: i64,
        /// New status
        status: RegistrationStatus,
    },
    /// A student was placed in a posto
    MemberAssigned {
        /// Posto id
        posto_id: i64,
        /// Assigned position
        position: String,
    },
    /// A message was posted on a posto board
    MessagePosted {
        /// Posto id
        posto_id: i64,
        /// Message id
        message_id: i64,
    },
    /// A grade was recorded
    GradeRecorded {
        /// Registration id
        registration_id: i64,
        /// Letter grade
        letter: String,
    },
}

/// Delivers events to users. Failures never undo the change that caused them.
pub trait Notifier: Send + Sync {
    /// Sends `event` to `recipients`.
    fn notify(&self, recipients: &[i64], event: &Event) -> Result<(), CollaboratorError>;
}

/// Turns certificate fields into a document.
pub trait CertificateRenderer: Send + Sync {
    /// Renders a certificate.
    fn render(&self, data: &CertificateData) -> Result<Vec<u8>, CollaboratorError>;
}

/// Notifier that only logs, used when no delivery channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, recipients: &[i64], event: &Event) -> Result<(), CollaboratorError> {
        info!(?recipients, ?event, "Notification");
        Ok(())
    }
}
