//! Domain logic of the registrar: grading rules, access scoping, the grade
//! ledger, transcripts, roster import and semester archiving.

pub mod access;
pub mod archive;
pub mod credentials;
pub mod error;
pub mod grading;
pub mod ledger;
pub mod roster;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use access::{AccessDecision, DenialReason};
pub use error::{ComputeError, Result};
pub use ledger::GradeSubmission;
pub use transcript::{PdfTranscriptRenderer, TranscriptRenderer};

/// Returns the transcript renderer used by the service.
pub fn default_renderer() -> PdfTranscriptRenderer {
    PdfTranscriptRenderer::new()
}
