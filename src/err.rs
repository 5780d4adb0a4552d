use std::process::{ExitCode, Termination};

use crate::pgx::conf::Drug;

/// Errors raised while reading a genotype (VCF) file.
///
/// All of these are fatal for the whole analysis request.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("VCF file not found: {0}")]
    NotFound(String),
    #[error("VCF file exceeds {limit} size limit (got {size})")]
    SizeLimit { size: String, limit: String },
    #[error("Invalid VCF file encoding. Expected UTF-8.")]
    Encoding,
    #[error("Error parsing VCF file: {0}")]
    Format(String),
}

impl Termination for ParseError {
    fn report(self) -> ExitCode {
        match self {
            ParseError::NotFound(_) => ExitCode::from(2),
            ParseError::SizeLimit { .. } => ExitCode::from(3),
            ParseError::Encoding | ParseError::Format(_) => ExitCode::from(4),
        }
    }
}

/// Process exit code for a failed command.
///
/// A `ParseError` anywhere in the context chain maps through its
/// `Termination` impl, everything else exits with 1.
pub fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<ParseError>() {
        Some(parse_error) => parse_error.clone().report(),
        None => ExitCode::FAILURE,
    }
}

/// Per-drug errors; these do not abort the batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AssessError {
    #[error("Unsupported drug. Supported drugs: {}", Drug::supported_list())]
    UnsupportedDrug(String),
}

/// Failures of the remote explanation service.
///
/// These never reach the caller, the template fallback absorbs them.
#[derive(thiserror::Error, Debug)]
pub enum ExplainError {
    #[error("no credential configured for explanation service")]
    MissingCredential,
    #[error("no variants to explain")]
    NoVariants,
    #[error("explanation service request failed: {0}")]
    Transport(String),
    #[error("malformed explanation service response: {0}")]
    Malformed(String),
}
