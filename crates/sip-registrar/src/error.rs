// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the registrar.

use thiserror::Error;

/// Result type alias for registrar operations.
pub type Result<T> = std::result::Result<T, RegistrarError>;

/// Ways a REGISTER can be refused, plus configuration problems.
///
/// Lease-too-short and challenges are negotiated responses, not errors, so
/// they have no variant here.
#[derive(Error, Debug)]
pub enum RegistrarError {
    /// Missing Contact, unparsable lease, no Call-ID.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// A refresh presented credentials for someone other than the identity the
    /// registration was established with.
    #[error("Identity mismatch: registered as {established}, presented {presented}")]
    IdentityMismatch {
        established: String,
        presented: String,
    },

    /// Unusable credentials or a failed digest check.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The user lookup collaborator failed or does not know the user.
    #[error("User lookup failed for {identity}: {reason}")]
    LookupFailed { identity: String, reason: String },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

impl RegistrarError {
    /// Status code the refusal is answered with.
    pub fn status_code(&self) -> u16 {
        match self {
            RegistrarError::MalformedRequest(_) => 400,
            RegistrarError::IdentityMismatch { .. }
            | RegistrarError::AuthFailed(_)
            | RegistrarError::LookupFailed { .. } => 403,
            RegistrarError::InvalidConfig(_) => 500,
        }
    }

    /// Short label for metrics and removal reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistrarError::MalformedRequest(_) => "malformed",
            RegistrarError::IdentityMismatch { .. } => "identity-mismatch",
            RegistrarError::AuthFailed(_) => "auth-failed",
            RegistrarError::LookupFailed { .. } => "lookup-failed",
            RegistrarError::InvalidConfig(_) => "invalid-config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_status_codes() {
        assert_eq!(RegistrarError::MalformedRequest("x".into()).status_code(), 400);
        assert_eq!(
            RegistrarError::IdentityMismatch {
                established: "a@b".into(),
                presented: "c@b".into()
            }
            .status_code(),
            403
        );
        assert_eq!(RegistrarError::AuthFailed("bad".into()).status_code(), 403);
        assert_eq!(
            RegistrarError::LookupFailed {
                identity: "a@b".into(),
                reason: "unknown".into()
            }
            .status_code(),
            403
        );
        assert_eq!(RegistrarError::InvalidConfig("x".into()).status_code(), 500);
    }

    #[test]
    fn every_refusal_has_its_own_kind() {
        let errors = [
            RegistrarError::MalformedRequest("x".into()),
            RegistrarError::IdentityMismatch {
                established: "a@b".into(),
                presented: "c@b".into(),
            },
            RegistrarError::AuthFailed("bad".into()),
            RegistrarError::LookupFailed {
                identity: "a@b".into(),
                reason: "unknown".into(),
            },
            RegistrarError::InvalidConfig("x".into()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(RegistrarError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
        assert!(errors.iter().all(|err| err.status_code() != 500 || err.kind() == "invalid-config"));
    }

    #[test]
    fn messages_name_the_identities() {
        let err = RegistrarError::IdentityMismatch {
            established: "1000@example.com".into(),
            presented: "1001@example.com".into(),
        };
        assert_eq!(
            err.to_string(),
            "Identity mismatch: registered as 1000@example.com, presented 1001@example.com"
        );
    }
}
