//! Engine error types with stable error codes.
//!
//! Every failure the engine can surface maps to one of a closed set of code
//! strings (e.g. `model.invariant`, `io.writeFailed`). Callers aggregate
//! errors where the engine can keep collecting (unresolved references,
//! invariant violations) and short-circuit on fatal ones.

/// Errors produced by the emission engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// An option value was unrecognized or a combination was nonsensical.
    #[error("invalid configuration: {detail}")]
    ConfigInvalid {
        /// Description of the offending option.
        detail: String,
    },

    /// A model invariant was violated (missing identifier, duplicate
    /// physical name, row arity mismatch).
    #[error("model invariant violated: {detail}")]
    ModelInvariant {
        /// Description of the violated invariant.
        detail: String,
    },

    /// More than one naming override matched the same target.
    #[error("ambiguous naming override for {target}: {detail}")]
    OverrideAmbiguous {
        /// The table the rules collided on.
        target: String,
        /// The colliding rule descriptions.
        detail: String,
    },

    /// A relationship target could not be resolved in the model or the
    /// supplemental entity set.
    #[error("unresolved reference from {owner} to {target}")]
    ReferenceUnresolved {
        /// The owning entity (schema.table).
        owner: String,
        /// The referenced entity as declared.
        target: String,
    },

    /// A MERGE was planned for a table with no primary key and no
    /// allow-missing-primary-key override.
    #[error("seed table {table} has no primary key and no override allows it")]
    SeedPrimaryKeyRequired {
        /// The seed table (schema.table).
        table: String,
    },

    /// A file write or rename failed.
    #[error("write failed for {path}: {detail}")]
    IoWriteFailed {
        /// The output path being written.
        path: String,
        /// The underlying I/O error text.
        detail: String,
    },

    /// An emitted identifier exceeded 128 characters after all naming
    /// transforms. This is a guard against implementation bugs.
    #[error("identifier exceeds 128 characters: {identifier}")]
    IdentifierTooLong {
        /// The offending identifier.
        identifier: String,
    },
}

/// Result alias for fallible single-error operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result alias for operations that aggregate every error they find.
pub type AggregateResult<T> = std::result::Result<T, Vec<EngineError>>;

impl EngineError {
    // -- Constructors --------------------------------------------------------

    /// Creates a [`EngineError::ConfigInvalid`] with the given detail.
    pub fn config_invalid(detail: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            detail: detail.into(),
        }
    }

    /// Creates a [`EngineError::ModelInvariant`] with the given detail.
    pub fn model_invariant(detail: impl Into<String>) -> Self {
        Self::ModelInvariant {
            detail: detail.into(),
        }
    }

    /// Creates a [`EngineError::ReferenceUnresolved`] for the given owner and
    /// declared target.
    pub fn reference_unresolved(owner: impl Into<String>, target: impl Into<String>) -> Self {
        Self::ReferenceUnresolved {
            owner: owner.into(),
            target: target.into(),
        }
    }

    /// Creates a [`EngineError::IoWriteFailed`] from a path and an I/O error.
    pub fn io_write_failed(path: impl Into<String>, source: &std::io::Error) -> Self {
        Self::IoWriteFailed {
            path: path.into(),
            detail: source.to_string(),
        }
    }

    // -- Codes ---------------------------------------------------------------

    /// Returns the stable error code for this error.
    ///
    /// Codes are part of the public contract and never change for a given
    /// failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigInvalid { .. } => "config.invalid",
            Self::ModelInvariant { .. } => "model.invariant",
            Self::OverrideAmbiguous { .. } => "override.ambiguous",
            Self::ReferenceUnresolved { .. } => "reference.unresolved",
            Self::SeedPrimaryKeyRequired { .. } => "seed.primaryKeyRequired",
            Self::IoWriteFailed { .. } => "io.writeFailed",
            Self::IdentifierTooLong { .. } => "emission.identifierTooLong",
        }
    }

    /// Returns `true` if the engine can continue collecting further errors
    /// after this one.
    pub fn is_aggregatable(&self) -> bool {
        matches!(
            self,
            Self::ModelInvariant { .. } | Self::ReferenceUnresolved { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let cases: Vec<(EngineError, &str)> = vec![
            (EngineError::config_invalid("x"), "config.invalid"),
            (EngineError::model_invariant("x"), "model.invariant"),
            (
                EngineError::OverrideAmbiguous {
                    target: "dbo.T".into(),
                    detail: "two rules".into(),
                },
                "override.ambiguous",
            ),
            (
                EngineError::reference_unresolved("dbo.A", "B"),
                "reference.unresolved",
            ),
            (
                EngineError::SeedPrimaryKeyRequired {
                    table: "dbo.T".into(),
                },
                "seed.primaryKeyRequired",
            ),
            (
                EngineError::IoWriteFailed {
                    path: "/tmp/x".into(),
                    detail: "denied".into(),
                },
                "io.writeFailed",
            ),
            (
                EngineError::IdentifierTooLong {
                    identifier: "X".repeat(200),
                },
                "emission.identifierTooLong",
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn display_includes_detail() {
        let err = EngineError::reference_unresolved("dbo.Order", "Customer");
        assert_eq!(
            err.to_string(),
            "unresolved reference from dbo.Order to Customer"
        );
    }
}
