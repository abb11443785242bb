//! Error type shared by every stage of the validation compiler.
//!
//! Expected validation failures are *values* ([`crate::ValidationError`]).
//! Everything in this module is a fault: either a collaborator broke its
//! contract or the caller misused an internal structure.

use crate::graph::{MemberId, RuleId};

/// Faults raised while analysing types, compiling programs or resolving
/// error messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A member or rule was allocated after the graph was sealed.
    #[error("member graph is sealed; no further members or rules can be allocated")]
    SealedGraph,

    /// The id was not issued by this member graph.
    #[error("member id {0} does not belong to this member graph")]
    UnknownMember(MemberId),

    /// The id was not issued by this member graph.
    #[error("rule id {0} does not belong to this member graph")]
    UnknownRule(RuleId),

    /// The rule provider failed while reading metadata for a type or member.
    #[error("rule provider failed for `{type_name}`")]
    Provider {
        type_name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A checker accepted a rule but could not turn it into a check.
    #[error("checker failed to emit a check for `{type_name}.{member}`")]
    Checker {
        type_name: &'static str,
        member: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Compiling the type would allocate more member nodes than configured.
    #[error("validation program for `{type_name}` exceeds {limit} members")]
    MemberBudget { type_name: &'static str, limit: usize },

    /// A deferred or per-occurrence message factory failed.
    #[error("failed to resolve error message for `{member_path}`")]
    Message {
        member_path: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
