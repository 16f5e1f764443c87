use crate::domain::VariableId;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A narrowing operation left a variable with no admissible values. This
    /// is not a programming error: it signals a failed branch that the host
    /// search should abandon and backtrack from.
    #[error("domain of variable ?{variable} became empty")]
    DomainWipeout { variable: VariableId },

    /// An archived decision could not be decoded.
    #[error("malformed decision archive: {0}")]
    Archive(#[from] serde_json::Error),

    /// An archived decision refers to a constraint that was never posted.
    #[error("decision refers to constraint {index}, but only {count} are posted")]
    UnknownConstraint { index: usize, count: usize },

    /// An archived decision refers to a variable position outside the
    /// constraint it names.
    #[error("decision refers to position {pos} in a constraint of arity {arity}")]
    UnknownPosition { pos: usize, arity: usize },
}
