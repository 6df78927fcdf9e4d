use thiserror::Error;

/// Error returned when a string does not match the duration grammar
/// understood by [`parse_duration`](crate::parse_duration).
#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("cannot parse duration {0:?}")]
pub struct FormatError(pub String);

/// Structural error detected while validating a relabel rule list.
///
/// All variants carry the zero-based index of the offending rule so the
/// operator can locate it in the source configuration. Any of these is fatal
/// to the whole list; a malformed list is never partially applied.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("relabel rule #{rule}: missing `target_label` for `action={action}`")]
    MissingTargetLabel { rule: usize, action: String },

    #[error("relabel rule #{rule}: missing `regex` for `action={action}`")]
    MissingRegex { rule: usize, action: String },

    #[error("relabel rule #{rule}: `modulus` must be greater than 0 for `action=hashmod`")]
    NonPositiveModulus { rule: usize },

    #[error("relabel rule #{rule}: invalid label name {name:?} in `{field}`")]
    InvalidLabelName {
        rule: usize,
        field: &'static str,
        name: String,
    },

    #[error("relabel rule #{rule}: cannot parse `regex` {pattern:?}: {reason}")]
    InvalidRegex {
        rule: usize,
        pattern: String,
        reason: String,
    },
}

/// Error returned by the YAML entry point for loading relabel configs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot unmarshal relabel configs: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
