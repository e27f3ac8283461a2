use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse config: {source}")]
    Yaml {
        #[from]
        source: serde_yml::Error,
    },

    #[error("{field} must be between 0 and 1, got {value}")]
    RateOutOfRange { field: &'static str, value: f64 },

    #[error("deficit_limit must be non-negative, got {0}")]
    NegativeDeficitLimit(f64),

    #[error("population sizes must be positive")]
    NonPositivePopulation,

    #[error("years must be positive")]
    NonPositiveYears,

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
}

#[derive(Debug, Error, PartialEq)]
pub enum SamplingError {
    #[error("empirical distribution has no records")]
    EmptyTable,

    #[error("no matching records for conditions {0}")]
    NoMatchingRecord(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("distribution '{0}' not registered")]
    Lookup(String),

    #[error("distribution '{name}': {source}")]
    Domain {
        name: String,
        #[source]
        source: SamplingError,
    },

    #[error("transfer_rule must be provided")]
    MissingTransferRule,
}
