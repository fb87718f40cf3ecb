use thiserror::Error;

use crate::fields::FieldName;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("Incomplete profile for {ticker}: missing {missing}")]
    IncompleteProfile { ticker: String, missing: String },

    #[error("Unit mismatch for {ticker}: {field} reported in unresolvable currency '{currency}'")]
    UnitMismatch {
        ticker: String,
        field: FieldName,
        currency: String,
    },

    #[error("Degenerate invested capital for {ticker}: ROIC is undefined")]
    DivisionDegenerate { ticker: String },

    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),
}
