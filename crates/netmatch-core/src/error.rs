//! Error types for netmatch-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate circuit: {0}")]
    DuplicateCircuit(String),

    #[error("duplicate net: {0}")]
    DuplicateNet(String),

    #[error("device {device}: expected {expected} terminal connections, got {got}")]
    TerminalCountMismatch {
        device: String,
        expected: usize,
        got: usize,
    },

    #[error("subcircuit {subcircuit}: expected {expected} pin connections, got {got}")]
    PinCountMismatch {
        subcircuit: String,
        expected: usize,
        got: usize,
    },

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("instantiating {target} inside {parent} would be recursive")]
    RecursiveInstantiation { parent: String, target: String },
}

pub type Result<T> = std::result::Result<T, Error>;
