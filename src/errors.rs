use thiserror::Error;

/// Errors that can escape tree operations or configuration loading. Misuse of the API
/// (an out-of-range node index, malformed key sequences handed to debugging helpers) is
/// a bug in the caller and panics instead.
#[derive(Debug, Error)]
pub enum DiscrErr {
    /// Normalization took more reduction steps than the configured budget. The tree
    /// operation that triggered it left the tree as it was before the call.
    #[error("whnf ran out of fuel after {fuel} steps while reducing {expr}")]
    WhnfFuelExhausted { fuel: usize, expr: String },

    #[error("failed to open config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("incompatible config options: {0}")]
    ConfigIncompatible(&'static str),
}

pub type DiscrResult<T> = Result<T, DiscrErr>;
