use thiserror::Error;

/// Failures raised inside the play lifecycle.
#[derive(Error, Debug)]
pub enum PlayError {
    #[error("play not found: {0}")]
    UnknownPlay(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("order rejected by broker for {symbol}")]
    OrderRejected { symbol: String },

    #[error("invalid quantity {0}")]
    InvalidQuantity(f64),

    #[error("invalid entry price {0} for {1}")]
    InvalidPrice(f64, String),

    #[error("order notional ${notional:.2} exceeds max_position_value ${max:.2}")]
    NotionalTooLarge { notional: f64, max: f64 },

    #[error("empty symbol")]
    EmptySymbol,
}

pub type Result<T> = std::result::Result<T, PlayError>;
