pub mod drawdown;

pub use drawdown::{compute_drawdown, drawdown_series, max_drawdown, DrawdownPoint};
