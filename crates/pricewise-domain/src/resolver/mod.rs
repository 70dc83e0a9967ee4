//! Price resolution against discount policies.
//!
//! The calculator is pure; the repository trait is the seam to the policy
//! system of record.

pub mod calculator;
mod config;
mod traits;

pub use calculator::{resolve_price, PriceQuote, NO_DISCOUNT_SHARE_RATIO};
pub use config::ResolutionConfig;
pub use traits::PolicyRepository;
