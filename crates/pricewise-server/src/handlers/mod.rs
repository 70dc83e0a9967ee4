//! Request handlers.

pub mod discount;
