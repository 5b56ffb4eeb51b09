//! Portable, exact implementation of multi-head self-attention.
//!
//! This path favours clarity over absolute performance and keeps every
//! intermediate in the input dtype.

pub mod exact;

pub use exact::ExactAttention;
