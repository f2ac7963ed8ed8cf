//! Application services and the ports they depend on.

pub mod error;
pub mod polls;
pub mod repos;
pub mod revalidation;
