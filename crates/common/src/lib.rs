//! Shared types for the cubecam workspace: transforms and linear colors.

mod types;

pub use types::{Color, Transform};
