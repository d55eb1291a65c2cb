//! Utility functions and helpers.

pub mod centroids;
pub mod de;
pub mod http;
