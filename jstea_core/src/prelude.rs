//! Prelude.

pub use crate::results::*;

// Re-export `ahash`;
pub use ahash::AHashMap as HashMap;
pub use ahash::AHashSet as HashSet;

// Re-export `log` macros;
pub use log::{debug, error, info, trace, warn};
