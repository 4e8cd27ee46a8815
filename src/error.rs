//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// Errors raised by a memoized computation are never wrapped in this type;
/// they reach the caller exactly as the computation returned them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key absent, expired, or (for stale lookups) never shadowed
    #[error("Key not found")]
    NotFound,

    /// Value is larger than the whole capacity of the store
    #[error("Value too large: size {size} exceeds capacity {capacity}")]
    TooLarge { size: usize, capacity: usize },

    /// No live entries remain
    #[error("Cache is empty")]
    Empty,
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(CacheError::NotFound.to_string(), "Key not found");
        assert_eq!(CacheError::Empty.to_string(), "Cache is empty");
        assert_eq!(
            CacheError::TooLarge {
                size: 12,
                capacity: 10
            }
            .to_string(),
            "Value too large: size 12 exceeds capacity 10"
        );
    }
}
