//! Offset/max-count windows for list operations

use serde::{Deserialize, Serialize};

use crate::error::{Result, TkoError};

/// Entries returned when the caller asks for zero
pub const DEFAULT_MAX_COUNT: i64 = 100;

/// Hard ceiling on a single list call
pub const MAX_MAX_COUNT: i64 = 1000;

/// Slice of a sorted listing
///
/// `max_count` of zero means "default", a negative value means "as many as
/// allowed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub offset: usize,
    pub max_count: i64,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            offset: 0,
            max_count: DEFAULT_MAX_COUNT,
        }
    }
}

impl Window {
    pub fn new(offset: usize, max_count: i64) -> Self {
        Self { offset, max_count }
    }

    /// Window asking for everything the backend allows
    pub fn unbounded() -> Self {
        Self::new(0, -1)
    }

    /// Clamps the window to the backend's limits
    ///
    /// Zero becomes the default, negative becomes the ceiling, anything above
    /// the ceiling is rejected.
    pub fn validate(self) -> Result<Self> {
        let max_count = match self.max_count {
            count if count > MAX_MAX_COUNT => {
                return Err(TkoError::bad_argument(format!(
                    "window max count is too large: {} > {}",
                    count, MAX_MAX_COUNT
                )));
            }
            0 => DEFAULT_MAX_COUNT,
            count if count < 0 => MAX_MAX_COUNT,
            count => count,
        };
        Ok(Self::new(self.offset, max_count))
    }

    /// Maximum entries, `None` when unbounded
    pub fn limit(&self) -> Option<usize> {
        match self.max_count {
            0 => Some(DEFAULT_MAX_COUNT as usize),
            count if count < 0 => None,
            count => Some(count as usize),
        }
    }

    /// Applies the window to an already sorted listing
    pub fn apply<T>(&self, entries: Vec<T>) -> Vec<T> {
        let entries = entries.into_iter().skip(self.offset);
        match self.limit() {
            Some(limit) => entries.take(limit).collect(),
            None => entries.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_zero_is_default() {
        let window = Window::new(0, 0).validate().unwrap();
        assert_eq!(window.max_count, DEFAULT_MAX_COUNT);
    }

    #[test]
    fn test_validate_rejects_above_ceiling() {
        let err = Window::new(0, MAX_MAX_COUNT + 1).validate().unwrap_err();
        assert!(err.is_bad_argument());
        assert!(Window::new(0, MAX_MAX_COUNT).validate().is_ok());
    }

    #[test]
    fn test_validate_caps_unbounded() {
        let window = Window::unbounded().validate().unwrap();
        assert_eq!(window.max_count, MAX_MAX_COUNT);
    }

    #[test]
    fn test_apply() {
        let entries: Vec<u32> = (0..10).collect();
        assert_eq!(Window::new(2, 3).apply(entries.clone()), vec![2, 3, 4]);
        assert_eq!(Window::new(8, 5).apply(entries.clone()), vec![8, 9]);
        assert_eq!(Window::unbounded().apply(entries.clone()).len(), 10);
        assert!(Window::new(20, 5).apply(entries).is_empty());
    }

    #[test]
    fn test_apply_zero_uses_default() {
        let entries: Vec<u32> = (0..150).collect();
        assert_eq!(Window::new(0, 0).apply(entries).len(), DEFAULT_MAX_COUNT as usize);
    }
}
