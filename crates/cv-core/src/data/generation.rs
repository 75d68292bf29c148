use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request stamp. Only the most recently issued request may write
/// its response into the dataset state.
#[derive(Debug, Default)]
pub struct RequestGeneration(AtomicU64);

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new request and return its generation
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Latest generation handed out
    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Whether `generation` is still the latest dispatched request
    pub fn is_current(&self, generation: u64) -> bool {
        self.latest() == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_is_current() {
        let generation = RequestGeneration::new();
        let first = generation.advance();
        let second = generation.advance();

        assert!(second > first);
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }
}
