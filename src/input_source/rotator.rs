//! Cyclic rotation over a snapshot of selectable sources

use std::sync::Arc;

use super::registry::{InputSourceId, InputSourceList};

/// Rotation order is exactly the snapshot order. The snapshot is taken
/// once and never mutated; a fresh rotator replaces it.
#[derive(Debug, Clone, Default)]
pub struct LayoutRotator {
    sources: Arc<InputSourceList>,
}

impl LayoutRotator {
    pub fn new(sources: InputSourceList) -> Self {
        Self {
            sources: Arc::new(sources),
        }
    }

    pub fn sources(&self) -> &[InputSourceId] {
        &self.sources
    }

    /// The source after `current`, wrapping to the first.
    ///
    /// Returns `None` with fewer than two sources or when `current` is not
    /// part of the snapshot.
    pub fn next(&self, current: &InputSourceId) -> Option<InputSourceId> {
        if self.sources.len() < 2 {
            return None;
        }
        let index = self.sources.iter().position(|id| id == current)?;
        let next = (index + 1) % self.sources.len();
        Some(self.sources[next].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotator(ids: &[&str]) -> LayoutRotator {
        LayoutRotator::new(ids.iter().map(|id| InputSourceId::new(*id)).collect())
    }

    fn id(s: &str) -> InputSourceId {
        InputSourceId::new(s)
    }

    #[test]
    fn test_three_sources() {
        let rotator = rotator(&["A", "B", "C"]);
        assert_eq!(rotator.next(&id("A")), Some(id("B")));
        assert_eq!(rotator.next(&id("B")), Some(id("C")));
        assert_eq!(rotator.next(&id("C")), Some(id("A")));
        assert_eq!(rotator.next(&id("D")), None);
    }

    #[test]
    fn test_cycle_returns_to_start() {
        for n in 2..=6 {
            let names: Vec<String> = (0..n).map(|i| format!("src{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let rotator = rotator(&refs);

            for start in &names {
                let mut current = id(start);
                for _ in 0..n {
                    current = rotator.next(&current).unwrap();
                }
                assert_eq!(current, id(start));
            }
        }
    }

    #[test]
    fn test_zero_or_one_source_is_noop() {
        assert_eq!(rotator(&[]).next(&id("A")), None);
        assert_eq!(rotator(&["A"]).next(&id("A")), None);
        assert_eq!(rotator(&["A"]).next(&id("B")), None);
    }

    #[test]
    fn test_two_sources_toggle() {
        let rotator = rotator(&["en", "ru"]);
        assert_eq!(rotator.next(&id("en")), Some(id("ru")));
        assert_eq!(rotator.next(&id("ru")), Some(id("en")));
    }
}
