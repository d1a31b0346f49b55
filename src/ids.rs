//! Id factories injected into view builders.
//!
//! Builders never mint ids on their own; callers pass a generator so that tests
//! can use predictable sequential ids while the CLI uses random UUIDs.

pub trait ScreenIdGenerator {
    fn generate_screen_id(&mut self) -> String;
}

pub trait ElementIdGenerator {
    fn generate_element_id(&mut self) -> String;
}

/// Both generators at once, which is what the graph builder needs.
pub trait IdGenerator: ScreenIdGenerator + ElementIdGenerator {}

impl<T: ScreenIdGenerator + ElementIdGenerator> IdGenerator for T {}

/// Deterministic counters: `s0, s1, ...` for screens, `e0, e1, ...` for elements.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next_screen: usize,
    next_element: usize,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScreenIdGenerator for SequentialIds {
    fn generate_screen_id(&mut self) -> String {
        let id = format!("s{}", self.next_screen);
        self.next_screen += 1;
        id
    }
}

impl ElementIdGenerator for SequentialIds {
    fn generate_element_id(&mut self) -> String {
        let id = format!("e{}", self.next_element);
        self.next_element += 1;
        id
    }
}

/// Random v4 UUIDs. Screen ids get an `s` prefix so they stay valid Mermaid
/// node identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl ScreenIdGenerator for UuidIds {
    fn generate_screen_id(&mut self) -> String {
        format!("s{}", uuid::Uuid::new_v4().simple())
    }
}

impl ElementIdGenerator for UuidIds {
    fn generate_element_id(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sequential_ids_count_independently() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.generate_screen_id(), "s0");
        assert_eq!(ids.generate_element_id(), "e0");
        assert_eq!(ids.generate_screen_id(), "s1");
        assert_eq!(ids.generate_element_id(), "e1");
    }

    #[test]
    fn uuid_ids_are_unique() {
        let mut ids = UuidIds;
        let generated: HashSet<String> = (0..100).map(|_| ids.generate_element_id()).collect();
        assert_eq!(generated.len(), 100);
        assert!(ids.generate_screen_id().starts_with('s'));
    }
}
