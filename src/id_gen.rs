/// Rule id generator for one induction run.
///
/// Ids are handed out monotonically and never reused within a run; id 0 is
/// reserved for the top-level rule and issued first.
#[derive(Debug)]
pub(crate) struct IdGenerator {
    next: u32,
    retired: usize,
}

impl IdGenerator {
    /// Creates a new generator starting from ID 0.
    pub(crate) fn new() -> Self {
        Self {
            next: 0,
            retired: 0,
        }
    }

    /// Issues the next unused id.
    pub(crate) fn get(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Records that a rule was inlined away. Its id stays burnt.
    pub(crate) fn retire(&mut self, id: u32) {
        assert!(id < self.next, "Cannot retire ID that was never allocated");
        self.retired += 1;
    }

    /// Number of ids issued so far, including retired ones.
    pub(crate) fn issued(&self) -> u32 {
        self.next
    }

    pub(crate) fn retired(&self) -> usize {
        self.retired
    }

    /// Restarts numbering from 0.
    pub(crate) fn reset(&mut self) {
        self.next = 0;
        self.retired = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_allocation() {
        let mut gen = IdGenerator::new();
        assert_eq!(gen.get(), 0);
        assert_eq!(gen.get(), 1);
        assert_eq!(gen.get(), 2);
    }

    #[test]
    fn test_retired_ids_are_not_reused() {
        let mut gen = IdGenerator::new();
        gen.get();
        let id1 = gen.get();
        gen.get();

        gen.retire(id1);
        assert_eq!(gen.get(), 3);
        assert_eq!(gen.retired(), 1);
        assert_eq!(gen.issued(), 4);
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut gen = IdGenerator::new();
        gen.get();
        gen.get();
        gen.retire(1);
        gen.reset();
        assert_eq!(gen.get(), 0);
        assert_eq!(gen.get(), 1);
        assert_eq!(gen.retired(), 0);
    }

    #[test]
    #[should_panic(expected = "Cannot retire ID that was never allocated")]
    fn test_retire_invalid_id() {
        let mut gen = IdGenerator::new();
        gen.get();
        gen.retire(999);
    }
}
