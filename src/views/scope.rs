use std::sync::atomic::{AtomicU64, Ordering};

static GENERATIONS: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    GENERATIONS.fetch_add(1, Ordering::Relaxed)
}

/// Lifetime of a view's asynchronous work.
///
/// A request takes a ticket before it suspends and hands it back with its
/// result. Resetting the scope (the view was closed, or now shows something
/// else) makes every outstanding ticket stale, and stale results are dropped.
/// Generations are process-unique, so a ticket from a discarded view never
/// matches the view that replaced it.
#[derive(Debug)]
pub struct ViewScope {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeTicket(u64);

impl Default for ViewScope {
    fn default() -> Self {
        Self {
            generation: next_generation(),
        }
    }
}

impl ViewScope {
    pub fn ticket(&self) -> ScopeTicket {
        ScopeTicket(self.generation)
    }

    pub fn reset(&mut self) {
        self.generation = next_generation();
    }

    pub fn is_current(&self, ticket: ScopeTicket) -> bool {
        ticket.0 == self.generation
    }

    /// `Some(value)` only if the ticket still belongs to this scope.
    pub fn accept<T>(&self, ticket: ScopeTicket, value: T) -> Option<T> {
        self.is_current(ticket).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_invalidates_outstanding_tickets() {
        let mut scope = ViewScope::default();
        let old = scope.ticket();
        assert_eq!(scope.accept(old, 1), Some(1));
        scope.reset();
        assert_eq!(scope.accept(old, 1), None);
        assert!(scope.is_current(scope.ticket()));
    }

    #[test]
    fn test_replacement_scope_rejects_old_tickets() {
        let first = ViewScope::default();
        let ticket = first.ticket();
        let second = ViewScope::default();
        assert!(!second.is_current(ticket));
    }
}
