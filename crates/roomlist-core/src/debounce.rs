//! Hover-aware debouncing of room list re-sorts.

/// Delay between the pointer leaving the list and a deferred sort.
pub const DEFAULT_SORT_DELAY_MS: u64 = 700;

/// What the caller should do after a description update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDecision {
    /// Sort right away.
    Immediate,
    /// Pointer is over the list; the sort waits for it to leave.
    Deferred,
}

/// Tracks hover state and the pending deferred sort.
///
/// Time is supplied by the caller as milliseconds from any monotonic origin.
#[derive(Debug, Clone)]
pub struct SortDebouncer {
    delay_ms: u64,
    hovered: bool,
    pending: bool,
    due_at_ms: Option<u64>,
}

impl Default for SortDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SORT_DELAY_MS)
    }
}

impl SortDebouncer {
    /// Create a debouncer with the given leave delay.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            hovered: false,
            pending: false,
            due_at_ms: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Deadline of the armed deferred sort, if any.
    pub fn due_at_ms(&self) -> Option<u64> {
        self.due_at_ms
    }

    /// Record a description update and decide whether to sort now.
    pub fn on_description_updated(&mut self) -> SortDecision {
        if self.hovered {
            self.pending = true;
            SortDecision::Deferred
        } else {
            self.pending = false;
            SortDecision::Immediate
        }
    }

    /// Pointer entered the list; an armed deadline is dropped.
    pub fn pointer_entered(&mut self) {
        self.hovered = true;
        self.due_at_ms = None;
    }

    /// Pointer left the list; arms the deadline when a sort is pending.
    ///
    /// Re-arming replaces any earlier deadline.
    pub fn pointer_left(&mut self, now_ms: u64) {
        self.hovered = false;
        if self.pending {
            self.due_at_ms = Some(now_ms.saturating_add(self.delay_ms));
        }
    }

    /// Fire the deadline if reached. Returns `true` when a sort should run.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let Some(due_at_ms) = self.due_at_ms else {
            return false;
        };
        if now_ms < due_at_ms {
            return false;
        }
        self.due_at_ms = None;
        std::mem::take(&mut self.pending)
    }

    /// A sort ran through any path; nothing is pending anymore.
    pub fn mark_sorted(&mut self) {
        self.pending = false;
    }
}
