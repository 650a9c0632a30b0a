//! Propagation of surface snapshots to the form field and the preview.
//!
//! The preview updates synchronously. The field mirror is updated from a task
//! on the [`TaskQueue`], so it never changes during the event that caused the
//! capture. Each capture carries a sequence number and the mirror only accepts
//! newer ones, so it converges on the latest snapshot whatever order the
//! tasks run in.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use signet_editor_core::LiveContent;
use web_time::Instant;

use crate::preview::PreviewStore;

type Task = Box<dyn FnOnce()>;

/// Deferred zero-delay tasks, run one turn at a time.
///
/// Cloning shares the same queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task for the next turn.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run the tasks queued before this call. Tasks queued while the turn
    /// runs wait for the next turn. Returns how many tasks ran.
    pub fn run_turn(&self) -> usize {
        let batch = std::mem::take(&mut *self.tasks.borrow_mut());
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Run turns until nothing is queued.
    pub fn settle(&self) -> usize {
        let mut total = 0;
        while !self.is_idle() {
            total += self.run_turn();
        }
        total
    }
}

type Listener = Box<dyn FnMut(&str)>;

#[derive(Default)]
struct MirrorState {
    value: String,
    seq: u64,
    listener: Option<Listener>,
}

/// The form framework's copy of the content string.
///
/// Cloning shares the same cell.
#[derive(Clone, Default)]
pub struct FieldMirror {
    inner: Rc<RefCell<MirrorState>>,
}

impl std::fmt::Debug for FieldMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("FieldMirror")
            .field("value", &state.value)
            .field("seq", &state.seq)
            .finish()
    }
}

impl FieldMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> String {
        self.inner.borrow().value.clone()
    }

    /// Sequence number of the capture the mirror holds. 0 before any capture.
    pub fn seq(&self) -> u64 {
        self.inner.borrow().seq
    }

    /// Register the form's change handler. Replaces any previous one.
    pub fn on_change(&self, listener: impl FnMut(&str) + 'static) {
        self.inner.borrow_mut().listener = Some(Box::new(listener));
    }

    /// Set the value the form starts with, without notifying.
    pub(crate) fn prime(&self, value: &str) {
        let mut state = self.inner.borrow_mut();
        if state.seq == 0 {
            state.value = value.to_owned();
        }
    }

    /// Apply a capture if it is newer than the one held.
    pub(crate) fn apply(&self, seq: u64, value: &str) -> bool {
        let listener = {
            let mut state = self.inner.borrow_mut();
            if seq <= state.seq {
                return false;
            }
            state.seq = seq;
            if state.value == value {
                return true;
            }
            state.value = value.to_owned();
            state.listener.take()
        };
        // Run the listener without holding the borrow so it can read the mirror.
        if let Some(mut listener) = listener {
            listener(value);
            let mut state = self.inner.borrow_mut();
            if state.listener.is_none() {
                state.listener = Some(listener);
            }
        }
        true
    }
}

/// Delivers surface snapshots to the preview and the field mirror.
#[derive(Debug)]
pub struct CapturePipe {
    queue: TaskQueue,
    mirror: FieldMirror,
    preview: PreviewStore,
    last_seq: u64,
}

impl CapturePipe {
    pub fn new(queue: TaskQueue, mirror: FieldMirror, preview: PreviewStore) -> Self {
        Self {
            queue,
            mirror,
            preview,
            last_seq: 0,
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn mirror(&self) -> &FieldMirror {
        &self.mirror
    }

    pub fn preview(&self) -> &PreviewStore {
        &self.preview
    }

    /// Sequence number of the latest capture.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Whether a capture has not reached the mirror yet.
    pub fn is_behind(&self) -> bool {
        self.mirror.seq() < self.last_seq
    }

    /// Show the seeded content in both views without a capture cycle.
    /// Ignored once anything has been captured.
    pub fn prime(&self, markup: &str) {
        if self.last_seq > 0 {
            return;
        }
        self.preview.set(markup);
        self.mirror.prime(markup);
    }

    /// Take a snapshot of `live` and deliver it.
    pub fn capture(&mut self, live: &impl LiveContent) -> u64 {
        self.capture_markup(live.live_markup())
    }

    pub fn capture_markup(&mut self, markup: String) -> u64 {
        self.last_seq += 1;
        let seq = self.last_seq;
        let bytes = markup.len();
        self.preview.set(&markup);

        let mirror = self.mirror.clone();
        let queued_at = Instant::now();
        self.queue.defer(move || {
            let applied = mirror.apply(seq, &markup);
            tracing::trace!(
                seq,
                applied,
                latency_us = queued_at.elapsed().as_micros() as u64,
                "field mirror delivery"
            );
        });
        tracing::debug!(seq, bytes, "captured surface");
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl LiveContent for Fixed {
        fn live_markup(&self) -> String {
            self.0.to_owned()
        }
    }

    fn pipe() -> CapturePipe {
        CapturePipe::new(TaskQueue::new(), FieldMirror::new(), PreviewStore::new())
    }

    #[test]
    fn test_turn_runs_only_earlier_tasks() {
        let queue = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (q, l) = (queue.clone(), log.clone());
        queue.defer(move || {
            l.borrow_mut().push(1);
            let l = l.clone();
            q.defer(move || l.borrow_mut().push(2));
        });

        assert_eq!(queue.run_turn(), 1);
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.settle(), 1);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_preview_is_synchronous_mirror_is_deferred() {
        let mut pipe = pipe();
        pipe.capture(&Fixed("<p>a</p>"));
        assert_eq!(pipe.preview().snapshot(), "<p>a</p>");
        assert_eq!(pipe.mirror().value(), "");
        assert!(pipe.is_behind());

        pipe.queue().run_turn();
        assert_eq!(pipe.mirror().value(), "<p>a</p>");
        assert!(!pipe.is_behind());
    }

    #[test]
    fn test_stale_capture_does_not_regress_mirror() {
        let mirror = FieldMirror::new();
        assert!(mirror.apply(2, "<p>new</p>"));
        assert!(!mirror.apply(1, "<p>old</p>"));
        assert_eq!(mirror.value(), "<p>new</p>");
        assert_eq!(mirror.seq(), 2);
    }

    #[test]
    fn test_listener_sees_changes_once() {
        let mut pipe = pipe();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let mirror = pipe.mirror().clone();
        pipe.mirror().on_change(move |value| {
            assert_eq!(mirror.value(), value);
            s.borrow_mut().push(value.to_owned());
        });

        pipe.capture(&Fixed("<p>a</p>"));
        pipe.capture(&Fixed("<p>a</p>"));
        pipe.capture(&Fixed("<p>ab</p>"));
        pipe.queue().settle();

        assert_eq!(*seen.borrow(), vec!["<p>a</p>", "<p>ab</p>"]);
    }

    #[test]
    fn test_prime_only_before_first_capture() {
        let mut pipe = pipe();
        pipe.prime("<p>seed</p>");
        assert_eq!(pipe.mirror().value(), "<p>seed</p>");
        pipe.capture(&Fixed("<p>x</p>"));
        pipe.queue().settle();
        pipe.prime("<p>other</p>");
        assert_eq!(pipe.mirror().value(), "<p>x</p>");
        assert_eq!(pipe.preview().snapshot(), "<p>x</p>");
    }
}
