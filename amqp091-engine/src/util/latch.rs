//! Single assignment state cells observed by many tasks

use std::sync::Arc;

use tokio::sync::watch;

/// A cell that starts unset and is set exactly once.
///
/// Cloning a [`Latch`] gives another handle that is allowed to set the same
/// cell. Read only handles are obtained with [`Latch::view`].
#[derive(Debug, Clone)]
pub struct Latch {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl Latch {
    /// Creates an unset latch
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Sets the latch.
    ///
    /// # Panics
    ///
    /// Panics if the latch is already set
    pub fn set(&self) {
        assert!(self.try_set(), "Latch is already set");
    }

    /// Sets the latch unless it is already set. Returns `true` if this call
    /// set it.
    pub fn try_set(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Whether the latch is set
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// A read only handle to the latch
    pub fn view(&self) -> LatchView {
        LatchView {
            rx: self.tx.subscribe(),
        }
    }

    /// Waits until the latch is set
    pub async fn wait(&self) {
        // `self` keeps a sender alive, so the view cannot observe a dropped latch
        self.view().wait().await;
    }
}

/// Read only handle to a [`Latch`]
#[derive(Debug, Clone)]
pub struct LatchView {
    rx: watch::Receiver<bool>,
}

impl LatchView {
    /// Whether the latch is set
    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits until the latch is set.
    ///
    /// Returns `false` if every [`Latch`] handle was dropped before the
    /// latch got set.
    pub async fn wait(&self) -> bool {
        let mut rx = self.rx.clone();
        // The returned guard borrows `rx` and must be dropped before it
        let set = rx.wait_for(|set| *set).await.is_ok();
        set
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, task};

    use super::Latch;

    #[test]
    fn wait_resolves_after_set() {
        let latch = Latch::new();
        let view = latch.view();
        let mut wait = task::spawn(view.wait());
        assert_pending!(wait.poll());

        latch.set();
        assert!(wait.is_woken());
        assert!(assert_ready!(wait.poll()));
        assert!(view.is_set());
    }

    #[test]
    fn try_set_only_succeeds_once() {
        let latch = Latch::new();
        assert!(latch.try_set());
        assert!(!latch.try_set());
        assert!(latch.is_set());
    }

    #[test]
    #[should_panic(expected = "Latch is already set")]
    fn set_twice_panics() {
        let latch = Latch::new();
        latch.set();
        latch.set();
    }

    #[test]
    fn dropped_latch_releases_view() {
        let latch = Latch::new();
        let view = latch.view();
        drop(latch);
        let mut wait = task::spawn(view.wait());
        assert!(!assert_ready!(wait.poll()));
    }

    #[test]
    fn view_created_after_set_is_ready() {
        let latch = Latch::new();
        latch.set();
        let view = latch.view();
        let mut wait = task::spawn(view.wait());
        assert!(assert_ready!(wait.poll()));
    }
}
