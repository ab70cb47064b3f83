use crate::context::SetStore;
use estore_proxy::StoreMap;
use std::fmt;
use tokio::sync::watch;

/// A projection of provider state that wakes only when the projected value changes.
pub struct Selection<R, F> {
    rx: watch::Receiver<StoreMap>,
    setter: SetStore,
    selector: F,
    current: R,
}

impl<R: fmt::Debug, F> fmt::Debug for Selection<R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection").field("current", &self.current).finish_non_exhaustive()
    }
}

impl<R, F> Selection<R, F>
where
    F: Fn(&StoreMap, &SetStore) -> R,
    R: PartialEq,
{
    pub(crate) fn new(mut rx: watch::Receiver<StoreMap>, setter: SetStore, selector: F) -> Self {
        let current = selector(&rx.borrow_and_update(), &setter);
        Self { rx, setter, selector, current }
    }

    /// The projection as of the last change seen.
    #[must_use]
    pub const fn get(&self) -> &R {
        &self.current
    }

    /// Waits until the state changes in a way the selector can see.
    ///
    /// Updates that leave the projection equal are skipped. Returns `None` once the
    /// provider's state can no longer change.
    pub async fn changed(&mut self) -> Option<&R> {
        loop {
            self.rx.changed().await.ok()?;
            let next = (self.selector)(&self.rx.borrow_and_update(), &self.setter);
            if next != self.current {
                self.current = next;
                return Some(&self.current);
            }
        }
    }
}
