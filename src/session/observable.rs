// Minimal observable value with snapshot semantics

use tokio::sync::watch;

/// Holds the latest value and notifies subscribers on every change.
///
/// Subscribers always see the most recent snapshot; intermediate values may
/// be skipped by slow readers.
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Copy of the current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate in place and return whatever the closure computes
    pub fn update<R: Default>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut out = R::default();
        self.tx.send_modify(|value| out = f(value));
        out
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_latest_snapshot() {
        let observable = Observable::new(0u32);
        let mut rx = observable.subscribe();

        observable.set(1);
        let doubled = observable.update(|v| {
            *v += 1;
            *v * 2
        });
        assert_eq!(doubled, 4);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 2);
        assert_eq!(observable.get(), 2);
    }
}
