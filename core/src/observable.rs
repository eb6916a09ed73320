//! Single-writer observable values.
//!
//! [`Observable`] holds a value and notifies subscribers on every commit.
//! Subscriptions are explicit handles: [`Observable::subscribe`] returns a
//! [`Subscription`], and dropping the handle unsubscribes; there is no
//! ambient registration. Built on `tokio::sync::watch`, so each commit is a
//! single critical section and readers never block the writer for long.

use async_stream::stream;
use futures::Stream;
use thiserror::Error;
use tokio::sync::watch;

/// The observable was dropped while a subscription was waiting on it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Observable was dropped")]
pub struct SubscriptionClosed;

/// A value with exactly one writer and any number of subscribers.
///
/// # Example
///
/// ```ignore
/// let observable = Observable::new(0u32);
/// let mut subscription = observable.subscribe();
///
/// observable.update(|value| *value += 1);
/// assert_eq!(subscription.changed().await?, 1);
/// ```
pub struct Observable<T> {
    sender: watch::Sender<T>,
}

impl<T> Observable<T> {
    /// Create an observable holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Clone the current value.
    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.sender.borrow().clone()
    }

    /// Read the current value through a closure, without cloning.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.sender.borrow())
    }

    /// Commit a mutation and notify all subscribers.
    ///
    /// The closure runs inside the commit critical section: subscribers
    /// observe either the value before the closure or the value after it,
    /// never an intermediate.
    pub fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut T),
    {
        self.sender.send_modify(mutate);
    }

    /// Conditionally commit a mutation.
    ///
    /// The closure returns whether it modified the value; subscribers are
    /// only notified when it did. Like [`update`](Self::update), the
    /// closure runs inside the commit critical section, which makes this
    /// the hook for check-then-write decisions that must not interleave
    /// with other commits.
    pub fn update_if<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.sender.send_if_modified(mutate)
    }

    /// Subscribe to commits. Dropping the returned handle unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// The number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// A live view onto an [`Observable`].
///
/// Obtained from [`Observable::subscribe`]; dropping it is the unsubscribe
/// operation.
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Clone the current value without waiting.
    #[must_use]
    pub fn current(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Wait for the next commit and return the committed value.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionClosed`] if the observable was dropped.
    pub async fn changed(&mut self) -> Result<T, SubscriptionClosed> {
        self.receiver
            .changed()
            .await
            .map_err(|_| SubscriptionClosed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the value satisfies `predicate`, returning that value.
    ///
    /// The current value is checked first, so a predicate that already
    /// holds resolves immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionClosed`] if the observable was dropped before
    /// the predicate held.
    pub async fn wait_for<F>(&mut self, predicate: F) -> Result<T, SubscriptionClosed>
    where
        F: FnMut(&T) -> bool,
    {
        let value = self
            .receiver
            .wait_for(predicate)
            .await
            .map_err(|_| SubscriptionClosed)?;
        Ok((*value).clone())
    }

    /// Adapt the subscription into a stream of committed values.
    ///
    /// The stream yields values committed after this call (not the current
    /// value) and ends when the observable is dropped.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send
    where
        T: Send + Sync + 'static,
    {
        let mut subscription = self;
        stream! {
            while let Ok(value) = subscription.changed().await {
                yield value;
            }
        }
    }
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
