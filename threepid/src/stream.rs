//! Channel-based subscription for published view states.
//!
//! A [`Subscription<T>`] yields events in publish order via an internal
//! unbounded channel. The publisher notices the subscriber is gone as soon as
//! the subscription is closed or dropped.

use std::fmt;

use tokio::sync::mpsc;

/// A live subscription backed by an internal channel.
///
/// Consume with [`recv`](Self::recv) from async code, or as an [`Iterator`]
/// from a dedicated thread (iteration blocks; never iterate inside a runtime).
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

/// Create a connected publisher / subscription pair.
pub(crate) fn channel<T>() -> (mpsc::UnboundedSender<T>, Subscription<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Subscription { rx })
}

impl<T> Subscription<T> {
    /// Wait for the next event, or `None` once the publisher is gone and the
    /// buffer is drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking receive. Returns `None` if no event is ready.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Block the current thread until the next event.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_recv(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }

    /// Unsubscribe. Already-buffered events can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Whether the subscription has been closed or the publisher dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

impl<T> Iterator for Subscription<T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("is_closed", &self.is_closed())
            .field("buffered", &self.rx.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_order_then_ends() {
        let (tx, mut sub) = channel();
        for i in 0..3 {
            tx.send(i).unwrap();
        }
        drop(tx);
        assert_eq!(sub.recv().await, Some(0));
        assert_eq!(sub.try_recv(), Some(1));
        assert_eq!(sub.recv().await, Some(2));
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn close_is_visible_to_publisher() {
        let (tx, mut sub) = channel::<u8>();
        assert!(!tx.is_closed());
        sub.close();
        assert!(tx.is_closed());
        assert!(tx.send(1).is_err());
    }

    #[test]
    fn drop_is_visible_to_publisher() {
        let (tx, sub) = channel::<u8>();
        drop(sub);
        assert!(tx.is_closed());
    }

    #[test]
    fn iterates_from_a_plain_thread() {
        let (tx, sub) = channel();
        let handle = std::thread::spawn(move || sub.collect::<Vec<u8>>());
        tx.send(7).unwrap();
        tx.send(8).unwrap();
        drop(tx);
        assert_eq!(handle.join().unwrap(), vec![7, 8]);
    }
}
