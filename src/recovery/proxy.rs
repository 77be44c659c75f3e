use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin pool of proxy URLs
///
/// The index only ever moves forward, modulo the pool size, so concurrent
/// rotations each advance it exactly once.
#[derive(Debug)]
pub struct ProxyPool {
    urls: Vec<String>,
    current_index: AtomicUsize,
}

impl ProxyPool {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            current_index: AtomicUsize::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// The proxy currently in use, if the pool is not empty
    pub fn current(&self) -> Option<&str> {
        if self.urls.is_empty() {
            return None;
        }
        let index = self.current_index.load(Ordering::SeqCst) % self.urls.len();
        self.urls.get(index).map(String::as_str)
    }

    /// Advances to the next proxy and returns it
    ///
    /// Returns `None` for an empty pool.
    pub fn rotate(&self) -> Option<&str> {
        let len = self.urls.len();
        if len == 0 {
            return None;
        }

        let previous = self
            .current_index
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);

        self.urls.get((previous + 1) % len).map(String::as_str)
    }
}
