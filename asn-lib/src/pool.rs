use std::sync::Mutex;

/// reset a value to a state that leaks nothing of its previous use
pub trait Recycle {
    fn recycle(&mut self);
}

/// bounded stack of reusable values
///
/// taking from an empty pool allocates a fresh value, giving to a full
/// pool drops the value. Values are recycled when given back so nothing
/// of a previous use survives in the pool.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T> Pool<T>
where
    T: Default + Recycle,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn take(&self) -> T {
        self.free
            .lock()
            .ok()
            .and_then(|mut free| free.pop())
            .unwrap_or_default()
    }

    pub fn give(&self, mut value: T) {
        value.recycle();

        if let Ok(mut free) = self.free.lock() {
            if free.len() < self.capacity {
                free.push(value);
            }
        }
    }

    /// drop every value waiting to be reused
    pub fn clear(&self) {
        if let Ok(mut free) = self.free.lock() {
            free.clear();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// number of values waiting to be reused
    pub fn len(&self) -> usize {
        self.free.lock().map(|free| free.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
