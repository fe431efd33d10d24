//! Per-type free-list object recycling for Lockrelay.
//!
//! The server allocates the same handful of types over and over — frames,
//! input sets, rooms, sessions — once per tick or once per connection.
//! Instead of paying for a fresh allocation each time, released instances
//! are parked on a per-type free list and handed back out on the next
//! acquire.
//!
//! # Key types
//!
//! - [`Recycle`] — the trait pooled types implement (reset to default state)
//! - [`Pool`] — a free list for one concrete type, cheap to clone and share
//! - [`PoolSet`] — a registry of lazily-created pools keyed by type
//!
//! # Safety model
//!
//! `release` takes the object **by value**, so a double release or a
//! use-after-release is a compile error, not a runtime defect. There is no
//! eviction policy: pools grow to the high-water mark of concurrent use and
//! stay there, trading memory for zero steady-state allocation.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A type that can be parked on a free list and handed out again.
///
/// `recycle` must restore the instance to its zero/default state — any
/// field still carrying data from the previous use is a leak into the
/// next acquirer.
pub trait Recycle {
    /// Resets the instance to a reusable default state.
    fn recycle(&mut self);
}

/// A free list for a single concrete type.
///
/// Cloning a `Pool` clones the handle, not the list — all clones share one
/// free list. Acquire and release are safe from any thread: the transport
/// I/O task releases sessions on disconnect while the control loop acquires
/// frames, and both go through the same mutex-guarded list.
pub struct Pool<T> {
    free: Arc<Mutex<Vec<T>>>,
}

impl<T> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("ty", &type_name::<T>())
            .field("idle", &self.idle())
            .finish()
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            free: Arc::clone(&self.free),
        }
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            free: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of instances currently parked on the free list.
    pub fn idle(&self) -> usize {
        self.free.lock().map(|free| free.len()).unwrap_or(0)
    }
}

impl<T: Recycle + Default> Pool<T> {
    /// Returns a recycled instance if one is available, otherwise a
    /// freshly constructed default.
    pub fn acquire(&self) -> T {
        let recycled = self.free.lock().ok().and_then(|mut free| free.pop());
        match recycled {
            Some(obj) => obj,
            None => {
                tracing::trace!(ty = type_name::<T>(), "pool miss, constructing");
                T::default()
            }
        }
    }

    /// Resets `obj` and parks it on the free list.
    ///
    /// Taking `obj` by value is the whole contract: once released, the
    /// caller cannot touch the instance again until `acquire` returns it.
    pub fn release(&self, mut obj: T) {
        obj.recycle();
        if let Ok(mut free) = self.free.lock() {
            free.push(obj);
        }
    }
}

/// A registry of per-type pools, created lazily on first use.
///
/// Mirrors a heterogeneous allocator surface: any `Recycle + Default` type
/// gets its own independent free list, looked up by `TypeId`. Lookup and
/// creation are safe for concurrent callers.
#[derive(Default)]
pub struct PoolSet {
    pools: Mutex<HashMap<TypeId, Box<dyn Any + Send>>>,
}

impl PoolSet {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pool for `T`, creating it on first request.
    pub fn pool<T: Recycle + Default + Send + 'static>(&self) -> Pool<T> {
        let mut pools = match self.pools.lock() {
            Ok(guard) => guard,
            // A poisoned registry just means some holder panicked mid-insert;
            // hand out a detached pool rather than propagate the panic.
            Err(_) => return Pool::new(),
        };
        let entry = pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Pool::<T>::new()));
        entry
            .downcast_ref::<Pool<T>>()
            .cloned()
            .unwrap_or_default()
    }

    /// Acquires an instance of `T` from its per-type pool.
    pub fn acquire<T: Recycle + Default + Send + 'static>(&self) -> T {
        self.pool::<T>().acquire()
    }

    /// Releases an instance of `T` back to its per-type pool.
    pub fn release<T: Recycle + Default + Send + 'static>(&self, obj: T) {
        self.pool::<T>().release(obj);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Buffer {
        data: Vec<u8>,
        dirty: bool,
    }

    impl Recycle for Buffer {
        fn recycle(&mut self) {
            self.data.clear();
            self.dirty = false;
        }
    }

    #[test]
    fn test_acquire_empty_pool_constructs_default() {
        let pool = Pool::<Buffer>::new();
        let buf = pool.acquire();
        assert!(buf.data.is_empty());
        assert!(!buf.dirty);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_release_then_acquire_returns_reset_instance() {
        let pool = Pool::<Buffer>::new();
        let mut buf = pool.acquire();
        buf.data.extend_from_slice(b"leftover");
        buf.dirty = true;

        pool.release(buf);
        assert_eq!(pool.idle(), 1);

        // The recycled instance must carry nothing from its prior use.
        let buf = pool.acquire();
        assert!(buf.data.is_empty());
        assert!(!buf.dirty);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_release_preserves_capacity() {
        // The point of pooling: the backing allocation survives recycling.
        let pool = Pool::<Buffer>::new();
        let mut buf = pool.acquire();
        buf.data.reserve(4096);
        let cap = buf.data.capacity();

        pool.release(buf);
        let buf = pool.acquire();
        assert!(buf.data.capacity() >= cap);
    }

    #[test]
    fn test_cloned_pool_shares_free_list() {
        let pool = Pool::<Buffer>::new();
        let handle = pool.clone();

        handle.release(Buffer::default());
        assert_eq!(pool.idle(), 1);

        let _ = pool.acquire();
        assert_eq!(handle.idle(), 0);
    }

    #[test]
    fn test_pool_set_same_type_shares_pool() {
        let set = PoolSet::new();
        set.release(Buffer::default());
        assert_eq!(set.pool::<Buffer>().idle(), 1);

        let _ = set.acquire::<Buffer>();
        assert_eq!(set.pool::<Buffer>().idle(), 0);
    }

    #[test]
    fn test_pool_set_types_are_independent() {
        #[derive(Default)]
        struct Other(u32);
        impl Recycle for Other {
            fn recycle(&mut self) {
                self.0 = 0;
            }
        }

        let set = PoolSet::new();
        set.release(Buffer::default());
        set.release(Other(7));

        assert_eq!(set.pool::<Buffer>().idle(), 1);
        assert_eq!(set.pool::<Other>().idle(), 1);

        let other = set.acquire::<Other>();
        assert_eq!(other.0, 0, "recycled instance must be reset");
        assert_eq!(set.pool::<Buffer>().idle(), 1);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        use std::thread;

        let pool = Pool::<Buffer>::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = pool.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..500 {
                    let mut buf = pool.acquire();
                    buf.data.push(1);
                    pool.release(buf);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every parked instance must have been reset on release.
        while pool.idle() > 0 {
            assert!(pool.acquire().data.is_empty());
        }
    }
}
