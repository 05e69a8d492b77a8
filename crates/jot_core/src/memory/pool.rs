//! # Object Pool
//!
//! Free-list of reusable objects for hot paths that would otherwise allocate
//! per operation (wire cursors, sessions).

use std::cell::{Cell, RefCell};
use std::ops::{Deref, DerefMut};

/// An object with an explicit activation lifecycle.
///
/// Pool-owned objects are constructed once by the pool's factory and then
/// recycled: [`enable`](Poolable::enable) runs on every retrieval,
/// [`disable`](Poolable::disable) on every release.
pub trait Poolable {
    /// Activation arguments passed through [`ObjectPool::retrieve`].
    type Args<'a>;

    /// Prepares a recycled (or freshly built) instance for use.
    fn enable(&mut self, args: Self::Args<'_>);

    /// Drops per-activation state before the instance returns to the pool.
    fn disable(&mut self);
}

/// A growable pool of independently constructed [`Poolable`] objects.
///
/// Retrieval moves an instance out of the free list, so two retrievals
/// without an intervening release can never hand out the same object.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe (`RefCell` inside, `!Sync`). Use one pool per
/// event loop.
///
/// # Example
///
/// ```rust,ignore
/// let pool = ObjectPool::new(Writer::new, 25);
///
/// let writer = pool.retrieve(());   // pops or builds, then enable()
/// pool.release(writer);             // disable(), then push
/// assert_eq!(pool.available(), 25);
/// ```
pub struct ObjectPool<T> {
    /// Builds a new instance when the free list runs dry.
    factory: Box<dyn Fn() -> T>,
    /// Instances ready for retrieval.
    free_list: RefCell<Vec<T>>,
    /// Total instances ever constructed by this pool.
    created: Cell<usize>,
}

impl<T: Poolable> ObjectPool<T> {
    /// Creates a pool pre-filled with `size` instances.
    ///
    /// Every slot is a separate `factory()` call; slots never share state.
    ///
    /// # Arguments
    ///
    /// * `factory` - Constructor for new instances
    /// * `size` - Number of instances to preload
    pub fn new<F>(factory: F, size: usize) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let free_list: Vec<T> = (0..size).map(|_| factory()).collect();

        Self {
            factory: Box::new(factory),
            free_list: RefCell::new(free_list),
            created: Cell::new(size),
        }
    }

    /// Number of instances currently waiting in the free list.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.free_list.borrow().len()
    }

    /// Total number of instances this pool has constructed.
    #[inline]
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.get()
    }

    /// Takes an instance out of the pool and enables it.
    ///
    /// The pool grows by one factory call when the free list is empty.
    pub fn retrieve(&self, args: T::Args<'_>) -> T {
        let recycled = self.free_list.borrow_mut().pop();

        let mut instance = recycled.unwrap_or_else(|| {
            self.created.set(self.created.get() + 1);
            tracing::debug!(created = self.created.get(), "object pool grew");
            (self.factory)()
        });

        instance.enable(args);
        instance
    }

    /// Disables an instance and returns it to the free list.
    pub fn release(&self, mut instance: T) {
        instance.disable();
        self.free_list.borrow_mut().push(instance);
    }

    /// Retrieves an instance wrapped in a guard that releases it on drop.
    pub fn acquire(&self, args: T::Args<'_>) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            instance: Some(self.retrieve(args)),
        }
    }
}

/// Scoped handle to a retrieved instance; releases it when dropped.
pub struct Pooled<'p, T: Poolable> {
    pool: &'p ObjectPool<T>,
    instance: Option<T>,
}

impl<T: Poolable> Pooled<'_, T> {
    /// Detaches the instance from the guard. It will not be released.
    #[must_use]
    pub fn into_inner(mut self) -> T {
        self.instance
            .take()
            .unwrap_or_else(|| unreachable!("pooled instance is present until drop"))
    }
}

impl<T: Poolable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.instance
            .as_ref()
            .unwrap_or_else(|| unreachable!("pooled instance is present until drop"))
    }
}

impl<T: Poolable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.instance
            .as_mut()
            .unwrap_or_else(|| unreachable!("pooled instance is present until drop"))
    }
}

impl<T: Poolable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.pool.release(instance);
        }
    }
}
