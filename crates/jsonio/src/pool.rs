//! Pools that lend [`BufferRecycler`]s to individual operations.
//!
//! A pool is a cheap-to-clone handle to one of four strategies:
//!
//! | strategy | idle store | release when full |
//! |---|---|---|
//! | [`thread_local`](BufferRecyclerPool::thread_local) | one slot per thread | kept only if the slot is empty |
//! | [`bounded`](BufferRecyclerPool::bounded) | lock-free queue of fixed capacity | discarded |
//! | [`concurrent`](BufferRecyclerPool::concurrent) | unbounded lock-free queue | never full |
//! | [`non_recycling`](BufferRecyclerPool::non_recycling) | none | discarded |
//!
//! [`acquire`](BufferRecyclerPool::acquire) never blocks: it allocates a fresh
//! recycler whenever nothing is idle. The returned [`PooledRecycler`] owns the
//! recycler exclusively and gives it back to the pool that issued it when it is
//! released or dropped.

use core::{
    cell::RefCell,
    fmt,
    mem,
    ops::{Deref, DerefMut},
};
use std::sync::{Arc, LazyLock};

use crossbeam_queue::{ArrayQueue, SegQueue};
use tracing::trace;

use crate::BufferRecycler;

/// Idle capacity of [`BufferRecyclerPool::bounded_default`].
pub const DEFAULT_BOUNDED_CAPACITY: usize = 100;

thread_local! {
    static THREAD_RECYCLER: RefCell<Option<BufferRecycler>> = const { RefCell::new(None) };
}

static SHARED_THREAD_LOCAL: LazyLock<BufferRecyclerPool> =
    LazyLock::new(BufferRecyclerPool::thread_local);
static SHARED_CONCURRENT: LazyLock<BufferRecyclerPool> =
    LazyLock::new(BufferRecyclerPool::concurrent);
static SHARED_BOUNDED: LazyLock<BufferRecyclerPool> =
    LazyLock::new(BufferRecyclerPool::bounded_default);
static SHARED_NON_RECYCLING: LazyLock<BufferRecyclerPool> =
    LazyLock::new(BufferRecyclerPool::non_recycling);

/// The pooling strategy of a [`BufferRecyclerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    ThreadLocal,
    Bounded,
    Concurrent,
    NonRecycling,
}

enum IdleStore {
    ThreadLocal,
    Bounded(ArrayQueue<BufferRecycler>),
    Concurrent(SegQueue<BufferRecycler>),
    NonRecycling,
}

/// Lends [`BufferRecycler`]s to operations and takes them back.
#[derive(Clone)]
pub struct BufferRecyclerPool {
    store: Arc<IdleStore>,
}

impl Default for BufferRecyclerPool {
    /// The process-wide [`shared_concurrent`](Self::shared_concurrent) pool.
    fn default() -> Self {
        Self::shared_concurrent()
    }
}

impl fmt::Debug for BufferRecyclerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferRecyclerPool")
            .field("kind", &self.kind())
            .field("pooled", &self.pooled_count())
            .finish()
    }
}

impl BufferRecyclerPool {
    fn with_store(store: IdleStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// One recycler per thread, kept in thread-local storage.
    ///
    /// Every thread that ever acquires keeps one recycler alive until it
    /// exits. All thread-local pools share the same per-thread slot.
    #[must_use]
    pub fn thread_local() -> Self {
        Self::with_store(IdleStore::ThreadLocal)
    }

    /// At most `capacity` idle recyclers; extras are dropped on release.
    /// A zero capacity keeps nothing and yields a
    /// [`non_recycling`](Self::non_recycling) pool.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        if capacity == 0 {
            return Self::non_recycling();
        }
        Self::with_store(IdleStore::Bounded(ArrayQueue::new(capacity)))
    }

    /// [`bounded`](Self::bounded) with [`DEFAULT_BOUNDED_CAPACITY`].
    #[must_use]
    pub fn bounded_default() -> Self {
        Self::bounded(DEFAULT_BOUNDED_CAPACITY)
    }

    /// Keeps every released recycler.
    #[must_use]
    pub fn concurrent() -> Self {
        Self::with_store(IdleStore::Concurrent(SegQueue::new()))
    }

    /// Allocates on every acquire and drops on every release.
    #[must_use]
    pub fn non_recycling() -> Self {
        Self::with_store(IdleStore::NonRecycling)
    }

    #[must_use]
    pub fn shared_thread_local() -> Self {
        SHARED_THREAD_LOCAL.clone()
    }

    #[must_use]
    pub fn shared_concurrent() -> Self {
        SHARED_CONCURRENT.clone()
    }

    #[must_use]
    pub fn shared_bounded() -> Self {
        SHARED_BOUNDED.clone()
    }

    #[must_use]
    pub fn shared_non_recycling() -> Self {
        SHARED_NON_RECYCLING.clone()
    }

    #[must_use]
    pub fn kind(&self) -> PoolKind {
        match *self.store {
            IdleStore::ThreadLocal => PoolKind::ThreadLocal,
            IdleStore::Bounded(_) => PoolKind::Bounded,
            IdleStore::Concurrent(_) => PoolKind::Concurrent,
            IdleStore::NonRecycling => PoolKind::NonRecycling,
        }
    }

    /// Whether both handles refer to the same pool.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    /// Takes an idle recycler, or allocates one if none is idle.
    #[must_use]
    pub fn acquire(&self) -> PooledRecycler {
        let idle = match &*self.store {
            IdleStore::ThreadLocal => THREAD_RECYCLER
                .try_with(|slot| slot.borrow_mut().take())
                .ok()
                .flatten(),
            IdleStore::Bounded(queue) => queue.pop(),
            IdleStore::Concurrent(queue) => queue.pop(),
            IdleStore::NonRecycling => None,
        };
        let recycler = idle.unwrap_or_else(|| {
            let recycler = BufferRecycler::new();
            trace!(recycler = recycler.id(), kind = ?self.kind(), "allocated buffer recycler");
            recycler
        });
        PooledRecycler {
            recycler,
            pool: self.clone(),
            released: false,
        }
    }

    /// Gives a recycler back to this pool. Equivalent to
    /// [`PooledRecycler::release`]; a handle always returns to the pool that
    /// issued it, even if released through a different pool.
    pub fn release(&self, recycler: PooledRecycler) {
        recycler.release();
    }

    fn store_idle(&self, recycler: BufferRecycler) {
        match &*self.store {
            IdleStore::ThreadLocal => {
                // the slot is gone while the thread is being torn down
                let _ = THREAD_RECYCLER.try_with(move |slot| {
                    let mut slot = slot.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(recycler);
                    }
                });
            }
            IdleStore::Bounded(queue) => {
                if let Err(recycler) = queue.push(recycler) {
                    trace!(recycler = recycler.id(), "bounded pool full, dropping recycler");
                }
            }
            IdleStore::Concurrent(queue) => queue.push(recycler),
            IdleStore::NonRecycling => {}
        }
    }

    /// Number of idle recyclers. For thread-local pools this is the number
    /// held by the calling thread (0 or 1).
    #[must_use]
    pub fn pooled_count(&self) -> usize {
        match &*self.store {
            IdleStore::ThreadLocal => THREAD_RECYCLER
                .try_with(|slot| usize::from(slot.borrow().is_some()))
                .unwrap_or(0),
            IdleStore::Bounded(queue) => queue.len(),
            IdleStore::Concurrent(queue) => queue.len(),
            IdleStore::NonRecycling => 0,
        }
    }

    /// Drops all idle recyclers. Returns `false` for thread-local pools,
    /// whose recyclers live in other threads' storage.
    pub fn clear(&self) -> bool {
        match &*self.store {
            IdleStore::ThreadLocal => false,
            IdleStore::Bounded(queue) => {
                while queue.pop().is_some() {}
                true
            }
            IdleStore::Concurrent(queue) => {
                while queue.pop().is_some() {}
                true
            }
            IdleStore::NonRecycling => true,
        }
    }
}

/// Exclusive loan of a [`BufferRecycler`] from a [`BufferRecyclerPool`].
///
/// Dereferences to the recycler. Dropping the handle returns the recycler to
/// its pool.
pub struct PooledRecycler {
    recycler: BufferRecycler,
    pool: BufferRecyclerPool,
    released: bool,
}

impl PooledRecycler {
    /// The pool this recycler returns to.
    #[must_use]
    pub fn pool(&self) -> &BufferRecyclerPool {
        &self.pool
    }

    /// Returns the recycler to its pool.
    pub fn release(mut self) {
        self.return_to_pool();
    }

    /// Takes the recycler out of pool management; it will not be returned.
    #[must_use]
    pub fn detach(mut self) -> BufferRecycler {
        self.released = true;
        mem::replace(&mut self.recycler, BufferRecycler::vacant())
    }

    fn return_to_pool(&mut self) {
        if !mem::replace(&mut self.released, true) {
            let recycler = mem::replace(&mut self.recycler, BufferRecycler::vacant());
            self.pool.store_idle(recycler);
        }
    }
}

impl Deref for PooledRecycler {
    type Target = BufferRecycler;

    fn deref(&self) -> &BufferRecycler {
        &self.recycler
    }
}

impl DerefMut for PooledRecycler {
    fn deref_mut(&mut self) -> &mut BufferRecycler {
        &mut self.recycler
    }
}

impl Drop for PooledRecycler {
    fn drop(&mut self) {
        self.return_to_pool();
    }
}

impl fmt::Debug for PooledRecycler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledRecycler")
            .field("recycler", &self.recycler.id())
            .field("pool", &self.pool.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::thread_local(BufferRecyclerPool::thread_local(), 1)]
    #[case::bounded(BufferRecyclerPool::bounded(4), 1)]
    #[case::concurrent(BufferRecyclerPool::concurrent(), 1)]
    #[case::non_recycling(BufferRecyclerPool::non_recycling(), 0)]
    fn round_trips_keep_idle_count_bounded(
        #[case] pool: BufferRecyclerPool,
        #[case] expected_idle: usize,
    ) {
        // run on a fresh thread so the thread-local slot starts empty
        thread::spawn(move || {
            for _ in 0..50 {
                pool.acquire().release();
                assert_eq!(pool.pooled_count(), expected_idle);
            }
        })
        .join()
        .unwrap();
    }

    #[rstest]
    #[case::thread_local(BufferRecyclerPool::thread_local())]
    #[case::bounded(BufferRecyclerPool::bounded(4))]
    #[case::concurrent(BufferRecyclerPool::concurrent())]
    #[case::non_recycling(BufferRecyclerPool::non_recycling())]
    fn outstanding_recyclers_are_distinct(#[case] pool: BufferRecyclerPool) {
        let first = pool.acquire();
        let second = pool.acquire();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn recyclers_are_reused_after_release() {
        let pool = BufferRecyclerPool::concurrent();
        let id = pool.acquire().id();
        assert_eq!(pool.pooled_count(), 1);
        assert_eq!(pool.acquire().id(), id);
    }

    #[test]
    fn non_recycling_always_allocates() {
        let pool = BufferRecyclerPool::non_recycling();
        let id = pool.acquire().id();
        assert_ne!(pool.acquire().id(), id);
        assert_eq!(pool.pooled_count(), 0);
    }

    #[test]
    fn bounded_pool_discards_beyond_capacity() {
        let pool = BufferRecyclerPool::bounded(2);
        let held: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        drop(held);
        assert_eq!(pool.pooled_count(), 2);
        assert!(pool.clear());
        assert_eq!(pool.pooled_count(), 0);
    }

    #[test]
    fn zero_capacity_bounded_pool_keeps_nothing() {
        let pool = BufferRecyclerPool::bounded(0);
        assert_eq!(pool.kind(), PoolKind::NonRecycling);
        let id = pool.acquire().id();
        assert_ne!(pool.acquire().id(), id);
        assert_eq!(pool.pooled_count(), 0);
    }

    #[test]
    fn thread_local_keeps_one_per_thread() {
        thread::spawn(|| {
            let pool = BufferRecyclerPool::thread_local();
            let a = pool.acquire();
            let b = pool.acquire();
            let a_id = a.id();
            a.release();
            b.release();
            assert_eq!(pool.pooled_count(), 1);
            assert_eq!(pool.acquire().id(), a_id);
            assert!(!pool.clear());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn detached_recycler_is_not_returned() {
        let pool = BufferRecyclerPool::concurrent();
        let recycler = pool.acquire().detach();
        assert_ne!(recycler.id(), 0);
        assert_eq!(pool.pooled_count(), 0);
    }

    #[test]
    fn release_returns_to_origin_pool() {
        let origin = BufferRecyclerPool::concurrent();
        let other = BufferRecyclerPool::concurrent();
        other.release(origin.acquire());
        assert_eq!(origin.pooled_count(), 1);
        assert_eq!(other.pooled_count(), 0);
    }

    #[test]
    fn shared_pools_are_singletons() {
        assert!(BufferRecyclerPool::shared_concurrent().ptr_eq(&BufferRecyclerPool::default()));
        assert!(
            BufferRecyclerPool::shared_bounded().ptr_eq(&BufferRecyclerPool::shared_bounded())
        );
        assert!(!BufferRecyclerPool::concurrent().ptr_eq(&BufferRecyclerPool::concurrent()));
        assert_eq!(
            BufferRecyclerPool::shared_thread_local().kind(),
            PoolKind::ThreadLocal
        );
        assert_eq!(
            BufferRecyclerPool::shared_non_recycling().kind(),
            PoolKind::NonRecycling
        );
    }
}
