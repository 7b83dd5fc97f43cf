//! Bounded object pool with oldest-active eviction.
//!
//! Entities are created lazily up to `capacity` and are never dropped
//! individually. Every created entity sits in exactly one of two queues:
//! `free` (FIFO) or `active` (insertion order = age order). When both the free
//! queue is empty and the cap is reached, `acquire` recycles the entity that has
//! been active the longest.

use std::collections::VecDeque;

use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

/// Something the pool can hand out repeatedly.
pub trait Poolable {
    /// Return to the state of a freshly constructed entity.
    fn reset(&mut self);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,
    #[error("pool is full and has no active entity to recycle")]
    Exhausted,
}

/// Reference to one life of a pooled entity.
///
/// `generation` changes on every acquisition, so a handle kept past its
/// entity's release no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Handle {
    slot: u32,
    generation: u32,
}

impl Handle {
    pub fn slot(self) -> usize {
        self.slot as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired {
    pub handle: Handle,
    /// The entity recycled to satisfy this request, if the pool was saturated.
    pub evicted: Option<Handle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub free: usize,
    pub active: usize,
    pub total_created: usize,
    pub capacity: usize,
}

struct Slot<T> {
    item: T,
    generation: u32,
    active: bool,
}

pub struct Pool<T> {
    capacity: usize,
    slots: Vec<Slot<T>>,
    free: VecDeque<usize>,
    active: VecDeque<usize>,
    factory: Box<dyn FnMut() -> T>,
    // Generation new slots start from. Raised by `clear` so handles from
    // before the clear never resolve again.
    generation_floor: u32,
}

impl<T: Poolable> Pool<T> {
    pub fn new(capacity: usize, factory: impl FnMut() -> T + 'static) -> Result<Self, PoolError> {
        if capacity < 1 {
            return Err(PoolError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            slots: Vec::with_capacity(capacity),
            free: VecDeque::with_capacity(capacity),
            active: VecDeque::with_capacity(capacity),
            factory: Box::new(factory),
            generation_floor: 0,
        })
    }

    /// Pre-create up to `count` entities into the free queue.
    pub fn with_prewarm(mut self, count: usize) -> Self {
        let target = count.min(self.capacity);
        while self.slots.len() < target {
            let slot = self.create();
            self.free.push_back(slot);
        }
        debug!("pool prewarmed with {} entities", self.slots.len());
        self
    }

    fn create(&mut self) -> usize {
        let item = (self.factory)();
        self.slots.push(Slot {
            item,
            generation: self.generation_floor,
            active: false,
        });
        self.slots.len() - 1
    }

    pub fn acquire(&mut self) -> Result<Acquired, PoolError> {
        let mut evicted = None;
        let slot = if let Some(slot) = self.free.pop_front() {
            slot
        } else if self.slots.len() < self.capacity {
            let slot = self.create();
            debug!("pool grew to {} of {}", self.slots.len(), self.capacity);
            slot
        } else {
            let oldest = *self.active.front().ok_or(PoolError::Exhausted)?;
            let handle = self.handle_of(oldest);
            warn!("pool exhausted, recycling oldest active entity in slot {oldest}");
            self.release(handle);
            evicted = Some(handle);
            self.free.pop_front().ok_or(PoolError::Exhausted)?
        };

        let entry = &mut self.slots[slot];
        entry.generation = entry.generation.wrapping_add(1);
        entry.active = true;
        self.active.push_back(slot);

        Ok(Acquired {
            handle: self.handle_of(slot),
            evicted,
        })
    }

    /// Return an entity to the free queue. Stale or already-free handles are
    /// ignored; the return value says whether anything moved.
    pub fn release(&mut self, handle: Handle) -> bool {
        if !self.is_active(handle) {
            return false;
        }
        let slot = handle.slot();
        if let Some(position) = self.active.iter().position(|&s| s == slot) {
            self.active.remove(position);
        }
        let entry = &mut self.slots[slot];
        entry.active = false;
        entry.item.reset();
        self.free.push_back(slot);
        true
    }

    /// Release every active entity, oldest first, returning their handles.
    pub fn release_all(&mut self) -> Vec<Handle> {
        let handles = self.active_handles();
        for handle in &handles {
            self.release(*handle);
        }
        handles
    }

    /// Release everything, then drop every pooled entity.
    pub fn clear(&mut self) {
        self.release_all();
        self.generation_floor = self
            .slots
            .iter()
            .map(|s| s.generation)
            .fold(self.generation_floor, u32::max);
        self.free.clear();
        self.slots.clear();
        debug!("pool cleared");
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.slot())
            .is_some_and(|s| s.active && s.generation == handle.generation)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.slot())
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &s.item)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.slot())
            .filter(|s| s.active && s.generation == handle.generation)
            .map(|s| &mut s.item)
    }

    /// Active handles in age order, oldest first
    pub fn active_handles(&self) -> Vec<Handle> {
        self.active.iter().map(|&slot| self.handle_of(slot)).collect()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.active
            .iter()
            .map(move |&slot| (self.handle_of(slot), &self.slots[slot].item))
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            free: self.free.len(),
            active: self.active.len(),
            total_created: self.slots.len(),
            capacity: self.capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn handle_of(&self, slot: usize) -> Handle {
        Handle {
            slot: slot as u32,
            generation: self.slots[slot].generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Token {
        touched: bool,
    }

    impl Poolable for Token {
        fn reset(&mut self) {
            self.touched = false;
        }
    }

    fn pool(capacity: usize) -> Pool<Token> {
        Pool::new(capacity, Token::default).unwrap()
    }

    fn assert_bookkeeping(pool: &Pool<Token>) {
        let stats = pool.stats();
        assert_eq!(stats.free + stats.active, stats.total_created);
        assert!(stats.total_created <= stats.capacity);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            Pool::new(0, Token::default).err(),
            Some(PoolError::ZeroCapacity)
        );
    }

    #[test]
    fn grows_lazily_up_to_capacity() {
        let mut pool = pool(3);
        assert_eq!(pool.stats().total_created, 0);
        pool.acquire().unwrap();
        pool.acquire().unwrap();
        assert_eq!(pool.stats().total_created, 2);
        assert_eq!(pool.stats().active, 2);
        assert_bookkeeping(&pool);
    }

    #[test]
    fn prewarm_never_exceeds_capacity() {
        let pool = pool(4).with_prewarm(10);
        assert_eq!(pool.stats().free, 4);
        assert_eq!(pool.stats().total_created, 4);
    }

    #[test]
    fn free_queue_is_fifo() {
        let mut pool = pool(3);
        let a = pool.acquire().unwrap().handle;
        let b = pool.acquire().unwrap().handle;
        pool.release(b);
        pool.release(a);
        assert_eq!(pool.acquire().unwrap().handle.slot(), b.slot());
        assert_eq!(pool.acquire().unwrap().handle.slot(), a.slot());
    }

    #[test]
    fn saturation_evicts_oldest_active() {
        let mut pool = pool(2);
        let a = pool.acquire().unwrap().handle;
        let b = pool.acquire().unwrap().handle;

        let c = pool.acquire().unwrap();
        assert_eq!(c.handle.slot(), a.slot());
        assert_eq!(c.evicted, Some(a));
        assert!(!pool.is_active(a));
        assert!(pool.is_active(b));
        assert!(pool.is_active(c.handle));
        assert_eq!(pool.active_handles(), vec![b, c.handle]);
        assert_bookkeeping(&pool);
    }

    #[test]
    fn release_is_idempotent() {
        let mut pool = pool(2);
        let a = pool.acquire().unwrap().handle;
        assert!(pool.release(a));
        let free = pool.stats().free;
        assert!(!pool.release(a));
        assert_eq!(pool.stats().free, free);
        assert_bookkeeping(&pool);
    }

    #[test]
    fn stale_handle_cannot_release_new_life() {
        let mut pool = pool(1);
        let first = pool.acquire().unwrap().handle;
        pool.release(first);
        let second = pool.acquire().unwrap().handle;
        assert_eq!(first.slot(), second.slot());
        assert!(!pool.release(first));
        assert!(pool.is_active(second));
    }

    #[test]
    fn release_resets_entity() {
        let mut pool = pool(1);
        let a = pool.acquire().unwrap().handle;
        pool.get_mut(a).unwrap().touched = true;
        pool.release(a);
        let b = pool.acquire().unwrap().handle;
        assert!(!pool.get(b).unwrap().touched);
    }

    #[test]
    fn release_all_goes_oldest_first() {
        let mut pool = pool(3);
        let a = pool.acquire().unwrap().handle;
        let b = pool.acquire().unwrap().handle;
        let c = pool.acquire().unwrap().handle;
        assert_eq!(pool.release_all(), vec![a, b, c]);
        assert_eq!(pool.stats().active, 0);
        assert_eq!(pool.stats().free, 3);
    }

    #[test]
    fn clear_drops_everything() {
        let mut pool = pool(3).with_prewarm(2);
        pool.acquire().unwrap();
        pool.clear();
        let stats = pool.stats();
        assert_eq!((stats.free, stats.active, stats.total_created), (0, 0, 0));
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn clear_invalidates_outstanding_handles() {
        let mut pool = pool(2);
        let a = pool.acquire().unwrap().handle;
        pool.clear();

        let b = pool.acquire().unwrap().handle;
        assert_eq!(b.slot(), a.slot());
        assert_ne!(b, a);
        assert!(!pool.is_active(a));
        assert!(pool.get(a).is_none());
        assert!(!pool.release(a));
        assert!(pool.is_active(b));
    }

    #[test]
    fn bookkeeping_holds_over_mixed_sequence() {
        let mut pool = pool(3);
        let mut held = Vec::new();
        for step in 0..40 {
            if step % 3 == 2 {
                if let Some(handle) = held.pop() {
                    pool.release(handle);
                }
            } else {
                held.push(pool.acquire().unwrap().handle);
            }
            assert_bookkeeping(&pool);
        }
    }
}
