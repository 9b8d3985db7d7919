//! A generational arena - a contiguous growable array type which allows removing
//! from the middle without shifting and therefore without invalidating other indices.
//!
//! Pool is a contiguous block of memory with fixed-size entries, each entry can be
//! either vacant or occupied. When you put an object into the pool you get a handle to
//! that object. You can use that handle later on to borrow a reference to an object.
//! A handle can point to some object or be invalid, this may look similar to raw
//! pointers, but there is two major differences:
//!
//! 1) We can check if a handle is valid before accessing the object it might point to.
//! 2) We can ensure the handle we're using is still valid for the object it points to
//!    to make sure it hasn't been replaced with a different object on the same position.
//!
//! Each handle stores a special field called generation which is shared across the entry
//! and the handle, so the handle is valid only if these fields are the same on both the
//! entry and the handle. This protects from situations where you have a handle that has
//! a valid index of a record, but the payload in this record has been replaced.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
    ops::{Index, IndexMut},
};

const INVALID_GENERATION: u32 = 0;

/// Handle is some sort of non-owning reference to content in a pool. It stores
/// index of object and additional information that allows to ensure that handle
/// is still valid (points to the same object as when handle was created).
#[derive(Serialize, Deserialize)]
pub struct Handle<T> {
    /// Index of object in pool.
    index: u32,
    /// Generation number, if it is same as generation of pool record at
    /// index of handle then this is valid handle.
    generation: u32,
    /// Type holder.
    #[serde(skip)]
    type_marker: PhantomData<T>,
}

impl<T> Handle<T> {
    pub const NONE: Handle<T> = Handle {
        index: 0,
        generation: INVALID_GENERATION,
        type_marker: PhantomData,
    };

    #[inline(always)]
    pub fn new(index: u32, generation: u32) -> Self {
        Handle {
            index,
            generation,
            type_marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn is_none(self) -> bool {
        self.index == 0 && self.generation == INVALID_GENERATION
    }

    #[inline(always)]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline(always)]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline(always)]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    #[inline]
    fn clone(&self) -> Handle<T> {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Eq for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    #[inline]
    fn eq(&self, other: &Handle<T>) -> bool {
        self.generation == other.generation && self.index == other.index
    }
}

impl<T> Hash for Handle<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> PartialOrd for Handle<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index
            .cmp(&other.index)
            .then(self.generation.cmp(&other.generation))
    }
}

impl<T> Default for Handle<T> {
    #[inline]
    fn default() -> Self {
        Self::NONE
    }
}

impl<T> Debug for Handle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Idx: {}; Gen: {}]", self.index, self.generation)
    }
}

impl<T> Display for Handle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct PoolRecord<T> {
    /// Generation number, used to keep info about lifetime. The handle is valid
    /// only if record it points to is of the same generation as the pool record.
    /// Notes: Zero is unknown generation used for None handles.
    generation: u32,
    /// Actual payload.
    payload: Option<T>,
}

impl<T: Clone> Clone for PoolRecord<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            payload: self.payload.clone(),
        }
    }
}

/// Pool allows to create as many objects as you want in contiguous memory
/// block. It allows to create and delete objects much faster than if they'll
/// be allocated on heap. Also since objects stored in contiguous memory block
/// they can be effectively accessed because such memory layout is cache-friendly.
#[derive(Debug)]
pub struct Pool<T> {
    records: Vec<PoolRecord<T>>,
    free_stack: Vec<u32>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            free_stack: self.free_stack.clone(),
        }
    }
}

impl<T> Pool<T> {
    #[inline]
    pub fn new() -> Self {
        Pool {
            records: Vec::new(),
            free_stack: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: u32) -> Self {
        Pool {
            records: Vec::with_capacity(capacity as usize),
            free_stack: Vec::new(),
        }
    }

    fn records_get(&self, index: u32) -> Option<&PoolRecord<T>> {
        self.records.get(index as usize)
    }

    fn records_get_mut(&mut self, index: u32) -> Option<&mut PoolRecord<T>> {
        self.records.get_mut(index as usize)
    }

    #[inline]
    #[must_use]
    pub fn spawn(&mut self, payload: T) -> Handle<T> {
        self.spawn_with(|_| payload)
    }

    /// Construct a value with the handle it would be given.
    /// Note: Handle is _not_ valid until function has finished executing.
    #[inline]
    #[must_use]
    pub fn spawn_with<F: FnOnce(Handle<T>) -> T>(&mut self, callback: F) -> Handle<T> {
        if let Some(free_index) = self.free_stack.pop() {
            let record = self
                .records_get_mut(free_index)
                .expect("free stack contained invalid index");

            if record.payload.is_some() {
                panic!(
                    "Attempt to spawn an object at pool record with payload! Record index is {}",
                    free_index
                );
            }

            let generation = record.generation + 1;
            let handle = Handle::new(free_index, generation);

            let payload = callback(handle);

            record.generation = generation;
            record.payload = Some(payload);
            handle
        } else {
            // No free records, create new one.
            let generation = 1;

            let handle = Handle::new(self.records.len() as u32, generation);

            let payload = callback(handle);

            self.records.push(PoolRecord {
                generation,
                payload: Some(payload),
            });

            handle
        }
    }

    /// Borrows shared reference to an object by its handle.
    ///
    /// # Panics
    ///
    /// Panics if handle is out of bounds or generation of handle does not match with
    /// generation of pool record at handle index (in other words it means that object
    /// at handle's index is different than the object was there before).
    #[inline]
    #[must_use]
    pub fn borrow(&self, handle: Handle<T>) -> &T {
        if let Some(record) = self.records_get(handle.index) {
            if record.generation == handle.generation {
                if let Some(payload) = record.payload.as_ref() {
                    payload
                } else {
                    panic!("Attempt to borrow destroyed object at {:?} handle.", handle);
                }
            } else {
                panic!(
                    "Attempt to use dangling handle {:?}. Record has generation {}!",
                    handle, record.generation
                );
            }
        } else {
            panic!(
                "Attempt to borrow object using out-of-bounds handle {:?}! Record count is {}",
                handle,
                self.records.len()
            );
        }
    }

    /// Borrows mutable reference to an object by its handle.
    ///
    /// # Panics
    ///
    /// Panics if handle is out of bounds or generation of handle does not match with
    /// generation of pool record at handle index.
    #[inline]
    #[must_use]
    pub fn borrow_mut(&mut self, handle: Handle<T>) -> &mut T {
        let record_count = self.records.len();
        if let Some(record) = self.records_get_mut(handle.index) {
            if record.generation == handle.generation {
                if let Some(payload) = record.payload.as_mut() {
                    payload
                } else {
                    panic!("Attempt to borrow destroyed object at {:?} handle.", handle);
                }
            } else {
                panic!(
                    "Attempt to borrow object using dangling handle {:?}. Record has {} generation!",
                    handle, record.generation
                );
            }
        } else {
            panic!(
                "Attempt to borrow object using out-of-bounds handle {:?}! Record count is {}",
                handle, record_count
            );
        }
    }

    /// Borrows shared reference to an object by its handle.
    ///
    /// Returns None if handle is out of bounds or generation of handle does not match with
    /// generation of pool record at handle index.
    #[inline]
    #[must_use]
    pub fn try_borrow(&self, handle: Handle<T>) -> Option<&T> {
        self.records_get(handle.index).and_then(|r| {
            if r.generation == handle.generation {
                r.payload.as_ref()
            } else {
                None
            }
        })
    }

    /// Borrows mutable reference to an object by its handle.
    ///
    /// Returns None if handle is out of bounds or generation of handle does not match with
    /// generation of pool record at handle index.
    #[inline]
    #[must_use]
    pub fn try_borrow_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.records_get_mut(handle.index).and_then(|r| {
            if r.generation == handle.generation {
                r.payload.as_mut()
            } else {
                None
            }
        })
    }

    /// Moves object out of the pool using the given handle. All handles to the object
    /// will become invalid.
    ///
    /// # Panics
    ///
    /// Panics if the given handle is invalid.
    #[inline]
    pub fn free(&mut self, handle: Handle<T>) -> T {
        if let Some(record) = self.records.get_mut(handle.index as usize) {
            if record.generation == handle.generation {
                // Remember this index as free.
                self.free_stack.push(handle.index);
                if let Some(payload) = record.payload.take() {
                    payload
                } else {
                    panic!("Attempt to double free object at handle {:?}!", handle);
                }
            } else {
                panic!(
                    "Attempt to free object using dangling handle {:?}! Record generation is {}",
                    handle, record.generation
                );
            }
        } else {
            panic!(
                "Attempt to free object using out-of-bounds handle {:?}! Record count is {}",
                handle,
                self.records.len()
            );
        }
    }

    /// Tries to move object out of the pool using the given handle. Returns None if
    /// given handle is invalid. After object is moved out of the pool, all handles
    /// to the object will become invalid.
    #[inline]
    pub fn try_free(&mut self, handle: Handle<T>) -> Option<T> {
        self.records
            .get_mut(handle.index as usize)
            .and_then(|record| {
                if record.generation == handle.generation {
                    if let Some(payload) = record.payload.take() {
                        self.free_stack.push(handle.index);
                        Some(payload)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
    }

    /// Returns total capacity of pool. Capacity has nothing about real amount of
    /// objects in pool!
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.records.len() as u32
    }

    /// Destroys all objects in pool. All handles to objects will become invalid.
    #[inline]
    pub fn clear(&mut self) {
        self.records.clear();
        self.free_stack.clear();
    }

    #[inline]
    #[must_use]
    pub fn at(&self, n: u32) -> Option<&T> {
        self.records_get(n).and_then(|rec| rec.payload.as_ref())
    }

    #[inline]
    #[must_use]
    pub fn at_mut(&mut self, n: u32) -> Option<&mut T> {
        self.records_get_mut(n).and_then(|rec| rec.payload.as_mut())
    }

    #[inline]
    #[must_use]
    pub fn handle_from_index(&self, n: u32) -> Handle<T> {
        if let Some(record) = self.records_get(n) {
            if record.generation != INVALID_GENERATION && record.payload.is_some() {
                return Handle::new(n, record.generation);
            }
        }
        Handle::NONE
    }

    /// Returns the exact number of "alive" objects in the pool.
    ///
    /// It iterates through the entire pool to count the live objects so the
    /// complexity is `O(n)`.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> u32 {
        self.iter().count() as u32
    }

    /// Returns the number of allocated objects in the pool. This method is `O(1)`.
    #[inline]
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.records.len() as u32 - self.free_stack.len() as u32
    }

    /// Checks if given handle "points" to some object.
    #[inline]
    pub fn is_valid_handle(&self, handle: Handle<T>) -> bool {
        if let Some(record) = self.records_get(handle.index) {
            record.payload.is_some() && record.generation == handle.generation
        } else {
            false
        }
    }

    /// Creates new pool iterator that iterates over filled records in pool.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter().filter_map(|r| r.payload.as_ref())
    }

    /// Creates new pool iterator that iterates over filled records in pool allowing
    /// to modify record payload.
    #[must_use]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.records.iter_mut().filter_map(|r| r.payload.as_mut())
    }

    /// Creates new pair iterator that iterates over filled records using pair
    /// (handle, payload). Can be useful when there is a need to iterate over pool
    /// records and know a handle of that record.
    pub fn pair_iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.records.iter().enumerate().filter_map(|(i, r)| {
            r.payload
                .as_ref()
                .map(|payload| (Handle::new(i as u32, r.generation), payload))
        })
    }

    /// Creates new pair iterator that iterates over filled records using pair
    /// (handle, payload), allowing to modify record payload.
    pub fn pair_iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.records.iter_mut().enumerate().filter_map(|(i, r)| {
            let generation = r.generation;
            r.payload
                .as_mut()
                .map(move |payload| (Handle::new(i as u32, generation), payload))
        })
    }

    /// Retains pool records selected by `pred`. Useful when you need to remove
    /// all pool records by some criteria.
    pub fn retain<F>(&mut self, mut pred: F)
    where
        F: FnMut(&T) -> bool,
    {
        for (i, record) in self.records.iter_mut().enumerate() {
            let retain = match record.payload.as_ref() {
                Some(payload) => pred(payload),
                None => continue,
            };

            if !retain {
                record.payload.take();
                self.free_stack.push(i as u32);
            }
        }
    }
}

impl<T> Index<Handle<T>> for Pool<T> {
    type Output = T;

    fn index(&self, index: Handle<T>) -> &Self::Output {
        self.borrow(index)
    }
}

impl<T> IndexMut<Handle<T>> for Pool<T> {
    fn index_mut(&mut self, index: Handle<T>) -> &mut Self::Output {
        self.borrow_mut(index)
    }
}

#[cfg(test)]
mod test {
    use crate::pool::{Handle, Pool, INVALID_GENERATION};

    #[test]
    fn pool_sanity_tests() {
        let mut pool: Pool<String> = Pool::new();
        let foobar_handle = pool.spawn(String::from("Foobar"));

        assert_eq!(foobar_handle.index, 0);
        assert_ne!(foobar_handle.generation, INVALID_GENERATION);

        let foobar_handle_copy = foobar_handle;
        assert_eq!(foobar_handle.index, foobar_handle_copy.index);
        assert_eq!(foobar_handle.generation, foobar_handle_copy.generation);

        let baz_handle = pool.spawn(String::from("Baz"));
        assert_eq!(pool.borrow(foobar_handle), "Foobar");
        assert_eq!(pool.borrow(baz_handle), "Baz");

        pool.free(foobar_handle);
        assert!(!pool.is_valid_handle(foobar_handle_copy));
        assert!(pool.is_valid_handle(baz_handle));

        let at_foobar_index = pool.spawn(String::from("AtFoobarIndex"));
        assert_eq!(at_foobar_index.index, 0);
        assert_ne!(at_foobar_index.generation, INVALID_GENERATION);
        assert_eq!(pool.borrow(at_foobar_index), "AtFoobarIndex");
    }

    #[test]
    fn pool_iterators_skip_vacant_records() {
        let mut pool: Pool<String> = Pool::new();
        let foobar = pool.spawn(String::from("Foobar"));
        let d = pool.spawn(String::from("Foo"));
        pool.free(d);
        let baz = pool.spawn(String::from("Baz"));

        let visited: Vec<_> = pool.iter().cloned().collect();
        assert_eq!(visited, vec![String::from("Foobar"), String::from("Baz")]);

        for s in pool.iter_mut() {
            s.push('!');
        }
        assert_eq!(pool.borrow(foobar), "Foobar!");
        assert_eq!(pool.borrow(baz), "Baz!");
    }

    #[test]
    fn handle_of_freed_slot_is_stale() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(42);

        pool.free(a);

        assert!(pool.try_borrow(a).is_none());
        assert!(pool.try_borrow_mut(a).is_none());
        assert!(pool.try_free(a).is_none());
    }

    #[test]
    fn reused_slot_bumps_generation() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(42);
        pool.free(a);

        let b = pool.spawn(5);

        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(pool.try_borrow(a).is_none());
        assert_eq!(pool.try_borrow(b), Some(&5));
    }

    #[test]
    fn pool_try_borrow() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(42);
        let b = Handle::<u32>::default();

        assert_eq!(pool.try_borrow(a), Some(&42));
        assert_eq!(pool.try_borrow(b), None);
    }

    #[test]
    fn pool_spawn_with() {
        let mut pool = Pool::<(Handle<u32>, u32)>::new();
        let a = pool.spawn_with(|handle| (handle, 42));

        assert_eq!(pool.borrow(a).0, a);
        assert_eq!(pool.borrow(a).1, 42);
    }

    #[test]
    fn pool_capacity() {
        let mut pool = Pool::<u32>::new();
        let _ = pool.spawn(42);
        let _ = pool.spawn(5);

        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn pool_clear() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(42);

        pool.clear();

        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.alive_count(), 0);
        assert!(!pool.is_valid_handle(a));
    }

    #[test]
    fn pool_at() {
        let mut pool = Pool::<u32>::new();
        let _ = pool.spawn(42);

        assert_eq!(pool.at(0), Some(&42));
        assert_eq!(pool.at(1), None);
        assert_eq!(pool.at_mut(0), Some(&mut 42));
    }

    #[test]
    fn pool_handle_from_index() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(42);

        assert_eq!(pool.handle_from_index(0), a);
        assert_eq!(pool.handle_from_index(1), Handle::NONE);

        pool.free(a);
        assert_eq!(pool.handle_from_index(0), Handle::NONE);
    }

    #[test]
    fn pool_alive_and_total_count() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(42);
        let _ = pool.spawn(5);

        assert_eq!(pool.alive_count(), 2);
        assert_eq!(pool.total_count(), 2);

        pool.free(a);

        assert_eq!(pool.alive_count(), 1);
        assert_eq!(pool.total_count(), 1);
    }

    #[test]
    fn pool_retain() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(1);
        let b = pool.spawn(2);
        let c = pool.spawn(3);

        pool.retain(|v| *v % 2 != 0);

        assert!(pool.is_valid_handle(a));
        assert!(!pool.is_valid_handle(b));
        assert!(pool.is_valid_handle(c));
        assert_eq!(pool.alive_count(), 2);

        // The freed slot is reused like any other.
        let d = pool.spawn(4);
        assert_eq!(d.index(), b.index());
        assert_ne!(d.generation(), b.generation());
    }

    #[test]
    fn pool_pair_iter() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(42);
        let gap = pool.spawn(0);
        let b = pool.spawn(5);
        pool.free(gap);

        let pairs: Vec<_> = pool.pair_iter().collect();

        assert_eq!(pairs, vec![(a, &42), (b, &5)]);
    }

    #[test]
    fn index_for_pool() {
        let mut pool = Pool::<u32>::new();
        let a = pool.spawn(42);
        let b = pool.spawn(5);

        pool[a] = 15;

        assert_eq!(pool[a], 15);
        assert_eq!(pool[b], 5);
    }
}
