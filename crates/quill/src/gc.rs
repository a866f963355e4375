//! Incremental, generational garbage collection for VM objects.
//!
//! The pool exists to support hierarchies of objects that may contain loops
//! (environments referencing closures referencing environments). It works by
//! (1) explicitly tracking *roots* — entry points that must stay alive — and
//! (2) requiring that managed types can enumerate their references, so that
//! unreachable objects (including cycles) can be detected and reclaimed. In
//! the absence of cycles, objects are reclaimed as soon as the last handle
//! to them is dropped.
//!
//! Public types:
//!
//! * [`Pool`]: the container through which collection is triggered. An
//!   object's references must never cross pool boundaries.
//! * [`Ptr`]: a pointer to a managed object, for storage *inside* other
//!   managed objects. It does not keep the payload alive by itself; the
//!   owner's [`Expand`] implementation must report it.
//! * [`Root`]: keeps its object (and everything reachable from it) alive
//!   until dropped. Host-stack values should be held as roots.
//! * [`WeakPtr`]: keeps nothing alive; upgrade with [`WeakPtr::lock`] to get
//!   a [`Root`] if the object still exists.
//!
//! The only strong reference to a payload in the entire pool lives inside
//! its metadata's expansion callback. Clearing that callback is what deletes
//! the payload; everything else in the pool holds weak references. This
//! mirrors how `Ptr` instances keep the metadata (not the payload) alive:
//! when the last handle to an object disappears, the metadata is dropped and
//! the payload with it, without waiting for a collection.
//!
//! Two requirements on a managed type `T`:
//!
//! 1. Implement [`Expand`], returning the metadata of every object directly
//!    referenced by the instance.
//! 2. When a new `Ptr` is stored inside a managed object, call
//!    [`Ptr::protect`] on it. This supports incremental collection: if a
//!    collection is paused, the referenced object is queued for expansion,
//!    closing the race where ownership moves from a not-yet-expanded
//!    container into an already-expanded one and the object would otherwise
//!    be missed.

use std::{
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

/// Enumerates the GC-managed neighbours of a managed object.
///
/// Implementations must report every [`Ptr`] the object retains, directly or
/// through its fields. Failing to report a reference makes the target
/// eligible for collection while still in use, which the pool treats as a
/// fatal host error when the dangling `Ptr` is next dereferenced.
pub trait Expand {
    fn expand(&self) -> Vec<Rc<ObjectMetadata>>;
}

/// Collection state of a single object, used by the tri-colour traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectState {
    /// Reached in a previous collection, not yet re-expanded this cycle.
    Lost,
    /// Queued for expansion.
    Scheduled,
    /// Expanded; all direct neighbours have been scheduled.
    Expanded,
}

struct MetadataInner {
    /// The expansion callback doubles as the payload's owner: the `Rc` held
    /// here is the pool's only strong reference to the object. `None` means
    /// the object has been collected.
    expand: Option<Rc<dyn Expand>>,
    state: ObjectState,
}

/// Per-object metadata, allocated once per managed object.
///
/// This is type-agnostic (it cannot retrieve the contained value); it is
/// exposed so that [`Expand`] implementations can be written in terms of the
/// metadata of the `Ptr`s a type holds.
pub struct ObjectMetadata {
    pool: Weak<PoolInner>,
    inner: Mutex<MetadataInner>,
}

impl ObjectMetadata {
    /// Whether the object has not been collected yet.
    pub fn is_alive(&self) -> bool {
        lock(&self.inner).expand.is_some()
    }
}

impl fmt::Debug for ObjectMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMetadata")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Identifier for a registered root, used to record deregistration.
type RootId = u64;

struct RootEntry {
    id: RootId,
    metadata: Weak<ObjectMetadata>,
}

/// The eden area holds information about recent activity: new objects, new
/// roots, dropped roots. It is optimized to be locked only briefly, so that
/// allocation never blocks on long collection work.
struct Eden {
    objects: Vec<Weak<ObjectMetadata>>,
    roots: Vec<RootEntry>,
    dropped_roots: Vec<RootId>,
    /// Normally `None`. While a collection is paused (deadline reached with
    /// work outstanding), set to a list into which `protect` and new
    /// allocations push metadata, so the resumed collection expands them
    /// instead of freeing them prematurely.
    expand_list: Option<Vec<Rc<ObjectMetadata>>>,
    next_root_id: RootId,
}

/// Survivors hold everything that has lived through at least one eden
/// drain. Only `collect` locks this, possibly for a long interval. It must
/// never be locked while already holding the eden lock, except through the
/// brief drain step at the start of a collection.
struct Survivors {
    objects: Vec<Weak<ObjectMetadata>>,
    roots: Vec<RootEntry>,
    expand_queue: VecDeque<Rc<ObjectMetadata>>,
    in_progress: bool,
}

struct PoolInner {
    eden: Mutex<Eden>,
    survivors: Mutex<Survivors>,
}

/// Statistics from a completed full collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullCollectStats {
    /// Registered roots at sweep time.
    pub roots: usize,
    /// Objects tracked before the sweep (eden + survivors).
    pub begin_total: usize,
    /// Objects drained from the eden by this collection.
    pub eden_size: usize,
    /// Objects still alive after the sweep.
    pub end_total: usize,
}

/// Statistics from a light (eden-only) collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightCollectStats {
    pub begin_eden_size: usize,
    pub end_eden_size: usize,
}

/// Result of [`Pool::collect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutput {
    Full(FullCollectStats),
    Light(LightCollectStats),
    /// The deadline elapsed before traversal finished; the next `collect`
    /// resumes where this one stopped.
    Unfinished,
}

impl fmt::Display for FullCollectStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "full collect: {} -> {} objects ({} roots, eden {})",
            self.begin_total, self.end_total, self.roots, self.eden_size
        )
    }
}

impl fmt::Display for LightCollectStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "light collect: eden {} -> {}",
            self.begin_eden_size, self.end_eden_size
        )
    }
}

/// Eden size at which `collect` escalates from a light pass to a full one.
const FULL_COLLECT_EDEN_THRESHOLD: usize = 1024;

/// Deadline for one incremental slice of a full collection.
const INCREMENTAL_DEADLINE: Duration = Duration::from_millis(20);

/// A container for managed objects. All objects referenced from an object in
/// a pool must live in the same pool.
#[derive(Clone)]
pub struct Pool {
    inner: Rc<PoolInner>,
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("objects", &self.count_objects())
            .finish()
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

/// Recovers the guard even if a panic poisoned the mutex; the pool's
/// invariants do not depend on observing a consistent mid-operation state.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Pool {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(PoolInner {
                eden: Mutex::new(Eden {
                    objects: Vec::new(),
                    roots: Vec::new(),
                    dropped_roots: Vec::new(),
                    expand_list: None,
                    next_root_id: 0,
                }),
                survivors: Mutex::new(Survivors {
                    objects: Vec::new(),
                    roots: Vec::new(),
                    expand_queue: VecDeque::new(),
                    in_progress: false,
                }),
            }),
        }
    }

    /// Moves `value` into the pool and returns a root for it.
    pub fn new_root<T: Expand + 'static>(&self, value: T) -> Root<T> {
        let payload = Rc::new(value);
        let expand: Rc<dyn Expand> = payload.clone();
        let metadata = Rc::new(ObjectMetadata {
            pool: Rc::downgrade(&self.inner),
            inner: Mutex::new(MetadataInner {
                expand: Some(expand),
                state: ObjectState::Lost,
            }),
        });
        let id = {
            let mut eden = lock(&self.inner.eden);
            eden.objects.push(Rc::downgrade(&metadata));
            if let Some(expand_list) = &mut eden.expand_list {
                // A collection is paused; make sure the new object is
                // traversed rather than swept when it resumes.
                expand_list.push(metadata.clone());
            }
            register_root(&mut eden, &metadata)
        };
        Root {
            value: payload,
            metadata,
            registration: Rc::new(RootGuard {
                pool: Rc::downgrade(&self.inner),
                id,
            }),
        }
    }

    /// Number of objects currently tracked and alive.
    pub fn count_objects(&self) -> usize {
        let alive = |entries: &[Weak<ObjectMetadata>]| {
            entries
                .iter()
                .filter(|weak| weak.upgrade().is_some_and(|m| m.is_alive()))
                .count()
        };
        let eden_count = alive(&lock(&self.inner.eden).objects);
        eden_count + alive(&lock(&self.inner.survivors).objects)
    }

    /// Runs a collection step. Cheap eden-only cleaning most of the time; a
    /// bounded slice of a full collection when the eden has grown large or a
    /// previous slice is pending. Never blocks allocation for long.
    pub fn collect(&self) -> CollectOutput {
        let (eden_size, resuming) = {
            let eden = lock(&self.inner.eden);
            (eden.objects.len(), eden.expand_list.is_some())
        };
        if resuming || eden_size >= FULL_COLLECT_EDEN_THRESHOLD {
            self.collect_full(Some(INCREMENTAL_DEADLINE))
        } else {
            CollectOutput::Light(self.collect_light())
        }
    }

    /// Runs a full collection with no deadline: on return, every object
    /// unreachable from the root set has been freed.
    pub fn full_collect(&self) -> FullCollectStats {
        match self.collect_full(None) {
            CollectOutput::Full(stats) => stats,
            CollectOutput::Light(_) | CollectOutput::Unfinished => {
                unreachable!("full collection cannot pause")
            }
        }
    }

    /// Drops expired eden entries without touching the survivors.
    fn collect_light(&self) -> LightCollectStats {
        let mut eden = lock(&self.inner.eden);
        let begin_eden_size = eden.objects.len();
        eden.objects.retain(|weak| weak.upgrade().is_some());
        let dropped = std::mem::take(&mut eden.dropped_roots);
        let (matched, promoted): (Vec<RootId>, Vec<RootId>) = dropped
            .into_iter()
            .partition(|id| eden.roots.iter().any(|entry| entry.id == *id));
        eden.roots.retain(|entry| !matched.contains(&entry.id));
        // The rest belong to roots already promoted to the survivors; they
        // wait for the next full collection's drain.
        eden.dropped_roots = promoted;
        LightCollectStats {
            begin_eden_size,
            end_eden_size: eden.objects.len(),
        }
    }

    fn collect_full(&self, deadline: Option<Duration>) -> CollectOutput {
        let start = Instant::now();

        // Step 1: briefly lock the eden and move its contents out. While the
        // collection is active, protect/allocate feed the expand list.
        let (eden_objects, eden_roots, dropped_roots, paused_expands) = {
            let mut eden = lock(&self.inner.eden);
            let paused = eden.expand_list.take().unwrap_or_default();
            eden.expand_list = Some(Vec::new());
            (
                std::mem::take(&mut eden.objects),
                std::mem::take(&mut eden.roots),
                std::mem::take(&mut eden.dropped_roots),
                paused,
            )
        };
        let eden_size = eden_objects.len();

        let mut survivors = lock(&self.inner.survivors);
        survivors.objects.extend(eden_objects);
        survivors.roots.extend(eden_roots);
        survivors
            .roots
            .retain(|entry| !dropped_roots.contains(&entry.id));

        // Step 2: on a fresh cycle, every known object reverts to lost and
        // the roots seed the expansion queue.
        if !survivors.in_progress {
            survivors.in_progress = true;
            for weak in &survivors.objects {
                if let Some(metadata) = weak.upgrade() {
                    let mut inner = lock(&metadata.inner);
                    if inner.expand.is_some() {
                        inner.state = ObjectState::Lost;
                    }
                }
            }
        }
        let root_metadata: Vec<Rc<ObjectMetadata>> = survivors
            .roots
            .iter()
            .filter_map(|entry| entry.metadata.upgrade())
            .collect();
        for metadata in root_metadata.into_iter().chain(paused_expands) {
            schedule(&mut survivors.expand_queue, &metadata);
        }

        // Step 3: drain the queue, expanding each scheduled object and
        // scheduling its neighbours.
        let mut processed = 0usize;
        while let Some(metadata) = survivors.expand_queue.pop_front() {
            let expand = {
                let mut inner = lock(&metadata.inner);
                if inner.state != ObjectState::Scheduled {
                    continue;
                }
                inner.state = ObjectState::Expanded;
                inner.expand.clone()
            };
            if let Some(expand) = expand {
                for neighbour in expand.expand() {
                    schedule(&mut survivors.expand_queue, &neighbour);
                }
            }
            processed += 1;
            if let Some(deadline) = deadline
                && processed % 64 == 0
                && start.elapsed() >= deadline
                && !survivors.expand_queue.is_empty()
            {
                return CollectOutput::Unfinished;
            }
        }

        // Step 4: anything still lost is unreachable. Clearing its expansion
        // callback drops the pool's strong reference; the payloads are
        // destroyed only after every lock is released, since tearing an
        // object down may recursively release further handles.
        let begin_total = survivors.objects.len();
        let mut expired: Vec<Rc<dyn Expand>> = Vec::new();
        survivors.objects.retain(|weak| match weak.upgrade() {
            None => false,
            Some(metadata) => {
                let mut inner = lock(&metadata.inner);
                match inner.state {
                    ObjectState::Lost => {
                        if let Some(callback) = inner.expand.take() {
                            expired.push(callback);
                        }
                        false
                    }
                    ObjectState::Scheduled | ObjectState::Expanded => true,
                }
            }
        });
        survivors.in_progress = false;
        let stats = FullCollectStats {
            roots: survivors.roots.len(),
            begin_total,
            eden_size,
            end_total: survivors.objects.len(),
        };
        drop(survivors);
        lock(&self.inner.eden).expand_list = None;
        drop(expired);
        CollectOutput::Full(stats)
    }
}

fn schedule(queue: &mut VecDeque<Rc<ObjectMetadata>>, metadata: &Rc<ObjectMetadata>) {
    let mut inner = lock(&metadata.inner);
    if inner.state == ObjectState::Lost && inner.expand.is_some() {
        inner.state = ObjectState::Scheduled;
        drop(inner);
        queue.push_back(metadata.clone());
    }
}

fn register_root(eden: &mut Eden, metadata: &Rc<ObjectMetadata>) -> RootId {
    let id = eden.next_root_id;
    eden.next_root_id += 1;
    eden.roots.push(RootEntry {
        id,
        metadata: Rc::downgrade(metadata),
    });
    id
}

/// Deregisters the root when dropped. Shared between clones of a `Root`, so
/// an object stays rooted while any clone is alive.
struct RootGuard {
    pool: Weak<PoolInner>,
    id: RootId,
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.upgrade() {
            lock(&pool.eden).dropped_roots.push(self.id);
        }
    }
}

/// A handle that keeps its object — and everything reachable from it —
/// alive until dropped. The expected usage is that values on the host stack
/// are held as roots, while references stored inside other managed objects
/// are held as [`Ptr`] or [`WeakPtr`].
pub struct Root<T> {
    value: Rc<T>,
    metadata: Rc<ObjectMetadata>,
    registration: Rc<RootGuard>,
}

impl<T> Clone for Root<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            metadata: self.metadata.clone(),
            registration: self.registration.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Root<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Root").field(&self.value).finish()
    }
}

impl<T> Root<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn ptr(&self) -> Ptr<T> {
        Ptr {
            value: Rc::downgrade(&self.value),
            metadata: self.metadata.clone(),
        }
    }
}

/// Two roots are equal when they designate the same object.
impl<T> PartialEq for Root<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

/// A pointer to a managed object, for storage inside other managed objects.
///
/// Holding a `Ptr` keeps the object's *metadata* alive but not the object:
/// liveness is the owner's responsibility, via its [`Expand`] report. There
/// is deliberately no null `Ptr`; use `Option<Ptr<T>>` for absent values.
pub struct Ptr<T> {
    value: Weak<T>,
    metadata: Rc<ObjectMetadata>,
}

impl<T> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl<T> fmt::Debug for Ptr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ptr")
            .field("alive", &self.metadata.is_alive())
            .finish()
    }
}

impl<T> Ptr<T> {
    /// Returns the pointed-to object.
    ///
    /// # Panics
    /// Panics if the object was collected, which means an [`Expand`]
    /// implementation failed to report this reference: a fatal host error,
    /// never a script error.
    pub fn value(&self) -> Rc<T> {
        self.value
            .upgrade()
            .expect("gc: dereferenced a collected object (missing Expand report?)")
    }

    pub fn to_root(&self) -> Root<T> {
        let value = self
            .value
            .upgrade()
            .expect("gc: rooted a collected object (missing Expand report?)");
        let pool = self
            .metadata
            .pool
            .upgrade()
            .expect("gc: pool outlived by pointer");
        let id = register_root(&mut lock(&pool.eden), &self.metadata);
        Root {
            value,
            metadata: self.metadata.clone(),
            registration: Rc::new(RootGuard {
                pool: self.metadata.pool.clone(),
                id,
            }),
        }
    }

    pub fn to_weak(&self) -> WeakPtr<T> {
        WeakPtr {
            value: self.value.clone(),
            metadata: Rc::downgrade(&self.metadata),
        }
    }

    /// Exposed to allow writing [`Expand`] implementations.
    pub fn object_metadata(&self) -> Rc<ObjectMetadata> {
        self.metadata.clone()
    }

    /// The pool this object belongs to.
    pub fn pool(&self) -> Pool {
        Pool {
            inner: self
                .metadata
                .pool
                .upgrade()
                .expect("gc: pool outlived by pointer"),
        }
    }

    /// Must be called when this pointer is stored inside another managed
    /// object. If a collection is paused mid-traversal, the object is queued
    /// for expansion; otherwise this is a cheap no-op. Skipping the call can
    /// let a live object be freed when its ownership moved from a
    /// not-yet-expanded container into an already-expanded one.
    pub fn protect(&self) {
        if let Some(pool) = self.metadata.pool.upgrade()
            && let Some(expand_list) = &mut lock(&pool.eden).expand_list
        {
            expand_list.push(self.metadata.clone());
        }
    }
}

impl<T> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.value, &other.value)
    }
}

/// A handle that does not keep its object alive.
pub struct WeakPtr<T> {
    value: Weak<T>,
    metadata: Weak<ObjectMetadata>,
}

impl<T> Clone for WeakPtr<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl<T> WeakPtr<T> {
    /// Attempts to upgrade to a root; `None` if the object was collected.
    pub fn lock(&self) -> Option<Root<T>> {
        let metadata = self.metadata.upgrade()?;
        if !metadata.is_alive() {
            return None;
        }
        let value = self.value.upgrade()?;
        let pool = metadata.pool.upgrade()?;
        let id = register_root(&mut lock(&pool.eden), &metadata);
        Some(Root {
            value,
            metadata: metadata.clone(),
            registration: Rc::new(RootGuard {
                pool: metadata.pool.clone(),
                id,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// A managed node that may point at other nodes, for cycle tests.
    struct Node {
        links: RefCell<Vec<Ptr<Node>>>,
    }

    impl Node {
        fn new() -> Self {
            Self {
                links: RefCell::new(Vec::new()),
            }
        }
    }

    impl Expand for Node {
        fn expand(&self) -> Vec<Rc<ObjectMetadata>> {
            self.links
                .borrow()
                .iter()
                .map(Ptr::object_metadata)
                .collect()
        }
    }

    #[test]
    fn root_keeps_object_alive() {
        let pool = Pool::new();
        let root = pool.new_root(Node::new());
        pool.full_collect();
        assert_eq!(pool.count_objects(), 1);
        drop(root);
        pool.full_collect();
        assert_eq!(pool.count_objects(), 0);
    }

    #[test]
    fn cycle_is_collected_when_unrooted() {
        let pool = Pool::new();
        let a = pool.new_root(Node::new());
        let b = pool.new_root(Node::new());
        a.value().links.borrow_mut().push(b.ptr());
        b.value().links.borrow_mut().push(a.ptr());
        drop(b);
        pool.full_collect();
        // `b` is still reachable through `a`.
        assert_eq!(pool.count_objects(), 2);
        drop(a);
        pool.full_collect();
        assert_eq!(pool.count_objects(), 0);
    }

    #[test]
    fn weak_ptr_does_not_keep_alive() {
        let pool = Pool::new();
        let root = pool.new_root(Node::new());
        let weak = root.ptr().to_weak();
        assert!(weak.lock().is_some());
        drop(root);
        pool.full_collect();
        assert!(weak.lock().is_none());
    }

    #[test]
    fn acyclic_objects_freed_without_collection() {
        let pool = Pool::new();
        let root = pool.new_root(Node::new());
        let weak = root.ptr().to_weak();
        drop(root);
        // No collect: dropping the last handle reclaims immediately.
        assert!(weak.lock().is_none());
    }
}
