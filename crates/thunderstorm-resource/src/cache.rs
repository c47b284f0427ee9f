//! Name-keyed resource cache with idle-time eviction
//!
//! ```text
//! Live (refs > 0) --last release--> Idle (refs = 0, discard time = now)
//! Idle --add_ref--> Live
//! Idle --update(): idle > persistence--> Evicted
//! ```
//!
//! Eviction drops the cache's handle. Outside handles keep the object alive
//! but it is no longer reachable by name; the next load builds a new one.
//!
//! Entries are keyed by the name resolved against the working directory, so
//! `textures/wall.png` and `<cwd>/textures/wall.png` are the same entry and
//! a reference read back by `retrieve_reference` finds it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thunderstorm_common::{EngineContext, Result, Stream};

use crate::reference::{deserialize_instance, resolve_from_cwd};
use crate::resource::Resource;

pub struct ResourceCache<R: Resource + ?Sized = dyn Resource> {
    entries: HashMap<PathBuf, Rc<R>>,
}

impl<R: Resource + ?Sized> Default for ResourceCache<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<R: Resource + ?Sized> fmt::Debug for ResourceCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<R: Resource + ?Sized> ResourceCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached resource called `name`, if any. Does not touch the refcount.
    pub fn retrieve(&self, name: impl AsRef<Path>) -> Option<Rc<R>> {
        self.entries.get(&resolve_from_cwd(name.as_ref())).cloned()
    }

    /// Insert under the resource's own name; a previous entry of that name is
    /// replaced and returned
    pub fn cache(&mut self, resource: Rc<R>) -> Option<Rc<R>> {
        tracing::debug!("Caching {} {}", resource.kind(), resource.name().display());
        let key = resolve_from_cwd(resource.name());
        let previous = self.entries.insert(key, resource);
        if let Some(old) = &previous {
            tracing::debug!("Replaced cached {}", old.name().display());
        }
        previous
    }

    /// Cached resource with one more reference, or a fresh one from `load`.
    ///
    /// `load` is expected to hand back a resource already holding the
    /// caller's reference.
    pub fn acquire(
        &mut self,
        name: impl AsRef<Path>,
        load: impl FnOnce() -> Result<Rc<R>>,
    ) -> Result<Rc<R>> {
        if let Some(hit) = self.retrieve(&name) {
            hit.add_ref();
            return Ok(hit);
        }
        let resource = load()?;
        self.cache(Rc::clone(&resource));
        Ok(resource)
    }

    /// Read a reference from `stream` and look it up by its resolved name
    pub fn retrieve_reference<S: Stream + ?Sized>(&self, stream: &mut S) -> Result<Option<Rc<R>>> {
        let name = deserialize_instance(stream)?;
        Ok(self.retrieve(name))
    }

    /// Remove the entry called `name`. With `deallocate` the cache's handle
    /// is dropped; otherwise the detached handle is returned.
    pub fn evict(&mut self, name: impl AsRef<Path>, deallocate: bool) -> Option<Rc<R>> {
        let name = name.as_ref();
        let removed = self.entries.remove(&resolve_from_cwd(name))?;
        tracing::debug!("Evicted {}", name.display());
        if deallocate {
            None
        } else {
            Some(removed)
        }
    }

    /// Drop every entry regardless of refcount; returns how many there were
    pub fn evict_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        if count > 0 {
            tracing::debug!("Evicted all {} cached resources", count);
        }
        count
    }

    /// Evict unreferenced resources idle longer than their persistence
    /// budget. Returns the number evicted.
    pub fn update(&mut self, ctx: EngineContext<'_>) -> usize {
        let now = ctx.run_time();
        let before = self.entries.len();
        self.entries.retain(|_, resource| {
            let base = resource.base();
            if base.is_expired(now) {
                tracing::debug!(
                    "Expired {} after {:.1}s idle",
                    base.name().display(),
                    base.idle_time(now)
                );
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }

    /// With `recreate` the whole cache is dropped and reloaded lazily;
    /// otherwise each resource gets the hook.
    pub fn on_lost_device(&mut self, recreate: bool) {
        if recreate {
            let count = self.evict_all();
            tracing::info!("Device lost: flushed {} cached resources", count);
        } else {
            for resource in self.entries.values() {
                resource.on_lost_device(false);
            }
        }
    }

    pub fn on_reset_device(&mut self, recreate: bool) {
        for resource in self.entries.values() {
            resource.on_reset_device(recreate);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: impl AsRef<Path>) -> bool {
        self.entries.contains_key(&resolve_from_cwd(name.as_ref()))
    }

    /// Names as the cached resources carry them
    pub fn names(&self) -> impl Iterator<Item = &Path> {
        self.entries.values().map(|r| r.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<R>> {
        self.entries.values()
    }

    /// Sum of the cached resources' footprints
    pub fn memory_footprint(&self) -> usize {
        self.entries.values().map(|r| r.memory_footprint()).sum()
    }
}

impl<R: Resource + ?Sized> Drop for ResourceCache<R> {
    fn drop(&mut self) {
        self.evict_all();
    }
}
