//! Resource contract
//!
//! A resource is a named, reference-counted engine asset (texture, material,
//! sound, ...). Dropping the last reference does not free it; it only
//! records the time, and the owning `ResourceCache` sweeps it out once it
//! has been idle longer than its persistence budget.

use std::cell::Cell;
use std::mem;
use std::path::{Path, PathBuf};

use thunderstorm_common::{EngineContext, Result, Stream};

use crate::reference;

/// Identity and bookkeeping shared by every resource
#[derive(Debug)]
pub struct ResourceBase {
    name: PathBuf,
    refs: Cell<u32>,
    discard_time: Cell<f64>,
    persistence: f64,
}

impl ResourceBase {
    /// New base holding one reference for the loader.
    ///
    /// The persistence budget comes from the options entry for `kind`.
    pub fn new(name: impl Into<PathBuf>, kind: &str, ctx: EngineContext<'_>) -> Self {
        Self {
            name: name.into(),
            refs: Cell::new(1),
            discard_time: Cell::new(ctx.run_time()),
            persistence: ctx.options.persistence_for(kind),
        }
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Rename; only possible while the resource is not shared yet
    pub fn set_name(&mut self, name: impl Into<PathBuf>) {
        self.name = name.into();
    }

    pub fn ref_count(&self) -> u32 {
        self.refs.get()
    }

    /// Run time at which the count last dropped to zero
    pub fn discard_time(&self) -> f64 {
        self.discard_time.get()
    }

    /// Seconds an unreferenced resource may stay cached
    pub fn persistence(&self) -> f64 {
        self.persistence
    }

    pub fn set_persistence(&mut self, seconds: f64) {
        self.persistence = seconds;
    }

    pub fn add_ref(&self) -> u32 {
        let refs = self.refs.get().saturating_add(1);
        self.refs.set(refs);
        refs
    }

    /// Drop one reference at run time `now`; returns the remaining count
    pub fn release(&self, now: f64) -> u32 {
        match self.refs.get() {
            0 => {
                tracing::warn!("Release of unreferenced resource {}", self.name.display());
                0
            }
            1 => {
                self.refs.set(0);
                self.discard_time.set(now);
                0
            }
            n => {
                self.refs.set(n - 1);
                n - 1
            }
        }
    }

    pub fn idle_time(&self, now: f64) -> f64 {
        now - self.discard_time.get()
    }

    /// Unreferenced and idle for longer than the persistence budget
    pub fn is_expired(&self, now: f64) -> bool {
        self.refs.get() == 0 && self.idle_time(now) > self.persistence
    }

    pub fn memory_footprint(&self) -> usize {
        mem::size_of::<Self>() + self.name.as_os_str().len()
    }
}

/// A cacheable engine asset
pub trait Resource {
    fn base(&self) -> &ResourceBase;

    /// Key for the per-kind persistence budget
    fn kind(&self) -> &'static str {
        "resource"
    }

    fn name(&self) -> &Path {
        self.base().name()
    }

    fn add_ref(&self) -> u32 {
        self.base().add_ref()
    }

    fn release(&self, ctx: EngineContext<'_>) -> u32 {
        let refs = self.base().release(ctx.run_time());
        if refs == 0 {
            self.on_unreferenced();
        }
        refs
    }

    /// Called when the last reference goes away
    fn on_unreferenced(&self) {}

    /// Approximate size in bytes, for diagnostics
    fn memory_footprint(&self) -> usize {
        self.base().memory_footprint()
    }

    fn on_lost_device(&self, _recreate: bool) {}

    fn on_reset_device(&self, _recreate: bool) {}

    /// Write a reference to this resource (its name, not its content)
    fn serialize_instance(&self, stream: &mut dyn Stream) -> Result<()> {
        reference::write_reference(stream, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thunderstorm_common::{EngineOptions, ManualClock};

    struct Texture {
        base: ResourceBase,
        pixels: Vec<u8>,
        released: Cell<bool>,
    }

    impl Resource for Texture {
        fn base(&self) -> &ResourceBase {
            &self.base
        }

        fn kind(&self) -> &'static str {
            "texture"
        }

        fn on_unreferenced(&self) {
            self.released.set(true);
        }

        fn memory_footprint(&self) -> usize {
            self.base.memory_footprint() + self.pixels.len()
        }
    }

    fn options() -> EngineOptions {
        let mut options = EngineOptions::default();
        options
            .persistence
            .per_kind
            .insert("texture".to_string(), 5.0);
        options
    }

    #[test]
    fn refcount_and_discard_time() {
        let clock = ManualClock::new(10.0);
        let options = options();
        let ctx = EngineContext::new(&clock, &options);

        let tex = Texture {
            base: ResourceBase::new("tex/wall.png", "texture", ctx),
            pixels: vec![0; 64],
            released: Cell::new(false),
        };
        assert_eq!(tex.base().ref_count(), 1);
        assert_eq!(tex.base().persistence(), 5.0);

        assert_eq!(tex.add_ref(), 2);
        clock.set(11.0);
        assert_eq!(tex.release(ctx), 1);
        assert!(!tex.released.get());
        assert_eq!(tex.base().discard_time(), 10.0);

        clock.set(12.0);
        assert_eq!(tex.release(ctx), 0);
        assert!(tex.released.get());
        assert_eq!(tex.base().discard_time(), 12.0);

        // Extra releases do not wrap or move the discard time
        clock.set(13.0);
        assert_eq!(tex.release(ctx), 0);
        assert_eq!(tex.base().discard_time(), 12.0);
    }

    #[test]
    fn expiry_needs_zero_refs_and_idle_time() {
        let clock = ManualClock::new(0.0);
        let options = options();
        let ctx = EngineContext::new(&clock, &options);
        let base = ResourceBase::new("a", "texture", ctx);

        assert!(!base.is_expired(100.0));
        base.release(1.0);
        assert!(!base.is_expired(6.0));
        assert!(base.is_expired(6.5));
    }

    #[test]
    fn default_kind_uses_default_persistence() {
        let clock = ManualClock::new(0.0);
        let options = EngineOptions::default();
        let base = ResourceBase::new("a", "sound", EngineContext::new(&clock, &options));
        assert_eq!(base.persistence(), 60.0);
    }

    #[test]
    fn footprint_includes_name_and_payload() {
        let clock = ManualClock::new(0.0);
        let options = options();
        let tex = Texture {
            base: ResourceBase::new("abcd", "texture", EngineContext::new(&clock, &options)),
            pixels: vec![0; 100],
            released: Cell::new(false),
        };
        assert_eq!(
            tex.memory_footprint(),
            mem::size_of::<ResourceBase>() + 4 + 100
        );
    }
}
