//! ThunderStorm resources
//!
//! Reference-counted engine assets and the cache that keeps unreferenced
//! ones around for a while in case they are needed again.

pub mod cache;
pub mod reference;
pub mod resource;

pub use cache::ResourceCache;
pub use reference::{deserialize_instance, write_reference};
pub use resource::{Resource, ResourceBase};
