//! Common utilities and types shared across ThunderStorm crates
//!
//! - `error`  : engine-wide error taxonomy
//! - `stream` : file / memory byte streams and the whole-file stream cache
//! - `clock`  : engine run-time clock and the explicit engine context
//! - `config` : engine options (TOML)

pub mod clock;
pub mod config;
pub mod error;
pub mod stream;

pub use clock::{EngineClock, EngineContext, ManualClock, RunTime};
pub use config::{EngineOptions, PersistenceOptions};
pub use error::{Error, ErrorKind, Result};
pub use stream::{Access, Disposition, FileStream, MemoryStream, Origin, Stream, StreamCache};
