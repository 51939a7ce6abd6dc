//! Layered resource resolution with locale matching and a hot-reloadable
//! asset manifest.

pub mod config;
pub mod descriptors;
pub mod error;
pub mod intl;
pub mod layer;
pub mod logging;
pub mod manifest;
pub mod resource;

pub use config::{EngineConfig, ManifestConfig, ManifestMode, MatcherConfig};
pub use error::{ResourceError, Result};
pub use intl::LanguageMatcher;
pub use layer::{DirLayer, EmbeddedLayer, Layer, LayerLevel, MemoryLayer};
pub use manifest::{ManifestContext, ManifestResolver};
pub use resource::{Descriptor, Location, Manager, Registry, ResourceFile, StagedEdit, Update};
pub use strata_api::{AppFileView, Artifact, StaticAsset, Translation, View};
