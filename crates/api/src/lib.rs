pub mod artifact;
pub mod error;
pub mod layer;
pub mod view;

// Re-export commonly used types
pub use artifact::{Artifact, StaticAsset, Translation};
pub use error::{ResourceError, Result};
pub use layer::LayerLevel;
pub use view::{AppFileView, EffectiveFileView, EffectiveResourceView, View};
