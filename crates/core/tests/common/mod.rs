#![allow(dead_code)]

use std::sync::Arc;
use strata_core::layer::{Layer, LayerLevel, MemoryLayer};

pub fn memory(name: &str, level: LayerLevel, files: &[(&str, &str)]) -> Arc<dyn Layer> {
    let mut layer = MemoryLayer::new(name, level);
    for (path, data) in files {
        layer.insert(path, data.as_bytes());
    }
    Arc::new(layer)
}

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
pub const GIF: &[u8] = b"GIF89a\x01\0\x01\0";

pub fn image(name: &str, level: LayerLevel, files: &[(&str, &[u8])]) -> Arc<dyn Layer> {
    let mut layer = MemoryLayer::new(name, level);
    for (path, data) in files {
        layer.insert(path, *data);
    }
    Arc::new(layer)
}
