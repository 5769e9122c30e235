//! habmap Layers - Dataset scanning, document serialization, and the
//! vector layer service consumed by the HTTP surface and the CLI

pub mod registry;
pub mod scanner;
pub mod serializer;
pub mod service;

pub use registry::{BoundsSummary, LayerRegistry};
pub use scanner::DatasetScanner;
pub use serializer::{serialize_layer, DocumentMetadata, SerializedDocument};
pub use service::{ServiceStats, VectorLayerService};
