//! PrintFlow Core - Custom Apparel Fulfillment
//!
//! # Guarantees
//! 1. Order status only moves forward, one step at a time
//! 2. Catalog lookups never fail; unknown names get documented defaults
//! 3. A resolvable template always yields a mockup, whatever the logo
//! 4. AI failures cascade through fallbacks; only the last one surfaces
//! 5. Artifacts are keyed by order id and overwrite on retry

pub mod ai;
pub mod artifacts;
pub mod catalog;
pub mod compositor;
pub mod config;
pub mod hashing;
pub mod label;
pub mod mockup;
pub mod models;
pub mod pipeline;
pub mod recolor;
pub mod store;
pub mod upload;
pub mod workflow;

pub use ai::{AiError, HuggingFaceGenerator, ImageGenerator};
pub use artifacts::{ArtifactStore, FsArtifactStore, StoredArtifact};
pub use catalog::{ColorTable, ProductCatalog, ProductSpec};
pub use compositor::{CompositeError, Compositor, HttpLogoFetcher, LogoFetcher};
pub use config::Config;
pub use label::{LabelAssembler, LabelError, LabelFields};
pub use mockup::{MockupError, MockupGenerator, MockupOutcome, MockupRequest, MockupStrategy};
pub use models::{Asset, NewOrder, Order, OrderId};
pub use pipeline::{FulfillmentPipeline, OrderMockup, PipelineError};
pub use store::{JsonFileStore, MemoryStore, RecordStore, StoreError};
pub use workflow::{transition, OrderStatus, WorkflowError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
