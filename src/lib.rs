//! Quotation documents for photography and videography bookings.
//!
//! A [`Quotation`] goes through [`RenderPipeline::run`]: line items are
//! priced, the brand watermark is loaded and tiled, the page is laid out
//! block by block and the PDF is handed to an [`ArtifactSink`].

pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod pricing;
pub mod render;
pub mod watermark;

pub use config::QuotationConfig;
pub use error::{AssetError, QuoteError, QuoteResult, ValidationError};
pub use export::{Artifact, ArtifactSink, DirectorySink, DocumentExporter};
pub use layout::{DocumentLayout, DocumentLayoutEngine, RenderBlock};
pub use model::{Category, Client, ItemSet, LineItem, Quotation, QuotationRequest};
pub use pipeline::{ExportReport, PipelineState, RenderPipeline};
pub use watermark::{WatermarkComposer, WatermarkOutcome, WatermarkSource};
