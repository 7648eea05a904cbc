// One quotation run: price, load watermark, lay out, export.
//
// The run is a single async function with one await (the asset load) and
// one export call site, so every trigger that passes the gate ends in
// exactly one emit, whichever way the watermark goes.

use crate::config::QuotationConfig;
use crate::error::{QuoteError, QuoteResult};
use crate::export::{ArtifactSink, DocumentExporter};
use crate::layout::DocumentLayoutEngine;
use crate::model::Quotation;
use crate::pricing;
use crate::render;
use crate::watermark::{WatermarkComposer, WatermarkOutcome, WatermarkSource};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    AssetLoading,
    WatermarkReady,
    WatermarkUnavailable,
    LayoutFinalizing,
    Exported,
}

/// What one completed run produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: usize,
    pub total_amount: u64,
    pub watermark_applied: bool,
    /// Every state the run passed through, in order
    pub states: Vec<PipelineState>,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Transitions(Vec<PipelineState>);

impl Transitions {
    fn start() -> Self {
        Self(vec![PipelineState::Idle])
    }

    fn enter(&mut self, next: PipelineState) {
        debug!(from = ?self.current(), to = ?next, "pipeline transition");
        self.0.push(next);
    }

    fn current(&self) -> PipelineState {
        self.0.last().copied().unwrap_or(PipelineState::Idle)
    }
}

pub struct RenderPipeline {
    config: QuotationConfig,
    composer: WatermarkComposer,
    layout: DocumentLayoutEngine,
    exporter: DocumentExporter,
    watermark_source: Option<WatermarkSource>,
    in_flight: AtomicBool,
}

impl RenderPipeline {
    pub fn new(config: QuotationConfig) -> Self {
        let watermark_source = config
            .watermark
            .source
            .as_deref()
            .map(WatermarkSource::parse);
        Self {
            composer: WatermarkComposer::new(config.watermark.clone(), config.page),
            layout: DocumentLayoutEngine::new(&config),
            exporter: DocumentExporter::new(config.artifact_prefix.clone()),
            watermark_source,
            in_flight: AtomicBool::new(false),
            config,
        }
    }

    /// Replaces the brand image named in the configuration.
    pub fn with_watermark_source(mut self, source: Option<WatermarkSource>) -> Self {
        self.watermark_source = source;
        self
    }

    pub fn config(&self) -> &QuotationConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether a generate trigger for `quotation` should be enabled.
    pub fn can_generate(&self, quotation: &Quotation) -> bool {
        !self.is_running() && quotation.can_generate()
    }

    fn begin(&self) -> QuoteResult<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| QuoteError::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    /// Runs the whole pipeline for one trigger.
    ///
    /// Fails before doing any work if the quotation does not pass the gate
    /// or another run is still in flight. A watermark that cannot be loaded
    /// only drops the background; the document is still exported.
    pub async fn run(
        &self,
        quotation: Quotation,
        sink: &mut dyn ArtifactSink,
    ) -> QuoteResult<ExportReport> {
        quotation.validate()?;
        let _in_flight = self.begin()?;
        let mut transitions = Transitions::start();

        let prices = pricing::price_items(quotation.items.items());
        let total_amount = prices.total_amount;
        debug!(items = prices.extended.len(), total_amount, "quotation priced");

        transitions.enter(PipelineState::AssetLoading);
        let raster = match self.composer.compose(self.watermark_source.as_ref()).await {
            WatermarkOutcome::Composited(raster) => {
                transitions.enter(PipelineState::WatermarkReady);
                Some(raster)
            }
            WatermarkOutcome::Unavailable(_) => {
                transitions.enter(PipelineState::WatermarkUnavailable);
                None
            }
        };

        transitions.enter(PipelineState::LayoutFinalizing);
        let watermark_applied = raster.is_some();
        let layout = self.layout.layout(&quotation, total_amount, raster);
        let title = format!("{} - {}", self.config.business.title, quotation.client.name);
        let document = render::paint(&layout, &title)?;
        let (artifact, path) = self
            .exporter
            .export(document, &quotation.client.name, sink)?;
        transitions.enter(PipelineState::Exported);

        Ok(ExportReport {
            file_name: artifact.file_name,
            path,
            size_bytes: artifact.bytes.len(),
            total_amount,
            watermark_applied,
            states: transitions.0,
        })
    }
}
