//! Fulfillment Pipeline - Single Entry Point
//!
//! Order status changes go through `workflow::transition` and nowhere else.
//! The pipeline takes `&mut self` for every mutation; callers that share it
//! across threads serialize access per order themselves.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::HuggingFaceGenerator;
use crate::artifacts::{ArtifactStore, FsArtifactStore, StoredArtifact};
use crate::catalog::{ColorTable, ProductCatalog};
use crate::compositor::{Compositor, HttpLogoFetcher};
use crate::config::Config;
use crate::label::{Code128Encoder, LabelAssembler, LabelError, LabelFields, PdfLabelRenderer};
use crate::mockup::{MockupError, MockupGenerator, MockupOutcome, MockupRequest};
use crate::models::{Asset, NewOrder, Order, OrderId};
use crate::store::{RecordStore, StoreError};
use crate::upload::{store_logo, UploadError};
use crate::workflow::{transition, OrderStatus, WorkflowError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Mockup(#[from] MockupError),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Order {id} is {status}; its approved mockup can no longer change")]
    MockupLocked { id: OrderId, status: OrderStatus },
}

impl PipelineError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, PipelineError::Workflow(WorkflowError::InvalidTransition { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMockup {
    pub order: Order,
    pub asset: Asset,
    pub mockup: MockupOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorInfo {
    pub name: String,
    pub hex: String,
}

pub struct FulfillmentPipeline<S: RecordStore> {
    store: S,
    mockups: MockupGenerator,
    labels: LabelAssembler,
    artifacts: Arc<dyn ArtifactStore>,
    colors: Arc<ColorTable>,
}

impl<S: RecordStore> FulfillmentPipeline<S> {
    pub fn new(
        store: S,
        mockups: MockupGenerator,
        labels: LabelAssembler,
        artifacts: Arc<dyn ArtifactStore>,
        colors: Arc<ColorTable>,
    ) -> Self {
        Self {
            store,
            mockups,
            labels,
            artifacts,
            colors,
        }
    }

    /// Wire the production collaborators described by `config`.
    pub fn from_config(config: &Config, store: S) -> Self {
        let artifacts: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.data_dir));
        let products = Arc::new(ProductCatalog::default());
        let colors = Arc::new(ColorTable::default());

        let compositor = Compositor::new(
            &config.templates_dir,
            products,
            colors.clone(),
            artifacts.clone(),
            Box::new(HttpLogoFetcher::new(config.ai_timeout())),
        );
        let generator = HuggingFaceGenerator::new(config.hf_api_key.clone(), config.ai_timeout());
        let mockups = MockupGenerator::new(compositor, Box::new(generator), artifacts.clone(), colors.clone());
        let labels = LabelAssembler::new(
            artifacts.clone(),
            Box::new(Code128Encoder::default()),
            Box::new(PdfLabelRenderer),
        );
        Self::new(store, mockups, labels, artifacts, colors)
    }

    pub fn create_order(&mut self, input: &NewOrder) -> Result<Order, PipelineError> {
        let order = self.store.create_order(input)?;
        info!(order_id = order.id, product = %order.product, color = %order.color, "order created");
        Ok(order)
    }

    /// Create an order and composite its mockup from the supplied logo.
    pub fn place_order(&mut self, input: &NewOrder) -> Result<OrderMockup, PipelineError> {
        let order = self.create_order(input)?;
        let request = MockupRequest {
            logo_url: input.logo_url.clone(),
            ai_prompt: None,
        };
        self.generate_mockup(order.id, &request)
    }

    /// Generate (or regenerate) the mockup for an order and record it on the
    /// order's asset. A CREATED order advances to MOCKUP_GENERATED. Approved
    /// orders keep the mockup they were approved with.
    pub fn generate_mockup(&mut self, id: OrderId, request: &MockupRequest) -> Result<OrderMockup, PipelineError> {
        let mut order = self.store.get_order(id)?;
        if matches!(order.status, OrderStatus::Approved | OrderStatus::ReadyForFulfillment) {
            warn!(order_id = id, status = %order.status, "mockup regeneration refused");
            return Err(PipelineError::MockupLocked { id, status: order.status });
        }
        let mockup = self.mockups.generate(order.id, &order.product, &order.color, request)?;

        let asset = match self.store.asset_for_order(order.id)? {
            Some(mut asset) => {
                apply_outcome(&mut asset, request, &mockup);
                self.store.update_asset(&asset)?;
                asset
            }
            None => {
                let mut asset = Asset {
                    order_id: order.id,
                    ..Default::default()
                };
                apply_outcome(&mut asset, request, &mockup);
                self.store.create_asset(asset)?
            }
        };

        if order.status == OrderStatus::Created {
            transition(&mut order, OrderStatus::MockupGenerated)?;
            self.store.update_order(&order)?;
        }

        Ok(OrderMockup { order, asset, mockup })
    }

    pub fn transition(&mut self, id: OrderId, target: OrderStatus) -> Result<Order, PipelineError> {
        let mut order = self.store.get_order(id)?;
        transition(&mut order, target)?;
        self.store.update_order(&order)?;
        Ok(order)
    }

    pub fn approve(&mut self, id: OrderId) -> Result<Order, PipelineError> {
        self.transition(id, OrderStatus::Approved)
    }

    pub fn mark_ready(&mut self, id: OrderId) -> Result<Order, PipelineError> {
        self.transition(id, OrderStatus::ReadyForFulfillment)
    }

    pub fn generate_label(&mut self, id: OrderId, fields: &LabelFields) -> Result<StoredArtifact, PipelineError> {
        let order = self.store.get_order(id)?;
        Ok(self.labels.generate_order_label(&order, fields)?)
    }

    pub fn upload_logo(&self, filename: &str, bytes: &[u8], timestamp: i64) -> Result<StoredArtifact, PipelineError> {
        Ok(store_logo(self.artifacts.as_ref(), filename, bytes, timestamp)?)
    }

    pub fn get_order(&self, id: OrderId) -> Result<Order, PipelineError> {
        Ok(self.store.get_order(id)?)
    }

    pub fn list_orders(&self) -> Result<Vec<Order>, PipelineError> {
        Ok(self.store.list_orders()?)
    }

    pub fn asset(&self, id: OrderId) -> Result<Option<Asset>, PipelineError> {
        Ok(self.store.asset_for_order(id)?)
    }

    pub fn available_colors(&self) -> Vec<ColorInfo> {
        self.colors
            .names()
            .into_iter()
            .map(|name| ColorInfo {
                name: name.to_string(),
                hex: self.colors.css_hex(name),
            })
            .collect()
    }

    pub fn reset(&mut self) -> Result<(), PipelineError> {
        Ok(self.store.reset()?)
    }
}

fn apply_outcome(asset: &mut Asset, request: &MockupRequest, outcome: &MockupOutcome) {
    if let Some(logo) = request.logo() {
        asset.logo_url = logo.to_string();
    }
    asset.mockup_url = outcome.artifact.url.clone();
    asset.ai_generated = outcome.ai_generated;
    asset.ai_prompt = outcome.ai_prompt.clone();
}
