//! Record Store - Orders and Assets
//!
//! Ids are assigned by the store and only grow, until `reset` clears every
//! table and restarts the counters.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::models::{Asset, NewOrder, Order, OrderId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Asset not found: {0}")]
    AssetNotFound(u64),

    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait RecordStore {
    fn create_order(&mut self, input: &NewOrder) -> Result<Order, StoreError>;
    fn get_order(&self, id: OrderId) -> Result<Order, StoreError>;
    fn update_order(&mut self, order: &Order) -> Result<(), StoreError>;
    fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    fn create_asset(&mut self, asset: Asset) -> Result<Asset, StoreError>;
    /// Most recently created asset for `order_id`.
    fn asset_for_order(&self, order_id: OrderId) -> Result<Option<Asset>, StoreError>;
    fn update_asset(&mut self, asset: &Asset) -> Result<(), StoreError>;

    /// Delete every order and asset and restart id counters.
    fn reset(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Records {
    next_order_id: OrderId,
    next_asset_id: u64,
    orders: Vec<Order>,
    assets: Vec<Asset>,
}

impl Default for Records {
    fn default() -> Self {
        Self {
            next_order_id: 1,
            next_asset_id: 1,
            orders: vec![],
            assets: vec![],
        }
    }
}

impl Records {
    fn create_order(&mut self, input: &NewOrder) -> Order {
        let order = Order::new(self.next_order_id, &input.product, &input.color, &input.size);
        self.next_order_id += 1;
        self.orders.push(order.clone());
        order
    }

    fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or(StoreError::OrderNotFound(id))
    }

    fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let slot = self
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(StoreError::OrderNotFound(order.id))?;
        *slot = order.clone();
        Ok(())
    }

    fn create_asset(&mut self, mut asset: Asset) -> Result<Asset, StoreError> {
        self.get_order(asset.order_id)?;
        asset.id = self.next_asset_id;
        self.next_asset_id += 1;
        self.assets.push(asset.clone());
        Ok(asset)
    }

    fn asset_for_order(&self, order_id: OrderId) -> Option<Asset> {
        self.assets.iter().rev().find(|a| a.order_id == order_id).cloned()
    }

    fn update_asset(&mut self, asset: &Asset) -> Result<(), StoreError> {
        let slot = self
            .assets
            .iter_mut()
            .find(|a| a.id == asset.id)
            .ok_or(StoreError::AssetNotFound(asset.id))?;
        *slot = asset.clone();
        Ok(())
    }
}

/// Process-local store, used by tests and one-shot runs.
#[derive(Default)]
pub struct MemoryStore {
    records: Records,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn create_order(&mut self, input: &NewOrder) -> Result<Order, StoreError> {
        Ok(self.records.create_order(input))
    }

    fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.records.get_order(id)
    }

    fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.records.update_order(order)
    }

    fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.records.orders.clone())
    }

    fn create_asset(&mut self, asset: Asset) -> Result<Asset, StoreError> {
        self.records.create_asset(asset)
    }

    fn asset_for_order(&self, order_id: OrderId) -> Result<Option<Asset>, StoreError> {
        Ok(self.records.asset_for_order(order_id))
    }

    fn update_asset(&mut self, asset: &Asset) -> Result<(), StoreError> {
        self.records.update_asset(asset)
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        self.records = Records::default();
        Ok(())
    }
}

/// Single JSON file, rewritten after every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    records: Records,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            Records::default()
        };
        Ok(Self { path, records })
    }

    /// Apply `change` to a copy of the records and keep it only once the
    /// copy is on disk.
    fn commit<T>(&mut self, change: impl FnOnce(&mut Records) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut next = self.records.clone();
        let value = change(&mut next)?;
        self.flush(&next)?;
        self.records = next;
        Ok(value)
    }

    fn flush(&self, records: &Records) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(records)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn create_order(&mut self, input: &NewOrder) -> Result<Order, StoreError> {
        self.commit(|records| Ok(records.create_order(input)))
    }

    fn get_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.records.get_order(id)
    }

    fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.commit(|records| records.update_order(order))
    }

    fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.records.orders.clone())
    }

    fn create_asset(&mut self, asset: Asset) -> Result<Asset, StoreError> {
        self.commit(|records| records.create_asset(asset))
    }

    fn asset_for_order(&self, order_id: OrderId) -> Result<Option<Asset>, StoreError> {
        Ok(self.records.asset_for_order(order_id))
    }

    fn update_asset(&mut self, asset: &Asset) -> Result<(), StoreError> {
        self.commit(|records| records.update_asset(asset))
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        let (orders, assets) = (self.records.orders.len(), self.records.assets.len());
        self.commit(|records| {
            *records = Records::default();
            Ok(())
        })?;
        info!(orders, assets, path = %self.path.display(), "record store cleared");
        Ok(())
    }
}
