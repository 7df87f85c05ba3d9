//! Persistence layer: the store contract and its implementations.
//!
//! The services never talk to the database directly; they go through the
//! [`Store`] trait. [`postgres::PostgresStore`] backs production with
//! `sqlx::PgPool`, [`memory::InMemoryStore`] backs development runs with
//! persistence disabled and every test in the crate.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Client, CoinTransaction, Container, ContainerId, ContainerItem, ContainerStatus, ItemOrigin,
    ItemStatus, Movement, Phone, Shipment, StoredSession,
};
use crate::error::LudinhoError;

pub use memory::InMemoryStore;
pub use models::ConversionReceipt;
pub use postgres::PostgresStore;

/// Which items of a container a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    /// Everything except redeemed items.
    Visible,
    /// Trade-list items still available or in pre-sale.
    Tradeable,
    /// Items ready to ship.
    Shippable,
}

impl ItemFilter {
    /// Whether `item` passes the filter.
    #[must_use]
    pub fn matches(self, item: &ContainerItem) -> bool {
        match self {
            Self::Visible => item.status != ItemStatus::Resgatado,
            Self::Tradeable => {
                item.origin == ItemOrigin::Listinha
                    && matches!(item.status, ItemStatus::Disponivel | ItemStatus::PreVenda)
            }
            Self::Shippable => item.status == ItemStatus::Disponivel,
        }
    }
}

/// Record store behind the chat.
///
/// Every method is a single storage round trip (or one database
/// transaction); multi-step sequences live in the services.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Short backend label for health reporting.
    fn backend(&self) -> &'static str;

    /// Looks a client up by phone.
    async fn find_client(&self, phone: &Phone) -> Result<Option<Client>, LudinhoError>;

    /// Creates the client or renames an existing one.
    async fn upsert_client_name(&self, phone: &Phone, name: &str) -> Result<(), LudinhoError>;

    /// Open containers of `phone`, most recently updated (then created) first.
    async fn open_containers(&self, phone: &Phone) -> Result<Vec<Container>, LudinhoError>;

    /// Whether the container holds at least one item of any status.
    async fn container_has_items(&self, id: &ContainerId) -> Result<bool, LudinhoError>;

    /// Inserts a container row.
    async fn insert_container(&self, container: &Container) -> Result<(), LudinhoError>;

    /// Changes a container's status and touches `updated_at`.
    async fn set_container_status(
        &self,
        id: &ContainerId,
        status: ContainerStatus,
    ) -> Result<(), LudinhoError>;

    /// Items of a container joined with their game names, oldest first.
    async fn container_items(
        &self,
        id: &ContainerId,
        filter: ItemFilter,
    ) -> Result<Vec<ContainerItem>, LudinhoError>;

    /// Reassigns every item with `status` from one container to another.
    /// Returns the number of items moved.
    async fn move_items(
        &self,
        from: &ContainerId,
        to: &ContainerId,
        status: ItemStatus,
    ) -> Result<u64, LudinhoError>;

    /// Inserts an item together with the movement that created it.
    async fn insert_item_with_movement(
        &self,
        item: &ContainerItem,
        movement: &Movement,
    ) -> Result<(), LudinhoError>;

    /// Runs the atomic trade-in procedure for one item.
    async fn convert_item(
        &self,
        item_id: Uuid,
        operator: &str,
    ) -> Result<ConversionReceipt, LudinhoError>;

    /// Appends a debit or adjustment and applies it to the cached balance
    /// atomically. Returns the new balance.
    async fn record_ledger_entry(&self, entry: &CoinTransaction) -> Result<f64, LudinhoError>;

    /// Latest ledger entries of a client, newest first.
    async fn recent_transactions(
        &self,
        phone: &Phone,
        limit: u32,
    ) -> Result<Vec<CoinTransaction>, LudinhoError>;

    /// A PENDENTE or EM_PREPARACAO shipment of the container, if any.
    async fn find_active_shipment(
        &self,
        container_id: &ContainerId,
    ) -> Result<Option<Shipment>, LudinhoError>;

    /// Inserts a shipment and returns the stored row.
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<Shipment, LudinhoError>;

    /// Reads the session row of `phone`.
    async fn load_session(&self, phone: &Phone) -> Result<Option<StoredSession>, LudinhoError>;

    /// Inserts or replaces the session row.
    async fn save_session(&self, session: &StoredSession) -> Result<(), LudinhoError>;

    /// Deletes the session row, if any.
    async fn delete_session(&self, phone: &Phone) -> Result<(), LudinhoError>;

    /// Phone number configured to receive payment receipts.
    async fn receipt_destination(&self) -> Result<Option<String>, LudinhoError>;
}
