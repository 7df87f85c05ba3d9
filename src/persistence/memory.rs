//! In-memory implementation of the store.
//!
//! Used when persistence is disabled and by every test in the crate. All
//! tables sit behind one [`tokio::sync::Mutex`], so each trait call is
//! atomic the same way a single SQL statement (or the conversion procedure)
//! is. Individual operations can be made to fail on demand with
//! [`InMemoryStore::fail_operation`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::ConversionReceipt;
use super::{ItemFilter, Store};
use crate::domain::{
    CONVERSION_RATE, Client, CoinTransaction, Container, ContainerId, ContainerItem,
    ContainerStatus, Game, ItemStatus, Movement, Phone, Shipment, StoredSession, TransactionKind,
    round_cents,
};
use crate::error::LudinhoError;

#[derive(Debug, Default)]
struct Tables {
    clients: HashMap<Phone, Client>,
    games: HashMap<Uuid, Game>,
    containers: Vec<Container>,
    items: Vec<ContainerItem>,
    movements: Vec<Movement>,
    transactions: Vec<CoinTransaction>,
    shipments: Vec<Shipment>,
    sessions: HashMap<Phone, StoredSession>,
    receipt_destination: Option<String>,
    failing: HashSet<String>,
}

impl Tables {
    fn check(&self, operation: &str) -> Result<(), LudinhoError> {
        if self.failing.contains(operation) {
            return Err(LudinhoError::PersistenceError(format!(
                "injected failure: {operation}"
            )));
        }
        Ok(())
    }

    /// Mirrors the foreign key from items to containers.
    fn require_container(&self, id: &ContainerId) -> Result<(), LudinhoError> {
        if self.containers.iter().any(|c| &c.id == id) {
            Ok(())
        } else {
            Err(LudinhoError::PersistenceError(format!(
                "container {id} does not exist"
            )))
        }
    }

    fn with_game_name(&self, item: &ContainerItem) -> ContainerItem {
        let mut item = item.clone();
        if let Some(game) = self.games.get(&item.game_id) {
            item.game_name = Some(game.name.clone());
        }
        item
    }

    fn touch_container(&mut self, id: &ContainerId) {
        if let Some(container) = self.containers.iter_mut().find(|c| &c.id == id) {
            container.updated_at = Utc::now();
        }
    }
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call of the named trait method fail with a
    /// [`LudinhoError::PersistenceError`] until [`Self::recover`] is called.
    pub async fn fail_operation(&self, operation: &str) {
        self.tables.lock().await.failing.insert(operation.to_string());
    }

    /// Clears every injected failure.
    pub async fn recover(&self) {
        self.tables.lock().await.failing.clear();
    }

    /// Adds a catalog product and returns its id.
    pub async fn seed_game(&self, name: &str, price: f64) -> Uuid {
        let game = Game {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
        };
        let id = game.id;
        self.tables.lock().await.games.insert(id, game);
        id
    }

    /// Inserts or replaces a client row.
    pub async fn seed_client(&self, client: Client) {
        self.tables
            .lock()
            .await
            .clients
            .insert(client.phone.clone(), client);
    }

    /// Sets (or removes) the number that receives payment receipts.
    pub async fn set_receipt_destination(&self, number: Option<&str>) {
        self.tables.lock().await.receipt_destination = number.map(str::to_string);
    }

    /// Returns the client row of `phone`.
    pub async fn client(&self, phone: &Phone) -> Option<Client> {
        self.tables.lock().await.clients.get(phone).cloned()
    }

    /// Returns every container of `phone`, in insertion order.
    pub async fn containers_of(&self, phone: &Phone) -> Vec<Container> {
        self.tables
            .lock()
            .await
            .containers
            .iter()
            .filter(|c| &c.client_phone == phone)
            .cloned()
            .collect()
    }

    /// Returns every item of every container, in insertion order.
    pub async fn all_items(&self) -> Vec<ContainerItem> {
        let tables = self.tables.lock().await;
        tables.items.iter().map(|i| tables.with_game_name(i)).collect()
    }

    /// Returns every movement, in insertion order.
    pub async fn movements(&self) -> Vec<Movement> {
        self.tables.lock().await.movements.clone()
    }

    /// Returns every ledger entry of `phone`, oldest first.
    pub async fn ledger_of(&self, phone: &Phone) -> Vec<CoinTransaction> {
        self.tables
            .lock()
            .await
            .transactions
            .iter()
            .filter(|t| &t.client_phone == phone)
            .cloned()
            .collect()
    }

    /// Returns every shipment, in insertion order.
    pub async fn shipments(&self) -> Vec<Shipment> {
        self.tables.lock().await.shipments.clone()
    }

    /// Overwrites the status of a shipment, as staff tooling would.
    pub async fn set_shipment_status(&self, id: Uuid, status: crate::domain::ShipmentStatus) {
        if let Some(shipment) = self
            .tables
            .lock()
            .await
            .shipments
            .iter_mut()
            .find(|s| s.id == id)
        {
            shipment.status = status;
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_client(&self, phone: &Phone) -> Result<Option<Client>, LudinhoError> {
        let tables = self.tables.lock().await;
        tables.check("find_client")?;
        Ok(tables.clients.get(phone).cloned())
    }

    async fn upsert_client_name(&self, phone: &Phone, name: &str) -> Result<(), LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("upsert_client_name")?;
        tables
            .clients
            .entry(phone.clone())
            .and_modify(|c| c.name = Some(name.to_string()))
            .or_insert_with(|| Client::onboarded(phone.clone(), name));
        Ok(())
    }

    async fn open_containers(&self, phone: &Phone) -> Result<Vec<Container>, LudinhoError> {
        let tables = self.tables.lock().await;
        tables.check("open_containers")?;
        let mut open: Vec<Container> = tables
            .containers
            .iter()
            .filter(|c| &c.client_phone == phone && c.status == ContainerStatus::Aberto)
            .cloned()
            .collect();
        open.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(open)
    }

    async fn container_has_items(&self, id: &ContainerId) -> Result<bool, LudinhoError> {
        let tables = self.tables.lock().await;
        tables.check("container_has_items")?;
        Ok(tables.items.iter().any(|i| &i.container_id == id))
    }

    async fn insert_container(&self, container: &Container) -> Result<(), LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("insert_container")?;
        if tables.containers.iter().any(|c| c.id == container.id) {
            return Err(LudinhoError::PersistenceError(format!(
                "duplicate container id {}",
                container.id
            )));
        }
        tables.containers.push(container.clone());
        Ok(())
    }

    async fn set_container_status(
        &self,
        id: &ContainerId,
        status: ContainerStatus,
    ) -> Result<(), LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("set_container_status")?;
        let container = tables
            .containers
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| LudinhoError::NotFound(format!("container {id}")))?;
        container.status = status;
        container.updated_at = Utc::now();
        Ok(())
    }

    async fn container_items(
        &self,
        id: &ContainerId,
        filter: ItemFilter,
    ) -> Result<Vec<ContainerItem>, LudinhoError> {
        let tables = self.tables.lock().await;
        tables.check("container_items")?;
        let mut items: Vec<ContainerItem> = tables
            .items
            .iter()
            .filter(|i| &i.container_id == id && filter.matches(i))
            .map(|i| tables.with_game_name(i))
            .collect();
        items.sort_by_key(|i| i.created_at);
        Ok(items)
    }

    async fn move_items(
        &self,
        from: &ContainerId,
        to: &ContainerId,
        status: ItemStatus,
    ) -> Result<u64, LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("move_items")?;
        tables.require_container(to)?;
        let mut moved = 0;
        for item in tables
            .items
            .iter_mut()
            .filter(|i| &i.container_id == from && i.status == status)
        {
            item.container_id = to.clone();
            moved += 1;
        }
        Ok(moved)
    }

    async fn insert_item_with_movement(
        &self,
        item: &ContainerItem,
        movement: &Movement,
    ) -> Result<(), LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("insert_item_with_movement")?;
        tables.require_container(&item.container_id)?;
        if tables.movements.iter().any(|m| m.item_id == movement.item_id) {
            return Err(LudinhoError::PersistenceError(format!(
                "item {} already has a movement",
                movement.item_id
            )));
        }
        tables.items.push(item.clone());
        tables.movements.push(movement.clone());
        tables.touch_container(&item.container_id);
        Ok(())
    }

    async fn convert_item(
        &self,
        item_id: Uuid,
        operator: &str,
    ) -> Result<ConversionReceipt, LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("convert_item")?;

        let rejected = ConversionReceipt {
            ok: false,
            item_id,
            credited: None,
            balance: None,
        };
        let Some(item) = tables.items.iter().find(|i| i.id == item_id) else {
            return Ok(rejected);
        };
        if item.status == ItemStatus::Resgatado {
            return Ok(rejected);
        }
        let credit = round_cents(item.applied_price * CONVERSION_RATE);
        let container_id = item.container_id.clone();
        let phone = tables
            .containers
            .iter()
            .find(|c| c.id == container_id)
            .map(|c| c.client_phone.clone())
            .ok_or_else(|| LudinhoError::NotFound(format!("container {container_id}")))?;

        // Every lookup succeeded; apply the whole conversion.
        if let Some(item) = tables.items.iter_mut().find(|i| i.id == item_id) {
            item.status = ItemStatus::Resgatado;
        }
        tables.transactions.push(CoinTransaction {
            id: Uuid::new_v4(),
            client_phone: phone.clone(),
            kind: TransactionKind::CreditoConversao,
            value: credit,
            item_id: Some(item_id),
            operator: Some(operator.to_string()),
            note: None,
            created_at: Utc::now(),
        });
        let client = tables.clients.entry(phone.clone()).or_insert_with(|| Client {
            phone,
            name: None,
            opt_in: false,
            address: None,
            ludocoin_balance: 0.0,
        });
        client.ludocoin_balance = round_cents(client.ludocoin_balance + credit);

        Ok(ConversionReceipt {
            ok: true,
            item_id,
            credited: Some(credit),
            balance: Some(client.ludocoin_balance),
        })
    }

    async fn record_ledger_entry(&self, entry: &CoinTransaction) -> Result<f64, LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("record_ledger_entry")?;

        let client = tables
            .clients
            .get_mut(&entry.client_phone)
            .ok_or_else(|| LudinhoError::NotFound(format!("client {}", entry.client_phone)))?;
        let balance = client.ludocoin_balance;
        let new_balance = round_cents(balance + entry.signed_value());
        if entry.kind == TransactionKind::DebitoUtilizacao && new_balance < 0.0 {
            return Err(LudinhoError::InsufficientBalance {
                balance,
                requested: entry.value.abs(),
            });
        }
        client.ludocoin_balance = new_balance;
        tables.transactions.push(entry.clone());
        Ok(new_balance)
    }

    async fn recent_transactions(
        &self,
        phone: &Phone,
        limit: u32,
    ) -> Result<Vec<CoinTransaction>, LudinhoError> {
        let tables = self.tables.lock().await;
        tables.check("recent_transactions")?;
        let mut entries: Vec<CoinTransaction> = tables
            .transactions
            .iter()
            .filter(|t| &t.client_phone == phone)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }

    async fn find_active_shipment(
        &self,
        container_id: &ContainerId,
    ) -> Result<Option<Shipment>, LudinhoError> {
        let tables = self.tables.lock().await;
        tables.check("find_active_shipment")?;
        Ok(tables
            .shipments
            .iter()
            .filter(|s| &s.container_id == container_id && s.status.is_active())
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<Shipment, LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("insert_shipment")?;
        tables.shipments.push(shipment.clone());
        Ok(shipment.clone())
    }

    async fn load_session(&self, phone: &Phone) -> Result<Option<StoredSession>, LudinhoError> {
        let tables = self.tables.lock().await;
        tables.check("load_session")?;
        Ok(tables.sessions.get(phone).cloned())
    }

    async fn save_session(&self, session: &StoredSession) -> Result<(), LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("save_session")?;
        tables
            .sessions
            .insert(session.phone.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, phone: &Phone) -> Result<(), LudinhoError> {
        let mut tables = self.tables.lock().await;
        tables.check("delete_session")?;
        tables.sessions.remove(phone);
        Ok(())
    }

    async fn receipt_destination(&self) -> Result<Option<String>, LudinhoError> {
        let tables = self.tables.lock().await;
        tables.check("receipt_destination")?;
        Ok(tables
            .receipt_destination
            .clone()
            .filter(|n| !n.trim().is_empty()))
    }
}
