//! Container service: open-container resolution, listings and item intake.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Container, ContainerId, ContainerItem, ItemOrigin, ItemStatus, Movement, Phone, Tolerant,
    round_cents,
};
use crate::error::LudinhoError;
use crate::persistence::{ItemFilter, Store};

/// Orchestrates container lookups for the chat.
///
/// Resolution and listings never fail: a storage error degrades to a safe
/// default and the result says so through [`Tolerant`].
#[derive(Debug, Clone)]
pub struct ContainerService {
    store: Arc<dyn Store>,
}

impl ContainerService {
    /// Creates a new `ContainerService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Mints a new container id for `phone`.
    #[must_use]
    pub fn generate_container_id(phone: &Phone) -> ContainerId {
        ContainerId::generate(phone)
    }

    /// Returns the container the client is currently filling.
    ///
    /// Among the open containers (most recently updated first) the first
    /// one holding any item wins; otherwise the most recent open one;
    /// otherwise a new open container is created. If the insert fails the
    /// minted id is still returned, marked degraded.
    pub async fn resolve_or_create_open_container(&self, phone: &Phone) -> Tolerant<ContainerId> {
        let open = Tolerant::from_result(
            self.store.open_containers(phone).await,
            "list open containers",
            Vec::new,
        );
        let mut degraded = open.is_degraded();

        let open = open.into_inner();
        for container in &open {
            let has_items = Tolerant::from_result(
                self.store.container_has_items(&container.id).await,
                "check container items",
                || false,
            );
            degraded |= has_items.is_degraded();
            if has_items.into_inner() {
                return Self::tag(container.id.clone(), degraded);
            }
        }

        if let Some(latest) = open.into_iter().next() {
            return Self::tag(latest.id, degraded);
        }

        let id = Self::generate_container_id(phone);
        match self
            .store
            .insert_container(&Container::open(id.clone(), phone.clone()))
            .await
        {
            Ok(()) => {
                tracing::info!(%phone, container_id = %id, "container opened");
                Self::tag(id, degraded)
            }
            Err(e) => Tolerant::from_result(Err(e), "insert container", || id),
        }
    }

    fn tag(id: ContainerId, degraded: bool) -> Tolerant<ContainerId> {
        if degraded {
            Tolerant::Degraded {
                value: id,
                cause: "container resolution used a fallback".to_string(),
            }
        } else {
            Tolerant::Ok(id)
        }
    }

    /// Items of the container, redeemed ones excluded.
    pub async fn list_items(&self, container_id: &ContainerId) -> Tolerant<Vec<ContainerItem>> {
        (
            self.store
                .container_items(container_id, ItemFilter::Visible)
                .await,
            "list container items",
        )
            .into()
    }

    /// Trade-list items still available or in pre-sale.
    pub async fn list_tradeable(&self, container_id: &ContainerId) -> Tolerant<Vec<ContainerItem>> {
        (
            self.store
                .container_items(container_id, ItemFilter::Tradeable)
                .await,
            "list tradeable items",
        )
            .into()
    }

    /// Items ready to ship.
    pub async fn list_shippable(&self, container_id: &ContainerId) -> Tolerant<Vec<ContainerItem>> {
        (
            self.store
                .container_items(container_id, ItemFilter::Shippable)
                .await,
            "list shippable items",
        )
            .into()
    }

    /// Adds an item to the client's open container together with its
    /// intake movement.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::InvalidRequest`] for a negative price and
    /// [`LudinhoError::PersistenceError`] if the insert fails.
    pub async fn take_in_item(
        &self,
        phone: &Phone,
        game_id: Uuid,
        origin: ItemOrigin,
        status: ItemStatus,
        applied_price: f64,
    ) -> Result<ContainerItem, LudinhoError> {
        if !applied_price.is_finite() || applied_price < 0.0 {
            return Err(LudinhoError::InvalidRequest(format!(
                "invalid applied price: {applied_price}"
            )));
        }

        let container_id = self.resolve_or_create_open_container(phone).await.into_inner();
        let now = Utc::now();
        let item = ContainerItem {
            id: Uuid::new_v4(),
            container_id: container_id.clone(),
            game_id,
            game_name: None,
            origin,
            status,
            applied_price: round_cents(applied_price),
            created_at: now,
        };
        let movement = Movement {
            id: Uuid::new_v4(),
            item_id: item.id,
            container_id,
            client_phone: phone.clone(),
            kind: origin.into(),
            game_id,
            price: item.applied_price,
            created_at: now,
        };

        self.store.insert_item_with_movement(&item, &movement).await?;
        tracing::info!(%phone, item_id = %item.id, origin = %origin, "item taken in");
        Ok(item)
    }
}
