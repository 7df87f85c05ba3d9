//! Shipment service: turns a container into a shipping request.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Container, ContainerId, ContainerItem, ContainerStatus, ItemSnapshot, ItemStatus, Phone,
    Shipment, ShipmentStatus,
};
use crate::error::LudinhoError;
use crate::persistence::Store;

/// What `create_shipment` ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentOutcome {
    /// The shipment, new or existing.
    pub shipment: Shipment,
    /// `true` when an active shipment already existed for the container.
    pub reused: bool,
}

/// Point-in-time copy of the given items.
#[must_use]
pub fn snapshot_of(items: &[ContainerItem]) -> Vec<ItemSnapshot> {
    items.iter().map(ItemSnapshot::from).collect()
}

/// Creates shipments and rotates containers.
#[derive(Debug, Clone)]
pub struct ShipmentService {
    store: Arc<dyn Store>,
}

impl ShipmentService {
    /// Creates a new `ShipmentService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Requests shipment of `container_id`.
    ///
    /// An active (PENDENTE / EM_PREPARACAO) shipment of the same container
    /// is returned as is. Otherwise the shipment is inserted; after that the
    /// source container is closed, a fresh open container is created and
    /// pre-sale items move into it. Those follow-up steps are independent
    /// and their failures are only logged.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::PersistenceError`] if the shipment itself
    /// cannot be stored.
    pub async fn create_shipment(
        &self,
        container_id: &ContainerId,
        phone: &Phone,
        display_name: &str,
        items_snapshot: Vec<ItemSnapshot>,
    ) -> Result<ShipmentOutcome, LudinhoError> {
        match self.store.find_active_shipment(container_id).await {
            Ok(Some(existing)) => {
                tracing::info!(
                    %container_id,
                    shipment_id = %existing.id,
                    "active shipment reused"
                );
                return Ok(ShipmentOutcome {
                    shipment: existing,
                    reused: true,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%container_id, error = %e, "active shipment lookup failed");
            }
        }

        let shipment = self
            .store
            .insert_shipment(&Shipment {
                id: Uuid::new_v4(),
                container_id: container_id.clone(),
                client_phone: phone.clone(),
                client_name: display_name.to_string(),
                status: ShipmentStatus::Pendente,
                items_snapshot,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(
            %container_id,
            shipment_id = %shipment.id,
            items = shipment.items_snapshot.len(),
            "shipment created"
        );

        if let Err(e) = self
            .store
            .set_container_status(container_id, ContainerStatus::Pendente)
            .await
        {
            tracing::warn!(%container_id, error = %e, "failed to close shipped container");
        }

        let next = ContainerId::generate(phone);
        match self
            .store
            .insert_container(&Container::open(next.clone(), phone.clone()))
            .await
        {
            Ok(()) => {
                match self
                    .store
                    .move_items(container_id, &next, ItemStatus::PreVenda)
                    .await
                {
                    Ok(moved) => {
                        tracing::info!(from = %container_id, to = %next, moved, "pre-sale items carried over");
                    }
                    Err(e) => {
                        tracing::warn!(from = %container_id, to = %next, error = %e, "failed to carry pre-sale items");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(%phone, error = %e, "failed to open follow-up container");
            }
        }

        Ok(ShipmentOutcome {
            shipment,
            reused: false,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::ItemOrigin;
    use crate::service::ContainerService;

    use crate::persistence::InMemoryStore;

    fn phone() -> Phone {
        let Some(p) = Phone::normalize("5531900001111") else {
            panic!("valid phone");
        };
        p
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        containers: ContainerService,
        shipments: ShipmentService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        Fixture {
            containers: ContainerService::new(Arc::clone(&store) as Arc<dyn Store>),
            shipments: ShipmentService::new(Arc::clone(&store) as Arc<dyn Store>),
            store,
        }
    }

    async fn stock(f: &Fixture) -> ContainerId {
        let game = f.store.seed_game("Catan", 100.0).await;
        for status in [ItemStatus::Disponivel, ItemStatus::PreVenda] {
            let Ok(_) = f
                .containers
                .take_in_item(&phone(), game, ItemOrigin::Compra, status, 100.0)
                .await
            else {
                panic!("intake should succeed");
            };
        }
        f.containers
            .resolve_or_create_open_container(&phone())
            .await
            .into_inner()
    }

    #[tokio::test]
    async fn shipment_rotates_container_and_carries_presale() {
        let f = fixture();
        let source = stock(&f).await;
        let shippable = f.containers.list_shippable(&source).await.into_inner();

        let Ok(outcome) = f
            .shipments
            .create_shipment(&source, &phone(), "Ana", snapshot_of(&shippable))
            .await
        else {
            panic!("shipment should be created");
        };
        assert!(!outcome.reused);
        assert_eq!(outcome.shipment.status, ShipmentStatus::Pendente);
        assert_eq!(outcome.shipment.items_snapshot.len(), 1);

        let containers = f.store.containers_of(&phone()).await;
        assert_eq!(containers.len(), 2);
        let Some(closed) = containers.iter().find(|c| c.id == source) else {
            panic!("source container should exist");
        };
        assert_eq!(closed.status, ContainerStatus::Pendente);

        let Some(next) = containers.iter().find(|c| c.id != source) else {
            panic!("follow-up container should exist");
        };
        assert_eq!(next.status, ContainerStatus::Aberto);

        let items = f.store.all_items().await;
        let presale: Vec<_> = items
            .iter()
            .filter(|i| i.status == ItemStatus::PreVenda)
            .collect();
        assert_eq!(presale.len(), 1);
        assert_eq!(presale[0].container_id, next.id);
    }

    #[tokio::test]
    async fn second_request_reuses_active_shipment() {
        let f = fixture();
        let source = stock(&f).await;

        let Ok(first) = f.shipments.create_shipment(&source, &phone(), "Ana", vec![]).await else {
            panic!("first shipment should be created");
        };
        let Ok(second) = f.shipments.create_shipment(&source, &phone(), "Ana", vec![]).await else {
            panic!("second call should answer");
        };
        assert!(second.reused);
        assert_eq!(second.shipment.id, first.shipment.id);
        assert_eq!(f.store.shipments().await.len(), 1);
        assert_eq!(f.store.containers_of(&phone()).await.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_shipment_does_not_block_a_new_one() {
        let f = fixture();
        let source = stock(&f).await;
        let Ok(first) = f.shipments.create_shipment(&source, &phone(), "Ana", vec![]).await else {
            panic!("first shipment should be created");
        };
        f.store
            .set_shipment_status(first.shipment.id, ShipmentStatus::Cancelado)
            .await;

        let Ok(second) = f.shipments.create_shipment(&source, &phone(), "Ana", vec![]).await else {
            panic!("second shipment should be created");
        };
        assert!(!second.reused);
        assert_ne!(second.shipment.id, first.shipment.id);
    }

    #[tokio::test]
    async fn insert_failure_is_fatal_and_leaves_containers_alone() {
        let f = fixture();
        let source = stock(&f).await;
        f.store.fail_operation("insert_shipment").await;

        let result = f.shipments.create_shipment(&source, &phone(), "Ana", vec![]).await;
        assert!(matches!(result, Err(LudinhoError::PersistenceError(_))));
        assert_eq!(f.store.containers_of(&phone()).await.len(), 1);
    }

    #[tokio::test]
    async fn follow_up_failures_do_not_undo_the_shipment() {
        let f = fixture();
        let source = stock(&f).await;
        f.store.fail_operation("set_container_status").await;
        f.store.fail_operation("move_items").await;

        let Ok(outcome) = f.shipments.create_shipment(&source, &phone(), "Ana", vec![]).await else {
            panic!("shipment should still be created");
        };
        assert!(!outcome.reused);
        assert_eq!(f.store.shipments().await.len(), 1);
    }
}
