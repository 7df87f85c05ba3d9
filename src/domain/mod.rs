//! Domain layer: identifiers, persisted entities and conversation types.
//!
//! This module contains the server-side domain model: phone and container
//! identity, the inventory/ledger/shipment entities, the dialogue session
//! states, inbound payload normalization, the degrade-and-continue result
//! type and the per-phone turn serialization.

pub mod conversation_locks;
pub mod ids;
pub mod inbound;
pub mod models;
pub mod session;
pub mod tolerant;

pub use conversation_locks::ConversationLocks;
pub use ids::{ContainerId, Phone};
pub use inbound::{Attachment, DropReason, InboundMessage};
pub use models::{
    CONVERSION_RATE, Client, CoinTransaction, Container, ContainerItem, ContainerStatus, Game,
    ItemOrigin, ItemSnapshot, ItemStatus, Movement, MovementKind, Shipment, ShipmentStatus,
    TransactionKind, round_cents,
};
pub use session::{Session, StateName, StoredSession, TradeCandidate};
pub use tolerant::Tolerant;
