//! Service layer: business logic orchestration.
//!
//! [`ChatService`] is the conversation state machine; it drives the
//! container, ledger, shipment and session services, all of which talk to
//! storage only through [`crate::persistence::Store`].

pub mod chat_service;
pub mod commands;
pub mod container_service;
pub mod ludocoin_service;
pub mod messages;
pub mod session_service;
pub mod shipment_service;

pub use chat_service::{ChatService, ChatSettings, TurnOutcome};
pub use container_service::ContainerService;
pub use ludocoin_service::{Conversion, LudoCoinService, credit_preview};
pub use session_service::SessionService;
pub use shipment_service::{ShipmentOutcome, ShipmentService, snapshot_of};
