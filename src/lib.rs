//! # ludinho-webhook
//!
//! WhatsApp webhook of Ludinho, the Ludolovers trade-in assistant.
//!
//! Clients talk to the bot over WhatsApp; a WPPConnect server forwards
//! every event to `POST /webhook`. Each call is one turn of a per-phone
//! conversation: the state machine reads the client's session, looks at
//! their container of games, converts trade-in items into LudoCoins,
//! opens shipments and forwards payment receipts to the staff.
//!
//! ## Architecture
//!
//! ```text
//! WPPConnect ──► POST /webhook (api/)
//!                   │
//!                   ├── InboundMessage (domain/)
//!                   ├── ChatService (service/)
//!                   │      ├── SessionService
//!                   │      ├── ContainerService
//!                   │      ├── LudoCoinService
//!                   │      └── ShipmentService
//!                   │
//!                   ├── Store (persistence/) ── PostgreSQL | in-memory
//!                   └── Messenger (messaging/) ── WPPConnect | recording
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod messaging;
pub mod persistence;
pub mod service;
