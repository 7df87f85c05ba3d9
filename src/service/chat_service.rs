//! Chat service: the conversation state machine behind the webhook.
//!
//! One call to [`ChatService::handle`] is one turn: the session of the
//! sender is loaded, the input is dispatched on `(session, text)`, the
//! domain services are called, replies are sent and the session is stored
//! or cleared. Turns of the same phone never overlap ([`ConversationLocks`]).
//!
//! Precedence inside a turn:
//!
//! 1. onboarding of unknown numbers,
//! 2. `COMPROVANTE <id>` submissions (any state),
//! 3. greetings and back-to-menu words,
//! 4. the in-progress dialogue, if any,
//! 5. top-level commands, then the fallback.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    Client, ContainerId, ConversationLocks, DropReason, InboundMessage, Phone, Session,
    Tolerant, TradeCandidate, round_cents,
};
use crate::messaging::{Messenger, OutboundFile};
use crate::persistence::Store;

use super::commands::{self, Command};
use super::ludocoin_service::credit_preview;
use super::messages;
use super::session_service::DEFAULT_SESSION_TTL;
use super::{ContainerService, LudoCoinService, SessionService, ShipmentService};

/// Operator recorded on conversions made through the chat.
pub const DEFAULT_BOT_OPERATOR: &str = "whatsapp-bot@ludolovers";

/// Number of ledger entries shown with the balance.
const RECENT_TRANSACTIONS: u32 = 5;

/// Minimum length of an onboarding name.
const MIN_NAME_CHARS: usize = 2;

/// Tunables of the state machine.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Idle session lifetime.
    pub session_ttl: Duration,
    /// Operator identity written on chat-driven conversions.
    pub operator: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            operator: DEFAULT_BOT_OPERATOR.to_string(),
        }
    }
}

/// What happened to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Acknowledged without processing.
    Dropped(DropReason),
    /// Processed as a turn of this phone's conversation.
    Handled(Phone),
}

/// The conversation state machine.
#[derive(Debug)]
pub struct ChatService {
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    sessions: SessionService,
    containers: ContainerService,
    coins: LudoCoinService,
    shipments: ShipmentService,
    locks: ConversationLocks,
    operator: String,
}

impl ChatService {
    /// Wires the state machine over a store and a messenger.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, messenger: Arc<dyn Messenger>, settings: ChatSettings) -> Self {
        Self {
            sessions: SessionService::new(Arc::clone(&store), settings.session_ttl),
            containers: ContainerService::new(Arc::clone(&store)),
            coins: LudoCoinService::new(Arc::clone(&store)),
            shipments: ShipmentService::new(Arc::clone(&store)),
            locks: ConversationLocks::new(),
            operator: settings.operator,
            store,
            messenger,
        }
    }

    /// Label of the store backend, for health reporting.
    #[must_use]
    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Runs one turn for an inbound message.
    pub async fn handle(&self, message: &InboundMessage) -> TurnOutcome {
        if let Some(reason) = message.drop_reason() {
            tracing::debug!(?reason, event = %message.event, "inbound message dropped");
            return TurnOutcome::Dropped(reason);
        }
        let Some(phone) = message.phone.clone() else {
            return TurnOutcome::Dropped(DropReason::NoPhone);
        };

        let _turn = self.locks.acquire(&phone).await;
        let session = self.sessions.get(&phone).await;
        let state = session
            .as_ref()
            .map_or_else(|| "NONE".to_string(), |s| s.name().to_string());
        tracing::info!(
            %phone,
            %state,
            has_attachment = message.attachment.is_some(),
            "handling turn"
        );
        self.dispatch(&phone, message, session).await;
        TurnOutcome::Handled(phone)
    }

    async fn dispatch(&self, phone: &Phone, message: &InboundMessage, session: Option<Session>) {
        let text = message.text.as_str();

        if session.is_none() && !self.is_known(phone).await {
            self.sessions.set(phone, &Session::OnboardAskName).await;
            self.say(phone, messages::ONBOARD_PROMPT).await;
            return;
        }
        if matches!(session, Some(Session::OnboardAskName)) {
            self.finish_onboarding(phone, text).await;
            return;
        }

        if let Some(transaction_id) = commands::parse_receipt(text) {
            let waiting = matches!(session, Some(Session::ComprovanteWait));
            self.forward_receipt(phone, message, &transaction_id, waiting)
                .await;
            return;
        }

        if commands::is_greeting(text) || commands::is_back_to_menu(text) {
            self.sessions.clear(phone).await;
            self.say(phone, &messages::menu()).await;
            return;
        }

        match session {
            Some(Session::ComprovanteWait) => {
                self.say(phone, messages::RECEIPT_FORMAT_REPROMPT).await;
            }
            Some(Session::TrocaListando { candidates }) => {
                self.pick_trade_items(phone, &candidates, text).await;
            }
            Some(Session::TrocaConfirm { chosen }) => {
                self.confirm_trade(phone, &chosen, text).await;
            }
            Some(Session::EnviarConfirm { container_id }) => {
                self.confirm_shipment(phone, &container_id, text).await;
            }
            Some(Session::OnboardAskName) | None => {
                self.run_command(phone, text).await;
            }
        }
    }

    /// A failed lookup counts as known so an outage never sends existing
    /// clients back through onboarding.
    async fn is_known(&self, phone: &Phone) -> bool {
        Tolerant::from_result(
            self.store.find_client(phone).await.map(|c| c.is_some()),
            "client lookup",
            || true,
        )
        .into_inner()
    }

    async fn client(&self, phone: &Phone) -> Option<Client> {
        Tolerant::from_result(self.store.find_client(phone).await, "client lookup", || None)
            .into_inner()
    }

    async fn finish_onboarding(&self, phone: &Phone, text: &str) {
        let name = text.trim();
        if name.chars().count() < MIN_NAME_CHARS {
            self.say(phone, messages::ONBOARD_NAME_TOO_SHORT).await;
            return;
        }
        match self.store.upsert_client_name(phone, name).await {
            Ok(()) => tracing::info!(%phone, "client onboarded"),
            Err(e) => tracing::warn!(%phone, error = %e, "failed to store client name"),
        }
        self.sessions.clear(phone).await;
        self.say(phone, &messages::welcome(name)).await;
    }

    async fn run_command(&self, phone: &Phone, text: &str) {
        match Command::parse(text, true) {
            Some(Command::Container) => self.show_container(phone).await,
            Some(Command::Ludocoins) => self.show_balance(phone).await,
            Some(Command::Trocar) => self.list_trade_candidates(phone).await,
            Some(Command::Enviar) => self.propose_shipment(phone).await,
            Some(Command::Ajuda) => self.say(phone, &messages::help()).await,
            Some(Command::Comprovante) => {
                self.sessions.set(phone, &Session::ComprovanteWait).await;
                self.say(phone, messages::RECEIPT_INSTRUCTIONS).await;
            }
            None => self.say(phone, &messages::fallback()).await,
        }
    }

    async fn show_container(&self, phone: &Phone) {
        let container = self.containers.resolve_or_create_open_container(phone).await;
        if container.is_degraded() {
            self.say(phone, messages::CONTAINER_UNAVAILABLE).await;
            return;
        }
        let items = self.containers.list_items(container.value()).await;
        if items.is_degraded() {
            self.say(phone, messages::CONTAINER_UNAVAILABLE).await;
            return;
        }
        self.say(phone, &messages::container_view(items.value()))
            .await;
    }

    async fn show_balance(&self, phone: &Phone) {
        let balance = match self.coins.balance(phone).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(%phone, error = %e, "balance lookup failed");
                self.say(phone, messages::BALANCE_UNAVAILABLE).await;
                return;
            }
        };
        let recent: Tolerant<_> = (
            self.coins
                .recent_transactions(phone, RECENT_TRANSACTIONS)
                .await,
            "recent transactions",
        )
            .into();
        self.say(phone, &messages::balance_view(balance, recent.value()))
            .await;
    }

    async fn list_trade_candidates(&self, phone: &Phone) {
        let container = self.containers.resolve_or_create_open_container(phone).await;
        if container.is_degraded() {
            self.say(phone, messages::TRADE_LIST_UNAVAILABLE).await;
            return;
        }
        let items = self.containers.list_tradeable(container.value()).await;
        if items.is_degraded() {
            self.say(phone, messages::TRADE_LIST_UNAVAILABLE).await;
            return;
        }

        let candidates: Vec<TradeCandidate> = items
            .value()
            .iter()
            .map(|item| TradeCandidate {
                item_id: item.id,
                name: item.display_name().to_string(),
                credit: credit_preview(item.applied_price),
            })
            .collect();
        if candidates.is_empty() {
            self.say(phone, messages::NOTHING_TO_TRADE).await;
            return;
        }

        let text = messages::trade_list(&candidates);
        self.sessions
            .set(phone, &Session::TrocaListando { candidates })
            .await;
        self.say(phone, &text).await;
    }

    async fn pick_trade_items(&self, phone: &Phone, candidates: &[TradeCandidate], text: &str) {
        if !commands::is_index_list(text) {
            self.say(phone, messages::TRADE_NOT_NUMERIC).await;
            self.say(phone, &messages::trade_list(candidates)).await;
            return;
        }
        let chosen = commands::select_by_indices(candidates, text);
        if chosen.is_empty() {
            self.say(phone, messages::TRADE_INVALID_INDEX).await;
            self.say(phone, &messages::trade_list(candidates)).await;
            return;
        }

        let text = messages::trade_confirmation(&chosen);
        self.sessions
            .set(phone, &Session::TrocaConfirm { chosen })
            .await;
        self.say(phone, &text).await;
    }

    async fn confirm_trade(&self, phone: &Phone, chosen: &[TradeCandidate], text: &str) {
        match commands::parse_confirmation(text) {
            Some(true) => {}
            Some(false) => {
                self.sessions.clear(phone).await;
                self.say(phone, messages::TRADE_CANCELLED).await;
                return;
            }
            None => {
                self.say(phone, messages::YES_NO_REPROMPT).await;
                return;
            }
        }

        // Leave the confirm state before any conversion runs.
        self.sessions.clear(phone).await;

        let mut credited = 0.0;
        let mut converted = 0usize;
        let mut last_balance = None;
        let mut failed = Vec::new();
        for candidate in chosen {
            match self.coins.convert_item(candidate.item_id, &self.operator).await {
                Ok(conversion) => {
                    credited += conversion.credited;
                    converted += 1;
                    last_balance = Some(conversion.balance);
                }
                Err(e) => {
                    tracing::warn!(%phone, item_id = %candidate.item_id, error = %e, "conversion failed");
                    failed.push(candidate.name.clone());
                }
            }
        }

        if converted == 0 {
            self.say(phone, messages::TRADE_FAILED).await;
            return;
        }
        let balance = Tolerant::from_result(
            self.coins.balance(phone).await,
            "balance after conversion",
            || last_balance.unwrap_or_default(),
        )
        .into_inner();
        self.say(
            phone,
            &messages::trade_done(converted, round_cents(credited), balance, &failed),
        )
        .await;
    }

    async fn propose_shipment(&self, phone: &Phone) {
        let container = self.containers.resolve_or_create_open_container(phone).await;
        if container.is_degraded() {
            self.say(phone, messages::CONTAINER_UNAVAILABLE).await;
            return;
        }
        let items = self.containers.list_shippable(container.value()).await;
        if items.is_degraded() {
            self.say(phone, messages::CONTAINER_UNAVAILABLE).await;
            return;
        }
        if items.value().is_empty() {
            self.say(phone, messages::NOTHING_TO_SHIP).await;
            self.say(phone, &messages::menu()).await;
            return;
        }

        let address = self.client(phone).await.and_then(|c| c.address);
        let text = messages::shipment_summary(items.value(), address.as_deref());
        self.sessions
            .set(
                phone,
                &Session::EnviarConfirm {
                    container_id: container.into_inner(),
                },
            )
            .await;
        self.say(phone, &text).await;
    }

    async fn confirm_shipment(&self, phone: &Phone, container_id: &ContainerId, text: &str) {
        match commands::parse_confirmation(text) {
            Some(true) => {}
            Some(false) => {
                self.sessions.clear(phone).await;
                self.say(phone, messages::SHIPMENT_CANCELLED).await;
                return;
            }
            None => {
                self.say(phone, messages::YES_NO_REPROMPT).await;
                return;
            }
        }

        // Leave the confirm state before the shipment is created.
        self.sessions.clear(phone).await;

        let items = self.containers.list_shippable(container_id).await;
        if items.is_degraded() {
            self.say(phone, messages::SHIPMENT_FAILED).await;
            return;
        }
        if items.value().is_empty() {
            self.say(phone, messages::NOTHING_TO_SHIP).await;
            self.say(phone, &messages::menu()).await;
            return;
        }

        let name = self
            .client(phone)
            .await
            .and_then(|c| c.name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Cliente {phone}"));
        let snapshot = super::shipment_service::snapshot_of(items.value());
        match self
            .shipments
            .create_shipment(container_id, phone, &name, snapshot)
            .await
        {
            Ok(outcome) => {
                self.say(phone, &messages::shipment_created(&outcome.shipment))
                    .await;
            }
            Err(e) => {
                tracing::warn!(%phone, %container_id, error = %e, "shipment creation failed");
                self.say(phone, messages::SHIPMENT_FAILED).await;
            }
        }
    }

    async fn forward_receipt(
        &self,
        phone: &Phone,
        message: &InboundMessage,
        transaction_id: &str,
        waiting: bool,
    ) {
        let destination = Tolerant::from_result(
            self.store.receipt_destination().await,
            "receipt destination",
            || None,
        )
        .into_inner();
        let Some(destination) = destination else {
            self.sessions.clear(phone).await;
            self.say(phone, messages::RECEIPT_NO_DESTINATION).await;
            return;
        };

        let Some(attachment) = message.attachment.as_ref() else {
            self.sessions.set(phone, &Session::ComprovanteWait).await;
            let text = if waiting {
                messages::RECEIPT_MISSING_FILE_WAITING
            } else {
                messages::RECEIPT_MISSING_FILE
            };
            self.say(phone, text).await;
            return;
        };

        let file = OutboundFile {
            base64: attachment.base64.clone(),
            filename: attachment.filename.clone(),
            mime_type: attachment.mime_type.clone(),
            caption: messages::receipt_caption(transaction_id, phone.as_str()),
        };
        if let Err(e) = self.messenger.send_file(&destination, &file).await {
            tracing::warn!(%phone, transaction_id, error = %e, "receipt forwarding failed");
            self.say(phone, messages::RECEIPT_FORWARD_FAILED).await;
            return;
        }

        tracing::info!(%phone, transaction_id, filename = %file.filename, "receipt forwarded");
        self.say(phone, messages::RECEIPT_FORWARDED).await;
        if waiting {
            self.say(phone, &messages::menu()).await;
        }
        self.sessions.clear(phone).await;
    }

    async fn say(&self, phone: &Phone, text: &str) {
        if let Err(e) = self.messenger.send_text(phone.as_str(), text).await {
            tracing::warn!(%phone, error = %e, "outbound message not delivered");
        }
    }
}
