//! LudoCoin service: trade-in conversion and the coin ledger.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{CONVERSION_RATE, CoinTransaction, Phone, TransactionKind, round_cents};
use crate::error::LudinhoError;
use crate::persistence::Store;

/// Result of a successful trade-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Converted item.
    pub item_id: Uuid,
    /// Credit applied by the store.
    pub credited: f64,
    /// Client balance after the credit.
    pub balance: f64,
}

/// Credit shown to the client before a conversion.
///
/// Preview only; the authoritative credit is computed by the store's
/// conversion procedure.
#[must_use]
pub fn credit_preview(applied_price: f64) -> f64 {
    round_cents(applied_price * CONVERSION_RATE)
}

/// Ledger operations for one client at a time.
#[derive(Debug, Clone)]
pub struct LudoCoinService {
    store: Arc<dyn Store>,
}

impl LudoCoinService {
    /// Creates a new `LudoCoinService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Converts one item into LudoCoins through the store's atomic
    /// procedure. Called exactly once per item.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::ItemNotEligible`] when the procedure refuses
    /// the item, or [`LudinhoError::PersistenceError`] if the call fails.
    pub async fn convert_item(
        &self,
        item_id: Uuid,
        operator: &str,
    ) -> Result<Conversion, LudinhoError> {
        let receipt = self.store.convert_item(item_id, operator).await?;
        if !receipt.ok {
            return Err(LudinhoError::ItemNotEligible(item_id));
        }
        let conversion = Conversion {
            item_id,
            credited: receipt.credited.unwrap_or_default(),
            balance: receipt.balance.unwrap_or_default(),
        };
        tracing::info!(
            %item_id,
            operator,
            credited = conversion.credited,
            balance = conversion.balance,
            "item converted to ludocoins"
        );
        Ok(conversion)
    }

    /// Current cached balance; zero when the client is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::PersistenceError`] if the lookup fails.
    pub async fn balance(&self, phone: &Phone) -> Result<f64, LudinhoError> {
        Ok(self
            .store
            .find_client(phone)
            .await?
            .map_or(0.0, |c| c.ludocoin_balance))
    }

    /// Latest ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::PersistenceError`] if the lookup fails.
    pub async fn recent_transactions(
        &self,
        phone: &Phone,
        limit: u32,
    ) -> Result<Vec<CoinTransaction>, LudinhoError> {
        self.store.recent_transactions(phone, limit).await
    }

    /// Spends `amount` coins. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::InvalidRequest`] for a non-positive amount,
    /// [`LudinhoError::InsufficientBalance`] if the balance would go
    /// negative, and [`LudinhoError::NotFound`] for an unknown client.
    pub async fn debit(
        &self,
        phone: &Phone,
        amount: f64,
        operator: Option<&str>,
        note: Option<&str>,
    ) -> Result<f64, LudinhoError> {
        let amount = round_cents(amount);
        if !amount.is_finite() || amount <= 0.0 {
            return Err(LudinhoError::InvalidRequest(format!(
                "debit amount must be positive, got {amount}"
            )));
        }
        self.record(phone, TransactionKind::DebitoUtilizacao, amount, operator, note)
            .await
    }

    /// Applies a signed manual adjustment. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::InvalidRequest`] for a zero or non-finite
    /// delta and [`LudinhoError::NotFound`] for an unknown client.
    pub async fn adjust(
        &self,
        phone: &Phone,
        delta: f64,
        operator: Option<&str>,
        note: Option<&str>,
    ) -> Result<f64, LudinhoError> {
        let delta = round_cents(delta);
        if !delta.is_finite() || delta == 0.0 {
            return Err(LudinhoError::InvalidRequest(format!(
                "adjustment must be non-zero, got {delta}"
            )));
        }
        self.record(phone, TransactionKind::Ajuste, delta, operator, note)
            .await
    }

    async fn record(
        &self,
        phone: &Phone,
        kind: TransactionKind,
        value: f64,
        operator: Option<&str>,
        note: Option<&str>,
    ) -> Result<f64, LudinhoError> {
        let entry = CoinTransaction {
            id: Uuid::new_v4(),
            client_phone: phone.clone(),
            kind,
            value,
            item_id: None,
            operator: operator.map(str::to_string),
            note: note.map(str::to_string),
            created_at: Utc::now(),
        };
        let balance = self.store.record_ledger_entry(&entry).await?;
        tracing::info!(%phone, kind = %kind, value, balance, "ledger entry recorded");
        Ok(balance)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Client, ItemOrigin, ItemStatus};
    use crate::persistence::InMemoryStore;
    use crate::service::ContainerService;

    fn phone() -> Phone {
        let Some(p) = Phone::normalize("5521912345678") else {
            panic!("valid phone");
        };
        p
    }

    fn ledger_sum(entries: &[CoinTransaction]) -> f64 {
        round_cents(entries.iter().map(CoinTransaction::signed_value).sum())
    }

    #[test]
    fn preview_is_85_percent_rounded() {
        assert!((credit_preview(100.0) - 85.0).abs() < f64::EPSILON);
        assert!((credit_preview(12.34) - 10.49).abs() < 1e-9);
    }

    #[tokio::test]
    async fn conversion_credits_once_and_keeps_ledger_in_sync() {
        let store = Arc::new(InMemoryStore::new());
        let coins = LudoCoinService::new(Arc::clone(&store) as Arc<dyn Store>);
        let containers = ContainerService::new(Arc::clone(&store) as Arc<dyn Store>);
        let game = store.seed_game("Catan", 100.0).await;
        let Ok(item) = containers
            .take_in_item(&phone(), game, ItemOrigin::Listinha, ItemStatus::Disponivel, 100.0)
            .await
        else {
            panic!("intake should succeed");
        };

        let Ok(conversion) = coins.convert_item(item.id, "bot").await else {
            panic!("conversion should succeed");
        };
        assert!((conversion.credited - 85.0).abs() < f64::EPSILON);
        assert!((conversion.balance - 85.0).abs() < f64::EPSILON);

        assert!(matches!(
            coins.convert_item(item.id, "bot").await,
            Err(LudinhoError::ItemNotEligible(_))
        ));

        let entries = store.ledger_of(&phone()).await;
        assert_eq!(entries.len(), 1);
        let Ok(balance) = coins.balance(&phone()).await else {
            panic!("balance should load");
        };
        assert!((balance - ledger_sum(&entries)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn debit_and_adjust_respect_the_invariant() {
        let store = Arc::new(InMemoryStore::new());
        let coins = LudoCoinService::new(Arc::clone(&store) as Arc<dyn Store>);
        store.seed_client(Client::onboarded(phone(), "Bia")).await;

        let Ok(after_adjust) = coins.adjust(&phone(), 40.0, Some("staff"), Some("bonus")).await
        else {
            panic!("adjust should succeed");
        };
        assert!((after_adjust - 40.0).abs() < f64::EPSILON);

        let Ok(after_debit) = coins.debit(&phone(), 15.5, None, None).await else {
            panic!("debit should succeed");
        };
        assert!((after_debit - 24.5).abs() < 1e-9);

        assert!(matches!(
            coins.debit(&phone(), 100.0, None, None).await,
            Err(LudinhoError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            coins.debit(&phone(), 0.0, None, None).await,
            Err(LudinhoError::InvalidRequest(_))
        ));

        let entries = store.ledger_of(&phone()).await;
        assert_eq!(entries.len(), 2);
        assert!((ledger_sum(&entries) - 24.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_client_has_zero_balance() {
        let store = Arc::new(InMemoryStore::new());
        let coins = LudoCoinService::new(store as Arc<dyn Store>);
        let Ok(balance) = coins.balance(&phone()).await else {
            panic!("balance should load");
        };
        assert!(balance.abs() < f64::EPSILON);
    }
}
