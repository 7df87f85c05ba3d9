//! Database row models and their conversion into domain entities.
//!
//! Column names follow the production schema (Portuguese, shared with the
//! staff dashboard). Money columns are `NUMERIC(12,2)` and are selected as
//! `::float8`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{
    Client, CoinTransaction, Container, ContainerId, ContainerItem, ItemSnapshot, Phone, Shipment,
    StoredSession,
};
use crate::error::LudinhoError;

/// Answer of the `convert_item_to_ludocoins` procedure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversionReceipt {
    /// `false` when the item was missing or already redeemed.
    pub ok: bool,
    /// Item the call was about.
    pub item_id: Uuid,
    /// Credit actually applied.
    #[serde(default, rename = "credito")]
    pub credited: Option<f64>,
    /// Client balance after the credit.
    #[serde(default, rename = "saldo")]
    pub balance: Option<f64>,
}

fn phone_column(raw: &str) -> Result<Phone, LudinhoError> {
    Phone::normalize(raw)
        .ok_or_else(|| LudinhoError::PersistenceError(format!("invalid phone in row: {raw:?}")))
}

fn label<T: FromStr>(raw: &str, column: &str) -> Result<T, LudinhoError> {
    raw.parse()
        .map_err(|_| LudinhoError::PersistenceError(format!("unknown {column} label: {raw:?}")))
}

/// A row of `clientes`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    /// Phone key.
    pub telefone: String,
    /// Display name.
    pub nome: Option<String>,
    /// Marketing opt-in.
    pub opt_in: Option<bool>,
    /// Delivery address.
    pub endereco: Option<String>,
    /// Cached balance.
    pub ludocoins_saldo: f64,
}

impl TryFrom<ClientRow> for Client {
    type Error = LudinhoError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        Ok(Self {
            phone: phone_column(&row.telefone)?,
            name: row.nome,
            opt_in: row.opt_in.unwrap_or(false),
            address: row.endereco,
            ludocoin_balance: row.ludocoins_saldo,
        })
    }
}

/// A row of `containers`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContainerRow {
    /// Container id.
    pub id: String,
    /// Owner phone.
    pub telefone_cliente: String,
    /// Status label.
    pub status: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContainerRow> for Container {
    type Error = LudinhoError;

    fn try_from(row: ContainerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ContainerId::new(row.id),
            client_phone: phone_column(&row.telefone_cliente)?,
            status: label(&row.status, "container status")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row of `container_itens` joined with `jogos.nome`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    /// Item id.
    pub id: Uuid,
    /// Holding container.
    pub container_id: String,
    /// Product id.
    pub jogo_id: Uuid,
    /// Product name from the join.
    pub jogo_nome: Option<String>,
    /// Origin label.
    pub origem: String,
    /// Status label.
    pub status_item: String,
    /// Applied price.
    pub preco_aplicado_brl: f64,
    /// Intake time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for ContainerItem {
    type Error = LudinhoError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            container_id: ContainerId::new(row.container_id),
            game_id: row.jogo_id,
            game_name: row.jogo_nome,
            origin: label(&row.origem, "item origin")?,
            status: label(&row.status_item, "item status")?,
            applied_price: row.preco_aplicado_brl,
            created_at: row.created_at,
        })
    }
}

/// A row of `ludocoin_transacoes`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    /// Entry id.
    pub id: Uuid,
    /// Client phone.
    pub telefone_cliente: String,
    /// Kind label.
    pub tipo: String,
    /// Value as written.
    pub valor: f64,
    /// Originating item.
    pub item_id: Option<Uuid>,
    /// Operator identity.
    pub atendente: Option<String>,
    /// Note.
    pub observacao: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for CoinTransaction {
    type Error = LudinhoError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            client_phone: phone_column(&row.telefone_cliente)?,
            kind: label(&row.tipo, "transaction kind")?,
            value: row.valor,
            item_id: row.item_id,
            operator: row.atendente,
            note: row.observacao,
            created_at: row.created_at,
        })
    }
}

/// A row of `envios`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShipmentRow {
    /// Shipment id.
    pub id: Uuid,
    /// Source container.
    pub container_id: String,
    /// Client phone.
    pub telefone_cliente: String,
    /// Client name.
    pub nome_cliente: Option<String>,
    /// Status label.
    pub status_envio: String,
    /// Item snapshot.
    pub itens_snapshot_json: Json<Vec<ItemSnapshot>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = LudinhoError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            container_id: ContainerId::new(row.container_id),
            client_phone: phone_column(&row.telefone_cliente)?,
            client_name: row.nome_cliente.unwrap_or_default(),
            status: label(&row.status_envio, "shipment status")?,
            items_snapshot: row.itens_snapshot_json.0,
            created_at: row.created_at,
        })
    }
}

/// A row of `chat_states`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    /// Phone key.
    pub telefone: String,
    /// State name.
    pub state: String,
    /// Payload.
    pub data: Option<serde_json::Value>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for StoredSession {
    type Error = LudinhoError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            phone: phone_column(&row.telefone)?,
            state: row.state,
            payload: row.data.unwrap_or(serde_json::Value::Null),
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ItemOrigin, ItemStatus};

    #[test]
    fn receipt_parses_procedure_json() {
        let id = Uuid::new_v4();
        let json = serde_json::json!({"ok": true, "item_id": id, "credito": 85.0, "saldo": 120.5});
        let Ok(receipt) = serde_json::from_value::<ConversionReceipt>(json) else {
            panic!("receipt should parse");
        };
        assert!(receipt.ok);
        assert_eq!(receipt.credited, Some(85.0));
        assert_eq!(receipt.balance, Some(120.5));
    }

    #[test]
    fn rejected_receipt_has_no_amounts() {
        let json = serde_json::json!({"ok": false, "item_id": Uuid::new_v4()});
        let Ok(receipt) = serde_json::from_value::<ConversionReceipt>(json) else {
            panic!("receipt should parse");
        };
        assert!(!receipt.ok);
        assert!(receipt.credited.is_none());
    }

    #[test]
    fn item_row_converts_labels() {
        let row = ItemRow {
            id: Uuid::new_v4(),
            container_id: "5511-ABCDEF".to_string(),
            jogo_id: Uuid::new_v4(),
            jogo_nome: Some("Catan".to_string()),
            origem: "LISTINHA".to_string(),
            status_item: "PRE-VENDA".to_string(),
            preco_aplicado_brl: 100.0,
            created_at: Utc::now(),
        };
        let Ok(item) = ContainerItem::try_from(row) else {
            panic!("row should convert");
        };
        assert_eq!(item.origin, ItemOrigin::Listinha);
        assert_eq!(item.status, ItemStatus::PreVenda);
    }

    #[test]
    fn unknown_label_is_a_persistence_error() {
        let row = ContainerRow {
            id: "x".to_string(),
            telefone_cliente: "5511".to_string(),
            status: "PERDIDO".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            Container::try_from(row),
            Err(LudinhoError::PersistenceError(_))
        ));
    }
}
