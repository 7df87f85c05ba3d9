//! PostgreSQL implementation of the store.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::models::{
    ClientRow, ContainerRow, ConversionReceipt, ItemRow, SessionRow, ShipmentRow, TransactionRow,
};
use super::{ItemFilter, Store};
use crate::domain::{
    Client, CoinTransaction, Container, ContainerId, ContainerItem, ContainerStatus, ItemOrigin,
    ItemStatus, Movement, Phone, Shipment, ShipmentStatus, StoredSession, TransactionKind,
    round_cents,
};
use crate::error::LudinhoError;

const ITEM_COLUMNS: &str = "SELECT ci.id, ci.container_id, ci.jogo_id, j.nome AS jogo_nome, \
     ci.origem, ci.status_item, ci.preco_aplicado_brl::float8 AS preco_aplicado_brl, ci.created_at \
     FROM container_itens ci LEFT JOIN jogos j ON j.id = ci.jogo_id \
     WHERE ci.container_id = $1";

const SHIPMENT_COLUMNS: &str = "SELECT id, container_id, telefone_cliente, nome_cliente, \
     status_envio, itens_snapshot_json, created_at FROM envios";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations (`migrations/`).
    ///
    /// # Errors
    ///
    /// Returns a [`LudinhoError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), LudinhoError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LudinhoError::PersistenceError(e.to_string()))
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn find_client(&self, phone: &Phone) -> Result<Option<Client>, LudinhoError> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT telefone, nome, opt_in, endereco, ludocoins_saldo::float8 AS ludocoins_saldo \
             FROM clientes WHERE telefone = $1",
        )
        .bind(phone.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Client::try_from).transpose()
    }

    async fn upsert_client_name(&self, phone: &Phone, name: &str) -> Result<(), LudinhoError> {
        sqlx::query(
            "INSERT INTO clientes (telefone, nome) VALUES ($1, $2) \
             ON CONFLICT (telefone) DO UPDATE SET nome = EXCLUDED.nome",
        )
        .bind(phone.as_str())
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn open_containers(&self, phone: &Phone) -> Result<Vec<Container>, LudinhoError> {
        let rows = sqlx::query_as::<_, ContainerRow>(
            "SELECT id, telefone_cliente, status, created_at, updated_at FROM containers \
             WHERE telefone_cliente = $1 AND status = $2 \
             ORDER BY updated_at DESC, created_at DESC",
        )
        .bind(phone.as_str())
        .bind(ContainerStatus::Aberto.as_ref())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Container::try_from).collect()
    }

    async fn container_has_items(&self, id: &ContainerId) -> Result<bool, LudinhoError> {
        let found = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM container_itens WHERE container_id = $1 LIMIT 1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn insert_container(&self, container: &Container) -> Result<(), LudinhoError> {
        sqlx::query(
            "INSERT INTO containers (id, telefone_cliente, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(container.id.as_str())
        .bind(container.client_phone.as_str())
        .bind(container.status.as_ref())
        .bind(container.created_at)
        .bind(container.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_container_status(
        &self,
        id: &ContainerId,
        status: ContainerStatus,
    ) -> Result<(), LudinhoError> {
        let result =
            sqlx::query("UPDATE containers SET status = $2, updated_at = now() WHERE id = $1")
                .bind(id.as_str())
                .bind(status.as_ref())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(LudinhoError::NotFound(format!("container {id}")));
        }
        Ok(())
    }

    async fn container_items(
        &self,
        id: &ContainerId,
        filter: ItemFilter,
    ) -> Result<Vec<ContainerItem>, LudinhoError> {
        let clause = match filter {
            ItemFilter::Visible => "ci.status_item <> $2",
            ItemFilter::Tradeable => "ci.origem = $3 AND ci.status_item IN ($2, $4)",
            ItemFilter::Shippable => "ci.status_item = $2",
        };
        let sql = format!("{ITEM_COLUMNS} AND {clause} ORDER BY ci.created_at ASC");

        let mut query = sqlx::query_as::<_, ItemRow>(&sql).bind(id.as_str());
        query = match filter {
            ItemFilter::Visible => query.bind(ItemStatus::Resgatado.to_string()),
            ItemFilter::Tradeable => query
                .bind(ItemStatus::Disponivel.to_string())
                .bind(ItemOrigin::Listinha.to_string())
                .bind(ItemStatus::PreVenda.to_string()),
            ItemFilter::Shippable => query.bind(ItemStatus::Disponivel.to_string()),
        };

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(ContainerItem::try_from).collect()
    }

    async fn move_items(
        &self,
        from: &ContainerId,
        to: &ContainerId,
        status: ItemStatus,
    ) -> Result<u64, LudinhoError> {
        let result = sqlx::query(
            "UPDATE container_itens SET container_id = $2, updated_at = now() \
             WHERE container_id = $1 AND status_item = $3",
        )
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(status.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_item_with_movement(
        &self,
        item: &ContainerItem,
        movement: &Movement,
    ) -> Result<(), LudinhoError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO container_itens \
             (id, container_id, jogo_id, origem, status_item, preco_aplicado_brl, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6::float8, $7)",
        )
        .bind(item.id)
        .bind(item.container_id.as_str())
        .bind(item.game_id)
        .bind(item.origin.as_ref())
        .bind(item.status.as_ref())
        .bind(item.applied_price)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO movimentos \
             (id, item_id, container_id, telefone_cliente, tipo, jogo_id, preco_brl, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7::float8, $8)",
        )
        .bind(movement.id)
        .bind(movement.item_id)
        .bind(movement.container_id.as_str())
        .bind(movement.client_phone.as_str())
        .bind(movement.kind.as_ref())
        .bind(movement.game_id)
        .bind(movement.price)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE containers SET updated_at = now() WHERE id = $1")
            .bind(item.container_id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn convert_item(
        &self,
        item_id: Uuid,
        operator: &str,
    ) -> Result<ConversionReceipt, LudinhoError> {
        let Json(receipt) = sqlx::query_scalar::<_, Json<ConversionReceipt>>(
            "SELECT convert_item_to_ludocoins($1, $2)",
        )
        .bind(item_id)
        .bind(operator)
        .fetch_one(&self.pool)
        .await?;
        Ok(receipt)
    }

    async fn record_ledger_entry(&self, entry: &CoinTransaction) -> Result<f64, LudinhoError> {
        let mut tx = self.pool.begin().await?;

        let balance = sqlx::query_scalar::<_, f64>(
            "SELECT ludocoins_saldo::float8 FROM clientes WHERE telefone = $1 FOR UPDATE",
        )
        .bind(entry.client_phone.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LudinhoError::NotFound(format!("client {}", entry.client_phone)))?;

        let new_balance = round_cents(balance + entry.signed_value());
        if entry.kind == TransactionKind::DebitoUtilizacao && new_balance < 0.0 {
            return Err(LudinhoError::InsufficientBalance {
                balance,
                requested: entry.value.abs(),
            });
        }

        sqlx::query(
            "INSERT INTO ludocoin_transacoes \
             (id, telefone_cliente, tipo, valor, item_id, atendente, observacao, created_at) \
             VALUES ($1, $2, $3, $4::float8, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(entry.client_phone.as_str())
        .bind(entry.kind.as_ref())
        .bind(entry.value)
        .bind(entry.item_id)
        .bind(entry.operator.as_deref())
        .bind(entry.note.as_deref())
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE clientes SET ludocoins_saldo = $2::float8 WHERE telefone = $1")
            .bind(entry.client_phone.as_str())
            .bind(new_balance)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(new_balance)
    }

    async fn recent_transactions(
        &self,
        phone: &Phone,
        limit: u32,
    ) -> Result<Vec<CoinTransaction>, LudinhoError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, telefone_cliente, tipo, valor::float8 AS valor, item_id, atendente, \
             observacao, created_at FROM ludocoin_transacoes \
             WHERE telefone_cliente = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(phone.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CoinTransaction::try_from).collect()
    }

    async fn find_active_shipment(
        &self,
        container_id: &ContainerId,
    ) -> Result<Option<Shipment>, LudinhoError> {
        let sql = format!(
            "{SHIPMENT_COLUMNS} WHERE container_id = $1 AND status_envio IN ($2, $3) \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, ShipmentRow>(&sql)
            .bind(container_id.as_str())
            .bind(ShipmentStatus::Pendente.as_ref())
            .bind(ShipmentStatus::EmPreparacao.as_ref())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Shipment::try_from).transpose()
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<Shipment, LudinhoError> {
        let row = sqlx::query_as::<_, ShipmentRow>(
            "INSERT INTO envios \
             (id, container_id, telefone_cliente, nome_cliente, status_envio, itens_snapshot_json, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, container_id, telefone_cliente, nome_cliente, status_envio, \
             itens_snapshot_json, created_at",
        )
        .bind(shipment.id)
        .bind(shipment.container_id.as_str())
        .bind(shipment.client_phone.as_str())
        .bind(shipment.client_name.as_str())
        .bind(shipment.status.as_ref())
        .bind(Json(&shipment.items_snapshot))
        .bind(shipment.created_at)
        .fetch_one(&self.pool)
        .await?;

        Shipment::try_from(row)
    }

    async fn load_session(&self, phone: &Phone) -> Result<Option<StoredSession>, LudinhoError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT telefone, state, data, updated_at FROM chat_states WHERE telefone = $1",
        )
        .bind(phone.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredSession::try_from).transpose()
    }

    async fn save_session(&self, session: &StoredSession) -> Result<(), LudinhoError> {
        sqlx::query(
            "INSERT INTO chat_states (telefone, state, data, updated_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (telefone) DO UPDATE \
             SET state = EXCLUDED.state, data = EXCLUDED.data, updated_at = EXCLUDED.updated_at",
        )
        .bind(session.phone.as_str())
        .bind(session.state.as_str())
        .bind(&session.payload)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_session(&self, phone: &Phone) -> Result<(), LudinhoError> {
        sqlx::query("DELETE FROM chat_states WHERE telefone = $1")
            .bind(phone.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn receipt_destination(&self) -> Result<Option<String>, LudinhoError> {
        let number = sqlx::query_scalar::<_, Option<String>>(
            "SELECT numero_recebimento_comprovantes FROM configuracoes WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?
        .flatten()
        .filter(|n| !n.trim().is_empty());
        Ok(number)
    }
}
