//! Stock ledger service: every write that touches stock rows goes through
//! here, together with the moves that explain it.
//!
//! The rows a write reads are loaded with their versions. The decision is
//! made on that snapshot, then the document, the rows and the moves are
//! committed as one batch whose version checks fail if any row changed in
//! between. Two deliveries racing for the same product therefore cannot
//! both spend the same quantity: the loser re-reads and re-decides.

use std::collections::BTreeMap;

use chrono::Utc;

use stockroom_catalog::Product;
use stockroom_core::{Aggregate, DomainError, Entity, ProductId, UserId};
use stockroom_inventory::{
    MoveContext, MovementType, ReceiveStock, SetStockLevels, Stock, StockCommand, StockEvent,
    StockMove,
};
use stockroom_operations::{Settle, Settlement, StockBook};

use crate::command_dispatcher::{DispatchError, MAX_ATTEMPTS, should_retry};
use crate::store::{Document, Documents, StoreError, WriteBatch};

#[derive(Debug, Clone)]
pub struct StockLedger {
    docs: Documents,
    max_attempts: u32,
}

fn manual_context(actor: UserId) -> MoveContext {
    MoveContext {
        movement_type: MovementType::Manual,
        reference: None,
        location_id: None,
        actor,
    }
}

fn record_moves(events: &[StockEvent], context: &MoveContext) -> Vec<StockMove> {
    events
        .iter()
        .filter(|e| e.quantity_delta() != 0)
        .map(|e| StockMove::record(e, context))
        .collect()
}

impl StockLedger {
    pub fn new(docs: Documents) -> Self {
        Self {
            docs,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub async fn stock(&self, product_id: ProductId) -> Result<Option<Stock>, StoreError> {
        Ok(self.docs.get::<Stock>(product_id).await?.map(|v| v.into_inner()))
    }

    pub async fn all_stock(&self) -> Result<Vec<Stock>, StoreError> {
        Ok(self
            .docs
            .list::<Stock>()
            .await?
            .into_iter()
            .map(|v| v.into_inner())
            .collect())
    }

    /// Stock moves, newest first, optionally for one product.
    pub async fn moves(&self, product_id: Option<ProductId>) -> Result<Vec<StockMove>, StoreError> {
        Ok(self
            .docs
            .list::<StockMove>()
            .await?
            .into_iter()
            .map(|v| v.into_inner())
            .filter(|m| product_id.is_none_or(|p| m.product_id() == p))
            .collect())
    }

    /// Current rows of the given products and the versions they were read at.
    async fn load_book(
        &self,
        products: &[ProductId],
    ) -> Result<(StockBook, BTreeMap<ProductId, u64>), StoreError> {
        let mut rows = Vec::with_capacity(products.len());
        let mut versions = BTreeMap::new();
        for product_id in products {
            if let Some(row) = self.docs.get::<Stock>(*product_id).await? {
                versions.insert(*product_id, row.version);
                rows.push(row.value);
            }
        }
        Ok((StockBook::new(rows), versions))
    }

    /// Complete a document and apply its stock effect in one atomic batch.
    pub async fn validate<D>(&self, id: D::Id, actor: UserId) -> Result<Settlement<D>, DispatchError>
    where
        D: Settle + Document,
    {
        let mut attempt = 1;
        loop {
            let current = self
                .docs
                .get::<D>(id)
                .await?
                .ok_or_else(|| DomainError::not_found(D::LABEL))?;

            let mut products = current.value.stock_products();
            products.sort();
            products.dedup();
            let (book, versions) = self.load_book(&products).await?;

            let settlement = current.value.settle(book, actor, Utc::now())?;

            let mut batch = WriteBatch::new();
            batch.update(&settlement.document, current.expected())?;
            for stock in &settlement.stocks {
                batch.upsert(stock, versions.get(&stock.product_id()).copied())?;
            }
            for stock_move in &settlement.moves {
                batch.insert(stock_move)?;
            }

            match self.docs.commit(batch).await {
                Ok(()) => {
                    tracing::info!(
                        collection = D::COLLECTION,
                        %id,
                        %actor,
                        rows = settlement.stocks.len(),
                        moves = settlement.moves.len(),
                        "document validated"
                    );
                    return Ok(settlement);
                }
                Err(e) if should_retry(&e, attempt, self.max_attempts) => {
                    tracing::debug!(collection = D::COLLECTION, %id, attempt, "retrying validation: {e}");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Set the levels of a product's row directly (find-or-create). A change
    /// of the on-hand quantity is recorded as a manual move.
    pub async fn set_levels(
        &self,
        product_id: ProductId,
        quantity: Option<i64>,
        free_to_use: Option<i64>,
        actor: UserId,
    ) -> Result<Stock, DispatchError> {
        let mut attempt = 1;
        loop {
            let (mut stock, version) = match self.docs.get::<Stock>(product_id).await? {
                Some(row) => (row.value, Some(row.version)),
                None => (Stock::empty(product_id), None),
            };

            let events = stock.execute(&StockCommand::SetLevels(SetStockLevels {
                product_id,
                quantity,
                free_to_use,
                occurred_at: Utc::now(),
            }))?;
            if events.is_empty() && version.is_some() {
                return Ok(stock);
            }

            let mut batch = WriteBatch::new();
            batch.upsert(&stock, version)?;
            for stock_move in record_moves(&events, &manual_context(actor)) {
                batch.insert(&stock_move)?;
            }

            match self.docs.commit(batch).await {
                Ok(()) => {
                    tracing::info!(
                        %product_id,
                        quantity = stock.quantity(),
                        free_to_use = stock.free_to_use(),
                        "stock levels set"
                    );
                    return Ok(stock);
                }
                Err(e) if should_retry(&e, attempt, self.max_attempts) => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Persist a new product and, when it carries an initial stock, open its
    /// row with a manual move in the same batch.
    pub async fn open_product(&self, product: &Product, actor: UserId) -> Result<Option<Stock>, DispatchError> {
        let mut batch = WriteBatch::new();
        batch.insert(product)?;

        let mut opened = None;
        if product.initial_stock() > 0 {
            let mut stock = Stock::empty(product.id());
            let events = stock.execute(&StockCommand::Receive(ReceiveStock {
                product_id: product.id(),
                quantity: product.initial_stock(),
                occurred_at: Utc::now(),
            }))?;
            batch.insert(&stock)?;
            for stock_move in record_moves(&events, &manual_context(actor)) {
                batch.insert(&stock_move)?;
            }
            opened = Some(stock);
        }

        self.docs.commit(batch).await?;
        tracing::info!(product_id = %product.id(), sku = product.sku(), "product created");
        Ok(opened)
    }
}
