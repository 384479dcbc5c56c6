//! Stock settlement of validated documents.
//!
//! Settling is pure: it works on a snapshot of the affected stock rows and
//! either returns every change at once or fails without touching anything.
//! Lines of the same product are checked against the running balance, so a
//! document can never be half-applied.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use stockroom_core::{Aggregate, DomainError, DomainResult, Entity, ProductId, UserId};
use stockroom_inventory::{
    AdjustStock, DocumentRef, IssueStock, MoveContext, MovementType, ReceiveStock, Stock,
    StockCommand, StockMove,
};

use crate::adjustment::{Adjustment, AdjustmentCommand, ValidateAdjustment};
use crate::delivery::{Delivery, DeliveryCommand};
use crate::receipt::{Receipt, ReceiptCommand};
use crate::status::Complete;

/// Snapshot of the stock rows a settlement may touch.
#[derive(Debug, Clone, Default)]
pub struct StockBook {
    rows: BTreeMap<ProductId, Stock>,
    touched: BTreeSet<ProductId>,
}

impl StockBook {
    pub fn new(rows: impl IntoIterator<Item = Stock>) -> Self {
        Self {
            rows: rows.into_iter().map(|s| (s.product_id(), s)).collect(),
            touched: BTreeSet::new(),
        }
    }

    pub fn get(&self, product_id: ProductId) -> Option<&Stock> {
        self.rows.get(&product_id)
    }

    /// Find-or-create the row of a product and mark it as touched.
    fn row(&mut self, product_id: ProductId) -> &mut Stock {
        self.touched.insert(product_id);
        self.rows
            .entry(product_id)
            .or_insert_with(|| Stock::empty(product_id))
    }

    fn execute(
        &mut self,
        product_id: ProductId,
        command: StockCommand,
        context: &MoveContext,
        moves: &mut Vec<StockMove>,
    ) -> DomainResult<()> {
        let events = self.row(product_id).execute(&command)?;
        moves.extend(events.iter().map(|e| StockMove::record(e, context)));
        Ok(())
    }

    /// The rows that changed, in product order.
    pub fn into_touched(mut self) -> Vec<Stock> {
        self.touched
            .iter()
            .filter_map(|id| self.rows.remove(id))
            .collect()
    }
}

/// Everything a validation writes, decided up front.
#[derive(Debug, Clone)]
pub struct Settlement<D> {
    pub document: D,
    pub stocks: Vec<Stock>,
    pub moves: Vec<StockMove>,
}

/// A document whose validation settles against the stock ledger.
pub trait Settle: Aggregate<Error = DomainError> + Sized {
    /// Products whose stock rows the settlement reads.
    fn stock_products(&self) -> Vec<ProductId>;

    /// Complete the document and apply its effect to the given rows.
    fn settle(&self, book: StockBook, actor: UserId, at: DateTime<Utc>)
    -> DomainResult<Settlement<Self>>;
}

fn reference(id: impl Into<uuid::Uuid>, number: &str) -> Option<DocumentRef> {
    Some(DocumentRef {
        id: id.into(),
        number: number.to_string(),
    })
}

impl Settle for Receipt {
    fn stock_products(&self) -> Vec<ProductId> {
        self.lines().iter().map(|l| l.product_id).collect()
    }

    fn settle(
        &self,
        mut book: StockBook,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Settlement<Self>> {
        let mut document = self.clone();
        document.execute(&ReceiptCommand::Complete(Complete {
            validated_by: actor,
            occurred_at: at,
        }))?;

        let context = MoveContext {
            movement_type: MovementType::Receipt,
            reference: reference(self.id(), self.number()),
            location_id: self.location_id(),
            actor,
        };
        let mut moves = Vec::with_capacity(self.lines().len());
        for line in self.lines() {
            let command = StockCommand::Receive(ReceiveStock {
                product_id: line.product_id,
                quantity: line.quantity,
                occurred_at: at,
            });
            book.execute(line.product_id, command, &context, &mut moves)?;
        }

        Ok(Settlement {
            document,
            stocks: book.into_touched(),
            moves,
        })
    }
}

impl Settle for Delivery {
    fn stock_products(&self) -> Vec<ProductId> {
        self.lines().iter().map(|l| l.product_id).collect()
    }

    fn settle(
        &self,
        mut book: StockBook,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Settlement<Self>> {
        let mut document = self.clone();
        document.execute(&DeliveryCommand::Complete(Complete {
            validated_by: actor,
            occurred_at: at,
        }))?;

        let context = MoveContext {
            movement_type: MovementType::Delivery,
            reference: reference(self.id(), self.number()),
            location_id: self.location_id(),
            actor,
        };
        let mut moves = Vec::with_capacity(self.lines().len());
        for line in self.lines() {
            let command = StockCommand::Issue(IssueStock {
                product_id: line.product_id,
                quantity: line.quantity,
                occurred_at: at,
            });
            book.execute(line.product_id, command, &context, &mut moves)?;
        }

        Ok(Settlement {
            document,
            stocks: book.into_touched(),
            moves,
        })
    }
}

impl Settle for Adjustment {
    fn stock_products(&self) -> Vec<ProductId> {
        vec![self.product_id()]
    }

    fn settle(
        &self,
        mut book: StockBook,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Settlement<Self>> {
        let mut document = self.clone();
        document.execute(&AdjustmentCommand::Validate(ValidateAdjustment {
            validated_by: actor,
            occurred_at: at,
        }))?;

        let context = MoveContext {
            movement_type: MovementType::Adjustment,
            reference: reference(self.id(), self.number()),
            location_id: self.location_id(),
            actor,
        };
        let mut moves = Vec::new();
        let command = StockCommand::Adjust(AdjustStock {
            product_id: self.product_id(),
            delta: self.difference(),
            occurred_at: at,
        });
        book.execute(self.product_id(), command, &context, &mut moves)?;

        Ok(Settlement {
            document,
            stocks: book.into_touched(),
            moves,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjustment::{AdjustmentReason, CreateAdjustment};
    use crate::delivery::CreateDelivery;
    use crate::line::AddLine;
    use crate::receipt::CreateReceipt;
    use crate::status::DocumentStatus;
    use stockroom_core::{AdjustmentId, DeliveryId, LineId, PartyId, ReceiptId};

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn add_line(product_id: ProductId, quantity: i64) -> AddLine {
        AddLine {
            line_id: LineId::new(),
            product_id,
            quantity,
            unit_price: None,
            occurred_at: test_time(),
        }
    }

    fn receipt_with(lines: &[(ProductId, i64)]) -> Receipt {
        let mut receipt = Receipt::create(CreateReceipt {
            receipt_id: ReceiptId::new(),
            number: "WH/IN/0001".to_string(),
            supplier_id: PartyId::new(),
            location_id: None,
            scheduled_date: None,
            notes: None,
            created_by: UserId::new(),
            occurred_at: test_time(),
        });
        for (product_id, quantity) in lines {
            receipt
                .execute(&ReceiptCommand::AddLine(add_line(*product_id, *quantity)))
                .unwrap();
        }
        receipt
    }

    fn delivery_with(lines: &[(ProductId, i64)]) -> Delivery {
        let mut delivery = Delivery::create(CreateDelivery {
            delivery_id: DeliveryId::new(),
            number: "WH/OUT/0001".to_string(),
            customer_id: PartyId::new(),
            location_id: None,
            scheduled_date: None,
            notes: None,
            created_by: UserId::new(),
            occurred_at: test_time(),
        });
        for (product_id, quantity) in lines {
            delivery
                .execute(&DeliveryCommand::AddLine(add_line(*product_id, *quantity)))
                .unwrap();
        }
        delivery
    }

    fn stocked(product_id: ProductId, quantity: i64) -> Stock {
        let mut stock = Stock::empty(product_id);
        stock
            .execute(&StockCommand::Receive(ReceiveStock {
                product_id,
                quantity,
                occurred_at: test_time(),
            }))
            .unwrap();
        stock
    }

    #[test]
    fn receipt_creates_missing_rows_and_adds_quantity() {
        let product = ProductId::new();
        let receipt = receipt_with(&[(product, 10)]);

        let settlement = receipt
            .settle(StockBook::default(), UserId::new(), test_time())
            .unwrap();

        assert_eq!(settlement.document.status(), DocumentStatus::Done);
        assert_eq!(settlement.stocks.len(), 1);
        assert_eq!(settlement.stocks[0].quantity(), 10);
        assert_eq!(settlement.stocks[0].free_to_use(), 10);
        assert_eq!(settlement.moves.len(), 1);
        assert_eq!(settlement.moves[0].movement_type(), MovementType::Receipt);
        assert_eq!(
            settlement.moves[0].reference().map(|r| r.number.as_str()),
            Some("WH/IN/0001")
        );
    }

    #[test]
    fn receipt_sums_repeated_products() {
        let product = ProductId::new();
        let receipt = receipt_with(&[(product, 4), (product, 6)]);

        let settlement = receipt
            .settle(StockBook::new([stocked(product, 5)]), UserId::new(), test_time())
            .unwrap();
        assert_eq!(settlement.stocks.len(), 1);
        assert_eq!(settlement.stocks[0].quantity(), 15);
        assert_eq!(settlement.moves.len(), 2);
    }

    #[test]
    fn delivery_beyond_stock_is_rejected() {
        let product = ProductId::new();
        let delivery = delivery_with(&[(product, 5)]);

        let err = delivery
            .settle(StockBook::new([stocked(product, 3)]), UserId::new(), test_time())
            .unwrap_err();
        match err {
            DomainError::InsufficientStock {
                requested: 5,
                available: 3,
                ..
            } => {}
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn delivery_checks_running_balance_across_lines() {
        // Each line alone fits; together they over-draw. The first line must
        // not be applied on its own.
        let product = ProductId::new();
        let delivery = delivery_with(&[(product, 3), (product, 3)]);

        let book = StockBook::new([stocked(product, 5)]);
        let err = delivery
            .settle(book.clone(), UserId::new(), test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(book.get(product).map(Stock::quantity), Some(5));
    }

    #[test]
    fn delivery_with_a_failing_later_line_applies_nothing() {
        let ok_product = ProductId::new();
        let short_product = ProductId::new();
        let delivery = delivery_with(&[(ok_product, 2), (short_product, 9)]);

        let book = StockBook::new([stocked(ok_product, 10), stocked(short_product, 1)]);
        assert!(delivery.settle(book.clone(), UserId::new(), test_time()).is_err());
        assert_eq!(book.get(ok_product).map(Stock::quantity), Some(10));
        assert_eq!(book.get(short_product).map(Stock::quantity), Some(1));
    }

    #[test]
    fn delivery_decrements_and_records_outgoing_moves() {
        let product = ProductId::new();
        let delivery = delivery_with(&[(product, 4)]);

        let settlement = delivery
            .settle(StockBook::new([stocked(product, 10)]), UserId::new(), test_time())
            .unwrap();
        assert_eq!(settlement.stocks[0].quantity(), 6);
        assert_eq!(settlement.moves[0].quantity(), -4);
    }

    fn adjustment(product_id: ProductId, system: i64, counted: i64) -> Adjustment {
        Adjustment::create(CreateAdjustment {
            adjustment_id: AdjustmentId::new(),
            number: "ADJ/0001".to_string(),
            product_id,
            location_id: None,
            system_quantity: system,
            counted_quantity: counted,
            reason: AdjustmentReason::Correction,
            notes: None,
            created_by: UserId::new(),
            occurred_at: test_time(),
        })
        .unwrap()
    }

    #[test]
    fn adjustment_applies_difference() {
        let product = ProductId::new();
        let settlement = adjustment(product, 10, 7)
            .settle(StockBook::new([stocked(product, 10)]), UserId::new(), test_time())
            .unwrap();
        assert_eq!(settlement.stocks[0].quantity(), 7);
        assert!(settlement.document.is_validated());
    }

    #[test]
    fn adjustment_on_missing_row_starts_from_zero() {
        let product = ProductId::new();
        let settlement = adjustment(product, 0, 4)
            .settle(StockBook::default(), UserId::new(), test_time())
            .unwrap();
        assert_eq!(settlement.stocks[0].quantity(), 4);

        let err = adjustment(product, 5, 0)
            .settle(StockBook::default(), UserId::new(), test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn settled_documents_cannot_settle_again() {
        let product = ProductId::new();
        let receipt = receipt_with(&[(product, 1)]);
        let settlement = receipt
            .settle(StockBook::default(), UserId::new(), test_time())
            .unwrap();

        let err = settlement
            .document
            .settle(StockBook::new(settlement.stocks.clone()), UserId::new(), test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: a receipt adds exactly the sum of its line
            /// quantities to each product's quantity and free-to-use.
            #[test]
            fn receipt_adds_line_totals(
                quantities in prop::collection::vec((0usize..3, 1i64..1_000), 1..12),
                opening in 0i64..1_000
            ) {
                let products = [ProductId::new(), ProductId::new(), ProductId::new()];
                let lines: Vec<(ProductId, i64)> =
                    quantities.iter().map(|(i, q)| (products[*i], *q)).collect();
                let receipt = receipt_with(&lines);

                let rows: Vec<Stock> = if opening > 0 {
                    products.iter().map(|p| stocked(*p, opening)).collect()
                } else {
                    Vec::new()
                };
                let settlement = receipt
                    .settle(StockBook::new(rows), UserId::new(), test_time())
                    .unwrap();

                let totals = crate::line::totals_by_product(receipt.lines());
                for stock in &settlement.stocks {
                    let added = totals.get(&stock.product_id()).copied().unwrap_or(0);
                    prop_assert_eq!(stock.quantity(), opening + added);
                    prop_assert_eq!(stock.free_to_use(), opening + added);
                }
                let moved: i64 = settlement.moves.iter().map(StockMove::quantity).sum();
                prop_assert_eq!(moved, lines.iter().map(|(_, q)| q).sum::<i64>());
            }

            /// Property: a delivery either succeeds without driving any row
            /// negative or fails as a whole.
            #[test]
            fn delivery_never_overdraws(
                requested in prop::collection::vec(1i64..50, 1..8),
                on_hand in 0i64..200
            ) {
                let product = ProductId::new();
                let lines: Vec<(ProductId, i64)> = requested.iter().map(|q| (product, *q)).collect();
                let delivery = delivery_with(&lines);
                let rows = if on_hand > 0 { vec![stocked(product, on_hand)] } else { Vec::new() };
                let total: i64 = requested.iter().sum();

                match delivery.settle(StockBook::new(rows), UserId::new(), test_time()) {
                    Ok(settlement) => {
                        prop_assert!(total <= on_hand);
                        prop_assert_eq!(settlement.stocks[0].quantity(), on_hand - total);
                    }
                    Err(_) => prop_assert!(total > on_hand),
                }
            }
        }
    }
}
