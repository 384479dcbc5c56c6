use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::Product;
use stockroom_core::{LineId, LocationId, PartyId, ProductId, ReceiptId};
use stockroom_inventory::Location;
use stockroom_operations::{
    AddLine, ChangeStatus, CreateReceipt, DocumentStatus, RECEIPT_SERIES, Receipt, ReceiptCommand,
    RemoveLine, UpdateLine, UpdateReceipt,
};
use stockroom_parties::PartyKind;

use crate::app::dto::{self, DocumentListQuery, DocumentRequest, LineRequest, ValidateRequest};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{self, created, deleted, ok};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_receipts).post(create_receipt))
        .route("/:id", get(get_receipt).put(update_receipt).delete(delete_receipt))
        .route("/:id/validate", put(validate_receipt))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:item_id", put(update_item).delete(remove_item))
}

pub async fn list_receipts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<DocumentListQuery>,
) -> ApiResult {
    let status = dto::parse_opt::<DocumentStatus>(query.status.as_deref())?;
    let supplier = dto::parse_opt_id::<PartyId>(query.party_id.as_deref())?;

    let receipts = common::list_searched::<Receipt>(services.docs(), query.search.as_deref(), |r| {
        vec![Some(r.number()), r.notes()]
    })
    .await?;
    let receipts: Vec<Receipt> = receipts
        .into_iter()
        .filter(|r| status.is_none_or(|s| r.status() == s))
        .filter(|r| supplier.is_none_or(|s| r.supplier_id() == s))
        .collect();
    Ok(ok(&receipts))
}

pub async fn get_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let receipt = services.dispatcher.load::<Receipt>(dto::parse_id(&id)?).await?;
    Ok(ok(&receipt.value))
}

pub async fn create_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<DocumentRequest>,
) -> ApiResult {
    let supplier_id: PartyId = dto::parse_id(&dto::required("supplier_id", body.party_id)?)?;
    common::ensure_party(services.docs(), supplier_id, PartyKind::Supplier).await?;
    let location_id = dto::parse_opt_id::<LocationId>(body.location_id.as_deref())?;
    if let Some(location_id) = location_id {
        common::ensure_exists::<Location>(services.docs(), location_id).await?;
    }
    let scheduled_date = dto::parse_date("scheduled_date", body.scheduled_date.as_deref())?;

    let receipt = Receipt::create(CreateReceipt {
        receipt_id: ReceiptId::new(),
        number: services.dispatcher.next_number(RECEIPT_SERIES).await?,
        supplier_id,
        location_id,
        scheduled_date,
        notes: body.notes,
        created_by: principal.user_id(),
        occurred_at: Utc::now(),
    });
    let receipt = services.dispatcher.create(receipt).await?;
    Ok(created(&receipt.value))
}

pub async fn update_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<DocumentRequest>,
) -> ApiResult {
    let id: ReceiptId = dto::parse_id(&id)?;
    let supplier_id = dto::parse_opt_id::<PartyId>(body.party_id.as_deref())?;
    if let Some(supplier_id) = supplier_id {
        common::ensure_party(services.docs(), supplier_id, PartyKind::Supplier).await?;
    }
    let location_id = dto::parse_opt_id::<LocationId>(body.location_id.as_deref())?;
    if let Some(location_id) = location_id {
        common::ensure_exists::<Location>(services.docs(), location_id).await?;
    }

    let command = ReceiptCommand::Update(UpdateReceipt {
        supplier_id,
        location_id,
        scheduled_date: dto::parse_date("scheduled_date", body.scheduled_date.as_deref())?,
        notes: body.notes,
        occurred_at: Utc::now(),
    });
    let receipt = services.dispatcher.dispatch::<Receipt>(id, command).await?;
    Ok(ok(&receipt.value))
}

/// Completed receipts stay; line items go with the document.
pub async fn delete_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ReceiptId = dto::parse_id(&id)?;
    services
        .dispatcher
        .delete::<Receipt, _>(id, |r| r.ensure_deletable())
        .await?;
    Ok(deleted("receipt"))
}

/// `{status?}`, default `Done`. Only `Done` touches stock.
pub async fn validate_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<ValidateRequest>>,
) -> ApiResult {
    let id: ReceiptId = dto::parse_id(&id)?;
    let status = body
        .and_then(|Json(b)| b.status)
        .map(|s| s.parse::<DocumentStatus>())
        .transpose()?
        .unwrap_or(DocumentStatus::Done);

    if status == DocumentStatus::Done {
        let settlement = services.ledger.validate::<Receipt>(id, principal.user_id()).await?;
        return Ok(ok(&settlement.document));
    }

    let command = ReceiptCommand::ChangeStatus(ChangeStatus {
        status,
        occurred_at: Utc::now(),
    });
    let receipt = services.dispatcher.dispatch::<Receipt>(id, command).await?;
    Ok(ok(&receipt.value))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<LineRequest>,
) -> ApiResult {
    let id: ReceiptId = dto::parse_id(&id)?;
    let product_id: ProductId = dto::parse_id(&dto::required("product_id", body.product_id)?)?;
    common::ensure_exists::<Product>(services.docs(), product_id).await?;

    let command = ReceiptCommand::AddLine(AddLine {
        line_id: LineId::new(),
        product_id,
        quantity: dto::required_value("quantity", body.quantity)?,
        unit_price: body.unit_price,
        occurred_at: Utc::now(),
    });
    let receipt = services.dispatcher.dispatch::<Receipt>(id, command).await?;
    Ok(created(&receipt.value))
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, item_id)): Path<(String, String)>,
    Json(body): Json<LineRequest>,
) -> ApiResult {
    let id: ReceiptId = dto::parse_id(&id)?;
    let product_id = dto::parse_opt_id::<ProductId>(body.product_id.as_deref())?;
    if let Some(product_id) = product_id {
        common::ensure_exists::<Product>(services.docs(), product_id).await?;
    }

    let command = ReceiptCommand::UpdateLine(UpdateLine {
        line_id: dto::parse_id(&item_id)?,
        product_id,
        quantity: body.quantity,
        unit_price: body.unit_price,
        occurred_at: Utc::now(),
    });
    let receipt = services.dispatcher.dispatch::<Receipt>(id, command).await?;
    Ok(ok(&receipt.value))
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult {
    let id: ReceiptId = dto::parse_id(&id)?;
    let command = ReceiptCommand::RemoveLine(RemoveLine {
        line_id: dto::parse_id(&item_id)?,
        occurred_at: Utc::now(),
    });
    let receipt = services.dispatcher.dispatch::<Receipt>(id, command).await?;
    Ok(ok(&receipt.value))
}
