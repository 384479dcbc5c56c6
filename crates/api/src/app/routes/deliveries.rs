use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::Product;
use stockroom_core::{DeliveryId, LineId, LocationId, PartyId, ProductId};
use stockroom_inventory::Location;
use stockroom_operations::{
    AddLine, ChangeStatus, CreateDelivery, DELIVERY_SERIES, Delivery, DeliveryCommand, DocumentStatus,
    RemoveLine, UpdateDelivery, UpdateLine,
};
use stockroom_parties::PartyKind;

use crate::app::dto::{self, DocumentListQuery, DocumentRequest, LineRequest, ValidateRequest};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{self, created, deleted, ok};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route("/:id", get(get_delivery).put(update_delivery).delete(delete_delivery))
        .route("/:id/validate", put(validate_delivery))
        .route("/:id/items", post(add_item))
        .route("/:id/items/:item_id", put(update_item).delete(remove_item))
}

pub async fn list_deliveries(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<DocumentListQuery>,
) -> ApiResult {
    let status = dto::parse_opt::<DocumentStatus>(query.status.as_deref())?;
    let customer = dto::parse_opt_id::<PartyId>(query.party_id.as_deref())?;

    let deliveries = common::list_searched::<Delivery>(services.docs(), query.search.as_deref(), |r| {
        vec![Some(r.number()), r.notes()]
    })
    .await?;
    let deliveries: Vec<Delivery> = deliveries
        .into_iter()
        .filter(|r| status.is_none_or(|s| r.status() == s))
        .filter(|r| customer.is_none_or(|s| r.customer_id() == s))
        .collect();
    Ok(ok(&deliveries))
}

pub async fn get_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let delivery = services.dispatcher.load::<Delivery>(dto::parse_id(&id)?).await?;
    Ok(ok(&delivery.value))
}

pub async fn create_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<DocumentRequest>,
) -> ApiResult {
    let customer_id: PartyId = dto::parse_id(&dto::required("customer_id", body.party_id)?)?;
    common::ensure_party(services.docs(), customer_id, PartyKind::Customer).await?;
    let location_id = dto::parse_opt_id::<LocationId>(body.location_id.as_deref())?;
    if let Some(location_id) = location_id {
        common::ensure_exists::<Location>(services.docs(), location_id).await?;
    }
    let scheduled_date = dto::parse_date("scheduled_date", body.scheduled_date.as_deref())?;

    let delivery = Delivery::create(CreateDelivery {
        delivery_id: DeliveryId::new(),
        number: services.dispatcher.next_number(DELIVERY_SERIES).await?,
        customer_id,
        location_id,
        scheduled_date,
        notes: body.notes,
        created_by: principal.user_id(),
        occurred_at: Utc::now(),
    });
    let delivery = services.dispatcher.create(delivery).await?;
    Ok(created(&delivery.value))
}

pub async fn update_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<DocumentRequest>,
) -> ApiResult {
    let id: DeliveryId = dto::parse_id(&id)?;
    let customer_id = dto::parse_opt_id::<PartyId>(body.party_id.as_deref())?;
    if let Some(customer_id) = customer_id {
        common::ensure_party(services.docs(), customer_id, PartyKind::Customer).await?;
    }
    let location_id = dto::parse_opt_id::<LocationId>(body.location_id.as_deref())?;
    if let Some(location_id) = location_id {
        common::ensure_exists::<Location>(services.docs(), location_id).await?;
    }

    let command = DeliveryCommand::Update(UpdateDelivery {
        customer_id,
        location_id,
        scheduled_date: dto::parse_date("scheduled_date", body.scheduled_date.as_deref())?,
        notes: body.notes,
        occurred_at: Utc::now(),
    });
    let delivery = services.dispatcher.dispatch::<Delivery>(id, command).await?;
    Ok(ok(&delivery.value))
}

/// Completed deliveries stay; line items go with the document.
pub async fn delete_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: DeliveryId = dto::parse_id(&id)?;
    services
        .dispatcher
        .delete::<Delivery, _>(id, |r| r.ensure_deletable())
        .await?;
    Ok(deleted("delivery"))
}

/// `{status?}`, default `Done`. Completing a delivery is all or nothing: one
/// short line rejects the whole document.
pub async fn validate_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<ValidateRequest>>,
) -> ApiResult {
    let id: DeliveryId = dto::parse_id(&id)?;
    let status = body
        .and_then(|Json(b)| b.status)
        .map(|s| s.parse::<DocumentStatus>())
        .transpose()?
        .unwrap_or(DocumentStatus::Done);

    if status == DocumentStatus::Done {
        let settlement = services.ledger.validate::<Delivery>(id, principal.user_id()).await?;
        return Ok(ok(&settlement.document));
    }

    let command = DeliveryCommand::ChangeStatus(ChangeStatus {
        status,
        occurred_at: Utc::now(),
    });
    let delivery = services.dispatcher.dispatch::<Delivery>(id, command).await?;
    Ok(ok(&delivery.value))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<LineRequest>,
) -> ApiResult {
    let id: DeliveryId = dto::parse_id(&id)?;
    let product_id: ProductId = dto::parse_id(&dto::required("product_id", body.product_id)?)?;
    common::ensure_exists::<Product>(services.docs(), product_id).await?;

    let command = DeliveryCommand::AddLine(AddLine {
        line_id: LineId::new(),
        product_id,
        quantity: dto::required_value("quantity", body.quantity)?,
        unit_price: body.unit_price,
        occurred_at: Utc::now(),
    });
    let delivery = services.dispatcher.dispatch::<Delivery>(id, command).await?;
    Ok(created(&delivery.value))
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, item_id)): Path<(String, String)>,
    Json(body): Json<LineRequest>,
) -> ApiResult {
    let id: DeliveryId = dto::parse_id(&id)?;
    let product_id = dto::parse_opt_id::<ProductId>(body.product_id.as_deref())?;
    if let Some(product_id) = product_id {
        common::ensure_exists::<Product>(services.docs(), product_id).await?;
    }

    let command = DeliveryCommand::UpdateLine(UpdateLine {
        line_id: dto::parse_id(&item_id)?,
        product_id,
        quantity: body.quantity,
        unit_price: body.unit_price,
        occurred_at: Utc::now(),
    });
    let delivery = services.dispatcher.dispatch::<Delivery>(id, command).await?;
    Ok(ok(&delivery.value))
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult {
    let id: DeliveryId = dto::parse_id(&id)?;
    let command = DeliveryCommand::RemoveLine(RemoveLine {
        line_id: dto::parse_id(&item_id)?,
        occurred_at: Utc::now(),
    });
    let delivery = services.dispatcher.dispatch::<Delivery>(id, command).await?;
    Ok(ok(&delivery.value))
}
