use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::Product;
use stockroom_core::{AdjustmentId, LocationId, ProductId};
use stockroom_inventory::Location;
use stockroom_operations::{
    ADJUSTMENT_SERIES, Adjustment, AdjustmentCommand, AdjustmentReason, CreateAdjustment,
    UpdateAdjustment,
};

use crate::app::dto::{self, AdjustmentListQuery, AdjustmentRequest};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{self, created, deleted, ok};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_adjustments).post(create_adjustment))
        .route("/:id", get(get_adjustment).put(update_adjustment).delete(delete_adjustment))
        .route("/:id/validate", put(validate_adjustment))
}

pub async fn list_adjustments(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<AdjustmentListQuery>,
) -> ApiResult {
    let reason = dto::parse_opt::<AdjustmentReason>(query.reason.as_deref())?;
    let product = dto::parse_opt_id::<ProductId>(query.product_id.as_deref())?;

    let adjustments = common::list_searched::<Adjustment>(services.docs(), query.search.as_deref(), |a| {
        vec![Some(a.number()), Some(a.reason().as_str()), a.notes()]
    })
    .await?;
    let adjustments: Vec<Adjustment> = adjustments
        .into_iter()
        .filter(|a| query.validated.is_none_or(|v| a.is_validated() == v))
        .filter(|a| reason.is_none_or(|r| a.reason() == r))
        .filter(|a| product.is_none_or(|p| a.product_id() == p))
        .collect();
    Ok(ok(&adjustments))
}

pub async fn get_adjustment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let adjustment = services.dispatcher.load::<Adjustment>(dto::parse_id(&id)?).await?;
    Ok(ok(&adjustment.value))
}

async fn location(services: &AppServices, raw: Option<&str>) -> ApiResult<Option<LocationId>> {
    let location_id = dto::parse_opt_id::<LocationId>(raw)?;
    if let Some(id) = location_id {
        common::ensure_exists::<Location>(services.docs(), id).await?;
    }
    Ok(location_id)
}

/// `system_quantity` defaults to the product's current stock.
pub async fn create_adjustment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<AdjustmentRequest>,
) -> ApiResult {
    let product_id: ProductId = dto::parse_id(&dto::required("product_id", body.product_id)?)?;
    common::ensure_exists::<Product>(services.docs(), product_id).await?;
    let location_id = location(&services, body.location_id.as_deref()).await?;
    let counted_quantity = dto::required_value("counted_quantity", body.counted_quantity)?;
    let reason: AdjustmentReason = dto::required("reason", body.reason)?.parse()?;

    let system_quantity = match body.system_quantity {
        Some(quantity) => quantity,
        None => services
            .ledger
            .stock(product_id)
            .await?
            .map_or(0, |s| s.quantity()),
    };

    let adjustment = Adjustment::create(CreateAdjustment {
        adjustment_id: AdjustmentId::new(),
        number: services.dispatcher.next_number(ADJUSTMENT_SERIES).await?,
        product_id,
        location_id,
        system_quantity,
        counted_quantity,
        reason,
        notes: body.notes,
        created_by: principal.user_id(),
        occurred_at: Utc::now(),
    })?;
    let adjustment = services.dispatcher.create(adjustment).await?;
    Ok(created(&adjustment.value))
}

pub async fn update_adjustment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<AdjustmentRequest>,
) -> ApiResult {
    let id: AdjustmentId = dto::parse_id(&id)?;
    let product_id = dto::parse_opt_id::<ProductId>(body.product_id.as_deref())?;
    if let Some(product_id) = product_id {
        common::ensure_exists::<Product>(services.docs(), product_id).await?;
    }

    let command = AdjustmentCommand::Update(UpdateAdjustment {
        product_id,
        location_id: location(&services, body.location_id.as_deref()).await?,
        system_quantity: body.system_quantity,
        counted_quantity: body.counted_quantity,
        reason: dto::parse_opt::<AdjustmentReason>(body.reason.as_deref())?,
        notes: body.notes,
        occurred_at: Utc::now(),
    });
    let adjustment = services.dispatcher.dispatch::<Adjustment>(id, command).await?;
    Ok(ok(&adjustment.value))
}

pub async fn delete_adjustment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: AdjustmentId = dto::parse_id(&id)?;
    services
        .dispatcher
        .delete::<Adjustment, _>(id, |a| a.ensure_open("delete"))
        .await?;
    Ok(deleted("adjustment"))
}

/// Apply the counted difference to the product's stock. One-shot.
pub async fn validate_adjustment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: AdjustmentId = dto::parse_id(&id)?;
    let settlement = services.ledger.validate::<Adjustment>(id, principal.user_id()).await?;
    Ok(ok(&settlement.document))
}
