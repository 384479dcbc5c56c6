use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    routing::get,
    Json, Router,
};

use stockroom_catalog::Product;
use stockroom_core::ProductId;
use stockroom_inventory::Stock;

use crate::app::dto::{self, SetStockRequest, StockQuery};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{self, ok};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_stock).put(set_stock))
        .route("/all", get(all_stock))
        .route("/moves", get(list_moves))
}

/// `?product_id=` is required. A product that was never stocked reads as
/// an empty row.
pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<StockQuery>,
) -> ApiResult {
    let product_id: ProductId = dto::parse_id(&dto::required("product_id", query.product_id)?)?;
    services.dispatcher.load::<Product>(product_id).await?;
    let stock = services
        .ledger
        .stock(product_id)
        .await?
        .unwrap_or_else(|| Stock::empty(product_id));
    Ok(ok(&stock))
}

pub async fn all_stock(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    Ok(ok(&services.ledger.all_stock().await?))
}

/// Find-or-create the product's row and set its levels; a quantity change
/// is recorded as a manual move.
pub async fn set_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<SetStockRequest>,
) -> ApiResult {
    let product_id: ProductId = dto::parse_id(&dto::required("product_id", body.product_id)?)?;
    common::ensure_exists::<Product>(services.docs(), product_id).await?;

    let stock = services
        .ledger
        .set_levels(product_id, body.quantity, body.free_to_use, principal.user_id())
        .await?;
    Ok(ok(&stock))
}

/// Stock move audit trail, newest first.
pub async fn list_moves(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<StockQuery>,
) -> ApiResult {
    let product_id = dto::parse_opt_id::<ProductId>(query.product_id.as_deref())?;
    Ok(ok(&services.ledger.moves(product_id).await?))
}
