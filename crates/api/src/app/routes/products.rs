use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::{Category, CreateProduct, Product, UpdateProduct};
use stockroom_core::{CategoryId, ProductId};

use crate::app::dto::{self, ProductRequest, SearchQuery};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{self, created, deleted, ok};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

async fn category(services: &AppServices, raw: Option<&str>) -> ApiResult<Option<CategoryId>> {
    let category_id = dto::parse_opt_id::<CategoryId>(raw)?;
    if let Some(id) = category_id {
        common::ensure_exists::<Category>(services.docs(), id).await?;
    }
    Ok(category_id)
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    let products = common::list_searched::<Product>(services.docs(), query.search.as_deref(), |p| {
        vec![Some(p.name()), Some(p.sku())]
    })
    .await?;
    Ok(ok(&products))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let product = services.dispatcher.load::<Product>(dto::parse_id(&id)?).await?;
    Ok(ok(&product.value))
}

/// A product created with an initial stock opens its stock row at once.
pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ProductRequest>,
) -> ApiResult {
    let category_id = category(&services, body.category_id.as_deref()).await?;
    let product = Product::create(CreateProduct {
        product_id: ProductId::new(),
        name: dto::required("name", body.name)?,
        sku: dto::required("sku", body.sku)?,
        category_id,
        uom: dto::required("uom", body.uom)?,
        unit_cost: body.unit_cost.unwrap_or(0),
        reorder_level: body.reorder_level.unwrap_or(0),
        initial_stock: body.initial_stock.unwrap_or(0),
        occurred_at: Utc::now(),
    })?;

    services.ledger.open_product(&product, principal.user_id()).await?;
    Ok(created(&product))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<ProductRequest>,
) -> ApiResult {
    let id: ProductId = dto::parse_id(&id)?;
    let category_id = category(&services, body.category_id.as_deref()).await?;
    let update = UpdateProduct {
        name: body.name,
        sku: body.sku,
        category_id,
        uom: body.uom,
        unit_cost: body.unit_cost,
        reorder_level: body.reorder_level,
    };
    let (product, ()) = services
        .dispatcher
        .modify::<Product, _, _>(id, |p| p.update(update.clone(), Utc::now()))
        .await?;
    Ok(ok(&product.value))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductId = dto::parse_id(&id)?;
    services.dispatcher.delete::<Product, _>(id, |_| Ok(())).await?;
    Ok(deleted("product"))
}
