use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Json, Router,
};

use stockroom_parties::PartyKind;

use crate::app::dto::{PartyRequest, SearchQuery};
use crate::app::errors::ApiResult;
use crate::app::routes::common;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/:id", get(get_supplier).put(update_supplier).delete(delete_supplier))
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    common::list_parties(services, PartyKind::Supplier, query.search).await
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    common::get_party(services, PartyKind::Supplier, id).await
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PartyRequest>,
) -> ApiResult {
    common::create_party(services, PartyKind::Supplier, body).await
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<PartyRequest>,
) -> ApiResult {
    common::update_party(services, PartyKind::Supplier, id, body).await
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    common::delete_party(services, PartyKind::Supplier, id).await
}
