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
        .route("/", get(list_customers).post(create_customer))
        .route("/:id", get(get_customer).put(update_customer).delete(delete_customer))
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    common::list_parties(services, PartyKind::Customer, query.search).await
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    common::get_party(services, PartyKind::Customer, id).await
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PartyRequest>,
) -> ApiResult {
    common::create_party(services, PartyKind::Customer, body).await
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<PartyRequest>,
) -> ApiResult {
    common::update_party(services, PartyKind::Customer, id, body).await
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    common::delete_party(services, PartyKind::Customer, id).await
}
