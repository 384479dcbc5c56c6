use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::{UnitDetails, UnitOfMeasure};
use stockroom_core::UnitId;

use crate::app::dto::{self, SearchQuery, UnitRequest};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{self, created, deleted, ok};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_units).post(create_unit))
        .route("/:id", get(get_unit).put(update_unit).delete(delete_unit))
}

fn details(body: UnitRequest) -> UnitDetails {
    UnitDetails {
        name: body.name,
        abbreviation: body.abbreviation,
        description: body.description,
    }
}

pub async fn list_units(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    let units = common::list_searched::<UnitOfMeasure>(services.docs(), query.search.as_deref(), |u| {
        vec![Some(u.name()), Some(u.abbreviation()), u.description()]
    })
    .await?;
    Ok(ok(&units))
}

pub async fn get_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let unit = services.dispatcher.load::<UnitOfMeasure>(dto::parse_id(&id)?).await?;
    Ok(ok(&unit.value))
}

/// Names are unique (case-insensitive); the store reports a clash as 409.
pub async fn create_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<UnitRequest>,
) -> ApiResult {
    let unit = UnitOfMeasure::create(UnitId::new(), details(body), Utc::now())?;
    let unit = services.dispatcher.create(unit).await?;
    Ok(created(&unit.value))
}

pub async fn update_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<UnitRequest>,
) -> ApiResult {
    let details = details(body);
    let (unit, ()) = services
        .dispatcher
        .modify::<UnitOfMeasure, _, _>(dto::parse_id(&id)?, |unit| unit.update(details.clone(), Utc::now()))
        .await?;
    Ok(ok(&unit.value))
}

pub async fn delete_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: UnitId = dto::parse_id(&id)?;
    services.dispatcher.delete::<UnitOfMeasure, _>(id, |_| Ok(())).await?;
    Ok(deleted("unit of measure"))
}
