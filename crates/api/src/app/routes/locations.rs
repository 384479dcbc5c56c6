use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use stockroom_core::LocationId;
use stockroom_infra::store::Documents;
use stockroom_inventory::{Location, LocationDetails};

use crate::app::dto::{self, LocationRequest, SearchQuery};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{self, created, deleted, ok};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route("/:id", get(get_location).put(update_location).delete(delete_location))
}

async fn details(docs: &Documents, body: LocationRequest) -> ApiResult<LocationDetails> {
    let parent_location_id = dto::parse_opt_id::<LocationId>(body.parent_location_id.as_deref())?;
    if let Some(parent) = parent_location_id {
        common::ensure_exists::<Location>(docs, parent).await?;
    }
    Ok(LocationDetails {
        name: body.name,
        parent_location_id,
        description: body.description,
    })
}

pub async fn list_locations(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    let locations = common::list_searched::<Location>(services.docs(), query.search.as_deref(), |l| {
        vec![Some(l.name()), l.description()]
    })
    .await?;
    Ok(ok(&locations))
}

pub async fn get_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let location = services.dispatcher.load::<Location>(dto::parse_id(&id)?).await?;
    Ok(ok(&location.value))
}

pub async fn create_location(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LocationRequest>,
) -> ApiResult {
    let details = details(services.docs(), body).await?;
    let location = Location::create(LocationId::new(), details, Utc::now())?;
    let location = services.dispatcher.create(location).await?;
    Ok(created(&location.value))
}

pub async fn update_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<LocationRequest>,
) -> ApiResult {
    let id: LocationId = dto::parse_id(&id)?;
    let details = details(services.docs(), body).await?;
    let (location, ()) = services
        .dispatcher
        .modify::<Location, _, _>(id, |l| l.update(details.clone(), Utc::now()))
        .await?;
    Ok(ok(&location.value))
}

pub async fn delete_location(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: LocationId = dto::parse_id(&id)?;
    services.dispatcher.delete::<Location, _>(id, |_| Ok(())).await?;
    Ok(deleted("location"))
}
