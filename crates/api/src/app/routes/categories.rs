use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use stockroom_catalog::{Category, CategoryDetails};
use stockroom_core::CategoryId;

use crate::app::dto::{self, CategoryRequest, SearchQuery};
use crate::app::errors::ApiResult;
use crate::app::routes::common::{self, created, deleted, ok};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

fn details(body: CategoryRequest) -> CategoryDetails {
    CategoryDetails {
        name: body.name,
        description: body.description,
    }
}

/// Categories are listed by name.
pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    let mut categories = common::list_searched::<Category>(services.docs(), query.search.as_deref(), |c| {
        vec![Some(c.name()), c.description()]
    })
    .await?;
    categories.sort_by_key(|c| c.name().to_lowercase());
    Ok(ok(&categories))
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let category = services.dispatcher.load::<Category>(dto::parse_id(&id)?).await?;
    Ok(ok(&category.value))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CategoryRequest>,
) -> ApiResult {
    let category = Category::create(CategoryId::new(), details(body), Utc::now())?;
    let category = services.dispatcher.create(category).await?;
    Ok(created(&category.value))
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<CategoryRequest>,
) -> ApiResult {
    let details = details(body);
    let (category, ()) = services
        .dispatcher
        .modify::<Category, _, _>(dto::parse_id(&id)?, |c| c.update(details.clone(), Utc::now()))
        .await?;
    Ok(ok(&category.value))
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CategoryId = dto::parse_id(&id)?;
    services.dispatcher.delete::<Category, _>(id, |_| Ok(())).await?;
    Ok(deleted("category"))
}
