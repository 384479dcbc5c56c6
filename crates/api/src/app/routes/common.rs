use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use stockroom_core::{DomainError, PartyId};
use stockroom_infra::store::{Document, Documents};
use stockroom_infra::{SearchPattern, apply_search};
use stockroom_parties::{ContactInfo, Party, PartyKind, RegisterParty, UpdateDetails};

use crate::app::dto::{self, PartyRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn ok<T: Serialize>(body: &T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

pub fn created<T: Serialize>(body: &T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

pub fn deleted(label: &str) -> Response {
    let mut label = label.to_string();
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Json(json!({ "message": format!("{label} deleted successfully") })).into_response()
}

/// A referenced document must exist; a dangling reference is a bad request.
pub async fn ensure_exists<T: Document>(docs: &Documents, id: T::Id) -> ApiResult<()> {
    if docs.exists::<T>(id).await? {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{} {id} does not exist", T::LABEL)).into())
    }
}

pub async fn ensure_party(docs: &Documents, id: PartyId, kind: PartyKind) -> ApiResult<()> {
    match docs.get::<Party>(id).await? {
        Some(party) if party.value.kind() == kind => Ok(()),
        _ => Err(DomainError::validation(format!("{} {id} does not exist", kind.label())).into()),
    }
}

/// All documents of a type, newest first, filtered by `search` over `fields`.
pub async fn list_searched<T: Document>(
    docs: &Documents,
    search: Option<&str>,
    fields: impl Fn(&T) -> Vec<Option<&str>>,
) -> ApiResult<Vec<T>> {
    let pattern = SearchPattern::parse(search)?;
    let items = docs.list::<T>().await?.into_iter().map(|v| v.into_inner()).collect();
    Ok(apply_search(items, pattern.as_ref(), fields))
}

// -------------------------
// Suppliers and customers
// -------------------------

pub async fn list_parties(services: Arc<AppServices>, kind: PartyKind, search: Option<String>) -> ApiResult {
    let parties = list_searched::<Party>(services.docs(), search.as_deref(), |p| {
        vec![
            Some(p.name()),
            p.contact().email.as_deref(),
            p.contact().phone.as_deref(),
        ]
    })
    .await?;
    let parties: Vec<Party> = parties.into_iter().filter(|p| p.kind() == kind).collect();
    Ok(ok(&parties))
}

pub async fn get_party(services: Arc<AppServices>, kind: PartyKind, id: String) -> ApiResult {
    let id: PartyId = dto::parse_id(&id)?;
    match services.docs().get::<Party>(id).await? {
        Some(party) if party.value.kind() == kind => Ok(ok(&party.value)),
        _ => Err(DomainError::not_found(kind.label()).into()),
    }
}

pub async fn create_party(services: Arc<AppServices>, kind: PartyKind, body: PartyRequest) -> ApiResult {
    let party = Party::register(RegisterParty {
        party_id: PartyId::new(),
        kind,
        name: dto::required("name", body.name)?,
        contact: ContactInfo {
            email: body.email,
            phone: body.phone,
            address: body.address,
        },
        occurred_at: Utc::now(),
    })?;
    let party = services.dispatcher.create(party).await?;
    Ok(created(&party.value))
}

pub async fn update_party(
    services: Arc<AppServices>,
    kind: PartyKind,
    id: String,
    body: PartyRequest,
) -> ApiResult {
    let id: PartyId = dto::parse_id(&id)?;
    let details = UpdateDetails {
        name: body.name,
        email: body.email,
        phone: body.phone,
        address: body.address,
    };
    let (party, ()) = services
        .dispatcher
        .modify::<Party, _, _>(id, |party| {
            if party.kind() != kind {
                return Err(DomainError::not_found(kind.label()));
            }
            party.update(details.clone(), Utc::now())
        })
        .await?;
    Ok(ok(&party.value))
}

pub async fn delete_party(services: Arc<AppServices>, kind: PartyKind, id: String) -> ApiResult {
    let id: PartyId = dto::parse_id(&id)?;
    services
        .dispatcher
        .delete::<Party, _>(id, |party| {
            if party.kind() != kind {
                return Err(DomainError::not_found(kind.label()));
            }
            Ok(())
        })
        .await?;
    Ok(deleted(kind.label()))
}
