//! Resource handlers.
//!
//! One generic function per operation. Each validates its input, calls the
//! record store, and ends in exactly one `Envelope`; errors are converted at
//! the single exit in [`handle`].

use axum::{body::Bytes, http::StatusCode};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::http::response::Envelope;
use crate::resources::fields::apply_patch;
use crate::resources::{Resource, Violation};
use crate::routing::Operation;
use crate::store::RecordStore;

/// Keys a client cannot set through a replace.
const SERVER_OWNED: [&str; 3] = ["deleted", "cloned", "cloned_from_ref"];

/// Everything a handler receives from the route.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub operation: Operation,
    pub id: Option<String>,
    pub body: Bytes,
}

/// Run `invocation` against resource kind `R`.
pub async fn handle<R: Resource>(store: RecordStore, invocation: Invocation) -> Envelope {
    let Invocation { operation, id, body } = invocation;
    let result = match operation {
        Operation::Create => create::<R>(&store, &body).await,
        Operation::Read => read::<R>(&store, id).await,
        Operation::Replace => replace::<R>(&store, id, &body).await,
        Operation::Patch => patch::<R>(&store, id, &body).await,
        Operation::Delete => delete::<R>(&store, id).await,
        Operation::Clone => clone::<R>(&store, id).await,
    };

    match result {
        Ok(envelope) => {
            tracing::info!(status = envelope.status.as_u16(), "Handler completed");
            envelope
        }
        Err(err) => {
            if err.status().is_server_error() {
                tracing::error!(status = err.status().as_u16(), error = %err, "Handler failed");
            } else {
                tracing::warn!(status = err.status().as_u16(), error = %err, "Request rejected");
            }
            err.into()
        }
    }
}

async fn create<R: Resource>(store: &RecordStore, body: &Bytes) -> Result<Envelope, ServiceError> {
    let mut record: R = parse_record(body)?;
    let id = if record.id().is_empty() {
        Uuid::new_v4().to_string()
    } else {
        record.id().to_string()
    };
    record.prepare_new(id.clone());
    record.validate().map_err(ServiceError::Validation)?;

    tracing::info!(id = %id, "Creating {}", R::KIND);
    store.create(&record).await.map_err(|e| {
        if e.is_duplicate() {
            ServiceError::validation(Violation::invalid_value(format!(
                "{} with ID {id} already exists",
                R::KIND.label()
            )))
        } else {
            ServiceError::store(format!("Failed to create {}", R::KIND), e)
        }
    })?;

    Ok(Envelope::text(
        StatusCode::CREATED,
        format!("{} with ID {} added", R::KIND.label(), id),
    ))
}

async fn read<R: Resource>(store: &RecordStore, id: Option<String>) -> Result<Envelope, ServiceError> {
    let id = require_id::<R>(id)?;
    let record = read_existing::<R>(store, &id).await?;

    Envelope::json(StatusCode::OK, &record)
        .map_err(|e| ServiceError::Internal(format!("Failed to encode {} details: {e}", R::KIND)))
}

/// PUT: merge the body over an existing record, or create it under the path id.
async fn replace<R: Resource>(
    store: &RecordStore,
    id: Option<String>,
    body: &Bytes,
) -> Result<Envelope, ServiceError> {
    let id = require_id::<R>(id)?;
    let mut fields = parse_object(body)?;
    check_body_id(&fields, &id)?;
    for key in SERVER_OWNED {
        fields.remove(key);
    }

    match store.read::<R>(&id).await {
        Ok(existing) => {
            let mut merged = match serde_json::to_value(&existing) {
                Ok(Value::Object(map)) => map,
                _ => {
                    return Err(ServiceError::Internal(format!(
                        "Failed to encode {} with ID {id}",
                        R::KIND
                    )))
                }
            };
            merged.extend(fields);

            let mut record: R = parse_value(Value::Object(merged))?;
            record.set_id(id.clone());
            record.validate().map_err(ServiceError::Validation)?;

            tracing::info!(id = %id, "Replacing existing {}", R::KIND);
            store
                .update(&record)
                .await
                .map_err(|e| ServiceError::store(format!("Failed to update {}", R::KIND), e))?;
        }
        Err(e) if e.is_not_found() => {
            let mut record: R = parse_value(Value::Object(fields))?;
            record.prepare_new(id.clone());
            record.validate().map_err(ServiceError::Validation)?;

            tracing::info!(id = %id, "{} not found, creating it", R::KIND.label());
            // A read miss with a taken key means the id belongs to a deleted record.
            store.create(&record).await.map_err(|e| {
                if e.is_duplicate() {
                    ServiceError::validation(Violation::invalid_value(format!(
                        "{} with ID {id} was deleted and its ID cannot be reused",
                        R::KIND.label()
                    )))
                } else {
                    ServiceError::store(format!("Failed to create {}", R::KIND), e)
                }
            })?;
        }
        Err(e) => {
            return Err(ServiceError::store(
                format!("Error retrieving {} with ID {id}", R::KIND),
                e,
            ))
        }
    }

    Ok(Envelope::no_content())
}

/// PATCH: apply editable fields to an existing record only.
async fn patch<R: Resource>(
    store: &RecordStore,
    id: Option<String>,
    body: &Bytes,
) -> Result<Envelope, ServiceError> {
    let id = require_id::<R>(id)?;
    let fields = parse_object(body)?;

    let mut record = match store.read::<R>(&id).await {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
            return Err(ServiceError::validation(Violation::invalid_value(format!(
                "Patch is only allowed on existing records. {} with ID {id} not found",
                R::KIND.label()
            ))))
        }
        Err(e) => {
            return Err(ServiceError::store(
                format!("Error retrieving {} with ID {id}", R::KIND),
                e,
            ))
        }
    };

    apply_patch(R::fields(), &mut record, &fields).map_err(ServiceError::Validation)?;
    record.validate().map_err(ServiceError::Validation)?;

    tracing::info!(id = %id, fields = fields.len(), "Patching {}", R::KIND);
    store
        .update(&record)
        .await
        .map_err(|e| ServiceError::store(format!("Failed to update {}", R::KIND), e))?;

    Ok(Envelope::no_content())
}

async fn delete<R: Resource>(store: &RecordStore, id: Option<String>) -> Result<Envelope, ServiceError> {
    let id = require_id::<R>(id)?;
    let record = read_existing::<R>(store, &id).await?;

    tracing::info!(id = %id, "Deleting {}", R::KIND);
    store
        .delete(&record)
        .await
        .map_err(|e| ServiceError::store(format!("Failed to delete {}", R::KIND), e))?;

    Ok(Envelope::text(
        StatusCode::OK,
        format!("{} with ID {id} deleted", R::KIND.label()),
    ))
}

async fn clone<R: Resource>(store: &RecordStore, id: Option<String>) -> Result<Envelope, ServiceError> {
    let id = require_id::<R>(id)?;
    let source = read_existing::<R>(store, &id).await?;

    let copy = source.duplicate(Uuid::new_v4().to_string());
    copy.validate().map_err(ServiceError::Validation)?;

    tracing::info!(id = %id, clone_id = copy.id(), "Cloning {}", R::KIND);
    store
        .create(&copy)
        .await
        .map_err(|e| ServiceError::store(format!("Failed to clone {}", R::KIND), e))?;

    Ok(Envelope::text(
        StatusCode::CREATED,
        format!("{} with ID {} cloned from {id}", R::KIND.label(), copy.id()),
    ))
}

fn require_id<R: Resource>(id: Option<String>) -> Result<String, ServiceError> {
    match id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(ServiceError::Parse(format!(
            "{} ID not provided in the URL",
            R::KIND.label()
        ))),
    }
}

async fn read_existing<R: Resource>(store: &RecordStore, id: &str) -> Result<R, ServiceError> {
    store.read::<R>(id).await.map_err(|e| {
        if e.is_not_found() {
            ServiceError::NotFound {
                kind: R::KIND.label(),
                id: id.to_string(),
            }
        } else {
            ServiceError::store(format!("Error retrieving {} with ID {id}", R::KIND), e)
        }
    })
}

fn check_body_id(fields: &Map<String, Value>, id: &str) -> Result<(), ServiceError> {
    match fields.get("id") {
        Some(Value::String(body_id)) if body_id != id => Err(ServiceError::validation(
            Violation::invalid_value(format!("id `{body_id}` in body does not match `{id}` in the URL")),
        )),
        _ => Ok(()),
    }
}

fn ensure_body(body: &Bytes) -> Result<(), ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServiceError::Parse("Request body is empty".into()));
    }
    Ok(())
}

fn parse_record<R: Resource>(body: &Bytes) -> Result<R, ServiceError> {
    ensure_body(body)?;
    serde_json::from_slice(body).map_err(|e| {
        ServiceError::Parse(format!("Failed to parse request body into {}: {e}", R::KIND))
    })
}

fn parse_object(body: &Bytes) -> Result<Map<String, Value>, ServiceError> {
    ensure_body(body)?;
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ServiceError::Parse("Request body must be a JSON object".into())),
        Err(e) => Err(ServiceError::Parse(format!("Failed to parse request body: {e}"))),
    }
}

fn parse_value<R: Resource>(value: Value) -> Result<R, ServiceError> {
    serde_json::from_value(value).map_err(|e| {
        ServiceError::Parse(format!("Failed to parse request body into {}: {e}", R::KIND))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Animal, Person, ResourceKind};
    use crate::store::MemoryBackend;
    use serde_json::json;
    use std::sync::Arc;

    async fn store() -> RecordStore {
        let backend = Arc::new(MemoryBackend::new(true));
        crate::store::Backend::ensure_tables(backend.as_ref(), &ResourceKind::tables())
            .await
            .unwrap();
        RecordStore::new(backend)
    }

    fn call(operation: Operation, id: Option<&str>, body: Value) -> Invocation {
        Invocation {
            operation,
            id: id.map(String::from),
            body: if body.is_null() {
                Bytes::new()
            } else {
                Bytes::from(body.to_string())
            },
        }
    }

    /// Create and return the generated id.
    async fn create_person(store: &RecordStore, body: Value) -> String {
        let env = handle::<Person>(store.clone(), call(Operation::Create, None, body)).await;
        assert_eq!(env.status, StatusCode::CREATED, "{}", env.body_str());
        env.body_str()
            .strip_prefix("Person with ID ")
            .and_then(|s| s.strip_suffix(" added"))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_create_read_delete_cycle() {
        let store = store().await;
        let id = create_person(&store, json!({"name": "Ada", "age": 30})).await;

        let env = handle::<Person>(store.clone(), call(Operation::Read, Some(&id), Value::Null)).await;
        assert_eq!(env.status, StatusCode::OK);
        let person: Person = serde_json::from_slice(&env.body).unwrap();
        assert_eq!((person.name.as_str(), person.age), ("Ada", 30));
        assert_eq!(person.id, id);

        let env = handle::<Person>(store.clone(), call(Operation::Delete, Some(&id), Value::Null)).await;
        assert_eq!(env.status, StatusCode::OK);

        let env = handle::<Person>(store.clone(), call(Operation::Read, Some(&id), Value::Null)).await;
        assert_eq!(env.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_client_supplied_id_is_kept() {
        let store = store().await;
        let id = create_person(&store, json!({"id": "ada-1", "name": "Ada"})).await;
        assert_eq!(id, "ada-1");
    }

    #[tokio::test]
    async fn test_missing_id_and_bad_bodies() {
        let store = store().await;

        let env = handle::<Person>(store.clone(), call(Operation::Read, None, Value::Null)).await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);
        assert_eq!(env.body_str(), "Person ID not provided in the URL");

        let env = handle::<Person>(store.clone(), call(Operation::Create, None, Value::Null)).await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);
        assert_eq!(env.body_str(), "Request body is empty");

        let bad = Invocation {
            operation: Operation::Create,
            id: None,
            body: Bytes::from_static(b"{not json"),
        };
        let env = handle::<Person>(store.clone(), bad).await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);

        let env = handle::<Person>(store.clone(), call(Operation::Create, None, json!({"age": 3}))).await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);
        assert!(env.body_str().contains("EmptyField: name is required"));
    }

    #[tokio::test]
    async fn test_replace_upserts_and_merges() {
        let store = store().await;

        let env = handle::<Animal>(
            store.clone(),
            call(Operation::Replace, Some("a-1"), json!({"name": "Rex", "age": 2})),
        )
        .await;
        assert_eq!(env.status, StatusCode::NO_CONTENT);

        let env = handle::<Animal>(
            store.clone(),
            call(Operation::Replace, Some("a-1"), json!({"age": 3, "deleted": true})),
        )
        .await;
        assert_eq!(env.status, StatusCode::NO_CONTENT);

        let animal: Animal = store.read("a-1").await.unwrap();
        assert_eq!((animal.name.as_str(), animal.age, animal.deleted), ("Rex", 3, false));

        let env = handle::<Animal>(
            store.clone(),
            call(Operation::Replace, Some("a-1"), json!({"id": "other"})),
        )
        .await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_replace_with_null_clears_optional_field() {
        let store = store().await;
        handle::<Person>(
            store.clone(),
            call(Operation::Replace, Some("p-1"), json!({"name": "Ada", "description": "x"})),
        )
        .await;

        let env = handle::<Person>(
            store.clone(),
            call(Operation::Replace, Some("p-1"), json!({"description": null})),
        )
        .await;
        assert_eq!(env.status, StatusCode::NO_CONTENT);

        let person: Person = store.read("p-1").await.unwrap();
        assert_eq!(person.description, None);
        assert_eq!(person.name, "Ada");
    }

    #[tokio::test]
    async fn test_deleted_id_cannot_be_reused() {
        let store = store().await;
        let id = create_person(&store, json!({"name": "Ada"})).await;
        let env = handle::<Person>(store.clone(), call(Operation::Delete, Some(&id), Value::Null)).await;
        assert_eq!(env.status, StatusCode::OK);

        let env = handle::<Person>(
            store.clone(),
            call(Operation::Replace, Some(&id), json!({"name": "Ada"})),
        )
        .await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);
        assert!(env.body_str().contains(&format!("Person with ID {id} was deleted")), "{}", env.body_str());

        let env = handle::<Person>(
            store.clone(),
            call(Operation::Create, None, json!({"id": id, "name": "Ada"})),
        )
        .await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);
        assert!(env.body_str().contains("already exists"), "{}", env.body_str());
    }

    #[tokio::test]
    async fn test_patch_rules() {
        let store = store().await;

        let env = handle::<Person>(
            store.clone(),
            call(Operation::Patch, Some("ghost"), json!({"age": 1})),
        )
        .await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);
        assert!(env.body_str().contains("only allowed on existing records"));

        let id = create_person(&store, json!({"name": "Ada", "age": 30})).await;
        let env = handle::<Person>(
            store.clone(),
            call(Operation::Patch, Some(&id), json!({"description": "mathematician"})),
        )
        .await;
        assert_eq!(env.status, StatusCode::NO_CONTENT);
        let person: Person = store.read(&id).await.unwrap();
        assert_eq!(person.description.as_deref(), Some("mathematician"));

        let env = handle::<Person>(
            store.clone(),
            call(Operation::Patch, Some(&id), json!({"cloned": true})),
        )
        .await;
        assert_eq!(env.status, StatusCode::BAD_REQUEST);
        assert!(env.body_str().contains("UnknownField"));
    }

    #[tokio::test]
    async fn test_clone_creates_linked_copy() {
        let store = store().await;
        let id = create_person(&store, json!({"name": "Ada", "age": 30})).await;

        let env = handle::<Person>(store.clone(), call(Operation::Clone, Some(&id), Value::Null)).await;
        assert_eq!(env.status, StatusCode::CREATED);

        let clone_id = env
            .body_str()
            .strip_prefix("Person with ID ")
            .and_then(|s| s.split(' ').next())
            .unwrap()
            .to_string();
        let copy: Person = store.read(&clone_id).await.unwrap();
        assert!(copy.cloned);
        assert_eq!(copy.cloned_from_ref.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_server_error() {
        let store = store().await;
        create_person(&store, json!({"id": "p-1", "name": "Ada"})).await;

        let env = handle::<Person>(
            store.clone(),
            call(Operation::Create, None, json!({"id": "p-1", "name": "Ada"})),
        )
        .await;
        assert_eq!(env.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(env.body_str().starts_with("Failed to create person"));
    }
}
