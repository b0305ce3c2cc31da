//! Validation and display-name resolution of reference-typed field values.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;
use workitem_fields::Kind;

use crate::error::{ConvertError, Result, ResultExt};
use crate::store::Collaborators;

/// Display names already looked up during one conversion or export call.
///
/// Each call builds its own cache and drops it when done; a cache is never
/// shared between concurrent calls.
#[derive(Debug, Default)]
pub struct ResolveCache {
    names: HashMap<(Kind, Uuid), String>,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: Kind, id: Uuid) -> Option<&str> {
        self.names.get(&(kind, id)).map(String::as_str)
    }

    pub fn insert(&mut self, kind: Kind, id: Uuid, name: String) {
        self.names.insert((kind, id), name);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Checks and resolves identifiers against the owning collaborator stores.
pub struct RelationshipResolver<'a> {
    stores: &'a Collaborators,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(stores: &'a Collaborators) -> Self {
        Self { stores }
    }

    /// Whether an entity of the given reference kind exists.
    pub async fn is_valid(&self, kind: Kind, id: Uuid, cancel: &CancellationToken) -> Result<bool> {
        match kind {
            Kind::User => self.stores.identities.is_valid(id, cancel).await,
            Kind::Label => self.stores.labels.is_valid(id, cancel).await,
            Kind::BoardColumn => self.stores.board_columns.is_valid(id, cancel).await,
            Kind::Iteration => exists(self.stores.iterations.check_exists(id, cancel).await),
            Kind::Area => exists(self.stores.areas.check_exists(id, cancel).await),
            other => Err(ConvertError::internal(format!(
                "{other} is not a reference kind"
            ))),
        }
    }

    /// Load the canonical display name of a referenced entity.
    pub async fn load(&self, kind: Kind, id: Uuid, cancel: &CancellationToken) -> Result<String> {
        match kind {
            Kind::User => Ok(self.stores.identities.load(id, cancel).await?.username),
            Kind::Label => Ok(self.stores.labels.load(id, cancel).await?.name),
            Kind::BoardColumn => Ok(self.stores.board_columns.load(id, cancel).await?.name),
            Kind::Iteration => Ok(self.stores.iterations.load(id, cancel).await?.name),
            Kind::Area => Ok(self.stores.areas.load(id, cancel).await?.name),
            other => Err(ConvertError::internal(format!(
                "{other} is not a reference kind"
            ))),
        }
    }

    /// Turn a token into its display form.
    ///
    /// Tokens of non-reference kinds are returned unchanged. Reference tokens
    /// are looked up in `cache` first and loaded from the store on a miss.
    pub async fn resolve(
        &self,
        field: &str,
        kind: Kind,
        token: &str,
        cache: &mut ResolveCache,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if !kind.is_reference() {
            return Ok(token.to_string());
        }
        let id = Uuid::parse_str(token).map_err(|_| ConvertError::bad_parameter(field, token))?;
        if let Some(name) = cache.get(kind, id) {
            trace!(field, %kind, %id, "resolve cache hit");
            return Ok(name.to_string());
        }
        let name = self
            .load(kind, id, cancel)
            .await
            .context(|| format!("failed to resolve {kind} {id} for field {field}"))?;
        cache.insert(kind, id, name.clone());
        Ok(name)
    }

    /// The root iteration of a space, failing `NotFound` if the space is absent.
    pub async fn root_iteration(&self, space_id: Uuid, cancel: &CancellationToken) -> Result<Uuid> {
        self.stores.spaces.check_exists(space_id, cancel).await?;
        let root = self.stores.iterations.root(space_id, cancel).await?;
        debug!(space_id = %space_id, iteration_id = %root.id, "assigning root iteration");
        Ok(root.id)
    }

    /// The root area of a space, failing `NotFound` if the space is absent.
    pub async fn root_area(&self, space_id: Uuid, cancel: &CancellationToken) -> Result<Uuid> {
        self.stores.spaces.check_exists(space_id, cancel).await?;
        let root = self.stores.areas.root(space_id, cancel).await?;
        debug!(space_id = %space_id, area_id = %root.id, "assigning root area");
        Ok(root.id)
    }

    /// Parse and validate each identifier in order.
    ///
    /// The first malformed or unknown identifier fails `BadParameter` naming
    /// `parameter`. With `dedup` the result keeps only the first occurrence of
    /// each identifier.
    pub async fn validate_ids(
        &self,
        kind: Kind,
        parameter: &str,
        tokens: &[String],
        dedup: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let id =
                Uuid::parse_str(token).map_err(|_| ConvertError::bad_parameter(parameter, token))?;
            if dedup && ids.contains(&id) {
                continue;
            }
            if !self.is_valid(kind, id, cancel).await? {
                return Err(ConvertError::bad_parameter(parameter, token));
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// Parse an iteration or area identifier and check that it exists.
    pub async fn check_exists(
        &self,
        kind: Kind,
        parameter: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<Uuid> {
        let id = Uuid::parse_str(token).map_err(|_| ConvertError::bad_parameter(parameter, token))?;
        let checked = match kind {
            Kind::Iteration => self.stores.iterations.check_exists(id, cancel).await,
            Kind::Area => self.stores.areas.check_exists(id, cancel).await,
            other => {
                return Err(ConvertError::internal(format!(
                    "{other} has no existence check"
                )))
            }
        };
        match checked {
            Ok(()) => Ok(id),
            Err(e) if e.is_not_found() => Err(ConvertError::not_found(parameter, token)),
            Err(e) => Err(e.with_context(format!("failed to verify {kind} id {token}"))),
        }
    }
}

fn exists(checked: Result<()>) -> Result<bool> {
    match checked {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_is_keyed_by_kind_and_id() {
        let id = Uuid::new_v4();
        let mut cache = ResolveCache::new();
        assert!(cache.is_empty());
        cache.insert(Kind::User, id, "alice".into());
        assert_eq!(cache.get(Kind::User, id), Some("alice"));
        assert_eq!(cache.get(Kind::Label, id), None);
        assert_eq!(cache.len(), 1);
    }
}
