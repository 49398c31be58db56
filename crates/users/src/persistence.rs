//! Persistence collaborator and the operation report returned to the client.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use backoffice_core::{DomainError, DomainResult, Entity, GroupId, PermissionId, UserId};

use crate::filter::{Filter, matches_all};
use crate::hydration::{HydrationGroup, project};
use crate::record::{GroupRef, PermissionRef, UserRecord};

/// One entity touched by an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    pub entity_class: String,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Created,
    Updated,
    Removed,
}

/// What a mutation did, grouped by operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<EntityReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updated: Vec<EntityReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<EntityReport>,
}

impl OperationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_entity<E>(&mut self, operation: Operation, entity: &E)
    where
        E: Entity,
        E::Id: ToString,
    {
        let report = EntityReport {
            entity_class: E::CLASS.to_string(),
            id: entity.id().to_string(),
        };
        match operation {
            Operation::Created => self.created.push(report),
            Operation::Updated => self.updated.push(report),
            Operation::Removed => self.removed.push(report),
        }
    }

    pub fn merge(&mut self, other: OperationResult) {
        self.created.extend(other.created);
        self.updated.extend(other.updated);
        self.removed.extend(other.removed);
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Ordering and paging for `find_all`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Vec<Filter>,
    pub start: usize,
    pub limit: Option<usize>,
}

/// One page of users plus the number of matches before paging.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<UserRecord>,
    pub total: usize,
}

/// Storage backend for user accounts.
///
/// Filters are evaluated against the `list` projection of a user, so clients
/// filter on the same property names they read.
pub trait PersistenceHandler: Send + Sync {
    fn find(&self, filter: &[Filter]) -> DomainResult<Vec<UserRecord>>;

    fn find_all(&self, query: &ListQuery) -> DomainResult<Page>;

    fn create(&self, user: &UserRecord) -> DomainResult<OperationResult>;

    fn update(&self, user: &UserRecord) -> DomainResult<OperationResult>;

    fn remove(&self, users: &[UserRecord]) -> DomainResult<OperationResult>;

    fn resolve_groups(&self, ids: &[GroupId]) -> DomainResult<Vec<GroupRef>>;

    fn resolve_permissions(&self, ids: &[PermissionId]) -> DomainResult<Vec<PermissionRef>>;

    fn find_by_id(&self, id: UserId) -> DomainResult<Option<UserRecord>> {
        Ok(self
            .find(&[Filter::eq("id", id.to_string())])?
            .into_iter()
            .next())
    }

    /// Users whose username equals `username`, ignoring ASCII case.
    fn find_by_username(&self, username: &str) -> DomainResult<Vec<UserRecord>> {
        Ok(self
            .find(&[])?
            .into_iter()
            .filter(|user| user.username.eq_ignore_ascii_case(username))
            .collect())
    }
}

impl<S> PersistenceHandler for Arc<S>
where
    S: PersistenceHandler + ?Sized,
{
    fn find(&self, filter: &[Filter]) -> DomainResult<Vec<UserRecord>> {
        (**self).find(filter)
    }

    fn find_all(&self, query: &ListQuery) -> DomainResult<Page> {
        (**self).find_all(query)
    }

    fn create(&self, user: &UserRecord) -> DomainResult<OperationResult> {
        (**self).create(user)
    }

    fn update(&self, user: &UserRecord) -> DomainResult<OperationResult> {
        (**self).update(user)
    }

    fn remove(&self, users: &[UserRecord]) -> DomainResult<OperationResult> {
        (**self).remove(users)
    }

    fn resolve_groups(&self, ids: &[GroupId]) -> DomainResult<Vec<GroupRef>> {
        (**self).resolve_groups(ids)
    }

    fn resolve_permissions(&self, ids: &[PermissionId]) -> DomainResult<Vec<PermissionRef>> {
        (**self).resolve_permissions(ids)
    }

    fn find_by_id(&self, id: UserId) -> DomainResult<Option<UserRecord>> {
        (**self).find_by_id(id)
    }

    fn find_by_username(&self, username: &str) -> DomainResult<Vec<UserRecord>> {
        (**self).find_by_username(username)
    }
}

/// In-memory user store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
    groups: RwLock<HashMap<GroupId, String>>,
    permissions: RwLock<HashMap<PermissionId, String>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing users (bypasses uniqueness checks).
    pub fn with_users(self, users: impl IntoIterator<Item = UserRecord>) -> Self {
        if let Ok(mut map) = self.users.write() {
            map.extend(users.into_iter().map(|u| (u.id, u)));
        }
        self
    }

    pub fn with_groups(self, groups: impl IntoIterator<Item = GroupRef>) -> Self {
        if let Ok(mut map) = self.groups.write() {
            map.extend(groups.into_iter().map(|g| (g.id, g.name)));
        }
        self
    }

    pub fn with_permissions(self, permissions: impl IntoIterator<Item = PermissionRef>) -> Self {
        if let Ok(mut map) = self.permissions.write() {
            map.extend(permissions.into_iter().map(|p| (p.id, p.name)));
        }
        self
    }

    /// Snapshot of one stored user.
    pub fn get(&self, id: UserId) -> Option<UserRecord> {
        self.users.read().ok()?.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching(&self, filter: &[Filter]) -> DomainResult<Vec<UserRecord>> {
        let map = self.users.read().map_err(|_| poisoned())?;
        let mut found: Vec<UserRecord> = map
            .values()
            .filter(|user| matches_all(filter, &project(user, HydrationGroup::List)))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    fn ensure_unique_username(map: &HashMap<UserId, UserRecord>, user: &UserRecord) -> DomainResult<()> {
        let taken = map
            .values()
            .any(|other| other.id != user.id && other.username.eq_ignore_ascii_case(&user.username));
        if taken {
            return Err(DomainError::conflict(format!("username '{}' is already taken", user.username)));
        }
        Ok(())
    }
}

fn poisoned() -> DomainError {
    DomainError::invariant("user store lock poisoned")
}

impl PersistenceHandler for InMemoryUserStore {
    fn find(&self, filter: &[Filter]) -> DomainResult<Vec<UserRecord>> {
        self.matching(filter)
    }

    fn find_all(&self, query: &ListQuery) -> DomainResult<Page> {
        let found = self.matching(&query.filter)?;
        let total = found.len();
        let items = found
            .into_iter()
            .skip(query.start)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(Page { items, total })
    }

    fn create(&self, user: &UserRecord) -> DomainResult<OperationResult> {
        let mut map = self.users.write().map_err(|_| poisoned())?;
        if map.contains_key(&user.id) {
            return Err(DomainError::conflict(format!("user {} already exists", user.id)));
        }
        Self::ensure_unique_username(&map, user)?;
        map.insert(user.id, user.clone());

        let mut result = OperationResult::new();
        result.report_entity(Operation::Created, user);
        Ok(result)
    }

    fn update(&self, user: &UserRecord) -> DomainResult<OperationResult> {
        let mut map = self.users.write().map_err(|_| poisoned())?;
        if !map.contains_key(&user.id) {
            return Err(DomainError::not_found());
        }
        Self::ensure_unique_username(&map, user)?;
        map.insert(user.id, user.clone());

        let mut result = OperationResult::new();
        result.report_entity(Operation::Updated, user);
        Ok(result)
    }

    fn remove(&self, users: &[UserRecord]) -> DomainResult<OperationResult> {
        let mut map = self.users.write().map_err(|_| poisoned())?;
        let mut result = OperationResult::new();
        for user in users {
            if map.remove(&user.id).is_some() {
                result.report_entity(Operation::Removed, user);
            }
        }
        Ok(result)
    }

    fn resolve_groups(&self, ids: &[GroupId]) -> DomainResult<Vec<GroupRef>> {
        let map = self.groups.read().map_err(|_| poisoned())?;
        ids.iter()
            .map(|id| {
                map.get(id)
                    .map(|name| GroupRef {
                        id: *id,
                        name: name.clone(),
                    })
                    .ok_or_else(|| DomainError::validation(format!("unknown group {id}")))
            })
            .collect()
    }

    fn resolve_permissions(&self, ids: &[PermissionId]) -> DomainResult<Vec<PermissionRef>> {
        let map = self.permissions.read().map_err(|_| poisoned())?;
        ids.iter()
            .map(|id| {
                map.get(id)
                    .map(|name| PermissionRef {
                        id: *id,
                        name: name.clone(),
                    })
                    .ok_or_else(|| DomainError::validation(format!("unknown permission {id}")))
            })
            .collect()
    }
}
