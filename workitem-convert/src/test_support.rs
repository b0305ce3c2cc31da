//! In-memory collaborator stores for tests.
//!
//! Compiled only with the `test-support` feature. Every store method honours
//! the cancellation token and counts the lookups tests assert on.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use workitem_fields::{WorkItem, WorkItemType};

use crate::error::{ConvertError, Result};
use crate::store::{
    Area, AreaStore, BoardColumn, BoardColumnStore, Codebase, CodebaseStore, Collaborators,
    Identity, IdentityStore, Iteration, IterationStore, Label, LabelStore, SpaceStore,
    WorkItemLink, WorkItemLinkStore, WorkItemTypeStore, PARENT_CHILD_LINK_TYPE_ID,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn check(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ConvertError::Cancelled);
    }
    Ok(())
}

/// Identifiers created by [`InMemoryStores::add_space`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceFixture {
    pub space_id: Uuid,
    pub root_iteration: Uuid,
    pub root_area: Uuid,
}

#[derive(Default)]
pub struct InMemoryStores {
    identities: Mutex<HashMap<Uuid, Identity>>,
    labels: Mutex<HashMap<Uuid, Label>>,
    board_columns: Mutex<HashMap<Uuid, BoardColumn>>,
    iterations: Mutex<HashMap<Uuid, Iteration>>,
    areas: Mutex<HashMap<Uuid, Area>>,
    spaces: Mutex<HashSet<Uuid>>,
    roots: Mutex<HashMap<Uuid, (Uuid, Uuid)>>,
    codebases: Mutex<Vec<Codebase>>,
    types: Mutex<HashMap<Uuid, WorkItemType>>,
    links: Mutex<Vec<WorkItemLink>>,
    items: Mutex<HashMap<Uuid, WorkItem>>,
    name_loads: AtomicUsize,
    validations: AtomicUsize,
    codebase_creates: AtomicUsize,
    children_queries: AtomicUsize,
    fail_children_queries: AtomicBool,
}

impl InMemoryStores {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Trait-object handles onto this store for the engine.
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            identities: self.clone(),
            labels: self.clone(),
            board_columns: self.clone(),
            iterations: self.clone(),
            areas: self.clone(),
            spaces: self.clone(),
            codebases: self.clone(),
            work_item_types: self.clone(),
            work_item_links: self.clone(),
        }
    }

    pub fn add_user(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.identities).insert(
            id,
            Identity {
                id,
                username: username.to_string(),
            },
        );
        id
    }

    pub fn add_label(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.labels).insert(
            id,
            Label {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_board_column(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.board_columns).insert(
            id,
            BoardColumn {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    /// Register a space with its root iteration and root area, both named
    /// after the space.
    pub fn add_space(&self, name: &str) -> SpaceFixture {
        let space_id = Uuid::new_v4();
        lock(&self.spaces).insert(space_id);
        let root_iteration = self.add_iteration(space_id, name);
        let root_area = self.add_area(space_id, name);
        lock(&self.roots).insert(space_id, (root_iteration, root_area));
        SpaceFixture {
            space_id,
            root_iteration,
            root_area,
        }
    }

    pub fn add_iteration(&self, space_id: Uuid, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.iterations).insert(
            id,
            Iteration {
                id,
                space_id,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_area(&self, space_id: Uuid, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.areas).insert(
            id,
            Area {
                id,
                space_id,
                name: name.to_string(),
            },
        );
        id
    }

    pub fn add_type(&self, work_item_type: WorkItemType) {
        lock(&self.types).insert(work_item_type.id, work_item_type);
    }

    pub fn add_codebase(&self, space_id: Uuid, url: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.codebases).push(Codebase {
            id,
            space_id,
            kind: "git".to_string(),
            url: url.to_string(),
            stack_id: None,
        });
        id
    }

    /// Store `child` and link it below `parent`.
    pub fn add_child(&self, parent: Uuid, child: WorkItem) {
        lock(&self.links).push(WorkItemLink {
            id: Uuid::new_v4(),
            link_type_id: PARENT_CHILD_LINK_TYPE_ID,
            source_id: parent,
            target_id: child.id,
        });
        lock(&self.items).insert(child.id, child);
    }

    pub fn codebases(&self) -> Vec<Codebase> {
        lock(&self.codebases).clone()
    }

    /// Display-name loads across every reference store.
    pub fn name_loads(&self) -> usize {
        self.name_loads.load(Ordering::SeqCst)
    }

    /// Existence probes through `is_valid` across every reference store.
    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    pub fn codebase_creates(&self) -> usize {
        self.codebase_creates.load(Ordering::SeqCst)
    }

    pub fn children_queries(&self) -> usize {
        self.children_queries.load(Ordering::SeqCst)
    }

    /// Make `work_item_has_children` fail until reset.
    pub fn fail_children_queries(&self, fail: bool) {
        self.fail_children_queries.store(fail, Ordering::SeqCst);
    }

    fn count_load(&self) {
        self.name_loads.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityStore for InMemoryStores {
    async fn is_valid(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool> {
        check(cancel)?;
        self.validations.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.identities).contains_key(&id))
    }

    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<Identity> {
        check(cancel)?;
        self.count_load();
        lock(&self.identities)
            .get(&id)
            .cloned()
            .ok_or_else(|| ConvertError::not_found("identity", id))
    }
}

#[async_trait]
impl LabelStore for InMemoryStores {
    async fn is_valid(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool> {
        check(cancel)?;
        self.validations.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.labels).contains_key(&id))
    }

    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<Label> {
        check(cancel)?;
        self.count_load();
        lock(&self.labels)
            .get(&id)
            .cloned()
            .ok_or_else(|| ConvertError::not_found("label", id))
    }
}

#[async_trait]
impl BoardColumnStore for InMemoryStores {
    async fn is_valid(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool> {
        check(cancel)?;
        self.validations.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.board_columns).contains_key(&id))
    }

    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<BoardColumn> {
        check(cancel)?;
        self.count_load();
        lock(&self.board_columns)
            .get(&id)
            .cloned()
            .ok_or_else(|| ConvertError::not_found("board column", id))
    }
}

#[async_trait]
impl IterationStore for InMemoryStores {
    async fn check_exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<()> {
        check(cancel)?;
        if lock(&self.iterations).contains_key(&id) {
            Ok(())
        } else {
            Err(ConvertError::not_found("iteration", id))
        }
    }

    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<Iteration> {
        check(cancel)?;
        self.count_load();
        lock(&self.iterations)
            .get(&id)
            .cloned()
            .ok_or_else(|| ConvertError::not_found("iteration", id))
    }

    async fn root(&self, space_id: Uuid, cancel: &CancellationToken) -> Result<Iteration> {
        check(cancel)?;
        let root = lock(&self.roots).get(&space_id).map(|(iteration, _)| *iteration);
        root.and_then(|id| lock(&self.iterations).get(&id).cloned())
            .ok_or_else(|| ConvertError::not_found("root iteration", space_id))
    }
}

#[async_trait]
impl AreaStore for InMemoryStores {
    async fn check_exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<()> {
        check(cancel)?;
        if lock(&self.areas).contains_key(&id) {
            Ok(())
        } else {
            Err(ConvertError::not_found("area", id))
        }
    }

    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<Area> {
        check(cancel)?;
        self.count_load();
        lock(&self.areas)
            .get(&id)
            .cloned()
            .ok_or_else(|| ConvertError::not_found("area", id))
    }

    async fn root(&self, space_id: Uuid, cancel: &CancellationToken) -> Result<Area> {
        check(cancel)?;
        let root = lock(&self.roots).get(&space_id).map(|(_, area)| *area);
        root.and_then(|id| lock(&self.areas).get(&id).cloned())
            .ok_or_else(|| ConvertError::not_found("root area", space_id))
    }
}

#[async_trait]
impl SpaceStore for InMemoryStores {
    async fn check_exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<()> {
        check(cancel)?;
        if lock(&self.spaces).contains(&id) {
            Ok(())
        } else {
            Err(ConvertError::not_found("space", id))
        }
    }
}

#[async_trait]
impl CodebaseStore for InMemoryStores {
    async fn load_by_repo(
        &self,
        space_id: Uuid,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Codebase>> {
        check(cancel)?;
        Ok(lock(&self.codebases)
            .iter()
            .find(|codebase| codebase.space_id == space_id && codebase.url == url)
            .cloned())
    }

    async fn create(&self, codebase: Codebase, cancel: &CancellationToken) -> Result<Codebase> {
        check(cancel)?;
        self.codebase_creates.fetch_add(1, Ordering::SeqCst);
        lock(&self.codebases).push(codebase.clone());
        Ok(codebase)
    }
}

#[async_trait]
impl WorkItemTypeStore for InMemoryStores {
    async fn load(&self, id: Uuid, cancel: &CancellationToken) -> Result<WorkItemType> {
        check(cancel)?;
        lock(&self.types)
            .get(&id)
            .cloned()
            .ok_or_else(|| ConvertError::not_found("work item type", id))
    }
}

#[async_trait]
impl WorkItemLinkStore for InMemoryStores {
    async fn work_item_has_children(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool> {
        check(cancel)?;
        self.children_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_children_queries.load(Ordering::SeqCst) {
            return Err(ConvertError::internal("link store unavailable"));
        }
        Ok(lock(&self.links)
            .iter()
            .any(|l| l.link_type_id == PARENT_CHILD_LINK_TYPE_ID && l.source_id == id))
    }

    async fn list_children(
        &self,
        id: Uuid,
        offset: usize,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<(Vec<WorkItem>, usize)> {
        check(cancel)?;
        let child_ids: Vec<Uuid> = lock(&self.links)
            .iter()
            .filter(|l| l.link_type_id == PARENT_CHILD_LINK_TYPE_ID && l.source_id == id)
            .map(|l| l.target_id)
            .collect();
        let items = lock(&self.items);
        let page = child_ids
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|child| items.get(child).cloned())
            .collect();
        Ok((page, child_ids.len()))
    }

    async fn parent_id_of(
        &self,
        id: Uuid,
        link_type_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<Uuid>> {
        check(cancel)?;
        Ok(lock(&self.links)
            .iter()
            .find(|l| l.link_type_id == link_type_id && l.target_id == id)
            .map(|l| l.source_id))
    }
}
