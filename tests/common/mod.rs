//! Shared demo domain: a users feature with local edits and async flows.

#![allow(dead_code, unused_imports)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use eddy::{
    Effect, Entity, EntityCollection, Event, GatewayError, Reducer, ResourceGateway, StateTree,
};

// -- Records ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl Entity for User {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
    }
}

// -- Events -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // Local edits from the rendering boundary.
    AddUser { user: User },
    UpdateUser { user: User },
    RemoveUser { id: String },
    SetFilter { needle: String },
    // Async flows closed by effects.
    LoadUsers,
    UsersLoaded { users: Vec<User> },
    UsersLoadFailed { reason: String },
    CreateUser { user: User },
    UserCreated { user: User },
    CreateUserFailed { reason: String },
    SaveUser { user: User },
    UserSaved { user: User },
    SaveUserFailed { reason: String },
    DeleteUser { id: String },
    UserDeleted { id: String },
    DeleteUserFailed { reason: String },
}

impl Event for AppEvent {
    fn tag(&self) -> &'static str {
        match self {
            AppEvent::AddUser { .. } => "users/add",
            AppEvent::UpdateUser { .. } => "users/update",
            AppEvent::RemoveUser { .. } => "users/remove",
            AppEvent::SetFilter { .. } => "ui/set-filter",
            AppEvent::LoadUsers => "users/load",
            AppEvent::UsersLoaded { .. } => "users/load-succeeded",
            AppEvent::UsersLoadFailed { .. } => "users/load-failed",
            AppEvent::CreateUser { .. } => "users/create",
            AppEvent::UserCreated { .. } => "users/create-succeeded",
            AppEvent::CreateUserFailed { .. } => "users/create-failed",
            AppEvent::SaveUser { .. } => "users/save",
            AppEvent::UserSaved { .. } => "users/save-succeeded",
            AppEvent::SaveUserFailed { .. } => "users/save-failed",
            AppEvent::DeleteUser { .. } => "users/delete",
            AppEvent::UserDeleted { .. } => "users/delete-succeeded",
            AppEvent::DeleteUserFailed { .. } => "users/delete-failed",
        }
    }
}

// -- Slices and reducers ------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UsersSlice {
    pub collection: EntityCollection<User>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct UsersReducer;

impl Reducer for UsersReducer {
    type Slice = UsersSlice;
    type Event = AppEvent;

    fn reduce(slice: &Arc<UsersSlice>, event: &AppEvent) -> Arc<UsersSlice> {
        match event {
            AppEvent::LoadUsers => Arc::new(UsersSlice {
                collection: slice.collection.clone(),
                loading: true,
                error: None,
            }),
            AppEvent::UsersLoaded { users } => Arc::new(UsersSlice {
                collection: slice.collection.set_all(users.iter().cloned()),
                loading: false,
                error: None,
            }),
            AppEvent::UsersLoadFailed { reason } => Arc::new(UsersSlice {
                collection: slice.collection.clone(),
                loading: false,
                error: Some(reason.clone()),
            }),
            AppEvent::AddUser { user } => Arc::new(UsersSlice {
                collection: slice.collection.add_one(user.clone()),
                ..(**slice).clone()
            }),
            AppEvent::UpdateUser { user } => {
                let name = user.name.clone();
                Arc::new(UsersSlice {
                    collection: slice.collection.update_one(&user.id, move |u| u.name = name),
                    ..(**slice).clone()
                })
            }
            AppEvent::RemoveUser { id } => Arc::new(UsersSlice {
                collection: slice.collection.remove_one(id),
                ..(**slice).clone()
            }),
            AppEvent::UserCreated { user } => Arc::new(UsersSlice {
                collection: slice.collection.add_one(user.clone()),
                loading: slice.loading,
                error: None,
            }),
            AppEvent::UserSaved { user } => Arc::new(UsersSlice {
                collection: slice.collection.upsert_one(user.clone()),
                loading: slice.loading,
                error: None,
            }),
            AppEvent::UserDeleted { id } => Arc::new(UsersSlice {
                collection: slice.collection.remove_one(id),
                loading: slice.loading,
                error: None,
            }),
            AppEvent::CreateUserFailed { reason }
            | AppEvent::SaveUserFailed { reason }
            | AppEvent::DeleteUserFailed { reason } => Arc::new(UsersSlice {
                collection: slice.collection.clone(),
                loading: slice.loading,
                error: Some(reason.clone()),
            }),
            // Everything else leaves the slice pointer-equal.
            _ => Arc::clone(slice),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSlice {
    pub needle: String,
}

pub struct FilterReducer;

impl Reducer for FilterReducer {
    type Slice = FilterSlice;
    type Event = AppEvent;

    fn reduce(slice: &Arc<FilterSlice>, event: &AppEvent) -> Arc<FilterSlice> {
        match event {
            AppEvent::SetFilter { needle } => Arc::new(FilterSlice {
                needle: needle.clone(),
            }),
            _ => Arc::clone(slice),
        }
    }
}

#[derive(Clone, Default)]
pub struct AppState {
    pub users: Arc<UsersSlice>,
    pub filter: Arc<FilterSlice>,
}

impl StateTree for AppState {
    type Event = AppEvent;

    fn reduce(&self, event: &AppEvent) -> Self {
        Self {
            users: UsersReducer::reduce(&self.users, event),
            filter: FilterReducer::reduce(&self.filter, event),
        }
    }
}

// -- Gateways -----------------------------------------------------------------

/// Fixed-response stub: every `fetch_all` yields the same result.
pub struct StubGateway {
    response: Result<Vec<User>, GatewayError>,
}

impl StubGateway {
    pub fn ok(users: Vec<User>) -> Self {
        Self {
            response: Ok(users),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(GatewayError::Transport(reason.into())),
        }
    }
}

#[async_trait]
impl ResourceGateway<User> for StubGateway {
    async fn fetch_all(&self) -> Result<Vec<User>, GatewayError> {
        self.response.clone()
    }

    async fn create(&self, item: User) -> Result<User, GatewayError> {
        Ok(item)
    }

    async fn replace(&self, item: User) -> Result<User, GatewayError> {
        Ok(item)
    }

    async fn delete(&self, _key: String) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Per-call scripted stub for concurrency tests: each `fetch_all` takes
/// the next (delay, result) entry and tracks overlap.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<(Duration, Result<Vec<User>, GatewayError>)>>,
    started: AtomicUsize,
    running: AtomicUsize,
    max_overlap: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(script: Vec<(Duration, Result<Vec<User>, GatewayError>)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            started: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_overlap: AtomicUsize::new(0),
        })
    }

    /// Calls that have entered `fetch_all` so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `fetch_all` calls observed.
    pub fn max_overlap(&self) -> usize {
        self.max_overlap.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceGateway<User> for ScriptedGateway {
    async fn fetch_all(&self) -> Result<Vec<User>, GatewayError> {
        let (delay, result) = self
            .script
            .lock()
            .pop_front()
            .expect("scripted gateway exhausted");
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_overlap.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn create(&self, item: User) -> Result<User, GatewayError> {
        Ok(item)
    }

    async fn replace(&self, item: User) -> Result<User, GatewayError> {
        Ok(item)
    }

    async fn delete(&self, _key: String) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Fully working in-memory collaborator for end-to-end flows.
pub struct InMemoryGateway {
    records: Mutex<Vec<User>>,
}

impl InMemoryGateway {
    pub fn seeded(records: Vec<User>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
        })
    }

    pub fn records(&self) -> Vec<User> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl ResourceGateway<User> for InMemoryGateway {
    async fn fetch_all(&self) -> Result<Vec<User>, GatewayError> {
        Ok(self.records.lock().clone())
    }

    async fn create(&self, item: User) -> Result<User, GatewayError> {
        let mut records = self.records.lock();
        if records.iter().any(|u| u.id == item.id) {
            return Err(GatewayError::Rejected(format!(
                "id '{}' already taken",
                item.id
            )));
        }
        records.push(item.clone());
        Ok(item)
    }

    async fn replace(&self, item: User) -> Result<User, GatewayError> {
        let mut records = self.records.lock();
        match records.iter_mut().find(|u| u.id == item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item)
            }
            None => Err(GatewayError::NotFound(item.id)),
        }
    }

    async fn delete(&self, key: String) -> Result<(), GatewayError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|u| u.id != key);
        if records.len() == before {
            return Err(GatewayError::NotFound(key));
        }
        Ok(())
    }
}

// -- Effects ------------------------------------------------------------------

pub struct LoadUsersEffect {
    gateway: Arc<dyn ResourceGateway<User>>,
}

impl LoadUsersEffect {
    pub fn new(gateway: Arc<dyn ResourceGateway<User>>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Effect<AppEvent> for LoadUsersEffect {
    fn tags(&self) -> &'static [&'static str] {
        &["users/load"]
    }

    async fn run(&self, _event: AppEvent) -> Option<AppEvent> {
        match self.gateway.fetch_all().await {
            Ok(users) => Some(AppEvent::UsersLoaded { users }),
            Err(err) => Some(AppEvent::UsersLoadFailed {
                reason: err.to_string(),
            }),
        }
    }
}

pub struct CreateUserEffect {
    gateway: Arc<dyn ResourceGateway<User>>,
}

impl CreateUserEffect {
    pub fn new(gateway: Arc<dyn ResourceGateway<User>>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Effect<AppEvent> for CreateUserEffect {
    fn tags(&self) -> &'static [&'static str] {
        &["users/create"]
    }

    async fn run(&self, event: AppEvent) -> Option<AppEvent> {
        let AppEvent::CreateUser { user } = event else {
            return None;
        };
        match self.gateway.create(user).await {
            Ok(user) => Some(AppEvent::UserCreated { user }),
            Err(err) => Some(AppEvent::CreateUserFailed {
                reason: err.to_string(),
            }),
        }
    }
}

pub struct SaveUserEffect {
    gateway: Arc<dyn ResourceGateway<User>>,
}

impl SaveUserEffect {
    pub fn new(gateway: Arc<dyn ResourceGateway<User>>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Effect<AppEvent> for SaveUserEffect {
    fn tags(&self) -> &'static [&'static str] {
        &["users/save"]
    }

    async fn run(&self, event: AppEvent) -> Option<AppEvent> {
        let AppEvent::SaveUser { user } = event else {
            return None;
        };
        match self.gateway.replace(user).await {
            Ok(user) => Some(AppEvent::UserSaved { user }),
            Err(err) => Some(AppEvent::SaveUserFailed {
                reason: err.to_string(),
            }),
        }
    }
}

pub struct DeleteUserEffect {
    gateway: Arc<dyn ResourceGateway<User>>,
}

impl DeleteUserEffect {
    pub fn new(gateway: Arc<dyn ResourceGateway<User>>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Effect<AppEvent> for DeleteUserEffect {
    fn tags(&self) -> &'static [&'static str] {
        &["users/delete"]
    }

    async fn run(&self, event: AppEvent) -> Option<AppEvent> {
        let AppEvent::DeleteUser { id } = event else {
            return None;
        };
        match self.gateway.delete(id.clone()).await {
            Ok(()) => Some(AppEvent::UserDeleted { id }),
            Err(err) => Some(AppEvent::DeleteUserFailed {
                reason: err.to_string(),
            }),
        }
    }
}

/// Records every matching event; dispatches nothing.
pub struct RecordingEffect {
    tags: &'static [&'static str],
    seen: Arc<Mutex<Vec<AppEvent>>>,
}

impl RecordingEffect {
    pub fn new(tags: &'static [&'static str]) -> Self {
        Self {
            tags,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<AppEvent>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl Effect<AppEvent> for RecordingEffect {
    fn tags(&self) -> &'static [&'static str] {
        self.tags
    }

    async fn run(&self, event: AppEvent) -> Option<AppEvent> {
        self.seen.lock().push(event);
        None
    }
}

// -- Helpers ------------------------------------------------------------------

/// Poll `condition` until it holds or a second passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 1s");
}

/// The ids/entities pairing every collection must uphold.
pub fn assert_collection_invariants(collection: &EntityCollection<User>) {
    let ids = collection.ids();
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "duplicate keys in ids");
    assert_eq!(ids.len(), collection.len());
    for id in ids {
        assert!(collection.get(id).is_some(), "id '{id}' missing an entity");
    }
}
