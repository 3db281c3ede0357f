//! Relationship resolution for a single subject
//!
//! Produces the friends, followers, fans and stans mappings of one subject by
//! combining remote calls with the on-disk cache:
//!
//! - friends/followers are listed remotely when forced or when the cached list
//!   is stale, and every member's handle is resolved through the user cache
//! - fans/stans are set differences of the two primitive lists; a cached
//!   derived mapping is only reused while it is fresh and newer than both
//!   primitives it was computed from
//!
//! Every remote call is awaited before the next one starts.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheArea, CacheError, CacheStore};
use crate::data::{
    Category, OutputFormat, Projection, RelationshipMapping, StatusRecord, UserId, UserRecord,
};
use crate::remote::{RelationshipList, RemoteClient, RemoteError};

/// Errors that can occur while resolving relationships
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The requested category name is not one of friends, followers, fans, stans
    #[error("Invalid category: '{0}'. Valid categories: friends, followers, fans, stans")]
    InvalidCategory(String),

    /// A required argument was missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote API call failed
    #[error("Remote fetch failed: {0}")]
    RemoteFetchFailed(#[from] RemoteError),

    /// Reading or writing the cache failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A user record has no handle
    #[error("User record {id} has no screen_name")]
    MalformedRecord { id: UserId },
}

/// Staleness thresholds in days; a negative value disables age-based refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Maximum age of a cached user record
    pub users_days: i64,
    /// Maximum age of a cached relationship mapping
    pub lists_days: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            users_days: 30,
            lists_days: 1,
        }
    }
}

/// Computes the member IDs of a category from the two primitive ID sets.
///
/// `fans = followers − friends`, `stans = friends − followers`.
pub fn derive_ids(
    category: Category,
    friends: &BTreeSet<UserId>,
    followers: &BTreeSet<UserId>,
) -> BTreeSet<UserId> {
    match category {
        Category::Friends => friends.clone(),
        Category::Followers => followers.clone(),
        Category::Fans => followers.difference(friends).copied().collect(),
        Category::Stans => friends.difference(followers).copied().collect(),
    }
}

/// Fetches a status record through the tweets cache area.
///
/// Status records never go stale by age; they are only refetched when forced.
pub async fn cached_status<C: RemoteClient>(
    client: &C,
    store: &CacheStore,
    id: u64,
    force: bool,
) -> Result<StatusRecord, ResolveError> {
    let key = id.to_string();
    if !force && store.exists(CacheArea::Tweets, &key) {
        return Ok(store.get::<StatusRecord>(CacheArea::Tweets, &key)?.payload);
    }

    debug!(id, "fetching status record");
    let record = client.fetch_status(id).await?;
    store.put(CacheArea::Tweets, &key, &record)?;
    Ok(record)
}

/// Resolves the relationship mappings of one subject
///
/// Resolved mappings are memoized for the lifetime of the resolver; a forced
/// request always bypasses the memo.
#[derive(Debug)]
pub struct RelationshipResolver<C> {
    username: String,
    client: C,
    store: CacheStore,
    thresholds: Thresholds,
    memo: HashMap<Category, RelationshipMapping>,
}

impl<C: RemoteClient> RelationshipResolver<C> {
    /// Creates a resolver for `username`
    ///
    /// # Returns
    /// * `Err(ResolveError::InvalidArgument)` if the username is empty or
    ///   cannot be used as a cache path segment
    pub fn new(
        username: impl Into<String>,
        client: C,
        store: CacheStore,
    ) -> Result<Self, ResolveError> {
        let username = username.into().trim().trim_start_matches('@').to_string();
        if username.is_empty() {
            return Err(ResolveError::InvalidArgument(
                "a subject username is required".to_string(),
            ));
        }
        if username.contains(['/', '\\']) || username.starts_with('.') {
            return Err(ResolveError::InvalidArgument(format!(
                "'{}' is not a valid username",
                username
            )));
        }

        Ok(Self {
            username,
            client,
            store,
            thresholds: Thresholds::default(),
            memo: HashMap::new(),
        })
    }

    /// Replaces the staleness thresholds
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Accounts the subject follows
    pub async fn friends(&mut self, force: bool) -> Result<RelationshipMapping, ResolveError> {
        self.resolve(Category::Friends, force).await
    }

    /// Accounts that follow the subject
    pub async fn followers(&mut self, force: bool) -> Result<RelationshipMapping, ResolveError> {
        self.resolve(Category::Followers, force).await
    }

    /// Followers the subject does not follow back
    pub async fn fans(&mut self, force: bool) -> Result<RelationshipMapping, ResolveError> {
        self.resolve(Category::Fans, force).await
    }

    /// Followed accounts that do not follow back
    pub async fn stans(&mut self, force: bool) -> Result<RelationshipMapping, ResolveError> {
        self.resolve(Category::Stans, force).await
    }

    /// Resolves any category
    ///
    /// Forcing a derived category also forces both primitive lists, since
    /// recomputing from unchanged inputs would be a no-op.
    pub async fn resolve(
        &mut self,
        category: Category,
        force: bool,
    ) -> Result<RelationshipMapping, ResolveError> {
        match category {
            Category::Friends => self.resolve_primitive(RelationshipList::Friends, force).await,
            Category::Followers => {
                self.resolve_primitive(RelationshipList::Followers, force)
                    .await
            }
            Category::Fans | Category::Stans => self.resolve_derived(category, force).await,
        }
    }

    /// Resolves a category given by name
    pub async fn resolve_named(
        &mut self,
        name: &str,
        force: bool,
    ) -> Result<RelationshipMapping, ResolveError> {
        let category =
            Category::parse(name).ok_or_else(|| ResolveError::InvalidCategory(name.to_string()))?;
        self.resolve(category, force).await
    }

    /// Resolves a category and projects it into an output format
    pub async fn relationship(
        &mut self,
        category: Category,
        force: bool,
        format: OutputFormat,
    ) -> Result<Projection, ResolveError> {
        Ok(self.resolve(category, force).await?.project(format))
    }

    /// Fetches a user record, using the cache unless stale or forced
    pub async fn user(&self, id: UserId, force: bool) -> Result<UserRecord, ResolveError> {
        let key = id.to_string();
        if !force && !self.store.is_stale(CacheArea::Users, &key, self.thresholds.users_days) {
            return Ok(self.store.get::<UserRecord>(CacheArea::Users, &key)?.payload);
        }

        debug!(id, "fetching user record");
        let record = self.client.fetch_user_record(id).await?;
        self.store.put(CacheArea::Users, &key, &record)?;
        Ok(record)
    }

    /// Fetches a status record; once cached it is only refetched when forced
    pub async fn status(&self, id: u64, force: bool) -> Result<StatusRecord, ResolveError> {
        cached_status(&self.client, &self.store, id, force).await
    }

    /// Cache key of a category's mapping, scoped to the subject
    fn list_key(&self, category: Category) -> String {
        format!("{}/{}", self.username, category)
    }

    fn memoized(&self, category: Category, force: bool) -> Option<RelationshipMapping> {
        if force {
            return None;
        }
        self.memo.get(&category).cloned()
    }

    async fn resolve_primitive(
        &mut self,
        list: RelationshipList,
        force: bool,
    ) -> Result<RelationshipMapping, ResolveError> {
        let category = match list {
            RelationshipList::Friends => Category::Friends,
            RelationshipList::Followers => Category::Followers,
        };
        if let Some(mapping) = self.memoized(category, force) {
            return Ok(mapping);
        }

        let key = self.list_key(category);
        let mapping = if force
            || self
                .store
                .is_stale(CacheArea::Lists, &key, self.thresholds.lists_days)
        {
            info!(username = %self.username, category = %category, force, "refreshing relationship list");
            let ids = self
                .client
                .list_relationship_ids(&self.username, list)
                .await?;
            let mapping = self.resolve_handles(&ids).await?;
            self.store.put(CacheArea::Lists, &key, &mapping)?;

            // Derived views computed from the previous list no longer hold
            self.memo.remove(&Category::Fans);
            self.memo.remove(&Category::Stans);
            mapping
        } else {
            debug!(username = %self.username, category = %category, "using cached relationship list");
            self.store
                .get::<RelationshipMapping>(CacheArea::Lists, &key)?
                .payload
        };

        self.memo.insert(category, mapping.clone());
        Ok(mapping)
    }

    async fn resolve_derived(
        &mut self,
        category: Category,
        force: bool,
    ) -> Result<RelationshipMapping, ResolveError> {
        if let Some(mapping) = self.memoized(category, force) {
            return Ok(mapping);
        }

        let friends = self
            .resolve_primitive(RelationshipList::Friends, force)
            .await?;
        let followers = self
            .resolve_primitive(RelationshipList::Followers, force)
            .await?;

        let key = self.list_key(category);
        let mapping = if force || self.derived_is_stale(category)? {
            let ids = derive_ids(category, &friends.id_set(), &followers.id_set());
            info!(username = %self.username, category = %category, members = ids.len(), "computing derived relationship");
            let ids: Vec<UserId> = ids.into_iter().collect();
            let mapping = self.resolve_handles(&ids).await?;
            self.store.put(CacheArea::Lists, &key, &mapping)?;
            mapping
        } else {
            debug!(username = %self.username, category = %category, "using cached derived relationship");
            self.store
                .get::<RelationshipMapping>(CacheArea::Lists, &key)?
                .payload
        };

        self.memo.insert(category, mapping.clone());
        Ok(mapping)
    }

    /// A derived entry is stale when its own age says so, or when either
    /// primitive list was written at or after it. Ties count as stale since
    /// file modification times are coarse.
    fn derived_is_stale(&self, category: Category) -> Result<bool, ResolveError> {
        let key = self.list_key(category);
        if self
            .store
            .is_stale(CacheArea::Lists, &key, self.thresholds.lists_days)
        {
            return Ok(true);
        }

        let derived_at = self.store.created_at(CacheArea::Lists, &key)?;
        for primitive in [Category::Friends, Category::Followers] {
            let primitive_at = self
                .store
                .created_at(CacheArea::Lists, &self.list_key(primitive))?;
            if primitive_at >= derived_at {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Resolves a handle for every ID, in order, through the user cache
    async fn resolve_handles(&self, ids: &[UserId]) -> Result<RelationshipMapping, ResolveError> {
        debug!(count = ids.len(), "resolving handles");
        let mut members = Vec::with_capacity(ids.len());
        for &id in ids {
            let record = self.user(id, false).await?;
            let handle = record
                .handle()
                .ok_or(ResolveError::MalformedRecord { id })?
                .to_string();
            members.push((id, handle));
        }
        Ok(RelationshipMapping::from_members(members))
    }
}
