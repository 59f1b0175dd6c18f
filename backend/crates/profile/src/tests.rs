//! Use case and router tests for the profile crate
//!
//! Runs against in-memory doubles; neither Postgres nor the filesystem is
//! touched.

#[cfg(test)]
mod support {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, MutexGuard};

    use auth::Principal;
    use auth::domain::value_object::public_id::PublicId;
    use auth::domain::value_object::user_name::UserName;
    use auth::domain::value_object::user_role::UserRole;
    use chrono::{DateTime, Duration, Utc};
    use kernel::UserId;

    use crate::domain::entity::{
        Account, FollowDirection, FollowEntry, Page, PageRequest, Profile,
    };
    use crate::domain::gateway::{MediaStore, StoredMedia};
    use crate::domain::media::{ImageFormat, MediaKind};
    use crate::domain::repository::{AccountRepository, FollowRepository, ProfileRepository};
    use crate::error::{ProfileError, ProfileResult};

    pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";
    pub const JPEG: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0\x01";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Status {
        Active,
        PendingDeletion,
        Disabled,
    }

    struct Edge {
        follower: UserId,
        followee: UserId,
        created_at: DateTime<Utc>,
        seq: u64,
    }

    #[derive(Default)]
    struct State {
        accounts: HashMap<UserId, (Account, Status)>,
        profiles: HashMap<UserId, Profile>,
        edges: Vec<Edge>,
        next_seq: u64,
        fail_saves: bool,
    }

    impl State {
        fn is_active(&self, user_id: &UserId) -> bool {
            matches!(self.accounts.get(user_id), Some((_, Status::Active)))
        }
    }

    /// In-memory stand-in for `PgProfileRepository`
    #[derive(Clone, Default)]
    pub struct MemoryProfileStore {
        state: Arc<Mutex<State>>,
    }

    impl MemoryProfileStore {
        fn lock(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap()
        }

        /// Register an active account and return its principal
        pub fn add_account(&self, user_name: &str) -> Principal {
            let user_id = UserId::new();
            let public_id = PublicId::new();
            let account = Account {
                user_id,
                public_id: public_id.to_string(),
                user_name: user_name.to_string(),
                created_at: Utc::now(),
            };
            self.lock()
                .accounts
                .insert(user_id, (account, Status::Active));

            Principal {
                user_id,
                public_id,
                role: UserRole::User,
            }
        }

        pub fn set_status(&self, user_id: &UserId, status: Status) {
            if let Some(entry) = self.lock().accounts.get_mut(user_id) {
                entry.1 = status;
            }
        }

        pub fn profile(&self, user_id: &UserId) -> Option<Profile> {
            self.lock().profiles.get(user_id).cloned()
        }

        pub fn put_profile(&self, profile: Profile) {
            self.lock().profiles.insert(profile.user_id, profile);
        }

        pub fn fail_saves(&self, fail: bool) {
            self.lock().fail_saves = fail;
        }

        /// Add an edge with an explicit timestamp
        pub fn put_follow(&self, follower: &UserId, followee: &UserId, created_at: DateTime<Utc>) {
            let mut state = self.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.edges.push(Edge {
                follower: *follower,
                followee: *followee,
                created_at,
                seq,
            });
        }

        pub fn edge_count(&self) -> usize {
            self.lock().edges.len()
        }
    }

    impl AccountRepository for MemoryProfileStore {
        async fn find_active_by_name(&self, canonical: &str) -> ProfileResult<Option<Account>> {
            Ok(self
                .lock()
                .accounts
                .values()
                .find(|(account, status)| {
                    *status == Status::Active
                        && UserName::canonicalize(&account.user_name) == canonical
                })
                .map(|(account, _)| account.clone()))
        }

        async fn find_member_by_id(&self, user_id: &UserId) -> ProfileResult<Option<Account>> {
            Ok(self
                .lock()
                .accounts
                .get(user_id)
                .filter(|(_, status)| *status != Status::Disabled)
                .map(|(account, _)| account.clone()))
        }
    }

    impl ProfileRepository for MemoryProfileStore {
        async fn find_profile(&self, user_id: &UserId) -> ProfileResult<Option<Profile>> {
            Ok(self.profile(user_id))
        }

        async fn save_profile(&self, profile: &Profile) -> ProfileResult<()> {
            let mut state = self.lock();
            if state.fail_saves {
                return Err(ProfileError::Internal("save failed".to_string()));
            }
            state.profiles.insert(profile.user_id, profile.clone());
            Ok(())
        }

        async fn media_keys_in_use(&self) -> ProfileResult<Vec<String>> {
            Ok(self
                .lock()
                .profiles
                .values()
                .flat_map(|p| [p.avatar_key.clone(), p.banner_key.clone()])
                .flatten()
                .collect())
        }
    }

    impl FollowRepository for MemoryProfileStore {
        async fn add_follow(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool> {
            let exists = self
                .lock()
                .edges
                .iter()
                .any(|e| e.follower == *follower && e.followee == *followee);
            if exists {
                return Ok(false);
            }
            self.put_follow(follower, followee, Utc::now());
            Ok(true)
        }

        async fn remove_follow(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool> {
            let mut state = self.lock();
            let before = state.edges.len();
            state
                .edges
                .retain(|e| !(e.follower == *follower && e.followee == *followee));
            Ok(state.edges.len() != before)
        }

        async fn is_following(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool> {
            Ok(self
                .lock()
                .edges
                .iter()
                .any(|e| e.follower == *follower && e.followee == *followee))
        }

        async fn follow_counts(&self, user_id: &UserId) -> ProfileResult<(i64, i64)> {
            let state = self.lock();
            let followers = state
                .edges
                .iter()
                .filter(|e| e.followee == *user_id && state.is_active(&e.follower))
                .count();
            let following = state
                .edges
                .iter()
                .filter(|e| e.follower == *user_id && state.is_active(&e.followee))
                .count();
            Ok((followers as i64, following as i64))
        }

        async fn list_follows(
            &self,
            user_id: &UserId,
            direction: FollowDirection,
            page: PageRequest,
        ) -> ProfileResult<Page<FollowEntry>> {
            let state = self.lock();
            let mut edges: Vec<(&Edge, UserId)> = state
                .edges
                .iter()
                .filter_map(|e| match direction {
                    FollowDirection::Followers if e.followee == *user_id => Some((e, e.follower)),
                    FollowDirection::Following if e.follower == *user_id => Some((e, e.followee)),
                    _ => None,
                })
                .filter(|(_, other)| state.is_active(other))
                .collect();
            edges.sort_by(|(a, _), (b, _)| {
                b.created_at.cmp(&a.created_at).then(b.seq.cmp(&a.seq))
            });

            let total = edges.len() as i64;
            let items = edges
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .map(|(edge, other)| {
                    let (account, _) = &state.accounts[&other];
                    let profile = state.profiles.get(&other);
                    FollowEntry {
                        public_id: account.public_id.clone(),
                        user_name: account.user_name.clone(),
                        display_name: profile.and_then(|p| p.display_name.clone()),
                        avatar_key: profile.and_then(|p| p.avatar_key.clone()),
                        followed_at: edge.created_at,
                    }
                })
                .collect();

            Ok(Page { items, total })
        }
    }

    #[derive(Default)]
    struct MediaState {
        files: HashMap<String, (Vec<u8>, DateTime<Utc>)>,
        fail_deletes: bool,
        next: u64,
    }

    /// In-memory stand-in for `FsMediaStore`
    #[derive(Clone, Default)]
    pub struct MemoryMediaStore {
        state: Arc<Mutex<MediaState>>,
    }

    impl MemoryMediaStore {
        fn lock(&self) -> MutexGuard<'_, MediaState> {
            self.state.lock().unwrap()
        }

        pub fn contains(&self, key: &str) -> bool {
            self.lock().files.contains_key(key)
        }

        pub fn file_count(&self) -> usize {
            self.lock().files.len()
        }

        /// Place a file that was last modified `age` ago
        pub fn put_aged(&self, key: &str, age: Duration) {
            self.lock()
                .files
                .insert(key.to_string(), (PNG.to_vec(), Utc::now() - age));
        }

        pub fn fail_deletes(&self, fail: bool) {
            self.lock().fail_deletes = fail;
        }
    }

    impl MediaStore for MemoryMediaStore {
        async fn put_media(
            &self,
            kind: MediaKind,
            format: ImageFormat,
            bytes: &[u8],
        ) -> ProfileResult<String> {
            let mut state = self.lock();
            state.next += 1;
            let key = format!("{}/{}.{}", kind.dir(), state.next, format.extension());
            state
                .files
                .insert(key.clone(), (bytes.to_vec(), Utc::now()));
            Ok(key)
        }

        async fn delete_media(&self, key: &str) -> ProfileResult<()> {
            let mut state = self.lock();
            if state.fail_deletes {
                return Err(ProfileError::Storage(std::io::Error::other("read-only")));
            }
            state.files.remove(key);
            Ok(())
        }

        async fn list_media(&self, kind: MediaKind) -> ProfileResult<Vec<StoredMedia>> {
            let prefix = format!("{}/", kind.dir());
            Ok(self
                .lock()
                .files
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(key, (_, modified_at))| StoredMedia {
                    key: key.clone(),
                    modified_at: *modified_at,
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod profile_tests {
    use std::sync::Arc;

    use super::support::*;
    use crate::application::ProfileUseCase;
    use crate::domain::entity::{Profile, ProfilePatch};
    use crate::error::ProfileError;

    #[tokio::test]
    async fn test_view_without_row_is_empty() {
        let store = MemoryProfileStore::default();
        store.add_account("Alice");
        let use_case = ProfileUseCase::new(Arc::new(store));

        let view = use_case.view("alice", None).await.unwrap();
        assert_eq!(view.account.user_name, "Alice");
        assert_eq!(view.profile.display_name, None);
        assert_eq!((view.followers, view.following), (0, 0));
        assert_eq!(view.is_following, None);
    }

    #[tokio::test]
    async fn test_view_lookup_is_case_insensitive() {
        let store = MemoryProfileStore::default();
        store.add_account("alice");
        let use_case = ProfileUseCase::new(Arc::new(store));

        assert!(use_case.view("ALICE", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_is_following_depends_on_viewer() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let bob = store.add_account("bob");
        store.put_follow(&bob.user_id, &alice.user_id, chrono::Utc::now());
        let use_case = ProfileUseCase::new(Arc::new(store));

        let by_bob = use_case.view("alice", Some(&bob)).await.unwrap();
        assert_eq!(by_bob.is_following, Some(true));
        assert_eq!(by_bob.followers, 1);

        let by_alice_of_bob = use_case.view("bob", Some(&alice)).await.unwrap();
        assert_eq!(by_alice_of_bob.is_following, Some(false));
        assert_eq!(by_alice_of_bob.following, 1);

        let own_page = use_case.view("alice", Some(&alice)).await.unwrap();
        assert_eq!(own_page.is_following, None);
    }

    #[tokio::test]
    async fn test_non_active_users_are_hidden() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let use_case = ProfileUseCase::new(Arc::new(store.clone()));

        for status in [Status::PendingDeletion, Status::Disabled] {
            store.set_status(&alice.user_id, status);
            assert!(matches!(
                use_case.view("alice", None).await,
                Err(ProfileError::UserNotFound)
            ));
        }
        assert!(matches!(
            use_case.view("nobody", None).await,
            Err(ProfileError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_counts_skip_inactive_accounts() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let bob = store.add_account("bob");
        let carol = store.add_account("carol");
        store.put_follow(&bob.user_id, &alice.user_id, chrono::Utc::now());
        store.put_follow(&carol.user_id, &alice.user_id, chrono::Utc::now());
        store.set_status(&carol.user_id, Status::PendingDeletion);
        let use_case = ProfileUseCase::new(Arc::new(store));

        let view = use_case.view("alice", None).await.unwrap();
        assert_eq!(view.followers, 1);
    }

    #[tokio::test]
    async fn test_update_creates_row_and_merges() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let use_case = ProfileUseCase::new(Arc::new(store.clone()));

        let patch = ProfilePatch::parse(
            Some("Alice A.".to_string()),
            Some("hello\nworld".to_string()),
            None,
            Some("https://alice.example".to_string()),
        )
        .unwrap();
        let view = use_case.update(&alice, patch).await.unwrap();
        assert_eq!(view.profile.display_name.as_deref(), Some("Alice A."));

        let clear_bio = ProfilePatch::parse(None, Some(String::new()), None, None).unwrap();
        use_case.update(&alice, clear_bio).await.unwrap();

        let stored = store.profile(&alice.user_id).unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("Alice A."));
        assert_eq!(stored.bio, None);
        assert_eq!(stored.website.as_deref(), Some("https://alice.example"));
    }

    #[tokio::test]
    async fn test_empty_patch_writes_nothing() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let use_case = ProfileUseCase::new(Arc::new(store.clone()));

        use_case
            .update(&alice, ProfilePatch::default())
            .await
            .unwrap();
        assert!(store.profile(&alice.user_id).is_none());
    }

    #[tokio::test]
    async fn test_pending_deletion_owner_can_still_edit() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        store.put_profile(Profile::empty(alice.user_id));
        store.set_status(&alice.user_id, Status::PendingDeletion);
        let use_case = ProfileUseCase::new(Arc::new(store.clone()));

        let patch = ProfilePatch::parse(None, None, Some("Lisbon".to_string()), None).unwrap();
        let view = use_case.update(&alice, patch).await.unwrap();
        assert_eq!(view.profile.location.as_deref(), Some("Lisbon"));
    }

    #[tokio::test]
    async fn test_disabled_caller_is_unauthenticated() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        store.set_status(&alice.user_id, Status::Disabled);
        let use_case = ProfileUseCase::new(Arc::new(store));

        assert!(matches!(
            use_case.own(&alice).await,
            Err(ProfileError::Unauthenticated)
        ));
    }
}

#[cfg(test)]
mod follow_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::support::*;
    use crate::application::FollowUseCase;
    use crate::domain::entity::{FollowDirection, PageRequest};
    use crate::error::ProfileError;

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        store.add_account("bob");
        let use_case = FollowUseCase::new(Arc::new(store.clone()));

        use_case.follow(&alice, "bob").await.unwrap();
        use_case.follow(&alice, "Bob").await.unwrap();
        assert_eq!(store.edge_count(), 1);

        use_case.unfollow(&alice, "bob").await.unwrap();
        use_case.unfollow(&alice, "bob").await.unwrap();
        assert_eq!(store.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_cannot_follow_self() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let use_case = FollowUseCase::new(Arc::new(store));

        assert!(matches!(
            use_case.follow(&alice, "alice").await,
            Err(ProfileError::CannotFollowSelf)
        ));
        assert!(matches!(
            use_case.unfollow(&alice, "alice").await,
            Err(ProfileError::CannotFollowSelf)
        ));
    }

    #[tokio::test]
    async fn test_follow_requires_active_target() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let bob = store.add_account("bob");
        store.set_status(&bob.user_id, Status::PendingDeletion);
        let use_case = FollowUseCase::new(Arc::new(store.clone()));

        assert!(matches!(
            use_case.follow(&alice, "bob").await,
            Err(ProfileError::UserNotFound)
        ));
        assert!(matches!(
            use_case.follow(&alice, "ghost").await,
            Err(ProfileError::UserNotFound)
        ));
        assert_eq!(store.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_lists_are_newest_first_and_paginated() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let now = Utc::now();
        for (i, name) in ["bob", "carol", "dave"].iter().enumerate() {
            let follower = store.add_account(name);
            store.put_follow(
                &follower.user_id,
                &alice.user_id,
                now - Duration::minutes(10 - i as i64),
            );
        }
        let use_case = FollowUseCase::new(Arc::new(store));

        let page = use_case
            .list("alice", FollowDirection::Followers, PageRequest::new(Some(2), None))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.items.iter().map(|e| e.user_name.as_str()).collect();
        assert_eq!(names, ["dave", "carol"]);

        let rest = use_case
            .list("alice", FollowDirection::Followers, PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].user_name, "bob");

        let following = use_case
            .list("bob", FollowDirection::Following, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(following.total, 1);
        assert_eq!(following.items[0].user_name, "alice");
    }

    #[tokio::test]
    async fn test_lists_hide_inactive_accounts() {
        let store = MemoryProfileStore::default();
        let alice = store.add_account("alice");
        let bob = store.add_account("bob");
        store.put_follow(&bob.user_id, &alice.user_id, Utc::now());
        store.set_status(&bob.user_id, Status::Disabled);
        let use_case = FollowUseCase::new(Arc::new(store));

        let page = use_case
            .list("alice", FollowDirection::Followers, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }
}

#[cfg(test)]
mod media_tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::support::*;
    use crate::application::{MediaUseCase, ProfileConfig};
    use crate::domain::media::{ImageFormat, MediaKind};
    use crate::error::ProfileError;

    fn use_case(
        store: &MemoryProfileStore,
        media: &MemoryMediaStore,
    ) -> MediaUseCase<MemoryProfileStore, MemoryMediaStore> {
        let config = ProfileConfig {
            avatar_max_bytes: 64,
            banner_max_bytes: 128,
            ..ProfileConfig::default()
        };
        MediaUseCase::new(
            Arc::new(store.clone()),
            Arc::new(media.clone()),
            Arc::new(config),
        )
    }

    #[test]
    fn test_validate() {
        let uc = use_case(&MemoryProfileStore::default(), &MemoryMediaStore::default());

        assert_eq!(uc.validate(MediaKind::Avatar, PNG).unwrap(), ImageFormat::Png);
        assert!(matches!(
            uc.validate(MediaKind::Avatar, b""),
            Err(ProfileError::MissingFile)
        ));
        assert!(matches!(
            uc.validate(MediaKind::Avatar, b"<svg onload=alert(1)>"),
            Err(ProfileError::UnsupportedMediaType)
        ));

        let mut big = PNG.to_vec();
        big.extend_from_slice(&[0u8; 100]);
        assert!(matches!(
            uc.validate(MediaKind::Avatar, &big),
            Err(ProfileError::MediaTooLarge { max_bytes: 64 })
        ));
        assert!(uc.validate(MediaKind::Banner, &big).is_ok());
    }

    #[tokio::test]
    async fn test_upload_replaces_previous_file() {
        let store = MemoryProfileStore::default();
        let media = MemoryMediaStore::default();
        let alice = store.add_account("alice");
        let uc = use_case(&store, &media);

        let first = uc.upload(&alice, MediaKind::Avatar, PNG).await.unwrap();
        let first_key = first.avatar_key.clone().unwrap();
        assert!(first_key.starts_with("avatars/"));
        assert!(media.contains(&first_key));

        let second = uc.upload(&alice, MediaKind::Avatar, JPEG).await.unwrap();
        let second_key = second.avatar_key.clone().unwrap();
        assert!(second_key.ends_with(".jpg"));
        assert!(media.contains(&second_key));
        assert!(!media.contains(&first_key));

        let stored = store.profile(&alice.user_id).unwrap();
        assert_eq!(stored.avatar_key, Some(second_key));
        assert_eq!(stored.banner_key, None);
    }

    #[tokio::test]
    async fn test_rejected_upload_writes_nothing() {
        let store = MemoryProfileStore::default();
        let media = MemoryMediaStore::default();
        let alice = store.add_account("alice");
        let uc = use_case(&store, &media);

        assert!(uc.upload(&alice, MediaKind::Avatar, b"GIF").await.is_err());
        assert_eq!(media.file_count(), 0);
        assert!(store.profile(&alice.user_id).is_none());
    }

    #[tokio::test]
    async fn test_failed_save_discards_new_file() {
        let store = MemoryProfileStore::default();
        let media = MemoryMediaStore::default();
        let alice = store.add_account("alice");
        let uc = use_case(&store, &media);

        store.fail_saves(true);
        assert!(uc.upload(&alice, MediaKind::Banner, PNG).await.is_err());
        assert_eq!(media.file_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_upload() {
        let store = MemoryProfileStore::default();
        let media = MemoryMediaStore::default();
        let alice = store.add_account("alice");
        let uc = use_case(&store, &media);

        uc.upload(&alice, MediaKind::Avatar, PNG).await.unwrap();
        media.fail_deletes(true);
        let profile = uc.upload(&alice, MediaKind::Avatar, JPEG).await.unwrap();

        assert!(profile.avatar_key.unwrap().ends_with(".jpg"));
        assert_eq!(media.file_count(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryProfileStore::default();
        let media = MemoryMediaStore::default();
        let alice = store.add_account("alice");
        let uc = use_case(&store, &media);

        let profile = uc.upload(&alice, MediaKind::Banner, PNG).await.unwrap();
        let key = profile.banner_key.unwrap();

        let profile = uc.remove(&alice, MediaKind::Banner).await.unwrap();
        assert_eq!(profile.banner_key, None);
        assert!(!media.contains(&key));

        // nothing left to remove
        assert!(uc.remove(&alice, MediaKind::Banner).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_orphans_respects_grace_and_references() {
        let store = MemoryProfileStore::default();
        let media = MemoryMediaStore::default();
        let alice = store.add_account("alice");
        let uc = use_case(&store, &media);

        let in_use = uc
            .upload(&alice, MediaKind::Avatar, PNG)
            .await
            .unwrap()
            .avatar_key
            .unwrap();
        media.put_aged("avatars/old.png", Duration::hours(2));
        media.put_aged("banners/old.webp", Duration::days(3));
        media.put_aged("avatars/fresh.png", Duration::minutes(5));

        let removed = uc.sweep_orphans().await.unwrap();
        assert_eq!(removed, 2);
        assert!(media.contains(&in_use));
        assert!(media.contains("avatars/fresh.png"));
        assert!(!media.contains("avatars/old.png"));
        assert!(!media.contains("banners/old.webp"));
    }
}

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use auth::domain::entity::User;
    use auth::domain::value_object::email::Email;
    use auth::domain::value_object::user_name::UserName;
    use auth::{AuthConfig, Principal, TokenService};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::support::*;
    use crate::application::ProfileConfig;
    use crate::presentation::{ProfileAppState, profile_router};

    const BOUNDARY: &str = "profile-test-boundary";

    struct TestApp {
        store: MemoryProfileStore,
        media: MemoryMediaStore,
        tokens: Arc<TokenService>,
        router: axum::Router,
    }

    impl TestApp {
        fn new() -> Self {
            let store = MemoryProfileStore::default();
            let media = MemoryMediaStore::default();
            let tokens = Arc::new(TokenService::new(&AuthConfig::development()).unwrap());
            let config = ProfileConfig {
                media_base_url: "https://cdn.test/media".to_string(),
                avatar_max_bytes: 1024,
                ..ProfileConfig::default()
            };
            let state = ProfileAppState::new(store.clone(), media.clone(), config, tokens.clone());
            Self {
                store,
                media,
                tokens,
                router: profile_router(state),
            }
        }

        /// Register an account and return a bearer token for it
        fn sign_in(&self, user_name: &str) -> (Principal, String) {
            let principal = self.store.add_account(user_name);
            let mut user = User::new(
                UserName::new(user_name).unwrap(),
                Email::new(format!("{user_name}@example.com")).unwrap(),
                true,
            );
            user.user_id = principal.user_id;
            user.public_id = principal.public_id;
            let token = self.tokens.issue_access(&user).unwrap().token;
            (principal, token)
        }

        async fn send(&self, request: Request<Body>) -> axum::response::Response {
            self.router.clone().oneshot(request).await.unwrap()
        }
    }

    fn authed(method: &str, uri: &str, token: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    fn multipart_body(field: &str, bytes: &[u8]) -> Body {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"x\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn upload(uri: &str, token: &str, field: &str, bytes: &[u8]) -> Request<Body> {
        authed("PUT", uri, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body(field, bytes))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_public_profile() {
        let app = TestApp::new();
        app.sign_in("alice");

        let response = app
            .send(Request::get("/Alice").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["userName"], "alice");
        assert_eq!(body["followersCount"], 0);
        assert_eq!(body["avatarUrl"], Value::Null);
        assert!(body.get("isFollowing").is_none());

        let response = app
            .send(Request::get("/ghost").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["status"], 404);
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected_on_public_route() {
        let app = TestApp::new();
        app.sign_in("alice");

        let response = app
            .send(authed("GET", "/alice", "not-a-jwt").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_patch_profile() {
        let app = TestApp::new();
        let (_, token) = app.sign_in("alice");

        let response = app
            .send(
                authed("PATCH", "/me/profile", &token)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"displayName": " Alice ", "website": "https://a.example"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["displayName"], "Alice");
        assert_eq!(body["website"], "https://a.example");

        let response = app
            .send(
                authed("PATCH", "/me/profile", &token)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"website": "ftp://nope"}).to_string()))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(
                Request::patch("/me/profile")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_json_gets_problem_body() {
        let app = TestApp::new();
        let (_, token) = app.sign_in("alice");

        let response = app
            .send(
                authed("PATCH", "/me/profile", &token)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"bio\": "))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], 400);
        assert_eq!(body["type"], "https://httpstatuses.io/400");
    }

    #[tokio::test]
    async fn test_follow_flow() {
        let app = TestApp::new();
        let (_, alice_token) = app.sign_in("alice");
        app.sign_in("bob");

        let response = app
            .send(authed("PUT", "/bob/follow", &alice_token).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .send(authed("GET", "/bob", &alice_token).body(Body::empty()).unwrap())
            .await;
        let body = json_body(response).await;
        assert_eq!(body["isFollowing"], true);
        assert_eq!(body["followersCount"], 1);

        let response = app
            .send(Request::get("/bob/followers?limit=500").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["userName"], "alice");

        let response = app
            .send(authed("PUT", "/alice/follow", &alice_token).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(authed("DELETE", "/bob/follow", &alice_token).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(app.store.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_avatar_upload_and_delete() {
        let app = TestApp::new();
        let (alice, token) = app.sign_in("alice");

        let response = app.send(upload("/me/avatar", &token, "file", PNG)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let url = body["avatarUrl"].as_str().unwrap().to_string();
        assert!(url.starts_with("https://cdn.test/media/avatars/"));

        let key = app.store.profile(&alice.user_id).unwrap().avatar_key.unwrap();
        assert!(app.media.contains(&key));

        let response = app
            .send(authed("DELETE", "/me/avatar", &token).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["avatarUrl"], Value::Null);
        assert!(!app.media.contains(&key));
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let app = TestApp::new();
        let (_, token) = app.sign_in("alice");

        let response = app
            .send(upload("/me/avatar", &token, "file", b"plain text, not an image"))
            .await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let response = app
            .send(upload("/me/avatar", &token, "image", PNG))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut oversized = PNG.to_vec();
        oversized.extend_from_slice(&[0u8; 2048]);
        let response = app
            .send(upload("/me/avatar", &token, "file", &oversized))
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = app
            .send(
                authed("PUT", "/me/avatar", &token)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(app.media.file_count(), 0);
    }
}
