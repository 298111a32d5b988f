//! Shared contract suite, run against every backend implementing the
//! link store traits.

use snip_core::{LinkStore, Role, ShortLink, StoreError, User};
use snip_generator::{CODE_ALPHABET, CODE_LENGTH};
use snip_storage::{FlatFileStore, SqliteRepository, StoreConfig};
use tempfile::TempDir;

async fn sqlite_store() -> SqliteRepository {
    SqliteRepository::open(&StoreConfig::in_memory())
        .await
        .expect("open sqlite store")
}

struct FlatFixture {
    _dir: TempDir,
    store: FlatFileStore,
}

async fn flatfile_store() -> FlatFixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FlatFileStore::open(dir.path().join("links.json"))
        .await
        .expect("open flat-file store");
    FlatFixture { _dir: dir, store }
}

fn owned_link(short: &str, owner: &str) -> ShortLink {
    ShortLink::new("https://example.com")
        .with_short(short)
        .with_owner(User::new(owner))
}

async fn roundtrip_preserves_original_and_owner<S: LinkStore>(store: &S) {
    store.put(owned_link("abc123", "alice")).await.unwrap();

    let got = store.get("abc123").await.unwrap();
    assert_eq!(got.original, "https://example.com");
    let owner = got.owner.expect("owner attached");
    assert_eq!(owner.username, "alice");
    assert_eq!(owner.role, Role::User);
}

async fn missing_code_is_not_found<S: LinkStore>(store: &S) {
    let err = store.get("nope1234").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

async fn empty_destination_is_rejected<S: LinkStore>(store: &S) {
    let err = store.put(ShortLink::new("")).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

async fn put_without_code_generates_one<S: LinkStore>(store: &S) {
    let stored = store.put(ShortLink::new("https://example.com")).await.unwrap();

    assert_eq!(stored.short.len(), CODE_LENGTH);
    assert!(stored.short.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    assert_eq!(
        store.get(&stored.short).await.unwrap().original,
        "https://example.com"
    );
}

async fn overwrite_replaces_every_field<S: LinkStore>(store: &S) {
    store.put(owned_link("abc123", "alice")).await.unwrap();
    store
        .put(ShortLink::new("https://new.example").with_short("abc123"))
        .await
        .unwrap();

    let got = store.get("abc123").await.unwrap();
    assert_eq!(got.original, "https://new.example");
    assert!(got.owner.is_none());
}

async fn stranger_cannot_remove<S: LinkStore>(store: &S) {
    store.put(owned_link("abc123", "alice")).await.unwrap();

    let err = store.remove("abc123", &User::new("bob")).await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));
    // No mutation happened.
    assert!(store.exists("abc123").await.unwrap());
}

async fn owner_can_remove<S: LinkStore>(store: &S) {
    store.put(owned_link("abc123", "alice")).await.unwrap();

    store.remove("abc123", &User::new("alice")).await.unwrap();
    assert!(matches!(
        store.get("abc123").await,
        Err(StoreError::NotFound(_))
    ));
}

async fn admin_can_remove_any_link<S: LinkStore>(store: &S) {
    let admin = User::new("root").with_role(Role::Admin);
    store.put(owned_link("abc123", "alice")).await.unwrap();
    store
        .put(ShortLink::new("https://example.com").with_short("anon9999"))
        .await
        .unwrap();

    store.remove("abc123", &admin).await.unwrap();
    store.remove("anon9999", &admin).await.unwrap();
}

async fn unowned_link_is_admin_only<S: LinkStore>(store: &S) {
    store
        .put(ShortLink::new("https://example.com").with_short("anon9999"))
        .await
        .unwrap();

    let err = store
        .remove("anon9999", &User::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(_)));
    assert!(store.exists("anon9999").await.unwrap());
}

async fn remove_of_missing_code_is_not_found<S: LinkStore>(store: &S) {
    let admin = User::new("root").with_role(Role::Admin);
    let err = store.remove("nope1234", &admin).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_original_and_owner() {
    roundtrip_preserves_original_and_owner(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_roundtrip_preserves_original_and_owner() {
    roundtrip_preserves_original_and_owner(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_missing_code_is_not_found() {
    missing_code_is_not_found(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_missing_code_is_not_found() {
    missing_code_is_not_found(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_empty_destination_is_rejected() {
    empty_destination_is_rejected(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_empty_destination_is_rejected() {
    empty_destination_is_rejected(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_put_without_code_generates_one() {
    put_without_code_generates_one(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_put_without_code_generates_one() {
    put_without_code_generates_one(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_overwrite_replaces_every_field() {
    overwrite_replaces_every_field(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_overwrite_replaces_every_field() {
    overwrite_replaces_every_field(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_stranger_cannot_remove() {
    stranger_cannot_remove(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_stranger_cannot_remove() {
    stranger_cannot_remove(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_owner_can_remove() {
    owner_can_remove(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_owner_can_remove() {
    owner_can_remove(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_admin_can_remove_any_link() {
    admin_can_remove_any_link(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_admin_can_remove_any_link() {
    admin_can_remove_any_link(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_unowned_link_is_admin_only() {
    unowned_link_is_admin_only(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_unowned_link_is_admin_only() {
    unowned_link_is_admin_only(&flatfile_store().await.store).await;
}

#[tokio::test]
async fn sqlite_remove_of_missing_code_is_not_found() {
    remove_of_missing_code_is_not_found(&sqlite_store().await).await;
}

#[tokio::test]
async fn flatfile_remove_of_missing_code_is_not_found() {
    remove_of_missing_code_is_not_found(&flatfile_store().await.store).await;
}
