//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration;

use gemdex_core::{
  cache::{CacheKey, Coordinator},
  retry::RetryPolicy,
  signal::ChangeSignal,
  spec::{GemSpec, Scope, SpecDependency},
  store::GemRepository,
};
use rusqlite::params;

use crate::{Error, SqliteStore, retry::with_retries};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn spec(name: &str, version: &str) -> GemSpec { GemSpec::new(name, version, "ruby") }

fn runtime(name: &str, requirement: &str) -> SpecDependency {
  SpecDependency::new(name, requirement, Scope::Runtime)
}

/// Seed a digest row the way the index-serving layer would.
async fn seed_checksum(s: &SqliteStore, name: &str) {
  let name = name.to_owned();
  s.conn
    .call(move |conn| {
      conn.execute(
        "INSERT OR REPLACE INTO checksums (name, digest) VALUES (?1, 'cafebabe')",
        params![name],
      )?;
      Ok(())
    })
    .await
    .unwrap();
}

async fn digest(s: &SqliteStore, name: &str) -> Option<String> {
  let name = name.to_owned();
  s.conn
    .call(move |conn| {
      Ok(conn.query_row(
        "SELECT digest FROM checksums WHERE name = ?1",
        params![name],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap()
}

async fn set_indexed(s: &SqliteStore, version_id: i64, indexed: bool) {
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE versions SET indexed = ?1 WHERE id = ?2",
        params![indexed, version_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();
}

// ─── Packages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_or_insert_package_is_idempotent() {
  let s = store().await;

  let first = s.find_or_insert_package("foo").await.unwrap();
  assert!(first.inserted);

  let second = s.find_or_insert_package("foo").await.unwrap();
  assert!(!second.inserted);
  assert_eq!(second.id, first.id);

  assert_eq!(s.packages().await.unwrap().len(), 1);
}

#[tokio::test]
async fn new_package_invalidates_names() {
  let s = store().await;
  seed_checksum(&s, "names").await;
  let mut rx = s.subscribe();

  s.find_or_insert_package("foo").await.unwrap();
  assert_eq!(digest(&s, "names").await, None);
  assert_eq!(rx.recv().await.unwrap(), ChangeSignal::Names);

  // Finding an existing package is silent.
  s.find_or_insert_package("foo").await.unwrap();
  assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn schema_rejects_duplicate_packages() {
  let s = store().await;
  s.find_or_insert_package("foo").await.unwrap();

  let err = s
    .conn
    .call(|conn| {
      conn.execute(
        "INSERT INTO packages (name, created_at) VALUES ('foo', '2024-01-01T00:00:00Z')",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap_err();
  assert!(err.to_string().contains("UNIQUE"), "{err}");
}

// ─── Versions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_version_defaults() {
  let s = store().await;
  let pkg = s.find_or_insert_package("foo").await.unwrap();

  let v = s
    .find_or_insert_version(pkg.id, &spec("foo", "1.0.rc1"), "java", Some("abc"), None)
    .await
    .unwrap();
  assert!(v.inserted);

  let row = s.find_version("foo", "1.0.rc1", "java").await.unwrap().unwrap();
  assert_eq!(row.id, v.id);
  assert!(row.indexed);
  assert!(row.prerelease);
  assert_eq!(row.full_name, "foo-1.0.rc1-java");
  assert_eq!(row.required_ruby_version, "");
  assert_eq!(row.required_rubygems_version, "");
  assert_eq!(row.checksum.as_deref(), Some("abc"));
  assert_eq!(row.info_checksum, None);
}

#[tokio::test]
async fn insert_version_keeps_required_versions() {
  let s = store().await;
  let pkg = s.find_or_insert_package("foo").await.unwrap();

  let mut foo = spec("foo", "2.0");
  foo.required_ruby_version = Some(">= 2.7".into());
  foo.required_rubygems_version = Some(">= 3.0".into());
  s.find_or_insert_version(pkg.id, &foo, "ruby", None, None)
    .await
    .unwrap();

  let row = s.find_version("foo", "2.0", "ruby").await.unwrap().unwrap();
  assert_eq!(row.required_ruby_version, ">= 2.7");
  assert_eq!(row.required_rubygems_version, ">= 3.0");
  assert!(!row.prerelease);
  assert_eq!(row.full_name, "foo-2.0");
}

#[tokio::test]
async fn existing_version_is_not_duplicated() {
  let s = store().await;
  let pkg = s.find_or_insert_package("foo").await.unwrap();
  let foo = spec("foo", "1.0");

  let first = s
    .find_or_insert_version(pkg.id, &foo, "ruby", None, None)
    .await
    .unwrap();
  let second = s
    .find_or_insert_version(pkg.id, &foo, "ruby", None, None)
    .await
    .unwrap();

  assert!(!second.inserted);
  assert_eq!(second.id, first.id);
  assert_eq!(s.versions_of("foo").await.unwrap().len(), 1);
}

#[tokio::test]
async fn indexed_override_toggles_in_place() {
  let s = store().await;
  seed_checksum(&s, "versions").await;
  let pkg = s.find_or_insert_package("foo").await.unwrap();
  let foo = spec("foo", "1.0");

  let v = s
    .find_or_insert_version(pkg.id, &foo, "ruby", None, Some(false))
    .await
    .unwrap();
  assert!(!s.find_version("foo", "1.0", "ruby").await.unwrap().unwrap().indexed);

  seed_checksum(&s, "versions").await;
  let mut rx = s.subscribe();

  let again = s
    .find_or_insert_version(pkg.id, &foo, "ruby", None, Some(true))
    .await
    .unwrap();
  assert_eq!(again.id, v.id);
  assert!(!again.inserted);
  assert!(s.find_version("foo", "1.0", "ruby").await.unwrap().unwrap().indexed);
  assert_eq!(rx.recv().await.unwrap(), ChangeSignal::Versions);

  // Same value: no write, no signal.
  s.find_or_insert_version(pkg.id, &foo, "ruby", None, Some(true))
    .await
    .unwrap();
  assert!(rx.try_recv().is_err());
  assert_eq!(s.versions_of("foo").await.unwrap().len(), 1);
}

#[tokio::test]
async fn platforms_are_distinct_versions() {
  let s = store().await;
  let pkg = s.find_or_insert_package("foo").await.unwrap();
  let foo = spec("foo", "1.0");

  s.find_or_insert_version(pkg.id, &foo, "ruby", None, None)
    .await
    .unwrap();
  s.find_or_insert_version(pkg.id, &foo, "java", None, None)
    .await
    .unwrap();

  assert_eq!(s.packages().await.unwrap().len(), 1);
  assert_eq!(s.versions_of("foo").await.unwrap().len(), 2);
}

#[tokio::test]
async fn update_info_checksum_sets_field() {
  let s = store().await;
  let pkg = s.find_or_insert_package("foo").await.unwrap();
  let v = s
    .find_or_insert_version(pkg.id, &spec("foo", "1.0"), "ruby", None, None)
    .await
    .unwrap();

  s.update_info_checksum(v.id, "d41d8cd9").await.unwrap();

  let row = s.find_version("foo", "1.0", "ruby").await.unwrap().unwrap();
  assert_eq!(row.info_checksum.as_deref(), Some("d41d8cd9"));
}

// ─── Dependencies ────────────────────────────────────────────────────────────

#[tokio::test]
async fn dangling_dependencies_are_skipped() {
  let s = store().await;
  let foo = spec("foo", "1.0")
    .with_dependency(runtime("bar", "~> 1.0"))
    .with_dependency(runtime("missing", ">= 0"));

  s.find_or_insert_package("bar").await.unwrap();
  let inserted = s.insert_spec(&foo, "ruby", None, None).await.unwrap();

  assert_eq!(inserted.dependencies_added, vec!["~> 1.0 bar".to_owned()]);

  let edges = s.dependencies(inserted.version.id).await.unwrap();
  assert_eq!(edges.len(), 1);
  assert_eq!(edges[0].package_name, "bar");
  assert_eq!(edges[0].requirements, "~> 1.0");
  assert_eq!(edges[0].scope, Scope::Runtime);
}

#[tokio::test]
async fn equivalent_requirements_are_not_reinserted() {
  let s = store().await;
  s.find_or_insert_package("bar").await.unwrap();

  let first = spec("foo", "1.0").with_dependency(runtime("bar", "~> 1.0, >= 0.9"));
  let inserted = s.insert_spec(&first, "ruby", None, None).await.unwrap();
  assert_eq!(inserted.dependencies_added.len(), 1);

  let reordered = spec("foo", "1.0").with_dependency(runtime("bar", ">= 0.9, ~> 1.0"));
  let added = s
    .insert_dependencies(&reordered, inserted.version.id)
    .await
    .unwrap();
  assert!(added.is_empty());

  assert_eq!(s.dependencies(inserted.version.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_targets_settle_on_the_runtime_edge() {
  let s = store().await;
  s.find_or_insert_package("bar").await.unwrap();

  let foo = spec("foo", "1.0")
    .with_dependency(runtime("bar", "~> 1.0"))
    .with_dependency(SpecDependency::new("bar", ">= 0", Scope::Development));

  let inserted = s.insert_spec(&foo, "ruby", None, None).await.unwrap();
  assert_eq!(inserted.dependencies_added, vec!["~> 1.0 bar".to_owned()]);

  let key = ChangeSignal::Version(inserted.version.id).checksum_name();
  seed_checksum(&s, &key).await;

  let added = s.insert_dependencies(&foo, inserted.version.id).await.unwrap();
  assert!(added.is_empty());
  assert_eq!(digest(&s, &key).await.as_deref(), Some("cafebabe"));

  let edges = s.dependencies(inserted.version.id).await.unwrap();
  assert_eq!(edges.len(), 1);
  assert_eq!(edges[0].requirements, "~> 1.0");
  assert_eq!(edges[0].scope, Scope::Runtime);
}

#[tokio::test]
async fn differing_requirements_replace_edge() {
  let s = store().await;
  s.find_or_insert_package("bar").await.unwrap();

  let old = spec("foo", "1.0").with_dependency(runtime("bar", "~> 1.0"));
  let inserted = s.insert_spec(&old, "ruby", None, None).await.unwrap();

  let new = spec("foo", "1.0").with_dependency(SpecDependency::new(
    "bar",
    "~> 1.2",
    Scope::Development,
  ));
  let added = s.insert_dependencies(&new, inserted.version.id).await.unwrap();
  assert_eq!(added, vec!["~> 1.2 bar".to_owned()]);

  let edges = s.dependencies(inserted.version.id).await.unwrap();
  assert_eq!(edges.len(), 1);
  assert_eq!(edges[0].requirements, "~> 1.2");
  assert_eq!(edges[0].scope, Scope::Development);
}

#[tokio::test]
async fn added_dependency_invalidates_version_digest() {
  let s = store().await;
  let foo = spec("foo", "1.0").with_dependency(runtime("bar", "~> 1.0"));

  let inserted = s.insert_spec(&foo, "ruby", None, None).await.unwrap();
  assert!(inserted.dependencies_added.is_empty());

  let key = ChangeSignal::Version(inserted.version.id).checksum_name();
  seed_checksum(&s, &key).await;
  s.find_or_insert_package("bar").await.unwrap();
  let mut rx = s.subscribe();

  let added = s.insert_dependencies(&foo, inserted.version.id).await.unwrap();
  assert_eq!(added.len(), 1);
  assert_eq!(digest(&s, &key).await, None);
  assert_eq!(
    rx.recv().await.unwrap(),
    ChangeSignal::Version(inserted.version.id)
  );
}

// ─── Transactional insert ────────────────────────────────────────────────────

#[tokio::test]
async fn insert_spec_reports_each_step() {
  let s = store().await;
  let foo = spec("foo", "1.0");

  let first = s.insert_spec(&foo, "ruby", None, Some(true)).await.unwrap();
  assert!(first.package.inserted);
  assert!(first.version.inserted);

  let second = s.insert_spec(&foo, "ruby", None, Some(true)).await.unwrap();
  assert!(!second.package.inserted);
  assert!(!second.version.inserted);
  assert_eq!(second.version.id, first.version.id);
}

#[tokio::test]
async fn signals_follow_commit_order() {
  let s = store().await;
  let mut rx = s.subscribe();

  s.insert_spec(&spec("foo", "1.0"), "ruby", None, None)
    .await
    .unwrap();

  assert_eq!(rx.recv().await.unwrap(), ChangeSignal::Names);
  assert_eq!(rx.recv().await.unwrap(), ChangeSignal::Versions);
  assert!(rx.try_recv().is_err());
}

// ─── Existence ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn exists_requires_indexed_row() {
  let s = store().await;
  let v = s
    .insert_spec(&spec("foo", "1.0"), "ruby", None, None)
    .await
    .unwrap()
    .version;

  set_indexed(&s, v.id, false).await;
  assert!(!s.exists("foo", "1.0", "ruby").await.unwrap());
  assert!(s.coordinator().lock().await.cache.is_empty());

  set_indexed(&s, v.id, true).await;
  assert!(s.exists("foo", "1.0", "ruby").await.unwrap());
}

#[tokio::test]
async fn exists_caches_positive_results_only() {
  let coordinator = Coordinator::new(CacheKey::FullName);
  let s = store().await.with_coordinator(coordinator.clone());

  assert!(!s.exists("foo", "1.0", "ruby").await.unwrap());
  assert!(coordinator.lock().await.cache.is_empty());

  let v = s
    .insert_spec(&spec("foo", "1.0"), "ruby", None, None)
    .await
    .unwrap()
    .version;
  assert!(s.exists("foo", "1.0", "ruby").await.unwrap());
  assert!(coordinator.lock().await.cache.known_to_exist("foo-1.0"));

  // The cache answers even once storage disagrees.
  set_indexed(&s, v.id, false).await;
  assert!(s.exists("foo", "1.0", "ruby").await.unwrap());
  assert!(s.find_indexed_version("foo", "1.0", "ruby").await.unwrap().is_none());
}

#[tokio::test]
async fn name_version_key_spans_platforms() {
  let s = store().await;
  s.insert_spec(&spec("foo", "1.0"), "ruby", None, None)
    .await
    .unwrap();

  assert!(s.exists("foo", "1.0", "ruby").await.unwrap());
  // Cached under "foo-1.0", so the java variant reads as present.
  assert!(s.exists("foo", "1.0", "java").await.unwrap());
  assert!(s.find_indexed_version("foo", "1.0", "java").await.unwrap().is_none());
}

#[tokio::test]
async fn yank_unindexes_and_forgets() {
  let s = store().await;
  s.insert_spec(&spec("foo", "1.0"), "ruby", None, None)
    .await
    .unwrap();
  assert!(s.exists("foo", "1.0", "ruby").await.unwrap());

  let mut rx = s.subscribe();
  assert!(s.yank("foo", "1.0", "ruby").await.unwrap());
  assert_eq!(rx.recv().await.unwrap(), ChangeSignal::Versions);

  assert!(!s.exists("foo", "1.0", "ruby").await.unwrap());
  assert!(!s.find_version("foo", "1.0", "ruby").await.unwrap().unwrap().indexed);

  // Nothing left to yank.
  assert!(!s.yank("foo", "1.0", "ruby").await.unwrap());
}

// ─── Retry ───────────────────────────────────────────────────────────────────

fn busy() -> Error {
  Error::Database(tokio_rusqlite::Error::Rusqlite(
    rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(5), None),
  ))
}

#[test]
fn transient_classification() {
  assert!(busy().is_transient());
  // A closed connection never reopens; retrying it only sleeps.
  assert!(!Error::Database(tokio_rusqlite::Error::ConnectionClosed).is_transient());
  assert!(!Error::DateParse("nope".into()).is_transient());
  assert!(
    !Error::Database(tokio_rusqlite::Error::Rusqlite(
      rusqlite::Error::QueryReturnedNoRows
    ))
    .is_transient()
  );
}

#[tokio::test]
async fn closed_connection_fails_without_retrying() {
  // Default storage policy: two retries, thirty seconds apart.
  let s = store().await;
  s.conn.clone().close().await.unwrap();

  let err = tokio::time::timeout(
    Duration::from_secs(5),
    s.exists("foo", "1.0", "ruby"),
  )
  .await
  .expect("closed connection must not be retried")
  .unwrap_err();
  assert!(matches!(
    err,
    Error::Database(tokio_rusqlite::Error::ConnectionClosed)
  ));
}

#[tokio::test]
async fn transient_failures_are_absorbed() {
  let policy = RetryPolicy::with_retries(2, Duration::from_millis(1));
  let mut calls = 0;

  let value = with_retries(policy, "test", || {
    calls += 1;
    let attempt = calls;
    async move { if attempt < 3 { Err(busy()) } else { Ok(attempt) } }
  })
  .await
  .unwrap();

  assert_eq!(value, 3);
}

#[tokio::test]
async fn exhausted_retries_propagate() {
  let policy = RetryPolicy::with_retries(2, Duration::from_millis(1));
  let mut calls = 0;

  let err = with_retries(policy, "test", || {
    calls += 1;
    async { Err::<(), _>(busy()) }
  })
  .await
  .unwrap_err();

  assert!(err.is_transient());
  assert_eq!(calls, 3);
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
  let policy = RetryPolicy::with_retries(2, Duration::from_millis(1));
  let mut calls = 0;

  let err = with_retries(policy, "test", || {
    calls += 1;
    async { Err::<(), _>(Error::DateParse("bad".into())) }
  })
  .await
  .unwrap_err();

  assert!(matches!(err, Error::DateParse(_)));
  assert_eq!(calls, 1);
}
