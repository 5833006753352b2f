//! [`SqliteStore`], the SQLite implementation of [`GemRepository`].

use std::path::Path;

use gemdex_core::{
  cache::Coordinator,
  model::{DependencyEdge, Package, SpecInsert, Upsert, Version, VersionRef},
  retry::RetryPolicy,
  signal::ChangeSignal,
  spec::GemSpec,
  store::GemRepository,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use tokio::sync::broadcast;

use crate::{
  Result,
  encode::{RawDependency, RawVersion, VERSION_COLUMNS},
  ops::{self, Signals},
  retry::with_retries,
  schema::SCHEMA,
};

const SIGNAL_CAPACITY: usize = 256;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gem repository backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connection, the coordinator and the
/// signal channel.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  coordinator:     Coordinator,
  retry:           RetryPolicy,
  signals:         broadcast::Sender<ChangeSignal>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
    Ok(Self {
      conn,
      coordinator: Coordinator::default(),
      retry: RetryPolicy::STORAGE,
      signals,
    })
  }

  /// Share `coordinator` with the jobs driving this store.
  pub fn with_coordinator(mut self, coordinator: Coordinator) -> Self {
    self.coordinator = coordinator;
    self
  }

  /// Replace the connectivity retry budget of existence lookups.
  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Receive every change signal committed after this call.
  pub fn subscribe(&self) -> broadcast::Receiver<ChangeSignal> {
    self.signals.subscribe()
  }

  /// Run `f` inside one transaction; broadcast its signals after commit.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection, &mut Signals) -> rusqlite::Result<T> + Send + 'static,
  {
    let (value, signals) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut signals = Signals::new();
        let value = f(&*tx, &mut signals)?;
        tx.commit()?;
        Ok((value, signals))
      })
      .await?;

    for signal in signals {
      tracing::debug!(%signal, "change signal");
      // Nobody listening is fine.
      let _ = self.signals.send(signal);
    }
    Ok(value)
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  async fn indexed_version(
    &self,
    name: &str,
    number: &str,
    platform: &str,
  ) -> Result<Option<VersionRef>> {
    let what = format!("lookup {name} {number} {platform}");
    with_retries(self.retry, &what, move || {
      let (name, number, platform) =
        (name.to_owned(), number.to_owned(), platform.to_owned());
      self.read(move |conn| {
        ops::find_indexed_version(conn, &name, &number, &platform)
      })
    })
    .await
  }
}

// ─── GemRepository impl ──────────────────────────────────────────────────────

impl GemRepository for SqliteStore {
  type Error = crate::Error;

  fn coordinator(&self) -> &Coordinator { &self.coordinator }

  // ── Existence ─────────────────────────────────────────────────────────────

  async fn exists(&self, name: &str, number: &str, platform: &str) -> Result<bool> {
    let key = self.coordinator.key_for(name, number, platform);

    if self.coordinator.lock().await.cache.known_to_exist(&key) {
      return Ok(true);
    }

    let found = self.indexed_version(name, number, platform).await?.is_some();
    if found {
      self.coordinator.lock().await.cache.mark_exists(key);
    }
    Ok(found)
  }

  async fn find_indexed_version(
    &self,
    name: &str,
    number: &str,
    platform: &str,
  ) -> Result<Option<VersionRef>> {
    self.indexed_version(name, number, platform).await
  }

  // ── Upserts ───────────────────────────────────────────────────────────────

  async fn find_or_insert_package(&self, name: &str) -> Result<Upsert> {
    let name = name.to_owned();
    self
      .write(move |conn, signals| ops::find_or_insert_package(conn, &name, signals))
      .await
  }

  async fn find_or_insert_version(
    &self,
    package_id: i64,
    spec: &GemSpec,
    platform: &str,
    checksum: Option<&str>,
    indexed: Option<bool>,
  ) -> Result<Upsert> {
    let spec     = spec.clone();
    let platform = platform.to_owned();
    let checksum = checksum.map(str::to_owned);

    self
      .write(move |conn, signals| {
        ops::find_or_insert_version(
          conn,
          package_id,
          &spec,
          &platform,
          checksum.as_deref(),
          indexed,
          signals,
        )
      })
      .await
  }

  async fn insert_dependencies(
    &self,
    spec: &GemSpec,
    version_id: i64,
  ) -> Result<Vec<String>> {
    let spec = spec.clone();
    self
      .write(move |conn, signals| {
        ops::insert_dependencies(conn, &spec, version_id, signals)
      })
      .await
  }

  async fn insert_spec(
    &self,
    spec: &GemSpec,
    platform: &str,
    checksum: Option<&str>,
    indexed: Option<bool>,
  ) -> Result<SpecInsert> {
    let spec     = spec.clone();
    let platform = platform.to_owned();
    let checksum = checksum.map(str::to_owned);

    self
      .write(move |conn, signals| {
        let package = ops::find_or_insert_package(conn, &spec.name, signals)?;
        let version = ops::find_or_insert_version(
          conn,
          package.id,
          &spec,
          &platform,
          checksum.as_deref(),
          indexed,
          signals,
        )?;
        let dependencies_added =
          ops::insert_dependencies(conn, &spec, version.id, signals)?;

        Ok(SpecInsert { package, version, dependencies_added })
      })
      .await
  }

  async fn update_info_checksum(&self, version_id: i64, checksum: &str) -> Result<()> {
    let checksum = checksum.to_owned();
    self
      .write(move |conn, _| {
        conn.execute(
          "UPDATE versions SET info_checksum = ?1 WHERE id = ?2",
          params![checksum, version_id],
        )?;
        Ok(())
      })
      .await
  }

  async fn yank(&self, name: &str, number: &str, platform: &str) -> Result<bool> {
    let key = self.coordinator.key_for(name, number, platform);
    let (name, number, platform) =
      (name.to_owned(), number.to_owned(), platform.to_owned());

    let changed = self
      .write(move |conn, signals| {
        ops::yank(conn, &name, &number, &platform, signals)
      })
      .await?;

    self.coordinator.lock().await.cache.forget(&key);
    Ok(changed)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn find_version(
    &self,
    name: &str,
    number: &str,
    platform: &str,
  ) -> Result<Option<Version>> {
    let (name, number, platform) =
      (name.to_owned(), number.to_owned(), platform.to_owned());

    let raw: Option<RawVersion> = self
      .read(move |conn| {
        conn
          .query_row(
            &format!(
              "SELECT {VERSION_COLUMNS}
               FROM versions v
               JOIN packages p ON p.id = v.package_id
               WHERE p.name = ?1 AND v.number = ?2 AND v.platform = ?3
               ORDER BY v.id
               LIMIT 1"
            ),
            params![name, number, platform],
            RawVersion::from_row,
          )
          .optional()
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  async fn versions_of(&self, name: &str) -> Result<Vec<Version>> {
    let name = name.to_owned();

    let raws: Vec<RawVersion> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VERSION_COLUMNS}
           FROM versions v
           JOIN packages p ON p.id = v.package_id
           WHERE p.name = ?1
           ORDER BY v.id"
        ))?;
        stmt
          .query_map(params![name], RawVersion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }

  async fn packages(&self) -> Result<Vec<Package>> {
    self
      .read(|conn| {
        let mut stmt = conn.prepare("SELECT id, name FROM packages ORDER BY id")?;
        stmt
          .query_map([], |row| Ok(Package { id: row.get(0)?, name: row.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await
  }

  async fn dependencies(&self, version_id: i64) -> Result<Vec<DependencyEdge>> {
    let raws: Vec<RawDependency> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT d.id, d.version_id, d.package_id, p.name, d.requirements, d.scope
           FROM dependencies d
           JOIN packages p ON p.id = d.package_id
           WHERE d.version_id = ?1
           ORDER BY d.id",
        )?;
        stmt
          .query_map(params![version_id], |row| {
            Ok(RawDependency {
              id:           row.get(0)?,
              version_id:   row.get(1)?,
              package_id:   row.get(2)?,
              package_name: row.get(3)?,
              requirements: row.get(4)?,
              scope:        row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;

    raws.into_iter().map(RawDependency::into_edge).collect()
  }
}
