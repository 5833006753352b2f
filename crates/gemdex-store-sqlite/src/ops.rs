//! Synchronous write and lookup units run on the connection thread.
//!
//! Each function takes a plain `&Connection` so callers can compose several
//! of them inside one transaction. Change signals are written to the
//! `checksums` table as they happen and collected into `signals` so the
//! store can broadcast them once the transaction commits.

use chrono::Utc;
use gemdex_core::{
  model::{Upsert, VersionRef},
  platform,
  requirement,
  signal::ChangeSignal,
  spec::GemSpec,
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::encode::{encode_dt, encode_scope};

pub type Signals = Vec<ChangeSignal>;

/// Clear the digest for `signal` and remember it for broadcast.
pub fn invalidate(
  conn: &Connection,
  signal: ChangeSignal,
  signals: &mut Signals,
) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE checksums SET digest = NULL WHERE name = ?1",
    params![signal.checksum_name()],
  )?;
  if !signals.contains(&signal) {
    signals.push(signal);
  }
  Ok(())
}

pub fn package_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row(
      "SELECT id FROM packages WHERE name = ?1",
      params![name],
      |r| r.get(0),
    )
    .optional()
}

pub fn find_indexed_version(
  conn: &Connection,
  name: &str,
  number: &str,
  platform: &str,
) -> rusqlite::Result<Option<VersionRef>> {
  conn
    .query_row(
      "SELECT p.id, v.id
       FROM packages p
       JOIN versions v ON v.package_id = p.id
       WHERE p.name = ?1
         AND v.number = ?2
         AND v.platform = ?3
         AND v.indexed = 1
       ORDER BY v.id
       LIMIT 1",
      params![name, number, platform],
      |r| {
        Ok(VersionRef {
          package_id: r.get(0)?,
          version_id: r.get(1)?,
        })
      },
    )
    .optional()
}

pub fn find_or_insert_package(
  conn: &Connection,
  name: &str,
  signals: &mut Signals,
) -> rusqlite::Result<Upsert> {
  if let Some(id) = package_id(conn, name)? {
    return Ok(Upsert::found(id));
  }

  let written = conn.execute(
    "INSERT INTO packages (name, created_at) VALUES (?1, ?2)
     ON CONFLICT (name) DO NOTHING",
    params![name, encode_dt(Utc::now())],
  )?;
  if written == 0 {
    // Another connection inserted it first.
    let id = conn.query_row(
      "SELECT id FROM packages WHERE name = ?1",
      params![name],
      |r| r.get(0),
    )?;
    return Ok(Upsert::found(id));
  }

  let id = conn.last_insert_rowid();
  invalidate(conn, ChangeSignal::Names, signals)?;

  Ok(Upsert::inserted(id))
}

pub fn find_or_insert_version(
  conn: &Connection,
  package_id: i64,
  spec: &GemSpec,
  platform: &str,
  checksum: Option<&str>,
  indexed: Option<bool>,
  signals: &mut Signals,
) -> rusqlite::Result<Upsert> {
  if let Some(existing) = existing_version(conn, package_id, &spec.version, platform)? {
    return found_version(conn, existing, indexed, signals);
  }

  let ruby_version = spec.required_ruby_version.as_deref().unwrap_or("").trim();
  let rubygems_version =
    spec.required_rubygems_version.as_deref().unwrap_or("").trim();

  let written = conn.execute(
    "INSERT INTO versions (
       package_id, number, platform, indexed, prerelease, full_name,
       required_ruby_version, required_rubygems_version, checksum, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
     ON CONFLICT (package_id, number, platform) DO NOTHING",
    params![
      package_id,
      spec.version,
      platform,
      indexed.unwrap_or(true),
      spec.is_prerelease(),
      platform::full_name(&spec.name, &spec.version, platform),
      ruby_version,
      rubygems_version,
      checksum,
      encode_dt(Utc::now()),
    ],
  )?;
  if written == 0 {
    let existing = existing_version(conn, package_id, &spec.version, platform)?
      .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    return found_version(conn, existing, indexed, signals);
  }

  let id = conn.last_insert_rowid();
  invalidate(conn, ChangeSignal::Versions, signals)?;

  Ok(Upsert::inserted(id))
}

/// `(id, indexed)` of the row for `(package_id, number, platform)`.
fn existing_version(
  conn: &Connection,
  package_id: i64,
  number: &str,
  platform: &str,
) -> rusqlite::Result<Option<(i64, bool)>> {
  conn
    .query_row(
      "SELECT id, indexed FROM versions
       WHERE package_id = ?1 AND number = ?2 AND platform = ?3",
      params![package_id, number, platform],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()
}

/// Apply an `indexed` override to an existing row when it differs.
fn found_version(
  conn: &Connection,
  (id, current): (i64, bool),
  indexed: Option<bool>,
  signals: &mut Signals,
) -> rusqlite::Result<Upsert> {
  if let Some(wanted) = indexed
    && wanted != current
  {
    conn.execute(
      "UPDATE versions SET indexed = ?1 WHERE id = ?2",
      params![wanted, id],
    )?;
    invalidate(conn, ChangeSignal::Versions, signals)?;
  }
  Ok(Upsert::found(id))
}

pub fn insert_dependencies(
  conn: &Connection,
  spec: &GemSpec,
  version_id: i64,
  signals: &mut Signals,
) -> rusqlite::Result<Vec<String>> {
  let mut added = Vec::new();

  for dep in spec.unique_dependencies() {
    // Targets missing from a partial mirror are tolerated.
    let Some(target_id) = package_id(conn, &dep.name)? else {
      continue;
    };

    let requirements = requirement::normalize(&dep.requirement);
    let current: Option<String> = conn
      .query_row(
        "SELECT requirements FROM dependencies
         WHERE version_id = ?1 AND package_id = ?2",
        params![version_id, target_id],
        |r| r.get(0),
      )
      .optional()?;

    if let Some(current) = current
      && requirement::equivalent(&current, &requirements)
    {
      continue;
    }

    conn.execute(
      "INSERT INTO dependencies (version_id, package_id, requirements, scope)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (version_id, package_id) DO UPDATE
         SET requirements = excluded.requirements, scope = excluded.scope",
      params![version_id, target_id, requirements, encode_scope(dep.scope)],
    )?;

    added.push(format!("{requirements} {}", dep.name));
  }

  if !added.is_empty() {
    invalidate(conn, ChangeSignal::Version(version_id), signals)?;
  }

  Ok(added)
}

pub fn yank(
  conn: &Connection,
  name: &str,
  number: &str,
  platform: &str,
  signals: &mut Signals,
) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    "UPDATE versions SET indexed = 0
     WHERE package_id IN (SELECT id FROM packages WHERE name = ?1)
       AND number = ?2
       AND platform = ?3
       AND indexed = 1",
    params![name, number, platform],
  )?;

  if changed > 0 {
    invalidate(conn, ChangeSignal::Versions, signals)?;
  }
  Ok(changed > 0)
}
