//! The `GemRepository` trait.
//!
//! The trait is implemented by storage backends (e.g. `gemdex-store-sqlite`).
//! The repository is the only writer of packages, versions, dependency edges
//! and change signals. Packages, versions and edges are unique per key:
//! implementations must make find-or-insert atomic in storage so that
//! concurrent writers without a shared coordinator converge on one row.

use std::future::Future;

use crate::{
  cache::Coordinator,
  model::{DependencyEdge, Package, SpecInsert, Upsert, Version, VersionRef},
  spec::GemSpec,
};

/// Abstraction over the relational store.
///
/// All methods return `Send` futures so repositories can be shared between
/// tasks of a multi-threaded runtime.
pub trait GemRepository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The coordinator whose cache backs [`GemRepository::exists`]. Jobs lock
  /// the same coordinator around their insert phase.
  fn coordinator(&self) -> &Coordinator;

  // ── Existence ─────────────────────────────────────────────────────────

  /// Whether an indexed row exists for `(name, number, platform)`.
  ///
  /// Consults the existence cache first; a storage hit is cached. Transient
  /// connectivity failures are retried within the repository's budget.
  fn exists<'a>(
    &'a self,
    name: &'a str,
    number: &'a str,
    platform: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The indexed row for `(name, number, platform)`, bypassing the cache.
  fn find_indexed_version<'a>(
    &'a self,
    name: &'a str,
    number: &'a str,
    platform: &'a str,
  ) -> impl Future<Output = Result<Option<VersionRef>, Self::Error>> + Send + 'a;

  // ── Upserts ───────────────────────────────────────────────────────────

  /// Look up a package by exact name, inserting it when absent.
  fn find_or_insert_package<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Upsert, Self::Error>> + Send + 'a;

  /// Look up `(package_id, spec.version, platform)`, inserting when absent.
  ///
  /// An existing row only has `indexed` rewritten, and only when `indexed`
  /// is given and differs. New rows default to indexed.
  fn find_or_insert_version<'a>(
    &'a self,
    package_id: i64,
    spec: &'a GemSpec,
    platform: &'a str,
    checksum: Option<&'a str>,
    indexed: Option<bool>,
  ) -> impl Future<Output = Result<Upsert, Self::Error>> + Send + 'a;

  /// Write the edges of `spec` that are missing or differ for `version_id`.
  ///
  /// Targets unknown to the store are skipped. Returns
  /// `"<requirements> <name>"` for every edge written.
  fn insert_dependencies<'a>(
    &'a self,
    spec: &'a GemSpec,
    version_id: i64,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Package, version and dependency upserts in one transaction.
  fn insert_spec<'a>(
    &'a self,
    spec: &'a GemSpec,
    platform: &'a str,
    checksum: Option<&'a str>,
    indexed: Option<bool>,
  ) -> impl Future<Output = Result<SpecInsert, Self::Error>> + Send + 'a;

  fn update_info_checksum<'a>(
    &'a self,
    version_id: i64,
    checksum: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Mark a version as no longer indexed. Returns whether a row changed.
  fn yank<'a>(
    &'a self,
    name: &'a str,
    number: &'a str,
    platform: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The row for `(name, number, platform)` regardless of `indexed`.
  fn find_version<'a>(
    &'a self,
    name: &'a str,
    number: &'a str,
    platform: &'a str,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + 'a;

  fn versions_of<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send + 'a;

  fn packages(
    &self,
  ) -> impl Future<Output = Result<Vec<Package>, Self::Error>> + Send + '_;

  fn dependencies(
    &self,
    version_id: i64,
  ) -> impl Future<Output = Result<Vec<DependencyEdge>, Self::Error>> + Send + '_;
}
