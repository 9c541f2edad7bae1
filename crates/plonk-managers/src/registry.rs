//! Process-wide registry of package manager factories.
//!
//! The registry is read-mostly: factories are registered at process start.
//! Tests replace the whole map through a scoped [`RegistryOverride`] that
//! restores the previous state on drop, and serialize themselves with
//! `serial_test` while holding one.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, RwLock},
};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{ManagerError, ManagerResult},
    exec::CommandRunner,
    managers::{
        apt::Apt, brew::Brew, cargo::Cargo, conda::Conda, gem::Gem, go::Go, npm::Npm, pip::Pip,
        pipx::Pipx, pnpm::Pnpm, uv::Uv, PackageManager,
    },
};

/// Produces a fresh adapter bound to the given runner.
pub type ManagerFactory =
    Arc<dyn Fn(Arc<dyn CommandRunner>) -> Arc<dyn PackageManager> + Send + Sync>;

static REGISTRY: LazyLock<RwLock<HashMap<&'static str, ManagerFactory>>> =
    LazyLock::new(|| RwLock::new(default_factories()));

fn factory<F>(f: F) -> ManagerFactory
where
    F: Fn(Arc<dyn CommandRunner>) -> Arc<dyn PackageManager> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn default_factories() -> HashMap<&'static str, ManagerFactory> {
    let mut map: HashMap<&'static str, ManagerFactory> = HashMap::new();
    map.insert("apt", factory(|r| Arc::new(Apt::new(r))));
    map.insert("brew", factory(|r| Arc::new(Brew::new(r))));
    map.insert("cargo", factory(|r| Arc::new(Cargo::new(r))));
    map.insert("conda", factory(|r| Arc::new(Conda::new(r))));
    map.insert("gem", factory(|r| Arc::new(Gem::new(r))));
    map.insert("go", factory(|r| Arc::new(Go::new(r))));
    map.insert("npm", factory(|r| Arc::new(Npm::new(r))));
    map.insert("pip", factory(|r| Arc::new(Pip::new(r))));
    map.insert("pipx", factory(|r| Arc::new(Pipx::new(r))));
    map.insert("pnpm", factory(|r| Arc::new(Pnpm::new(r))));
    map.insert("uv", factory(|r| Arc::new(Uv::new(r))));
    map
}

/// Registers (or replaces) a factory under `name`.
pub fn register(name: &'static str, factory: ManagerFactory) {
    REGISTRY.write().unwrap().insert(name, factory);
}

/// Instantiates the named manager.
///
/// # Errors
///
/// Returns [`ManagerError::UnknownManager`] for unregistered names; this is
/// a configuration error and surfaces before any batch work begins.
pub fn get(name: &str, runner: Arc<dyn CommandRunner>) -> ManagerResult<Arc<dyn PackageManager>> {
    let registry = REGISTRY.read().unwrap();
    registry
        .get(name)
        .map(|factory| factory(runner))
        .ok_or_else(|| ManagerError::UnknownManager {
            name: name.to_string(),
        })
}

/// All registered manager names, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = REGISTRY.read().unwrap().keys().copied().collect();
    names.sort_unstable();
    names
}

/// Names of registered managers whose `is_available` probe succeeds,
/// probed in parallel, sorted.
pub async fn available(
    runner: Arc<dyn CommandRunner>,
    token: &CancellationToken,
) -> Vec<String> {
    let managers: Vec<Arc<dyn PackageManager>> = {
        let registry = REGISTRY.read().unwrap();
        registry
            .values()
            .map(|factory| factory(runner.clone()))
            .collect()
    };

    let probes = managers.iter().map(|manager| async {
        match manager.is_available(token).await {
            Ok(true) => Some(manager.name().to_string()),
            _ => None,
        }
    });

    let mut available: Vec<String> = join_all(probes).await.into_iter().flatten().collect();
    available.sort_unstable();
    available
}

/// Scoped replacement of the registry for tests.
///
/// Replaces the full factory map and restores the previous one on drop.
/// Tests never mutate the global directly.
#[must_use = "the previous registry is restored when this guard drops"]
pub struct RegistryOverride {
    saved: HashMap<&'static str, ManagerFactory>,
}

impl RegistryOverride {
    pub fn replace(factories: HashMap<&'static str, ManagerFactory>) -> Self {
        let mut registry = REGISTRY.write().unwrap();
        let saved = std::mem::replace(&mut *registry, factories);
        Self { saved }
    }
}

impl Drop for RegistryOverride {
    fn drop(&mut self) {
        let mut registry = REGISTRY.write().unwrap();
        *registry = std::mem::take(&mut self.saved);
    }
}
