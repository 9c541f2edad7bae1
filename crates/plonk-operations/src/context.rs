use std::{path::PathBuf, sync::Arc};

use plonk_config::Config;
use plonk_core::{dotfiles::DotfileEngine, lock::LockService};
use plonk_events::EventSinkHandle;
use plonk_managers::{registry, CommandRunner, PackageManager};

use crate::error::OpsResult;

/// Everything an operation needs: configuration, the lock service, the
/// command runner seam and the event sink.
///
/// Contexts are cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct PlonkContext {
    plonk_dir: PathBuf,
    home: PathBuf,
    config: Config,
    lock: Arc<LockService>,
    runner: Arc<dyn CommandRunner>,
    events: EventSinkHandle,
}

impl PlonkContext {
    pub fn new(
        plonk_dir: PathBuf,
        home: PathBuf,
        config: Config,
        runner: Arc<dyn CommandRunner>,
        events: EventSinkHandle,
    ) -> Self {
        let lock = Arc::new(LockService::new(&plonk_dir));
        Self {
            plonk_dir,
            home,
            config,
            lock,
            runner,
            events,
        }
    }

    /// Builds a context from the environment: `PLONK_DIR` (default
    /// `~/.config/plonk`), `HOME`, and `plonk.yaml` inside the plonk dir.
    pub fn discover(runner: Arc<dyn CommandRunner>, events: EventSinkHandle) -> OpsResult<Self> {
        let plonk_dir = plonk_utils::path::plonk_dir().map_err(plonk_core::CoreError::Path)?;
        let home = plonk_utils::path::home_dir().map_err(plonk_core::CoreError::Path)?;
        let config = Config::load(&plonk_dir)?;
        Ok(Self::new(plonk_dir, home, config, runner, events))
    }

    pub fn plonk_dir(&self) -> &PathBuf {
        &self.plonk_dir
    }

    pub fn home(&self) -> &PathBuf {
        &self.home
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lock(&self) -> &LockService {
        &self.lock
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        self.runner.clone()
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.events
    }

    pub fn dotfiles(&self) -> DotfileEngine {
        DotfileEngine::new(
            self.plonk_dir.clone(),
            self.home.clone(),
            self.config.clone(),
        )
    }

    /// Instantiates a registered manager bound to this context's runner.
    pub fn manager(&self, name: &str) -> OpsResult<Arc<dyn PackageManager>> {
        Ok(registry::get(name, self.runner.clone())?)
    }
}
