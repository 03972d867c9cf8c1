// ── Lister: one run against one list file ──

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tracing::info;

use crate::error::CoreError;
use crate::expire::{self, ExpireSummary};
use crate::query_port::{self, QueryPortStats, QueryTool};
use crate::source::{QueryPortSource, Source};
use crate::store::{self, ServerList};

/// Where the list lives and how servers age.
#[derive(Debug, Clone)]
pub struct ListerOptions {
    pub list_dir: PathBuf,
    /// List file stem, usually the game key.
    pub game: String,
    pub expired_ttl: TimeDelta,
    pub recover: bool,
}

/// Counts logged once a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub added: usize,
    pub removed: usize,
    pub recovered: usize,
}

/// Drives one source through load, update, expiry and save.
pub struct Lister<S: Source> {
    source: S,
    options: ListerOptions,
    path: PathBuf,
    servers: ServerList<S::Server>,
    total_before: usize,
    expired: ExpireSummary,
}

impl<S: Source> Lister<S> {
    /// Create the list directory if needed and load the existing list.
    pub fn open(source: S, options: ListerOptions) -> Result<Self, CoreError> {
        ensure_dir(&options.list_dir)?;
        let path = store::list_path(&options.list_dir, &options.game);
        info!(path = %path.display(), "loading existing server list");
        let servers = store::load(&path)?;
        Ok(Self {
            source,
            total_before: servers.len(),
            options,
            path,
            servers,
            expired: ExpireSummary::default(),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn servers(&self) -> &ServerList<S::Server> {
        &self.servers
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch current candidates and merge them into the known set.
    pub async fn update(&mut self) -> Result<(), CoreError> {
        let found = self.source.fetch_candidates().await?;
        info!(found = found.len(), source = self.source.name(), "updating server list");
        let result = self
            .servers
            .reconcile(found, self.options.expired_ttl, Utc::now());
        info!(added = result.added, updated = result.updated, "server list reconciled");
        Ok(())
    }

    pub async fn remove_expired(&mut self) -> ExpireSummary {
        let summary = expire::remove_expired(
            &mut self.servers,
            &self.source,
            self.options.expired_ttl,
            self.options.recover,
        )
        .await;
        self.expired.removed += summary.removed;
        self.expired.recovered += summary.recovered;
        summary
    }

    pub fn save(&self) -> Result<(), CoreError> {
        info!(servers = self.servers.len(), "writing server list");
        store::save(&self.path, &self.servers, self.source.ensure_ascii())
    }

    pub fn summary(&self) -> RunSummary {
        let total = self.servers.len();
        RunSummary {
            total,
            added: (total + self.expired.removed).saturating_sub(self.total_before),
            removed: self.expired.removed,
            recovered: self.expired.recovered,
        }
    }

    /// Full run: update, sweep, save, log.
    pub async fn run(&mut self) -> Result<RunSummary, CoreError> {
        self.update().await?;
        self.remove_expired().await;
        self.save()?;
        Ok(self.log_summary())
    }

    pub fn log_summary(&self) -> RunSummary {
        let summary = self.summary();
        info!(
            total = summary.total,
            added = summary.added,
            removed = summary.removed,
            recovered = summary.recovered,
            "server list updated"
        );
        summary
    }
}

impl<S: QueryPortSource> Lister<S> {
    /// Discover query ports for every known server.
    pub async fn find_query_ports<Q: QueryTool>(&mut self, tool: Arc<Q>, concurrency: usize) -> QueryPortStats {
        let validator = self.source.port_validator(&self.servers);
        let source = &self.source;
        query_port::find_query_ports(
            &mut self.servers,
            tool,
            source.gamedig_type(),
            concurrency,
            |game_port| source.port_candidates(game_port),
            &validator,
            self.options.expired_ttl,
        )
        .await
    }
}

fn ensure_dir(dir: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(dir).map_err(|e| CoreError::ListWrite {
        path: dir.display().to_string(),
        reason: format!("failed to create list directory: {e}"),
    })
}
