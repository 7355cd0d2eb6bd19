//! One pass of the transfer pipeline.
//!
//! A run probes the backgrounded lftp session, applies the current limits,
//! starts transfers for new items, reconciles the local queue with what the
//! session reports, removes finished remote sources and moves finished items
//! to their targets. Runs are short-lived; the persistent state lives in the
//! catalog and in lftp's own background queue.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveTime};
use regex_lite::Regex;
use tracing::{debug, info, warn};

use crate::catalog::{remote_path, ItemCatalog, ItemStatus, RemoteItem};
use crate::lftp::{
    CommandBatch, ExecuteOptions, Lftp, MirrorOptions, PgetOptions, TransferBackend,
};
use crate::listing::{parse_listing, EntryKind};
use crate::notify::{NotificationEvent, NotifierSet};
use crate::placer::{MoveRequest, Placer};
use crate::queue::{parse_jobs, JobStatus, QueueSnapshot};

use super::config::RunSettings;
use super::types::{OrchestratorError, RunReport, RunStage};

/// Suffix lftp gives the resume state of an unfinished pget.
const PGET_STATUS_SUFFIX: &str = ".lftp-pget-status";

/// Drives one run against a single remote host.
pub struct Locomotive<B, C, P>
where
    B: TransferBackend,
    C: ItemCatalog,
    P: Placer,
{
    settings: RunSettings,
    lftp: Lftp<B>,
    catalog: C,
    placer: P,
    notifiers: NotifierSet,
    exclude: Vec<Regex>,
    stage: RunStage,
    clock: Option<NaiveTime>,
}

impl<B, C, P> Locomotive<B, C, P>
where
    B: TransferBackend,
    C: ItemCatalog,
    P: Placer,
{
    /// Creates a runner. Fails on settings no run could use.
    pub fn new(
        settings: RunSettings,
        lftp: Lftp<B>,
        catalog: C,
        placer: P,
        notifiers: NotifierSet,
    ) -> Result<Self, OrchestratorError> {
        if settings.limits.transfer_limit == 0 {
            return Err(OrchestratorError::InvalidSettings(
                "transfer limit must be at least 1".to_string(),
            ));
        }

        let exclude = settings
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    OrchestratorError::InvalidSettings(format!(
                        "invalid exclude pattern '{}': {}",
                        pattern, e
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            settings,
            lftp,
            catalog,
            placer,
            notifiers,
            exclude,
            stage: RunStage::Init,
            clock: None,
        })
    }

    /// Pins the time of day used for the speed schedule.
    pub fn with_clock_time(mut self, time: NaiveTime) -> Self {
        self.clock = Some(time);
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn lftp(&self) -> &Lftp<B> {
        &self.lftp
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The stage the run is in, or stopped in.
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    /// Runs every stage in order.
    ///
    /// Transfer client failures outside the status probe abort the run; the
    /// error carries the client output. Failed moves and notifications do
    /// not.
    pub async fn run(&mut self) -> Result<RunReport, OrchestratorError> {
        let mut report = RunReport::default();
        let transfer_limit = self.settings.limits.transfer_limit;

        self.enter(RunStage::ProbeStatus);
        let snapshot = match self.probe_status().await? {
            Some(output) => {
                self.enter(RunStage::ParseQueue);
                parse_jobs(&output, transfer_limit)
            }
            None => QueueSnapshot::idle(transfer_limit),
        };
        report.backgrounded = snapshot.is_backgrounded();
        debug!(
            "Session: backgrounded={}, active={}, queued={}",
            report.backgrounded,
            snapshot.active_count(),
            snapshot.queued_count()
        );

        self.enter(RunStage::ApplyLimits);
        let (limits, slots) = self.apply_limits(&snapshot);
        report.available_slots = slots;

        self.enter(RunStage::InitiateTransfers);
        let launched = self
            .initiate_transfers(limits, slots, &snapshot, &mut report)
            .await?;

        self.enter(RunStage::UpdateLocalQueue);
        self.update_local_queue(&snapshot, &launched, &mut report)
            .await?;

        self.enter(RunStage::RemoveSourceFiles);
        self.remove_source_files(&mut report).await?;

        self.enter(RunStage::MoveFinished);
        self.move_finished(&mut report).await?;

        self.enter(RunStage::Report);
        log_report(&report);

        self.enter(RunStage::Terminal);
        Ok(report)
    }

    fn enter(&mut self, stage: RunStage) {
        debug!("Entering stage {}", stage);
        self.stage = stage;
    }

    /// Asks a backgrounded session for its job list. `None` when no session
    /// answered.
    async fn probe_status(&mut self) -> Result<Option<String>, OrchestratorError> {
        self.lftp.add_command("jobs -v");
        match self.lftp.execute(ExecuteOptions::probe(None)).await {
            Ok(outcome) => Ok(Some(outcome.output().to_string())),
            Err(e) if e.is_client_failure() => {
                self.lftp.take_pending();
                debug!("No backgrounded lftp session: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Builds the limit commands and counts free slots.
    fn apply_limits(&self, snapshot: &QueueSnapshot) -> (CommandBatch, u32) {
        let limits = self.settings.limits;
        let now = self.clock.unwrap_or_else(|| Local::now().time());
        let speed = self
            .settings
            .speed_schedule
            .effective_limit(now, limits.speed_limit);

        let mut batch = self.lftp.new_batch();
        batch
            .set_speed_limit(speed)
            .set_transfer_limit(limits.transfer_limit);

        let slots = if snapshot.is_backgrounded() {
            snapshot.available_slots()
        } else {
            limits.transfer_limit
        };
        debug!("Speed limit {} B/s, {} free transfer slots", speed, slots);

        (batch, slots)
    }

    /// Lists every source, records what it finds and launches transfers.
    /// Returns the ids of launched items.
    async fn initiate_transfers(
        &mut self,
        limits: CommandBatch,
        slots: u32,
        snapshot: &QueueSnapshot,
        report: &mut RunReport,
    ) -> Result<HashSet<i64>, OrchestratorError> {
        let host = self.settings.host.clone();
        let mut listed = HashSet::new();

        for source in self.settings.sources.clone() {
            self.lftp.list_dir(&source.remote_dir, true);
            let outcome = self.lftp.execute(ExecuteOptions::foreground()).await?;
            let entries = parse_listing(outcome.output());
            let new_items = self.catalog.record_seen(&host, &source.remote_dir, &entries)?;
            debug!(
                "Listed {} entries in {} ({} new)",
                entries.len(),
                source.remote_dir,
                new_items
            );
            listed.extend(
                entries
                    .iter()
                    .map(|entry| remote_path(&source.remote_dir, &entry.name)),
            );
        }

        let candidates: Vec<RemoteItem> = self
            .catalog
            .candidates(&host, self.settings.limits.max_retries)?
            .into_iter()
            .filter(|item| listed.contains(&item.remote_path))
            .filter(|item| !snapshot.contains_path(&item.remote_path))
            .collect();

        if candidates.is_empty() {
            if snapshot.is_backgrounded() {
                self.push_limits_to_session(limits).await?;
            }
            return Ok(HashSet::new());
        }

        tokio::fs::create_dir_all(&self.settings.working_dir).await?;

        self.lftp.submit(limits);
        let mut plan = Vec::with_capacity(candidates.len());
        for (index, item) in candidates.into_iter().enumerate() {
            let enqueue = u32::try_from(index).map_or(true, |i| i >= slots);
            let batch = self.transfer_batch(&item, enqueue);
            self.lftp.submit(batch);
            plan.push((item, enqueue));
        }
        self.lftp.execute(ExecuteOptions::detached()).await?;

        let mut launched = HashSet::with_capacity(plan.len());
        for (item, enqueue) in plan {
            self.catalog.mark_transferring(item.id)?;
            launched.insert(item.id);
            if enqueue {
                report.queued_transfers.push(item.name.clone());
            } else {
                report.new_transfers.push(item.name.clone());
            }
            self.notifiers
                .dispatch(&NotificationEvent::TransferStarted { name: item.name })
                .await;
        }

        Ok(launched)
    }

    /// Sends fresh limits to a running session without starting anything.
    async fn push_limits_to_session(&mut self, limits: CommandBatch) -> Result<(), OrchestratorError> {
        self.lftp.submit(limits);
        match self.lftp.execute(ExecuteOptions::attached(None)).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_client_failure() => {
                self.lftp.take_pending();
                warn!("Could not update limits of the running session: {}", e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn transfer_batch(&self, item: &RemoteItem, enqueue: bool) -> CommandBatch {
        let connections = Some(self.settings.limits.connection_limit);
        match item.kind {
            EntryKind::Directory => {
                let mut batch = CommandBatch::new(self.settings.working_dir.join(&item.name));
                batch.mirror_dir(
                    &item.remote_path,
                    MirrorOptions {
                        pget_connections: connections,
                        parallel_files: None,
                        enqueue,
                    },
                );
                batch
            }
            EntryKind::File => {
                let mut batch = CommandBatch::new(self.settings.working_dir.clone());
                batch.pget_file(
                    &item.remote_path,
                    PgetOptions {
                        connections,
                        enqueue,
                    },
                );
                batch
            }
        }
    }

    /// Settles items whose transfer is no longer in the session.
    async fn update_local_queue(
        &mut self,
        snapshot: &QueueSnapshot,
        launched: &HashSet<i64>,
        report: &mut RunReport,
    ) -> Result<(), OrchestratorError> {
        let items = self
            .catalog
            .in_status(&self.settings.host, ItemStatus::Transferring)?;

        for item in items {
            if !self.settings.is_source(&item.source_dir)
                || launched.contains(&item.id)
                || snapshot.contains_path(&item.remote_path)
            {
                continue;
            }

            let failed_in_session = snapshot.status_of(&item.remote_path) == Some(JobStatus::Failed);
            let local = self.settings.working_dir.join(&item.name);

            if !failed_in_session && is_complete(&local, item.kind).await? {
                self.catalog.mark_transferred(item.id)?;
                info!("Transfer finished: {}", item.name);
                report.completed.push(item.name);
            } else {
                self.catalog.mark_failed(item.id)?;
                warn!(
                    "Transfer of {} did not complete (attempt {} of {})",
                    item.name, item.attempts, self.settings.limits.max_retries
                );
                report.failed.push(item.name);
            }
        }

        Ok(())
    }

    /// Deletes remote sources of transferred items, unless excluded.
    async fn remove_source_files(&mut self, report: &mut RunReport) -> Result<(), OrchestratorError> {
        if !self.settings.remove_sources {
            return Ok(());
        }

        let items: Vec<RemoteItem> = self
            .catalog
            .awaiting_source_removal(&self.settings.host)?
            .into_iter()
            .filter(|item| self.settings.is_source(&item.source_dir))
            .filter(|item| {
                let excluded = self.is_excluded(&item.name);
                if excluded {
                    debug!("Keeping excluded source: {}", item.remote_path);
                }
                !excluded
            })
            .collect();

        if items.is_empty() {
            return Ok(());
        }

        for item in &items {
            let mut batch = self.lftp.new_batch();
            batch.remove_path(&item.remote_path, item.kind == EntryKind::Directory);
            self.lftp.submit(batch);
        }
        self.lftp.execute(ExecuteOptions::foreground()).await?;

        for item in items {
            self.catalog.mark_source_removed(item.id)?;
            info!("Removed source: {}", item.remote_path);
            report.removed_sources.push(item.name);
        }

        Ok(())
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|re| re.is_match(name))
    }

    /// Moves transferred items to the target of their source directory.
    async fn move_finished(&mut self, report: &mut RunReport) -> Result<(), OrchestratorError> {
        let items = self.catalog.awaiting_move(&self.settings.host)?;

        for item in items {
            let Some(target) = self.settings.target_for(&item.source_dir) else {
                continue;
            };

            let request = MoveRequest::new(
                item.name.clone(),
                self.settings.working_dir.join(&item.name),
                target.join(&item.name),
            );

            match self.placer.move_item(request).await {
                Ok(result) => {
                    self.catalog.mark_moved(item.id, &result.destination)?;
                    self.notifiers
                        .dispatch(&NotificationEvent::ItemMoved {
                            name: item.name.clone(),
                            destination: result.destination,
                        })
                        .await;
                    report.moved_items.push(item.name);
                }
                Err(e) => {
                    warn!("Failed to move {}: {}", item.name, e);
                    report.failed_moves.push(item.name);
                }
            }
        }

        Ok(())
    }
}

fn log_report(report: &RunReport) {
    let mut launched = report.launched().peekable();
    if launched.peek().is_none() {
        info!("Locomotive did not start any new transfers.");
    }
    for name in launched {
        info!("New transfer started: {}", name);
    }

    if report.moved_items.is_empty() {
        info!("Locomotive did not move any transferred items.");
    }
    for name in &report.moved_items {
        info!("Finished item moved: {}", name);
    }
}

/// Whether `path` holds a fully transferred item: it exists and lftp left no
/// pget resume state for it.
async fn is_complete(path: &Path, kind: EntryKind) -> std::io::Result<bool> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if kind == EntryKind::File || !metadata.is_dir() {
        let mut status = path.as_os_str().to_owned();
        status.push(PGET_STATUS_SUFFIX);
        return Ok(!tokio::fs::try_exists(PathBuf::from(status)).await?);
    }

    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                pending.push(entry.path());
            } else if entry.file_name().to_string_lossy().ends_with(PGET_STATUS_SUFFIX) {
                return Ok(false);
            }
        }
    }

    Ok(true)
}
