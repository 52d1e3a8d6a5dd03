//! `watch` command: one full build, then debounced rebuilds.
//!
//! ```text
//! notify → Debouncer (timing, temp-file filter) → SiteSet::rebuild → WatchStatus
//! ```

use std::mem;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use crossbeam::channel::{self, RecvTimeoutError};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::Cli;
use super::build::load_config;
use crate::logger::WatchStatus;
use crate::reload::{FsEvent, FsOp, WatchRoots};
use crate::sites::{BuildCfg, BuildReport, SiteSet};
use crate::utils::normalize_path;
use crate::{debug, log};

/// Quiet period after the last event before a rebuild starts.
const DEBOUNCE_MS: u64 = 300;

enum WatchMsg {
    Fs(notify::Result<notify::Event>),
    Shutdown,
}

/// Build once, then rebuild on every change until Ctrl+C.
pub fn watch_site(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let (tx, rx) = channel::unbounded::<WatchMsg>();

    let shutdown = tx.clone();
    ctrlc::set_handler(move || {
        let _ = shutdown.send(WatchMsg::Shutdown);
    })
    .map_err(|e| anyhow!("failed to set Ctrl+C handler: {}", e))?;

    // watcher first: changes made during the initial build are buffered
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(WatchMsg::Fs(res));
    })?;
    let mut sites = SiteSet::from_config(config)?;
    let mut watched = Vec::new();
    attach(&mut watcher, sites.watch_roots(), &mut watched)?;

    let mut status = WatchStatus::new();
    match sites.build(BuildCfg {
        watching: true,
        ..BuildCfg::full()
    }) {
        Ok(report) => report.log(),
        Err(e) => status.error("initial build failed", &e.to_string()),
    }
    log!("watch"; "watching {} paths, press Ctrl+C to stop", watched.len());

    let mut debouncer = Debouncer::default();
    loop {
        let msg = match debouncer.sleep_duration() {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match msg {
            Ok(WatchMsg::Fs(Ok(event))) => debouncer.add_event(&event),
            Ok(WatchMsg::Fs(Err(e))) => log!("watch"; "notify error: {}", e),
            Ok(WatchMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let events = debouncer.take();
                if events.is_empty() {
                    continue;
                }
                match apply_changes(&mut sites, cli, &events) {
                    Ok((report, reconfigured)) => {
                        if reconfigured {
                            attach(&mut watcher, sites.watch_roots(), &mut watched)?;
                        }
                        show_report(&mut status, &report);
                    }
                    Err(e) => status.error("rebuild failed", &format!("{e:#}")),
                }
            }
        }
    }

    log!("watch"; "stopped");
    Ok(())
}

/// Rebuild from a batch of events. Returns whether the config was reloaded.
fn apply_changes(sites: &mut SiteSet, cli: &Cli, events: &[FsEvent]) -> Result<(BuildReport, bool)> {
    let config_path = sites.watch_roots().config_path().to_path_buf();
    let config_changed = events.iter().any(|e| normalize_path(&e.path) == config_path);

    if config_changed {
        // reload through the CLI so flag overrides survive
        let config = load_config(cli)?;
        let report = sites.build(BuildCfg {
            new_config: Some(config),
            watching: true,
            ..BuildCfg::full()
        })?;
        return Ok((report, true));
    }

    let cfg = BuildCfg {
        watching: true,
        ..BuildCfg::default()
    };
    Ok((sites.rebuild(cfg, events)?, false))
}

fn show_report(status: &mut WatchStatus, report: &BuildReport) {
    if report.is_noop() {
        debug!("watch"; "nothing to rebuild");
        return;
    }
    let kind = if report.full { "rebuilt" } else { "updated" };
    let mut message = format!("{kind}: {}", report.summary());
    if report.errors > 0 {
        message.push_str(" (see errors above)");
    }
    status.success(&message);
}

/// Watch every existing root; the config file non-recursively.
fn attach(
    watcher: &mut RecommendedWatcher,
    roots: &WatchRoots,
    watched: &mut Vec<PathBuf>,
) -> Result<()> {
    for path in watched.drain(..) {
        let _ = watcher.unwatch(&path);
    }

    let mut targets: Vec<(&Path, RecursiveMode)> = roots
        .watched_dirs()
        .into_iter()
        .map(|dir| (dir, RecursiveMode::Recursive))
        .collect();
    targets.push((roots.config_path(), RecursiveMode::NonRecursive));

    for (path, mode) in targets {
        if !path.exists() || watched.iter().any(|w| w == path) {
            debug!("watch"; "skipping {}", path.display());
            continue;
        }
        watcher
            .watch(path, mode)
            .map_err(|e| anyhow!("failed to watch {}: {}", path.display(), e))?;
        watched.push(path.to_path_buf());
    }
    Ok(())
}

// ============================================================================
// debouncing
// ============================================================================

/// Collects events until the file system goes quiet.
#[derive(Debug, Default)]
struct Debouncer {
    events: Vec<FsEvent>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn add_event(&mut self, event: &notify::Event) {
        let Some(op) = fs_op(&event.kind) else {
            return;
        };
        debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.events.push(FsEvent::new(path.clone(), op));
            self.last_event = Some(Instant::now());
        }
    }

    /// Time left in the quiet period, `None` when nothing is pending.
    fn sleep_duration(&self) -> Option<Duration> {
        let last = self.last_event?;
        Some(Duration::from_millis(DEBOUNCE_MS).saturating_sub(last.elapsed()))
    }

    fn take(&mut self) -> Vec<FsEvent> {
        self.last_event = None;
        mem::take(&mut self.events)
    }
}

fn fs_op(kind: &EventKind) -> Option<FsOp> {
    match kind {
        EventKind::Create(_) => Some(FsOp::Create),
        EventKind::Remove(_) => Some(FsOp::Remove),
        // mtime/atime/chmod noise
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(_)) => Some(FsOp::Rename),
        EventKind::Modify(_) => Some(FsOp::Write),
        _ => None,
    }
}

/// Editor swap and backup files.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name == "4913"
}
