//! Background refresh scheduling.
//!
//! One tokio task owns the record cache and the per-file seen-line counts
//! and drives every refresh sequentially, so refreshes of the same file can
//! never overlap. A second task ticks once per second so the UI can keep the
//! "next sync in …" countdown current. Results flow back to the event loop
//! over an mpsc channel; the scheduler never touches UI state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::{error, info};
use tokio::sync::mpsc;

use crate::ingest::{Record, RecordCache};

pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Commands from the UI to the scheduler.
pub enum SyncCommand {
    /// Track a new file and run its initial full load.
    AddFile(PathBuf),
    /// Full reparse of every tracked file, resetting seen-line counts.
    ManualRefresh,
    /// Replace the automatic refresh interval and reschedule from now.
    SetInterval(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshKind {
    Manual,
    Automatic,
}

/// Events from the scheduler back to the event loop.
pub enum SyncEvent {
    /// A load finished. For `Manual` the records replace the tab's contents;
    /// for `Automatic` they are appended.
    Loaded {
        path: PathBuf,
        kind: RefreshKind,
        records: Vec<Record>,
        total_lines: usize,
        at: DateTime<Local>,
    },
    /// A load failed. Previously cached records are untouched.
    Failed {
        path: PathBuf,
        kind: RefreshKind,
        message: String,
    },
    /// Fraction of a long-running load, in [0,1].
    Progress { path: PathBuf, fraction: f64 },
    /// The next automatic cycle was (re)scheduled.
    Scheduled { next_sync: Instant },
    /// One-second countdown tick.
    Tick,
}

struct Scheduler {
    cache: RecordCache,
    seen_lines: HashMap<PathBuf, usize>,
    files: Vec<PathBuf>,
    interval: Duration,
    events: mpsc::Sender<SyncEvent>,
}

/// Spawn the refresh scheduler and the countdown ticker. The initial files
/// get a full load before the first automatic cycle is scheduled.
pub fn spawn(
    files: Vec<PathBuf>,
    interval: Duration,
    events: mpsc::Sender<SyncEvent>,
) -> mpsc::Sender<SyncCommand> {
    let (cmd_tx, cmd_rx) = mpsc::channel(DEFAULT_EVENT_BUFFER);

    let ticker_events = events.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        loop {
            tick.tick().await;
            if ticker_events.send(SyncEvent::Tick).await.is_err() {
                break;
            }
        }
    });

    let scheduler = Scheduler {
        cache: RecordCache::new(),
        seen_lines: HashMap::new(),
        files,
        interval,
        events,
    };
    tokio::spawn(scheduler.run(cmd_rx));

    cmd_tx
}

impl Scheduler {
    async fn run(mut self, mut commands: mpsc::Receiver<SyncCommand>) {
        for path in self.files.clone() {
            self.full_refresh(&path).await;
        }
        let mut next_sync = Instant::now() + self.interval;
        self.announce_schedule(next_sync).await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_sync.into()) => {
                    self.automatic_cycle().await;
                    next_sync = Instant::now() + self.interval;
                    self.announce_schedule(next_sync).await;
                }
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        SyncCommand::AddFile(path) => {
                            if !self.files.contains(&path) {
                                self.files.push(path.clone());
                            }
                            self.full_refresh(&path).await;
                        }
                        SyncCommand::ManualRefresh => {
                            for path in self.files.clone() {
                                self.full_refresh(&path).await;
                            }
                        }
                        SyncCommand::SetInterval(interval) => {
                            info!("automatic sync interval set to {:?}", interval);
                            self.interval = interval;
                            next_sync = Instant::now() + interval;
                            self.announce_schedule(next_sync).await;
                        }
                    }
                }
            }
        }
    }

    /// Incremental refresh of every tracked file, in order. A failure for
    /// one file must not stop the rest of the cycle.
    async fn automatic_cycle(&mut self) {
        for path in self.files.clone() {
            let seen = self.seen_lines.get(&path).copied().unwrap_or(0);
            let mut progress = self.progress_fn(&path);
            match self
                .cache
                .load_incremental(&path, seen, Some(&mut progress))
            {
                Ok((records, total_lines)) => {
                    self.seen_lines.insert(path.clone(), total_lines);
                    let event = SyncEvent::Loaded {
                        path,
                        kind: RefreshKind::Automatic,
                        records,
                        total_lines,
                        at: Local::now(),
                    };
                    if self.events.send(event).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    error!("automatic refresh failed for {}: {e}", path.display());
                    let event = SyncEvent::Failed {
                        path,
                        kind: RefreshKind::Automatic,
                        message: e.to_string(),
                    };
                    if self.events.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn full_refresh(&mut self, path: &PathBuf) {
        let mut progress = self.progress_fn(path);
        let event = match self.cache.load_full(path, Some(&mut progress)) {
            Ok((records, total_lines)) => {
                self.seen_lines.insert(path.clone(), total_lines);
                SyncEvent::Loaded {
                    path: path.clone(),
                    kind: RefreshKind::Manual,
                    records,
                    total_lines,
                    at: Local::now(),
                }
            }
            Err(e) => {
                error!("full load failed for {}: {e}", path.display());
                SyncEvent::Failed {
                    path: path.clone(),
                    kind: RefreshKind::Manual,
                    message: e.to_string(),
                }
            }
        };
        let _ = self.events.send(event).await;
    }

    /// Progress callback for a load. Observational only, so dropping
    /// updates when the channel is full is fine.
    fn progress_fn(&self, path: &PathBuf) -> impl FnMut(f64) + use<> {
        let events = self.events.clone();
        let path = path.clone();
        move |fraction: f64| {
            let _ = events.try_send(SyncEvent::Progress {
                path: path.clone(),
                fraction,
            });
        }
    }

    async fn announce_schedule(&self, next_sync: Instant) {
        let _ = self.events.send(SyncEvent::Scheduled { next_sync }).await;
    }
}

/// Human countdown text, matching the status line's needs.
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds == 0 {
        return "Syncing now...".to_string();
    }
    let (hours, rem) = (seconds / 3600, seconds % 3600);
    let (minutes, secs) = (rem / 60, rem % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn countdown_text() {
        assert_eq!(format_time_remaining(0), "Syncing now...");
        assert_eq!(format_time_remaining(42), "42s");
        assert_eq!(format_time_remaining(125), "2m 5s");
        assert_eq!(format_time_remaining(3723), "1h 2m 3s");
    }

    #[tokio::test]
    async fn add_file_runs_initial_full_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"n\":1}}").unwrap();
        writeln!(file, "{{\"n\":2}}").unwrap();
        file.flush().unwrap();

        let (tx, mut rx) = mpsc::channel(DEFAULT_EVENT_BUFFER);
        let commands = spawn(Vec::new(), Duration::from_secs(3600), tx);
        commands
            .send(SyncCommand::AddFile(file.path().to_path_buf()))
            .await
            .unwrap();

        loop {
            match rx.recv().await.unwrap() {
                SyncEvent::Loaded {
                    kind,
                    records,
                    total_lines,
                    ..
                } => {
                    assert_eq!(kind, RefreshKind::Manual);
                    assert_eq!(records.len(), 2);
                    assert_eq!(total_lines, 2);
                    break;
                }
                SyncEvent::Failed { message, .. } => panic!("load failed: {message}"),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn set_interval_reschedules_and_automatic_cycle_appends_suffix() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"n\":1}}").unwrap();
        file.flush().unwrap();

        let (tx, mut rx) = mpsc::channel(DEFAULT_EVENT_BUFFER);
        let commands = spawn(
            vec![file.path().to_path_buf()],
            Duration::from_secs(3600),
            tx,
        );

        // Initial full load.
        loop {
            match rx.recv().await.unwrap() {
                SyncEvent::Loaded { kind, records, .. } => {
                    assert_eq!(kind, RefreshKind::Manual);
                    assert_eq!(records.len(), 1);
                    break;
                }
                SyncEvent::Failed { message, .. } => panic!("load failed: {message}"),
                _ => {}
            }
        }

        // The hour-long cycle is still pending; shortening the interval
        // must supersede it and reschedule from now.
        writeln!(file, "{{\"n\":2}}").unwrap();
        file.flush().unwrap();
        commands
            .send(SyncCommand::SetInterval(Duration::from_millis(50)))
            .await
            .unwrap();

        loop {
            match rx.recv().await.unwrap() {
                SyncEvent::Loaded {
                    kind,
                    records,
                    total_lines,
                    ..
                } => {
                    assert_eq!(kind, RefreshKind::Automatic);
                    assert_eq!(records.len(), 1);
                    assert_eq!(records[0]["n"], 2);
                    assert_eq!(total_lines, 2);
                    break;
                }
                SyncEvent::Failed { message, .. } => panic!("refresh failed: {message}"),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn failure_for_one_file_does_not_stop_manual_refresh() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        writeln!(good, "{{\"n\":1}}").unwrap();
        good.flush().unwrap();
        let missing = PathBuf::from("/nonexistent/tablog-test.jsonl");

        let (tx, mut rx) = mpsc::channel(DEFAULT_EVENT_BUFFER);
        let files = vec![missing.clone(), good.path().to_path_buf()];
        let _commands = spawn(files, Duration::from_secs(3600), tx);

        let mut failed = false;
        let mut loaded = false;
        while !(failed && loaded) {
            match rx.recv().await.unwrap() {
                SyncEvent::Failed { path, .. } => {
                    assert_eq!(path, missing);
                    failed = true;
                }
                SyncEvent::Loaded { records, .. } => {
                    assert_eq!(records.len(), 1);
                    loaded = true;
                }
                _ => {}
            }
        }
    }
}
