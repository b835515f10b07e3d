//! Tokio driver for [`SchedulingEngine`].
//!
//! One task owns the engine. It multiplexes a command channel and a
//! 1-second interval with a biased `select!`, so a command that arrives in
//! the same quantum as a tick is applied first (a stop beats the tick that
//! would have completed the session). Missed ticks are delivered in a burst,
//! never skipped.
//!
//! Every operation goes through the driver while it runs, so it is the only
//! writer of the settings store. Store I/O never runs on the driver task: the
//! engine's persistence is handed to a worker that executes queued jobs one
//! at a time on the blocking pool. A failed authoritative write comes back
//! as [`Event::StoreWriteFailed`]; a reload is answered once the worker has
//! read the store.
//!
//! Dropping every [`RuntimeHandle`] ends the loop; the override window and
//! any live session are closed and queued writes are flushed on the way out.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::blocker::{BlockerSettings, OverrideWindow};
use crate::engine::{
    BlockerOp, Committed, EngineSnapshot, ReminderOp, SchedulingEngine, SettingsSources,
};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::reminders::ReminderSettings;
use crate::storage::{LoadedSettings, Persistence, StoreJob};
use crate::timer::{FocusSession, FocusSettings, SessionType};

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<Result<T>>;

pub enum Command {
    /// `None` starts the type implied by the previous session.
    StartSession {
        session_type: Option<SessionType>,
        reply: Reply<FocusSession>,
    },
    PauseSession {
        reply: Reply<FocusSession>,
    },
    ResumeSession {
        reply: Reply<FocusSession>,
    },
    TogglePause {
        reply: Reply<FocusSession>,
    },
    StopSession {
        reply: Reply<FocusSession>,
    },
    SaveFocusSettings {
        settings: FocusSettings,
        reply: Reply<Committed<FocusSettings>>,
    },
    RequestOverride {
        duration_secs: u32,
        reply: Reply<OverrideWindow>,
    },
    EndOverride {
        reply: Reply<OverrideWindow>,
    },
    Blocker {
        op: BlockerOp,
        reply: Reply<Committed<BlockerSettings>>,
    },
    CheckUrl {
        url: String,
        reply: Reply<bool>,
    },
    Reminder {
        op: ReminderOp,
        reply: Reply<Committed<ReminderSettings>>,
    },
    ReloadSettings {
        reply: Reply<SettingsSources>,
    },
    Snapshot {
        reply: Reply<EngineSnapshot>,
    },
}

enum WorkerJob {
    Store(StoreJob),
    Reload(Reply<SettingsSources>),
}

enum WorkerDone {
    Failed(CoreError),
    Loaded(Box<LoadedSettings>, Reply<SettingsSources>),
}

/// Store side of the driver. Without a worker, jobs are dropped.
struct StoreLink {
    jobs: Option<mpsc::UnboundedSender<WorkerJob>>,
}

impl StoreLink {
    fn submit(&self, job: WorkerJob) {
        let Some(jobs) = &self.jobs else {
            match job {
                WorkerJob::Store(_) => warn!("no store worker, write dropped"),
                WorkerJob::Reload(reply) => {
                    let _ = reply.send(Err(CoreError::RuntimeStopped));
                }
            }
            return;
        };
        if jobs.send(job).is_err() {
            error!("store worker stopped, job dropped");
        }
    }

    fn flush(&self, engine: &mut SchedulingEngine) {
        for job in engine.drain_store_jobs() {
            self.submit(WorkerJob::Store(job));
        }
    }
}

/// Apply `command`. Reloads are forwarded to the store worker.
fn apply(engine: &mut SchedulingEngine, store: &StoreLink, command: Command) {
    // A dropped reply receiver only means the caller stopped waiting.
    match command {
        Command::StartSession {
            session_type,
            reply,
        } => {
            let result = match session_type {
                Some(session_type) => engine.start_session(session_type),
                None => engine.start_next_session(),
            };
            let _ = reply.send(result);
        }
        Command::PauseSession { reply } => {
            let _ = reply.send(engine.pause_session());
        }
        Command::ResumeSession { reply } => {
            let _ = reply.send(engine.resume_session());
        }
        Command::TogglePause { reply } => {
            let _ = reply.send(engine.toggle_pause());
        }
        Command::StopSession { reply } => {
            let _ = reply.send(Ok(engine.stop_session()));
        }
        Command::SaveFocusSettings { settings, reply } => {
            let _ = reply.send(engine.save_focus_settings(settings));
        }
        Command::RequestOverride {
            duration_secs,
            reply,
        } => {
            let _ = reply.send(engine.request_override(duration_secs));
        }
        Command::EndOverride { reply } => {
            let _ = reply.send(Ok(engine.end_override()));
        }
        Command::Blocker { op, reply } => {
            let _ = reply.send(engine.apply_blocker_op(op));
        }
        Command::CheckUrl { url, reply } => {
            let _ = reply.send(Ok(engine.is_url_blocked(&url)));
        }
        Command::Reminder { op, reply } => {
            let _ = reply.send(engine.apply_reminder_op(op));
        }
        Command::ReloadSettings { reply } => {
            // Queued writes are ahead of the read, so it sees them.
            store.flush(engine);
            store.submit(WorkerJob::Reload(reply));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(Ok(engine.snapshot()));
        }
    }
}

fn complete(engine: &mut SchedulingEngine, done: WorkerDone) {
    match done {
        WorkerDone::Failed(e) => engine.record_store_failure(e),
        WorkerDone::Loaded(loaded, reply) => {
            let _ = reply.send(Ok(engine.apply_settings(*loaded)));
        }
    }
}

/// Run queued jobs in order on the blocking pool. Returns the persistence
/// once the job channel closes.
async fn store_worker(
    mut persistence: Persistence,
    mut jobs: mpsc::UnboundedReceiver<WorkerJob>,
    done: mpsc::UnboundedSender<WorkerDone>,
) -> Option<Persistence> {
    while let Some(job) = jobs.recv().await {
        let outcome = tokio::task::spawn_blocking(move || {
            let result = match job {
                WorkerJob::Store(job) => persistence.run(job).err().map(WorkerDone::Failed),
                WorkerJob::Reload(reply) => Some(WorkerDone::Loaded(
                    Box::new(persistence.load_all()),
                    reply,
                )),
            };
            (persistence, result)
        })
        .await;

        match outcome {
            Ok((returned, result)) => {
                persistence = returned;
                if let Some(result) = result {
                    // The driver may already be gone during the final flush.
                    let _ = done.send(result);
                }
            }
            Err(e) => {
                error!(error = %e, "store job panicked, persistence lost");
                return None;
            }
        }
    }
    Some(persistence)
}

/// Cloneable sender side of the driver.
#[derive(Clone)]
pub struct RuntimeHandle {
    tx: mpsc::Sender<Command>,
}

impl RuntimeHandle {
    async fn call<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| CoreError::RuntimeStopped)?;
        rx.await.map_err(|_| CoreError::RuntimeStopped)?
    }

    pub async fn start_session(&self, session_type: Option<SessionType>) -> Result<FocusSession> {
        self.call(|reply| Command::StartSession {
            session_type,
            reply,
        })
        .await
    }

    pub async fn pause_session(&self) -> Result<FocusSession> {
        self.call(|reply| Command::PauseSession { reply }).await
    }

    pub async fn resume_session(&self) -> Result<FocusSession> {
        self.call(|reply| Command::ResumeSession { reply }).await
    }

    pub async fn toggle_pause(&self) -> Result<FocusSession> {
        self.call(|reply| Command::TogglePause { reply }).await
    }

    pub async fn stop_session(&self) -> Result<FocusSession> {
        self.call(|reply| Command::StopSession { reply }).await
    }

    pub async fn save_focus_settings(
        &self,
        settings: FocusSettings,
    ) -> Result<Committed<FocusSettings>> {
        self.call(|reply| Command::SaveFocusSettings { settings, reply })
            .await
    }

    pub async fn request_override(&self, duration_secs: u32) -> Result<OverrideWindow> {
        self.call(|reply| Command::RequestOverride {
            duration_secs,
            reply,
        })
        .await
    }

    pub async fn end_override(&self) -> Result<OverrideWindow> {
        self.call(|reply| Command::EndOverride { reply }).await
    }

    pub async fn blocker(&self, op: BlockerOp) -> Result<Committed<BlockerSettings>> {
        self.call(|reply| Command::Blocker { op, reply }).await
    }

    pub async fn is_url_blocked(&self, url: impl Into<String>) -> Result<bool> {
        let url = url.into();
        self.call(|reply| Command::CheckUrl { url, reply }).await
    }

    pub async fn reminder(&self, op: ReminderOp) -> Result<Committed<ReminderSettings>> {
        self.call(|reply| Command::Reminder { op, reply }).await
    }

    pub async fn reload_settings(&self) -> Result<SettingsSources> {
        self.call(|reply| Command::ReloadSettings { reply }).await
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot> {
        self.call(|reply| Command::Snapshot { reply }).await
    }
}

fn forward(events: &mpsc::UnboundedSender<Event>, batch: Vec<Event>) {
    for event in batch {
        // No listener is fine; the engine keeps running.
        let _ = events.send(event);
    }
}

/// Run the engine until the command channel closes, then return it with
/// persistence reattached.
pub async fn drive(
    mut engine: SchedulingEngine,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<Event>,
    tick_period: Duration,
) -> SchedulingEngine {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let (store, worker) = match engine.detach_persistence() {
        Some(persistence) => {
            let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
            let worker = tokio::spawn(store_worker(persistence, jobs_rx, done_tx));
            (StoreLink { jobs: Some(jobs_tx) }, Some(worker))
        }
        None => {
            warn!("engine has no persistence, writes will be dropped");
            (StoreLink { jobs: None }, None)
        }
    };

    let mut ticker = time::interval_at(Instant::now() + tick_period, tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    info!(period_ms = tick_period.as_millis() as u64, "scheduling driver started");

    loop {
        tokio::select! {
            biased;
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("command channel closed");
                    break;
                };
                apply(&mut engine, &store, command);
            }
            Some(done) = done_rx.recv() => {
                complete(&mut engine, done);
            }
            _ = ticker.tick() => {
                let batch = engine.tick();
                forward(&events, batch);
            }
        }
        store.flush(&mut engine);
        forward(&events, engine.drain_events());
    }

    let batch = engine.shutdown();
    forward(&events, batch);
    store.flush(&mut engine);
    drop(store);

    if let Some(worker) = worker {
        match worker.await {
            Ok(Some(persistence)) => engine.attach_persistence(persistence),
            Ok(None) => {}
            Err(e) => error!(error = %e, "store worker failed"),
        }
    }
    while let Ok(done) = done_rx.try_recv() {
        complete(&mut engine, done);
    }
    forward(&events, engine.drain_events());

    info!("scheduling driver stopped");
    engine
}

/// Spawn [`drive`] on the current runtime.
pub fn spawn(
    engine: SchedulingEngine,
    tick_period: Duration,
) -> (
    RuntimeHandle,
    mpsc::UnboundedReceiver<Event>,
    JoinHandle<SchedulingEngine>,
) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(drive(engine, rx, event_tx, tick_period));
    (RuntimeHandle { tx }, event_rx, task)
}
