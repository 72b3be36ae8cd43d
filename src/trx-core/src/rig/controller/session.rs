// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! One open-probe-poll-close lifecycle of a rig.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::rig::store::{RigStore, StoreError};
use crate::rig::{RigDriver, RigInfo};

use super::anomaly::{AnomalyManager, AnomalyStats};
use super::cycle::CycleProfile;
use super::events::RigEventEmitter;
use super::executor::CommandExecutor;
use super::policies::{AnomalyPolicy, MirrorPolicy};
use super::prober::probe;
use super::scheduler::{CycleScheduler, TickOutcome};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to open rig: {0}")]
    Open(String),
    #[error("failed to start rig daemon: {0}")]
    Start(String),
    #[error("cycle scheduler did not stop within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("rig daemon is already running")]
    AlreadyRunning,
    #[error("rig daemon is not running")]
    NotRunning,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How cycle steps are driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// A dedicated task loops and sleeps between steps.
    #[default]
    Worker,
    /// A periodic timer invokes [`CycleScheduler::tick`]; overlapping
    /// invocations are dropped.
    Callback,
}

#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Base pause between RX commands.
    pub cycle_delay: Duration,
    /// Bound on waiting for the scheduler to exit on stop.
    pub stop_timeout: Duration,
    pub mode: ScheduleMode,
    pub profile: CycleProfile,
    pub anomaly: AnomalyPolicy,
    pub mirror: MirrorPolicy,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            cycle_delay: Duration::from_millis(50),
            stop_timeout: Duration::from_secs(2),
            mode: ScheduleMode::Worker,
            profile: CycleProfile::default_rig(),
            anomaly: AnomalyPolicy::default_rig(),
            mirror: MirrorPolicy::Always,
        }
    }
}

/// A running daemon bound to one open driver.
///
/// Must be ended with [`RigSession::stop`], which joins the scheduler
/// before the link is closed.
pub struct RigSession {
    info: RigInfo,
    store: Arc<RigStore>,
    anomalies: Arc<AnomalyManager>,
    scheduler: Arc<CycleScheduler>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    mode: ScheduleMode,
    stop_timeout: Duration,
}

impl RigSession {
    /// Probe the driver and start cycling.
    ///
    /// On error the driver has already been closed.
    pub async fn start(
        mut driver: Box<dyn RigDriver>,
        options: DaemonOptions,
        events: RigEventEmitter,
    ) -> Result<Self, DaemonError> {
        if let Err(e) = check_options(&options) {
            close_quietly(driver.as_mut()).await;
            return Err(DaemonError::Start(e));
        }

        let info = driver.info().clone();
        let report = probe(driver.as_mut()).await;
        let store = Arc::new(RigStore::new());
        if let Err(e) = store.install_probe(report.capabilities, report.acquired) {
            close_quietly(driver.as_mut()).await;
            return Err(e.into());
        }

        let anomalies = Arc::new(AnomalyManager::new(options.anomaly));
        let events = Arc::new(events);
        for (command, reason) in &report.defects {
            if anomalies.report_defect(*command, reason) {
                events.notify_defect(*command, reason);
            }
        }

        let caps = driver.capabilities().clone();
        let executor = CommandExecutor::new(
            store.clone(),
            anomalies.clone(),
            events,
            caps,
            options.mirror,
        );
        let scheduler = Arc::new(CycleScheduler::new(
            driver,
            executor,
            options.profile,
            options.cycle_delay,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = match options.mode {
            ScheduleMode::Worker => tokio::spawn(scheduler.clone().run(shutdown_rx)),
            ScheduleMode::Callback => tokio::spawn(drive_ticks(scheduler.clone(), shutdown_rx)),
        };
        info!(
            "Rig daemon started for {} {} ({:?} mode, {:?} base delay)",
            info.manufacturer, info.model, options.mode, options.cycle_delay
        );

        Ok(Self {
            info,
            store,
            anomalies,
            scheduler,
            shutdown_tx,
            task: Some(task),
            mode: options.mode,
            stop_timeout: options.stop_timeout,
        })
    }

    pub fn info(&self) -> &RigInfo {
        &self.info
    }

    pub fn store(&self) -> Arc<RigStore> {
        self.store.clone()
    }

    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.scheduler.set_suspended(suspended);
    }

    pub fn is_suspended(&self) -> bool {
        self.scheduler.is_suspended()
    }

    pub fn cycle_delay(&self) -> Duration {
        self.scheduler.cycle_delay()
    }

    /// Drive one cooperative step from an external callback.
    pub async fn tick(&self) -> TickOutcome {
        self.scheduler.tick().await
    }

    pub fn anomaly_stats(&self) -> Vec<AnomalyStats> {
        self.anomalies.stats()
    }

    pub fn defects(&self) -> Vec<(String, u64)> {
        self.anomalies.defects()
    }

    /// Signal the scheduler, wait for it to exit, then close the link.
    ///
    /// If the scheduler does not exit within the stop timeout it is
    /// aborted and [`DaemonError::ShutdownTimeout`] is returned; the link
    /// is still closed.
    pub async fn stop(mut self) -> Result<(), DaemonError> {
        let _ = self.shutdown_tx.send(true);
        let mut result = Ok(());
        if let Some(mut task) = self.task.take() {
            match time::timeout(self.stop_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Cycle scheduler task failed: {}", e),
                Err(_) => {
                    error!(
                        "Cycle scheduler did not stop within {:?}; aborting it",
                        self.stop_timeout
                    );
                    task.abort();
                    let _ = task.await;
                    result = Err(DaemonError::ShutdownTimeout(self.stop_timeout));
                }
            }
        }
        if let Err(e) = self.scheduler.close_driver().await {
            warn!("Closing {} failed: {}", self.info.model, e);
        }
        info!("Rig daemon stopped");
        result
    }
}

impl Drop for RigSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!("Rig session dropped while running; aborting scheduler");
            let _ = self.shutdown_tx.send(true);
            task.abort();
        }
    }
}

fn check_options(options: &DaemonOptions) -> Result<(), String> {
    if options.cycle_delay.is_zero() {
        return Err("cycle delay must be greater than zero".to_string());
    }
    options.profile.validate()
}

async fn close_quietly(driver: &mut dyn RigDriver) {
    if let Err(e) = driver.close().await {
        warn!("Closing rig after failed start: {}", e);
    }
}

/// Timer standing in for the host's periodic callback. Each period spawns
/// a tick, so a slow step makes the next one collide with it.
async fn drive_ticks(scheduler: Arc<CycleScheduler>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = time::interval(scheduler.cycle_delay());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = JoinSet::new();
    info!("Callback scheduler started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {
                while ticks.try_join_next().is_some() {}
                let scheduler = scheduler.clone();
                ticks.spawn(async move { scheduler.tick().await });
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    while ticks.join_next().await.is_some() {}
    info!("Callback scheduler stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::radio::freq::Freq;
    use crate::rig::command::RigCommand;
    use crate::rig::controller::cycle::CycleStep;
    use crate::rig::controller::events::RigListener;
    use crate::rig::controller::mock::MockDriver;
    use crate::rig::param::{ParamValue, Parameter};
    use crate::rig::state::CapabilityKind;

    const PARAMS: &[Parameter] = &[
        Parameter::Frequency,
        Parameter::Mode,
        Parameter::Ptt,
        Parameter::Strength,
    ];

    fn options(mode: ScheduleMode) -> DaemonOptions {
        DaemonOptions {
            mode,
            cycle_delay: Duration::from_millis(10),
            stop_timeout: Duration::from_millis(100),
            ..DaemonOptions::default()
        }
    }

    #[derive(Default)]
    struct Defects(AtomicUsize);

    impl RigListener for Defects {
        fn on_defect(&self, _command: Option<RigCommand>, _reason: &str) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_applies_commanded_value() {
        let (driver, handle) = MockDriver::new(PARAMS, PARAMS);
        let session = RigSession::start(
            Box::new(driver),
            options(ScheduleMode::Worker),
            RigEventEmitter::new(),
        )
        .await
        .unwrap();

        let store = session.store();
        assert!(store.is_probed());
        let target = ParamValue::Freq(Freq::new(7_030_000));
        store
            .set_commanded(Parameter::Frequency, target.clone())
            .unwrap();

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.value(Parameter::Frequency), Some(target.clone()));
        assert_eq!(store.get_acquired(Parameter::Frequency), target);
        assert!(!store.is_dirty(Parameter::Frequency));

        session.stop().await.unwrap();
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspended_session_is_quiet() {
        let (driver, handle) = MockDriver::new(PARAMS, PARAMS);
        let session = RigSession::start(
            Box::new(driver),
            options(ScheduleMode::Worker),
            RigEventEmitter::new(),
        )
        .await
        .unwrap();
        session.set_suspended(true);
        time::sleep(Duration::from_millis(50)).await;
        handle.clear_calls();

        time::sleep(Duration::from_secs(1)).await;
        assert!(handle.calls().is_empty());
        assert!(session.is_suspended());
        assert_eq!(session.cycle_delay(), Duration::from_millis(10));

        session.set_suspended(false);
        time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.calls().is_empty());
        session.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_worker_reports_shutdown_timeout() {
        let (driver, handle) = MockDriver::new(PARAMS, PARAMS);
        let session = RigSession::start(
            Box::new(driver),
            options(ScheduleMode::Worker),
            RigEventEmitter::new(),
        )
        .await
        .unwrap();
        handle.hang_forever();
        time::sleep(Duration::from_millis(100)).await;

        let err = session.stop().await.unwrap_err();
        assert!(matches!(err, DaemonError::ShutdownTimeout(_)));
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_mode_polls() {
        let (driver, handle) = MockDriver::new(PARAMS, PARAMS);
        let session = RigSession::start(
            Box::new(driver),
            options(ScheduleMode::Callback),
            RigEventEmitter::new(),
        )
        .await
        .unwrap();
        assert_eq!(session.mode(), ScheduleMode::Callback);
        handle.clear_calls();

        time::sleep(Duration::from_millis(500)).await;
        assert!(handle.calls().contains(&RigCommand::Get(Parameter::Strength)));
        session.stop().await.unwrap();
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_invalid_profile_fails_start() {
        let (driver, handle) = MockDriver::new(PARAMS, PARAMS);
        let mut opts = options(ScheduleMode::Worker);
        opts.profile.tx = vec![CycleStep::once(RigCommand::Get(Parameter::Strength))];

        let result = RigSession::start(Box::new(driver), opts, RigEventEmitter::new()).await;
        assert!(matches!(result, Err(DaemonError::Start(_))));
        assert!(handle.is_closed());
        assert!(handle.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_defects_reach_listeners() {
        let (driver, _handle) = MockDriver::new(&[Parameter::Ptt], &[Parameter::Ptt, Parameter::Swr]);
        let listener = Arc::new(Defects::default());
        let mut events = RigEventEmitter::new();
        events.register(listener.clone());

        let session = RigSession::start(Box::new(driver), options(ScheduleMode::Worker), events)
            .await
            .unwrap();
        assert_eq!(listener.0.load(Ordering::Relaxed), 1);
        assert_eq!(session.defects().len(), 1);
        session.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_revocation_reaches_capability_watchers() {
        let (driver, handle) = MockDriver::new(PARAMS, PARAMS);
        let mut opts = options(ScheduleMode::Worker);
        opts.anomaly = AnomalyPolicy::new(Duration::from_secs(60), 2);
        let session = RigSession::start(Box::new(driver), opts, RigEventEmitter::new())
            .await
            .unwrap();
        let store = session.store();
        let mut caps = store.subscribe_capabilities();
        let _ = caps.borrow_and_update();
        handle.fail_get(Parameter::Strength);

        caps.changed().await.unwrap();
        assert!(!store.has_capability(CapabilityKind::Read, Parameter::Strength));
        assert!(store.has_capability(CapabilityKind::Read, Parameter::Frequency));
        let stats = session.anomaly_stats();
        assert!(stats
            .iter()
            .any(|s| s.command == RigCommand::Get(Parameter::Strength) && s.disabled));
        session.stop().await.unwrap();
    }
}
