// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Process control surface: at most one running rig session at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;
use trx_core::rig::controller::{DaemonError, DaemonOptions, RigEventEmitter, RigSession, ScheduleMode};
use trx_core::RigStore;

use crate::{ExtraConfig, RegistrationContext, RigAccess};

/// Parameters of one `start` call.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub model: String,
    pub access: RigAccess,
    pub extra: ExtraConfig,
    /// Overrides the configured base delay.
    pub cycle_delay_ms: Option<u64>,
    pub use_callback_mode: bool,
}

impl StartRequest {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            access: RigAccess::None,
            extra: ExtraConfig::new(),
            cycle_delay_ms: None,
            use_callback_mode: false,
        }
    }

    pub fn with_access(mut self, access: RigAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_cycle_delay_ms(mut self, ms: u64) -> Self {
        self.cycle_delay_ms = Some(ms);
        self
    }

    pub fn with_callback_mode(mut self, enabled: bool) -> Self {
        self.use_callback_mode = enabled;
        self
    }
}

pub struct RigDaemon {
    registry: RegistrationContext,
    defaults: DaemonOptions,
    session: Mutex<Option<RigSession>>,
}

impl RigDaemon {
    pub fn new(registry: RegistrationContext, defaults: DaemonOptions) -> Self {
        Self {
            registry,
            defaults,
            session: Mutex::new(None),
        }
    }

    /// Open the rig, probe it and start cycling. Returns the session's
    /// state store for clients.
    pub async fn start(
        &self,
        request: StartRequest,
        events: RigEventEmitter,
    ) -> Result<Arc<RigStore>, DaemonError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(DaemonError::AlreadyRunning);
        }

        let mut options = self.defaults.clone();
        if let Some(ms) = request.cycle_delay_ms {
            options.cycle_delay = Duration::from_millis(ms);
        }
        if request.use_callback_mode {
            options.mode = ScheduleMode::Callback;
        }

        info!("Opening {} ({:?})", request.model, request.access);
        let driver = self
            .registry
            .open(&request.model, request.access, &request.extra)
            .map_err(|e| DaemonError::Open(e.to_string()))?;
        let started = RigSession::start(driver, options, events).await?;
        let store = started.store();
        *session = Some(started);
        Ok(store)
    }

    /// Stop the running session. The slot stays locked until the driver
    /// is closed, so a concurrent `start` cannot open a second link.
    pub async fn stop(&self) -> Result<(), DaemonError> {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(running) => running.stop().await,
            None => Err(DaemonError::NotRunning),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn store(&self) -> Option<Arc<RigStore>> {
        self.session.lock().await.as_ref().map(RigSession::store)
    }

    pub async fn set_suspended(&self, suspended: bool) -> Result<(), DaemonError> {
        match self.session.lock().await.as_ref() {
            Some(session) => {
                session.set_suspended(suspended);
                Ok(())
            }
            None => Err(DaemonError::NotRunning),
        }
    }

    pub async fn is_suspended(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .is_some_and(RigSession::is_suspended)
    }

    /// Base delay of the running session, or the configured default.
    pub async fn cycle_delay_ms(&self) -> u64 {
        let delay = match self.session.lock().await.as_ref() {
            Some(session) => session.cycle_delay(),
            None => self.defaults.cycle_delay,
        };
        delay.as_millis() as u64
    }
}
