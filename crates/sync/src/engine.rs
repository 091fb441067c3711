//! Wires the store, the feature modules and the background tasks together.
//!
//! [`Engine::start`] spawns the dashboard poll, the timer ticker and, when
//! a partner is linked, the socket channel with its dispatcher. All of
//! them hang off one master [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use duotrack_client::{Backend, ClientConfig};
use duotrack_core::dates;
use duotrack_core::user::User;
use duotrack_realtime::reconnect::ReconnectConfig;
use duotrack_realtime::{JoinIdentity, RealtimeClient, RealtimeHandle};

use crate::context::SyncContext;
use crate::dashboard::DashboardSync;
use crate::dispatch::run_dispatcher;
use crate::error::SyncError;
use crate::goals::CommonGoals;
use crate::notice::Notifier;
use crate::partner::PartnerLink;
use crate::presence::{TypingNotifier, STOP_TYPING_DEBOUNCE, TYPING_EXPIRY};
use crate::session::Session;
use crate::store::{AppState, Store};
use crate::tasks::TaskPanel;
use crate::timer::WorkTimer;

/// How long [`Engine::shutdown`] waits for each background task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub poll_interval: Duration,
    pub ws_url: String,
    pub reconnect: ReconnectConfig,
    pub typing_expiry: Duration,
    pub stop_typing_debounce: Duration,
}

impl EngineConfig {
    pub fn from_client(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            ws_url: config.ws_url.clone(),
            reconnect: ReconnectConfig::default(),
            typing_expiry: TYPING_EXPIRY,
            stop_typing_debounce: STOP_TYPING_DEBOUNCE,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_client(&ClientConfig::default())
    }
}

pub struct Engine {
    ctx: SyncContext,
    session: Session,
    dashboard: DashboardSync,
    tasks: TaskPanel,
    goals: CommonGoals,
    partner: PartnerLink,
    timer: WorkTimer,
    typing: Option<TypingNotifier>,
    realtime: Option<RealtimeHandle>,
    cancel: CancellationToken,
    task_handles: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Start syncing for `user` with a fresh [`Notifier`].
    pub fn start(config: EngineConfig, backend: Arc<dyn Backend>, user: User) -> Self {
        Self::start_with(config, backend, Notifier::default(), user)
    }

    /// Start syncing for `user`, publishing on an existing `notices`
    /// channel so subscribers see notices from the very first fetch.
    pub fn start_with(
        config: EngineConfig,
        backend: Arc<dyn Backend>,
        notices: Notifier,
        user: User,
    ) -> Self {
        let store = Arc::new(Store::new(AppState::new(Some(user.clone()), dates::today())));
        let ctx = SyncContext::new(Arc::clone(&backend), store, notices.clone());
        let cancel = CancellationToken::new();
        let mut task_handles = Vec::new();

        let partner_id = user.partner_id.clone().filter(|id| !id.is_empty());
        let (realtime, typing) = match partner_id {
            Some(partner_id) => {
                let identity = JoinIdentity {
                    user_id: user.id.clone(),
                    partner_id: Some(partner_id.clone()),
                };
                let (handle, events) = RealtimeHandle::spawn(
                    RealtimeClient::new(config.ws_url.clone()),
                    identity,
                    config.reconnect.clone(),
                    cancel.child_token(),
                );

                let store = Arc::clone(&ctx.store);
                let dispatcher_cancel = cancel.child_token();
                let expiry = config.typing_expiry;
                let dispatcher_partner = partner_id.clone();
                task_handles.push(tokio::spawn(async move {
                    run_dispatcher(events, &store, dispatcher_partner, expiry, dispatcher_cancel)
                        .await;
                }));

                let typing = TypingNotifier::spawn(
                    handle.sender(),
                    partner_id,
                    config.stop_typing_debounce,
                    cancel.child_token(),
                );
                (Some(handle), Some(typing))
            }
            None => {
                tracing::info!("No partner linked, socket channel not started");
                (None, None)
            }
        };

        let dashboard = DashboardSync::new(ctx.clone());
        let timer = WorkTimer::new(ctx.clone(), realtime.as_ref().map(|r| r.sender()));

        let poll = dashboard.clone();
        let poll_cancel = cancel.child_token();
        let poll_interval = config.poll_interval;
        task_handles.push(tokio::spawn(async move {
            poll.run(poll_interval, poll_cancel).await;
        }));

        let ticker = timer.clone();
        let ticker_cancel = cancel.child_token();
        task_handles.push(tokio::spawn(async move {
            ticker.run_ticker(ticker_cancel).await;
        }));

        let loader = timer.clone();
        let loader_cancel = cancel.child_token();
        task_handles.push(tokio::spawn(async move {
            loader.follow_selected_date(loader_cancel).await;
        }));

        tracing::info!(user_id = %user.id, "Engine started");

        Self {
            session: Session::new(backend, notices),
            tasks: TaskPanel::new(ctx.clone(), dashboard.clone()),
            goals: CommonGoals::new(ctx.clone(), dashboard.clone()),
            partner: PartnerLink::new(ctx.clone(), dashboard.clone()),
            dashboard,
            timer,
            typing,
            realtime,
            cancel,
            task_handles,
            ctx,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.ctx.store
    }

    pub fn notices(&self) -> &Notifier {
        &self.ctx.notices
    }

    pub fn dashboard(&self) -> &DashboardSync {
        &self.dashboard
    }

    pub fn tasks(&self) -> &TaskPanel {
        &self.tasks
    }

    pub fn goals(&self) -> &CommonGoals {
        &self.goals
    }

    pub fn partner(&self) -> &PartnerLink {
        &self.partner
    }

    pub fn timer(&self) -> &WorkTimer {
        &self.timer
    }

    /// Outbound typing notifications; `None` without a partner channel.
    pub fn typing(&self) -> Option<&TypingNotifier> {
        self.typing.as_ref()
    }

    /// Sign out, reset the state and stop every background task.
    pub async fn sign_out(self) -> Result<(), SyncError> {
        let result = self.session.logout(&self.ctx.store).await;
        self.shutdown().await;
        result
    }

    /// Cancel every background task and wait for them to exit.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down engine");
        self.cancel.cancel();

        for handle in self.task_handles {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("Background task did not stop within timeout");
            }
        }
        if let Some(realtime) = self.realtime {
            realtime.shutdown().await;
        }

        tracing::info!("Engine shut down complete");
    }
}
