use std::sync::Arc;

use crate::assignment::{AssignmentScheduler, AssignmentWorker};
use crate::auth::JwtService;
use crate::core::event_router::EventRouter;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::ledger::{LedgerEngine, LedgerWorker};
use crate::notify::{LogNotifier, NotificationWorker, Notifier, PushGatewayNotifier};
use crate::orders::OrdersManager;
use crate::reaper::StuckOrderReaper;
use crate::reconciliation::RemittanceService;
use crate::storage::MarketStorage;

/// Channel sizes for the event router
const CRITICAL_EVENT_BUFFER: usize = 1024;
const NOTIFY_EVENT_BUFFER: usize = 256;

/// Shared service handles
///
/// Cheap to clone: every field is an `Arc` or wraps one.
///
/// | Field | Role |
/// |-------|------|
/// | config | Immutable configuration |
/// | storage | redb document store |
/// | orders | Order lifecycle and event source |
/// | ledger | Seller balances and payouts |
/// | assignment | Shipper offers and registry |
/// | remittances | Shipper COD reconciliation |
/// | notifier | Outbound push |
/// | jwt_service | Token validation |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub storage: MarketStorage,
    pub orders: Arc<OrdersManager>,
    pub ledger: LedgerEngine,
    pub assignment: Arc<AssignmentScheduler>,
    pub remittances: RemittanceService,
    pub notifier: Arc<dyn Notifier>,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// Wire every service on top of an opened store
    pub fn new(config: Config, storage: MarketStorage, notifier: Arc<dyn Notifier>) -> Self {
        let ledger = LedgerEngine::new(storage.clone());
        let orders = Arc::new(OrdersManager::new(
            storage.clone(),
            ledger.clone(),
            config.timezone,
        ));
        let assignment = Arc::new(AssignmentScheduler::new(
            storage.clone(),
            notifier.clone(),
            &config.fulfillment,
        ));
        let remittances = RemittanceService::new(storage.clone(), config.timezone);
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Self {
            config,
            storage,
            orders,
            ledger,
            assignment,
            remittances,
            notifier,
            jwt_service,
        }
    }

    /// Open the database under the work dir and pick the notifier
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let db_path = config.database_path();
        let storage = MarketStorage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database opened");

        let notifier: Arc<dyn Notifier> = match &config.push_gateway_url {
            Some(url) => {
                tracing::info!(url = %url, "Push gateway notifier enabled");
                Arc::new(
                    PushGatewayNotifier::new(url.clone())
                        .map_err(|e| crate::core::ServerError::Config(e.to_string()))?,
                )
            }
            None => {
                tracing::warn!("PUSH_GATEWAY_URL not set, notifications are only logged");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::new(config.clone(), storage, notifier))
    }

    /// Spawn the event router, workers and reaper
    ///
    /// The returned registry owns the shutdown token; call
    /// [`BackgroundTasks::shutdown`] to stop them.
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        let fulfillment = &self.config.fulfillment;

        let (router, channels) = EventRouter::new(CRITICAL_EVENT_BUFFER, NOTIFY_EVENT_BUFFER);
        let source = self.orders.subscribe();
        tasks.spawn("event_router", TaskKind::Listener, router.run(source, token.clone()));

        let ledger_worker = LedgerWorker::new(
            self.storage.clone(),
            self.ledger.clone(),
            fulfillment.ledger_retry_scan,
        );
        tasks.spawn(
            "ledger_worker",
            TaskKind::Worker,
            ledger_worker.run(channels.ledger_rx, token.clone()),
        );

        let assignment_worker =
            AssignmentWorker::new(self.assignment.clone(), fulfillment.assignment_tick);
        tasks.spawn(
            "assignment_worker",
            TaskKind::Worker,
            assignment_worker.run(channels.assignment_rx, token.clone()),
        );

        let notification_worker = NotificationWorker::new(self.notifier.clone());
        tasks.spawn(
            "notification_worker",
            TaskKind::Worker,
            notification_worker.run(channels.notify_rx, token.clone()),
        );

        let reaper = StuckOrderReaper::new(
            self.orders.clone(),
            self.assignment.clone(),
            self.notifier.clone(),
            fulfillment.reaper_grace,
            fulfillment.reaper_interval,
        );
        tasks.spawn("stuck_order_reaper", TaskKind::Periodic, reaper.run(token));

        tasks.log_summary();
        tasks
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
