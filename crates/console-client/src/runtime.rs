use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use manus_console_core::{
    Command, ConsoleConfig, ConsoleController, ConsoleView, Effect, PlannedRequest, RequestOutcome,
    RequestTicket,
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::lifecycle::{CancelHandle, execute};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("console runtime has shut down")]
pub struct RuntimeClosed;

#[derive(Debug)]
enum Control {
    Command(Command),
    Shutdown,
}

#[derive(Debug)]
enum Internal {
    Completed {
        ticket: RequestTicket,
        outcome: RequestOutcome<Value>,
    },
    FollowUpDue,
}

/// Cloneable front door to a running [`ConsoleRuntime`].
#[derive(Debug, Clone)]
pub struct ConsoleHandle {
    control: mpsc::UnboundedSender<Control>,
    view: watch::Receiver<ConsoleView>,
}

impl ConsoleHandle {
    pub fn send(&self, command: Command) -> Result<(), RuntimeClosed> {
        self.control
            .send(Control::Command(command))
            .map_err(|_| RuntimeClosed)
    }

    /// Stops the loop and cancels every outstanding request.
    pub fn shutdown(&self) -> Result<(), RuntimeClosed> {
        self.control.send(Control::Shutdown).map_err(|_| RuntimeClosed)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConsoleView> {
        self.view.clone()
    }

    #[must_use]
    pub fn view(&self) -> ConsoleView {
        self.view.borrow().clone()
    }
}

/// Single-task driver for [`ConsoleController`].
///
/// All controller state is touched only from [`ConsoleRuntime::run`].
/// Requests run on spawned tasks and come back as completions on an
/// internal channel, so they may resolve in any order. The poll ticker
/// skips missed ticks instead of bursting after a stall.
pub struct ConsoleRuntime<T: Transport + ?Sized> {
    controller: ConsoleController,
    transport: Arc<T>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    view_tx: watch::Sender<ConsoleView>,
    in_flight: HashMap<RequestTicket, CancelHandle>,
    follow_ups: Vec<JoinHandle<()>>,
    origin: Instant,
}

impl<T: Transport + ?Sized> ConsoleRuntime<T> {
    pub fn new(config: ConsoleConfig, transport: Arc<T>) -> (Self, ConsoleHandle) {
        let controller = ConsoleController::new(config);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(controller.view());
        let runtime = Self {
            controller,
            transport,
            control_rx,
            internal_tx,
            internal_rx,
            view_tx,
            in_flight: HashMap::new(),
            follow_ups: Vec::new(),
            origin: Instant::now(),
        };
        let handle = ConsoleHandle {
            control: control_tx,
            view: view_rx,
        };
        (runtime, handle)
    }

    /// Spawns the loop on the current tokio runtime.
    pub fn spawn(config: ConsoleConfig, transport: Arc<T>) -> (ConsoleHandle, JoinHandle<()>) {
        let (runtime, handle) = Self::new(config, transport);
        (handle, tokio::spawn(runtime.run()))
    }

    /// Runs until [`ConsoleHandle::shutdown`] is called or every handle is
    /// dropped.
    pub async fn run(mut self) {
        let effects = self.controller.boot(self.now_ms());
        self.apply(effects);
        self.publish();

        let period = Duration::from_millis(self.controller.config().timings.poll_interval_ms);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let sweep_at = self
                .controller
                .next_notification_deadline_ms()
                .map(|deadline_ms| self.origin + Duration::from_millis(deadline_ms));

            tokio::select! {
                control = self.control_rx.recv() => match control {
                    Some(Control::Command(command)) => {
                        let effects = self.controller.handle(command, self.now_ms());
                        self.apply(effects);
                    }
                    Some(Control::Shutdown) | None => break,
                },
                Some(internal) = self.internal_rx.recv() => match internal {
                    Internal::Completed { ticket, outcome } => {
                        self.in_flight.remove(&ticket);
                        let effects = self.controller.complete(ticket, outcome, self.now_ms());
                        self.apply(effects);
                    }
                    Internal::FollowUpDue => {
                        let effects = self.controller.handle(Command::FollowUpRefresh, self.now_ms());
                        self.apply(effects);
                    }
                },
                _ = ticker.tick() => {
                    let effects = self.controller.handle(Command::Tick, self.now_ms());
                    self.apply(effects);
                }
                () = sleep_until(sweep_at) => {
                    self.controller.sweep_notifications(self.now_ms());
                }
            }
            self.publish();
        }

        self.cancel_outstanding();
        tracing::info!("console runtime stopped");
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Issue(planned) => self.spawn_request(planned),
                Effect::ScheduleFollowUpRefresh { delay_ms } => self.schedule_follow_up(delay_ms),
            }
        }
    }

    fn spawn_request(&mut self, planned: PlannedRequest) {
        let PlannedRequest {
            ticket,
            label,
            request,
        } = planned;
        let (cancel, future) = execute(Arc::clone(&self.transport), request);
        self.in_flight.insert(ticket, cancel);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let outcome = future.await;
            if internal
                .send(Internal::Completed { ticket, outcome })
                .is_err()
            {
                tracing::debug!(%ticket, endpoint = label, "completion dropped after shutdown");
            }
        });
    }

    fn schedule_follow_up(&mut self, delay_ms: u64) {
        self.follow_ups.retain(|task| !task.is_finished());
        let internal = self.internal_tx.clone();
        self.follow_ups.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = internal.send(Internal::FollowUpDue);
        }));
    }

    fn cancel_outstanding(&mut self) {
        for (ticket, cancel) in self.in_flight.drain() {
            tracing::debug!(%ticket, "cancelling outstanding console request");
            cancel.cancel();
        }
        for task in self.follow_ups.drain(..) {
            task.abort();
        }
    }

    fn publish(&self) {
        let view = self.controller.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
