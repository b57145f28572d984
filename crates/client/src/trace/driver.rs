// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background task that runs a [`Tracer`] against a [`Transport`].
//!
//! The driver is the single owner of the tracer. It reacts to handle commands,
//! transport events, the reconnect deadline and the keep-alive interval, feeds
//! each into the tracer and executes the effects that come back.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use tl_core::protocol::ABNORMAL_CLOSURE_CODE;
use tl_core::{Effect, Tracer};

use super::status::SharedStatus;
use super::transport::{ConnectionEvents, Transport, TransportEvent};
use super::CloseCallback;

/// Requests from [`super::Trace`] handles.
#[derive(Debug)]
pub(crate) enum Command {
    Identity(Vec<Value>),
    StatsEntry(Vec<Value>),
    KeepAlive,
    Connect { is_continuation: bool },
    /// Intentional close; `done` fires once the trace is terminated.
    Close { done: Option<oneshot::Sender<()>> },
}

/// What woke the driver loop.
enum Wake {
    Command(Command),
    Transport(u64, TransportEvent),
    Reconnect,
    KeepAlive,
    Stop,
}

pub(crate) struct Driver<T: Transport> {
    tracer: Tracer,
    transport: T,
    status: Arc<SharedStatus>,
    on_close: Option<CloseCallback>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, TransportEvent)>,
    reconnect_at: Option<Instant>,
    keep_alive: Option<Interval>,
    close_waiters: Vec<oneshot::Sender<()>>,
}

impl<T: Transport> Driver<T> {
    pub(crate) fn new(
        tracer: Tracer,
        transport: T,
        status: Arc<SharedStatus>,
        on_close: Option<CloseCallback>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Driver {
            tracer,
            transport,
            status,
            on_close,
            commands,
            events_tx,
            events_rx,
            reconnect_at: None,
            keep_alive: None,
            close_waiters: Vec::new(),
        }
    }

    /// Runs until every trace handle is dropped.
    pub(crate) async fn run(mut self) {
        self.status.publish(&self.tracer);

        loop {
            let wake = tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => Wake::Command(cmd),
                    None => Wake::Stop,
                },
                Some((generation, event)) = self.events_rx.recv() => Wake::Transport(generation, event),
                _ = sleep_until(self.reconnect_at) => Wake::Reconnect,
                _ = tick(&mut self.keep_alive) => Wake::KeepAlive,
            };

            let effects = match wake {
                Wake::Command(cmd) => self.handle_command(cmd),
                Wake::Transport(generation, event) => self.handle_transport(generation, event),
                Wake::Reconnect => {
                    self.reconnect_at = None;
                    self.tracer.on_reconnect_timer()
                }
                Wake::KeepAlive => self.tracer.keep_alive(),
                Wake::Stop => break,
            };

            self.execute(effects).await;
            self.status.publish(&self.tracer);
            if self.tracer.is_closed() {
                for done in self.close_waiters.drain(..) {
                    let _ = done.send(());
                }
            }
        }

        if !self.tracer.is_closed() {
            debug!("all trace handles dropped, closing");
            let effects = self.tracer.close();
            self.execute(effects).await;
        }
        debug!("trace driver stopped");
    }

    fn handle_command(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Identity(values) => self.tracer.identity(values),
            Command::StatsEntry(values) => self.tracer.stats_entry(values),
            Command::KeepAlive => self.tracer.keep_alive(),
            Command::Connect { is_continuation } => self.tracer.connect(is_continuation),
            Command::Close { done } => {
                if let Some(done) = done {
                    self.close_waiters.push(done);
                }
                self.tracer.close()
            }
        }
    }

    fn handle_transport(&mut self, generation: u64, event: TransportEvent) -> Vec<Effect> {
        match event {
            TransportEvent::Opened => self.tracer.on_open(generation),
            TransportEvent::Message(text) => self.tracer.on_message(generation, &text),
            TransportEvent::Closed { code, reason } => {
                self.tracer.on_close(generation, code, &reason)
            }
        }
    }

    async fn execute(&mut self, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Open { generation, request } => {
                    let events = ConnectionEvents::new(generation, self.events_tx.clone());
                    if let Err(e) = self.transport.connect(request, events).await {
                        warn!(generation, error = %e, "failed to start connection");
                        queue.extend(self.tracer.on_close(
                            generation,
                            ABNORMAL_CLOSURE_CODE,
                            &e.to_string(),
                        ));
                    }
                }
                Effect::Send(msg) => {
                    if let Err(e) = self.transport.send(msg).await {
                        debug!(error = %e, "send failed, event stays buffered");
                    }
                }
                Effect::Close { code, reason } => {
                    if let Err(e) = self.transport.close(code, reason).await {
                        debug!(code, error = %e, "close not delivered");
                    }
                }
                Effect::StartKeepAlive(period) => {
                    self.keep_alive = Some(keep_alive_interval(period));
                }
                Effect::StopKeepAlive => self.keep_alive = None,
                Effect::ScheduleReconnect(delay) => {
                    info!(?delay, "reconnect scheduled");
                    self.reconnect_at = Some(Instant::now() + delay);
                }
                Effect::CancelReconnect => self.reconnect_at = None,
                Effect::NotifyClosed(info) => {
                    if let Some(callback) = &self.on_close {
                        callback(info);
                    }
                }
            }
        }
    }
}

/// Interval whose first tick is one full period away.
fn keep_alive_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
