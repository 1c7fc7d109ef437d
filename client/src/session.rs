//! A connected drawing client.
//!
//! DESIGN
//! ======
//! `Session` owns one [`EngineCore`], one [`Connection`] and one
//! [`MoveCoalescer`]. Local operations update the mirror, then push the
//! resulting events through the coalescer and write whatever it releases to
//! the relay. Finishing a drag (`MovePhase::Modified`) flushes held moves so
//! peers always converge on the final position.
//!
//! Inbound events go through [`EngineCore::apply_remote`]. Drops are logged at
//! warn and otherwise ignored; they never end the session. Losing the
//! transport does.
//!
//! [`Session::run`] multiplexes inbound events, [`SessionCommand`]s from the
//! host and the coalescer deadline on one task, so the engine is never shared.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::time::Instant;

use canvas::capture::{IdGenerator, UuidIds};
use canvas::coalesce::MoveCoalescer;
use canvas::engine::{EngineCore, MovePhase, RemoteOutcome};
use canvas::geometry::Point;
use frames::{Event, ObjectId, ObjectOptions, ShapeType};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::ClientError;

// =============================================================================
// COMMANDS
// =============================================================================

/// Local edits a host hands to [`Session::run`].
#[derive(Debug)]
pub enum SessionCommand {
    PlaceShape { shape: ShapeType, overrides: ObjectOptions },
    Stroke(Vec<Point>),
    Move { id: ObjectId, left: f64, top: f64, phase: MovePhase },
    Modify { id: ObjectId, patch: ObjectOptions, phase: MovePhase },
    Select(ObjectId),
    Deselect(ObjectId),
    CreateArrow,
    Clear,
    /// Flush held moves and report how many objects the mirror holds.
    Sync(oneshot::Sender<usize>),
    /// Flush, close the connection and return from `run`.
    Close,
}

// =============================================================================
// SESSION
// =============================================================================

pub struct Session<I: IdGenerator = UuidIds> {
    engine: EngineCore<I>,
    connection: Connection,
    coalescer: MoveCoalescer,
}

impl Session<UuidIds> {
    /// Connect to the relay named in `config` with random object ids.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WsConnect`] if the relay cannot be reached.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::connect_with_ids(config, UuidIds).await
    }
}

impl<I: IdGenerator> Session<I> {
    /// Connect with a custom id source.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WsConnect`] if the relay cannot be reached.
    pub async fn connect_with_ids(config: &ClientConfig, ids: I) -> Result<Self, ClientError> {
        let connection = Connection::open(&config.relay_url).await?;
        info!(url = %config.relay_url, move_interval_ms = config.move_interval.as_millis(), "session connected");
        Ok(Self {
            engine: EngineCore::with_ids(ids),
            connection,
            coalescer: MoveCoalescer::new(config.move_interval),
        })
    }

    #[must_use]
    pub fn engine(&self) -> &EngineCore<I> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut EngineCore<I> {
        &mut self.engine
    }

    // --- Local operations ---

    /// Place a default shape and broadcast it. Returns the new object's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be sent.
    pub async fn place_shape(&mut self, shape: ShapeType) -> Result<ObjectId, ClientError> {
        self.place_shape_with(shape, &ObjectOptions::default()).await
    }

    /// Place a shape with `overrides` applied and broadcast it.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be sent.
    pub async fn place_shape_with(
        &mut self,
        shape: ShapeType,
        overrides: &ObjectOptions,
    ) -> Result<ObjectId, ClientError> {
        let event = self.engine.place_shape_with(shape, overrides);
        let id = event.target_id().unwrap_or_default().to_owned();
        self.emit(vec![event]).await?;
        Ok(id)
    }

    /// Draw a freehand stroke through `points`. `None` for an empty stroke.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be sent.
    pub async fn draw_stroke(
        &mut self,
        points: impl IntoIterator<Item = Point>,
    ) -> Result<Option<ObjectId>, ClientError> {
        let Some(event) = self.engine.draw_stroke(points) else {
            return Ok(None);
        };
        let id = event.target_id().map(str::to_owned);
        self.emit(vec![event]).await?;
        Ok(id)
    }

    /// Move an object and any arrows bound to it. Returns whether the object
    /// was moved.
    ///
    /// # Errors
    ///
    /// Returns an error if the events cannot be sent.
    pub async fn move_object(&mut self, id: &str, left: f64, top: f64, phase: MovePhase) -> Result<bool, ClientError> {
        self.modify_object(id, &ObjectOptions::position(left, top), phase).await
    }

    /// Patch an object and broadcast the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the events cannot be sent.
    pub async fn modify_object(
        &mut self,
        id: &str,
        patch: &ObjectOptions,
        phase: MovePhase,
    ) -> Result<bool, ClientError> {
        let events = self.engine.modify_object(id, patch, phase);
        if events.is_empty() {
            return Ok(false);
        }
        self.emit(events).await?;
        if phase == MovePhase::Modified {
            self.flush().await?;
        }
        Ok(true)
    }

    pub fn select(&mut self, id: &str) -> bool {
        self.engine.select(id)
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.engine.deselect(id)
    }

    /// Connect the two selected shapes. Returns the new line's id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Capture`] unless exactly two live shapes are
    /// selected, or a transport error if the event cannot be sent.
    pub async fn create_arrow(&mut self) -> Result<ObjectId, ClientError> {
        let event = self.engine.create_arrow()?;
        let line_id = event.target_id().unwrap_or_default().to_owned();
        self.emit(vec![event]).await?;
        Ok(line_id)
    }

    /// Clear the canvas everywhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be sent.
    pub async fn clear(&mut self) -> Result<(), ClientError> {
        let event = self.engine.clear();
        self.emit(vec![event]).await?;
        self.coalescer.reset();
        Ok(())
    }

    /// Send every held move now.
    ///
    /// # Errors
    ///
    /// Returns an error if an event cannot be sent.
    pub async fn flush(&mut self) -> Result<(), ClientError> {
        let due = self.coalescer.flush(Instant::now());
        self.send_all(due).await
    }

    /// Send held moves whose interval has elapsed.
    async fn flush_due(&mut self) -> Result<(), ClientError> {
        let due = self.coalescer.tick(Instant::now());
        self.send_all(due).await
    }

    async fn emit(&mut self, events: Vec<Event>) -> Result<(), ClientError> {
        let now = Instant::now();
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            out.extend(self.coalescer.offer(event, now));
        }
        self.send_all(out).await
    }

    async fn send_all(&mut self, events: Vec<Event>) -> Result<(), ClientError> {
        for event in &events {
            self.connection.send(event).await?;
            debug!(event_type = %event.event_type(), target = event.target_id().unwrap_or("-"), "event sent");
        }
        Ok(())
    }

    // --- Remote ---

    /// Wait for the next peer event and apply it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WsClosed`] once the relay goes away, or
    /// [`ClientError::Ws`] on a transport failure.
    pub async fn apply_next(&mut self) -> Result<(Event, RemoteOutcome), ClientError> {
        let Some(event) = self.connection.recv().await? else {
            return Err(ClientError::WsClosed);
        };
        let outcome = self.apply_inbound(&event);
        Ok((event, outcome))
    }

    fn apply_inbound(&mut self, event: &Event) -> RemoteOutcome {
        let outcome = self.engine.apply_remote(event);
        let event_type = event.event_type();
        match &outcome {
            RemoteOutcome::Applied if event_type.is_continuous() => {
                debug!(%event_type, target = event.target_id().unwrap_or("-"), "remote event applied");
            }
            RemoteOutcome::Applied => {
                info!(%event_type, target = event.target_id().unwrap_or("-"), "remote event applied");
            }
            RemoteOutcome::Dropped(reason) => {
                warn!(%event_type, %reason, "remote event dropped");
            }
        }
        if matches!(event, Event::Clear(_)) {
            self.coalescer.reset();
        }
        outcome
    }

    // --- Event loop ---

    /// Drive the session until `commands` closes, a [`SessionCommand::Close`]
    /// arrives, or the relay goes away.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WsClosed`] if the relay closes first, or any
    /// transport error. A rejected local edit is logged and does not stop
    /// the loop.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) -> Result<EngineCore<I>, ClientError> {
        loop {
            let deadline = self.coalescer.next_deadline();
            tokio::select! {
                inbound = self.connection.recv() => {
                    let Some(event) = inbound? else {
                        return Err(ClientError::WsClosed);
                    };
                    self.apply_inbound(&event);
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if matches!(command, SessionCommand::Close) {
                        break;
                    }
                    self.execute(command).await?;
                }
                () = sleep_until(deadline) => {
                    self.flush_due().await?;
                }
            }
        }
        self.flush().await?;
        let Self { engine, connection, .. } = self;
        connection.close().await?;
        info!("session closed");
        Ok(engine)
    }

    async fn execute(&mut self, command: SessionCommand) -> Result<(), ClientError> {
        match command {
            SessionCommand::PlaceShape { shape, overrides } => {
                self.place_shape_with(shape, &overrides).await?;
            }
            SessionCommand::Stroke(points) => {
                self.draw_stroke(points).await?;
            }
            SessionCommand::Move { id, left, top, phase } => {
                self.move_object(&id, left, top, phase).await?;
            }
            SessionCommand::Modify { id, patch, phase } => {
                self.modify_object(&id, &patch, phase).await?;
            }
            SessionCommand::Select(id) => {
                if !self.select(&id) {
                    debug!(%id, "select ignored");
                }
            }
            SessionCommand::Deselect(id) => {
                self.deselect(&id);
            }
            SessionCommand::CreateArrow => match self.create_arrow().await {
                Ok(_) => {}
                Err(ClientError::Capture(error)) => warn!(%error, "arrow not created"),
                Err(e) => return Err(e),
            },
            SessionCommand::Clear => self.clear().await?,
            SessionCommand::Sync(reply) => {
                self.flush().await?;
                if reply.send(self.engine.registry.len()).is_err() {
                    debug!("sync requester went away");
                }
            }
            SessionCommand::Close => {}
        }
        Ok(())
    }

    /// Flush held moves and close the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush or the close handshake fails.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.flush().await?;
        self.connection.close().await
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
