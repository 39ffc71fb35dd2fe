//! Fleet synchronizer: tick advancement, snapshot broadcast, and command
//! routing
//!
//! Every agent mutation — tick-driven or command-driven — funnels through
//! the registry write lock, so a command is applied fully before or after
//! a tick and a snapshot never observes a half-applied command. Snapshot
//! bytes are copied out before broadcasting; no agent lock is held while
//! talking to clients.

use crate::fleet::{FleetError, FleetRegistry};
use crate::geo::{GeoPoint, GeoProjector, LocalPoint};
use crate::session::{ClientHandle, SessionManager};
use std::sync::Arc;
use sweep_shared::{codec, ClientMessage, DroneStatus, FleetSnapshot};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct FleetSynchronizer {
    registry: RwLock<FleetRegistry>,
    projector: GeoProjector,
    sessions: Arc<SessionManager>,
}

impl FleetSynchronizer {
    pub fn new(
        registry: FleetRegistry,
        projector: GeoProjector,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            projector,
            sessions,
        }
    }

    /// Advance every agent by one step of `dt` seconds and broadcast the
    /// resulting snapshot to all connected clients
    pub async fn tick(&self, dt: f64) -> FleetSnapshot {
        let snapshot = {
            let mut registry = self.registry.write().await;
            for agent in registry.all_mut() {
                agent.tick(dt);
            }
            self.snapshot_locked(&registry)
        };
        self.broadcast(&snapshot).await;
        snapshot
    }

    /// Current fleet state without advancing motion
    pub async fn snapshot(&self) -> FleetSnapshot {
        let registry = self.registry.read().await;
        self.snapshot_locked(&registry)
    }

    fn snapshot_locked(&self, registry: &FleetRegistry) -> FleetSnapshot {
        let drones = registry
            .all()
            .map(|agent| {
                let geo = self.projector.to_geo(agent.position());
                DroneStatus {
                    id: agent.id(),
                    lat: geo.lat,
                    lng: geo.lng,
                    rotation: agent.heading(),
                    overridden: !agent.is_scanning(),
                    alert: agent.alert(),
                }
            })
            .collect();
        FleetSnapshot { drones }
    }

    async fn broadcast(&self, snapshot: &FleetSnapshot) {
        let frame = match codec::encode(snapshot) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "snapshot encode failed");
                return;
            }
        };
        self.sessions.broadcast(frame).await;
    }

    /// Send the current fleet state to one freshly connected client so it
    /// has positions before the first tick lands
    pub async fn greet(&self, handle: &ClientHandle) {
        let snapshot = self.snapshot().await;
        match codec::encode(&snapshot) {
            Ok(frame) => {
                handle.push(frame);
            }
            Err(e) => warn!(error = %e, "snapshot encode failed"),
        }
    }

    /// Apply one client command. A bad command affects at most itself:
    /// invalid input and unknown agents are logged and dropped, and a
    /// stale abort is silently ignored.
    pub async fn handle_message(&self, message: ClientMessage) {
        match self.apply(message).await {
            Ok(()) => {}
            Err(e @ (FleetError::UnknownAgent(_) | FleetError::EmptyFleet)) => {
                warn!(error = %e, "command targets no agent, ignoring");
            }
            Err(e) => {
                warn!(error = %e, "command rejected");
            }
        }
    }

    async fn apply(&self, message: ClientMessage) -> Result<(), FleetError> {
        match message {
            ClientMessage::RequestMovement { lng, lat, id } => {
                // Planar projection first; the z of the chosen agent is
                // filled in once we know who flies the override.
                let planar = self.projector.to_local(GeoPoint { lat, lng }, 0.0)?;

                let mut registry = self.registry.write().await;
                let index = registry
                    .nearest(planar.x, planar.y)
                    .ok_or(FleetError::EmptyFleet)?;
                let agent = registry.get(index)?;
                let target = LocalPoint::new(planar.x, planar.y, agent.position().z);
                info!(drone = index, override_id = %id, "movement override engaged");
                agent.command(target, id);
            }
            ClientMessage::AbortMovement { id } => {
                let mut registry = self.registry.write().await;
                match registry.find_override(&id) {
                    Some(index) => {
                        registry.get(index)?.abort(&id);
                        info!(drone = index, override_id = %id, "override released");
                    }
                    None => {
                        // Expected race: the override was replaced or
                        // already aborted
                        debug!(override_id = %id, "abort for unknown override, ignoring");
                    }
                }
            }
            ClientMessage::DronePause { drone } => {
                self.registry.write().await.get(drone)?.pause();
                info!(drone, "scan paused");
            }
            ClientMessage::DroneGo { drone } => {
                self.registry.write().await.get(drone)?.resume();
                info!(drone, "scan resumed");
            }
            ClientMessage::DismissAlert { drone, confirmed } => {
                // A confirmed dismiss clears the alert; an unconfirmed one
                // keeps it raised
                self.registry.write().await.get(drone)?.set_alert(!confirmed);
                info!(drone, confirmed, "alert dismissed");
            }
        }
        Ok(())
    }
}
