//! Fleet registry and error taxonomy

use crate::config::FleetConfig;
use crate::geo::LocalPoint;
use crate::motion::AgentMotionController;
use thiserror::Error;

/// Recoverable faults in command handling. None of these is fatal to the
/// tick loop; handlers log and drop the offending command.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Operator referenced an agent outside the fleet. Dashboards may
    /// hold stale ids, so this is logged and ignored.
    #[error("unknown agent index {0}")]
    UnknownAgent(usize),

    /// No agent can serve the request (empty fleet)
    #[error("no agent available")]
    EmptyFleet,

    /// Malformed command input (non-finite geo point, bad scale, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Owns the fleet's motion controllers in assignment order. Order is
/// stable for the process lifetime so snapshot consumers can diff by
/// position.
pub struct FleetRegistry {
    agents: Vec<AgentMotionController>,
}

impl FleetRegistry {
    /// Lay out one sweep lane per drone, evenly spaced across the
    /// configured area: lane i runs along x at y = gap * (i + 0.5).
    pub fn new(config: &FleetConfig) -> Self {
        let gap = config.size / config.drones.max(1) as f64;
        let agents = (0..config.drones)
            .map(|i| {
                let lane_y = gap * (i as f64 + 0.5);
                AgentMotionController::new(
                    i,
                    LocalPoint::new(0.0, lane_y, config.altitude),
                    LocalPoint::new(config.size, lane_y, config.altitude),
                    config,
                )
            })
            .collect();
        Self { agents }
    }

    pub fn get(&mut self, index: usize) -> Result<&mut AgentMotionController, FleetError> {
        self.agents
            .get_mut(index)
            .ok_or(FleetError::UnknownAgent(index))
    }

    /// All agents in assignment order
    pub fn all(&self) -> impl Iterator<Item = &AgentMotionController> {
        self.agents.iter()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut AgentMotionController> {
        self.agents.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Index of the agent nearest to a planar point. Linear scan with a
    /// strict comparison, so the first agent in assignment order wins
    /// exact ties. O(n); fine at the fleet sizes in scope.
    pub fn nearest(&self, x: f64, y: f64) -> Option<usize> {
        let target = LocalPoint::new(x, y, 0.0);
        let mut best: Option<(usize, f64)> = None;
        for (index, agent) in self.agents.iter().enumerate() {
            let d = agent.position().planar_distance_sq(&target);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((index, d));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Index of the agent currently flying the override with this id
    pub fn find_override(&self, id: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.override_id() == Some(id))
    }
}
