//! Per-vehicle patrol / divert / resume state machine.
//!
//! ```text
//!   Cycle ──claim──▶ Diverted ──pickup──▶ Transporting ──dropoff──▶ Resuming
//!     ▲                 │                                              │
//!     └────unwind───────┘◀──────────────reach closest waypoint─────────┘
//! ```
//!
//! Every step moves the vehicle at most one cardinal cell toward its heading:
//! the current cycle waypoint while patrolling or resuming, the mission target
//! otherwise. Requester lifecycle changes happen only on arrival.

use bevy_ecs::prelude::Component;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::SensingConfig;
use crate::ecs::{RequesterInfo, RequesterState, VehicleInfo};
use crate::error::DispatchError;
use crate::grid::{GridNetwork, GridPosition};
use crate::patrol::PatrolCycle;
use crate::solver::ConstraintSolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerMode {
    Cycle,
    Diverted,
    Transporting,
    Resuming,
}

/// What a step did worth telling the rest of the tick about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    PickedUp { requester_id: String },
    Delivered { requester_id: String },
    Rejoined { waypoint_index: usize },
    /// The claimed requester disappeared or was taken; back to patrol.
    Unwound { requester_id: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub moved: bool,
    pub event: Option<StepEvent>,
}

#[derive(Debug, Clone, Component)]
pub struct PatrolController {
    cycle: PatrolCycle,
    mode: ControllerMode,
    waypoint_index: usize,
    last_scan_ms: Option<u64>,
}

impl PatrolController {
    /// Starts in `Cycle`, heading for the waypoint closest to `start`.
    pub fn new(cycle: PatrolCycle, start: GridPosition) -> Self {
        let waypoint_index = cycle.closest_index(start);
        Self {
            cycle,
            mode: ControllerMode::Cycle,
            waypoint_index,
            last_scan_ms: None,
        }
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn cycle(&self) -> &PatrolCycle {
        &self.cycle
    }

    pub fn waypoint_index(&self) -> usize {
        self.waypoint_index
    }

    pub fn can_divert(&self) -> bool {
        matches!(self.mode, ControllerMode::Cycle | ControllerMode::Resuming)
    }

    pub fn scan_due(&self, now_ms: u64, interval_ms: u64) -> bool {
        self.mode == ControllerMode::Cycle
            && self
                .last_scan_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= interval_ms)
    }

    pub fn mark_scanned(&mut self, now_ms: u64) {
        self.last_scan_ms = Some(now_ms);
    }

    /// Where the next step goes.
    pub fn heading(&self, vehicle: &VehicleInfo) -> Result<GridPosition, DispatchError> {
        match self.mode {
            ControllerMode::Cycle | ControllerMode::Resuming => {
                Ok(self.cycle.waypoint(self.waypoint_index))
            }
            ControllerMode::Diverted | ControllerMode::Transporting => vehicle
                .target_position
                .ok_or_else(|| DispatchError::MissingTarget {
                    vehicle_id: vehicle.id.clone(),
                }),
        }
    }

    /// While cycling, step past every waypoint the vehicle is standing on.
    fn advance_patrol(&mut self, position: GridPosition) {
        if self.mode != ControllerMode::Cycle {
            return;
        }
        for _ in 0..self.cycle.len() {
            if self.cycle.waypoint(self.waypoint_index) != position {
                break;
            }
            self.waypoint_index = self.cycle.next_index(self.waypoint_index);
        }
    }

    /// Claim `requester` and head for its pickup.
    ///
    /// Fails without touching either side when the vehicle is busy, the party does not
    /// fit, or another vehicle already owns the requester.
    pub fn divert(
        &mut self,
        vehicle: &mut VehicleInfo,
        requester: &mut RequesterInfo,
        now_ms: u64,
    ) -> Result<(), DispatchError> {
        if !self.can_divert() || !vehicle.is_idle() {
            return Err(DispatchError::VehicleBusy {
                vehicle_id: vehicle.id.clone(),
            });
        }
        vehicle.ensure_capacity(requester.party_size)?;
        requester.try_claim(&vehicle.id, now_ms)?;
        vehicle.begin_pickup(requester, now_ms);
        self.mode = ControllerMode::Diverted;
        Ok(())
    }

    /// Abandon an unpicked diversion and go back to patrolling from the nearest
    /// waypoint. Releases the claim when `requester` is still ours.
    pub fn unwind(
        &mut self,
        vehicle: &mut VehicleInfo,
        requester: Option<&mut RequesterInfo>,
        now_ms: u64,
    ) -> Result<(), DispatchError> {
        if self.mode == ControllerMode::Transporting {
            let requester_id = vehicle.assigned_requester_id.clone().unwrap_or_default();
            return Err(DispatchError::NotCancellable(requester_id));
        }
        if let Some(requester) = requester {
            if requester.assigned_vehicle_id.as_deref() == Some(vehicle.id.as_str()) {
                requester.release_claim();
            }
        }
        vehicle.release(now_ms);
        self.rejoin_cycle(vehicle.position, ControllerMode::Cycle);
        Ok(())
    }

    /// Put the vehicle back into a consistent state after a failed step.
    pub fn recover(
        &mut self,
        vehicle: &mut VehicleInfo,
        requester: Option<&mut RequesterInfo>,
        now_ms: u64,
    ) {
        match self.mode {
            ControllerMode::Transporting => match requester {
                Some(r) if r.state == RequesterState::PickedUp => {
                    vehicle.target_position = Some(r.dropoff_position);
                }
                _ => {
                    let load = vehicle.current_load;
                    vehicle.unload(load, now_ms);
                    self.rejoin_cycle(vehicle.position, ControllerMode::Resuming);
                }
            },
            _ => {
                if let Err(err) = self.unwind(vehicle, requester, now_ms) {
                    warn!("{} could not unwind during recovery: {err}", vehicle.id);
                }
            }
        }
    }

    fn rejoin_cycle(&mut self, position: GridPosition, mode: ControllerMode) {
        self.waypoint_index = self.cycle.closest_index(position);
        self.mode = if mode == ControllerMode::Resuming
            && self.cycle.waypoint(self.waypoint_index) == position
        {
            ControllerMode::Cycle
        } else {
            mode
        };
    }

    /// One tick: validate the mission, move one cell, then handle arrival.
    ///
    /// `requester` is the vehicle's assigned requester, if it still exists.
    pub fn step(
        &mut self,
        vehicle: &mut VehicleInfo,
        requester: Option<&mut RequesterInfo>,
        grid: &GridNetwork,
        now_ms: u64,
    ) -> Result<StepReport, DispatchError> {
        let mut report = StepReport::default();

        let mut requester = requester;
        if self.mode == ControllerMode::Diverted {
            let still_ours = requester.as_deref().map_or(false, |r| {
                r.state == RequesterState::Waiting
                    && r.assigned_vehicle_id.as_deref() == Some(vehicle.id.as_str())
            });
            if !still_ours {
                let requester_id = vehicle.assigned_requester_id.clone();
                self.unwind(vehicle, requester.take(), now_ms)?;
                report.event = Some(StepEvent::Unwound { requester_id });
            }
        }
        if self.mode == ControllerMode::Transporting {
            let carried = requester
                .as_deref()
                .map_or(false, |r| r.state == RequesterState::PickedUp);
            if !carried {
                return Err(DispatchError::UnknownRequester(
                    vehicle.assigned_requester_id.clone().unwrap_or_default(),
                ));
            }
        }

        self.advance_patrol(vehicle.position);
        let heading = self.heading(vehicle)?;
        if vehicle.position != heading {
            vehicle.position = grid.next_step(vehicle.position, heading)?;
            vehicle.last_update = now_ms;
            report.moved = true;
        }

        match self.mode {
            ControllerMode::Diverted if Some(vehicle.position) == vehicle.target_position => {
                if let Some(r) = requester {
                    r.mark_picked_up(now_ms);
                    vehicle.board(r, now_ms);
                    self.mode = ControllerMode::Transporting;
                    report.event = Some(StepEvent::PickedUp {
                        requester_id: r.id.clone(),
                    });
                }
            }
            ControllerMode::Transporting if Some(vehicle.position) == vehicle.target_position => {
                if let Some(r) = requester {
                    r.mark_delivered();
                    vehicle.unload(r.party_size, now_ms);
                    self.rejoin_cycle(vehicle.position, ControllerMode::Resuming);
                    report.event = Some(StepEvent::Delivered {
                        requester_id: r.id.clone(),
                    });
                }
            }
            ControllerMode::Resuming if vehicle.position == heading => {
                self.mode = ControllerMode::Cycle;
                report.event = Some(StepEvent::Rejoined {
                    waypoint_index: self.waypoint_index,
                });
            }
            _ => {}
        }
        Ok(report)
    }
}

/// Best requester for a patrolling vehicle's opportunity scan: reachable, within
/// sensing range, then cheapest by the solver's cost.
pub fn select_diversion<'a>(
    vehicle: &VehicleInfo,
    requesters: &'a [RequesterInfo],
    sensing: &SensingConfig,
    solver: &ConstraintSolver,
) -> Option<&'a RequesterInfo> {
    let visible = requesters
        .iter()
        .filter(|r| r.reachable_from(&vehicle.id) && sensing.in_range(vehicle.position, r));
    solver
        .best_requester_for(vehicle, visible)
        .map(|(requester, _)| requester)
}
