//! The dispatcher: owns the world (fleet, requesters, resources) and the tick schedule.

use std::time::Duration;

use bevy_ecs::prelude::{Schedule, World};
use log::{info, warn};

use crate::clock::SimulationClock;
use crate::config::DispatchConfig;
use crate::controller::{ControllerMode, PatrolController};
use crate::ecs::{RequesterInfo, RequesterState, VehicleInfo};
use crate::error::{ConfigError, DispatchError};
use crate::grid::GridNetwork;
use crate::patrol::{PatrolCycle, PatrolPattern};
use crate::registry::{vehicle_id, FleetRoster, RequesterIndex};
use crate::runner::{dispatch_schedule, run_tick};
use crate::solver::{ConstraintSolver, ConstraintSolverResource, SolverGate};
use crate::spawner::{admit_requester, random_request, PendingSpawns, RequesterRequest, SpawnRng};
use crate::telemetry::{
    DispatchSnapshot, DispatchSnapshots, DispatchTelemetry, VehicleSnapshot,
};
use crate::transport::{DispatchTransport, TransportResource};

pub struct DispatchSystem {
    world: World,
    schedule: Schedule,
}

impl DispatchSystem {
    /// Validate `config`, spawn the fleet on its patrol cycles and the initial requesters.
    pub fn new(
        config: DispatchConfig,
        transport: Box<dyn DispatchTransport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = GridNetwork::new(config.grid_width, config.grid_height)?;
        let mut rng = SpawnRng::seeded(config.seed);
        let mut world = World::new();
        let mut roster = FleetRoster::default();

        let vehicle_count = if config.fleet.is_empty() {
            config.vehicle_count
        } else {
            config.fleet.len()
        };
        for index in 0..vehicle_count {
            let id = vehicle_id(index);
            let spec = config.fleet.get(index);
            let start = match spec {
                Some(spec) => spec.start,
                None => grid.random_position(&mut rng.0),
            };
            let capacity = spec
                .and_then(|s| s.capacity)
                .unwrap_or(config.vehicle_capacity);
            let cycle = match spec.and_then(|s| s.cycle.clone()) {
                Some(waypoints) => PatrolCycle::new(&id, waypoints, &grid)?,
                None => PatrolCycle::from_pattern(&id, PatrolPattern::for_vehicle(index), &grid)?,
            };
            let controller = PatrolController::new(cycle, start);
            info!(
                "{id} starts at {start} with {} waypoints (capacity {capacity})",
                controller.cycle().len()
            );
            let entity = world
                .spawn((VehicleInfo::new(id.clone(), start, capacity), controller))
                .id();
            roster.insert(id, entity, capacity);
        }

        world.insert_resource(ConstraintSolverResource(ConstraintSolver::from_config(
            &config.solver,
            config.discount,
        )));
        world.insert_resource(config.snapshots);
        world.insert_resource(PendingSpawns {
            pending: 0,
            last_periodic_at: Some(0),
        });
        world.insert_resource(grid);
        world.insert_resource(roster);
        world.insert_resource(rng);
        world.insert_resource(SimulationClock::default());
        world.insert_resource(SolverGate::default());
        world.insert_resource(RequesterIndex::default());
        world.insert_resource(DispatchTelemetry::default());
        world.insert_resource(DispatchSnapshots::default());
        world.insert_resource(TransportResource(transport));
        let initial = config.initial_requesters;
        world.insert_resource(config);

        let mut system = Self {
            world,
            schedule: dispatch_schedule(),
        };
        for _ in 0..initial {
            if let Err(err) = system.spawn_random_requester() {
                warn!("initial requester rejected: {err}");
            }
        }
        Ok(system)
    }

    /// Advance simulation time by `dt` and run one tick.
    pub fn update(&mut self, dt: Duration) {
        run_tick(&mut self.world, &mut self.schedule, dt);
    }

    /// Run `ticks` ticks of `dt`; returns how many ran.
    pub fn run_for(&mut self, ticks: u64, dt: Duration) -> u64 {
        for _ in 0..ticks {
            self.update(dt);
        }
        ticks
    }

    /// Add a Waiting requester; returns its id.
    pub fn spawn_requester(&mut self, request: RequesterRequest) -> Result<String, DispatchError> {
        let now = self.now_ms();
        let id = self.world.resource_mut::<RequesterIndex>().next_id();
        let requester = {
            let world = &self.world;
            admit_requester(
                &request,
                id,
                now,
                world.resource::<GridNetwork>(),
                &world.resource::<DispatchConfig>().pricing,
                world.resource::<TransportResource>().0.as_ref(),
                world.resource::<FleetRoster>(),
            )?
        };
        let id = requester.id.clone();
        info!(
            "requester {id} waiting at {} -> {} (party {})",
            requester.pickup_position, requester.dropoff_position, requester.party_size
        );
        let entity = self.world.spawn(requester).id();
        self.world.resource_mut::<RequesterIndex>().insert(id.clone(), entity);
        self.world.resource_mut::<DispatchTelemetry>().spawned += 1;
        Ok(id)
    }

    /// Add a random requester drawn from the spawn config.
    pub fn spawn_random_requester(&mut self) -> Result<String, DispatchError> {
        let max_capacity = self.world.resource::<FleetRoster>().max_capacity();
        let spawn = self.world.resource::<DispatchConfig>().spawn;
        let request = self
            .world
            .resource_scope::<SpawnRng, _>(|world, mut rng| {
                random_request(&mut rng.0, world.resource::<GridNetwork>(), &spawn, max_capacity)
            });
        self.spawn_requester(request)
    }

    /// Cancel a Waiting requester. A diverted claimant goes back to patrolling.
    pub fn cancel_requester(&mut self, requester_id: &str) -> Result<(), DispatchError> {
        let entity = self
            .world
            .resource::<RequesterIndex>()
            .get(requester_id)
            .ok_or_else(|| DispatchError::UnknownRequester(requester_id.to_string()))?;
        let requester = self
            .world
            .get::<RequesterInfo>(entity)
            .ok_or_else(|| DispatchError::UnknownRequester(requester_id.to_string()))?;
        if requester.state != RequesterState::Waiting {
            return Err(DispatchError::NotCancellable(requester_id.to_string()));
        }

        if let Some(holder) = requester.assigned_vehicle_id.clone() {
            let now = self.now_ms();
            let vehicle_entity = self.world.resource::<FleetRoster>().get(&holder);
            if let Some(vehicle_entity) = vehicle_entity {
                let mut vehicles = self
                    .world
                    .query::<(&mut VehicleInfo, &mut PatrolController)>();
                if let Ok((mut vehicle, mut controller)) =
                    vehicles.get_mut(&mut self.world, vehicle_entity)
                {
                    controller.unwind(&mut vehicle, None, now)?;
                }
            }
        }

        self.world.despawn(entity);
        self.world.resource_mut::<RequesterIndex>().remove(requester_id);
        let mut telemetry = self.world.resource_mut::<DispatchTelemetry>();
        telemetry.forget_claim(requester_id);
        telemetry.cancelled += 1;
        info!("requester {requester_id} cancelled");
        Ok(())
    }

    /// Current state of every vehicle and live requester.
    pub fn snapshot(&self) -> DispatchSnapshot {
        let clock = self.world.resource::<SimulationClock>();
        let vehicles = self
            .world
            .resource::<FleetRoster>()
            .iter()
            .filter_map(|(_, entity)| {
                let entity = self.world.get_entity(entity)?;
                let vehicle = entity.get::<VehicleInfo>()?;
                let controller = entity.get::<PatrolController>()?;
                Some(VehicleSnapshot::new(vehicle, controller.mode()))
            })
            .collect();
        let requesters = self
            .world
            .resource::<RequesterIndex>()
            .sorted_entities()
            .into_iter()
            .filter_map(|entity| self.world.get::<RequesterInfo>(entity).cloned())
            .collect();
        DispatchSnapshot::build(
            clock.now(),
            clock.tick(),
            vehicles,
            requesters,
            self.world.resource::<DispatchTelemetry>(),
        )
    }

    pub fn vehicle(&self, vehicle_id: &str) -> Option<&VehicleInfo> {
        let entity = self.world.resource::<FleetRoster>().get(vehicle_id)?;
        self.world.get::<VehicleInfo>(entity)
    }

    pub fn controller(&self, vehicle_id: &str) -> Option<&PatrolController> {
        let entity = self.world.resource::<FleetRoster>().get(vehicle_id)?;
        self.world.get::<PatrolController>(entity)
    }

    pub fn controller_mode(&self, vehicle_id: &str) -> Option<ControllerMode> {
        self.controller(vehicle_id).map(PatrolController::mode)
    }

    /// Live requesters only; delivered and cancelled ones live on in telemetry.
    pub fn requester(&self, requester_id: &str) -> Option<&RequesterInfo> {
        let entity = self.world.resource::<RequesterIndex>().get(requester_id)?;
        self.world.get::<RequesterInfo>(entity)
    }

    pub fn vehicle_ids(&self) -> &[String] {
        self.world.resource::<FleetRoster>().ids()
    }

    pub fn telemetry(&self) -> &DispatchTelemetry {
        self.world.resource::<DispatchTelemetry>()
    }

    pub fn snapshots(&self) -> &DispatchSnapshots {
        self.world.resource::<DispatchSnapshots>()
    }

    pub fn config(&self) -> &DispatchConfig {
        self.world.resource::<DispatchConfig>()
    }

    pub fn grid(&self) -> &GridNetwork {
        self.world.resource::<GridNetwork>()
    }

    pub fn now_ms(&self) -> u64 {
        self.world.resource::<SimulationClock>().now()
    }

    pub fn tick(&self) -> u64 {
        self.world.resource::<SimulationClock>().tick()
    }

    /// Direct world access for tests that need to corrupt or inspect raw state.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
