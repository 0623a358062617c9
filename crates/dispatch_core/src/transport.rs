//! Messaging seam between the dispatch core and whatever carries requests to vehicles.
//!
//! The core only ever asks three things of a transport: which vehicles a new request
//! reaches, that a vehicle accepted a requester, and where each vehicle is. Calls are
//! fire-and-forget; implementations must not block the tick.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::ecs::RequesterInfo;
use crate::grid::GridPosition;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceNotice {
    pub vehicle_id: String,
    pub requester_id: String,
    /// Grid steps to the pickup at the time of the claim.
    pub eta_ticks: u32,
    pub position: GridPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionReport {
    pub vehicle_id: String,
    pub position: GridPosition,
    pub timestamp_ms: u64,
}

pub trait DispatchTransport: Send + Sync {
    /// Deliver a new request; returns the ids of the vehicles it reached.
    fn deliver_request(&self, requester: &RequesterInfo, fleet: &[String]) -> BTreeSet<String>;

    fn notify_acceptance(&self, notice: AcceptanceNotice);

    fn report_position(&self, report: PositionReport);
}

impl<T: DispatchTransport + ?Sized> DispatchTransport for Arc<T> {
    fn deliver_request(&self, requester: &RequesterInfo, fleet: &[String]) -> BTreeSet<String> {
        (**self).deliver_request(requester, fleet)
    }

    fn notify_acceptance(&self, notice: AcceptanceNotice) {
        (**self).notify_acceptance(notice)
    }

    fn report_position(&self, report: PositionReport) {
        (**self).report_position(report)
    }
}

/// Drops every event; requests reach the whole fleet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl DispatchTransport for NullTransport {
    fn deliver_request(&self, _requester: &RequesterInfo, fleet: &[String]) -> BTreeSet<String> {
        fleet.iter().cloned().collect()
    }

    fn notify_acceptance(&self, _notice: AcceptanceNotice) {}

    fn report_position(&self, _report: PositionReport) {}
}

#[derive(Debug, Default)]
struct BroadcastLog {
    deliveries: Vec<(String, BTreeSet<String>)>,
    acceptances: Vec<AcceptanceNotice>,
    positions: Vec<PositionReport>,
}

/// In-process bus: broadcasts every request to the whole fleet and buffers all
/// events for later inspection.
#[derive(Debug, Default)]
pub struct BroadcastTransport {
    log: Mutex<BroadcastLog>,
}

impl BroadcastTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut BroadcastLog) -> R) -> R {
        match self.log.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// `(requester id, vehicles reached)` in delivery order.
    pub fn deliveries(&self) -> Vec<(String, BTreeSet<String>)> {
        self.with_log(|log| log.deliveries.clone())
    }

    pub fn acceptances(&self) -> Vec<AcceptanceNotice> {
        self.with_log(|log| log.acceptances.clone())
    }

    pub fn positions(&self) -> Vec<PositionReport> {
        self.with_log(|log| log.positions.clone())
    }

    /// Latest reported position per vehicle.
    pub fn last_position(&self, vehicle_id: &str) -> Option<GridPosition> {
        self.with_log(|log| {
            log.positions
                .iter()
                .rev()
                .find(|r| r.vehicle_id == vehicle_id)
                .map(|r| r.position)
        })
    }
}

impl DispatchTransport for BroadcastTransport {
    fn deliver_request(&self, requester: &RequesterInfo, fleet: &[String]) -> BTreeSet<String> {
        let reached: BTreeSet<String> = fleet.iter().cloned().collect();
        self.with_log(|log| log.deliveries.push((requester.id.clone(), reached.clone())));
        reached
    }

    fn notify_acceptance(&self, notice: AcceptanceNotice) {
        self.with_log(|log| log.acceptances.push(notice));
    }

    fn report_position(&self, report: PositionReport) {
        self.with_log(|log| log.positions.push(report));
    }
}

/// ECS resource wrapping the boxed transport.
#[derive(Resource)]
pub struct TransportResource(pub Box<dyn DispatchTransport>);

impl std::ops::Deref for TransportResource {
    type Target = dyn DispatchTransport;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
