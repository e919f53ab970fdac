//! Vehicles and the fleet-wide mapping from vehicle id to route.

use std::collections::BTreeMap;
use std::fmt;

use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub u32);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSpec {
    pub id: VehicleId,
    pub name: String,
    pub capacity: u32,
    pub start: CellIndex,
}

impl VehicleSpec {
    pub fn new(id: VehicleId, capacity: u32, start: CellIndex) -> Self {
        Self {
            id,
            name: format!("vehicle-{}", id.0),
            capacity,
            start,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Every vehicle's route, iterated in ascending vehicle id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetState {
    routes: BTreeMap<VehicleId, Route>,
}

impl FleetState {
    /// One empty route per vehicle. A repeated id keeps the last spec.
    pub fn new(vehicles: impl IntoIterator<Item = VehicleSpec>) -> Self {
        let routes = vehicles
            .into_iter()
            .map(|spec| (spec.id, Route::new(spec)))
            .collect();
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub(crate) fn route_map(&self) -> &BTreeMap<VehicleId, Route> {
        &self.routes
    }

    pub fn route(&self, vehicle: VehicleId) -> Option<&Route> {
        self.routes.get(&vehicle)
    }

    pub(crate) fn route_mut(&mut self, vehicle: VehicleId) -> Result<&mut Route, DispatchError> {
        self.routes
            .get_mut(&vehicle)
            .ok_or(DispatchError::UnknownVehicle(vehicle))
    }

    /// Requests served per vehicle, the load measure used for balancing.
    pub fn loads(&self) -> BTreeMap<VehicleId, usize> {
        self.routes
            .iter()
            .map(|(id, route)| (*id, route.served_requests()))
            .collect()
    }

    pub fn total_load(&self) -> usize {
        self.routes.values().map(Route::served_requests).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_cell;

    #[test]
    fn routes_iterate_in_vehicle_order() {
        let fleet = FleetState::new([
            VehicleSpec::new(VehicleId(3), 4, test_cell()),
            VehicleSpec::new(VehicleId(1), 4, test_cell()),
            VehicleSpec::new(VehicleId(2), 4, test_cell()).with_name("bus"),
        ]);
        let ids: Vec<_> = fleet.routes().map(|route| route.vehicle().id).collect();
        assert_eq!(ids, vec![VehicleId(1), VehicleId(2), VehicleId(3)]);
        assert_eq!(
            fleet.route(VehicleId(2)).map(|route| route.vehicle().name.as_str()),
            Some("bus")
        );
    }

    #[test]
    fn empty_fleet_has_no_load() {
        let fleet = FleetState::new([VehicleSpec::new(VehicleId(0), 2, test_cell())]);
        assert_eq!(fleet.total_load(), 0);
        assert_eq!(fleet.loads().get(&VehicleId(0)), Some(&0));
    }

    #[test]
    fn unknown_vehicle_is_an_error() {
        let mut fleet = FleetState::default();
        assert!(matches!(
            fleet.route_mut(VehicleId(9)),
            Err(DispatchError::UnknownVehicle(VehicleId(9)))
        ));
    }
}
