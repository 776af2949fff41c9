//! Exhaustive validation of solver inputs and solver outputs.
//!
//! Both validators fail fast: the first violated invariant is reported with
//! the offending index and the expected/actual values, and nothing after it
//! is checked. A failure here means a bug in the caller (inputs) or in the
//! solver under test (outputs); neither is recoverable by retrying.

use std::fmt;
use itertools::Itertools;
use tracing::*;

use crate::Map;
use crate::data::{Loc, Time, Vehicle};
use super::{FleetArrays, ProblemArrays, Reach, SolutionObject, schedule};

/// A malformed problem instance, diagnosed before it reaches a solver.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InvalidInput {
    EmptyMatrix,
    NotSquare { rows: usize, cols: usize },
    NegativeTravelTime { from: Loc, to: Loc, actual: Time },
    ArrayLength { array: &'static str, expected: usize, actual: usize },
    ServiceEndpoint { loc: Loc, actual: Time },
    NegativeService { loc: Loc, actual: Time },
    InvertedWindow { loc: Loc, release: Time, due: Time },
    StartWindow { release: Time, due: Time },
    PairOutOfBounds { pickup: Loc, delivery: Loc },
    PairOverlap { loc: Loc },
    NoVehicles,
    VttRowLength { vehicle: Vehicle, expected: usize, actual: usize },
    NegativeVehicleTravelTime { vehicle: Vehicle, loc: Loc, actual: Time },
    NonZeroOrigin { vehicle: Vehicle, actual: Reach },
    MissingSentinel { vehicle: Vehicle, loc: Loc },
    UnexpectedSentinel { vehicle: Vehicle, loc: Loc },
    InventoryVehicleBounds { vehicle: Vehicle, num_vehicles: usize },
    InventoryLocationBounds { vehicle: Vehicle, loc: Loc },
    InventoryPairLocation { vehicle: Vehicle, loc: Loc },
    DuplicateInventory { loc: Loc },
    NegativeRemainingService { vehicle: Vehicle, actual: Time },
    ServiceWithoutDestination { vehicle: Vehicle, remaining: Time },
    DestinationBounds { vehicle: Vehicle, loc: Loc },
    DestinationNotServiceable { vehicle: Vehicle, loc: Loc, pickup: bool, inventory: bool },
    DestinationForeignCargo { vehicle: Vehicle, loc: Loc },
    SolutionCount { expected: usize, actual: usize },
    RouteStart { vehicle: Vehicle, actual: Option<Loc> },
    RouteEnd { vehicle: Vehicle, actual: Option<Loc> },
    RouteDestinationPosition { vehicle: Vehicle, expected: Loc, actual: Option<Loc> },
    RouteMissingInventory { vehicle: Vehicle, loc: Loc },
    RouteRepeatedLocation { vehicle: Vehicle, loc: Loc },
    RouteMissingPartner { vehicle: Vehicle, loc: Loc, partner: Loc },
    RouteForeignLocation { vehicle: Vehicle, loc: Loc },
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use InvalidInput::*;
        match *self {
            EmptyMatrix => write!(f, "travel time matrix is empty"),
            NotSquare { rows, cols } => write!(f, "travel time matrix is {}x{}, expected square", rows, cols),
            NegativeTravelTime { from, to, actual } =>
                write!(f, "travel time [{}][{}] is negative: {}", from, to, actual),
            ArrayLength { array, expected, actual } =>
                write!(f, "{} has length {}, expected {}", array, actual, expected),
            ServiceEndpoint { loc, actual } =>
                write!(f, "service time at endpoint location {} is {}, expected 0", loc, actual),
            NegativeService { loc, actual } =>
                write!(f, "service time at location {} is negative: {}", loc, actual),
            InvertedWindow { loc, release, due } =>
                write!(f, "time window of location {} is inverted: release {} > due {}", loc, release, due),
            StartWindow { release, due } =>
                write!(f, "window of the start location is [{}, {}], expected [0, 0]", release, due),
            PairOutOfBounds { pickup, delivery } =>
                write!(f, "service pair ({}, {}) is not strictly inside the location range", pickup, delivery),
            PairOverlap { loc } =>
                write!(f, "location {} appears in more than one service pair", loc),
            NoVehicles => write!(f, "instance has no vehicles"),
            VttRowLength { vehicle, expected, actual } =>
                write!(f, "vehicle {} travel time row has length {}, expected {}", vehicle, actual, expected),
            NegativeVehicleTravelTime { vehicle, loc, actual } =>
                write!(f, "vehicle {} travel time to location {} is negative: {}", vehicle, loc, actual),
            NonZeroOrigin { vehicle, actual } =>
                write!(f, "vehicle {} travel time to location 0 is {:?}, expected At(0)", vehicle, actual),
            MissingSentinel { vehicle, loc } =>
                write!(f, "vehicle {} is committed elsewhere but location {} is not marked unreachable", vehicle, loc),
            UnexpectedSentinel { vehicle, loc } =>
                write!(f, "location {} is marked unreachable for vehicle {} without reason", loc, vehicle),
            InventoryVehicleBounds { vehicle, num_vehicles } =>
                write!(f, "inventory names vehicle {} but the fleet has {} vehicles", vehicle, num_vehicles),
            InventoryLocationBounds { vehicle, loc } =>
                write!(f, "inventory of vehicle {} names location {} outside the interior range", vehicle, loc),
            InventoryPairLocation { vehicle, loc } =>
                write!(f, "inventory of vehicle {} names location {} which belongs to an unassigned parcel", vehicle, loc),
            DuplicateInventory { loc } =>
                write!(f, "location {} appears twice in the inventory", loc),
            NegativeRemainingService { vehicle, actual } =>
                write!(f, "remaining service time of vehicle {} is negative: {}", vehicle, actual),
            ServiceWithoutDestination { vehicle, remaining } =>
                write!(f, "vehicle {} has {} service time remaining but no destination", vehicle, remaining),
            DestinationBounds { vehicle, loc } =>
                write!(f, "destination {} of vehicle {} is not an interior location", loc, vehicle),
            DestinationNotServiceable { vehicle, loc, pickup, inventory } => write!(
                f,
                "destination {} of vehicle {} must be exactly one of an available pickup or a loaded delivery (pickup: {}, inventory: {})",
                loc, vehicle, pickup, inventory
            ),
            DestinationForeignCargo { vehicle, loc } =>
                write!(f, "destination {} of vehicle {} is loaded on another vehicle", loc, vehicle),
            SolutionCount { expected, actual } =>
                write!(f, "got {} routes, expected one per vehicle ({})", actual, expected),
            RouteStart { vehicle, actual } =>
                write!(f, "route of vehicle {} starts at {:?}, expected location 0", vehicle, actual),
            RouteEnd { vehicle, actual } =>
                write!(f, "route of vehicle {} ends at {:?}, expected the depot", vehicle, actual),
            RouteDestinationPosition { vehicle, expected, actual } =>
                write!(f, "route of vehicle {} must visit its destination {} second, found {:?}", vehicle, expected, actual),
            RouteMissingInventory { vehicle, loc } =>
                write!(f, "route of vehicle {} misses loaded delivery {}", vehicle, loc),
            RouteRepeatedLocation { vehicle, loc } =>
                write!(f, "route of vehicle {} visits location {} more than once", vehicle, loc),
            RouteMissingPartner { vehicle, loc, partner } =>
                write!(f, "route of vehicle {} visits {} without its partner {}", vehicle, loc, partner),
            RouteForeignLocation { vehicle, loc } =>
                write!(f, "route of vehicle {} visits {} which is neither a pair location nor its cargo", vehicle, loc),
        }
    }
}

impl std::error::Error for InvalidInput {}

/// An infeasible or mis-priced solution returned by a solver.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InvalidSolution {
    SolutionCount { expected: usize, actual: usize },
    RouteStart { vehicle: Vehicle, actual: Option<Loc> },
    RouteEnd { vehicle: Vehicle, actual: Option<Loc> },
    VisitCount { expected: usize, actual: usize },
    MissingLocation { loc: Loc },
    RepeatedLocation { loc: Loc },
    DestinationPosition { vehicle: Vehicle, expected: Loc, actual: Option<Loc> },
    MissingInventory { vehicle: Vehicle, loc: Loc },
    DeliveryBeforePickup { vehicle: Vehicle, pickup: Loc, delivery: Loc },
    MissingDelivery { vehicle: Vehicle, pickup: Loc, delivery: Loc },
    ArrivalLength { vehicle: Vehicle, expected: usize, actual: usize },
    NonZeroStart { vehicle: Vehicle, actual: Time },
    OptimisticArrival { vehicle: Vehicle, position: usize, claimed: Time, minimum: Time },
    WrongObjective { vehicle: Vehicle, claimed: Time, actual: Time },
    Unreachable { vehicle: Vehicle, to: Loc },
}

impl fmt::Display for InvalidSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use InvalidSolution::*;
        match *self {
            SolutionCount { expected, actual } =>
                write!(f, "solver returned {} routes, expected one per vehicle ({})", actual, expected),
            RouteStart { vehicle, actual } =>
                write!(f, "route of vehicle {} starts at {:?}, expected location 0", vehicle, actual),
            RouteEnd { vehicle, actual } =>
                write!(f, "route of vehicle {} ends at {:?}, expected the depot", vehicle, actual),
            VisitCount { expected, actual } =>
                write!(f, "routes visit {} interior locations in total, expected {}", actual, expected),
            MissingLocation { loc } =>
                write!(f, "location {} is not visited by any route", loc),
            RepeatedLocation { loc } =>
                write!(f, "location {} is visited more than once", loc),
            DestinationPosition { vehicle, expected, actual } =>
                write!(f, "vehicle {} must service its destination {} first, found {:?}", vehicle, expected, actual),
            MissingInventory { vehicle, loc } =>
                write!(f, "route of vehicle {} misses loaded delivery {}", vehicle, loc),
            DeliveryBeforePickup { vehicle, pickup, delivery } =>
                write!(f, "route of vehicle {} visits delivery {} before pickup {}", vehicle, delivery, pickup),
            MissingDelivery { vehicle, pickup, delivery } =>
                write!(f, "route of vehicle {} picks up {} but never delivers {}", vehicle, pickup, delivery),
            ArrivalLength { vehicle, expected, actual } =>
                write!(f, "vehicle {} claims {} arrival times for {} stops", vehicle, actual, expected),
            NonZeroStart { vehicle, actual } =>
                write!(f, "vehicle {} claims start time {}, expected 0", vehicle, actual),
            OptimisticArrival { vehicle, position, claimed, minimum } => write!(
                f,
                "vehicle {} claims arrival {} at route position {}, below the feasible minimum {}",
                vehicle, claimed, position, minimum
            ),
            WrongObjective { vehicle, claimed, actual } =>
                write!(f, "vehicle {} claims objective {}, recomputed {}", vehicle, claimed, actual),
            Unreachable { vehicle, to } =>
                write!(f, "route of vehicle {} opens with unreachable location {}", vehicle, to),
        }
    }
}

impl std::error::Error for InvalidSolution {}

/// Checks that a single-vehicle instance is well-formed.
#[instrument(level = "debug", skip(data))]
pub fn validate_inputs(data: &ProblemArrays) -> Result<(), InvalidInput> {
    use InvalidInput::*;
    let (rows, cols) = data.travel_time.dim();
    if rows == 0 {
        return Err(EmptyMatrix);
    }
    if rows != cols {
        return Err(NotSquare { rows, cols });
    }
    let n = rows;
    for ((i, j), &t) in data.travel_time.indexed_iter() {
        if t < 0 {
            return Err(NegativeTravelTime { from: i, to: j, actual: t });
        }
    }

    let lengths = [
        ("release_date", data.release_date.len()),
        ("due_date", data.due_date.len()),
        ("service_time", data.service_time.len()),
    ];
    for &(array, len) in &lengths {
        if len != n {
            return Err(ArrayLength { array, expected: n, actual: len });
        }
    }

    for &loc in &[0, n - 1] {
        if data.service_time[loc] != 0 {
            return Err(ServiceEndpoint { loc, actual: data.service_time[loc] });
        }
    }
    for (loc, &s) in data.service_time.iter().enumerate() {
        if s < 0 {
            return Err(NegativeService { loc, actual: s });
        }
    }

    for loc in 0..n {
        if data.release_date[loc] > data.due_date[loc] {
            return Err(InvertedWindow { loc, release: data.release_date[loc], due: data.due_date[loc] });
        }
    }
    if data.release_date[0] != 0 || data.due_date[0] != 0 {
        return Err(StartWindow { release: data.release_date[0], due: data.due_date[0] });
    }

    let mut paired: Map<Loc, ()> = Map::default();
    for &(pickup, delivery) in &data.service_pairs {
        for &loc in &[pickup, delivery] {
            if loc == 0 || loc >= n - 1 {
                return Err(PairOutOfBounds { pickup, delivery });
            }
            if paired.insert(loc, ()).is_some() {
                return Err(PairOverlap { loc });
            }
        }
    }
    return Ok(());
}

fn is_pair_location(data: &ProblemArrays, loc: Loc) -> bool {
    data.service_pairs.iter().any(|&(p, d)| p == loc || d == loc)
}

/// Checks that a multi-vehicle instance is well-formed, including the
/// per-vehicle state and any warm-start routes.
#[instrument(level = "debug", skip(fleet))]
pub fn validate_fleet_inputs(fleet: &FleetArrays) -> Result<(), InvalidInput> {
    use InvalidInput::*;
    validate_inputs(&fleet.base)?;
    let n = fleet.base.num_locations();
    let depot = fleet.base.depot();

    let num_vehicles = fleet.vehicle_travel_time.len();
    if num_vehicles == 0 {
        return Err(NoVehicles);
    }
    let lengths = [
        ("remaining_service_time", fleet.remaining_service_time.len()),
        ("current_destination", fleet.current_destination.len()),
    ];
    for &(array, len) in &lengths {
        if len != num_vehicles {
            return Err(ArrayLength { array, expected: num_vehicles, actual: len });
        }
    }

    for (vehicle, row) in fleet.vehicle_travel_time.iter().enumerate() {
        if row.len() != n {
            return Err(VttRowLength { vehicle, expected: n, actual: row.len() });
        }
        if row[0] != Reach::At(0) {
            return Err(NonZeroOrigin { vehicle, actual: row[0] });
        }
        let destination = fleet.current_destination[vehicle];
        for (loc, &r) in row.iter().enumerate().skip(1) {
            match (destination, r) {
                (Some(d), Reach::At(t)) => {
                    if loc != d {
                        return Err(MissingSentinel { vehicle, loc });
                    }
                    if t < 0 {
                        return Err(NegativeVehicleTravelTime { vehicle, loc, actual: t });
                    }
                }
                (Some(d), Reach::Unreachable) => {
                    if loc == d {
                        return Err(UnexpectedSentinel { vehicle, loc });
                    }
                }
                (None, Reach::At(t)) => {
                    if t < 0 {
                        return Err(NegativeVehicleTravelTime { vehicle, loc, actual: t });
                    }
                }
                (None, Reach::Unreachable) => {
                    return Err(UnexpectedSentinel { vehicle, loc });
                }
            }
        }
    }

    let mut seen_inventory: Map<Loc, ()> = Map::default();
    for &(vehicle, loc) in &fleet.inventory {
        if vehicle >= num_vehicles {
            return Err(InventoryVehicleBounds { vehicle, num_vehicles });
        }
        if loc == 0 || loc >= depot {
            return Err(InventoryLocationBounds { vehicle, loc });
        }
        if is_pair_location(&fleet.base, loc) {
            return Err(InventoryPairLocation { vehicle, loc });
        }
        if seen_inventory.insert(loc, ()).is_some() {
            return Err(DuplicateInventory { loc });
        }
    }

    for (vehicle, &remaining) in fleet.remaining_service_time.iter().enumerate() {
        if remaining < 0 {
            return Err(NegativeRemainingService { vehicle, actual: remaining });
        }
        if remaining > 0 && fleet.current_destination[vehicle].is_none() {
            return Err(ServiceWithoutDestination { vehicle, remaining });
        }
    }

    for (vehicle, &destination) in fleet.current_destination.iter().enumerate() {
        let d = match destination {
            None => continue,
            Some(d) => d,
        };
        if d == 0 || d >= depot {
            return Err(DestinationBounds { vehicle, loc: d });
        }
        let pickup = fleet.base.service_pairs.iter().any(|&(p, _)| p == d);
        let inventory = fleet.inventory.iter().any(|&(_, l)| l == d);
        if pickup == inventory {
            return Err(DestinationNotServiceable { vehicle, loc: d, pickup, inventory });
        }
        if inventory && !fleet.inventory.contains(&(vehicle, d)) {
            return Err(DestinationForeignCargo { vehicle, loc: d });
        }
    }

    if let Some(solutions) = &fleet.current_solutions {
        if solutions.len() != num_vehicles {
            return Err(SolutionCount { expected: num_vehicles, actual: solutions.len() });
        }
        for (vehicle, sol) in solutions.iter().enumerate() {
            validate_warm_start_route(fleet, vehicle, &sol.route)?;
        }
    }
    debug!(n, num_vehicles, "inputs valid");
    return Ok(());
}

fn validate_warm_start_route(fleet: &FleetArrays, vehicle: Vehicle, route: &[Loc]) -> Result<(), InvalidInput> {
    use InvalidInput::*;
    let depot = fleet.base.depot();
    if route.first() != Some(&0) {
        return Err(RouteStart { vehicle, actual: route.first().copied() });
    }
    if route.last() != Some(&depot) {
        return Err(RouteEnd { vehicle, actual: route.last().copied() });
    }
    if let Some(d) = fleet.current_destination[vehicle] {
        if route.get(1) != Some(&d) {
            return Err(RouteDestinationPosition { vehicle, expected: d, actual: route.get(1).copied() });
        }
    }
    let interior = &route[1..route.len() - 1];
    for loc in fleet.inventory_of(vehicle) {
        if !interior.contains(&loc) {
            return Err(RouteMissingInventory { vehicle, loc });
        }
    }
    let mut seen: Map<Loc, ()> = Map::default();
    for &loc in interior {
        if seen.insert(loc, ()).is_some() {
            return Err(RouteRepeatedLocation { vehicle, loc });
        }
    }
    for &loc in interior {
        if fleet.inventory.contains(&(vehicle, loc)) {
            continue;
        }
        let partner = fleet.base.delivery_of(loc).or_else(|| fleet.base.pickup_of(loc));
        match partner {
            None => return Err(RouteForeignLocation { vehicle, loc }),
            Some(partner) => {
                if !interior.contains(&partner) {
                    return Err(RouteMissingPartner { vehicle, loc, partner });
                }
            }
        }
    }
    return Ok(());
}

struct RouteState<'a> {
    vehicle: Vehicle,
    vtt: Option<&'a [Reach]>,
    remaining_service: Time,
    destination: Option<Loc>,
    inventory: Vec<Loc>,
}

fn validate_route(
    data: &ProblemArrays,
    sol: &SolutionObject,
    state: &RouteState,
) -> Result<(), InvalidSolution> {
    use InvalidSolution::*;
    let vehicle = state.vehicle;
    let depot = data.depot();

    if sol.route.first() != Some(&0) {
        return Err(RouteStart { vehicle, actual: sol.route.first().copied() });
    }
    if sol.route.last() != Some(&depot) {
        return Err(RouteEnd { vehicle, actual: sol.route.last().copied() });
    }
    if let Some(d) = state.destination {
        if sol.route.get(1) != Some(&d) {
            return Err(DestinationPosition { vehicle, expected: d, actual: sol.route.get(1).copied() });
        }
    }
    for &loc in &state.inventory {
        if !sol.route.contains(&loc) {
            return Err(MissingInventory { vehicle, loc });
        }
    }

    let positions: Map<Loc, usize> = sol.route.iter().enumerate().map(|(m, &loc)| (loc, m)).collect();
    for &(pickup, delivery) in &data.service_pairs {
        let p = match positions.get(&pickup) {
            None => continue, // some other vehicle's job; the partition check covers it
            Some(&p) => p,
        };
        match positions.get(&delivery) {
            None => return Err(MissingDelivery { vehicle, pickup, delivery }),
            Some(&d) => {
                if d < p {
                    return Err(DeliveryBeforePickup { vehicle, pickup, delivery });
                }
            }
        }
    }

    if sol.arrival_times.len() != sol.route.len() {
        return Err(ArrivalLength { vehicle, expected: sol.route.len(), actual: sol.arrival_times.len() });
    }
    if sol.arrival_times[0] != 0 {
        return Err(NonZeroStart { vehicle, actual: sol.arrival_times[0] });
    }
    let minimum = schedule::earliest_arrivals(&sol.route, data, state.vtt, state.remaining_service)
        .map_err(|e| Unreachable { vehicle, to: e.to })?;
    for (position, (&claimed, &minimum)) in sol.arrival_times.iter().zip(minimum.iter()).enumerate() {
        if claimed < minimum {
            return Err(OptimisticArrival { vehicle, position, claimed, minimum });
        }
    }
    let travel = schedule::total_travel_time(&sol.route, data, state.vtt)
        .map_err(|e| Unreachable { vehicle, to: e.to })?;
    let actual = travel + schedule::tardiness(&sol.route, &minimum, data, state.remaining_service);
    if sol.objective_value != actual {
        return Err(WrongObjective { vehicle, claimed: sol.objective_value, actual });
    }
    return Ok(());
}

fn validate_partition<'a>(
    data: &ProblemArrays,
    routes: impl Iterator<Item = &'a [Loc]>,
) -> Result<(), InvalidSolution> {
    use InvalidSolution::*;
    let n = data.num_locations();
    let mut visits: Map<Loc, usize> = Map::default();
    let mut interior_visits = 0;
    let mut num_routes = 0;
    for route in routes {
        num_routes += 1;
        for &loc in route {
            *visits.entry(loc).or_insert(0) += 1;
            if loc != 0 && loc != n - 1 {
                interior_visits += 1;
            }
        }
    }
    if interior_visits != n - 2 {
        return Err(VisitCount { expected: n - 2, actual: interior_visits });
    }
    for loc in 0..n {
        // the endpoints appear exactly once per route, as that route's first and
        // last stop; any extra visit is a mid-route revisit
        let expected = if loc == 0 || loc == n - 1 { num_routes } else { 1 };
        match visits.get(&loc) {
            None => return Err(MissingLocation { loc }),
            Some(&count) => {
                if count != expected {
                    return Err(RepeatedLocation { loc });
                }
            }
        }
    }
    return Ok(());
}

/// Checks a single-vehicle solution: feasibility of the route and the claimed
/// arrival times, and correctness of the claimed objective value.
#[instrument(level = "debug", skip(data, sol))]
pub fn validate_solution(data: &ProblemArrays, sol: &SolutionObject) -> Result<(), InvalidSolution> {
    let state = RouteState {
        vehicle: 0,
        vtt: None,
        remaining_service: 0,
        destination: None,
        inventory: Vec::new(),
    };
    validate_route(data, sol, &state)?;
    validate_partition(data, std::iter::once(sol.route.as_slice()))?;
    return Ok(());
}

/// Checks a fleet solution: the global partition of locations over routes,
/// per-vehicle commitments, pickup-before-delivery ordering, claimed arrival
/// times and claimed objective values.
#[instrument(level = "debug", skip(fleet, solutions))]
pub fn validate_fleet_solution(fleet: &FleetArrays, solutions: &[SolutionObject]) -> Result<(), InvalidSolution> {
    let num_vehicles = fleet.num_vehicles();
    if solutions.len() != num_vehicles {
        return Err(InvalidSolution::SolutionCount { expected: num_vehicles, actual: solutions.len() });
    }
    for (vehicle, sol) in solutions.iter().enumerate() {
        let state = RouteState {
            vehicle,
            vtt: Some(&fleet.vehicle_travel_time[vehicle]),
            remaining_service: fleet.remaining_service_time[vehicle],
            destination: fleet.current_destination[vehicle],
            inventory: fleet.inventory_of(vehicle).collect_vec(),
        };
        validate_route(&fleet.base, sol, &state)?;
    }
    validate_partition(&fleet.base, solutions.iter().map(|s| s.route.as_slice()))?;
    debug!(num_vehicles, "solution valid");
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::*;
    use crate::pdptw::{TimeConverter, encode_fleet, schedule};
    use ndarray::arr2;

    fn scenario() -> ProblemArrays {
        // 0 = start, 1 = pickup, 2 = delivery, 3 = depot on a line, unit spacing.
        ProblemArrays {
            travel_time: arr2(&[
                [0, 1, 2, 3],
                [1, 0, 1, 2],
                [2, 1, 0, 1],
                [3, 2, 1, 0],
            ]),
            release_date: vec![0, 0, 0, 0],
            due_date: vec![0, 100, 100, 100],
            service_time: vec![0, 5, 5, 0],
            service_pairs: vec![(1, 2)],
        }
    }

    fn solution_for(data: &ProblemArrays, route: Vec<Loc>) -> SolutionObject {
        let arrival_times = schedule::earliest_arrivals(&route, data, None, 0).unwrap();
        let objective_value = schedule::objective(&route, data, None, 0).unwrap();
        SolutionObject { route, arrival_times, objective_value }
    }

    #[test]
    fn scenario_accepts_pickup_first() {
        let data = scenario();
        validate_inputs(&data).unwrap();
        let sol = solution_for(&data, vec![0, 1, 2, 3]);
        // three unit legs, zero tardiness
        assert_eq!(sol.objective_value, 3);
        validate_solution(&data, &sol).unwrap();
    }

    #[test]
    fn scenario_rejects_delivery_first() {
        let data = scenario();
        let sol = solution_for(&data, vec![0, 2, 1, 3]);
        let err = validate_solution(&data, &sol).unwrap_err();
        assert_eq!(err, InvalidSolution::DeliveryBeforePickup { vehicle: 0, pickup: 1, delivery: 2 });
    }

    #[test]
    fn rejects_mid_route_endpoint_revisits() {
        let data = scenario();
        // depot entered at position 1, departed, then revisited
        let sol = solution_for(&data, vec![0, 3, 1, 2, 3]);
        assert_eq!(
            validate_solution(&data, &sol).unwrap_err(),
            InvalidSolution::RepeatedLocation { loc: 3 }
        );
        // start location revisited mid-route
        let sol = solution_for(&data, vec![0, 1, 0, 2, 3]);
        assert_eq!(
            validate_solution(&data, &sol).unwrap_err(),
            InvalidSolution::RepeatedLocation { loc: 0 }
        );
    }

    #[test]
    fn rejects_non_square_matrix() {
        let mut data = scenario();
        data.travel_time = ndarray::Array2::zeros((4, 3));
        assert_eq!(validate_inputs(&data).unwrap_err(), InvalidInput::NotSquare { rows: 4, cols: 3 });
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut data = scenario();
        data.due_date.pop();
        assert_eq!(
            validate_inputs(&data).unwrap_err(),
            InvalidInput::ArrayLength { array: "due_date", expected: 4, actual: 3 }
        );
    }

    #[test]
    fn rejects_nonzero_endpoint_service() {
        let mut data = scenario();
        data.service_time[3] = 2;
        assert_eq!(
            validate_inputs(&data).unwrap_err(),
            InvalidInput::ServiceEndpoint { loc: 3, actual: 2 }
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let mut data = scenario();
        data.release_date[2] = 101;
        assert_eq!(
            validate_inputs(&data).unwrap_err(),
            InvalidInput::InvertedWindow { loc: 2, release: 101, due: 100 }
        );
    }

    #[test]
    fn rejects_nonzero_start_window() {
        let mut data = scenario();
        data.due_date[0] = 10;
        assert_eq!(
            validate_inputs(&data).unwrap_err(),
            InvalidInput::StartWindow { release: 0, due: 10 }
        );
    }

    #[test]
    fn rejects_pair_at_endpoint() {
        let mut data = scenario();
        data.service_pairs = vec![(1, 3)];
        assert_eq!(
            validate_inputs(&data).unwrap_err(),
            InvalidInput::PairOutOfBounds { pickup: 1, delivery: 3 }
        );
    }

    #[test]
    fn rejects_overlapping_pairs() {
        let mut data = scenario();
        data.service_pairs = vec![(1, 2), (2, 1)];
        assert_eq!(validate_inputs(&data).unwrap_err(), InvalidInput::PairOverlap { loc: 2 });
    }

    fn fleet_fixture() -> FleetArrays {
        let snapshot = FleetSnapshot {
            time: 0.0,
            depot: Point::new(10.0, 0.0),
            vehicles: vec![
                VehicleSnapshot::idle_at(Point::new(0.0, 0.0), 1.0, TimeWindow::new(0.0, 1000.0)),
                {
                    let mut v = VehicleSnapshot::idle_at(Point::new(2.0, 0.0), 1.0, TimeWindow::new(0.0, 1000.0));
                    v.cargo.push(Parcel {
                        id: 20,
                        pickup: Point::new(9.0, 9.0),
                        delivery: Point::new(2.0, 0.0),
                        pickup_tw: TimeWindow::new(0.0, 100.0),
                        delivery_tw: TimeWindow::new(0.0, 100.0),
                        pickup_duration: 0.0,
                        delivery_duration: 2.0,
                    });
                    v.destination = Some(20);
                    v.remaining_service_time = 3.0;
                    v
                },
            ],
            available: vec![Parcel {
                id: 10,
                pickup: Point::new(1.0, 0.0),
                delivery: Point::new(4.0, 0.0),
                pickup_tw: TimeWindow::new(0.0, 100.0),
                delivery_tw: TimeWindow::new(0.0, 100.0),
                pickup_duration: 5.0,
                delivery_duration: 5.0,
            }],
        };
        let (arrays, _) = encode_fleet(&snapshot, &TimeConverter::identity(0.0)).unwrap();
        arrays
    }

    fn fleet_solution(fleet: &FleetArrays) -> Vec<SolutionObject> {
        // locations: 1 = pickup(10), 2 = delivery(10), 3 = delivery(20), 4 = depot
        let routes = vec![vec![0, 1, 2, 4], vec![0, 3, 4]];
        routes.into_iter()
            .enumerate()
            .map(|(v, route)| {
                let vtt = Some(fleet.vehicle_travel_time[v].as_slice());
                let remaining = fleet.remaining_service_time[v];
                let arrival_times = schedule::earliest_arrivals(&route, &fleet.base, vtt, remaining).unwrap();
                let objective_value = schedule::objective(&route, &fleet.base, vtt, remaining).unwrap();
                SolutionObject { route, arrival_times, objective_value }
            })
            .collect()
    }

    #[test]
    fn fleet_fixture_is_valid() {
        let fleet = fleet_fixture();
        validate_fleet_inputs(&fleet).unwrap();
        let sols = fleet_solution(&fleet);
        validate_fleet_solution(&fleet, &sols).unwrap();
    }

    #[test]
    fn rejects_missing_sentinel() {
        let mut fleet = fleet_fixture();
        // vehicle 1 is committed to location 3, location 2 must be unreachable
        fleet.vehicle_travel_time[1][2] = Reach::At(5);
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::MissingSentinel { vehicle: 1, loc: 2 }
        );
    }

    #[test]
    fn rejects_sentinel_for_free_vehicle() {
        let mut fleet = fleet_fixture();
        fleet.vehicle_travel_time[0][2] = Reach::Unreachable;
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::UnexpectedSentinel { vehicle: 0, loc: 2 }
        );
    }

    #[test]
    fn rejects_nonzero_origin_column() {
        let mut fleet = fleet_fixture();
        fleet.vehicle_travel_time[0][0] = Reach::At(1);
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::NonZeroOrigin { vehicle: 0, actual: Reach::At(1) }
        );
    }

    #[test]
    fn rejects_inventory_on_pair_location() {
        let mut fleet = fleet_fixture();
        fleet.inventory.push((0, 1));
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::InventoryPairLocation { vehicle: 0, loc: 1 }
        );
    }

    #[test]
    fn rejects_duplicate_inventory() {
        let mut fleet = fleet_fixture();
        fleet.inventory.push((0, 3));
        assert_eq!(validate_fleet_inputs(&fleet).unwrap_err(), InvalidInput::DuplicateInventory { loc: 3 });
    }

    #[test]
    fn rejects_service_without_destination() {
        let mut fleet = fleet_fixture();
        fleet.current_destination[1] = None;
        // sentinel placement is checked first, so free the row too
        let n = fleet.base.num_locations();
        fleet.vehicle_travel_time[1] = (0..n).map(|j| Reach::At(j as Time)).collect();
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::ServiceWithoutDestination { vehicle: 1, remaining: 3 }
        );
    }

    #[test]
    fn rejects_destination_that_is_neither_pickup_nor_cargo() {
        let mut fleet = fleet_fixture();
        // location 2 is the delivery of an unassigned parcel: not serviceable first
        fleet.current_destination[1] = Some(2);
        let n = fleet.base.num_locations();
        fleet.vehicle_travel_time[1] = (0..n)
            .map(|j| if j == 0 { Reach::At(0) } else if j == 2 { Reach::At(1) } else { Reach::Unreachable })
            .collect();
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::DestinationNotServiceable { vehicle: 1, loc: 2, pickup: false, inventory: false }
        );
    }

    #[test]
    fn rejects_destination_in_foreign_cargo() {
        let mut fleet = fleet_fixture();
        // vehicle 0 claims the delivery loaded on vehicle 1
        fleet.current_destination[0] = Some(3);
        let n = fleet.base.num_locations();
        fleet.vehicle_travel_time[0] = (0..n)
            .map(|j| if j == 0 { Reach::At(0) } else if j == 3 { Reach::At(1) } else { Reach::Unreachable })
            .collect();
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::DestinationForeignCargo { vehicle: 0, loc: 3 }
        );
    }

    #[test]
    fn rejects_warm_start_without_destination_second() {
        let mut fleet = fleet_fixture();
        let sols = fleet_solution(&fleet);
        let mut bad = sols.clone();
        bad[1].route = vec![0, 4]; // destination 3 missing
        fleet.current_solutions = Some(bad);
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::RouteDestinationPosition { vehicle: 1, expected: 3, actual: Some(4) }
        );
    }

    #[test]
    fn rejects_warm_start_with_unpaired_pickup() {
        let mut fleet = fleet_fixture();
        let mut sols = fleet_solution(&fleet);
        sols[0].route = vec![0, 1, 4]; // pickup 1 without delivery 2
        fleet.current_solutions = Some(sols);
        assert_eq!(
            validate_fleet_inputs(&fleet).unwrap_err(),
            InvalidInput::RouteMissingPartner { vehicle: 0, loc: 1, partner: 2 }
        );
    }

    #[test]
    fn rejects_partition_violations() {
        let fleet = fleet_fixture();
        let mut sols = fleet_solution(&fleet);
        // vehicle 0 drops the delivery of parcel 10
        sols[0].route = vec![0, 1, 4];
        sols[0].arrival_times = schedule::earliest_arrivals(
            &sols[0].route, &fleet.base, Some(&fleet.vehicle_travel_time[0]), 0,
        ).unwrap();
        sols[0].objective_value = schedule::objective(
            &sols[0].route, &fleet.base, Some(&fleet.vehicle_travel_time[0]), 0,
        ).unwrap();
        assert_eq!(
            validate_fleet_solution(&fleet, &sols).unwrap_err(),
            InvalidSolution::MissingDelivery { vehicle: 0, pickup: 1, delivery: 2 }
        );

        // both vehicles visit location 2
        let mut sols = fleet_solution(&fleet);
        sols[1].route = vec![0, 3, 2, 4];
        sols[1].arrival_times = schedule::earliest_arrivals(
            &sols[1].route, &fleet.base, Some(&fleet.vehicle_travel_time[1]), fleet.remaining_service_time[1],
        ).unwrap();
        sols[1].objective_value = schedule::objective(
            &sols[1].route, &fleet.base, Some(&fleet.vehicle_travel_time[1]), fleet.remaining_service_time[1],
        ).unwrap();
        assert_eq!(
            validate_fleet_solution(&fleet, &sols).unwrap_err(),
            InvalidSolution::VisitCount { expected: 3, actual: 4 }
        );
    }

    #[test]
    fn rejects_optimistic_arrival() {
        let fleet = fleet_fixture();
        let mut sols = fleet_solution(&fleet);
        sols[0].arrival_times[2] -= 1;
        assert!(matches!(
            validate_fleet_solution(&fleet, &sols).unwrap_err(),
            InvalidSolution::OptimisticArrival { vehicle: 0, position: 2, .. }
        ));
    }

    #[test]
    fn accepts_lazy_but_honest_arrivals() {
        // claimed arrivals may exceed the minimum, the objective may not change
        let fleet = fleet_fixture();
        let mut sols = fleet_solution(&fleet);
        sols[0].arrival_times[2] += 5;
        validate_fleet_solution(&fleet, &sols).unwrap();
    }

    #[test]
    fn rejects_wrong_objective() {
        let fleet = fleet_fixture();
        let mut sols = fleet_solution(&fleet);
        sols[1].objective_value += 1;
        assert!(matches!(
            validate_fleet_solution(&fleet, &sols).unwrap_err(),
            InvalidSolution::WrongObjective { vehicle: 1, .. }
        ));
    }

    #[test]
    fn rejects_missing_inventory_visit() {
        let fleet = fleet_fixture();
        let mut sols = fleet_solution(&fleet);
        // vehicle 1 skips its loaded delivery and vehicle 0 takes it instead
        sols[0].route = vec![0, 1, 2, 3, 4];
        sols[0].arrival_times = schedule::earliest_arrivals(
            &sols[0].route, &fleet.base, Some(&fleet.vehicle_travel_time[0]), 0,
        ).unwrap();
        sols[0].objective_value = schedule::objective(
            &sols[0].route, &fleet.base, Some(&fleet.vehicle_travel_time[0]), 0,
        ).unwrap();
        sols[1].route = vec![0, 4];
        sols[1].arrival_times = vec![0, 8];
        sols[1].objective_value = 8;
        assert!(matches!(
            validate_fleet_solution(&fleet, &sols).unwrap_err(),
            InvalidSolution::DestinationPosition { vehicle: 1, expected: 3, .. }
                | InvalidSolution::MissingInventory { vehicle: 1, loc: 3 }
        ));
    }

    #[test]
    fn rejects_wrong_route_count() {
        let fleet = fleet_fixture();
        let sols = fleet_solution(&fleet);
        assert_eq!(
            validate_fleet_solution(&fleet, &sols[..1]).unwrap_err(),
            InvalidSolution::SolutionCount { expected: 2, actual: 1 }
        );
    }
}
