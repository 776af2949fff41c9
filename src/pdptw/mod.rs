//! Flat array representation of single- and multi-vehicle PDPTW instances,
//! plus the feasibility arithmetic every solver result is checked against.

use std::fmt;
use ndarray::Array2;

use crate::data::{Loc, Time, Vehicle};

pub mod convert;
pub mod encode;
pub mod validate;
pub mod solve;
pub mod gen;

pub use convert::{TimeConverter, WindowError};
pub use encode::{encode_single, encode_fleet, EncodeError, IndexMapping, Stop};
pub use validate::{
    validate_inputs,
    validate_fleet_inputs,
    validate_solution,
    validate_fleet_solution,
    InvalidInput,
    InvalidSolution,
};
pub use solve::{RouteSolver, FleetSolver, Validated};

/// Travel time from a vehicle's current position to one location.
///
/// A vehicle with a committed destination may not divert, so every other
/// location is tagged `Unreachable` rather than carrying a magic huge number.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Reach {
    At(Time),
    Unreachable,
}

impl Reach {
    #[inline]
    pub fn time(self) -> Option<Time> {
        match self {
            Reach::At(t) => Some(t),
            Reach::Unreachable => None,
        }
    }

    #[inline]
    pub fn is_reachable(self) -> bool {
        self.time().is_some()
    }
}

/// Single-vehicle instance over locations `0..n`: 0 is the reference vehicle's
/// position, `n - 1` the depot, everything in between a pickup or delivery.
///
/// `release_date` is a hard lower bound on service start, `due_date` a soft
/// upper bound (lateness is penalized, not forbidden).
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemArrays {
    pub travel_time: Array2<Time>,
    pub release_date: Vec<Time>,
    pub due_date: Vec<Time>,
    pub service_time: Vec<Time>,
    /// `(pickup, delivery)` location pairs, one per unassigned parcel.
    pub service_pairs: Vec<(Loc, Loc)>,
}

impl ProblemArrays {
    #[inline]
    pub fn num_locations(&self) -> usize {
        self.release_date.len()
    }

    #[inline]
    pub fn depot(&self) -> Loc {
        self.num_locations() - 1
    }

    pub fn delivery_of(&self, pickup: Loc) -> Option<Loc> {
        self.service_pairs.iter().find(|&&(p, _)| p == pickup).map(|&(_, d)| d)
    }

    pub fn pickup_of(&self, delivery: Loc) -> Option<Loc> {
        self.service_pairs.iter().find(|&&(_, d)| d == delivery).map(|&(p, _)| p)
    }
}

/// Multi-vehicle instance: the shared location arrays plus per-vehicle state.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetArrays {
    pub base: ProblemArrays,
    /// Row per vehicle, column per location. Column 0 is always `At(0)`.
    pub vehicle_travel_time: Vec<Vec<Reach>>,
    /// Delivery locations already loaded, as `(vehicle, location)`.
    pub inventory: Vec<(Vehicle, Loc)>,
    /// Time left to finish the service in progress, 0 if idle.
    pub remaining_service_time: Vec<Time>,
    /// `None` when the vehicle is free to choose its next stop.
    pub current_destination: Vec<Option<Loc>>,
    /// Warm-start routes, present only when every vehicle's route is known.
    pub current_solutions: Option<Vec<SolutionObject>>,
}

impl FleetArrays {
    #[inline]
    pub fn num_vehicles(&self) -> usize {
        self.vehicle_travel_time.len()
    }

    pub fn inventory_of<'a>(&'a self, vehicle: Vehicle) -> impl Iterator<Item = Loc> + 'a {
        self.inventory.iter()
            .filter(move |&&(v, _)| v == vehicle)
            .map(|&(_, l)| l)
    }
}

/// One vehicle's route as returned by a solver, with the service-start time
/// the solver claims for every stop. Immutable once validated.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SolutionObject {
    pub route: Vec<Loc>,
    pub arrival_times: Vec<Time>,
    pub objective_value: Time,
}

/// First route leg points at a location the vehicle is not allowed to reach.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct UnreachableLeg {
    pub to: Loc,
}

impl fmt::Display for UnreachableLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "location {} is unreachable from the vehicle's current position", self.to)
    }
}

impl std::error::Error for UnreachableLeg {}

pub mod schedule {
    use std::cmp::max;
    use itertools::Itertools;
    use tracing::*;

    use super::*;

    fn first_leg(data: &ProblemArrays, vtt: Option<&[Reach]>, to: Loc) -> Result<Time, UnreachableLeg> {
        match vtt {
            Some(row) => row[to].time().ok_or(UnreachableLeg { to }),
            None => Ok(data.travel_time[[0, to]]),
        }
    }

    fn service_at(position: usize, loc: Loc, data: &ProblemArrays, remaining_service: Time) -> Time {
        // A vehicle mid-service is physically at route[1]; leaving it costs the
        // remaining service time, not the full tabulated one.
        if position == 1 && remaining_service > 0 {
            remaining_service
        } else {
            data.service_time[loc]
        }
    }

    /// Minimum feasible service-start time at every stop of `route`.
    ///
    /// `vtt` is the vehicle's travel-time row for the first leg; `None` falls
    /// back to the matrix row of location 0 (single-vehicle instances). The
    /// result is deterministic in its inputs, which is what lets the output
    /// validator treat it as ground truth.
    pub fn earliest_arrivals(
        route: &[Loc],
        data: &ProblemArrays,
        vtt: Option<&[Reach]>,
        remaining_service: Time,
    ) -> Result<Vec<Time>, UnreachableLeg> {
        debug_assert!(!route.is_empty());
        let mut arrival = Vec::with_capacity(route.len());
        arrival.push(0);
        for j in 1..route.len() {
            let prev = route[j - 1];
            let cur = route[j];
            let travel = if j == 1 {
                first_leg(data, vtt, cur)?
            } else {
                data.travel_time[[prev, cur]]
            };
            let leave_prev = service_at(j - 1, prev, data, remaining_service);
            let earliest = arrival[j - 1] + leave_prev + travel;
            arrival.push(max(earliest, data.release_date[cur]));
        }
        trace!(?route, ?arrival, "schedule computed");
        return Ok(arrival);
    }

    /// Sum of all travel legs of `route`, first leg taken from `vtt`.
    pub fn total_travel_time(
        route: &[Loc],
        data: &ProblemArrays,
        vtt: Option<&[Reach]>,
    ) -> Result<Time, UnreachableLeg> {
        if route.len() < 2 {
            return Ok(0);
        }
        let mut total = first_leg(data, vtt, route[1])?;
        for (&i, &j) in route[1..].iter().tuple_windows() {
            total += data.travel_time[[i, j]];
        }
        return Ok(total);
    }

    /// Accumulated positive lateness of service *completion* against the due
    /// dates, given the service-start times in `arrivals`.
    pub fn tardiness(
        route: &[Loc],
        arrivals: &[Time],
        data: &ProblemArrays,
        remaining_service: Time,
    ) -> Time {
        debug_assert_eq!(route.len(), arrivals.len());
        let mut total = 0;
        for m in 1..route.len() {
            let loc = route[m];
            let late = arrivals[m] + service_at(m, loc, data, remaining_service) - data.due_date[loc];
            if late > 0 {
                trace!(position = m, loc, late, "tardy visit");
                total += late;
            }
        }
        return total;
    }

    /// Objective of a single route: total travel time plus tardiness of the
    /// minimum feasible schedule.
    pub fn objective(
        route: &[Loc],
        data: &ProblemArrays,
        vtt: Option<&[Reach]>,
        remaining_service: Time,
    ) -> Result<Time, UnreachableLeg> {
        let arrivals = earliest_arrivals(route, data, vtt, remaining_service)?;
        let travel = total_travel_time(route, data, vtt)?;
        Ok(travel + tardiness(route, &arrivals, data, remaining_service))
    }

    /// Fleet objective: sum over the per-vehicle routes.
    pub fn fleet_objective(solutions: &[SolutionObject]) -> Time {
        solutions.iter().map(|s| s.objective_value).sum()
    }
}
