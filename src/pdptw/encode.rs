//! Builds the flat array representation from a domain snapshot, together with
//! the index mapping needed to decode a solver's answer back into parcels.
//!
//! Index layout, which every other component relies on: location 0 is the
//! reference vehicle's position, pickups of the `k` unassigned parcels take
//! `1..=k`, their deliveries `k+1..=2k` (delivery = pickup + k), deliveries of
//! parcels already in cargo come next, and `n - 1` is the depot.

use std::fmt;
use itertools::Itertools;
use ndarray::Array2;
use tracing::*;

use crate::{Map, Set};
use crate::data::*;
use super::{ProblemArrays, FleetArrays, Reach, SolutionObject, TimeConverter, WindowError, schedule};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Stop {
    Pickup(ParcelId),
    Delivery(ParcelId),
}

impl Stop {
    #[inline]
    pub fn parcel(self) -> ParcelId {
        match self {
            Stop::Pickup(id) | Stop::Delivery(id) => id,
        }
    }
}

/// Bidirectional mapping between instance locations and domain parcels.
#[derive(Debug, Clone)]
pub struct IndexMapping {
    stops: Vec<Stop>, // stops[i - 1] is location i, for interior locations only
    pickup_loc: Map<ParcelId, Loc>,
    delivery_loc: Map<ParcelId, Loc>,
}

impl IndexMapping {
    fn new(available: &[Parcel], cargo: &[&Parcel]) -> Self {
        let k = available.len();
        let mut stops = Vec::with_capacity(2 * k + cargo.len());
        stops.extend(available.iter().map(|p| Stop::Pickup(p.id)));
        stops.extend(available.iter().map(|p| Stop::Delivery(p.id)));
        stops.extend(cargo.iter().map(|p| Stop::Delivery(p.id)));

        let mut pickup_loc = Map::default();
        let mut delivery_loc = Map::default();
        for (m, stop) in stops.iter().enumerate() {
            let loc = m + 1;
            match *stop {
                Stop::Pickup(id) => { pickup_loc.insert(id, loc); }
                Stop::Delivery(id) => { delivery_loc.insert(id, loc); }
            }
        }
        return IndexMapping { stops, pickup_loc, delivery_loc };
    }

    #[inline]
    pub fn num_locations(&self) -> usize {
        self.stops.len() + 2
    }

    /// The stop at an interior location; `None` for the start and the depot.
    pub fn stop(&self, loc: Loc) -> Option<Stop> {
        if loc == 0 {
            None
        } else {
            self.stops.get(loc - 1).copied()
        }
    }

    pub fn pickup_loc(&self, parcel: ParcelId) -> Option<Loc> {
        self.pickup_loc.get(&parcel).copied()
    }

    pub fn delivery_loc(&self, parcel: ParcelId) -> Option<Loc> {
        self.delivery_loc.get(&parcel).copied()
    }

    /// Decodes a solver route into the ordered stop list, dropping the start
    /// and depot endpoints.
    pub fn decode_route(&self, route: &[Loc]) -> Vec<Stop> {
        route.iter().filter_map(|&loc| self.stop(loc)).collect()
    }

    /// Per-vehicle decoding of a whole fleet solution.
    pub fn decode_fleet(&self, solutions: &[SolutionObject]) -> Vec<Vec<Stop>> {
        solutions.iter().map(|s| self.decode_route(&s.route)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The snapshot contains no vehicles.
    EmptyFleet,
    /// The single-vehicle encoding assumes an idle reference vehicle.
    VehicleBusy { vehicle: Vehicle, remaining: f64 },
    /// A committed destination names a parcel that is neither unassigned nor in
    /// that vehicle's cargo.
    UnknownDestination { vehicle: Vehicle, parcel: ParcelId },
    /// A warm-start route names a parcel outside the instance.
    UnknownRouteParcel { vehicle: Vehicle, parcel: ParcelId },
    /// A warm-start route starts with a leg the vehicle may not take.
    UnreachableWarmStart { vehicle: Vehicle, to: Loc },
    Window(WindowError),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use EncodeError::*;
        match self {
            EmptyFleet => write!(f, "snapshot contains no vehicles"),
            VehicleBusy { vehicle, remaining } => write!(
                f,
                "vehicle {} still has {} service time remaining, single-vehicle encoding requires an idle vehicle",
                vehicle, remaining
            ),
            UnknownDestination { vehicle, parcel } => write!(
                f,
                "vehicle {} is destined for parcel {} which is neither unassigned nor in its cargo",
                vehicle, parcel
            ),
            UnknownRouteParcel { vehicle, parcel } => write!(
                f,
                "route of vehicle {} visits parcel {} which is not part of this instance",
                vehicle, parcel
            ),
            UnreachableWarmStart { vehicle, to } => write!(
                f,
                "route of vehicle {} starts with unreachable location {}",
                vehicle, to
            ),
            Window(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<WindowError> for EncodeError {
    fn from(e: WindowError) -> Self {
        EncodeError::Window(e)
    }
}

fn location_points(origin: Point, available: &[Parcel], cargo: &[&Parcel], depot: Point) -> Vec<Point> {
    let mut points = Vec::with_capacity(2 * available.len() + cargo.len() + 2);
    points.push(origin);
    points.extend(available.iter().map(|p| p.pickup));
    points.extend(available.iter().map(|p| p.delivery));
    points.extend(cargo.iter().map(|p| p.delivery));
    points.push(depot);
    return points;
}

fn build_arrays(
    origin: Point,
    available: &[Parcel],
    cargo: &[&Parcel],
    depot: Point,
    speed: f64,
    depot_due: f64,
    cvt: &TimeConverter,
) -> Result<(ProblemArrays, IndexMapping, Vec<Point>), EncodeError> {
    debug_assert!(speed > 0.0);
    let mapping = IndexMapping::new(available, cargo);
    let n = mapping.num_locations();
    let k = available.len();
    let points = location_points(origin, available, cargo, depot);
    debug_assert_eq!(points.len(), n);

    let mut release_date = Vec::with_capacity(n);
    let mut due_date = Vec::with_capacity(n);
    let mut service_time = Vec::with_capacity(n);
    release_date.push(0);
    due_date.push(0);
    service_time.push(0);
    for p in available {
        let (release, due) = cvt.window(&p.pickup_tw)?;
        release_date.push(release);
        due_date.push(due);
        service_time.push(cvt.duration_ceil(p.pickup_duration));
    }
    for p in available.iter().chain(cargo.iter().cloned()) {
        let (release, due) = cvt.window(&p.delivery_tw)?;
        release_date.push(release);
        due_date.push(due);
        service_time.push(cvt.duration_ceil(p.delivery_duration));
    }
    release_date.push(0);
    due_date.push(std::cmp::max(0, cvt.relative_floor(depot_due)));
    service_time.push(0);

    let travel_time = Array2::from_shape_fn((n, n), |(i, j)| {
        cvt.duration_ceil(points[i].dist(&points[j]) / speed)
    });

    let service_pairs = (1..=k).map(|p| (p, p + k)).collect_vec();

    let data = ProblemArrays {
        travel_time,
        release_date,
        due_date,
        service_time,
        service_pairs,
    };
    return Ok((data, mapping, points));
}

/// Encodes a single idle vehicle plus the unassigned parcels.
///
/// Fails with [`EncodeError::VehicleBusy`] when the vehicle is mid-service;
/// use [`encode_fleet`] for that case.
#[instrument(level = "debug", skip(vehicle, available, cvt), fields(num_available = available.len()))]
pub fn encode_single(
    vehicle: &VehicleSnapshot,
    available: &[Parcel],
    depot: Point,
    cvt: &TimeConverter,
) -> Result<(ProblemArrays, IndexMapping), EncodeError> {
    if vehicle.remaining_service_time > 0.0 {
        return Err(EncodeError::VehicleBusy { vehicle: 0, remaining: vehicle.remaining_service_time });
    }
    let cargo = vehicle.cargo.iter().collect_vec();
    let (data, mapping, _) = build_arrays(
        vehicle.position,
        available,
        &cargo,
        depot,
        vehicle.speed,
        vehicle.availability.end,
        cvt,
    )?;
    debug!(n = mapping.num_locations(), "single-vehicle instance encoded");
    return Ok((data, mapping));
}

fn resolve_destination(
    vehicle: Vehicle,
    snapshot: &FleetSnapshot,
    mapping: &IndexMapping,
) -> Result<Option<Loc>, EncodeError> {
    let v = &snapshot.vehicles[vehicle];
    let parcel = match v.destination {
        None => return Ok(None),
        Some(id) => id,
    };
    let loc = if v.in_cargo(parcel) {
        mapping.delivery_loc(parcel)
    } else if snapshot.available.iter().any(|p| p.id == parcel) {
        mapping.pickup_loc(parcel)
    } else {
        None
    };
    match loc {
        Some(loc) => Ok(Some(loc)),
        None => Err(EncodeError::UnknownDestination { vehicle, parcel }),
    }
}

fn convert_route(
    vehicle: Vehicle,
    route: &[ParcelId],
    snapshot: &FleetSnapshot,
    mapping: &IndexMapping,
    data: &ProblemArrays,
    vtt: &[Reach],
    remaining_service: Time,
) -> Result<SolutionObject, EncodeError> {
    let v = &snapshot.vehicles[vehicle];
    let mut locs = Vec::with_capacity(route.len() + 2);
    locs.push(0);
    let mut picked: Set<ParcelId> = Set::default();
    for &parcel in route {
        let loc = if v.in_cargo(parcel) || picked.contains(&parcel) {
            mapping.delivery_loc(parcel)
        } else {
            picked.insert(parcel);
            mapping.pickup_loc(parcel)
        };
        match loc {
            Some(loc) => locs.push(loc),
            None => return Err(EncodeError::UnknownRouteParcel { vehicle, parcel }),
        }
    }
    locs.push(data.depot());

    let arrival_times = schedule::earliest_arrivals(&locs, data, Some(vtt), remaining_service)
        .map_err(|e| EncodeError::UnreachableWarmStart { vehicle, to: e.to })?;
    let travel = schedule::total_travel_time(&locs, data, Some(vtt))
        .map_err(|e| EncodeError::UnreachableWarmStart { vehicle, to: e.to })?;
    let objective_value = travel + schedule::tardiness(&locs, &arrival_times, data, remaining_service);
    trace!(vehicle, route = ?locs, objective_value, "warm-start route converted");
    return Ok(SolutionObject { route: locs, arrival_times, objective_value });
}

/// Encodes the whole fleet state into a multi-vehicle instance.
///
/// Location 0 is the first (reference) vehicle's position. The shared travel
/// matrix uses the slowest vehicle's speed so it never under-promises; the
/// per-vehicle first legs in `vehicle_travel_time` use each vehicle's own
/// speed. Warm-start solutions are reconstructed only when every vehicle's
/// current route is known.
#[instrument(level = "debug", skip(snapshot, cvt), fields(num_vehicles = snapshot.vehicles.len(), num_available = snapshot.available.len()))]
pub fn encode_fleet(
    snapshot: &FleetSnapshot,
    cvt: &TimeConverter,
) -> Result<(FleetArrays, IndexMapping), EncodeError> {
    let reference = snapshot.vehicles.first().ok_or(EncodeError::EmptyFleet)?;
    let num_vehicles = snapshot.vehicles.len();

    let cargo_owners: Vec<(Vehicle, &Parcel)> = snapshot.vehicles.iter()
        .enumerate()
        .flat_map(|(v, veh)| veh.cargo.iter().map(move |p| (v, p)))
        .collect();
    let cargo = cargo_owners.iter().map(|&(_, p)| p).collect_vec();

    let matrix_speed = snapshot.vehicles.iter().map(|v| v.speed).fold(f64::INFINITY, f64::min);
    let depot_due = snapshot.vehicles.iter().map(|v| v.availability.end).fold(f64::NEG_INFINITY, f64::max);
    let (data, mapping, points) = build_arrays(
        reference.position,
        &snapshot.available,
        &cargo,
        snapshot.depot,
        matrix_speed,
        depot_due,
        cvt,
    )?;
    let n = mapping.num_locations();

    let inventory = cargo_owners.iter()
        .map(|&(v, p)| {
            let loc = mapping.delivery_loc(p.id).expect("cargo parcel was just indexed");
            (v, loc)
        })
        .collect_vec();

    let mut current_destination = Vec::with_capacity(num_vehicles);
    for v in 0..num_vehicles {
        current_destination.push(resolve_destination(v, snapshot, &mapping)?);
    }

    let remaining_service_time = snapshot.vehicles.iter()
        .map(|v| cvt.duration_ceil(v.remaining_service_time))
        .collect_vec();

    let vehicle_travel_time = snapshot.vehicles.iter()
        .enumerate()
        .map(|(v, veh)| {
            (0..n).map(|j| {
                if j == 0 {
                    return Reach::At(0);
                }
                match current_destination[v] {
                    Some(d) if j != d => Reach::Unreachable,
                    _ => Reach::At(cvt.duration_ceil(veh.position.dist(&points[j]) / veh.speed)),
                }
            }).collect_vec()
        })
        .collect_vec();

    let current_solutions = if snapshot.vehicles.iter().all(|v| v.route.is_some()) {
        let mut sols = Vec::with_capacity(num_vehicles);
        for (v, veh) in snapshot.vehicles.iter().enumerate() {
            let route = veh.route.as_ref().expect("checked above");
            sols.push(convert_route(
                v,
                route,
                snapshot,
                &mapping,
                &data,
                &vehicle_travel_time[v],
                remaining_service_time[v],
            )?);
        }
        Some(sols)
    } else {
        None
    };

    debug!(n, num_vehicles, warm_start = current_solutions.is_some(), "fleet instance encoded");
    let arrays = FleetArrays {
        base: data,
        vehicle_travel_time,
        inventory,
        remaining_service_time,
        current_destination,
        current_solutions,
    };
    return Ok((arrays, mapping));
}
