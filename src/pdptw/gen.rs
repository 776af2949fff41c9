//! Random fleet snapshots for fuzzing the encoder and the validators.

use rand::Rng;

use crate::data::*;

#[derive(Debug, Clone, Copy)]
pub struct GenParams {
    pub num_vehicles: usize,
    pub num_available: usize,
    pub num_cargo: usize,
    /// Side length of the square plane locations are drawn from.
    pub plane: f64,
    /// Time windows open somewhere in `[0, horizon)`.
    pub horizon: f64,
    pub max_service: f64,
}

impl Default for GenParams {
    fn default() -> Self {
        GenParams {
            num_vehicles: 3,
            num_available: 8,
            num_cargo: 3,
            plane: 100.0,
            horizon: 500.0,
            max_service: 10.0,
        }
    }
}

fn random_point<R: Rng>(rng: &mut R, plane: f64) -> Point {
    Point::new(rng.gen_range(0.0, plane), rng.gen_range(0.0, plane))
}

fn random_window<R: Rng>(rng: &mut R, horizon: f64) -> TimeWindow {
    let begin = rng.gen_range(0.0, horizon);
    let end = begin + rng.gen_range(0.0, horizon);
    TimeWindow::new(begin, end)
}

fn random_parcel<R: Rng>(rng: &mut R, id: ParcelId, params: &GenParams) -> Parcel {
    Parcel {
        id,
        pickup: random_point(rng, params.plane),
        delivery: random_point(rng, params.plane),
        pickup_tw: random_window(rng, params.horizon),
        delivery_tw: random_window(rng, params.horizon),
        pickup_duration: rng.gen_range(0.0, params.max_service),
        delivery_duration: rng.gen_range(0.0, params.max_service),
    }
}

/// Draws a random but internally consistent snapshot: every cargo parcel sits
/// on exactly one vehicle, destinations point at that vehicle's own cargo or
/// at an available pickup no other vehicle has claimed, and a vehicle is
/// mid-service only when it has a destination (its position is then snapped
/// to the destination point).
pub fn random_snapshot<R: Rng>(rng: &mut R, params: &GenParams) -> FleetSnapshot {
    debug_assert!(params.num_vehicles > 0);
    let mut next_id: ParcelId = 1;
    let mut fresh = |rng: &mut R| {
        let p = random_parcel(rng, next_id, params);
        next_id += 1;
        return p;
    };

    let available: Vec<_> = (0..params.num_available).map(|_| fresh(rng)).collect();

    let mut vehicles: Vec<_> = (0..params.num_vehicles)
        .map(|_| {
            VehicleSnapshot {
                position: random_point(rng, params.plane),
                speed: rng.gen_range(0.5, 3.0),
                availability: TimeWindow::new(0.0, params.horizon * 2.0),
                destination: None,
                cargo: Vec::new(),
                remaining_service_time: 0.0,
                route: None,
            }
        })
        .collect();

    for _ in 0..params.num_cargo {
        let p = fresh(rng);
        let v = rng.gen_range(0, params.num_vehicles);
        vehicles[v].cargo.push(p);
    }

    let mut claimed_pickups: Vec<ParcelId> = Vec::new();
    for v in 0..params.num_vehicles {
        if !rng.gen_bool(0.5) {
            continue;
        }
        // prefer own cargo, fall back to an unclaimed available pickup
        let target = if !vehicles[v].cargo.is_empty() && rng.gen_bool(0.5) {
            let m = rng.gen_range(0, vehicles[v].cargo.len());
            Some(vehicles[v].cargo[m].clone())
        } else {
            available.iter().find(|p| !claimed_pickups.contains(&p.id)).cloned()
        };
        let target = match target {
            None => continue,
            Some(t) => t,
        };
        let in_cargo = vehicles[v].in_cargo(target.id);
        if !in_cargo {
            claimed_pickups.push(target.id);
        }
        vehicles[v].destination = Some(target.id);
        if rng.gen_bool(0.5) {
            // already servicing the destination stop
            let (point, duration) = if in_cargo {
                (target.delivery, target.delivery_duration)
            } else {
                (target.pickup, target.pickup_duration)
            };
            vehicles[v].position = point;
            vehicles[v].remaining_service_time = rng.gen_range(0.0, duration.max(0.1));
        }
    }

    return FleetSnapshot {
        time: 0.0,
        depot: random_point(rng, params.plane),
        vehicles,
        available,
    };
}
