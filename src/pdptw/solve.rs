//! The boundary between this crate and an actual optimizer.
//!
//! Solvers are external and untrusted: [`Validated`] wraps any of them so that
//! every instance is checked before it is handed over and every answer is
//! checked before it is believed.

use anyhow::{Context, Result};
use tracing::*;

use super::{FleetArrays, ProblemArrays, SolutionObject};
use super::validate::{validate_inputs, validate_fleet_inputs, validate_solution, validate_fleet_solution};

/// A solver for single-vehicle instances.
pub trait RouteSolver {
    fn solve(&mut self, data: &ProblemArrays) -> Result<SolutionObject>;
}

/// A solver for multi-vehicle instances, one route per vehicle.
pub trait FleetSolver {
    fn solve(&mut self, fleet: &FleetArrays) -> Result<Vec<SolutionObject>>;
}

/// Wraps a solver with input validation on the way in and solution validation
/// on the way out. A validation failure is a bug, not a recoverable condition,
/// so both are reported through the error chain rather than panicking.
#[derive(Debug, Clone)]
pub struct Validated<S>(pub S);

impl<S: RouteSolver> RouteSolver for Validated<S> {
    fn solve(&mut self, data: &ProblemArrays) -> Result<SolutionObject> {
        validate_inputs(data).context("solver given a malformed instance")?;
        let sol = self.0.solve(data)?;
        validate_solution(data, &sol).context("solver returned an infeasible solution")?;
        debug!(objective = sol.objective_value, "solution validated");
        return Ok(sol);
    }
}

impl<S: FleetSolver> FleetSolver for Validated<S> {
    fn solve(&mut self, fleet: &FleetArrays) -> Result<Vec<SolutionObject>> {
        validate_fleet_inputs(fleet).context("solver given a malformed instance")?;
        let sols = self.0.solve(fleet)?;
        validate_fleet_solution(fleet, &sols).context("solver returned an infeasible solution")?;
        debug!(objective = super::schedule::fleet_objective(&sols), "fleet solution validated");
        return Ok(sols);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_test_logging;
    use crate::data::Loc;
    use crate::pdptw::{Reach, schedule};

    /// Visits everything in index order, committed stops first. Terrible
    /// routes, but always feasible, which is all these tests need. One type
    /// per trait so method calls stay unambiguous.
    struct GreedyRoute;
    struct GreedyFleet;

    fn route_arrays(
        fleet: &FleetArrays,
        vehicle: usize,
        route: Vec<Loc>,
    ) -> Result<SolutionObject> {
        let vtt = Some(fleet.vehicle_travel_time[vehicle].as_slice());
        let remaining = fleet.remaining_service_time[vehicle];
        let arrival_times = schedule::earliest_arrivals(&route, &fleet.base, vtt, remaining)?;
        let objective_value = schedule::objective(&route, &fleet.base, vtt, remaining)?;
        Ok(SolutionObject { route, arrival_times, objective_value })
    }

    impl RouteSolver for GreedyRoute {
        fn solve(&mut self, data: &ProblemArrays) -> Result<SolutionObject> {
            let mut route = vec![0];
            for &(p, d) in &data.service_pairs {
                route.push(p);
                route.push(d);
            }
            for loc in 1..data.depot() {
                if !route.contains(&loc) {
                    route.push(loc);
                }
            }
            route.push(data.depot());
            let arrival_times = schedule::earliest_arrivals(&route, data, None, 0)?;
            let objective_value = schedule::objective(&route, data, None, 0)?;
            Ok(SolutionObject { route, arrival_times, objective_value })
        }
    }

    impl FleetSolver for GreedyFleet {
        fn solve(&mut self, fleet: &FleetArrays) -> Result<Vec<SolutionObject>> {
            let num_vehicles = fleet.num_vehicles();
            let mut interiors: Vec<Vec<Loc>> = vec![Vec::new(); num_vehicles];
            let mut claimed: Vec<Loc> = Vec::new();

            // committed vehicles service their destination first
            for v in 0..num_vehicles {
                if let Some(d) = fleet.current_destination[v] {
                    interiors[v].push(d);
                    claimed.push(d);
                    if let Some(delivery) = fleet.base.delivery_of(d) {
                        interiors[v].push(delivery);
                        claimed.push(delivery);
                    }
                }
            }
            // loaded deliveries stay on their vehicle
            for &(v, loc) in &fleet.inventory {
                if !claimed.contains(&loc) {
                    interiors[v].push(loc);
                    claimed.push(loc);
                }
            }
            // everything else goes to the first vehicle round-robin
            let mut next = 0;
            for &(p, d) in &fleet.base.service_pairs {
                if claimed.contains(&p) {
                    continue;
                }
                interiors[next].push(p);
                interiors[next].push(d);
                next = (next + 1) % num_vehicles;
            }

            let depot = fleet.base.depot();
            (0..num_vehicles)
                .map(|v| {
                    let mut route = vec![0];
                    route.extend(interiors[v].iter().copied());
                    route.push(depot);
                    route_arrays(fleet, v, route)
                })
                .collect()
        }
    }

    fn fleet_fixture() -> FleetArrays {
        use crate::data::*;
        use crate::pdptw::{TimeConverter, encode_fleet};
        let parcel = |id, pickup, delivery| Parcel {
            id,
            pickup,
            delivery,
            pickup_tw: TimeWindow::new(0.0, 100.0),
            delivery_tw: TimeWindow::new(0.0, 100.0),
            pickup_duration: 5.0,
            delivery_duration: 5.0,
        };
        let mut busy = VehicleSnapshot::idle_at(Point::new(2.0, 0.0), 1.0, TimeWindow::new(0.0, 1000.0));
        busy.cargo.push(parcel(20, Point::new(9.0, 9.0), Point::new(2.0, 0.0)));
        busy.destination = Some(20);
        busy.remaining_service_time = 3.0;
        let snapshot = FleetSnapshot {
            time: 0.0,
            depot: Point::new(10.0, 0.0),
            vehicles: vec![
                VehicleSnapshot::idle_at(Point::new(0.0, 0.0), 1.0, TimeWindow::new(0.0, 1000.0)),
                busy,
            ],
            available: vec![
                parcel(10, Point::new(1.0, 0.0), Point::new(4.0, 0.0)),
                parcel(11, Point::new(3.0, 0.0), Point::new(6.0, 0.0)),
            ],
        };
        let (arrays, _) = encode_fleet(&snapshot, &TimeConverter::identity(0.0)).unwrap();
        arrays
    }

    #[test]
    fn validated_accepts_feasible_fleet_solver() {
        init_test_logging(None::<&str>);
        let fleet = fleet_fixture();
        let sols = Validated(GreedyFleet).solve(&fleet).unwrap();
        assert_eq!(sols.len(), fleet.num_vehicles());
        // committed vehicle visits its destination second
        assert_eq!(sols[1].route[1], fleet.current_destination[1].unwrap());
    }

    #[test]
    fn validated_rejects_malformed_instance() {
        let mut fleet = fleet_fixture();
        fleet.base.service_time[0] = 7;
        let err = Validated(GreedyFleet).solve(&fleet).unwrap_err();
        assert!(err.to_string().contains("malformed instance"));
    }

    #[test]
    fn validated_rejects_lying_solver() {
        struct Liar;
        impl FleetSolver for Liar {
            fn solve(&mut self, fleet: &FleetArrays) -> Result<Vec<SolutionObject>> {
                let mut sols = GreedyFleet.solve(fleet)?;
                sols[0].objective_value = 0;
                Ok(sols)
            }
        }
        let fleet = fleet_fixture();
        let err = Validated(Liar).solve(&fleet).unwrap_err();
        assert!(err.to_string().contains("infeasible solution"));
    }

    #[test]
    fn validated_single_vehicle_round_trip() {
        use crate::data::*;
        use crate::pdptw::{TimeConverter, encode_single, Stop};
        let parcel = Parcel {
            id: 5,
            pickup: Point::new(1.0, 0.0),
            delivery: Point::new(2.0, 0.0),
            pickup_tw: TimeWindow::new(0.0, 100.0),
            delivery_tw: TimeWindow::new(0.0, 100.0),
            pickup_duration: 1.0,
            delivery_duration: 1.0,
        };
        let vehicle = VehicleSnapshot::idle_at(Point::new(0.0, 0.0), 1.0, TimeWindow::new(0.0, 1000.0));
        let cvt = TimeConverter::identity(0.0);
        let (data, mapping) = encode_single(&vehicle, &[parcel], Point::new(3.0, 0.0), &cvt).unwrap();

        let sol = Validated(GreedyRoute).solve(&data).unwrap();
        assert_eq!(mapping.decode_route(&sol.route), vec![Stop::Pickup(5), Stop::Delivery(5)]);
    }

    #[test]
    fn zero_parcel_instance_solves_to_empty_tour() {
        use crate::data::*;
        use crate::pdptw::{TimeConverter, encode_single};
        let vehicle = VehicleSnapshot::idle_at(Point::new(0.0, 0.0), 1.0, TimeWindow::new(0.0, 1000.0));
        let cvt = TimeConverter::identity(0.0);
        let (data, mapping) = encode_single(&vehicle, &[], Point::new(3.0, 4.0), &cvt).unwrap();
        let sol = Validated(GreedyRoute).solve(&data).unwrap();
        assert_eq!(sol.route, vec![0, 1]);
        assert!(mapping.decode_route(&sol.route).is_empty());
    }

    #[test]
    fn unused_vtt_rows_do_not_matter() {
        // a committed vehicle's sentinel row constrains only its own first leg
        let fleet = fleet_fixture();
        assert!(fleet.vehicle_travel_time[1].iter().filter(|r| !r.is_reachable()).count() > 0);
        let sols = Validated(GreedyFleet).solve(&fleet).unwrap();
        assert_eq!(sols[1].arrival_times[0], 0);
        assert_eq!(fleet.vehicle_travel_time[1][sols[1].route[1]], Reach::At(0));
    }
}
