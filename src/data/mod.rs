//! Domain-side snapshot of the fleet, taken at a single simulation instant.
//!
//! Everything in here is expressed in absolute simulation time (`f64`, arbitrary
//! unit) and plane coordinates. The encoder in `crate::pdptw` turns a snapshot
//! into the integer array representation that solvers consume.

/// Solver time unit (instance-relative, integer).
pub type Time = i64;
/// Location index in the instance space: 0 is the reference vehicle's position,
/// `n - 1` the depot.
pub type Loc = usize;
/// Vehicle index in the fleet.
pub type Vehicle = usize;
/// Domain identifier of a parcel.
pub type ParcelId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    #[inline]
    pub fn dist(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        return (dx * dx + dy * dy).sqrt();
    }
}

/// Half-open service window `[begin, end)` in absolute simulation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub begin: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(begin: f64, end: f64) -> Self {
        debug_assert!(begin <= end);
        TimeWindow { begin, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    pub id: ParcelId,
    pub pickup: Point,
    pub delivery: Point,
    pub pickup_tw: TimeWindow,
    pub delivery_tw: TimeWindow,
    pub pickup_duration: f64,
    pub delivery_duration: f64,
}

/// Live state of one vehicle at the snapshot instant.
///
/// `route`, when present, lists parcel ids in visit order: a parcel appears
/// twice (pickup, then delivery) unless it is already in `cargo`, in which
/// case it appears once and means its delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub position: Point,
    /// Distance units per domain time unit. Must be positive.
    pub speed: f64,
    pub availability: TimeWindow,
    /// Parcel the vehicle is contractually obligated to reach and service next.
    pub destination: Option<ParcelId>,
    /// Parcels already picked up and on board.
    pub cargo: Vec<Parcel>,
    /// Time left to finish a service currently in progress, 0 if idle.
    pub remaining_service_time: f64,
    pub route: Option<Vec<ParcelId>>,
}

impl VehicleSnapshot {
    pub fn idle_at(position: Point, speed: f64, availability: TimeWindow) -> Self {
        VehicleSnapshot {
            position,
            speed,
            availability,
            destination: None,
            cargo: Vec::new(),
            remaining_service_time: 0.0,
            route: None,
        }
    }

    #[inline]
    pub fn in_cargo(&self, id: ParcelId) -> bool {
        self.cargo.iter().any(|p| p.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FleetSnapshot {
    /// The snapshot instant ("now").
    pub time: f64,
    pub depot: Point,
    pub vehicles: Vec<VehicleSnapshot>,
    /// Parcels announced but not yet picked up by anyone.
    pub available: Vec<Parcel>,
}

impl FleetSnapshot {
    /// Looks a parcel up among the unassigned ones and every vehicle's cargo.
    pub fn parcel(&self, id: ParcelId) -> Option<&Parcel> {
        self.available.iter()
            .chain(self.vehicles.iter().flat_map(|v| v.cargo.iter()))
            .find(|p| p.id == id)
    }
}
