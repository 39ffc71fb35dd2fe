//! Fleet coordinator configuration

/// Configuration for the fleet, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Address the coordinator listens on for dashboard clients
    pub bind_addr: String,
    /// Number of drones in the fleet
    pub drones: usize,
    /// Side length of the sweep area in local units
    pub size: f64,
    /// Cruise altitude (local z) shared by all lanes
    pub altitude: f64,
    /// Autonomous sweep speed, local units per second
    pub scan_speed: f64,
    /// Speed while flying to an operator override target
    pub override_speed: f64,
    /// Speed while returning to the interrupted scan path
    pub resume_speed: f64,
    /// Latitude of the geodetic reference point
    pub origin_lat: f64,
    /// Longitude of the geodetic reference point
    pub origin_lng: f64,
    /// Degrees per local unit
    pub scale_factor: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".into(),
            drones: 2,
            size: 10.0,
            altitude: 10.0,
            scan_speed: 1.0,
            override_speed: 2.0,
            resume_speed: 2.0,
            // The dashboard's default map area
            origin_lat: 37.926337,
            origin_lng: -122.612707,
            scale_factor: 1e-5,
        }
    }
}
