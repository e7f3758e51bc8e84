//! SoftAP web dashboard.
//!
//! The device hosts its own WiFi network, serves a single page at
//! `http://192.168.4.1` and answers a small JSON API: `/api/status` reports
//! the application's sensor, output and system snapshots, and the action
//! routes call back into the application.
//!
//! ```ignore
//! let mut dashboard = Dashboard::attach("Greenhouse", "12345678", transport);
//! dashboard.on_output_changed(Output::One, move |on| led_tx.send(on).unwrap());
//! dashboard.start()?;
//! loop {
//!     let views = Views::new().with_sensors(&sensors).with_system(&system);
//!     dashboard.poll(&views);
//! }
//! ```

pub mod config;
pub mod dashboard;
pub mod portal;

pub use config::ApConfig;
pub use dashboard::{
    Dashboard, Output, OutputDisplay, OutputState, Reply, Route, SensorDisplay, SensorReading,
    SystemDisplay, Views,
};
pub use portal::{PendingRequest, Request, Response, Transport};
