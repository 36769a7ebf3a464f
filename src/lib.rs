//! Print Wear Guard - rule-based maintenance risk assessment for 3D print jobs.
//!
//! This library scores the operational risk of a print job from its configured
//! parameters and turns the scores into prioritized maintenance alerts.
//!
//! # Core Components
//!
//! * [`materials`] - Static reference profiles for PLA, ABS, PETG and TPU
//! * [`wear`] - Nozzle/extruder wear factor estimate
//! * [`thermal`] - Thermal stress estimate
//! * [`recommendations`] - Material-specific corrective guidance
//! * [`assessment`] - Alert composition and the [`RiskAssessor`] entry point
//! * [`predictor`] - Optional secondary maintenance estimator
//! * [`alerts`] - Discord webhook forwarding of critical alerts
//! * [`server`] - HTTP boundary with request validation
//! * [`config`] - Environment configuration and constants
//! * [`error`] - Error types
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use print_wear_guard::{MaterialCatalog, PrintParameters, RiskAssessor};
//!
//! let catalog = Arc::new(MaterialCatalog::standard()?);
//! let assessor = RiskAssessor::new(catalog);
//!
//! let job = PrintParameters {
//!     material: "PLA".to_string(),
//!     nozzle_temperature: 200.0,
//!     bed_temperature: 60.0,
//!     print_speed: 60.0,
//!     fan_speed: 100.0,
//!     layer_height: 0.2,
//!     wall_thickness: 0.8,
//!     nozzle_diameter: 0.4,
//!     infill_density: 20.0,
//!     infill_pattern: "grid".to_string(),
//!     print_time: 120.0,
//! };
//!
//! let result = assessor.assess(&job)?;
//! assert!(result.alerts.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod alerts;
pub mod assessment;
pub mod config;
pub mod error;
pub mod materials;
pub mod params;
pub mod predictor;
pub mod recommendations;
pub mod server;
pub mod thermal;
pub mod wear;

// Re-export commonly used types for convenience
pub use alerts::{AlertQueue, AlertService};
pub use assessment::{AlertRecord, AlertType, AssessmentResult, Priority, RiskAssessor};
pub use config::Config;
pub use error::{AssessmentError, CatalogError};
pub use materials::{Band, Material, MaterialCatalog, MaterialProfile};
pub use params::PrintParameters;
pub use predictor::{MaintenanceOutlook, MaintenancePredictor, StressModel};
pub use server::{PredictionServer, PredictionService};
