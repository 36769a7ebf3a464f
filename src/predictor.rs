//! Secondary maintenance estimator.
//!
//! The rule engine is authoritative; a predictor only adds an outlook to the
//! response when it is enabled and succeeds. [`StressModel`] derives the
//! maintenance probability deterministically from the same stress factors the
//! training data for a statistical model is labelled with.

use anyhow::{Result, ensure};
use serde::Serialize;

use crate::materials::MaterialProfile;
use crate::params::PrintParameters;

/// Reference layer height used to normalize layer stress, mm.
const REFERENCE_LAYER_HEIGHT: f64 = 0.4;

/// Estimated maintenance need for one print job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceOutlook {
    /// Probability in `[0, 1]` that the job leaves the printer needing maintenance.
    pub maintenance_probability: f64,
    pub maintenance_needed: bool,
    /// Printer health after the job, 0 to 100.
    pub health_score: f64,
    /// Name of the predictor that produced this outlook.
    pub model: String,
}

/// An optional estimator consulted after the rule engine has scored a job.
pub trait MaintenancePredictor: Send + Sync {
    fn name(&self) -> &str;

    /// Produce an outlook from the job, its profile and the engine's scores.
    fn predict(
        &self,
        params: &PrintParameters,
        profile: &MaterialProfile,
        wear_factor: f64,
        thermal_stress: f64,
    ) -> Result<MaintenanceOutlook>;
}

/// Weighted stress model over material, speed, temperature and layer settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StressModel;

impl StressModel {
    /// Probability at or above which maintenance is flagged as needed.
    pub const DECISION_THRESHOLD: f64 = 0.5;

    /// Combined temperature, speed and layer-height stress, capped at 1.
    pub fn material_stress(params: &PrintParameters, profile: &MaterialProfile) -> f64 {
        let temps = &profile.temperature_range;
        let temp_stress = (params.nozzle_temperature - temps.midpoint()).abs() / temps.span();
        let speed_stress = (params.print_speed / profile.max_speed).min(1.0);
        let layer_stress = params.layer_height / REFERENCE_LAYER_HEIGHT;

        (temp_stress * 0.4 + speed_stress * 0.3 + layer_stress * 0.3).min(1.0)
    }

    fn base_probability(params: &PrintParameters, profile: &MaterialProfile) -> f64 {
        let mut probability = 0.0;

        if profile.abrasive {
            probability += 0.15;
        }
        if profile.moisture_sensitive {
            probability += 0.08;
        }

        let temps = &profile.temperature_range;
        probability += (params.nozzle_temperature - temps.midpoint()).abs() / temps.span() * 0.2;

        let speed_excess = params.print_speed / profile.max_speed - 0.7;
        if speed_excess > 0.0 {
            probability += speed_excess * 0.25;
        }

        if params.layer_height < 0.1 {
            probability += 0.15;
        } else if params.layer_height > 0.35 {
            probability += 0.1;
        }

        probability
    }
}

impl MaintenancePredictor for StressModel {
    fn name(&self) -> &str {
        "stress-model"
    }

    fn predict(
        &self,
        params: &PrintParameters,
        profile: &MaterialProfile,
        wear_factor: f64,
        thermal_stress: f64,
    ) -> Result<MaintenanceOutlook> {
        ensure!(
            profile.temperature_range.span() > 0.0 && profile.max_speed > 0.0,
            "profile for {} cannot normalize stress",
            profile.material
        );

        let stress_probability = wear_factor * 0.3
            + thermal_stress * 0.2
            + Self::material_stress(params, profile) * 0.25;
        let raw = Self::base_probability(params, profile) + stress_probability;
        ensure!(raw.is_finite(), "maintenance probability is not finite");

        let maintenance_probability = raw.clamp(0.0, 1.0);

        Ok(MaintenanceOutlook {
            maintenance_probability,
            maintenance_needed: maintenance_probability >= Self::DECISION_THRESHOLD,
            health_score: (100.0 * (1.0 - maintenance_probability)).clamp(0.0, 100.0),
            model: self.name().to_string(),
        })
    }
}
