//! Thermal-management risk from temperature, cooling and infill settings.

use crate::error::AssessmentError;
use crate::materials::MaterialProfile;
use crate::params::PrintParameters;
use crate::wear::unit_clamp;

const NOZZLE_WEIGHT: f64 = 0.6;
const BED_WEIGHT: f64 = 0.4;
const UNDERCOOLING_PENALTY: f64 = 0.3;
const OVERCOOLING_PENALTY: f64 = 0.2;
/// Share of the infill term that reaches the final score.
const INFILL_WEIGHT: f64 = 0.4;

const SPARSE_INFILL_LIMIT: f64 = 15.0;
const DENSE_INFILL_LIMIT: f64 = 80.0;
const SPARSE_INFILL_STRESS: f64 = 0.3;
const DENSE_INFILL_STRESS: f64 = 0.2;

const GYROID_SPEED_RATIO: f64 = 0.8;
const GYROID_STRESS: f64 = 0.25;
const HONEYCOMB_SPEED_RATIO: f64 = 0.9;
const HONEYCOMB_STRESS: f64 = 0.2;

/// Estimate thermal stress for a job on a 0 to 1 scale.
///
/// # Errors
///
/// Returns [`AssessmentError::DegenerateRange`] if the nozzle or bed
/// temperature band has zero width.
pub fn estimate_thermal_stress(
    params: &PrintParameters,
    profile: &MaterialProfile,
) -> Result<f64, AssessmentError> {
    let nozzle = profile.temperature_range.relative_deviation(
        params.nozzle_temperature,
        profile.material,
        "temperature",
    )?;
    let bed = profile.bed_temperature_range.relative_deviation(
        params.bed_temperature,
        profile.material,
        "bed temperature",
    )?;

    let mut stress = nozzle * NOZZLE_WEIGHT + bed * BED_WEIGHT;

    if params.fan_speed < profile.fan_speed_range.min {
        stress += UNDERCOOLING_PENALTY;
    } else if params.fan_speed > profile.fan_speed_range.max {
        stress += OVERCOOLING_PENALTY;
    }

    Ok(unit_clamp(stress + infill_stress(params, profile) * INFILL_WEIGHT))
}

/// Unweighted infill stress: density extremes plus pattern/speed interaction.
///
/// Only `"gyroid"` and `"honeycomb"` interact with speed; any other pattern
/// name adds nothing.
pub fn infill_stress(params: &PrintParameters, profile: &MaterialProfile) -> f64 {
    let mut stress = 0.0;

    if params.infill_density < SPARSE_INFILL_LIMIT {
        stress += SPARSE_INFILL_STRESS;
    } else if params.infill_density > DENSE_INFILL_LIMIT {
        stress += DENSE_INFILL_STRESS;
    }

    match params.infill_pattern.as_str() {
        "gyroid" if params.print_speed > GYROID_SPEED_RATIO * profile.max_speed => {
            stress += GYROID_STRESS;
        }
        "honeycomb" if params.print_speed > HONEYCOMB_SPEED_RATIO * profile.max_speed => {
            stress += HONEYCOMB_STRESS;
        }
        _ => {}
    }

    stress
}
