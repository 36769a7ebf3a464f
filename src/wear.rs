//! Mechanical wear estimate for the nozzle and extruder.

use crate::error::AssessmentError;
use crate::materials::MaterialProfile;
use crate::params::PrintParameters;

/// Over-speed penalty applied to the speed ratio before capping at 1.
const SPEED_WEIGHT: f64 = 1.2;
const TEMPERATURE_WEIGHT: f64 = 0.8;
const THIN_LAYER_PENALTY: f64 = 0.3;
const THICK_LAYER_PENALTY: f64 = 0.2;
const THIN_WALL_PENALTY: f64 = 0.25;
const THICK_WALL_PENALTY: f64 = 0.15;
const ABRASIVE_MULTIPLIER: f64 = 1.3;

/// Estimate nozzle wear for a job on a 0 to 1 scale.
///
/// Contributions are summed and then clamped:
///
/// * speed ratio against `max_speed`, weighted by 1.2 and capped at 1
/// * nozzle temperature deviation from the band midpoint, weighted by 0.8
/// * flat penalties when layer height or wall thickness leave their bands
///
/// Abrasive materials scale the total by 1.3 before clamping.
///
/// # Errors
///
/// Returns [`AssessmentError::DegenerateRange`] if the profile's temperature
/// band has zero width.
pub fn estimate_wear(
    params: &PrintParameters,
    profile: &MaterialProfile,
) -> Result<f64, AssessmentError> {
    let mut wear = speed_contribution(params.print_speed, profile.max_speed);

    let temp_stress = profile.temperature_range.relative_deviation(
        params.nozzle_temperature,
        profile.material,
        "temperature",
    )?;
    wear += temp_stress * TEMPERATURE_WEIGHT;

    let layers = &profile.typical_layer_height_range;
    if params.layer_height < layers.min {
        wear += THIN_LAYER_PENALTY;
    } else if params.layer_height > layers.max {
        wear += THICK_LAYER_PENALTY;
    }

    let walls = &profile.optimal_wall_thickness_range;
    if params.wall_thickness < walls.min {
        wear += THIN_WALL_PENALTY;
    } else if params.wall_thickness > walls.max {
        wear += THICK_WALL_PENALTY;
    }

    if profile.abrasive {
        wear *= ABRASIVE_MULTIPLIER;
    }

    Ok(unit_clamp(wear))
}

/// The speed term alone: `min(1, speed / max_speed * 1.2)`.
pub fn speed_contribution(print_speed: f64, max_speed: f64) -> f64 {
    (print_speed / max_speed * SPEED_WEIGHT).min(1.0)
}

/// Clamp a score into `[0, 1]`, mapping NaN to 0.
pub(crate) fn unit_clamp(score: f64) -> f64 {
    score.max(0.0).min(1.0)
}
