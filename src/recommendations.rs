use crate::materials::MaterialProfile;
use crate::params::PrintParameters;

/// Corrective guidance for parameters outside the material's ideal bands.
///
/// Checks run independently in a fixed order (nozzle temperature, print
/// speed, layer height, wall thickness) and each violated check contributes
/// exactly one line.
pub fn recommend(params: &PrintParameters, profile: &MaterialProfile) -> Vec<String> {
    let material = profile.material;
    let mut recommendations = Vec::new();

    let temps = &profile.temperature_range;
    if params.nozzle_temperature > temps.max {
        recommendations.push(format!(
            "Reduce nozzle temperature to within {}°C - {}°C for {}",
            temps.min, temps.max, material
        ));
    } else if params.nozzle_temperature < temps.min {
        recommendations.push(format!(
            "Increase nozzle temperature to within {}°C - {}°C for {}",
            temps.min, temps.max, material
        ));
    }

    if params.print_speed > profile.max_speed {
        recommendations.push(format!(
            "Reduce print speed below {}mm/s for {}",
            profile.max_speed, material
        ));
    }

    let layers = &profile.typical_layer_height_range;
    if params.layer_height > layers.max {
        recommendations.push(format!(
            "Reduce layer height to {}mm or below for better quality with {}",
            layers.max, material
        ));
    }

    let walls = &profile.optimal_wall_thickness_range;
    if params.wall_thickness < walls.min {
        recommendations.push(format!(
            "Increase wall thickness to at least {}mm for structural integrity",
            walls.min
        ));
    }

    recommendations
}
