use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::config::constants;
use crate::error::{AlertError, AssessmentError};
use crate::materials::{MaterialCatalog, MaterialProfile};
use crate::params::PrintParameters;
use crate::recommendations::recommend;
use crate::thermal::estimate_thermal_stress;
use crate::wear::estimate_wear;

/// Checklist attached to the high-wear nozzle alert.
pub const NOZZLE_CLEANING_CHECKLIST: [&str; 4] = [
    "Clean nozzle with brass brush",
    "Perform cold pull with cleaning filament",
    "Check nozzle diameter for wear",
    "Inspect nozzle tip for damage or clogs",
];

/// Checklist attached to the high thermal-stress alert.
pub const THERMAL_CHECKLIST: [&str; 3] = [
    "Check cooling system efficiency",
    "Verify temperature sensor calibration",
    "Inspect heat break condition",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Critical,
}

/// A structured maintenance notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub component: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_items: Option<Vec<String>>,
}

impl AlertRecord {
    fn warning(message: impl Into<String>, component: &str) -> Self {
        Self {
            alert_type: AlertType::Warning,
            message: message.into(),
            component: component.to_string(),
            priority: Priority::High,
            maintenance_items: None,
        }
    }

    fn critical(message: &str, component: &str, checklist: &[&str]) -> Self {
        Self {
            alert_type: AlertType::Critical,
            message: message.to_string(),
            component: component.to_string(),
            priority: Priority::Critical,
            maintenance_items: Some(checklist.iter().map(|item| item.to_string()).collect()),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.alert_type == AlertType::Critical
    }
}

/// Scores and alerts for one print job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResult {
    pub wear_factor: f64,
    pub thermal_stress: f64,
    pub alerts: Vec<AlertRecord>,
}

/// Rule-based risk engine over a shared, immutable material catalog.
///
/// Holds no mutable state, so one instance can serve any number of threads.
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    catalog: Arc<MaterialCatalog>,
}

impl RiskAssessor {
    pub fn new(catalog: Arc<MaterialCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    /// Score a print job and compose its maintenance alerts.
    ///
    /// Alerts are emitted in a fixed order: material recommendations, then the
    /// high-wear alert, then the thermal alert, then the layer-height/nozzle
    /// conflict. A failure while composing alerts is logged and yields an empty
    /// alert list; the scores are still returned.
    ///
    /// # Errors
    ///
    /// Returns [`AssessmentError::UnknownMaterial`] before any scoring if the
    /// material is not in the catalog, and [`AssessmentError::DegenerateRange`]
    /// if the profile cannot normalize a deviation.
    pub fn assess(&self, params: &PrintParameters) -> Result<AssessmentResult, AssessmentError> {
        let profile = self.catalog.lookup(&params.material)?;

        let wear_factor = estimate_wear(params, profile)?;
        let thermal_stress = estimate_thermal_stress(params, profile)?;
        debug!(
            "{}: wear factor {:.3}, thermal stress {:.3}",
            profile.material, wear_factor, thermal_stress
        );

        let alerts = match compose_alerts(params, profile, wear_factor, thermal_stress) {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!("Failed to compose maintenance alerts: {}", e);
                Vec::new()
            }
        };

        Ok(AssessmentResult {
            wear_factor,
            thermal_stress,
            alerts,
        })
    }
}

/// Build the ordered alert list from already computed scores.
///
/// # Errors
///
/// Returns [`AlertError::NonFiniteInput`] if a parameter the rules compare
/// is NaN or infinite. Fields no rule reads are not checked.
pub fn compose_alerts(
    params: &PrintParameters,
    profile: &MaterialProfile,
    wear_factor: f64,
    thermal_stress: f64,
) -> Result<Vec<AlertRecord>, AlertError> {
    let compared = [
        ("nozzle_temperature", params.nozzle_temperature),
        ("print_speed", params.print_speed),
        ("layer_height", params.layer_height),
        ("wall_thickness", params.wall_thickness),
        ("nozzle_diameter", params.nozzle_diameter),
    ];
    if let Some((field, _)) = compared
        .into_iter()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(AlertError::NonFiniteInput { field });
    }

    let mut alerts: Vec<AlertRecord> = recommend(params, profile)
        .into_iter()
        .map(|message| AlertRecord::warning(message, "Material Settings"))
        .collect();

    if wear_factor > constants::WEAR_ALERT_THRESHOLD {
        alerts.push(AlertRecord::critical(
            "High wear conditions detected",
            "Nozzle",
            &NOZZLE_CLEANING_CHECKLIST,
        ));
    }

    if thermal_stress > constants::THERMAL_ALERT_THRESHOLD {
        alerts.push(AlertRecord::critical(
            "High thermal stress detected",
            "Temperature Control",
            &THERMAL_CHECKLIST,
        ));
    }

    if params.layer_height > constants::LAYER_NOZZLE_RATIO * params.nozzle_diameter {
        alerts.push(AlertRecord::warning(
            "Layer height too close to nozzle diameter",
            "Print Settings",
        ));
    }

    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::Material;

    fn assessor() -> RiskAssessor {
        RiskAssessor::new(Arc::new(MaterialCatalog::standard().unwrap()))
    }

    fn tpu_job() -> PrintParameters {
        PrintParameters {
            material: "TPU".to_string(),
            nozzle_temperature: 227.5,
            bed_temperature: 37.5,
            print_speed: 20.0,
            fan_speed: 60.0,
            layer_height: 0.2,
            wall_thickness: 1.2,
            nozzle_diameter: 0.4,
            infill_density: 20.0,
            infill_pattern: "grid".to_string(),
            print_time: 300.0,
        }
    }

    #[test]
    fn test_quiet_job_has_no_alerts() {
        let result = assessor().assess(&tpu_job()).unwrap();
        assert!(result.alerts.is_empty());
        assert!((result.wear_factor - 0.6).abs() < 1e-9);
        assert!(result.thermal_stress.abs() < 1e-9);
    }

    #[test]
    fn test_alert_order_is_recommendations_wear_thermal_geometry() {
        let mut job = tpu_job();
        job.nozzle_temperature = 260.0;
        job.bed_temperature = 90.0;
        job.print_speed = 80.0;
        job.fan_speed = 0.0;
        job.layer_height = 0.38;

        let result = assessor().assess(&job).unwrap();
        let components: Vec<&str> = result.alerts.iter().map(|a| a.component.as_str()).collect();
        assert_eq!(
            components,
            vec![
                "Material Settings",
                "Material Settings",
                "Material Settings",
                "Nozzle",
                "Temperature Control",
                "Print Settings",
            ]
        );
        assert_eq!(result.wear_factor, 1.0);
        assert_eq!(result.thermal_stress, 1.0);
    }

    #[test]
    fn test_material_alerts_are_high_priority_warnings() {
        let mut job = tpu_job();
        job.print_speed = 45.0;
        let result = assessor().assess(&job).unwrap();
        let first = &result.alerts[0];
        assert_eq!(first.alert_type, AlertType::Warning);
        assert_eq!(first.priority, Priority::High);
        assert_eq!(first.message, "Reduce print speed below 40mm/s for TPU");
        assert!(first.maintenance_items.is_none());
    }

    #[test]
    fn test_thermal_alert_carries_checklist() {
        let catalog = MaterialCatalog::standard().unwrap();
        let alerts = compose_alerts(&tpu_job(), catalog.profile(Material::Tpu), 0.1, 0.85).unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].is_critical());
        assert_eq!(alerts[0].message, "High thermal stress detected");
        assert_eq!(
            alerts[0].maintenance_items.as_deref(),
            Some(
                &[
                    "Check cooling system efficiency".to_string(),
                    "Verify temperature sensor calibration".to_string(),
                    "Inspect heat break condition".to_string(),
                ][..]
            )
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let catalog = MaterialCatalog::standard().unwrap();
        let alerts = compose_alerts(&tpu_job(), catalog.profile(Material::Tpu), 0.7, 0.8).unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_unknown_material_stops_assessment() {
        let mut job = tpu_job();
        job.material = "NYLON".to_string();
        assert_eq!(
            assessor().assess(&job),
            Err(AssessmentError::UnknownMaterial("NYLON".to_string()))
        );
    }

    #[test]
    fn test_non_finite_input_degrades_to_empty_alerts() {
        let mut job = tpu_job();
        job.wall_thickness = f64::INFINITY;
        job.print_speed = 80.0;

        let catalog = MaterialCatalog::standard().unwrap();
        assert_eq!(
            compose_alerts(&job, catalog.profile(Material::Tpu), 1.0, 0.0),
            Err(AlertError::NonFiniteInput { field: "wall_thickness" })
        );

        let result = assessor().assess(&job).unwrap();
        assert!(result.alerts.is_empty());
        assert_eq!(result.wear_factor, 1.0);
    }

    #[test]
    fn test_fields_without_alert_rules_do_not_suppress_alerts() {
        let mut job = tpu_job();
        job.print_speed = 80.0;
        job.print_time = f64::INFINITY;
        job.infill_density = f64::NAN;

        let result = assessor().assess(&job).unwrap();
        assert_eq!(result.wear_factor, 1.0);
        let messages: Vec<&str> = result.alerts.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Reduce print speed below 40mm/s for TPU",
                "High wear conditions detected",
            ]
        );
    }

    #[test]
    fn test_alert_serializes_wire_names() {
        let alert = AlertRecord::critical("High wear conditions detected", "Nozzle", &["a"]);
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "critical");
        assert_eq!(value["priority"], "critical");
        assert_eq!(value["maintenance_items"][0], "a");

        let warning = AlertRecord::warning("x", "Print Settings");
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["type"], "warning");
        assert_eq!(value["priority"], "high");
        assert!(value.get("maintenance_items").is_none());
    }
}
