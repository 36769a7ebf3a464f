/// Configured settings of one print job, as submitted by the caller.
///
/// The engine treats these as read-only and performs no range validation:
/// any finite numbers produce scores. Only `material` must name a catalog
/// entry, which is checked when the job is assessed.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintParameters {
    /// Catalog key, e.g. `"PLA"`.
    pub material: String,
    /// °C
    pub nozzle_temperature: f64,
    /// °C
    pub bed_temperature: f64,
    /// mm/s
    pub print_speed: f64,
    /// Part-cooling fan, percent.
    pub fan_speed: f64,
    /// mm
    pub layer_height: f64,
    /// mm
    pub wall_thickness: f64,
    /// mm
    pub nozzle_diameter: f64,
    /// Percent, nominally 0 to 100.
    pub infill_density: f64,
    /// Slicer pattern name; only `gyroid` and `honeycomb` affect scoring.
    pub infill_pattern: String,
    /// Estimated job duration. Carried for completeness; no rule reads it.
    pub print_time: f64,
}

impl PrintParameters {
    /// Wire names of every field, in the order the API reports them missing.
    pub const REQUIRED_FIELDS: [&'static str; 11] = [
        "material",
        "nozzle_temperature",
        "bed_temperature",
        "print_speed",
        "fan_speed",
        "layer_height",
        "wall_thickness",
        "nozzle_diameter",
        "infill_density",
        "infill_pattern",
        "print_time",
    ];
}
