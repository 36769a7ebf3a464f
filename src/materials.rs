use std::fmt;
use std::str::FromStr;

use crate::error::{AssessmentError, CatalogError};

/// Filament materials with a reference profile in the catalog.
///
/// The set is closed: a material key that does not parse into one of these
/// variants is rejected as [`AssessmentError::UnknownMaterial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    Pla,
    Abs,
    Petg,
    Tpu,
}

impl Material {
    /// Every supported material, in catalog order.
    pub const ALL: [Material; 4] = [Material::Pla, Material::Abs, Material::Petg, Material::Tpu];

    /// The catalog key used on the wire.
    pub fn key(self) -> &'static str {
        match self {
            Material::Pla => "PLA",
            Material::Abs => "ABS",
            Material::Petg => "PETG",
            Material::Tpu => "TPU",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Material {
    type Err = AssessmentError;

    /// Keys are matched exactly; `"pla"` is not `"PLA"`.
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Material::ALL
            .into_iter()
            .find(|material| material.key() == key)
            .ok_or_else(|| AssessmentError::UnknownMaterial(key.to_string()))
    }
}

/// A closed numeric interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Distance of `value` from the band's midpoint, in units of band width.
    ///
    /// A value on either edge deviates by `0.5`. Zero-width bands cannot be
    /// normalized and yield [`AssessmentError::DegenerateRange`].
    pub fn relative_deviation(
        &self,
        value: f64,
        material: Material,
        field: &'static str,
    ) -> Result<f64, AssessmentError> {
        let span = self.span();
        if span == 0.0 {
            return Err(AssessmentError::DegenerateRange {
                material: material.key().to_string(),
                field,
            });
        }
        Ok((value - self.midpoint()).abs() / span)
    }

    fn validate(&self, material: Material, field: &'static str) -> Result<(), CatalogError> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(CatalogError::DegenerateRange {
                material: material.key().to_string(),
                field,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Static reference bounds for one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProfile {
    pub material: Material,
    /// Valid nozzle temperature band, °C.
    pub temperature_range: Band,
    /// Valid bed temperature band, °C.
    pub bed_temperature_range: Band,
    /// Nominal speed ceiling in mm/s; jobs may exceed it with a penalty.
    pub max_speed: f64,
    /// Part-cooling fan band, percent.
    pub fan_speed_range: Band,
    /// Layer heights the material prints well at, mm.
    pub typical_layer_height_range: Band,
    /// Wall thickness band for sound parts, mm.
    pub optimal_wall_thickness_range: Band,
    pub moisture_sensitive: bool,
    pub abrasive: bool,
}

impl MaterialProfile {
    /// Check that every band is non-degenerate and the speed ceiling is positive.
    pub fn validate(&self) -> Result<(), CatalogError> {
        self.temperature_range.validate(self.material, "temperature")?;
        self.bed_temperature_range.validate(self.material, "bed temperature")?;
        self.fan_speed_range.validate(self.material, "fan speed")?;
        self.typical_layer_height_range.validate(self.material, "layer height")?;
        self.optimal_wall_thickness_range.validate(self.material, "wall thickness")?;

        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(CatalogError::NonPositiveMaxSpeed {
                material: self.material.key().to_string(),
                max_speed: self.max_speed,
            });
        }

        Ok(())
    }
}

/// Reference data for every supported material.
///
/// Built once at start-up and shared read-only (typically behind an `Arc`).
/// Construction validates every profile, so a catalog value can never hold a
/// zero-width band.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialCatalog {
    pla: MaterialProfile,
    abs: MaterialProfile,
    petg: MaterialProfile,
    tpu: MaterialProfile,
}

impl MaterialCatalog {
    /// The built-in catalog for PLA, ABS, PETG and TPU.
    pub fn standard() -> Result<Self, CatalogError> {
        let catalog = Self {
            pla: MaterialProfile {
                material: Material::Pla,
                temperature_range: Band::new(180.0, 220.0),
                bed_temperature_range: Band::new(50.0, 70.0),
                max_speed: 120.0,
                fan_speed_range: Band::new(70.0, 100.0),
                typical_layer_height_range: Band::new(0.1, 0.3),
                optimal_wall_thickness_range: Band::new(0.4, 1.2),
                moisture_sensitive: false,
                abrasive: false,
            },
            abs: MaterialProfile {
                material: Material::Abs,
                temperature_range: Band::new(220.0, 250.0),
                bed_temperature_range: Band::new(95.0, 110.0),
                max_speed: 100.0,
                fan_speed_range: Band::new(0.0, 30.0),
                typical_layer_height_range: Band::new(0.1, 0.3),
                optimal_wall_thickness_range: Band::new(0.4, 1.6),
                moisture_sensitive: true,
                abrasive: false,
            },
            petg: MaterialProfile {
                material: Material::Petg,
                temperature_range: Band::new(230.0, 250.0),
                bed_temperature_range: Band::new(75.0, 90.0),
                max_speed: 90.0,
                fan_speed_range: Band::new(30.0, 50.0),
                typical_layer_height_range: Band::new(0.1, 0.3),
                optimal_wall_thickness_range: Band::new(0.4, 1.4),
                moisture_sensitive: true,
                abrasive: false,
            },
            tpu: MaterialProfile {
                material: Material::Tpu,
                temperature_range: Band::new(220.0, 235.0),
                bed_temperature_range: Band::new(30.0, 45.0),
                max_speed: 40.0,
                fan_speed_range: Band::new(50.0, 70.0),
                typical_layer_height_range: Band::new(0.1, 0.25),
                optimal_wall_thickness_range: Band::new(0.8, 2.0),
                moisture_sensitive: true,
                abrasive: false,
            },
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Replace the profile for `profile.material`, validating it first.
    pub fn with_profile(mut self, profile: MaterialProfile) -> Result<Self, CatalogError> {
        profile.validate()?;
        let material = profile.material;
        *self.slot_mut(material) = profile;
        Ok(self)
    }

    /// Resolve a wire key such as `"PETG"` to its profile.
    pub fn lookup(&self, key: &str) -> Result<&MaterialProfile, AssessmentError> {
        let material = key.parse::<Material>()?;
        Ok(self.profile(material))
    }

    pub fn profile(&self, material: Material) -> &MaterialProfile {
        match material {
            Material::Pla => &self.pla,
            Material::Abs => &self.abs,
            Material::Petg => &self.petg,
            Material::Tpu => &self.tpu,
        }
    }

    /// Supported material keys, for capability discovery.
    pub fn keys(&self) -> Vec<&'static str> {
        Material::ALL.iter().map(|material| material.key()).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &MaterialProfile> {
        Material::ALL.into_iter().map(|material| self.profile(material))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        self.profiles().try_for_each(MaterialProfile::validate)
    }

    fn slot_mut(&mut self, material: Material) -> &mut MaterialProfile {
        match material {
            Material::Pla => &mut self.pla,
            Material::Abs => &mut self.abs,
            Material::Petg => &mut self.petg,
            Material::Tpu => &mut self.tpu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_has_no_degenerate_bands() {
        let catalog = MaterialCatalog::standard().expect("standard catalog is valid");
        for profile in catalog.profiles() {
            assert!(profile.temperature_range.span() > 0.0, "{}", profile.material);
            assert!(profile.bed_temperature_range.span() > 0.0, "{}", profile.material);
            assert!(profile.fan_speed_range.span() > 0.0, "{}", profile.material);
            assert!(profile.typical_layer_height_range.span() > 0.0, "{}", profile.material);
            assert!(profile.optimal_wall_thickness_range.span() > 0.0, "{}", profile.material);
            assert!(profile.max_speed > 0.0);
        }
    }

    #[test]
    fn test_lookup_resolves_each_key() {
        let catalog = MaterialCatalog::standard().unwrap();
        for key in ["PLA", "ABS", "PETG", "TPU"] {
            let profile = catalog.lookup(key).unwrap();
            assert_eq!(profile.material.key(), key);
        }
        assert_eq!(catalog.keys(), vec!["PLA", "ABS", "PETG", "TPU"]);
    }

    #[test]
    fn test_lookup_rejects_unknown_and_miscased_keys() {
        let catalog = MaterialCatalog::standard().unwrap();
        assert_eq!(
            catalog.lookup("XYZ"),
            Err(AssessmentError::UnknownMaterial("XYZ".to_string()))
        );
        assert!(catalog.lookup("pla").is_err());
        assert!(catalog.lookup("").is_err());
    }

    #[test]
    fn test_abs_profile_flags() {
        let catalog = MaterialCatalog::standard().unwrap();
        let abs = catalog.profile(Material::Abs);
        assert!(abs.moisture_sensitive);
        assert!(!abs.abrasive);
        assert_eq!(abs.temperature_range.midpoint(), 235.0);
    }

    #[test]
    fn test_with_profile_rejects_zero_width_band() {
        let catalog = MaterialCatalog::standard().unwrap();
        let mut broken = catalog.profile(Material::Tpu).clone();
        broken.bed_temperature_range = Band::new(40.0, 40.0);

        let err = catalog.with_profile(broken).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DegenerateRange { field: "bed temperature", .. }
        ));
    }

    #[test]
    fn test_with_profile_rejects_zero_max_speed() {
        let catalog = MaterialCatalog::standard().unwrap();
        let mut broken = catalog.profile(Material::Pla).clone();
        broken.max_speed = 0.0;
        assert!(matches!(
            catalog.with_profile(broken),
            Err(CatalogError::NonPositiveMaxSpeed { .. })
        ));
    }

    #[test]
    fn test_with_profile_replaces_only_its_material() {
        let catalog = MaterialCatalog::standard().unwrap();
        let mut abrasive_pla = catalog.profile(Material::Pla).clone();
        abrasive_pla.abrasive = true;

        let updated = catalog.clone().with_profile(abrasive_pla).unwrap();
        assert!(updated.profile(Material::Pla).abrasive);
        assert_eq!(updated.profile(Material::Abs), catalog.profile(Material::Abs));
    }

    #[test]
    fn test_relative_deviation_on_degenerate_band() {
        let band = Band::new(200.0, 200.0);
        assert_eq!(
            band.relative_deviation(210.0, Material::Pla, "temperature"),
            Err(AssessmentError::DegenerateRange {
                material: "PLA".to_string(),
                field: "temperature",
            })
        );
    }

    #[test]
    fn test_relative_deviation_at_edges_is_half() {
        let band = Band::new(180.0, 220.0);
        let low = band.relative_deviation(180.0, Material::Pla, "temperature").unwrap();
        let high = band.relative_deviation(220.0, Material::Pla, "temperature").unwrap();
        assert_eq!(low, 0.5);
        assert_eq!(high, 0.5);
    }
}
