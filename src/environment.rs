//! Barometric altitude and air density

/// Standard sea-level pressure (hPa)
pub const SEA_LEVEL_PRESSURE_HPA: f32 = 1013.25;

/// Air density of the standard atmosphere at sea level (kg/m³)
pub const STANDARD_AIR_DENSITY: f32 = 1.225;

/// Specific gas constant for dry air (J/(kg·K))
const R_DRY_AIR: f32 = 287.05;
/// Specific gas constant for water vapour (J/(kg·K))
const R_WATER_VAPOUR: f32 = 461.495;
const CELSIUS_TO_KELVIN: f32 = 273.15;

/// Altitude in metres above the standard sea-level reference
///
/// International barometric formula: `44330 × (1 − (P / 1013.25)^0.1903)`.
///
/// # Example
/// ```
/// use swing_fusion::environment::altitude;
///
/// assert_eq!(altitude(1013.25), 0.0);
/// assert!(altitude(900.0) > 0.0);
/// ```
pub fn altitude(pressure_hpa: f32) -> f32 {
    44330.0 * (1.0 - (pressure_hpa / SEA_LEVEL_PRESSURE_HPA).powf(0.1903))
}

/// Saturation vapour pressure over water (Pa), Magnus-Tetens form
fn saturation_vapour_pressure(temperature_c: f32) -> f32 {
    611.0 * (17.27 * temperature_c / (temperature_c + 237.3)).exp()
}

/// Density of moist air (kg/m³)
///
/// Sums the partial densities of dry air and water vapour. Relative humidity
/// is clamped to 0..=100 %.
///
/// # Arguments
/// * `pressure_pa` - Absolute pressure in Pa
/// * `temperature_k` - Temperature in K
/// * `humidity` - Relative humidity in %
pub fn air_density(pressure_pa: f32, temperature_k: f32, humidity: f32) -> f32 {
    let relative = humidity.clamp(0.0, 100.0) / 100.0;
    let vapour = relative * saturation_vapour_pressure(temperature_k - CELSIUS_TO_KELVIN);

    (pressure_pa - vapour) / (R_DRY_AIR * temperature_k) + vapour / (R_WATER_VAPOUR * temperature_k)
}

/// Environmental snapshot, consistent with the inputs last used to compute it
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvironmentalConditions {
    /// °C
    pub temperature: f32,
    /// %RH
    pub humidity: f32,
    /// hPa
    pub pressure: f32,
    /// m
    pub altitude: f32,
    /// kg/m³
    pub air_density: f32,
}

impl Default for EnvironmentalConditions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            humidity: 0.0,
            pressure: 0.0,
            altitude: 0.0,
            air_density: STANDARD_AIR_DENSITY,
        }
    }
}

impl EnvironmentalConditions {
    /// Compute every derived field from pressure (hPa), temperature (°C) and humidity (%RH)
    pub fn compute(pressure: f32, temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
            altitude: altitude(pressure),
            air_density: air_density(pressure * 100.0, temperature + CELSIUS_TO_KELVIN, humidity),
        }
    }
}

/// Collects pressure, temperature and humidity readings as they arrive and
/// recomputes the whole snapshot on each one
///
/// Until a positive pressure has been seen, altitude and air density keep
/// their sea-level defaults.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentMonitor {
    pressure: Option<f32>,
    temperature: f32,
    humidity: f32,
    conditions: EnvironmentalConditions,
}

impl EnvironmentMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_pressure(&mut self, pressure_hpa: f32) -> EnvironmentalConditions {
        self.pressure = (pressure_hpa > 0.0).then_some(pressure_hpa);
        self.recompute()
    }

    pub fn update_temperature(&mut self, temperature_c: f32) -> EnvironmentalConditions {
        self.temperature = temperature_c;
        self.recompute()
    }

    pub fn update_humidity(&mut self, humidity: f32) -> EnvironmentalConditions {
        self.humidity = humidity;
        self.recompute()
    }

    pub fn conditions(&self) -> EnvironmentalConditions {
        self.conditions
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn recompute(&mut self) -> EnvironmentalConditions {
        self.conditions = match self.pressure {
            Some(pressure) => EnvironmentalConditions::compute(pressure, self.temperature, self.humidity),
            None => EnvironmentalConditions {
                temperature: self.temperature,
                humidity: self.humidity,
                ..Default::default()
            },
        };
        self.conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_altitude_at_sea_level_is_zero() {
        assert_eq!(altitude(SEA_LEVEL_PRESSURE_HPA), 0.0);
    }

    #[test]
    fn test_altitude_decreases_with_pressure() {
        assert!(altitude(900.0) > 0.0);
        let altitudes: Vec<f32> = (800..=1050).step_by(10).map(|p| altitude(p as f32)).collect();
        assert!(altitudes.windows(2).all(|w| w[1] < w[0]));
        // Roughly 988 m at 900 hPa
        assert_relative_eq!(altitude(900.0), 988.5, epsilon = 2.0);
    }

    #[test]
    fn test_dry_standard_atmosphere_density() {
        let density = air_density(101_325.0, 288.15, 0.0);
        assert!((density - STANDARD_AIR_DENSITY).abs() / STANDARD_AIR_DENSITY < 0.01);
    }

    #[test]
    fn test_humid_air_is_lighter() {
        let dry = air_density(101_325.0, 303.15, 0.0);
        let humid = air_density(101_325.0, 303.15, 80.0);
        assert!(humid < dry);
        // Water vapour at 30 °C and 80 %RH lowers density by about 1 %
        assert!((dry - humid) / dry < 0.02);
    }

    #[test]
    fn test_monitor_recomputes_wholesale() {
        let mut monitor = EnvironmentMonitor::new();
        assert_eq!(monitor.conditions(), EnvironmentalConditions::default());

        monitor.update_temperature(15.0);
        assert_eq!(monitor.conditions().air_density, STANDARD_AIR_DENSITY);
        assert_eq!(monitor.conditions().altitude, 0.0);

        let conditions = monitor.update_pressure(1013.25);
        assert_eq!(conditions.temperature, 15.0);
        assert_relative_eq!(conditions.air_density, 1.225, epsilon = 0.005);

        let humid = monitor.update_humidity(60.0);
        assert_eq!(humid.pressure, 1013.25);
        assert!(humid.air_density < conditions.air_density);

        monitor.reset();
        assert_eq!(monitor.conditions(), EnvironmentalConditions::default());
    }
}
