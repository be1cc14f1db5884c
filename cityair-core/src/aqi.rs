//! AQI categories on the US EPA scale, as used by the World Air Quality Index project.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Category for an AQI value. Negative or non-finite values have none.
    pub fn from_aqi(aqi: f64) -> Option<Self> {
        if !aqi.is_finite() || aqi < 0.0 {
            return None;
        }

        let category = match aqi {
            v if v <= 50.0 => AqiCategory::Good,
            v if v <= 100.0 => AqiCategory::Moderate,
            v if v <= 150.0 => AqiCategory::UnhealthyForSensitiveGroups,
            v if v <= 200.0 => AqiCategory::Unhealthy,
            v if v <= 300.0 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        };

        Some(category)
    }

    pub fn meaning(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    pub fn health_implications(&self) -> &'static str {
        match self {
            AqiCategory::Good => {
                "Air quality is considered satisfactory, and air pollution poses little or no risk."
            }
            AqiCategory::Moderate => {
                "Air quality is acceptable; however, for some pollutants there may be a moderate \
                 health concern for a very small number of people who are unusually sensitive to \
                 air pollution."
            }
            AqiCategory::UnhealthyForSensitiveGroups => {
                "Members of sensitive groups may experience health effects. The general public is \
                 not likely to be affected."
            }
            AqiCategory::Unhealthy => {
                "Everyone may begin to experience health effects; members of sensitive groups may \
                 experience more serious health effects."
            }
            AqiCategory::VeryUnhealthy => {
                "Health warnings of emergency conditions. The entire population is more likely to \
                 be affected."
            }
            AqiCategory::Hazardous => {
                "Health alert: everyone may experience more serious health effects."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive_upper() {
        assert_eq!(AqiCategory::from_aqi(0.0), Some(AqiCategory::Good));
        assert_eq!(AqiCategory::from_aqi(50.0), Some(AqiCategory::Good));
        assert_eq!(AqiCategory::from_aqi(51.0), Some(AqiCategory::Moderate));
        assert_eq!(AqiCategory::from_aqi(150.0), Some(AqiCategory::UnhealthyForSensitiveGroups));
        assert_eq!(AqiCategory::from_aqi(200.0), Some(AqiCategory::Unhealthy));
        assert_eq!(AqiCategory::from_aqi(300.0), Some(AqiCategory::VeryUnhealthy));
        assert_eq!(AqiCategory::from_aqi(301.0), Some(AqiCategory::Hazardous));
    }

    #[test]
    fn no_category_for_invalid_values() {
        assert_eq!(AqiCategory::from_aqi(-1.0), None);
        assert_eq!(AqiCategory::from_aqi(f64::NAN), None);
        assert_eq!(AqiCategory::from_aqi(f64::INFINITY), None);
    }

    #[test]
    fn texts_are_not_empty() {
        let all = [
            AqiCategory::Good,
            AqiCategory::Moderate,
            AqiCategory::UnhealthyForSensitiveGroups,
            AqiCategory::Unhealthy,
            AqiCategory::VeryUnhealthy,
            AqiCategory::Hazardous,
        ];
        for c in all {
            assert!(!c.meaning().is_empty());
            assert!(!c.health_implications().is_empty());
        }
    }
}
