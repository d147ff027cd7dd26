//! Body composition indices
//!
//! BMI, waist circumference and waist-hip ratio against sex-specific cutoffs,
//! and the circumference (US Navy) body fat estimate. Every function returns
//! `None` or `CutoffStatus::Unknown` instead of a wrong number when a required
//! measurement is missing (0 or negative).

use serde::{Deserialize, Serialize};

/// Sex designation used by the sex-specific formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }

    /// Lenient parse of a sex designation; anything else (including
    /// "other" or "prefer not to say") is `None`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" | "man" | "masc" | "masculino" | "homem" => Some(Sex::Male),
            "f" | "female" | "woman" | "fem" | "feminino" | "mulher" => Some(Sex::Female),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

/// Adult BMI bands (simplified WHO)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    ObesityI,
    ObesityII,
    ObesityIII,
}

impl BmiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "underweight",
            BmiCategory::Normal => "normal",
            BmiCategory::Overweight => "overweight",
            BmiCategory::ObesityI => "obesity_i",
            BmiCategory::ObesityII => "obesity_ii",
            BmiCategory::ObesityIII => "obesity_iii",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "underweight" => Some(BmiCategory::Underweight),
            "normal" => Some(BmiCategory::Normal),
            "overweight" => Some(BmiCategory::Overweight),
            "obesity_i" => Some(BmiCategory::ObesityI),
            "obesity_ii" => Some(BmiCategory::ObesityII),
            "obesity_iii" => Some(BmiCategory::ObesityIII),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::ObesityI => "Obesity I",
            BmiCategory::ObesityII => "Obesity II",
            BmiCategory::ObesityIII => "Obesity III",
        }
    }
}

/// Position of a measurement relative to its cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffStatus {
    Above,
    Below,
    Unknown,
}

impl CutoffStatus {
    /// The cutoff itself counts as above.
    fn compare(value: f64, cutoff: f64) -> Self {
        if value >= cutoff {
            CutoffStatus::Above
        } else {
            CutoffStatus::Below
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CutoffStatus::Above => "above",
            CutoffStatus::Below => "below",
            CutoffStatus::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "above" => CutoffStatus::Above,
            "below" => CutoffStatus::Below,
            _ => CutoffStatus::Unknown,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CutoffStatus::Above => "above cutoff",
            CutoffStatus::Below => "below cutoff",
            CutoffStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaistStatus {
    pub cutoff_cm: f64,
    pub status: CutoffStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaistHipRatio {
    pub cutoff: f64,
    pub ratio: Option<f64>,
    pub status: CutoffStatus,
}

const WAIST_CUTOFF_FEMALE_CM: f64 = 80.0;
const WAIST_CUTOFF_MALE_CM: f64 = 94.0;
const WHR_CUTOFF_FEMALE: f64 = 0.85;
const WHR_CUTOFF_MALE: f64 = 1.00;

/// Body mass index in kg/m²
pub fn bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(weight_kg / (height_m * height_m))
}

/// Bands are inclusive on their lower bound
pub fn classify_bmi(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else if bmi < 35.0 {
        BmiCategory::ObesityI
    } else if bmi < 40.0 {
        BmiCategory::ObesityII
    } else {
        BmiCategory::ObesityIII
    }
}

pub fn waist_status(sex: Sex, waist_cm: f64) -> WaistStatus {
    let cutoff_cm = match sex {
        Sex::Female => WAIST_CUTOFF_FEMALE_CM,
        Sex::Male => WAIST_CUTOFF_MALE_CM,
    };

    let status = if waist_cm <= 0.0 {
        CutoffStatus::Unknown
    } else {
        CutoffStatus::compare(waist_cm, cutoff_cm)
    };

    WaistStatus { cutoff_cm, status }
}

pub fn waist_hip_ratio(sex: Sex, waist_cm: f64, hip_cm: f64) -> WaistHipRatio {
    let cutoff = match sex {
        Sex::Female => WHR_CUTOFF_FEMALE,
        Sex::Male => WHR_CUTOFF_MALE,
    };

    if waist_cm <= 0.0 || hip_cm <= 0.0 {
        return WaistHipRatio {
            cutoff,
            ratio: None,
            status: CutoffStatus::Unknown,
        };
    }

    let ratio = waist_cm / hip_cm;
    WaistHipRatio {
        cutoff,
        ratio: Some(ratio),
        status: CutoffStatus::compare(ratio, cutoff),
    }
}

/// Circumference-based body fat percentage (US Navy)
///
/// Male:   495 / (1.0324 - 0.19077*log10(waist - neck) + 0.15456*log10(height)) - 450
/// Female: 495 / (1.29579 - 0.35004*log10(waist + hip - neck) + 0.22100*log10(height)) - 450
///
/// The male equation has no hip term, so `hip_cm` is ignored for men even when
/// supplied. Every log argument is checked positive before evaluation.
pub fn body_fat_percent(
    sex: Sex,
    height_cm: f64,
    waist_cm: f64,
    neck_cm: f64,
    hip_cm: Option<f64>,
) -> Option<f64> {
    if height_cm <= 0.0 || waist_cm <= 0.0 || neck_cm <= 0.0 {
        return None;
    }

    let denominator = match sex {
        Sex::Male => {
            let girth = waist_cm - neck_cm;
            if girth <= 0.0 {
                return None;
            }
            1.0324 - 0.19077 * girth.log10() + 0.15456 * height_cm.log10()
        }
        Sex::Female => {
            let hip_cm = hip_cm.filter(|h| *h > 0.0)?;
            let girth = waist_cm + hip_cm - neck_cm;
            if girth <= 0.0 {
                return None;
            }
            1.29579 - 0.35004 * girth.log10() + 0.22100 * height_cm.log10()
        }
    };

    let body_fat = 495.0 / denominator - 450.0;
    body_fat.is_finite().then_some(body_fat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_bmi_normal_adult() {
        let value = bmi(70.0, 175.0).unwrap();
        assert!(approx(value, 22.857, 0.001));
        assert_eq!(classify_bmi(value), BmiCategory::Normal);
    }

    #[test]
    fn test_bmi_requires_positive_inputs() {
        assert_eq!(bmi(0.0, 175.0), None);
        assert_eq!(bmi(70.0, 0.0), None);
        assert_eq!(bmi(-5.0, 175.0), None);
    }

    #[test]
    fn test_bmi_band_lower_bounds_are_inclusive() {
        assert_eq!(classify_bmi(18.49), BmiCategory::Underweight);
        assert_eq!(classify_bmi(18.5), BmiCategory::Normal);
        assert_eq!(classify_bmi(25.0), BmiCategory::Overweight);
        assert_eq!(classify_bmi(30.0), BmiCategory::ObesityI);
        assert_eq!(classify_bmi(35.0), BmiCategory::ObesityII);
        assert_eq!(classify_bmi(40.0), BmiCategory::ObesityIII);
        assert_eq!(classify_bmi(55.0), BmiCategory::ObesityIII);
    }

    #[test]
    fn test_waist_cutoff_is_inclusive() {
        let at = waist_status(Sex::Female, 80.0);
        assert_eq!(at.cutoff_cm, 80.0);
        assert_eq!(at.status, CutoffStatus::Above);

        let below = waist_status(Sex::Female, 79.9);
        assert_eq!(below.status, CutoffStatus::Below);

        let male = waist_status(Sex::Male, 93.0);
        assert_eq!(male.cutoff_cm, 94.0);
        assert_eq!(male.status, CutoffStatus::Below);
    }

    #[test]
    fn test_waist_missing_is_unknown() {
        let missing = waist_status(Sex::Male, 0.0);
        assert_eq!(missing.cutoff_cm, 94.0);
        assert_eq!(missing.status, CutoffStatus::Unknown);
    }

    #[test]
    fn test_waist_hip_ratio_boundary() {
        let whr = waist_hip_ratio(Sex::Male, 100.0, 100.0);
        assert_eq!(whr.cutoff, 1.0);
        assert_eq!(whr.ratio, Some(1.0));
        assert_eq!(whr.status, CutoffStatus::Above);

        let female = waist_hip_ratio(Sex::Female, 70.0, 100.0);
        assert_eq!(female.cutoff, 0.85);
        assert_eq!(female.status, CutoffStatus::Below);
    }

    #[test]
    fn test_waist_hip_ratio_unavailable() {
        let whr = waist_hip_ratio(Sex::Female, 80.0, 0.0);
        assert_eq!(whr.ratio, None);
        assert_eq!(whr.status, CutoffStatus::Unknown);
    }

    #[test]
    fn test_body_fat_male() {
        let bf = body_fat_percent(Sex::Male, 175.0, 90.0, 38.0, None).unwrap();
        // 495 / (1.0324 - 0.19077*log10(52) + 0.15456*log10(175)) - 450
        assert!(approx(bf, 20.4, 0.5), "got {}", bf);
    }

    #[test]
    fn test_body_fat_male_ignores_hip() {
        let without = body_fat_percent(Sex::Male, 175.0, 90.0, 38.0, None);
        let with = body_fat_percent(Sex::Male, 175.0, 90.0, 38.0, Some(104.0));
        assert_eq!(without, with);
    }

    #[test]
    fn test_body_fat_male_neck_not_below_waist() {
        assert_eq!(body_fat_percent(Sex::Male, 175.0, 90.0, 90.0, None), None);
        assert_eq!(body_fat_percent(Sex::Male, 175.0, 90.0, 0.0, None), None);
    }

    #[test]
    fn test_body_fat_female_requires_hip() {
        assert_eq!(body_fat_percent(Sex::Female, 165.0, 75.0, 33.0, None), None);
        assert_eq!(body_fat_percent(Sex::Female, 165.0, 75.0, 33.0, Some(0.0)), None);

        let bf = body_fat_percent(Sex::Female, 165.0, 75.0, 33.0, Some(100.0)).unwrap();
        assert!(bf > 20.0 && bf < 35.0, "got {}", bf);
    }

    #[test]
    fn test_sex_from_str_aliases() {
        assert_eq!(Sex::from_str("Masculino"), Some(Sex::Male));
        assert_eq!(Sex::from_str(" F "), Some(Sex::Female));
        assert_eq!(Sex::from_str("female"), Some(Sex::Female));
        assert_eq!(Sex::from_str("Outro/Prefiro não informar"), None);
    }
}
