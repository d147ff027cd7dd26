//! Shared nutrition data structure
//!
//! Used for scaled food portions, meal totals and day totals.

use serde::{Deserialize, Serialize};

/// Nutrient amounts for some quantity of food
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64, // grams
    pub carbs: f64,   // grams
    pub fat: f64,     // grams
    pub fiber: f64,   // grams
    pub sodium: f64,  // milligrams
}

impl Nutrition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale nutrition values by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein: self.protein * multiplier,
            carbs: self.carbs * multiplier,
            fat: self.fat * multiplier,
            fiber: self.fiber * multiplier,
            sodium: self.sodium * multiplier,
        }
    }

    /// Add another nutrition to this one
    pub fn add(&self, other: &Nutrition) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
            fiber: self.fiber + other.fiber,
            sodium: self.sodium + other.sodium,
        }
    }

    /// Copy with every field rounded to one decimal, for display
    pub fn rounded(&self) -> Self {
        let r = |v: f64| (v * 10.0).round() / 10.0;
        Self {
            calories: r(self.calories),
            protein: r(self.protein),
            carbs: r(self.carbs),
            fat: r(self.fat),
            fiber: r(self.fiber),
            sodium: r(self.sodium),
        }
    }
}

impl std::ops::Add for Nutrition {
    type Output = Nutrition;

    fn add(self, other: Nutrition) -> Nutrition {
        Nutrition::add(&self, &other)
    }
}

impl std::ops::AddAssign for Nutrition {
    fn add_assign(&mut self, other: Nutrition) {
        *self = Nutrition::add(self, &other);
    }
}

impl std::ops::Mul<f64> for Nutrition {
    type Output = Nutrition;

    fn mul(self, multiplier: f64) -> Nutrition {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for Nutrition {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrition::zero(), |acc, n| acc + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_scale() {
        let a = Nutrition {
            calories: 100.0,
            protein: 10.0,
            carbs: 5.0,
            fat: 2.0,
            fiber: 1.0,
            sodium: 50.0,
        };
        let total: Nutrition = vec![a, a * 0.5].into_iter().sum();
        assert_eq!(total.calories, 150.0);
        assert_eq!(total.sodium, 75.0);
    }

    #[test]
    fn test_rounded() {
        let n = Nutrition {
            calories: 123.456,
            ..Default::default()
        };
        assert_eq!(n.rounded().calories, 123.5);
    }
}
