// src/utils.rs

/// Mathematische Konstanten
pub mod constants {
    pub const EPSILON: f32 = 1e-6;

    /// Die Dichte der kompaktesten Kreispackung in der Ebene (Lagrange).
    /// Wird benutzt, um aus Fläche und Mindestabstand eine Punktanzahl
    /// abzuschätzen.
    pub const CIRCLE_PACKING_DENSITY: f32 = 0.906_899_7;

    /// Anzahl der Flächen-Magnitudenklassen des Fragment-Pools.
    pub const BUCKET_COUNT: usize = 64;

    pub const PI: f32 = std::f32::consts::PI;
    pub const TAU: f32 = std::f32::consts::TAU;
    pub const SQRT_2: f32 = 1.4142135623730951;
}

/// Vergleichsfunktionen mit Toleranz
pub mod comparison {
    use super::constants::EPSILON;

    /// Prüft ob zwei Floats (nahezu) gleich sind
    pub fn nearly_equal(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    /// Prüft ob Float (nahezu) Null ist
    pub fn nearly_zero(a: f32) -> bool {
        a.abs() < EPSILON
    }
}
