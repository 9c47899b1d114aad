// src/sampling/fragment.rs

use bevy::log::warn;
use rand::Rng;

use crate::types::Triangle;
use crate::utils::constants::BUCKET_COUNT;

/// Ein Eimer für eine Flächen-Größenklasse.
///
/// Klasse i fasst Flächen im Intervall `(global_max / 2^(i+1),
/// global_max / 2^i]`, das Maximum ist also höchstens das Doppelte des
/// Minimums. Die Gesamtfläche wird inkrementell mitgeführt.
#[derive(Debug, Clone)]
struct FragmentBucket {
    fragments: Vec<Triangle>,
    min_area: f32,
    max_area: f32,
    total_area: f32,
}

impl FragmentBucket {
    fn new(max_area: f32) -> Self {
        Self {
            fragments: Vec::new(),
            min_area: max_area * 0.5,
            max_area,
            total_area: 0.0,
        }
    }

    fn push(&mut self, triangle: Triangle) {
        self.total_area += triangle.area;
        self.fragments.push(triangle);
    }

    fn swap_remove(&mut self, index: usize) -> Triangle {
        let triangle = self.fragments.swap_remove(index);
        self.total_area -= triangle.area;

        // Drift der inkrementellen Summe nicht in leere Eimer tragen.
        if self.fragments.is_empty() {
            self.total_area = 0.0;
        }

        triangle
    }
}

/// Pool lebender Dreiecksfragmente, nach Flächen-Größenordnung in 64
/// Eimer klassiert.
///
/// Ein einziges `global_max_area` (die größte Eingabedreiecksfläche)
/// fixiert die Klassengrenzen für den gesamten Lauf; so bleibt die
/// Klassifikation auch nach beliebig vielen Fragmentierungen stabil.
pub struct FragmentPool {
    buckets: Vec<FragmentBucket>,
    global_max_area: f32,
    total_area: f32,
}

impl FragmentPool {
    pub fn new(global_max_area: f32) -> Self {
        let buckets = (0..BUCKET_COUNT)
            .map(|i| FragmentBucket::new(global_max_area / (1u64 << i) as f32))
            .collect();

        Self {
            buckets,
            global_max_area,
            total_area: 0.0,
        }
    }

    /// Größenklasse einer Fläche: `floor(log2(global_max / area))`.
    /// `None` für Flächen, die keine gültige Klasse besitzen (nicht
    /// endlich, nicht positiv, oder feiner als Klasse 63).
    fn bucket_index(&self, area: f32) -> Option<usize> {
        if !area.is_finite() || area <= 0.0 {
            return None;
        }

        let magnitude = (self.global_max_area / area).log2();

        // Rundungsrauschen an der Obergrenze zählt zur Klasse 0.
        let index = magnitude.max(0.0) as usize;
        (index < BUCKET_COUNT).then_some(index)
    }

    /// Gesamtfläche aller lebenden Fragmente.
    pub fn total_area(&self) -> f32 {
        self.total_area
    }

    pub fn fragment_count(&self) -> usize {
        self.buckets.iter().map(|b| b.fragments.len()).sum()
    }

    /// Klassiert ein Eingabedreieck des Pre-Pass und legt es ab.
    pub fn add_initial(&mut self, triangle: Triangle) {
        self.add_fragment(triangle);
    }

    /// Klassiert ein (nach-)fragmentiertes Dreieck und legt es ab.
    /// Dreiecke ohne gültige Klasse werden mit Diagnose verworfen.
    pub fn add_fragment(&mut self, triangle: Triangle) {
        match self.bucket_index(triangle.area) {
            Some(index) => {
                self.total_area += triangle.area;
                self.buckets[index].push(triangle);
            }
            None => {
                warn!(
                    "Fragment mit Fläche {} außerhalb der Klassengrenzen verworfen",
                    triangle.area
                );
            }
        }
    }

    /// Zieht ein Fragment mit flächenproportionaler Wahrscheinlichkeit
    /// und entfernt es aus dem Pool.
    ///
    /// Eimerwahl: eine uniforme Schwelle gegen die Gesamtfläche, ein
    /// einziger linearer Scan über die 64 Eimer. Innerhalb des Eimers
    /// Rejection-Sampling mit Annahme `area / bucket_max` — beschränkt,
    /// weil das Klassenmaximum höchstens das Doppelte des Minimums ist.
    /// `None`, sobald der Pool leer ist.
    pub fn choose_fragment<R: Rng>(&mut self, rng: &mut R) -> Option<Triangle> {
        if self.total_area <= 0.0 {
            return None;
        }

        let threshold = rng.gen_range(0.0..self.total_area);

        let mut accumulated = 0.0f32;
        let mut chosen = None;
        for (index, bucket) in self.buckets.iter().enumerate() {
            if bucket.fragments.is_empty() {
                continue;
            }

            // Fallback gegen Summendrift: der letzte nichtleere Eimer
            // bleibt Kandidat, falls die Schwelle nie erreicht wird.
            chosen = Some(index);

            accumulated += bucket.total_area;
            if accumulated > threshold {
                break;
            }
        }

        let bucket_index = chosen?;
        let bucket = &mut self.buckets[bucket_index];

        loop {
            let candidate = rng.gen_range(0..bucket.fragments.len());
            let acceptance = bucket.fragments[candidate].area / bucket.max_area;

            if rng.gen_range(0.0..1.0f32) < acceptance {
                let triangle = bucket.swap_remove(candidate);
                self.total_area = (self.total_area - triangle.area).max(0.0);
                if self.fragment_count() == 0 {
                    self.total_area = 0.0;
                }
                return Some(triangle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point3D;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn triangle_with_area(area: f32) -> Triangle {
        // Rechtwinkliges Dreieck mit Katheten (2a, 1) hat Fläche a.
        Triangle::new(
            Point3D::ZERO,
            Point3D::new(2.0 * area, 0.0, 0.0),
            Point3D::new(0.0, 1.0, 0.0),
            0,
        )
    }

    #[test]
    fn test_classification_is_idempotent() {
        let pool = FragmentPool::new(8.0);

        for (area, expected) in [(8.0, 0), (4.1, 0), (4.0, 1), (1.0, 3), (0.6, 3)] {
            for _ in 0..3 {
                assert_eq!(pool.bucket_index(area), Some(expected), "area={}", area);
            }
        }
    }

    #[test]
    fn test_degenerate_and_undersized_areas_are_dropped() {
        let mut pool = FragmentPool::new(1.0);

        pool.add_fragment(Triangle::new(
            Point3D::ZERO,
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(2.0, 0.0, 0.0),
            0,
        ));
        assert_eq!(pool.fragment_count(), 0);

        // Klasse 64+ existiert nicht.
        assert_eq!(pool.bucket_index(1.0 / 2f32.powi(70)), None);
    }

    #[test]
    fn test_choose_drains_the_pool() {
        let mut pool = FragmentPool::new(1.0);
        for _ in 0..10 {
            pool.add_initial(triangle_with_area(1.0));
        }
        for _ in 0..6 {
            pool.add_initial(triangle_with_area(0.3));
        }

        let mut rng = StdRng::seed_from_u64(1);
        let mut drawn = 0;
        while pool.choose_fragment(&mut rng).is_some() {
            drawn += 1;
        }

        assert_eq!(drawn, 16);
        assert_eq!(pool.fragment_count(), 0);
        assert_eq!(pool.total_area(), 0.0);
    }

    #[test]
    fn test_draw_is_area_weighted() {
        // Ein großes Dreieck gegen viele kleine: das große muss deutlich
        // überproportional oft als Erstes gezogen werden.
        let mut rng = StdRng::seed_from_u64(7);
        let mut large_first = 0;

        for _ in 0..200 {
            let mut pool = FragmentPool::new(8.0);
            pool.add_initial(triangle_with_area(8.0));
            for _ in 0..8 {
                pool.add_initial(triangle_with_area(0.125));
            }

            let first = pool.choose_fragment(&mut rng).unwrap();
            if first.area > 1.0 {
                large_first += 1;
            }
        }

        // Erwartung 8/9 ≈ 178 von 200.
        assert!(large_first > 140, "large drawn first {} times", large_first);
    }
}
