// src/types/triangle.rs

use crate::types::Point3D;
use rand::Rng;

/// Berechnet die Fläche des Dreiecks (v0, v1, v2).
pub fn triangle_area(v0: Point3D, v1: Point3D, v2: Point3D) -> f32 {
    (v1 - v0).cross(v2 - v0).length() * 0.5
}

/// Ein Dreieck mit dem Index des Ursprungspolygons und gecachter Fläche.
///
/// Die Fläche wird beim Erstellen einmal berechnet; beim Fragmentieren
/// erben die Kinder den Ursprungsindex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3D,
    pub v1: Point3D,
    pub v2: Point3D,
    /// Index des Polygons, aus dem dieses Dreieck stammt.
    pub origin: usize,
    pub area: f32,
}

impl Triangle {
    pub fn new(v0: Point3D, v1: Point3D, v2: Point3D, origin: usize) -> Self {
        Self {
            v0,
            v1,
            v2,
            origin,
            area: triangle_area(v0, v1, v2),
        }
    }

    /// Normale des Dreiecks (nicht normalisiert bei degenerierten Dreiecken
    /// definiert als Nullvektor).
    pub fn normal(&self) -> Point3D {
        let n = (self.v1 - self.v0).cross(self.v2 - self.v0);
        n.normalize_or_zero()
    }

    /// Fragmentiert das Dreieck in 4 Sub-Dreiecke, indem auf jeder Kante
    /// ein Mittelpunkt eingeführt wird.
    pub fn fragment(&self) -> [Triangle; 4] {
        let v01 = (self.v0 + self.v1) * 0.5;
        let v12 = (self.v1 + self.v2) * 0.5;
        let v20 = (self.v2 + self.v0) * 0.5;

        [
            Triangle::new(self.v0, v01, v20, self.origin),
            Triangle::new(v01, self.v1, v12, self.origin),
            Triangle::new(v12, self.v2, v20, self.origin),
            Triangle::new(v20, v01, v12, self.origin),
        ]
    }

    /// Zufälliger Punkt auf dem Dreieck über eine zufällige baryzentrische
    /// Koordinate. Die Ziehreihenfolge (erst r, dann s) bleibt stabil, damit
    /// ein fester Seed reproduzierbare Verteilungen liefert.
    pub fn random_point<R: Rng>(&self, rng: &mut R) -> Point3D {
        let e0 = self.v1 - self.v0;
        let e1 = self.v2 - self.v0;

        let mut r = rng.gen_range(0.0..1.0f32);
        let mut s = rng.gen_range(0.0..1.0f32);

        if r + s >= 1.0 {
            r = 1.0 - r;
            s = 1.0 - s;
        }

        self.v0 + r * e0 + s * e1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::utils::comparison;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn unit_right_triangle() -> Triangle {
        Triangle::new(
            Point3D::ZERO,
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(0.0, 1.0, 0.0),
            7,
        )
    }

    #[test]
    fn test_cached_area() {
        let tri = unit_right_triangle();
        assert_relative_eq!(tri.area, 0.5);
        assert_relative_eq!(tri.normal().z, 1.0);
    }

    #[test]
    fn test_fragment_preserves_area_and_origin() {
        let tri = unit_right_triangle();
        let children = tri.fragment();

        let child_area: f32 = children.iter().map(|c| c.area).sum();
        assert_relative_eq!(child_area, tri.area);

        for child in &children {
            assert_eq!(child.origin, tri.origin);
            // Gleichmäßige Viertelung
            assert!(comparison::nearly_equal(child.area, tri.area * 0.25));
        }
    }

    #[test]
    fn test_random_point_stays_on_triangle() {
        let tri = unit_right_triangle();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let p = tri.random_point(&mut rng);
            assert!(p.x >= 0.0 && p.y >= 0.0);
            assert!(p.x + p.y <= 1.0 + crate::utils::constants::EPSILON);
            assert!(comparison::nearly_zero(p.z));
        }
    }
}
