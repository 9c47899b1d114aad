// src/spatial/distance_grid.rs

use crate::types::{Bounds3D, Point3D};
use std::collections::HashSet;

/// Faktor zwischen Zellgröße und Mindestabstand. Solange der
/// Abfrageradius unter der halben Zellgröße bleibt, erfasst die
/// Halbzellen-Nachbarschaft jede Zelle, in der ein Treffer liegen kann;
/// der Schlupf begrenzt zugleich die Anzahl der zu durchsuchenden
/// Zellen.
const CELL_SLACK: f32 = 10.0;

/// Uniforme Gitterstruktur für Mindestabstands- und Abdeckungsabfragen.
///
/// Akzeptierte Punkte werden in kubische Zellen über der Bounding Box des
/// Eingabe-Meshes einsortiert. Das Gitter ist die maßgebliche Quelle für
/// die Poisson-Disc-Invariante: ein Punkt wird nur akzeptiert, wenn
/// [`DistanceGrid::verify_min_distance`] ihn freigibt.
pub struct DistanceGrid {
    bounds: Bounds3D,
    cell_size: f32,
    resolution: [usize; 3],
    cells: Vec<Vec<Point3D>>,
}

impl DistanceGrid {
    /// Erstellt ein leeres Gitter über `bounds` mit einer Zellgröße von
    /// `CELL_SLACK * target_distance`. Degenerierte (ausdehnungslose)
    /// Achsen werden auf eine Auflösung von 1 geklemmt.
    pub fn new(min: Point3D, max: Point3D, target_distance: f32) -> Self {
        let bounds = Bounds3D::from_points(min, max);
        let cell_size = target_distance * CELL_SLACK;
        let extent = bounds.size();

        let resolution = [
            ((extent.x / cell_size) as usize).max(1),
            ((extent.y / cell_size) as usize).max(1),
            ((extent.z / cell_size) as usize).max(1),
        ];

        let cells = vec![Vec::new(); resolution[0] * resolution[1] * resolution[2]];

        Self {
            bounds,
            cell_size,
            resolution,
            cells,
        }
    }

    /// Abgeflachter Zellindex des (in die Domäne geklemmten) Punktes.
    fn cell_index(&self, point: Point3D) -> usize {
        let local = self.bounds.clamp_point(point) - self.bounds.min;

        let x = ((local.x / self.cell_size) as usize).min(self.resolution[0] - 1);
        let y = ((local.y / self.cell_size) as usize).min(self.resolution[1] - 1);
        let z = ((local.z / self.cell_size) as usize).min(self.resolution[2] - 1);

        x + y * self.resolution[0] + z * self.resolution[0] * self.resolution[1]
    }

    /// Sammelt die unterschiedlichen Zellen einer 3×3×3-Nachbarschaft mit
    /// halber Zellschrittweite um den Punkt. Meist fallen alle Offsets in
    /// dieselbe Zelle; das Set dedupliziert sie.
    fn neighborhood_cells(&self, point: Point3D, cells: &mut HashSet<usize>) {
        let step = self.cell_size * 0.5;

        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let probe = point
                        + Point3D::new(dx as f32 * step, dy as f32 * step, dz as f32 * step);
                    cells.insert(self.cell_index(probe));
                }
            }
        }
    }

    /// Fügt einen akzeptierten Punkt in seine Zelle ein.
    pub fn insert(&mut self, point: Point3D) {
        let index = self.cell_index(point);
        self.cells[index].push(point);
    }

    /// Prüft, ob `point` von allen gespeicherten Punkten mindestens
    /// `distance` entfernt ist. Bricht beim ersten Verstoß ab.
    pub fn verify_min_distance(&self, point: Point3D, distance: f32) -> bool {
        let mut candidates = HashSet::new();
        self.neighborhood_cells(point, &mut candidates);

        let distance_squared = distance * distance;

        for cell in candidates {
            for stored in &self.cells[cell] {
                if stored.distance_squared(point) < distance_squared {
                    return false;
                }
            }
        }

        true
    }

    /// Prüft, ob ein gespeicherter Punkt gleichzeitig alle drei Eckpunkte
    /// innerhalb von `radius` erreicht — dann gilt das Dreieck als
    /// abgedeckt und braucht keine weiteren Darts.
    pub fn triangle_covered(&self, v0: Point3D, v1: Point3D, v2: Point3D, radius: f32) -> bool {
        let mut candidates = HashSet::new();
        self.neighborhood_cells(v0, &mut candidates);
        self.neighborhood_cells(v1, &mut candidates);
        self.neighborhood_cells(v2, &mut candidates);

        let radius_squared = radius * radius;

        for cell in candidates {
            for stored in &self.cells[cell] {
                if stored.distance_squared(v0) <= radius_squared
                    && stored.distance_squared(v1) <= radius_squared
                    && stored.distance_squared(v2) <= radius_squared
                {
                    return true;
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grid_accepts_everything() {
        let grid = DistanceGrid::new(Point3D::ZERO, Point3D::ONE, 0.1);
        assert!(grid.verify_min_distance(Point3D::new(0.5, 0.5, 0.5), 0.1));
    }

    #[test]
    fn test_min_distance_violation() {
        let mut grid = DistanceGrid::new(Point3D::ZERO, Point3D::ONE, 0.1);
        grid.insert(Point3D::new(0.5, 0.5, 0.5));

        assert!(!grid.verify_min_distance(Point3D::new(0.52, 0.5, 0.5), 0.1));
        assert!(grid.verify_min_distance(Point3D::new(0.7, 0.5, 0.5), 0.1));
    }

    #[test]
    fn test_violation_across_cell_border() {
        // Punkte knapp beiderseits einer Zellgrenze müssen sich finden.
        let mut grid = DistanceGrid::new(Point3D::ZERO, Point3D::splat(10.0), 0.5);
        grid.insert(Point3D::new(4.99, 5.0, 5.0));

        assert!(!grid.verify_min_distance(Point3D::new(5.01, 5.0, 5.0), 0.5));
    }

    #[test]
    fn test_degenerate_flat_box() {
        // Ausdehnungslose Z-Achse: Auflösung wird auf 1 geklemmt.
        let mut grid = DistanceGrid::new(Point3D::ZERO, Point3D::new(1.0, 1.0, 0.0), 0.1);
        grid.insert(Point3D::new(0.5, 0.5, 0.0));
        assert!(!grid.verify_min_distance(Point3D::new(0.5, 0.55, 0.0), 0.1));
    }

    #[test]
    fn test_triangle_covered() {
        let mut grid = DistanceGrid::new(Point3D::ZERO, Point3D::ONE, 0.5);

        let v0 = Point3D::new(0.4, 0.4, 0.0);
        let v1 = Point3D::new(0.6, 0.4, 0.0);
        let v2 = Point3D::new(0.5, 0.6, 0.0);

        assert!(!grid.triangle_covered(v0, v1, v2, 0.5));

        // Ein Punkt in der Mitte erreicht alle drei Eckpunkte.
        grid.insert(Point3D::new(0.5, 0.47, 0.0));
        assert!(grid.triangle_covered(v0, v1, v2, 0.5));

        // Zu kleiner Radius deckt nicht ab.
        assert!(!grid.triangle_covered(v0, v1, v2, 0.05));
    }
}
