// src/reconstruction/alpha_shape.rs

use bevy::log::debug;

use crate::spatial::KdTree;
use crate::types::Point3D;

/// Rekonstruierte Dreieckssuppe.
///
/// Jedes Dreieck referenziert drei eigens angelegte Punkte; Eckpunkte
/// werden zwischen Dreiecken nicht geteilt. Dasselbe physische Dreieck
/// wird typischerweise einmal pro beteiligtem Apex emittiert — wer eine
/// geschlossene Mannigfaltigkeit braucht, schweißt nach
/// ([`crate::reconstruction::dedup::weld_mesh`]).
#[derive(Debug, Clone, Default)]
pub struct AlphaShapeMesh {
    pub points: Vec<Point3D>,
    pub triangles: Vec<[usize; 3]>,
}

impl AlphaShapeMesh {
    fn emit(&mut self, v0: Point3D, v1: Point3D, v2: Point3D) {
        let offset = self.points.len();
        self.points.push(v0);
        self.points.push(v1);
        self.points.push(v2);
        self.triangles.push([offset, offset + 1, offset + 2]);
    }
}

/// Konstruiert das Zentrum einer Kugel mit Radius `ball_radius` durch
/// die drei Punkte, oder `None`, wenn der Umkreisradius des Dreiecks
/// den Kugelradius übersteigt oder das Ergebnis nicht endlich ist.
///
/// Der Versatz entlang der Normale weicht von Schechter (2013) ab: dort
/// steht `sqrt(r² - r_x²)`, was hier negativ würde; `(r_x - r)²` bleibt
/// reell und liefert die brauchbare Hülle.
fn construct_sphere(x0: Point3D, x1: Point3D, x2: Point3D, ball_radius: f32) -> Option<Point3D> {
    let x0x1 = x0 - x1;
    let x1x2 = x1 - x2;
    let x2x0 = x2 - x0;

    let n = x0x1.cross(x1x2);
    let n_length = n.length();

    let circumradius = (x0x1.length() * x1x2.length() * x2x0.length()) / (2.0 * n_length);
    if circumradius > ball_radius {
        return None;
    }

    let inv_n_squared = 1.0 / (n_length * n_length);
    let half_inv_n_squared = 0.5 * inv_n_squared;

    // Baryzentrische Gewichte des Umkreiszentrums.
    let alpha = x1x2.length_squared() * x0x1.dot(x0 - x2) * half_inv_n_squared;
    let beta = (x0 - x2).length_squared() * (x1 - x0).dot(x1x2) * half_inv_n_squared;
    let gamma = x0x1.length_squared() * x2x0.dot(x2 - x1) * half_inv_n_squared;

    let circumcenter = alpha * x0 + beta * x1 + gamma * x2;

    let offset = ((circumradius - ball_radius) * (circumradius - ball_radius) * inv_n_squared)
        .sqrt();
    let center = circumcenter + offset * n;

    center.is_finite().then_some(center)
}

/// Rekonstruiert eine Dreiecksoberfläche aus einer ungeordneten
/// Punktwolke (Alpha-Shape nach Schechter 2013, partiell).
///
/// Für jeden Punkt p werden alle Nachbarn im Doppelradius gesammelt;
/// für jedes geordnete Nachbarpaar wird versucht, eine Kugel mit
/// `ball_radius` durch das Tripel zu legen. Liegt kein weiterer Nachbar
/// strikt in der Kugel, wird das Dreieck emittiert.
pub fn build_alpha_shape(points: &[Point3D], ball_radius: f32) -> AlphaShapeMesh {
    let mut mesh = AlphaShapeMesh::default();
    if points.is_empty() || !(ball_radius > 0.0) {
        return mesh;
    }

    let tree = KdTree::from_points(points);
    let mut neighbors: Vec<Point3D> = Vec::new();

    for (i, &point) in points.iter().enumerate() {
        neighbors.clear();
        tree.search(point, 2.0 * ball_radius, |index, pos, _, _| {
            if index != i {
                neighbors.push(pos);
            }
        });

        for j in 0..neighbors.len() {
            for k in 0..neighbors.len() {
                if k == j {
                    continue;
                }

                let Some(center) = construct_sphere(point, neighbors[j], neighbors[k], ball_radius)
                else {
                    continue;
                };

                let clear = neighbors
                    .iter()
                    .enumerate()
                    .filter(|&(index, _)| index != j && index != k)
                    .all(|(_, other)| other.distance(center) >= ball_radius);

                if clear {
                    mesh.emit(point, neighbors[j], neighbors[k]);
                }
            }
        }
    }

    debug!(
        "Alpha-Shape: {} Dreiecke aus {} Punkten",
        mesh.triangles.len(),
        points.len()
    );

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Regulärer Tetraeder mit Kantenlänge sqrt(8).
    fn tetrahedron() -> Vec<Point3D> {
        vec![
            Point3D::new(1.0, 1.0, 1.0),
            Point3D::new(1.0, -1.0, -1.0),
            Point3D::new(-1.0, 1.0, -1.0),
            Point3D::new(-1.0, -1.0, 1.0),
        ]
    }

    /// Schweißt die Suppe testseitig auf eindeutige Flächen zusammen,
    /// indem Eckpunkte gerastert und sortiert werden.
    fn unique_faces(mesh: &AlphaShapeMesh) -> HashSet<[[i64; 3]; 3]> {
        let quantize = |p: Point3D| {
            [
                (p.x * 1e4).round() as i64,
                (p.y * 1e4).round() as i64,
                (p.z * 1e4).round() as i64,
            ]
        };

        mesh.triangles
            .iter()
            .map(|tri| {
                let mut face = [
                    quantize(mesh.points[tri[0]]),
                    quantize(mesh.points[tri[1]]),
                    quantize(mesh.points[tri[2]]),
                ];
                face.sort_unstable();
                face
            })
            .collect()
    }

    #[test]
    fn test_sphere_construction_rejects_large_circumradius() {
        // Kantenlänge sqrt(8): Umkreisradius der Fläche ist
        // sqrt(8)/sqrt(3) ~ 1.633.
        let points = tetrahedron();
        assert!(construct_sphere(points[0], points[1], points[2], 1.0).is_none());
        assert!(construct_sphere(points[0], points[1], points[2], 2.0).is_some());
    }

    #[test]
    fn test_sphere_construction_rejects_degenerate_triangle() {
        let a = Point3D::ZERO;
        let b = Point3D::new(1.0, 0.0, 0.0);
        let c = Point3D::new(2.0, 0.0, 0.0);
        assert!(construct_sphere(a, b, c, 10.0).is_none());
    }

    #[test]
    fn test_sphere_center_is_equidistant_from_the_triple() {
        // Das Zentrum liegt auf der Normale durch das Umkreiszentrum und
        // ist damit von allen drei Punkten gleich weit entfernt.
        let points = tetrahedron();
        let center = construct_sphere(points[0], points[1], points[2], 2.0)
            .expect("Kugel konstruierbar");

        let d0 = points[0].distance(center);
        let d1 = points[1].distance(center);
        let d2 = points[2].distance(center);
        assert!((d0 - d1).abs() < 1e-3 && (d0 - d2).abs() < 1e-3);

        // Umkreisradius der Fläche ist die Untergrenze des Abstands.
        assert!(d0 >= (8.0f32 / 3.0).sqrt() - 1e-3);
    }

    #[test]
    fn test_tetrahedron_emits_all_four_faces() {
        let points = tetrahedron();

        // Kugelradius über dem Flächenumkreisradius (~1.633), unter dem
        // Doppelradius-Horizont der Nachbarschaft.
        let mesh = build_alpha_shape(&points, 2.0);

        assert!(!mesh.triangles.is_empty());
        let faces = unique_faces(&mesh);
        assert_eq!(faces.len(), 4);

        // Einmal pro beteiligtem Apex emittiert.
        assert_eq!(mesh.triangles.len() % 4, 0);
    }

    #[test]
    fn test_empty_and_degenerate_inputs() {
        assert!(build_alpha_shape(&[], 1.0).triangles.is_empty());
        assert!(build_alpha_shape(&tetrahedron(), 0.0).triangles.is_empty());
        assert!(
            build_alpha_shape(&[Point3D::ZERO, Point3D::ONE], 1.0)
                .triangles
                .is_empty()
        );
    }
}
