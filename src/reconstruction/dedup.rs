// src/reconstruction/dedup.rs

use bevy::log::debug;

use crate::reconstruction::alpha_shape::AlphaShapeMesh;
use crate::spatial::KdTree;
use crate::types::Point3D;

/// Ergebnis der Doublettenbereinigung: die behaltenen Punkte plus die
/// Abbildung alter Index -> neuer Index.
#[derive(Debug, Clone)]
pub struct DedupResult {
    pub points: Vec<Point3D>,
    pub remap: Vec<usize>,
}

/// Kollabiert Punkte, die näher als `distance` beieinanderliegen, auf
/// einen Repräsentanten.
///
/// Greedy in Indexreihenfolge: der erste Punkt eines Clusters bleibt,
/// alle noch nicht vergebenen Nachbarn im Radius werden ihm zugeordnet.
/// `remap[alt]` liefert den Index des Repräsentanten in der bereinigten
/// Liste.
pub fn collapse_duplicates(points: &[Point3D], distance: f32) -> DedupResult {
    let tree = KdTree::from_points(points);

    let mut owner: Vec<Option<usize>> = vec![None; points.len()];
    let mut remap = vec![0usize; points.len()];
    let mut kept = Vec::new();

    for i in 0..points.len() {
        if owner[i].is_some() {
            continue;
        }
        owner[i] = Some(i);
        remap[i] = kept.len();
        kept.push(points[i]);

        tree.search(points[i], distance, |j, _, _, _| {
            if owner[j].is_none() {
                owner[j] = Some(i);
            }
        });
    }

    let mut duplicates = 0usize;
    for (j, assigned) in owner.iter().enumerate() {
        if let Some(representative) = assigned {
            if *representative != j {
                remap[j] = remap[*representative];
                duplicates += 1;
            }
        }
    }

    debug!("{} Doubletten von {} Punkten kollabiert", duplicates, points.len());

    DedupResult {
        points: kept,
        remap,
    }
}

/// Schweißt eine Dreieckssuppe zu einem indizierten Mesh zusammen.
///
/// Eckpunkte im Abstand unter `distance` werden verschmolzen; danach
/// fallen degenerierte Dreiecke (doppelte Ecken) sowie Mehrfachkopien
/// derselben Fläche (Vergleich über das sortierte Indextripel) weg.
pub fn weld_mesh(mesh: &AlphaShapeMesh, distance: f32) -> AlphaShapeMesh {
    let collapsed = collapse_duplicates(&mesh.points, distance);

    let mut seen = std::collections::HashSet::new();
    let mut triangles = Vec::with_capacity(mesh.triangles.len());

    for triangle in &mesh.triangles {
        let mapped = [
            collapsed.remap[triangle[0]],
            collapsed.remap[triangle[1]],
            collapsed.remap[triangle[2]],
        ];

        if mapped[0] == mapped[1] || mapped[1] == mapped[2] || mapped[0] == mapped[2] {
            continue;
        }

        let mut key = mapped;
        key.sort_unstable();
        if seen.insert(key) {
            triangles.push(mapped);
        }
    }

    AlphaShapeMesh {
        points: collapsed.points,
        triangles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruction::alpha_shape::build_alpha_shape;

    #[test]
    fn test_cluster_collapses_to_first_point() {
        let points = vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(0.001, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(0.0, 0.001, 0.0),
        ];

        let result = collapse_duplicates(&points, 0.01);
        assert_eq!(result.points.len(), 2);
        assert_eq!(result.points[0], points[0]);
        assert_eq!(result.points[1], points[2]);

        assert_eq!(result.remap, vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_distant_points_survive() {
        let points = vec![
            Point3D::ZERO,
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(0.0, 1.0, 0.0),
        ];

        let result = collapse_duplicates(&points, 0.1);
        assert_eq!(result.points.len(), 3);
        assert_eq!(result.remap, vec![0, 1, 2]);
    }

    #[test]
    fn test_weld_tetrahedron_soup() {
        let points = vec![
            Point3D::new(1.0, 1.0, 1.0),
            Point3D::new(1.0, -1.0, -1.0),
            Point3D::new(-1.0, 1.0, -1.0),
            Point3D::new(-1.0, -1.0, 1.0),
        ];

        let soup = build_alpha_shape(&points, 2.0);
        let welded = weld_mesh(&soup, 1e-4);

        assert_eq!(welded.points.len(), 4);
        assert_eq!(welded.triangles.len(), 4);

        for triangle in &welded.triangles {
            for &index in triangle {
                assert!(index < welded.points.len());
            }
        }
    }
}
