// src/mesh.rs

use crate::types::{Point3D, Triangle};
use std::collections::{HashMap, HashSet};

/// Schnittstelle zum Mesh-Container des Aufrufers.
///
/// Das Crate besitzt keine eigenen Mesh-Daten; es liest nur Polygonanzahl,
/// Eckpunktanzahl und Positionen, um N-Gone vor dem Sampling zu
/// fächer-triangulieren. Gruppenzugehörigkeit ist optional und dient der
/// Einschränkung des Samplings auf eine benannte Primitivgruppe.
pub trait SurfaceMesh {
    fn polygon_count(&self) -> usize;

    fn vertex_count(&self, polygon: usize) -> usize;

    fn position(&self, polygon: usize, vertex: usize) -> Point3D;

    /// Existiert eine Primitivgruppe mit diesem Namen?
    fn has_group(&self, _name: &str) -> bool {
        false
    }

    /// Liegt das Polygon in der benannten Gruppe?
    fn group_contains(&self, _name: &str, _polygon: usize) -> bool {
        false
    }
}

/// Fächer-trianguliert alle Polygone eines Meshes.
///
/// Ein Polygon mit n Eckpunkten zerfällt in n - 2 Dreiecke; jedes Dreieck
/// behält den Index seines Ursprungspolygons. Mit `group` wird nur über
/// die Polygone der benannten Gruppe trianguliert.
pub fn collect_triangles<M: SurfaceMesh>(mesh: &M, group: Option<&str>) -> Vec<Triangle> {
    let mut triangle_count = 0usize;
    for polygon in 0..mesh.polygon_count() {
        triangle_count += mesh.vertex_count(polygon).saturating_sub(2);
    }

    let mut triangles = Vec::with_capacity(triangle_count);

    for polygon in 0..mesh.polygon_count() {
        if let Some(name) = group {
            if !mesh.group_contains(name, polygon) {
                continue;
            }
        }

        let v0 = mesh.position(polygon, 0);

        for vertex in 2..mesh.vertex_count(polygon) {
            let v1 = mesh.position(polygon, vertex - 1);
            let v2 = mesh.position(polygon, vertex);
            triangles.push(Triangle::new(v0, v1, v2, polygon));
        }
    }

    triangles
}

/// Einfache indizierte Mesh-Repräsentation.
///
/// Dient als Referenz-Implementierung der [`SurfaceMesh`]-Schnittstelle
/// und als Baustein für Tests.
#[derive(Debug, Clone, Default)]
pub struct IndexedMesh {
    pub positions: Vec<Point3D>,
    pub polygons: Vec<Vec<usize>>,
    groups: HashMap<String, HashSet<usize>>,
}

impl IndexedMesh {
    pub fn new(positions: Vec<Point3D>, polygons: Vec<Vec<usize>>) -> Self {
        Self {
            positions,
            polygons,
            groups: HashMap::new(),
        }
    }

    /// Einheitsquadrat in der XY-Ebene aus zwei Dreiecken.
    pub fn unit_square() -> Self {
        Self::new(
            vec![
                Point3D::new(0.0, 0.0, 0.0),
                Point3D::new(1.0, 0.0, 0.0),
                Point3D::new(1.0, 1.0, 0.0),
                Point3D::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2], vec![0, 2, 3]],
        )
    }

    pub fn add_group<I>(&mut self, name: &str, polygons: I)
    where
        I: IntoIterator<Item = usize>,
    {
        self.groups
            .entry(name.to_string())
            .or_default()
            .extend(polygons);
    }
}

impl SurfaceMesh for IndexedMesh {
    fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    fn vertex_count(&self, polygon: usize) -> usize {
        self.polygons[polygon].len()
    }

    fn position(&self, polygon: usize, vertex: usize) -> Point3D {
        self.positions[self.polygons[polygon][vertex]]
    }

    fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    fn group_contains(&self, name: &str, polygon: usize) -> bool {
        self.groups
            .get(name)
            .is_some_and(|members| members.contains(&polygon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::comparison;

    #[test]
    fn test_fan_triangulation_counts() {
        // Ein Fünfeck zerfällt in 3 Dreiecke, ein Viereck in 2.
        let mesh = IndexedMesh::new(
            vec![
                Point3D::new(0.0, 0.0, 0.0),
                Point3D::new(1.0, 0.0, 0.0),
                Point3D::new(1.5, 1.0, 0.0),
                Point3D::new(0.5, 1.8, 0.0),
                Point3D::new(-0.5, 1.0, 0.0),
                Point3D::new(0.0, 0.0, 1.0),
                Point3D::new(1.0, 0.0, 1.0),
                Point3D::new(1.0, 1.0, 1.0),
                Point3D::new(0.0, 1.0, 1.0),
            ],
            vec![vec![0, 1, 2, 3, 4], vec![5, 6, 7, 8]],
        );

        let triangles = collect_triangles(&mesh, None);
        assert_eq!(triangles.len(), 5);
        assert_eq!(triangles[0].origin, 0);
        assert_eq!(triangles[3].origin, 1);
    }

    #[test]
    fn test_unit_square_area() {
        let triangles = collect_triangles(&IndexedMesh::unit_square(), None);
        let total: f32 = triangles.iter().map(|t| t.area).sum();
        assert!(comparison::nearly_equal(total, 1.0));
    }

    #[test]
    fn test_group_filter() {
        let mut mesh = IndexedMesh::unit_square();
        mesh.add_group("front", [1]);

        let triangles = collect_triangles(&mesh, Some("front"));
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].origin, 1);

        assert!(mesh.has_group("front"));
        assert!(!mesh.has_group("back"));
    }
}
