// src/types/bounds.rs

use crate::types::{Point2D, Point3D};
use std::fmt;

/// 2D Bounding Box (Axis-Aligned)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2D {
    pub min: Point2D,
    pub max: Point2D,
}

impl Bounds2D {
    /// Erstellt eine Bounding Box aus zwei beliebigen Punkten
    pub fn from_points(p1: Point2D, p2: Point2D) -> Self {
        Self {
            min: p1.min(p2),
            max: p1.max(p2),
        }
    }

    /// Prüft ob die Bounding Box leer ist
    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Größe der Bounding Box
    pub fn size(&self) -> Point2D {
        self.max - self.min
    }

    /// Prüft ob ein Punkt in der Bounding Box liegt
    pub fn contains_point(&self, point: Point2D) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// 3D Bounding Box (Axis-Aligned)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3D {
    pub min: Point3D,
    pub max: Point3D,
}

impl Bounds3D {
    /// Erstellt eine Bounding Box aus zwei beliebigen Punkten
    pub fn from_points(p1: Point3D, p2: Point3D) -> Self {
        Self {
            min: p1.min(p2),
            max: p1.max(p2),
        }
    }

    /// Erstellt eine Bounding Box die alle Punkte umschließt
    pub fn from_points_iter<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3D>,
    {
        let mut points_iter = points.into_iter();
        let first_point = points_iter.next()?;

        let mut bounds = Self {
            min: first_point,
            max: first_point,
        };

        for point in points_iter {
            bounds.expand_to_include_point(point);
        }

        Some(bounds)
    }

    /// Leere Bounding Box (ungültig)
    pub fn empty() -> Self {
        Self {
            min: Point3D::splat(f32::INFINITY),
            max: Point3D::splat(f32::NEG_INFINITY),
        }
    }

    /// Prüft ob die Bounding Box leer ist
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Größe der Bounding Box
    pub fn size(&self) -> Point3D {
        if self.is_empty() {
            Point3D::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Prüft ob ein Punkt in der Bounding Box liegt
    pub fn contains_point(&self, point: Point3D) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Erweitert die Bounding Box um einen Punkt
    pub fn expand_to_include_point(&mut self, point: Point3D) {
        if self.is_empty() {
            self.min = point;
            self.max = point;
        } else {
            self.min = self.min.min(point);
            self.max = self.max.max(point);
        }
    }

    /// Klemmt einen Punkt in die Bounding Box
    pub fn clamp_point(&self, point: Point3D) -> Point3D {
        point.clamp(self.min, self.max)
    }
}

impl fmt::Display for Bounds3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Bounds3D(empty)")
        } else {
            write!(f, "Bounds3D({:?} to {:?})", self.min, self.max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_iter() {
        let points = vec![
            Point3D::new(1.0, -2.0, 0.5),
            Point3D::new(-1.0, 3.0, 0.0),
            Point3D::new(0.0, 0.0, -4.0),
        ];

        let bounds = Bounds3D::from_points_iter(points).unwrap();
        assert_eq!(bounds.min, Point3D::new(-1.0, -2.0, -4.0));
        assert_eq!(bounds.max, Point3D::new(1.0, 3.0, 0.5));
    }

    #[test]
    fn test_empty_bounds() {
        let bounds = Bounds3D::empty();
        assert!(bounds.is_empty());
        assert_eq!(bounds.size(), Point3D::ZERO);
        assert!(Bounds3D::from_points_iter(std::iter::empty()).is_none());
    }

    #[test]
    fn test_clamp_point() {
        let bounds = Bounds3D::from_points(Point3D::ZERO, Point3D::ONE);
        let clamped = bounds.clamp_point(Point3D::new(2.0, -1.0, 0.5));
        assert_eq!(clamped, Point3D::new(1.0, 0.0, 0.5));
    }
}
