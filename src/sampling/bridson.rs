// src/sampling/bridson.rs

use bevy::log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{ScatterError, ScatterResult};
use crate::types::{Bounds2D, Point2D};
use crate::utils::constants::{SQRT_2, TAU};

/// Versuche, einen zufälligen Startpunkt im Gebiet zu finden, bevor
/// aufgegeben wird.
const SEED_ATTEMPTS: usize = 1000;

/// Konfiguration der planaren Poisson-Disc-Verteilung (Bridson 2007).
#[derive(Debug, Clone)]
pub struct PlanarConfig {
    pub seed: u64,
    pub min_distance: f32,
    /// Rechteck, über dem das Hintergrundgitter aufgespannt wird.
    pub bounds: Bounds2D,
    /// Kandidaten pro aktivem Punkt, bevor er aufgegeben wird.
    pub max_attempts: usize,
    /// Fester Startpunkt; sonst wird ein zufälliger Punkt im Gebiet
    /// gezogen.
    pub start: Option<Point2D>,
}

impl Default for PlanarConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            min_distance: 0.1,
            bounds: Bounds2D::from_points(Point2D::ZERO, Point2D::ONE),
            max_attempts: 30,
            start: None,
        }
    }
}

impl PlanarConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_min_distance(mut self, distance: f32) -> Self {
        self.min_distance = distance;
        self
    }

    pub fn with_bounds(mut self, min: Point2D, max: Point2D) -> Self {
        self.bounds = Bounds2D::from_points(min, max);
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_start(mut self, start: Point2D) -> Self {
        self.start = Some(start);
        self
    }

    /// Validiert die Konfiguration
    pub fn validate(&self) -> ScatterResult<()> {
        if !self.min_distance.is_finite() || self.min_distance <= 0.0 {
            return Err(ScatterError::InvalidConfiguration {
                message: format!(
                    "Mindestabstand muss positiv sein, ist {}",
                    self.min_distance
                ),
            });
        }

        if self.bounds.is_empty() {
            return Err(ScatterError::InvalidConfiguration {
                message: "Verteilungsrechteck ist leer".to_string(),
            });
        }

        if self.max_attempts == 0 {
            return Err(ScatterError::InvalidConfiguration {
                message: "max_attempts muss mindestens 1 sein".to_string(),
            });
        }

        Ok(())
    }
}

/// Hintergrundgitter des Bridson-Samplers: eine Zelle (Seite
/// `min_distance / sqrt(2)`) fasst höchstens einen akzeptierten Punkt.
struct BackgroundGrid {
    origin: Point2D,
    cell_size: f32,
    resolution: [usize; 2],
    cells: Vec<Option<usize>>,
}

impl BackgroundGrid {
    fn new(bounds: Bounds2D, min_distance: f32) -> Self {
        let cell_size = min_distance / SQRT_2;
        let size = bounds.size();

        let resolution = [
            ((size.x / cell_size).ceil() as usize).max(1),
            ((size.y / cell_size).ceil() as usize).max(1),
        ];

        Self {
            origin: bounds.min,
            cell_size,
            resolution,
            cells: vec![None; resolution[0] * resolution[1]],
        }
    }

    fn cell_of(&self, point: Point2D) -> [usize; 2] {
        let local = point - self.origin;
        [
            ((local.x / self.cell_size) as usize).min(self.resolution[0] - 1),
            ((local.y / self.cell_size) as usize).min(self.resolution[1] - 1),
        ]
    }

    fn insert(&mut self, point: Point2D, index: usize) {
        let [x, y] = self.cell_of(point);
        self.cells[x + y * self.resolution[0]] = Some(index);
    }

    /// Scannt die 5×5-Nachbarschaft der Kandidatenzelle; eine Zelle
    /// fasst höchstens einen Punkt, weiter entfernte Zellen können den
    /// Abstand nicht mehr unterschreiten.
    fn far_enough(&self, candidate: Point2D, min_distance: f32, points: &[Point2D]) -> bool {
        let [cx, cy] = self.cell_of(candidate);
        let distance_squared = min_distance * min_distance;

        let x_lo = cx.saturating_sub(2);
        let x_hi = (cx + 2).min(self.resolution[0] - 1);
        let y_lo = cy.saturating_sub(2);
        let y_hi = (cy + 2).min(self.resolution[1] - 1);

        for y in y_lo..=y_hi {
            for x in x_lo..=x_hi {
                if let Some(index) = self.cells[x + y * self.resolution[0]] {
                    if points[index].distance_squared(candidate) < distance_squared {
                        return false;
                    }
                }
            }
        }

        true
    }
}

/// Verteilt Punkte mit Mindestabstand in einem 2D-Gebiet.
///
/// `in_area` schneidet das Gebiet aus dem Rechteck der Konfiguration
/// aus; Kandidaten außerhalb werden verworfen. Jeder aktive Punkt wird
/// genau einmal vom Stapel genommen; alle `max_attempts` Kandidaten im
/// Ring `[d, 2d]` um ihn werden geprüft und jede Annahme landet selbst
/// auf dem Stapel. Garantien: kein Punktpaar näher als `min_distance`,
/// jeder Nicht-Startpunkt liegt innerhalb von `2 * min_distance` um
/// einen früheren Punkt.
///
/// Ungültige Konfigurationen und Gebiete ohne auffindbaren Startpunkt
/// liefern eine leere Liste.
pub fn distribute_poisson_2d<F>(config: &PlanarConfig, in_area: F) -> Vec<Point2D>
where
    F: Fn(Point2D) -> bool,
{
    if let Err(error) = config.validate() {
        warn!("Planare Verteilung abgebrochen: {}", error);
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(config.seed);

    let seed_point = match config.start {
        Some(start) => {
            if !config.bounds.contains_point(start) || !in_area(start) {
                warn!("Startpunkt {:?} liegt außerhalb des Gebiets", start);
                return Vec::new();
            }
            start
        }
        None => {
            let mut found = None;
            for _ in 0..SEED_ATTEMPTS {
                let candidate = Point2D::new(
                    rng.gen_range(config.bounds.min.x..config.bounds.max.x),
                    rng.gen_range(config.bounds.min.y..config.bounds.max.y),
                );
                if in_area(candidate) {
                    found = Some(candidate);
                    break;
                }
            }

            match found {
                Some(candidate) => candidate,
                None => {
                    warn!("Kein Startpunkt im Gebiet gefunden");
                    return Vec::new();
                }
            }
        }
    };

    let mut grid = BackgroundGrid::new(config.bounds, config.min_distance);
    let mut points = vec![seed_point];
    let mut active = vec![0usize];
    grid.insert(seed_point, 0);

    while let Some(current) = active.pop() {
        let parent = points[current];

        for _ in 0..config.max_attempts {
            let angle = rng.gen_range(0.0..TAU);
            let distance = rng.gen_range(config.min_distance..2.0 * config.min_distance);
            let candidate = parent + Point2D::new(angle.cos(), angle.sin()) * distance;

            if !config.bounds.contains_point(candidate) || !in_area(candidate) {
                continue;
            }
            if !grid.far_enough(candidate, config.min_distance, &points) {
                continue;
            }

            let index = points.len();
            points.push(candidate);
            grid.insert(candidate, index);
            active.push(index);
        }
    }

    debug!("Planare Verteilung: {} Punkte", points.len());
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_yields_empty() {
        let config = PlanarConfig::default().with_min_distance(-1.0);
        assert!(config.validate().is_err());
        assert!(distribute_poisson_2d(&config, |_| true).is_empty());
    }

    #[test]
    fn test_pairwise_separation() {
        let config = PlanarConfig::default().with_min_distance(0.05).with_seed(17);
        let points = distribute_poisson_2d(&config, |_| true);

        assert!(points.len() > 50);
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(a.distance(*b) >= 0.05 - 1e-6);
            }
        }
    }

    #[test]
    fn test_every_point_links_to_an_earlier_one() {
        let config = PlanarConfig::default().with_min_distance(0.1).with_seed(4);
        let points = distribute_poisson_2d(&config, |_| true);

        for (i, point) in points.iter().enumerate().skip(1) {
            let linked = points[..i]
                .iter()
                .any(|earlier| earlier.distance(*point) <= 0.2 + 1e-6);
            assert!(linked, "Punkt {} hat keinen Vorgänger im Doppelradius", i);
        }
    }

    #[test]
    fn test_fills_toward_saturation() {
        // Jeder abgearbeitete Punkt trägt alle angenommenen Kandidaten
        // bei; das Einheitsquadrat füllt sich damit bis nahe an die
        // Sättigung (~70 Punkte bei d = 0.1).
        let config = PlanarConfig::default().with_min_distance(0.1).with_seed(21);
        let points = distribute_poisson_2d(&config, |_| true);

        assert!(
            (55..=95).contains(&points.len()),
            "akzeptiert: {}",
            points.len()
        );
    }

    #[test]
    fn test_region_predicate_is_respected() {
        let center = Point2D::new(0.5, 0.5);
        let config = PlanarConfig::default().with_min_distance(0.05).with_seed(9);

        let points = distribute_poisson_2d(&config, |p| p.distance(center) <= 0.4);
        assert!(!points.is_empty());
        for point in &points {
            assert!(point.distance(center) <= 0.4);
        }
    }

    #[test]
    fn test_fixed_start_point() {
        let start = Point2D::new(0.25, 0.75);
        let config = PlanarConfig::default().with_start(start).with_seed(2);

        let points = distribute_poisson_2d(&config, |_| true);
        assert_eq!(points[0], start);

        // Startpunkt außerhalb des Rechtecks
        let bad = PlanarConfig::default().with_start(Point2D::new(2.0, 2.0));
        assert!(distribute_poisson_2d(&bad, |_| true).is_empty());
    }
}
