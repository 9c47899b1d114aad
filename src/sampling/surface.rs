// src/sampling/surface.rs

use bevy::log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{ScatterError, ScatterResult};
use crate::mesh::{SurfaceMesh, collect_triangles};
use crate::sampling::fragment::FragmentPool;
use crate::spatial::DistanceGrid;
use crate::types::{Bounds3D, Point3D};
use crate::utils::comparison;
use crate::utils::constants::{CIRCLE_PACKING_DENSITY, PI};

/// Kinder, deren Fläche beim Verfeinern auf
/// `globale Minimalfläche / AREA_CUTOFF_DIVISOR` gefallen ist, werden
/// verworfen.
const AREA_CUTOFF_DIVISOR: f32 = 10_000.0;

/// Ein verfeinertes Kind bleibt zulässig, solange seine Fläche nicht
/// auf den Schwellwert gefallen ist. Auch kleinere Fragmente bleiben im
/// Umlauf; sie laufen über die Abdeckungsprüfung oder die Klassengrenzen
/// des Pools aus.
fn child_admissible(area: f32, cutoff: f32) -> bool {
    !comparison::nearly_equal(area, cutoff)
}

/// Zielvorgabe der Verteilung: entweder ein Mindestabstand oder eine
/// Punktanzahl, aus der der Abstand abgeleitet wird.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistributionTarget {
    MinDistance(f32),
    Count(usize),
}

/// Radius je Dart: konstant der Zielabstand, oder uniform aus einem
/// Intervall gezogen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadiusMode {
    Constant,
    Uniform { min: f32, max: f32 },
}

/// Konfiguration der Oberflächenverteilung.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    pub seed: u64,
    pub target: DistributionTarget,
    pub radius: RadiusMode,
    /// Beschränkt das Sampling auf eine benannte Primitivgruppe.
    pub group: Option<String>,
    /// Soll der Radius als benanntes Punktattribut exportiert werden?
    pub export_radius: bool,
    pub radius_attribute: String,
    /// Anzahl aufeinanderfolgender verworfener Darts, nach der die
    /// Verteilung als gesättigt gilt.
    pub stall_budget: usize,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            target: DistributionTarget::MinDistance(0.1),
            radius: RadiusMode::Constant,
            group: None,
            export_radius: false,
            radius_attribute: "radius".to_string(),
            stall_budget: 1000,
        }
    }
}

impl SurfaceConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_min_distance(mut self, distance: f32) -> Self {
        self.target = DistributionTarget::MinDistance(distance);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.target = DistributionTarget::Count(count);
        self
    }

    pub fn with_uniform_radius(mut self, min: f32, max: f32) -> Self {
        self.radius = RadiusMode::Uniform { min, max };
        self
    }

    pub fn with_group(mut self, name: impl Into<String>) -> Self {
        self.group = Some(name.into());
        self
    }

    pub fn with_radius_export(mut self, attribute: impl Into<String>) -> Self {
        self.export_radius = true;
        self.radius_attribute = attribute.into();
        self
    }

    pub fn with_stall_budget(mut self, budget: usize) -> Self {
        self.stall_budget = budget;
        self
    }

    /// Validiert die Konfiguration
    pub fn validate(&self) -> ScatterResult<()> {
        match self.target {
            DistributionTarget::MinDistance(distance) => {
                if !distance.is_finite() || distance <= 0.0 {
                    return Err(ScatterError::InvalidConfiguration {
                        message: format!("Mindestabstand muss positiv sein, ist {}", distance),
                    });
                }
            }
            DistributionTarget::Count(count) => {
                if count == 0 {
                    return Err(ScatterError::InvalidConfiguration {
                        message: "Zielanzahl muss mindestens 1 sein".to_string(),
                    });
                }
            }
        }

        if let RadiusMode::Uniform { min, max } = self.radius {
            if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
                return Err(ScatterError::InvalidConfiguration {
                    message: format!("Ungültiges Radiusintervall [{}, {}]", min, max),
                });
            }
        }

        if self.stall_budget == 0 {
            return Err(ScatterError::InvalidConfiguration {
                message: "Stall-Budget muss mindestens 1 sein".to_string(),
            });
        }

        Ok(())
    }
}

/// Ein akzeptierter Sample-Punkt auf der Oberfläche.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub position: Point3D,
    /// Halber Dart-Radius, als Partikelradius gedacht.
    pub radius: f32,
    /// Normale des Quellfragments.
    pub normal: Point3D,
    /// Index des Ursprungspolygons.
    pub origin: usize,
}

/// Ergebnis der Oberflächenverteilung.
#[derive(Debug, Clone, Default)]
pub struct SurfaceDistribution {
    pub samples: Vec<SurfaceSample>,
    /// Diagnosen, die den Aufrufer erreichen sollen (unbekannte Gruppe,
    /// leeres Mesh, erschöpftes Stall-Budget).
    pub warnings: Vec<String>,
    /// Attributname für den Radius-Export, falls konfiguriert.
    pub radius_attribute: Option<String>,
}

impl SurfaceDistribution {
    fn with_warning(message: String) -> Self {
        warn!("{}", message);
        Self {
            warnings: vec![message],
            ..Default::default()
        }
    }
}

/// Verteilt Punkte per Dart-Throwing (Cline et al. 2009) auf einem
/// triangulierten Mesh, sodass kein Punktpaar näher als der Zielabstand
/// liegt.
///
/// Degenerierte Eingaben (leeres Mesh, unbekannte oder leere Gruppe)
/// liefern ein leeres Ergebnis mit Warnungen, keinen Fehler.
pub fn distribute_on_surface<M: SurfaceMesh>(
    config: &SurfaceConfig,
    mesh: &M,
) -> ScatterResult<SurfaceDistribution> {
    config.validate()?;

    if let Some(name) = &config.group {
        if !mesh.has_group(name) {
            return Ok(SurfaceDistribution::with_warning(format!(
                "Primitivgruppe '{}' existiert nicht",
                name
            )));
        }
    }

    let triangles = collect_triangles(mesh, config.group.as_deref());
    if triangles.is_empty() {
        return Ok(SurfaceDistribution::with_warning(
            "Keine Dreiecke zum Verteilen vorhanden".to_string(),
        ));
    }

    // Pre-Pass: globale Flächenstatistik und Bounding Box.
    let mut min_area = f32::INFINITY;
    let mut max_area = 0.0f32;
    let mut total_area = 0.0f32;

    for triangle in &triangles {
        min_area = min_area.min(triangle.area);
        max_area = max_area.max(triangle.area);
        total_area += triangle.area;
    }

    let bounds = Bounds3D::from_points_iter(
        triangles.iter().flat_map(|t| [t.v0, t.v1, t.v2]),
    )
    .unwrap_or_else(Bounds3D::empty);

    if total_area <= 0.0 {
        return Ok(SurfaceDistribution::with_warning(
            "Gesamtfläche des Meshes ist null".to_string(),
        ));
    }

    // Abstand und prädizierte Punktanzahl ineinander umrechnen:
    // count = totalArea * dichte / (pi * (d/2)^2)
    let (target_distance, predicted_count) = match config.target {
        DistributionTarget::MinDistance(distance) => {
            let count = total_area * CIRCLE_PACKING_DENSITY / (PI * (distance * 0.5).powi(2));
            (distance, count as usize)
        }
        DistributionTarget::Count(count) => {
            let distance =
                2.0 * (total_area * CIRCLE_PACKING_DENSITY / (PI * count as f32)).sqrt();
            (distance, count)
        }
    };

    info!(
        "Verteile auf {} Dreiecken (Fläche {}): {} Punkte prädiziert, Zielabstand {}",
        triangles.len(),
        total_area,
        predicted_count,
        target_distance
    );

    // Das Gitter muss den größten vorkommenden Abfrageradius tragen.
    let grid_distance = match config.radius {
        RadiusMode::Constant => target_distance,
        RadiusMode::Uniform { max, .. } => max,
    };
    let mut grid = DistanceGrid::new(bounds.min, bounds.max, grid_distance);

    let mut pool = FragmentPool::new(max_area);
    for triangle in triangles {
        pool.add_initial(triangle);
    }

    let area_cutoff = min_area / AREA_CUTOFF_DIVISOR;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut result = SurfaceDistribution {
        samples: Vec::with_capacity(predicted_count),
        warnings: Vec::new(),
        radius_attribute: config
            .export_radius
            .then(|| config.radius_attribute.clone()),
    };

    let mut stall = 0usize;

    while let Some(fragment) = pool.choose_fragment(&mut rng) {
        // Ziehreihenfolge Fragment -> Punkt -> Radius.
        let point = fragment.random_point(&mut rng);
        let radius = match config.radius {
            RadiusMode::Constant => target_distance,
            RadiusMode::Uniform { min, max } => rng.gen_range(min..=max),
        };

        if grid.verify_min_distance(point, radius) {
            grid.insert(point);
            result.samples.push(SurfaceSample {
                position: point,
                radius: radius * 0.5,
                normal: fragment.normal(),
                origin: fragment.origin,
            });
            stall = 0;
        } else {
            stall += 1;
        }

        if !grid.triangle_covered(fragment.v0, fragment.v1, fragment.v2, radius) {
            // Unabgedecktes Fragment verfeinern; abgedeckte Kinder und
            // solche auf dem Flächenschwellwert fallen aus dem Pool.
            for child in fragment.fragment() {
                if child_admissible(child.area, area_cutoff)
                    && !grid.triangle_covered(child.v0, child.v1, child.v2, radius)
                {
                    pool.add_fragment(child);
                }
            }
        }

        if stall >= config.stall_budget {
            let message = format!(
                "Verteilung nach {} Darts ohne Annahme abgebrochen ({} Punkte akzeptiert)",
                stall,
                result.samples.len()
            );
            warn!("{}", message);
            result.warnings.push(message);
            break;
        }
    }

    debug!(
        "Verteilung beendet: {} Punkte akzeptiert ({} prädiziert)",
        result.samples.len(),
        predicted_count
    );

    Ok(result)
}
