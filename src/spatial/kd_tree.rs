// src/spatial/kd_tree.rs

use std::collections::BinaryHeap;

use crate::types::{Point2D, Point3D};

/// Ab dieser Partitionsgröße (beide Seiten) werden Teilbäume parallel
/// gebaut.
const PARALLEL_THRESHOLD: usize = 256;

/// Punkttyp, der in einem [`KdTree`] indiziert werden kann.
pub trait KdPoint: Copy + Send + Sync {
    const DIM: usize;
    /// Bits für die Schnittachse im gepackten Knotenwort,
    /// `ceil(log2(DIM))`.
    const AXIS_BITS: u32;

    fn axis(&self, axis: usize) -> f32;

    fn with_axis(self, axis: usize, value: f32) -> Self;

    fn distance_squared(&self, other: &Self) -> f32;

    /// Wächterpunkt im Unendlichen für unbesetzte Blatt-Slots.
    fn at_infinity() -> Self;
}

impl KdPoint for Point2D {
    const DIM: usize = 2;
    const AXIS_BITS: u32 = 1;

    fn axis(&self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            _ => self.y,
        }
    }

    fn with_axis(mut self, axis: usize, value: f32) -> Self {
        match axis {
            0 => self.x = value,
            _ => self.y = value,
        }
        self
    }

    fn distance_squared(&self, other: &Self) -> f32 {
        Point2D::distance_squared(*self, *other)
    }

    fn at_infinity() -> Self {
        Point2D::INFINITY
    }
}

impl KdPoint for Point3D {
    const DIM: usize = 3;
    const AXIS_BITS: u32 = 2;

    fn axis(&self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    fn with_axis(mut self, axis: usize, value: f32) -> Self {
        match axis {
            0 => self.x = value,
            1 => self.y = value,
            _ => self.z = value,
        }
        self
    }

    fn distance_squared(&self, other: &Self) -> f32 {
        Point3D::distance_squared(*self, *other)
    }

    fn at_infinity() -> Self {
        Point3D::INFINITY
    }
}

/// Knoten des impliziten Baums: Position plus ein gepacktes Wort aus
/// externem Punktindex (obere Bits) und Schnittachse (untere Bits).
#[derive(Debug, Clone, Copy)]
struct KdNode<P: KdPoint> {
    packed: u32,
    pos: P,
}

impl<P: KdPoint> KdNode<P> {
    fn new(pos: P, index: usize, axis: usize) -> Self {
        Self {
            packed: ((index as u32) << P::AXIS_BITS) | axis as u32,
            pos,
        }
    }

    fn sentinel() -> Self {
        Self::new(P::at_infinity(), 0, 0)
    }

    fn axis(&self) -> usize {
        (self.packed & ((1 << P::AXIS_BITS) - 1)) as usize
    }

    fn set_axis(&mut self, axis: usize) {
        self.packed = (self.packed & !((1 << P::AXIS_BITS) - 1)) | axis as u32;
    }

    fn index(&self) -> usize {
        (self.packed >> P::AXIS_BITS) as usize
    }
}

/// Gefundener Nachbar einer Suchanfrage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<P> {
    pub index: usize,
    pub position: P,
    pub distance_squared: f32,
}

/// Heap-Eintrag für die k-nächste-Nachbarn-Suche, absteigend nach
/// Distanz geordnet (Max-Heap).
struct HeapEntry<P>(Neighbor<P>);

impl<P> PartialEq for HeapEntry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.0.distance_squared == other.0.distance_squared
    }
}

impl<P> Eq for HeapEntry<P> {}

impl<P> PartialOrd for HeapEntry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for HeapEntry<P> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.distance_squared.total_cmp(&other.0.distance_squared)
    }
}

/// Balancierter k-d-Baum über einer statischen Punktmenge.
///
/// Die Knoten liegen als 1-indiziertes implizites Array (Kinder bei
/// `2i`/`2i+1`). Der Median wird für die jeweilige Bereichsgröße als
/// Median des *vollständigen* Binärbaums gewählt, wodurch die belegten
/// Indizes für n Punkte exakt `1..=n` sind — auch für Bereichsgrößen,
/// die keine Zweierpotenz sind. Gebaut wird einmal, danach wird nie
/// rebalanciert.
///
/// Die Implementierung folgt dem Layout von Cem Yuksel
/// (http://cemyuksel.com/).
pub struct KdTree<P: KdPoint> {
    nodes: Vec<KdNode<P>>,
    point_count: usize,
    internal_count: usize,
}

impl<P: KdPoint> KdTree<P> {
    /// Baut den Baum direkt aus einem Punkt-Slice; externe Indizes sind
    /// die Slice-Indizes.
    pub fn from_points(points: &[P]) -> Self {
        Self::build(points.len(), |i| points[i], |i| i)
    }

    /// Baut den Baum aus `count` Punkten, deren Positionen und externe
    /// Indizes über Funktionen geliefert werden.
    pub fn build<FPos, FIndex>(count: usize, position: FPos, external_index: FIndex) -> Self
    where
        FPos: Fn(usize) -> P,
        FIndex: Fn(usize) -> usize,
    {
        if count == 0 {
            return Self {
                nodes: Vec::new(),
                point_count: 0,
                internal_count: 0,
            };
        }

        let mut scratch: Vec<KdNode<P>> = (0..count)
            .map(|i| KdNode::new(position(i), external_index(i), 0))
            .collect();

        let mut lo = scratch[0].pos;
        let mut hi = scratch[0].pos;
        for node in &scratch[1..] {
            for axis in 0..P::DIM {
                let v = node.pos.axis(axis);
                if v < lo.axis(axis) {
                    lo = lo.with_axis(axis, v);
                }
                if v > hi.axis(axis) {
                    hi = hi.with_axis(axis, v);
                }
            }
        }

        // Bei gerader Punktanzahl bleibt Slot count+1 als Wächter im
        // Unendlichen stehen, damit jeder Abstieg in einem gültigen
        // Blatt endet.
        let mut nodes = vec![KdNode::sentinel(); (count | 1) + 1];
        build_range(&mut nodes, &mut scratch, lo, hi, 1);

        Self {
            nodes,
            point_count: count,
            internal_count: count / 2,
        }
    }

    pub fn len(&self) -> usize {
        self.point_count
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    /// Findet alle Punkte im Radius um `position` und ruft für jeden den
    /// Callback `(externer Index, Punkt, Distanz², &mut Radius²)` auf.
    /// Der Callback darf das Radius² verkleinern, um die restliche Suche
    /// einzugrenzen. Ein leerer Baum liefert keine Treffer.
    pub fn search<F>(&self, position: P, radius: f32, mut found: F)
    where
        F: FnMut(usize, P, f32, &mut f32),
    {
        if self.point_count == 0 {
            return;
        }

        let mut radius_squared = radius * radius;
        let mut stack = Vec::with_capacity(16);

        self.descend_nearer(position, &mut radius_squared, &mut found, 1, &mut stack);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            let axis = node.axis();
            let plane_distance = position.axis(axis) - node.pos.axis(axis);

            // Liegt schon die Schnittebene außerhalb des (inzwischen
            // möglicherweise geschrumpften) Radius, ist der ganze
            // abgewandte Teilbaum uninteressant.
            if plane_distance * plane_distance >= radius_squared {
                continue;
            }

            let d2 = position.distance_squared(&node.pos);
            if d2 < radius_squared {
                found(node.index(), node.pos, d2, &mut radius_squared);
            }

            let child = 2 * id;
            let far = if plane_distance < 0.0 { child + 1 } else { child };
            self.descend_nearer(position, &mut radius_squared, &mut found, far, &mut stack);
        }
    }

    /// Steigt entlang der näheren Seite bis zu einem Blatt ab und merkt
    /// sich die besuchten inneren Knoten auf dem Stack.
    fn descend_nearer<F>(
        &self,
        position: P,
        radius_squared: &mut f32,
        found: &mut F,
        mut id: usize,
        stack: &mut Vec<usize>,
    ) where
        F: FnMut(usize, P, f32, &mut f32),
    {
        while id <= self.internal_count {
            stack.push(id);
            let node = &self.nodes[id];
            let axis = node.axis();
            let plane_distance = position.axis(axis) - node.pos.axis(axis);
            let child = 2 * id;
            id = if plane_distance < 0.0 { child } else { child + 1 };
        }

        let node = &self.nodes[id];
        let d2 = position.distance_squared(&node.pos);
        if d2 < *radius_squared {
            found(node.index(), node.pos, d2, radius_squared);
        }
    }

    /// Nächster Punkt zu `position`, oder `None` bei leerem Baum.
    pub fn nearest(&self, position: P) -> Option<Neighbor<P>> {
        let mut best = None;

        self.search(position, f32::INFINITY, |index, pos, d2, radius_squared| {
            best = Some(Neighbor {
                index,
                position: pos,
                distance_squared: d2,
            });
            *radius_squared = d2;
        });

        best
    }

    /// Die (höchstens) `count` nächsten Punkte innerhalb von `radius`,
    /// aufsteigend nach Distanz. Sobald der interne Max-Heap voll ist,
    /// schrumpft der Suchradius auf seine größte Distanz.
    pub fn k_nearest(&self, position: P, radius: f32, count: usize) -> Vec<Neighbor<P>> {
        if count == 0 {
            return Vec::new();
        }

        let mut heap: BinaryHeap<HeapEntry<P>> = BinaryHeap::with_capacity(count + 1);

        self.search(position, radius, |index, pos, d2, radius_squared| {
            heap.push(HeapEntry(Neighbor {
                index,
                position: pos,
                distance_squared: d2,
            }));

            if heap.len() > count {
                heap.pop();
            }
            if heap.len() == count {
                if let Some(entry) = heap.peek() {
                    *radius_squared = entry.0.distance_squared;
                }
            }
        });

        let mut result: Vec<Neighbor<P>> = heap.into_iter().map(|entry| entry.0).collect();
        result.sort_by(|a, b| a.distance_squared.total_cmp(&b.distance_squared));
        result
    }
}

/// Anzahl der Knoten im linken Teilbaum eines vollständigen Binärbaums
/// mit n Knoten.
fn left_subtree_size(n: usize) -> usize {
    // Größe des kleinsten vollständigen Baums >= n
    let mut tree = n;
    let mut shift = 1;
    while shift < usize::BITS as usize {
        tree |= tree >> shift;
        shift *= 2;
    }

    // linker Teilbaum des vollen Baums, einmal mit und einmal ohne
    // Blattebene
    let left = tree >> 1;
    let right = left >> 1;

    if left + right + 1 <= n { left } else { n - right - 1 }
}

/// Achse mit der größten Ausdehnung der Bounding Box.
fn widest_axis<P: KdPoint>(lo: P, hi: P) -> usize {
    let mut axis = 0;
    let mut widest = hi.axis(0) - lo.axis(0);

    for candidate in 1..P::DIM {
        let extent = hi.axis(candidate) - lo.axis(candidate);
        if extent > widest {
            axis = candidate;
            widest = extent;
        }
    }

    axis
}

/// Rekursiver Aufbau eines Bereichs in den impliziten Knoten-Slot
/// `node_index`. `scratch` enthält genau die Punkte dieses Teilbaums.
fn build_range<P: KdPoint>(
    nodes: &mut [KdNode<P>],
    scratch: &mut [KdNode<P>],
    lo: P,
    hi: P,
    node_index: usize,
) {
    let n = scratch.len();

    if n == 1 {
        nodes[node_index] = scratch[0];
        return;
    }
    if n == 0 {
        return;
    }

    let axis = widest_axis(lo, hi);
    let median_offset = left_subtree_size(n);

    scratch.select_nth_unstable_by(median_offset, |a, b| {
        a.pos.axis(axis).total_cmp(&b.pos.axis(axis))
    });

    let mut median = scratch[median_offset];
    median.set_axis(axis);
    nodes[node_index] = median;

    let split_value = median.pos.axis(axis);
    let left_hi = hi.with_axis(axis, split_value);
    let right_lo = lo.with_axis(axis, split_value);

    let (left, rest) = scratch.split_at_mut(median_offset);
    let right = &mut rest[1..];

    if left.len() > PARALLEL_THRESHOLD && right.len() > PARALLEL_THRESHOLD {
        // Beide Seiten sind groß genug: getrennt in lokale Arenen bauen
        // und anschließend in das gemeinsame Array einpflanzen. Die
        // Teilbäume berühren disjunkte Indexmengen, es genügt der Join.
        let (left_arena, right_arena) = rayon::join(
            || build_detached(left, lo, left_hi),
            || build_detached(right, right_lo, hi),
        );
        graft(nodes, 2 * node_index, &left_arena);
        graft(nodes, 2 * node_index + 1, &right_arena);
    } else {
        build_range(nodes, left, lo, left_hi, 2 * node_index);
        build_range(nodes, right, right_lo, hi, 2 * node_index + 1);
    }
}

/// Baut einen Teilbaum in eine eigene Arena mit lokaler 1-Indizierung.
fn build_detached<P: KdPoint>(scratch: &mut [KdNode<P>], lo: P, hi: P) -> Vec<KdNode<P>> {
    let mut arena = vec![KdNode::sentinel(); scratch.len() + 1];
    build_range(&mut arena, scratch, lo, hi, 1);
    arena
}

/// Überträgt eine lokale Arena in das globale Array. Der lokale Index l
/// in Tiefe d landet bei `(root << d) + (l - 2^d)`.
fn graft<P: KdPoint>(nodes: &mut [KdNode<P>], root: usize, arena: &[KdNode<P>]) {
    for (local, node) in arena.iter().enumerate().skip(1) {
        let depth = local.ilog2();
        let global = (root << depth) + (local - (1 << depth));
        nodes[global] = *node;
    }
}
