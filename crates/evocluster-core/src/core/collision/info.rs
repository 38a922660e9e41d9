use tracing::warn;

/// Interpenetration strength recorded when the caller has no better estimate.
pub const DEFAULT_STRENGTH: f64 = 42.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub atom_a: usize,
    pub atom_b: usize,
    pub strength: f64,
}

/// Symmetric pairwise-distance cache.
///
/// Storage grows in place when the atom count changes. A cache is `complete` only after a full
/// scan filled every pair; partial scans leave it incomplete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceCache {
    atom_count: usize,
    values: Vec<f64>,
    complete: bool,
}

impl DistanceCache {
    pub fn new(atom_count: usize) -> Self {
        Self {
            atom_count,
            values: vec![0.0; atom_count * atom_count],
            complete: false,
        }
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn resize(&mut self, atom_count: usize) {
        if atom_count != self.atom_count {
            self.values.resize(atom_count * atom_count, 0.0);
            self.atom_count = atom_count;
        }
        self.complete = false;
    }

    #[inline]
    pub fn invalidate(&mut self) {
        self.complete = false;
    }

    #[inline]
    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    #[inline]
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[a * self.atom_count + b]
    }

    #[inline]
    pub fn set(&mut self, a: usize, b: usize, distance: f64) {
        let n = self.atom_count;
        self.values[a * n + b] = distance;
        self.values[b * n + a] = distance;
    }
}

/// Result record of a collision scan.
///
/// Both variants share the distance cache and the bookkeeping contract; they differ only in
/// how many collisions they are willing to store.
pub trait CollisionInfo: Send {
    /// Records a collision. Returns `false` if the record refused it.
    fn report_collision(&mut self, atom_a: usize, atom_b: usize, strength: f64) -> bool;

    fn collisions(&self) -> &[Collision];

    /// Forgets all recorded collisions but keeps the distance cache.
    fn clean_state(&mut self);

    fn distances(&self) -> &DistanceCache;

    fn distances_mut(&mut self) -> &mut DistanceCache;

    #[inline]
    fn collision_count(&self) -> usize {
        self.collisions().len()
    }

    #[inline]
    fn has_collision(&self) -> bool {
        self.collision_count() > 0
    }

    /// Whether the record can take no further collisions. Scans stop once this holds.
    #[inline]
    fn is_saturated(&self) -> bool {
        false
    }

    /// Prepares the record for a geometry with `atom_count` atoms.
    fn resize_and_clear(&mut self, atom_count: usize) {
        self.distances_mut().resize(atom_count);
        self.clean_state();
    }
}

/// Stores at most one collision. Used for yes/no questions.
#[derive(Debug, Clone, Default)]
pub struct SingleCollisionInfo {
    collision: Option<Collision>,
    distances: DistanceCache,
}

impl SingleCollisionInfo {
    pub fn new(atom_count: usize) -> Self {
        Self {
            collision: None,
            distances: DistanceCache::new(atom_count),
        }
    }
}

impl CollisionInfo for SingleCollisionInfo {
    fn report_collision(&mut self, atom_a: usize, atom_b: usize, strength: f64) -> bool {
        if let Some(first) = &self.collision {
            warn!(
                first_a = first.atom_a,
                first_b = first.atom_b,
                atom_a,
                atom_b,
                "Single collision record already holds a collision; ignoring further report."
            );
            return false;
        }
        self.collision = Some(Collision {
            atom_a,
            atom_b,
            strength,
        });
        true
    }

    fn collisions(&self) -> &[Collision] {
        self.collision.as_slice()
    }

    fn is_saturated(&self) -> bool {
        self.collision.is_some()
    }

    fn clean_state(&mut self) {
        self.collision = None;
    }

    fn distances(&self) -> &DistanceCache {
        &self.distances
    }

    fn distances_mut(&mut self) -> &mut DistanceCache {
        &mut self.distances
    }
}

/// Accumulates every reported collision. Used for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct MultiCollisionInfo {
    collisions: Vec<Collision>,
    distances: DistanceCache,
}

impl MultiCollisionInfo {
    pub fn new(atom_count: usize) -> Self {
        Self {
            collisions: Vec::new(),
            distances: DistanceCache::new(atom_count),
        }
    }
}

impl CollisionInfo for MultiCollisionInfo {
    fn report_collision(&mut self, atom_a: usize, atom_b: usize, strength: f64) -> bool {
        self.collisions.push(Collision {
            atom_a,
            atom_b,
            strength,
        });
        true
    }

    fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    fn clean_state(&mut self) {
        self.collisions.clear();
    }

    fn distances(&self) -> &DistanceCache {
        &self.distances
    }

    fn distances_mut(&mut self) -> &mut DistanceCache {
        &mut self.distances
    }
}
