//! Body registry
//!
//! Side table mapping stable fruit identities to physics bodies. The physics
//! world never learns about fruit; everything game-specific lives here.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;

use super::physics::{BodyHandle, BodyMaterial, PhysicsWorld};
use crate::ladder::{FruitKind, Rank};

/// Stable identity of a fruit, never reused within a registry's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FruitId(pub u64);

/// A live fruit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FruitInstance {
    pub id: FruitId,
    pub body: BodyHandle,
    pub rank: Rank,
    /// Logical clock value at creation (ms)
    pub created_at: u64,
}

/// Read-only per-frame view of a fruit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FruitView {
    pub id: FruitId,
    pub pos: Vec2,
    pub rank: Rank,
    pub created_at: u64,
}

/// Owns every fruit and its physics body
#[derive(Debug, Default)]
pub struct BodyRegistry {
    /// Ordered by id for stable snapshots
    fruits: BTreeMap<FruitId, FruitInstance>,
    by_body: HashMap<BodyHandle, FruitId>,
    next_id: u64,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a physics body for a fruit of `rank` at `pos`
    pub fn spawn<P: PhysicsWorld>(
        &mut self,
        physics: &mut P,
        pos: Vec2,
        rank: Rank,
        now: u64,
    ) -> FruitId {
        let kind = FruitKind::of(rank);
        let body = physics.add_circle(
            pos,
            kind.radius,
            BodyMaterial {
                density: kind.density,
                restitution: kind.restitution,
                friction: kind.friction,
            },
        );

        let id = FruitId(self.next_id);
        self.next_id += 1;

        self.fruits.insert(
            id,
            FruitInstance {
                id,
                body,
                rank,
                created_at: now,
            },
        );
        self.by_body.insert(body, id);
        id
    }

    /// Detach a fruit's body and forget it. Missing ids are a no-op.
    pub fn remove<P: PhysicsWorld>(&mut self, physics: &mut P, id: FruitId) -> bool {
        let Some(fruit) = self.fruits.remove(&id) else {
            return false;
        };
        self.by_body.remove(&fruit.body);
        physics.remove(fruit.body);
        true
    }

    /// Remove every fruit
    pub fn clear<P: PhysicsWorld>(&mut self, physics: &mut P) {
        for fruit in self.fruits.values() {
            physics.remove(fruit.body);
        }
        self.fruits.clear();
        self.by_body.clear();
    }

    /// Drop bookkeeping without touching a physics world (world was replaced)
    pub fn forget_all(&mut self) {
        self.fruits.clear();
        self.by_body.clear();
    }

    /// Fruit attached to a physics body, if any
    pub fn fruit_for(&self, body: BodyHandle) -> Option<&FruitInstance> {
        self.by_body.get(&body).and_then(|id| self.fruits.get(id))
    }

    pub fn get(&self, id: FruitId) -> Option<&FruitInstance> {
        self.fruits.get(&id)
    }

    pub fn len(&self) -> usize {
        self.fruits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fruits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FruitInstance> {
        self.fruits.values()
    }

    /// Current positions read from the physics world, ordered by id
    pub fn snapshot<P: PhysicsWorld>(&self, physics: &P) -> Vec<FruitView> {
        self.fruits
            .values()
            .filter_map(|fruit| {
                let pos = physics.position(fruit.body)?;
                Some(FruitView {
                    id: fruit.id,
                    pos,
                    rank: fruit.rank,
                    created_at: fruit.created_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::ArenaPhysics;

    fn world() -> ArenaPhysics {
        ArenaPhysics::new(350.0, 500.0, 1000.0, 0.005)
    }

    #[test]
    fn test_spawn_and_lookup() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        let id = reg.spawn(&mut physics, Vec2::new(100.0, 50.0), 2, 40);

        let fruit = *reg.get(id).expect("registered");
        assert_eq!(fruit.rank, 2);
        assert_eq!(fruit.created_at, 40);
        assert_eq!(reg.fruit_for(fruit.body).map(|f| f.id), Some(id));
        assert_eq!(physics.body_count(), 1);
    }

    #[test]
    fn test_remove_twice_is_noop() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        let id = reg.spawn(&mut physics, Vec2::new(100.0, 50.0), 0, 0);

        assert!(reg.remove(&mut physics, id));
        assert!(!reg.remove(&mut physics, id));
        assert!(reg.is_empty());
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        let a = reg.spawn(&mut physics, Vec2::new(100.0, 50.0), 0, 0);
        reg.remove(&mut physics, a);
        let b = reg.spawn(&mut physics, Vec2::new(100.0, 50.0), 0, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_snapshot_reflects_live_positions() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        let id = reg.spawn(&mut physics, Vec2::new(100.0, 50.0), 0, 0);
        let before = reg.snapshot(&physics)[0].pos;

        physics.step(0.1);
        let after = reg.snapshot(&physics);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, id);
        assert!(after[0].pos.y > before.y, "fruit should have fallen");
    }

    #[test]
    fn test_snapshot_ordered_by_id() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        for x in [300.0, 100.0, 200.0] {
            reg.spawn(&mut physics, Vec2::new(x, 50.0), 0, 0);
        }
        let ids: Vec<_> = reg.snapshot(&physics).iter().map(|f| f.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_clear_removes_bodies() {
        let mut physics = world();
        let mut reg = BodyRegistry::new();
        for x in [100.0, 200.0] {
            reg.spawn(&mut physics, Vec2::new(x, 50.0), 1, 0);
        }
        reg.clear(&mut physics);
        assert!(reg.is_empty());
        assert_eq!(physics.body_count(), 0);
    }
}
