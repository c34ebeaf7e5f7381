//! Physics collaborator
//!
//! The engine only needs a small slice of a rigid-body simulation: circular
//! bodies with material properties, a fixed step, the list of touching pairs,
//! and live positions. `PhysicsWorld` is that seam. `ArenaPhysics` implements
//! it on Rapier2D: a box arena (floor + two walls) holding ball colliders.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use rapier2d::prelude::*;

use crate::consts::WALL_THICKNESS;

// glam <-> nalgebra

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Opaque handle to a body owned by the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

/// Material properties applied to a new body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMaterial {
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
}

/// Two bodies touching after the last step (`a < b`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContactPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

/// What the engine consumes from a physics simulation
pub trait PhysicsWorld {
    /// Create a dynamic circular body
    fn add_circle(&mut self, pos: Vec2, radius: f32, material: BodyMaterial) -> BodyHandle;
    /// Destroy a body. Returns false if it was already gone.
    fn remove(&mut self, handle: BodyHandle) -> bool;
    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);
    /// Pairs in contact as of the last step, in a stable order
    fn contacts(&self) -> &[ContactPair];
    /// Live position of a body
    fn position(&self, handle: BodyHandle) -> Option<Vec2>;
    /// Number of dynamic bodies
    fn body_count(&self) -> usize;
}

/// Longest Rapier step taken in one go (seconds)
const MAX_SUBSTEP: f32 = 1.0 / 60.0;
/// Pixels per Rapier length unit; scales contact tolerances
const LENGTH_UNIT: f32 = 100.0;
/// Friction of the floor and walls
const BOUNDARY_FRICTION: f32 = 0.5;

/// Rapier2D world shaped as the play arena (y grows downward)
pub struct ArenaPhysics {
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    /// Linear damping handed to every new body
    damping: f32,
    /// Fruit bodies by handle; boundaries are not listed
    handles: BTreeMap<BodyHandle, RigidBodyHandle>,
    contacts: Vec<ContactPair>,
    next_handle: u32,
}

impl fmt::Debug for ArenaPhysics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaPhysics")
            .field("gravity", &self.gravity)
            .field("bodies", &self.handles.len())
            .field("contacts", &self.contacts.len())
            .finish()
    }
}

impl ArenaPhysics {
    /// Arena of `width` x `height` pixels. `air_friction` is the fraction of
    /// velocity lost per 1/60 s.
    pub fn new(width: f32, height: f32, gravity: f32, air_friction: f32) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.length_unit = LENGTH_UNIT;

        let mut world = Self {
            gravity: nalgebra::Vector2::new(0.0, gravity),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            damping: air_friction.clamp(0.0, 1.0) * 60.0,
            handles: BTreeMap::new(),
            contacts: Vec::new(),
            next_handle: 1,
        };
        world.build_boundaries(width, height);
        world
    }

    /// Build from engine tuning
    pub fn from_tuning(tuning: &crate::Tuning) -> Self {
        Self::new(
            tuning.arena_width,
            tuning.arena_height,
            tuning.gravity,
            tuning.air_friction,
        )
    }

    /// Teleport a body and stop it (tests and debugging)
    pub fn set_position(&mut self, handle: BodyHandle, pos: Vec2) {
        let Some(rb) = self
            .handles
            .get(&handle)
            .and_then(|&h| self.bodies.get_mut(h))
        else {
            return;
        };
        rb.set_translation(vec2_to_na(pos), true);
        rb.set_linvel(nalgebra::Vector2::zeros(), true);
    }

    /// Floor and side walls as parentless fixed colliders. Walls reach one
    /// arena height above the top so nothing escapes sideways.
    fn build_boundaries(&mut self, width: f32, height: f32) {
        let t = WALL_THICKNESS;
        let boundaries = [
            // Floor
            (Vec2::new(width / 2.0, height + t / 2.0), Vec2::new(width / 2.0 + t, t / 2.0)),
            // Left wall
            (Vec2::new(-t / 2.0, height / 2.0), Vec2::new(t / 2.0, height)),
            // Right wall
            (Vec2::new(width + t / 2.0, height / 2.0), Vec2::new(t / 2.0, height)),
        ];
        for (center, half) in boundaries {
            let collider = ColliderBuilder::cuboid(half.x, half.y)
                .translation(vec2_to_na(center))
                .friction(BOUNDARY_FRICTION)
                .build();
            self.colliders.insert(collider);
        }
    }

    /// Fruit handle stored on a collider's parent body, if any
    fn collider_to_handle(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        let parent = self.colliders.get(collider)?.parent()?;
        let data = self.bodies.get(parent)?.user_data;
        (data != 0).then_some(BodyHandle(data as u32))
    }

    fn collect_contacts(&mut self) {
        let mut contacts: Vec<ContactPair> = self
            .narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .filter_map(|pair| {
                let a = self.collider_to_handle(pair.collider1)?;
                let b = self.collider_to_handle(pair.collider2)?;
                Some(ContactPair {
                    a: a.min(b),
                    b: a.max(b),
                })
            })
            .collect();
        contacts.sort_unstable();
        contacts.dedup();
        self.contacts = contacts;
    }
}

impl PhysicsWorld for ArenaPhysics {
    fn add_circle(&mut self, pos: Vec2, radius: f32, material: BodyMaterial) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;

        let rb = RigidBodyBuilder::dynamic()
            .translation(vec2_to_na(pos))
            .linear_damping(self.damping)
            .user_data(handle.0 as u128)
            .build();
        let body = self.bodies.insert(rb);

        let collider = ColliderBuilder::ball(radius)
            .density(material.density)
            .restitution(material.restitution)
            .friction(material.friction)
            .build();
        self.colliders
            .insert_with_parent(collider, body, &mut self.bodies);

        self.handles.insert(handle, body);
        handle
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        let Some(body) = self.handles.remove(&handle) else {
            return false;
        };
        self.bodies.remove(
            body,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.contacts.retain(|c| c.a != handle && c.b != handle);
        true
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let substeps = (dt / MAX_SUBSTEP).ceil().max(1.0) as u32;
        self.integration_parameters.dt = dt / substeps as f32;

        for _ in 0..substeps {
            self.physics_pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &(),
            );
        }
        self.collect_contacts();
    }

    fn contacts(&self) -> &[ContactPair] {
        &self.contacts
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        let body = self.handles.get(&handle)?;
        self.bodies.get(*body).map(|rb| na_to_vec2(rb.translation()))
    }

    fn body_count(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAT: BodyMaterial = BodyMaterial {
        density: 0.001,
        restitution: 0.4,
        friction: 0.5,
    };

    fn world() -> ArenaPhysics {
        ArenaPhysics::new(350.0, 500.0, 1000.0, 0.005)
    }

    #[test]
    fn test_body_falls_to_floor() {
        let mut w = world();
        let h = w.add_circle(Vec2::new(100.0, 50.0), 20.0, MAT);
        for _ in 0..200 {
            w.step(0.02);
        }
        let pos = w.position(h).expect("body exists");
        assert!((pos.y - 480.0).abs() < 1.5, "resting on floor, got {}", pos.y);
        assert!((pos.x - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_walls_contain_bodies() {
        let mut w = world();
        let left = w.add_circle(Vec2::new(15.0, 480.0), 20.0, MAT);
        let right = w.add_circle(Vec2::new(335.0, 480.0), 20.0, MAT);
        for _ in 0..20 {
            w.step(0.02);
        }
        assert!(w.position(left).expect("body exists").x >= 19.0);
        assert!(w.position(right).expect("body exists").x <= 331.0);
    }

    #[test]
    fn test_boundaries_are_not_contacts() {
        let mut w = world();
        w.add_circle(Vec2::new(100.0, 480.0), 20.0, MAT);
        for _ in 0..10 {
            w.step(0.02);
        }
        assert!(w.contacts().is_empty());
    }

    #[test]
    fn test_stacked_bodies_report_contact() {
        let mut w = world();
        let low = w.add_circle(Vec2::new(100.0, 480.0), 20.0, MAT);
        let high = w.add_circle(Vec2::new(100.0, 300.0), 20.0, MAT);
        let mut touched = false;
        for _ in 0..100 {
            w.step(0.02);
            if w.contacts().contains(&ContactPair { a: low, b: high }) {
                touched = true;
                break;
            }
        }
        assert!(touched);
    }

    #[test]
    fn test_dense_stack_stays_apart() {
        let mut w = world();
        let mut bodies = Vec::new();
        for x in [60.0, 170.0, 280.0] {
            bodies.push((w.add_circle(Vec2::new(x, 482.0), 18.0, MAT), 18.0));
        }
        for y in [380.0, 300.0, 220.0] {
            for x in [60.0, 140.0, 220.0, 300.0] {
                bodies.push((w.add_circle(Vec2::new(x, y), 32.0, MAT), 32.0));
            }
        }
        for _ in 0..500 {
            w.step(0.02);
        }

        let mut worst = 0.0f32;
        for (i, &(a, ra)) in bodies.iter().enumerate() {
            let pa = w.position(a).expect("body exists");
            assert!(pa.y + ra <= 501.0, "floor penetration at y={}", pa.y);
            for &(b, rb) in &bodies[i + 1..] {
                let pb = w.position(b).expect("body exists");
                worst = worst.max(ra + rb - pa.distance(pb));
            }
        }
        assert!(worst < 2.0, "max overlap {worst}");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut w = world();
        let h = w.add_circle(Vec2::new(100.0, 100.0), 20.0, MAT);
        assert!(w.remove(h));
        assert!(!w.remove(h));
        assert_eq!(w.body_count(), 0);
        assert!(w.position(h).is_none());
    }

    #[test]
    fn test_removed_body_leaves_contacts() {
        let mut w = world();
        let a = w.add_circle(Vec2::new(100.0, 480.0), 20.0, MAT);
        w.add_circle(Vec2::new(139.0, 480.0), 20.0, MAT);
        w.step(0.02);
        assert_eq!(w.contacts().len(), 1);
        w.remove(a);
        assert!(w.contacts().is_empty());
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut w = world();
        let a = w.add_circle(Vec2::new(100.0, 100.0), 20.0, MAT);
        w.remove(a);
        let b = w.add_circle(Vec2::new(100.0, 100.0), 20.0, MAT);
        assert_ne!(a, b);
    }

    #[test]
    fn test_contacts_ordered_by_handle() {
        let mut w = world();
        let a = w.add_circle(Vec2::new(100.0, 480.0), 20.0, MAT);
        let b = w.add_circle(Vec2::new(139.0, 480.0), 20.0, MAT);
        let c = w.add_circle(Vec2::new(178.0, 480.0), 20.0, MAT);
        w.step(0.02);
        assert_eq!(
            w.contacts(),
            &[ContactPair { a, b }, ContactPair { a: b, b: c }]
        );
    }

    #[test]
    fn test_set_position_teleports() {
        let mut w = world();
        let h = w.add_circle(Vec2::new(100.0, 100.0), 20.0, MAT);
        w.step(0.1);
        w.set_position(h, Vec2::new(200.0, 200.0));
        assert_eq!(w.position(h), Some(Vec2::new(200.0, 200.0)));
    }
}
