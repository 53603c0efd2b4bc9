//! Asynchronous physics capability.
//!
//! Physics is an enhancement: acquisition may suspend, may fail, and never
//! gates rendering. Once a [`PhysicsWorld`] resolves it is attached to
//! exactly one scene, with colliders derived from the placeholder mesh
//! shapes.

use async_trait::async_trait;
use cgmath::Vector3;
use rapier3d::prelude::*;

use crate::error::ViewerError;
use crate::scene::{Mesh, MeshShape};

/// One world unit is one meter. Rapier shares that convention, so gravity and
/// collider sizes need no extra scaling; keep this factor applied to both if
/// it ever changes.
pub const PHYSICS_UNIT_SCALE: f32 = 1.0;

/// Standard gravity in meters per second squared.
pub const GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Provider of the physics capability. `acquire` is a suspension point and is
/// allowed to fail; the caller recovers by continuing without physics.
#[async_trait]
pub trait PhysicsBackend: Send + Sync {
    async fn acquire(&self) -> Result<PhysicsWorld, ViewerError>;
}

/// Default provider backed by rapier3d. Construction is synchronous today but
/// stays behind the async seam so backends that fetch a solver at runtime fit
/// the same contract.
pub struct RapierBackend;

#[async_trait]
impl PhysicsBackend for RapierBackend {
    async fn acquire(&self) -> Result<PhysicsWorld, ViewerError> {
        Ok(PhysicsWorld::new(
            Vector3::from(GRAVITY) * PHYSICS_UNIT_SCALE,
        ))
    }
}

/// A rapier-backed simulation world: gravity, body/collider sets and the
/// stepping pipeline.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    query: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector3<f32>) -> Self {
        Self {
            gravity: vector![gravity.x, gravity.y, gravity.z],
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query: QueryPipeline::new(),
        }
    }

    pub fn gravity(&self) -> Vector3<f32> {
        Vector3::new(self.gravity.x, self.gravity.y, self.gravity.z)
    }

    /// Derive a collider from placeholder mesh geometry. Grounds become
    /// static slabs; boxes become dynamic rigid bodies.
    pub fn insert_for_mesh(&mut self, mesh: &Mesh) {
        match mesh.shape {
            MeshShape::Ground { width, depth } => {
                let collider = ColliderBuilder::cuboid(width / 2.0, 0.05, depth / 2.0)
                    .translation(vector![
                        mesh.position.x,
                        mesh.position.y,
                        mesh.position.z
                    ])
                    .build();
                self.colliders.insert(collider);
            }
            MeshShape::Box { size } => {
                let half = size / 2.0;
                let body = RigidBodyBuilder::dynamic()
                    .translation(vector![
                        mesh.position.x,
                        mesh.position.y,
                        mesh.position.z
                    ])
                    .build();
                let handle = self.bodies.insert(body);
                let collider = ColliderBuilder::cuboid(half, half, half).build();
                self.colliders
                    .insert_with_parent(collider, handle, &mut self.bodies);
            }
        }
    }

    /// Advance the simulation by one fixed step.
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query),
            &(),
            &(),
        );
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Material;

    #[test]
    fn default_backend_uses_standard_gravity() {
        let world = PhysicsWorld::new(Vector3::from(GRAVITY));
        let gravity = world.gravity();
        assert_eq!(gravity.x, 0.0);
        assert!((gravity.y + 9.81).abs() < 1e-6);
        assert_eq!(gravity.z, 0.0);
    }

    #[test]
    fn mesh_shapes_become_colliders() {
        let mut world = PhysicsWorld::new(Vector3::from(GRAVITY));
        world.insert_for_mesh(&Mesh::ground("ground", 10.0, 10.0, Material::solid("m", [0.5; 3])));
        let mut cube = Mesh::cube("box", 2.0, Material::solid("m", [0.5; 3]));
        cube.position.y = 1.0;
        world.insert_for_mesh(&cube);

        assert_eq!(world.collider_count(), 2);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn dynamic_bodies_fall_under_gravity() {
        let mut world = PhysicsWorld::new(Vector3::from(GRAVITY));
        let mut cube = Mesh::cube("box", 2.0, Material::solid("m", [0.5; 3]));
        cube.position.y = 20.0;
        world.insert_for_mesh(&cube);

        let start = world
            .bodies
            .iter()
            .next()
            .map(|(_, body)| body.translation().y)
            .unwrap();
        for _ in 0..60 {
            world.step();
        }
        let end = world
            .bodies
            .iter()
            .next()
            .map(|(_, body)| body.translation().y)
            .unwrap();
        assert!(end < start, "body should fall, went {start} -> {end}");
    }
}
