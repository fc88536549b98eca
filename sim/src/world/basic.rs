use std::collections::BTreeMap;

use hydro::{Pose, Quat, Vec3};
use tracing::trace;

use super::{
    BodyHandle, BodyState, ConstraintHandle, ContactManifold, ContactPoint, JointDesc, JointHandle, JointState,
    PhysicsWorld, RayHit, RigidBodyDesc,
};

const SLEEP_LINEAR: f64 = 0.05;
const SLEEP_ANGULAR: f64 = 0.05;
const SLEEP_DELAY: f64 = 2.0;
/// Net acceleration that wakes a sleeping body, m/s² and rad/s².
const WAKE_LINEAR: f64 = 0.1;
const WAKE_ANGULAR: f64 = 0.1;

#[derive(Debug, Clone)]
struct Body {
    pose: Pose,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    mass: f64,
    inertia: Vec3,
    radius: f64,
    force: Vec3,
    torque: Vec3,
    linear_damping: f64,
    angular_damping: f64,
    sleeping: bool,
    still_for: f64,
}

impl Body {
    fn is_dynamic(&self) -> bool {
        self.mass > 0.0
    }

    fn state(&self) -> BodyState {
        BodyState {
            pose: self.pose,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            mass: self.mass,
        }
    }

    fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.state().velocity_at(point)
    }

    fn add_force_at(&mut self, force: Vec3, point: Vec3) {
        self.force += force;
        self.torque += (point - self.pose.translation).cross(force);
    }

    fn integrate(&mut self, h: f64) {
        if !self.is_dynamic() || self.sleeping {
            return;
        }
        self.linear_velocity += self.force / self.mass * h;
        self.linear_velocity *= (1.0 - self.linear_damping).powf(h);

        // Euler's equations in the principal frame.
        let rot = self.pose.rotation;
        let w = rot.inverse() * self.angular_velocity;
        let tau = rot.inverse() * self.torque;
        let gyro = w.cross(self.inertia * w);
        let inv = |i: f64| if i > 0.0 { 1.0 / i } else { 0.0 };
        let inv_inertia = Vec3::new(inv(self.inertia.x), inv(self.inertia.y), inv(self.inertia.z));
        let w = w + (tau - gyro) * inv_inertia * h;
        self.angular_velocity = rot * w;
        self.angular_velocity *= (1.0 - self.angular_damping).powf(h);

        self.pose.translation += self.linear_velocity * h;
        let turn = self.angular_velocity * h;
        if turn.length_squared() > 0.0 {
            self.pose.rotation = (Quat::from_scaled_axis(turn) * rot).normalize();
        }
    }

    fn update_sleep(&mut self, h: f64) {
        if !self.is_dynamic() || self.sleeping {
            return;
        }
        if self.linear_velocity.length() < SLEEP_LINEAR && self.angular_velocity.length() < SLEEP_ANGULAR {
            self.still_for += h;
            if self.still_for >= SLEEP_DELAY {
                self.sleeping = true;
                self.linear_velocity = Vec3::ZERO;
                self.angular_velocity = Vec3::ZERO;
            }
        } else {
            self.still_for = 0.0;
        }
    }

    fn wake(&mut self) {
        self.sleeping = false;
        self.still_for = 0.0;
    }

    /// Whether the loads accumulated this sub-step would set the body moving.
    fn pushed(&self) -> bool {
        if !self.is_dynamic() {
            return false;
        }
        let tau = self.pose.rotation.inverse() * self.torque;
        let angular = |t: f64, i: f64| if i > 0.0 { (t / i).abs() } else { 0.0 };
        let alpha = angular(tau.x, self.inertia.x)
            .max(angular(tau.y, self.inertia.y))
            .max(angular(tau.z, self.inertia.z));
        self.force.length() / self.mass > WAKE_LINEAR || alpha > WAKE_ANGULAR
    }
}

#[derive(Debug, Clone)]
struct Joint {
    desc: JointDesc,
    state: JointState,
    torque: f64,
}

impl Joint {
    fn integrate(&mut self, h: f64) {
        if self.desc.inertia <= 0.0 {
            return;
        }
        self.state.velocity += self.torque / self.desc.inertia * h;
        self.state.position += self.state.velocity * h;
        if let Some((lo, hi)) = self.desc.limits {
            if self.state.position < lo {
                self.state.position = lo;
                self.state.velocity = self.state.velocity.max(0.0);
            } else if self.state.position > hi {
                self.state.position = hi;
                self.state.velocity = self.state.velocity.min(0.0);
            }
        }
    }
}

#[derive(Debug, Clone)]
struct PointConstraint {
    a: BodyHandle,
    b: BodyHandle,
    local_a: Vec3,
    local_b: Vec3,
    stiffness: f64,
    damping: f64,
}

/// Reference integrator: semi-implicit Euler rigid bodies, scalar joints,
/// spring point constraints and bounding-sphere contacts.
#[derive(Debug, Clone, Default)]
pub struct BasicWorld {
    bodies: BTreeMap<BodyHandle, Body>,
    joints: BTreeMap<JointHandle, Joint>,
    constraints: BTreeMap<ConstraintHandle, PointConstraint>,
    next_body: usize,
    next_joint: usize,
    next_constraint: usize,
    accumulator: f64,
    sleeping_enabled: bool,
    contact_stiffness: f64,
    contact_damping: f64,
}

impl BasicWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sleeping(mut self, enabled: bool) -> Self {
        self.sleeping_enabled = enabled;
        self
    }

    /// Penalty contact response. Zero stiffness (the default) only reports
    /// manifolds.
    pub fn with_contact_response(mut self, stiffness: f64, damping: f64) -> Self {
        self.contact_stiffness = stiffness.max(0.0);
        self.contact_damping = damping.max(0.0);
        self
    }

    pub fn wake(&mut self, body: BodyHandle) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.wake();
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn overlapping_pairs(&self) -> Vec<(BodyHandle, BodyHandle, ContactPoint)> {
        let bodies: Vec<(&BodyHandle, &Body)> = self.bodies.iter().collect();
        let mut out = Vec::new();
        for (i, (ha, a)) in bodies.iter().enumerate() {
            for (hb, b) in &bodies[i + 1..] {
                if !a.is_dynamic() && !b.is_dynamic() {
                    continue;
                }
                let d = b.pose.translation - a.pose.translation;
                let dist = d.length();
                let depth = a.radius + b.radius - dist;
                if depth <= 0.0 {
                    continue;
                }
                let normal = if dist > 0.0 { d / dist } else { Vec3::Z };
                let position = a.pose.translation + normal * (a.radius - 0.5 * depth);
                out.push((**ha, **hb, ContactPoint { position, normal, depth }));
            }
        }
        out
    }

    fn apply_constraint_forces(&mut self) {
        let mut pushes = Vec::new();
        let mut woken = Vec::new();
        for c in self.constraints.values() {
            let (Some(a), Some(b)) = (self.bodies.get(&c.a), self.bodies.get(&c.b)) else {
                continue;
            };
            let pa = a.pose.transform_point(c.local_a);
            let pb = b.pose.transform_point(c.local_b);
            let f = -c.stiffness * (pa - pb) - c.damping * (a.velocity_at(pa) - b.velocity_at(pb));
            pushes.push((c.a, f, pa));
            pushes.push((c.b, -f, pb));
        }
        if self.contact_stiffness > 0.0 {
            for (ha, hb, p) in self.overlapping_pairs() {
                let (Some(a), Some(b)) = (self.bodies.get(&ha), self.bodies.get(&hb)) else {
                    continue;
                };
                let approach = (a.velocity_at(p.position) - b.velocity_at(p.position)).dot(p.normal);
                let push = (self.contact_stiffness * p.depth + self.contact_damping * approach).max(0.0);
                pushes.push((ha, -p.normal * push, p.position));
                pushes.push((hb, p.normal * push, p.position));
                // An awake body touching a sleeping one wakes it.
                if a.sleeping && b.is_dynamic() && !b.sleeping {
                    woken.push(ha);
                } else if b.sleeping && a.is_dynamic() && !a.sleeping {
                    woken.push(hb);
                }
            }
        }
        for h in woken {
            self.wake(h);
        }
        for (h, f, p) in pushes {
            if let Some(body) = self.bodies.get_mut(&h) {
                body.add_force_at(f, p);
            }
        }
    }

    fn integrate(&mut self, h: f64) {
        // Constraint and contact forces live for one sub-step only.
        let applied: Vec<(Vec3, Vec3)> = self.bodies.values().map(|b| (b.force, b.torque)).collect();
        self.apply_constraint_forces();
        for body in self.bodies.values_mut() {
            if body.sleeping && body.pushed() {
                body.wake();
            }
            body.integrate(h);
            if self.sleeping_enabled {
                body.update_sleep(h);
            }
        }
        for (body, (force, torque)) in self.bodies.values_mut().zip(applied) {
            body.force = force;
            body.torque = torque;
        }
        for joint in self.joints.values_mut() {
            joint.integrate(h);
        }
    }
}

impl PhysicsWorld for BasicWorld {
    fn add_rigid_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            handle,
            Body {
                pose: desc.pose,
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
                mass: desc.mass.max(0.0),
                inertia: desc.inertia,
                radius: desc.bounding_radius.max(0.0),
                force: Vec3::ZERO,
                torque: Vec3::ZERO,
                linear_damping: 0.0,
                angular_damping: 0.0,
                sleeping: false,
                still_for: 0.0,
            },
        );
        trace!(?handle, mass = desc.mass, "rigid body added");
        handle
    }

    fn remove_rigid_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
        self.constraints.retain(|_, c| c.a != body && c.b != body);
    }

    fn body_state(&self, body: BodyHandle) -> Option<BodyState> {
        self.bodies.get(&body).map(Body::state)
    }

    fn set_body_state(&mut self, body: BodyHandle, pose: Pose, linear_velocity: Vec3, angular_velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pose = pose;
            b.linear_velocity = linear_velocity;
            b.angular_velocity = angular_velocity;
            b.wake();
        }
    }

    fn set_mass(&mut self, body: BodyHandle, mass: f64, inertia: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.mass = mass.max(0.0);
            b.inertia = inertia;
        }
    }

    fn add_joint(&mut self, desc: JointDesc) -> JointHandle {
        let handle = JointHandle(self.next_joint);
        self.next_joint += 1;
        let state = JointState { position: desc.initial_position, velocity: 0.0 };
        self.joints.insert(handle, Joint { desc, state, torque: 0.0 });
        handle
    }

    fn remove_joint(&mut self, joint: JointHandle) {
        self.joints.remove(&joint);
    }

    fn joint_state(&self, joint: JointHandle) -> Option<JointState> {
        self.joints.get(&joint).map(|j| j.state)
    }

    fn set_joint_state(&mut self, joint: JointHandle, state: JointState) {
        if let Some(j) = self.joints.get_mut(&joint) {
            j.state = state;
        }
    }

    fn apply_joint_torque(&mut self, joint: JointHandle, torque: f64) {
        if let Some(j) = self.joints.get_mut(&joint) {
            j.torque += torque;
        }
    }

    fn add_point_constraint(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        pivot: Vec3,
        stiffness: f64,
        damping: f64,
    ) -> ConstraintHandle {
        let handle = ConstraintHandle(self.next_constraint);
        self.next_constraint += 1;
        let local = |h: BodyHandle| {
            self.bodies
                .get(&h)
                .map(|body| body.pose.inverse_transform_point(pivot))
                .unwrap_or(pivot)
        };
        let constraint = PointConstraint { a, b, local_a: local(a), local_b: local(b), stiffness, damping };
        self.constraints.insert(handle, constraint);
        self.wake(a);
        self.wake(b);
        handle
    }

    fn remove_constraint(&mut self, constraint: ConstraintHandle) {
        self.constraints.remove(&constraint);
    }

    fn clear_forces(&mut self) {
        for b in self.bodies.values_mut() {
            b.force = Vec3::ZERO;
            b.torque = Vec3::ZERO;
        }
        for j in self.joints.values_mut() {
            j.torque = 0.0;
        }
    }

    fn apply_gravity(&mut self, gravity: Vec3) {
        // Sleeping bodies too, so unbalanced loads can wake them.
        for b in self.bodies.values_mut().filter(|b| b.is_dynamic()) {
            b.force += gravity * b.mass;
        }
    }

    fn apply_central_force(&mut self, body: BodyHandle, force: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.force += force;
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec3, point: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.add_force_at(force, point);
        }
    }

    fn apply_torque(&mut self, body: BodyHandle, torque: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.torque += torque;
        }
    }

    fn set_damping(&mut self, body: BodyHandle, linear: f64, angular: f64) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.linear_damping = linear.clamp(0.0, 1.0);
            b.angular_damping = angular.clamp(0.0, 1.0);
        }
    }

    fn step_simulation(&mut self, dt: f64, max_substeps: u32, fixed_substep: f64) -> u32 {
        if !(dt > 0.0) {
            return 0;
        }
        if max_substeps == 0 {
            self.integrate(dt);
            return 1;
        }
        let fixed = if fixed_substep > 0.0 { fixed_substep } else { dt };
        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= fixed * (1.0 - 1e-9) && steps < max_substeps {
            self.integrate(fixed);
            self.accumulator -= fixed;
            steps += 1;
        }
        self.accumulator = if self.accumulator >= fixed { self.accumulator % fixed } else { self.accumulator.max(0.0) };
        steps
    }

    fn contact_manifolds(&self) -> Vec<ContactManifold> {
        self.overlapping_pairs()
            .into_iter()
            .map(|(a, b, point)| ContactManifold { a, b, points: vec![point] })
            .collect()
    }

    fn ray_test(&self, from: Vec3, to: Vec3, ignore: &[BodyHandle]) -> Option<RayHit> {
        let seg = to - from;
        let len = seg.length();
        if len <= 0.0 {
            return None;
        }
        let dir = seg / len;
        let mut best: Option<RayHit> = None;
        for (handle, body) in &self.bodies {
            if ignore.contains(handle) || body.radius <= 0.0 {
                continue;
            }
            let oc = from - body.pose.translation;
            // Rays starting inside a body never hit it.
            let c = oc.length_squared() - body.radius * body.radius;
            if c <= 0.0 {
                continue;
            }
            let b = oc.dot(dir);
            let disc = b * b - c;
            if disc < 0.0 {
                continue;
            }
            let t = -b - disc.sqrt();
            if t < 0.0 || t > len {
                continue;
            }
            if best.map_or(true, |h| t < h.distance) {
                best = Some(RayHit { body: *handle, point: from + dir * t, distance: t });
            }
        }
        best
    }

    fn is_sleeping(&self, body: BodyHandle) -> bool {
        self.bodies.get(&body).is_some_and(|b| b.sleeping)
    }
}
