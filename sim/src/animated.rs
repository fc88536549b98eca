//! Entities moved along a prescribed trajectory instead of by the solver.

use hydro::{Pose, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub time: f64,
    pub pose: Pose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    points: Vec<Waypoint>,
    looped: bool,
}

impl Trajectory {
    /// Waypoint times must be finite and strictly increasing.
    pub fn new(points: Vec<Waypoint>, looped: bool) -> Result<Self> {
        if points.is_empty() {
            return Err(SimError::InvalidConfig("trajectory needs at least one waypoint".into()));
        }
        let ordered = points.windows(2).all(|w| w[1].time > w[0].time);
        if !ordered || points.iter().any(|p| !p.time.is_finite()) {
            return Err(SimError::InvalidConfig("trajectory times must increase".into()));
        }
        Ok(Self { points, looped })
    }

    pub fn stationary(pose: Pose) -> Self {
        Self { points: vec![Waypoint { time: 0.0, pose }], looped: false }
    }

    pub fn duration(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => b.time - a.time,
            _ => 0.0,
        }
    }

    fn local_time(&self, time: f64) -> f64 {
        let start = self.points[0].time;
        let span = self.duration();
        if self.looped && span > 0.0 {
            start + (time - start).rem_euclid(span)
        } else {
            time
        }
    }

    /// Pose, linear velocity and angular velocity at `time`. Outside the
    /// waypoint span (when not looped) the end poses hold with zero velocity.
    pub fn sample(&self, time: f64) -> (Pose, Vec3, Vec3) {
        let t = self.local_time(time);
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if t <= first.time {
            return (first.pose, Vec3::ZERO, Vec3::ZERO);
        }
        if t >= last.time {
            return (last.pose, Vec3::ZERO, Vec3::ZERO);
        }
        let i = self.points.partition_point(|p| p.time <= t);
        let (a, b) = (self.points[i - 1], self.points[i]);
        let span = b.time - a.time;
        let s = (t - a.time) / span;
        let translation = a.pose.translation.lerp(b.pose.translation, s);
        let rotation = a.pose.rotation.slerp(b.pose.rotation, s);
        let velocity = (b.pose.translation - a.pose.translation) / span;
        let turn: Quat = b.pose.rotation * a.pose.rotation.inverse();
        let (axis, angle) = turn.to_axis_angle();
        let angle = if angle > std::f64::consts::PI { angle - std::f64::consts::TAU } else { angle };
        (Pose::new(translation, rotation), velocity, axis * angle / span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedEntity {
    pub name: String,
    pub trajectory: Trajectory,
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub linear_acceleration: Vec3,
}

impl AnimatedEntity {
    pub fn new(name: impl Into<String>, trajectory: Trajectory) -> Self {
        let (pose, linear_velocity, angular_velocity) = trajectory.sample(0.0);
        Self {
            name: name.into(),
            trajectory,
            pose,
            linear_velocity,
            angular_velocity,
            linear_acceleration: Vec3::ZERO,
        }
    }

    /// Jump to `time` without producing an acceleration spike.
    pub fn rewind(&mut self, time: f64) {
        let (pose, v, w) = self.trajectory.sample(time);
        self.pose = pose;
        self.linear_velocity = v;
        self.angular_velocity = w;
        self.linear_acceleration = Vec3::ZERO;
    }

    pub fn update(&mut self, time: f64, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let (pose, v, w) = self.trajectory.sample(time);
        self.linear_acceleration = (v - self.linear_velocity) / dt;
        self.pose = pose;
        self.linear_velocity = v;
        self.angular_velocity = w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> Trajectory {
        Trajectory::new(
            vec![
                Waypoint { time: 0.0, pose: Pose::IDENTITY },
                Waypoint { time: 10.0, pose: Pose::from_translation(Vec3::new(10.0, 0.0, 0.0)) },
            ],
            true,
        )
        .unwrap()
    }

    #[test]
    fn interpolates_and_reports_velocity() {
        let (pose, v, w) = line().sample(2.5);
        assert!((pose.translation.x - 2.5).abs() < 1e-12);
        assert!((v.x - 1.0).abs() < 1e-12);
        assert_eq!(w, Vec3::ZERO);
    }

    #[test]
    fn looped_trajectory_wraps() {
        let (pose, _, _) = line().sample(12.0);
        assert!((pose.translation.x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_gives_angular_velocity() {
        let t = Trajectory::new(
            vec![
                Waypoint { time: 0.0, pose: Pose::IDENTITY },
                Waypoint { time: 2.0, pose: Pose::new(Vec3::ZERO, Quat::from_rotation_z(1.0)) },
            ],
            false,
        )
        .unwrap();
        let (_, _, w) = t.sample(1.0);
        assert!((w.z - 0.5).abs() < 1e-9, "w={w:?}");
        let (pose, v, _) = t.sample(5.0);
        assert_eq!(v, Vec3::ZERO);
        assert!((pose.rotation.angle_between(Quat::from_rotation_z(1.0))).abs() < 1e-9);
    }

    #[test]
    fn unordered_waypoints_rejected() {
        let p = Waypoint { time: 1.0, pose: Pose::IDENTITY };
        assert!(Trajectory::new(vec![p, p], false).is_err());
        assert!(Trajectory::new(Vec::new(), false).is_err());
    }
}
