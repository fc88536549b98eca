//! Ground-truth measurement per sensor kind, before noise.

use hydro::{Pose, Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::noise::{gaussian, gaussian_vec, perturb_rotation, saturate};
use super::SensorContext;
use crate::mount::{Mount, MountFrame};

/// Sensor variants with their parameters. Noise values are 1σ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorKind {
    /// Specific force in the sensor frame, m/s².
    Accelerometer { range: f64, noise: f64 },
    /// Angular velocity in the sensor frame, rad/s.
    Gyroscope { range: f64, noise: f64, bias: Vec3 },
    Imu { accel_noise: f64, gyro_noise: f64, angle_noise: f64 },
    /// Gauge pressure, Pa.
    Pressure { noise: f64 },
    /// Bottom-tracking velocity plus altitude along the sensor's −Z axis.
    Dvl { max_range: f64, velocity_noise: f64, altitude_noise: f64 },
    Odometry { position_noise: f64, velocity_noise: f64 },
    /// Yaw of the sensor +X axis about world +Z, radians.
    Compass { noise: f64 },
    RotaryEncoder,
}

impl SensorKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer { .. } => "accelerometer",
            SensorKind::Gyroscope { .. } => "gyroscope",
            SensorKind::Imu { .. } => "imu",
            SensorKind::Pressure { .. } => "pressure",
            SensorKind::Dvl { .. } => "dvl",
            SensorKind::Odometry { .. } => "odometry",
            SensorKind::Compass { .. } => "compass",
            SensorKind::RotaryEncoder => "rotary_encoder",
        }
    }

    pub fn needs_joint(&self) -> bool {
        matches!(self, SensorKind::RotaryEncoder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorData {
    Vector(Vec3),
    Imu { orientation: Quat, angular_velocity: Vec3, specific_force: Vec3 },
    Scalar(f64),
    Dvl { velocity: Vec3, altitude: Option<f64> },
    Odometry { pose: Pose, linear_velocity: Vec3, angular_velocity: Vec3 },
    Encoder { position: f64, velocity: f64 },
}

impl SensorData {
    pub fn as_vector(&self) -> Option<Vec3> {
        match self {
            SensorData::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            SensorData::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Flatten to plain numbers, e.g. for logging.
    pub fn to_vec(&self) -> Vec<f64> {
        match *self {
            SensorData::Vector(v) => v.to_array().to_vec(),
            SensorData::Imu { orientation: q, angular_velocity: w, specific_force: f } => {
                vec![q.x, q.y, q.z, q.w, w.x, w.y, w.z, f.x, f.y, f.z]
            }
            SensorData::Scalar(s) => vec![s],
            SensorData::Dvl { velocity: v, altitude } => vec![v.x, v.y, v.z, altitude.unwrap_or(f64::NAN)],
            SensorData::Odometry { pose, linear_velocity: v, angular_velocity: w } => {
                let (t, q) = (pose.translation, pose.rotation);
                vec![t.x, t.y, t.z, q.x, q.y, q.z, q.w, v.x, v.y, v.z, w.x, w.y, w.z]
            }
            SensorData::Encoder { position, velocity } => vec![position, velocity],
        }
    }
}

fn specific_force(frame: &MountFrame, gravity: Vec3) -> Vec3 {
    frame.pose.inverse_transform_vector(frame.linear_acceleration - gravity)
}

pub(super) fn measure(
    kind: &SensorKind,
    mount: &Mount,
    ctx: &SensorContext<'_>,
    rng: &mut impl Rng,
) -> Option<SensorData> {
    if let SensorKind::RotaryEncoder = kind {
        let joint = ctx.scene.joints.get(mount.joint()?)?;
        let state = ctx.scene.world.joint_state(joint.handle())?;
        return Some(SensorData::Encoder { position: state.position, velocity: state.velocity });
    }
    let frame = ctx.scene.frame(mount)?;
    let data = match *kind {
        SensorKind::Accelerometer { range, noise } => {
            let f = specific_force(&frame, ctx.env.gravity) + gaussian_vec(rng, noise);
            SensorData::Vector(saturate(f, range))
        }
        SensorKind::Gyroscope { range, noise, bias } => {
            let w = frame.pose.inverse_transform_vector(frame.angular_velocity) + bias + gaussian_vec(rng, noise);
            SensorData::Vector(saturate(w, range))
        }
        SensorKind::Imu { accel_noise, gyro_noise, angle_noise } => SensorData::Imu {
            orientation: perturb_rotation(rng, frame.pose.rotation, angle_noise),
            angular_velocity: frame.pose.inverse_transform_vector(frame.angular_velocity)
                + gaussian_vec(rng, gyro_noise),
            specific_force: specific_force(&frame, ctx.env.gravity) + gaussian_vec(rng, accel_noise),
        },
        SensorKind::Pressure { noise } => {
            let p = frame.pose.translation;
            let gauge = match &ctx.env.ocean {
                Some(ocean) => ocean.fluid.density * ctx.env.gravity.length() * ocean.surface(ctx.time).depth(p),
                None => 0.0,
            };
            SensorData::Scalar((gauge + gaussian(rng, noise)).max(0.0))
        }
        SensorKind::Dvl { max_range, velocity_noise, altitude_noise } => {
            let p = frame.pose.translation;
            if !ctx.env.in_water(p, ctx.time) {
                return None;
            }
            let velocity =
                frame.pose.inverse_transform_vector(frame.linear_velocity) + gaussian_vec(rng, velocity_noise);
            let beam = frame.pose.transform_vector(-Vec3::Z);
            let ignore: Vec<_> = frame.body.into_iter().collect();
            let altitude = ctx
                .scene
                .world
                .ray_test(p, p + beam * max_range, &ignore)
                .map(|hit| (hit.distance + gaussian(rng, altitude_noise)).max(0.0));
            SensorData::Dvl { velocity, altitude }
        }
        SensorKind::Odometry { position_noise, velocity_noise } => {
            let pose = Pose::new(frame.pose.translation + gaussian_vec(rng, position_noise), frame.pose.rotation);
            SensorData::Odometry {
                pose,
                linear_velocity: frame.linear_velocity + gaussian_vec(rng, velocity_noise),
                angular_velocity: frame.angular_velocity + gaussian_vec(rng, velocity_noise),
            }
        }
        SensorKind::Compass { noise } => {
            let x = frame.pose.transform_vector(Vec3::X);
            let heading = x.y.atan2(x.x) + gaussian(rng, noise);
            SensorData::Scalar(wrap_angle(heading))
        }
        SensorKind::RotaryEncoder => return None,
    };
    Some(data)
}

fn wrap_angle(a: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    (a + PI).rem_euclid(TAU) - PI
}
