use std::collections::BTreeMap;

use hydro::{FluidSurface, Pose, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

use crate::device::{CommDevice, CommKind};
use crate::error::{CommError, Result};
use crate::frame::{CommDataFrame, DeviceId, ReceivedFrame, ACK};
use crate::link::{corrupt_payload, mutually_reachable, optical_quality, reachable, MediumParams, Occluder};
use crate::usbl::compute_fix;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Frames put on the medium (one per broadcast target).
    pub dispatched: u64,
    pub delivered: u64,
    /// Point-to-point frames without mutual reachability, and broadcasts
    /// nobody could hear.
    pub unreachable: u64,
    /// In-flight frames whose target was removed.
    pub lost: u64,
    /// Frames pushed out of a full receive buffer.
    pub overflowed: u64,
    pub corrupted_bytes: u64,
}

#[derive(Debug, Clone)]
struct InFlight {
    frame: CommDataFrame,
    target: DeviceId,
    position: Vec3,
}

/// Owns every comm device and carries frames between them.
///
/// Acoustic frames travel at the speed of sound towards the target's current
/// position; optical and radio frames arrive in the update that dispatches
/// them.
pub struct CommPropagationEngine {
    medium: MediumParams,
    devices: BTreeMap<DeviceId, CommDevice>,
    in_flight: Vec<InFlight>,
    time: f64,
    rng: StdRng,
    surface: Option<FluidSurface>,
    stats: EngineStats,
}

impl CommPropagationEngine {
    pub fn new(medium: MediumParams, seed: u64) -> Self {
        Self {
            medium,
            devices: BTreeMap::new(),
            in_flight: Vec::new(),
            time: 0.0,
            rng: StdRng::seed_from_u64(seed),
            surface: None,
            stats: EngineStats::default(),
        }
    }

    pub fn medium(&self) -> &MediumParams {
        &self.medium
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn add_device(&mut self, device: CommDevice) -> Result<()> {
        if device.id.is_broadcast() {
            return Err(CommError::ReservedId);
        }
        if self.devices.contains_key(&device.id) {
            return Err(CommError::DuplicateId(device.id));
        }
        debug!(id = %device.id, name = %device.name, "comm device registered");
        self.devices.insert(device.id, device);
        Ok(())
    }

    /// Unregister a device. Frames still travelling towards it are dropped.
    pub fn remove_device(&mut self, id: DeviceId) -> Result<CommDevice> {
        let device = self.devices.remove(&id).ok_or(CommError::UnknownDevice(id))?;
        let before = self.in_flight.len();
        self.in_flight.retain(|f| f.target != id);
        let dropped = before - self.in_flight.len();
        if dropped > 0 {
            warn!(id = %id, dropped, "device removed with frames in flight");
            self.stats.lost += dropped as u64;
        }
        Ok(device)
    }

    pub fn device(&self, id: DeviceId) -> Option<&CommDevice> {
        self.devices.get(&id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut CommDevice> {
        self.devices.get_mut(&id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &CommDevice> {
        self.devices.values()
    }

    pub fn set_pose(&mut self, id: DeviceId, pose: Pose) -> Result<()> {
        let d = self.devices.get_mut(&id).ok_or(CommError::UnknownDevice(id))?;
        d.pose = pose;
        Ok(())
    }

    /// Surface used for radio gating and optical ambient light.
    pub fn set_surface(&mut self, surface: Option<FluidSurface>) {
        self.surface = surface;
    }

    /// Queue a frame in `source`'s transmit buffer. It leaves on the next
    /// `update`.
    pub fn send(&mut self, source: DeviceId, destination: DeviceId, payload: Vec<u8>) -> Result<u32> {
        if !destination.is_broadcast() && !self.devices.contains_key(&destination) {
            return Err(CommError::UnknownDevice(destination));
        }
        let time = self.time;
        let src = self.devices.get_mut(&source).ok_or(CommError::UnknownDevice(source))?;
        let seq = src.next_seq();
        let tx_position = src.position();
        src.tx.push_back(CommDataFrame {
            timestamp: time,
            seq,
            source,
            destination,
            payload,
            tx_position,
            travelled: 0.0,
        });
        trace!(src = %source, dst = %destination, seq, "frame queued");
        Ok(seq)
    }

    pub fn receive(&mut self, id: DeviceId) -> Result<Option<ReceivedFrame>> {
        let d = self.devices.get_mut(&id).ok_or(CommError::UnknownDevice(id))?;
        Ok(d.rx.pop_front())
    }

    pub fn drain_received(&mut self, id: DeviceId) -> Result<Vec<ReceivedFrame>> {
        let d = self.devices.get_mut(&id).ok_or(CommError::UnknownDevice(id))?;
        Ok(d.rx.drain(..).collect())
    }

    /// Devices `id` can currently reach one-way.
    pub fn reachable_from(&self, id: DeviceId, occluder: &dyn Occluder) -> Vec<DeviceId> {
        let Some(src) = self.devices.get(&id) else {
            return Vec::new();
        };
        self.devices
            .values()
            .filter(|d| reachable(src, d, self.surface.as_ref(), occluder))
            .map(|d| d.id)
            .collect()
    }

    /// Advance travelling frames, then put queued frames on the medium.
    pub fn update(&mut self, dt: f64, occluder: &dyn Occluder) {
        if dt <= 0.0 {
            return;
        }
        self.time += dt;
        self.propagate(dt, occluder);
        self.dispatch(occluder);
    }

    fn propagate(&mut self, dt: f64, occluder: &dyn Occluder) {
        let step = self.medium.speed_of_sound * dt;
        let mut arrived = Vec::new();
        let mut still = Vec::with_capacity(self.in_flight.len());
        for mut f in self.in_flight.drain(..) {
            let Some(target) = self.devices.get(&f.target) else {
                warn!(target = %f.target, seq = f.frame.seq, "frame target vanished");
                self.stats.lost += 1;
                continue;
            };
            let to = target.position() - f.position;
            let remaining = to.length();
            if remaining <= step {
                f.frame.travelled += remaining;
                arrived.push((f.target, f.frame));
            } else {
                f.position += to * (step / remaining);
                f.frame.travelled += step;
                still.push(f);
            }
        }
        self.in_flight = still;

        for (target, frame) in arrived {
            self.deliver_acoustic(target, frame, occluder);
        }
    }

    fn deliver_acoustic(&mut self, target: DeviceId, frame: CommDataFrame, occluder: &dyn Occluder) {
        let time = self.time;
        let Some(rx) = self.devices.get(&target) else {
            self.stats.lost += 1;
            return;
        };
        let (auto_ack, usbl) = match &rx.kind {
            CommKind::Acoustic { auto_ack, usbl, .. } => (*auto_ack, *usbl),
            _ => (false, None),
        };

        let fix = match (usbl, self.devices.get(&frame.source)) {
            (Some(params), Some(beacon)) if frame.is_ack() && frame.destination == target => {
                let fix = compute_fix(
                    &mut self.rng,
                    &params,
                    &rx.pose,
                    beacon.id,
                    beacon.position(),
                    frame.travelled,
                    time,
                );
                debug!(head = %target, beacon = %beacon.id, range = fix.range, "usbl fix");
                Some(fix)
            }
            _ => None,
        };

        let reply = if auto_ack && frame.is_ping() {
            match self.devices.get(&frame.source) {
                Some(src) if mutually_reachable(rx, src, self.surface.as_ref(), occluder) => {
                    Some((src.id, rx.position()))
                }
                _ => None,
            }
        } else {
            None
        };

        if let (Some(fix), Some(d)) = (fix, self.devices.get_mut(&target)) {
            d.push_fix(fix);
        }

        let ping_travelled = frame.travelled;
        self.push_rx(target, ReceivedFrame { frame, received_at: time, quality: 1.0 });

        if let Some((pinger, origin)) = reply {
            if let Some(d) = self.devices.get_mut(&target) {
                let seq = d.next_seq();
                let ack = CommDataFrame {
                    timestamp: time,
                    seq,
                    source: target,
                    destination: pinger,
                    payload: ACK.to_vec(),
                    tx_position: origin,
                    travelled: ping_travelled,
                };
                trace!(src = %target, dst = %pinger, seq, "auto ack");
                self.stats.dispatched += 1;
                self.in_flight.push(InFlight { frame: ack, target: pinger, position: origin });
            }
        }
    }

    fn dispatch(&mut self, occluder: &dyn Occluder) {
        let time = self.time;
        let mut instant: Vec<(DeviceId, ReceivedFrame)> = Vec::new();
        let ids: Vec<DeviceId> = self.devices.keys().copied().collect();
        for id in ids {
            let queued: Vec<CommDataFrame> = match self.devices.get_mut(&id) {
                Some(d) => d.tx.drain(..).collect(),
                None => continue,
            };
            let Some(src) = self.devices.get(&id) else { continue };
            let surface = self.surface.as_ref();
            for mut frame in queued {
                frame.tx_position = src.position();
                let targets: Vec<&CommDevice> = if frame.destination.is_broadcast() {
                    self.devices.values().filter(|d| reachable(src, d, surface, occluder)).collect()
                } else {
                    match self.devices.get(&frame.destination) {
                        Some(dst) if mutually_reachable(src, dst, surface, occluder) => vec![dst],
                        _ => Vec::new(),
                    }
                };
                if targets.is_empty() {
                    debug!(
                        src = %id,
                        dst = %frame.destination,
                        seq = frame.seq,
                        "no reachable receiver; frame dropped"
                    );
                    self.stats.unreachable += 1;
                    continue;
                }
                for dst in targets {
                    self.stats.dispatched += 1;
                    match src.kind {
                        CommKind::Acoustic { .. } => self.in_flight.push(InFlight {
                            frame: frame.clone(),
                            target: dst.id,
                            position: frame.tx_position,
                        }),
                        CommKind::Optical { .. } => {
                            let quality = optical_quality(&self.medium, src, dst, surface);
                            let mut copy = frame.clone();
                            copy.travelled = src.position().distance(dst.position());
                            let hits = corrupt_payload(&mut self.rng, &mut copy.payload, quality);
                            self.stats.corrupted_bytes += hits as u64;
                            instant.push((dst.id, ReceivedFrame { frame: copy, received_at: time, quality }));
                        }
                        CommKind::Radio { .. } => {
                            let mut copy = frame.clone();
                            copy.travelled = src.position().distance(dst.position());
                            instant.push((dst.id, ReceivedFrame { frame: copy, received_at: time, quality: 1.0 }));
                        }
                    }
                }
            }
        }
        for (target, rf) in instant {
            self.push_rx(target, rf);
        }
    }

    fn push_rx(&mut self, target: DeviceId, rf: ReceivedFrame) {
        let Some(d) = self.devices.get_mut(&target) else {
            self.stats.lost += 1;
            return;
        };
        self.stats.delivered += 1;
        if let Some(old) = d.push_rx(rf) {
            warn!(id = %target, seq = old.frame.seq, "receive buffer full; oldest frame discarded");
            self.stats.overflowed += 1;
        }
    }
}
