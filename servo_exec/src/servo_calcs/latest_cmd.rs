//! # Latest-command cache module
//!
//! Ingress callbacks write the most recent commands into a mutex-guarded
//! cache; the orchestrator snapshots it once per tick and releases the lock
//! before doing any IK maths. There is no queue: if two commands arrive
//! between ticks only the later one is acted upon.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use nalgebra::Isometry3;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

// Internal
use servo_if::cmd::{JointJogCmd, JointState, TwistCmd};
use util::time::duration_to_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The most recently received commands and frame names.
#[derive(Default)]
struct LatestCommandCache {
    latest_twist: Option<TwistCmd>,
    twist_stamp: Option<DateTime<Utc>>,
    twist_nonzero: bool,

    latest_jog: Option<JointJogCmd>,
    jog_stamp: Option<DateTime<Utc>>,
    jog_nonzero: bool,

    planning_frame: String,
    command_frame: String,

    /// Planning to command frame transform, recomputed every tick. `None`
    /// until the first successful resolution.
    tf_planning_to_cmd: Option<Isometry3<f64>>,
}

/// A per-tick copy of the cache, taken under the lock and used lock-free for
/// the rest of the tick.
#[derive(Clone)]
pub(crate) struct CommandSnapshot {
    pub twist: TwistCmd,
    pub twist_nonzero: bool,
    pub twist_stale: bool,
    pub twist_stamp: Option<DateTime<Utc>>,

    pub jog: JointJogCmd,
    pub jog_nonzero: bool,
    pub jog_stale: bool,
    pub jog_stamp: Option<DateTime<Utc>>,

    pub planning_frame: String,
    pub command_frame: String,
}

/// Cloneable ingress handle onto the latest-command cache.
#[derive(Clone)]
pub struct CommandHandle {
    cache: Arc<Mutex<LatestCommandCache>>,
}

/// Lock-free handle for the collision monitor's velocity scale. The scalar
/// is stored as raw bits in an atomic, tolerating at most one stale tick.
#[derive(Clone)]
pub struct CollisionScaleHandle {
    scale_bits: Arc<AtomicU64>,
}

/// Handle onto the latest measured joint state.
#[derive(Clone, Default)]
pub struct JointStateHandle {
    latest: Arc<Mutex<Option<JointState>>>,
}

/// Handle used to request the servo loop to stop.
#[derive(Clone, Default)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CommandHandle {
    /// Create a new cache handle with the initial frame names.
    pub fn new(planning_frame: String, command_frame: String) -> Self {
        Self {
            cache: Arc::new(Mutex::new(LatestCommandCache {
                planning_frame,
                command_frame,
                ..Default::default()
            })),
        }
    }

    /// Record a new twist command. An unstamped command inherits the stamp of
    /// the previous one.
    pub fn set_twist(&self, cmd: TwistCmd) {
        let mut cache = self.lock();
        cache.twist_nonzero = cmd.is_nonzero();
        if let Some(stamp) = cmd.stamp {
            cache.twist_stamp = Some(stamp);
        }
        cache.latest_twist = Some(cmd);
    }

    /// Record a new jog command. An unstamped command inherits the stamp of
    /// the previous one.
    pub fn set_joint_jog(&self, cmd: JointJogCmd) {
        let mut cache = self.lock();
        cache.jog_nonzero = cmd.is_nonzero();
        if let Some(stamp) = cmd.stamp {
            cache.jog_stamp = Some(stamp);
        }
        cache.latest_jog = Some(cmd);
    }

    /// Update the planning frame name.
    pub fn set_planning_frame(&self, frame: String) {
        self.lock().planning_frame = frame;
    }

    /// Update the command frame name.
    pub fn set_command_frame(&self, frame: String) {
        self.lock().command_frame = frame;
    }

    /// The cached planning to command frame transform, or `None` if it has
    /// never been successfully computed.
    pub fn command_frame_transform(&self) -> Option<Isometry3<f64>> {
        self.lock().tf_planning_to_cmd
    }

    /// Store the transform computed this tick.
    pub(crate) fn store_transform(&self, tf: Option<Isometry3<f64>>) {
        self.lock().tf_planning_to_cmd = tf;
    }

    /// Copy the cache into a per-tick snapshot, judging staleness against
    /// `now`. A command is stale when its stamp is at least
    /// `timeout_s` old; a command that has never arrived is stale.
    pub(crate) fn snapshot(&self, now: DateTime<Utc>, timeout_s: f64) -> CommandSnapshot {
        let cache = self.lock();

        CommandSnapshot {
            twist: cache.latest_twist.clone().unwrap_or_default(),
            twist_nonzero: cache.twist_nonzero,
            twist_stale: is_stale(cache.twist_stamp, now, timeout_s),
            twist_stamp: cache.twist_stamp,
            jog: cache.latest_jog.clone().unwrap_or_default(),
            jog_nonzero: cache.jog_nonzero,
            jog_stale: is_stale(cache.jog_stamp, now, timeout_s),
            jog_stamp: cache.jog_stamp,
            planning_frame: cache.planning_frame.clone(),
            command_frame: cache.command_frame.clone(),
        }
    }

    /// Lock the cache, recovering the guard if a writer panicked.
    fn lock(&self) -> MutexGuard<LatestCommandCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CollisionScaleHandle {
    pub fn new() -> Self {
        Self {
            scale_bits: Arc::new(AtomicU64::new(1.0f64.to_bits())),
        }
    }

    /// Store a new scale from the collision monitor.
    pub fn set(&self, scale: f64) {
        self.scale_bits.store(scale.to_bits(), Ordering::Relaxed);
    }

    /// The most recently published scale.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.scale_bits.load(Ordering::Relaxed))
    }
}

impl Default for CollisionScaleHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl JointStateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new measured joint state.
    pub fn set(&self, state: JointState) {
        *self.lock() = Some(state);
    }

    /// The most recent measured joint state, if any has arrived.
    pub fn latest(&self) -> Option<JointState> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<Option<JointState>> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the servo loop to stop.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// True if a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Staleness rule: a command whose stamp is exactly `timeout_s` old counts as
/// stale.
fn is_stale(stamp: Option<DateTime<Utc>>, now: DateTime<Utc>, timeout_s: f64) -> bool {
    match stamp {
        Some(stamp) => match duration_to_seconds(now - stamp) {
            Some(age_s) => age_s >= timeout_s,
            None => true,
        },
        None => true,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_staleness_boundary() {
        let now = Utc::now();

        // Exactly at the timeout counts as stale
        let stamp = now - Duration::milliseconds(100);
        assert!(is_stale(Some(stamp), now, 0.1));

        // Just inside the timeout is fresh
        let stamp = now - Duration::milliseconds(99);
        assert!(!is_stale(Some(stamp), now, 0.1));

        // Never-received commands are stale
        assert!(is_stale(None, now, 0.1));
    }

    #[test]
    fn test_unstamped_command_inherits_stamp() {
        let handle = CommandHandle::new("base".into(), "tool0".into());
        let now = Utc::now();

        let mut cmd = TwistCmd {
            stamp: Some(now),
            linear: [0.1, 0.0, 0.0],
            ..Default::default()
        };
        handle.set_twist(cmd.clone());

        // A second, unstamped command keeps the previous stamp
        cmd.stamp = None;
        cmd.linear = [0.2, 0.0, 0.0];
        handle.set_twist(cmd);

        let snap = handle.snapshot(now, 0.1);
        assert_eq!(snap.twist_stamp, Some(now));
        assert_eq!(snap.twist.linear[0], 0.2);
        assert!(!snap.twist_stale);
    }

    #[test]
    fn test_latest_command_wins() {
        let handle = CommandHandle::new("base".into(), "tool0".into());
        let now = Utc::now();

        for v in [0.1, 0.2, 0.3].iter() {
            handle.set_twist(TwistCmd {
                stamp: Some(now),
                linear: [*v, 0.0, 0.0],
                ..Default::default()
            });
        }

        let snap = handle.snapshot(now, 0.1);
        assert_eq!(snap.twist.linear[0], 0.3);
    }

    #[test]
    fn test_collision_scale_handle() {
        let handle = CollisionScaleHandle::new();
        assert_eq!(handle.get(), 1.0);

        handle.set(0.25);
        assert_eq!(handle.clone().get(), 0.25);
    }

    #[test]
    fn test_zero_twist_clears_nonzero_flag() {
        let handle = CommandHandle::new("base".into(), "tool0".into());
        let now = Utc::now();

        handle.set_twist(TwistCmd {
            stamp: Some(now),
            linear: [0.5, 0.0, 0.0],
            ..Default::default()
        });
        assert!(handle.snapshot(now, 0.1).twist_nonzero);

        handle.set_twist(TwistCmd {
            stamp: Some(now),
            ..Default::default()
        });
        assert!(!handle.snapshot(now, 0.1).twist_nonzero);
    }
}
