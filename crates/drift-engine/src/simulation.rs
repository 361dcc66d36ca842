//! Headless simulation.
//!
//! Walks an observer across the world along a scripted path, ticking the
//! world at a fixed timestep and logging snapshots as it goes.

use std::fmt;
use std::ops::Range;

use anyhow::{Context, Result};
use drift_common::EntityId;
use drift_world::{
    HeadlessHost, InfiniteWorld, SceneHost, TrackedEntity, TrackedKind, WorldConfig,
};
use glam::{DVec2, DVec3, Vec3};
use tracing::{debug, info};

/// Observer eye height above the ground.
const EYE_HEIGHT: f64 = 1.8;

/// Camera offset from the observer.
const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 3.0, -6.0);

/// One straight segment of the walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    /// Horizontal direction (`x`, `z`), normalized when walked
    pub direction: DVec2,
    /// Frames spent on this leg
    pub frames: u32,
}

impl Leg {
    /// Creates a leg.
    #[must_use]
    pub const fn new(x: f64, z: f64, frames: u32) -> Self {
        Self {
            direction: DVec2::new(x, z),
            frames,
        }
    }
}

/// Scripted observer walk.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkPlan {
    /// Total frames to simulate
    pub frames: u32,
    /// Fixed timestep in seconds
    pub dt: f32,
    /// Walking speed in world units per second
    pub speed: f64,
    /// Log a snapshot every this many frames (0 = never)
    pub report_every: u32,
    /// Segments walked in order, repeating
    pub legs: Vec<Leg>,
    /// Frames during which the observer reference is dropped
    pub observer_gap: Option<Range<u32>>,
}

impl Default for WalkPlan {
    fn default() -> Self {
        Self {
            frames: 4200,
            dt: 1.0 / 60.0,
            speed: 40.0,
            report_every: 300,
            legs: vec![
                Leg::new(1.0, 0.0, 1800),
                Leg::new(0.0, 1.0, 600),
                Leg::new(-1.0, -1.0, 900),
                Leg::new(1.0, -0.5, 900),
            ],
            observer_gap: Some(1500..1530),
        }
    }
}

impl WalkPlan {
    /// Sets the total frame count.
    #[must_use]
    pub fn with_frames(mut self, frames: u32) -> Self {
        self.frames = frames;
        self
    }

    /// Velocity at `frame`, cycling through the legs.
    fn velocity(&self, frame: u32) -> DVec3 {
        let cycle: u32 = self.legs.iter().map(|leg| leg.frames).sum();
        if cycle == 0 {
            return DVec3::ZERO;
        }
        let mut t = frame % cycle;
        for leg in &self.legs {
            if t < leg.frames {
                let direction = leg.direction.normalize_or_zero() * self.speed;
                return DVec3::new(direction.x, 0.0, direction.y);
            }
            t -= leg.frames;
        }
        DVec3::ZERO
    }

    fn observer_dropped(&self, frame: u32) -> bool {
        self.observer_gap
            .as_ref()
            .is_some_and(|gap| gap.contains(&frame))
    }
}

/// Totals reported when the simulation ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSummary {
    /// Frames simulated
    pub frames: u32,
    /// Final absolute observer position
    pub observer: DVec3,
    /// Origin shifts performed
    pub shifts: u64,
    /// Chunks materialized
    pub materialized: u64,
    /// Chunks released, including at shutdown
    pub released: u64,
    /// Chunk build failures
    pub failures: u64,
    /// Most chunks live at once
    pub peak_live: usize,
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, observer at ({:.1}, {:.1}, {:.1}), {} shifts, {} chunks loaded, {} released, {} failed, at most {} live",
            self.frames,
            self.observer.x,
            self.observer.y,
            self.observer.z,
            self.shifts,
            self.materialized,
            self.released,
            self.failures,
            self.peak_live
        )
    }
}

/// A world, a headless host and a scripted walk.
#[derive(Debug)]
pub struct Simulation {
    world: InfiniteWorld,
    host: HeadlessHost,
    plan: WalkPlan,
    camera: EntityId,
    /// Absolute observer position the script steers
    observer: DVec3,
}

impl Simulation {
    /// Builds the world and populates the scene with tracked entities.
    pub fn new(config: WorldConfig, plan: WalkPlan) -> Result<Self> {
        let mut host = HeadlessHost::new();
        let camera = host.spawn_prop(CAMERA_OFFSET);
        let crate_prop = host.spawn_prop(Vec3::new(30.0, 0.0, 30.0));
        let body = host.spawn_body(Vec3::new(10.0, 2.0, 0.0));
        let particles = host.spawn_particles(
            Vec3::new(-5.0, 0.0, 5.0),
            vec![Vec3::new(-5.0, 1.0, 5.0), Vec3::new(-4.0, 2.0, 6.0)],
        );
        let trail = host.spawn_trail(Vec3::ZERO, vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0)]);

        let world = InfiniteWorld::builder()
            .config(config)
            .track(TrackedEntity::new(camera, TrackedKind::Transform).attached())
            .track(TrackedEntity::new(crate_prop, TrackedKind::Transform))
            .track(TrackedEntity::new(body, TrackedKind::RigidBody))
            .track(TrackedEntity::new(particles, TrackedKind::Particles))
            .track(TrackedEntity::new(trail, TrackedKind::Trail))
            .build()
            .context("invalid world configuration")?;

        Ok(Self {
            world,
            host,
            plan,
            camera,
            observer: DVec3::ZERO,
        })
    }

    /// Runs the whole walk and shuts the world down.
    pub fn run(mut self) -> Result<SimulationSummary> {
        let reader = self.world.snapshot_reader();
        let report = self
            .world
            .start(&mut self.host)
            .context("observer missing at start")?;
        info!("Initial window: {} chunks", report.loaded.len());

        let mut peak_live = self.world.streaming().live_count();
        for frame in 0..self.plan.frames {
            self.step(frame);
            peak_live = peak_live.max(self.world.streaming().live_count());

            if self.plan.report_every > 0 && frame % self.plan.report_every == 0 {
                info!("{}", reader.get());
            }
        }

        let snapshot = reader.get();
        let observer = self.observer;
        self.world.shutdown(&mut self.host);
        let stats = self.world.streaming().stats();

        Ok(SimulationSummary {
            frames: self.plan.frames,
            observer,
            shifts: snapshot.shift_count,
            materialized: stats.materialized,
            released: stats.released,
            failures: stats.failures,
            peak_live,
        })
    }

    /// Moves the observer one frame along the script and ticks the world.
    fn step(&mut self, frame: u32) {
        let dt = self.plan.dt;
        self.observer += self.plan.velocity(frame) * f64::from(dt);
        if let Some(ground) = self.world.ground_height(self.observer) {
            self.observer.y = f64::from(ground) + EYE_HEIGHT;
        }

        if self.plan.observer_dropped(frame) {
            if self.host.observer_position().is_some() {
                debug!("Dropping observer at frame {frame}");
                self.host.set_observer(None);
            }
        } else {
            let local = self.world.to_local(self.observer);
            self.host.set_observer(Some(local));
            self.host
                .recenter_entity(self.camera, local + CAMERA_OFFSET - self.camera_position());
        }

        let report = self.world.tick(dt, &mut self.host);
        if let Some(shift) = report.shift {
            debug!(
                "Frame {frame}: origin shift #{} by {}",
                shift.shift_number, shift.offset
            );
        }
    }

    fn camera_position(&self) -> Vec3 {
        self.host.position(self.camera).unwrap_or(CAMERA_OFFSET)
    }
}
