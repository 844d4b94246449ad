//! Recording and playback of vertex state.
//!
//! A [`Recorder`] captures the vertex positions of every movable body after
//! each frame. A [`Playback`] pushes those positions back into a world with
//! the same bodies through [`crate::Body::assign`], without running the
//! physics.
//! Static bodies never change, so they are not recorded.

use nalgebra::Point3;
use softsim_types::{BodyId, SimError};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::world::World;

/// Vertex positions of one body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodySnapshot {
    /// The recorded body.
    pub id: BodyId,
    /// Vertex positions in mesh slot order.
    pub positions: Vec<Point3<f64>>,
}

/// Every movable body at one instant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameRecord {
    /// Frame number the snapshot was taken after.
    pub frame: u64,
    /// Simulation time the snapshot was taken at.
    pub time: f64,
    /// One entry per movable body.
    pub bodies: Vec<BodySnapshot>,
}

/// A sequence of frames.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Recording {
    /// Frames in capture order.
    pub frames: Vec<FrameRecord>,
}

impl Recording {
    /// Number of recorded frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Recorded duration, from the first frame to the last.
    #[must_use]
    pub fn duration(&self) -> f64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }
}

/// Captures frames from a world.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    recording: Recording,
}

impl Recorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every movable body in `world`.
    pub fn capture(&mut self, world: &World) {
        let bodies = world
            .iter()
            .filter(|(_, body)| !body.is_static())
            .map(|(id, body)| BodySnapshot {
                id,
                positions: body.mesh().positions().to_vec(),
            })
            .collect();

        self.recording.frames.push(FrameRecord {
            frame: world.step_count(),
            time: world.time(),
            bodies,
        });
    }

    /// Frames captured so far.
    #[must_use]
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Stop recording and hand over the frames.
    #[must_use]
    pub fn finish(self) -> Recording {
        debug!(frames = self.recording.len(), "recording finished");
        self.recording
    }
}

/// Replays a [`Recording`] onto a world.
#[derive(Debug, Clone)]
pub struct Playback {
    recording: Recording,
    cursor: usize,
}

impl Playback {
    /// Start playback at the first frame.
    #[must_use]
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            cursor: 0,
        }
    }

    /// Index of the next frame [`Playback::advance`] will apply.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether every frame has been applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.recording.len()
    }

    /// Move the cursor back to the first frame.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Apply the frame at `index` to `world`.
    ///
    /// Every snapshot is checked against `world` before any body is
    /// touched, so a failed apply leaves the world as it was.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if `index` is past the end,
    /// [`SimError::InvalidBodyId`] if a recorded body is missing from
    /// `world`, [`SimError::ImmovableBody`] if it is static there, or
    /// [`SimError::SnapshotMismatch`] if its vertex count differs.
    pub fn apply(&self, index: usize, world: &mut World) -> crate::Result<()> {
        let frame = self.recording.frames.get(index).ok_or_else(|| {
            SimError::invalid_config(format!(
                "frame {index} out of range for a recording of {} frames",
                self.recording.len()
            ))
        })?;

        for snapshot in &frame.bodies {
            let body = world
                .body(snapshot.id)
                .ok_or(SimError::InvalidBodyId(snapshot.id.raw()))?;
            if body.is_static() {
                return Err(SimError::ImmovableBody);
            }
            let expected = body.mesh().vertex_count();
            if snapshot.positions.len() != expected {
                return Err(SimError::SnapshotMismatch {
                    expected,
                    actual: snapshot.positions.len(),
                });
            }
        }

        for snapshot in &frame.bodies {
            if let Some(body) = world.body_mut(snapshot.id) {
                body.assign(&snapshot.positions)?;
            }
        }

        Ok(())
    }

    /// Apply the next frame, returning the one applied or `None` once the
    /// recording is exhausted.
    ///
    /// # Errors
    ///
    /// See [`Playback::apply`].
    pub fn advance(&mut self, world: &mut World) -> crate::Result<Option<&FrameRecord>> {
        if self.is_finished() {
            return Ok(None);
        }
        let index = self.cursor;
        self.apply(index, world)?;
        self.cursor += 1;
        Ok(self.recording.frames.get(index))
    }
}
