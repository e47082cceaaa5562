use crate::transform::Transform;

/// Accumulates frame to frame odometry into camera poses.
///
/// The first pose is the identity. Each accumulated transform maps the
/// previous camera into the current one, so the running odometry is
/// `transform * odometry` and the current camera pose is its inverse.
#[derive(Clone, Debug)]
pub struct TrajectoryBuilder {
    world_to_camera: Transform,
}

impl Default for TrajectoryBuilder {
    /// Creates a new `TrajectoryBuilder` at the origin.
    fn default() -> Self {
        Self {
            world_to_camera: Transform::eye(),
        }
    }
}

impl TrajectoryBuilder {
    /// Accumulates the given previous-to-current transform and returns the new camera pose.
    pub fn accumulate(&mut self, previous_to_current: &Transform) -> Transform {
        self.world_to_camera = previous_to_current * &self.world_to_camera;
        self.world_to_camera.inverse()
    }

    /// The accumulated odometry, mapping the first camera into the current one.
    pub fn odometry(&self) -> &Transform {
        &self.world_to_camera
    }
}
