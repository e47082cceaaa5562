use nalgebra::{Isometry3, Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3, Vector6};

use std::ops;

use crate::error::Error;

/// Rigid transform (rotation and translation), stored as an isometry.
/// Camera poses, odometry and extrinsics are all expressed with it.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform(Isometry3<f64>);

impl Transform {
    pub fn eye() -> Self {
        Self(Isometry3::identity())
    }

    pub fn new(translation: &Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::new(translation[0], translation[1], translation[2]),
            rotation,
        ))
    }

    /// Transform from the exponential map of a twist, laid out as
    /// translation `[0..3]` and scaled rotation axis `[3..6]`.
    pub fn from_se3_exp(translation_so3: &Vector6<f64>) -> Self {
        let translation =
            Translation3::new(translation_so3[0], translation_so3[1], translation_so3[2]);
        let so3 = Vector3::new(translation_so3[3], translation_so3[4], translation_so3[5]);

        Self(Isometry3::from_parts(
            translation,
            UnitQuaternion::from_scaled_axis(so3),
        ))
    }

    pub fn from_matrix4(matrix: &Matrix4<f64>) -> Self {
        let translation = Translation3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        let so3 = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(
            &matrix.fixed_slice::<3, 3>(0, 0).into_owned(),
        ));
        Self(Isometry3::from_parts(translation, so3))
    }

    /// Parses 16 values in column-major order, the layout used by pose graph files.
    pub fn from_column_slice(values: &[f64]) -> Result<Self, Error> {
        if values.len() != 16 {
            return Err(Error::Parser(format!(
                "A 4x4 transform needs 16 values, got {}",
                values.len()
            )));
        }
        Ok(Self::from_matrix4(&Matrix4::from_column_slice(values)))
    }

    /// 16 values in column-major order.
    pub fn to_column_vec(&self) -> Vec<f64> {
        self.matrix().as_slice().to_vec()
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        self.0.to_homogeneous()
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.0.rotation.angle()
    }

    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        (self.0 * nalgebra::Point3::from(*point)).coords
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::eye()
    }
}

impl ops::Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Self::Output {
        Transform(self.0 * rhs.0)
    }
}

impl ops::Mul<&Vector3<f64>> for &Transform {
    type Output = Vector3<f64>;

    fn mul(self, rhs: &Vector3<f64>) -> Self::Output {
        self.transform_point(rhs)
    }
}

impl From<Transform> for Matrix4<f64> {
    fn from(transform: Transform) -> Self {
        transform.0.into()
    }
}

impl approx::AbsDiffEq for Transform {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        1e-9
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.matrix().abs_diff_eq(&other.matrix(), epsilon)
    }
}
