use nalgebra::{Matrix3, Vector3};

/// Projects a body-frame field reading onto the horizontal plane.
///
/// Pitch is negated before use and `z` follows the sensor's negative axis
/// convention, so a level sensor maps `(x, y, z)` to `(x, y, -z)`.
pub fn to_horizontal(x: f64, y: f64, z: f64, roll: f64, pitch: f64) -> (f64, f64, f64) {
    let (sr, cr) = roll.to_radians().sin_cos();
    let (sp, cp) = (-pitch).to_radians().sin_cos();

    #[rustfmt::skip]
    let rotation = Matrix3::new(
        cp, -sp * sr,  sp * cr,
        0.,  cr,       sr,
        sp,  sr * cp, -cp * cr,
    );
    let field = rotation * Vector3::new(x, y, z);

    (field.x, field.y, field.z)
}
