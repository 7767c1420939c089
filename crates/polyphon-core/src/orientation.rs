//! Listener orientation math
//!
//! Listener space is X to the listener's right, Y up, and Z forward.
//! Sounds are transformed into listener space by the inverse matrix, and
//! the pan model reads the X (right) and Z (forward) components of the
//! normalized direction. The inverse is built directly from the basis
//! vectors rather than by inverting the world matrix.

use glam::{Mat4, Vec3, Vec4};

/// Orthonormal listener basis derived from a forward and an up hint.
fn listener_basis(forward: Vec3, up: Vec3) -> (Vec3, Vec3, Vec3) {
    let f = forward.try_normalize().unwrap_or(Vec3::Y);
    let r = f.cross(up).try_normalize().unwrap_or(Vec3::X);
    let u = r.cross(f);
    (r, u, f)
}

/// Builds the listener-to-world matrix for a listener at `location`
/// facing along `forward` with the given `up` hint.
pub fn listener_matrix(location: Vec3, forward: Vec3, up: Vec3) -> Mat4 {
    let (r, u, f) = listener_basis(forward, up);
    Mat4::from_cols(
        Vec4::new(r.x, r.y, r.z, 0.0),
        Vec4::new(u.x, u.y, u.z, 0.0),
        Vec4::new(f.x, f.y, f.z, 0.0),
        location.extend(1.0),
    )
}

/// Builds the world-to-listener matrix for the same pose. This is the
/// exact inverse of [`listener_matrix`] for orthonormal bases.
pub fn inverse_listener_matrix(location: Vec3, forward: Vec3, up: Vec3) -> Mat4 {
    let (r, u, f) = listener_basis(forward, up);
    Mat4::from_cols(
        Vec4::new(r.x, u.x, f.x, 0.0),
        Vec4::new(r.y, u.y, f.y, 0.0),
        Vec4::new(r.z, u.z, f.z, 0.0),
        Vec4::new(-r.dot(location), -u.dot(location), -f.dot(location), 1.0),
    )
}
