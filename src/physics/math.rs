use crate::physics::point::Point;
use rayon::prelude::*;

/// Scalar type for physics calculations (f64 for precision)
pub type Scalar = f64;

/// 3D vector type for positions, velocities, and forces
pub type Vector = glam::DVec3;

/// Softening added to the squared distance in the force kernel.
///
/// `sqrt(m1 + m2)`: symmetric in its arguments, positive for any pair with
/// positive total weight, and grows slowly enough that distant interactions
/// are left essentially untouched.
#[inline]
pub fn softening(m1: Scalar, m2: Scalar) -> Scalar {
    libm::sqrt(m1 + m2)
}

/// Force exerted on a point mass `m1` at `p1` by a point mass `m2` at `p2`.
///
/// `normalize(p2 - p1) * m1 * m2 / (|p2 - p1|² + softening(m1, m2))`
///
/// Two distinct masses at the same position have no direction between them
/// and exert no force on each other.
#[inline]
pub fn pairwise_force(p1: Vector, m1: Scalar, p2: Vector, m2: Scalar) -> Vector {
    let offset = p2 - p1;
    let distance_squared = offset.length_squared();
    if distance_squared == 0.0 {
        return Vector::ZERO;
    }

    let direction = offset / distance_squared.sqrt();
    let magnitude = (m1 * m2) / (distance_squared + softening(m1, m2));

    direction * magnitude
}

/// Exact O(N²) force on `points[index]` from every other point.
pub fn direct_force(points: &[Point], index: usize) -> Vector {
    let target = &points[index];
    points
        .iter()
        .enumerate()
        .filter(|(other_index, _)| *other_index != index)
        .fold(Vector::ZERO, |force, (_, other)| {
            force + pairwise_force(target.position, target.weight, other.position, other.weight)
        })
}

/// Exact O(N²) forces for every point, aligned by index.
pub fn direct_forces(points: &[Point]) -> Vec<Vector> {
    (0..points.len())
        .into_par_iter()
        .map(|index| direct_force(points, index))
        .collect()
}

/// Relative error of `approximate` against `exact`, falling back to the
/// absolute error when the exact force vanishes.
pub fn relative_error(approximate: Vector, exact: Vector) -> Scalar {
    let exact_length = exact.length();
    let error = (approximate - exact).length();
    if exact_length > Scalar::EPSILON {
        error / exact_length
    } else {
        error
    }
}
