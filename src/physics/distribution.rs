//! Seedable point-set generators for drivers, benches, and tests.

use std::f64::consts;
use std::ops::{Deref, DerefMut};

use rand::Rng;
use rand_chacha::{ChaCha8Rng, rand_core::SeedableRng};

use crate::config::{PointDistribution, SimulationParams};
use crate::physics::math::{Scalar, Vector};
use crate::physics::point::Point;

#[derive(Debug, Clone, PartialEq)]
pub struct SharedRng(pub ChaCha8Rng);

impl SharedRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::default(),
        }
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self(ChaCha8Rng::from_rng(&mut rand::rng()))
    }
}

impl Deref for SharedRng {
    type Target = ChaCha8Rng;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedRng {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

pub fn random_unit_vector(rng: &mut SharedRng) -> Vector {
    let theta = rng.random_range(0.0..=2.0 * consts::PI);
    let phi = libm::acos(rng.random_range(-1.0..=1.0));

    Vector::new(
        libm::sin(phi) * libm::cos(theta),
        libm::sin(phi) * libm::sin(theta),
        libm::cos(phi),
    )
}

/// Uniform inside a ball of `radius` centered on the origin.
pub fn random_in_ball(rng: &mut SharedRng, radius: Scalar) -> Vector {
    let r = radius * libm::cbrt(rng.random_range(0.0..=1.0));
    random_unit_vector(rng) * r
}

/// Uniform inside a disk of `radius` in the `z = 1` plane.
pub fn random_in_disk(rng: &mut SharedRng, radius: Scalar) -> Vector {
    let angle = rng.random_range(0.0..2.0 * consts::PI);
    let r = radius * libm::sqrt(rng.random_range(0.0..=1.0));
    Vector::new(r * libm::cos(angle), r * libm::sin(angle), 1.0)
}

/// Radius that keeps point density constant as the count grows.
pub fn distribution_radius(count: usize, multiplier: Scalar) -> Scalar {
    multiplier * libm::cbrt(count.max(1) as Scalar)
}

pub fn generate_points(
    rng: &mut SharedRng,
    count: usize,
    distribution: PointDistribution,
    radius: Scalar,
    max_log_weight: Scalar,
) -> Vec<Point> {
    (0..count)
        .map(|_| {
            let position = match distribution {
                PointDistribution::Ball => random_in_ball(rng, radius),
                PointDistribution::Disk => random_in_disk(rng, radius),
                PointDistribution::Shell => random_unit_vector(rng) * radius,
            };
            let weight = libm::exp(rng.random_range(0.0..=max_log_weight));
            Point::new(position, weight)
        })
        .collect()
}

/// Point set described by the simulation parameters.
pub fn generate_from_params(rng: &mut SharedRng, params: &SimulationParams) -> Vec<Point> {
    generate_points(
        rng,
        params.body_count,
        params.distribution,
        distribution_radius(params.body_count, params.radius_multiplier),
        params.max_log_weight,
    )
}
