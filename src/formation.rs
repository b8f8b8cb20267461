//! Formation Generator
//!
//! Every element owns three fixed targets: a spot on the cone-shaped tree,
//! a spot in the exploded sphere and a spot on the message text. They are
//! sampled once per group and never regenerated.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::text::TextPool;

/// How far from the trunk an element sits at its height
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RadialPolicy {
    /// Uniform over the disk at that height
    UniformDisk,
    /// `inner + rand·span` of the max radius: a hollow shell
    Shell { inner: f32, span: f32 },
    /// Evenly climbing garland with `turns` full revolutions
    Spiral { turns: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeShape {
    pub height: f32,
    /// Radius at the base; shrinks linearly to zero at the top
    pub max_radius: f32,
    pub policy: RadialPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChaosShape {
    pub base_radius: f32,
    /// Random extra radial distance on top of the base
    pub extra_radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageShape {
    /// Plane depth of the text
    pub depth_offset: f32,
    /// Total depth jitter around the plane
    pub thickness: f32,
}

/// All three shapes for one element group
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupShape {
    pub tree: TreeShape,
    pub chaos: ChaosShape,
    pub message: MessageShape,
}

/// Position of a point `t` of the way up the tree at `angle` and radius
/// fraction `frac`
fn cone_point(shape: &TreeShape, t: f32, angle: f32, frac: f32) -> Vec3 {
    let y = t * shape.height;
    let r = shape.max_radius * (1.0 - t) * frac;
    Vec3::new(r * angle.cos(), y - shape.height / 2.0, r * angle.sin())
}

/// Random point in the tree formation
pub fn tree_point<R: Rng + ?Sized>(rng: &mut R, shape: &TreeShape) -> Vec3 {
    let t: f32 = rng.gen();
    let angle = rng.gen::<f32>() * TAU;
    let frac = match shape.policy {
        RadialPolicy::UniformDisk => rng.gen::<f32>().sqrt(),
        RadialPolicy::Shell { inner, span } => inner + rng.gen::<f32>() * span,
        // Random spiral placement degenerates to the surface
        RadialPolicy::Spiral { .. } => 1.0,
    };
    cone_point(shape, t, angle, frac)
}

/// Point `i` of `n` along the spiral garland
pub fn spiral_point(shape: &TreeShape, turns: f32, i: usize, n: usize) -> Vec3 {
    let t = if n > 1 { i as f32 / n as f32 } else { 0.0 };
    cone_point(shape, t, t * turns * TAU, 1.0)
}

/// Random point in the exploded formation, uniform over sphere directions
pub fn chaos_point<R: Rng + ?Sized>(rng: &mut R, shape: &ChaosShape) -> Vec3 {
    let r = shape.base_radius + rng.gen::<f32>() * shape.extra_radius;
    let theta = rng.gen::<f32>() * TAU;
    // acos(2u - 1) keeps the poles from bunching up
    let phi = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}

/// Random point on the message text, drawn with replacement from the pool
pub fn message_point<R: Rng + ?Sized>(rng: &mut R, pool: &TextPool, shape: &MessageShape) -> Vec3 {
    let [x, y] = if pool.is_empty() {
        [0.0, 0.0]
    } else {
        pool.points()[rng.gen_range(0..pool.len())]
    };
    let z = shape.depth_offset + (rng.gen::<f32>() - 0.5) * shape.thickness;
    Vec3::new(x, y, z)
}

/// Parallel home/chaos/message targets for a group. Immutable once built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Formations {
    pub home: Vec<Vec3>,
    pub chaos: Vec<Vec3>,
    pub message: Vec<Vec3>,
}

impl Formations {
    pub fn len(&self) -> usize {
        self.home.len()
    }

    pub fn is_empty(&self) -> bool {
        self.home.is_empty()
    }
}

/// Sample all three formations for `n` elements
pub fn generate<R: Rng + ?Sized>(n: usize, shape: &GroupShape, pool: &TextPool, rng: &mut R) -> Formations {
    let mut formations = Formations {
        home: Vec::with_capacity(n),
        chaos: Vec::with_capacity(n),
        message: Vec::with_capacity(n),
    };

    for i in 0..n {
        let home = match shape.tree.policy {
            RadialPolicy::Spiral { turns } => spiral_point(&shape.tree, turns, i, n),
            _ => tree_point(rng, &shape.tree),
        };
        formations.home.push(home);
        formations.chaos.push(chaos_point(rng, &shape.chaos));
        formations.message.push(message_point(rng, pool, &shape.message));
    }

    formations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn shape(policy: RadialPolicy) -> GroupShape {
        GroupShape {
            tree: TreeShape { height: 15.0, max_radius: 6.0, policy },
            chaos: ChaosShape { base_radius: 18.0, extra_radius: 8.0 },
            message: MessageShape { depth_offset: 0.0, thickness: 0.6 },
        }
    }

    fn pool() -> TextPool {
        crate::text::build_pool(&crate::text::MessageSettings {
            canvas: 256,
            ..Default::default()
        })
    }

    fn radial(p: Vec3) -> f32 {
        (p.x * p.x + p.z * p.z).sqrt()
    }

    #[test]
    fn test_tree_points_inside_cone() {
        let mut rng = StdRng::seed_from_u64(1);
        let s = shape(RadialPolicy::UniformDisk);
        for _ in 0..2000 {
            let p = tree_point(&mut rng, &s.tree);
            assert!(p.y >= -7.5 && p.y < 7.5);
            let t = (p.y + 7.5) / 15.0;
            assert!(radial(p) <= 6.0 * (1.0 - t) + 1e-4);
        }
    }

    #[test]
    fn test_shell_policy_is_hollow() {
        let mut rng = StdRng::seed_from_u64(2);
        let s = shape(RadialPolicy::Shell { inner: 0.6, span: 0.35 });
        for _ in 0..2000 {
            let p = tree_point(&mut rng, &s.tree);
            let t = (p.y + 7.5) / 15.0;
            let max_r = 6.0 * (1.0 - t);
            if max_r > 0.1 {
                let frac = radial(p) / max_r;
                assert!(frac >= 0.6 - 1e-3 && frac <= 0.95 + 1e-3, "frac = {}", frac);
            }
        }
    }

    #[test]
    fn test_spiral_climbs() {
        let s = shape(RadialPolicy::Spiral { turns: 5.0 });
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(3);
        let f = generate(100, &s, &pool, &mut rng);
        for w in f.home.windows(2) {
            assert!(w[1].y > w[0].y);
        }
    }

    #[test]
    fn test_chaos_points_in_shell() {
        let mut rng = StdRng::seed_from_u64(4);
        let s = shape(RadialPolicy::UniformDisk);
        let mut upper = 0;
        for _ in 0..4000 {
            let p = chaos_point(&mut rng, &s.chaos);
            let r = p.length();
            assert!(r >= 18.0 - 1e-3 && r <= 26.0 + 1e-3);
            if p.z > 0.0 {
                upper += 1;
            }
        }
        // Roughly half the points on each hemisphere
        assert!((1700..2300).contains(&upper), "upper = {}", upper);
    }

    #[test]
    fn test_message_points_come_from_pool() {
        let pool = pool();
        let mut rng = StdRng::seed_from_u64(5);
        let s = shape(RadialPolicy::UniformDisk);
        for _ in 0..500 {
            let p = message_point(&mut rng, &pool, &s.message);
            assert!(pool.points().iter().any(|q| q[0] == p.x && q[1] == p.y));
            assert!(p.z.abs() <= 0.3 + 1e-6);
        }
    }

    #[test]
    fn test_generate_is_parallel_and_seeded() {
        let pool = pool();
        let s = shape(RadialPolicy::UniformDisk);
        let a = generate(64, &s, &pool, &mut StdRng::seed_from_u64(9));
        let b = generate(64, &s, &pool, &mut StdRng::seed_from_u64(9));
        assert_eq!(a.len(), 64);
        assert_eq!(a.chaos.len(), 64);
        assert_eq!(a.message.len(), 64);
        assert_eq!(a, b);
    }
}
