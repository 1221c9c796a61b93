/// A point or direction in model space.
pub type Vec3 = [f64; 3];

pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn length(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

pub fn distance(a: Vec3, b: Vec3) -> f64 {
    length(sub(a, b))
}

/// Unit vector in the direction of `a`, or `None` for (near) zero vectors
pub fn normalize(a: Vec3) -> Option<Vec3> {
    let len = length(a);
    if len > 1e-12 && len.is_finite() {
        Some(scale(a, 1.0 / len))
    } else {
        None
    }
}

pub fn lerp(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    add(a, scale(sub(b, a), t))
}

/// Angle between two vectors in radians, in `[0, π]`
pub fn angle_between(a: Vec3, b: Vec3) -> f64 {
    match (normalize(a), normalize(b)) {
        (Some(a), Some(b)) => dot(a, b).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    }
}

/// Closest point to `p` on the segment `a..b`
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = sub(b, a);
    let len_sq = dot(ab, ab);
    if len_sq <= f64::EPSILON {
        return a;
    }
    let t = (dot(sub(p, a), ab) / len_sq).clamp(0.0, 1.0);
    add(a, scale(ab, t))
}

pub fn is_finite(a: Vec3) -> bool {
    a.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_follows_right_hand_rule() {
        let z = cross([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(z, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_normalize_zero() {
        assert!(normalize([0.0, 0.0, 0.0]).is_none());
        let n = normalize([3.0, 0.0, 4.0]).unwrap();
        assert!((length(n) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_angle_between() {
        let a = angle_between([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!((a - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(angle_between([1.0, 0.0, 0.0], [2.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_closest_point_on_segment_clamps() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        assert_eq!(closest_point_on_segment([0.5, 1.0, 0.0], a, b), [0.5, 0.0, 0.0]);
        assert_eq!(closest_point_on_segment([-2.0, 1.0, 0.0], a, b), a);
        assert_eq!(closest_point_on_segment([3.0, 0.0, 1.0], a, b), b);
    }
}
