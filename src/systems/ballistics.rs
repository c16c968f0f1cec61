use glam::Vec3;

/// Launch velocity that carries a projectile from `origin` to `target` in
/// exactly `flight_time` seconds under constant vertical acceleration
/// `gravity` (negative for downward) with no drag.
///
/// Horizontal speed covers the horizontal offset uniformly; the vertical
/// component compensates for the fall. There is always a solution; callers
/// keep `flight_time` away from zero.
pub fn solve_ballistic_velocity(origin: Vec3, target: Vec3, flight_time: f32, gravity: f32) -> Vec3 {
    let delta = target - origin;
    let horizontal = Vec3::new(delta.x, 0.0, delta.z) / flight_time;
    let vertical = (delta.y - 0.5 * gravity * flight_time * flight_time) / flight_time;
    horizontal + Vec3::Y * vertical
}

/// Position after `t` seconds of drag-free flight.
pub fn ballistic_position(origin: Vec3, velocity: Vec3, gravity: f32, t: f32) -> Vec3 {
    origin + velocity * t + Vec3::Y * (0.5 * gravity * t * t)
}
