//! Scripted input timelines for the headless demo.

use clap::ValueEnum;
use glam::{Vec2, Vec3};
use hecs::World;

use crate::camera::{Camera, CameraMode};
use crate::config::AbilityConfig;
use crate::engine::input::{InputEvent, InputState};
use crate::engine::time::StepClock;
use crate::player::{AbilityKind, Player, PlayerEnv, PlayerError};
use crate::scene::arena::{load_arena, Arena};
use crate::systems::{physics_step, projectile_system, ProjectileOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Walk, jump, hover, look around.
    Arena,
    /// Grapple the anchor, pump the swing, let go.
    Swing,
    /// Pull props in and shoot two back out.
    Vacuum,
    /// Catch the enemy, wind up the spin, throw.
    Whip,
    /// Paint the floor ahead, then dive into the ink strip.
    Aim,
}

impl Scenario {
    pub fn spawn(self, arena: &Arena) -> Vec3 {
        match self {
            Scenario::Arena | Scenario::Swing => arena.swing_spawn,
            Scenario::Vacuum => arena.vacuum_spawn,
            Scenario::Whip => arena.whip_spawn,
            Scenario::Aim => arena.aim_spawn,
        }
    }

    /// Set this step's holds and edges. `t` is the time at the start of the
    /// step; an edge at `mark` fires on the step whose interval contains it.
    pub fn drive(self, t: f32, dt: f32, input: &mut InputState, camera: &mut Camera) {
        let during = |from: f32, to: f32| t >= from && t < to;
        let at = |mark: f32| t <= mark && mark < t + dt;

        input.move_vector = Vec2::ZERO;
        input.look_vector = Vec2::ZERO;
        input.aim = false;
        input.hover = false;
        input.green = false;
        input.vacuum = false;
        input.fire = false;

        match self {
            Scenario::Arena => {
                if during(0.5, 1.5) {
                    input.move_vector = Vec2::Y;
                }
                if at(1.0) {
                    input.events.push(InputEvent::Jump);
                }
                if during(1.5, 2.5) {
                    input.move_vector = Vec2::X;
                }
                input.hover = during(2.5, 3.2);
                if during(3.5, 4.0) {
                    input.look_vector = Vec2::new(30.0, 0.0);
                }
            }
            Scenario::Swing => {
                input.green = during(0.5, 3.5);
                if during(1.0, 3.0) {
                    input.move_vector = Vec2::Y;
                }
            }
            Scenario::Vacuum => {
                input.vacuum = during(0.5, 4.0);
                if at(2.5) || at(3.0) {
                    input.events.push(InputEvent::Jump);
                }
            }
            Scenario::Whip => {
                input.green = during(0.5, 3.5);
                if during(1.5, 3.0) {
                    input.move_vector = Vec2::X;
                }
                if at(3.0) {
                    input.events.push(InputEvent::Jump);
                }
            }
            Scenario::Aim => {
                if at(0.0) {
                    camera.pitch = -15.0;
                }
                input.aim = during(0.5, 2.0);
                input.fire = during(1.0, 1.5);
                if at(2.2) {
                    input.events.push(InputEvent::Dive);
                }
                if during(2.2, 3.2) {
                    input.move_vector = Vec2::Y;
                }
            }
        }
    }
}

/// What happened during a scenario run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// (time, ability) every time the active ability changed.
    pub timeline: Vec<(f32, AbilityKind)>,
    pub outcomes: Vec<ProjectileOutcome>,
    pub final_position: Vec3,
}

impl Report {
    pub fn visited(&self, kind: AbilityKind) -> bool {
        self.timeline.iter().any(|(_, k)| *k == kind)
    }
}

/// Run `scenario` for `steps` fixed steps of `dt` against a fresh arena.
pub fn run(scenario: Scenario, config: AbilityConfig, steps: u32, dt: f32) -> Result<Report, PlayerError> {
    let mut world = World::new();
    let arena = load_arena(&mut world);
    let mut camera = Camera::new();
    let mut input = InputState::new();
    let mut clock = StepClock::new(dt);
    let mut player = Player::new(config, scenario.spawn(&arena))?;
    camera.follow(player.position(), CameraMode::FreeLook);

    player.start(PlayerEnv {
        world: &mut world,
        input: &input,
        camera: &camera,
        time: clock.elapsed,
    })?;

    let mut report = Report::default();
    report.timeline.push((0.0, player.ability_kind()));

    for _ in 0..steps {
        scenario.drive(clock.elapsed, dt, &mut input, &mut camera);
        camera.apply_input(&input);
        player.tick(
            PlayerEnv {
                world: &mut world,
                input: &input,
                camera: &camera,
                time: clock.elapsed,
            },
            dt,
        )?;

        let events = physics_step(&mut world, dt);
        for outcome in projectile_system(&mut world, &events, dt) {
            log::debug!("[scenario] {:?}", outcome);
            report.outcomes.push(outcome);
        }

        let kind = player.ability_kind();
        camera.follow(player.position(), CameraMode::for_ability(kind));
        if report.timeline.last().map(|(_, k)| *k) != Some(kind) {
            log::info!("[scenario] t={:.2}s -> {:?}", clock.elapsed, kind);
            report.timeline.push((clock.elapsed, kind));
        }

        input.clear_events();
        clock.tick();
    }

    player.shutdown(PlayerEnv {
        world: &mut world,
        input: &input,
        camera: &camera,
        time: clock.elapsed,
    });
    report.final_position = player.position();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::PHYSICS_DT;

    fn run_default(scenario: Scenario) -> Report {
        run(scenario, AbilityConfig::default(), 300, PHYSICS_DT).unwrap()
    }

    #[test]
    fn edges_fire_exactly_once() {
        let mut input = InputState::new();
        let mut camera = Camera::new();
        let mut clock = StepClock::new(PHYSICS_DT);
        let mut fired = 0;
        for _ in 0..300 {
            Scenario::Arena.drive(clock.elapsed, PHYSICS_DT, &mut input, &mut camera);
            fired += input.events.len();
            input.clear_events();
            clock.tick();
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn arena_scenario_turns_the_camera() {
        let mut input = InputState::new();
        let mut camera = Camera::new();
        let mut clock = StepClock::new(PHYSICS_DT);
        for _ in 0..300 {
            Scenario::Arena.drive(clock.elapsed, PHYSICS_DT, &mut input, &mut camera);
            camera.apply_input(&input);
            clock.tick();
        }
        assert!((camera.yaw - (-90.0 + 90.0)).abs() < 4.0, "yaw {}", camera.yaw);
    }

    #[test]
    fn swing_scenario_grapples_and_lands_back_in_free_look() {
        let report = run_default(Scenario::Swing);
        assert!(report.visited(AbilityKind::Grapple), "{:?}", report.timeline);
        assert_eq!(report.timeline.last().unwrap().1, AbilityKind::FreeLook);
    }

    #[test]
    fn whip_scenario_catches_and_throws() {
        let report = run_default(Scenario::Whip);
        assert!(report.visited(AbilityKind::Whip), "{:?}", report.timeline);
        assert_eq!(report.timeline.last().unwrap().1, AbilityKind::FreeLook);
    }

    #[test]
    fn vacuum_scenario_enters_and_leaves() {
        let report = run_default(Scenario::Vacuum);
        assert!(report.visited(AbilityKind::Vacuum));
        assert_eq!(report.timeline.last().unwrap().1, AbilityKind::FreeLook);
    }

    #[test]
    fn arena_scenario_hovers() {
        let report = run_default(Scenario::Arena);
        assert!(report.visited(AbilityKind::Hover));
        assert!(report.final_position.is_finite());
    }

    #[test]
    fn aim_scenario_paints() {
        let report = run_default(Scenario::Aim);
        assert!(report.visited(AbilityKind::Aim));
        assert!(
            report
                .outcomes
                .iter()
                .any(|o| matches!(o, ProjectileOutcome::Painted { .. })),
            "{:?}",
            report.outcomes
        );
    }
}
