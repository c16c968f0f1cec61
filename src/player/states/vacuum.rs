//! Vacuum: pull objects in, store or hold them, shoot them back out.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use glam::Vec3;
use hecs::Entity;

use crate::components::{
    AbsorbSize, Absorbable, Enemy, LayerMask, LocalTransform, Projectile, Stunned,
};
use crate::engine::input::{InputEvent, Subscription};
use crate::fsm::{EntryRefused, State};
use crate::systems::absorb;

use super::super::movement::{camera_relative, face_direction, move_towards, move_with_forces};
use super::super::{AbilityKind, PlayerContext};

/// Exponential follow rate for the held object.
const HOLD_FOLLOW_RATE: f32 = 10.0;
/// Upward tilt added to the forward direction when firing.
const FIRE_LIFT: f32 = 0.1;

/// Fixed-capacity store of absorbed objects, oldest first.
#[derive(Debug, Clone)]
pub struct Inventory {
    items: VecDeque<Entity>,
    capacity: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Store `entity`. Returns the oldest entry if it had to make room.
    pub fn push(&mut self, entity: Entity) -> Option<Entity> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(entity);
        evicted
    }

    /// Most recently stored entry.
    pub fn pop_newest(&mut self) -> Option<Entity> {
        self.items.pop_back()
    }

    pub fn remove(&mut self, entity: Entity) {
        self.items.retain(|e| *e != entity);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.items.iter()
    }

    pub fn drain(&mut self) -> Vec<Entity> {
        self.items.drain(..).collect()
    }
}

/// An object on its way in.
#[derive(Debug, Clone, Copy)]
struct Pull {
    entity: Entity,
    start_distance: f32,
}

pub struct VacuumState {
    absorbing: Vec<Pull>,
    inventory: Inventory,
    held: Option<Entity>,
    subscription: Option<Subscription>,
}

impl VacuumState {
    pub fn new(capacity: usize) -> Self {
        Self {
            absorbing: Vec::new(),
            inventory: Inventory::new(capacity),
            held: None,
            subscription: None,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn held(&self) -> Option<Entity> {
        self.held
    }

    pub fn absorbing_count(&self) -> usize {
        self.absorbing.len()
    }

    fn heading(ctx: &PlayerContext<'_>) -> Vec3 {
        ctx.body.flat_forward_or(ctx.camera.flat_forward())
    }

    fn mouth(ctx: &PlayerContext<'_>) -> Vec3 {
        ctx.controller.position() + Vec3::Y * ctx.config.vacuum.hold_height
    }

    fn hold_point(ctx: &PlayerContext<'_>) -> Vec3 {
        Self::mouth(ctx) + Self::heading(ctx) * ctx.config.vacuum.hold_distance
    }

    /// Start pulling any new candidates in the cone, up to the cap.
    fn detect(&mut self, ctx: &mut PlayerContext<'_>) {
        let vacuum = &ctx.config.vacuum;
        if self.absorbing.len() >= vacuum.max_simultaneous {
            return;
        }
        let mouth = Self::mouth(ctx);
        let heading = Self::heading(ctx);
        let half_angle = (vacuum.cone_angle * 0.5).to_radians();
        let center = mouth + heading * (vacuum.range * 0.5);

        let candidates = ctx.physics.overlap_sphere(
            ctx.world,
            center,
            vacuum.range * 0.5,
            LayerMask::ABSORBABLE | LayerMask::ENEMY,
        );
        for entity in candidates {
            if self.absorbing.len() >= vacuum.max_simultaneous {
                break;
            }
            if ctx.world.get::<&Projectile>(entity).is_ok() {
                continue;
            }
            let is_enemy = ctx.world.get::<&Enemy>(entity).is_ok();
            let claimed = ctx.world.get::<&Absorbable>(entity).map(|a| a.is_claimed());
            match claimed {
                Ok(true) => continue,
                Err(_) if !is_enemy => continue,
                // Stunned by something else (the whip).
                Err(_) if ctx.world.get::<&Stunned>(entity).is_ok() => continue,
                _ => {}
            }
            let Ok(position) = ctx.world.get::<&LocalTransform>(entity).map(|t| t.position) else {
                continue;
            };

            let to_object = position - mouth;
            let distance = to_object.length();
            if distance > vacuum.range {
                continue;
            }
            if distance > 1e-3 && heading.angle_between(to_object / distance) > half_angle {
                continue;
            }
            if ctx.physics.is_blocked(ctx.world, mouth, position, LayerMask::MASK_SOLID) {
                continue;
            }

            if is_enemy {
                absorb::prepare_enemy(ctx.world, entity, vacuum.enemy_projectile_damage);
            }
            if absorb::start_absorption(ctx.world, entity) {
                log::debug!("[vacuum] pulling {:?}", entity);
                self.absorbing.push(Pull {
                    entity,
                    start_distance: distance.max(1e-3),
                });
            }
        }
    }

    /// Move every pull toward the mouth and finish the ones that arrived.
    fn pull(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) {
        let vacuum = &ctx.config.vacuum;
        let mouth = Self::mouth(ctx);
        let mut arrived = Vec::new();

        self.absorbing.retain(|pull| {
            let Ok(absorbable) = ctx.world.get::<&Absorbable>(pull.entity).map(|a| *a) else {
                return false;
            };
            let Ok(mut transform) = ctx.world.get::<&mut LocalTransform>(pull.entity) else {
                return false;
            };
            let speed = vacuum.absorb_speed / absorbable.weight.max(0.1);
            transform.position = move_towards(transform.position, mouth, speed * dt);
            let distance = transform.position.distance(mouth);
            if absorbable.size == AbsorbSize::Small {
                let t = (distance / pull.start_distance).clamp(0.0, 1.0);
                transform.scale = absorbable.saved_scale * t;
            }
            if distance < vacuum.completion_threshold {
                arrived.push(pull.entity);
                return false;
            }
            true
        });

        for entity in arrived {
            self.complete(ctx, entity);
        }
    }

    fn complete(&mut self, ctx: &mut PlayerContext<'_>, entity: Entity) {
        absorb::complete_absorption(ctx.world, entity);
        let Ok(absorbable) = ctx.world.get::<&Absorbable>(entity).map(|a| *a) else {
            return;
        };
        match absorbable.size {
            AbsorbSize::Small | AbsorbSize::Medium => {
                if absorbable.size == AbsorbSize::Medium {
                    if let Ok(mut transform) = ctx.world.get::<&mut LocalTransform>(entity) {
                        transform.scale = absorbable.saved_scale * 0.5;
                    }
                }
                if let Some(evicted) = self.inventory.push(entity) {
                    log::debug!("[vacuum] inventory full, dropping {:?}", evicted);
                    let _ = ctx.world.despawn(evicted);
                }
                log::info!("[vacuum] stored {:?} ({}/{})", entity, self.inventory.len(), self.inventory.capacity());
            }
            AbsorbSize::Large => {
                if let Some(previous) = self.held.take() {
                    absorb::release(ctx.world, previous);
                }
                absorb::start_holding(ctx.world, entity);
                self.held = Some(entity);
                log::info!("[vacuum] holding {:?}", entity);
            }
        }
    }

    /// Keep stored and held objects attached to the moving player.
    fn carry(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) {
        let mouth = Self::mouth(ctx);
        let orbit_radius = ctx.config.vacuum.hold_distance;
        let slot_angle = TAU / self.inventory.capacity().max(1) as f32;

        let mut vanished = Vec::new();
        for (index, entity) in self.inventory.iter().enumerate() {
            let Ok(size) = ctx.world.get::<&Absorbable>(*entity).map(|a| a.size) else {
                vanished.push(*entity);
                continue;
            };
            let Ok(mut transform) = ctx.world.get::<&mut LocalTransform>(*entity) else {
                continue;
            };
            transform.position = match size {
                AbsorbSize::Medium => {
                    let angle = slot_angle * index as f32;
                    mouth + Vec3::new(angle.cos(), 0.0, angle.sin()) * orbit_radius
                }
                _ => mouth,
            };
        }

        for entity in vanished {
            log::warn!("[vacuum] stored {:?} vanished", entity);
            self.inventory.remove(entity);
        }

        if let Some(held) = self.held {
            let target = Self::hold_point(ctx);
            let rotation = ctx.body.rotation;
            let blend = 1.0 - (-HOLD_FOLLOW_RATE * dt).exp();
            match ctx.world.get::<&mut LocalTransform>(held) {
                Ok(mut transform) => {
                    transform.position = transform.position.lerp(target, blend);
                    transform.rotation = transform.rotation.slerp(rotation, blend);
                }
                Err(_) => self.held = None,
            }
        }
    }

    fn fire(&mut self, ctx: &mut PlayerContext<'_>) {
        let multiplier = ctx.config.vacuum.projectile_speed_multiplier;
        let direction = (Self::heading(ctx) + Vec3::Y * FIRE_LIFT).normalize();

        if let Some(held) = self.held.take() {
            absorb::convert_to_projectile(ctx.world, held, direction, multiplier);
            log::info!("[vacuum] launched held {:?}", held);
            return;
        }
        let Some(entity) = self.inventory.pop_newest() else {
            log::debug!("[vacuum] nothing to fire");
            return;
        };
        let muzzle = Self::hold_point(ctx);
        if let Ok(mut transform) = ctx.world.get::<&mut LocalTransform>(entity) {
            transform.position = muzzle;
        }
        absorb::convert_to_projectile(ctx.world, entity, direction, multiplier);
        log::info!("[vacuum] fired {:?}, {} left", entity, self.inventory.len());
    }

    fn release_all(&mut self, ctx: &mut PlayerContext<'_>) {
        for pull in self.absorbing.drain(..) {
            absorb::release(ctx.world, pull.entity);
        }
        if let Some(held) = self.held.take() {
            absorb::release(ctx.world, held);
        }
        let muzzle = Self::hold_point(ctx);
        for entity in self.inventory.drain() {
            if let Ok(mut transform) = ctx.world.get::<&mut LocalTransform>(entity) {
                transform.position = muzzle;
            }
            absorb::release(ctx.world, entity);
        }
    }
}

impl State for VacuumState {
    type Kind = AbilityKind;
    type Event = InputEvent;
    type Context<'a> = PlayerContext<'a>;

    fn kind(&self) -> AbilityKind {
        AbilityKind::Vacuum
    }

    fn enter(&mut self, ctx: &mut PlayerContext<'_>) -> Result<(), EntryRefused> {
        self.subscription = Some(ctx.bus.subscribe(&[InputEvent::Jump]));
        log::debug!("[vacuum] on");
        Ok(())
    }

    fn tick(&mut self, ctx: &mut PlayerContext<'_>, dt: f32) -> Option<AbilityKind> {
        if !ctx.input.vacuum {
            return Some(AbilityKind::FreeLook);
        }
        let config = ctx.config;

        self.detect(ctx);
        self.pull(ctx, dt);

        let mut speed = config.movement.speed;
        if self.held.is_some() {
            speed *= config.vacuum.large_move_multiplier;
        }
        let velocity = camera_relative(ctx.camera, ctx.input.move_vector) * speed;
        move_with_forces(ctx, velocity, dt);
        face_direction(ctx.body, velocity, config.movement.rotation_speed, dt);

        self.carry(ctx, dt);
        None
    }

    fn exit(&mut self, ctx: &mut PlayerContext<'_>) {
        self.release_all(ctx);
        self.subscription = None;
        log::debug!("[vacuum] off");
    }

    fn on_event(&mut self, ctx: &mut PlayerContext<'_>, event: &InputEvent) -> Option<AbilityKind> {
        if *event == InputEvent::Jump {
            self.fire(ctx);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Hidden, ProjectileKind, Velocity};
    use crate::scene::prefabs::{spawn_absorbable, spawn_enemy, spawn_static_box};
    use crate::systems::CharacterController;
    use crate::testing::Rig;

    fn vacuum_rig() -> Rig {
        let mut rig = Rig::new();
        rig.input.vacuum = true;
        rig
    }

    fn run(rig: &mut Rig, state: &mut VacuumState, steps: usize) {
        let mut ctx = rig.ctx();
        for _ in 0..steps {
            assert_eq!(state.tick(&mut ctx, 1.0 / 60.0), None);
        }
    }

    #[test]
    fn inventory_evicts_oldest() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let c = world.spawn(());
        let mut inventory = Inventory::new(2);
        assert_eq!(inventory.push(a), None);
        assert_eq!(inventory.push(b), None);
        assert_eq!(inventory.push(c), Some(a));
        assert_eq!(inventory.pop_newest(), Some(c));
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn small_object_is_pulled_in_and_stored() {
        let mut rig = vacuum_rig();
        let prop = spawn_absorbable(&mut rig.world, Vec3::new(0.0, 1.0, -3.0), AbsorbSize::Small, 1.0);
        let mut state = VacuumState::new(5);
        state.enter(&mut rig.ctx()).unwrap();

        run(&mut rig, &mut state, 2);
        assert_eq!(state.absorbing_count(), 1);
        let scale = rig.world.get::<&LocalTransform>(prop).unwrap().scale;
        assert!(scale.x < 1.0 && scale.x > 0.0);

        run(&mut rig, &mut state, 40);
        assert_eq!(state.absorbing_count(), 0);
        assert_eq!(state.inventory().len(), 1);
        assert!(rig.world.get::<&Hidden>(prop).is_ok());
    }

    #[test]
    fn heavy_objects_come_in_slower() {
        let mut rig = vacuum_rig();
        let light = spawn_absorbable(&mut rig.world, Vec3::new(-0.5, 1.0, -3.0), AbsorbSize::Medium, 1.0);
        let heavy = spawn_absorbable(&mut rig.world, Vec3::new(0.5, 1.0, -3.0), AbsorbSize::Medium, 4.0);
        let mut state = VacuumState::new(5);
        state.enter(&mut rig.ctx()).unwrap();
        run(&mut rig, &mut state, 5);
        let mouth = Vec3::new(0.0, 1.5, 0.0);
        let light_d = rig.world.get::<&LocalTransform>(light).unwrap().position.distance(mouth);
        let heavy_d = rig.world.get::<&LocalTransform>(heavy).unwrap().position.distance(mouth);
        assert!(light_d < heavy_d);
    }

    #[test]
    fn out_of_cone_or_behind_walls_is_ignored() {
        let mut rig = vacuum_rig();
        spawn_absorbable(&mut rig.world, Vec3::new(0.0, 1.0, 3.0), AbsorbSize::Small, 1.0);
        spawn_absorbable(&mut rig.world, Vec3::new(3.0, 1.5, -1.0), AbsorbSize::Small, 1.0);
        spawn_absorbable(&mut rig.world, Vec3::new(0.0, 1.5, -5.0), AbsorbSize::Small, 1.0);
        spawn_static_box(&mut rig.world, Vec3::new(0.0, 1.5, -3.0), Vec3::new(2.0, 2.0, 0.2));
        let mut state = VacuumState::new(5);
        state.enter(&mut rig.ctx()).unwrap();
        run(&mut rig, &mut state, 3);
        assert_eq!(state.absorbing_count(), 0);
    }

    #[test]
    fn simultaneous_pulls_are_capped() {
        let mut rig = vacuum_rig();
        for x in [-0.6, -0.3, 0.0, 0.3, 0.6] {
            spawn_absorbable(&mut rig.world, Vec3::new(x, 1.5, -4.0), AbsorbSize::Small, 1.0);
        }
        let mut state = VacuumState::new(5);
        state.enter(&mut rig.ctx()).unwrap();
        run(&mut rig, &mut state, 1);
        assert_eq!(state.absorbing_count(), 3);
    }

    #[test]
    fn mediums_orbit_and_fire_newest_first() {
        let mut rig = vacuum_rig();
        let props: Vec<Entity> = [-0.5, 0.0, 0.5]
            .iter()
            .map(|x| spawn_absorbable(&mut rig.world, Vec3::new(*x, 1.5, -2.5), AbsorbSize::Medium, 1.0))
            .collect();
        let mut state = VacuumState::new(5);
        state.enter(&mut rig.ctx()).unwrap();
        run(&mut rig, &mut state, 60);
        assert_eq!(state.inventory().len(), 3);

        let mouth = Vec3::new(0.0, 1.5, 0.0);
        for prop in &props {
            let transform = *rig.world.get::<&LocalTransform>(*prop).unwrap();
            assert!((transform.position.distance(mouth) - 2.0).abs() < 1e-4);
            assert_eq!(transform.scale, Vec3::splat(0.5));
        }

        let newest = *state.inventory().iter().last().unwrap();
        state.on_event(&mut rig.ctx(), &InputEvent::Jump);
        assert_eq!(state.inventory().len(), 2);
        let projectile = *rig.world.get::<&Projectile>(newest).unwrap();
        assert_eq!(projectile.kind, ProjectileKind::Vacuum);
        let velocity = rig.world.get::<&Velocity>(newest).unwrap().0;
        assert!(velocity.z < -19.0, "{:?}", velocity);
        assert!(velocity.y > 0.0);
    }

    #[test]
    fn large_replaces_large_and_slows_the_player() {
        let mut rig = vacuum_rig();
        let first = spawn_absorbable(&mut rig.world, Vec3::new(0.0, 1.5, -2.5), AbsorbSize::Large, 1.0);
        let mut state = VacuumState::new(5);
        state.enter(&mut rig.ctx()).unwrap();
        run(&mut rig, &mut state, 40);
        assert_eq!(state.held(), Some(first));

        let second = spawn_absorbable(&mut rig.world, Vec3::new(0.0, 1.5, -4.5), AbsorbSize::Large, 1.0);
        for _ in 0..60 {
            run(&mut rig, &mut state, 1);
            if state.held() == Some(second) {
                break;
            }
        }
        assert_eq!(state.held(), Some(second));
        // Released, not destroyed. It is back in the cone and free to be pulled again.
        assert!(!rig.world.get::<&Absorbable>(first).unwrap().is_claimed());

        rig.input.move_vector = glam::Vec2::Y;
        let before = rig.controller.position();
        run(&mut rig, &mut state, 1);
        let moved = rig.controller.position().distance(before);
        assert!((moved - 6.0 * 0.6 / 60.0).abs() < 1e-3, "moved {}", moved);
    }

    #[test]
    fn full_inventory_destroys_the_oldest() {
        let mut rig = vacuum_rig();
        let first = spawn_absorbable(&mut rig.world, Vec3::new(0.0, 1.5, -2.0), AbsorbSize::Small, 1.0);
        let mut state = VacuumState::new(1);
        state.enter(&mut rig.ctx()).unwrap();
        run(&mut rig, &mut state, 30);
        assert_eq!(state.inventory().len(), 1);

        let second = spawn_absorbable(&mut rig.world, Vec3::new(0.0, 1.5, -2.0), AbsorbSize::Small, 1.0);
        run(&mut rig, &mut state, 30);
        assert_eq!(state.inventory().iter().copied().collect::<Vec<_>>(), vec![second]);
        assert!(!rig.world.contains(first));
    }

    #[test]
    fn enemies_are_stunned_and_released_on_exit() {
        let mut rig = vacuum_rig();
        let enemy = spawn_enemy(&mut rig.world, Vec3::new(0.0, 1.0, -3.0), 20.0);
        let mut state = VacuumState::new(5);
        {
            let mut ctx = rig.ctx();
            state.enter(&mut ctx).unwrap();
            state.tick(&mut ctx, 1.0 / 60.0);
        }
        let absorbable = *rig.world.get::<&Absorbable>(enemy).unwrap();
        assert_eq!(absorbable.size, AbsorbSize::Medium);
        assert_eq!(absorbable.projectile_damage, 30.0);
        assert!(rig.world.get::<&Stunned>(enemy).is_ok());

        rig.input.vacuum = false;
        {
            let mut ctx = rig.ctx();
            assert_eq!(state.tick(&mut ctx, 1.0 / 60.0), Some(AbilityKind::FreeLook));
            state.exit(&mut ctx);
        }
        assert!(rig.world.get::<&Stunned>(enemy).is_err());
        assert!(!rig.world.get::<&Absorbable>(enemy).unwrap().is_claimed());
        assert_eq!(rig.bus.subscriber_count(), 0);
    }
}
