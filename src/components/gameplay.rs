use glam::Vec3;

// ---------------------------------------------------------------------------
// Level content
// ---------------------------------------------------------------------------

/// Fixed anchor the player can swing from. Owned by the level; the player
/// only reads it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrapplePoint {
    pub active: bool,
}

/// Marker: entity is an enemy (whip target, vacuum candidate).
pub struct Enemy;

/// Marker: entity's own behaviour is suspended (captured by the whip or the vacuum).
pub struct Stunned;

/// Marker: entity is destroyed outright by any projectile hit.
pub struct Destructible;

/// Paintable ink patch. `normal` is the surface normal it was painted on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkSurface {
    pub normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    pub invulnerable: bool,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            invulnerable: false,
        }
    }

    /// Apply `amount` damage. Returns `true` if this hit was lethal.
    pub fn deal_damage(&mut self, amount: f32) -> bool {
        if self.invulnerable || self.is_dead() {
            return false;
        }
        self.current = (self.current - amount).max(0.0);
        self.is_dead()
    }

    pub fn heal(&mut self, amount: f32) {
        if self.is_dead() {
            return;
        }
        self.current = (self.current + amount).min(self.max);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }
}

// ---------------------------------------------------------------------------
// Absorption
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsorbSize {
    /// Stored, shrinks while travelling.
    Small,
    /// Stored and shown orbiting the player.
    Medium,
    /// Held in front of the player, one at a time.
    Large,
}

/// An object the vacuum can pull in.
///
/// The three flags track who owns the object: while any is set the vacuum
/// state drives it; once all are clear it belongs to the world again. The
/// `saved_*` fields hold what absorption overrode so release can restore it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Absorbable {
    pub size: AbsorbSize,
    pub weight: f32,
    pub can_be_projectile: bool,
    pub projectile_damage: f32,
    pub projectile_speed: f32,

    pub being_absorbed: bool,
    pub absorbed: bool,
    pub being_held: bool,

    pub saved_scale: Vec3,
    pub saved_kinematic: bool,
    pub saved_gravity: bool,
}

impl Absorbable {
    pub fn new(size: AbsorbSize, weight: f32) -> Self {
        Self {
            size,
            weight,
            can_be_projectile: true,
            projectile_damage: 10.0,
            projectile_speed: 20.0,
            being_absorbed: false,
            absorbed: false,
            being_held: false,
            saved_scale: Vec3::ONE,
            saved_kinematic: false,
            saved_gravity: true,
        }
    }

    pub fn with_damage(mut self, damage: f32) -> Self {
        self.projectile_damage = damage;
        self
    }

    /// True while the vacuum owns this object.
    pub fn is_claimed(&self) -> bool {
        self.being_absorbed || self.absorbed || self.being_held
    }
}

// ---------------------------------------------------------------------------
// Projectiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileKind {
    /// Fired by the aim state; paints ink where it lands.
    Ink,
    /// A stored or held object shot back out by the vacuum.
    Vacuum,
}

pub const PROJECTILE_LIFETIME: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub damage: f32,
    /// Seconds until the projectile expires on its own.
    pub lifetime: f32,
}

impl Projectile {
    pub fn new(kind: ProjectileKind, damage: f32) -> Self {
        Self {
            kind,
            damage,
            lifetime: PROJECTILE_LIFETIME,
        }
    }
}
