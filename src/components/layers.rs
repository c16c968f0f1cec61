//! Layer masks for query filtering.
//!
//! Every collider may carry a [`Layer`]. Overlap and ray queries take a
//! [`LayerMask`] and only report entities whose layer intersects it.
//! Entities without a `Layer` component are on [`LayerMask::DEFAULT`].

/// Bit set of collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);

    /// Plain world geometry.
    pub const DEFAULT: Self = Self(1 << 0);

    /// Walkable ground.
    pub const GROUND: Self = Self(1 << 1);

    pub const ENEMY: Self = Self(1 << 2);

    /// Objects the vacuum can pull in.
    pub const ABSORBABLE: Self = Self(1 << 3);

    /// Grapple anchors.
    pub const GRAPPLE: Self = Self(1 << 4);

    /// Ink patches the player can traverse.
    pub const INK: Self = Self(1 << 5);

    /// Surfaces the aim reticle and ink shots can land on.
    pub const AIM_TARGET: Self = Self(1 << 6);

    pub const PLAYER: Self = Self(1 << 7);

    pub const ALL: Self = Self(u32::MAX);

    /// Everything that blocks line of sight.
    pub const MASK_SOLID: Self = Self(
        Self::DEFAULT.0 | Self::GROUND.0 | Self::AIM_TARGET.0,
    );

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for LayerMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Layer membership of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer(pub LayerMask);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_combine_and_filter() {
        let mask = LayerMask::GROUND | LayerMask::INK;
        assert!(mask.contains(LayerMask::INK));
        assert!(mask.intersects(LayerMask::INK | LayerMask::ENEMY));
        assert!(!mask.intersects(LayerMask::ENEMY));
        assert_eq!(mask.difference(LayerMask::GROUND), LayerMask::INK);
        assert!(LayerMask::ALL.contains(LayerMask::PLAYER));
        assert!(LayerMask::MASK_SOLID.intersects(LayerMask::DEFAULT));
    }
}
