//! Gameplay tags for physics bodies
//!
//! The physics world owns kinematics; everything the game needs to know about
//! a body (category, special kind, lifecycle state, colours, boulder damage)
//! lives in a `BodyTag` keyed by `BodyId` in the `BodyRegistry`.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::{OutlineStyle, ShapeArchetype};
use crate::physics::{BodyId, Material};
use crate::presentation::SoundCue;

/// Packed 0xRRGGBB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u32);

impl Rgb {
    pub fn channels(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xff) as u8,
            ((self.0 >> 8) & 0xff) as u8,
            (self.0 & 0xff) as u8,
        )
    }

    pub fn from_channels(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Scale every channel by `(100 - percent) / 100`, rounding down
    pub fn darken(&self, percent: u8) -> Self {
        let keep = 100 - percent.min(100) as u32;
        let (r, g, b) = self.channels();
        let scale = |c: u8| (c as u32 * keep / 100) as u8;
        Self::from_channels(scale(r), scale(g), scale(b))
    }

    /// CSS hex notation
    pub fn to_css(&self) -> String {
        format!("#{:06x}", self.0)
    }
}

/// Stone palette
pub const STONE_COLORS: [Rgb; 5] = [
    Rgb(0x7f8c8d),
    Rgb(0x95a5a6),
    Rgb(0xbdc3c7),
    Rgb(0x34495e),
    Rgb(0x7f8c8d),
];

/// Outline drawn around bridged bodies
pub const BRIDGE_HIGHLIGHT: Rgb = Rgb(0xffd700);

/// Stone size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Large,
    Medium,
    Small,
}

impl Category {
    /// Inclusive pixel size band
    pub fn size_range(&self) -> (f32, f32) {
        match self {
            Category::Large => (45.0, 60.0),
            Category::Medium => (25.0, 35.0),
            Category::Small => (10.0, 15.0),
        }
    }

    /// Jitter amount relative to size
    pub fn irregularity_factor(&self) -> f32 {
        match self {
            Category::Small => 0.10,
            _ => 0.15,
        }
    }

    pub fn break_score(&self) -> u64 {
        match self {
            Category::Large => 10,
            Category::Medium => 20,
            Category::Small => 30,
        }
    }

    pub fn break_shards(&self) -> u64 {
        match self {
            Category::Large => 3,
            Category::Medium => 2,
            Category::Small => 1,
        }
    }

    /// Category and count of the children a break produces
    pub fn fragments(&self) -> Option<(Category, u32)> {
        match self {
            Category::Large => Some((Category::Medium, 3)),
            Category::Medium => Some((Category::Small, 2)),
            Category::Small => None,
        }
    }

    pub fn material(&self) -> Material {
        Material {
            density: 1.0,
            friction: 0.01,
            restitution: 0.4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Large => "large",
            Category::Medium => "medium",
            Category::Small => "small",
        }
    }
}

/// Thematic stone variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialKind {
    Hanuman,
    Vanar,
    Rama,
    Nal,
}

/// Reward and physics modifiers of a special kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialTraits {
    pub score_multiplier: u64,
    /// Extra children on top of the category fan-out
    pub bonus_children: u32,
    /// Completion bins a bridged body of this kind covers
    pub bridge_cells: u32,
    pub density_factor: f32,
    pub restitution: f32,
    pub tint: Rgb,
}

impl SpecialKind {
    pub fn traits(&self) -> SpecialTraits {
        match self {
            SpecialKind::Hanuman => SpecialTraits {
                score_multiplier: 3,
                bonus_children: 1,
                bridge_cells: 1,
                density_factor: 1.5,
                restitution: 0.3,
                tint: Rgb(0xff9933),
            },
            SpecialKind::Vanar => SpecialTraits {
                score_multiplier: 2,
                bonus_children: 0,
                bridge_cells: 1,
                density_factor: 1.0,
                restitution: 0.4,
                tint: Rgb(0x8b5a2b),
            },
            SpecialKind::Rama => SpecialTraits {
                score_multiplier: 5,
                bonus_children: 0,
                bridge_cells: 2,
                density_factor: 1.2,
                restitution: 0.35,
                tint: Rgb(0x1e90ff),
            },
            SpecialKind::Nal => SpecialTraits {
                score_multiplier: 2,
                bonus_children: 0,
                bridge_cells: 3,
                density_factor: 0.8,
                restitution: 0.3,
                tint: Rgb(0xc2b280),
            },
        }
    }
}

/// Multi-hit boulder variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoulderKind {
    Mountain,
    Ravana,
    Celestial,
}

/// Static description of a boulder kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoulderTraits {
    pub name: &'static str,
    /// Inclusive hit-point range
    pub hits: (u32, u32),
    pub size: (f32, f32),
    pub density: f32,
    pub restitution: f32,
    pub score: u64,
    pub shards: u64,
    /// Chance of this kind when the spawner rolls for a boulder
    pub spawn_chance: f64,
    pub outline: OutlineStyle,
    /// Special kind the released stones may carry, and its chance
    pub special_roll: (SpecialKind, f64),
    pub color: Rgb,
    pub break_cue: SoundCue,
}

impl BoulderKind {
    pub const ALL: [BoulderKind; 3] = [
        BoulderKind::Mountain,
        BoulderKind::Ravana,
        BoulderKind::Celestial,
    ];

    pub fn traits(&self) -> BoulderTraits {
        match self {
            BoulderKind::Mountain => BoulderTraits {
                name: "Mountain Boulder",
                hits: (5, 8),
                size: (70.0, 90.0),
                density: 10.0,
                restitution: 0.3,
                score: 80,
                shards: 15,
                spawn_chance: 0.10,
                outline: OutlineStyle::Irregular,
                special_roll: (SpecialKind::Vanar, 0.4),
                color: Rgb(0x8b4513),
                break_cue: SoundCue::BoulderBreak,
            },
            BoulderKind::Ravana => BoulderTraits {
                name: "Ravana's Rock",
                hits: (8, 12),
                size: (85.0, 110.0),
                density: 15.0,
                restitution: 0.2,
                score: 150,
                shards: 25,
                spawn_chance: 0.05,
                outline: OutlineStyle::Angular,
                special_roll: (SpecialKind::Hanuman, 0.3),
                color: Rgb(0x800000),
                break_cue: SoundCue::DemonicRoar,
            },
            BoulderKind::Celestial => BoulderTraits {
                name: "Celestial Stone",
                hits: (10, 15),
                size: (75.0, 95.0),
                density: 12.0,
                restitution: 0.4,
                score: 200,
                shards: 40,
                spawn_chance: 0.03,
                outline: OutlineStyle::Symmetrical,
                special_roll: (SpecialKind::Rama, 0.4),
                color: Rgb(0xffd700),
                break_cue: SoundCue::DivineBreak,
            },
        }
    }

    /// Pick a kind from a uniform roll in [0, 1) using cumulative spawn chances
    pub fn from_roll(roll: f64) -> Option<Self> {
        let mut cumulative = 0.0;
        for kind in Self::ALL {
            cumulative += kind.traits().spawn_chance;
            if roll < cumulative {
                return Some(kind);
            }
        }
        None
    }
}

/// Lifecycle state of a tagged body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyState {
    Floating,
    InWater,
    PartOfBridge,
    Broken,
    Removed,
}

impl BodyState {
    /// Allowed lifecycle edges
    pub fn can_become(&self, next: BodyState) -> bool {
        use BodyState::*;
        matches!(
            (*self, next),
            (Floating, InWater)
                | (InWater, PartOfBridge)
                | (Floating | InWater, Broken | Removed)
                | (PartOfBridge, Removed)
        )
    }

    /// Still a live, unbridged body
    pub fn is_free(&self) -> bool {
        matches!(self, BodyState::Floating | BodyState::InWater)
    }
}

/// Damage bookkeeping of a boulder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoulderRecord {
    pub kind: BoulderKind,
    pub max_hit_points: u32,
    pub damage: u32,
    /// Crack markers recorded at 1/3 and 2/3 damage
    pub cracks: u8,
}

impl BoulderRecord {
    pub fn new(kind: BoulderKind, max_hit_points: u32) -> Self {
        Self {
            kind,
            max_hit_points: max_hit_points.max(1),
            damage: 0,
            cracks: 0,
        }
    }

    /// Remaining health in [0, 1]
    pub fn health_fraction(&self) -> f32 {
        let left = self.max_hit_points.saturating_sub(self.damage);
        left as f32 / self.max_hit_points as f32
    }

    /// Damage at which crack `k` (1 or 2) appears
    pub fn crack_threshold(&self, k: u32) -> u32 {
        (self.max_hit_points * k).div_ceil(3)
    }

    /// Add damage, returning how many new cracks appeared
    pub fn apply_damage(&mut self, damage: u32) -> u8 {
        let before = self.damage;
        self.damage = self.damage.saturating_add(damage);
        let mut new_cracks = 0;
        for k in 1..=2u32 {
            let threshold = self.crack_threshold(k);
            if before < threshold && self.damage >= threshold && self.cracks < k as u8 {
                self.cracks += 1;
                new_cracks += 1;
            }
        }
        new_cracks
    }

    pub fn is_destroyed(&self) -> bool {
        self.damage >= self.max_hit_points
    }
}

/// Stone or boulder payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyKind {
    Stone {
        category: Category,
        archetype: ShapeArchetype,
    },
    Boulder(BoulderRecord),
}

/// Gameplay record for one physics body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyTag {
    pub id: BodyId,
    pub kind: BodyKind,
    pub special: Option<SpecialKind>,
    pub state: BodyState,
    /// Spawned by a break: falls under gravity and never auto-breaks
    pub fragment: bool,
    /// Nominal pixel size
    pub size: f32,
    /// Body-local outline; empty when the body fell back to a circle
    pub outline: Vec<Vec2>,
    pub color: Rgb,
    /// Colour before the body got wet
    pub original_color: Option<Rgb>,
    /// Bridge highlight stroke
    pub highlight: Option<Rgb>,
}

impl BodyTag {
    pub fn category(&self) -> Option<Category> {
        match &self.kind {
            BodyKind::Stone { category, .. } => Some(*category),
            BodyKind::Boulder(_) => None,
        }
    }

    pub fn archetype(&self) -> Option<ShapeArchetype> {
        match &self.kind {
            BodyKind::Stone { archetype, .. } => Some(*archetype),
            BodyKind::Boulder(_) => None,
        }
    }

    pub fn is_boulder(&self) -> bool {
        matches!(self.kind, BodyKind::Boulder(_))
    }

    pub fn boulder(&self) -> Option<&BoulderRecord> {
        match &self.kind {
            BodyKind::Boulder(record) => Some(record),
            BodyKind::Stone { .. } => None,
        }
    }

    pub fn boulder_mut(&mut self) -> Option<&mut BoulderRecord> {
        match &mut self.kind {
            BodyKind::Boulder(record) => Some(record),
            BodyKind::Stone { .. } => None,
        }
    }

    /// Completion bins this body covers once bridged
    pub fn bridge_cells(&self) -> u32 {
        self.special.map_or(1, |s| s.traits().bridge_cells)
    }

    /// Move along a lifecycle edge; refuses anything else
    pub fn transition(&mut self, next: BodyState) -> bool {
        if self.state.can_become(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Darken once, caching the dry colour
    pub fn wet(&mut self, percent: u8) {
        if self.original_color.is_none() {
            self.original_color = Some(self.color);
            self.color = self.color.darken(percent);
        }
    }

    /// Restore the cached dry colour
    pub fn dry(&mut self) {
        if let Some(color) = self.original_color.take() {
            self.color = color;
        }
    }
}

/// Side-table of gameplay tags, iterated in id order
#[derive(Debug, Clone, Default)]
pub struct BodyRegistry {
    tags: BTreeMap<BodyId, BodyTag>,
}

impl BodyRegistry {
    pub fn insert(&mut self, tag: BodyTag) {
        self.tags.insert(tag.id, tag);
    }

    pub fn get(&self, id: BodyId) -> Option<&BodyTag> {
        self.tags.get(&id)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut BodyTag> {
        self.tags.get_mut(&id)
    }

    pub fn state(&self, id: BodyId) -> Option<BodyState> {
        self.tags.get(&id).map(|t| t.state)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BodyTag> {
        self.tags.values()
    }

    /// Ids of bodies in `state`, ascending
    pub fn ids_in(&self, state: BodyState) -> Vec<BodyId> {
        self.tags
            .values()
            .filter(|t| t.state == state)
            .map(|t| t.id)
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&BodyTag) -> bool) -> usize {
        self.tags.values().filter(|t| pred(t)).count()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn remove(&mut self, id: BodyId) -> Option<BodyTag> {
        self.tags.remove(&id)
    }

    /// Stop tracking a body that leaves play as `end` (`Broken` or `Removed`).
    /// Refused, and left tracked, when the lifecycle forbids that edge.
    pub fn retire(&mut self, id: BodyId, end: BodyState) -> Option<BodyTag> {
        if !self.tags.get(&id)?.state.can_become(end) {
            return None;
        }
        let mut tag = self.remove(id)?;
        tag.state = end;
        Some(tag)
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }
}
