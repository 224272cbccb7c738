use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Index into the armory's weapon table. One byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExplosionTypeId(pub u8);

impl fmt::Display for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weapon {}", self.0)
    }
}

impl fmt::Display for ExplosionTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "explosion type {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletShape {
    Line,
    #[default]
    Circle,
}

/// Immutable weapon template. Times in ms, speed in px/ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weapon {
    pub name: String,
    pub damage: i32,
    pub lifetime: f32,
    pub speed: f32,
    /// Shots per burst before the weapon reloads.
    pub shots: u32,
    pub reload: f32,
    /// Delay between shots within a burst.
    pub rate: f32,
    pub prefire: f32,
    pub requires_stationary: bool,
    pub bullet_shape: BulletShape,
    pub bullet_length: f32,
    pub color: String,
    /// Explosion spawned wherever one of this weapon's bullets is destroyed.
    pub on_hit: Option<ExplosionTypeId>,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            name: "Weapon".to_string(),
            damage: 200,
            lifetime: 2000.0,
            speed: 0.225,
            shots: 3,
            reload: 1000.0,
            rate: 200.0,
            prefire: 0.0,
            requires_stationary: false,
            bullet_shape: BulletShape::Circle,
            bullet_length: 4.0,
            color: "#00ffff".to_string(),
            on_hit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub weapon: WeaponId,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionType {
    pub name: String,
    pub damage: i32,
    pub fragments: Vec<Fragment>,
    pub size: Vec2,
    pub lifetime: f32,
    pub sprite: Option<u16>,
}

impl Default for ExplosionType {
    fn default() -> Self {
        Self {
            name: "Explosion".to_string(),
            damage: 100,
            fragments: Vec::new(),
            size: Vec2::splat(60.0),
            lifetime: 300.0,
            sprite: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArmoryError {
    #[error("armory already holds 256 {0}, ids must fit in one byte")]
    IdSpaceExhausted(&'static str),
    #[error("weapon `{name}` references unknown {explosion}")]
    UnknownExplosionType {
        name: String,
        explosion: ExplosionTypeId,
    },
    #[error("explosion `{name}` references unknown {weapon}")]
    UnknownWeapon { name: String, weapon: WeaponId },
    #[error("weapon `{0}` must fire at least one shot per burst")]
    EmptyBurst(String),
    #[error("explosion `{name}` has invalid size {size}")]
    InvalidSize { name: String, size: Vec2 },
}

pub fn is_valid_size(size: Vec2) -> bool {
    size.is_finite() && size.x > 0.0 && size.y > 0.0
}

/// Registry of weapon and explosion templates. Ids are assigned in
/// insertion order and every cross reference is checked on insertion, so a
/// template can only point at templates added before it.
#[derive(Debug, Clone, Default)]
pub struct Armory {
    weapons: Vec<Weapon>,
    explosions: Vec<ExplosionType>,
}

impl Armory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_weapon(&mut self, weapon: Weapon) -> Result<WeaponId, ArmoryError> {
        let id = u8::try_from(self.weapons.len())
            .map_err(|_| ArmoryError::IdSpaceExhausted("weapons"))?;
        if weapon.shots == 0 {
            return Err(ArmoryError::EmptyBurst(weapon.name));
        }
        if let Some(explosion) = weapon.on_hit {
            if self.explosion(explosion).is_none() {
                return Err(ArmoryError::UnknownExplosionType {
                    name: weapon.name,
                    explosion,
                });
            }
        }
        self.weapons.push(weapon);
        Ok(WeaponId(id))
    }

    pub fn add_explosion(
        &mut self,
        explosion: ExplosionType,
    ) -> Result<ExplosionTypeId, ArmoryError> {
        let id = u8::try_from(self.explosions.len())
            .map_err(|_| ArmoryError::IdSpaceExhausted("explosion types"))?;
        if !is_valid_size(explosion.size) {
            return Err(ArmoryError::InvalidSize {
                name: explosion.name,
                size: explosion.size,
            });
        }
        if let Some(missing) = explosion
            .fragments
            .iter()
            .find(|f| self.weapon(f.weapon).is_none())
        {
            return Err(ArmoryError::UnknownWeapon {
                name: explosion.name,
                weapon: missing.weapon,
            });
        }
        self.explosions.push(explosion);
        Ok(ExplosionTypeId(id))
    }

    pub fn weapon(&self, id: WeaponId) -> Option<&Weapon> {
        self.weapons.get(usize::from(id.0))
    }

    pub fn explosion(&self, id: ExplosionTypeId) -> Option<&ExplosionType> {
        self.explosions.get(usize::from(id.0))
    }

    pub fn weapons(&self) -> impl Iterator<Item = (WeaponId, &Weapon)> {
        self.weapons
            .iter()
            .enumerate()
            .map(|(i, w)| (WeaponId(i as u8), w))
    }

    pub fn explosions(&self) -> impl Iterator<Item = (ExplosionTypeId, &ExplosionType)> {
        self.explosions
            .iter()
            .enumerate()
            .map(|(i, e)| (ExplosionTypeId(i as u8), e))
    }

    pub fn find_weapon(&self, name: &str) -> Option<WeaponId> {
        self.weapons().find(|(_, w)| w.name == name).map(|(id, _)| id)
    }
}

/// Ids of the stock loadout built by [`standard_armory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardLoadout {
    pub burst: WeaponId,
    pub auto: WeaponId,
    pub shrapnel: WeaponId,
    pub boom: ExplosionTypeId,
    pub launcher: WeaponId,
}

/// Burst rifle, automatic, and a grenade launcher whose shells burst into
/// eight fragments.
pub fn standard_armory() -> Result<(Armory, StandardLoadout), ArmoryError> {
    let mut armory = Armory::new();

    let burst = armory.add_weapon(Weapon {
        name: "burst".to_string(),
        damage: 85,
        reload: 620.0,
        rate: 100.0,
        bullet_shape: BulletShape::Line,
        bullet_length: 10.0,
        color: "#00aaff".to_string(),
        ..Weapon::default()
    })?;

    let auto = armory.add_weapon(Weapon {
        name: "auto".to_string(),
        ..Weapon::default()
    })?;

    let shrapnel = armory.add_weapon(Weapon {
        name: "shrapnel".to_string(),
        damage: 40,
        lifetime: 250.0,
        speed: 0.3,
        shots: 1,
        bullet_length: 2.0,
        color: "#ffaa00".to_string(),
        ..Weapon::default()
    })?;

    let boom = armory.add_explosion(ExplosionType {
        name: "boom".to_string(),
        damage: 150,
        fragments: vec![Fragment {
            weapon: shrapnel,
            count: 8,
        }],
        ..ExplosionType::default()
    })?;

    let launcher = armory.add_weapon(Weapon {
        name: "launcher".to_string(),
        damage: 50,
        lifetime: 900.0,
        speed: 0.15,
        shots: 1,
        reload: 1500.0,
        prefire: 300.0,
        requires_stationary: true,
        bullet_length: 8.0,
        color: "#ff4400".to_string(),
        on_hit: Some(boom),
        ..Weapon::default()
    })?;

    Ok((
        armory,
        StandardLoadout {
            burst,
            auto,
            shrapnel,
            boom,
            launcher,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_insertion_order() {
        let mut armory = Armory::new();
        assert_eq!(armory.add_weapon(Weapon::default()).unwrap(), WeaponId(0));
        assert_eq!(armory.add_weapon(Weapon::default()).unwrap(), WeaponId(1));
        assert_eq!(
            armory.add_explosion(ExplosionType::default()).unwrap(),
            ExplosionTypeId(0)
        );
    }

    #[test]
    fn id_space_is_one_byte() {
        let mut armory = Armory::new();
        for _ in 0..256 {
            armory.add_weapon(Weapon::default()).unwrap();
        }
        assert_eq!(
            armory.add_weapon(Weapon::default()),
            Err(ArmoryError::IdSpaceExhausted("weapons"))
        );
    }

    #[test]
    fn degenerate_explosion_sizes_rejected() {
        let mut armory = Armory::new();
        let sizes = [
            Vec2::ZERO,
            Vec2::new(10.0, -1.0),
            Vec2::new(f32::NAN, 10.0),
            Vec2::splat(f32::INFINITY),
        ];
        for size in sizes {
            let explosion = ExplosionType {
                size,
                ..ExplosionType::default()
            };
            assert!(matches!(
                armory.add_explosion(explosion),
                Err(ArmoryError::InvalidSize { .. })
            ));
        }
        assert!(armory.explosions().next().is_none());
    }

    #[test]
    fn dangling_references_rejected() {
        let mut armory = Armory::new();
        let weapon = Weapon {
            on_hit: Some(ExplosionTypeId(3)),
            ..Weapon::default()
        };
        assert!(matches!(
            armory.add_weapon(weapon),
            Err(ArmoryError::UnknownExplosionType { .. })
        ));

        let explosion = ExplosionType {
            fragments: vec![Fragment {
                weapon: WeaponId(9),
                count: 4,
            }],
            ..ExplosionType::default()
        };
        assert!(matches!(
            armory.add_explosion(explosion),
            Err(ArmoryError::UnknownWeapon { .. })
        ));
    }

    #[test]
    fn standard_loadout_is_consistent() {
        let (armory, loadout) = standard_armory().unwrap();
        let launcher = armory.weapon(loadout.launcher).unwrap();
        assert_eq!(launcher.on_hit, Some(loadout.boom));
        assert_eq!(armory.find_weapon("burst"), Some(loadout.burst));
        assert_eq!(armory.weapon(loadout.burst).unwrap().damage, 85);
    }
}
