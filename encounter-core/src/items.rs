//! Item database: weapons, armor and consumables referenced by id.
//!
//! Characters store item ids in their inventory and equipment slots; these
//! tables resolve an id into the data the resolver needs.

use crate::rules::{Ability, DamageType};
use serde::{Deserialize, Serialize};

/// Weapon proficiency group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    Simple,
    Martial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponData {
    pub id: &'static str,
    pub name: &'static str,
    /// Base damage dice, without modifier.
    pub damage: &'static str,
    pub ability: Ability,
    pub damage_type: DamageType,
    pub category: WeaponCategory,
    pub ranged: bool,
    pub price: u32,
}

impl WeaponData {
    pub fn is_melee(&self) -> bool {
        !self.ranged
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArmorData {
    pub id: &'static str,
    pub name: &'static str,
    pub ac_base: i32,
    /// Light armor adds the DEX modifier.
    pub adds_dex: bool,
    pub str_requirement: Option<i32>,
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsumableEffect {
    /// Heal by a dice expression.
    Heal(&'static str),
    CurePoison,
    Light,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumableData {
    pub id: &'static str,
    pub name: &'static str,
    pub effect: ConsumableEffect,
    pub price: u32,
}

/// Any item from the database.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef {
    Weapon(&'static WeaponData),
    Armor(&'static ArmorData),
    Consumable(&'static ConsumableData),
}

impl ItemRef {
    pub fn name(&self) -> &'static str {
        match self {
            ItemRef::Weapon(w) => w.name,
            ItemRef::Armor(a) => a.name,
            ItemRef::Consumable(c) => c.name,
        }
    }
}

/// The fallback attack when no weapon is equipped.
pub static UNARMED: WeaponData = WeaponData {
    id: "unarmed",
    name: "Unarmed Strike",
    damage: "1d2",
    ability: Ability::Strength,
    damage_type: DamageType::Bludgeoning,
    category: WeaponCategory::Simple,
    ranged: false,
    price: 0,
};

// ============================================================================
// Tables
// ============================================================================

lazy_static::lazy_static! {
    pub static ref WEAPONS: Vec<WeaponData> = vec![
        WeaponData {
            id: "longsword",
            name: "Longsword",
            damage: "1d8",
            ability: Ability::Strength,
            damage_type: DamageType::Slashing,
            category: WeaponCategory::Martial,
            ranged: false,
            price: 20,
        },
        WeaponData {
            id: "shortbow",
            name: "Shortbow",
            damage: "1d6",
            ability: Ability::Dexterity,
            damage_type: DamageType::Piercing,
            category: WeaponCategory::Simple,
            ranged: true,
            price: 25,
        },
        WeaponData {
            id: "dagger",
            name: "Dagger",
            damage: "1d4",
            ability: Ability::Dexterity,
            damage_type: DamageType::Piercing,
            category: WeaponCategory::Simple,
            ranged: false,
            price: 5,
        },
        WeaponData {
            id: "mace",
            name: "Mace",
            damage: "1d6",
            ability: Ability::Strength,
            damage_type: DamageType::Bludgeoning,
            category: WeaponCategory::Simple,
            ranged: false,
            price: 5,
        },
    ];

    pub static ref ARMORS: Vec<ArmorData> = vec![
        ArmorData {
            id: "leather_armor",
            name: "Leather Armor",
            ac_base: 11,
            adds_dex: true,
            str_requirement: None,
            price: 10,
        },
        ArmorData {
            id: "chainmail",
            name: "Chain Mail",
            ac_base: 16,
            adds_dex: false,
            str_requirement: Some(13),
            price: 75,
        },
    ];

    pub static ref CONSUMABLES: Vec<ConsumableData> = vec![
        ConsumableData {
            id: "potion_healing",
            name: "Potion of Healing",
            effect: ConsumableEffect::Heal("2d4+2"),
            price: 50,
        },
        ConsumableData {
            id: "antitoxin",
            name: "Antitoxin",
            effect: ConsumableEffect::CurePoison,
            price: 25,
        },
        ConsumableData {
            id: "torch",
            name: "Torch",
            effect: ConsumableEffect::Light,
            price: 1,
        },
    ];
}

pub fn get_weapon(id: &str) -> Option<&'static WeaponData> {
    WEAPONS.iter().find(|w| w.id == id)
}

pub fn get_armor(id: &str) -> Option<&'static ArmorData> {
    ARMORS.iter().find(|a| a.id == id)
}

pub fn get_consumable(id: &str) -> Option<&'static ConsumableData> {
    CONSUMABLES.iter().find(|c| c.id == id)
}

/// Look up any item by id.
pub fn find_item(id: &str) -> Option<ItemRef> {
    get_weapon(id)
        .map(ItemRef::Weapon)
        .or_else(|| get_armor(id).map(ItemRef::Armor))
        .or_else(|| get_consumable(id).map(ItemRef::Consumable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceExpression;

    #[test]
    fn test_find_item_by_kind() {
        assert!(matches!(find_item("longsword"), Some(ItemRef::Weapon(_))));
        assert!(matches!(find_item("chainmail"), Some(ItemRef::Armor(_))));
        assert!(matches!(find_item("antitoxin"), Some(ItemRef::Consumable(_))));
        assert!(find_item("vorpal_blade").is_none());
    }

    #[test]
    fn test_weapon_dice_parse() {
        for weapon in WEAPONS.iter().chain(std::iter::once(&UNARMED)) {
            assert!(
                DiceExpression::parse(weapon.damage).is_ok(),
                "{} has bad damage {}",
                weapon.id,
                weapon.damage
            );
        }
    }

    #[test]
    fn test_chainmail_requires_strength() {
        let chainmail = get_armor("chainmail").unwrap();
        assert_eq!(chainmail.str_requirement, Some(13));
        assert!(!chainmail.adds_dex);
    }

    #[test]
    fn test_shortbow_is_ranged() {
        assert!(!get_weapon("shortbow").unwrap().is_melee());
        assert!(get_weapon("dagger").unwrap().is_melee());
        assert!(UNARMED.is_melee());
    }
}
