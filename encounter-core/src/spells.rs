//! Spell database.
//!
//! Spells are keyed by id (`"cure_wounds"`). Each spell resolves one of
//! three ways: an attack roll against AC, a heal, or a saving throw.

use crate::class_data::CharacterClass;
use crate::rules::{Ability, DamageType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Schools of magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellSchool {
    Evocation,
    Abjuration,
    Necromancy,
}

impl SpellSchool {
    pub fn name(&self) -> &'static str {
        match self {
            SpellSchool::Evocation => "Evocation",
            SpellSchool::Abjuration => "Abjuration",
            SpellSchool::Necromancy => "Necromancy",
        }
    }
}

/// How a spell resolves against its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpellEffect {
    /// Spell attack roll against AC; dice damage on a hit.
    Attack {
        damage: String,
        damage_type: DamageType,
    },
    /// Restore HP.
    Heal { amount: String },
    /// Target saves against the caster's DC; half damage on a success.
    Save {
        ability: Ability,
        damage: String,
        damage_type: DamageType,
    },
}

/// One castable spell and how it resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellData {
    pub id: String,
    pub name: String,
    /// 0 for cantrips.
    pub level: u8,
    pub school: SpellSchool,
    pub description: String,
    pub effect: SpellEffect,
    pub classes: Vec<CharacterClass>,
}

impl SpellData {
    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }

    pub fn is_heal(&self) -> bool {
        matches!(self.effect, SpellEffect::Heal { .. })
    }

    pub fn is_attack(&self) -> bool {
        matches!(self.effect, SpellEffect::Attack { .. })
    }

    /// Damage-dealing spells: attack or save.
    pub fn is_offensive(&self) -> bool {
        !self.is_heal()
    }
}

// ============================================================================
// Spell Database
// ============================================================================

static SPELL_DATABASE: LazyLock<HashMap<String, SpellData>> = LazyLock::new(build_spell_database);

/// Look up a spell by id (case-insensitive).
pub fn get_spell(id: &str) -> Option<&'static SpellData> {
    SPELL_DATABASE.get(&id.to_lowercase())
}

pub fn all_spells() -> impl Iterator<Item = &'static SpellData> {
    SPELL_DATABASE.values()
}

pub fn spells_by_level(level: u8) -> impl Iterator<Item = &'static SpellData> {
    SPELL_DATABASE.values().filter(move |s| s.level == level)
}

pub fn spells_for_class(class: CharacterClass) -> impl Iterator<Item = &'static SpellData> {
    SPELL_DATABASE
        .values()
        .filter(move |s| s.classes.contains(&class))
}

fn build_spell_database() -> HashMap<String, SpellData> {
    let spells = [
        SpellData {
            id: "firebolt".to_string(),
            name: "Fire Bolt".to_string(),
            level: 0,
            school: SpellSchool::Evocation,
            description: "You hurl a mote of fire at a creature or object.".to_string(),
            effect: SpellEffect::Attack {
                damage: "1d10".to_string(),
                damage_type: DamageType::Fire,
            },
            classes: vec![CharacterClass::Wizard],
        },
        SpellData {
            id: "cure_wounds".to_string(),
            name: "Cure Wounds".to_string(),
            level: 1,
            school: SpellSchool::Abjuration,
            description: "A creature you touch regains hit points.".to_string(),
            effect: SpellEffect::Heal {
                amount: "1d8+3".to_string(),
            },
            classes: vec![CharacterClass::Cleric],
        },
        SpellData {
            id: "magic_missile".to_string(),
            name: "Magic Missile".to_string(),
            level: 1,
            school: SpellSchool::Evocation,
            description: "Three glowing darts of magical force strike a creature.".to_string(),
            effect: SpellEffect::Attack {
                damage: "3d4+3".to_string(),
                damage_type: DamageType::Force,
            },
            classes: vec![CharacterClass::Wizard],
        },
        SpellData {
            id: "burning_hands".to_string(),
            name: "Burning Hands".to_string(),
            level: 1,
            school: SpellSchool::Evocation,
            description: "A thin sheet of flames shoots forth from your fingertips.".to_string(),
            effect: SpellEffect::Save {
                ability: Ability::Dexterity,
                damage: "3d6".to_string(),
                damage_type: DamageType::Fire,
            },
            classes: vec![CharacterClass::Wizard],
        },
        SpellData {
            id: "sacred_flame".to_string(),
            name: "Sacred Flame".to_string(),
            level: 0,
            school: SpellSchool::Evocation,
            description: "Flame-like radiance descends on a creature you can see.".to_string(),
            effect: SpellEffect::Save {
                ability: Ability::Dexterity,
                damage: "1d8".to_string(),
                damage_type: DamageType::Radiant,
            },
            classes: vec![CharacterClass::Cleric],
        },
    ];

    spells.into_iter().map(|s| (s.id.clone(), s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceExpression;

    #[test]
    fn test_get_spell() {
        let missile = get_spell("magic_missile").expect("Magic Missile should exist");
        assert_eq!(missile.name, "Magic Missile");
        assert_eq!(missile.level, 1);
        assert!(missile.is_attack());
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert!(get_spell("CURE_WOUNDS").is_some());
        assert!(get_spell("Cure_Wounds").is_some());
        assert!(get_spell("no_such_spell").is_none());
    }

    #[test]
    fn test_effect_kinds() {
        assert!(get_spell("cure_wounds").unwrap().is_heal());
        assert!(get_spell("firebolt").unwrap().is_cantrip());
        let burning = get_spell("burning_hands").unwrap();
        assert!(burning.is_offensive());
        assert!(matches!(
            burning.effect,
            SpellEffect::Save {
                ability: Ability::Dexterity,
                ..
            }
        ));
    }

    #[test]
    fn test_all_dice_parse() {
        for spell in all_spells() {
            let dice = match &spell.effect {
                SpellEffect::Attack { damage, .. } | SpellEffect::Save { damage, .. } => damage,
                SpellEffect::Heal { amount } => amount,
            };
            assert!(DiceExpression::parse(dice).is_ok(), "{} has bad dice", spell.id);
        }
    }

    #[test]
    fn test_class_spell_lists() {
        let wizard: Vec<_> = spells_for_class(CharacterClass::Wizard).collect();
        assert!(wizard.iter().any(|s| s.id == "firebolt"));
        assert!(!wizard.iter().any(|s| s.id == "cure_wounds"));
        assert!(spells_by_level(0).all(|s| s.is_cantrip()));
    }
}
