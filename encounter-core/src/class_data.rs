//! Class and subclass data: hit dice, proficiencies, spellcasting and the
//! per-level feature and spell-slot progression.

use crate::combatant::ResourceId;
use crate::items::WeaponCategory;
use crate::rules::{Ability, Skill};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Character classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Fighter,
    Rogue,
    Wizard,
    Cleric,
}

/// Subclasses, chosen at level 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subclass {
    /// Fighter: critical hits on 19-20.
    Champion,
    /// Rogue.
    Thief,
    /// Wizard.
    Evocation,
    /// Cleric: healing spells restore an extra 2 + spell level.
    Life,
}

impl Subclass {
    pub fn class(&self) -> CharacterClass {
        match self {
            Subclass::Champion => CharacterClass::Fighter,
            Subclass::Thief => CharacterClass::Rogue,
            Subclass::Evocation => CharacterClass::Wizard,
            Subclass::Life => CharacterClass::Cleric,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Subclass::Champion => "Champion",
            Subclass::Thief => "Thief",
            Subclass::Evocation => "School of Evocation",
            Subclass::Life => "Life Domain",
        }
    }
}

/// Static data for one class.
pub struct ClassData {
    pub name: &'static str,
    pub hit_die: u32,
    pub primary_abilities: [Ability; 2],
    pub skill_proficiencies: &'static [Skill],
    pub weapon_proficiencies: &'static [WeaponCategory],
    /// None for non-casters.
    pub casting_ability: Option<Ability>,
    pub starting_spells: &'static [&'static str],
    /// Items granted at creation. The first weapon and armor get equipped.
    pub starting_kit: &'static [&'static str],
}

static FIGHTER: ClassData = ClassData {
    name: "Fighter",
    hit_die: 10,
    primary_abilities: [Ability::Strength, Ability::Constitution],
    skill_proficiencies: &[Skill::Athletics, Skill::Survival, Skill::Intimidation],
    weapon_proficiencies: &[WeaponCategory::Simple, WeaponCategory::Martial],
    casting_ability: None,
    starting_spells: &[],
    starting_kit: &["longsword", "chainmail"],
};

static ROGUE: ClassData = ClassData {
    name: "Rogue",
    hit_die: 8,
    primary_abilities: [Ability::Dexterity, Ability::Intelligence],
    skill_proficiencies: &[
        Skill::Stealth,
        Skill::Perception,
        Skill::Investigation,
        Skill::Acrobatics,
    ],
    weapon_proficiencies: &[WeaponCategory::Simple],
    casting_ability: None,
    starting_spells: &[],
    starting_kit: &["dagger", "shortbow", "leather_armor"],
};

static WIZARD: ClassData = ClassData {
    name: "Wizard",
    hit_die: 6,
    primary_abilities: [Ability::Intelligence, Ability::Wisdom],
    skill_proficiencies: &[Skill::Arcana, Skill::History, Skill::Insight],
    weapon_proficiencies: &[WeaponCategory::Simple],
    casting_ability: Some(Ability::Intelligence),
    starting_spells: &["firebolt", "magic_missile"],
    starting_kit: &["dagger", "potion_healing"],
};

static CLERIC: ClassData = ClassData {
    name: "Cleric",
    hit_die: 8,
    primary_abilities: [Ability::Wisdom, Ability::Charisma],
    skill_proficiencies: &[Skill::Religion, Skill::Medicine, Skill::Persuasion],
    weapon_proficiencies: &[WeaponCategory::Simple],
    casting_ability: Some(Ability::Wisdom),
    starting_spells: &["cure_wounds", "sacred_flame"],
    starting_kit: &["mace", "leather_armor"],
};

/// Full-caster slot table by character level, capped at level 5.
const CASTER_SLOTS: [&[(u8, u32)]; 5] = [
    &[(1, 2)],
    &[(1, 3)],
    &[(1, 4), (2, 2)],
    &[(1, 4), (2, 3)],
    &[(1, 4), (2, 3), (3, 2)],
];

impl CharacterClass {
    pub fn data(&self) -> &'static ClassData {
        match self {
            CharacterClass::Fighter => &FIGHTER,
            CharacterClass::Rogue => &ROGUE,
            CharacterClass::Wizard => &WIZARD,
            CharacterClass::Cleric => &CLERIC,
        }
    }

    pub fn name(&self) -> &'static str {
        self.data().name
    }

    pub fn is_caster(&self) -> bool {
        self.data().casting_ability.is_some()
    }

    /// Limited-use features unlocked on reaching `level`.
    pub fn features_at(&self, level: u32) -> &'static [ResourceId] {
        match (self, level) {
            (CharacterClass::Fighter, 1) => &[ResourceId::SecondWind],
            (CharacterClass::Fighter, 2) => &[ResourceId::ActionSurge],
            _ => &[],
        }
    }

    /// Spell slots held at `level`; empty for non-casters.
    pub fn spell_slots_at(&self, level: u32) -> &'static [(u8, u32)] {
        if !self.is_caster() || level == 0 {
            return &[];
        }
        let row = (level.min(CASTER_SLOTS.len() as u32) - 1) as usize;
        CASTER_SLOTS[row]
    }

    /// The subclass taken at level 3 when no choice is supplied.
    pub fn default_subclass(&self) -> Subclass {
        match self {
            CharacterClass::Fighter => Subclass::Champion,
            CharacterClass::Rogue => Subclass::Thief,
            CharacterClass::Wizard => Subclass::Evocation,
            CharacterClass::Cleric => Subclass::Life,
        }
    }

    pub fn has_sneak_attack(&self) -> bool {
        matches!(self, CharacterClass::Rogue)
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sneak attack dice count: `ceil(level / 2)`.
pub fn sneak_attack_dice(level: u32) -> u32 {
    level.div_ceil(2)
}

/// XP needed for the level after `level`.
pub fn xp_for_next_level(level: u32) -> u32 {
    level * 300
}

/// Levels that grant an ability score improvement.
pub fn is_asi_level(level: u32) -> bool {
    level > 0 && level % 4 == 0
}

pub const SUBCLASS_LEVEL: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_dice() {
        assert_eq!(CharacterClass::Fighter.data().hit_die, 10);
        assert_eq!(CharacterClass::Rogue.data().hit_die, 8);
        assert_eq!(CharacterClass::Wizard.data().hit_die, 6);
        assert_eq!(CharacterClass::Cleric.data().hit_die, 8);
    }

    #[test]
    fn test_slot_progression_caps() {
        assert!(CharacterClass::Fighter.spell_slots_at(5).is_empty());
        assert_eq!(CharacterClass::Wizard.spell_slots_at(1), &[(1, 2)]);
        assert_eq!(CharacterClass::Cleric.spell_slots_at(3), &[(1, 4), (2, 2)]);
        assert_eq!(
            CharacterClass::Wizard.spell_slots_at(9),
            CharacterClass::Wizard.spell_slots_at(5)
        );
    }

    #[test]
    fn test_sneak_attack_scaling() {
        assert_eq!(sneak_attack_dice(1), 1);
        assert_eq!(sneak_attack_dice(4), 2);
        assert_eq!(sneak_attack_dice(5), 3);
    }

    #[test]
    fn test_subclasses_belong_to_class() {
        for class in [
            CharacterClass::Fighter,
            CharacterClass::Rogue,
            CharacterClass::Wizard,
            CharacterClass::Cleric,
        ] {
            assert_eq!(class.default_subclass().class(), class);
        }
    }

    #[test]
    fn test_asi_levels() {
        assert!(is_asi_level(4));
        assert!(is_asi_level(8));
        assert!(!is_asi_level(3));
        assert!(!is_asi_level(0));
    }
}
