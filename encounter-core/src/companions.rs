//! Recruitable companions.

use crate::class_data::CharacterClass;
use crate::combatant::{Character, CombatantId, Race};
use crate::rules::AbilityScores;

pub struct CompanionTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub race: Race,
    pub class: CharacterClass,
    /// Scores before racial bonuses.
    pub base_scores: AbilityScores,
    pub weapon: Option<&'static str>,
    pub armor: Option<&'static str>,
    pub known_spells: &'static [&'static str],
}

impl CompanionTemplate {
    /// A level-1 character built from this template, gear equipped.
    pub fn build(&self) -> Character {
        let mut character = Character::new(
            CombatantId::new(self.id),
            self.name,
            self.race,
            self.class,
            self.base_scores,
        );
        if let Some(weapon) = self.weapon {
            character = character.with_equipped(weapon);
        }
        if let Some(armor) = self.armor {
            character = character.with_equipped(armor);
        }
        character.with_spells(self.known_spells)
    }
}

lazy_static::lazy_static! {
    pub static ref COMPANIONS: Vec<CompanionTemplate> = vec![
        CompanionTemplate {
            id: "aodhan",
            name: "Aodhan",
            race: Race::Human,
            class: CharacterClass::Fighter,
            base_scores: AbilityScores::new(16, 12, 14, 10, 12, 10),
            weapon: Some("longsword"),
            armor: Some("chainmail"),
            known_spells: &[],
        },
        CompanionTemplate {
            id: "elara",
            name: "Elara",
            race: Race::Elf,
            class: CharacterClass::Wizard,
            base_scores: AbilityScores::new(8, 14, 12, 16, 12, 10),
            weapon: Some("dagger"),
            armor: None,
            known_spells: &["firebolt", "magic_missile"],
        },
        CompanionTemplate {
            id: "neala",
            name: "Neala",
            race: Race::Human,
            class: CharacterClass::Cleric,
            base_scores: AbilityScores::new(12, 10, 14, 12, 16, 13),
            weapon: Some("mace"),
            armor: Some("leather_armor"),
            known_spells: &["cure_wounds"],
        },
    ];
}

pub fn get_companion(id: &str) -> Option<&'static CompanionTemplate> {
    COMPANIONS.iter().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Ability;

    #[test]
    fn test_build_aodhan() {
        let aodhan = get_companion("aodhan").unwrap().build();
        assert_eq!(aodhan.id.as_str(), "aodhan");
        assert_eq!(aodhan.abilities.get(Ability::Strength), 17);
        // d10 + CON 15 (+2)
        assert_eq!(aodhan.max_hp, 12);
        assert_eq!(aodhan.equipped.weapon.as_deref(), Some("longsword"));
        assert_eq!(aodhan.armor_class(), 16);
    }

    #[test]
    fn test_build_elara_knows_spells() {
        let elara = get_companion("elara").unwrap().build();
        assert_eq!(elara.abilities.get(Ability::Dexterity), 16);
        assert!(elara.knows_spell("magic_missile"));
        assert_eq!(elara.spell_slots.available(1), 2);
    }

    #[test]
    fn test_unknown_companion() {
        assert!(get_companion("nobody").is_none());
    }
}
