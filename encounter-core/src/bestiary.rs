//! Enemy templates and level-scalable NPC stat blocks.

use crate::combatant::StatusEffectId;
use crate::rules::{AttackAction, DamageType, StatBlock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A status inflicted on a successful hit, with a percentage chance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnHitRider {
    pub effect: StatusEffectId,
    pub chance_percent: u32,
}

/// A fixed-stat enemy.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub hp: i32,
    pub ac: i32,
    pub attack_bonus: i32,
    pub initiative_bonus: i32,
    pub damage: &'static str,
    pub damage_type: DamageType,
    pub xp: u32,
    pub resistances: &'static [DamageType],
    pub vulnerabilities: &'static [DamageType],
    pub on_hit: Option<OnHitRider>,
}

lazy_static::lazy_static! {
    pub static ref ENEMIES: Vec<EnemyTemplate> = vec![
        EnemyTemplate {
            id: "fungal_beast",
            name: "Lesser Fungal Beast",
            hp: 15,
            ac: 12,
            attack_bonus: 3,
            initiative_bonus: 3,
            damage: "1d6+1",
            damage_type: DamageType::Bludgeoning,
            xp: 50,
            resistances: &[DamageType::Poison],
            vulnerabilities: &[DamageType::Fire],
            on_hit: Some(OnHitRider {
                effect: StatusEffectId::Poisoned,
                chance_percent: 25,
            }),
        },
        EnemyTemplate {
            id: "spore_zombie",
            name: "Spore Walker",
            hp: 22,
            ac: 10,
            attack_bonus: 4,
            initiative_bonus: 4,
            damage: "1d8+2",
            damage_type: DamageType::Bludgeoning,
            xp: 75,
            resistances: &[DamageType::Necrotic],
            vulnerabilities: &[DamageType::Radiant],
            on_hit: None,
        },
    ];

    /// Named NPCs that can turn hostile, scaled to the player's level on spawn.
    pub static ref NPC_STAT_BLOCKS: Vec<(&'static str, StatBlock)> = vec![
        (
            "hollow_warden",
            StatBlock {
                name: "Hollow Warden".to_string(),
                base_level: 1,
                hp: 18,
                ac: 13,
                hp_per_level: "1d8".to_string(),
                to_hit_per_level: 0.5,
                damage_per_level: 0.5,
                actions: vec![AttackAction {
                    name: "Thornblade".to_string(),
                    to_hit: 4,
                    damage: "1d8+2".to_string(),
                    damage_type: DamageType::Slashing,
                }],
                xp: 100,
                resistances: BTreeSet::new(),
                vulnerabilities: BTreeSet::new(),
            },
        ),
        (
            "briar_witch",
            StatBlock {
                name: "Briar Witch".to_string(),
                base_level: 2,
                hp: 16,
                ac: 11,
                hp_per_level: "1d6".to_string(),
                to_hit_per_level: 0.5,
                damage_per_level: 0.34,
                actions: vec![AttackAction {
                    name: "Thorn Lash".to_string(),
                    to_hit: 3,
                    damage: "2d4".to_string(),
                    damage_type: DamageType::Poison,
                }],
                xp: 120,
                resistances: [DamageType::Poison].into_iter().collect(),
                vulnerabilities: [DamageType::Fire].into_iter().collect(),
            },
        ),
    ];
}

pub fn get_enemy(id: &str) -> Option<&'static EnemyTemplate> {
    ENEMIES.iter().find(|e| e.id == id)
}

pub fn get_npc_stat_block(id: &str) -> Option<&'static StatBlock> {
    NPC_STAT_BLOCKS
        .iter()
        .find(|(npc_id, _)| *npc_id == id)
        .map(|(_, block)| block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceExpression;

    #[test]
    fn test_fungal_beast_poisons() {
        let beast = get_enemy("fungal_beast").unwrap();
        assert_eq!(beast.hp, 15);
        assert_eq!(beast.xp, 50);
        let rider = beast.on_hit.unwrap();
        assert_eq!(rider.effect, StatusEffectId::Poisoned);
        assert_eq!(rider.chance_percent, 25);
    }

    #[test]
    fn test_lookup_misses() {
        assert!(get_enemy("hollow_warden").is_none());
        assert!(get_npc_stat_block("fungal_beast").is_none());
        assert!(get_npc_stat_block("hollow_warden").is_some());
    }

    #[test]
    fn test_all_damage_parses() {
        for enemy in ENEMIES.iter() {
            assert!(DiceExpression::parse(enemy.damage).is_ok(), "{}", enemy.id);
        }
        for (id, block) in NPC_STAT_BLOCKS.iter() {
            assert!(DiceExpression::parse(&block.hp_per_level).is_ok(), "{id}");
            for action in &block.actions {
                assert!(DiceExpression::parse(&action.damage).is_ok(), "{id}");
            }
        }
    }
}
