//! Decision making for combatants nobody is commanding.
//!
//! Both policies act only through [`ActionResolver`], so they never touch
//! the scheduler or the game state directly.

use crate::combatant::{Character, CombatantId};
use crate::config::EnemyTargeting;
use crate::error::ActionRejected;
use crate::resolver::ActionResolver;
use crate::spells::SpellData;
use crate::state::GameState;

/// What a companion decided to do on its turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanionDecision {
    Heal {
        spell: String,
        target: CombatantId,
    },
    Attack {
        target: CombatantId,
    },
    CastDamage {
        spell: String,
        target: CombatantId,
    },
    HoldGround,
}

/// Fixed-priority companion AI: heal a badly hurt ally, else swing a melee
/// weapon at the first living enemy, else cast an attack spell at it, else
/// shoot it with a ranged weapon, else hold ground.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompanionPolicy;

impl CompanionPolicy {
    pub fn decide(&self, state: &GameState, actor: &CombatantId) -> CompanionDecision {
        let Some(me) = state.character(actor) else {
            return CompanionDecision::HoldGround;
        };

        if let Some(decision) = self.heal_choice(state, me) {
            return decision;
        }

        let first_enemy = state.living_enemies().next().map(|e| e.id.clone());
        let Some(target) = first_enemy else {
            return CompanionDecision::HoldGround;
        };

        let weapon = me
            .equipped
            .weapon
            .as_deref()
            .and_then(crate::items::get_weapon);
        if weapon.is_some_and(|w| w.is_melee()) {
            return CompanionDecision::Attack { target };
        }

        match castable(me, |s| s.is_attack()) {
            Some(spell) => CompanionDecision::CastDamage {
                spell: spell.id.clone(),
                target,
            },
            // Ranged weapons rank below attack spells.
            None if weapon.is_some() => CompanionDecision::Attack { target },
            None => CompanionDecision::HoldGround,
        }
    }

    fn heal_choice(&self, state: &GameState, me: &Character) -> Option<CompanionDecision> {
        let spell = castable(me, |s| s.is_heal())?;
        // Most injured by ratio; the first one wins ties.
        let patient = state
            .living_party()
            .filter(|ally| ally.hp * 2 < ally.max_hp)
            .fold(None::<&Character>, |best, ally| match best {
                Some(b) if b.hp_ratio() <= ally.hp_ratio() => Some(b),
                _ => Some(ally),
            })?;
        Some(CompanionDecision::Heal {
            spell: spell.id.clone(),
            target: patient.id.clone(),
        })
    }

    /// Decide and carry out the decision. The caller ends the turn.
    pub fn take_turn(
        &self,
        actor: &CombatantId,
        resolver: &mut dyn ActionResolver,
    ) -> Result<CompanionDecision, ActionRejected> {
        let decision = self.decide(resolver.state(), actor);
        tracing::debug!(%actor, ?decision, "companion decision");
        match &decision {
            CompanionDecision::Heal { spell, target }
            | CompanionDecision::CastDamage { spell, target } => {
                resolver.cast_spell(actor, spell, target)?;
            }
            CompanionDecision::Attack { target } => {
                resolver.attack(actor, target)?;
            }
            CompanionDecision::HoldGround => {}
        }
        Ok(decision)
    }
}

/// First known spell matching `pred` that could be cast right now.
fn castable(me: &Character, pred: impl Fn(&SpellData) -> bool) -> Option<&'static SpellData> {
    me.known_spell_data().find(|s| pred(s) && me.can_cast(s))
}

/// Enemy behavior: one basic attack per turn against a chosen target.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnemyPolicy {
    pub targeting: EnemyTargeting,
}

impl EnemyPolicy {
    pub fn new(targeting: EnemyTargeting) -> Self {
        Self { targeting }
    }

    pub fn choose_target(&self, state: &GameState) -> Option<CombatantId> {
        match self.targeting {
            EnemyTargeting::PlayerOnly => {
                (!state.player.is_down()).then(|| state.player.id.clone())
            }
            EnemyTargeting::LowestHpAlly => state
                .living_party()
                .min_by_key(|c| c.hp)
                .map(|c| c.id.clone()),
        }
    }

    /// Attack the chosen target. Returns who was attacked, if anyone.
    pub fn take_turn(
        &self,
        actor: &CombatantId,
        resolver: &mut dyn ActionResolver,
    ) -> Result<Option<CombatantId>, ActionRejected> {
        let Some(target) = self.choose_target(resolver.state()) else {
            return Ok(None);
        };
        resolver.attack(actor, &target)?;
        Ok(Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_data::CharacterClass;
    use crate::combatant::Race;
    use crate::rules::AbilityScores;

    fn party_game() -> GameState {
        let mut game = GameState::new_game(
            "Rowan",
            Race::Human,
            CharacterClass::Fighter,
            AbilityScores::new(15, 13, 14, 10, 12, 8),
        );
        game.add_companion("neala").unwrap();
        game.add_companion("elara").unwrap();
        game
    }

    #[test]
    fn test_heal_takes_priority() {
        let mut game = party_game();
        let neala = CombatantId::new("neala");
        {
            let me = game.character_mut(&neala).unwrap();
            me.hp = me.max_hp * 2 / 5;
        }
        let decision = CompanionPolicy.decide(&game, &neala);
        assert_eq!(
            decision,
            CompanionDecision::Heal {
                spell: "cure_wounds".to_string(),
                target: neala,
            }
        );
    }

    #[test]
    fn test_heal_picks_most_injured() {
        let mut game = party_game();
        game.player.hp = 2;
        let elara = CombatantId::new("elara");
        game.character_mut(&elara).unwrap().hp = 1;
        match CompanionPolicy.decide(&game, &CombatantId::new("neala")) {
            CompanionDecision::Heal { target, .. } => assert_eq!(target, elara),
            other => panic!("expected heal, got {other:?}"),
        }
    }

    #[test]
    fn test_no_slot_no_heal() {
        let mut game = party_game();
        game.player.hp = 1;
        let neala = CombatantId::new("neala");
        game.character_mut(&neala).unwrap().spell_slots = Default::default();
        // no enemies either
        assert_eq!(CompanionPolicy.decide(&game, &neala), CompanionDecision::HoldGround);
    }

    #[test]
    fn test_enemy_targeting() {
        let mut game = party_game();
        game.character_mut(&CombatantId::new("elara")).unwrap().hp = 1;
        assert_eq!(
            EnemyPolicy::new(EnemyTargeting::PlayerOnly).choose_target(&game),
            Some(CombatantId::player())
        );
        assert_eq!(
            EnemyPolicy::new(EnemyTargeting::LowestHpAlly).choose_target(&game),
            Some(CombatantId::new("elara"))
        );
        game.player.hp = 0;
        assert_eq!(EnemyPolicy::new(EnemyTargeting::PlayerOnly).choose_target(&game), None);
    }
}
