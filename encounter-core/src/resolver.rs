//! Action resolution.
//!
//! Resolution is split in two. The `resolve_*` functions read the game
//! state, roll dice and describe the outcome as an [`ActionReport`]: log
//! lines, floating text and a list of [`Effect`]s. [`apply_effects`] then
//! writes those effects back into the [`GameState`]. The engine pays the
//! action's cost before resolving, so a miss still spends the action.
//!
//! [`ActionResolver`] is the command surface shared by the presentation
//! layer, the companion AI and the enemy policy.

use crate::class_data::{self, Subclass};
use crate::combatant::{Character, Combatant, CombatantId, Enemy, StatusEffectId};
use crate::dice::{self, Advantage, DiceExpression, DieRoller};
use crate::error::ActionRejected;
use crate::hooks::LogCategory;
use crate::rules::{self, Ability, DamageAdjustment, DamageType};
use crate::spells::{SpellData, SpellEffect};
use crate::state::GameState;
use serde::{Deserialize, Serialize};

// ============================================================================
// Reports and Effects
// ============================================================================

/// One line for the combat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub text: String,
    pub category: LogCategory,
}

/// A concrete state change produced by resolving an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// HP changed (negative `amount` is damage).
    HpChanged {
        target: CombatantId,
        amount: i32,
        new_current: i32,
        dropped_to_zero: bool,
    },

    StatusApplied {
        target: CombatantId,
        effect: StatusEffectId,
        duration: Option<i32>,
    },

    StatusRemoved {
        target: CombatantId,
        effect: StatusEffectId,
    },

    /// The actor braces; the next hit it takes is halved.
    DefendStarted { actor: CombatantId },

    /// A Defend absorbed a hit and lapses.
    DefendConsumed { target: CombatantId },
}

/// The outcome of one action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionReport {
    pub lines: Vec<LogLine>,
    /// Short floating texts, in order.
    pub floating: Vec<String>,
    pub effects: Vec<Effect>,
}

impl ActionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(text: impl Into<String>, category: LogCategory) -> Self {
        Self::new().with_line(text, category)
    }

    pub fn with_line(mut self, text: impl Into<String>, category: LogCategory) -> Self {
        self.push_line(text, category);
        self
    }

    pub fn with_floating(mut self, text: impl Into<String>) -> Self {
        self.floating.push(text.into());
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn push_line(&mut self, text: impl Into<String>, category: LogCategory) {
        self.lines.push(LogLine {
            text: text.into(),
            category,
        });
    }

    /// Append another report after this one.
    pub fn merge(mut self, other: ActionReport) -> Self {
        self.lines.extend(other.lines);
        self.floating.extend(other.floating);
        self.effects.extend(other.effects);
        self
    }

    /// Whether any effect lowered someone's HP.
    pub fn deals_damage(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, Effect::HpChanged { amount, .. } if *amount < 0))
    }

    /// Total damage dealt to `target` by this report.
    pub fn damage_to(&self, target: &CombatantId) -> i32 {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::HpChanged {
                    target: t, amount, ..
                } if t == target && *amount < 0 => Some(-amount),
                _ => None,
            })
            .sum()
    }

    pub fn text(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

/// Write effects into the game state. Effects on unknown ids are skipped.
pub fn apply_effects(state: &mut GameState, effects: &[Effect]) {
    for effect in effects {
        apply_effect(state, effect);
    }
}

pub fn apply_effect(state: &mut GameState, effect: &Effect) {
    match effect {
        Effect::HpChanged {
            target, new_current, ..
        } => {
            if let Some(character) = state.character_mut(target) {
                character.hp = *new_current;
            } else if let Some(enemy) = state.enemy_mut(target) {
                enemy.hp = *new_current;
            } else {
                tracing::warn!(%target, "hp change for unknown combatant");
            }
        }
        Effect::StatusApplied {
            target,
            effect,
            duration,
        } => {
            state.apply_status(target, *effect, *duration);
        }
        Effect::StatusRemoved { target, effect } => {
            if let Some(character) = state.character_mut(target) {
                character.statuses.remove(*effect);
            } else if let Some(enemy) = state.enemy_mut(target) {
                enemy.statuses.remove(*effect);
            }
        }
        Effect::DefendStarted { actor } => {
            if let Some(session) = state.session_mut() {
                session.defending.insert(actor.clone());
            }
        }
        Effect::DefendConsumed { target } => {
            if let Some(session) = state.session_mut() {
                session.defending.remove(target);
            }
        }
    }
}

// ============================================================================
// Damage Pipeline
// ============================================================================

/// Resistance or vulnerability, with its log line. The one-point floor is
/// left to the caller.
fn type_adjusted(
    report: &mut ActionReport,
    target: Combatant<'_>,
    raw: i32,
    damage_type: DamageType,
) -> i32 {
    let (amount, adjustment) =
        rules::adjust_for_damage_type(raw, damage_type, target.resistances(), target.vulnerabilities());
    match adjustment {
        DamageAdjustment::Vulnerable => report.push_line(
            format!("{} is vulnerable to {}! Damage doubled.", target.name(), damage_type),
            LogCategory::Combat,
        ),
        DamageAdjustment::Resisted => report.push_line(
            format!("{} resists {}. Damage halved.", target.name(), damage_type),
            LogCategory::Combat,
        ),
        DamageAdjustment::Normal => {}
    }
    amount
}

/// Damage for a confirmed hit: type adjustment, then at least one point.
fn adjusted_damage(
    report: &mut ActionReport,
    target: Combatant<'_>,
    raw: i32,
    damage_type: DamageType,
) -> i32 {
    rules::confirmed_hit_damage(type_adjusted(report, target, raw, damage_type))
}

fn hp_loss(target: Combatant<'_>, amount: i32) -> Effect {
    let new_current = target.hp() - amount;
    Effect::HpChanged {
        target: target.id().clone(),
        amount: -amount,
        new_current,
        dropped_to_zero: target.hp() > 0 && new_current <= 0,
    }
}

fn hp_gain(target: Combatant<'_>, amount: i32) -> (i32, Effect) {
    let start = target.hp().max(0);
    let new_current = (start + amount.max(0)).min(target.max_hp());
    let healed = new_current - start;
    let effect = Effect::HpChanged {
        target: target.id().clone(),
        amount: healed,
        new_current,
        dropped_to_zero: false,
    };
    (healed, effect)
}

fn malformed(report: ActionReport, what: &str, notation: &str) -> ActionReport {
    tracing::warn!(what, notation, "skipping effect with malformed dice");
    report.with_line(format!("The {what} has no effect."), LogCategory::System)
}

// ============================================================================
// Resolution
// ============================================================================

/// A weapon attack by a player or companion. Critical hits double the
/// weapon dice; rogues add sneak attack dice to every hit.
pub fn resolve_weapon_attack(
    attacker: &Character,
    target: Combatant<'_>,
    roller: &mut dyn DieRoller,
) -> ActionReport {
    let weapon = attacker.weapon();
    let proficiency = if attacker.is_proficient_with(weapon) {
        attacker.proficiency_bonus()
    } else {
        0
    };
    let roll = rules::attack_roll(
        attacker,
        weapon.ability,
        proficiency,
        Advantage::Normal,
        attacker.crit_threshold(),
        roller,
    );

    let mut headline = format!(
        "{} attacks {} with {}: {}{} (vs AC {}).",
        attacker.name,
        target.name(),
        weapon.name,
        roll.total,
        roll.note,
        target.ac()
    );
    if roll.is_critical {
        headline.push_str(" CRITICAL HIT!");
    }
    let mut report = ActionReport::line(headline, LogCategory::Combat);

    if !(roll.is_critical || roll.total >= target.ac()) {
        return report
            .with_line("Miss!", LogCategory::System)
            .with_floating("Miss!");
    }
    if roll.is_critical {
        report = report.with_floating("Critical Hit!");
    }

    let dice = match DiceExpression::parse(weapon.damage) {
        Ok(dice) => dice,
        Err(_) => return malformed(report, "attack", weapon.damage),
    };
    let dice = if roll.is_critical {
        dice.doubled_dice()
    } else {
        dice
    };
    let ability_mod = attacker.modifier(weapon.ability);
    let mut raw = dice.with_modifier(dice.modifier + ability_mod).roll_with(roller).total;

    if attacker.class.has_sneak_attack() {
        let count = class_data::sneak_attack_dice(attacker.level);
        let sneak = DiceExpression::new(count, 6, 0).roll_with(roller).total;
        raw += sneak;
        report.push_line(format!("Sneak Attack! +{sneak} damage."), LogCategory::Combat);
    }

    let dealt = adjusted_damage(&mut report, target, raw, weapon.damage_type);
    report
        .with_line(format!("Hit! Dealt {dealt} damage."), LogCategory::Combat)
        .with_floating(dealt.to_string())
        .with_effect(hp_loss(target, dealt))
}

/// Cast a spell whose cost has already been paid.
pub fn resolve_spell(
    caster: &Character,
    spell: &SpellData,
    target: Combatant<'_>,
    roller: &mut dyn DieRoller,
) -> ActionReport {
    match &spell.effect {
        SpellEffect::Heal { amount } => resolve_heal_spell(caster, spell, amount, target, roller),
        SpellEffect::Attack {
            damage,
            damage_type,
        } => resolve_spell_attack(caster, spell, damage, *damage_type, target, roller),
        SpellEffect::Save {
            ability,
            damage,
            damage_type,
        } => resolve_save_spell(caster, spell, *ability, damage, *damage_type, target, roller),
    }
}

fn resolve_heal_spell(
    caster: &Character,
    spell: &SpellData,
    amount: &str,
    target: Combatant<'_>,
    roller: &mut dyn DieRoller,
) -> ActionReport {
    let report = ActionReport::new();
    let roll = dice::roll_expression(amount, roller);
    if roll.is_error() {
        return malformed(report, "spell", amount);
    }
    let bonus = match caster.subclass {
        Some(Subclass::Life) => 2 + spell.level as i32,
        _ => 0,
    };
    let (healed, effect) = hp_gain(target, roll.total + bonus);
    report
        .with_line(
            format!(
                "{} casts {} on {}, restoring {} HP.",
                caster.name,
                spell.name,
                target.name(),
                healed
            ),
            LogCategory::Gain,
        )
        .with_floating(format!("+{healed}"))
        .with_effect(effect)
}

fn resolve_spell_attack(
    caster: &Character,
    spell: &SpellData,
    damage: &str,
    damage_type: DamageType,
    target: Combatant<'_>,
    roller: &mut dyn DieRoller,
) -> ActionReport {
    let roll = rules::attack_roll(
        caster,
        caster.casting_ability(),
        caster.proficiency_bonus(),
        Advantage::Normal,
        20,
        roller,
    );
    let mut headline = format!(
        "{} casts {} at {}: {}{} (vs AC {}).",
        caster.name,
        spell.name,
        target.name(),
        roll.total,
        roll.note,
        target.ac()
    );
    if roll.is_critical {
        headline.push_str(" CRITICAL HIT!");
    }
    let mut report = ActionReport::line(headline, LogCategory::Combat);

    if !(roll.is_critical || roll.total >= target.ac()) {
        return report
            .with_line("Miss!", LogCategory::System)
            .with_floating("Miss!");
    }

    let dice = match DiceExpression::parse(damage) {
        Ok(dice) => dice,
        Err(_) => return malformed(report, "spell", damage),
    };
    let dice = if roll.is_critical {
        dice.doubled_dice()
    } else {
        dice
    };
    let raw = dice.roll_with(roller).total;
    let dealt = adjusted_damage(&mut report, target, raw, damage_type);
    report.push_line(format!("Hit! Dealt {dealt} damage."), LogCategory::Combat);
    report
        .with_floating(dealt.to_string())
        .with_effect(hp_loss(target, dealt))
}

fn resolve_save_spell(
    caster: &Character,
    spell: &SpellData,
    ability: Ability,
    damage: &str,
    damage_type: DamageType,
    target: Combatant<'_>,
    roller: &mut dyn DieRoller,
) -> ActionReport {
    let dc = caster.spell_save_dc();
    let save = rules::saving_throw(target.as_check_subject(), ability, Advantage::Normal, roller);
    let saved = save.meets_dc(dc);
    let mut report = ActionReport::line(
        format!(
            "{} casts {}. {} makes a {} save: {}{} vs DC {}.",
            caster.name,
            spell.name,
            target.name(),
            ability.abbreviation(),
            save.total,
            save.note,
            dc
        ),
        if saved {
            LogCategory::CheckFail
        } else {
            LogCategory::CheckSuccess
        },
    );

    let roll = dice::roll_expression(damage, roller);
    if roll.is_error() {
        return malformed(report, "spell", damage);
    }

    let dealt = if saved {
        // Half on a successful save, with no minimum.
        let half = type_adjusted(&mut report, target, roll.total, damage_type) / 2;
        if half == 0 {
            return report.with_line(format!("{} shrugs it off.", target.name()), LogCategory::System);
        }
        report.push_line(
            format!("{} saves for half: {} damage.", target.name(), half),
            LogCategory::Combat,
        );
        half
    } else {
        let dealt = adjusted_damage(&mut report, target, roll.total, damage_type);
        report.push_line(format!("Hit! Dealt {dealt} damage."), LogCategory::Combat);
        dealt
    };
    report
        .with_floating(dealt.to_string())
        .with_effect(hp_loss(target, dealt))
}

/// An enemy's basic attack. Enemies crit on a natural 20.
pub fn resolve_enemy_attack(
    enemy: &Enemy,
    target: Combatant<'_>,
    defending: bool,
    roller: &mut dyn DieRoller,
) -> ActionReport {
    let target_is_player = target.id().is_player();
    let opener = if target_is_player {
        format!("{} attacks!", enemy.name)
    } else {
        format!("{} attacks {}!", enemy.name, target.name())
    };
    let mut report = ActionReport::line(opener, LogCategory::Combat);

    let roll = rules::attack_roll_with_bonus(enemy, enemy.attack_bonus, Advantage::Normal, 20, roller);
    if !(roll.is_critical || roll.total >= target.ac()) {
        return report
            .with_line(format!("{} missed!", enemy.name), LogCategory::System)
            .with_floating("Miss!");
    }
    if roll.is_critical {
        report.push_line("CRITICAL HIT!", LogCategory::Combat);
    }

    let dice = match DiceExpression::parse(&enemy.damage) {
        Ok(dice) => dice,
        Err(_) => return malformed(report, "attack", &enemy.damage),
    };
    let dice = if roll.is_critical {
        dice.doubled_dice()
    } else {
        dice
    };
    let mut raw = dice.roll_with(roller).total;

    if defending {
        raw /= 2;
        report.push_line("Defended! Damage halved.", LogCategory::Gain);
        report = report.with_effect(Effect::DefendConsumed {
            target: target.id().clone(),
        });
    }

    let dealt = adjusted_damage(&mut report, target, raw, enemy.damage_type);
    let took = if target_is_player {
        format!("You took {dealt} damage.")
    } else {
        format!("{} took {} damage.", target.name(), dealt)
    };
    report = report
        .with_line(took, LogCategory::Combat)
        .with_floating(dealt.to_string())
        .with_effect(hp_loss(target, dealt));

    if let Some(rider) = enemy.on_hit {
        if roller.roll_die(100) <= rider.chance_percent {
            report = report
                .with_line(
                    format!("{} is {}!", target.name(), rider.effect.name()),
                    LogCategory::Combat,
                )
                .with_floating(format!("{}!", rider.effect.name()))
                .with_effect(Effect::StatusApplied {
                    target: target.id().clone(),
                    effect: rider.effect,
                    duration: None,
                });
        }
    }
    report
}

/// Second Wind: heal `d10 + level` on the user.
pub fn resolve_second_wind(user: &Character, roller: &mut dyn DieRoller) -> ActionReport {
    let roll = roller.roll_die(10) as i32 + user.level as i32;
    let (healed, effect) = hp_gain(Combatant::Player(user), roll);
    ActionReport::line(
        format!("Used Second Wind and recovered {healed} HP."),
        LogCategory::Gain,
    )
    .with_floating(format!("+{healed}"))
    .with_effect(effect)
}

// ============================================================================
// Command Surface
// ============================================================================

/// Rogue bonus-action options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CunningAction {
    Dash,
    Disengage,
    Hide,
}

impl CunningAction {
    pub fn name(&self) -> &'static str {
        match self {
            CunningAction::Dash => "Dash",
            CunningAction::Disengage => "Disengage",
            CunningAction::Hide => "Hide",
        }
    }
}

/// Combat commands. Every call names its acting combatant explicitly and
/// either resolves fully or is rejected without changing anything.
pub trait ActionResolver {
    fn state(&self) -> &GameState;

    /// Weapon attack for party members, basic attack for enemies.
    fn attack(
        &mut self,
        actor: &CombatantId,
        target: &CombatantId,
    ) -> Result<ActionReport, ActionRejected>;

    fn cast_spell(
        &mut self,
        actor: &CombatantId,
        spell_id: &str,
        target: &CombatantId,
    ) -> Result<ActionReport, ActionRejected>;

    /// Named limited-use feature, such as `second_wind` or `action_surge`.
    fn use_ability(
        &mut self,
        actor: &CombatantId,
        ability_id: &str,
    ) -> Result<ActionReport, ActionRejected>;

    fn defend(&mut self, actor: &CombatantId) -> Result<ActionReport, ActionRejected>;

    fn flee(&mut self, actor: &CombatantId) -> Result<ActionReport, ActionRejected>;

    fn cunning_action(
        &mut self,
        actor: &CombatantId,
        action: CunningAction,
    ) -> Result<ActionReport, ActionRejected>;

    fn end_turn(&mut self, actor: &CombatantId) -> Result<ActionReport, ActionRejected>;
}
