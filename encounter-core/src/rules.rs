//! Dice-driven rules: modifiers, checks, attack rolls, damage typing and
//! NPC stat scaling.
//!
//! Everything here is pure arithmetic over a [`CheckSubject`] and a
//! [`DieRoller`]; nothing in this module knows about sessions or turn order.

use crate::dice::{self, roll_d20, Advantage, DiceExpression, DieRoller};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Abilities
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// A combatant's six scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityScores {
    pub fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: i32) {
        match ability {
            Ability::Strength => self.strength = value,
            Ability::Dexterity => self.dexterity = value,
            Ability::Constitution => self.constitution = value,
            Ability::Intelligence => self.intelligence = value,
            Ability::Wisdom => self.wisdom = value,
            Ability::Charisma => self.charisma = value,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// `floor((score - 10) / 2)`: 8-9 is -1, 10-11 is 0, 20 is +5.
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// `ceil(1 + level / 4)`.
pub fn proficiency_bonus(level: u32) -> i32 {
    1 + level.div_ceil(4) as i32
}

// ============================================================================
// Skills
// ============================================================================

/// Skills with a fixed governing ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Perception,
    Investigation,
    Athletics,
    Stealth,
    Arcana,
    Religion,
    Persuasion,
    Intimidation,
    Medicine,
    Survival,
    Insight,
    Acrobatics,
    History,
    Nature,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Stealth | Skill::Acrobatics => Ability::Dexterity,
            Skill::Investigation
            | Skill::Arcana
            | Skill::Religion
            | Skill::History
            | Skill::Nature => Ability::Intelligence,
            Skill::Perception | Skill::Medicine | Skill::Survival | Skill::Insight => {
                Ability::Wisdom
            }
            Skill::Persuasion | Skill::Intimidation => Ability::Charisma,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Perception => "perception",
            Skill::Investigation => "investigation",
            Skill::Athletics => "athletics",
            Skill::Stealth => "stealth",
            Skill::Arcana => "arcana",
            Skill::Religion => "religion",
            Skill::Persuasion => "persuasion",
            Skill::Intimidation => "intimidation",
            Skill::Medicine => "medicine",
            Skill::Survival => "survival",
            Skill::Insight => "insight",
            Skill::Acrobatics => "acrobatics",
            Skill::History => "history",
            Skill::Nature => "nature",
        }
    }

    pub fn all() -> [Skill; 14] {
        [
            Skill::Perception,
            Skill::Investigation,
            Skill::Athletics,
            Skill::Stealth,
            Skill::Arcana,
            Skill::Religion,
            Skill::Persuasion,
            Skill::Intimidation,
            Skill::Medicine,
            Skill::Survival,
            Skill::Insight,
            Skill::Acrobatics,
            Skill::History,
            Skill::Nature,
        ]
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Skill> {
        let lower = name.trim().to_lowercase();
        Skill::all().into_iter().find(|s| s.name() == lower)
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Governing ability for a skill name; unknown skills fall back to DEX.
pub fn skill_ability(name: &str) -> Ability {
    Skill::from_name(name)
        .map(|s| s.ability())
        .unwrap_or(Ability::Dexterity)
}

// ============================================================================
// Damage Types
// ============================================================================

/// Common damage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

impl DamageType {
    pub fn name(&self) -> &'static str {
        match self {
            DamageType::Slashing => "slashing",
            DamageType::Piercing => "piercing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Thunder => "thunder",
            DamageType::Acid => "acid",
            DamageType::Poison => "poison",
            DamageType::Necrotic => "necrotic",
            DamageType::Radiant => "radiant",
            DamageType::Force => "force",
            DamageType::Psychic => "psychic",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a damage-type multiplier changed a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageAdjustment {
    Normal,
    Vulnerable,
    Resisted,
}

/// Apply vulnerability (x2) or resistance (floor of half). Vulnerability wins
/// when a target somehow has both.
pub fn adjust_for_damage_type(
    raw: i32,
    damage_type: DamageType,
    resistances: &BTreeSet<DamageType>,
    vulnerabilities: &BTreeSet<DamageType>,
) -> (i32, DamageAdjustment) {
    if vulnerabilities.contains(&damage_type) {
        (raw * 2, DamageAdjustment::Vulnerable)
    } else if resistances.contains(&damage_type) {
        (raw.div_euclid(2), DamageAdjustment::Resisted)
    } else {
        (raw, DamageAdjustment::Normal)
    }
}

/// A confirmed hit always deals at least one point.
pub fn confirmed_hit_damage(amount: i32) -> i32 {
    amount.max(1)
}

// ============================================================================
// Checks
// ============================================================================

/// Anything that can make checks, saves and attack rolls.
pub trait CheckSubject {
    fn ability_modifier(&self, ability: Ability) -> i32;

    fn proficiency_bonus(&self) -> i32;

    fn is_proficient_in(&self, skill: Skill) -> bool;

    fn is_blessed(&self) -> bool;

    fn is_poisoned(&self) -> bool;

    fn initiative_modifier(&self) -> i32 {
        self.ability_modifier(Ability::Dexterity)
    }
}

/// Result of a skill check or saving throw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub total: i32,
    /// The d20 face that counted.
    pub roll: u32,
    pub modifier: i32,
    pub note: String,
}

impl CheckResult {
    pub fn meets_dc(&self, dc: i32) -> bool {
        self.total >= dc
    }
}

/// Result of an attack roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRoll {
    pub total: i32,
    pub roll: u32,
    pub modifier: i32,
    pub note: String,
    pub is_critical: bool,
}

/// Result of an initiative roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeRoll {
    pub total: i32,
    pub roll: u32,
    pub modifier: i32,
}

fn bless_bonus(subject: &dyn CheckSubject, roller: &mut dyn DieRoller, note: &mut String) -> i32 {
    if !subject.is_blessed() {
        return 0;
    }
    let die = roller.roll_die(4) as i32;
    note.push_str(&format!(" + {die} (Bless)"));
    die
}

/// Skill check by name. Unknown skills use DEX; proficiency applies when
/// the subject is proficient; poison imposes disadvantage.
pub fn skill_check(
    subject: &dyn CheckSubject,
    skill_name: &str,
    advantage: Advantage,
    roller: &mut dyn DieRoller,
) -> CheckResult {
    let skill = Skill::from_name(skill_name);
    let ability = skill_ability(skill_name);

    let mut modifier = subject.ability_modifier(ability);
    if skill.is_some_and(|s| subject.is_proficient_in(s)) {
        modifier += subject.proficiency_bonus();
    }

    let advantage = if subject.is_poisoned() {
        advantage.combine(Advantage::Disadvantage)
    } else {
        advantage
    };
    let d20 = roll_d20(roller, advantage);
    let mut note = advantage.note().to_string();
    let bless = bless_bonus(subject, roller, &mut note);

    CheckResult {
        total: d20.kept as i32 + modifier + bless,
        roll: d20.kept,
        modifier,
        note,
    }
}

/// Saving throw: ability modifier only, plus bless.
pub fn saving_throw(
    subject: &dyn CheckSubject,
    ability: Ability,
    advantage: Advantage,
    roller: &mut dyn DieRoller,
) -> CheckResult {
    let modifier = subject.ability_modifier(ability);
    let d20 = roll_d20(roller, advantage);
    let mut note = advantage.note().to_string();
    let bless = bless_bonus(subject, roller, &mut note);

    CheckResult {
        total: d20.kept as i32 + modifier + bless,
        roll: d20.kept,
        modifier,
        note,
    }
}

/// Attack roll keyed off an ability plus a proficiency amount.
pub fn attack_roll(
    subject: &dyn CheckSubject,
    ability: Ability,
    proficiency: i32,
    advantage: Advantage,
    crit_threshold: u32,
    roller: &mut dyn DieRoller,
) -> AttackRoll {
    let modifier = subject.ability_modifier(ability) + proficiency;
    attack_roll_with_bonus(subject, modifier, advantage, crit_threshold, roller)
}

/// Attack roll with a precomputed to-hit bonus. Poison forces disadvantage;
/// the face meeting `crit_threshold` is critical.
pub fn attack_roll_with_bonus(
    subject: &dyn CheckSubject,
    to_hit: i32,
    advantage: Advantage,
    crit_threshold: u32,
    roller: &mut dyn DieRoller,
) -> AttackRoll {
    let advantage = if subject.is_poisoned() {
        advantage.combine(Advantage::Disadvantage)
    } else {
        advantage
    };
    let d20 = roll_d20(roller, advantage);
    let mut note = advantage.note().to_string();
    let bless = bless_bonus(subject, roller, &mut note);

    AttackRoll {
        total: d20.kept as i32 + to_hit + bless,
        roll: d20.kept,
        modifier: to_hit,
        note,
        is_critical: d20.kept >= crit_threshold,
    }
}

pub fn initiative_roll(subject: &dyn CheckSubject, roller: &mut dyn DieRoller) -> InitiativeRoll {
    let roll = roller.roll_die(20);
    let modifier = subject.initiative_modifier();
    InitiativeRoll {
        total: roll as i32 + modifier,
        roll,
        modifier,
    }
}

// ============================================================================
// NPC Stat Scaling
// ============================================================================

/// One attack option in a stat block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackAction {
    pub name: String,
    pub to_hit: i32,
    /// Dice notation, e.g. `1d8+2`.
    pub damage: String,
    pub damage_type: DamageType,
}

/// A level-scalable NPC stat block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    pub name: String,
    pub base_level: u32,
    pub hp: i32,
    pub ac: i32,
    /// HP rolled for each level above base.
    pub hp_per_level: String,
    /// To-hit gained per level above base, floored after accumulation.
    pub to_hit_per_level: f32,
    /// Damage modifier gained per level above base, floored after accumulation.
    pub damage_per_level: f32,
    pub actions: Vec<AttackAction>,
    pub xp: u32,
    #[serde(default)]
    pub resistances: BTreeSet<DamageType>,
    #[serde(default)]
    pub vulnerabilities: BTreeSet<DamageType>,
}

impl StatBlock {
    pub fn primary_attack(&self) -> Option<&AttackAction> {
        self.actions.first()
    }
}

/// Scale a stat block up to `target_level`. At or below the base level the
/// block is returned unchanged.
pub fn scale_stats_to_level(
    template: &StatBlock,
    target_level: u32,
    roller: &mut dyn DieRoller,
) -> StatBlock {
    let mut scaled = template.clone();
    if target_level <= template.base_level {
        return scaled;
    }

    let levels = target_level - template.base_level;
    for _ in 0..levels {
        let gain = dice::roll_expression(&template.hp_per_level, roller);
        scaled.hp += gain.total;
    }

    let to_hit_bonus = (levels as f32 * template.to_hit_per_level).floor() as i32;
    let damage_bonus = (levels as f32 * template.damage_per_level).floor() as i32;

    for action in &mut scaled.actions {
        action.to_hit += to_hit_bonus;
        match DiceExpression::parse(&action.damage) {
            Ok(expr) => {
                action.damage = expr.with_modifier(expr.modifier + damage_bonus).to_string();
            }
            Err(err) => {
                tracing::warn!(
                    action = %action.name,
                    damage = %action.damage,
                    error = %err,
                    "cannot rescale damage expression"
                );
            }
        }
    }

    tracing::debug!(
        name = %scaled.name,
        target_level,
        hp = scaled.hp,
        to_hit_bonus,
        damage_bonus,
        "scaled stat block"
    );
    scaled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRoller;

    struct Subject {
        scores: AbilityScores,
        level: u32,
        skills: Vec<Skill>,
        blessed: bool,
        poisoned: bool,
    }

    impl Subject {
        fn new(scores: AbilityScores) -> Self {
            Self {
                scores,
                level: 1,
                skills: Vec::new(),
                blessed: false,
                poisoned: false,
            }
        }
    }

    impl CheckSubject for Subject {
        fn ability_modifier(&self, ability: Ability) -> i32 {
            self.scores.modifier(ability)
        }
        fn proficiency_bonus(&self) -> i32 {
            proficiency_bonus(self.level)
        }
        fn is_proficient_in(&self, skill: Skill) -> bool {
            self.skills.contains(&skill)
        }
        fn is_blessed(&self) -> bool {
            self.blessed
        }
        fn is_poisoned(&self) -> bool {
            self.poisoned
        }
    }

    fn warden() -> StatBlock {
        StatBlock {
            name: "Warden".to_string(),
            base_level: 1,
            hp: 18,
            ac: 13,
            hp_per_level: "1d8".to_string(),
            to_hit_per_level: 0.5,
            damage_per_level: 0.5,
            actions: vec![AttackAction {
                name: "Blade".to_string(),
                to_hit: 4,
                damage: "1d8+2".to_string(),
                damage_type: DamageType::Slashing,
            }],
            xp: 100,
            resistances: BTreeSet::new(),
            vulnerabilities: BTreeSet::new(),
        }
    }

    #[test]
    fn test_ability_modifier_table() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(20), 5);
        assert_eq!(ability_modifier(1), -5);
    }

    #[test]
    fn test_proficiency_bonus_by_level() {
        assert_eq!(proficiency_bonus(1), 2);
        assert_eq!(proficiency_bonus(4), 2);
        assert_eq!(proficiency_bonus(5), 3);
        assert_eq!(proficiency_bonus(9), 4);
        assert_eq!(proficiency_bonus(17), 6);
    }

    #[test]
    fn test_unknown_skill_uses_dex() {
        assert_eq!(skill_ability("juggling"), Ability::Dexterity);
        assert_eq!(skill_ability("Athletics"), Ability::Strength);
        assert_eq!(skill_ability("insight"), Ability::Wisdom);
    }

    #[test]
    fn test_skill_check_adds_proficiency() {
        let mut subject = Subject::new(AbilityScores::new(10, 10, 10, 10, 14, 10));
        subject.skills.push(Skill::Perception);
        let mut roller = ScriptedRoller::new([11]);

        let result = skill_check(&subject, "perception", Advantage::Normal, &mut roller);
        assert_eq!(result.roll, 11);
        assert_eq!(result.modifier, 4);
        assert_eq!(result.total, 15);
    }

    #[test]
    fn test_poison_imposes_disadvantage_on_checks() {
        let mut subject = Subject::new(AbilityScores::default());
        subject.poisoned = true;
        let mut roller = ScriptedRoller::new([18, 3]);

        let result = skill_check(&subject, "stealth", Advantage::Normal, &mut roller);
        assert_eq!(result.roll, 3);
        assert!(result.note.contains("Disadvantage"));
    }

    #[test]
    fn test_poison_cancels_advantage() {
        let mut subject = Subject::new(AbilityScores::default());
        subject.poisoned = true;
        let mut roller = ScriptedRoller::new([18, 3]);

        let result = skill_check(&subject, "stealth", Advantage::Advantage, &mut roller);
        assert_eq!(result.roll, 18);
        assert_eq!(result.note, "");
    }

    #[test]
    fn test_bless_adds_d4_to_saves() {
        let mut subject = Subject::new(AbilityScores::new(10, 10, 14, 10, 10, 10));
        subject.blessed = true;
        let mut roller = ScriptedRoller::new([10, 3]);

        let result = saving_throw(
            &subject,
            Ability::Constitution,
            Advantage::Normal,
            &mut roller,
        );
        assert_eq!(result.total, 10 + 2 + 3);
        assert!(result.note.contains("Bless"));
    }

    #[test]
    fn test_attack_critical_threshold() {
        let subject = Subject::new(AbilityScores::new(16, 10, 10, 10, 10, 10));

        let mut roller = ScriptedRoller::new([19]);
        let roll = attack_roll(&subject, Ability::Strength, 2, Advantage::Normal, 20, &mut roller);
        assert!(!roll.is_critical);
        assert_eq!(roll.total, 19 + 3 + 2);

        let mut roller = ScriptedRoller::new([19]);
        let roll = attack_roll(&subject, Ability::Strength, 2, Advantage::Normal, 19, &mut roller);
        assert!(roll.is_critical);
    }

    #[test]
    fn test_poisoned_attacker_rolls_low() {
        let mut subject = Subject::new(AbilityScores::default());
        subject.poisoned = true;
        let mut roller = ScriptedRoller::new([20, 2]);

        let roll = attack_roll_with_bonus(&subject, 3, Advantage::Normal, 20, &mut roller);
        assert_eq!(roll.roll, 2);
        assert!(!roll.is_critical);
    }

    #[test]
    fn test_initiative_uses_dex() {
        let subject = Subject::new(AbilityScores::new(10, 16, 10, 10, 10, 10));
        let mut roller = ScriptedRoller::new([7]);
        let init = initiative_roll(&subject, &mut roller);
        assert_eq!(init.total, 10);
        assert_eq!(init.modifier, 3);
    }

    #[test]
    fn test_resistance_and_vulnerability() {
        let poison: BTreeSet<_> = [DamageType::Poison].into_iter().collect();
        let none = BTreeSet::new();

        assert_eq!(
            adjust_for_damage_type(10, DamageType::Poison, &poison, &none),
            (5, DamageAdjustment::Resisted)
        );
        assert_eq!(
            adjust_for_damage_type(7, DamageType::Poison, &poison, &none),
            (3, DamageAdjustment::Resisted)
        );
        assert_eq!(
            adjust_for_damage_type(7, DamageType::Poison, &none, &poison),
            (14, DamageAdjustment::Vulnerable)
        );
        assert_eq!(
            adjust_for_damage_type(7, DamageType::Fire, &poison, &none),
            (7, DamageAdjustment::Normal)
        );
        assert_eq!(confirmed_hit_damage(0), 1);
        assert_eq!(confirmed_hit_damage(6), 6);
    }

    #[test]
    fn test_scaling_at_base_level_is_identity() {
        let block = warden();
        let mut roller = ScriptedRoller::new([]);
        assert_eq!(scale_stats_to_level(&block, 1, &mut roller), block);
        assert_eq!(scale_stats_to_level(&block, 0, &mut roller), block);
    }

    #[test]
    fn test_scaling_adds_hp_and_floors_bonuses() {
        let block = warden();
        let mut roller = ScriptedRoller::new([5, 6, 7]);

        let scaled = scale_stats_to_level(&block, 4, &mut roller);
        assert_eq!(scaled.hp, 18 + 5 + 6 + 7);
        // three levels at 0.5 per level floor to +1
        assert_eq!(scaled.actions[0].to_hit, 5);
        assert_eq!(scaled.actions[0].damage, "1d8+3");
        // template untouched
        assert_eq!(block.actions[0].damage, "1d8+2");
    }

    #[test]
    fn test_scaling_rewrites_negative_and_zero_modifiers() {
        let mut block = warden();
        block.actions[0].damage = "1d6-2".to_string();
        block.damage_per_level = 1.0;
        let mut roller = ScriptedRoller::new([1, 1]);

        let scaled = scale_stats_to_level(&block, 3, &mut roller);
        assert_eq!(scaled.actions[0].damage, "1d6");

        let mut block = warden();
        block.actions[0].damage = "2d4".to_string();
        block.damage_per_level = -1.0;
        let mut roller = ScriptedRoller::new([1]);
        let scaled = scale_stats_to_level(&block, 2, &mut roller);
        assert_eq!(scaled.actions[0].damage, "2d4-1");
    }
}
