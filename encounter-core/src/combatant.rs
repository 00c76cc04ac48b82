//! Combatant model: characters (player and companions), enemy instances,
//! statuses, limited-use resources and spell slots.

use crate::bestiary::{EnemyTemplate, OnHitRider};
use crate::class_data::{CharacterClass, Subclass};
use crate::items::{self, WeaponData};
use crate::rules::{
    self, Ability, AbilityScores, CheckSubject, DamageType, Skill, StatBlock,
};
use crate::spells::{self, SpellData};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// ID Types
// ============================================================================

/// Stable combatant identifier: `"player"`, a companion key, or
/// `"<templateId>_<spawnIndex>"` for enemies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(pub String);

impl CombatantId {
    pub const PLAYER: &'static str = "player";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn player() -> Self {
        Self::new(Self::PLAYER)
    }

    pub fn enemy(template_id: &str, spawn_index: usize) -> Self {
        Self(format!("{template_id}_{spawn_index}"))
    }

    pub fn is_player(&self) -> bool {
        self.0 == Self::PLAYER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CombatantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Status Effects
// ============================================================================

/// Known status effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEffectId {
    /// Disadvantage on attack rolls and ability checks.
    Poisoned,
    /// +1d4 to attack rolls and saving throws.
    Blessed,
    /// Lingering infection; tracked but has no roll effect in combat.
    SporeSickness,
}

impl StatusEffectId {
    pub fn name(&self) -> &'static str {
        match self {
            StatusEffectId::Poisoned => "Poisoned",
            StatusEffectId::Blessed => "Blessed",
            StatusEffectId::SporeSickness => "Spore Sickness",
        }
    }

    pub fn default_duration(&self) -> i32 {
        match self {
            StatusEffectId::Poisoned => 3,
            StatusEffectId::Blessed => 5,
            StatusEffectId::SporeSickness => 10,
        }
    }
}

/// A status effect with its remaining duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStatus {
    pub effect: StatusEffectId,
    pub remaining: i32,
}

/// Ordered list of active statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffects(Vec<ActiveStatus>);

impl StatusEffects {
    /// Apply an effect; re-applying keeps the longer remaining duration.
    pub fn apply(&mut self, effect: StatusEffectId, duration: Option<i32>) {
        let duration = duration.unwrap_or_else(|| effect.default_duration());
        if let Some(existing) = self.0.iter_mut().find(|s| s.effect == effect) {
            existing.remaining = existing.remaining.max(duration);
        } else {
            self.0.push(ActiveStatus {
                effect,
                remaining: duration,
            });
        }
    }

    pub fn has(&self, effect: StatusEffectId) -> bool {
        self.0.iter().any(|s| s.effect == effect)
    }

    pub fn remove(&mut self, effect: StatusEffectId) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s.effect != effect);
        self.0.len() != before
    }

    /// Count every effect down by one and drop the expired ones.
    pub fn tick(&mut self) -> Vec<StatusEffectId> {
        let mut expired = Vec::new();
        for status in &mut self.0 {
            status.remaining -= 1;
            if status.remaining <= 0 {
                expired.push(status.effect);
            }
        }
        self.0.retain(|s| s.remaining > 0);
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveStatus> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Resources and Spell Slots
// ============================================================================

/// Named limited-use abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceId {
    SecondWind,
    ActionSurge,
}

impl ResourceId {
    pub fn key(&self) -> &'static str {
        match self {
            ResourceId::SecondWind => "second_wind",
            ResourceId::ActionSurge => "action_surge",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceId::SecondWind => "Second Wind",
            ResourceId::ActionSurge => "Action Surge",
        }
    }

    pub fn from_key(key: &str) -> Option<ResourceId> {
        match key {
            "second_wind" => Some(ResourceId::SecondWind),
            "action_surge" => Some(ResourceId::ActionSurge),
            _ => None,
        }
    }
}

/// Limited use tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub current: u32,
    pub max: u32,
}

impl Resource {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn spend(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn restore(&mut self) {
        self.current = self.max;
    }
}

/// Slots for one spell level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub current: u32,
    pub max: u32,
}

/// Spell slots by spell level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSlots(BTreeMap<u8, SlotInfo>);

impl SpellSlots {
    pub fn from_table(table: &[(u8, u32)]) -> Self {
        Self(
            table
                .iter()
                .map(|&(level, count)| {
                    (
                        level,
                        SlotInfo {
                            current: count,
                            max: count,
                        },
                    )
                })
                .collect(),
        )
    }

    /// Raise the maximums to `table`. Slots already spent stay spent.
    pub fn raise_to(&mut self, table: &[(u8, u32)]) {
        for &(level, max) in table {
            let slot = self.0.entry(level).or_insert(SlotInfo { current: 0, max: 0 });
            let spent = slot.max.saturating_sub(slot.current);
            slot.max = slot.max.max(max);
            slot.current = slot.max.saturating_sub(spent);
        }
    }

    pub fn max(&self, level: u8) -> u32 {
        self.0.get(&level).map(|s| s.max).unwrap_or(0)
    }

    pub fn available(&self, level: u8) -> u32 {
        self.0.get(&level).map(|s| s.current).unwrap_or(0)
    }

    pub fn use_slot(&mut self, level: u8) -> bool {
        match self.0.get_mut(&level) {
            Some(slot) if slot.current > 0 => {
                slot.current -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn recover_all(&mut self) {
        for slot in self.0.values_mut() {
            slot.current = slot.max;
        }
    }
}

// ============================================================================
// Characters
// ============================================================================

/// Playable races.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Race {
    Human,
    Elf,
    Dwarf,
}

impl Race {
    pub fn apply_bonuses(&self, scores: &mut AbilityScores) {
        match self {
            Race::Human => {
                for ability in Ability::all() {
                    scores.set(ability, scores.get(ability) + 1);
                }
            }
            Race::Elf => {
                scores.dexterity += 2;
                scores.intelligence += 1;
            }
            Race::Dwarf => {
                scores.constitution += 2;
                scores.strength += 2;
            }
        }
    }
}

/// Equipped gear, by item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<String>,
    pub armor: Option<String>,
}

/// A player character or companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CombatantId,
    pub name: String,
    pub race: Race,
    pub class: CharacterClass,
    pub subclass: Option<Subclass>,
    pub level: u32,
    pub xp: u32,
    pub xp_next: u32,
    pub abilities: AbilityScores,
    pub skills: Vec<Skill>,
    /// May sit below zero until the next down check.
    pub hp: i32,
    pub max_hp: i32,
    pub equipped: Equipment,
    pub inventory: Vec<String>,
    pub resources: BTreeMap<ResourceId, Resource>,
    pub known_spells: Vec<String>,
    pub spell_slots: SpellSlots,
    pub statuses: StatusEffects,
    #[serde(default)]
    pub resistances: BTreeSet<DamageType>,
    #[serde(default)]
    pub vulnerabilities: BTreeSet<DamageType>,
}

impl Character {
    /// Build a level-1 character. HP is the class hit die plus CON.
    pub fn new(
        id: CombatantId,
        name: impl Into<String>,
        race: Race,
        class: CharacterClass,
        base_scores: AbilityScores,
    ) -> Self {
        let mut abilities = base_scores;
        race.apply_bonuses(&mut abilities);
        let data = class.data();
        let max_hp = (data.hit_die as i32 + abilities.modifier(Ability::Constitution)).max(1);

        let mut character = Self {
            id,
            name: name.into(),
            race,
            class,
            subclass: None,
            level: 1,
            xp: 0,
            xp_next: 300,
            abilities,
            skills: data.skill_proficiencies.to_vec(),
            hp: max_hp,
            max_hp,
            equipped: Equipment::default(),
            inventory: Vec::new(),
            resources: BTreeMap::new(),
            known_spells: data.starting_spells.iter().map(|s| s.to_string()).collect(),
            spell_slots: SpellSlots::from_table(class.spell_slots_at(1)),
            statuses: StatusEffects::default(),
            resistances: BTreeSet::new(),
            vulnerabilities: BTreeSet::new(),
        };
        character.grant_level_features(1);
        character
    }

    pub fn with_subclass(mut self, subclass: Subclass) -> Self {
        self.subclass = Some(subclass);
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        while self.level < level {
            self.advance_level();
        }
        self
    }

    pub fn with_item(mut self, item_id: &str) -> Self {
        self.inventory.push(item_id.to_string());
        self
    }

    /// Add the item to the inventory and equip it in the matching slot.
    pub fn with_equipped(mut self, item_id: &str) -> Self {
        self.inventory.push(item_id.to_string());
        if items::get_weapon(item_id).is_some() {
            self.equipped.weapon = Some(item_id.to_string());
        } else if items::get_armor(item_id).is_some() {
            self.equipped.armor = Some(item_id.to_string());
        }
        self
    }

    pub fn with_spells(mut self, spells: &[&str]) -> Self {
        self.known_spells = spells.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn proficiency_bonus(&self) -> i32 {
        rules::proficiency_bonus(self.level)
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    /// AC from worn armor, or 10 + DEX unarmored.
    pub fn armor_class(&self) -> i32 {
        let dex = self.modifier(Ability::Dexterity);
        match self.equipped.armor.as_deref().and_then(items::get_armor) {
            Some(armor) if armor.adds_dex => armor.ac_base + dex,
            Some(armor) => armor.ac_base,
            None => 10 + dex,
        }
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }

    pub fn hp_ratio(&self) -> f32 {
        (self.hp as f32 / self.max_hp.max(1) as f32).max(0.0)
    }

    /// Restore HP up to the maximum, returning the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let old = self.hp.max(0);
        self.hp = (old + amount.max(0)).min(self.max_hp);
        self.hp - old
    }

    pub fn take_damage(&mut self, amount: i32) {
        self.hp -= amount;
    }

    /// The equipped weapon, or an unarmed strike.
    pub fn weapon(&self) -> &'static WeaponData {
        self.equipped
            .weapon
            .as_deref()
            .and_then(items::get_weapon)
            .unwrap_or(&items::UNARMED)
    }

    pub fn is_proficient_with(&self, weapon: &WeaponData) -> bool {
        self.class
            .data()
            .weapon_proficiencies
            .contains(&weapon.category)
    }

    /// Lowest d20 face that scores a critical hit.
    pub fn crit_threshold(&self) -> u32 {
        match self.subclass {
            Some(Subclass::Champion) => 19,
            _ => 20,
        }
    }

    pub fn casting_ability(&self) -> Ability {
        self.class
            .data()
            .casting_ability
            .unwrap_or(Ability::Intelligence)
    }

    pub fn spell_save_dc(&self) -> i32 {
        8 + self.proficiency_bonus() + self.modifier(self.casting_ability())
    }

    pub fn knows_spell(&self, spell_id: &str) -> bool {
        self.known_spells.iter().any(|s| s == spell_id)
    }

    /// Whether a spell could be cast right now: cantrips are free, leveled
    /// spells need a slot.
    pub fn can_cast(&self, spell: &SpellData) -> bool {
        spell.level == 0 || self.spell_slots.available(spell.level) > 0
    }

    /// Known spells in learned order, resolved against the spell table.
    pub fn known_spell_data(&self) -> impl Iterator<Item = &'static SpellData> + '_ {
        self.known_spells.iter().filter_map(|id| spells::get_spell(id))
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(&id)
    }

    /// Average hit-die HP gain for one level.
    pub fn hp_per_level(&self) -> i32 {
        (self.class.data().hit_die as i32 / 2 + 1 + self.modifier(Ability::Constitution)).max(1)
    }

    /// Gain one level: HP, slots and features. XP bookkeeping is left to
    /// the caller.
    pub fn advance_level(&mut self) {
        self.level += 1;
        let gain = self.hp_per_level();
        self.max_hp += gain;
        self.hp += gain;

        self.spell_slots.raise_to(self.class.spell_slots_at(self.level));
        self.grant_level_features(self.level);
    }

    fn grant_level_features(&mut self, level: u32) {
        for feature in self.class.features_at(level) {
            self.resources.insert(*feature, Resource::new(1));
        }
    }

    pub fn has_status(&self, effect: StatusEffectId) -> bool {
        self.statuses.has(effect)
    }
}

impl CheckSubject for Character {
    fn ability_modifier(&self, ability: Ability) -> i32 {
        self.modifier(ability)
    }

    fn proficiency_bonus(&self) -> i32 {
        Character::proficiency_bonus(self)
    }

    fn is_proficient_in(&self, skill: Skill) -> bool {
        self.skills.contains(&skill)
    }

    fn is_blessed(&self) -> bool {
        self.statuses.has(StatusEffectId::Blessed)
    }

    fn is_poisoned(&self) -> bool {
        self.statuses.has(StatusEffectId::Poisoned)
    }
}

// ============================================================================
// Enemies
// ============================================================================

/// An enemy spawned into a combat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: CombatantId,
    pub template_id: String,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    pub attack_bonus: i32,
    pub initiative_bonus: i32,
    /// Dice notation for the primary attack.
    pub damage: String,
    pub damage_type: DamageType,
    pub xp: u32,
    pub resistances: BTreeSet<DamageType>,
    pub vulnerabilities: BTreeSet<DamageType>,
    pub statuses: StatusEffects,
    /// Telegraphed intent text shown while the enemy's turn is pending.
    pub intent: String,
    pub on_hit: Option<OnHitRider>,
}

impl Enemy {
    pub fn from_template(template: &EnemyTemplate, spawn_index: usize) -> Self {
        Self {
            id: CombatantId::enemy(template.id, spawn_index),
            template_id: template.id.to_string(),
            name: template.name.to_string(),
            hp: template.hp,
            max_hp: template.hp,
            ac: template.ac,
            attack_bonus: template.attack_bonus,
            initiative_bonus: template.initiative_bonus,
            damage: template.damage.to_string(),
            damage_type: template.damage_type,
            xp: template.xp,
            resistances: template.resistances.iter().copied().collect(),
            vulnerabilities: template.vulnerabilities.iter().copied().collect(),
            statuses: StatusEffects::default(),
            intent: String::new(),
            on_hit: template.on_hit,
        }
    }

    /// Spawn from a (possibly level-scaled) NPC stat block. The first
    /// attack action becomes the enemy's attack; a block without one hits
    /// for `1d4` at +0.
    pub fn from_stat_block(template_id: &str, block: &StatBlock, spawn_index: usize) -> Self {
        let (attack_bonus, damage, damage_type) = match block.primary_attack() {
            Some(action) => (action.to_hit, action.damage.clone(), action.damage_type),
            None => (0, "1d4".to_string(), DamageType::Bludgeoning),
        };
        Self {
            id: CombatantId::enemy(template_id, spawn_index),
            template_id: template_id.to_string(),
            name: block.name.clone(),
            hp: block.hp,
            max_hp: block.hp,
            ac: block.ac,
            attack_bonus,
            initiative_bonus: attack_bonus,
            damage,
            damage_type,
            xp: block.xp,
            resistances: block.resistances.clone(),
            vulnerabilities: block.vulnerabilities.clone(),
            statuses: StatusEffects::default(),
            intent: String::new(),
            on_hit: None,
        }
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }
}

impl CheckSubject for Enemy {
    fn ability_modifier(&self, _ability: Ability) -> i32 {
        0
    }

    fn proficiency_bonus(&self) -> i32 {
        0
    }

    fn is_proficient_in(&self, _skill: Skill) -> bool {
        false
    }

    fn is_blessed(&self) -> bool {
        self.statuses.has(StatusEffectId::Blessed)
    }

    fn is_poisoned(&self) -> bool {
        self.statuses.has(StatusEffectId::Poisoned)
    }

    fn initiative_modifier(&self) -> i32 {
        self.initiative_bonus
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// Which side of the fight an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatantKind {
    Player,
    Companion,
    Enemy,
}

/// A borrowed view over any combatant, for code that only needs the shared
/// capabilities.
#[derive(Debug, Clone, Copy)]
pub enum Combatant<'a> {
    Player(&'a Character),
    Companion(&'a Character),
    Enemy(&'a Enemy),
}

impl<'a> Combatant<'a> {
    pub fn kind(&self) -> CombatantKind {
        match self {
            Combatant::Player(_) => CombatantKind::Player,
            Combatant::Companion(_) => CombatantKind::Companion,
            Combatant::Enemy(_) => CombatantKind::Enemy,
        }
    }

    pub fn id(&self) -> &'a CombatantId {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => &c.id,
            Combatant::Enemy(e) => &e.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => &c.name,
            Combatant::Enemy(e) => &e.name,
        }
    }

    pub fn hp(&self) -> i32 {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => c.hp,
            Combatant::Enemy(e) => e.hp,
        }
    }

    pub fn max_hp(&self) -> i32 {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => c.max_hp,
            Combatant::Enemy(e) => e.max_hp,
        }
    }

    pub fn ac(&self) -> i32 {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => c.armor_class(),
            Combatant::Enemy(e) => e.ac,
        }
    }

    pub fn statuses(&self) -> &'a StatusEffects {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => &c.statuses,
            Combatant::Enemy(e) => &e.statuses,
        }
    }

    pub fn resistances(&self) -> &'a BTreeSet<DamageType> {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => &c.resistances,
            Combatant::Enemy(e) => &e.resistances,
        }
    }

    pub fn vulnerabilities(&self) -> &'a BTreeSet<DamageType> {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => &c.vulnerabilities,
            Combatant::Enemy(e) => &e.vulnerabilities,
        }
    }

    pub fn is_down(&self) -> bool {
        self.hp() <= 0
    }

    pub fn as_check_subject(&self) -> &'a dyn CheckSubject {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => *c,
            Combatant::Enemy(e) => *e,
        }
    }

    pub fn as_character(&self) -> Option<&'a Character> {
        match self {
            Combatant::Player(c) | Combatant::Companion(c) => Some(c),
            Combatant::Enemy(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter() -> Character {
        Character::new(
            CombatantId::player(),
            "Rowan",
            Race::Human,
            CharacterClass::Fighter,
            AbilityScores::new(15, 13, 14, 10, 12, 8),
        )
    }

    #[test]
    fn test_enemy_ids_disambiguate_spawns() {
        assert_eq!(CombatantId::enemy("fungal_beast", 0).as_str(), "fungal_beast_0");
        assert_eq!(CombatantId::enemy("fungal_beast", 1).as_str(), "fungal_beast_1");
        assert!(CombatantId::player().is_player());
    }

    #[test]
    fn test_new_character_derives_hp_and_features() {
        let hero = fighter();
        // human bonus makes CON 15 (+2); fighter d10
        assert_eq!(hero.max_hp, 12);
        assert_eq!(hero.hp, 12);
        assert_eq!(hero.resource(ResourceId::SecondWind), Some(&Resource::new(1)));
        assert!(hero.resource(ResourceId::ActionSurge).is_none());
        assert!(hero.skills.contains(&Skill::Athletics));
    }

    #[test]
    fn test_level_up_grants_action_surge() {
        let hero = fighter().with_level(2);
        assert_eq!(hero.level, 2);
        assert_eq!(hero.max_hp, 12 + 5 + 1 + 2);
        assert!(hero.resource(ResourceId::ActionSurge).is_some());
    }

    #[test]
    fn test_heal_is_capped() {
        let mut hero = fighter();
        hero.take_damage(5);
        assert_eq!(hero.heal(100), 5);
        assert_eq!(hero.hp, hero.max_hp);
    }

    #[test]
    fn test_heal_from_negative_starts_at_zero() {
        let mut hero = fighter();
        hero.take_damage(hero.max_hp + 3);
        assert!(hero.is_down());
        assert_eq!(hero.heal(4), 4);
        assert_eq!(hero.hp, 4);
    }

    #[test]
    fn test_armor_class() {
        let hero = fighter();
        assert_eq!(hero.armor_class(), 10 + 2);
        let hero = fighter().with_equipped("chainmail");
        assert_eq!(hero.armor_class(), 16);
        let hero = fighter().with_equipped("leather_armor");
        assert_eq!(hero.armor_class(), 11 + 2);
    }

    #[test]
    fn test_unarmed_fallback() {
        let hero = fighter();
        assert_eq!(hero.weapon().id, "unarmed");
        let hero = fighter().with_equipped("longsword");
        assert_eq!(hero.weapon().id, "longsword");
    }

    #[test]
    fn test_champion_crits_on_19() {
        assert_eq!(fighter().crit_threshold(), 20);
        assert_eq!(fighter().with_subclass(Subclass::Champion).crit_threshold(), 19);
    }

    #[test]
    fn test_status_reapply_keeps_longer_duration() {
        let mut statuses = StatusEffects::default();
        statuses.apply(StatusEffectId::Poisoned, Some(5));
        statuses.apply(StatusEffectId::Poisoned, None);
        assert_eq!(statuses.iter().next().map(|s| s.remaining), Some(5));
        statuses.apply(StatusEffectId::Poisoned, Some(8));
        assert_eq!(statuses.iter().next().map(|s| s.remaining), Some(8));
    }

    #[test]
    fn test_status_tick_expires() {
        let mut statuses = StatusEffects::default();
        statuses.apply(StatusEffectId::Blessed, Some(1));
        statuses.apply(StatusEffectId::Poisoned, Some(2));
        assert_eq!(statuses.tick(), vec![StatusEffectId::Blessed]);
        assert!(statuses.has(StatusEffectId::Poisoned));
        assert_eq!(statuses.tick(), vec![StatusEffectId::Poisoned]);
        assert!(statuses.is_empty());
    }

    #[test]
    fn test_spell_slots() {
        let mut slots = SpellSlots::from_table(&[(1, 2)]);
        assert!(slots.use_slot(1));
        assert!(slots.use_slot(1));
        assert!(!slots.use_slot(1));
        assert!(!slots.use_slot(2));
        slots.recover_all();
        assert_eq!(slots.available(1), 2);
    }

    #[test]
    fn test_level_up_keeps_spent_slots_spent() {
        let mut cleric = Character::new(
            CombatantId::new("neala"),
            "Neala",
            Race::Human,
            CharacterClass::Cleric,
            AbilityScores::new(12, 10, 13, 10, 15, 11),
        );
        assert!(cleric.spell_slots.use_slot(1));
        assert_eq!(cleric.spell_slots.available(1), 1);

        cleric.advance_level();
        assert_eq!(cleric.spell_slots.max(1), 3);
        assert_eq!(cleric.spell_slots.available(1), 2);

        // level 3 opens 2nd-level slots, which start full
        cleric.advance_level();
        assert_eq!(cleric.spell_slots.available(1), 3);
        assert_eq!(cleric.spell_slots.available(2), 2);

        cleric.spell_slots.recover_all();
        assert_eq!(cleric.spell_slots.available(1), 4);
    }

    #[test]
    fn test_combatant_view() {
        let hero = fighter();
        let view = Combatant::Player(&hero);
        assert_eq!(view.kind(), CombatantKind::Player);
        assert_eq!(view.name(), "Rowan");
        assert_eq!(view.ac(), hero.armor_class());
        assert!(view.as_character().is_some());
    }
}
