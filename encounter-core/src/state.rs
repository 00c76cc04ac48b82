//! The whole-game snapshot: player, companions, the combat session if one
//! is running, and the narrative bookkeeping that persists with a save.

use crate::class_data::{self, CharacterClass, Subclass};
use crate::combatant::{
    Character, Combatant, CombatantId, CombatantKind, Enemy, Race, ResourceId, StatusEffectId,
};
use crate::companions;
use crate::config::CombatSettings;
use crate::dice::{self, DieRoller};
use crate::error::StateError;
use crate::items::{self, ConsumableEffect, ItemRef};
use crate::rules::{Ability, AbilityScores};
use crate::session::CombatSession;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_LEVEL: u32 = 20;

pub const STARTING_SCENE: &str = "SCENE_ARRIVAL_HUSHBRIAR";

/// Progress through one quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub stage: u32,
    pub completed: bool,
}

/// Choices made when taking a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelUpChoice {
    /// Used at level 3; ignored when it belongs to another class.
    pub subclass: Option<Subclass>,
    /// Used at ability score improvement levels.
    pub ability_increases: Option<[Ability; 2]>,
}

/// What a level-up changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUpSummary {
    pub level: u32,
    pub hp_gain: i32,
    pub subclass: Option<Subclass>,
    pub ability_increases: Option<[Ability; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub player: Character,
    /// Every recruited companion, in or out of the party.
    pub roster: BTreeMap<CombatantId, Character>,
    /// Active companions, in join order.
    pub party: Vec<CombatantId>,
    pub combat: Option<CombatSession>,
    pub settings: CombatSettings,
    pub pending_level_up: bool,
    pub gold: u32,
    pub current_scene_id: String,
    pub visited_scenes: Vec<String>,
    pub flags: BTreeMap<String, bool>,
    pub reputation: BTreeMap<String, i32>,
    pub relationships: BTreeMap<String, i32>,
    pub quests: BTreeMap<String, QuestProgress>,
}

impl GameState {
    pub fn new(player: Character) -> Self {
        Self {
            player,
            roster: BTreeMap::new(),
            party: Vec::new(),
            combat: None,
            settings: CombatSettings::default(),
            pending_level_up: false,
            gold: 0,
            current_scene_id: STARTING_SCENE.to_string(),
            visited_scenes: Vec::new(),
            flags: BTreeMap::new(),
            reputation: BTreeMap::new(),
            relationships: BTreeMap::new(),
            quests: BTreeMap::new(),
        }
    }

    /// A fresh game: a level-1 player with a healing potion and the class
    /// starting kit equipped.
    pub fn new_game(
        name: impl Into<String>,
        race: Race,
        class: CharacterClass,
        base_scores: AbilityScores,
    ) -> Self {
        let mut player = Character::new(CombatantId::player(), name, race, class, base_scores)
            .with_item("potion_healing");
        for item in class.data().starting_kit {
            player = match items::find_item(item) {
                Some(ItemRef::Weapon(_)) if player.equipped.weapon.is_none() => {
                    player.with_equipped(item)
                }
                Some(ItemRef::Armor(_)) if player.equipped.armor.is_none() => {
                    player.with_equipped(item)
                }
                _ => player.with_item(item),
            };
        }
        Self::new(player)
    }

    pub fn with_settings(mut self, settings: CombatSettings) -> Self {
        self.settings = settings;
        self
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn session(&self) -> Option<&CombatSession> {
        self.combat.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut CombatSession> {
        self.combat.as_mut()
    }

    pub fn in_combat(&self) -> bool {
        self.combat.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn is_companion(&self, id: &CombatantId) -> bool {
        self.party.contains(id) && self.roster.contains_key(id)
    }

    /// Player or active companion.
    pub fn character(&self, id: &CombatantId) -> Option<&Character> {
        if id.is_player() {
            Some(&self.player)
        } else if self.party.contains(id) {
            self.roster.get(id)
        } else {
            None
        }
    }

    pub fn character_mut(&mut self, id: &CombatantId) -> Option<&mut Character> {
        if id.is_player() {
            Some(&mut self.player)
        } else if self.party.contains(id) {
            self.roster.get_mut(id)
        } else {
            None
        }
    }

    pub fn enemy(&self, id: &CombatantId) -> Option<&Enemy> {
        self.combat.as_ref()?.enemy(id)
    }

    pub fn enemy_mut(&mut self, id: &CombatantId) -> Option<&mut Enemy> {
        self.combat.as_mut()?.enemy_mut(id)
    }

    pub fn combatant(&self, id: &CombatantId) -> Option<Combatant<'_>> {
        if id.is_player() {
            Some(Combatant::Player(&self.player))
        } else if let Some(companion) = self.character(id) {
            Some(Combatant::Companion(companion))
        } else {
            self.enemy(id).map(Combatant::Enemy)
        }
    }

    pub fn combatant_kind(&self, id: &CombatantId) -> Option<CombatantKind> {
        self.combatant(id).map(|c| c.kind())
    }

    /// Player first, then companions in party order.
    pub fn party_members(&self) -> impl Iterator<Item = &Character> {
        std::iter::once(&self.player).chain(self.party.iter().filter_map(|id| self.roster.get(id)))
    }

    pub fn living_party(&self) -> impl Iterator<Item = &Character> {
        self.party_members().filter(|c| !c.is_down())
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.combat.iter().flat_map(|s| s.living_enemies())
    }

    // ========================================================================
    // Party
    // ========================================================================

    /// Recruit a companion into the party. A companion seen before keeps its
    /// roster state; a new one is built from its template at the player's
    /// level.
    pub fn add_companion(&mut self, companion_id: &str) -> Result<(), StateError> {
        let id = CombatantId::new(companion_id);
        if self.party.contains(&id) {
            return Ok(());
        }
        if !self.roster.contains_key(&id) {
            let template = companions::get_companion(companion_id)
                .ok_or_else(|| StateError::UnknownCharacter(companion_id.to_string()))?;
            self.roster.insert(id.clone(), template.build());
        }
        self.party.push(id.clone());
        self.sync_companion_level(&id);
        tracing::debug!(companion = %id, "companion joined the party");
        Ok(())
    }

    pub fn remove_companion(&mut self, companion_id: &str) -> bool {
        let before = self.party.len();
        self.party.retain(|id| id.as_str() != companion_id);
        self.party.len() != before
    }

    // ========================================================================
    // Progression
    // ========================================================================

    /// Add XP to the player; returns whether a level-up is now available.
    pub fn gain_xp(&mut self, amount: u32) -> bool {
        self.player.xp += amount;
        if self.player.xp >= self.player.xp_next && self.player.level < MAX_LEVEL {
            self.pending_level_up = true;
        }
        self.pending_level_up
    }

    /// Take one level for the player.
    pub fn level_up_player(&mut self, choice: LevelUpChoice) -> LevelUpSummary {
        let player = &mut self.player;
        let hp_before = player.max_hp;
        player.advance_level();
        let level = player.level;
        player.xp_next = class_data::xp_for_next_level(level);

        let mut subclass = None;
        if level == class_data::SUBCLASS_LEVEL {
            let chosen = choice
                .subclass
                .filter(|s| s.class() == player.class)
                .unwrap_or_else(|| player.class.default_subclass());
            player.subclass = Some(chosen);
            subclass = Some(chosen);
        }

        let mut ability_increases = None;
        if class_data::is_asi_level(level) {
            let picks = choice
                .ability_increases
                .unwrap_or(player.class.data().primary_abilities);
            for ability in picks {
                player.abilities.set(ability, player.abilities.get(ability) + 1);
            }
            ability_increases = Some(picks);
        }

        let hp_gain = player.max_hp - hp_before;
        self.pending_level_up = self.player.xp >= self.player.xp_next && level < MAX_LEVEL;
        tracing::info!(level, hp_gain, "player levelled up");

        LevelUpSummary {
            level,
            hp_gain,
            subclass,
            ability_increases,
        }
    }

    /// Take every level the player's XP allows, with default choices.
    pub fn apply_pending_level_ups(&mut self) -> Vec<LevelUpSummary> {
        let mut summaries = Vec::new();
        while self.player.xp >= self.player.xp_next && self.player.level < MAX_LEVEL {
            summaries.push(self.level_up_player(LevelUpChoice::default()));
        }
        self.pending_level_up = false;
        summaries
    }

    /// Raise every recruited companion to the player's level.
    pub fn sync_party_levels(&mut self) {
        let ids: Vec<CombatantId> = self.roster.keys().cloned().collect();
        for id in ids {
            self.sync_companion_level(&id);
        }
    }

    fn sync_companion_level(&mut self, id: &CombatantId) {
        let target = self.player.level;
        if let Some(companion) = self.roster.get_mut(id) {
            while companion.level < target {
                companion.advance_level();
            }
        }
    }

    // ========================================================================
    // Status Effects
    // ========================================================================

    /// Apply a status to a party member or enemy. Returns false for an
    /// unknown id.
    pub fn apply_status(
        &mut self,
        id: &CombatantId,
        effect: StatusEffectId,
        duration: Option<i32>,
    ) -> bool {
        if let Some(character) = self.character_mut(id) {
            character.statuses.apply(effect, duration);
            true
        } else if let Some(enemy) = self.enemy_mut(id) {
            enemy.statuses.apply(effect, duration);
            true
        } else {
            false
        }
    }

    /// Tick one combatant's statuses, returning what expired.
    pub fn tick_statuses(&mut self, id: &CombatantId) -> Vec<StatusEffectId> {
        if let Some(character) = self.character_mut(id) {
            character.statuses.tick()
        } else if let Some(enemy) = self.enemy_mut(id) {
            enemy.statuses.tick()
        } else {
            Vec::new()
        }
    }

    /// Tick the player and every active companion.
    pub fn tick_party_statuses(&mut self) -> Vec<(CombatantId, StatusEffectId)> {
        let ids: Vec<CombatantId> = std::iter::once(CombatantId::player())
            .chain(self.party.iter().cloned())
            .collect();
        let mut expired = Vec::new();
        for id in ids {
            for effect in self.tick_statuses(&id) {
                expired.push((id.clone(), effect));
            }
        }
        expired
    }

    // ========================================================================
    // Rests
    // ========================================================================

    /// Each party member heals `max(1, hit die + CON)` and recovers Action
    /// Surge. Returns HP restored per member.
    pub fn short_rest(
        &mut self,
        roller: &mut dyn DieRoller,
    ) -> Result<Vec<(CombatantId, i32)>, StateError> {
        if self.in_combat() {
            return Err(StateError::InCombat);
        }
        let ids: Vec<CombatantId> = self.party_members().map(|c| c.id.clone()).collect();
        let mut healed = Vec::new();
        for id in ids {
            if let Some(character) = self.character_mut(&id) {
                let roll = roller.roll_die(character.class.data().hit_die) as i32
                    + character.modifier(Ability::Constitution);
                let restored = character.heal(roll.max(1));
                if let Some(surge) = character.resource_mut(ResourceId::ActionSurge) {
                    surge.restore();
                }
                healed.push((id, restored));
            }
        }
        Ok(healed)
    }

    /// Full HP, spell slots and resources for the whole party.
    pub fn long_rest(&mut self) -> Result<(), StateError> {
        if self.in_combat() {
            return Err(StateError::InCombat);
        }
        let ids: Vec<CombatantId> = self.party_members().map(|c| c.id.clone()).collect();
        for id in ids {
            if let Some(character) = self.character_mut(&id) {
                character.hp = character.max_hp;
                character.spell_slots.recover_all();
                for resource in character.resources.values_mut() {
                    resource.restore();
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Inventory
    // ========================================================================

    fn owner_mut(&mut self, character_id: &CombatantId) -> Result<&mut Character, StateError> {
        if character_id.is_player() {
            return Ok(&mut self.player);
        }
        self.roster
            .get_mut(character_id)
            .ok_or_else(|| StateError::UnknownCharacter(character_id.to_string()))
    }

    pub fn add_item(&mut self, character_id: &CombatantId, item_id: &str) -> Result<(), StateError> {
        if items::find_item(item_id).is_none() {
            return Err(StateError::UnknownItem(item_id.to_string()));
        }
        self.owner_mut(character_id)?.inventory.push(item_id.to_string());
        Ok(())
    }

    /// Remove one copy of an item. Removing an equipped item unequips it.
    pub fn remove_item(&mut self, character_id: &CombatantId, item_id: &str) -> Result<(), StateError> {
        let owner = self.owner_mut(character_id)?;
        let index = owner
            .inventory
            .iter()
            .position(|i| i == item_id)
            .ok_or_else(|| StateError::NotInInventory(item_id.to_string()))?;
        owner.inventory.remove(index);
        if !owner.inventory.iter().any(|i| i == item_id) {
            if owner.equipped.weapon.as_deref() == Some(item_id) {
                owner.equipped.weapon = None;
            }
            if owner.equipped.armor.as_deref() == Some(item_id) {
                owner.equipped.armor = None;
            }
        }
        Ok(())
    }

    pub fn equip_item(&mut self, character_id: &CombatantId, item_id: &str) -> Result<(), StateError> {
        let item = items::find_item(item_id).ok_or_else(|| StateError::UnknownItem(item_id.to_string()))?;
        let owner = self.owner_mut(character_id)?;
        if !owner.inventory.iter().any(|i| i == item_id) {
            return Err(StateError::NotInInventory(item_id.to_string()));
        }
        match item {
            ItemRef::Weapon(_) => owner.equipped.weapon = Some(item_id.to_string()),
            ItemRef::Armor(armor) => {
                if let Some(required) = armor.str_requirement {
                    if owner.abilities.strength < required {
                        return Err(StateError::StrengthTooLow { required });
                    }
                }
                owner.equipped.armor = Some(item_id.to_string());
            }
            ItemRef::Consumable(_) => return Err(StateError::NotEquippable(item_id.to_string())),
        }
        Ok(())
    }

    pub fn unequip_weapon(&mut self, character_id: &CombatantId) -> Result<(), StateError> {
        self.owner_mut(character_id)?.equipped.weapon = None;
        Ok(())
    }

    pub fn unequip_armor(&mut self, character_id: &CombatantId) -> Result<(), StateError> {
        self.owner_mut(character_id)?.equipped.armor = None;
        Ok(())
    }

    /// Use a consumable from a character's inventory. The item is spent
    /// only when it had an effect.
    pub fn use_consumable(
        &mut self,
        character_id: &CombatantId,
        item_id: &str,
        roller: &mut dyn DieRoller,
    ) -> Result<String, StateError> {
        let consumable = items::get_consumable(item_id).ok_or(StateError::NotUsable)?;
        let owner = self.owner_mut(character_id)?;
        if !owner.inventory.iter().any(|i| i == item_id) {
            return Err(StateError::NotInInventory(item_id.to_string()));
        }

        let message = match consumable.effect {
            ConsumableEffect::Heal(amount) => {
                let roll = dice::roll_expression(amount, roller);
                let healed = owner.heal(roll.total);
                format!("Used {} and healed {} HP.", consumable.name, healed)
            }
            ConsumableEffect::CurePoison => {
                if !owner.statuses.remove(StatusEffectId::Poisoned) {
                    return Err(StateError::NotPoisoned);
                }
                format!("Used {}. No longer poisoned.", consumable.name)
            }
            ConsumableEffect::Light => return Err(StateError::NotUsable),
        };
        self.remove_item(character_id, item_id)?;
        Ok(message)
    }

    pub fn add_gold(&mut self, amount: u32) {
        self.gold += amount;
    }

    pub fn spend_gold(&mut self, amount: u32) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }

    // ========================================================================
    // World Bookkeeping
    // ========================================================================

    pub fn change_reputation(&mut self, faction: &str, amount: i32) {
        *self.reputation.entry(faction.to_string()).or_insert(0) += amount;
    }

    pub fn reputation(&self, faction: &str) -> i32 {
        self.reputation.get(faction).copied().unwrap_or(0)
    }

    pub fn change_relationship(&mut self, npc: &str, amount: i32) {
        *self.relationships.entry(npc.to_string()).or_insert(0) += amount;
    }

    pub fn relationship(&self, npc: &str) -> i32 {
        self.relationships.get(npc).copied().unwrap_or(0)
    }

    pub fn set_flag(&mut self, flag: &str, value: bool) {
        self.flags.insert(flag.to_string(), value);
    }

    pub fn flag(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    /// Move a quest to `stage`; reaching `final_stage` completes it.
    pub fn update_quest_stage(&mut self, quest: &str, stage: u32, final_stage: u32) {
        let progress = self.quests.entry(quest.to_string()).or_insert(QuestProgress {
            stage: 0,
            completed: false,
        });
        progress.stage = stage;
        if stage >= final_stage {
            progress.completed = true;
        }
    }

    /// Record a scene change. Party statuses tick on every transition.
    pub fn transition_scene(&mut self, scene_id: &str) -> Vec<(CombatantId, StatusEffectId)> {
        self.current_scene_id = scene_id.to_string();
        if !self.visited_scenes.iter().any(|s| s == scene_id) {
            self.visited_scenes.push(scene_id.to_string());
        }
        self.tick_party_statuses()
    }

    /// Whether standing with a faction is low enough to provoke an ambush.
    pub fn hostile_encounter_check(&self, faction: &str, threshold: i32) -> bool {
        self.reputation(faction) <= threshold
    }
}
