//! The combat scheduler.
//!
//! [`CombatEngine`] owns the [`GameState`], the dice and the host's
//! [`CombatHooks`]. It starts sessions, dispatches turns, runs companion and
//! enemy policies through deferred [`Continuation`]s and ends the session
//! on victory, defeat, flight or a turn-state fault.
//!
//! Non-player steps never run inline. Dispatch parks one continuation on
//! the session; [`CombatEngine::advance`] runs it, and
//! [`CombatEngine::run_pending`] does the same after the presentation
//! delay. Player commands are refused while a step is parked, so two turns
//! are never in flight together.

use crate::bestiary;
use crate::class_data::CharacterClass;
use crate::combatant::{Combatant, CombatantId, CombatantKind, Enemy, ResourceId};
use crate::dice::{DieRoller, RngRoller};
use crate::error::{ActionRejected, SessionFault};
use crate::hooks::{CombatHooks, LogCategory, NoopHooks};
use crate::policy::{CompanionDecision, CompanionPolicy, EnemyPolicy};
use crate::resolver::{self, ActionReport, ActionResolver, CunningAction, Effect};
use crate::rules::{self, Ability, InitiativeRoll};
use crate::session::{CombatPhase, CombatSession, Continuation, InitiativeEntry};
use crate::spells;
use crate::state::GameState;

/// Upper bound on turns skipped in one dispatch before giving up.
const MAX_DISPATCH_SKIPS: usize = 256;

const ENEMY_INTENT: &str = "is preparing to attack!";

pub struct CombatEngine<H: CombatHooks = NoopHooks> {
    game: GameState,
    hooks: H,
    roller: Box<dyn DieRoller>,
    companion_policy: CompanionPolicy,
}

impl CombatEngine<NoopHooks> {
    pub fn headless(game: GameState) -> Self {
        Self::new(game, NoopHooks)
    }
}

impl<H: CombatHooks> CombatEngine<H> {
    pub fn new(game: GameState, hooks: H) -> Self {
        Self {
            game,
            hooks,
            roller: Box::new(RngRoller::from_entropy()),
            companion_policy: CompanionPolicy,
        }
    }

    pub fn with_roller(mut self, roller: impl DieRoller + 'static) -> Self {
        self.roller = Box::new(roller);
        self
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn into_parts(self) -> (GameState, H) {
        (self.game, self.hooks)
    }

    pub fn session(&self) -> Option<&CombatSession> {
        self.game.session()
    }

    pub fn phase(&self) -> CombatPhase {
        self.session()
            .map(|s| s.phase)
            .unwrap_or(CombatPhase::NotStarted)
    }

    pub fn is_active(&self) -> bool {
        self.game.in_combat()
    }

    pub fn has_pending(&self) -> bool {
        self.session()
            .is_some_and(|s| s.is_active() && s.pending.is_some())
    }

    /// Whoever's turn it is, while a session is active.
    pub fn current_actor(&self) -> Option<&CombatantId> {
        self.session()
            .filter(|s| s.is_active())
            .and_then(|s| s.current_actor().ok())
    }

    // ========================================================================
    // Session Start
    // ========================================================================

    /// Spawn enemies, roll initiative and dispatch the first turn.
    ///
    /// NPC stat blocks are scaled to the player's level; fixed templates
    /// spawn as written. Unknown ids are skipped with a warning but still
    /// consume their spawn index.
    pub fn start_session(
        &mut self,
        enemy_ids: &[&str],
        win_scene_id: &str,
        lose_scene_id: &str,
    ) -> Result<(), SessionFault> {
        if self.game.in_combat() {
            return Err(SessionFault::AlreadyActive);
        }

        let enemies = self.spawn_enemies(enemy_ids);
        if enemies.is_empty() {
            tracing::warn!(?enemy_ids, "no enemies could be spawned");
            return Err(SessionFault::NoEnemies);
        }

        let retreat = self
            .game
            .settings
            .retreat_scene_id
            .clone()
            .unwrap_or_else(|| lose_scene_id.to_string());
        let mut session = CombatSession::new(enemies, win_scene_id, lose_scene_id, retreat);

        self.log("Combat started!", LogCategory::System);
        let initiative = self.roll_initiative(&session.enemies);
        session.begin(initiative);
        tracing::info!(
            enemies = session.enemies.len(),
            order = ?session.turn_order,
            "combat session started"
        );
        self.game.combat = Some(session);

        self.dispatch();
        Ok(())
    }

    fn spawn_enemies(&mut self, enemy_ids: &[&str]) -> Vec<Enemy> {
        let level = self.game.player.level;
        let mut enemies = Vec::new();
        for (index, id) in enemy_ids.iter().enumerate() {
            if let Some(block) = bestiary::get_npc_stat_block(id) {
                let scaled = rules::scale_stats_to_level(block, level, self.roller.as_mut());
                enemies.push(Enemy::from_stat_block(id, &scaled, index));
            } else if let Some(template) = bestiary::get_enemy(id) {
                enemies.push(Enemy::from_template(template, index));
            } else {
                tracing::warn!(enemy = %id, "unknown enemy template skipped");
            }
        }
        enemies
    }

    /// Player, then living companions in party order, then enemies.
    fn roll_initiative(&mut self, enemies: &[Enemy]) -> Vec<InitiativeEntry> {
        let mut entries = Vec::new();

        let roll = rules::initiative_roll(&self.game.player, self.roller.as_mut());
        self.log(
            format!("You rolled {} for initiative.", roll.total),
            LogCategory::System,
        );
        entries.push(entry(CombatantId::player(), roll));

        let companions: Vec<CombatantId> = self
            .game
            .living_party()
            .skip(1)
            .map(|c| c.id.clone())
            .collect();
        for id in companions {
            if let Some(companion) = self.game.character(&id) {
                let roll = rules::initiative_roll(companion, self.roller.as_mut());
                let line = format!("{} rolled {} for initiative.", companion.name, roll.total);
                self.log(line, LogCategory::System);
                entries.push(entry(id, roll));
            }
        }

        for enemy in enemies {
            let roll = rules::initiative_roll(enemy, self.roller.as_mut());
            self.log(
                format!("{} rolled {} for initiative.", enemy.name, roll.total),
                LogCategory::System,
            );
            entries.push(entry(enemy.id.clone(), roll));
        }
        entries
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Start the current actor's turn. Players (and companions without AI)
    /// wait for commands; everyone else gets a parked continuation. Downed
    /// companions and dead enemies are passed over.
    fn dispatch(&mut self) {
        for _ in 0..MAX_DISPATCH_SKIPS {
            let Some(session) = self.game.combat.as_mut() else {
                return;
            };
            if !session.is_active() || session.pending.is_some() {
                return;
            }
            let actor = match session.current_actor() {
                Ok(actor) => actor.clone(),
                Err(fault) => return self.abort(fault),
            };
            session.begin_turn(&actor);
            let round = session.round;
            tracing::debug!(%actor, round, "dispatching turn");

            match self.game.combatant(&actor) {
                Some(Combatant::Player(_)) => {
                    self.log(format!("Round {round} - Your Turn"), LogCategory::System);
                    self.hooks.on_combat_ui_change(Some(&actor));
                    return;
                }
                Some(Combatant::Companion(companion)) => {
                    if companion.is_down() {
                        if let Err(fault) = self.session_advance() {
                            return self.abort(fault);
                        }
                        continue;
                    }
                    let line = format!("Round {round} - {}'s Turn", companion.name);
                    self.log(line, LogCategory::System);
                    if self.game.settings.companion_ai {
                        self.park(Continuation::CompanionAct(actor.clone()));
                    }
                    self.hooks.on_combat_ui_change(Some(&actor));
                    return;
                }
                Some(Combatant::Enemy(enemy)) => {
                    if enemy.is_down() {
                        let pruned = self
                            .game
                            .session_mut()
                            .map(|s| s.prune_after_turn(&actor));
                        if let Some(Err(fault)) = pruned {
                            return self.abort(fault);
                        }
                        continue;
                    }
                    let line = format!("Round {round} - {}'s Turn", enemy.name);
                    self.log(line, LogCategory::System);
                    if let Some(enemy) = self.game.enemy_mut(&actor) {
                        enemy.intent = ENEMY_INTENT.to_string();
                    }
                    self.park(Continuation::EnemyAct(actor.clone()));
                    self.hooks.on_combat_ui_change(Some(&actor));
                    return;
                }
                None => return self.abort(SessionFault::UnresolvableActor(actor)),
            }
        }
        self.abort(SessionFault::Stalled);
    }

    fn session_advance(&mut self) -> Result<(), SessionFault> {
        match self.game.session_mut() {
            Some(session) => session.advance_turn(),
            None => Err(SessionFault::EmptyTurnOrder),
        }
    }

    /// Park a continuation on an active session.
    fn park(&mut self, step: Continuation) {
        if let Some(session) = self.game.session_mut().filter(|s| s.is_active()) {
            session.pending = Some(step);
        }
    }

    /// Run the parked continuation, if any. Returns whether one ran.
    pub fn advance(&mut self) -> bool {
        let step = self
            .game
            .session_mut()
            .filter(|s| s.is_active())
            .and_then(|s| s.pending.take());
        let Some(step) = step else {
            return false;
        };

        match step {
            Continuation::CompanionAct(actor) => {
                if self.game.character(&actor).is_some_and(|c| c.is_down()) {
                    self.park(Continuation::FinishTurn(actor));
                    return true;
                }
                let policy = self.companion_policy;
                match policy.take_turn(&actor, self) {
                    Ok(CompanionDecision::HoldGround) => {
                        let name = self.display_name(&actor);
                        self.log(format!("{name} holds their ground."), LogCategory::System);
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(%actor, error = %err, "companion action refused"),
                }
                self.park(Continuation::FinishTurn(actor));
            }
            Continuation::EnemyAct(actor) => {
                let policy = EnemyPolicy::new(self.game.settings.enemy_targeting);
                match policy.take_turn(&actor, self) {
                    Ok(Some(_)) => {}
                    Ok(None) => tracing::debug!(%actor, "enemy found no target"),
                    Err(err) => tracing::warn!(%actor, error = %err, "enemy action refused"),
                }
                self.park(Continuation::FinishTurn(actor));
            }
            Continuation::FinishTurn(actor) => self.finish_turn(&actor),
        }
        true
    }

    /// Run every parked continuation, waiting out the presentation delay
    /// before each one.
    pub async fn run_pending(&mut self) {
        while self.has_pending() {
            let delay = self.game.settings.presentation_delay;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.advance();
        }
    }

    /// End `actor`'s turn: tick its statuses, move the cursor and dispatch.
    /// Enemies also drop their intent and prune the dead.
    fn finish_turn(&mut self, actor: &CombatantId) {
        let name = self.display_name(actor);
        for effect in self.game.tick_statuses(actor) {
            let line = format!("{} is no longer {}.", name, effect.name());
            self.log(line, LogCategory::System);
        }

        let Some(session) = self.game.session_mut().filter(|s| s.is_active()) else {
            return;
        };
        let moved = match session.enemy_mut(actor) {
            Some(enemy) => {
                enemy.intent.clear();
                session.prune_after_turn(actor).map(|pruned| {
                    if !pruned.is_empty() {
                        tracing::debug!(?pruned, "pruned dead enemies");
                    }
                })
            }
            None => session.advance_turn(),
        };
        if let Err(fault) = moved {
            return self.abort(fault);
        }
        self.dispatch();
    }

    // ========================================================================
    // Outcomes
    // ========================================================================

    /// Loss, then win. Otherwise prune enemies that just died.
    fn check_outcome(&mut self) {
        if !self.game.in_combat() {
            return;
        }
        if self.game.player.is_down() {
            return self.defeat();
        }
        let Some(session) = self.game.session_mut() else {
            return;
        };
        if session.all_enemies_down() {
            return self.victory();
        }
        let pruned = session.prune_keeping_current();
        if !pruned.is_empty() {
            tracing::debug!(?pruned, "pruned dead enemies");
        }
    }

    fn victory(&mut self) {
        let Some(session) = self.game.session_mut().filter(|s| s.is_active()) else {
            return;
        };
        let xp = session.total_xp();
        let scene = session.win_scene_id.clone();
        session.finish(CombatPhase::Victory);
        tracing::info!(xp, "combat won");

        self.log("Victory!", LogCategory::Gain);
        self.game.gain_xp(xp);
        self.log(format!("Gained {xp} XP."), LogCategory::Gain);
        if self.game.pending_level_up {
            self.log("Level Up Available!", LogCategory::Gain);
            for summary in self.game.apply_pending_level_ups() {
                self.log(format!("You are now Level {}!", summary.level), LogCategory::Gain);
            }
        }
        self.game.sync_party_levels();
        self.hooks.persist_snapshot(&self.game);
        self.enter_scene(&scene);
    }

    fn defeat(&mut self) {
        let Some(session) = self.game.session_mut().filter(|s| s.is_active()) else {
            return;
        };
        let scene = session.lose_scene_id.clone();
        session.finish(CombatPhase::Defeat);
        tracing::info!("combat lost");
        self.log("You have been defeated.", LogCategory::Combat);
        self.enter_scene(&scene);
    }

    fn fled(&mut self) {
        let Some(session) = self.game.session_mut().filter(|s| s.is_active()) else {
            return;
        };
        let scene = session.retreat_scene_id.clone();
        session.finish(CombatPhase::Fled);
        tracing::info!("player fled combat");
        self.enter_scene(&scene);
    }

    /// End the session after a turn-state fault.
    fn abort(&mut self, fault: SessionFault) {
        tracing::error!(%fault, "aborting combat session");
        let Some(session) = self.game.session_mut().filter(|s| s.is_active()) else {
            return;
        };
        let scene = session.retreat_scene_id.clone();
        session.finish(CombatPhase::Aborted);
        self.log(
            format!("Combat ended unexpectedly: {fault}."),
            LogCategory::System,
        );
        self.enter_scene(&scene);
    }

    fn enter_scene(&mut self, scene_id: &str) {
        self.game.transition_scene(scene_id);
        self.hooks.on_combat_ui_change(None);
        self.hooks.transition_to_scene(scene_id);
    }

    // ========================================================================
    // Command Plumbing
    // ========================================================================

    fn log(&mut self, message: impl AsRef<str>, category: LogCategory) {
        self.hooks.on_log_event(message.as_ref(), category);
    }

    fn emit(&mut self, report: &ActionReport) {
        for line in &report.lines {
            self.hooks.on_log_event(&line.text, line.category);
        }
        let duration = self.game.settings.transient_text_duration;
        for text in &report.floating {
            self.hooks.on_transient_event_text(text, duration);
        }
    }

    fn display_name(&self, id: &CombatantId) -> String {
        self.game
            .combatant(id)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Checks shared by every command: a live session, nothing parked, a
    /// known actor whose turn it is.
    fn validate_turn(&self, actor: &CombatantId) -> Result<(), ActionRejected> {
        let session = self
            .game
            .session()
            .filter(|s| s.is_active())
            .ok_or(ActionRejected::SessionInactive)?;
        if session.pending.is_some() {
            return Err(ActionRejected::ContinuationPending);
        }
        if self.game.combatant(actor).is_none() {
            return Err(ActionRejected::UnknownActor(actor.clone()));
        }
        if !session.is_current(actor) {
            return Err(ActionRejected::NotActorsTurn(actor.clone()));
        }
        Ok(())
    }

    /// Hostile commands must cross sides; healing must stay on the actor's
    /// side.
    fn check_target(
        &self,
        actor: &CombatantId,
        target: &CombatantId,
        hostile: bool,
    ) -> Result<(), ActionRejected> {
        let actor_kind = self
            .game
            .combatant_kind(actor)
            .ok_or_else(|| ActionRejected::UnknownActor(actor.clone()))?;
        let target = self
            .game
            .combatant(target)
            .ok_or_else(|| ActionRejected::UnknownTarget(target.clone()))?;
        let same_side =
            (actor_kind == CombatantKind::Enemy) == (target.kind() == CombatantKind::Enemy);
        if same_side == hostile {
            return Err(ActionRejected::WrongSide(target.name().to_string()));
        }
        if target.is_down() {
            return Err(ActionRejected::TargetDown(target.name().to_string()));
        }
        Ok(())
    }

    fn active_session_mut(&mut self) -> Result<&mut CombatSession, ActionRejected> {
        self.game
            .session_mut()
            .filter(|s| s.is_active())
            .ok_or(ActionRejected::SessionInactive)
    }

    fn require_action(&self) -> Result<(), ActionRejected> {
        match self.game.session() {
            Some(s) if s.actions_remaining > 0 => Ok(()),
            _ => Err(ActionRejected::NoActionRemaining),
        }
    }

    fn require_bonus_action(&self) -> Result<(), ActionRejected> {
        match self.game.session() {
            Some(s) if s.bonus_actions_remaining > 0 => Ok(()),
            _ => Err(ActionRejected::NoBonusActionRemaining),
        }
    }

    /// Validate, resolve, then apply and announce. A rejection is logged
    /// and changes nothing.
    fn command(
        &mut self,
        actor: &CombatantId,
        resolve: impl FnOnce(&mut Self) -> Result<ActionReport, ActionRejected>,
    ) -> Result<ActionReport, ActionRejected> {
        let outcome = self.validate_turn(actor).and_then(|()| resolve(self));
        match outcome {
            Ok(report) => {
                resolver::apply_effects(&mut self.game, &report.effects);
                self.emit(&report);
                self.check_outcome();
                let current = self.current_actor().cloned();
                self.hooks.on_combat_ui_change(current.as_ref());
                Ok(report)
            }
            Err(err) => {
                tracing::debug!(%actor, error = %err, "action rejected");
                self.log(err.to_string(), LogCategory::CheckFail);
                Err(err)
            }
        }
    }
}

fn entry(id: CombatantId, roll: InitiativeRoll) -> InitiativeEntry {
    InitiativeEntry {
        id,
        total: roll.total,
    }
}

impl<H: CombatHooks> ActionResolver for CombatEngine<H> {
    fn state(&self) -> &GameState {
        &self.game
    }

    fn attack(
        &mut self,
        actor: &CombatantId,
        target: &CombatantId,
    ) -> Result<ActionReport, ActionRejected> {
        self.command(actor, |engine| {
            engine.check_target(actor, target, true)?;
            engine.require_action()?;
            engine.active_session_mut()?.spend_action()?;

            let game = &engine.game;
            let roller = engine.roller.as_mut();
            let target = game
                .combatant(target)
                .ok_or_else(|| ActionRejected::UnknownTarget(target.clone()))?;
            match game.combatant(actor) {
                Some(Combatant::Enemy(enemy)) => {
                    let defending = game
                        .session()
                        .is_some_and(|s| s.defending.contains(target.id()));
                    Ok(resolver::resolve_enemy_attack(enemy, target, defending, roller))
                }
                Some(Combatant::Player(c)) | Some(Combatant::Companion(c)) => {
                    Ok(resolver::resolve_weapon_attack(c, target, roller))
                }
                None => Err(ActionRejected::UnknownActor(actor.clone())),
            }
        })
    }

    fn cast_spell(
        &mut self,
        actor: &CombatantId,
        spell_id: &str,
        target: &CombatantId,
    ) -> Result<ActionReport, ActionRejected> {
        self.command(actor, |engine| {
            let spell = spells::get_spell(spell_id)
                .ok_or_else(|| ActionRejected::UnknownSpell(spell_id.to_string()))?;
            let caster_name = engine.display_name(actor);
            let caster = engine
                .game
                .character(actor)
                .ok_or_else(|| ActionRejected::SpellNotKnown(caster_name.clone()))?;
            if !caster.knows_spell(&spell.id) {
                return Err(ActionRejected::SpellNotKnown(caster_name));
            }
            engine.check_target(actor, target, spell.is_offensive())?;
            engine.require_action()?;
            if !caster.can_cast(spell) {
                return Err(ActionRejected::NoSpellSlot(spell.level));
            }

            engine.active_session_mut()?.spend_action()?;
            if !spell.is_cantrip() {
                if let Some(caster) = engine.game.character_mut(actor) {
                    caster.spell_slots.use_slot(spell.level);
                }
            }

            let game = &engine.game;
            let roller = engine.roller.as_mut();
            let caster = game
                .character(actor)
                .ok_or_else(|| ActionRejected::UnknownActor(actor.clone()))?;
            let target = game
                .combatant(target)
                .ok_or_else(|| ActionRejected::UnknownTarget(target.clone()))?;
            Ok(resolver::resolve_spell(caster, spell, target, roller))
        })
    }

    fn use_ability(
        &mut self,
        actor: &CombatantId,
        ability_id: &str,
    ) -> Result<ActionReport, ActionRejected> {
        self.command(actor, |engine| {
            let unsupported = || ActionRejected::UnsupportedAbility(ability_id.to_string());
            let resource_id = ResourceId::from_key(ability_id).ok_or_else(unsupported)?;
            let character = engine.game.character(actor).ok_or_else(unsupported)?;
            let resource = character.resource(resource_id).ok_or_else(unsupported)?;
            if resource.current == 0 {
                return Err(ActionRejected::NoUsesLeft);
            }
            if resource_id == ResourceId::SecondWind {
                engine.require_bonus_action()?;
            }

            let name = character.name.clone();
            if let Some(resource) = engine
                .game
                .character_mut(actor)
                .and_then(|c| c.resource_mut(resource_id))
            {
                resource.spend();
            }

            match resource_id {
                ResourceId::SecondWind => {
                    engine.active_session_mut()?.spend_bonus_action()?;
                    let roller = engine.roller.as_mut();
                    let user = engine
                        .game
                        .character(actor)
                        .ok_or_else(|| ActionRejected::UnknownActor(actor.clone()))?;
                    Ok(resolver::resolve_second_wind(user, roller))
                }
                ResourceId::ActionSurge => {
                    engine.active_session_mut()?.actions_remaining += 1;
                    Ok(ActionReport::line(
                        format!("{name} used Action Surge!"),
                        LogCategory::Gain,
                    ))
                }
            }
        })
    }

    fn defend(&mut self, actor: &CombatantId) -> Result<ActionReport, ActionRejected> {
        self.command(actor, |engine| {
            engine.require_action()?;
            engine.active_session_mut()?.spend_action()?;
            let line = if actor.is_player() {
                "You brace yourself for the next attack.".to_string()
            } else {
                format!("{} braces for the next attack.", engine.display_name(actor))
            };
            Ok(ActionReport::line(line, LogCategory::System).with_effect(Effect::DefendStarted {
                actor: actor.clone(),
            }))
        })
    }

    fn flee(&mut self, actor: &CombatantId) -> Result<ActionReport, ActionRejected> {
        let mut escaped = false;
        let report = self.command(actor, |engine| {
            if !actor.is_player() {
                return Err(ActionRejected::PlayerOnly);
            }
            engine.require_action()?;
            engine.active_session_mut()?.spend_action()?;

            let roll = engine.roller.roll_die(20) as i32
                + engine.game.player.modifier(Ability::Dexterity);
            escaped = roll >= engine.game.settings.flee_dc;
            tracing::debug!(roll, dc = engine.game.settings.flee_dc, escaped, "flee attempt");
            Ok(if escaped {
                ActionReport::line("You escaped!", LogCategory::Gain)
            } else {
                ActionReport::line("Failed to escape!", LogCategory::Combat)
            })
        })?;
        if escaped {
            self.fled();
        }
        Ok(report)
    }

    fn cunning_action(
        &mut self,
        actor: &CombatantId,
        action: CunningAction,
    ) -> Result<ActionReport, ActionRejected> {
        self.command(actor, |engine| {
            let is_rogue = engine
                .game
                .character(actor)
                .is_some_and(|c| c.class == CharacterClass::Rogue);
            if !is_rogue {
                return Err(ActionRejected::UnsupportedAbility("cunning_action".to_string()));
            }
            engine.require_bonus_action()?;
            engine.active_session_mut()?.spend_bonus_action()?;
            Ok(ActionReport::line(
                format!("Cunning Action: You used {}.", action.name()),
                LogCategory::System,
            ))
        })
    }

    fn end_turn(&mut self, actor: &CombatantId) -> Result<ActionReport, ActionRejected> {
        let checked = self.validate_turn(actor).and_then(|()| {
            match self.game.combatant_kind(actor) {
                Some(CombatantKind::Player) | Some(CombatantKind::Companion) => Ok(()),
                _ => Err(ActionRejected::NotActorsTurn(actor.clone())),
            }
        });
        if let Err(err) = checked {
            tracing::debug!(%actor, error = %err, "end turn rejected");
            self.log(err.to_string(), LogCategory::CheckFail);
            return Err(err);
        }
        self.finish_turn(actor);
        Ok(ActionReport::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Race;
    use crate::config::CombatSettings;
    use crate::rules::AbilityScores;
    use crate::testing::{RecordingHooks, ScriptedRoller};
    use std::time::Duration;

    fn engine(rolls: impl IntoIterator<Item = u32>) -> CombatEngine<RecordingHooks> {
        let game = GameState::new_game(
            "Rowan",
            Race::Human,
            CharacterClass::Fighter,
            AbilityScores::new(15, 13, 14, 10, 12, 8),
        )
        .with_settings(CombatSettings::default().with_presentation_delay(Duration::ZERO));
        CombatEngine::new(game, RecordingHooks::default()).with_roller(ScriptedRoller::new(rolls))
    }

    #[test]
    fn test_start_rolls_initiative_and_waits_for_player() {
        // player 18 + 2, beast 5 + 3
        let mut engine = engine([18, 5]);
        engine.start_session(&["fungal_beast"], "WIN", "LOSE").unwrap();
        assert_eq!(engine.phase(), CombatPhase::Active);
        assert_eq!(engine.current_actor(), Some(&CombatantId::player()));
        assert!(!engine.has_pending());
        let logs = engine.hooks().log_text();
        assert_eq!(logs[0], "Combat started!");
        assert!(logs.contains(&"You rolled 20 for initiative.".to_string()));
        assert!(logs.contains(&"Lesser Fungal Beast rolled 8 for initiative.".to_string()));
        assert_eq!(logs.last().map(String::as_str), Some("Round 1 - Your Turn"));
    }

    #[test]
    fn test_start_twice_is_refused() {
        let mut engine = engine([18, 5]);
        engine.start_session(&["fungal_beast"], "WIN", "LOSE").unwrap();
        assert_eq!(
            engine.start_session(&["fungal_beast"], "WIN", "LOSE"),
            Err(SessionFault::AlreadyActive)
        );
    }

    #[test]
    fn test_unknown_enemies_only() {
        let mut engine = engine([]);
        assert_eq!(
            engine.start_session(&["dragon"], "WIN", "LOSE"),
            Err(SessionFault::NoEnemies)
        );
        assert_eq!(engine.phase(), CombatPhase::NotStarted);
    }

    #[test]
    fn test_enemy_first_parks_continuation() {
        let mut engine = engine([2, 19]);
        engine.start_session(&["fungal_beast"], "WIN", "LOSE").unwrap();
        assert!(engine.has_pending());
        assert_eq!(
            engine.attack(&CombatantId::player(), &CombatantId::new("fungal_beast_0")),
            Err(ActionRejected::ContinuationPending)
        );
        let beast = engine.game().enemy(&CombatantId::new("fungal_beast_0")).unwrap();
        assert_eq!(beast.intent, ENEMY_INTENT);
    }

    #[test]
    fn test_rejection_is_logged_and_changes_nothing() {
        let mut engine = engine([18, 5]);
        engine.start_session(&["fungal_beast"], "WIN", "LOSE").unwrap();
        let before = engine.game().clone();
        let err = engine.use_ability(&CombatantId::player(), "action_surge").unwrap_err();
        assert_eq!(err, ActionRejected::UnsupportedAbility("action_surge".to_string()));
        assert_eq!(engine.game(), &before);
        let last = engine.hooks().logs.last().unwrap();
        assert_eq!(last.1, LogCategory::CheckFail);
    }

    #[test]
    fn test_defend_clears_at_next_turn() {
        // player 18, beast 5; beast attack 1 misses
        let mut engine = engine([18, 5, 1]);
        engine.start_session(&["fungal_beast"], "WIN", "LOSE").unwrap();
        let player = CombatantId::player();
        engine.defend(&player).unwrap();
        assert!(engine.session().unwrap().defending.contains(&player));
        engine.end_turn(&player).unwrap();
        while engine.advance() {}
        assert_eq!(engine.current_actor(), Some(&player));
        assert!(!engine.session().unwrap().defending.contains(&player));
        assert_eq!(engine.session().unwrap().round, 2);
    }
}
