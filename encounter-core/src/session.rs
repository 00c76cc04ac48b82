//! Combat session data: enemies, initiative order, the turn cursor and the
//! per-turn action budget.
//!
//! The session is plain data. [`CombatEngine`](crate::engine::CombatEngine)
//! drives it; everything here keeps `turn_index` pointing at a live entry.

use crate::combatant::{CombatantId, Enemy};
use crate::error::{ActionRejected, SessionFault};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle of a session. Everything but `NotStarted` and `Active` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    NotStarted,
    Active,
    Victory,
    Defeat,
    Fled,
    /// Ended because the turn state became inconsistent.
    Aborted,
}

impl CombatPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CombatPhase::NotStarted | CombatPhase::Active)
    }
}

/// Deferred work waiting out the presentation delay. At most one is
/// pending at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step", content = "actor")]
pub enum Continuation {
    /// Run the companion policy for this actor.
    CompanionAct(CombatantId),
    /// Run the enemy policy for this actor.
    EnemyAct(CombatantId),
    /// End this actor's turn and dispatch the next one.
    FinishTurn(CombatantId),
}

impl Continuation {
    pub fn actor(&self) -> &CombatantId {
        match self {
            Continuation::CompanionAct(id)
            | Continuation::EnemyAct(id)
            | Continuation::FinishTurn(id) => id,
        }
    }
}

/// One initiative result, in roll order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub id: CombatantId,
    pub total: i32,
}

/// Sort initiative results into turn order: descending total, ties kept in
/// roll order.
pub fn order_by_initiative(mut entries: Vec<InitiativeEntry>) -> Vec<CombatantId> {
    entries.sort_by(|a, b| b.total.cmp(&a.total));
    entries.into_iter().map(|e| e.id).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSession {
    /// Every spawned enemy. Dead enemies stay here for XP.
    pub enemies: Vec<Enemy>,
    pub turn_order: Vec<CombatantId>,
    pub turn_index: usize,
    pub round: u32,
    pub actions_remaining: u32,
    pub bonus_actions_remaining: u32,
    pub phase: CombatPhase,
    pub win_scene_id: String,
    pub lose_scene_id: String,
    pub retreat_scene_id: String,
    /// Actors braced by Defend.
    pub defending: BTreeSet<CombatantId>,
    pub pending: Option<Continuation>,
}

impl CombatSession {
    pub fn new(
        enemies: Vec<Enemy>,
        win_scene_id: impl Into<String>,
        lose_scene_id: impl Into<String>,
        retreat_scene_id: impl Into<String>,
    ) -> Self {
        Self {
            enemies,
            turn_order: Vec::new(),
            turn_index: 0,
            round: 1,
            actions_remaining: 1,
            bonus_actions_remaining: 1,
            phase: CombatPhase::NotStarted,
            win_scene_id: win_scene_id.into(),
            lose_scene_id: lose_scene_id.into(),
            retreat_scene_id: retreat_scene_id.into(),
            defending: BTreeSet::new(),
            pending: None,
        }
    }

    /// Fix the turn order and go active at round 1, first entry.
    pub fn begin(&mut self, initiative: Vec<InitiativeEntry>) {
        self.turn_order = order_by_initiative(initiative);
        self.turn_index = 0;
        self.round = 1;
        self.phase = CombatPhase::Active;
    }

    pub fn is_active(&self) -> bool {
        self.phase == CombatPhase::Active
    }

    pub fn current_actor(&self) -> Result<&CombatantId, SessionFault> {
        if self.turn_order.is_empty() {
            return Err(SessionFault::EmptyTurnOrder);
        }
        self.turn_order
            .get(self.turn_index)
            .ok_or(SessionFault::EmptyTurnOrder)
    }

    pub fn is_current(&self, id: &CombatantId) -> bool {
        self.current_actor().is_ok_and(|current| current == id)
    }

    /// Fresh budget for whoever's turn is starting. Their Defend lapses.
    pub fn begin_turn(&mut self, actor: &CombatantId) {
        self.actions_remaining = 1;
        self.bonus_actions_remaining = 1;
        self.defending.remove(actor);
    }

    pub fn spend_action(&mut self) -> Result<(), ActionRejected> {
        if self.actions_remaining == 0 {
            return Err(ActionRejected::NoActionRemaining);
        }
        self.actions_remaining -= 1;
        Ok(())
    }

    pub fn spend_bonus_action(&mut self) -> Result<(), ActionRejected> {
        if self.bonus_actions_remaining == 0 {
            return Err(ActionRejected::NoBonusActionRemaining);
        }
        self.bonus_actions_remaining -= 1;
        Ok(())
    }

    /// Move to the next entry, bumping the round on wrap.
    pub fn advance_turn(&mut self) -> Result<(), SessionFault> {
        let len = self.turn_order.len();
        if len == 0 {
            return Err(SessionFault::EmptyTurnOrder);
        }
        self.turn_index = (self.turn_index + 1) % len;
        if self.turn_index == 0 {
            self.round += 1;
        }
        Ok(())
    }

    pub fn enemy(&self, id: &CombatantId) -> Option<&Enemy> {
        self.enemies.iter().find(|e| &e.id == id)
    }

    pub fn enemy_mut(&mut self, id: &CombatantId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| &e.id == id)
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter().filter(|e| !e.is_down())
    }

    pub fn all_enemies_down(&self) -> bool {
        self.enemies.iter().all(|e| e.is_down())
    }

    pub fn total_xp(&self) -> u32 {
        self.enemies.iter().map(|e| e.xp).sum()
    }

    fn is_dead_enemy(&self, id: &CombatantId) -> bool {
        self.enemy(id).is_some_and(|e| e.is_down())
    }

    fn remove_dead_enemies(&mut self) -> Vec<CombatantId> {
        let (dead, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut self.turn_order)
            .into_iter()
            .partition(|id| self.is_dead_enemy(id));
        self.turn_order = alive;
        dead
    }

    /// Prune dead enemies once `actor` has finished acting, then point at
    /// whoever follows `actor`. The actor itself may be one of the pruned.
    pub fn prune_after_turn(&mut self, actor: &CombatantId) -> Result<Vec<CombatantId>, SessionFault> {
        if self.turn_order.is_empty() {
            return Err(SessionFault::EmptyTurnOrder);
        }
        let position = self
            .turn_order
            .iter()
            .position(|id| id == actor)
            .unwrap_or(self.turn_index)
            .min(self.turn_order.len() - 1);
        // Survivors up to and including the actor's slot.
        let survivors_through = self.turn_order[..=position]
            .iter()
            .filter(|id| !self.is_dead_enemy(id))
            .count();

        let pruned = self.remove_dead_enemies();
        let len = self.turn_order.len();
        if len == 0 {
            return Err(SessionFault::EmptyTurnOrder);
        }

        if survivors_through >= len {
            self.turn_index = 0;
            self.round += 1;
        } else {
            self.turn_index = survivors_through;
        }
        Ok(pruned)
    }

    /// Prune dead enemies mid-turn, keeping the cursor on the current actor.
    pub fn prune_keeping_current(&mut self) -> Vec<CombatantId> {
        let current = self.current_actor().ok().cloned();
        let pruned = self.remove_dead_enemies();
        if pruned.is_empty() {
            return pruned;
        }
        let position = current.and_then(|id| self.turn_order.iter().position(|entry| *entry == id));
        self.turn_index = match position {
            Some(index) => index,
            None => self.turn_index.min(self.turn_order.len().saturating_sub(1)),
        };
        pruned
    }

    /// Enter a terminal phase and drop the turn data.
    pub fn finish(&mut self, phase: CombatPhase) {
        self.phase = phase;
        self.pending = None;
        self.turn_order.clear();
        self.turn_index = 0;
        self.defending.clear();
        self.actions_remaining = 0;
        self.bonus_actions_remaining = 0;
    }
}
