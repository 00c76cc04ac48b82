//! Error types for combat commands, session faults and state edits.

use crate::combatant::CombatantId;
use thiserror::Error;

/// Why a combat command was refused. A refusal never changes state.
///
/// The `Display` text is what the player sees in the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionRejected {
    #[error("There is no battle in progress.")]
    SessionInactive,

    #[error("It is not {0}'s turn.")]
    NotActorsTurn(CombatantId),

    #[error("Wait for the current turn to finish.")]
    ContinuationPending,

    #[error("No Action remaining!")]
    NoActionRemaining,

    #[error("No Bonus Action remaining!")]
    NoBonusActionRemaining,

    #[error("No uses left for that ability.")]
    NoUsesLeft,

    #[error("No level {0} spell slots remaining.")]
    NoSpellSlot(u8),

    #[error("Unknown spell '{0}'.")]
    UnknownSpell(String),

    #[error("{0} does not know that spell.")]
    SpellNotKnown(String),

    #[error("Unknown combatant '{0}'.")]
    UnknownActor(CombatantId),

    #[error("No such target '{0}'.")]
    UnknownTarget(CombatantId),

    #[error("{0} is already down.")]
    TargetDown(String),

    #[error("{0} is on the wrong side for that.")]
    WrongSide(String),

    #[error("Ability '{0}' cannot be used.")]
    UnsupportedAbility(String),

    #[error("Only the player can do that.")]
    PlayerOnly,
}

/// Inconsistent session state. Ends the session instead of crashing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFault {
    #[error("turn order is empty")]
    EmptyTurnOrder,

    #[error("turn order entry '{0}' does not resolve to a combatant")]
    UnresolvableActor(CombatantId),

    #[error("no enemies could be spawned")]
    NoEnemies,

    #[error("a combat session is already active")]
    AlreadyActive,

    #[error("no combatant in the turn order can act")]
    Stalled,
}

/// Invalid inventory, equipment or party edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Unknown item '{0}'")]
    UnknownItem(String),

    #[error("'{0}' is not in the inventory")]
    NotInInventory(String),

    #[error("Requires {required} Strength")]
    StrengthTooLow { required: i32 },

    #[error("'{0}' cannot be equipped")]
    NotEquippable(String),

    #[error("Unknown character '{0}'")]
    UnknownCharacter(String),

    #[error("Not usable.")]
    NotUsable,

    #[error("Not poisoned.")]
    NotPoisoned,

    #[error("Cannot rest during combat")]
    InCombat,
}
