//! Turn-based battle between the selected creature and an opponent.
//!
//! A session moves from `InProgress` to one of two terminal states as soon
//! as either side's HP reaches zero. Attacks out of turn or after the end are
//! rejected without touching the session.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::creature::{Creature, CreatureStats};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Turn {
    Player,
    Opponent,
}

impl Turn {
    pub fn label(self) -> &'static str {
        match self {
            Turn::Player => "player",
            Turn::Opponent => "opponent",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattleStatus {
    InProgress,
    PlayerWon,
    OpponentWon,
}

impl BattleStatus {
    pub fn is_over(self) -> bool {
        !matches!(self, BattleStatus::InProgress)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleError {
    #[error("the battle is already over")]
    Finished,
    #[error("it is the {} turn", .0.label())]
    OutOfTurn(Turn),
}

/// What a successful attack did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackReport {
    pub attacker: Turn,
    pub damage: u32,
    pub status: BattleStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleSession {
    id: u64,
    player: Creature,
    opponent: Creature,
    player_hp: u32,
    opponent_hp: u32,
    turn: Turn,
    status: BattleStatus,
    log: Vec<String>,
}

impl BattleSession {
    pub fn new(id: u64, player: Creature, opponent: Creature, first: Turn) -> Self {
        let player_hp = player.stats.hp;
        let opponent_hp = opponent.stats.hp;
        let opener = match first {
            Turn::Player => "You go first!",
            Turn::Opponent => "Opponent goes first!",
        };
        let mut session = Self {
            id,
            player,
            opponent,
            player_hp,
            opponent_hp,
            turn: first,
            status: BattleStatus::InProgress,
            log: vec!["Battle Start!".to_string(), opener.to_string()],
        };
        session.check_end();
        session
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn player(&self) -> &Creature {
        &self.player
    }

    pub fn opponent(&self) -> &Creature {
        &self.opponent
    }

    pub fn player_hp(&self) -> u32 {
        self.player_hp
    }

    pub fn opponent_hp(&self) -> u32 {
        self.opponent_hp
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn status(&self) -> BattleStatus {
        self.status
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn is_opponent_turn(&self) -> bool {
        self.status == BattleStatus::InProgress && self.turn == Turn::Opponent
    }

    pub fn player_attack(&mut self) -> Result<AttackReport, BattleError> {
        self.attack(Turn::Player)
    }

    pub fn opponent_attack(&mut self) -> Result<AttackReport, BattleError> {
        self.attack(Turn::Opponent)
    }

    fn attack(&mut self, attacker: Turn) -> Result<AttackReport, BattleError> {
        if self.status.is_over() {
            return Err(BattleError::Finished);
        }
        if self.turn != attacker {
            return Err(BattleError::OutOfTurn(self.turn));
        }

        let (damage, name) = match attacker {
            Turn::Player => {
                let damage = calculate_damage(&self.player.stats, &self.opponent.stats);
                self.opponent_hp = self.opponent_hp.saturating_sub(damage);
                self.turn = Turn::Opponent;
                (damage, self.player.display_name())
            }
            Turn::Opponent => {
                let damage = calculate_damage(&self.opponent.stats, &self.player.stats);
                self.player_hp = self.player_hp.saturating_sub(damage);
                self.turn = Turn::Player;
                (damage, self.opponent.display_name())
            }
        };
        self.log.push(format!("{name} dealt {damage} damage!"));
        self.check_end();

        Ok(AttackReport {
            attacker,
            damage,
            status: self.status,
        })
    }

    // Player loss is checked first.
    fn check_end(&mut self) {
        if self.status.is_over() {
            return;
        }
        if self.player_hp == 0 {
            self.status = BattleStatus::OpponentWon;
            self.log
                .push(format!("{} fainted! You lose!", self.player.display_name()));
        } else if self.opponent_hp == 0 {
            self.status = BattleStatus::PlayerWon;
            self.log
                .push(format!("{} fainted! You win!", self.opponent.display_name()));
        }
    }
}

/// `floor(attack / defense * 10) + 5`, never below 1. Defense is treated as
/// at least 1.
pub fn calculate_damage(attacker: &CreatureStats, defender: &CreatureStats) -> u32 {
    let defense = f64::from(defender.defense.max(1));
    let scaled = (f64::from(attacker.attack) / defense * 10.0).floor();
    (scaled as u32).saturating_add(5).max(1)
}
