use crate::catalog::PageRequest;

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    LoadPage { request: PageRequest },
    SearchRemote { query: String },
    ResolveEvolution { from_id: u32, name: String },
    LoadOpponent { id: u32 },

    // Battle timers
    ScheduleOpponentTurn { battle_id: u64, delay_ms: u64 },
    ScheduleBattleFinish { battle_id: u64, delay_ms: u64 },
    CancelBattleTimers,
}
