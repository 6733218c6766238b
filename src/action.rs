use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::{EvolveResolution, PageRequest};
use crate::creature::Creature;

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    Init,
    UiTerminalResize(u16, u16),
    Tick,

    // Catalog
    CatalogLoadMore,
    CatalogPageDidLoad {
        request: PageRequest,
        creatures: Vec<Creature>,
    },
    CatalogCursorMove(i16),
    CatalogSelect,

    // Search
    SearchStart,
    SearchInput(char),
    SearchBackspace,
    SearchCancel,
    SearchSubmit,
    SearchDidResolve {
        query: String,
        creature: Option<Creature>,
    },

    // Evolution
    EvolveStart,
    EvolveDidResolve {
        from_id: u32,
        resolution: EvolveResolution,
    },

    // Opponent selection
    OpponentSelectStart,
    OpponentSelectCancel,
    BattleRandom,
    OpponentDidLoad {
        id: u32,
        creature: Option<Creature>,
    },

    // Battle
    BattleAttack,
    BattleItem,
    BattleOpponentTurn {
        battle_id: u64,
    },
    BattleFinish {
        battle_id: u64,
    },
    ResultDismiss,

    NoticeDismiss,
    Quit,
}
