use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::battle::BattleSession;
use crate::catalog::{CatalogStore, PageRequest};
use crate::creature::Creature;

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const DEFAULT_OPPONENT_DELAY_MS: u64 = 1000;
pub const DEFAULT_RESULT_DELAY_MS: u64 = 2000;
/// Random opponents are drawn from the first generation.
pub const RANDOM_OPPONENT_MAX_ID: u32 = 151;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Mode {
    Browsing,
    SelectingOpponent,
    Battling,
    Result,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchState {
    pub active: bool,
    pub query: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    pub page_size: u32,
    pub opponent_delay_ms: u64,
    pub result_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            opponent_delay_ms: DEFAULT_OPPONENT_DELAY_MS,
            result_delay_ms: DEFAULT_RESULT_DELAY_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppState {
    pub mode: Mode,
    pub catalog: CatalogStore,
    /// Id of the creature the player fights with.
    pub selected_id: Option<u32>,
    /// Highlighted row in the catalog list.
    pub list_index: usize,
    pub search: SearchState,
    pub searching: bool,
    pub pending_page: Option<PageRequest>,
    pub evolving: Option<u32>,
    pub opponent_loading: bool,
    pub battle: Option<BattleSession>,
    pub battle_seq: u64,
    pub notice: Option<Notice>,
    pub settings: Settings,
    pub rng_seed: u64,
    pub tick: u64,
    pub terminal_size: (u16, u16),
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            mode: Mode::Browsing,
            catalog: CatalogStore::new(),
            selected_id: None,
            list_index: 0,
            search: SearchState::default(),
            searching: false,
            pending_page: None,
            evolving: None,
            opponent_loading: false,
            battle: None,
            battle_seq: 0,
            notice: None,
            settings,
            rng_seed: seed_from_time(),
            tick: 0,
            terminal_size: (80, 24),
        }
    }

    pub fn selected(&self) -> Option<&Creature> {
        self.selected_id.and_then(|id| self.catalog.get(id))
    }

    pub fn highlighted(&self) -> Option<&Creature> {
        self.catalog.at(self.list_index)
    }

    pub fn is_initial_loading(&self) -> bool {
        self.pending_page.is_some() && self.catalog.is_empty()
    }

    /// Advances the LCG seed and returns its high bits.
    pub fn next_rand(&mut self) -> u32 {
        self.rng_seed = self
            .rng_seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.rng_seed >> 32) as u32
    }

    pub fn is_busy(&self) -> bool {
        self.pending_page.is_some()
            || self.searching
            || self.evolving.is_some()
            || self.opponent_loading
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = vec![
            DebugSection::new("Mode")
                .entry("mode", ron_string(&self.mode))
                .entry("notice", ron_string(&self.notice)),
            DebugSection::new("Catalog")
                .entry("entries", ron_string(&self.catalog.len()))
                .entry("cursor", ron_string(&self.catalog.cursor()))
                .entry("selected_id", ron_string(&self.selected_id))
                .entry("list_index", ron_string(&self.list_index))
                .entry("pending_page", ron_string(&self.pending_page)),
            DebugSection::new("Status")
                .entry("searching", ron_string(&self.searching))
                .entry("evolving", ron_string(&self.evolving))
                .entry("opponent_loading", ron_string(&self.opponent_loading)),
        ];

        if let Some(battle) = &self.battle {
            sections.push(
                DebugSection::new("Battle")
                    .entry("id", ron_string(&battle.id()))
                    .entry("status", ron_string(&battle.status()))
                    .entry("turn", ron_string(&battle.turn()))
                    .entry("player_hp", ron_string(&battle.player_hp()))
                    .entry("opponent_hp", ron_string(&battle.opponent_hp())),
            );
        }

        sections
    }
}

fn seed_from_time() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_secs() << 32) ^ now.subsec_nanos() as u64
}
