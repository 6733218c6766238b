//! Reducer - pure function: (state, action) -> DispatchResult
//!
//! Owns the mode transitions and wires user actions to the catalog store
//! and the battle engine. All network and timer work is declared as effects.

use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::battle::{BattleSession, Turn};
use crate::catalog::{normalize_query, EvolveResolution};
use crate::creature::{format_name, Creature};
use crate::effect::Effect;
use crate::state::{AppState, Mode, Notice, Settings, RANDOM_OPPONENT_MAX_ID};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => init(state),

        Action::UiTerminalResize(width, height) => {
            if state.terminal_size == (width, height) {
                return DispatchResult::unchanged();
            }
            state.terminal_size = (width, height);
            DispatchResult::changed()
        }

        Action::Tick => {
            if !state.is_busy() {
                return DispatchResult::unchanged();
            }
            state.tick = state.tick.wrapping_add(1);
            DispatchResult::changed()
        }

        // ===== Catalog =====
        Action::CatalogLoadMore => {
            if !matches!(state.mode, Mode::Browsing | Mode::SelectingOpponent) {
                return DispatchResult::unchanged();
            }
            load_more(state)
        }

        Action::CatalogPageDidLoad { request, creatures } => {
            if state.pending_page != Some(request) {
                return DispatchResult::unchanged();
            }
            state.pending_page = None;
            state.catalog.append_page(request, creatures);
            clamp_list_index(state);
            DispatchResult::changed()
        }

        Action::CatalogCursorMove(delta) => {
            if state.catalog.is_empty()
                || state.search.active
                || !matches!(state.mode, Mode::Browsing | Mode::SelectingOpponent)
            {
                return DispatchResult::unchanged();
            }
            let last = state.catalog.len() as i64 - 1;
            let next = (state.list_index as i64 + i64::from(delta)).clamp(0, last) as usize;
            if next == state.list_index {
                return DispatchResult::unchanged();
            }
            state.list_index = next;
            DispatchResult::changed()
        }

        Action::CatalogSelect => {
            let Some(creature) = state.highlighted().cloned() else {
                return DispatchResult::unchanged();
            };
            match state.mode {
                Mode::Browsing => {
                    if state.selected_id == Some(creature.id) {
                        return DispatchResult::unchanged();
                    }
                    state.selected_id = Some(creature.id);
                    DispatchResult::changed()
                }
                Mode::SelectingOpponent => start_battle(state, creature),
                Mode::Battling | Mode::Result => DispatchResult::unchanged(),
            }
        }

        // ===== Search =====
        Action::SearchStart => {
            if state.mode != Mode::Browsing || state.search.active {
                return DispatchResult::unchanged();
            }
            state.search.active = true;
            state.search.query.clear();
            DispatchResult::changed()
        }

        Action::SearchInput(ch) => {
            if !state.search.active {
                return DispatchResult::unchanged();
            }
            state.search.query.push(ch);
            DispatchResult::changed()
        }

        Action::SearchBackspace => {
            if !state.search.active || state.search.query.pop().is_none() {
                return DispatchResult::unchanged();
            }
            DispatchResult::changed()
        }

        Action::SearchCancel => {
            if !state.search.active {
                return DispatchResult::unchanged();
            }
            close_search(state);
            DispatchResult::changed()
        }

        Action::SearchSubmit => {
            if !state.search.active || state.searching {
                return DispatchResult::unchanged();
            }
            let query = normalize_query(&state.search.query);
            if query.is_empty() {
                return DispatchResult::unchanged();
            }
            close_search(state);
            if let Some(id) = state.catalog.find_local(&query).map(|creature| creature.id) {
                select_id(state, id);
                return DispatchResult::changed();
            }
            state.searching = true;
            DispatchResult::changed_with(Effect::SearchRemote { query })
        }

        Action::SearchDidResolve { creature, .. } => {
            if !state.searching {
                return DispatchResult::unchanged();
            }
            state.searching = false;
            match creature {
                Some(creature) => {
                    let id = creature.id;
                    let inserted = state.catalog.insert_found(creature);
                    if state.mode == Mode::Browsing {
                        select_id(state, id);
                    } else if inserted {
                        // Keep the highlight on the same row after the prepend.
                        state.list_index += 1;
                        clamp_list_index(state);
                    }
                }
                None => state.notice = Some(Notice::error("Pokémon not found!")),
            }
            DispatchResult::changed()
        }

        // ===== Evolution =====
        Action::EvolveStart => {
            if state.mode != Mode::Browsing || state.evolving.is_some() {
                return DispatchResult::unchanged();
            }
            let Some((from_id, name)) = state
                .highlighted()
                .map(|creature| (creature.id, creature.name.clone()))
            else {
                return DispatchResult::unchanged();
            };
            state.evolving = Some(from_id);
            DispatchResult::changed_with(Effect::ResolveEvolution { from_id, name })
        }

        Action::EvolveDidResolve {
            from_id,
            resolution,
        } => {
            if state.evolving != Some(from_id) {
                return DispatchResult::unchanged();
            }
            state.evolving = None;
            apply_evolution(state, from_id, resolution);
            DispatchResult::changed()
        }

        // ===== Opponent selection =====
        Action::OpponentSelectStart => {
            if state.mode != Mode::Browsing
                || state.selected().is_none()
                || state.opponent_loading
                || state.searching
            {
                return DispatchResult::unchanged();
            }
            close_search(state);
            state.mode = Mode::SelectingOpponent;
            DispatchResult::changed()
        }

        Action::OpponentSelectCancel => {
            if state.mode != Mode::SelectingOpponent {
                return DispatchResult::unchanged();
            }
            state.mode = Mode::Browsing;
            DispatchResult::changed()
        }

        Action::BattleRandom => {
            if state.mode != Mode::Browsing
                || state.selected().is_none()
                || state.opponent_loading
                || state.searching
            {
                return DispatchResult::unchanged();
            }
            let id = state.next_rand() % RANDOM_OPPONENT_MAX_ID + 1;
            state.opponent_loading = true;
            DispatchResult::changed_with(Effect::LoadOpponent { id })
        }

        Action::OpponentDidLoad { id, creature } => {
            if !state.opponent_loading {
                return DispatchResult::unchanged();
            }
            state.opponent_loading = false;
            match creature {
                Some(opponent) if state.mode == Mode::Browsing => {
                    let result = start_battle(state, opponent);
                    if result.changed {
                        result
                    } else {
                        DispatchResult::changed()
                    }
                }
                Some(_) => DispatchResult::changed(),
                None => {
                    state.notice = Some(Notice::error(format!(
                        "Could not fetch an opponent (#{id})."
                    )));
                    DispatchResult::changed()
                }
            }
        }

        // ===== Battle =====
        Action::BattleAttack => {
            if state.mode != Mode::Battling {
                return DispatchResult::unchanged();
            }
            let Some(battle) = state.battle.as_mut() else {
                return DispatchResult::unchanged();
            };
            if battle.player_attack().is_err() {
                return DispatchResult::unchanged();
            }
            changed_with_follow_up(battle, &state.settings)
        }

        // Items are not part of the game yet.
        Action::BattleItem => DispatchResult::unchanged(),

        Action::BattleOpponentTurn { battle_id } => {
            if state.mode != Mode::Battling {
                return DispatchResult::unchanged();
            }
            let Some(battle) = state
                .battle
                .as_mut()
                .filter(|battle| battle.id() == battle_id)
            else {
                return DispatchResult::unchanged();
            };
            if battle.opponent_attack().is_err() {
                return DispatchResult::unchanged();
            }
            changed_with_follow_up(battle, &state.settings)
        }

        Action::BattleFinish { battle_id } => {
            let finished = state.mode == Mode::Battling
                && state
                    .battle
                    .as_ref()
                    .is_some_and(|battle| battle.id() == battle_id && battle.status().is_over());
            if !finished {
                return DispatchResult::unchanged();
            }
            state.mode = Mode::Result;
            DispatchResult::changed()
        }

        Action::ResultDismiss => {
            if state.mode != Mode::Result {
                return DispatchResult::unchanged();
            }
            state.battle = None;
            state.mode = Mode::Browsing;
            DispatchResult::changed_with(Effect::CancelBattleTimers)
        }

        Action::NoticeDismiss => {
            if state.notice.take().is_none() {
                return DispatchResult::unchanged();
            }
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

/// Starts fresh or resumes a restored snapshot. In-flight requests from a
/// snapshot are gone, so their busy flags are cleared.
fn init(state: &mut AppState) -> DispatchResult<Effect> {
    state.pending_page = None;
    state.searching = false;
    state.evolving = None;
    state.opponent_loading = false;

    let mut effects = Vec::new();
    if state.mode == Mode::Battling {
        if let Some(effect) = state
            .battle
            .as_ref()
            .and_then(|battle| follow_up(battle, &state.settings))
        {
            effects.push(effect);
        }
    }
    if state.catalog.is_empty() {
        let request = state.catalog.next_page(state.settings.page_size);
        state.pending_page = Some(request);
        effects.push(Effect::LoadPage { request });
    }
    DispatchResult::changed_with_many(effects)
}

fn load_more(state: &mut AppState) -> DispatchResult<Effect> {
    if state.pending_page.is_some() {
        return DispatchResult::unchanged();
    }
    let request = state.catalog.next_page(state.settings.page_size);
    state.pending_page = Some(request);
    DispatchResult::changed_with(Effect::LoadPage { request })
}

fn apply_evolution(state: &mut AppState, from_id: u32, resolution: EvolveResolution) {
    let from_name = state
        .catalog
        .get(from_id)
        .map(Creature::display_name)
        .unwrap_or_else(|| format!("#{from_id}"));

    match resolution {
        EvolveResolution::Evolved(evolved) => {
            let was_highlighted = state.highlighted().map(|creature| creature.id) == Some(from_id);
            let new_id = evolved.id;
            let new_name = evolved.display_name();
            let Some(position) = state.catalog.replace(from_id, evolved) else {
                return;
            };
            if state.selected_id == Some(from_id) {
                state.selected_id = Some(new_id);
            }
            if was_highlighted {
                state.list_index = position;
            }
            clamp_list_index(state);
            state.notice = Some(Notice::info(format!(
                "{from_name} evolved into {new_name}!"
            )));
        }
        EvolveResolution::CannotEvolve => {
            state.notice = Some(Notice::info(format!(
                "{from_name} cannot evolve further!"
            )));
        }
        EvolveResolution::FetchFailed { name } => {
            state.notice = Some(Notice::error(format!(
                "Could not fetch data for {}.",
                format_name(&name)
            )));
        }
    }
}

fn start_battle(state: &mut AppState, opponent: Creature) -> DispatchResult<Effect> {
    let Some(player) = state.selected().cloned() else {
        return DispatchResult::unchanged();
    };
    let first = if state.next_rand() & 1 == 0 {
        Turn::Player
    } else {
        Turn::Opponent
    };
    state.battle_seq += 1;
    let session = BattleSession::new(state.battle_seq, player, opponent, first);

    let mut effects = vec![Effect::CancelBattleTimers];
    effects.extend(follow_up(&session, &state.settings));
    state.battle = Some(session);
    state.mode = Mode::Battling;
    close_search(state);
    DispatchResult::changed_with_many(effects)
}

/// The timer a session needs next, if any.
fn follow_up(battle: &BattleSession, settings: &Settings) -> Option<Effect> {
    if battle.status().is_over() {
        Some(Effect::ScheduleBattleFinish {
            battle_id: battle.id(),
            delay_ms: settings.result_delay_ms,
        })
    } else if battle.is_opponent_turn() {
        Some(Effect::ScheduleOpponentTurn {
            battle_id: battle.id(),
            delay_ms: settings.opponent_delay_ms,
        })
    } else {
        None
    }
}

fn changed_with_follow_up(battle: &BattleSession, settings: &Settings) -> DispatchResult<Effect> {
    match follow_up(battle, settings) {
        Some(effect) => DispatchResult::changed_with(effect),
        None => DispatchResult::changed(),
    }
}

fn select_id(state: &mut AppState, id: u32) {
    state.selected_id = Some(id);
    if let Some(position) = state.catalog.position(id) {
        state.list_index = position;
    }
}

fn close_search(state: &mut AppState) {
    state.search.active = false;
    state.search.query.clear();
}

fn clamp_list_index(state: &mut AppState) {
    state.list_index = state
        .list_index
        .min(state.catalog.len().saturating_sub(1));
}
