use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::Terminal;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem};

use pokebattle::action::Action;
use pokebattle::api::{self, ClientConfig, CreatureSource, PokeApiClient};
use pokebattle::catalog;
use pokebattle::effect::Effect;
use pokebattle::reducer::reducer;
use pokebattle::state::{
    AppState, Settings, DEFAULT_OPPONENT_DELAY_MS, DEFAULT_PAGE_SIZE, DEFAULT_RESULT_DELAY_MS,
};
use pokebattle::ui;

const OPPONENT_TURN_TASK: &str = "opponent_turn";
const BATTLE_FINISH_TASK: &str = "battle_finish";

#[derive(Parser, Debug)]
#[command(name = "pokebattle")]
#[command(about = "Browse Pokemon and battle them in the terminal")]
struct Args {
    #[command(flatten)]
    debug: DebugCliArgs,
    /// Entries requested per catalog page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=100))]
    page_size: u32,
    #[arg(long, default_value = api::DEFAULT_API_BASE)]
    api_base: String,
    /// Delay before the opponent attacks
    #[arg(long, default_value_t = DEFAULT_OPPONENT_DELAY_MS)]
    opponent_delay_ms: u64,
    /// Delay between the final blow and the result screen
    #[arg(long, default_value_t = DEFAULT_RESULT_DELAY_MS)]
    result_delay_ms: u64,
    /// HTTP response cache directory (defaults to the user cache dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    let debug = DebugSession::new(args.debug);
    debug.save_state_schema::<AppState>().map_err(debug_error)?;
    debug.save_actions_schema::<Action>().map_err(debug_error)?;

    let settings = Settings {
        page_size: args.page_size,
        opponent_delay_ms: args.opponent_delay_ms,
        result_delay_ms: args.result_delay_ms,
    };
    let cache_dir = if args.no_cache {
        None
    } else {
        args.cache_dir.or_else(api::default_cache_dir)
    };
    let source: Arc<dyn CreatureSource> = Arc::new(PokeApiClient::new(ClientConfig {
        base_url: args.api_base.trim_end_matches('/').to_string(),
        cache_dir,
    }));

    let mut state = debug
        .load_state_or_else_async(|| async move { Ok::<AppState, io::Error>(AppState::new(settings)) })
        .await
        .map_err(debug_error)?;
    state.settings = settings;

    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions, source).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
    source: Arc<dyn CreatureSource>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(120), || Action::Tick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            move |effect, ctx| handle_effect(effect, ctx, source.clone()),
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>, source: Arc<dyn CreatureSource>) {
    match effect {
        Effect::LoadPage { request } => {
            ctx.tasks().spawn(TaskKey::new("catalog_page"), async move {
                let creatures = catalog::fetch_page(source, request).await;
                Action::CatalogPageDidLoad { request, creatures }
            });
        }
        Effect::SearchRemote { query } => {
            ctx.tasks().spawn(TaskKey::new("search"), async move {
                let creature = catalog::resolve_search(source, query.clone()).await;
                Action::SearchDidResolve { query, creature }
            });
        }
        Effect::ResolveEvolution { from_id, name } => {
            ctx.tasks().spawn(TaskKey::new("evolve"), async move {
                let resolution = catalog::resolve_evolution(source, name).await;
                Action::EvolveDidResolve {
                    from_id,
                    resolution,
                }
            });
        }
        Effect::LoadOpponent { id } => {
            ctx.tasks().spawn(TaskKey::new("opponent"), async move {
                let creature = source.fetch_details(&id.to_string()).await;
                Action::OpponentDidLoad { id, creature }
            });
        }
        Effect::ScheduleOpponentTurn {
            battle_id,
            delay_ms,
        } => {
            ctx.tasks()
                .spawn(TaskKey::new(OPPONENT_TURN_TASK), async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Action::BattleOpponentTurn { battle_id }
                });
        }
        Effect::ScheduleBattleFinish {
            battle_id,
            delay_ms,
        } => {
            ctx.tasks()
                .spawn(TaskKey::new(BATTLE_FINISH_TASK), async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Action::BattleFinish { battle_id }
                });
        }
        Effect::CancelBattleTimers => {
            ctx.tasks().cancel(&TaskKey::new(OPPONENT_TURN_TASK));
            ctx.tasks().cancel(&TaskKey::new(BATTLE_FINISH_TASK));
        }
    }
}
