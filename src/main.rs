use std::sync::Arc;

use tour_engine::config::EngineConfig;
use tour_engine::navigation::{MemoryNavigator, Navigator};
use tour_engine::overlay::{CallbackType, RendererAction, RendererCallback, RendererStatus};
use tour_engine::resolver::{PageElement, PageOracle, StaticPage};
use tour_engine::{EngineDeps, TourEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EngineConfig::from_env()?;

    eprintln!("Tour Engine v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   User: {}", config.user_id);
    eprintln!("   Default tour: {}", config.default_tour);
    match &config.db_path {
        Some(path) => eprintln!("   Settings: {}", path.display()),
        None => eprintln!("   Settings: in-memory"),
    }

    // ── Simulated page ──────────────────────────────────────────────
    // The assistant and project button are rendered; the dashboard widget
    // is not, so that step falls back to a centered tooltip.
    let page = Arc::new(StaticPage::new());
    page.insert(PageElement::tour_anchor("nav", "sidebar"));
    page.insert(PageElement::tour_anchor("button", "new-project"));
    page.insert(PageElement::tour_anchor("aside", "assistant"));

    let navigator = Arc::new(MemoryNavigator::new("/"));
    let settings = TourEngine::open_settings(&config).await?;

    let mut engine = TourEngine::new(
        config,
        EngineDeps {
            navigator: Arc::clone(&navigator) as Arc<dyn Navigator>,
            page: page as Arc<dyn PageOracle>,
            settings,
        },
    )
    .await;

    let tour = engine.config().default_tour.clone();
    if !engine.start_if_unseen(&tour) {
        eprintln!("\n'{tour}' was already seen. Set TOUR_DB_PATH to a fresh file to replay it.");
        engine.shutdown().await;
        return Ok(());
    }

    // Drive the tour the way the overlay renderer would: one `step:after`
    // per click on "next" until the tour ends.
    while engine.session().is_active() {
        let index = engine.snapshot().step_index;
        if let Some(step) = engine.current_renderer_step() {
            eprintln!(
                "\n[{index}] {} -> {} ({:?})\n    {}",
                step.title, step.target, step.placement, step.content
            );
        }
        eprintln!("    route: {}", navigator.current_route());

        // Let the notifier catch up before reading the assistant.
        tokio::task::yield_now().await;
        let assistant = engine.assistant();
        if !assistant.message.is_empty() {
            eprintln!("    {}: {}", assistant.name, assistant.message);
        }

        engine.handle_renderer_callback(&RendererCallback::new(
            RendererAction::Next,
            index,
            RendererStatus::Running,
            CallbackType::StepAfter,
        ));
    }

    tokio::task::yield_now().await;
    let assistant = engine.assistant();
    eprintln!("\n{}: {}", assistant.name, assistant.message);
    eprintln!(
        "Seen '{tour}': {}\n{}",
        engine.has_seen(&tour),
        serde_json::to_string_pretty(&engine.snapshot())?
    );

    engine.shutdown().await;
    Ok(())
}
