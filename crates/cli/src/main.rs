use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;

use lexibar_core::visual::derive_visual;
use lexibar_core::{
    ContextId, DataSeries, DerivedVisual, IconStyle, PipelineError, SeriesLoadState,
    StateSnapshot, UpdateProgress,
};
use lexibar_indicator::{Indicator, IndicatorOptions};
use lexibar_surface::{KeyEcho, MessageLookup, SurfacePair, SurfaceResult, ToolbarSurface};

#[derive(Parser, Debug)]
#[command(name = "lexibarctl", version, about = "Lexibar toolbar-indicator tool")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive the toolbar visual for a snapshot JSON (file, or stdin when omitted)
    Derive {
        /// Snapshot JSON file
        file: Option<PathBuf>,
    },
    /// Drive a scripted loader sequence through the real coalescer
    Simulate(SimulateArgs),
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Milliseconds between producer ticks
    #[arg(long = "tick-ms", default_value_t = 40)]
    tick_ms: u64,
    /// Progress steps for the download phase
    #[arg(long = "steps", default_value_t = 10)]
    steps: u32,
    /// Use the alternate icon skin
    #[arg(long = "alt-style", action = ArgAction::SetTrue)]
    alt_style: bool,
    /// Inject a pipeline error with this name at the end (e.g. NetworkError)
    #[arg(long = "error")]
    error: Option<String>,
    /// Minimum interval between tooltip updates
    #[arg(long = "title-interval-ms", env = "LEXIBAR_TITLE_INTERVAL_MS", default_value_t = 2500)]
    title_interval_ms: u64,
    /// Mirror effects to a secondary surface as well
    #[arg(long = "secondary", action = ArgAction::SetTrue)]
    secondary: bool,
    /// Scope the simulation to one UI context id
    #[arg(long = "context")]
    context: Option<ContextId>,
}

fn init_tracing() {
    let env = std::env::var("LEXIBAR_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("LEXIBAR_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid LEXIBAR_METRICS_ADDR; expected host:port");
        }
    }
}

/// Surface that renders effects as log lines; stands in for the host.
struct TraceSurface {
    name: &'static str,
}

#[async_trait::async_trait]
impl ToolbarSurface for TraceSurface {
    async fn set_icon(&self, icon_key: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        info!(surface = self.name, icon = %icon_key, ctx = ?context, "set_icon");
        Ok(())
    }

    async fn set_title(&self, title: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        info!(surface = self.name, title = %title, ctx = ?context, "set_title");
        Ok(())
    }

    async fn set_badge_text(&self, text: &str, context: Option<ContextId>) -> SurfaceResult<()> {
        info!(surface = self.name, text = %text, ctx = ?context, "set_badge_text");
        Ok(())
    }

    async fn set_badge_background_color(
        &self,
        color: Option<&str>,
        context: Option<ContextId>,
    ) -> SurfaceResult<()> {
        info!(surface = self.name, color = ?color, ctx = ?context, "set_badge_background_color");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Derive { file } => run_derive(file, cli.output),
        Commands::Simulate(args) => run_simulate(cli.output, args).await,
    }
}

fn run_derive(file: Option<PathBuf>, output: Output) -> Result<()> {
    let text = match file {
        Some(p) => std::fs::read_to_string(&p).with_context(|| format!("reading {}", p.display()))?,
        None => {
            let mut s = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut s)
                .context("reading snapshot from stdin")?;
            s
        }
    };
    let snap: StateSnapshot = serde_json::from_str(&text).context("parsing snapshot JSON")?;
    let visual = derive_visual(&snap);
    print_visual(&visual, output)
}

async fn run_simulate(output: Output, args: SimulateArgs) -> Result<()> {
    let tick = Duration::from_millis(args.tick_ms);
    let primary: Arc<dyn ToolbarSurface> = Arc::new(TraceSurface { name: "browser_action" });
    let pair = if args.secondary {
        SurfacePair::with_secondary(primary, Arc::new(TraceSurface { name: "compose_action" }))
    } else {
        SurfacePair::single(primary)
    };
    let indicator = Indicator::with_options(
        pair,
        Arc::new(KeyEcho),
        IndicatorOptions { title_min_interval: Duration::from_millis(args.title_interval_ms) },
    );

    let mut snap = StateSnapshot::initial(true);
    if args.alt_style {
        snap.style = IconStyle::Alternate;
    }
    snap.context = args.context;
    indicator.submit(snap.clone());

    info!("simulate: load phase");
    for series in DataSeries::ALL {
        tokio::time::sleep(tick).await;
        snap.load_state.insert(series, SeriesLoadState::Loading);
        indicator.submit(snap.clone());
        tokio::time::sleep(tick).await;
        snap.load_state.insert(series, SeriesLoadState::Ok);
        indicator.submit(snap.clone());
    }

    info!("simulate: update phase");
    snap.update_progress = UpdateProgress::Checking { series: DataSeries::Words };
    indicator.submit(snap.clone());
    let steps = args.steps.max(1);
    for step in 0..=steps {
        tokio::time::sleep(tick).await;
        snap.update_progress = UpdateProgress::Updating {
            series: DataSeries::Words,
            total_progress: step as f32 / steps as f32,
        };
        indicator.submit(snap.clone());
    }

    snap.update_progress = UpdateProgress::Idle;
    if let Some(name) = args.error {
        snap.load_state.insert(DataSeries::Words, SeriesLoadState::Error);
        snap.last_error = Some(PipelineError::new(name, "injected by simulate"));
    }
    indicator.submit(snap);
    indicator.settled().await;

    let visual = indicator.last_visual().context("no cycle rendered")?;
    print_visual(visual.as_ref(), output)
}

fn print_visual(v: &DerivedVisual, output: Output) -> Result<()> {
    match output {
        Output::Human => {
            println!("icon: {}", v.icon_key);
            println!("tooltip: {}", KeyEcho.message(&v.tooltip_key, &v.tooltip_args));
            if v.badge_text.is_empty() {
                println!("badge: (none)");
            } else {
                println!(
                    "badge: {} ({})",
                    v.badge_text,
                    v.badge_color.as_deref().unwrap_or("default")
                );
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(v)?),
    }
    Ok(())
}
