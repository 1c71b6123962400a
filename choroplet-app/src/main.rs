use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use choroplet::prelude::{
    ChoroplethConfig, ChoroplethMap, Diagnostic, FileRetriever, HashMap, HttpRetriever, Level,
    Region, RegionStyle, RenderSink, Retriever, ViewportEvent,
};

/// Replays viewport events against a choropleth configuration
#[derive(Parser)]
#[command(name = "choroplet-app")]
#[command(about = "Headless choropleth driver: loads levels lazily and logs what a map would draw")]
#[command(version)]
struct Cli {
    /// JSON configuration file (defaults to the US census layout)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch datasets over HTTP below this URL
    #[arg(long, conflicts_with = "data_dir")]
    base_url: Option<String>,

    /// Read datasets from this directory
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Log every drawn region, not just the summary
    #[arg(short, long)]
    verbose: bool,

    /// Events to replay in order: `zoom:<z>`, `center:<lat>,<lon>`,
    /// `select:<code>` or `select:<property>=<value>`
    events: Vec<CliEvent>,
}

#[derive(Debug, Clone, PartialEq)]
enum CliEvent {
    Zoom(f64),
    Center(f64, f64),
    Select {
        property: Option<String>,
        value: String,
    },
}

impl FromStr for CliEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = s
            .split_once(':')
            .ok_or_else(|| format!("'{}' is not of the form <kind>:<value>", s))?;
        match kind {
            "zoom" => arg
                .parse::<f64>()
                .map(CliEvent::Zoom)
                .map_err(|_| format!("bad zoom '{}'", arg)),
            "center" => {
                let (lat, lon) = arg
                    .split_once(',')
                    .ok_or_else(|| format!("center needs <lat>,<lon>, got '{}'", arg))?;
                let lat = lat
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("bad latitude '{}'", lat))?;
                let lon = lon
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("bad longitude '{}'", lon))?;
                Ok(CliEvent::Center(lat, lon))
            }
            "select" => Ok(match arg.split_once('=') {
                Some((property, value)) => CliEvent::Select {
                    property: Some(property.to_string()),
                    value: value.to_string(),
                },
                None => CliEvent::Select {
                    property: None,
                    value: arg.to_string(),
                },
            }),
            other => Err(format!("unknown event kind '{}'", other)),
        }
    }
}

impl CliEvent {
    fn into_viewport_event(self, code_property: &str) -> ViewportEvent {
        match self {
            CliEvent::Zoom(zoom) => ViewportEvent::ZoomChanged { zoom },
            CliEvent::Center(lat, lon) => ViewportEvent::CenterChanged { lat, lon },
            CliEvent::Select { property, value } => {
                let property = property.unwrap_or_else(|| code_property.to_string());
                let mut properties = HashMap::default();
                properties.insert(property, serde_json::Value::String(value));
                ViewportEvent::FeatureSelected { properties }
            }
        }
    }
}

/// Sink that logs instead of drawing
#[derive(Debug, Default)]
struct LogSink {
    verbose: bool,
    drawn: usize,
    notices: usize,
}

impl RenderSink for LogSink {
    fn clear(&mut self, level: Level) {
        log::info!("rendering {} level", level);
        self.drawn = 0;
    }

    fn draw_region(&mut self, region: &Region, style: &RegionStyle, label: &str) {
        self.drawn += 1;
        if self.verbose {
            log::info!("  {} fill {} [{}]", label, style.fill_color, region.key);
        }
    }

    fn center_region(&mut self, level: Level, region: Option<&Region>) {
        match region {
            Some(region) => log::info!("center: {} ({})", region.display_name, level),
            None => log::info!("center: outside every {} region", level),
        }
    }

    fn notice(&mut self, diagnostic: &Diagnostic) {
        self.notices += 1;
        log::warn!("{:?} at {}: {}", diagnostic.kind, diagnostic.level, diagnostic.message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &cli.config {
        Some(path) => ChoroplethConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ChoroplethConfig::default(),
    };

    let retriever: Arc<dyn Retriever> = match &cli.base_url {
        Some(url) => Arc::new(HttpRetriever::new(url.clone())),
        None => Arc::new(FileRetriever::new(cli.data_dir.clone())),
    };

    let sink = LogSink {
        verbose: cli.verbose,
        ..LogSink::default()
    };
    let mut map = ChoroplethMap::new(&config, retriever, sink)?;

    map.start().await;
    log::info!("drew {} regions", map.sink().drawn);

    for event in cli.events {
        let event = event.into_viewport_event(&config.expand.code_property);
        log::debug!("event {:?}", event);
        let transition = map.handle_event(event);
        // a replay has nothing else to do while a level loads
        map.settle().await;
        if let Some(transition) = transition {
            log::info!(
                "{} -> {} by {:?}, drew {} regions",
                transition.from,
                transition.to,
                transition.trigger,
                map.sink().drawn
            );
        }
    }

    let sink = map.into_sink();
    if sink.notices > 0 {
        log::warn!("finished with {} degraded-state notices", sink.notices);
    }
    Ok(())
}
