
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use canvas::engine::{MovePhase, RemoteOutcome};
use canvas::geometry::Point;
use clap::{Args, Parser, Subcommand, ValueEnum};
use client::{ClientConfig, ClientError, Session};
use frames::{ObjectOptions, ShapeType};
use tracing::info;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected `x,y`, got {text:?}")]
    InvalidPoint { line: usize, text: String },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sketch", about = "Collaborative sketch board client")]
struct Cli {
    /// Relay socket URL. Overrides `SKETCH_RELAY_URL`.
    #[arg(long)]
    url: Option<String>,

    /// Move coalescing interval. Overrides `SKETCH_MOVE_INTERVAL_MS`.
    #[arg(long)]
    move_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every event peers broadcast, one JSON object per line.
    Watch {
        #[arg(long, help = "Stop after this many events")]
        count: Option<usize>,
    },
    /// Place a circle or rectangle.
    Shape(ShapeArgs),
    /// Draw a freehand stroke through `x,y` points read one per line.
    Stroke {
        #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
        input: String,
    },
    /// Clear the canvas for everyone.
    Clear,
    /// Place two shapes, connect them with an arrow and drag the first.
    Demo {
        #[arg(long, default_value_t = 20)]
        steps: u32,
        #[arg(long, default_value_t = 50)]
        step_ms: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShapeArg {
    Circle,
    Rectangle,
}

impl From<ShapeArg> for ShapeType {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Circle => Self::Circle,
            ShapeArg::Rectangle => Self::Rectangle,
        }
    }
}

#[derive(Args, Debug)]
struct ShapeArgs {
    #[arg(value_enum)]
    shape: ShapeArg,
    #[arg(long, default_value_t = 0.0)]
    left: f64,
    #[arg(long, default_value_t = 0.0)]
    top: f64,
    #[arg(long)]
    fill: Option<String>,
    #[arg(long)]
    stroke: Option<String>,
}

impl ShapeArgs {
    fn overrides(&self) -> ObjectOptions {
        ObjectOptions {
            fill: self.fill.clone().map(Some),
            stroke: self.stroke.clone().map(Some),
            ..ObjectOptions::position(self.left, self.top)
        }
    }
}

impl Cli {
    /// Flags applied over the environment configuration.
    fn client_config(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = &self.url {
            config.relay_url.clone_from(url);
        }
        if let Some(ms) = self.move_interval_ms {
            config.move_interval = Duration::from_millis(ms);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    let config = cli.client_config(ClientConfig::from_env()?);
    let mut session = Session::connect(&config).await?;

    let result = match cli.command {
        Command::Watch { count } => run_watch(&mut session, count).await,
        Command::Shape(args) => {
            let id = session.place_shape_with(args.shape.into(), &args.overrides()).await?;
            println!("{id}");
            Ok(())
        }
        Command::Stroke { input } => run_stroke(&mut session, &input).await,
        Command::Clear => session.clear().await.map_err(CliError::from),
        Command::Demo { steps, step_ms } => run_demo(&mut session, steps, Duration::from_millis(step_ms)).await,
    };
    result?;
    session.close().await?;
    Ok(())
}

async fn run_watch(session: &mut Session, count: Option<usize>) -> Result<(), CliError> {
    let mut seen = 0;
    while count.is_none_or(|limit| seen < limit) {
        let (event, outcome) = session.apply_next().await?;
        println!("{}", serde_json::to_string(&event)?);
        if let RemoteOutcome::Dropped(reason) = outcome {
            eprintln!("dropped: {reason}");
        }
        seen += 1;
    }
    info!(events = seen, objects = session.engine().registry.len(), "watch finished");
    Ok(())
}

async fn run_stroke(session: &mut Session, input: &str) -> Result<(), CliError> {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(input)?))
    };
    let points = read_points(reader)?;
    match session.draw_stroke(points).await? {
        Some(id) => println!("{id}"),
        None => eprintln!("no points, nothing drawn"),
    }
    Ok(())
}

/// Parse `x,y` pairs, one per line. Blank lines and `#` comments are skipped.
fn read_points(reader: impl BufRead) -> Result<Vec<Point>, CliError> {
    let mut points = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let invalid = || CliError::InvalidPoint { line: index + 1, text: text.to_owned() };
        let (x, y) = text.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse::<f64>().map_err(|_| invalid())?;
        let y = y.trim().parse::<f64>().map_err(|_| invalid())?;
        points.push(Point::new(x, y));
    }
    Ok(points)
}

async fn run_demo(session: &mut Session, steps: u32, step: Duration) -> Result<(), CliError> {
    let source = session.place_shape_with(ShapeType::Rectangle, &ObjectOptions::position(100.0, 100.0)).await?;
    let target = session.place_shape_with(ShapeType::Circle, &ObjectOptions::position(400.0, 150.0)).await?;
    session.select(&source);
    session.select(&target);
    let line = session.create_arrow().await?;
    info!(%source, %target, %line, "arrow created");

    let path: Vec<Point> = drag_path(Point::new(100.0, 100.0), Point::new(100.0, 350.0), steps).collect();
    for (i, position) in path.iter().enumerate() {
        let phase = if i + 1 == path.len() { MovePhase::Modified } else { MovePhase::Moving };
        session.move_object(&source, position.x, position.y, phase).await?;
        tokio::time::sleep(step).await;
    }
    info!(%source, steps, "drag finished");
    Ok(())
}

/// `steps` evenly spaced positions from just past `from` to `to`.
fn drag_path(from: Point, to: Point, steps: u32) -> impl Iterator<Item = Point> {
    let steps = steps.max(1);
    (1..=steps).map(move |i| {
        let t = f64::from(i) / f64::from(steps);
        Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
    })
}
