use std::path::PathBuf;
use std::process;

use clap::{Args as ClapArgs, Parser, Subcommand};
use rayon::prelude::*;

use layout_generator::config::{BspConfig, LSystemConfig, RoomConfig, RuleSpec};
use layout_generator::error::LayoutError;
use layout_generator::export;
use layout_generator::geometry::Rect;
use layout_generator::{generate_floor_plan, generate_road_network};

#[derive(Parser, Debug)]
#[command(name = "layout_generator")]
#[command(about = "Generate procedural building floor plans and road networks")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a building floor plan via BSP partitioning
    Floorplan(FloorplanArgs),
    /// Generate a road network via L-system expansion
    Roads(RoadsArgs),
}

#[derive(ClapArgs, Debug)]
struct FloorplanArgs {
    /// Boundary width in scene units
    #[arg(short = 'W', long, default_value = "24.0")]
    width: f64,

    /// Boundary height in scene units
    #[arg(short = 'H', long, default_value = "18.0")]
    height: f64,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Minimum room area
    #[arg(long, default_value = "9.0")]
    min_room_area: f64,

    /// Maximum room area
    #[arg(long, default_value = "40.0")]
    max_room_area: f64,

    /// Maximum partition depth
    #[arg(long, default_value = "8")]
    max_depth: u32,

    /// Output file (stdout if not specified); with --count, a numbered
    /// suffix is appended per layout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Number of independent layouts to generate in parallel
    #[arg(long, default_value = "1")]
    count: u64,
}

#[derive(ClapArgs, Debug)]
struct RoadsArgs {
    /// Starting axiom string
    #[arg(long, default_value = "F")]
    axiom: String,

    /// Production rule "SYMBOL=REPLACEMENT" with optional "@PROBABILITY"
    /// suffix; repeat for stochastic rules
    #[arg(long = "rule", default_value = "F=F[+F]F[-F]F")]
    rules: Vec<String>,

    /// Number of rewriting generations
    #[arg(short, long, default_value = "3")]
    iterations: u32,

    /// Length of one draw-forward step
    #[arg(long, default_value = "10.0")]
    step_length: f64,

    /// Turn angle per turn symbol, in degrees
    #[arg(long, default_value = "25.0")]
    angle: f64,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output file (stdout if not specified); with --count, a numbered
    /// suffix is appended per layout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Number of independent networks to generate in parallel
    #[arg(long, default_value = "1")]
    count: u64,
}

fn main() {
    let args = Args::parse();
    let result = match args.command {
        Command::Floorplan(args) => run_floorplan(args),
        Command::Roads(args) => run_roads(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_floorplan(args: FloorplanArgs) -> Result<(), LayoutError> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let boundary = Rect::new(0.0, 0.0, args.width, args.height);
    let bsp_config = BspConfig {
        min_room_area: args.min_room_area,
        max_room_area: args.max_room_area,
        max_depth: args.max_depth,
        ..BspConfig::default()
    };
    let room_config = RoomConfig::default();

    println!("Generating floor plan with seed: {}", seed);
    println!("Boundary: {}x{}", args.width, args.height);

    if args.count > 1 {
        let out = args.out.clone().unwrap_or_else(|| PathBuf::from("floorplan.json"));
        run_batch(seed, args.count, &out, |run_seed, path| {
            let plan = generate_floor_plan(boundary, &bsp_config, &room_config, run_seed)?;
            export::write_floor_plan_file(&plan, path)
        })?;
        return Ok(());
    }

    let plan = generate_floor_plan(boundary, &bsp_config, &room_config, seed)?;
    println!("Created {} rooms, {} connections", plan.rooms.len(), plan.connections.len());

    match &args.out {
        Some(path) => {
            export::write_floor_plan_file(&plan, path)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", export::floor_plan_to_json(&plan)?),
    }
    Ok(())
}

fn run_roads(args: RoadsArgs) -> Result<(), LayoutError> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let rules = args
        .rules
        .iter()
        .map(|r| parse_rule(r))
        .collect::<Result<Vec<_>, _>>()?;
    let config = LSystemConfig {
        axiom: args.axiom.clone(),
        rules,
        iterations: args.iterations,
        step_length: args.step_length,
        angle_increment: args.angle,
        ..LSystemConfig::default()
    };

    println!("Generating road network with seed: {}", seed);
    println!("Axiom: {} ({} iterations)", config.axiom, config.iterations);

    if args.count > 1 {
        let out = args.out.clone().unwrap_or_else(|| PathBuf::from("roads.json"));
        run_batch(seed, args.count, &out, |run_seed, path| {
            let network = generate_road_network(&config, run_seed)?;
            export::write_road_network_file(&network, path)
        })?;
        return Ok(());
    }

    let network = generate_road_network(&config, seed)?;
    println!("Created {} nodes, {} edges", network.nodes.len(), network.edges.len());

    match &args.out {
        Some(path) => {
            export::write_road_network_file(&network, path)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", export::road_network_to_json(&network)?),
    }
    Ok(())
}

/// Run `count` independent generations in parallel. Each run derives its own
/// master seed, so runs share no state and order does not matter.
fn run_batch<F>(seed: u64, count: u64, out: &PathBuf, generate: F) -> Result<(), LayoutError>
where
    F: Fn(u64, &PathBuf) -> Result<(), LayoutError> + Sync,
{
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "layout".to_string());
    let extension = out
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "json".to_string());
    let parent = out.parent().map(PathBuf::from).unwrap_or_default();

    println!("Generating {} layouts in parallel...", count);
    (0..count).into_par_iter().try_for_each(|i| {
        let path = parent.join(format!("{}-{}.{}", stem, i, extension));
        generate(seed.wrapping_add(i), &path)
    })?;
    println!("Wrote {} files", count);
    Ok(())
}

/// Parse "SYMBOL=REPLACEMENT" or "SYMBOL=REPLACEMENT@PROBABILITY".
fn parse_rule(rule: &str) -> Result<RuleSpec, LayoutError> {
    let (symbol_part, rest) = rule.split_once('=').ok_or_else(|| {
        LayoutError::Config(format!("rule '{}' must look like F=F[+F]F", rule))
    })?;
    let mut chars = symbol_part.chars();
    let symbol = chars.next().ok_or_else(|| {
        LayoutError::Config(format!("rule '{}' has no symbol before '='", rule))
    })?;
    if chars.next().is_some() {
        return Err(LayoutError::Config(format!(
            "rule '{}' must rewrite a single symbol",
            rule
        )));
    }

    let (replacement, probability) = match rest.split_once('@') {
        Some((replacement, prob)) => {
            let probability = prob.parse::<f64>().map_err(|_| {
                LayoutError::Config(format!("rule '{}' has an invalid probability", rule))
            })?;
            (replacement.to_string(), probability)
        }
        None => (rest.to_string(), 1.0),
    };

    Ok(RuleSpec {
        symbol,
        replacement,
        probability,
    })
}
