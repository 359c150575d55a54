use antdoku::io::read_puzzle_file;
use antdoku::solve::{solve, SolverParams};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Solve a Sudoku puzzle with the multi-colony ant system, a single-colony
/// ant system, or backtracking search.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Algorithm: 0 = single-colony ACS, 2 = multi-colony, else backtracking
  #[arg(long, default_value_t = 0)]
  alg: i32,

  /// Time budget in seconds
  #[arg(long, default_value_t = 10)]
  timeout: u32,

  /// Ants per colony (defaults to 4 for the multi-colony system, else 12)
  #[arg(long = "nAnts", alias = "ants")]
  n_ants: Option<usize>,

  /// Greedy-choice probability
  #[arg(long, default_value_t = 0.9)]
  q0: f32,

  /// Pheromone evaporation rate
  #[arg(long, default_value_t = 0.9)]
  rho: f32,

  /// Best-value evaporation rate
  #[arg(long, default_value_t = 0.005)]
  evap: f32,

  /// Number of colonies for the multi-colony system
  #[arg(long = "numColonies")]
  num_colonies: Option<usize>,

  /// How many of the colonies run ACS; the rest run Max-Min
  #[arg(long = "numACS", default_value_t = 2)]
  num_acs: usize,

  /// Convergence-rate floor below which public paths are recommended
  #[arg(long = "convThresh", default_value_t = 0.8)]
  conv_thresh: f32,

  /// Solution-entropy floor below which pheromone fusion applies
  #[arg(long = "entropyThreshold", default_value_t = 4.0)]
  entropy_threshold: f32,

  /// RNG seed for reproducible runs
  #[arg(long)]
  seed: Option<u64>,

  /// Puzzle file (header of two integers, then one value per cell)
  #[arg(long)]
  file: Option<PathBuf>,

  /// Puzzle as a one-line string, `.` for blanks
  #[arg(long)]
  puzzle: Option<String>,

  /// Solve a blank board (requires --order)
  #[arg(long)]
  blank: bool,

  /// Board order for --blank (unit size is order squared)
  #[arg(long)]
  order: Option<usize>,

  /// Human-readable output instead of the two-line contract
  #[arg(long)]
  verbose: bool,

  /// Print the constrained grid after initial propagation
  #[arg(long = "showinitial")]
  show_initial: bool,
}

fn puzzle_string(cli: &Cli) -> Option<String> {
  if cli.blank {
    let order = cli.order?;
    let n = order * order;
    return Some(".".repeat(n * n));
  }
  if let Some(puzzle) = &cli.puzzle {
    return Some(puzzle.clone());
  }
  let file = cli.file.as_ref()?;
  match read_puzzle_file(file) {
    Ok(line) => Some(line),
    Err(e) => {
      eprintln!("could not read {}: {}", file.display(), e);
      None
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  if cli.verbose {
    tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_writer(std::io::stderr)
      .init();
  }

  let Some(puzzle) = puzzle_string(&cli) else {
    eprintln!("no puzzle specified");
    return ExitCode::FAILURE;
  };

  let params = SolverParams {
    alg: cli.alg,
    timeout_secs: cli.timeout,
    n_ants: cli.n_ants.unwrap_or(0),
    num_colonies: cli.num_colonies.unwrap_or(0),
    num_acs: cli.num_acs,
    q0: cli.q0,
    rho: cli.rho,
    best_evap: cli.evap,
    conv_threshold: cli.conv_thresh,
    entropy_threshold: cli.entropy_threshold,
    seed: cli.seed,
    show_initial: cli.show_initial,
  };
  let outcome = solve(&puzzle, &params);

  if cli.show_initial {
    if let Some(grid) = &outcome.telemetry.initial_grid {
      println!("Initial constrained grid");
      println!("{}", grid);
    }
  }

  if !cli.verbose {
    // Contract output: 0 on the first line means success.
    println!("{}", u8::from(!outcome.success));
    println!("{}", outcome.time_secs);
  } else {
    if outcome.success {
      println!("Solution:");
      println!("{}", outcome.pretty);
      println!("solved in {} ({} iterations)", outcome.time_secs, outcome.iterations);
    } else {
      println!("failed in time {}", outcome.time_secs);
      if !outcome.error.is_empty() {
        println!("Error: {}", outcome.error);
      }
    }
    println!("cp_initial_time: {}", outcome.telemetry.initial_cp_secs);
    println!("cp_construct_time: {}", outcome.telemetry.construct_cp_secs);
    println!("cp_calls: {}", outcome.telemetry.cp_commits);
    if let Some(dcm) = outcome.telemetry.dcm {
      println!("dcm_coop_game_time: {}", dcm.coop_game_secs);
      println!("dcm_fusion_time: {}", dcm.fusion_secs);
      println!("dcm_public_path_time: {}", dcm.public_path_secs);
    }
  }
  ExitCode::SUCCESS
}
