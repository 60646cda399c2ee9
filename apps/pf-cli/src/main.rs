use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use pf_app::{
    AppError, AppResult, BatchProgressEvent, BatchStage, FlapQuery, build_control_surface,
    load_batch_config, load_control_surface, load_store, plan_batch, query_flap, query_reynolds,
    StopFileWatcher, run_batch, save_store,
};
use pf_batch::CancelFlag;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polarflow")]
#[command(about = "polarflow - airfoil polar database and coefficient interpolation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the jobs a batch file would run against its store
    Plan {
        /// Path to the batch YAML file
        config: PathBuf,
    },
    /// Run a batch and merge its results into the store
    Run {
        /// Path to the batch YAML file
        config: PathBuf,
        /// Cancel the batch once this file exists; running jobs still finish
        #[arg(long)]
        stop_file: Option<PathBuf>,
    },
    /// List the polars in a store
    List {
        /// Store snapshot file
        store: PathBuf,
        /// Only polars of this subject
        #[arg(long)]
        subject: Option<String>,
    },
    /// Interpolate a subject's polars in Reynolds number
    Interp {
        /// Store snapshot file
        store: PathBuf,
        subject: String,
        /// Angle of attack [deg]
        #[arg(long, allow_negative_numbers = true)]
        alpha: f64,
        /// Reynolds number
        #[arg(long)]
        re: f64,
        #[arg(long, default_value_t = 0.0)]
        mach: f64,
        #[arg(long, default_value_t = 9.0)]
        ncrit: f64,
    },
    /// Evaluate a control surface defined in YAML
    Flap {
        /// Store snapshot file
        store: PathBuf,
        /// Control surface YAML file
        surface: PathBuf,
        /// Angle of attack [deg]
        #[arg(long, allow_negative_numbers = true)]
        alpha: f64,
        /// Spanwise position
        #[arg(long, allow_negative_numbers = true)]
        span: f64,
        /// Reynolds number
        #[arg(long)]
        re: f64,
        /// Deflection [deg]; the surface starts at 0
        #[arg(long, allow_negative_numbers = true)]
        deflection: Option<f64>,
        /// Time taken to reach the deflection [s]
        #[arg(long, default_value_t = 1.0)]
        dt: f64,
    },
    /// Remove a polar and its detail records from the store
    Remove {
        /// Store snapshot file
        store: PathBuf,
        /// Canonical polar name
        name: String,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan { config } => cmd_plan(&config),
        Commands::Run { config, stop_file } => cmd_run(&config, stop_file.as_deref()),
        Commands::List { store, subject } => cmd_list(&store, subject.as_deref()),
        Commands::Interp {
            store,
            subject,
            alpha,
            re,
            mach,
            ncrit,
        } => cmd_interp(&store, &subject, alpha, re, mach, ncrit),
        Commands::Flap {
            store,
            surface,
            alpha,
            span,
            re,
            deflection,
            dt,
        } => cmd_flap(
            &store,
            &surface,
            FlapQuery {
                alpha,
                span,
                reynolds: re,
                deflection,
                dt_s: dt,
            },
        ),
        Commands::Remove { store, name } => cmd_remove(&store, &name),
    }
}

fn cmd_plan(config_path: &Path) -> AppResult<()> {
    let config = load_batch_config(config_path)?;
    let store = load_store(&config.store)?;
    let plan = plan_batch(&config, &store)?;

    println!(
        "{} job(s) to run, {} already in {}",
        plan.jobs.len(),
        plan.skipped_existing,
        config.store.display()
    );
    for job in &plan.jobs {
        println!("  {}  alpha {}", job.name, job.alpha);
    }
    Ok(())
}

fn cmd_run(config_path: &Path, stop_file: Option<&Path>) -> AppResult<()> {
    let config = load_batch_config(config_path)?;
    let store = Arc::new(load_store(&config.store)?);
    println!("Running batch from {}", config_path.display());

    let cancel = CancelFlag::new();
    let _watcher = match stop_file {
        Some(path) => {
            println!("  Create {} to cancel", path.display());
            Some(StopFileWatcher::spawn(path, cancel.clone())?)
        }
        None => None,
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_batch(
        &config,
        &store,
        &cancel,
        Some(&mut |event| {
            let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    let summary = &response.summary;
    if response.planned == 0 {
        println!(
            "✓ Nothing to run: all {} polar(s) already stored",
            response.skipped_existing
        );
        return Ok(());
    }
    println!(
        "✓ Batch {} finished in {:.1}s",
        &summary.batch_id[..12],
        response.elapsed_s
    );
    println!(
        "  Jobs: {} planned, {} skipped (stored), {} succeeded, {} failed, {} cancelled",
        response.planned, response.skipped_existing, summary.succeeded, summary.failed, summary.cancelled
    );
    println!("  Merge: {}", response.merge);

    if summary.all_failed() {
        println!("✗ Every job failed:");
        for failure in &response.failures {
            println!("  {}: {}", failure.name, failure.reason);
        }
    }

    if response.merge.changed() {
        save_store(&config.store, &store)?;
        println!("  Store saved: {}", config.store.display());
    }
    Ok(())
}

fn cmd_list(store_path: &Path, subject: Option<&str>) -> AppResult<()> {
    let store = load_store(store_path)?;
    let entries: Vec<_> = store
        .entries()
        .into_iter()
        .filter(|e| subject.is_none_or(|s| e.curve.subject() == s))
        .collect();

    if entries.is_empty() {
        println!("No polars found");
        return Ok(());
    }
    println!("Polars in {}:", store_path.display());
    for entry in entries {
        let curve = &entry.curve;
        let (lo, hi) = curve.alpha_range();
        println!(
            "  {}  {}  Re={:.0}  alpha {:.2}..{:.2} ({} points, {} detail records)",
            entry.color,
            curve.name(),
            curve.reynolds(),
            lo,
            hi,
            curve.samples().len(),
            store.details_for(curve.name()).len()
        );
    }
    Ok(())
}

fn cmd_interp(
    store_path: &Path,
    subject: &str,
    alpha: f64,
    reynolds: f64,
    mach: f64,
    ncrit: f64,
) -> AppResult<()> {
    let store = load_store(store_path)?;
    let c = query_reynolds(&store, subject, mach, ncrit, alpha, reynolds)?;
    println!("{subject}  alpha={alpha}  Re={reynolds:.0}");
    println!("  cl = {:.6}", c.cl);
    println!("  cd = {:.6}", c.cd);
    println!("  cm = {:.6}", c.cm);
    Ok(())
}

fn cmd_flap(store_path: &Path, surface_path: &Path, query: FlapQuery) -> AppResult<()> {
    let store = load_store(store_path)?;
    let def = load_control_surface(surface_path)?;
    let mut ctx = build_control_surface(&def, &store)?;
    let answer = query_flap(&mut ctx, &query)?;

    println!(
        "alpha={}  span={}  Re={:.0}  deflection={:.3} deg",
        query.alpha, query.span, query.reynolds, answer.motion.state
    );
    println!("  cl = {:.6}", answer.coefficients.cl);
    println!("  cd = {:.6}", answer.coefficients.cd);
    println!("  cm = {:.6}", answer.coefficients.cm);
    println!("  dcl/dbeta = {:.6} 1/deg", answer.beta_slope);
    println!(
        "  deflection rate = {:.3} deg/s, acceleration = {:.3} deg/s^2",
        answer.motion.state_dt, answer.motion.state_dt_dt
    );
    Ok(())
}

fn cmd_remove(store_path: &Path, name: &str) -> AppResult<()> {
    let store = load_store(store_path)?;
    if !store.remove(name) {
        return Err(AppError::PolarNotFound(name.to_string()));
    }
    save_store(store_path, &store)?;
    println!("✓ Removed {name}");
    Ok(())
}

fn clear_progress_line() {
    eprint!("\r{}\r", " ".repeat(120));
    let _ = io::stderr().flush();
}

fn render_cli_progress(event: &BatchProgressEvent) {
    match (event.stage, event.jobs) {
        (BatchStage::Running, Some((done, total))) => {
            let fraction = event.fraction_complete().unwrap_or(0.0);
            let width = 28usize;
            let filled = ((fraction * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            eprint!(
                "\r[{}] {:>6.2}%  jobs={}/{}  elapsed={:.1}s",
                bar,
                fraction * 100.0,
                done,
                total,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            eprint!("{line}");
        }
    }
    let _ = io::stderr().flush();
}
