//! Command-line front end for H/V ARMA estimation.
//!
//! Usage:
//!   hvarma run STA.Z.sac STA.N.sac STA.E.sac --args params.txt --write
//!   hvarma order-search STA.Z.sac STA.N.sac STA.E.sac --start-order 10 --tol 0.1

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hvarma::order_search::find_optimal_order;
use hvarma::report::{run_summary, write_order_search, write_run};
use hvarma::{run_model, ModelParameters, Signal};

#[derive(Parser)]
#[command(name = "hvarma")]
#[command(about = "H/V spectral ratio of ambient noise from windowed ARMA models")]
struct Cli {
    /// Only log warnings and errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Print the result summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate the H/V ratio at a fixed model order
    Run(Inputs),
    /// Search the smallest model order with stable resonance peaks
    OrderSearch {
        #[command(flatten)]
        inputs: Inputs,

        /// First order tested (at least 4)
        #[arg(long, default_value = "4")]
        start_order: usize,

        /// Allowed change of the peak frequencies, in Hz
        #[arg(long, default_value = "0.05")]
        tol: f64,
    },
}

#[derive(Args)]
struct Inputs {
    /// Vertical component (SAC)
    z: PathBuf,
    /// North component (SAC)
    n: PathBuf,
    /// East component (SAC)
    e: PathBuf,

    /// Parameter file with key=value lines
    #[arg(long = "args")]
    args_file: Option<PathBuf>,

    #[arg(long)]
    model_order: Option<usize>,

    #[arg(long)]
    maxtau: Option<usize>,

    #[arg(long)]
    window_size: Option<usize>,

    #[arg(long)]
    overlap: Option<usize>,

    #[arg(long)]
    max_windows: Option<usize>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write result tables under the output directory
    #[arg(long)]
    write: bool,
}

impl Inputs {
    fn parameters(&self) -> Result<ModelParameters> {
        let base = match &self.args_file {
            Some(path) => ModelParameters::from_file(path)
                .with_context(|| format!("loading parameters from {}", path.display()))?,
            None => ModelParameters::default(),
        };

        let mut overrides: Vec<(&str, String)> = Vec::new();
        let numeric = [
            ("model_order", self.model_order),
            ("maxtau", self.maxtau),
            ("window_size", self.window_size),
            ("overlap", self.overlap),
            ("max_windows", self.max_windows),
        ];
        for (key, value) in numeric {
            if let Some(v) = value {
                overrides.push((key, v.to_string()));
            }
        }
        if let Some(dir) = &self.output_dir {
            overrides.push(("output_dir", dir.display().to_string()));
        }

        Ok(base.update(overrides.iter().map(|(k, v)| (*k, v.as_str())))?)
    }

    fn signal(&self) -> Result<Signal> {
        Signal::from_sac(&self.z, &self.n, &self.e).with_context(|| {
            format!(
                "reading {}, {}, {}",
                self.z.display(),
                self.n.display(),
                self.e.display()
            )
        })
    }
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    match &cli.command {
        Command::Run(inputs) => {
            let params = inputs.parameters()?;
            let signal = inputs.signal()?;
            let stats = run_model(&signal, &params)?;

            if inputs.write {
                let path = write_run(&stats)?;
                info!(path = %path.display(), "wrote results");
            }

            let summary = run_summary(&stats);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let peak = summary.peak;
                println!(
                    "{} p={} windows={}",
                    summary.station, summary.model_order, summary.num_windows
                );
                println!("Positive frequency: {:.4} +/- {:.4} Hz", peak.pos_freq, peak.pos_err);
                println!("Negative frequency: {:.4} +/- {:.4} Hz", peak.neg_freq, peak.neg_err);
            }
        }
        Command::OrderSearch {
            inputs,
            start_order,
            tol,
        } => {
            let params = inputs.parameters()?;
            let signal = inputs.signal()?;
            let result = find_optimal_order(&signal, &params, *tol, *start_order)?;

            if inputs.write {
                let dir = hvarma::report::output_directory(&params);
                write_order_search(&dir, &result)?;
                write_run(&result.statistics)?;
            }

            let summary = result.summary(params.freq_conf());
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{} optimal order {} ({})",
                    summary.station,
                    summary.final_order,
                    if summary.success {
                        "converged"
                    } else {
                        "tolerance not reached"
                    }
                );
                println!("Tested orders: {:?}", summary.tested_orders);
                let peak = summary.peak;
                println!("Positive frequency: {:.4} +/- {:.4} Hz", peak.pos_freq, peak.pos_err);
                println!("Negative frequency: {:.4} +/- {:.4} Hz", peak.neg_freq, peak.neg_err);
            }
            result.into_converged()?;
        }
    }
    Ok(())
}
