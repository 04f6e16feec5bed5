//! Model order search on a synthetic recording.
//!
//! Run with: cargo run --release --example order_search

use hvarma::order_search::find_optimal_order;
use hvarma::report::order_search_series;
use hvarma::simulation::{resonant_noise, ResonanceSpec};
use hvarma::ModelParameters;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let signal = resonant_noise(&ResonanceSpec::default(), 40_000, Some(5))?;
    let params = ModelParameters::builder()
        .window_size(512)
        .max_windows(60)
        .frequency_range(-10.0, 10.0)
        .freq_points(1000)
        .build()?;

    let result = find_optimal_order(&signal, &params, 0.1, 4)?;
    let series = order_search_series(&result);

    println!("{:>6} {:>10} {:>10}", "order", "pos", "neg");
    for ((order, pos), neg) in series.orders.iter().zip(&series.pos_freq).zip(&series.neg_freq) {
        let marker = if *order == result.final_order { " <-" } else { "" };
        println!("{:>6} {:>10.3} {:>10.3}{}", order, pos, neg, marker);
    }

    let result = result.into_converged()?;
    println!("\nSelected order {} for {}", result.final_order, result.station);
    Ok(())
}
