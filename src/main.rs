use stress_test::{stress_test_convergence, stress_test_scaling, StressConfig, StressError};
use tracing::error;
pub mod stress_test;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = async_main().await {
        error!(%err, "Stress run failed");
        std::process::exit(1);
    }
}

async fn async_main() -> Result<(), StressError> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            ASYNC STRESS TESTS                               ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Small scale
    let stats = stress_test_convergence(&StressConfig::default()).await?;
    stats.print();

    // Many clients on an empty document
    let stats = stress_test_convergence(&StressConfig {
        num_clients: 10,
        edits_per_client: 500,
        initial_length: 0,
        seed: 1,
    })
    .await?;
    stats.print();

    // Long document, few clients
    let stats = stress_test_convergence(&StressConfig {
        num_clients: 3,
        edits_per_client: 1000,
        initial_length: 2000,
        seed: 2,
    })
    .await?;
    stats.print();

    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS                                  ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(20, 4).await?;

    println!("\n✓ All stress tests completed successfully!");
    Ok(())
}
