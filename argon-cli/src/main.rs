use argon_core::{Dispatcher, EngineOptions, ServiceLocator, EXIT_FAILURE};
use tracing_subscriber::EnvFilter;

mod demo;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let table = match demo::command_table() {
        Ok(table) => table,
        Err(err) => {
            eprintln!("failed to build command table: {:#}", err);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let options = EngineOptions::new("argon", env!("CARGO_PKG_VERSION"))
        .with_services(ServiceLocator::new().with(demo::Stamp {
            prefix: "Hello".to_string(),
        }))
        .with_global_filter(std::sync::Arc::new(demo::TimingFilter));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = Dispatcher::new(options).run(&table, &args).await;
    std::process::exit(code);
}
