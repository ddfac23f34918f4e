//! # NutriStats Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor de estadísticas. El orden de arranque
//! importa: configuración → dataset → scheduler (pool de workers) →
//! listener TCP. Si el dataset no carga, no hay nada que servir.

use std::sync::Arc;

use stats_server::config::Config;
use stats_server::data::Dataset;
use stats_server::jobs::{ComputationRegistry, JobScheduler, ResultStore};
use stats_server::server::Server;

fn main() {
    println!("=================================");
    println!("  NutriStats HTTP/1.0 Server");
    println!("=================================\n");

    // Configuración desde CLI y variables de entorno
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(1);
    }

    config.print_summary();

    // Ingesta del dataset, una sola vez y compartido read-only
    println!("📊 Cargando dataset desde {}...", config.dataset);
    let dataset = match Dataset::from_csv_path(&config.dataset) {
        Ok(dataset) => {
            println!(
                "✅ Dataset cargado: {} filas válidas, {} estados\n",
                dataset.row_count(),
                dataset.state_count()
            );
            Arc::new(dataset)
        }
        Err(e) => {
            eprintln!("💥 Error cargando dataset: {}", e);
            std::process::exit(1);
        }
    };

    // Store de resultados: crea el directorio si hace falta
    let store = match ResultStore::new(&config.results_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("💥 Error preparando {}: {}", config.results_dir, e);
            std::process::exit(1);
        }
    };

    // Scheduler de jobs: acá arranca el pool de workers
    let scheduler = Arc::new(JobScheduler::new(
        config.effective_workers(),
        dataset,
        store,
        ComputationRegistry::with_all_kinds(),
    ));

    // Iniciar el servidor (esto bloqueará el thread)
    let server = Server::new(config, scheduler);
    if let Err(e) = server.run() {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}
