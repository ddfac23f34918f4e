//! # NutriStats Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 concurrente de estadísticas de salud pública
//! (nutrición, actividad física y obesidad). Los cálculos agregados se
//! ejecutan como jobs asíncronos: el submit retorna un id al instante y
//! el cliente pollea hasta que el resultado esté publicado.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing y manejo del protocolo HTTP/1.0
//! - `server`: Lógica del servidor TCP y manejo de conexiones
//! - `router`: Enrutamiento de peticiones a handlers
//! - `data`: Ingesta del CSV y lookup anidado en memoria
//! - `stats`: Los nueve cálculos estadísticos
//! - `jobs`: Subsistema asíncrono (cola, workers, store, oráculo de estado)
//! - `metrics`: Recolección de métricas y observabilidad
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use std::sync::Arc;
//! use stats_server::config::Config;
//! use stats_server::data::Dataset;
//! use stats_server::jobs::{ComputationRegistry, JobScheduler, ResultStore};
//! use stats_server::server::Server;
//!
//! let config = Config::new();
//! let dataset = Arc::new(Dataset::from_csv_path(&config.dataset).expect("dataset"));
//! let store = ResultStore::new(&config.results_dir).expect("results dir");
//! let scheduler = Arc::new(JobScheduler::new(
//!     config.effective_workers(),
//!     dataset,
//!     store,
//!     ComputationRegistry::with_all_kinds(),
//! ));
//!
//! let server = Server::new(config, scheduler);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod http;
pub mod config;
pub mod server;
pub mod router;
pub mod data;
pub mod stats;
pub mod jobs;
pub mod metrics;
