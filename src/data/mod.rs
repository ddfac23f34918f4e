//! # Módulo de Datos
//! src/data/mod.rs
//!
//! Ingesta del CSV de encuestas de salud pública (nutrición, actividad
//! física y obesidad) y estructura de lookup en memoria.
//!
//! El dataset se carga una sola vez al arrancar el servidor y se comparte
//! read-only (vía `Arc`) con todos los workers del scheduler.
//!
//! ## Estructura
//!
//! ```text
//! estado → pregunta → categoría de estratificación → valor de estratificación → mediciones
//! ```

pub mod ingestor;

pub use ingestor::{CategoryBreakdown, Dataset, IngestError};
