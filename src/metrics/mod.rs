//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección y agregación de métricas del servidor:
//! - Contadores de requests por código y por ruta
//! - Latencias (p50, p95, p99)
//! - Conexiones activas

pub mod collector;

pub use collector::MetricsCollector;
