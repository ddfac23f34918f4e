//! # Configuración del servidor
//! src/config.rs
//!
//! Toda la configuración entra por clap: flags CLI con fallback a
//! variables de entorno y defaults razonables.
//!
//! ```bash
//! # Por CLI
//! ./stats_server --port 8080 --workers 4 \
//!   --dataset ./nutrition_activity_obesity_usa_subset.csv
//!
//! # Por entorno
//! HTTP_PORT=8080 TP_NUM_OF_THREADS=4 ./stats_server
//! ```
//!
//! `TP_NUM_OF_THREADS` dimensiona el pool de workers; con 0 (el default)
//! se levanta un worker por core disponible.

use clap::Parser;

/// Configuración del servidor de estadísticas
#[derive(Debug, Clone, Parser)]
#[command(name = "stats_server")]
#[command(about = "Servidor HTTP/1.0 concurrente de estadísticas de nutrición y obesidad")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto TCP de escucha
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Interfaz donde hacer bind
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Workers del pool de jobs (0 = uno por core disponible)
    #[arg(short, long, default_value = "0", env = "TP_NUM_OF_THREADS")]
    pub workers: usize,

    /// Ruta del CSV de la encuesta
    #[arg(
        long,
        default_value = "./nutrition_activity_obesity_usa_subset.csv",
        env = "DATASET_PATH"
    )]
    pub dataset: String,

    /// Directorio donde se publican los resultados de jobs
    #[arg(long = "results-dir", default_value = "./results", env = "RESULTS_DIR")]
    pub results_dir: String,
}

impl Config {
    /// Parsea flags CLI y variables de entorno
    ///
    /// # Ejemplo
    /// ```rust
    /// use stats_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección de bind en formato host:port
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tamaño real del pool: el configurado, o los cores de la máquina
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Chequea rangos y rutas antes de arrancar
    pub fn validate(&self) -> Result<(), String> {
        if self.port < 1024 {
            return Err("Port must be >= 1024 (privileged ports need root)".to_string());
        }

        // 0 significa auto-detectar, no es inválido
        if self.workers > 256 {
            return Err("Workers must be <= 256".to_string());
        }

        if self.dataset.trim().is_empty() {
            return Err("Dataset path must not be empty".to_string());
        }

        if self.results_dir.trim().is_empty() {
            return Err("Results directory must not be empty".to_string());
        }

        Ok(())
    }

    /// Muestra la configuración efectiva al arrancar
    pub fn print_summary(&self) {
        let workers_desc = if self.workers > 0 {
            self.workers.to_string()
        } else {
            format!("{} (auto)", self.effective_workers())
        };

        println!("═════════════════ NutriStats HTTP/1.0 ═════════════════");
        println!("🌐 Listen:       {}", self.address());
        println!("👷 Workers:      {}", workers_desc);
        println!("📄 Dataset:      {}", self.dataset);
        println!("📁 Results dir:  {}", self.results_dir);
        println!("═══════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: 0,
            dataset: "./nutrition_activity_obesity_usa_subset.csv".to_string(),
            results_dir: "./results".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Defaults y address ====================

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.workers, 0);
        assert_eq!(config.results_dir, "./results");
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(Config::default().address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_bind_address_custom_host_and_port() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 9090,
            ..Config::default()
        };

        assert_eq!(config.address(), "0.0.0.0:9090");
    }

    // ==================== Workers ====================

    #[test]
    fn test_effective_workers_auto_is_positive() {
        assert!(Config::default().effective_workers() >= 1);
    }

    #[test]
    fn test_effective_workers_explicit() {
        let config = Config {
            workers: 6,
            ..Config::default()
        };

        assert_eq!(config.effective_workers(), 6);
    }

    // ==================== Validación ====================

    #[test]
    fn test_validate_defaults_pass() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_privileged_port() {
        let config = Config {
            port: 80,
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Port"));
    }

    #[test]
    fn test_validate_too_many_workers() {
        let config = Config {
            workers: 1000,
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Workers"));
    }

    #[test]
    fn test_validate_zero_workers_is_auto() {
        let config = Config {
            workers: 0,
            ..Config::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_dataset() {
        let config = Config {
            dataset: "  ".to_string(),
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Dataset path"));
    }

    #[test]
    fn test_validate_empty_results_dir() {
        let config = Config {
            results_dir: String::new(),
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Results directory"));
    }

    // ==================== Print Summary ====================

    #[test]
    fn test_print_summary_does_not_panic() {
        Config::default().print_summary();

        let explicit = Config {
            port: 9000,
            workers: 8,
            ..Config::default()
        };
        explicit.print_summary();
    }
}
