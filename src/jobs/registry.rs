//! # Registry de Cálculos
//! src/jobs/registry.rs
//!
//! Tabla que mapea cada tipo de job a la función pura que lo resuelve.
//! El submit consulta el registry para rechazar tipos no soportados antes
//! de encolar; el worker lo consulta de nuevo al ejecutar, y si el tipo no
//! está (un registry armado a mano sin todos los cálculos) el job termina
//! con un registro de error en vez de tirar el worker.

use crate::data::Dataset;
use crate::jobs::types::{JobKind, JobParams};
use crate::stats;

/// Firma de un cálculo: dataset + parámetros → valor JSON o mensaje de error
pub type ComputeFn = fn(&Dataset, &JobParams) -> Result<serde_json::Value, String>;

/// Registry de funciones de cálculo por tipo de job
pub struct ComputationRegistry {
    entries: Vec<(JobKind, ComputeFn)>,
}

impl ComputationRegistry {
    /// Crea un registry vacío
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Crea el registry con los nueve cálculos del servidor
    pub fn with_all_kinds() -> Self {
        let mut registry = Self::new();

        registry.register(JobKind::StatesMean, stats::states_mean);
        registry.register(JobKind::StateMean, stats::state_mean);
        registry.register(JobKind::Best5, stats::best5);
        registry.register(JobKind::Worst5, stats::worst5);
        registry.register(JobKind::GlobalMean, stats::global_mean);
        registry.register(JobKind::DiffFromMean, stats::diff_from_mean);
        registry.register(JobKind::StateDiffFromMean, stats::state_diff_from_mean);
        registry.register(JobKind::MeanByCategory, stats::mean_by_category);
        registry.register(JobKind::StateMeanByCategory, stats::state_mean_by_category);

        registry
    }

    /// Registra un cálculo; reemplaza si el tipo ya estaba
    pub fn register(&mut self, kind: JobKind, compute: ComputeFn) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = compute;
        } else {
            self.entries.push((kind, compute));
        }
    }

    /// Busca la función para un tipo de job
    pub fn resolve(&self, kind: JobKind) -> Option<ComputeFn> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, compute)| *compute)
    }

    /// ¿El tipo está registrado?
    pub fn supports(&self, kind: JobKind) -> bool {
        self.resolve(kind).is_some()
    }

    /// Cantidad de cálculos registrados
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Verifica si el registry está vacío
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ComputationRegistry {
    fn default() -> Self {
        Self::with_all_kinds()
    }
}
