//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define los tipos fundamentales del subsistema de ejecución asíncrona:
//! el enum cerrado de tipos de job, los parámetros, el descriptor inmutable
//! que viaja por la cola, el registro durable que se publica a disco y la
//! vista derivada de estado que reporta el oráculo.

use crate::data::Dataset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tipo de cálculo que ejecuta el job
///
/// Enum cerrado: un tag desconocido se rechaza en el submit, nunca se
/// despacha en silencio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    StatesMean,
    StateMean,
    Best5,
    Worst5,
    GlobalMean,
    DiffFromMean,
    StateDiffFromMean,
    MeanByCategory,
    StateMeanByCategory,
}

impl JobKind {
    /// Parsea el tag tal como llega en la URL del submit
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "states_mean" => Some(JobKind::StatesMean),
            "state_mean" => Some(JobKind::StateMean),
            "best5" => Some(JobKind::Best5),
            "worst5" => Some(JobKind::Worst5),
            "global_mean" => Some(JobKind::GlobalMean),
            "diff_from_mean" => Some(JobKind::DiffFromMean),
            "state_diff_from_mean" => Some(JobKind::StateDiffFromMean),
            "mean_by_category" => Some(JobKind::MeanByCategory),
            "state_mean_by_category" => Some(JobKind::StateMeanByCategory),
            _ => None,
        }
    }

    /// Tag canónico del tipo de job
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::StatesMean => "states_mean",
            JobKind::StateMean => "state_mean",
            JobKind::Best5 => "best5",
            JobKind::Worst5 => "worst5",
            JobKind::GlobalMean => "global_mean",
            JobKind::DiffFromMean => "diff_from_mean",
            JobKind::StateDiffFromMean => "state_diff_from_mean",
            JobKind::MeanByCategory => "mean_by_category",
            JobKind::StateMeanByCategory => "state_mean_by_category",
        }
    }

    /// ¿El cálculo necesita el parámetro `state`?
    pub fn requires_state(&self) -> bool {
        matches!(
            self,
            JobKind::StateMean | JobKind::StateDiffFromMean | JobKind::StateMeanByCategory
        )
    }

    /// Todos los tipos, en el orden en que se registran al arrancar
    pub fn all() -> [JobKind; 9] {
        [
            JobKind::StatesMean,
            JobKind::StateMean,
            JobKind::Best5,
            JobKind::Worst5,
            JobKind::GlobalMean,
            JobKind::DiffFromMean,
            JobKind::StateDiffFromMean,
            JobKind::MeanByCategory,
            JobKind::StateMeanByCategory,
        ]
    }
}

/// Parámetros de un job, deserializados del body JSON del submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParams {
    /// Pregunta de la encuesta sobre la que se calcula
    pub question: String,

    /// Estado, solo para los cálculos por-estado
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Descriptor inmutable de un job encolado
///
/// Se crea en el submit y es propiedad de la cola hasta que exactamente un
/// worker lo saca. Nunca se muta.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    /// Identificador único, asignado por el contador monotónico
    pub id: u64,

    /// Tipo de cálculo
    pub kind: JobKind,

    /// Parámetros del cálculo
    pub params: JobParams,

    /// Handle compartido al dataset en memoria
    pub dataset: Arc<Dataset>,
}

/// Registro durable que un worker publica al terminar un job
///
/// Se serializa como JSON taggeado:
/// `{"outcome": "done", "data": ...}` o `{"outcome": "error", "message": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobOutcome {
    /// El cálculo terminó y produjo un valor
    Done { data: serde_json::Value },

    /// El cálculo falló; el mensaje queda registrado en el archivo
    Error { message: String },
}

/// Vista derivada del estado de un job
///
/// No se almacena: el oráculo la deriva de contador + store en cada consulta.
/// La máquina de estados es monotónica: not-found → running → {done | error}.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatusReport {
    /// El identificador nunca fue emitido
    NotFound,

    /// Emitido pero sin registro publicado (en cola o ejecutándose)
    Running,

    /// Registro publicado con valor
    Done(serde_json::Value),

    /// Registro publicado con falla, o registro corrupto
    Error(String),
}

impl JobStatusReport {
    /// Nombre del estado tal como lo reporta la API
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatusReport::NotFound => "not-found",
            JobStatusReport::Running => "running",
            JobStatusReport::Done(_) => "done",
            JobStatusReport::Error(_) => "error",
        }
    }
}

/// Errores de la operación de submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Shutdown en progreso: no se aceptan más jobs
    ShuttingDown,

    /// El tipo de job no está en el registry
    UnknownJobType(String),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::ShuttingDown => {
                write!(f, "Shutdown in progress, not accepting new jobs")
            }
            SubmitError::UnknownJobType(tag) => write!(f, "Unknown job type: {}", tag),
        }
    }
}

impl std::error::Error for SubmitError {}
