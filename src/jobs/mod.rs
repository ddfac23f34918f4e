//! # Subsistema Asíncrono de Jobs
//!
//! Ejecuta los cálculos estadísticos fuera del ciclo request/response:
//! el submit encola y retorna un id al instante, un pool fijo de workers
//! procesa en orden FIFO, cada resultado se publica atómicamente a disco
//! y el cliente pollea hasta verlo.
//!
//! ## Endpoints
//!
//! - `POST /api/{tipo_de_calculo}` - Encolar job, retorna `{"job_id": N}`
//! - `GET /api/get_results/{id}` - Consultar estado y resultado
//! - `GET /api/num_jobs` - Jobs aún no terminados
//! - `GET /api/graceful_shutdown` - Solicitar cierre ordenado

pub mod handlers;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod types;

pub use queue::JobQueue;
pub use registry::{ComputationRegistry, ComputeFn};
pub use scheduler::JobScheduler;
pub use store::{ResultStore, StoreError};
pub use types::{JobDescriptor, JobKind, JobOutcome, JobParams, JobStatusReport, SubmitError};
