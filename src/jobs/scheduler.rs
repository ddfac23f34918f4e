//! # Scheduler de Jobs
//! src/jobs/scheduler.rs
//!
//! El objeto central del subsistema asíncrono: es dueño de la cola, del
//! store de resultados, del registry de cálculos y del pool de workers.
//! No hay estado global; el servidor recibe el scheduler ya construido y
//! todos los handlers operan a través de él.
//!
//! El pool es de tamaño fijo: N threads arrancan en `new()` y viven hasta
//! que el shutdown cierra la cola y cada worker la drena. Un job que falla
//! (error del cálculo o panic) produce un registro de error y el worker
//! sigue con el próximo; una falla jamás tira un thread del pool.

use crate::data::Dataset;
use crate::jobs::queue::JobQueue;
use crate::jobs::registry::ComputationRegistry;
use crate::jobs::store::{ResultStore, StoreError};
use crate::jobs::types::{JobKind, JobOutcome, JobParams, JobStatusReport, SubmitError};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Jobs terminados desde el arranque, por resultado
#[derive(Debug, Default)]
struct JobCounters {
    completed: u64,
    failed: u64,
}

/// Scheduler dueño de la cola, el store, el registry y los workers
pub struct JobScheduler {
    /// Cola FIFO compartida con los workers
    queue: JobQueue,

    /// Store durable de resultados
    store: ResultStore,

    /// Tabla de cálculos soportados
    registry: Arc<ComputationRegistry>,

    /// Dataset inmutable compartido por todos los jobs
    dataset: Arc<Dataset>,

    /// Ids actualmente en ejecución en algún worker
    running: Arc<Mutex<HashSet<u64>>>,

    /// Totales de jobs terminados, para el endpoint de métricas
    counters: Arc<Mutex<JobCounters>>,

    /// Handles de los workers, para join() al final
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Tamaño del pool
    worker_count: usize,
}

impl JobScheduler {
    /// Crea el scheduler y arranca el pool de workers
    pub fn new(
        worker_count: usize,
        dataset: Arc<Dataset>,
        store: ResultStore,
        registry: ComputationRegistry,
    ) -> Self {
        let scheduler = Self {
            queue: JobQueue::new(),
            store,
            registry: Arc::new(registry),
            dataset,
            running: Arc::new(Mutex::new(HashSet::new())),
            counters: Arc::new(Mutex::new(JobCounters::default())),
            workers: Mutex::new(Vec::new()),
            // Con cero workers la cola no drenaría nunca
            worker_count: worker_count.max(1),
        };

        scheduler.spawn_workers();
        scheduler
    }

    /// Arranca los N threads del pool
    fn spawn_workers(&self) {
        let mut handles = self.workers.lock().unwrap();

        for i in 0..self.worker_count {
            let name = format!("calc-{}", i);
            let queue = self.queue.clone();
            let store = self.store.clone();
            let registry = Arc::clone(&self.registry);
            let running = Arc::clone(&self.running);
            let counters = Arc::clone(&self.counters);

            handles.push(thread::spawn(move || {
                Self::worker_loop(name, queue, store, registry, running, counters)
            }));
        }
    }

    /// Loop principal de cada worker
    ///
    /// `take()` devuelve `None` solo con la cola cerrada y drenada: esa es
    /// la condición de salida, así que ningún job encolado queda sin correr.
    fn worker_loop(
        name: String,
        queue: JobQueue,
        store: ResultStore,
        registry: Arc<ComputationRegistry>,
        running: Arc<Mutex<HashSet<u64>>>,
        counters: Arc<Mutex<JobCounters>>,
    ) {
        println!("🔧 Worker {} started", name);

        while let Some(descriptor) = queue.take() {
            println!("🔨 Worker {} picked up job {}", name, descriptor.id);
            running.lock().unwrap().insert(descriptor.id);
            let started = Instant::now();

            let outcome = match registry.resolve(descriptor.kind) {
                Some(compute) => {
                    match catch_unwind(AssertUnwindSafe(|| {
                        compute(&descriptor.dataset, &descriptor.params)
                    })) {
                        Ok(Ok(data)) => JobOutcome::Done { data },
                        Ok(Err(message)) => JobOutcome::Error { message },
                        Err(payload) => JobOutcome::Error {
                            message: format!("Computation panicked: {}", panic_message(payload)),
                        },
                    }
                }
                // El submit rechaza tipos desconocidos; si igual llega uno,
                // queda registrado como error en vez de tirar el worker
                None => JobOutcome::Error {
                    message: format!("Unknown job type: {}", descriptor.kind.as_str()),
                },
            };

            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            match &outcome {
                JobOutcome::Done { .. } => {
                    println!(
                        "✅ Worker {} completed job {} ({:.2}ms)",
                        name, descriptor.id, elapsed_ms
                    );
                    counters.lock().unwrap().completed += 1;
                }
                JobOutcome::Error { message } => {
                    eprintln!(
                        "❌ Worker {} failed job {} ({:.2}ms) - {}",
                        name, descriptor.id, elapsed_ms, message
                    );
                    counters.lock().unwrap().failed += 1;
                }
            }

            if let Err(e) = store.publish(descriptor.id, &outcome) {
                // El job queda "running" para siempre; mejor eso que un
                // registro parcial
                eprintln!(
                    "❌ Worker {}: could not publish result for job {}: {}",
                    name, descriptor.id, e
                );
            }

            // Salir de running recién con el registro ya visible
            running.lock().unwrap().remove(&descriptor.id);
        }

        println!("🔧 Worker {} stopped", name);
    }

    /// Encola un job y retorna su id
    ///
    /// Rechaza tipos fuera del registry antes de consumir un id, y todo
    /// submit después del shutdown.
    pub fn submit(&self, kind: JobKind, params: JobParams) -> Result<u64, SubmitError> {
        if !self.registry.supports(kind) {
            return Err(SubmitError::UnknownJobType(kind.as_str().to_string()));
        }

        self.queue.submit(kind, params, Arc::clone(&self.dataset))
    }

    /// Oráculo de estado: deriva el estado de un job en este instante
    ///
    /// Primero el contador (¿el id existe?), después el store (¿hay
    /// registro?). El orden importa: un id emitido jamás puede reportarse
    /// not-found. `Err` solo si el store mismo está inaccesible.
    pub fn status(&self, job_id: u64) -> Result<JobStatusReport, StoreError> {
        if !self.queue.was_issued(job_id) {
            return Ok(JobStatusReport::NotFound);
        }

        match self.store.read(job_id) {
            Ok(None) => Ok(JobStatusReport::Running),
            Ok(Some(JobOutcome::Done { data })) => Ok(JobStatusReport::Done(data)),
            Ok(Some(JobOutcome::Error { message })) => Ok(JobStatusReport::Error(message)),
            Err(StoreError::Corrupt(detail)) => {
                eprintln!("❌ Corrupt result record for job {}: {}", job_id, detail);
                Ok(JobStatusReport::Error(
                    "Failed to decode result data".to_string(),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Solicita el shutdown: cierra la cola, los workers drenan y salen
    ///
    /// Idempotente y solo-solicitud: no espera el drenado. Retorna `true`
    /// si el shutdown ya estaba en progreso.
    pub fn request_shutdown(&self) -> bool {
        let already_in_progress = self.queue.close();

        if !already_in_progress {
            println!(
                "🛑 Shutdown requested, draining {} queued jobs",
                self.queue.len()
            );
        }

        already_in_progress
    }

    /// ¿El shutdown ya fue solicitado?
    pub fn is_shutting_down(&self) -> bool {
        self.queue.is_closed()
    }

    /// Profundidad de la cola: jobs que ningún worker tomó todavía
    ///
    /// Un job ya despachado reporta running por el oráculo pero acá no
    /// cuenta; el desglose pending/running vive en `queue_stats()`.
    pub fn jobs_left(&self) -> usize {
        self.queue.len()
    }

    /// Tamaño del pool de workers
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Store de resultados
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Estadísticas de la cola y el pool, para el endpoint de métricas
    pub fn queue_stats(&self) -> serde_json::Value {
        let running = self.running.lock().unwrap().len();
        let (completed, failed) = {
            let counters = self.counters.lock().unwrap();
            (counters.completed, counters.failed)
        };

        serde_json::json!({
            "pending": self.queue.len(),
            "running": running,
            "issued": self.queue.issued_upper_bound() - 1,
            "completed": completed,
            "failed": failed,
            "workers": self.worker_count,
            "accepting": !self.queue.is_closed(),
        })
    }

    /// Espera a que todos los workers terminen
    ///
    /// Solo retorna después de un shutdown: sin cola cerrada los workers
    /// no salen de su loop.
    pub fn join(&self) {
        let handles = {
            let mut workers = self.workers.lock().unwrap();
            std::mem::take(&mut *workers)
        };

        for handle in handles {
            let _ = handle.join();
        }
    }
}

/// Extrae el mensaje de un payload de panic
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
