//! # Cola FIFO de Jobs
//! src/jobs/queue.rs
//!
//! Cola thread-safe, sin límite de capacidad y estrictamente FIFO: el
//! submit agrega al final y nunca bloquea, `take()` bloquea al worker
//! hasta que haya un descriptor y remueve del frente.
//!
//! La cola es también la autoridad de asignación de identificadores: el
//! contador monotónico vive en el mismo estado que la cola, así que
//! asignar el id, encolar el descriptor y chequear el flag de cierre son
//! una sola sección crítica. El contador nunca puede quedar por detrás de
//! un encolado, que es la condición que rompería al oráculo de estado.
//!
//! Tras `close()`, `take()` sigue drenando los descriptores pendientes y
//! recién cuando la cola queda vacía retorna `None`: esa es la señal de
//! salida de cada worker, y garantiza que ningún job encolado se abandona.

use crate::data::Dataset;
use crate::jobs::types::{JobDescriptor, JobKind, JobParams, SubmitError};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Estado interno, todo bajo un único mutex
struct QueueState {
    /// Descriptores pendientes, en orden de submit
    pending: VecDeque<JobDescriptor>,

    /// Próximo identificador a emitir
    next_id: u64,

    /// Flag de shutdown: una vez true, no se aceptan más submits
    closed: bool,
}

/// Cola FIFO thread-safe con contador de ids integrado
pub struct JobQueue {
    state: Arc<Mutex<QueueState>>,

    /// Condvar para despertar workers cuando hay jobs o al cerrar
    condvar: Arc<Condvar>,
}

/// Los identificadores arrancan en 1: un get_results/0 nunca existe
const FIRST_JOB_ID: u64 = 1;

impl JobQueue {
    /// Crea una cola vacía y abierta
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                pending: VecDeque::new(),
                next_id: FIRST_JOB_ID,
                closed: false,
            })),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Asigna un id y encola el descriptor, como un único paso atómico
    ///
    /// Nunca bloquea esperando espacio (la cola no tiene límite). Falla
    /// solo si el shutdown ya fue solicitado.
    pub fn submit(
        &self,
        kind: JobKind,
        params: JobParams,
        dataset: Arc<Dataset>,
    ) -> Result<u64, SubmitError> {
        let mut state = self.state.lock().unwrap();

        if state.closed {
            return Err(SubmitError::ShuttingDown);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.pending.push_back(JobDescriptor {
            id,
            kind,
            params,
            dataset,
        });

        // Despertar a un worker esperando
        self.condvar.notify_one();

        Ok(id)
    }

    /// Remueve y retorna el descriptor del frente de la cola
    ///
    /// Bloquea mientras la cola esté vacía y abierta. Con la cola cerrada
    /// sigue entregando los descriptores que queden; `None` significa
    /// "cerrada y drenada" y es la señal de salida del worker.
    pub fn take(&self) -> Option<JobDescriptor> {
        let mut state = self.state.lock().unwrap();

        loop {
            if let Some(descriptor) = state.pending.pop_front() {
                return Some(descriptor);
            }

            if state.closed {
                return None;
            }

            state = self.condvar.wait(state).unwrap();
        }
    }

    /// Valor actual del contador: el próximo id que se emitiría
    ///
    /// Todo id emitido es estrictamente menor que este valor.
    pub fn issued_upper_bound(&self) -> u64 {
        self.state.lock().unwrap().next_id
    }

    /// ¿Este id ya fue emitido por el contador?
    ///
    /// El oráculo de estado usa esto como primer paso: un id no emitido es
    /// not-found, uno emitido está como mínimo running.
    pub fn was_issued(&self, id: u64) -> bool {
        id >= FIRST_JOB_ID && id < self.state.lock().unwrap().next_id
    }

    /// Cantidad de descriptores aún no desencolados
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Verifica si la cola está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cierra la cola: no se aceptan más submits, los workers drenan y salen
    ///
    /// Idempotente. Retorna `true` si ya estaba cerrada.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let already_closed = state.closed;
        state.closed = true;

        // Despertar a todos los workers para que observen el cierre
        self.condvar.notify_all();

        already_closed
    }

    /// Lectura no bloqueante del flag de cierre
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl Clone for JobQueue {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            condvar: Arc::clone(&self.condvar),
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
