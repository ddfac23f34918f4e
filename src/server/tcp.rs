//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Implementación del servidor TCP que maneja múltiples conexiones
//! simultáneas usando threads: cada conexión se procesa en su propio
//! thread. El scheduler de jobs se recibe ya construido; el servidor no
//! arma estado global propio.
//!
//! Las rutas `/api/*` necesitan el scheduler, así que se despachan acá
//! antes de consultar el router de páginas estáticas.

use crate::config::Config;
use crate::http::{Request, Response, StatusCode};
use crate::jobs::handlers as job_handlers;
use crate::jobs::scheduler::JobScheduler;
use crate::jobs::types::JobKind;
use crate::metrics::MetricsCollector;
use crate::router::Router;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Tope de lectura por request, contra clientes que mandan sin fin
const MAX_REQUEST_BYTES: usize = 1_048_576;

/// Servidor HTTP/1.0 concurrente con métricas
pub struct Server {
    config: Config,
    router: Arc<Router>,
    metrics: Arc<MetricsCollector>,
    scheduler: Arc<JobScheduler>,
}

impl Server {
    /// Crea el servidor con un scheduler ya construido
    pub fn new(config: Config, scheduler: Arc<JobScheduler>) -> Self {
        let mut router = Router::new();
        router.register("/", index_handler);
        router.register("/index", index_handler);

        Self {
            config,
            router: Arc::new(router),
            metrics: Arc::new(MetricsCollector::new()),
            scheduler,
        }
    }

    /// Bindea la dirección configurada y atiende conexiones para siempre
    pub fn run(&self) -> std::io::Result<()> {
        let address = self.config.address();
        println!("🔧 Bind en {}", address);

        let listener = TcpListener::bind(&address)?;
        println!("✅ API de estadísticas escuchando en {}", address);
        println!("🔨 Un thread por conexión; jobs en el pool de workers\n");

        self.serve(listener)
    }

    /// Loop de accept sobre un listener ya bindeado
    pub fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let metrics = Arc::clone(&self.metrics);
                    let scheduler = Arc::clone(&self.scheduler);

                    let peer_addr = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());

                    println!("✅ Conexión de {}", peer_addr);
                    metrics.connection_opened();

                    thread::spawn(move || {
                        if let Err(e) =
                            Self::handle_connection_static(stream, router, metrics.clone(), scheduler)
                        {
                            eprintln!("   ❌ Error atendiendo {}: {}", peer_addr, e);
                        }
                        metrics.connection_closed();
                    });
                }
                Err(e) => {
                    eprintln!("❌ Accept falló: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Lee un request completo del stream
    ///
    /// HTTP/1.0 con una sutileza: los POST de submit traen body JSON que
    /// puede llegar en un segmento TCP posterior a los headers, así que se
    /// sigue leyendo hasta cubrir el Content-Length anunciado.
    fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 8192];

        loop {
            let bytes_read = stream.read(&mut chunk)?;
            if bytes_read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..bytes_read]);

            if let Some(headers_end) = find_headers_end(&buffer) {
                let expected = content_length(&buffer[..headers_end]).unwrap_or(0);
                if buffer.len() >= headers_end + expected {
                    break;
                }
            }

            if buffer.len() > MAX_REQUEST_BYTES {
                break;
            }
        }

        Ok(buffer)
    }

    /// Procesa una conexión: parsear, despachar, responder, medir
    fn handle_connection_static(
        mut stream: TcpStream,
        router: Arc<Router>,
        metrics: Arc<MetricsCollector>,
        scheduler: Arc<JobScheduler>,
    ) -> std::io::Result<()> {
        let start = Instant::now();

        // Request ID único para correlacionar logs
        let mut hasher = DefaultHasher::new();
        start.elapsed().as_nanos().hash(&mut hasher);
        thread::current().id().hash(&mut hasher);
        let request_id = format!("{:016x}", hasher.finish());
        let thread_id = format!("{:?}", thread::current().id());

        let buffer = Self::read_request(&mut stream)?;

        if buffer.is_empty() {
            println!("   ✅ Conexión cerrada sin datos");
            return Ok(());
        }

        println!("   ✅ {} bytes [req_id: {}]", buffer.len(), &request_id[..8]);

        let (response, path) = match Request::parse(&buffer) {
            Ok(request) => {
                let path = request.path().to_string();
                println!("   ✅ {} {}", request.method().as_str(), path);

                let response = Self::dispatch(&request, &router, &metrics, &scheduler);
                (response, path)
            }
            Err(e) => {
                println!("   ❌ Parse error: {}", e);
                (
                    Response::error(StatusCode::BadRequest, &format!("Invalid: {}", e)),
                    "/error".to_string(),
                )
            }
        };

        // Headers comunes y de observabilidad, para toda response (la API
        // de jobs no pasa por el router, así que se agregan acá)
        let mut response = response;
        response.add_header("Server", "NutriStats-HTTP/1.0");
        response.add_header("Connection", "close");
        response.add_header("X-Request-Id", &request_id);
        response.add_header("X-Worker-Thread", &thread_id);
        response.add_header("X-Worker-Pid", &std::process::id().to_string());

        stream.write_all(&response.to_bytes())?;
        stream.flush()?;

        let latency = start.elapsed();
        metrics.record_request(metrics_route(&path), response.status().as_u16(), latency);

        println!(
            "   ✅ {} ({:.2}ms)\n",
            response.status(),
            latency.as_secs_f64() * 1000.0
        );

        Ok(())
    }

    /// Despacha el request: primero la API de jobs, después el router
    fn dispatch(
        request: &Request,
        router: &Router,
        metrics: &MetricsCollector,
        scheduler: &JobScheduler,
    ) -> Response {
        let path = request.path();

        if path == "/api/metrics" {
            // Métricas HTTP del collector más el estado del subsistema de jobs
            let mut combined = metrics.metrics_json();
            combined["jobs"] = scheduler.queue_stats();
            return Response::json_value(StatusCode::Ok, &combined);
        }

        if path == "/api/num_jobs" {
            return job_handlers::num_jobs_handler(request, scheduler);
        }

        if path == "/api/graceful_shutdown" {
            return job_handlers::graceful_shutdown_handler(request, scheduler);
        }

        if let Some(id_text) = path.strip_prefix("/api/get_results/") {
            return job_handlers::get_results_handler(request, scheduler, id_text);
        }

        // Cualquier otro /api/{tag} es un intento de submit
        if let Some(tag) = path.strip_prefix("/api/") {
            return job_handlers::submit_handler(request, scheduler, tag);
        }

        router.route(request)
    }
}

/// Busca el fin de los headers (`\r\n\r\n`) y retorna el offset del body
fn find_headers_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Extrae el Content-Length de los headers crudos, si está presente
fn content_length(head: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(head).ok()?;

    for line in text.split("\r\n").skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse().ok();
            }
        }
    }

    None
}

/// Plantilla de ruta bajo la que se registra un path en métricas
///
/// Los paths de get_results llevan el job id adentro; registrarlos tal
/// cual agregaría una entrada nueva al mapa de requests por cada job
/// consultado, y ese mapa no tiene eviction.
fn metrics_route(path: &str) -> &str {
    if path.starts_with("/api/get_results/") {
        "/api/get_results/{id}"
    } else {
        path
    }
}

/// Handler para / y /index: lista las rutas disponibles
///
/// La lista de submits sale del enum de tipos de job, así que nunca se
/// desactualiza respecto de lo que el servidor realmente acepta.
fn index_handler(_req: &Request) -> Response {
    let mut body = String::from(
        "Hello, World!\n Interact with the webserver using one of the defined routes:\n",
    );

    for kind in JobKind::all() {
        body.push_str(&format!("<p>POST /api/{}</p>", kind.as_str()));
    }
    for route in [
        "GET /api/get_results/{job_id}",
        "GET /api/num_jobs",
        "GET /api/graceful_shutdown",
        "GET /api/metrics",
    ] {
        body.push_str(&format!("<p>{}</p>", route));
    }

    Response::new(StatusCode::Ok)
        .with_header("Content-Type", "text/html")
        .with_body(&body)
}
