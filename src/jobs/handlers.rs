//! # Handlers HTTP de la API de Jobs
//! src/jobs/handlers.rs
//!
//! Implementa los endpoints del subsistema asíncrono:
//! - POST /api/{tipo_de_calculo}  (submit)
//! - GET  /api/get_results/{id}
//! - GET  /api/num_jobs
//! - GET  /api/graceful_shutdown
//!
//! Los handlers no tocan estado global: reciben el scheduler por
//! referencia y traducen entre HTTP y sus operaciones.

use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::scheduler::JobScheduler;
use crate::jobs::types::{JobKind, JobParams, JobStatusReport, SubmitError};
use serde_json::json;

/// Handler para POST /api/{tipo}, con el tag ya extraído del path
///
/// Valida método, tipo de job y body antes de encolar. Un submit
/// aceptado retorna el id recién asignado; el job corre después.
///
/// # Ejemplo de response
/// ```json
/// {"job_id": 3}
/// ```
pub fn submit_handler(req: &Request, scheduler: &JobScheduler, tag: &str) -> Response {
    if req.method() != Method::POST {
        return Response::error(StatusCode::MethodNotAllowed, "Method not allowed");
    }

    // Tipo de job: enum cerrado, tag desconocido se rechaza acá
    let kind = match JobKind::from_tag(tag) {
        Some(kind) => kind,
        None => {
            return Response::error(
                StatusCode::BadRequest,
                &format!("Unknown job type: {}", tag),
            );
        }
    };

    let body = match req.json_body() {
        Ok(body) => body,
        Err(e) => {
            return Response::error(StatusCode::BadRequest, &e.to_string());
        }
    };

    let question = match body.get("question").and_then(|q| q.as_str()) {
        Some(question) => question.to_string(),
        None => {
            return Response::error(
                StatusCode::BadRequest,
                "Missing required field: question",
            );
        }
    };

    let state = body
        .get("state")
        .and_then(|s| s.as_str())
        .map(|s| s.to_string());

    // Los cálculos por-estado necesitan el campo antes de encolar
    if kind.requires_state() && state.is_none() {
        return Response::error(StatusCode::BadRequest, "Missing required field: state");
    }

    let params = JobParams { question, state };

    match scheduler.submit(kind, params) {
        Ok(job_id) => Response::json_value(StatusCode::Ok, &json!({ "job_id": job_id })),
        Err(SubmitError::ShuttingDown) => Response::error(
            StatusCode::ServiceUnavailable,
            &SubmitError::ShuttingDown.to_string(),
        ),
        Err(e @ SubmitError::UnknownJobType(_)) => {
            Response::error(StatusCode::BadRequest, &e.to_string())
        }
    }
}

/// Handler para GET /api/get_results/{id}, con el id ya extraído del path
///
/// Consulta el oráculo de estado. El estado reportado es monotónico:
/// not-found → running → {done | error}.
///
/// # Ejemplo de response
/// ```json
/// {"status": "done", "data": {"Ohio": 15.0, "Utah": 30.0}}
/// ```
pub fn get_results_handler(req: &Request, scheduler: &JobScheduler, id_text: &str) -> Response {
    if req.method() != Method::GET {
        return Response::error(StatusCode::MethodNotAllowed, "Method not allowed");
    }

    let job_id = match id_text.parse::<u64>() {
        Ok(id) => id,
        Err(_) => {
            return Response::error(
                StatusCode::BadRequest,
                &format!("Invalid job id: {}", id_text),
            );
        }
    };

    match scheduler.status(job_id) {
        Ok(JobStatusReport::NotFound) => Response::json_value(
            StatusCode::NotFound,
            &json!({"status": "error", "message": "Job ID not found"}),
        ),
        Ok(JobStatusReport::Running) => {
            Response::json_value(StatusCode::Ok, &json!({"status": "running"}))
        }
        Ok(JobStatusReport::Done(data)) => {
            Response::json_value(StatusCode::Ok, &json!({"status": "done", "data": data}))
        }
        Ok(JobStatusReport::Error(message)) => {
            Response::json_value(StatusCode::Ok, &json!({"status": "error", "message": message}))
        }
        // Store inaccesible: el único caso que amerita un 500
        Err(e) => Response::error(StatusCode::InternalServerError, &e.to_string()),
    }
}

/// Handler para GET /api/num_jobs
///
/// Profundidad actual de la cola: jobs que ningún worker tomó todavía.
/// Es una foto instantánea, no una promesa.
///
/// # Ejemplo de response
/// ```json
/// {"jobs_left": 4}
/// ```
pub fn num_jobs_handler(req: &Request, scheduler: &JobScheduler) -> Response {
    if req.method() != Method::GET {
        return Response::error(StatusCode::MethodNotAllowed, "Method not allowed");
    }

    Response::json_value(
        StatusCode::Ok,
        &json!({ "jobs_left": scheduler.jobs_left() }),
    )
}

/// Handler para GET /api/graceful_shutdown
///
/// Solicita el cierre: deja de aceptar submits y los workers drenan la
/// cola. Solo-solicitud: retorna sin esperar el drenado, y las consultas
/// de estado siguen funcionando después.
///
/// # Ejemplo de response
/// ```json
/// {"message": "Shutdown initiated"}
/// ```
pub fn graceful_shutdown_handler(req: &Request, scheduler: &JobScheduler) -> Response {
    if req.method() != Method::GET {
        return Response::error(StatusCode::MethodNotAllowed, "Method not allowed");
    }

    let message = if scheduler.request_shutdown() {
        "Shutdown already initiated"
    } else {
        "Shutdown initiated"
    };

    Response::json_value(StatusCode::Ok, &json!({ "message": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use crate::jobs::registry::ComputationRegistry;
    use crate::jobs::store::ResultStore;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn test_scheduler() -> (tempfile::TempDir, JobScheduler) {
        let mut dataset = Dataset::new();
        dataset.add_entry("Ohio", "Q1", "Total", "Total", 10.0);
        dataset.add_entry("Ohio", "Q1", "Total", "Total", 20.0);
        dataset.add_entry("Utah", "Q1", "Total", "Total", 30.0);

        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("results")).unwrap();
        let scheduler = JobScheduler::new(
            2,
            Arc::new(dataset),
            store,
            ComputationRegistry::with_all_kinds(),
        );
        (dir, scheduler)
    }

    fn body_json(response: &Response) -> serde_json::Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn parse(raw: &[u8]) -> Request {
        Request::parse(raw).unwrap()
    }

    // ==================== Submit ====================

    #[test]
    fn test_submit_returns_integer_job_id() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"POST /api/states_mean HTTP/1.0\r\n\r\n{\"question\": \"Q1\"}");

        let response = submit_handler(&request, &scheduler, "states_mean");
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(body_json(&response), json!({"job_id": 1}));

        let response = submit_handler(&request, &scheduler, "states_mean");
        assert_eq!(body_json(&response), json!({"job_id": 2}));
    }

    #[test]
    fn test_submit_rejects_wrong_method() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"GET /api/states_mean HTTP/1.0\r\n\r\n");

        let response = submit_handler(&request, &scheduler, "states_mean");
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    #[test]
    fn test_submit_rejects_unknown_tag() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"POST /api/states_median HTTP/1.0\r\n\r\n{\"question\": \"Q1\"}");

        let response = submit_handler(&request, &scheduler, "states_median");
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(
            body_json(&response)["error"],
            "Unknown job type: states_median"
        );

        // El rechazo no consumió un id
        let poll = parse(b"GET /api/get_results/1 HTTP/1.0\r\n\r\n");
        let response = get_results_handler(&poll, &scheduler, "1");
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_submit_rejects_missing_question() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"POST /api/states_mean HTTP/1.0\r\n\r\n{}");

        let response = submit_handler(&request, &scheduler, "states_mean");
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(
            body_json(&response)["error"],
            "Missing required field: question"
        );
    }

    #[test]
    fn test_submit_rejects_missing_state_for_state_kind() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"POST /api/state_mean HTTP/1.0\r\n\r\n{\"question\": \"Q1\"}");

        let response = submit_handler(&request, &scheduler, "state_mean");
        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(
            body_json(&response)["error"],
            "Missing required field: state"
        );
    }

    #[test]
    fn test_submit_rejects_invalid_json_body() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"POST /api/states_mean HTTP/1.0\r\n\r\n{not json");

        let response = submit_handler(&request, &scheduler, "states_mean");
        assert_eq!(response.status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_submit_after_shutdown_returns_503() {
        let (_dir, scheduler) = test_scheduler();
        scheduler.request_shutdown();

        let request = parse(b"POST /api/states_mean HTTP/1.0\r\n\r\n{\"question\": \"Q1\"}");
        let response = submit_handler(&request, &scheduler, "states_mean");

        assert_eq!(response.status(), StatusCode::ServiceUnavailable);
        assert_eq!(
            body_json(&response)["error"],
            "Shutdown in progress, not accepting new jobs"
        );
    }

    // ==================== Get Results ====================

    #[test]
    fn test_get_results_unknown_id_is_404() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"GET /api/get_results/42 HTTP/1.0\r\n\r\n");

        let response = get_results_handler(&request, &scheduler, "42");
        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(
            body_json(&response),
            json!({"status": "error", "message": "Job ID not found"})
        );
    }

    #[test]
    fn test_get_results_invalid_id_is_400() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"GET /api/get_results/abc HTTP/1.0\r\n\r\n");

        let response = get_results_handler(&request, &scheduler, "abc");
        assert_eq!(response.status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_get_results_rejects_wrong_method() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"POST /api/get_results/1 HTTP/1.0\r\n\r\n{}");

        let response = get_results_handler(&request, &scheduler, "1");
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    #[test]
    fn test_get_results_reaches_done() {
        let (_dir, scheduler) = test_scheduler();
        let submit = parse(b"POST /api/states_mean HTTP/1.0\r\n\r\n{\"question\": \"Q1\"}");
        submit_handler(&submit, &scheduler, "states_mean");

        let poll = parse(b"GET /api/get_results/1 HTTP/1.0\r\n\r\n");
        let mut last = json!(null);
        for _ in 0..300 {
            let response = get_results_handler(&poll, &scheduler, "1");
            assert_eq!(response.status(), StatusCode::Ok);
            last = body_json(&response);
            if last["status"] == "done" {
                break;
            }
            assert_eq!(last["status"], "running");
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(last["status"], "done");
        assert_eq!(last["data"], json!({"Ohio": 15.0, "Utah": 30.0}));
    }

    #[test]
    fn test_get_results_corrupt_record_is_error_status() {
        let (_dir, scheduler) = test_scheduler();
        let submit = parse(b"POST /api/states_mean HTTP/1.0\r\n\r\n{\"question\": \"Q1\"}");
        submit_handler(&submit, &scheduler, "states_mean");

        // Esperar el registro y pisarlo con basura
        let poll = parse(b"GET /api/get_results/1 HTTP/1.0\r\n\r\n");
        for _ in 0..300 {
            if body_json(&get_results_handler(&poll, &scheduler, "1"))["status"] == "done" {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        std::fs::write(scheduler.store().dir().join("job_id_1"), b"garbage").unwrap();

        let response = get_results_handler(&poll, &scheduler, "1");
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(
            body_json(&response),
            json!({"status": "error", "message": "Failed to decode result data"})
        );
    }

    // ==================== Num Jobs ====================

    #[test]
    fn test_num_jobs_reports_jobs_left() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"GET /api/num_jobs HTTP/1.0\r\n\r\n");

        let response = num_jobs_handler(&request, &scheduler);
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(body_json(&response)["jobs_left"].is_u64());
    }

    #[test]
    fn test_num_jobs_rejects_post() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"POST /api/num_jobs HTTP/1.0\r\n\r\n{}");

        let response = num_jobs_handler(&request, &scheduler);
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    // ==================== Graceful Shutdown ====================

    #[test]
    fn test_graceful_shutdown_bodies_are_idempotent() {
        let (_dir, scheduler) = test_scheduler();
        let request = parse(b"GET /api/graceful_shutdown HTTP/1.0\r\n\r\n");

        let first = graceful_shutdown_handler(&request, &scheduler);
        assert_eq!(first.status(), StatusCode::Ok);
        assert_eq!(body_json(&first), json!({"message": "Shutdown initiated"}));

        let second = graceful_shutdown_handler(&request, &scheduler);
        assert_eq!(second.status(), StatusCode::Ok);
        assert_eq!(
            body_json(&second),
            json!({"message": "Shutdown already initiated"})
        );
    }

    #[test]
    fn test_queries_still_served_after_shutdown() {
        let (_dir, scheduler) = test_scheduler();
        let submit = parse(b"POST /api/global_mean HTTP/1.0\r\n\r\n{\"question\": \"Q1\"}");
        submit_handler(&submit, &scheduler, "global_mean");

        let shutdown = parse(b"GET /api/graceful_shutdown HTTP/1.0\r\n\r\n");
        graceful_shutdown_handler(&shutdown, &scheduler);
        scheduler.join();

        // num_jobs y get_results siguen respondiendo tras el drenado
        let num = parse(b"GET /api/num_jobs HTTP/1.0\r\n\r\n");
        let response = num_jobs_handler(&num, &scheduler);
        assert_eq!(body_json(&response), json!({"jobs_left": 0}));

        let poll = parse(b"GET /api/get_results/1 HTTP/1.0\r\n\r\n");
        let response = get_results_handler(&poll, &scheduler, "1");
        assert_eq!(body_json(&response)["status"], "done");
    }
}
