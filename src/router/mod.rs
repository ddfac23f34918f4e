//! # Routing de rutas estáticas
//! src/router/mod.rs
//!
//! Mapea paths HTTP a handlers. Las rutas de la API de jobs (`/api/*`)
//! necesitan acceso al scheduler, así que se despachan directamente en el
//! connection handler del servidor; por aquí solo pasan las rutas
//! informativas estáticas (`/` e `/index`).
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! Un path sin handler registrado responde 404 Not Found.

use std::collections::HashMap;

use crate::http::{Request, Response, StatusCode};

/// Tipo de función handler
///
/// Un handler recibe un Request y retorna una Response
pub type Handler = fn(&Request) -> Response;

/// Router que mapea paths exactos a handlers
pub struct Router {
    routes: HashMap<String, Handler>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Registra un handler bajo un path exacto
    ///
    /// Registrar dos veces el mismo path reemplaza el handler anterior.
    ///
    /// # Ejemplo
    /// ```
    /// use stats_server::router::Router;
    /// use stats_server::http::{Request, Response, StatusCode};
    ///
    /// fn index_handler(req: &Request) -> Response {
    ///     Response::json(r#"{"message": "NutriStats API"}"#)
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register("/index", index_handler);
    /// ```
    pub fn register(&mut self, path: &str, handler: Handler) {
        self.routes.insert(path.to_string(), handler);
    }

    /// Despacha un request al handler de su path
    ///
    /// Sin handler para ese path, responde 404. En ambos casos la
    /// response sale con los headers comunes del servidor.
    ///
    /// # Ejemplo
    /// ```
    /// use stats_server::router::Router;
    /// use stats_server::http::{Request, Response};
    ///
    /// let router = Router::new();
    ///
    /// let raw = b"GET /index HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    /// let response = router.route(&request); // 404: sin rutas registradas
    /// ```
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path();

        let mut response = match self.routes.get(path) {
            Some(handler) => handler(request),
            None => Response::error(
                StatusCode::NotFound,
                &format!("Route not found: {}", path),
            ),
        };

        self.add_common_headers(&mut response);
        response
    }

    /// Agrega los headers comunes del servidor
    fn add_common_headers(&self, response: &mut Response) {
        response.add_header("Server", "NutriStats-HTTP/1.0");
        response.add_header("Connection", "close");
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
