//! # Parser de requests HTTP/1.0
//! src/http/request.rs
//!
//! Parser escrito a mano para el subconjunto de HTTP/1.0 que usa la API
//! de estadísticas. Un submit típico llega así:
//!
//! ```text
//! POST /api/states_mean HTTP/1.0\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 18\r\n
//! \r\n
//! {"question": "Q1"}
//! ```
//!
//! El buffer se corta en el primer `\r\n\r\n`: la cabecera (request line
//! más headers) tiene que ser texto UTF-8, el body se conserva en bytes
//! tal cual llegó. Los parámetros de los jobs viajan en el body JSON y no
//! en query strings, por eso además de los accesores crudos está
//! `json_body()`.

use std::collections::HashMap;

/// Métodos HTTP que acepta el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - consultas: resultados, profundidad de cola, shutdown
    GET,

    /// HEAD - como GET pero solo retorna headers
    HEAD,

    /// POST - submits de jobs con body JSON
    POST,
}

impl Method {
    /// Reconoce el verbo de la request line
    fn from_token(token: &str) -> Result<Self, ParseError> {
        match token {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            other => Err(ParseError::UnknownMethod(other.to_string())),
        }
    }

    /// Nombre del método como aparece en el wire
    pub fn as_str(&self) -> &'static str {
        match *self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
        }
    }
}

/// Un request HTTP/1.0 ya parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path de la petición, sin query string (ej: "/api/states_mean")
    path: String,

    /// Query parameters, si vinieron (ej: {"pretty": "true"})
    query_params: HashMap<String, String>,

    /// Headers, con nombre y valor ya recortados
    headers: HashMap<String, String>,

    /// "HTTP/1.0" o "HTTP/1.1"
    version: String,

    /// Body en bytes, solo para POST
    body: Vec<u8>,
}

/// Defectos que el parser reporta como 400 Bad Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// La request line no tiene las tres partes METHOD PATH VERSION
    BadRequestLine,

    /// Verbo HTTP que el servidor no implementa
    UnknownMethod(String),

    /// Versión distinta de HTTP/1.0 y HTTP/1.1
    UnsupportedVersion(String),

    /// Línea de header sin `:`
    MalformedHeader(String),

    /// Llegaron cero bytes útiles
    EmptyRequest,

    /// El body de un submit no decodifica como JSON
    InvalidJsonBody(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::BadRequestLine => write!(f, "Malformed request line"),
            ParseError::UnknownMethod(m) => write!(f, "Unknown HTTP method: {}", m),
            ParseError::UnsupportedVersion(v) => write!(f, "Unsupported HTTP version: {}", v),
            ParseError::MalformedHeader(h) => write!(f, "Malformed header line: {}", h),
            ParseError::EmptyRequest => write!(f, "Empty request"),
            ParseError::InvalidJsonBody(e) => write!(f, "Invalid JSON body: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl Request {
    /// Parsea el buffer completo leído de la conexión
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use stats_server::http::Request;
    ///
    /// let raw = b"GET /api/num_jobs HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/api/num_jobs");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        // Separar cabecera de body por el primer \r\n\r\n. Sin separador,
        // todo el buffer es cabecera (GET sin body, o request truncado)
        let (head, body) = match find_blank_line(buffer) {
            Some(pos) => (&buffer[..pos], &buffer[pos + 4..]),
            None => (buffer, &buffer[buffer.len()..]),
        };

        // Solo la cabecera tiene que ser texto; el body queda en bytes
        let head = std::str::from_utf8(head).map_err(|_| ParseError::BadRequestLine)?;

        if head.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = head.split("\r\n");
        let request_line = lines.next().ok_or(ParseError::BadRequestLine)?;

        let (method, path, query_params, version) = Self::parse_request_line(request_line)?;
        let headers = Self::parse_headers(lines)?;

        // GET y HEAD no llevan body en esta API
        let body = if method == Method::POST {
            body.to_vec()
        } else {
            Vec::new()
        };

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            version,
            body,
        })
    }

    /// Descompone la primera línea: `POST /path?query HTTP/1.0`
    fn parse_request_line(
        line: &str,
    ) -> Result<(Method, String, HashMap<String, String>, String), ParseError> {
        let mut parts = line.split_whitespace();

        let method = Method::from_token(parts.next().ok_or(ParseError::BadRequestLine)?)?;
        let target = parts.next().ok_or(ParseError::BadRequestLine)?;
        let version = parts.next().ok_or(ParseError::BadRequestLine)?;

        // Exactamente tres partes: METHOD PATH VERSION
        if parts.next().is_some() {
            return Err(ParseError::BadRequestLine);
        }

        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::UnsupportedVersion(version.to_string()));
        }

        let (path, query_params) = Self::parse_path_and_query(target);

        Ok((method, path, query_params, version.to_string()))
    }

    /// Separa el path de los query parameters
    ///
    /// Ejemplo: "/api/get_results/4?pretty=true"
    /// Retorna: ("/api/get_results/4", {"pretty": "true"})
    fn parse_path_and_query(target: &str) -> (String, HashMap<String, String>) {
        match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Self::parse_query_string(query)),
            None => (target.to_string(), HashMap::new()),
        }
    }

    /// Corta una query string en pares clave/valor
    ///
    /// "pretty=true&debug" se vuelve {"pretty": "true", "debug": ""}
    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for param in query.split('&').filter(|p| !p.is_empty()) {
            match param.split_once('=') {
                Some((key, value)) => {
                    params.insert(key.to_string(), Self::url_decode(value));
                }
                None => {
                    // Parámetro sin valor (ej: "?debug")
                    params.insert(param.to_string(), String::new());
                }
            }
        }

        params
    }

    /// Decodificación de URL mínima (%20 y + como espacio)
    ///
    /// Alcanza para esta API: los parámetros reales viajan en el body JSON
    fn url_decode(s: &str) -> String {
        s.replace("%20", " ").replace('+', " ")
    }

    /// Parsea los headers HTTP, formato `Name: Value` uno por línea
    fn parse_headers<'a, I>(lines: I) -> Result<HashMap<String, String>, ParseError>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut headers = HashMap::new();

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::MalformedHeader(line.to_string()))?;
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }

        Ok(headers)
    }

    // === Accesores ===

    /// Método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Path, sin query string
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Un query parameter puntual
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Un header puntual, por nombre exacto
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Versión declarada en la request line
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Body crudo en bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decodifica el body como JSON
    ///
    /// Los submits de jobs mandan sus parámetros así:
    /// `{"question": "...", "state": "..."}`.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use stats_server::http::Request;
    ///
    /// let raw = b"POST /api/state_mean HTTP/1.0\r\n\r\n{\"question\": \"Q1\", \"state\": \"Utah\"}";
    /// let request = Request::parse(raw).unwrap();
    /// let body = request.json_body().unwrap();
    ///
    /// assert_eq!(body["state"], "Utah");
    /// ```
    pub fn json_body(&self) -> Result<serde_json::Value, ParseError> {
        if self.body.is_empty() {
            return Err(ParseError::InvalidJsonBody("empty body".to_string()));
        }
        serde_json::from_slice(&self.body).map_err(|e| ParseError::InvalidJsonBody(e.to_string()))
    }
}

/// Busca el `\r\n\r\n` que separa cabecera de body
fn find_blank_line(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), "HTTP/1.0");
        assert!(request.query_params().is_empty());
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_parse_result_path_with_id() {
        let raw = b"GET /api/get_results/17 HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "/api/get_results/17");
    }

    #[test]
    fn test_parse_with_query_params() {
        let raw = b"GET /api/num_jobs?pretty=true HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "/api/num_jobs");
        assert_eq!(request.query_param("pretty"), Some("true"));
    }

    #[test]
    fn test_parse_with_headers() {
        let raw = b"GET / HTTP/1.0\r\nHost: localhost:8080\r\nUser-Agent: test\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.header("Host"), Some("localhost:8080"));
        assert_eq!(request.header("User-Agent"), Some("test"));
    }

    #[test]
    fn test_parse_post_with_json_body() {
        let raw = b"POST /api/states_mean HTTP/1.0\r\nContent-Type: application/json\r\n\r\n{\"question\": \"Q1\"}";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), Method::POST);
        let body = request.json_body().unwrap();
        assert_eq!(body["question"], "Q1");
    }

    #[test]
    fn test_json_body_with_state() {
        let raw = b"POST /api/state_mean HTTP/1.0\r\n\r\n{\"question\": \"Q1\", \"state\": \"Ohio\"}";
        let request = Request::parse(raw).unwrap();

        let body = request.json_body().unwrap();
        assert_eq!(body["question"], "Q1");
        assert_eq!(body["state"], "Ohio");
    }

    #[test]
    fn test_body_preserves_internal_crlf() {
        // Un body JSON con \r\n adentro no debe alterarse
        let raw = b"POST /api/states_mean HTTP/1.0\r\n\r\n{\"question\":\r\n \"Q1\"}";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.body(), b"{\"question\":\r\n \"Q1\"}");
        assert_eq!(request.json_body().unwrap()["question"], "Q1");
    }

    #[test]
    fn test_get_body_is_ignored() {
        let raw = b"GET /api/num_jobs HTTP/1.0\r\n\r\nstray bytes";
        let request = Request::parse(raw).unwrap();

        assert!(request.body().is_empty());
    }

    #[test]
    fn test_json_body_invalid() {
        let raw = b"POST /api/states_mean HTTP/1.0\r\n\r\n{not json";
        let request = Request::parse(raw).unwrap();

        assert!(matches!(request.json_body(), Err(ParseError::InvalidJsonBody(_))));
    }

    #[test]
    fn test_json_body_empty() {
        let raw = b"POST /api/states_mean HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert!(matches!(request.json_body(), Err(ParseError::InvalidJsonBody(_))));
    }

    #[test]
    fn test_url_decode() {
        let raw = b"GET /index?q=hello%20world HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.query_param("q"), Some("hello world"));
    }

    #[test]
    fn test_unknown_method() {
        let raw = b"DELETE /api/get_results/1 HTTP/1.0\r\n\r\n";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::UnknownMethod(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let raw = b"GET / HTTP/2.0\r\n\r\n"; // HTTP/2.0 no está soportado
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::UnsupportedVersion(_))));
    }

    #[test]
    fn test_empty_request() {
        let result = Request::parse(b"");

        assert!(matches!(result, Err(ParseError::EmptyRequest)));
    }

    #[test]
    fn test_request_line_missing_parts() {
        let raw = b"GET\r\n\r\n"; // Falta path y version
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::BadRequestLine)));
    }

    #[test]
    fn test_request_line_extra_parts() {
        let raw = b"GET / HTTP/1.0 extra\r\n\r\n";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::BadRequestLine)));
    }

    #[test]
    fn test_header_without_colon_is_invalid() {
        let raw = b"GET / HTTP/1.0\r\nBrokenHeader\r\n\r\n";
        let result = Request::parse(raw);

        assert!(matches!(result, Err(ParseError::MalformedHeader(_))));
    }
}
