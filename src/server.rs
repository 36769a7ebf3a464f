//! Blocking HTTP/1.1 boundary around the risk engine.
//!
//! All field-presence and type validation happens here, before the engine is
//! invoked, so [`RiskAssessor::assess`] only ever sees well-typed parameters.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::alerts::{AlertQueue, AlertService};
use crate::assessment::{AlertRecord, RiskAssessor};
use crate::config::{Config, constants};
use crate::error::{AssessmentError, RequestError};
use crate::materials::MaterialCatalog;
use crate::params::PrintParameters;
use crate::predictor::{MaintenanceOutlook, MaintenancePredictor, StressModel};

/// Upper bound on rejected request bytes read off the socket before replying.
const MAX_DRAIN_BYTES: u64 = 1024 * 1024;

/// How long a rejected request may keep trickling in before the reply is sent.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Request handling shared by every connection.
pub struct PredictionService {
    assessor: RiskAssessor,
    predictor: Option<Box<dyn MaintenancePredictor>>,
    notifier: Option<AlertQueue>,
    cors_allowed_origin: String,
    max_body_bytes: usize,
}

impl PredictionService {
    pub fn new(assessor: RiskAssessor) -> Self {
        let defaults = Config::default();
        Self {
            assessor,
            predictor: None,
            notifier: None,
            cors_allowed_origin: defaults.cors_allowed_origin,
            max_body_bytes: defaults.max_body_bytes,
        }
    }

    /// Wire up the service as described by `config`.
    pub fn from_config(config: &Config, catalog: Arc<MaterialCatalog>) -> Self {
        let mut service = Self::new(RiskAssessor::new(catalog))
            .with_cors_origin(config.cors_allowed_origin.clone())
            .with_max_body_bytes(config.max_body_bytes);
        if config.maintenance_model_enabled {
            service = service.with_predictor(Box::new(StressModel));
        }
        if let Some(url) = &config.discord_webhook {
            service = service.with_notifier(AlertService::new(url.clone()));
        }
        service
    }

    pub fn with_predictor(mut self, predictor: Box<dyn MaintenancePredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Forward critical alerts through `notifier` on a dedicated delivery thread.
    pub fn with_notifier(mut self, notifier: AlertService) -> Self {
        self.notifier = Some(AlertQueue::spawn(notifier, constants::ALERT_QUEUE_CAPACITY));
        self
    }

    pub fn with_cors_origin(mut self, origin: String) -> Self {
        self.cors_allowed_origin = origin;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn model_loaded(&self) -> bool {
        self.predictor.is_some()
    }

    /// Route a parsed request to its handler.
    pub fn handle(&self, req: &HttpRequest) -> HttpResponse {
        let response = match (req.method.as_str(), req.path.as_str()) {
            ("OPTIONS", _) => HttpResponse::empty(204),
            ("GET", "/health") => HttpResponse::json(
                200,
                json!({"status": "healthy", "model_loaded": self.model_loaded()}),
            ),
            ("GET", "/test") => HttpResponse::json(
                200,
                json!({
                    "status": "ok",
                    "message": "API is working",
                    "supported_materials": self.assessor.catalog().keys(),
                }),
            ),
            ("POST", "/predict") => self.predict(&req.body),
            (_, "/health" | "/test" | "/predict") => HttpResponse::json(
                405,
                json!({"status": "error", "error": "Method not allowed"}),
            ),
            _ => HttpResponse::json(404, json!({"status": "error", "error": "Not found"})),
        };

        info!("{} {} -> {}", req.method, req.path, response.status);
        response.with_header("Access-Control-Allow-Origin", &self.cors_allowed_origin)
    }

    fn predict(&self, body: &[u8]) -> HttpResponse {
        let params = match parse_parameters(body) {
            Ok(params) => params,
            Err(e) => {
                warn!("Rejected prediction request: {}", e);
                return error_response(400, &e.to_string(), None);
            }
        };
        debug!("Prediction request: {:?}", params);

        let result = match self.assessor.assess(&params) {
            Ok(result) => result,
            Err(e @ AssessmentError::UnknownMaterial(_)) => {
                warn!("Rejected prediction request: {}", e);
                return error_response(400, &e.to_string(), None);
            }
            Err(e) => {
                error!("Error processing prediction: {}", e);
                return error_response(500, "Failed to process prediction", Some(&e.to_string()));
            }
        };

        let maintenance_outlook = self.outlook(&params, result.wear_factor, result.thermal_stress);

        info!(
            "Prediction for {}: wear {:.3}, thermal {:.3}, {} alert(s)",
            params.material,
            result.wear_factor,
            result.thermal_stress,
            result.alerts.len()
        );

        let response = HttpResponse::serialized(
            200,
            &PredictResponse {
                status: "success",
                wear_factor: result.wear_factor,
                thermal_stress: result.thermal_stress,
                alerts: &result.alerts,
                maintenance_outlook,
            },
        );

        if let Some(notifier) = &self.notifier {
            notifier.enqueue(&result.alerts, &params.material);
        }
        response
    }

    fn outlook(
        &self,
        params: &PrintParameters,
        wear_factor: f64,
        thermal_stress: f64,
    ) -> Option<MaintenanceOutlook> {
        let predictor = self.predictor.as_ref()?;
        let profile = self.assessor.catalog().lookup(&params.material).ok()?;
        match predictor.predict(params, profile, wear_factor, thermal_stress) {
            Ok(outlook) => Some(outlook),
            Err(e) => {
                warn!("Maintenance predictor '{}' failed: {}", predictor.name(), e);
                None
            }
        }
    }
}

#[derive(Serialize)]
struct PredictResponse<'a> {
    status: &'static str,
    wear_factor: f64,
    thermal_stress: f64,
    alerts: &'a [AlertRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    maintenance_outlook: Option<MaintenanceOutlook>,
}

fn error_response(status: u16, message: &str, details: Option<&str>) -> HttpResponse {
    let mut body = json!({
        "status": "error",
        "error": message,
        "wear_factor": 0.0,
        "thermal_stress": 0.0,
        "alerts": [format!("Error: {}", message)],
    });
    if let Some(details) = details {
        body["details"] = Value::String(details.to_string());
    }
    HttpResponse::json(status, body)
}

/// Validate a JSON request body and convert it into print parameters.
///
/// Missing fields are reported together, in declaration order; type
/// mismatches are reported for the first offending field. Nothing is coerced
/// to a default.
pub fn parse_parameters(body: &[u8]) -> Result<PrintParameters, RequestError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| RequestError::InvalidJson)?;
    let Value::Object(fields) = value else {
        return Err(RequestError::InvalidJson);
    };

    let missing: Vec<String> = PrintParameters::REQUIRED_FIELDS
        .iter()
        .filter(|name| !fields.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RequestError::MissingFields(missing));
    }

    Ok(PrintParameters {
        material: string_field(&fields, "material")?,
        nozzle_temperature: number_field(&fields, "nozzle_temperature")?,
        bed_temperature: number_field(&fields, "bed_temperature")?,
        print_speed: number_field(&fields, "print_speed")?,
        fan_speed: number_field(&fields, "fan_speed")?,
        layer_height: number_field(&fields, "layer_height")?,
        wall_thickness: number_field(&fields, "wall_thickness")?,
        nozzle_diameter: number_field(&fields, "nozzle_diameter")?,
        infill_density: number_field(&fields, "infill_density")?,
        infill_pattern: string_field(&fields, "infill_pattern")?,
        print_time: number_field(&fields, "print_time")?,
    })
}

fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a Value, RequestError> {
    fields
        .get(name)
        .ok_or_else(|| RequestError::MissingFields(vec![name.to_string()]))
}

fn number_field(fields: &Map<String, Value>, name: &str) -> Result<f64, RequestError> {
    let value = field(fields, name)?;
    value.as_f64().ok_or_else(|| RequestError::InvalidField {
        field: name.to_string(),
        reason: format!("expected a number, found {}", json_kind(value)),
    })
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String, RequestError> {
    let value = field(fields, name)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RequestError::InvalidField {
            field: name.to_string(),
            reason: format!("expected a string, found {}", json_kind(value)),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// TCP front end dispatching each connection to its own thread.
pub struct PredictionServer {
    listener: TcpListener,
    service: Arc<PredictionService>,
}

impl PredictionServer {
    /// Bind the listener. Use port 0 to let the OS pick one.
    pub fn bind(addr: &str, service: PredictionService) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            service: Arc::new(service),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails.
    pub fn serve(self) -> io::Result<()> {
        info!("HTTP service listening on {}", self.listener.local_addr()?);
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let service = Arc::clone(&self.service);
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(&service, stream) {
                            warn!("HTTP request error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("HTTP accept error: {}", e);
                }
            }
        }
        Ok(())
    }
}

fn handle_connection(service: &PredictionService, mut stream: TcpStream) -> io::Result<()> {
    let timeout = Duration::from_secs(constants::REQUEST_READ_TIMEOUT_SECS);
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let response = match read_http_request(&stream, service.max_body_bytes)? {
        Some(Ok(req)) => service.handle(&req),
        Some(Err(e)) => {
            warn!("Rejected request: {}", e);
            error_response(e.status(), &e.to_string(), None)
                .with_header("Access-Control-Allow-Origin", &service.cors_allowed_origin)
        }
        None => return Ok(()),
    };
    write_http_response(&mut stream, &response)
}

/// A parsed HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: &str, path: &str, body: &[u8]) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            body: body.to_vec(),
        }
    }
}

/// A response ready to be written to the socket.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    fn json(status: u16, value: Value) -> Self {
        Self::serialized(status, &value)
    }

    fn serialized<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        }
    }

    fn empty(status: u16) -> Self {
        Self {
            status,
            headers: vec![
                (
                    "Access-Control-Allow-Methods".to_string(),
                    "GET, POST, OPTIONS".to_string(),
                ),
                (
                    "Access-Control-Allow-Headers".to_string(),
                    "Content-Type".to_string(),
                ),
            ],
            body: Vec::new(),
        }
    }

    fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Read one request; `Ok(None)` means the peer closed without sending one.
///
/// The request line and headers together may not exceed
/// [`constants::MAX_HEADER_BYTES`].
fn read_http_request(
    stream: &TcpStream,
    max_body_bytes: usize,
) -> io::Result<Option<Result<HttpRequest, RequestError>>> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut head_budget = constants::MAX_HEADER_BYTES;
    let header_too_large = RequestError::HeaderTooLarge {
        limit: constants::MAX_HEADER_BYTES,
    };

    let Some(line) = read_head_line(&mut reader, &mut head_budget)? else {
        drain(stream, &mut reader, MAX_DRAIN_BYTES);
        return Ok(Some(Err(header_too_large)));
    };
    let first = line.trim_end_matches(['\r', '\n']);
    if first.is_empty() {
        return Ok(None);
    }

    let mut parts = first.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid http request line",
        ));
    };
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut content_length = 0usize;
    loop {
        let Some(header) = read_head_line(&mut reader, &mut head_budget)? else {
            drain(stream, &mut reader, MAX_DRAIN_BYTES);
            return Ok(Some(Err(header_too_large)));
        };
        let header = header.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<usize>().unwrap_or(0);
            }
        }
    }

    if content_length > max_body_bytes {
        drain(stream, &mut reader, (content_length as u64).min(MAX_DRAIN_BYTES));
        return Ok(Some(Err(RequestError::BodyTooLarge {
            size: content_length,
            limit: max_body_bytes,
        })));
    }

    let mut body = vec![0_u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }

    Ok(Some(Ok(HttpRequest {
        method: method.to_string(),
        path,
        body,
    })))
}

/// Read one line of the request head, charging it against `budget`.
///
/// Returns `Ok(None)` once the budget runs out before the line ends. An empty
/// line means the peer closed the connection.
fn read_head_line<R: BufRead>(reader: &mut R, budget: &mut usize) -> io::Result<Option<String>> {
    let mut line = String::new();
    let read = (&mut *reader).take(*budget as u64).read_line(&mut line)?;
    *budget -= read;
    if *budget == 0 && !line.ends_with('\n') {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Discard up to `limit` pending bytes of a rejected request.
///
/// Unread input makes close() reset the socket before the client sees the reply.
fn drain(stream: &TcpStream, reader: &mut impl Read, limit: u64) {
    let drained = stream
        .set_read_timeout(Some(DRAIN_TIMEOUT))
        .and_then(|()| io::copy(&mut reader.take(limit), &mut io::sink()));
    if let Err(e) = drained {
        debug!("Stopped draining rejected request: {}", e);
    }
}

fn write_http_response(stream: &mut TcpStream, response: &HttpResponse) -> io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason_phrase(response.status)
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body.len()
    ));
    stream.write_all(head.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PredictionService {
        let catalog = Arc::new(MaterialCatalog::standard().unwrap());
        PredictionService::new(RiskAssessor::new(catalog)).with_predictor(Box::new(StressModel))
    }

    fn job_body() -> Value {
        json!({
            "material": "PLA",
            "nozzle_temperature": 200,
            "bed_temperature": 60,
            "print_speed": 60,
            "fan_speed": 100,
            "layer_height": 0.2,
            "wall_thickness": 0.8,
            "nozzle_diameter": 0.4,
            "infill_density": 20,
            "infill_pattern": "grid",
            "print_time": 120
        })
    }

    fn post(service: &PredictionService, body: &Value) -> HttpResponse {
        let bytes = serde_json::to_vec(body).unwrap();
        service.handle(&HttpRequest::new("POST", "/predict", &bytes))
    }

    #[test]
    fn test_parse_accepts_integers_as_numbers() {
        let params = parse_parameters(&serde_json::to_vec(&job_body()).unwrap()).unwrap();
        assert_eq!(params.material, "PLA");
        assert_eq!(params.nozzle_temperature, 200.0);
        assert_eq!(params.infill_pattern, "grid");
    }

    #[test]
    fn test_parse_reports_missing_fields_in_order() {
        let mut body = job_body();
        let fields = body.as_object_mut().unwrap();
        fields.remove("print_time");
        fields.remove("material");
        fields.remove("fan_speed");

        let err = parse_parameters(&serde_json::to_vec(&body).unwrap()).unwrap_err();
        assert_eq!(
            err,
            RequestError::MissingFields(vec![
                "material".to_string(),
                "fan_speed".to_string(),
                "print_time".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let mut body = job_body();
        body["print_speed"] = json!("fast");
        let err = parse_parameters(&serde_json::to_vec(&body).unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for field 'print_speed': expected a number, found a string"
        );

        let mut body = job_body();
        body["infill_pattern"] = Value::Null;
        assert!(parse_parameters(&serde_json::to_vec(&body).unwrap()).is_err());
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert_eq!(parse_parameters(b"not json"), Err(RequestError::InvalidJson));
        assert_eq!(parse_parameters(b"[1, 2]"), Err(RequestError::InvalidJson));
    }

    #[test]
    fn test_predict_success_body() {
        let response = post(&service(), &job_body());
        assert_eq!(response.status, 200);
        let body = response.json_body().unwrap();
        assert_eq!(body["status"], "success");
        assert!((body["wear_factor"].as_f64().unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(body["alerts"], json!([]));
        assert_eq!(body["maintenance_outlook"]["model"], "stress-model");
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    }

    #[test]
    fn test_predict_without_predictor_omits_outlook() {
        let catalog = Arc::new(MaterialCatalog::standard().unwrap());
        let service = PredictionService::new(RiskAssessor::new(catalog));
        let body = post(&service, &job_body()).json_body().unwrap();
        assert!(body.get("maintenance_outlook").is_none());
    }

    #[test]
    fn test_predict_unknown_material_is_bad_request() {
        let mut body = job_body();
        body["material"] = json!("XYZ");
        let response = post(&service(), &body);
        assert_eq!(response.status, 400);
        let body = response.json_body().unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Invalid material type: XYZ");
        assert_eq!(body["wear_factor"], 0.0);
        assert_eq!(body["alerts"][0], "Error: Invalid material type: XYZ");
    }

    #[test]
    fn test_routing() {
        let service = service();
        let health = service.handle(&HttpRequest::new("GET", "/health", b""));
        assert_eq!(health.json_body().unwrap()["model_loaded"], true);

        let test = service.handle(&HttpRequest::new("GET", "/test", b""));
        assert_eq!(
            test.json_body().unwrap()["supported_materials"],
            json!(["PLA", "ABS", "PETG", "TPU"])
        );

        assert_eq!(service.handle(&HttpRequest::new("GET", "/predict", b"")).status, 405);
        assert_eq!(service.handle(&HttpRequest::new("GET", "/nope", b"")).status, 404);

        let preflight = service.handle(&HttpRequest::new("OPTIONS", "/predict", b""));
        assert_eq!(preflight.status, 204);
        assert!(preflight.body.is_empty());
        assert_eq!(
            preflight.header("Access-Control-Allow-Methods"),
            Some("GET, POST, OPTIONS")
        );
    }

    #[test]
    fn test_from_config_respects_model_switch() {
        let catalog = Arc::new(MaterialCatalog::standard().unwrap());
        let config = Config {
            maintenance_model_enabled: false,
            cors_allowed_origin: "https://printfarm.local".to_string(),
            ..Config::default()
        };
        let service = PredictionService::from_config(&config, catalog);
        assert!(!service.model_loaded());

        let response = service.handle(&HttpRequest::new("GET", "/health", b""));
        assert_eq!(
            response.header("Access-Control-Allow-Origin"),
            Some("https://printfarm.local")
        );
    }
}
