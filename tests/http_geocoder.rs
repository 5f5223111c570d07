use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use servicearea::config::GeocodingConfig;
use servicearea::permission::StaticPermissions;
use servicearea::sensor::FixedSensor;
use servicearea::{Coordinate, Geocoder, HttpGeocoder, LocationError, LocationResolver};

const SION: &str = r#"{
  "status": "OK",
  "results": [
    {
      "formatted_address": "Sion, Mumbai, Maharashtra 400022, India",
      "geometry": { "location": { "lat": 19.0390, "lng": 72.8619 } }
    }
  ]
}"#;

const DADAR: &str = r#"{
  "status": "OK",
  "results": [
    {
      "formatted_address": "Dadar East, Mumbai, Maharashtra 400014, India",
      "geometry": { "location": { "lat": 19.0178, "lng": 72.8478 } }
    },
    {
      "formatted_address": "Mumbai, Maharashtra, India",
      "geometry": { "location": { "lat": 19.0760, "lng": 72.8777 } }
    }
  ]
}"#;

const ZERO_RESULTS: &str = r#"{ "status": "ZERO_RESULTS", "results": [] }"#;

const OVER_QUERY_LIMIT: &str = r#"{
  "status": "OVER_QUERY_LIMIT",
  "error_message": "You have exceeded your daily request quota for this API.",
  "results": []
}"#;

const REQUEST_DENIED: &str = r#"{
  "status": "REQUEST_DENIED",
  "error_message": "The provided API key is invalid.",
  "results": []
}"#;

/// Serves one canned response per connection, repeating the last one, and records
/// the request target of every connection.
struct CannedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };

                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf);
                let target = head
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or_default()
                    .to_string();
                seen.lock().unwrap().push(target);

                let (status, body) = responses[served.min(responses.len() - 1)];
                served += 1;
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{addr}/maps/api/geocode/json"),
            requests,
        }
    }

    fn geocoder(&self) -> HttpGeocoder {
        HttpGeocoder::new(&GeocodingConfig {
            api_key: "test-key".to_string(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
        .with_retry_delay(Duration::from_millis(10))
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn reverse_returns_every_match_in_order() {
    let server = CannedServer::start(vec![(200, DADAR)]).await;

    let results = server
        .geocoder()
        .reverse(Coordinate::new(19.0178, 72.8478))
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].formatted_address,
        "Dadar East, Mumbai, Maharashtra 400014, India"
    );
    assert_eq!(
        server.requests(),
        vec!["/maps/api/geocode/json?latlng=19.0178%2C72.8478&key=test-key".to_string()]
    );
}

#[tokio::test]
async fn zero_results_is_an_empty_answer() {
    let server = CannedServer::start(vec![(200, ZERO_RESULTS)]).await;

    let results = server.geocoder().forward("000000").await.unwrap();

    assert!(results.is_empty());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn server_error_is_retried_once() {
    let server = CannedServer::start(vec![(503, "{}"), (200, SION)]).await;

    let results = server.geocoder().forward("400022").await.unwrap();

    assert_eq!(results[0].coordinate(), Coordinate::new(19.0390, 72.8619));
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn persistent_server_error_gives_up_after_retry() {
    let server = CannedServer::start(vec![(500, "{}")]).await;

    let err = server.geocoder().forward("400022").await.unwrap_err();

    assert!(matches!(
        err,
        LocationError::GeocodeTransportFailure {
            transient: true,
            ..
        }
    ));
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = CannedServer::start(vec![(403, r#"{"status":"REQUEST_DENIED"}"#)]).await;

    let err = server.geocoder().forward("400022").await.unwrap_err();

    assert!(!err.is_transient());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn quota_status_is_retried_once() {
    let server = CannedServer::start(vec![(200, OVER_QUERY_LIMIT), (200, SION)]).await;

    let results = server.geocoder().forward("400022").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn rejected_key_is_a_transport_failure() {
    let server = CannedServer::start(vec![(200, REQUEST_DENIED)]).await;

    let err = server.geocoder().forward("400022").await.unwrap_err();

    assert!(matches!(
        &err,
        LocationError::GeocodeTransportFailure {
            transient: false,
            ..
        }
    ));
    assert!(err.to_string().contains("REQUEST_DENIED"));
    assert_ne!(err.user_message(), "No location found for this postal code.");
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn resolver_locates_over_http() {
    // Connection order: the reverse lookup and the service area lookup run together,
    // so both get a body that parses for either request.
    let server = CannedServer::start(vec![(200, SION)]).await;

    let resolver = LocationResolver::new(
        Arc::new(server.geocoder()),
        Arc::new(StaticPermissions::granting()),
        Arc::new(FixedSensor::new(Coordinate::new(19.0178, 72.8478))),
    );

    let location = resolver.locate().await.unwrap();

    assert!(location.is_serviceable);
    assert_eq!(
        location.formatted_address.as_deref(),
        Some("Sion, Mumbai, Maharashtra 400022, India")
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .any(|target| target.contains("address=400022")));
    assert!(requests.iter().any(|target| target.contains("latlng=")));
}
