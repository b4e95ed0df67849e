//! AccuWeather gateway and GeoIP lookups against a mock HTTP server.

use std::time::Duration;

use forecast_core::{
    AccuWeatherGateway, GatewayError, GeoIpLocator, LocationResolver, Resolution, Units,
    WeatherGateway,
};
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn location_json(key: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "Key": key,
        "LocalizedName": name,
        "AdministrativeArea": { "LocalizedName": "Washington" },
        "Country": { "LocalizedName": "United States" },
        "GeoPosition": { "Latitude": 47.6, "Longitude": -122.3 }
    })
}

fn gateway(server: &MockServer) -> AccuWeatherGateway {
    AccuWeatherGateway::new(Some("TEST_KEY".into()), server.uri()).expect("client builds")
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let mock_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let gw = AccuWeatherGateway::new(None, mock_server.uri()).expect("client builds");

    let err = gw.search_by_text("Seattle").await.unwrap_err();
    assert!(matches!(err, GatewayError::Configuration));

    let err = gw.forecast("351409", Units::Metric).await.unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn text_search_sends_key_and_details() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations/v1/cities/search"))
        .and(query_param("q", "Seattle"))
        .and(query_param("details", "true"))
        .and(query_param("apikey", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            location_json("351409", "Seattle"),
            location_json("2628204", "Seattle Heights"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let found = gateway(&mock_server).search_by_text("Seattle").await.unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].key, "351409");
    assert_eq!(found[1].name, "Seattle Heights");
    assert_eq!(found[0].country, "United States");
}

#[tokio::test]
async fn postal_search_hits_postal_endpoint() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations/v1/postalcodes/search"))
        .and(query_param("q", "10001"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([location_json("349727", "New York")])),
        )
        .mount(&mock_server)
        .await;

    let found = gateway(&mock_server).search_by_postal("10001").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "New York");
}

#[tokio::test]
async fn geo_search_returns_single_location() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations/v1/cities/geoposition/search"))
        .and(query_param("q", "47.6,-122.33"))
        .respond_with(ResponseTemplate::new(200).set_body_json(location_json("351409", "Seattle")))
        .mount(&mock_server)
        .await;

    let found = gateway(&mock_server).search_by_geo(47.6, -122.33).await.unwrap();
    assert_eq!(found.map(|l| l.key), Some("351409".to_string()));
}

#[tokio::test]
async fn geo_search_null_body_is_absent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations/v1/cities/geoposition/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let found = gateway(&mock_server).search_by_geo(0.0, 0.0).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn current_conditions_takes_first_entry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/currentconditions/v1/351409"))
        .and(query_param("details", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "WeatherIcon": 7,
            "WeatherText": "Cloudy",
            "Temperature": { "Metric": { "Value": 15.6 } },
            "RealFeelTemperature": { "Metric": { "Value": 14.0 } },
            "RelativeHumidity": 71,
            "Wind": { "Speed": { "Metric": { "Value": 9.3 } } },
            "UVIndex": 2
        }])))
        .mount(&mock_server)
        .await;

    let cc = gateway(&mock_server)
        .current_conditions("351409")
        .await
        .unwrap()
        .expect("conditions present");
    assert_eq!(cc.icon, 7);
    assert_eq!(cc.description, "Cloudy");
    assert_eq!(cc.temperature_c, Some(15.6));
    assert_eq!(cc.humidity_pct, Some(71));
}

#[tokio::test]
async fn current_conditions_empty_list_is_absent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/currentconditions/v1/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let cc = gateway(&mock_server).current_conditions("1").await.unwrap();
    assert!(cc.is_none());
}

#[tokio::test]
async fn forecast_keeps_raw_document() {
    let mock_server = MockServer::start().await;
    let body = serde_json::json!({
        "Headline": { "Text": "Pleasant this weekend" },
        "DailyForecasts": [
            {
                "Date": "2024-06-01T07:00:00-07:00",
                "Day": { "Icon": 2, "IconPhrase": "Mostly sunny" }
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/forecasts/v1/daily/5day/351409"))
        .and(query_param("metric", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&mock_server)
        .await;

    let doc = gateway(&mock_server).forecast("351409", Units::Metric).await.unwrap();
    assert_eq!(doc.as_value(), &body);
    assert_eq!(doc.days().len(), 1);
}

#[tokio::test]
async fn error_status_carries_truncated_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("E".repeat(1000)))
        .mount(&mock_server)
        .await;

    let err = gateway(&mock_server).search_by_text("Seattle").await.unwrap_err();
    match err {
        GatewayError::RemoteService { status, excerpt } => {
            assert_eq!(status, Some(503));
            assert_eq!(excerpt.len(), 203);
            assert!(excerpt.ends_with("..."));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn timeout_is_a_remote_service_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let gw = AccuWeatherGateway::with_timeout(
        Some("TEST_KEY".into()),
        mock_server.uri(),
        Duration::from_millis(200),
    )
    .expect("client builds");

    let err = gw.search_by_text("Seattle").await.unwrap_err();
    assert!(matches!(err, GatewayError::RemoteService { status: None, .. }));
}

#[tokio::test]
async fn transport_errors_do_not_reveal_the_key() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let slow = AccuWeatherGateway::with_timeout(
        Some("SUPERSECRET".into()),
        mock_server.uri(),
        Duration::from_millis(200),
    )
    .expect("client builds");
    let shown = slow.search_by_text("Seattle").await.unwrap_err().to_string();
    assert!(!shown.contains("SUPERSECRET"), "key leaked: {shown}");
    assert!(!shown.contains("apikey"), "query leaked: {shown}");

    let unreachable = AccuWeatherGateway::new(Some("SUPERSECRET".into()), "http://127.0.0.1:9")
        .expect("client builds");
    let shown = unreachable.forecast("351409", Units::Metric).await.unwrap_err().to_string();
    assert!(!shown.contains("SUPERSECRET"), "key leaked: {shown}");
}

#[tokio::test]
async fn malformed_body_is_a_remote_service_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let err = gateway(&mock_server).search_by_text("Seattle").await.unwrap_err();
    assert!(matches!(err, GatewayError::RemoteService { status: Some(200), .. }));
}

#[tokio::test]
async fn resolver_memoizes_remote_searches() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations/v1/cities/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([location_json("351409", "Seattle")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let gw = gateway(&mock_server);
    let mut resolver = LocationResolver::default();

    for _ in 0..3 {
        let res = resolver.resolve(&gw, "Seattle").await.unwrap();
        assert!(matches!(res, Resolution::Single(ref l) if l.key == "351409"));
    }
}

#[tokio::test]
async fn geoip_parses_loc_field() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "203.0.113.7",
            "city": "Seattle",
            "region": "Washington",
            "country": "US",
            "loc": "47.6062,-122.3321"
        })))
        .mount(&mock_server)
        .await;

    let found = GeoIpLocator::new(format!("{}/json", mock_server.uri()))
        .locate()
        .await
        .expect("location");
    assert_eq!(found.latitude, 47.6062);
    assert_eq!(found.longitude, -122.3321);
    assert_eq!(found.city.as_deref(), Some("Seattle"));
    assert_eq!(found.country.as_deref(), Some("US"));
}

#[tokio::test]
async fn geoip_swallows_failures() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing-loc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "city": "X" })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    for route in ["/missing-loc", "/error", "/garbage"] {
        let locator = GeoIpLocator::new(format!("{}{route}", mock_server.uri()));
        assert!(locator.locate().await.is_none(), "{route} should yield None");
    }
}
