//! Verify build/parse against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector describes the date requested, the expected URL, a simulated
//! response and the expected record or error. Records are compared as parsed
//! values, not raw strings, so field ordering never matters.

use apod_core::{ApodClient, CalendarDate, FetchError, HttpResponse, PictureRecord};

fn vectors() -> serde_json::Value {
    let raw = include_str!("../../test-vectors/fetch.json");
    serde_json::from_str(raw).unwrap()
}

fn client(v: &serde_json::Value) -> ApodClient {
    ApodClient::new(v["base_url"].as_str().unwrap(), v["api_key"].as_str().unwrap())
}

fn simulated(case: &serde_json::Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

#[test]
fn fetch_test_vectors() {
    let v = vectors();
    let c = client(&v);
    for case in v["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let date: Option<CalendarDate> = case["date"].as_str().map(|d| d.parse().unwrap());

        // Verify build
        let req = c.build_fetch(date);
        assert_eq!(req.url, case["expected_url"].as_str().unwrap(), "{name}: url");

        // Verify parse
        let record = c.parse_fetch(simulated(case)).unwrap();
        let expected: PictureRecord =
            serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(record, expected, "{name}: parsed result");
    }
}

#[test]
fn error_test_vectors() {
    let v = vectors();
    let c = client(&v);
    for case in v["error_cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_error"];
        let err = c.parse_fetch(simulated(case)).unwrap_err();

        match expected["kind"].as_str().unwrap() {
            "http" => {
                let want = FetchError::Http {
                    status: expected["status"].as_u64().unwrap() as u16,
                    message: expected["message"].as_str().map(str::to_string),
                };
                assert_eq!(err, want, "{name}");
            }
            "decode" => assert!(matches!(err, FetchError::Decode(_)), "{name}: {err:?}"),
            other => panic!("unknown error kind in vectors: {other}"),
        }
    }
}
