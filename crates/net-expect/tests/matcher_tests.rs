//! Matcher behavior over realistic traffic.

mod common;

use common::{exchange, request};
use net_expect::expect::{MatchMiss, check, request_matches};
use net_expect::{
    CompiledCriteria, HttpMethod, MatchCriteria, NetExpectError, ObservedExchange, RegexCache,
    matches,
};

fn compile(criteria: &MatchCriteria) -> CompiledCriteria {
    criteria.compile(&RegexCache::default()).unwrap()
}

fn with_request_header(mut exchange: ObservedExchange, name: &str, value: &str) -> ObservedExchange {
    exchange.request.headers.insert(name.into(), value.into());
    exchange
}

fn with_request_body(mut exchange: ObservedExchange, body: &str) -> ObservedExchange {
    exchange.request.body = Some(body.into());
    exchange
}

#[test]
fn url_pattern_is_searched_not_anchored() {
    let criteria = compile(&MatchCriteria::new(r"/api/users/\d+"));
    assert!(matches(
        &exchange("GET", "https://app.example.com/api/users/42?expand=1", 200, None),
        &criteria
    ));
    assert_eq!(
        check(&exchange("GET", "https://app.example.com/api/users/me", 200, None), &criteria),
        Err(MatchMiss::Url)
    );
}

#[test]
fn anchors_are_honored_when_written() {
    let criteria = compile(&MatchCriteria::new(r"^https://api\.example\.com/"));
    assert!(matches(&exchange("GET", "https://api.example.com/v1", 200, None), &criteria));
    assert!(!matches(
        &exchange("GET", "https://cdn.example.com/?u=https://api.example.com/", 200, None),
        &criteria
    ));
}

#[test]
fn method_defaults_to_get_and_ignores_case() {
    let criteria = compile(&MatchCriteria::new("/a"));
    assert!(matches(&exchange("get", "/a", 200, None), &criteria));
    assert_eq!(
        check(&exchange("POST", "/a", 200, None), &criteria),
        Err(MatchMiss::Method {
            actual: "POST".into()
        })
    );

    let delete = compile(&MatchCriteria::new("/a").method(HttpMethod::Delete));
    assert!(matches(&exchange("DELETE", "/a", 204, None), &delete));
}

#[test]
fn header_names_fold_case_but_values_do_not() {
    let criteria = compile(&MatchCriteria::new("/a").header("Authorization", "Bearer abc"));
    let base = exchange("GET", "/a", 200, None);

    assert!(matches(
        &with_request_header(base.clone(), "authorization", "Bearer abc"),
        &criteria
    ));
    assert_eq!(
        check(&with_request_header(base.clone(), "Authorization", "bearer abc"), &criteria),
        Err(MatchMiss::HeaderMismatch {
            name: "Authorization".into(),
            actual: "bearer abc".into()
        })
    );
    assert_eq!(
        check(&base, &criteria),
        Err(MatchMiss::HeaderMissing {
            name: "Authorization".into()
        })
    );
}

#[test]
fn every_required_header_must_match() {
    let criteria = compile(
        &MatchCriteria::new("/a")
            .header("X-One", "1")
            .header("X-Two", "2"),
    );
    let one = with_request_header(exchange("GET", "/a", 200, None), "X-One", "1");
    assert!(!matches(&one, &criteria));
    assert!(matches(&with_request_header(one, "X-Two", "2"), &criteria));
}

#[test]
fn body_pattern_searches_request_body() {
    let criteria = compile(
        &MatchCriteria::new("/login")
            .method(HttpMethod::Post)
            .body_pattern(r#""user":\s*"alice""#),
    );
    let post = exchange("POST", "/login", 200, None);

    assert!(matches(
        &with_request_body(post.clone(), r#"{"user": "alice", "pw": "x"}"#),
        &criteria
    ));
    assert_eq!(
        check(&with_request_body(post.clone(), r#"{"user": "bob"}"#), &criteria),
        Err(MatchMiss::Body)
    );
    // No body behaves like an empty one.
    assert_eq!(check(&post, &criteria), Err(MatchMiss::Body));

    let optional = compile(&MatchCriteria::new("/login").method(HttpMethod::Post).body_pattern("^$"));
    assert!(matches(&post, &optional));
}

#[test]
fn status_gate_only_applies_when_set() {
    let any = compile(&MatchCriteria::new("/a"));
    for status in [200, 302, 404, 500] {
        assert!(matches(&exchange("GET", "/a", status, None), &any));
    }

    let ok = compile(&MatchCriteria::new("/a").status_codes([200, 204]));
    assert!(matches(&exchange("GET", "/a", 204, None), &ok));
    assert_eq!(
        check(&exchange("GET", "/a", 500, None), &ok),
        Err(MatchMiss::Status { actual: 500 })
    );
}

#[test]
fn request_side_ignores_status() {
    let criteria = compile(&MatchCriteria::new("/a").status_codes([200]));
    assert!(request_matches(&request("GET", "/a"), &criteria));
}

#[test]
fn invalid_criteria_are_reported_by_field() {
    let cache = RegexCache::default();
    match MatchCriteria::new("(").compile(&cache) {
        Err(NetExpectError::InvalidPattern { field, pattern, .. }) => {
            assert_eq!(field, "url_pattern");
            assert_eq!(pattern, "(");
        }
        other => panic!("unexpected: {other:?}"),
    }
    match MatchCriteria::new("/a").body_pattern("[").compile(&cache) {
        Err(NetExpectError::InvalidPattern { field, .. }) => {
            assert_eq!(field, "match_body_pattern");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(
        MatchCriteria::new("/a").status_codes([200, 99]).compile(&cache),
        Err(NetExpectError::InvalidStatusCode { code: 99 })
    ));
    assert!(matches!(
        MatchCriteria::new("").compile(&cache),
        Err(NetExpectError::InvalidPattern { .. })
    ));
}

#[test]
fn criteria_share_compiled_patterns() {
    let cache = RegexCache::default();
    let first = MatchCriteria::new("/shared").compile(&cache).unwrap();
    let second = MatchCriteria::new("/shared").compile(&cache).unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().total_hits, 1);
}
