use std::{sync::Arc, time::Duration};

use slotrush::api::{
    ApiErrorKind, HttpMethod, HttpResponse, SessionClient, Transport,
    signer::Md5Signer,
    testing::{ScriptedTransport, cart_data, sample_address, user_detail_data},
};

use crate::{FIXED_TIME, api_config, client_with, form_fields};

fn ready_transport() -> ScriptedTransport {
    ScriptedTransport::new()
        .respond_ok("user/detail", user_detail_data("u-1"))
        .respond_ok("cart/updateCheck", cart_data(true))
}

async fn update_check_body(transport: Arc<ScriptedTransport>) -> String {
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());
    client
        .update_check("p-1", "c-1")
        .await
        .expect("update should succeed");

    transport.requests_to("cart/updateCheck")[0]
        .body
        .clone()
        .expect("post has a body")
}

#[tokio::test]
async fn given_identical_inputs_when_signed_post_built_twice_then_bodies_match() {
    let first = update_check_body(Arc::new(ready_transport())).await;
    let second = update_check_body(Arc::new(ready_transport())).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn given_signed_post_when_inspected_then_tokens_cover_every_other_field() {
    let body = update_check_body(Arc::new(ready_transport())).await;
    let mut fields = form_fields(&body);

    let nars = fields.remove("nars").expect("nars is appended");
    let sesi = fields.remove("sesi").expect("sesi is appended");
    let canonical = fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    assert_eq!(nars, format!("{:x}", md5::compute(format!("{}salt", canonical))));
    assert_eq!(sesi, format!("{:x}", md5::compute(format!("salt{}", nars))));

    assert_eq!(fields["time"], FIXED_TIME);
    assert_eq!(fields["s_id"], "sid-1");
    assert_eq!(fields["openid"], "open-1");
    assert_eq!(fields["device_token"], "token-1");
    assert_eq!(fields["api_version"], "9.50.0");
    assert_eq!(fields["is_load"], "1");
}

#[tokio::test]
async fn given_signed_post_when_encoded_then_keys_are_in_sorted_order() {
    let body = update_check_body(Arc::new(ready_transport())).await;
    let keys = url::form_urlencoded::parse(body.as_bytes())
        .map(|(key, _)| key.into_owned())
        .collect::<Vec<_>>();

    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[tokio::test]
async fn given_get_request_when_built_then_query_is_unsigned() {
    let transport = Arc::new(ready_transport());
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");

    let request = &transport.requests_to("user/detail")[0];
    assert_eq!(request.method, HttpMethod::Get);
    assert!(request.url.contains("api_version=9.50.0"));
    assert!(request.url.contains("channel=applet"));
    assert!(!request.url.contains("nars="));
    assert!(!request.url.contains("sesi="));
    assert_eq!(request.header("ddmc-device-id"), Some("device-1"));
}

#[tokio::test]
async fn given_non_success_status_when_executed_then_status_is_classified_before_decoding() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond(
                "user/detail",
                Ok(HttpResponse {
                    status: 503,
                    body: r#"{"success":true,"code":0,"data":{}}"#.to_string(),
                }),
            )
            .respond(
                "user/detail",
                Ok(HttpResponse {
                    status: 401,
                    body: "expired".to_string(),
                }),
            ),
    );
    let mut client = client_with(transport);

    let unavailable = client.user_detail().await.expect_err("503 must fail");
    assert_eq!(unavailable.kind, ApiErrorKind::HttpStatus);
    assert_eq!(unavailable.http_status, Some(503));
    assert!(unavailable.retryable);

    let rejected = client.user_detail().await.expect_err("401 must fail");
    assert_eq!(rejected.kind, ApiErrorKind::Authentication);
    assert!(!rejected.retryable);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn given_malformed_body_when_executed_then_protocol_error_is_returned() {
    let transport = Arc::new(ScriptedTransport::new().respond(
        "user/detail",
        Ok(HttpResponse {
            status: 200,
            body: "<html>maintenance</html>".to_string(),
        }),
    ));
    let mut client = client_with(transport);

    let err = client.user_detail().await.expect_err("body is not json");
    assert_eq!(err.kind, ApiErrorKind::Protocol);
    assert_eq!(err.operation.as_deref(), Some("user_detail"));
}

#[tokio::test]
async fn given_system_clock_when_post_built_then_signed_time_matches_header() {
    let transport = Arc::new(ready_transport());
    let mut config = api_config();
    config.debug_time = None;
    let shared: Arc<dyn Transport> = transport.clone();
    let mut client =
        SessionClient::from_config(&config, Arc::new(Md5Signer::new("salt")), shared)
            .expect("client should build");
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());

    for _ in 0..20 {
        client
            .update_check("p-1", "c-1")
            .await
            .expect("update should succeed");
    }

    for request in transport.requests_to("cart/updateCheck") {
        let fields = form_fields(request.body.as_deref().expect("post has a body"));
        assert_eq!(Some(fields["time"].as_str()), request.header("ddmc-time"));
    }
}

#[tokio::test]
async fn given_adjusted_timeout_when_request_built_then_transport_receives_it() {
    let transport = Arc::new(ready_transport());
    let mut client = client_with(transport.clone());
    client.set_timeout(Duration::from_millis(750));
    client.user_detail().await.expect("identity should resolve");

    let request = &transport.requests_to("user/detail")[0];
    assert_eq!(request.timeout, Duration::from_millis(750));
}
