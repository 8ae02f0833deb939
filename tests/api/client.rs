use std::sync::Arc;

use serde_json::Value;

use slotrush::api::{
    ApiErrorKind, HttpMethod, Identity,
    payloads::{CartInfo, CheckOrder, MultiReserveTime, ProductList, ReserveTime},
    testing::{
        ScriptedTransport, cart_data, check_order_data, reserve_time_data, sample_address,
        user_address_data, user_detail_data,
    },
};

use crate::{CountingSigner, FIXED_TIME, client_with, client_with_signer, form_fields};

fn scripted() -> ScriptedTransport {
    ScriptedTransport::new()
        .respond_ok("user/detail", user_detail_data("u-1"))
        .respond_ok("user/address", user_address_data())
        .respond_ok("cart/index", cart_data(true))
        .respond_ok("cart/updateCheck", cart_data(true))
        .respond_ok("getMultiReserveTime", reserve_time_data(true))
        .respond_ok("checkOrder", check_order_data())
        .respond_ok(
            "addNewOrder",
            serde_json::json!({"order_number": "ORD-1", "pay_url": ""}),
        )
}

#[tokio::test]
async fn given_unresolved_identity_when_address_lookup_invoked_then_nothing_is_sent() {
    let transport = Arc::new(scripted());
    let client = client_with(transport.clone());

    let err = client
        .user_address()
        .await
        .expect_err("identity must be resolved first");
    assert_eq!(err.kind, ApiErrorKind::IdentityNotResolved);
    assert_eq!(err.operation.as_deref(), Some("user_address"));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn given_unresolved_identity_when_signed_posts_invoked_then_nothing_is_signed_or_sent() {
    let transport = Arc::new(scripted());
    let signer = Arc::new(CountingSigner::default());
    let client = client_with_signer(transport.clone(), signer.clone());
    let cart: CartInfo = serde_json::from_value(cart_data(true)).expect("cart fixture decodes");

    let err = client
        .update_check("p-1", "c-1")
        .await
        .expect_err("identity must be resolved first");
    assert_eq!(err.kind, ApiErrorKind::IdentityNotResolved);
    assert_eq!(err.operation.as_deref(), Some("update_check"));

    let err = client
        .check_order(&cart.new_order_product_list[0], false)
        .await
        .expect_err("identity must be resolved first");
    assert_eq!(err.kind, ApiErrorKind::IdentityNotResolved);

    assert_eq!(transport.request_count(), 0);
    assert_eq!(signer.calls(), 0);
}

#[tokio::test]
async fn given_no_bound_address_when_slot_or_order_posts_invoked_then_nothing_is_sent() {
    let transport = Arc::new(scripted());
    let signer = Arc::new(CountingSigner::default());
    let mut client = client_with_signer(transport.clone(), signer.clone());
    client.user_detail().await.expect("identity should resolve");

    let cart: CartInfo = serde_json::from_value(cart_data(true)).expect("cart fixture decodes");
    let preview: CheckOrder =
        serde_json::from_value(check_order_data()).expect("preview fixture decodes");
    let slot = ReserveTime {
        start_timestamp: 1_650_003_600,
        end_timestamp: 1_650_007_200,
        ..ReserveTime::default()
    };

    let err = client
        .multi_reserve_time(&cart.new_order_product_list[0].products)
        .await
        .expect_err("address must be bound");
    assert_eq!(err.kind, ApiErrorKind::AddressNotBound);

    let err = client
        .add_new_order(2, &cart, &slot, &preview)
        .await
        .expect_err("address must be bound");
    assert_eq!(err.kind, ApiErrorKind::AddressNotBound);
    assert_eq!(err.operation.as_deref(), Some("add_new_order"));

    assert_eq!(transport.request_count(), 1);
    assert_eq!(signer.calls(), 0);
}

#[tokio::test]
async fn given_empty_package_when_check_order_invoked_then_empty_selection_is_returned() {
    let transport = Arc::new(scripted());
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());

    let err = client
        .check_order(&ProductList::default(), true)
        .await
        .expect_err("empty package must fail");
    assert_eq!(err.kind, ApiErrorKind::EmptySelection);
    assert!(transport.requests_to("checkOrder").is_empty());
}

#[tokio::test]
async fn given_no_bound_address_when_cart_invoked_then_address_not_bound_is_returned() {
    let transport = Arc::new(scripted());
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");

    let err = client.cart().await.expect_err("address must be bound");
    assert_eq!(err.kind, ApiErrorKind::AddressNotBound);
    assert!(err.is_precondition());
    assert_eq!(transport.request_count(), 1);
    assert!(transport.requests_to("cart/index").is_empty());
}

#[tokio::test]
async fn given_resolved_session_when_cart_invoked_then_identity_and_station_are_sent() {
    let transport = Arc::new(scripted());
    let mut client = client_with(transport.clone());

    let detail = client.user_detail().await.expect("identity should resolve");
    assert_eq!(detail.user_info.id, "u-1");
    assert_eq!(
        client.session().identity(),
        &Identity::Authenticated {
            uid: "u-1".to_string()
        }
    );

    let addresses = client.user_address().await.expect("addresses should load");
    let address = addresses
        .default_address()
        .cloned()
        .expect("default address should exist");
    assert_eq!(address, sample_address());
    client.set_address(address);

    let cart: CartInfo = client.cart().await.expect("cart should load");
    assert_eq!(cart.parent_order_info.parent_order_sign, "sign-1");
    assert_eq!(cart.unchecked_items().count(), 0);

    let requests = transport.requests_to("cart/index");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, HttpMethod::Get);
    assert!(request.body.is_none());
    assert_eq!(request.header("ddmc-uid"), Some("u-1"));
    assert_eq!(request.header("ddmc-station-id"), Some("station-1"));
    assert_eq!(request.header("ddmc-city-number"), Some("0101"));
    assert_eq!(request.header("ddmc-time"), Some(FIXED_TIME));
    assert_eq!(request.header("Cookie"), Some("DDXQSESSID=abc"));
    assert!(request.url.contains("station_id=station-1"));
    assert!(request.url.contains("is_load=1"));

    // The identity lookup itself goes out with base headers only.
    let detail_request = &transport.requests_to("user/detail")[0];
    assert_eq!(detail_request.header("ddmc-uid"), None);
}

#[tokio::test]
async fn given_sold_out_envelope_when_cart_invoked_then_business_error_is_verbatim() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_ok("user/detail", user_detail_data("u-1"))
            .respond_failure("cart/index", 40004, "sold out"),
    );
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());

    let err = client.cart().await.expect_err("envelope reports failure");
    assert_eq!(err.kind, ApiErrorKind::Business);
    assert_eq!(err.code, Some(40004));
    assert_eq!(err.message, "sold out");
    assert_eq!(err.operation.as_deref(), Some("cart"));
    assert!(!err.retryable);
}

#[tokio::test]
async fn given_changed_uid_when_identity_resolved_again_then_protocol_error_is_returned() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond_ok("user/detail", user_detail_data("u-1"))
            .respond_ok("user/detail", user_detail_data("u-2")),
    );
    let mut client = client_with(transport);
    client.user_detail().await.expect("first lookup should succeed");

    let err = client
        .user_detail()
        .await
        .expect_err("identity must not change");
    assert_eq!(err.kind, ApiErrorKind::Protocol);
    assert_eq!(client.session().uid(), Some("u-1"));
}

#[tokio::test]
async fn given_empty_product_list_when_reserve_time_requested_then_nothing_is_sent() {
    let transport = Arc::new(scripted());
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());

    let err = client
        .multi_reserve_time(&[])
        .await
        .expect_err("empty selection must fail");
    assert_eq!(err.kind, ApiErrorKind::EmptySelection);
    assert!(transport.requests_to("getMultiReserveTime").is_empty());
}

#[tokio::test]
async fn given_checked_cart_when_reserve_time_requested_then_products_are_nested_once() {
    let transport = Arc::new(scripted());
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());

    let cart = client.cart().await.expect("cart should load");
    let products = &cart.new_order_product_list[0].products;
    let slots: MultiReserveTime = client
        .multi_reserve_time(products)
        .await
        .expect("slots should load");
    let slot = slots.first_available().expect("one slot is open");
    assert_eq!(slot.start_timestamp, 1_650_003_600);

    let request = &transport.requests_to("getMultiReserveTime")[0];
    let fields = form_fields(request.body.as_deref().expect("post has a body"));
    assert_eq!(fields["address_id"], "addr-1");
    assert_eq!(fields["station_id"], "station-1");
    let nested: Value = serde_json::from_str(&fields["products"]).expect("products is json");
    assert_eq!(nested[0][0]["id"], "p-1");
}

#[tokio::test]
async fn given_balance_policy_when_check_order_invoked_then_package_totals_are_copied() {
    let transport = Arc::new(scripted());
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());

    let cart = client.cart().await.expect("cart should load");
    let preview: CheckOrder = client
        .check_order(&cart.new_order_product_list[0], true)
        .await
        .expect("checkout preview should load");
    assert_eq!(preview.order.freight_money, "5.00");

    let request = &transport.requests_to("checkOrder")[0];
    let fields = form_fields(request.body.as_deref().expect("post has a body"));
    assert_eq!(fields["is_use_balance"], "1");
    assert_eq!(fields["uid"], "u-1");
    assert_eq!(fields["time"], FIXED_TIME);
    assert_eq!(fields["longitude"], "121.5");
    assert_eq!(fields["latitude"], "31.25");
    assert!(fields.contains_key("nars"));
    assert!(fields.contains_key("sesi"));

    let packages: Value = serde_json::from_str(&fields["packages"]).expect("packages is json");
    let product = &packages[0]["products"][0];
    assert_eq!(product["total_money"], "19.80");
    assert_eq!(product["total_origin_money"], "21.00");
    assert_eq!(product["count"], 2);
    assert!(packages[0]["reserved_time"]["reserved_time_start"].is_null());
    assert_eq!(packages[0]["package_id"], 1);
}

#[tokio::test]
async fn given_selected_slot_when_order_submitted_then_payment_order_is_assembled() {
    let transport = Arc::new(scripted());
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());

    let cart = client.cart().await.expect("cart should load");
    let preview = client
        .check_order(&cart.new_order_product_list[0], false)
        .await
        .expect("checkout preview should load");
    let slots = client
        .multi_reserve_time(&cart.new_order_product_list[0].products)
        .await
        .expect("slots should load");
    let slot = slots.first_available().cloned().expect("one slot is open");

    let order = client
        .add_new_order(2, &cart, &slot, &preview)
        .await
        .expect("order should be accepted");
    assert_eq!(order.order_number, "ORD-1");

    let request = &transport.requests_to("addNewOrder")[0];
    let fields = form_fields(request.body.as_deref().expect("post has a body"));
    let package_order: Value =
        serde_json::from_str(&fields["package_order"]).expect("package_order is json");
    let payment = &package_order["payment_order"];
    assert_eq!(payment["reserved_time_start"], 1_650_003_600);
    assert_eq!(payment["reserved_time_end"], 1_650_007_200);
    assert_eq!(payment["freight_discount_money"], "0.00");
    assert_eq!(payment["order_freight"], "5.00");
    assert_eq!(payment["parent_order_sign"], "sign-1");
    assert_eq!(payment["address_id"], "addr-1");
    assert_eq!(payment["pay_type"], 2);
    assert_eq!(payment["user_ticket_id"], "coupon-1");
    assert_eq!(payment["form_id"].as_str().map(str::len), Some(32));

    let package = &package_order["packages"][0];
    assert_eq!(package["reserved_time_start"], 1_650_003_600);
    assert_eq!(package["products"][0]["id"], "p-1");
}

#[tokio::test]
async fn given_preview_without_freight_when_order_submitted_then_protocol_error_is_returned() {
    let transport = Arc::new(scripted());
    let mut client = client_with(transport.clone());
    client.user_detail().await.expect("identity should resolve");
    client.set_address(sample_address());

    let cart = client.cart().await.expect("cart should load");
    let slots = client
        .multi_reserve_time(&cart.new_order_product_list[0].products)
        .await
        .expect("slots should load");
    let slot = slots.first_available().cloned().expect("one slot is open");

    let err = client
        .add_new_order(2, &cart, &slot, &CheckOrder::default())
        .await
        .expect_err("freight is required");
    assert_eq!(err.kind, ApiErrorKind::Protocol);
    assert!(transport.requests_to("addNewOrder").is_empty());
}
