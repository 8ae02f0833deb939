use std::{sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

use crate::{
    api::{
        error::{
            ApiError, address_not_bound, empty_selection, invalid_config, protocol_error,
        },
        payloads::{
            AddNewOrder, Address, CartInfo, CheckOrder, MultiReserveTime, ProductList,
            ProductListItem, ReserveTime, UserAddress, UserDetail,
        },
        pipeline::{Call, ClientProfile, RequestPipeline},
        session::{RequestClock, Session},
        signer::{Signer, build_signer},
        transport::{ReqwestTransport, Transport},
        types::{ApiConfig, BaseUrls},
    },
    schedule::parse_duration,
};

const OP_USER_DETAIL: &str = "user_detail";
const OP_USER_ADDRESS: &str = "user_address";
const OP_CART: &str = "cart";
const OP_MULTI_RESERVE_TIME: &str = "multi_reserve_time";
const OP_UPDATE_CHECK: &str = "update_check";
const OP_CHECK_ORDER: &str = "check_order";
const OP_ADD_NEW_ORDER: &str = "add_new_order";

#[derive(Debug, Clone)]
struct Endpoints {
    user: String,
    mall: String,
}

impl Endpoints {
    fn new(base_urls: &BaseUrls) -> Result<Self, ApiError> {
        let endpoints = Self {
            user: base_urls.user.trim_end_matches('/').to_string(),
            mall: base_urls.mall.trim_end_matches('/').to_string(),
        };
        endpoints.user("")?;
        endpoints.mall("")?;
        Ok(endpoints)
    }

    fn user(&self, path: &str) -> Result<Url, ApiError> {
        join_url(&self.user, path)
    }

    fn mall(&self, path: &str) -> Result<Url, ApiError> {
        join_url(&self.mall, path)
    }
}

fn join_url(base: &str, path: &str) -> Result<Url, ApiError> {
    let raw = format!("{}/{}", base, path.trim_start_matches('/'));
    Url::parse(&raw).map_err(|err| invalid_config(format!("invalid endpoint url '{}': {}", raw, err)))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value)
        .map_err(|err| protocol_error(format!("failed to encode request field: {}", err)))
}

fn to_json_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|err| protocol_error(format!("failed to encode request field: {}", err)))
}

/// One remote operation per backend endpoint, all funnelled through the
/// shared [`RequestPipeline`].
pub struct SessionClient {
    session: Session,
    pipeline: RequestPipeline,
    endpoints: Endpoints,
}

impl SessionClient {
    pub fn new(
        session: Session,
        pipeline: RequestPipeline,
        base_urls: &BaseUrls,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            session,
            pipeline,
            endpoints: Endpoints::new(base_urls)?,
        })
    }

    pub fn from_config(
        config: &ApiConfig,
        signer: Arc<dyn Signer>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        let timeout = parse_duration(&config.request_timeout)
            .map_err(|err| invalid_config(format!("api.request_timeout: {}", err)))?;

        let mut session = Session::new(config.cookie.clone())?;
        if let Some(debug_time) = &config.debug_time {
            session = session.with_clock(RequestClock::Fixed(debug_time.clone()));
        }

        let pipeline =
            RequestPipeline::new(ClientProfile::from(config), signer, transport, timeout);
        Self::new(session, pipeline, &config.base_urls)
    }

    /// Builds the configured signer and a reqwest-backed transport.
    pub fn connect(config: &ApiConfig) -> Result<Self, ApiError> {
        let signer = build_signer(&config.signer)?;
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::from_config(config, signer, transport)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn set_address(&mut self, address: Address) -> &mut Self {
        tracing::info!(
            target: "api",
            address_id = %address.id,
            station_id = %address.station_info.id,
            "address_bound"
        );
        self.session.set_address(address);
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.pipeline.set_timeout(timeout);
        self
    }

    fn require_address(&self, operation: &'static str) -> Result<&Address, ApiError> {
        self.session
            .address()
            .ok_or_else(|| address_not_bound().with_operation(operation))
    }

    /// Resolves the account identity and moves the session to the
    /// authenticated state.
    pub async fn user_detail(&mut self) -> Result<UserDetail, ApiError> {
        let call = Call::get(OP_USER_DETAIL, self.endpoints.user("api/v1/user/detail/")?);
        let detail: UserDetail = self.pipeline.execute(&self.session, call).await?;

        self.session
            .authenticate(detail.user_info.id.clone())
            .map_err(|err| err.with_operation(OP_USER_DETAIL))?;
        tracing::info!(target: "api", uid = %detail.user_info.id, "identity_resolved");

        Ok(detail)
    }

    pub async fn user_address(&self) -> Result<UserAddress, ApiError> {
        let call = Call::get(OP_USER_ADDRESS, self.endpoints.user("api/v1/user/address/")?)
            .authenticated();
        self.pipeline.execute(&self.session, call).await
    }

    pub async fn cart(&self) -> Result<CartInfo, ApiError> {
        let address = self.require_address(OP_CART)?;

        let call = Call::get(OP_CART, self.endpoints.mall("cart/index")?)
            .authenticated()
            .field("station_id", address.station_info.id.clone())
            .field("is_load", "1");
        self.pipeline.execute(&self.session, call).await
    }

    pub async fn multi_reserve_time(
        &self,
        products: &[ProductListItem],
    ) -> Result<MultiReserveTime, ApiError> {
        let address = self.require_address(OP_MULTI_RESERVE_TIME)?;
        if products.is_empty() {
            return Err(empty_selection("no products selected for reservation")
                .with_operation(OP_MULTI_RESERVE_TIME));
        }

        let call = Call::post(
            OP_MULTI_RESERVE_TIME,
            self.endpoints.mall("order/getMultiReserveTime")?,
        )
        .authenticated()
        .field("station_id", address.station_info.id.clone())
        .field("address_id", address.id.clone())
        .field("group_config_id", "")
        .field("products", to_json(&[products])?)
        .field("isBridge", "false");
        self.pipeline.execute(&self.session, call).await
    }

    pub async fn update_check(
        &self,
        product_id: &str,
        cart_id: &str,
    ) -> Result<CartInfo, ApiError> {
        let product = json!({
            "id": product_id,
            "cart_id": cart_id,
            "is_check": true,
            "sizes": [],
        });

        let call = Call::post(OP_UPDATE_CHECK, self.endpoints.mall("cart/updateCheck")?)
            .authenticated()
            .field("product", product.to_string())
            .field("is_load", "1")
            .field("ab_config", r#"{"key_onion":"D","key_cart_discount_price":"C"}"#);
        self.pipeline.execute(&self.session, call).await
    }

    /// Prices the package; `use_balance` selects the account-balance
    /// payment policy.
    pub async fn check_order(
        &self,
        product_list: &ProductList,
        use_balance: bool,
    ) -> Result<CheckOrder, ApiError> {
        if product_list.products.is_empty() {
            return Err(empty_selection("no products available to check out")
                .with_operation(OP_CHECK_ORDER));
        }

        let mut package = product_list.clone();
        for product in &mut package.products {
            product.total_origin_money = product.total_origin_price.clone();
            product.total_money = product.total_price.clone();
        }

        let mut package = to_json_value(&package)?;
        package["reserved_time"] = json!({
            "reserved_time_start": null,
            "reserved_time_end": null,
        });

        let call = Call::post(OP_CHECK_ORDER, self.endpoints.mall("order/checkOrder")?)
            .authenticated()
            .field("user_ticket_id", "default")
            .field("freight_ticket_id", "default")
            .field("is_use_point", "0")
            .field("is_use_balance", if use_balance { "1" } else { "0" })
            .field("is_buy_vip", "0")
            .field("coupons_id", "")
            .field("is_buy_coupons", "0")
            .field("packages", json!([package]).to_string());
        self.pipeline.execute(&self.session, call).await
    }

    pub async fn add_new_order(
        &self,
        pay_type: u32,
        cart: &CartInfo,
        reserve_time: &ReserveTime,
        check_order: &CheckOrder,
    ) -> Result<AddNewOrder, ApiError> {
        let address = self.require_address(OP_ADD_NEW_ORDER)?;
        let product_list = cart.new_order_product_list.first().ok_or_else(|| {
            empty_selection("cart has no orderable package").with_operation(OP_ADD_NEW_ORDER)
        })?;
        let freight = check_order.order.freights.first().ok_or_else(|| {
            protocol_error("checkout preview carries no freight entry")
                .with_operation(OP_ADD_NEW_ORDER)
        })?;

        let freight_discount_money = if check_order.order.freight_discount_money.is_empty() {
            "0.00".to_string()
        } else {
            check_order.order.freight_discount_money.clone()
        };

        let payment_order = json!({
            "reserved_time_start": reserve_time.start_timestamp,
            "reserved_time_end": reserve_time.end_timestamp,
            "price": check_order.order.total_money,
            "freight_discount_money": freight_discount_money,
            "freight_money": check_order.order.freight_money,
            "order_freight": freight.freight.freight_real_money,
            "parent_order_sign": cart.parent_order_info.parent_order_sign,
            "product_type": 1,
            "address_id": address.id,
            "form_id": Uuid::new_v4().simple().to_string(),
            "receipt_without_sku": null,
            "pay_type": pay_type,
            "user_ticket_id": check_order.order.default_coupon.id,
            "vip_money": "",
            "vip_buy_user_ticket_id": "",
            "coupons_money": "",
            "coupons_id": "",
        });

        let mut package = to_json_value(product_list)?;
        package["reserved_time_start"] = json!(reserve_time.start_timestamp);
        package["reserved_time_end"] = json!(reserve_time.end_timestamp);
        package["eta_trace_id"] = json!("");
        package["soon_arrival"] = json!("");
        package["first_selected_big_time"] = json!(0);
        package["receipt_without_sku"] = json!(0);

        let package_order = json!({
            "payment_order": payment_order,
            "packages": [package],
        });

        let call = Call::post(OP_ADD_NEW_ORDER, self.endpoints.mall("order/addNewOrder")?)
            .authenticated()
            .field("showMsg", "false")
            .field("showData", "true")
            .field("ab_config", r#"{"key_onion": "C"}"#)
            .field("package_order", package_order.to_string());
        self.pipeline.execute(&self.session, call).await
    }
}
