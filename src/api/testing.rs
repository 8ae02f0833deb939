//! Network-free doubles for exercising the session client and workflow.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::api::{
    error::{ApiError, ApiErrorKind},
    payloads::{Address, Location, StationInfo},
    transport::{HttpRequest, HttpResponse, Transport},
};

type Reply = Result<HttpResponse, ApiError>;

/// Replies keyed by a URL fragment. Queued replies are consumed in order and
/// the last one for a route keeps answering.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<(String, VecDeque<Reply>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, fragment: &str, reply: Reply) -> Self {
        {
            let mut routes = lock(&self.routes);
            match routes.iter_mut().find(|(key, _)| key == fragment) {
                Some((_, queue)) => queue.push_back(reply),
                None => routes.push((fragment.to_string(), VecDeque::from([reply]))),
            }
        }
        self
    }

    pub fn respond_ok(self, fragment: &str, data: Value) -> Self {
        self.respond(fragment, Ok(ok_envelope(data)))
    }

    pub fn respond_failure(self, fragment: &str, code: i64, message: &str) -> Self {
        self.respond(fragment, Ok(failed_envelope(code, message)))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|request| request.url.contains(fragment))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.clone();
        lock(&self.requests).push(request);

        let mut routes = lock(&self.routes);
        let Some((_, queue)) = routes.iter_mut().find(|(key, _)| url.contains(key.as_str()))
        else {
            return Err(ApiError::new(
                ApiErrorKind::Transport,
                format!("no scripted reply for {}", url),
            )
            .with_retryable(false));
        };

        if queue.len() > 1 {
            if let Some(reply) = queue.pop_front() {
                return reply;
            }
        }
        queue.front().cloned().unwrap_or_else(|| {
            Err(ApiError::new(ApiErrorKind::Transport, "scripted route is empty")
                .with_retryable(false))
        })
    }
}

pub fn ok_envelope(data: Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: json!({"success": true, "code": 0, "message": "", "data": data}).to_string(),
    }
}

pub fn failed_envelope(code: i64, message: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: json!({"success": false, "code": code, "message": message, "data": null})
            .to_string(),
    }
}

pub fn sample_address() -> Address {
    Address {
        id: "addr-1".to_string(),
        station_info: StationInfo {
            id: "station-1".to_string(),
            city_number: "0101".to_string(),
            name: "Pudong".to_string(),
        },
        location: Location {
            location: [121.5, 31.25],
            address: "Century Avenue".to_string(),
        },
        is_default: true,
        user_name: "tester".to_string(),
        addr_detail: "Room 1".to_string(),
    }
}

pub fn user_detail_data(uid: &str) -> Value {
    json!({"user_info": {"id": uid, "name": "tester", "mobile": "138****0000"}})
}

pub fn user_address_data() -> Value {
    json!({
        "valid_address": [{
            "id": "addr-1",
            "station_info": {"id": "station-1", "city_number": "0101", "name": "Pudong"},
            "location": {"location": [121.5, 31.25], "address": "Century Avenue"},
            "is_default": true,
            "user_name": "tester",
            "addr_detail": "Room 1"
        }]
    })
}

pub fn cart_data(checked: bool) -> Value {
    json!({
        "product": {
            "effective": [{
                "products": [{
                    "id": "p-1",
                    "cart_id": "c-1",
                    "is_check": if checked { 1 } else { 0 },
                    "product_name": "eggs"
                }]
            }]
        },
        "new_order_product_list": [{
            "products": [{
                "id": "p-1",
                "price": "9.90",
                "total_price": "19.80",
                "total_origin_price": "21.00",
                "count": 2
            }],
            "total_money": "19.80",
            "total_origin_money": "21.00",
            "package_id": 1
        }],
        "parent_order_info": {"parent_order_sign": "sign-1"}
    })
}

pub fn reserve_time_data(available: bool) -> Value {
    json!([{
        "time": [{
            "date_str": "tomorrow",
            "times": [
                {"start_timestamp": 1650000000, "end_timestamp": 1650003600, "disableType": 1, "select_msg": "full"},
                {"start_timestamp": 1650003600, "end_timestamp": 1650007200, "disableType": if available { 0 } else { 1 }, "select_msg": "06:30-07:00"}
            ]
        }]
    }])
}

pub fn check_order_data() -> Value {
    json!({
        "order": {
            "total_money": "19.80",
            "freight_discount_money": "",
            "freight_money": "5.00",
            "freights": [{"freight": {"freight_real_money": "5.00"}}],
            "default_coupon": {"id": "coupon-1"}
        }
    })
}
