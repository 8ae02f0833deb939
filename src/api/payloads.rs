use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDetail {
    pub user_info: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserAddress {
    #[serde(default)]
    pub valid_address: Vec<Address>,
}

impl UserAddress {
    /// The address flagged as default, else the first valid one.
    pub fn default_address(&self) -> Option<&Address> {
        self.valid_address
            .iter()
            .find(|address| address.is_default)
            .or_else(|| self.valid_address.first())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub id: String,
    pub station_info: StationInfo,
    pub location: Location,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub addr_detail: String,
}

impl Address {
    /// Longitude and latitude rendered the way the backend expects them.
    pub fn coordinates(&self) -> (String, String) {
        (
            self.location.location[0].to_string(),
            self.location.location[1].to_string(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationInfo {
    pub id: String,
    pub city_number: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub location: [f64; 2],
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartInfo {
    #[serde(default)]
    pub product: CartProducts,
    #[serde(default)]
    pub new_order_product_list: Vec<ProductList>,
    #[serde(default)]
    pub parent_order_info: ParentOrderInfo,
}

impl CartInfo {
    pub fn unchecked_items(&self) -> impl Iterator<Item = &CartItem> {
        self.product
            .effective
            .iter()
            .flat_map(|section| section.products.iter())
            .filter(|item| item.is_check == 0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartProducts {
    #[serde(default)]
    pub effective: Vec<CartSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartSection {
    #[serde(default)]
    pub products: Vec<CartItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: String,
    #[serde(default)]
    pub cart_id: String,
    #[serde(default)]
    pub is_check: i64,
    #[serde(default)]
    pub product_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParentOrderInfo {
    #[serde(default)]
    pub parent_order_sign: String,
}

/// One package of checked products, re-sent verbatim to checkout and order
/// submission; fields the client does not model are carried in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductList {
    #[serde(default)]
    pub products: Vec<ProductListItem>,
    #[serde(default)]
    pub total_money: String,
    #[serde(default)]
    pub total_origin_money: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductListItem {
    pub id: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub total_price: String,
    #[serde(default)]
    pub total_origin_price: String,
    #[serde(default)]
    pub total_money: String,
    #[serde(default)]
    pub total_origin_money: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MultiReserveTime(pub Vec<ReserveTimeGroup>);

impl MultiReserveTime {
    pub fn first_available(&self) -> Option<&ReserveTime> {
        self.0
            .iter()
            .flat_map(|group| group.time.iter())
            .flat_map(|day| day.times.iter())
            .find(|slot| slot.is_available())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReserveTimeGroup {
    #[serde(default)]
    pub time: Vec<ReserveDay>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReserveDay {
    #[serde(default)]
    pub date_str: String,
    #[serde(default)]
    pub times: Vec<ReserveTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReserveTime {
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    #[serde(default, rename = "disableType")]
    pub disable_type: i64,
    #[serde(default)]
    pub select_msg: String,
}

impl ReserveTime {
    pub fn is_available(&self) -> bool {
        self.disable_type == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckOrder {
    #[serde(default)]
    pub order: CheckOrderDetail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckOrderDetail {
    #[serde(default)]
    pub total_money: String,
    #[serde(default)]
    pub freight_discount_money: String,
    #[serde(default)]
    pub freight_money: String,
    #[serde(default)]
    pub freights: Vec<FreightEntry>,
    #[serde(default)]
    pub default_coupon: DefaultCoupon,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FreightEntry {
    #[serde(default)]
    pub freight: Freight,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Freight {
    #[serde(default)]
    pub freight_real_money: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DefaultCoupon {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AddNewOrder {
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub pay_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
