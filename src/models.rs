use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub category_id: Option<ObjectId>,
    #[serde(default)]
    pub subcategory_id: Option<ObjectId>,
    #[serde(default)]
    pub subsubcategory_id: Option<ObjectId>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_public_id: Option<String>,
    pub stock: i64,
    pub available: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Request to create a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 200, message = "Slug must be 1-200 characters"))]
    pub slug: String,

    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: i64,

    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub subsubcategory_id: Option<String>,

    #[validate(url(message = "Must be a valid URL"))]
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i64,

    #[serde(default = "default_true")]
    pub available: bool,
}

/// Partial update for a product; absent fields are left untouched
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Slug must be 1-200 characters"))]
    pub slug: Option<String>,

    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: Option<i64>,

    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub subsubcategory_id: Option<String>,

    #[validate(url(message = "Must be a valid URL"))]
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i64>,

    pub available: Option<bool>,
}

/// Product as returned by the API
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub subsubcategory_id: Option<String>,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub stock: i64,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: p.name,
            slug: p.slug,
            description: p.description,
            price_cents: p.price_cents,
            category_id: p.category_id.map(|id| id.to_hex()),
            subcategory_id: p.subcategory_id.map(|id| id.to_hex()),
            subsubcategory_id: p.subsubcategory_id.map(|id| id.to_hex()),
            image_url: p.image_url,
            image_public_id: p.image_public_id,
            stock: p.stock,
            available: p.available,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Category node. The same shape backs all three levels; `parent_id`
/// points one level up and is unset for top-level categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<ObjectId>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 120, message = "Slug must be 1-120 characters"))]
    pub slug: String,

    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 120, message = "Slug must be 1-120 characters"))]
    pub slug: Option<String>,

    pub parent_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        CategoryResponse {
            id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: c.name,
            slug: c.slug,
            parent_id: c.parent_id.map(|id| id.to_hex()),
            created_at: c.created_at,
        }
    }
}

/// Order lifecycle. Delivered and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Forward transitions only; cancellation is allowed until the
    /// kitchen hands the order off.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Preparing)
                | (Confirmed, Cancelled)
                | (Preparing, Delivered)
                | (Preparing, Cancelled)
        )
    }
}

/// Line item embedded in an order. Name and unit price are denormalized
/// from the product at order time so later catalog edits don't rewrite
/// order history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ObjectId,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

/// Customer order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub reference: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_cents: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderItem {
    pub product_id: String,

    #[validate(range(min = 1, max = 1000, message = "Quantity must be 1-1000"))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name must be 1-200 characters"))]
    pub customer_name: String,

    #[validate(email(message = "Must be a valid email"))]
    pub customer_email: String,

    #[validate(length(max = 40, message = "Phone number too long"))]
    pub customer_phone: Option<String>,

    #[validate(length(max = 500, message = "Address too long"))]
    pub delivery_address: Option<String>,

    #[validate(length(min = 1, message = "Order must contain at least one item"), nested)]
    pub items: Vec<CreateOrderItem>,

    #[validate(length(max = 1000, message = "Notes too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub reference: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            id: o.id.map(|id| id.to_hex()).unwrap_or_default(),
            reference: o.reference,
            customer_name: o.customer_name,
            customer_email: o.customer_email,
            customer_phone: o.customer_phone,
            delivery_address: o.delivery_address,
            items: o
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    product_id: i.product_id.to_hex(),
                    name: i.name,
                    unit_price_cents: i.unit_price_cents,
                    quantity: i.quantity,
                })
                .collect(),
            total_cents: o.total_cents,
            status: o.status,
            notes: o.notes,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

/// Registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// User as returned by the API; the password hash never leaves the store
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        UserResponse {
            id: u.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: u.name,
            email: u.email,
            is_admin: u.is_admin,
            created_at: u.created_at,
        }
    }
}

/// Promotional offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_percent: u32,
    #[serde(default)]
    pub product_id: Option<ObjectId>,
    #[serde(default)]
    pub category_id: Option<ObjectId>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub starts_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub ends_at: DateTime<Utc>,
    pub active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOfferRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 90, message = "Discount must be 1-90 percent"))]
    pub discount_percent: u32,

    pub product_id: Option<String>,
    pub category_id: Option<String>,

    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOfferRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description too long"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 90, message = "Discount must be 1-90 percent"))]
    pub discount_percent: Option<u32>,

    pub product_id: Option<String>,
    pub category_id: Option<String>,

    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,

    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: u32,
    pub product_id: Option<String>,
    pub category_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Offer> for OfferResponse {
    fn from(o: Offer) -> Self {
        OfferResponse {
            id: o.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: o.title,
            description: o.description,
            discount_percent: o.discount_percent,
            product_id: o.product_id.map(|id| id.to_hex()),
            category_id: o.category_id.map(|id| id.to_hex()),
            starts_at: o.starts_at,
            ends_at: o.ends_at,
            active: o.active,
            created_at: o.created_at,
        }
    }
}

/// Homepage banner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub image_public_id: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    pub position: i32,
    pub active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBannerRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(url(message = "Must be a valid URL"))]
    pub image_url: String,

    pub image_public_id: Option<String>,

    #[validate(url(message = "Must be a valid URL"))]
    pub link_url: Option<String>,

    #[serde(default)]
    pub position: i32,

    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBannerRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(url(message = "Must be a valid URL"))]
    pub image_url: Option<String>,

    pub image_public_id: Option<String>,

    #[validate(url(message = "Must be a valid URL"))]
    pub link_url: Option<String>,

    pub position: Option<i32>,

    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub image_public_id: Option<String>,
    pub link_url: Option<String>,
    pub position: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Banner> for BannerResponse {
    fn from(b: Banner) -> Self {
        BannerResponse {
            id: b.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: b.title,
            image_url: b.image_url,
            image_public_id: b.image_public_id,
            link_url: b.link_url,
            position: b.position,
            active: b.active,
            created_at: b.created_at,
        }
    }
}

/// Store-wide settings, kept as a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub store_name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub currency: String,
    pub delivery_fee_cents: i64,
    pub min_order_cents: i64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            id: None,
            store_name: "Savora".to_string(),
            contact_email: None,
            contact_phone: None,
            currency: "EUR".to_string(),
            delivery_fee_cents: 0,
            min_order_cents: 0,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 200, message = "Store name must be 1-200 characters"))]
    pub store_name: String,

    #[validate(email(message = "Must be a valid email"))]
    pub contact_email: Option<String>,

    #[validate(length(max = 40, message = "Phone number too long"))]
    pub contact_phone: Option<String>,

    #[validate(length(min = 3, max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,

    #[validate(range(min = 0, message = "Delivery fee cannot be negative"))]
    pub delivery_fee_cents: i64,

    #[validate(range(min = 0, message = "Minimum order cannot be negative"))]
    pub min_order_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub store_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub currency: String,
    pub delivery_fee_cents: i64,
    pub min_order_cents: i64,
}

impl From<StoreSettings> for SettingsResponse {
    fn from(s: StoreSettings) -> Self {
        SettingsResponse {
            store_name: s.store_name,
            contact_email: s.contact_email,
            contact_phone: s.contact_phone,
            currency: s.currency,
            delivery_fee_cents: s.delivery_fee_cents,
            min_order_cents: s.min_order_cents,
        }
    }
}

/// Sales summary for a reporting window
#[derive(Debug, Serialize)]
pub struct SalesReport {
    pub orders: i64,
    pub revenue_cents: i64,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Outcome of a bulk product import
#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_order_status_cancellation() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_order_status_terminal_states() {
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_order_status_no_backward_moves() {
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_order_status_serde_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
        let back: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = StoreSettings::default();
        assert_eq!(settings.store_name, "Savora");
        assert_eq!(settings.currency, "EUR");
        assert_eq!(settings.delivery_fee_cents, 0);
    }
}
