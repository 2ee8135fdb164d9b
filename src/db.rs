use crate::error::{AppError, AppResult};
use crate::models::{Banner, Category, Offer, Order, Product, StoreSettings, User};
use bson::doc;
use mongodb::{options::ClientOptions, Client, Collection};

/// Database handle with typed collections for each resource
#[derive(Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to the document store and verify the server is reachable.
    ///
    /// The driver connects lazily, so a `ping` round-trip is issued here
    /// to make startup fail fast on an unreachable database instead of
    /// surfacing the failure on the first request.
    pub async fn connect(uri: &str, db_name: &str) -> AppResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| AppError::Configuration(format!("Invalid MONGODB_URI: {}", e)))?;
        let client = Client::with_options(options)?;
        let db = client.database(db_name);

        db.run_command(doc! { "ping": 1 }).await?;

        Ok(Self { db })
    }

    /// Build a handle without the reachability check. Used by tests that
    /// exercise routing without a live database.
    pub async fn connect_lazy(uri: &str, db_name: &str) -> AppResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| AppError::Configuration(format!("Invalid MONGODB_URI: {}", e)))?;
        let client = Client::with_options(options)?;
        Ok(Self {
            db: client.database(db_name),
        })
    }

    pub fn products(&self) -> Collection<Product> {
        self.db.collection("products")
    }

    pub fn categories(&self) -> Collection<Category> {
        self.db.collection("categories")
    }

    pub fn subcategories(&self) -> Collection<Category> {
        self.db.collection("subcategories")
    }

    pub fn subsubcategories(&self) -> Collection<Category> {
        self.db.collection("subsubcategories")
    }

    pub fn orders(&self) -> Collection<Order> {
        self.db.collection("orders")
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn offers(&self) -> Collection<Offer> {
        self.db.collection("offers")
    }

    pub fn banners(&self) -> Collection<Banner> {
        self.db.collection("banners")
    }

    pub fn settings(&self) -> Collection<StoreSettings> {
        self.db.collection("settings")
    }

    /// Raw handle for aggregation pipelines
    pub fn raw(&self) -> &mongodb::Database {
        &self.db
    }
}
