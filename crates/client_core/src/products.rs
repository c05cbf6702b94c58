use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::{Product, ProductDraft, ProductId, ProductPatch},
    error::ApiError,
    protocol::{ProductPage, ProductQuery},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::ApiClient;

/// CRUD surface of the remote product collection. The controller only ever
/// talks to this seam, so tests can script it.
#[async_trait]
pub trait ProductsApi: Send + Sync {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ApiError>;
    async fn get(&self, id: &ProductId) -> Result<Product, ApiError>;
    async fn create(&self, draft: &ProductDraft) -> Result<Product, ApiError>;
    async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<Product, ApiError>;
    async fn delete(&self, id: &ProductId) -> Result<(), ApiError>;
}

/// [`ProductsApi`] over the REST contract, routed through the session
/// client so every call carries credentials and the refresh-retry cycle.
pub struct ProductsService {
    api: Arc<ApiClient>,
}

impl ProductsService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProductsApi for ProductsService {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        self.api.get_with_query("/products", query).await
    }

    async fn get(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.api.get(&format!("/products/{id}")).await
    }

    async fn create(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
        self.api.post("/products", draft).await
    }

    async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<Product, ApiError> {
        self.api.put(&format!("/products/{id}"), patch).await
    }

    async fn delete(&self, id: &ProductId) -> Result<(), ApiError> {
        self.api.delete(&format!("/products/{id}")).await
    }
}

/// The last confirmed page of the collection as shown to the user.
/// Replaced wholesale on every successful load, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductsSnapshot {
    pub items: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl Default for ProductsSnapshot {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            total_pages: 0,
        }
    }
}

struct ControllerState {
    snapshot: ProductsSnapshot,
    query: ProductQuery,
    loading: bool,
    last_error: Option<ApiError>,
}

/// Client-visible state of the remote paginated collection: list, mutate,
/// re-sync. Mutations that change the collection's composition trigger
/// exactly one reload using the query state in effect at that moment.
pub struct ProductsController {
    api: Arc<dyn ProductsApi>,
    state: Mutex<ControllerState>,
    // monotonic load sequence; only the most recent outstanding load may
    // apply its result
    load_seq: AtomicU64,
}

impl ProductsController {
    pub fn new(api: Arc<dyn ProductsApi>) -> Self {
        Self::with_query(api, ProductQuery::default())
    }

    pub fn with_query(api: Arc<dyn ProductsApi>, query: ProductQuery) -> Self {
        Self {
            api,
            state: Mutex::new(ControllerState {
                snapshot: ProductsSnapshot::default(),
                query,
                loading: false,
                last_error: None,
            }),
            load_seq: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> ProductsSnapshot {
        self.state.lock().await.snapshot.clone()
    }

    pub async fn query(&self) -> ProductQuery {
        self.state.lock().await.query.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn last_error(&self) -> Option<ApiError> {
        self.state.lock().await.last_error.clone()
    }

    /// Loads the collection. With `params` omitted the last-used query is
    /// re-issued (refresh). The snapshot is replaced wholesale on success;
    /// the error is recorded (and returned) on failure; the loading flag is
    /// cleared either way. A load superseded by a newer one discards its
    /// result entirely and reports `Ok(())`.
    pub async fn load(&self, params: Option<ProductQuery>) -> Result<(), ApiError> {
        let seq = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.last_error = None;
            if let Some(params) = params {
                state.query = params;
            }
            state.query.clone()
        };

        let result = self.api.list(&query).await;

        let mut state = self.state.lock().await;
        if self.load_seq.load(Ordering::SeqCst) != seq {
            return Ok(());
        }
        state.loading = false;
        match result {
            Ok(page) => {
                state.snapshot = ProductsSnapshot {
                    items: page.products,
                    total: page.total,
                    page: page.page,
                    total_pages: page.total_pages,
                };
                Ok(())
            }
            Err(err) => {
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.load(None).await
    }

    /// Submits a new product, then reloads with the query in effect at that
    /// moment so correct paging reflects the insertion. The mutation error
    /// is recorded and re-raised; a reload failure is recorded but does not
    /// fail the already-confirmed mutation.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
        self.clear_error().await;
        match self.api.create(draft).await {
            Ok(product) => {
                self.reload_after_mutation().await;
                Ok(product)
            }
            Err(err) => {
                self.record_error(err.clone()).await;
                Err(err)
            }
        }
    }

    /// Same contract as [`Self::create`] for an existing item; a missing id
    /// surfaces the server's not-found error untouched.
    pub async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<Product, ApiError> {
        self.clear_error().await;
        match self.api.update(id, patch).await {
            Ok(product) => {
                self.reload_after_mutation().await;
                Ok(product)
            }
            Err(err) => {
                self.record_error(err.clone()).await;
                Err(err)
            }
        }
    }

    /// Deletes an item. Once the server confirms, the item is removed from
    /// the local snapshot and the total decremented without a reload; if it
    /// was the only item on a page beyond the first, the previous page is
    /// loaded so the view is not stranded on an empty page. A failed delete
    /// leaves the snapshot untouched.
    pub async fn delete(&self, id: &ProductId) -> Result<(), ApiError> {
        self.clear_error().await;
        if let Err(err) = self.api.delete(id).await {
            self.record_error(err.clone()).await;
            return Err(err);
        }

        let follow_up = {
            let mut state = self.state.lock().await;
            let before = state.snapshot.items.len();
            state.snapshot.items.retain(|product| &product.id != id);
            let removed = state.snapshot.items.len() < before;
            if removed {
                state.snapshot.total = state.snapshot.total.saturating_sub(1);
            }
            if removed && state.snapshot.items.is_empty() && state.snapshot.page > 1 {
                let page = state.snapshot.page - 1;
                Some(state.query.clone().with_page(page))
            } else {
                None
            }
        };

        if let Some(query) = follow_up {
            if let Err(err) = self.load(Some(query)).await {
                warn!("reload after delete failed: {err}");
            }
        }
        Ok(())
    }

    async fn reload_after_mutation(&self) {
        // load re-reads the live query state, so concurrent query changes
        // made during the mutation are honored
        if let Err(err) = self.load(None).await {
            warn!("reload after mutation failed: {err}");
        }
    }

    async fn clear_error(&self) {
        self.state.lock().await.last_error = None;
    }

    async fn record_error(&self, err: ApiError) {
        self.state.lock().await.last_error = Some(err);
    }
}

#[cfg(test)]
#[path = "tests/products_tests.rs"]
mod tests;
