use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl PaginationParams {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or_else(default_page).max(1),
            per_page: per_page.unwrap_or_else(default_per_page).max(1),
        }
    }

    /// Row offset for `page`, capped so it always fits a SQL `BIGINT`.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit())
            .min(i64::MAX as u64)
    }

    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, 100)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        Self {
            items,
            total,
            page: params.page,
            per_page,
            total_pages: total.div_ceil(per_page),
        }
    }
}
