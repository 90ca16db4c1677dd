use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::errors::GenericError;
use crate::routes::catalog::schemas::{
    CategoryNode, ComboPackage, VendorComboPricing, VendorDocument,
};

/// Read access to the storefront backend that owns categories, vendors and
/// combos. Behind a trait so handlers and tests can swap in a stub.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn get_category_tree(
        &self,
        category_id: &str,
    ) -> Result<Option<CategoryNode>, GenericError>;

    async fn get_vendor_document(
        &self,
        vendor_id: &str,
        preview: bool,
    ) -> Result<Option<VendorDocument>, GenericError>;

    async fn get_combos(
        &self,
        parent_category_id: &str,
        preview: bool,
    ) -> Result<Vec<ComboPackage>, GenericError>;

    async fn get_vendor_combo_pricing(
        &self,
        vendor_id: &str,
        category_id: &str,
    ) -> Result<Vec<VendorComboPricing>, GenericError>;
}

#[derive(Debug)]
pub struct CatalogBackendClient {
    http_client: Client,
    base_url: String,
    auth_token: SecretString,
}

impl CatalogBackendClient {
    pub fn new(base_url: String, auth_token: SecretString, timeout: std::time::Duration) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            base_url,
            auth_token,
        }
    }

    fn get_auth_token(&self) -> String {
        format!("Bearer {}", self.auth_token.expose_secret())
    }

    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        url: String,
    ) -> Result<Option<T>, GenericError> {
        let response = self
            .http_client
            .get(&url)
            .header("Authorization", self.get_auth_token())
            .send()
            .await
            .map_err(|err| GenericError::UnexpectedError(anyhow!("Request error: {}", err)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(GenericError::UnexpectedCustomError(format!(
                "Backend returned {} for {}",
                status, url
            )));
        }
        let parsed = response.json::<T>().await.map_err(|err| {
            GenericError::SerializationError(format!("Failed to parse response: {}", err))
        })?;
        Ok(Some(parsed))
    }

    async fn fetch_list<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>, GenericError> {
        Ok(self
            .fetch_optional::<Vec<T>>(url)
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl CatalogSource for CatalogBackendClient {
    #[tracing::instrument(skip(self))]
    async fn get_category_tree(
        &self,
        category_id: &str,
    ) -> Result<Option<CategoryNode>, GenericError> {
        let url = format!("{}/categories/{}/tree", self.base_url, category_id);
        self.fetch_optional(url).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_vendor_document(
        &self,
        vendor_id: &str,
        preview: bool,
    ) -> Result<Option<VendorDocument>, GenericError> {
        let url = if preview {
            format!("{}/dummy-vendors/{}", self.base_url, vendor_id)
        } else {
            format!("{}/vendors/{}", self.base_url, vendor_id)
        };
        self.fetch_optional(url).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_combos(
        &self,
        parent_category_id: &str,
        preview: bool,
    ) -> Result<Vec<ComboPackage>, GenericError> {
        let resource = if preview { "dummy-combos" } else { "combos" };
        let url = format!(
            "{}/{}?parentCategoryId={}",
            self.base_url, resource, parent_category_id
        );
        match self.fetch_list(url).await {
            Ok(combos) => Ok(combos),
            Err(err) => {
                // Older backend deployments only expose the byParent route.
                tracing::warn!("Combo fetch failed, trying byParent fallback: {:?}", err);
                let fallback = format!(
                    "{}/{}/byParent/{}",
                    self.base_url, resource, parent_category_id
                );
                self.fetch_list(fallback).await
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get_vendor_combo_pricing(
        &self,
        vendor_id: &str,
        category_id: &str,
    ) -> Result<Vec<VendorComboPricing>, GenericError> {
        let url = format!(
            "{}/vendor-combo-pricing/{}?categoryId={}",
            self.base_url, vendor_id, category_id
        );
        self.fetch_list(url).await
    }
}
