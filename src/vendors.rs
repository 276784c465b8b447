// 🏪 Vendor Catalogs - Order number → product name
// One implementation per supplier, looked up by name through a registry

use crate::config::VendorSettings;
use crate::error::{LookupError, Result};
use regex::Regex;
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

// ============================================================================
// CORE TYPES
// ============================================================================

/// VendorItem - What a vendor catalog tells us about an order number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorItem {
    pub vendor: String,
    pub order_no: String,

    /// Product name as displayed by the vendor
    pub name: String,
}

impl VendorItem {
    pub fn new(vendor: &str, order_no: &str, name: impl Into<String>) -> Self {
        VendorItem {
            vendor: vendor.to_string(),
            order_no: order_no.to_string(),
            name: name.into(),
        }
    }
}

impl fmt::Display for VendorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}: {}>", self.vendor, self.order_no, self.name)
    }
}

/// Vendor - a supplier's public catalog
///
/// Every call goes to the network; nothing is cached between lookups.
#[cfg_attr(test, mockall::automock)]
pub trait Vendor {
    fn lookup(&self, order_no: &str) -> std::result::Result<VendorItem, LookupError>;
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Vendor name → implementation. Built once at startup and passed around.
#[derive(Default)]
pub struct VendorRegistry {
    vendors: BTreeMap<String, Box<dyn Vendor>>,
}

impl VendorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        VendorRegistry {
            vendors: BTreeMap::new(),
        }
    }

    /// Registry with every supported vendor, sharing one HTTP client
    pub fn with_defaults(settings: &VendorSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("partsy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut registry = VendorRegistry::new();
        registry.register(ReicheltVendor::NAME, ReicheltVendor::new(client.clone()));
        registry.register(FarnellVendor::NAME, FarnellVendor::new(client, settings));
        Ok(registry)
    }

    pub fn register<V: Vendor + 'static>(&mut self, name: &str, vendor: V) {
        self.vendors.insert(name.to_string(), Box::new(vendor));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Vendor> {
        self.vendors.get(name).map(|v| v.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vendors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.vendors.keys().map(String::as_str).collect()
    }

    /// Look up through the named vendor
    pub fn lookup(&self, vendor: &str, order_no: &str) -> std::result::Result<VendorItem, LookupError> {
        let implementation = self
            .get(vendor)
            .ok_or_else(|| LookupError::new(vendor, order_no, "unknown vendor"))?;

        info!(vendor, order_no, "Looking up order number");
        let vitem = implementation.lookup(order_no)?;
        debug!(vendor, order_no, name = %vitem.name, "Vendor lookup succeeded");
        Ok(vitem)
    }
}

// ============================================================================
// REICHELT (HTML scraping)
// ============================================================================

const REICHELT_SEARCH_URL: &str = "https://www.reichelt.de/index.html?ACTION=446&LA=446";
const REICHELT_ARTICLE_URL: &str = "https://www.reichelt.de/?ARTICLE=";

/// reichelt.de has no API. The search page is scanned for the first article
/// reference, then the article page for its product name.
pub struct ReicheltVendor {
    client: Client,
}

impl ReicheltVendor {
    pub const NAME: &'static str = "reichelt";

    pub fn new(client: Client) -> Self {
        ReicheltVendor { client }
    }

    fn fetch(&self, order_no: &str) -> std::result::Result<String, String> {
        let search = self
            .client
            .post(REICHELT_SEARCH_URL)
            .form(&[("SEARCH", order_no)])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| e.to_string())?;

        let article_id = find_article_id(&search).ok_or("no article found for search")?;
        debug!(order_no, article_id = %article_id, "Found reichelt article");

        let url = format!("{}{}", REICHELT_ARTICLE_URL, urlencoding::encode(&article_id));
        let page = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| e.to_string())?;

        find_product_name(&page).ok_or_else(|| "article page has no product name".to_string())
    }
}

impl Vendor for ReicheltVendor {
    fn lookup(&self, order_no: &str) -> std::result::Result<VendorItem, LookupError> {
        let name = self
            .fetch(order_no)
            .map_err(|cause| LookupError::new(Self::NAME, order_no, cause))?;
        Ok(VendorItem::new(Self::NAME, order_no, name))
    }
}

static ARTICLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ARTICLE=([A-Z0-9_-]+)").expect("article id pattern is valid"));

static PRODUCT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span itemprop="name">(.*?)</span>"#).expect("product name pattern is valid")
});

/// First `ARTICLE=<id>` reference on a search result page
pub fn find_article_id(html: &str) -> Option<String> {
    ARTICLE_ID.captures(html).map(|c| c[1].to_string())
}

/// Content of the first `<span itemprop="name">` on an article page
pub fn find_product_name(html: &str) -> Option<String> {
    let raw = PRODUCT_NAME.captures(html)?.get(1)?.as_str();
    let name = unescape_html(raw.trim());
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Decode the character references reichelt uses in product names
fn unescape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

// ============================================================================
// FARNELL (element14 JSON API)
// ============================================================================

const FARNELL_API_URL: &str = "https://api.element14.com/catalog/products";

/// Farnell lookups go through the element14 product search API, which needs
/// an API key.
pub struct FarnellVendor {
    client: Client,
    api_key: Option<String>,
    store: String,
}

impl FarnellVendor {
    pub const NAME: &'static str = "farnell";

    pub fn new(client: Client, settings: &VendorSettings) -> Self {
        FarnellVendor {
            client,
            api_key: settings.farnell_api_key.clone(),
            store: settings.farnell_store.clone(),
        }
    }

    fn request_url(&self, order_no: &str, api_key: &str) -> String {
        format!(
            "{}?term={}&storeInfo.id={}&resultsSettings.offset=0&resultsSettings.numberOfResults=1\
             &resultsSettings.responseGroup=small&callInfo.responseDataFormat=json&callInfo.apiKey={}",
            FARNELL_API_URL,
            urlencoding::encode(&format!("id:{}", order_no)),
            urlencoding::encode(&self.store),
            urlencoding::encode(api_key),
        )
    }

    fn fetch(&self, order_no: &str) -> std::result::Result<String, String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or("no API key configured (set FARNELL_API_KEY)")?;

        let body: Value = self
            .client
            .get(self.request_url(order_no, api_key))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| e.to_string())?;

        parse_product_response(&body)
    }
}

impl Vendor for FarnellVendor {
    fn lookup(&self, order_no: &str) -> std::result::Result<VendorItem, LookupError> {
        let name = self
            .fetch(order_no)
            .map_err(|cause| LookupError::new(Self::NAME, order_no, cause))?;
        Ok(VendorItem::new(Self::NAME, order_no, name))
    }
}

/// Display name of the first product in a part-number search response
pub fn parse_product_response(body: &Value) -> std::result::Result<String, String> {
    let result = body
        .get("premierFarnellPartNumberReturn")
        .ok_or("response has no part number result")?;

    let products = result
        .get("products")
        .and_then(Value::as_array)
        .filter(|p| !p.is_empty())
        .ok_or("no product found")?;

    products[0]
        .get("displayName")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| "product has no display name".to_string())
}

// ============================================================================
// TESTS
// ============================================================================
