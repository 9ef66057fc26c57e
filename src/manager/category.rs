//! Cache Categories
//!
//! Each category is a marker type fixing its own value type, so one manager
//! can route to engines of different value types without a shared dynamic
//! representation.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::cache::{size, LruCache, SizeCalculator, SizeEstimate};
use crate::config::CategoryConfig;
use crate::error::CacheError;
use crate::models::{ContentBlob, FileMetadata, FolderListing, SearchResults, ThumbnailImage};

// == Cache Kind ==
/// Runtime identifier of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Metadata,
    Thumbnail,
    Content,
    Listing,
    Search,
}

impl CacheKind {
    pub const ALL: [CacheKind; 5] = [
        CacheKind::Metadata,
        CacheKind::Thumbnail,
        CacheKind::Content,
        CacheKind::Listing,
        CacheKind::Search,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Metadata => "metadata",
            CacheKind::Thumbnail => "thumbnail",
            CacheKind::Content => "content",
            CacheKind::Listing => "listing",
            CacheKind::Search => "search",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CacheError::UnknownCategory(s.to_string()))
    }
}

// == Category ==
/// Binds a category marker to its runtime kind and value type.
pub trait Category: Send + Sync + 'static {
    const KIND: CacheKind;

    type Value: Clone + Send + Sync + Serialize + DeserializeOwned + SizeEstimate + 'static;

    #[doc(hidden)]
    fn slot(slots: &Slots) -> &CategorySlot<Self::Value>;

    #[doc(hidden)]
    fn slot_mut(slots: &mut Slots) -> &mut CategorySlot<Self::Value>;
}

macro_rules! category {
    ($marker:ident, $kind:ident, $value:ty, $field:ident) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $marker;

        impl Category for $marker {
            const KIND: CacheKind = CacheKind::$kind;
            type Value = $value;

            fn slot(slots: &Slots) -> &CategorySlot<Self::Value> {
                &slots.$field
            }

            fn slot_mut(slots: &mut Slots) -> &mut CategorySlot<Self::Value> {
                &mut slots.$field
            }
        }
    };
}

category!(Metadata, Metadata, FileMetadata, metadata);
category!(Thumbnail, Thumbnail, ThumbnailImage, thumbnail);
category!(Content, Content, ContentBlob, content);
category!(Listing, Listing, FolderListing, listing);
category!(Search, Search, SearchResults, search);

/// Runs `$body` with `$cat` bound to the marker type of a runtime kind.
macro_rules! with_category {
    ($kind:expr, $cat:ident => $body:expr) => {
        match $kind {
            $crate::manager::CacheKind::Metadata => {
                type $cat = $crate::manager::Metadata;
                $body
            }
            $crate::manager::CacheKind::Thumbnail => {
                type $cat = $crate::manager::Thumbnail;
                $body
            }
            $crate::manager::CacheKind::Content => {
                type $cat = $crate::manager::Content;
                $body
            }
            $crate::manager::CacheKind::Listing => {
                type $cat = $crate::manager::Listing;
                $body
            }
            $crate::manager::CacheKind::Search => {
                type $cat = $crate::manager::Search;
                $body
            }
        }
    };
}
pub(crate) use with_category;

// == Category Slot ==
/// Descriptor state of one category: its configuration, its lazily built
/// engine and its size calculator.
pub struct CategorySlot<V> {
    pub(crate) sizer: SizeCalculator<String, V>,
    pub(crate) state: Mutex<SlotState<V>>,
}

pub(crate) struct SlotState<V> {
    pub(crate) config: Option<CategoryConfig>,
    pub(crate) cache: Option<LruCache<String, V>>,
}

impl<V> CategorySlot<V>
where
    V: Clone + SizeEstimate + 'static,
{
    fn new(config: Option<CategoryConfig>) -> Self {
        Self {
            sizer: size::estimated(),
            state: Mutex::new(SlotState {
                config,
                cache: None,
            }),
        }
    }
}

impl<V: Clone> SlotState<V> {
    /// Returns the engine, building it from configuration when missing.
    /// `None` when the category is not configured.
    pub(crate) fn engine(
        &mut self,
        sizer: &SizeCalculator<String, V>,
    ) -> Option<(&mut LruCache<String, V>, &CategoryConfig)> {
        let config = self.config.as_ref()?;
        let cache = self
            .cache
            .get_or_insert_with(|| LruCache::new(config.limits(), sizer.clone()));
        Some((cache, config))
    }

    /// Installs a new configuration; a live engine keeps its entries.
    pub(crate) fn reconfigure(&mut self, config: Option<CategoryConfig>) {
        match (&config, self.cache.as_mut()) {
            (Some(config), Some(cache)) => cache.reconfigure(config.limits()),
            (None, _) => self.cache = None,
            _ => {}
        }
        self.config = config;
    }
}

// == Slots ==
/// One slot per category.
pub struct Slots {
    metadata: CategorySlot<FileMetadata>,
    thumbnail: CategorySlot<ThumbnailImage>,
    content: CategorySlot<ContentBlob>,
    listing: CategorySlot<FolderListing>,
    search: CategorySlot<SearchResults>,
}

impl Slots {
    pub(crate) fn new(config: &crate::config::CacheConfig) -> Self {
        let cfg = |kind| config.category(kind).cloned();
        Self {
            metadata: CategorySlot::new(cfg(CacheKind::Metadata)),
            thumbnail: CategorySlot::new(cfg(CacheKind::Thumbnail)),
            content: CategorySlot::new(cfg(CacheKind::Content)),
            listing: CategorySlot::new(cfg(CacheKind::Listing)),
            search: CategorySlot::new(cfg(CacheKind::Search)),
        }
    }
}

/// Key under which a category entry is stored in the durable tier.
pub fn durable_key(kind: CacheKind, key: &str) -> String {
    format!("{}:{}", kind, key)
}
