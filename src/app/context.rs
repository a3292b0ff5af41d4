use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{Result, SkinshelfError};
use crate::config::Config;
use crate::images::{HttpImageClient, ImageResolver};
use crate::pipeline::Pipeline;
use crate::scraper::{ChromeRenderer, PageRenderer, RecordExtractor};
use crate::store::sqlite::SqliteStore;
use crate::store::WriteMode;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub images: Arc<ImageResolver>,
    pub renderer: Arc<dyn PageRenderer>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.catalog.db_path {
            Some(p) => p.clone(),
            None => Self::default_data_dir()?.join("catalog.db"),
        };

        let store = SqliteStore::new(&db_path).map_err(|e| {
            SkinshelfError::StoreUnavailable(format!("{}: {}", db_path.display(), e))
        })?;

        let image_dir = match &config.images.dir {
            Some(p) => p.clone(),
            None => Self::default_data_dir()?.join("product_images"),
        };

        Self::assemble(config, store, image_dir)
    }

    /// In-memory catalog with images cached under `image_dir`.
    pub fn in_memory(config: Config, image_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = SqliteStore::in_memory()?;
        Self::assemble(config, store, image_dir.into())
    }

    fn assemble(config: Config, store: SqliteStore, image_dir: PathBuf) -> Result<Self> {
        let client = Arc::new(HttpImageClient::new(&config.images)?);
        let images = Arc::new(ImageResolver::new(client, image_dir, config.images.clone())?);
        let renderer: Arc<dyn PageRenderer> = Arc::new(ChromeRenderer::new(config.scraper.clone()));

        Ok(Self {
            config,
            store: Arc::new(store),
            images,
            renderer,
        })
    }

    /// Build an ingestion pipeline over this context's collaborators.
    pub fn pipeline(&self, mode: WriteMode) -> Result<Pipeline> {
        let extractor = RecordExtractor::new(&self.config.extractor)?;

        Ok(Pipeline::new(
            self.renderer.clone(),
            extractor,
            self.images.clone(),
            self.store.clone(),
            mode,
        )
        .with_defaults(self.config.catalog.record_defaults()))
    }

    fn default_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| SkinshelfError::Config("Could not find data directory".into()))?;
        let skinshelf_dir = data_dir.join("skinshelf");
        std::fs::create_dir_all(&skinshelf_dir)?;
        Ok(skinshelf_dir)
    }
}
