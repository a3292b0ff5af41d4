pub mod commands;

use clap::{Parser, Subcommand};

use crate::domain::SkinType;
use crate::store::query::DEFAULT_QUERY_LIMIT;
use crate::store::WriteMode;

#[derive(Parser)]
#[command(name = "skinshelf")]
#[command(about = "Skincare product catalog ingestion", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl the listing page into the catalog
    Crawl {
        /// Listing page to ingest (default: scraper.target_url)
        #[arg(long)]
        url: Option<String>,

        /// full-refresh or bulk-import (default: catalog.mode)
        #[arg(short, long)]
        mode: Option<WriteMode>,

        /// Concurrent image fetches (default: images.concurrency)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List catalog records
    List {
        /// Only show records of this skin type
        #[arg(short, long)]
        skin_type: Option<SkinType>,
    },
    /// Query the catalog the way the recommendation layer does
    Query {
        /// oily, dry, combination or sensitive
        #[arg(short, long)]
        skin_type: SkinType,

        /// Match records at or below this price
        #[arg(long)]
        max_price: Option<i64>,

        /// Match benefit tags containing any of these `|`-separated words
        #[arg(long)]
        benefit: Option<String>,

        /// Match names containing any of these `|`-separated words
        #[arg(long)]
        name: Option<String>,

        #[arg(short, long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: usize,
    },
}
