use std::path::Path;

use crate::app::{AppContext, Result};
use crate::domain::{CatalogRecord, RunSummary, SkinType};
use crate::pipeline::AbortSignal;
use crate::store::{CatalogQuery, CatalogStore, QueryFilter, TextField, TextMatch, WriteMode};

pub struct CrawlOptions {
    pub url: Option<String>,
    pub mode: Option<WriteMode>,
    pub concurrency: Option<usize>,
    pub json: bool,
}

pub async fn crawl(ctx: &AppContext, options: CrawlOptions, abort: AbortSignal) -> Result<RunSummary> {
    let url = options
        .url
        .unwrap_or_else(|| ctx.config.scraper.target_url.clone());
    let mode = options.mode.unwrap_or(ctx.config.catalog.mode);

    let mut pipeline = ctx.pipeline(mode)?.with_abort(abort);
    if let Some(n) = options.concurrency {
        pipeline = pipeline.with_concurrency(n);
    }

    if !options.json {
        println!("Crawling {} ({})...", url, mode);
    }

    let summary = pipeline.run(&url).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(summary)
}

pub fn list_records(ctx: &AppContext, skin_type: Option<SkinType>) -> Result<()> {
    let records: Vec<CatalogRecord> = ctx
        .store
        .all_records()?
        .into_iter()
        .filter(|r| skin_type.map_or(true, |t| r.skin_type == t))
        .collect();

    if records.is_empty() {
        println!("No products");
        return Ok(());
    }

    for record in &records {
        println!("{}", format_record(record, ctx.images.dir()));
    }
    println!("{} products", records.len());

    Ok(())
}

pub fn query_records(ctx: &AppContext, query: &CatalogQuery) -> Result<()> {
    let records = ctx.store.find_by_skin_type(query)?;

    if records.is_empty() {
        println!("No matching products for {} skin", query.skin_type);
        return Ok(());
    }

    for record in &records {
        println!("{}", format_record(record, ctx.images.dir()));
    }

    Ok(())
}

/// Translate command-line filters into a catalog query. Price ceiling and
/// text matches are OR-combined, as the recommendation layer does.
pub fn build_query(
    skin_type: SkinType,
    max_price: Option<i64>,
    benefit: Option<String>,
    name: Option<String>,
    limit: usize,
) -> CatalogQuery {
    let mut query = CatalogQuery::new(skin_type).with_limit(limit);

    if let Some(max) = max_price {
        query = query.with_filter(QueryFilter::MaxPrice(max));
    }

    let matches: Vec<TextMatch> = [(TextField::Benefit, benefit), (TextField::Name, name)]
        .into_iter()
        .filter_map(|(field, pattern)| pattern.map(|p| TextMatch::new(field, p)))
        .collect();
    if !matches.is_empty() {
        query = query.with_filter(QueryFilter::TextMatch(matches));
    }

    query
}

fn format_record(record: &CatalogRecord, image_dir: &Path) -> String {
    let mut line = format!(
        "{} [{}] {}원\n  {} · {} · ★{:.1}",
        record.name,
        record.display_brand(),
        record.price,
        record.skin_type,
        record.benefit,
        record.rating
    );
    if let Some(path) = record.image_path(image_dir) {
        line.push_str(&format!("\n  {}", path.display()));
    }
    line
}
