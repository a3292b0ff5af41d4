use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::app::{Result, SkinshelfError};
use crate::domain::{ExtractionMiss, PriceSource, RawCandidate};
use crate::scraper::ExtractorConfig;

/// One way of pulling a field out of a candidate node.
///
/// Each field has an ordered list of strategies; the first `Some` wins.
pub trait FieldStrategy<T>: Send + Sync {
    fn try_extract(&self, node: ElementRef<'_>) -> Option<T>;
}

/// A price together with the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceHit {
    pub amount: i64,
    pub source: PriceSource,
}

/// First descendant matching `selector` with non-empty trimmed text.
struct SelectorText {
    selector: Selector,
}

impl FieldStrategy<String> for SelectorText {
    fn try_extract(&self, node: ElementRef<'_>) -> Option<String> {
        node.select(&self.selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty())
    }
}

/// Longest digit run inside a dedicated price element, separators stripped.
struct PriceElement {
    selector: Selector,
    digits: Regex,
}

impl FieldStrategy<PriceHit> for PriceElement {
    fn try_extract(&self, node: ElementRef<'_>) -> Option<PriceHit> {
        node.select(&self.selector)
            .filter_map(|el| {
                let text = el.text().collect::<Vec<_>>().join(" ");
                let longest = self
                    .digits
                    .find_iter(&text)
                    .map(|m| m.as_str())
                    .fold("", |best, run| if run.len() > best.len() { run } else { best });
                parse_amount(longest)
            })
            .find(|amount| *amount > 0)
            .map(|amount| PriceHit {
                amount,
                source: PriceSource::Element,
            })
    }
}

/// Largest 3-6 digit number anywhere in the card text.
///
/// Ratings and review counts are usually smaller than the price, which is
/// the whole basis of this heuristic; it can still pick up stray numbers.
struct LargestNumber {
    numbers: Regex,
}

impl FieldStrategy<PriceHit> for LargestNumber {
    fn try_extract(&self, node: ElementRef<'_>) -> Option<PriceHit> {
        // Join text nodes with a space so numbers in adjacent elements stay apart
        let text = node.text().collect::<Vec<_>>().join(" ");
        self.numbers
            .find_iter(&text)
            .filter_map(|m| parse_amount(m.as_str()))
            .max()
            .filter(|amount| *amount > 0)
            .map(|amount| PriceHit {
                amount,
                source: PriceSource::Fallback,
            })
    }
}

/// First non-empty attribute of the card's first image.
struct ImageAttribute {
    img: Selector,
    attributes: Vec<String>,
}

impl FieldStrategy<String> for ImageAttribute {
    fn try_extract(&self, node: ElementRef<'_>) -> Option<String> {
        let img = node.select(&self.img).next()?;
        self.attributes
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            // inline data URIs are lazy-load stand-ins, not the product image
            .find(|value| !value.is_empty() && !value.starts_with("data:"))
            .map(str::to_string)
    }
}

fn parse_amount(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok()
}

fn text_strategies(selectors: &[String]) -> Result<Vec<Box<dyn FieldStrategy<String>>>> {
    let mut strategies: Vec<Box<dyn FieldStrategy<String>>> = Vec::with_capacity(selectors.len());
    for s in selectors {
        strategies.push(Box::new(SelectorText {
            selector: parse_selector(s)?,
        }));
    }
    Ok(strategies)
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|e| SkinshelfError::Config(format!("Invalid selector '{}': {:?}", raw, e)))
}

fn parse_regex(raw: &str) -> Result<Regex> {
    Regex::new(raw).map_err(|e| SkinshelfError::Config(format!("Invalid pattern '{}': {}", raw, e)))
}

/// Heuristic product-card extractor driven by [`ExtractorConfig`].
pub struct RecordExtractor {
    candidates: Selector,
    name: Vec<Box<dyn FieldStrategy<String>>>,
    brand: Vec<Box<dyn FieldStrategy<String>>>,
    price: Vec<Box<dyn FieldStrategy<PriceHit>>>,
    image: Vec<Box<dyn FieldStrategy<String>>>,
    unknown_brand: String,
}

impl RecordExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        if config.candidate_selectors.is_empty() {
            return Err(SkinshelfError::Config(
                "At least one candidate selector is required".into(),
            ));
        }

        // One combined selector so a node matching several alternatives is scanned once
        let candidates = parse_selector(&config.candidate_selectors.join(", "))?;

        let mut price: Vec<Box<dyn FieldStrategy<PriceHit>>> = Vec::new();
        for s in &config.price_selectors {
            price.push(Box::new(PriceElement {
                selector: parse_selector(s)?,
                digits: parse_regex(r"[0-9,]+")?,
            }));
        }
        if config.fallback_price {
            price.push(Box::new(LargestNumber {
                numbers: parse_regex(r"[0-9]{3,6}(?:,[0-9]{3})*")?,
            }));
        }

        let image: Vec<Box<dyn FieldStrategy<String>>> = vec![Box::new(ImageAttribute {
            img: parse_selector("img")?,
            attributes: config.image_attributes.clone(),
        })];

        Ok(Self {
            candidates,
            name: text_strategies(&config.name_selectors)?,
            brand: text_strategies(&config.brand_selectors)?,
            price,
            image,
            unknown_brand: config.unknown_brand.clone(),
        })
    }

    /// Walk every candidate node of `html` lazily, in document order.
    ///
    /// Each scanned node yields either an accepted candidate or the reason it
    /// was dropped; nothing here is an error.
    pub fn extract<'a>(
        &'a self,
        html: &'a Html,
        base: &Url,
    ) -> impl Iterator<Item = std::result::Result<RawCandidate, ExtractionMiss>> + 'a {
        let origin = Url::parse(&base.origin().ascii_serialization()).unwrap_or_else(|_| base.clone());
        html.select(&self.candidates)
            .map(move |node| self.extract_node(node, &origin))
    }

    fn extract_node(
        &self,
        node: ElementRef<'_>,
        origin: &Url,
    ) -> std::result::Result<RawCandidate, ExtractionMiss> {
        let name = first_hit(&self.name, node).ok_or(ExtractionMiss::MissingName)?;
        let brand = first_hit(&self.brand, node).unwrap_or_else(|| self.unknown_brand.clone());
        let price = first_hit(&self.price, node).ok_or(ExtractionMiss::MissingPrice)?;

        let raw_image = first_hit(&self.image, node).ok_or(ExtractionMiss::MissingImage)?;
        let image_url = if raw_image.starts_with("http") {
            raw_image
        } else {
            origin
                .join(&raw_image)
                .map(String::from)
                .map_err(|_| ExtractionMiss::MissingImage)?
        };
        if image_url.contains("placeholder") {
            return Err(ExtractionMiss::PlaceholderImage);
        }

        Ok(RawCandidate {
            name,
            brand,
            price: price.amount,
            price_source: price.source,
            image_url,
        })
    }
}

fn first_hit<T>(strategies: &[Box<dyn FieldStrategy<T>>], node: ElementRef<'_>) -> Option<T> {
    strategies.iter().find_map(|s| s.try_extract(node))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_all(body: &str) -> Vec<std::result::Result<RawCandidate, ExtractionMiss>> {
        let extractor = RecordExtractor::new(&ExtractorConfig::default()).unwrap();
        let html = Html::parse_document(&format!("<html><body>{}</body></html>", body));
        let base = Url::parse("https://shop.example.com/store/main/getBestList.do").unwrap();
        extractor.extract(&html, &base).collect()
    }

    fn single(body: &str) -> std::result::Result<RawCandidate, ExtractionMiss> {
        let mut all = extract_all(body);
        assert_eq!(all.len(), 1, "expected exactly one candidate node");
        all.remove(0)
    }

    #[test]
    fn test_price_with_thousands_separator() {
        let candidate = single(
            r#"<div class="itemCard">
                 <p class="name">수분 크림</p><p class="brand">에스트라</p>
                 <span class="price">₩12,000</span>
                 <img src="https://cdn.example.com/a.jpg">
               </div>"#,
        )
        .unwrap();
        assert_eq!(candidate.price, 12000);
        assert_eq!(candidate.price_source, PriceSource::Element);
        assert_eq!(candidate.brand, "에스트라");
    }

    #[test]
    fn test_price_element_takes_longest_digit_run() {
        let candidate = single(
            r#"<div class="itemCard">
                 <p class="name">토너</p>
                 <span class="salePrice">10% 23,500원</span>
                 <img src="https://cdn.example.com/a.jpg">
               </div>"#,
        )
        .unwrap();
        assert_eq!(candidate.price, 23500);
    }

    #[test]
    fn test_price_element_keeps_child_prices_apart() {
        let candidate = single(
            r#"<div class="itemCard">
                 <p class="name">크림</p>
                 <div class="price"><del>32,000</del><strong>23,500</strong></div>
                 <img src="https://c/a.jpg">
               </div>"#,
        )
        .unwrap();
        // Equal-length runs resolve to the first one, the list price
        assert_eq!(candidate.price, 32000);
        assert_eq!(candidate.price_source, PriceSource::Element);
    }

    #[test]
    fn test_fallback_picks_largest_number() {
        let candidate = single(
            r#"<div class="itemCard">
                 <p class="name">앰플</p>
                 <em>리뷰 999</em><em>19,800</em><em>평점 4.8</em><em>320 ml</em>
                 <img src="https://cdn.example.com/a.jpg">
               </div>"#,
        )
        .unwrap();
        assert_eq!(candidate.price, 19800);
        assert_eq!(candidate.price_source, PriceSource::Fallback);
    }

    #[test]
    fn test_fallback_used_when_price_element_has_no_digits() {
        let candidate = single(
            r#"<div class="itemCard">
                 <p class="name">앰플</p>
                 <span class="price">품절</span><em>27000</em>
                 <img src="https://cdn.example.com/a.jpg">
               </div>"#,
        )
        .unwrap();
        assert_eq!(candidate.price, 27000);
        assert_eq!(candidate.price_source, PriceSource::Fallback);
    }

    #[test]
    fn test_brand_defaults_to_unknown() {
        let candidate = single(
            r#"<div class="itemCard"><p class="name">클렌저</p>
                 <span class="price">8,000</span><img src="https://cdn.example.com/a.jpg"></div>"#,
        )
        .unwrap();
        assert_eq!(candidate.brand, "Unknown");
    }

    #[test]
    fn test_name_selectors_follow_priority() {
        let candidate = single(
            r#"<div class="itemCard">
                 <p class="itemCard_name">Later</p><p class="prd_name">Earlier</p>
                 <span class="price">8,000</span><img src="https://cdn.example.com/a.jpg">
               </div>"#,
        )
        .unwrap();
        assert_eq!(candidate.name, "Earlier");
    }

    #[test]
    fn test_empty_name_element_falls_through() {
        let candidate = single(
            r#"<div class="itemCard">
                 <p class="name">   </p><p class="prd_name">선크림</p>
                 <span class="price">8,000</span><img src="https://cdn.example.com/a.jpg">
               </div>"#,
        )
        .unwrap();
        assert_eq!(candidate.name, "선크림");
    }

    #[test]
    fn test_relative_image_rebased_on_origin() {
        let candidate = single(
            r#"<div class="itemCard"><p class="name">크림</p><span class="price">9,900</span>
                 <img src="/uploads/images/goods/a.jpg"></div>"#,
        )
        .unwrap();
        assert_eq!(candidate.image_url, "https://shop.example.com/uploads/images/goods/a.jpg");

        let candidate = single(
            r#"<div class="itemCard"><p class="name">크림</p><span class="price">9,900</span>
                 <img src="uploads/b.png"></div>"#,
        )
        .unwrap();
        assert_eq!(candidate.image_url, "https://shop.example.com/uploads/b.png");
    }

    #[test]
    fn test_lazy_image_attributes() {
        let candidate = single(
            r#"<div class="itemCard"><p class="name">크림</p><span class="price">9,900</span>
                 <img src="" data-lazy-src="https://cdn.example.com/lazy.jpg"></div>"#,
        )
        .unwrap();
        assert_eq!(candidate.image_url, "https://cdn.example.com/lazy.jpg");

        let candidate = single(
            r#"<div class="itemCard"><p class="name">크림</p><span class="price">9,900</span>
                 <img src="data:image/gif;base64,R0lGOD" data-src="https://cdn.example.com/d.jpg"></div>"#,
        )
        .unwrap();
        assert_eq!(candidate.image_url, "https://cdn.example.com/d.jpg");
    }

    #[test]
    fn test_rejections_are_reported_not_raised() {
        assert_eq!(
            single(r#"<div class="itemCard"><span class="price">9,900</span><img src="https://c/a.jpg"></div>"#),
            Err(ExtractionMiss::MissingName)
        );
        assert_eq!(
            single(r#"<div class="itemCard"><p class="name">크림</p><img src="https://c/a.jpg"></div>"#),
            Err(ExtractionMiss::MissingPrice)
        );
        assert_eq!(
            single(r#"<div class="itemCard"><p class="name">크림</p><span class="price">9,900</span></div>"#),
            Err(ExtractionMiss::MissingImage)
        );
        assert_eq!(
            single(
                r#"<div class="itemCard"><p class="name">크림</p><span class="price">9,900</span>
                     <img src="https://c/img/placeholder.png"></div>"#
            ),
            Err(ExtractionMiss::PlaceholderImage)
        );
    }

    #[test]
    fn test_every_candidate_node_is_scanned_once() {
        let all = extract_all(
            r#"<div class="itemCard product-card"><p class="name">A</p><span class="price">1,000</span>
                 <img src="https://c/a.jpg"></div>
               <div class="itemCard"><p class="name">B</p></div>
               <div class="banner">no match</div>"#,
        );
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|r| r.is_ok()).count(), 1);
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let config = ExtractorConfig {
            fallback_price: false,
            ..Default::default()
        };
        let extractor = RecordExtractor::new(&config).unwrap();
        let html = Html::parse_document(
            r#"<div class="itemCard"><p class="name">크림</p><em>15000</em><img src="https://c/a.jpg"></div>"#,
        );
        let base = Url::parse("https://shop.example.com/").unwrap();
        let results: Vec<_> = extractor.extract(&html, &base).collect();
        assert_eq!(results, vec![Err(ExtractionMiss::MissingPrice)]);
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let config = ExtractorConfig {
            name_selectors: vec!["[[nope".into()],
            ..Default::default()
        };
        assert!(matches!(
            RecordExtractor::new(&config),
            Err(SkinshelfError::Config(_))
        ));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12,000"), Some(12000));
        assert_eq!(parse_amount(","), None);
        assert_eq!(parse_amount(""), None);
    }
}
