//! AV Entertainments (aventertainments.com)

use std::sync::{Arc, LazyLock};

use regex::Regex;
use url::Url;

use crate::engine::{parse_target, Engine, Extracted};
use crate::error::{Result, ScrapeError};
use crate::fetch::Fetch;
use crate::model::{Field, MovieInfo, SearchResult};
use crate::providers::MovieProvider;
use crate::rules::{Matched, Rule, RuleSet};

const MOVIE_URL: &str = "https://www.aventertainments.com/product_lists.aspx";
const SEARCH_URL: &str = "https://www.aventertainments.com/search_Products.aspx";

static PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)product_id=(\d+)").unwrap());
static JACKET_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(?:dvd\d)?([a-z\d_-]+)\.jpg").unwrap());

/// Labels of the product info rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Number,
    Actresses,
    Studio,
    Series,
    Categories,
    ReleaseDate,
    Runtime,
}

impl Label {
    /// `None` for rows we do not map; those rows are skipped.
    fn from_text(text: &str) -> Option<Self> {
        match text {
            "商品番号" => Some(Label::Number),
            "主演女優" => Some(Label::Actresses),
            "スタジオ" => Some(Label::Studio),
            "シリーズ" => Some(Label::Series),
            "カテゴリ" => Some(Label::Categories),
            "発売日" => Some(Label::ReleaseDate),
            "収録時間" => Some(Label::Runtime),
            _ => None,
        }
    }

    fn extract(self, value: &Matched<'_>) -> Vec<Extracted> {
        let single = |field| vec![Extracted::field(field, value.text())];
        let each = |field| -> Vec<Extracted> {
            value
                .texts()
                .into_iter()
                .map(|text| Extracted::field(field, text))
                .collect()
        };

        match self {
            Label::Number => single(Field::Number),
            Label::Actresses => each(Field::Actors),
            Label::Studio => single(Field::Maker),
            Label::Series => single(Field::Series),
            Label::Categories => each(Field::Tags),
            Label::ReleaseDate => single(Field::ReleaseDate),
            Label::Runtime => single(Field::Runtime),
        }
    }
}

pub struct Ave {
    engine: Engine,
    search_rules: RuleSet<SearchResult>,
}

impl Ave {
    pub const NAME: &'static str = "AVE";
    pub const PRIORITY: i32 = 998;

    pub fn new(fetcher: Arc<dyn Fetch>) -> Result<Self> {
        Ok(Self {
            engine: Engine::new(Self::NAME, fetcher, movie_rules()?),
            search_rules: search_rules()?,
        })
    }

    pub fn movie_url(id: &str) -> Result<Url> {
        Url::parse_with_params(
            MOVIE_URL,
            &[("product_id", id), ("languageID", "2"), ("dept_id", "29")],
        )
        .map_err(|e| ScrapeError::InvalidIdentifier(format!("{}: {}", id, e)))
    }
}

fn parse_id(s: &str) -> Option<String> {
    PRODUCT_ID.captures(s).map(|caps| caps[1].to_string())
}

/// Product number encoded in a jacket image path
fn parse_number(s: &str) -> Option<String> {
    JACKET_NUMBER.captures(s).map(|caps| caps[1].to_uppercase())
}

fn movie_rules() -> Result<RuleSet<Extracted>> {
    Ok(RuleSet::new(vec![
        Rule::new("#MyBody .section-title h3", |m| {
            vec![Extracted::field(Field::Title, m.text())]
        })?,
        Rule::new("#MyBody .product-description.mt-20", |m| {
            let summary = m.own_text().unwrap_or_else(|| m.text());
            vec![Extracted::field(Field::Summary, summary)]
        })?,
        Rule::new("#PlayerCover > img", |m| {
            let Some(cover) = m.attr("src").and_then(|src| m.absolute_url(src)) else {
                return vec![];
            };
            let thumb = cover.replace("bigcover", "jacket_images");
            vec![
                Extracted::field(Field::CoverUrl, cover),
                Extracted::field(Field::ThumbUrl, thumb),
            ]
        })?,
        Rule::new("#sscontainerppv123 > img", |m| {
            m.attr("src")
                .and_then(|src| m.absolute_url(src))
                .map(|url| Extracted::field(Field::PreviewImages, url))
                .into_iter()
                .collect()
        })?,
        Rule::new("#player1 > source", |m| {
            m.attr("src")
                .and_then(|src| m.absolute_url(src))
                .map(|url| Extracted::field(Field::PreviewVideoUrl, url))
                .into_iter()
                .collect()
        })?,
        Rule::new("#MyBody .product-info-block-rev.mt-20 > .single-info", |m| {
            let spans = m.child_elements("span");
            let (Some(label), Some(value)) = (spans.first(), spans.get(1)) else {
                return vec![];
            };
            match Label::from_text(&label.text()) {
                Some(label) => label.extract(value),
                None => vec![],
            }
        })?,
    ]))
}

fn search_rules() -> Result<RuleSet<SearchResult>> {
    Ok(RuleSet::new(vec![Rule::new(
        "div.single-slider-product.grid-view-product",
        |m| {
            let Some(href) = m.child_attr("a[href]", "href") else {
                return vec![];
            };
            let thumb = m.child_attr("a img", "src").unwrap_or_default();
            let cover = thumb.replace("jacket_images", "bigcover");

            vec![SearchResult {
                id: parse_id(&href).unwrap_or_default(),
                number: parse_number(&thumb).unwrap_or_default(),
                title: m.child_text("p.product-title a").unwrap_or_default(),
                provider: Ave::NAME.to_string(),
                homepage: m.absolute_url(&href).unwrap_or_default(),
                thumb_url: m.absolute_url(&thumb).unwrap_or_default(),
                cover_url: m.absolute_url(&cover).unwrap_or_default(),
            }]
        },
    )?]))
}

impl MovieProvider for Ave {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn normalize_id(&self, id: &str) -> String {
        id.trim().to_uppercase()
    }

    fn get_by_id(&self, id: &str) -> Result<MovieInfo> {
        let url = Self::movie_url(&self.normalize_id(id))?;
        self.get_by_url(url.as_str())
    }

    fn get_by_url(&self, url: &str) -> Result<MovieInfo> {
        let homepage = parse_target(url)?;
        let id = parse_id(homepage.as_str())
            .ok_or_else(|| ScrapeError::InvalidIdentifier(url.to_string()))?;

        let info = MovieInfo::new(Self::NAME, id, homepage.as_str());
        self.engine.extract(&homepage, info)
    }

    fn supports_search(&self) -> bool {
        true
    }

    fn tidy_keyword(&self, keyword: &str) -> String {
        keyword.trim().to_uppercase()
    }

    fn search(&self, keyword: &str) -> Result<Vec<SearchResult>> {
        let keyword = self.tidy_keyword(keyword);
        let url = Url::parse_with_params(
            SEARCH_URL,
            &[
                ("languageID", "2"),
                ("dept_id", "29"),
                ("keyword", keyword.as_str()),
                ("searchby", "keyword"),
            ],
        )
        .map_err(|e| ScrapeError::InvalidIdentifier(format!("{}: {}", keyword, e)))?;

        self.engine.collect(&url, &self.search_rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use chrono::NaiveDate;

    const HOME: &str =
        "https://www.aventertainments.com/product_lists.aspx?product_id=12345&languageID=2&dept_id=29";

    const MOVIE_HTML: &str = r#"
    <html>
    <body id="MyBody">
        <div class="section-title"><h3>  Example Title  </h3></div>
        <div class="product-description mt-20">
            A quiet afternoon by the sea.
            <br>
            <a href="/more">more</a>
        </div>
        <div id="PlayerCover"><img src="/vodimages/bigcover/cwpbd-123.jpg"></div>
        <div id="sscontainerppv123"><img src="https://imgs.aventertainments.com/vodimages/screenshot/large/cwpbd-123.jpg"></div>
        <video id="player1"><source src="https://ppvclips.aventertainments.com/cwpbd-123.mp4" type="video/mp4"></video>
        <div class="product-info-block-rev mt-20">
            <div class="single-info"><span class="title">商品番号</span><span class="value"> CWPBD-123 </span></div>
            <div class="single-info"><span class="title">主演女優</span><span class="value"><a>Aoi</a>, <a>Sora</a></span></div>
            <div class="single-info"><span class="title">スタジオ</span><span class="value"><a>Catwalk</a></span></div>
            <div class="single-info"><span class="title">シリーズ</span><span class="value"><a>Poison</a></span></div>
            <div class="single-info"><span class="title">カテゴリ</span><span class="value"><a>Drama</a> <a>HD</a></span></div>
            <div class="single-info"><span class="title">発売日</span><span class="value">2023/02/14 (DVD)</span></div>
            <div class="single-info"><span class="title">収録時間</span><span class="value">Apx. 120 Min.</span></div>
            <div class="single-info"><span class="title">評価</span><span class="value">4.5</span></div>
        </div>
    </body>
    </html>
    "#;

    const SEARCH_HTML: &str = r#"
    <html>
    <body>
        <div class="single-slider-product grid-view-product">
            <div class="single-slider-product__image">
                <a href="/product_lists.aspx?product_id=12345&amp;languageID=2&amp;dept_id=29">
                    <img src="https://imgs.aventertainments.com/new/jacket_images/dvd1cwpbd-123.jpg">
                </a>
            </div>
            <div class="single-slider-product__content">
                <p class="product-title"><a href="/x">Example Title</a></p>
            </div>
        </div>
        <div class="single-slider-product grid-view-product">
            <div><a href="/product_lists.aspx?product_id=678&amp;languageID=2"><img src="/jacket_images/laf-56.jpg"></a></div>
            <div><p class="product-title"><a>Second</a></p></div>
        </div>
    </body>
    </html>
    "#;

    fn provider(fetcher: &MemoryFetcher) -> Ave {
        Ave::new(Arc::new(fetcher.clone())).unwrap()
    }

    #[test]
    fn test_get_by_url() {
        let fetcher = MemoryFetcher::new().with_page(HOME, MOVIE_HTML);
        let info = provider(&fetcher).get_by_url(HOME).unwrap();

        assert_eq!(info.provider, "AVE");
        assert_eq!(info.id, "12345");
        assert_eq!(info.homepage, HOME);
        assert_eq!(info.title, "Example Title");
        assert_eq!(info.summary, "A quiet afternoon by the sea.");
        assert_eq!(
            info.cover_url.as_deref(),
            Some("https://www.aventertainments.com/vodimages/bigcover/cwpbd-123.jpg")
        );
        assert_eq!(
            info.thumb_url.as_deref(),
            Some("https://www.aventertainments.com/vodimages/jacket_images/cwpbd-123.jpg")
        );
        assert_eq!(info.preview_images.len(), 1);
        assert_eq!(
            info.preview_video_url.as_deref(),
            Some("https://ppvclips.aventertainments.com/cwpbd-123.mp4")
        );
        assert_eq!(info.number, "CWPBD-123");
        assert_eq!(info.actors, vec!["Aoi", "Sora"]);
        assert_eq!(info.maker.as_deref(), Some("Catwalk"));
        assert_eq!(info.series.as_deref(), Some("Poison"));
        assert_eq!(info.tags, vec!["Drama", "HD"]);
        assert_eq!(info.release_date, NaiveDate::from_ymd_opt(2023, 2, 14));
        assert_eq!(info.runtime_minutes, Some(120));
        // unmapped label
        assert_eq!(info.score, None);
    }

    #[test]
    fn test_get_by_id_matches_get_by_url() {
        let fetcher = MemoryFetcher::new().with_page(HOME, MOVIE_HTML);
        let ave = provider(&fetcher);

        let by_id = serde_json::to_string(&ave.get_by_id("12345").unwrap()).unwrap();
        let by_url = serde_json::to_string(&ave.get_by_url(HOME).unwrap()).unwrap();
        assert_eq!(by_id, by_url);
    }

    #[test]
    fn test_invalid_url_never_fetches() {
        let fetcher = MemoryFetcher::new();
        let ave = provider(&fetcher);

        for url in ["not a url", "https://www.aventertainments.com/ppv/new_detail?pro=1"] {
            let err = ave.get_by_url(url).unwrap_err();
            assert!(matches!(err, ScrapeError::InvalidIdentifier(_)));
        }
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn test_missing_page_is_fetch_error() {
        let fetcher = MemoryFetcher::new().with_status(HOME, 503);
        let err = provider(&fetcher).get_by_id("12345").unwrap_err();
        assert!(matches!(err, ScrapeError::Fetch { .. }));
    }

    #[test]
    fn test_keyword_normalization() {
        let ave = provider(&MemoryFetcher::new());
        assert_eq!(ave.tidy_keyword("abc-123"), ave.tidy_keyword("ABC-123"));
        let once = ave.tidy_keyword(" abc-123 ");
        assert_eq!(ave.tidy_keyword(&once), once);
        assert_eq!(ave.normalize_id(&ave.normalize_id("cwpbd-123")), "CWPBD-123");
    }

    #[test]
    fn test_search() {
        let search_url = "https://www.aventertainments.com/search_Products.aspx?languageID=2&dept_id=29&keyword=CWPBD-123&searchby=keyword";
        let fetcher = MemoryFetcher::new().with_page(search_url, SEARCH_HTML);
        let ave = provider(&fetcher);
        assert!(ave.supports_search());

        let results = ave.search("cwpbd-123").unwrap();
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.id, "12345");
        assert_eq!(first.number, "CWPBD-123");
        assert_eq!(first.title, "Example Title");
        assert_eq!(first.provider, "AVE");
        assert_eq!(first.homepage, HOME);
        assert_eq!(
            first.cover_url,
            "https://imgs.aventertainments.com/new/bigcover/dvd1cwpbd-123.jpg"
        );

        assert_eq!(results[1].id, "678");
        assert_eq!(results[1].number, "LAF-56");
        assert_eq!(
            results[1].thumb_url,
            "https://www.aventertainments.com/jacket_images/laf-56.jpg"
        );
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("/jacket_images/dvd1cwpbd-123.jpg").as_deref(), Some("CWPBD-123"));
        assert_eq!(parse_number("/jacket_images/sky_301.JPG").as_deref(), Some("SKY_301"));
        assert_eq!(parse_number("/jacket_images/none.png"), None);
    }
}
