// ============================================================================
// Wallpaperscraft Provider
// ============================================================================
// Base URL: https://wallpaperscraft.ru
// No API: categories and wallpapers are scraped from the HTML pages.
// Parsing is best-effort string scanning; a layout change on the site shows
// up as a Parse error, which the session turns into a retry prompt.
// ============================================================================

use std::collections::HashSet;
use std::time::Duration;

use colored::*;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::Client;
use tracing::{debug, error};

use crate::console::Console;
use crate::error::{AppError, Result};

pub const BASE_URL: &str = "https://wallpaperscraft.ru";
pub const ALL_CATEGORIES_NAME: &str = "All categories";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A gallery section. Two categories are the same category when their URLs match.
#[derive(Debug, Clone, Eq)]
pub struct Category {
    pub name: String,
    pub url: String,
}

impl Category {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Category {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

/// Source of categories and random wallpaper image URLs.
pub trait WallpaperProvider {
    fn list_categories(&self) -> Result<Vec<Category>>;

    /// Direct URL of a random image from `category`.
    fn pick_random_wallpaper(&self, category: &Category) -> Result<String>;
}

pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

pub struct WallpapersCraft {
    client: Client,
    console: Console,
}

impl WallpapersCraft {
    pub fn new(client: Client, console: Console) -> Self {
        WallpapersCraft { client, console }
    }

    fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let response = self.client.get(url).send().map_err(|e| {
            error!(url, error = %e, "request failed");
            AppError::Http(e)
        })?;
        let status = response.status();
        if !status.is_success() {
            error!(url, %status, "request returned an error status");
            return Err(AppError::HttpStatus(status.as_u16()));
        }
        Ok(response.text()?)
    }

    /// Follow a wallpaper page to the direct `.jpg` link, going through the
    /// resolution download page when the direct link is not on the first page.
    fn resolve_image(&self, wallpaper_page: &str) -> Result<String> {
        let html = self.fetch(wallpaper_page)?;
        if let Some(image) = find_direct_image(&html) {
            return Ok(image);
        }

        let download_page = find_resolution_link(&html)
            .map(|href| absolute_url(&href))
            .ok_or_else(|| AppError::Parse("image link not found".to_string()))?;
        self.console
            .line(format!("Selected image: {}", download_page).magenta().bold());

        let html = self.fetch(&download_page)?;
        find_direct_image(&html).ok_or_else(|| AppError::Parse("direct image link not found".to_string()))
    }
}

impl WallpaperProvider for WallpapersCraft {
    fn list_categories(&self) -> Result<Vec<Category>> {
        let mut loader = self.console.spinner("Fetching categories");
        let html = match self.fetch(BASE_URL) {
            Ok(html) => html,
            Err(e) => {
                loader.fail("Could not load the category page");
                return Err(e);
            }
        };

        let mut categories = parse_categories(&html);
        if categories.is_empty() {
            loader.fail("Category list not found, the site layout may have changed");
            return Ok(categories);
        }
        if !categories.iter().any(|c| c.url == BASE_URL) {
            categories.push(Category::new(ALL_CATEGORIES_NAME, BASE_URL));
        }

        loader.complete(&format!("Found {} categories", categories.len()));
        Ok(categories)
    }

    fn pick_random_wallpaper(&self, category: &Category) -> Result<String> {
        self.console.line(format!(
            "{} {}",
            "Category:".bold(),
            category.name.yellow()
        ));

        let mut loader = self.console.spinner("Searching for a random wallpaper");
        let picked = (|| -> Result<String> {
            let html = self.fetch(&category.url)?;
            let last_page = parse_last_page(&html);
            let page = rand::thread_rng().gen_range(1..=last_page);
            let url = page_url(&category.url, page);
            debug!(last_page, page, %url, "picked page");

            let html = self.fetch(&url)?;
            let links = parse_wallpaper_links(&html);
            links
                .choose(&mut rand::thread_rng())
                .map(|href| absolute_url(href))
                .ok_or_else(|| AppError::Parse(format!("no wallpapers on page {}", page)))
        })();
        loader.stop();

        let image = self.resolve_image(&picked?)?;
        self.console
            .line(format!("{} {}", "Direct image link:".magenta().bold(), image.green()));
        Ok(image)
    }
}

// ============================================================================
// HTML Scanning Helpers
// ============================================================================

/// An `<a ...>` element: the opening tag text and the inner HTML.
struct Anchor<'a> {
    tag: &'a str,
    inner: &'a str,
}

impl<'a> Anchor<'a> {
    fn href(&self) -> Option<&'a str> {
        attr(self.tag, "href")
    }

    fn has_class(&self, class: &str) -> bool {
        attr(self.tag, "class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// Value of `name="..."` inside an opening tag.
fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')?;
    Some(&tag[start..start + end])
}

fn anchors(html: &str) -> Vec<Anchor<'_>> {
    let mut found = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find("<a ") {
        let after = &rest[start..];
        let Some(tag_end) = after.find('>') else { break };
        let tag = &after[..tag_end];
        let body = &after[tag_end + 1..];
        let inner_end = body.find("</a>").unwrap_or(body.len());
        found.push(Anchor {
            tag,
            inner: &body[..inner_end],
        });
        rest = &body[inner_end..];
    }
    found
}

fn anchors_with_class<'a>(html: &'a str, class: &str) -> Vec<Anchor<'a>> {
    anchors(html).into_iter().filter(|a| a.has_class(class)).collect()
}

/// Text that belongs to the element itself, skipping nested elements
/// (e.g. the wallpaper counter next to a category name).
fn own_text(inner: &str) -> String {
    let mut text = String::new();
    let mut depth = 0usize;
    let mut rest = inner;

    while let Some(lt) = rest.find('<') {
        if depth == 0 {
            text.push_str(&rest[..lt]);
        }
        let tag_end = rest[lt..].find('>').map(|i| lt + i).unwrap_or(rest.len() - 1);
        let tag = &rest[lt..=tag_end];
        if tag.starts_with("</") {
            depth = depth.saturating_sub(1);
        } else if !tag.ends_with("/>") {
            depth += 1;
        }
        rest = &rest[tag_end + 1..];
    }
    if depth == 0 {
        text.push_str(rest);
    }

    decode_entities(&text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", BASE_URL, href)
    }
}

pub fn parse_categories(html: &str) -> Vec<Category> {
    let mut seen = HashSet::new();
    anchors_with_class(html, "filter__link")
        .into_iter()
        .filter_map(|a| {
            let href = a.href()?;
            if href == "javascript:;" {
                return None;
            }
            let name = own_text(a.inner);
            if name.is_empty() {
                return None;
            }
            Some(Category::new(name, absolute_url(href)))
        })
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

/// Highest `.../pageN` number linked from the page, 1 when there is no pager.
pub fn parse_last_page(html: &str) -> u32 {
    anchors(html)
        .iter()
        .filter_map(|a| a.href())
        .filter_map(|href| {
            let (_, number) = href.rsplit_once("/page")?;
            number.parse::<u32>().ok()
        })
        .max()
        .unwrap_or(1)
        .max(1)
}

pub fn page_url(category_url: &str, page: u32) -> String {
    let base = category_url.trim_end_matches('/');
    if base == BASE_URL {
        format!("{}/all/page{}", BASE_URL, page)
    } else {
        format!("{}/page{}", base, page)
    }
}

pub fn parse_wallpaper_links(html: &str) -> Vec<String> {
    anchors_with_class(html, "wallpapers__link")
        .iter()
        .filter_map(|a| a.href())
        .map(str::to_string)
        .collect()
}

/// A toolbar button that links straight to a `.jpg`.
pub fn find_direct_image(html: &str) -> Option<String> {
    anchors_with_class(html, "gui-button")
        .iter()
        .filter_map(|a| a.href())
        .find(|href| href.starts_with("http") && href.ends_with(".jpg"))
        .map(str::to_string)
}

/// The first resolution link in the wallpaper info table.
pub fn find_resolution_link(html: &str) -> Option<String> {
    let table_start = html.find("wallpaper-table__row")?;
    anchors(&html[table_start..])
        .iter()
        .filter_map(|a| a.href())
        .find(|href| href.contains("/download/"))
        .map(str::to_string)
}
