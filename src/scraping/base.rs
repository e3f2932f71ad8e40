use reqwest::Client;
use scraper::{ElementRef, Selector};

use crate::error::{PipelineError, Result};

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn absolute_url(base: &str, href: Option<String>) -> Option<String> {
    let href = href?;
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href);
    }
    let base_url = reqwest::Url::parse(base).ok()?;
    base_url.join(&href).ok().map(|u| u.to_string())
}

pub async fn fetch_html(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| PipelineError::Network(format!("request failed for {url}: {err}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Network(format!(
            "non-success status {status} for {url}"
        )));
    }
    response.text().await.map_err(|err| {
        PipelineError::Network(format!("unable to read response body for {url}: {err}"))
    })
}

pub fn fail_if_empty<T>(source_id: &str, events: Vec<T>) -> Result<Vec<T>> {
    if events.is_empty() {
        Err(PipelineError::Scrape(format!(
            "no events scraped for {source_id}"
        )))
    } else {
        Ok(events)
    }
}
