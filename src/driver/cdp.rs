use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::locator::{Locator, ResolvedQuery};

use super::{DriverError, UiDriver};

/// [`UiDriver`] backed by the Chrome DevTools Protocol.
///
/// Attaches to an existing browser over its websocket endpoint and performs
/// every element operation by evaluating a script in the driven page. The
/// browser itself is never closed by this type; the operator owns it.
pub struct CdpDriver {
    browser: Browser,
    handler_task: JoinHandle<()>,
    current: Mutex<Option<Page>>,
}

impl CdpDriver {
    pub async fn connect(ws_url: &str) -> Result<Self, DriverError> {
        let (browser, mut handler) = Browser::connect(ws_url).await?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });
        Ok(Self {
            browser,
            handler_task,
            current: Mutex::new(None),
        })
    }

    /// Detach from the browser, leaving it running.
    pub async fn shutdown(self) {
        drop(self.browser);
        self.handler_task.abort();
    }

    async fn current_page(&self) -> Result<Page, DriverError> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or(DriverError::NoPage)
    }

    async fn evaluate(&self, script: String) -> Result<Value, DriverError> {
        let page = self.current_page().await?;
        let result = page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn evaluate_on(&self, locator: &Locator, body: &str) -> Result<Value, DriverError> {
        self.evaluate(element_script(locator, body)).await
    }
}

#[async_trait]
impl UiDriver for CdpDriver {
    async fn reset_context(&self) -> Result<(), DriverError> {
        let pages = self.browser.pages().await?;
        let mut chosen = None;
        for page in pages {
            let url = page.url().await?.unwrap_or_default();
            if url.starts_with("http") {
                // The most recently opened http tab is where the portal is.
                chosen = Some(page);
            }
        }
        let page = chosen.ok_or(DriverError::NoPage)?;
        let url = page.url().await.ok().flatten();
        debug!(?url, "bound driver to page");
        *self.current.lock().await = Some(page);
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        let value = self.evaluate_on(locator, "return nodes.length;").await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| DriverError::Evaluation(format!("count returned {value}")))
    }

    async fn read_text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let value = self
            .evaluate_on(
                locator,
                "if (!nodes.length) return null; \
                 const el = nodes[0]; \
                 return (el.innerText ?? el.textContent ?? '').trim();",
            )
            .await?;
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(DriverError::Evaluation(format!(
                "read_text returned {other}"
            ))),
        }
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, DriverError> {
        let value = self
            .evaluate_on(
                locator,
                "const el = nodes[0]; \
                 if (!el) return false; \
                 return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);",
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool, DriverError> {
        let value = self
            .evaluate_on(
                locator,
                "const el = nodes[0]; \
                 if (!el) return false; \
                 if (!(el.offsetWidth || el.offsetHeight || el.getClientRects().length)) return false; \
                 if (el.disabled) return false; \
                 if (el.classList.contains('p-disabled')) return false; \
                 return el.getAttribute('aria-disabled') !== 'true';",
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), DriverError> {
        let value = self
            .evaluate_on(
                locator,
                "const el = nodes[0]; \
                 if (!el) return 'missing'; \
                 el.scrollIntoView({block: 'center', inline: 'center'}); \
                 return 'ok';",
            )
            .await?;
        match value.as_str() {
            Some("ok") => Ok(()),
            Some("missing") => Err(DriverError::NotFound(locator.to_string())),
            _ => Err(DriverError::Evaluation(format!("scroll returned {value}"))),
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        let value = self
            .evaluate_on(
                locator,
                "const el = nodes[0]; \
                 if (!el) return 'missing'; \
                 el.click(); \
                 return 'ok';",
            )
            .await?;
        match value.as_str() {
            Some("ok") => Ok(()),
            Some("missing") => Err(DriverError::NotFound(locator.to_string())),
            _ => Err(DriverError::Evaluation(format!("click returned {value}"))),
        }
    }

    async fn scroll_listing_by(
        &self,
        container: &Locator,
        step_px: i64,
    ) -> Result<(), DriverError> {
        let body = format!(
            "const step = {step_px}; \
             let el = nodes[0]; \
             while (el && el !== document.body) {{ \
                 const style = getComputedStyle(el); \
                 if (/(auto|scroll)/.test(style.overflowY) && el.scrollHeight > el.clientHeight) {{ \
                     el.scrollTop += step; \
                     return 'container'; \
                 }} \
                 el = el.parentElement; \
             }} \
             window.scrollBy(0, step); \
             return 'window';"
        );
        let value = self.evaluate_on(container, &body).await?;
        if value.as_str().is_none() {
            return Err(DriverError::Evaluation(format!("scroll returned {value}")));
        }
        Ok(())
    }

    async fn adopt_window_by_title(&self, title_fragment: &str) -> Result<(), DriverError> {
        let wanted = title_fragment.to_lowercase();
        for page in self.browser.pages().await? {
            let title = match page.get_title().await {
                Ok(title) => title.unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "could not read page title while scanning windows");
                    continue;
                }
            };
            if title.to_lowercase().contains(&wanted) {
                page.bring_to_front().await?;
                debug!(%title, "adopted window");
                *self.current.lock().await = Some(page);
                return Ok(());
            }
        }
        Err(DriverError::NoWindow(title_fragment.to_string()))
    }
}

/// Wrap an element operation in a script that first materializes `nodes`,
/// the array of elements matching the locator, then runs `body`.
fn element_script(locator: &Locator, body: &str) -> String {
    let finder = match locator.resolve() {
        ResolvedQuery::Css(selector) => format!(
            "const nodes = Array.from(document.querySelectorAll({}));",
            js_string(&selector)
        ),
        ResolvedQuery::XPath(xpath) => format!(
            "const snapshot = document.evaluate({}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             const nodes = []; \
             for (let i = 0; i < snapshot.snapshotLength; i++) \
                 nodes.push(snapshot.snapshotItem(i));",
            js_string(&xpath)
        ),
    };
    format!("(() => {{ {finder} {body} }})()")
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_script_quotes_css_selector() {
        let script = element_script(&Locator::css("div[data-x='a']"), "return nodes.length;");
        assert!(script.contains("querySelectorAll(\"div[data-x='a']\")"));
        assert!(script.contains("return nodes.length;"));
    }

    #[test]
    fn element_script_lowers_id_to_xpath() {
        let script = element_script(&Locator::id("btnOk"), "return nodes.length;");
        assert!(script.contains("document.evaluate(\"//*[@id='btnOk']\""));
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
    }
}
