//! Display surface helpers: navigation targets and the page script
//! bridge.

use crate::server::ServerSettings;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Terminal error document, shown when the readiness budget is spent.
pub const ERROR_PAGE_HTML: &str =
    "<html><body><h1>Erro: Servidor Django não iniciou.</h1></body></html>";

const ERROR_PAGE_MIME: &str = "text/html";
const ERROR_PAGE_CHARSET: &str = "utf-8";

/// Script injected into every loaded page. Binds the platform back
/// gestures (Alt+Left, the dedicated back key, the mouse back button)
/// and delegates to the webview's own history. At history root nothing
/// happens and the window's default controls apply.
pub const BACK_NAV_SCRIPT: &str = r#"
(function () {
  if (window.__guildaBackNav) { return; }
  window.__guildaBackNav = true;

  function goBack(event) {
    if (window.history.length > 1) {
      event.preventDefault();
      window.history.back();
    }
  }

  window.addEventListener('keydown', function (event) {
    if ((event.altKey && event.key === 'ArrowLeft') || event.key === 'BrowserBack') {
      goBack(event);
    }
  });

  window.addEventListener('mouseup', function (event) {
    if (event.button === 3) {
      goBack(event);
    }
  });
})();
"#;

/// Address the surface navigates to once something is listening.
pub fn live_url(server: &ServerSettings) -> String {
    format!("http://{}:{}", server.host, server.port)
}

/// The error document as a navigable data URL: the inline equivalent of
/// loading a document with an explicit `text/html` MIME type and UTF-8
/// charset.
pub fn error_page_url() -> String {
    format!(
        "data:{ERROR_PAGE_MIME};charset={ERROR_PAGE_CHARSET};base64,{}",
        BASE64.encode(ERROR_PAGE_HTML.as_bytes())
    )
}
