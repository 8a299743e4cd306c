use crate::server::ServerSettings;
use crate::surface::{BACK_NAV_SCRIPT, ERROR_PAGE_HTML, error_page_url, live_url};

use base64::Engine as _;

#[test]
fn test_live_url_uses_fixed_loopback_endpoint() {
    let settings = ServerSettings::default();
    assert_eq!(live_url(&settings), "http://127.0.0.1:8000");
}

#[test]
fn test_error_page_is_the_exact_literal_markup() {
    assert_eq!(
        ERROR_PAGE_HTML,
        "<html><body><h1>Erro: Servidor Django não iniciou.</h1></body></html>"
    );
}

#[test]
fn test_error_page_url_declares_mime_and_charset() {
    let url = error_page_url();
    assert!(url.starts_with("data:text/html;charset=utf-8;base64,"));

    let payload = url.rsplit(',').next().unwrap();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), ERROR_PAGE_HTML);
}

#[test]
fn test_back_bridge_delegates_to_history() {
    assert!(BACK_NAV_SCRIPT.contains("window.history.back()"));
    // At history root the bridge does nothing: default window behavior
    assert!(BACK_NAV_SCRIPT.contains("window.history.length > 1"));
}
