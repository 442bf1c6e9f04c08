use std::sync::atomic::Ordering;

use pricewatch_core::INSTALLMENTS_NOT_INFORMED;

use super::*;
use crate::session::fake::{FakeFactory, Navigation, Script};
use crate::sites::{amazon, mercado_livre};

const AMAZON_RESULTS: &str = include_str!("../tests/fixtures/amazon_results.html");
const AMAZON_CAPTCHA: &str = include_str!("../tests/fixtures/amazon_captcha.html");
const AMAZON_EMPTY: &str = include_str!("../tests/fixtures/amazon_empty.html");
const ML_RESULTS: &str = include_str!("../tests/fixtures/mercado_livre_results.html");
const ML_BLOCKED: &str = include_str!("../tests/fixtures/mercado_livre_blocked.html");

fn settings() -> SearchSettings {
    SearchSettings {
        navigation_timeout: Duration::from_secs(30),
        results_timeout: Duration::from_secs(15),
        max_items_per_page: 10,
    }
}

fn amazon_adapter(factory: FakeFactory) -> (BrowserSiteAdapter<FakeFactory>, Arc<FakeFactory>) {
    let factory = Arc::new(factory);
    let adapter = BrowserSiteAdapter::new(
        amazon::profile().unwrap(),
        Arc::clone(&factory),
        DiagnosticsCapture::disabled(),
        settings(),
    );
    (adapter, factory)
}

fn released(factory: &FakeFactory) -> usize {
    factory.counters.released.load(Ordering::SeqCst)
}

#[tokio::test]
async fn amazon_results_become_offers() {
    let (adapter, factory) = amazon_adapter(FakeFactory::new(Script::results(AMAZON_RESULTS)));

    let result = adapter.search("cadeira gamer").await;

    let SiteResult::Success { site, offers } = result else {
        panic!("expected success, got {result:?}");
    };
    assert_eq!(site, Site::Amazon);
    assert_eq!(offers.len(), 2, "listing without a price is dropped");

    assert_eq!(offers[0].name, "Cadeira Gamer ThunderX3 TGC12 Preta");
    assert_eq!(offers[0].price.to_string(), "1099.90");
    assert_eq!(
        offers[0].url_offer,
        "https://www.amazon.com.br/Cadeira-Gamer-ThunderX3/dp/B0CHAIR001"
    );
    assert_eq!(
        offers[0].installment_details,
        "Em até 10x de R$ 109,99 sem juros"
    );

    assert_eq!(offers[1].price.to_string(), "649.00");
    assert_eq!(
        offers[1].url_offer,
        "https://www.amazon.com.br/Cadeira-Escritorio-Ergonomica/dp/B0CHAIR002"
    );
    assert_eq!(offers[1].installment_details, INSTALLMENTS_NOT_INFORMED);

    assert_eq!(released(&factory), 1);
}

#[tokio::test]
async fn mercado_livre_results_become_offers() {
    let factory = Arc::new(FakeFactory::new(Script::results(ML_RESULTS)));
    let adapter = BrowserSiteAdapter::new(
        mercado_livre::profile().unwrap(),
        Arc::clone(&factory),
        DiagnosticsCapture::disabled(),
        settings(),
    );

    let result = adapter.search("cadeira gamer").await;

    let SiteResult::Success { offers, .. } = result else {
        panic!("expected success, got {result:?}");
    };
    assert_eq!(offers.len(), 2);
    assert_eq!(offers[0].price.to_string(), "799.90");
    assert_eq!(
        offers[0].url_offer,
        "https://produto.mercadolivre.com.br/MLB-1234567890-cadeira-gamer-reclinavel-_JM"
    );
    assert_eq!(offers[0].installment_details, "em 12x R$ 66,66 sem juros");
    assert_eq!(offers[1].name, "Cadeira De Escritório Mesh");
    assert_eq!(offers[1].price.to_string(), "1249.00");
    assert!(offers.iter().all(|o| o.site == Site::MercadoLivre));
}

#[tokio::test]
async fn captcha_page_is_classified_and_captured() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(Script::no_results(AMAZON_CAPTCHA)));
    let adapter = BrowserSiteAdapter::new(
        amazon::profile().unwrap(),
        Arc::clone(&factory),
        DiagnosticsCapture::new(dir.path()),
        settings(),
    );

    let result = adapter.search("cadeira gamer").await;

    assert_eq!(result.failure_kind(), Some(FailureKind::CaptchaDetected));
    let SiteResult::Failure(failure) = result else {
        unreachable!()
    };
    let diagnostic = failure.diagnostic.expect("diagnostic recorded");
    assert_eq!(diagnostic.kind, FailureKind::CaptchaDetected);
    assert!(diagnostic.html_path.expect("html saved").exists());
    assert!(diagnostic.snapshot_path.expect("screenshot saved").exists());
    assert_eq!(released(&factory), 1);
}

#[tokio::test]
async fn mercado_livre_soft_block_is_detected() {
    let factory = Arc::new(FakeFactory::new(Script::no_results(ML_BLOCKED)));
    let adapter = BrowserSiteAdapter::new(
        mercado_livre::profile().unwrap(),
        Arc::clone(&factory),
        DiagnosticsCapture::disabled(),
        settings(),
    );

    let result = adapter.search("cadeira").await;
    assert_eq!(result.failure_kind(), Some(FailureKind::CaptchaDetected));
}

#[tokio::test]
async fn missing_results_without_block_markers() {
    let (adapter, factory) = amazon_adapter(FakeFactory::new(Script::no_results(
        "<html><body><p>carregando...</p></body></html>",
    )));

    let result = adapter.search("cadeira").await;

    assert_eq!(result.failure_kind(), Some(FailureKind::ResultsNotFound));
    assert_eq!(released(&factory), 1);
}

#[tokio::test]
async fn navigation_timeout_is_results_not_found() {
    let mut script = Script::results("<html></html>");
    script.navigation = Navigation::TimesOut;
    let (adapter, _factory) = amazon_adapter(FakeFactory::new(script));

    let result = adapter.search("cadeira").await;
    assert_eq!(result.failure_kind(), Some(FailureKind::ResultsNotFound));
}

#[tokio::test]
async fn empty_results_list_is_no_products_found() {
    let (adapter, _factory) = amazon_adapter(FakeFactory::new(Script::results(AMAZON_EMPTY)));

    let result = adapter.search("xyzzy").await;
    assert_eq!(result.failure_kind(), Some(FailureKind::NoProductsFound));
}

#[tokio::test]
async fn navigation_error_is_unknown_error() {
    let mut script = Script::results(AMAZON_RESULTS);
    script.navigation = Navigation::Fails;
    let (adapter, factory) = amazon_adapter(FakeFactory::new(script));

    let result = adapter.search("cadeira").await;

    assert_eq!(result.failure_kind(), Some(FailureKind::UnknownError));
    assert_eq!(released(&factory), 1);
}

#[tokio::test]
async fn panic_inside_search_is_contained_and_session_released() {
    let mut script = Script::results(AMAZON_RESULTS);
    script.panic_on_content = true;
    let (adapter, factory) = amazon_adapter(FakeFactory::new(script));

    let result = adapter.search("cadeira").await;

    let SiteResult::Failure(failure) = result else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::UnknownError);
    assert!(failure
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("renderer crashed"));
    assert_eq!(released(&factory), 1);
}

#[tokio::test]
async fn panic_during_diagnostics_still_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut script = Script::results(AMAZON_RESULTS);
    script.panic_on_content = true;
    let factory = Arc::new(FakeFactory::new(script));
    let adapter = BrowserSiteAdapter::new(
        amazon::profile().unwrap(),
        Arc::clone(&factory),
        DiagnosticsCapture::new(dir.path()),
        settings(),
    );

    let result = adapter.search("cadeira").await;

    let SiteResult::Failure(failure) = result else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::UnknownError);
    let diagnostic = failure.diagnostic.expect("diagnostic record");
    assert!(diagnostic.html_path.is_none());
    assert_eq!(released(&factory), 1);
}

#[tokio::test]
async fn launch_failure_is_unknown_error_without_session() {
    let mut factory = FakeFactory::new(Script::results(AMAZON_RESULTS));
    factory.launch_fails = true;
    let (adapter, factory) = amazon_adapter(factory);

    let result = adapter.search("cadeira").await;

    assert_eq!(result.failure_kind(), Some(FailureKind::UnknownError));
    assert_eq!(factory.counters.acquired.load(Ordering::SeqCst), 0);
    assert_eq!(released(&factory), 0);
}

#[tokio::test]
async fn build_adapters_covers_every_site() {
    let factory = Arc::new(FakeFactory::new(Script::results(AMAZON_RESULTS)));
    let adapters = build_adapters(factory, &DiagnosticsCapture::disabled(), settings()).unwrap();
    let sites: Vec<Site> = adapters.iter().map(|a| a.site()).collect();
    assert_eq!(sites, vec![Site::Amazon, Site::MercadoLivre]);
}
