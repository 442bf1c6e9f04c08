use super::*;

fn amazon_base() -> Url {
    Url::parse("https://www.amazon.com.br").unwrap()
}

// -----------------------------------------------------------------------
// normalize_whitespace / clean_title
// -----------------------------------------------------------------------

#[test]
fn whitespace_runs_collapse() {
    assert_eq!(
        normalize_whitespace("  Cadeira \n\t Gamer\u{a0}Pro  "),
        "Cadeira Gamer Pro"
    );
}

#[test]
fn title_drops_embedded_price() {
    assert_eq!(
        clean_title("Cadeira Gamer R$ 899,90 Preta").as_deref(),
        Some("Cadeira Gamer Preta")
    );
}

#[test]
fn title_that_is_only_a_price_is_empty() {
    assert_eq!(clean_title("  R$ 1.299,00 "), None);
    assert_eq!(clean_title(""), None);
}

// -----------------------------------------------------------------------
// normalize_offer_url
// -----------------------------------------------------------------------

#[test]
fn relative_href_is_resolved_and_stripped() {
    let url = normalize_offer_url(
        "/Cadeira-Gamer/dp/B0ABC123/ref=sr_1_1?keywords=cadeira&qid=1#reviews",
        &amazon_base(),
        &["/ref="],
    );
    assert_eq!(
        url.as_deref(),
        Some("https://www.amazon.com.br/Cadeira-Gamer/dp/B0ABC123")
    );
}

#[test]
fn absolute_href_keeps_its_own_host() {
    let base = Url::parse("https://lista.mercadolivre.com.br").unwrap();
    let url = normalize_offer_url(
        "https://produto.mercadolivre.com.br/MLB-123-cadeira-_JM?searchVariation=1#position=2",
        &base,
        &[],
    );
    assert_eq!(
        url.as_deref(),
        Some("https://produto.mercadolivre.com.br/MLB-123-cadeira-_JM")
    );
}

#[test]
fn non_http_href_is_rejected() {
    assert_eq!(
        normalize_offer_url("javascript:void(0)", &amazon_base(), &[]),
        None
    );
    assert_eq!(normalize_offer_url("   ", &amazon_base(), &[]), None);
}

#[test]
fn referral_marker_at_path_start_leaves_root() {
    let url = normalize_offer_url("/ref=nav_logo", &amazon_base(), &["/ref="]);
    assert_eq!(url.as_deref(), Some("https://www.amazon.com.br/"));
}

// -----------------------------------------------------------------------
// installments
// -----------------------------------------------------------------------

#[test]
fn installment_pattern_is_recognized() {
    assert!(looks_like_installments("10x de R$ 89,90 sem juros"));
    assert!(looks_like_installments("12x R$ 10,00"));
    assert!(looks_like_installments("em até 12 parcelas"));
    assert!(!looks_like_installments("Frete grátis"));
}

#[test]
fn installment_phrase_is_found_in_free_text() {
    let text = "Cadeira Gamer R$ 899,90 em 10x de R$ 89,99 sem juros Frete grátis";
    assert_eq!(
        find_installment_phrase(text).as_deref(),
        Some("10x de R$ 89,99 sem juros")
    );
    assert_eq!(find_installment_phrase("R$ 899,90 à vista"), None);
}
