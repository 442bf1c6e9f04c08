//! Text and URL cleanup shared by every site's extraction rules.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static CURRENCY_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"R\$\s*\d[\d.,]*").expect("valid currency fragment regex"));

static INSTALLMENT_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}\s*x\s*(?:de\s*)?R\$\s*\d[\d.,]*(?:\s*sem\s+juros)?")
        .expect("valid installment regex")
});

/// Collapses every run of whitespace (including non-breaking spaces) into a
/// single space and trims the ends.
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleans a listing title: strips embedded price fragments and normalizes
/// whitespace. Returns `None` when nothing meaningful remains.
#[must_use]
pub fn clean_title(raw: &str) -> Option<String> {
    let stripped = CURRENCY_FRAGMENT.replace_all(raw, " ");
    let title = normalize_whitespace(&stripped);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Resolves `href` against `base` and strips tracking noise.
///
/// Query string and fragment are always removed. When the path contains one
/// of `referral_markers` (e.g. Amazon's `/ref=`), everything from the marker
/// onwards is dropped. Only `http` and `https` results are accepted.
#[must_use]
pub fn normalize_offer_url(href: &str, base: &Url, referral_markers: &[&str]) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    url.set_query(None);
    url.set_fragment(None);

    let path = url.path().to_string();
    let cut = referral_markers
        .iter()
        .filter_map(|marker| path.find(marker))
        .min();
    if let Some(idx) = cut {
        let trimmed = &path[..idx];
        url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    Some(url.to_string())
}

/// Whether a piece of text reads like an installment plan.
///
/// Accepts the `10x de R$ 89,90` pattern as well as looser phrasing such as
/// `"em até 12 parcelas"` or `"sem juros"`.
#[must_use]
pub fn looks_like_installments(text: &str) -> bool {
    if INSTALLMENT_PHRASE.is_match(text) {
        return true;
    }
    let lower = text.to_lowercase();
    lower.contains("sem juros") || lower.contains("parcela")
}

/// Finds the first `NNx de R$ ...` phrase in free text.
#[must_use]
pub fn find_installment_phrase(text: &str) -> Option<String> {
    INSTALLMENT_PHRASE
        .find(text)
        .map(|m| normalize_whitespace(m.as_str()))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
