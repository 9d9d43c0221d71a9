//! Attribute derivation from raw product names.
//!
//! Names are normalized once at ingestion; brand and spec signature are derived
//! from the normalized form so both catalogs go through identical rules.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Variant words that describe a pack, flavour or size rather than the product.
const VARIANT_KEYWORDS: &[&str] = &[
    "原味型", "清爽型", "浓郁型", "家庭装", "分享装", "原味", "草莓", "香草", "巧克力", "柠檬",
    "芒果", "蓝莓", "葡萄", "微辣", "中辣", "特辣", "麻辣", "香辣", "无糖", "低糖", "0糖",
    "零糖", "减糖", "量贩", "迷你", "mini", "大瓶", "中瓶", "小瓶", "大包", "中包", "小包",
    "特大", "加大",
];

static BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[【】《》<>（）()\[\]]").expect("valid bracket pattern"));

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[(（\[【][^)）\]】]*[)）\]】]").expect("valid bracketed pattern")
});

static PACK_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\s*[x×*]\s*\d+(?:\.\d+)?\s*(?:kg|ml|g|l|片|包|袋|支|枚|瓶|听|卷)?")
        .expect("valid pack pattern")
});

static VOLUME_WEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:\.\d+)?\s*(?:ml|kg|g|l)(?-u:\b)").expect("valid volume pattern")
});

static COUNT_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\s*(?:片装|袋装|支装|片|包|袋|支|枚|瓶|听|盒|卷|块)")
        .expect("valid count pattern")
});

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{Han}0-9a-z]+").expect("valid punctuation pattern"));

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-cases, strips bracket characters and collapses whitespace.
///
/// Bracket *contents* are kept: they often carry the spec (`可乐（500ml）`).
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let unbracketed = BRACKETS.replace_all(&lowered, " ");
    collapse_whitespace(&unbracketed)
}

/// Trims a unique key; blank keys are treated as absent.
pub fn normalize_unique_key(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

/// Spec tokens found in a normalized name, in discovery order, de-duplicated.
pub fn spec_tokens(normalized: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    for pattern in [&*PACK_SPEC, &*VOLUME_WEIGHT, &*COUNT_UNIT] {
        for m in pattern.find_iter(normalized) {
            tokens.push(m.as_str().chars().filter(|c| !c.is_whitespace()).collect());
        }
    }

    for keyword in VARIANT_KEYWORDS {
        if normalized.contains(keyword) {
            tokens.push((*keyword).to_string());
        }
    }

    let mut seen = HashSet::new();
    tokens.retain(|t| seen.insert(t.clone()));
    tokens
}

/// Builds the spec signature: name-derived tokens plus any explicit spec field.
pub fn spec_signature(normalized: &str, explicit_spec: Option<&str>) -> String {
    let mut tokens = spec_tokens(normalized);

    if let Some(spec) = explicit_spec {
        let spec = spec.to_lowercase();
        for token in spec.split(|c: char| c.is_whitespace() || c == ',' || c == '/') {
            if !token.is_empty() && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
    }

    tokens.join(" ")
}

/// Strips specs, bracketed text and variant words, leaving the product's base name.
pub fn base_name(normalized: &str) -> String {
    let mut s = BRACKETED.replace_all(normalized, " ").into_owned();
    for pattern in [&*PACK_SPEC, &*VOLUME_WEIGHT, &*COUNT_UNIT] {
        s = pattern.replace_all(&s, " ").into_owned();
    }
    for keyword in VARIANT_KEYWORDS {
        s = s.replace(keyword, " ");
    }
    collapse_whitespace(&NON_WORD.replace_all(&s, " "))
}

/// Brand: the explicit value when given, else the leading base-name token.
pub fn derive_brand(normalized: &str, explicit: Option<&str>) -> Option<String> {
    if let Some(brand) = explicit.map(normalize_name).filter(|b| !b.is_empty()) {
        return Some(brand);
    }
    base_name(normalized)
        .split_whitespace()
        .next()
        .map(str::to_string)
}

/// Jaccard similarity of two spec signatures.
///
/// Returns `0.0` when either side has no spec tokens: absence is not evidence.
pub fn spec_similarity(a: &str, b: &str) -> f32 {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(&b).count();
    let union = a.union(&b).count();
    inter as f32 / union as f32
}

/// Dice coefficient over character bigrams, used when no embedder is configured.
pub fn bigram_similarity(a: &str, b: &str) -> f32 {
    fn bigrams(s: &str) -> Vec<(char, char)> {
        let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    }

    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }

    let a = bigrams(a);
    let mut b = bigrams(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let total = a.len() + b.len();
    let mut shared = 0usize;
    for gram in &a {
        if let Some(pos) = b.iter().position(|g| g == gram) {
            b.swap_remove(pos);
            shared += 1;
        }
    }
    (2 * shared) as f32 / total as f32
}
