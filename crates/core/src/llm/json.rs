use crate::domain::contract::{narrative_from_lines, LlmNarrative, Narrative};

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Strip ```json ... ``` fences.
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// JSON when the model complied, line-split prose otherwise.
pub fn parse_narrative(text: &str, expected_products: usize) -> anyhow::Result<Narrative> {
    if let Some(json_str) = extract_json(text) {
        match serde_json::from_str::<LlmNarrative>(&json_str) {
            Ok(parsed) => return parsed.validate_and_into_narrative(expected_products),
            Err(err) => {
                tracing::debug!(error = %err, "narrative is not JSON; splitting lines");
            }
        }
    }
    narrative_from_lines(text, expected_products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"summary\":\"s\"}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
        assert_eq!(extract_json("no braces here"), None);
    }

    #[test]
    fn parses_json_narrative() {
        let text = json!({
            "summary": "여행 자금 마련에 적합한 상품입니다.",
            "products": ["자유롭게 납입 가능", "수익성 기대", "세액공제"]
        })
        .to_string();
        let n = parse_narrative(&text, 3).unwrap();
        assert_eq!(n.summary, "여행 자금 마련에 적합한 상품입니다.");
        assert_eq!(n.product_analyses.len(), 3);
    }

    #[test]
    fn accepts_camel_case_product_key() {
        let text = json!({"summary": "요약", "productAnalyses": ["a"]}).to_string();
        let n = parse_narrative(&text, 1).unwrap();
        assert_eq!(n.product_analyses, vec!["a".to_string()]);
    }

    #[test]
    fn falls_back_to_lines_for_prose() {
        let text = "1. 전체 요약입니다.\n목표 달성이 가능합니다.\n안정적인 상품 위주입니다.\n2. 첫 상품 설명\n";
        let n = parse_narrative(text, 3).unwrap();
        assert!(n.summary.starts_with("1. 전체 요약입니다."));
        assert_eq!(n.product_analyses, vec!["2. 첫 상품 설명".to_string()]);
    }

    #[test]
    fn empty_text_is_an_error() {
        assert!(parse_narrative("   \n  ", 3).is_err());
    }
}
