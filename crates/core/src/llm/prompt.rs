use crate::llm::NarrativeInput;

pub(crate) fn system_prompt() -> String {
    [
        "You are a professional financial advisor for Korean retail customers.",
        "Explain why each shortlisted savings product fits the customer's goal.",
        "Write in Korean. Be professional but easy to understand.",
        "Return ONLY valid JSON with this schema, no markdown, no extra keys:",
        "{",
        "  \"summary\": \"2-3 sentence overall recommendation\",",
        "  \"products\": [\"1-2 sentences for product 1\", \"...\"]",
        "}",
        "Rules:",
        "- products must have exactly one entry per shortlisted product, in the given order",
        "- Do not invent products, rates or guarantees that are not in the input",
    ]
    .join("\n")
}

pub(crate) fn user_prompt(input: &NarrativeInput) -> String {
    let age = input
        .age
        .map(|a| format!("{a}세"))
        .unwrap_or_else(|| "미제공".to_string());
    let income = input
        .income
        .map(|i| format!("{}원", format_won(i)))
        .unwrap_or_else(|| "미제공".to_string());

    let products = input
        .products
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. {} ({}, 금리: {}%, 위험도: {}, 월 납입액: {}원, 적합도: {}점)",
                i + 1,
                p.name,
                p.product_type,
                p.rate,
                p.risk_level,
                format_won(p.monthly_amount),
                p.suitability_score
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "고객 정보:\n\
- 버킷리스트 목표: {goal}\n\
- 목표 금액: {target}원\n\
- 달성 기간: {months}개월\n\
- 위험 성향: {risk}\n\
- 나이: {age}\n\
- 월 소득: {income}\n\
- 파악된 목적: {purposes}\n\n\
추천 상품:\n{products}",
        goal = input.goal,
        target = format_won(input.target_amount),
        months = input.time_frame_months,
        risk = input.risk_tolerance.as_str(),
        purposes = input.purposes.join(", "),
    )
}

/// Whole won with thousands separators, e.g. `6,000,000`.
pub fn format_won(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    if negative {
        format!("-{out}")
    } else {
        out
    }
}
